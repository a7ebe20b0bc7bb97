//! Application assembly and worker lifecycle.
//!
//! ```text
//! ApplicationBuilder ──build()──▶ Registry ─▶ Dispatcher ─▶ pre_fork (once)
//!                                                   │
//!                              Application::worker(n) ─▶ post_fork (per worker)
//! ```
//!
//! The application is immutable once built. Workers share it read-only and
//! each get an `Arc<Dispatcher>`.

use crate::context::{Request, Response};
use crate::controller::{Controller, Registry, RegistryBuilder};
use crate::dispatch_type::DispatchType;
use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::error::StartupError;
use crate::runtime_config::RuntimeConfig;
use std::sync::Arc;
use tracing::{error, info};

/// A fully set-up application: frozen registry, dispatcher, and its name.
#[derive(Debug)]
pub struct Application {
    name: String,
    dispatcher: Arc<Dispatcher>,
}

impl Application {
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ApplicationBuilder {
        ApplicationBuilder {
            name: name.into(),
            controllers: Registry::builder(),
            dispatch_types: Vec::new(),
            chained_low_precedence: true,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        self.dispatcher.registry()
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Dispatch one request on the calling thread.
    #[must_use]
    pub fn handle(&self, request: Request) -> (DispatchOutcome, Response) {
        self.dispatcher.handle(request)
    }

    /// Prepare worker `id`: run every controller's `post_fork`.
    ///
    /// # Errors
    ///
    /// [`StartupError::PostFork`] for the first controller that declines.
    pub fn worker(&self, id: usize) -> Result<Worker, StartupError> {
        for entry in self.registry().controllers() {
            if !entry.controller().post_fork(self) {
                error!(
                    controller = %entry.name(),
                    worker = id,
                    "Controller rejected post-fork setup"
                );
                return Err(StartupError::PostFork {
                    controller: entry.name().to_string(),
                    worker: id,
                });
            }
        }
        info!(app = %self.name, worker = id, "Worker ready");
        Ok(Worker {
            id,
            dispatcher: Arc::clone(&self.dispatcher),
        })
    }

    /// Start `count` scoped worker threads and run `f` on each.
    ///
    /// Returns the results in worker order once every thread finished.
    ///
    /// # Errors
    ///
    /// The first post-fork rejection or worker panic.
    pub fn run_workers<F, R>(&self, count: usize, f: F) -> Result<Vec<R>, StartupError>
    where
        F: Fn(Worker) -> R + Sync,
        R: Send,
    {
        let f = &f;
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..count.max(1))
                .map(|id| scope.spawn(move || self.worker(id).map(f)))
                .collect();
            handles
                .into_iter()
                .enumerate()
                .map(|(id, handle)| {
                    handle
                        .join()
                        .map_err(|_| StartupError::WorkerPanicked { worker: id })?
                })
                .collect()
        })
    }
}

/// One worker's view of the application.
#[derive(Debug, Clone)]
pub struct Worker {
    id: usize,
    dispatcher: Arc<Dispatcher>,
}

impl Worker {
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    #[must_use]
    pub fn handle(&self, request: Request) -> (DispatchOutcome, Response) {
        self.dispatcher.handle(request)
    }
}

/// Collects controllers and dispatch types, then sets the application up.
pub struct ApplicationBuilder {
    name: String,
    controllers: RegistryBuilder,
    dispatch_types: Vec<Box<dyn DispatchType>>,
    chained_low_precedence: bool,
}

impl ApplicationBuilder {
    #[must_use]
    pub fn controller<C: Controller>(mut self, controller: C) -> Self {
        self.controllers = self.controllers.controller(controller);
        self
    }

    #[must_use]
    pub fn controller_arc(mut self, controller: Arc<dyn Controller>) -> Self {
        self.controllers = self.controllers.controller_arc(controller);
        self
    }

    /// Use a custom dispatch type. Once any is added the built-in `Path` and
    /// `Chained` types are no longer installed implicitly.
    #[must_use]
    pub fn dispatch_type<D: DispatchType + 'static>(mut self, dispatch_type: D) -> Self {
        self.dispatch_types.push(Box::new(dispatch_type));
        self
    }

    #[must_use]
    pub fn chained_low_precedence(mut self, low: bool) -> Self {
        self.chained_low_precedence = low;
        self
    }

    /// Apply the runtime options that affect setup.
    #[must_use]
    pub fn runtime_config(self, config: &RuntimeConfig) -> Self {
        self.chained_low_precedence(config.chained_low_precedence)
    }

    /// Build the registry and dispatcher, then run every controller's
    /// `pre_fork` once.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`](crate::error::ConfigError) from registration or
    /// dispatcher setup, or [`StartupError::PreFork`].
    pub fn build(self) -> Result<Application, StartupError> {
        let registry = Arc::new(self.controllers.build()?);
        let dispatcher = if self.dispatch_types.is_empty() {
            Dispatcher::with_default_types(registry, self.chained_low_precedence)?
        } else {
            Dispatcher::setup(registry, self.dispatch_types)?
        };

        let app = Application {
            name: self.name,
            dispatcher: Arc::new(dispatcher),
        };

        for entry in app.registry().controllers() {
            if !entry.controller().pre_fork(&app) {
                error!(controller = %entry.name(), "Controller rejected pre-fork setup");
                return Err(StartupError::PreFork {
                    controller: entry.name().to_string(),
                });
            }
        }

        info!(
            app = %app.name,
            controllers = app.registry().controllers().len(),
            actions = app.registry().actions().len(),
            "Application set up"
        );
        Ok(app)
    }
}
