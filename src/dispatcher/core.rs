use crate::action::{Action, ActionId, Route};
use crate::context::{ActionMatch, Context, Request, Response};
use crate::controller::{ControllerId, Registry};
use crate::dispatch_type::{ChainedDispatchType, DispatchType, PathDispatchType, RouteListing};
use crate::error::ConfigError;
use crate::path;
use serde::Serialize;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// How a dispatch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// An action matched and the pipeline completed (or `auto` declined).
    Handled,
    /// No dispatch type matched the path.
    NotFound,
    /// A hook or action failed; the response is a 500.
    Error,
    /// The transport abandoned the request mid-pipeline.
    Abandoned,
}

impl DispatchOutcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DispatchOutcome::Handled => "handled",
            DispatchOutcome::NotFound => "not_found",
            DispatchOutcome::Error => "error",
            DispatchOutcome::Abandoned => "abandoned",
        }
    }
}

impl std::fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routes requests to actions and runs the controller pipeline around them.
///
/// Immutable after [`Dispatcher::setup`]; `dispatch` takes `&self` and may be
/// called from any number of threads.
pub struct Dispatcher {
    registry: Arc<Registry>,
    /// Sorted by `(is_low_precedence, name)`
    types: Vec<Box<dyn DispatchType>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("types", &self.type_names())
            .field("actions", &self.registry.actions().len())
            .finish()
    }
}

impl Dispatcher {
    /// Dispatcher with the built-in `Path` and `Chained` types.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::setup`].
    pub fn with_default_types(
        registry: Arc<Registry>,
        chained_low_precedence: bool,
    ) -> Result<Self, ConfigError> {
        Self::setup(
            registry,
            vec![
                Box::new(PathDispatchType::new()),
                Box::new(ChainedDispatchType::new().with_low_precedence(chained_low_precedence)),
            ],
        )
    }

    /// Order the dispatch types, offer them every action, and finalize them.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] raised by a dispatch type, or
    /// [`ConfigError::Unregistered`] for a routable action no type accepted.
    pub fn setup(
        registry: Arc<Registry>,
        mut types: Vec<Box<dyn DispatchType>>,
    ) -> Result<Self, ConfigError> {
        types.sort_by(|a, b| {
            (a.is_low_precedence(), a.name()).cmp(&(b.is_low_precedence(), b.name()))
        });

        for action in registry.actions() {
            let mut accepted = false;
            for dt in &mut types {
                if dt.register_action(action)? {
                    accepted = true;
                }
            }
            if !accepted && action.route() != &Route::Private {
                return Err(ConfigError::Unregistered {
                    action: action.private_path().to_string(),
                });
            }
        }
        for dt in &mut types {
            dt.finalize()?;
        }

        let dispatcher = Self { registry, types };
        info!(
            dispatch_types = ?dispatcher.type_names(),
            controllers = dispatcher.registry.controllers().len(),
            actions = dispatcher.registry.actions().len(),
            "Dispatcher ready"
        );
        Ok(dispatcher)
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Shared handle to the registry.
    #[must_use]
    pub fn registry_arc(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// Dispatch type names in precedence order.
    #[must_use]
    pub fn type_names(&self) -> Vec<&'static str> {
        self.types.iter().map(|t| t.name()).collect()
    }

    /// Dispatch types in precedence order.
    pub fn dispatch_types(&self) -> impl Iterator<Item = &dyn DispatchType> + '_ {
        self.types.iter().map(|t| t.as_ref())
    }

    /// Try every dispatch type in order; the first match is stored in `ctx`.
    pub fn prepare_action(&self, ctx: &mut Context) -> bool {
        let request_path = ctx.request().path.clone();
        self.types
            .iter()
            .any(|dt| dt.match_path(ctx, &request_path))
    }

    /// Resolve a request without running anything.
    #[must_use]
    pub fn resolve(&self, request: &Request) -> Option<ActionMatch> {
        self.types
            .iter()
            .find_map(|dt| dt.resolve(&request.method, &request.path))
    }

    /// Convenience entry point for transports.
    #[must_use]
    pub fn handle(&self, request: Request) -> (DispatchOutcome, Response) {
        let mut ctx = Context::new(request);
        let outcome = self.dispatch(&mut ctx);
        (outcome, ctx.into_response())
    }

    /// Match the request and run `begin`, `auto`, the action chain, and `end`.
    ///
    /// `end` runs for every controller in scope once a match was found, no
    /// matter how the earlier steps went.
    pub fn dispatch(&self, ctx: &mut Context) -> DispatchOutcome {
        let start = Instant::now();
        let request_id = ctx.request().request_id;

        // P1: Match
        if !self.prepare_action(ctx) {
            debug!(
                request_id = %request_id,
                method = %ctx.request().method,
                path = %ctx.request().path,
                "No action matched"
            );
            let body = serde_json::json!({
                "error": "Not Found",
                "method": ctx.request().method.as_str(),
                "path": ctx.request().path,
            });
            ctx.response_mut().set_json(404, body);
            return DispatchOutcome::NotFound;
        }
        let Some(matched) = ctx.action_match().cloned() else {
            return DispatchOutcome::NotFound;
        };

        let leaf = self.registry.action(matched.action);
        let scope = self.controller_scope(leaf, &matched);
        info!(
            request_id = %request_id,
            action = %leaf.private_path(),
            dispatch_type = matched.dispatch_type,
            args = ?matched.args,
            "Action matched"
        );

        let mut failed = false;

        // P2: Begin
        if !ctx.is_abandoned() {
            let controller = self.registry.controller(leaf.controller()).controller();
            if let Err(message) = contain(|| controller.begin(ctx)) {
                record_failure(ctx, "begin", leaf.private_path(), &message);
                failed = true;
            }
        }

        // P3: Auto
        let mut allowed = !failed;
        if allowed {
            for &id in &scope {
                if ctx.is_abandoned() {
                    allowed = false;
                    break;
                }
                let entry = self.registry.controller(id);
                match contain(|| entry.controller().auto(ctx)) {
                    Ok(true) => {}
                    Ok(false) => {
                        debug!(
                            request_id = %request_id,
                            controller = %entry.name(),
                            action = %leaf.private_path(),
                            "Auto declined; action skipped"
                        );
                        allowed = false;
                        break;
                    }
                    Err(message) => {
                        record_failure(ctx, "auto", entry.name(), &message);
                        failed = true;
                        allowed = false;
                        break;
                    }
                }
            }
        }

        // P4: Action chain
        if allowed {
            let steps = matched
                .chain
                .iter()
                .map(|step| (step.action, step.captures.as_slice()))
                .chain(std::iter::once((matched.action, matched.args.as_slice())));
            for (id, args) in steps {
                if ctx.is_abandoned() {
                    break;
                }
                if !self.run_action(ctx, id, args) {
                    failed = true;
                    break;
                }
            }
        }

        // P5: End (always)
        for &id in scope.iter().rev() {
            let entry = self.registry.controller(id);
            if let Err(message) = contain(|| entry.controller().end(ctx)) {
                record_failure(ctx, "end", entry.name(), &message);
                failed = true;
            }
        }

        let outcome = if failed {
            *ctx.response_mut() = Response::error(500, "Internal Server Error");
            DispatchOutcome::Error
        } else if ctx.is_abandoned() {
            DispatchOutcome::Abandoned
        } else {
            DispatchOutcome::Handled
        };

        info!(
            request_id = %request_id,
            action = %leaf.private_path(),
            outcome = %outcome,
            status = ctx.response().status,
            latency_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX),
            "Dispatch complete"
        );
        outcome
    }

    fn run_action(&self, ctx: &mut Context, id: ActionId, args: &[String]) -> bool {
        let action = self.registry.action(id);
        debug!(
            request_id = %ctx.request().request_id,
            action = %action.private_path(),
            args = ?args,
            "Action execution start"
        );
        let result = match contain(|| action.execute(ctx, args)) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(format!("{err:#}")),
            Err(panic_message) => Err(panic_message),
        };
        match result {
            Ok(()) => true,
            Err(message) => {
                record_failure(ctx, "action", action.private_path(), &message);
                false
            }
        }
    }

    /// Controllers whose `auto`/`end` hooks run for `leaf`, outer to inner.
    ///
    /// The namespace ancestry of the leaf, plus the controllers owning the
    /// chain links and the leaf itself, ordered by namespace depth.
    fn controller_scope(&self, leaf: &Action, matched: &ActionMatch) -> Vec<ControllerId> {
        let mut scope = self.registry.namespace_chain(leaf.namespace());
        let owners = matched
            .chain
            .iter()
            .map(|step| self.registry.action(step.action).controller())
            .chain(std::iter::once(leaf.controller()));
        for owner in owners {
            if !scope.contains(&owner) {
                scope.push(owner);
            }
        }
        scope.sort_by_key(|id| path::segments(self.registry.controller(*id).namespace()).len());
        scope
    }

    /// Public URI of the action at `private_path`, asking each dispatch type
    /// in precedence order.
    #[must_use]
    pub fn uri_for(&self, private_path: &str, captures: &[String]) -> Option<String> {
        let action = self.registry.action_by_private_path(private_path)?;
        self.uri_for_action(action, captures)
    }

    #[must_use]
    pub fn uri_for_action(&self, action: &Action, captures: &[String]) -> Option<String> {
        self.types
            .iter()
            .find_map(|dt| dt.uri_for_action(action, captures))
    }

    /// Every route of every dispatch type, in precedence order.
    #[must_use]
    pub fn list(&self) -> Vec<RouteListing> {
        self.types.iter().flat_map(|dt| dt.list()).collect()
    }

    /// Render the dispatch tables as aligned text.
    #[must_use]
    pub fn format_routes(&self) -> String {
        let mut out = String::new();
        for dt in &self.types {
            let routes = dt.list();
            out.push_str(&format!(
                "[{}] routes={} low_precedence={}\n",
                dt.name(),
                routes.len(),
                dt.is_low_precedence()
            ));
            let width = routes.iter().map(|r| r.path.len()).max().unwrap_or(0);
            for r in &routes {
                out.push_str(&format!(
                    "  {:<8} {:<width$} args={:<2} -> /{}",
                    r.methods, r.path, r.args, r.action
                ));
                if !r.chain.is_empty() {
                    out.push_str(&format!(" (via {})", r.chain.join(" -> ")));
                }
                out.push('\n');
            }
        }
        out
    }

    /// Log the dispatch tables.
    pub fn dump_routes(&self) {
        let routes = self.list();
        if routes.is_empty() {
            warn!("Dispatch tables are empty");
        }
        for route in routes {
            info!(
                dispatch_type = route.dispatch_type,
                path = %route.path,
                args = %route.args,
                methods = %route.methods,
                action = %route.action,
                "[route]"
            );
        }
    }
}

fn record_failure(ctx: &mut Context, step: &str, target: &str, message: &str) {
    error!(
        request_id = %ctx.request().request_id,
        step = step,
        target = target,
        error = %message,
        "Dispatch step failed"
    );
    ctx.push_error(format!("{step} {target}: {message}"));
}

/// Run `f`, turning a panic into its message.
fn contain<T>(f: impl FnOnce() -> T) -> Result<T, String> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|panic| panic_message(panic.as_ref()))
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
