//! # Hot Reload Module
//!
//! Watches a route table file and swaps in a freshly built
//! [`Application`] whenever it changes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use arc_swap::ArcSwap;
//! use brrtdispatch::hot_reload::watch_config;
//! use std::sync::Arc;
//!
//! let app = Arc::new(ArcSwap::from_pointee(config.build_application(&runtime)?));
//! let _watcher = watch_config("routes.yaml", Arc::clone(&app), runtime)?;
//!
//! // Every request loads the current snapshot.
//! let (outcome, response) = app.load().handle(request);
//! ```
//!
//! ## Reload Process
//!
//! 1. **Detection** - the filesystem watcher reports a modify/create event
//! 2. **Parse** - the table is loaded again
//! 3. **Build** - a new application is set up (`pre_fork` included)
//! 4. **Swap** - the new application replaces the old one atomically
//!
//! Requests already dispatching keep the snapshot they loaded. If loading or
//! building fails the error is logged and the previous application stays
//! active.

use crate::application::Application;
use crate::config::AppConfig;
use crate::error::TableError;
use crate::runtime_config::RuntimeConfig;
use arc_swap::ArcSwap;
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Reload the table at `path` into `target`.
///
/// # Errors
///
/// Loading or building the new application failed; `target` is untouched.
pub fn reload(
    path: &Path,
    target: &ArcSwap<Application>,
    runtime: &RuntimeConfig,
) -> Result<(), TableError> {
    let app = AppConfig::load(path)?.build_application(runtime)?;
    info!(
        path = %path.display(),
        app = %app.name(),
        routes = app.dispatcher().list().len(),
        "hot-reload: route table applied"
    );
    target.store(Arc::new(app));
    Ok(())
}

/// Watch a route table file and rebuild the application when it changes.
///
/// The returned watcher must be kept alive for as long as reloading should
/// happen.
///
/// # Errors
///
/// The watcher could not be created or the path could not be watched.
pub fn watch_config<P>(
    config_path: P,
    target: Arc<ArcSwap<Application>>,
    runtime: RuntimeConfig,
) -> notify::Result<RecommendedWatcher>
where
    P: AsRef<Path>,
{
    let path: PathBuf = config_path.as_ref().to_path_buf();
    let watch_path = path.clone();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) => {
                if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    if let Err(e) = reload(&watch_path, &target, &runtime) {
                        warn!(
                            path = %watch_path.display(),
                            error = %e,
                            "hot-reload: keeping previous route table"
                        );
                    }
                }
            }
            Err(e) => error!(error = ?e, "hot-reload: watch error"),
        },
        Config::default(),
    )?;

    watcher.watch(&path, RecursiveMode::NonRecursive)?;
    info!(path = %path.display(), "hot-reload: watching route table");
    Ok(watcher)
}
