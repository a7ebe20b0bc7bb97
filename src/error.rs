//! Error types for setup and startup.
//!
//! Matching never fails with an error: a path that resolves to nothing is a
//! normal [`DispatchOutcome::NotFound`](crate::dispatcher::DispatchOutcome).
//! Everything in this module is raised before the application starts serving.

use thiserror::Error;

/// Invalid or conflicting action metadata, found while building the registry
/// or the dispatch tables. Fatal: the application must not start serving.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Two route-defining attributes on the same action (e.g. `Global` and `Path`).
    #[error("action '{action}': attribute '{first}' conflicts with '{second}'")]
    ConflictingAttributes {
        action: String,
        first: String,
        second: String,
    },

    /// The same attribute key appears more than once.
    #[error("action '{action}': attribute '{key}' declared more than once")]
    DuplicateAttribute { action: String, key: String },

    /// An attribute that only makes sense together with another one.
    #[error("action '{action}': attribute '{key}' requires '{requires}'")]
    MissingAttribute {
        action: String,
        key: String,
        requires: String,
    },

    /// An attribute value that cannot be parsed.
    #[error("action '{action}': invalid value '{value}' for '{key}': {reason}")]
    InvalidAttribute {
        action: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Malformed attribute string (`:Path('foo') :Args(1)` syntax).
    #[error("malformed attribute string '{input}': {reason}")]
    MalformedAttributes { input: String, reason: String },

    /// A controller declares two actions with the same name.
    #[error("controller '{controller}' declares action '{action}' twice")]
    DuplicateAction { controller: String, action: String },

    /// Two actions resolve to the same private path (`namespace/name`).
    #[error("private path '/{private_path}' is used by more than one action")]
    DuplicatePrivatePath { private_path: String },

    /// Two actions registered for the same path with the same precedence.
    #[error("{dispatch_type} path '/{path}' registered by both '{existing}' and '{action}'")]
    DuplicatePath {
        dispatch_type: String,
        path: String,
        existing: String,
        action: String,
    },

    /// A chain link names a parent that is not a registered chain link.
    #[error("chained action '{action}' refers to unknown parent '/{parent}'")]
    UnknownChainParent { action: String, parent: String },

    /// A chain link names an endpoint (an action without `CaptureArgs`) as parent.
    #[error("chained action '{action}' cannot chain from endpoint '{parent}' (parent needs CaptureArgs)")]
    ChainedFromEndpoint { action: String, parent: String },

    /// Chain links that no root reaches (parent cycle).
    #[error("chained action '{action}' is not reachable from any chain root")]
    UnreachableChain { action: String },

    /// A routable action no dispatch type accepted.
    #[error("action '{action}' declares a route but no dispatch type accepted it")]
    Unregistered { action: String },
}

/// Failures that abort application or worker startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// `Controller::pre_fork` returned false.
    #[error("controller '{controller}' rejected pre-fork setup")]
    PreFork { controller: String },

    /// `Controller::post_fork` returned false on a worker.
    #[error("controller '{controller}' rejected post-fork setup on worker {worker}")]
    PostFork { controller: String, worker: usize },

    /// A worker thread panicked outside the dispatcher's containment.
    #[error("worker {worker} panicked")]
    WorkerPanicked { worker: usize },
}

/// Failure loading a declarative route table (see [`crate::config`]).
#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read route table {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The file extension is not one of `yaml`, `yml`, `toml`, `json`.
    #[error("unsupported route table format: {path}")]
    UnsupportedFormat { path: String },

    #[error("invalid {format} route table: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },

    #[error(transparent)]
    Startup(#[from] StartupError),
}

impl From<ConfigError> for TableError {
    fn from(err: ConfigError) -> Self {
        TableError::Startup(StartupError::Config(err))
    }
}
