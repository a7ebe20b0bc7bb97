//! # brrtdispatch
//!
//! **brrtdispatch** is a controller/action dispatch engine. Controllers declare
//! actions with attribute strings (`:Path('baz') :Args(1)`,
//! `:Chained('base') :CaptureArgs(1)`, ...), the registry resolves them into
//! immutable metadata, and the [`Dispatcher`] maps request paths onto actions
//! and runs the `begin → auto → action → end` pipeline around them.
//!
//! ## Architecture
//!
//! - **[`action`]** - Attribute parsing and per-action routing metadata
//! - **[`controller`]** - The [`Controller`] trait and the frozen [`Registry`]
//! - **[`dispatch_type`]** - Matching strategies: `Path` and `Chained`
//! - **[`dispatcher`]** - Precedence ordering, matching and the action pipeline
//! - **[`application`]** - Application lifecycle (`pre_fork`, `post_fork`, workers)
//! - **[`config`]** - Declarative route tables (YAML, TOML, JSON)
//! - **[`hot_reload`]** - Rebuild and swap an application when its table changes
//! - **[`cli`]** - The `brrtdispatch` command-line explorer
//! - **[`logging`]** - Structured `tracing` output
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Caller
//!     participant Dispatcher
//!     participant Types as DispatchTypes<br/>(Path, Chained)
//!     participant Ctl as Controllers
//!
//!     Caller->>Dispatcher: handle(Request)
//!     Dispatcher->>Types: match_path(ctx, path) in precedence order
//!     alt No DispatchType matches
//!         Dispatcher-->>Caller: 404 Not Found
//!     end
//!     Dispatcher->>Ctl: begin (owning controller)
//!     Dispatcher->>Ctl: auto (outer → inner, stops on false)
//!     Dispatcher->>Ctl: chain links, then the leaf action
//!     Dispatcher->>Ctl: end (inner → outer, always)
//!     Dispatcher-->>Caller: (DispatchOutcome, Response)
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use brrtdispatch::{ActionTable, Application, ConfigError, Context, Controller, Request};
//! use http::Method;
//!
//! struct Users;
//!
//! impl Controller for Users {
//!     fn name(&self) -> &str {
//!         "Users"
//!     }
//!
//!     fn actions(&self, table: &mut ActionTable) -> Result<(), ConfigError> {
//!         table
//!             .action("base", |_ctx: &mut Context, _args: &[String]| Ok(()))
//!             .attrs(":Chained('/') :PathPart('users') :CaptureArgs(1)")?;
//!         table
//!             .action("view", |ctx: &mut Context, _args: &[String]| {
//!                 let id = ctx.captures().join(",");
//!                 ctx.response_mut().set_json(200, serde_json::json!({ "id": id }));
//!                 Ok(())
//!             })
//!             .attrs(":Chained('base') :PathPart('view') :Args(0)")?;
//!         Ok(())
//!     }
//! }
//!
//! let app = Application::builder("demo").controller(Users).build()?;
//! let (_outcome, response) = app.handle(Request::new(Method::GET, "/users/42/view"));
//! assert_eq!(response.body["id"], "42");
//! # Ok::<(), brrtdispatch::StartupError>(())
//! ```
//!
//! ## Concurrency
//!
//! The registry and dispatcher are frozen after setup and shared through
//! `Arc`; every request gets its own [`Context`]. Workers created with
//! [`Application::run_workers`] share one dispatcher.

pub mod action;
pub mod application;
pub mod cli;
pub mod config;
pub mod context;
pub mod controller;
pub mod dispatch_type;
pub mod dispatcher;
pub mod echo;
pub mod error;
pub mod hot_reload;
pub mod ids;
pub mod logging;
pub mod path;
pub mod runtime_config;

pub use action::{Action, ActionHandler, ActionId, ActionMeta, ArgSpec, Attributes, Route};
pub use application::{Application, ApplicationBuilder, Worker};
pub use config::AppConfig;
pub use context::{ActionMatch, Context, Request, Response};
pub use controller::{ActionTable, Controller, ControllerId, Registry};
pub use dispatch_type::{ChainedDispatchType, DispatchType, PathDispatchType, RouteListing};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use error::{ConfigError, StartupError, TableError};
pub use ids::RequestId;
pub use runtime_config::RuntimeConfig;
