//! # Action Module
//!
//! An action is one dispatchable unit bound to a controller. Controllers declare
//! actions explicitly as `(name, attributes, handler)` triples; at startup the
//! attributes are resolved into [`ActionMeta`] which decides how (and whether)
//! the action can be reached by path.
//!
//! ## Declaring Actions
//!
//! ```rust,ignore
//! table
//!     .action("bar", |ctx, args| {
//!         ctx.response_mut().set_json(200, serde_json::json!({ "id": args[0] }));
//!         Ok(())
//!     })
//!     .attrs(":Path('baz') :Args(1)")?;
//! ```
//!
//! With namespace `foo` this action resolves to path `foo/baz` and matches
//! `/foo/baz/42` with the argument `42`.
//!
//! ## Metadata Resolution
//!
//! See [`meta`] for the attribute table. Resolution is pure: the same
//! attributes and namespace always produce the same metadata, and every
//! conflicting or malformed declaration is a [`ConfigError`](crate::error::ConfigError)
//! that aborts startup.

mod attributes;
mod core;
pub mod meta;

pub use attributes::Attributes;
pub use core::{Action, ActionHandler, ActionId};
pub use meta::{ActionMeta, ArgSpec, CaptureSpec, ChainParent, Route};
