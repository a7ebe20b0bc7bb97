//! # Dispatch Type Module
//!
//! A dispatch type is one path-matching strategy. Each type picks the actions it
//! understands at startup ([`DispatchType::register_action`]), builds its own
//! read-only matching structure ([`DispatchType::finalize`]), and answers
//! "which action, with which arguments?" for a request path.
//!
//! ## Built-in Types
//!
//! - [`PathDispatchType`] - flat paths (`Path`, `Local`, `Global`), longest
//!   registered prefix wins, residual segments become arguments
//! - [`ChainedDispatchType`] - chains of links (`Chained`, `PathPart`,
//!   `CaptureArgs`), each link consuming part of the path
//!
//! ## Precedence
//!
//! The dispatcher tries types in order of `(is_low_precedence, name)`. `Path`
//! has normal precedence and `Chained` low precedence by default, so a flat
//! path always wins over a chain matching the same request.
//!
//! A type exhausts its own fallbacks before the next one is asked. `Path`
//! retries every shorter prefix down to the root, so a slurpy root action
//! such as `Root::default :Path('')` answers every request and shadows all
//! low precedence chains. Applications that want both set chained low
//! precedence to false, which puts `Chained` first by name.
//!
//! ## Contract
//!
//! Matching is pure: [`DispatchType::resolve`] never touches the context, and
//! [`DispatchType::match_path`] stores the result only on success.

mod chained;
mod path;
#[cfg(test)]
mod tests;

pub use chained::ChainedDispatchType;
pub use path::PathDispatchType;

use crate::action::Action;
use crate::context::{ActionMatch, Context};
use crate::error::ConfigError;
use http::Method;
use serde::Serialize;

/// One line of a dispatch table listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteListing {
    /// Dispatch type that owns the route.
    pub dispatch_type: &'static str,
    /// Public path pattern, e.g. `/foo/baz` or `/users/*/view`.
    pub path: String,
    /// Trailing argument constraint (`0`, `1`, `*`).
    pub args: String,
    /// Allowed methods (`*` for any).
    pub methods: String,
    /// Private path of the action answering the route.
    pub action: String,
    /// Private paths of the chain links leading to the action (chains only).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub chain: Vec<String>,
}

/// A path-matching strategy.
pub trait DispatchType: Send + Sync {
    /// Type name; used to order types of equal precedence.
    fn name(&self) -> &'static str;

    /// Offer an action during setup.
    ///
    /// Returns `Ok(true)` if the action was registered, `Ok(false)` if this
    /// type does not handle it.
    ///
    /// # Errors
    ///
    /// [`ConfigError::DuplicatePath`] when an equal-precedence action already
    /// occupies the slot.
    fn register_action(&mut self, action: &Action) -> Result<bool, ConfigError>;

    /// Called once after every action was offered.
    ///
    /// # Errors
    ///
    /// Structural problems only visible with the full set of actions.
    fn finalize(&mut self) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Resolve a request path without side effects.
    fn resolve(&self, method: &Method, path: &str) -> Option<ActionMatch>;

    /// Match `path` and record the result in `ctx`. The context is untouched
    /// when nothing matches.
    fn match_path(&self, ctx: &mut Context, path: &str) -> bool {
        match self.resolve(&ctx.request().method, path) {
            Some(matched) => {
                ctx.set_match(matched);
                true
            }
            None => false,
        }
    }

    /// Registered routes, for introspection.
    fn list(&self) -> Vec<RouteListing>;

    /// Low-precedence types are tried after all normal ones.
    fn is_low_precedence(&self) -> bool {
        false
    }

    /// Public URI of `action` given its chain captures, if this type routes it.
    fn uri_for_action(&self, action: &Action, captures: &[String]) -> Option<String>;
}
