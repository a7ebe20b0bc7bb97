//! # Dispatcher Module
//!
//! The dispatcher turns a request into an action invocation. It owns the
//! ordered list of [`DispatchType`](crate::dispatch_type::DispatchType)s and
//! runs the controller pipeline around the matched action.
//!
//! ## Request Flow
//!
//! 1. Each dispatch type is asked in precedence order; the first match wins
//! 2. No match ⇒ [`DispatchOutcome::NotFound`] and a 404 JSON response
//! 3. `begin` of the controller owning the leaf action
//! 4. `auto` of every controller in scope, outer to inner; `false` skips step 5
//! 5. Chain links in order (each with its captures), then the leaf with its args
//! 6. `end` of every controller in scope, inner to outer; always runs
//!
//! The controllers "in scope" are those bound to the namespace ancestry of the
//! leaf action, plus the controllers owning the chain links and the leaf.
//!
//! ## Error Handling
//!
//! - Action bodies returning `Err` or panicking are recorded in the context,
//!   stop the remaining links, and yield [`DispatchOutcome::Error`] with a 500
//!   response once `end` has run
//! - Hook panics are contained the same way
//! - An abandoned request skips the remaining steps up to `end`
//!
//! ## Concurrency
//!
//! The dispatcher is built once at startup and shared as `Arc<Dispatcher>`.
//! Dispatching takes `&self`; all per-request state lives in the
//! [`Context`](crate::context::Context) owned by the calling thread.

mod core;

pub use core::{DispatchOutcome, Dispatcher};
