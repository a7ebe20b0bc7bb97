//! # Controller Module
//!
//! Controllers group actions under a namespace and own the lifecycle hooks the
//! dispatcher runs around every matched action:
//!
//! ```text
//! begin (owning controller)
//!   auto (every controller in the namespace ancestry, outer → inner)
//!     action body (chain links in order, then the leaf)
//! end (same controllers, inner → outer)
//! ```
//!
//! Registration is explicit: each controller fills an [`ActionTable`] with
//! `(name, attributes, handler)` triples, and [`RegistryBuilder::build`]
//! resolves them into a frozen [`Registry`]. Actions refer back to their
//! controller through a [`ControllerId`] index, never through shared ownership.

mod core;
mod registry;

pub use core::{namespace_from_name, ActionDecl, ActionTable, Controller, ControllerId};
pub use registry::{ControllerEntry, Registry, RegistryBuilder};
