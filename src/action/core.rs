use super::meta::{ActionMeta, Route};
use crate::context::Context;
use crate::controller::ControllerId;
use std::fmt;
use std::sync::Arc;

/// Body of an action.
///
/// Receives the request context and the positional arguments bound to this
/// action: the trailing arguments for an endpoint, or the link's captures for
/// a chain midpoint. Errors and panics are contained by the dispatcher.
pub type ActionHandler = Arc<dyn Fn(&mut Context, &[String]) -> anyhow::Result<()> + Send + Sync>;

/// Index of an action in the frozen registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(pub(crate) u32);

impl ActionId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One dispatchable unit bound to a controller.
///
/// Created once while the registry is built, immutable afterwards.
#[derive(Clone)]
pub struct Action {
    pub(crate) id: ActionId,
    pub(crate) name: String,
    pub(crate) controller: ControllerId,
    pub(crate) meta: ActionMeta,
    pub(crate) handler: ActionHandler,
}

impl Action {
    #[must_use]
    pub fn id(&self) -> ActionId {
        self.id
    }

    /// Method identifier as declared in the controller.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle of the owning controller.
    #[must_use]
    pub fn controller(&self) -> ControllerId {
        self.controller
    }

    #[must_use]
    pub fn meta(&self) -> &ActionMeta {
        &self.meta
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.meta.namespace
    }

    /// `namespace/name`, unique across the application.
    #[must_use]
    pub fn private_path(&self) -> &str {
        &self.meta.private_path
    }

    #[must_use]
    pub fn route(&self) -> &Route {
        &self.meta.route
    }

    /// Run the action body.
    ///
    /// # Errors
    ///
    /// Whatever the body returns; panics are not caught here.
    pub fn execute(&self, ctx: &mut Context, args: &[String]) -> anyhow::Result<()> {
        (self.handler)(ctx, args)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("controller", &self.controller)
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}
