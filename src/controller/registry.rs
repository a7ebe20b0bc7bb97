//! Controller and action registry.
//!
//! Built once, single-threaded, then frozen: after [`RegistryBuilder::build`]
//! nothing mutates the registry and it is shared read-only (`Arc<Registry>`)
//! by the dispatcher and every dispatch type.

use super::core::{namespace_from_name, ActionTable, Controller, ControllerId};
use crate::action::{Action, ActionId, ActionMeta};
use crate::error::ConfigError;
use crate::path;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// A registered controller with its resolved namespace and action index.
pub struct ControllerEntry {
    id: ControllerId,
    name: String,
    namespace: String,
    controller: Arc<dyn Controller>,
    /// Declaration order
    actions: Vec<ActionId>,
    by_name: HashMap<String, ActionId>,
}

impl ControllerEntry {
    #[must_use]
    pub fn id(&self) -> ControllerId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The controller implementation (hooks).
    #[must_use]
    pub fn controller(&self) -> &dyn Controller {
        self.controller.as_ref()
    }

    /// Action ids in declaration order.
    #[must_use]
    pub fn actions(&self) -> &[ActionId] {
        &self.actions
    }

    /// Action id for a method name within this controller.
    #[must_use]
    pub fn action_for(&self, name: &str) -> Option<ActionId> {
        self.by_name.get(name).copied()
    }
}

impl fmt::Debug for ControllerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerEntry")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("actions", &self.actions)
            .finish_non_exhaustive()
    }
}

/// Frozen table of controllers and actions.
#[derive(Debug)]
pub struct Registry {
    controllers: Vec<ControllerEntry>,
    actions: Vec<Action>,
    by_private_path: HashMap<String, ActionId>,
    by_namespace: HashMap<String, Vec<ControllerId>>,
}

impl Registry {
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Controllers in registration order.
    #[must_use]
    pub fn controllers(&self) -> &[ControllerEntry] {
        &self.controllers
    }

    #[must_use]
    pub fn controller(&self, id: ControllerId) -> &ControllerEntry {
        &self.controllers[id.index()]
    }

    /// Controller by name.
    #[must_use]
    pub fn find_controller(&self, name: &str) -> Option<&ControllerEntry> {
        self.controllers.iter().find(|c| c.name == name)
    }

    /// All actions; controllers in registration order, actions in declaration order.
    #[must_use]
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    #[must_use]
    pub fn action(&self, id: ActionId) -> &Action {
        &self.actions[id.index()]
    }

    /// Actions of one controller in declaration order.
    pub fn controller_actions(&self, id: ControllerId) -> impl Iterator<Item = &Action> + '_ {
        self.controller(id)
            .actions
            .iter()
            .map(move |aid| self.action(*aid))
    }

    /// Action by method name within a controller.
    #[must_use]
    pub fn action_for(&self, controller: ControllerId, name: &str) -> Option<&Action> {
        self.controller(controller)
            .action_for(name)
            .map(|id| self.action(id))
    }

    /// Action by private path (`namespace/name`, leading slash optional).
    #[must_use]
    pub fn action_by_private_path(&self, private_path: &str) -> Option<&Action> {
        self.by_private_path
            .get(&path::canonical(private_path))
            .map(|id| self.action(*id))
    }

    /// Controllers bound exactly to `namespace`, in registration order.
    #[must_use]
    pub fn controllers_for_namespace(&self, namespace: &str) -> &[ControllerId] {
        self.by_namespace
            .get(namespace)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Controllers along the namespace ancestry of `namespace`, outer to inner:
    /// `""`, `a`, `a/b`, ... down to `namespace` itself.
    #[must_use]
    pub fn namespace_chain(&self, namespace: &str) -> Vec<ControllerId> {
        let segments = path::segments(namespace);
        let mut chain: Vec<ControllerId> = self.controllers_for_namespace("").to_vec();
        for depth in 1..=segments.len() {
            let prefix = segments[..depth].join("/");
            chain.extend_from_slice(self.controllers_for_namespace(&prefix));
        }
        chain
    }
}

/// Collects controllers and resolves their declarations into a [`Registry`].
#[derive(Default)]
pub struct RegistryBuilder {
    controllers: Vec<Arc<dyn Controller>>,
}

impl RegistryBuilder {
    #[must_use]
    pub fn controller<C: Controller>(mut self, controller: C) -> Self {
        self.controllers.push(Arc::new(controller));
        self
    }

    #[must_use]
    pub fn controller_arc(mut self, controller: Arc<dyn Controller>) -> Self {
        self.controllers.push(controller);
        self
    }

    /// Resolve every controller's namespace and action metadata.
    ///
    /// # Errors
    ///
    /// Malformed or conflicting metadata, duplicate action names within a
    /// controller, and duplicate private paths are [`ConfigError`]s.
    pub fn build(self) -> Result<Registry, ConfigError> {
        let mut registry = Registry {
            controllers: Vec::with_capacity(self.controllers.len()),
            actions: Vec::new(),
            by_private_path: HashMap::new(),
            by_namespace: HashMap::new(),
        };

        for (index, controller) in self.controllers.into_iter().enumerate() {
            let id = ControllerId(u32::try_from(index).unwrap_or(u32::MAX));
            let name = controller.name().to_string();
            let namespace = match controller.namespace() {
                Some(ns) => path::canonical(ns),
                None => namespace_from_name(&name),
            };

            let mut table = ActionTable::new();
            controller.actions(&mut table)?;

            let mut entry = ControllerEntry {
                id,
                name: name.clone(),
                namespace: namespace.clone(),
                controller,
                actions: Vec::with_capacity(table.len()),
                by_name: HashMap::with_capacity(table.len()),
            };

            for decl in table.into_decls() {
                if entry.by_name.contains_key(&decl.name) {
                    return Err(ConfigError::DuplicateAction {
                        controller: name,
                        action: decl.name,
                    });
                }
                let meta = ActionMeta::resolve(&decl.name, &namespace, &decl.attributes)?;
                if registry.by_private_path.contains_key(&meta.private_path) {
                    return Err(ConfigError::DuplicatePrivatePath {
                        private_path: meta.private_path,
                    });
                }

                let action_id = ActionId(u32::try_from(registry.actions.len()).unwrap_or(u32::MAX));
                debug!(
                    controller = %name,
                    action = %decl.name,
                    private_path = %meta.private_path,
                    route = ?meta.route,
                    "Action declared"
                );
                registry
                    .by_private_path
                    .insert(meta.private_path.clone(), action_id);
                entry.by_name.insert(decl.name.clone(), action_id);
                entry.actions.push(action_id);
                registry.actions.push(Action {
                    id: action_id,
                    name: decl.name,
                    controller: id,
                    meta,
                    handler: decl.handler,
                });
            }

            info!(
                controller = %name,
                namespace = %namespace,
                actions = entry.actions.len(),
                "Controller registered"
            );
            registry.by_namespace.entry(namespace).or_default().push(id);
            registry.controllers.push(entry);
        }

        Ok(registry)
    }
}
