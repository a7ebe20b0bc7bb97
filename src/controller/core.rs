use crate::action::{ActionHandler, Attributes};
use crate::application::Application;
use crate::context::Context;
use crate::error::ConfigError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// Words of a CamelCase identifier (`MyFooBar` → `My`, `Foo`, `Bar`).
static NAME_WORDS: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"[A-Z]+[a-z0-9]*|[a-z0-9]+").expect("valid namespace word regex")
});

/// Handle of a controller in the frozen registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControllerId(pub(crate) u32);

impl ControllerId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A named group of actions bound to a namespace.
///
/// Controllers declare their actions once through [`Controller::actions`] and
/// may override the lifecycle hooks. The defaults are no-ops (`auto` allows
/// the request through), so a controller only implements what it needs.
///
/// ```rust
/// use brrtdispatch::controller::{ActionTable, Controller};
/// use brrtdispatch::context::Context;
/// use brrtdispatch::error::ConfigError;
///
/// struct Foo;
///
/// impl Controller for Foo {
///     fn name(&self) -> &str {
///         "Foo"
///     }
///
///     fn actions(&self, table: &mut ActionTable) -> Result<(), ConfigError> {
///         table
///             .action("bar", |ctx: &mut Context, args: &[String]| {
///                 ctx.response_mut()
///                     .set_json(200, serde_json::json!({ "id": args[0] }));
///                 Ok(())
///             })
///             .attrs(":Path('baz') :Args(1)")?;
///         Ok(())
///     }
/// }
/// ```
pub trait Controller: Send + Sync + 'static {
    /// Controller name, e.g. `Foo` or `Admin::Users`.
    fn name(&self) -> &str;

    /// Explicit namespace. `None` derives it from [`Controller::name`]
    /// (see [`namespace_from_name`]).
    fn namespace(&self) -> Option<&str> {
        None
    }

    /// Declare the controller's actions in order.
    ///
    /// # Errors
    ///
    /// Malformed attribute strings abort startup.
    fn actions(&self, table: &mut ActionTable) -> Result<(), ConfigError>;

    /// Runs before `auto` for the controller owning the matched action.
    fn begin(&self, _ctx: &mut Context) {}

    /// Guard run for every controller in the namespace ancestry, outer to inner.
    /// Returning false skips the action; `end` still runs.
    fn auto(&self, _ctx: &mut Context) -> bool {
        true
    }

    /// Runs after the action (or after a rejected `auto`), inner to outer.
    fn end(&self, _ctx: &mut Context) {}

    /// Called once after every controller is registered, before workers start.
    fn pre_fork(&self, _app: &Application) -> bool {
        true
    }

    /// Called once per worker for worker-local initialisation.
    fn post_fork(&self, _app: &Application) -> bool {
        true
    }
}

/// Derive a namespace from a controller name.
///
/// `::` separates path levels and CamelCase words become segments:
/// `MyFooBar` → `my/foo/bar`, `Admin::UserList` → `admin/user/list`.
/// A controller named `Root` is bound to the empty namespace.
#[must_use]
pub fn namespace_from_name(name: &str) -> String {
    if name == "Root" {
        return String::new();
    }
    name.split("::")
        .flat_map(|part| NAME_WORDS.find_iter(part))
        .map(|word| word.as_str().to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("/")
}

/// One declared action: name, attributes, and body.
pub struct ActionDecl {
    pub(crate) name: String,
    pub(crate) attributes: Attributes,
    pub(crate) handler: ActionHandler,
}

impl ActionDecl {
    /// Add one attribute pair.
    pub fn attr(&mut self, key: &str, value: &str) -> &mut Self {
        self.attributes.push(key, value);
        self
    }

    /// Add a value-less attribute such as `Local` or `Global`.
    pub fn flag(&mut self, key: &str) -> &mut Self {
        self.attributes.push(key, "");
        self
    }

    /// Add every attribute of an attribute string (`:Path('x') :Args(1)`).
    ///
    /// # Errors
    ///
    /// [`ConfigError::MalformedAttributes`] if the string does not parse.
    pub fn attrs(&mut self, attributes: &str) -> Result<&mut Self, ConfigError> {
        for (key, value) in Attributes::parse(attributes)?.iter() {
            self.attributes.push(key, value);
        }
        Ok(self)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}

/// Ordered action declarations of one controller.
#[derive(Default)]
pub struct ActionTable {
    decls: Vec<ActionDecl>,
}

impl ActionTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an action backed by a closure.
    pub fn action<F>(&mut self, name: &str, handler: F) -> &mut ActionDecl
    where
        F: Fn(&mut Context, &[String]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.action_with_handler(name, Arc::new(handler))
    }

    /// Declare an action with a shared handler.
    pub fn action_with_handler(&mut self, name: &str, handler: ActionHandler) -> &mut ActionDecl {
        self.decls.push(ActionDecl {
            name: name.to_string(),
            attributes: Attributes::new(),
            handler,
        });
        let last = self.decls.len() - 1;
        &mut self.decls[last]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.decls.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub(crate) fn into_decls(self) -> Vec<ActionDecl> {
        self.decls
    }
}
