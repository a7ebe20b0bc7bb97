//! # Route Table Configuration
//!
//! A route table describes an application declaratively: controllers, their
//! namespaces, their actions with attribute strings, and an optional `auto`
//! guard. Every action body is the [echo handler](crate::echo::echo_handler),
//! which makes tables useful for exploring and testing dispatch rules without
//! writing controllers in Rust.
//!
//! ## Formats
//!
//! Picked by file extension: `.yaml`/`.yml` (`serde_yaml`), `.toml` (`toml`),
//! `.json` (`serde_json`).
//!
//! ## Example
//!
//! ```yaml
//! name: shop
//! options:
//!   chained_low_precedence: true
//! controllers:
//!   - name: Root
//!     actions:
//!       - name: index
//!         attributes: ":Path('') :Args(0)"
//!   - name: Users
//!     deny:
//!       status: 403
//!       allow_query: token
//!     actions:
//!       - name: base
//!         attributes: ":Chained('/') :PathPart('users') :CaptureArgs(0)"
//!       - name: view
//!         attributes: ":Chained('base') :PathPart('') :Args(1)"
//! ```

use crate::action::Attributes;
use crate::application::Application;
use crate::context::Context;
use crate::controller::{ActionTable, Controller};
use crate::echo::echo_handler;
use crate::error::{ConfigError, TableError};
use crate::path;
use crate::runtime_config::RuntimeConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Whole route table file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default)]
    pub options: OptionsConfig,
    #[serde(default)]
    pub controllers: Vec<ControllerConfig>,
}

fn default_app_name() -> String {
    "brrtdispatch".to_string()
}

/// Dispatcher options; unset values come from [`RuntimeConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionsConfig {
    pub chained_low_precedence: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControllerConfig {
    pub name: String,
    /// Explicit namespace; derived from the name when absent.
    pub namespace: Option<String>,
    /// `auto` guard that rejects requests.
    pub deny: Option<DenyConfig>,
    #[serde(default)]
    pub actions: Vec<ActionConfig>,
}

/// Rejects every request in scope unless `allow_query` is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DenyConfig {
    #[serde(default = "default_deny_status")]
    pub status: u16,
    #[serde(default = "default_deny_message")]
    pub message: String,
    pub allow_query: Option<String>,
}

fn default_deny_status() -> u16 {
    403
}

fn default_deny_message() -> String {
    "Forbidden".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionConfig {
    pub name: String,
    /// Attribute string such as `:Path('baz') :Args(1)`.
    #[serde(default)]
    pub attributes: String,
    /// Status the echo response is sent with.
    #[serde(default = "default_status")]
    pub status: u16,
}

fn default_status() -> u16 {
    200
}

/// Supported table formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Yaml,
    Toml,
    Json,
}

impl TableFormat {
    /// Format for `path` by extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Toml => "toml",
            Self::Json => "json",
        }
    }
}

impl AppConfig {
    /// Load a table from disk.
    ///
    /// # Errors
    ///
    /// I/O failures, unknown extensions, and parse errors.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let path = path.as_ref();
        let format = TableFormat::from_path(path).ok_or_else(|| TableError::UnsupportedFormat {
            path: path.display().to_string(),
        })?;
        let content = std::fs::read_to_string(path).map_err(|source| TableError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::parse(&content, format)?;
        debug!(
            path = %path.display(),
            format = format.as_str(),
            controllers = config.controllers.len(),
            "Route table loaded"
        );
        Ok(config)
    }

    /// Parse a table from a string.
    ///
    /// # Errors
    ///
    /// [`TableError::Parse`] with the parser's message.
    pub fn parse(content: &str, format: TableFormat) -> Result<Self, TableError> {
        let parsed = match format {
            TableFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            TableFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
            TableFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        };
        parsed.map_err(|message| TableError::Parse {
            format: format.as_str(),
            message,
        })
    }

    /// Build an application from the table. Options in the table take
    /// precedence over `runtime`.
    ///
    /// # Errors
    ///
    /// Any configuration or startup error of the resulting application.
    pub fn build_application(&self, runtime: &RuntimeConfig) -> Result<Application, TableError> {
        let mut builder = Application::builder(self.name.clone()).runtime_config(runtime);
        if let Some(low) = self.options.chained_low_precedence {
            builder = builder.chained_low_precedence(low);
        }
        for controller in &self.controllers {
            builder = builder.controller_arc(Arc::new(TableController::new(controller.clone())));
        }
        let app = builder.build()?;
        info!(
            app = %app.name(),
            routes = app.dispatcher().list().len(),
            "Route table applied"
        );
        Ok(app)
    }
}

/// Controller backed by a [`ControllerConfig`].
#[derive(Debug, Clone)]
pub struct TableController {
    config: ControllerConfig,
    namespace: Option<String>,
}

impl TableController {
    #[must_use]
    pub fn new(config: ControllerConfig) -> Self {
        let namespace = config.namespace.as_deref().map(path::canonical);
        Self { config, namespace }
    }
}

impl Controller for TableController {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    fn actions(&self, table: &mut ActionTable) -> Result<(), ConfigError> {
        let namespace = match &self.namespace {
            Some(ns) => ns.clone(),
            None => crate::controller::namespace_from_name(&self.config.name),
        };
        for action in &self.config.actions {
            let attributes = Attributes::parse(&action.attributes)?;
            let action_ns = attributes
                .get("Namespace")
                .map_or_else(|| namespace.clone(), path::canonical);
            let handler = echo_handler(path::join(&action_ns, &action.name), action.status);
            table.action_with_handler(&action.name, handler).attrs(&action.attributes)?;
        }
        Ok(())
    }

    fn auto(&self, ctx: &mut Context) -> bool {
        let Some(deny) = &self.config.deny else {
            return true;
        };
        let allowed = deny
            .allow_query
            .as_deref()
            .is_some_and(|key| ctx.request().get_query_param(key).is_some());
        if !allowed {
            ctx.response_mut().set_json(
                deny.status,
                serde_json::json!({ "error": deny.message, "controller": self.config.name }),
            );
        }
        allowed
    }
}
