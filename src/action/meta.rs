//! Structured action metadata resolved from declaration attributes.
//!
//! | Attribute         | Effect                                                   |
//! |-------------------|----------------------------------------------------------|
//! | `Global`          | path `/name`, namespace ignored                          |
//! | `Local`           | path `namespace/name`                                    |
//! | `Path('')`        | path is the namespace itself (index action)              |
//! | `Path('foo')`     | path `namespace/foo`                                     |
//! | `Path('/bar')`    | absolute path `/bar`                                     |
//! | `Chained`         | chain root, or `Chained('parent')` to link to a parent   |
//! | `PathPart('x')`   | segment(s) a chain link contributes (default: name)      |
//! | `Args(N)`         | exactly N trailing segments; `Args()` means unlimited    |
//! | `CaptureArgs(N)`  | segments a chain midpoint consumes; -1 means unlimited   |
//! | `Namespace('ns')` | overrides the controller namespace for this action       |
//! | `Method('GET')`   | allowed request methods; rejected on chain midpoints     |
//! | `Private`         | not reachable by path                                    |
//!
//! Without `Args` an action is slurpy: it accepts any number of trailing segments.

use super::attributes::Attributes;
use crate::error::ConfigError;
use crate::path;
use http::Method;
use serde::Serialize;
use std::fmt;

/// Attributes that decide how an action is routed. At most one may be present.
const ROUTE_KEYS: [&str; 5] = ["Global", "Local", "Path", "Chained", "Private"];

const SUPPORTED_METHODS: [Method; 8] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::OPTIONS,
    Method::HEAD,
    Method::TRACE,
];

/// Attributes this module interprets; anything else is kept in [`ActionMeta::extra`].
const KNOWN_KEYS: [&str; 10] = [
    "Global",
    "Local",
    "Path",
    "Chained",
    "Private",
    "PathPart",
    "Args",
    "CaptureArgs",
    "Namespace",
    "Method",
];

/// Number of trailing path segments an endpoint accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArgSpec {
    Exact(usize),
    Unlimited,
}

impl ArgSpec {
    #[inline]
    #[must_use]
    pub fn accepts(self, count: usize) -> bool {
        match self {
            ArgSpec::Exact(n) => n == count,
            ArgSpec::Unlimited => true,
        }
    }

    /// Ordering key: exact counts first (smaller first), unlimited last.
    #[inline]
    #[must_use]
    pub fn specificity(self) -> (u8, usize) {
        match self {
            ArgSpec::Exact(n) => (0, n),
            ArgSpec::Unlimited => (1, 0),
        }
    }
}

impl fmt::Display for ArgSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgSpec::Exact(n) => write!(f, "{n}"),
            ArgSpec::Unlimited => write!(f, "*"),
        }
    }
}

/// Number of segments a chain midpoint captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CaptureSpec {
    Exact(usize),
    Unlimited,
}

impl fmt::Display for CaptureSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureSpec::Exact(n) => write!(f, "{n}"),
            CaptureSpec::Unlimited => write!(f, "*"),
        }
    }
}

/// Where a chain link hangs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainParent {
    Root,
    /// Private path of the parent link.
    Action(String),
}

/// How an action is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Not reachable by path.
    Private,
    /// Flat path in canonical form (no leading slash, root is `""`).
    Path(String),
    /// Link in a chain.
    Chained {
        parent: ChainParent,
        /// Canonical segment(s) this link contributes; may be empty.
        path_part: String,
        /// `Some` for midpoints, `None` for endpoints.
        captures: Option<CaptureSpec>,
    },
}

/// Resolved, immutable metadata of one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionMeta {
    /// Effective namespace (controller namespace unless overridden).
    pub namespace: String,
    /// `namespace/name`, unique across the application.
    pub private_path: String,
    pub route: Route,
    /// Declared `Args`; `None` means slurpy.
    pub args: Option<ArgSpec>,
    /// Allowed request methods; `None` means any.
    pub methods: Option<Vec<Method>>,
    /// Attributes this crate does not interpret.
    pub extra: Attributes,
}

impl ActionMeta {
    /// Resolve the metadata of action `name` declared in a controller bound to
    /// `controller_namespace`.
    ///
    /// # Errors
    ///
    /// Any conflicting, duplicated, incomplete or unparsable attribute is a
    /// [`ConfigError`]; callers abort startup.
    pub fn resolve(
        name: &str,
        controller_namespace: &str,
        attrs: &Attributes,
    ) -> Result<Self, ConfigError> {
        for key in KNOWN_KEYS {
            if attrs.iter().filter(|(k, _)| *k == key).count() > 1 {
                return Err(ConfigError::DuplicateAttribute {
                    action: name.to_string(),
                    key: key.to_string(),
                });
            }
        }

        let mut route_keys = attrs
            .iter()
            .map(|(k, _)| k)
            .filter(|k| ROUTE_KEYS.contains(k));
        let route_key = route_keys.next();
        if let (Some(first), Some(second)) = (route_key, route_keys.next()) {
            return Err(ConfigError::ConflictingAttributes {
                action: name.to_string(),
                first: first.to_string(),
                second: second.to_string(),
            });
        }

        if attrs.contains("Args") && attrs.contains("CaptureArgs") {
            return Err(ConfigError::ConflictingAttributes {
                action: name.to_string(),
                first: "Args".to_string(),
                second: "CaptureArgs".to_string(),
            });
        }
        // Methods are only checked at chain endpoints.
        if attrs.contains("Method") && attrs.contains("CaptureArgs") {
            return Err(ConfigError::ConflictingAttributes {
                action: name.to_string(),
                first: "Method".to_string(),
                second: "CaptureArgs".to_string(),
            });
        }
        for key in ["PathPart", "CaptureArgs"] {
            if attrs.contains(key) && route_key != Some("Chained") {
                return Err(ConfigError::MissingAttribute {
                    action: name.to_string(),
                    key: key.to_string(),
                    requires: "Chained".to_string(),
                });
            }
        }

        let namespace = match attrs.get("Namespace") {
            Some(ns) => path::canonical(ns),
            None => path::canonical(controller_namespace),
        };
        let private_path = path::join(&namespace, name);

        let args = attrs
            .get("Args")
            .map(|v| parse_args(name, v))
            .transpose()?;
        let methods = attrs
            .get("Method")
            .map(|v| parse_methods(name, v))
            .transpose()?;

        let route = match route_key {
            Some("Global") => Route::Path(path::canonical(name)),
            Some("Local") => Route::Path(path::join(&namespace, name)),
            Some("Path") => {
                let value = attrs.get("Path").unwrap_or_default();
                if value.starts_with('/') {
                    Route::Path(path::canonical(value))
                } else {
                    Route::Path(path::join(&namespace, value))
                }
            }
            Some("Chained") => {
                let value = attrs.get("Chained").unwrap_or_default().trim();
                let parent = if path::canonical(value).is_empty() {
                    ChainParent::Root
                } else if value.starts_with('/') {
                    ChainParent::Action(path::canonical(value))
                } else {
                    ChainParent::Action(path::join(&namespace, value))
                };
                let path_part = match attrs.get("PathPart") {
                    Some(part) => path::canonical(part),
                    None => name.to_string(),
                };
                let captures = attrs
                    .get("CaptureArgs")
                    .map(|v| parse_captures(name, v))
                    .transpose()?;
                Route::Chained {
                    parent,
                    path_part,
                    captures,
                }
            }
            _ => Route::Private,
        };

        let extra = attrs
            .iter()
            .filter(|(k, _)| !KNOWN_KEYS.contains(k))
            .collect();

        Ok(Self {
            namespace,
            private_path,
            route,
            args,
            methods,
            extra,
        })
    }

    /// Argument constraint used for matching: declared `Args`, or unlimited.
    #[inline]
    #[must_use]
    pub fn effective_args(&self) -> ArgSpec {
        self.args.unwrap_or(ArgSpec::Unlimited)
    }

    /// True when no `Args` was declared.
    #[must_use]
    pub fn is_slurpy(&self) -> bool {
        self.args.is_none()
    }

    #[inline]
    #[must_use]
    pub fn allows_method(&self, method: &Method) -> bool {
        method_allowed(self.methods.as_deref(), method)
    }

    /// Human-readable method list for route listings.
    #[must_use]
    pub fn methods_label(&self) -> String {
        methods_label(self.methods.as_deref())
    }
}

/// `None` allows any method.
#[inline]
pub(crate) fn method_allowed(methods: Option<&[Method]>, method: &Method) -> bool {
    match methods {
        Some(methods) => methods.contains(method),
        None => true,
    }
}

/// Two method sets compete for the same requests when both are unrestricted or
/// both list a common method. A restricted and an unrestricted set do not:
/// the restricted one is simply tried first.
pub(crate) fn methods_conflict(a: Option<&[Method]>, b: Option<&[Method]>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.iter().any(|m| b.contains(m)),
        _ => false,
    }
}

pub(crate) fn methods_label(methods: Option<&[Method]>) -> String {
    match methods {
        Some(methods) => methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(","),
        None => "*".to_string(),
    }
}

fn invalid(action: &str, key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidAttribute {
        action: action.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_args(action: &str, value: &str) -> Result<ArgSpec, ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(ArgSpec::Unlimited);
    }
    value
        .parse::<usize>()
        .map(ArgSpec::Exact)
        .map_err(|_| invalid(action, "Args", value, "expected a non-negative integer or ''"))
}

fn parse_captures(action: &str, value: &str) -> Result<CaptureSpec, ConfigError> {
    let value = value.trim();
    match value.parse::<i64>() {
        Ok(-1) => Ok(CaptureSpec::Unlimited),
        Ok(n) if n >= 0 => usize::try_from(n)
            .map(CaptureSpec::Exact)
            .map_err(|_| invalid(action, "CaptureArgs", value, "out of range")),
        _ => Err(invalid(
            action,
            "CaptureArgs",
            value,
            "expected a non-negative integer or -1",
        )),
    }
}

fn parse_methods(action: &str, value: &str) -> Result<Vec<Method>, ConfigError> {
    let mut methods = Vec::new();
    for token in value.split(|c: char| c == ',' || c.is_whitespace()) {
        if token.is_empty() {
            continue;
        }
        let upper = token.to_ascii_uppercase();
        let method = SUPPORTED_METHODS
            .iter()
            .find(|m| m.as_str() == upper)
            .cloned()
            .ok_or_else(|| invalid(action, "Method", value, "not a supported HTTP method"))?;
        if !methods.contains(&method) {
            methods.push(method);
        }
    }
    if methods.is_empty() {
        return Err(invalid(action, "Method", value, "no method listed"));
    }
    Ok(methods)
}
