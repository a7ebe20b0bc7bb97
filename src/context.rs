//! Per-request state: the parsed request, the response being populated, and
//! the action match the dispatcher resolved.
//!
//! # JSF Compliance
//!
//! Uses `SmallVec` for query parameters and headers so typical requests stay
//! off the heap in the dispatch hot path.

use crate::action::ActionId;
use crate::ids::RequestId;
use http::Method;
use serde::Serialize;
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Maximum number of query parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Maximum inline headers before heap allocation.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated parameter storage.
///
/// Parameter names use `Arc<str>`: `Arc::clone()` is O(1) while values stay
/// per-request `String`s.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Stack-allocated response header storage.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Parsed request handed over by the transport.
#[derive(Debug, Clone)]
pub struct Request {
    /// Unique request ID for tracing and correlation
    pub request_id: RequestId,
    pub method: Method,
    /// Path without the query string
    pub path: String,
    pub query_params: ParamVec,
    /// Request body parsed as JSON (if present)
    pub body: Option<Value>,
}

impl Request {
    /// Create a request for `path` with no parameters or body.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::new(),
            method,
            path: path.into(),
            query_params: ParamVec::new(),
            body: None,
        }
    }

    /// Build a request from a request target such as `/users/7?expand=posts`.
    ///
    /// The query string is decoded with `application/x-www-form-urlencoded` rules.
    #[must_use]
    pub fn from_target(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };
        let mut request = Self::new(method, if path.is_empty() { "/" } else { path });
        if let Some(query) = query {
            request.query_params = url::form_urlencoded::parse(query.as_bytes())
                .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
                .collect();
        }
        request
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Get a query parameter by name
    ///
    /// Uses "last write wins" semantics: `?limit=10&limit=20` yields `20`.
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Response populated by controller hooks and actions.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub status: u16,
    #[serde(skip_serializing)]
    pub headers: HeaderVec,
    pub body: Value,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: 200,
            headers: HeaderVec::new(),
            body: Value::Null,
        }
    }
}

impl Response {
    /// Create a JSON response with default headers
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut response = Self::default();
        response.set_json(status, body);
        response
    }

    /// Create an error response
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": message }))
    }

    /// Replace status and body, marking the body as JSON.
    pub fn set_json(&mut self, status: u16, body: Value) {
        self.status = status;
        self.body = body;
        self.set_header("content-type", "application/json".to_string());
    }

    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or update a header (case-insensitive name match)
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }
}

/// Captures of one chain midpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStep {
    pub action: ActionId,
    pub captures: Vec<String>,
}

/// Result of a successful match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionMatch {
    /// Leaf action that answers the request.
    pub action: ActionId,
    /// Chain midpoints in chain order; empty for flat paths.
    pub chain: Vec<ChainStep>,
    /// Positional arguments bound to the leaf.
    pub args: Vec<String>,
    /// Portion of the path consumed by the route itself (without arguments).
    pub matched_path: String,
    /// Name of the dispatch type that produced the match.
    pub dispatch_type: &'static str,
}

impl ActionMatch {
    /// All capture groups concatenated in chain order.
    #[must_use]
    pub fn captures(&self) -> Vec<String> {
        self.chain
            .iter()
            .flat_map(|step| step.captures.iter().cloned())
            .collect()
    }
}

/// Handle the transport keeps to signal that the client went away.
#[derive(Debug, Clone, Default)]
pub struct AbandonHandle(Arc<AtomicBool>);

impl AbandonHandle {
    pub fn abandon(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Request context shared by every hook and action of one dispatch.
///
/// Owned by the thread handling the request; hooks receive it by mutable
/// reference.
#[derive(Debug)]
pub struct Context {
    request: Request,
    response: Response,
    matched: Option<ActionMatch>,
    stash: HashMap<String, Value>,
    errors: Vec<String>,
    abandon: AbandonHandle,
}

impl Context {
    #[must_use]
    pub fn new(request: Request) -> Self {
        Self {
            request,
            response: Response::default(),
            matched: None,
            stash: HashMap::new(),
            errors: Vec::new(),
            abandon: AbandonHandle::default(),
        }
    }

    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }

    #[must_use]
    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    /// Consume the context, keeping only the response.
    #[must_use]
    pub fn into_response(self) -> Response {
        self.response
    }

    /// The match resolved for this request, if any.
    #[must_use]
    pub fn action_match(&self) -> Option<&ActionMatch> {
        self.matched.as_ref()
    }

    /// Leaf arguments of the current match (empty before matching).
    #[must_use]
    pub fn args(&self) -> &[String] {
        match &self.matched {
            Some(m) => &m.args,
            None => &[],
        }
    }

    /// All chain captures of the current match, in chain order.
    #[must_use]
    pub fn captures(&self) -> Vec<String> {
        self.matched
            .as_ref()
            .map(ActionMatch::captures)
            .unwrap_or_default()
    }

    pub(crate) fn set_match(&mut self, matched: ActionMatch) {
        self.matched = Some(matched);
    }

    #[must_use]
    pub fn stash(&self) -> &HashMap<String, Value> {
        &self.stash
    }

    pub fn stash_mut(&mut self) -> &mut HashMap<String, Value> {
        &mut self.stash
    }

    /// Errors recorded during dispatch.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn push_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Handle the transport keeps to abandon this request.
    #[must_use]
    pub fn abandon_handle(&self) -> AbandonHandle {
        self.abandon.clone()
    }

    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        self.abandon.is_abandoned()
    }
}
