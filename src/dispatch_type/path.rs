//! Flat-path dispatch (`Path`, `Local`, `Global`).
//!
//! Lookup walks the request segments from the full path down to the root and
//! stops at the longest prefix that has a registered action accepting the
//! remaining segment count. Candidates registered on the same path are kept
//! sorted by specificity:
//!
//! 1. exact `Args(N)` in ascending N
//! 2. unlimited / slurpy
//! 3. method-restricted before unrestricted
//! 4. declaration order

use super::{DispatchType, RouteListing};
use crate::action::meta::{method_allowed, methods_conflict, methods_label};
use crate::action::{Action, ActionId, ArgSpec, Route};
use crate::context::ActionMatch;
use crate::error::ConfigError;
use crate::path;
use http::Method;
use std::collections::HashMap;
use tracing::debug;

const NAME: &str = "Path";

#[derive(Debug, Clone)]
struct PathEntry {
    action: ActionId,
    private_path: String,
    args: ArgSpec,
    methods: Option<Vec<Method>>,
    order: usize,
}

impl PathEntry {
    fn sort_key(&self) -> ((u8, usize), bool, usize) {
        (self.args.specificity(), self.methods.is_none(), self.order)
    }
}

/// Dispatch type for flat paths.
#[derive(Debug, Default)]
pub struct PathDispatchType {
    /// Canonical path → candidates in matching order
    paths: HashMap<String, Vec<PathEntry>>,
    by_action: HashMap<ActionId, String>,
    registered: usize,
}

impl PathDispatchType {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registered
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registered == 0
    }
}

impl DispatchType for PathDispatchType {
    fn name(&self) -> &'static str {
        NAME
    }

    fn register_action(&mut self, action: &Action) -> Result<bool, ConfigError> {
        let Route::Path(route_path) = action.route() else {
            return Ok(false);
        };

        let entry = PathEntry {
            action: action.id(),
            private_path: action.private_path().to_string(),
            args: action.meta().effective_args(),
            methods: action.meta().methods.clone(),
            order: self.registered,
        };

        let candidates = self.paths.entry(route_path.clone()).or_default();
        if let Some(existing) = candidates.iter().find(|e| {
            e.args == entry.args && methods_conflict(e.methods.as_deref(), entry.methods.as_deref())
        }) {
            return Err(ConfigError::DuplicatePath {
                dispatch_type: NAME.to_string(),
                path: format!("/{route_path}"),
                existing: existing.private_path.clone(),
                action: entry.private_path,
            });
        }

        debug!(
            path = %format!("/{route_path}"),
            action = %entry.private_path,
            args = %entry.args,
            "Path registered"
        );
        candidates.push(entry);
        candidates.sort_by_key(PathEntry::sort_key);
        self.by_action.insert(action.id(), route_path.clone());
        self.registered += 1;
        Ok(true)
    }

    fn resolve(&self, method: &Method, request_path: &str) -> Option<ActionMatch> {
        let segments = path::segments(request_path);
        for depth in (0..=segments.len()).rev() {
            let prefix = segments[..depth].join("/");
            let Some(candidates) = self.paths.get(&prefix) else {
                continue;
            };
            let residual = segments.len() - depth;
            let hit = candidates
                .iter()
                .find(|e| e.args.accepts(residual) && method_allowed(e.methods.as_deref(), method));
            if let Some(entry) = hit {
                return Some(ActionMatch {
                    action: entry.action,
                    chain: Vec::new(),
                    args: segments[depth..]
                        .iter()
                        .map(|s| path::decode_segment(s))
                        .collect(),
                    matched_path: prefix,
                    dispatch_type: NAME,
                });
            }
        }
        None
    }

    fn list(&self) -> Vec<RouteListing> {
        let mut paths: Vec<(&String, &Vec<PathEntry>)> = self.paths.iter().collect();
        paths.sort_by(|a, b| a.0.cmp(b.0));
        paths
            .into_iter()
            .flat_map(|(route_path, candidates)| {
                candidates.iter().map(move |e| RouteListing {
                    dispatch_type: NAME,
                    path: format!("/{route_path}"),
                    args: e.args.to_string(),
                    methods: methods_label(e.methods.as_deref()),
                    action: e.private_path.clone(),
                    chain: Vec::new(),
                })
            })
            .collect()
    }

    fn uri_for_action(&self, action: &Action, captures: &[String]) -> Option<String> {
        if !captures.is_empty() {
            return None;
        }
        self.by_action
            .get(&action.id())
            .map(|route_path| format!("/{route_path}"))
    }
}
