//! Chained dispatch (`Chained`, `PathPart`, `CaptureArgs`).
//!
//! Links form a forest: roots hang off `Chained('/')`, every other link names
//! its parent by private path. A midpoint consumes its path part and then its
//! captures; an endpoint consumes its path part and then its `Args`.
//!
//! Matching explores every chain that fits the request and keeps the best
//! endpoint by `(exact before unlimited, fewer args, declaration order)`. An
//! unlimited capture tries the longest slice first, so on a tie the chain that
//! captured more wins.

use super::{DispatchType, RouteListing};
use crate::action::meta::{method_allowed, methods_conflict, methods_label};
use crate::action::{Action, ActionId, ArgSpec, CaptureSpec, ChainParent, Route};
use crate::context::{ActionMatch, ChainStep};
use crate::error::ConfigError;
use crate::path;
use http::Method;
use std::collections::{HashMap, VecDeque};
use tracing::{debug, warn};

const NAME: &str = "Chained";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkKind {
    Midpoint(CaptureSpec),
    Endpoint(ArgSpec),
}

#[derive(Debug, Clone)]
struct ChainLink {
    action: ActionId,
    private_path: String,
    parent: ChainParent,
    part: Vec<String>,
    kind: LinkKind,
    methods: Option<Vec<Method>>,
    children: Vec<usize>,
}

/// Best endpoint found so far during a walk.
struct Candidate {
    key: (u8, usize, usize),
    steps: Vec<ChainStep>,
    leaf: usize,
    args_from: usize,
    matched_to: usize,
}

/// Dispatch type for chains of actions.
#[derive(Debug)]
pub struct ChainedDispatchType {
    /// Links in declaration order; indices are stable
    links: Vec<ChainLink>,
    roots: Vec<usize>,
    by_private_path: HashMap<String, usize>,
    by_action: HashMap<ActionId, usize>,
    low_precedence: bool,
}

impl Default for ChainedDispatchType {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainedDispatchType {
    /// Chained dispatch with low precedence.
    #[must_use]
    pub fn new() -> Self {
        Self {
            links: Vec::new(),
            roots: Vec::new(),
            by_private_path: HashMap::new(),
            by_action: HashMap::new(),
            low_precedence: true,
        }
    }

    /// Override the precedence class.
    #[must_use]
    pub fn with_low_precedence(mut self, low: bool) -> Self {
        self.low_precedence = low;
        self
    }

    /// Number of registered links (midpoints and endpoints).
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Link indices from the root down to `idx`.
    fn ancestry(&self, idx: usize) -> Vec<usize> {
        let mut lineage = vec![idx];
        let mut current = idx;
        while let ChainParent::Action(parent) = &self.links[current].parent {
            match self.by_private_path.get(parent) {
                Some(&p) if !lineage.contains(&p) => {
                    lineage.push(p);
                    current = p;
                }
                _ => break,
            }
        }
        lineage.reverse();
        lineage
    }

    fn same_slot(a: &ChainLink, b: &ChainLink) -> bool {
        a.part == b.part
            && a.kind == b.kind
            && methods_conflict(a.methods.as_deref(), b.methods.as_deref())
    }

    fn check_siblings(&self, siblings: &[usize]) -> Result<(), ConfigError> {
        for (i, &a) in siblings.iter().enumerate() {
            for &b in &siblings[i + 1..] {
                if Self::same_slot(&self.links[a], &self.links[b]) {
                    let ancestry = self.ancestry(b);
                    return Err(ConfigError::DuplicatePath {
                        dispatch_type: NAME.to_string(),
                        path: self.pattern(&ancestry),
                        existing: self.links[a].private_path.clone(),
                        action: self.links[b].private_path.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Display pattern for a chain, e.g. `/users/*/view/*`.
    fn pattern(&self, ancestry: &[usize]) -> String {
        let mut parts: Vec<String> = Vec::new();
        for &idx in ancestry {
            let link = &self.links[idx];
            parts.extend(link.part.iter().cloned());
            let count = match link.kind {
                LinkKind::Midpoint(CaptureSpec::Exact(n)) | LinkKind::Endpoint(ArgSpec::Exact(n)) => n,
                LinkKind::Midpoint(CaptureSpec::Unlimited) | LinkKind::Endpoint(ArgSpec::Unlimited) => {
                    parts.push("...".to_string());
                    0
                }
            };
            parts.extend((0..count).map(|_| "*".to_string()));
        }
        format!("/{}", parts.join("/"))
    }

    fn walk(
        &self,
        idx: usize,
        segments: &[&str],
        pos: usize,
        method: &Method,
        steps: &mut Vec<ChainStep>,
        best: &mut Option<Candidate>,
    ) {
        let link = &self.links[idx];
        let end = pos + link.part.len();
        if end > segments.len()
            || !segments[pos..end]
                .iter()
                .zip(&link.part)
                .all(|(seg, part)| *seg == part)
        {
            return;
        }

        match link.kind {
            LinkKind::Endpoint(args) => {
                let remaining = segments.len() - end;
                if !args.accepts(remaining) || !method_allowed(link.methods.as_deref(), method) {
                    return;
                }
                let key = (args.specificity().0, remaining, idx);
                if best.as_ref().map_or(true, |b| key < b.key) {
                    *best = Some(Candidate {
                        key,
                        steps: steps.clone(),
                        leaf: idx,
                        args_from: end,
                        matched_to: end,
                    });
                }
            }
            LinkKind::Midpoint(captures) => {
                let available = segments.len() - end;
                let widths: Vec<usize> = match captures {
                    CaptureSpec::Exact(n) if n <= available => vec![n],
                    CaptureSpec::Exact(_) => Vec::new(),
                    CaptureSpec::Unlimited => (0..=available).rev().collect(),
                };
                for width in widths {
                    steps.push(ChainStep {
                        action: link.action,
                        captures: segments[end..end + width]
                            .iter()
                            .map(|s| path::decode_segment(s))
                            .collect(),
                    });
                    for &child in &link.children {
                        self.walk(child, segments, end + width, method, steps, best);
                    }
                    steps.pop();
                }
            }
        }
    }
}

impl DispatchType for ChainedDispatchType {
    fn name(&self) -> &'static str {
        NAME
    }

    fn register_action(&mut self, action: &Action) -> Result<bool, ConfigError> {
        let Route::Chained {
            parent,
            path_part,
            captures,
        } = action.route()
        else {
            return Ok(false);
        };

        let kind = match captures {
            Some(spec) => LinkKind::Midpoint(*spec),
            None => LinkKind::Endpoint(action.meta().effective_args()),
        };
        let idx = self.links.len();
        debug!(
            action = %action.private_path(),
            parent = ?parent,
            path_part = %path_part,
            kind = ?kind,
            "Chain link registered"
        );
        self.links.push(ChainLink {
            action: action.id(),
            private_path: action.private_path().to_string(),
            parent: parent.clone(),
            part: path::segments(path_part)
                .into_iter()
                .map(str::to_string)
                .collect(),
            kind,
            methods: action.meta().methods.clone(),
            children: Vec::new(),
        });
        self.by_private_path
            .insert(action.private_path().to_string(), idx);
        self.by_action.insert(action.id(), idx);
        Ok(true)
    }

    /// Link every action to its parent and validate the forest.
    fn finalize(&mut self) -> Result<(), ConfigError> {
        self.roots.clear();
        for link in &mut self.links {
            link.children.clear();
        }

        for idx in 0..self.links.len() {
            match self.links[idx].parent.clone() {
                ChainParent::Root => self.roots.push(idx),
                ChainParent::Action(parent) => {
                    let Some(&p) = self.by_private_path.get(&parent) else {
                        return Err(ConfigError::UnknownChainParent {
                            action: self.links[idx].private_path.clone(),
                            parent,
                        });
                    };
                    if matches!(self.links[p].kind, LinkKind::Endpoint(_)) {
                        return Err(ConfigError::ChainedFromEndpoint {
                            action: self.links[idx].private_path.clone(),
                            parent,
                        });
                    }
                    self.links[p].children.push(idx);
                }
            }
        }

        let mut reached = vec![false; self.links.len()];
        let mut queue: VecDeque<usize> = self.roots.iter().copied().collect();
        while let Some(idx) = queue.pop_front() {
            if std::mem::replace(&mut reached[idx], true) {
                continue;
            }
            queue.extend(self.links[idx].children.iter().copied());
        }
        if let Some(idx) = reached.iter().position(|r| !r) {
            return Err(ConfigError::UnreachableChain {
                action: self.links[idx].private_path.clone(),
            });
        }

        self.check_siblings(&self.roots)?;
        for idx in 0..self.links.len() {
            self.check_siblings(&self.links[idx].children)?;
        }

        for link in &self.links {
            if matches!(link.kind, LinkKind::Midpoint(_)) && link.children.is_empty() {
                warn!(
                    action = %link.private_path,
                    "Chain midpoint has no children and can never match"
                );
            }
        }

        debug!(
            links = self.links.len(),
            roots = self.roots.len(),
            "Chains finalized"
        );
        Ok(())
    }

    fn resolve(&self, method: &Method, request_path: &str) -> Option<ActionMatch> {
        let segments = path::segments(request_path);
        let mut steps = Vec::new();
        let mut best = None;
        for &root in &self.roots {
            self.walk(root, &segments, 0, method, &mut steps, &mut best);
        }

        best.map(|c| ActionMatch {
            action: self.links[c.leaf].action,
            chain: c.steps,
            args: segments[c.args_from..]
                .iter()
                .map(|s| path::decode_segment(s))
                .collect(),
            matched_path: segments[..c.matched_to].join("/"),
            dispatch_type: NAME,
        })
    }

    fn list(&self) -> Vec<RouteListing> {
        self.links
            .iter()
            .enumerate()
            .filter_map(|(idx, link)| match link.kind {
                LinkKind::Endpoint(args) => Some((idx, link, args)),
                LinkKind::Midpoint(_) => None,
            })
            .map(|(idx, link, args)| {
                let ancestry = self.ancestry(idx);
                RouteListing {
                    dispatch_type: NAME,
                    path: self.pattern(&ancestry),
                    args: args.to_string(),
                    methods: methods_label(link.methods.as_deref()),
                    action: link.private_path.clone(),
                    chain: ancestry[..ancestry.len() - 1]
                        .iter()
                        .map(|&i| self.links[i].private_path.clone())
                        .collect(),
                }
            })
            .collect()
    }

    /// Build `/part/capture/.../part` for an endpoint. Captures are consumed by
    /// midpoints in chain order; an unlimited midpoint takes the surplus.
    fn uri_for_action(&self, action: &Action, captures: &[String]) -> Option<String> {
        let &idx = self.by_action.get(&action.id())?;
        if !matches!(self.links[idx].kind, LinkKind::Endpoint(_)) {
            return None;
        }
        let ancestry = self.ancestry(idx);

        let mut fixed = 0usize;
        let mut unlimited = 0usize;
        for &i in &ancestry {
            match self.links[i].kind {
                LinkKind::Midpoint(CaptureSpec::Exact(n)) => fixed += n,
                LinkKind::Midpoint(CaptureSpec::Unlimited) => unlimited += 1,
                LinkKind::Endpoint(_) => {}
            }
        }
        if captures.len() < fixed || (unlimited == 0 && captures.len() != fixed) {
            return None;
        }
        let mut surplus = captures.len() - fixed;

        let mut parts: Vec<String> = Vec::new();
        let mut next = captures.iter();
        for &i in &ancestry {
            let link = &self.links[i];
            parts.extend(link.part.iter().cloned());
            let take = match link.kind {
                LinkKind::Midpoint(CaptureSpec::Exact(n)) => n,
                LinkKind::Midpoint(CaptureSpec::Unlimited) => std::mem::take(&mut surplus),
                LinkKind::Endpoint(_) => 0,
            };
            parts.extend(
                next.by_ref()
                    .take(take)
                    .map(|c| urlencoding::encode(c).into_owned()),
            );
        }
        Some(format!("/{}", parts.join("/")))
    }

    fn is_low_precedence(&self) -> bool {
        self.low_precedence
    }
}
