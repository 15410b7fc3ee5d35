use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::dom::{HostDom, NodeId};

/// An ordered list of selector strategies evaluated lazily; the first
/// structural match wins. Chains are data (config), not inline branching, so
/// host-DOM drift is absorbed without touching dispatch logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorChain(Vec<String>);

impl SelectorChain {
    pub fn new<I, S>(selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(selectors.into_iter().map(Into::into).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first_match(&self, dom: &dyn HostDom) -> Option<NodeId> {
        self.0.iter().find_map(|s| dom.query(s))
    }

    pub fn first_match_within(&self, dom: &dyn HostDom, root: NodeId) -> Option<NodeId> {
        self.0.iter().find_map(|s| dom.query_within(root, s))
    }

    /// Every node matched by any selector in the chain, deduplicated,
    /// preserving chain order.
    pub fn all_matches(&self, dom: &dyn HostDom) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for selector in &self.0 {
            for node in dom.query_all(selector) {
                if seen.insert(node) {
                    out.push(node);
                }
            }
        }
        out
    }

    pub fn all_matches_within(&self, dom: &dyn HostDom, root: NodeId) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for selector in &self.0 {
            for node in dom.query_all_within(root, selector) {
                if seen.insert(node) {
                    out.push(node);
                }
            }
        }
        out
    }

    pub fn closest(&self, dom: &dyn HostDom, node: NodeId) -> Option<NodeId> {
        self.0.iter().find_map(|s| dom.closest(node, s))
    }
}

impl From<Vec<String>> for SelectorChain {
    fn from(selectors: Vec<String>) -> Self {
        Self(selectors)
    }
}
