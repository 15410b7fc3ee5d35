pub mod memory;
pub mod selectors;
pub mod types;

pub use selectors::SelectorChain;
pub use types::{AffordanceState, DomEvent, NodeId};

/// Access seam to the host document. All operations are synchronous and
/// non-suspending; every lookup tolerates absence because the host
/// application re-renders, replaces, and unmounts subtrees without notice.
pub trait HostDom: Send + Sync {
    fn query(&self, selector: &str) -> Option<NodeId>;
    fn query_all(&self, selector: &str) -> Vec<NodeId>;
    fn query_within(&self, root: NodeId, selector: &str) -> Option<NodeId>;
    fn query_all_within(&self, root: NodeId, selector: &str) -> Vec<NodeId>;
    /// Nearest ancestor (or the node itself) matching the selector.
    fn closest(&self, node: NodeId, selector: &str) -> Option<NodeId>;
    /// Whether the node is still attached to the live document.
    fn contains(&self, node: NodeId) -> bool;

    /// Concatenated text of the node's subtree.
    fn text_content(&self, node: NodeId) -> String;
    /// Text of the node's per-line paragraph children, one entry per line.
    /// Empty for nodes that are not a paragraph-structured rich editor.
    fn paragraph_texts(&self, node: NodeId) -> Vec<String>;

    /// Append a marker-classed child (an affordance) under `parent`.
    fn insert_marked(&self, parent: NodeId, marker: &str) -> Option<NodeId>;
    fn remove_node(&self, node: NodeId);

    /// Replace the node's content through the rich-editor API.
    /// Returns false when the editor API is unavailable for this node.
    fn set_text(&self, node: NodeId, text: &str) -> bool;
    /// Select-all-and-insert emulation fallback.
    fn set_text_emulated(&self, node: NodeId, text: &str) -> bool;
    fn move_cursor_to_end(&self, node: NodeId);

    fn set_affordance_state(&self, node: NodeId, state: AffordanceState);
    /// Append a dismissible summary block under a message.
    fn append_summary_block(&self, message: NodeId, marker: &str, summary: &str)
        -> Option<NodeId>;

    fn current_url(&self) -> String;
}
