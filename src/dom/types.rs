use serde::{Deserialize, Serialize};

/// Opaque handle to a node in the host document. Handles can go stale at any
/// moment; holders must re-check with `HostDom::contains` after any await.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

/// Structural change notification forwarded from the host's mutation
/// observer. Url changes are detected by polling, not by event.
#[derive(Debug, Clone)]
pub enum DomEvent {
    NodesAdded(Vec<NodeId>),
    NodesRemoved(Vec<NodeId>),
    /// Pointer entered a message container; the host renders its action bar
    /// lazily, so this triggers a short probe.
    Hover(NodeId),
}

/// Visual state of an injected affordance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AffordanceState {
    Idle,
    Busy,
    Success,
    Error,
}
