use crate::dom::SelectorChain;

/// Where an affordance lives and how to recognize one that already exists.
#[derive(Debug, Clone)]
pub struct AffordanceSpec {
    /// Short name used in logs.
    pub key: &'static str,
    /// Marker class stamped on the injected node; the idempotency check
    /// queries for it before constructing anything.
    pub marker: String,
    /// Insertion anchors, tried in order. For per-container scope these are
    /// evaluated inside each container, falling back to the container itself.
    pub anchors: SelectorChain,
    pub scope: AffordanceScope,
}

#[derive(Debug, Clone)]
pub enum AffordanceScope {
    /// One instance in the whole document (the composer control).
    Global,
    /// One instance per matching container (the per-message button); each
    /// container transitions absent-to-present independently.
    PerContainer { containers: SelectorChain },
}

impl AffordanceSpec {
    pub fn marker_selector(&self) -> String {
        format!(".{}", self.marker)
    }
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// Every expected instance already existed; nothing was built.
    AlreadyPresent,
    /// This many instances were created.
    Created(usize),
    /// No anchor container exists yet; worth retrying soon.
    AnchorMissing,
}
