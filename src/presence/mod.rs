pub mod affordance;
pub mod reconciler;

pub use affordance::{AffordanceScope, AffordanceSpec, EnsureOutcome};
pub use reconciler::{Reconciler, ReconcilerTimings};
