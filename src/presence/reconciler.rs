use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::dom::{DomEvent, HostDom, NodeId};
use crate::presence::affordance::{AffordanceScope, AffordanceSpec, EnsureOutcome};

/// Trigger timings for one affordance's reconciliation loop.
#[derive(Debug, Clone)]
pub struct ReconcilerTimings {
    pub initial_delay_ms: u64,
    pub startup_retry_interval_ms: u64,
    pub max_startup_attempts: u32,
    pub heartbeat_ms: u64,
    pub mutation_settle_ms: u64,
    pub url_poll_interval_ms: u64,
    pub navigation_settle_ms: u64,
    pub hover_probe_delays_ms: Vec<u64>,
}

/// Maintains the invariant "affordance X is present" against a host that can
/// violate it at any time without notice. One idempotent reconciliation
/// routine, invoked from independent triggers: bounded startup retries,
/// structural-change notifications, an unbounded heartbeat, and url-change
/// polling. Redundant triggers are harmless because creation is cheap and
/// checks for an existing instance first.
pub struct Reconciler {
    dom: Arc<dyn HostDom>,
    spec: AffordanceSpec,
    timings: ReconcilerTimings,
}

impl Reconciler {
    pub fn new(dom: Arc<dyn HostDom>, spec: AffordanceSpec, timings: ReconcilerTimings) -> Self {
        Self { dom, spec, timings }
    }

    pub fn spec(&self) -> &AffordanceSpec {
        &self.spec
    }

    /// One synchronous reconciliation pass. Safe to call arbitrarily often:
    /// N calls on an unchanged document build at most one instance per site.
    pub fn ensure_present(&self) -> EnsureOutcome {
        match &self.spec.scope {
            AffordanceScope::Global => self.ensure_global(),
            AffordanceScope::PerContainer { containers } => {
                let nodes = containers.all_matches(self.dom.as_ref());
                if nodes.is_empty() {
                    return EnsureOutcome::AnchorMissing;
                }
                let created = nodes
                    .into_iter()
                    .filter(|c| self.ensure_in_container(*c))
                    .count();
                if created == 0 {
                    EnsureOutcome::AlreadyPresent
                } else {
                    tracing::debug!(affordance = self.spec.key, created, "instances created");
                    EnsureOutcome::Created(created)
                }
            }
        }
    }

    fn ensure_global(&self) -> EnsureOutcome {
        if self.dom.query(&self.spec.marker_selector()).is_some() {
            return EnsureOutcome::AlreadyPresent;
        }
        let Some(anchor) = self.spec.anchors.first_match(self.dom.as_ref()) else {
            return EnsureOutcome::AnchorMissing;
        };
        match self.dom.insert_marked(anchor, &self.spec.marker) {
            Some(node) => {
                tracing::debug!(affordance = self.spec.key, ?node, "instance created");
                EnsureOutcome::Created(1)
            }
            // The anchor vanished between lookup and insert; the next
            // trigger retries.
            None => EnsureOutcome::AnchorMissing,
        }
    }

    /// True when an instance was built in this container.
    fn ensure_in_container(&self, container: NodeId) -> bool {
        if self
            .dom
            .query_within(container, &self.spec.marker_selector())
            .is_some()
        {
            return false;
        }
        let anchor = self
            .spec
            .anchors
            .first_match_within(self.dom.as_ref(), container)
            .unwrap_or(container);
        self.dom.insert_marked(anchor, &self.spec.marker).is_some()
    }

    /// Remove every instance, then rebuild. Used when the affordance's
    /// contents (e.g. the custom-operation menu) went stale.
    pub fn rebuild(&self) -> EnsureOutcome {
        for node in self.dom.query_all(&self.spec.marker_selector()) {
            self.dom.remove_node(node);
        }
        self.ensure_present()
    }

    /// Hover probe: the host renders a container's action bar lazily, so one
    /// immediate pass is followed by a few short retries.
    async fn hover_probe(&self, hovered: NodeId) {
        let AffordanceScope::PerContainer { containers } = &self.spec.scope else {
            return;
        };
        let mut delays = self.timings.hover_probe_delays_ms.iter();
        loop {
            let found = containers.all_matches_within(self.dom.as_ref(), hovered);
            if !found.is_empty() {
                for container in found {
                    self.ensure_in_container(container);
                }
                return;
            }
            match delays.next() {
                Some(ms) => tokio::time::sleep(Duration::from_millis(*ms)).await,
                None => return,
            }
        }
    }

    /// Trigger loop. Runs until `stop` is set; every wake-up funnels into
    /// `ensure_present`.
    pub async fn run(
        self: Arc<Self>,
        mut events: mpsc::Receiver<DomEvent>,
        stop: Arc<AtomicBool>,
    ) {
        tokio::time::sleep(Duration::from_millis(self.timings.initial_delay_ms)).await;

        // Bounded startup retries while the anchor has not rendered yet.
        let mut attempts = 0u32;
        while !stop.load(Ordering::Relaxed) {
            match self.ensure_present() {
                EnsureOutcome::AnchorMissing if attempts < self.timings.max_startup_attempts => {
                    attempts += 1;
                    tokio::time::sleep(Duration::from_millis(
                        self.timings.startup_retry_interval_ms,
                    ))
                    .await;
                }
                outcome => {
                    if matches!(outcome, EnsureOutcome::AnchorMissing) {
                        tracing::warn!(
                            affordance = self.spec.key,
                            attempts,
                            "startup retries exhausted, relying on heartbeat"
                        );
                    }
                    break;
                }
            }
        }

        let mut heartbeat =
            tokio::time::interval(Duration::from_millis(self.timings.heartbeat_ms));
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut url_poll =
            tokio::time::interval(Duration::from_millis(self.timings.url_poll_interval_ms));
        url_poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut last_url = self.dom.current_url();

        loop {
            if stop.load(Ordering::Relaxed) {
                tracing::debug!(affordance = self.spec.key, "reconciler stopped");
                return;
            }
            tokio::select! {
                _ = heartbeat.tick() => {
                    self.ensure_present();
                }
                _ = url_poll.tick() => {
                    let url = self.dom.current_url();
                    if url != last_url {
                        tracing::debug!(affordance = self.spec.key, %url, "navigation detected");
                        last_url = url;
                        tokio::time::sleep(Duration::from_millis(
                            self.timings.navigation_settle_ms,
                        ))
                        .await;
                        self.ensure_present();
                    }
                }
                event = events.recv() => match event {
                    Some(DomEvent::NodesAdded(_)) | Some(DomEvent::NodesRemoved(_)) => {
                        tokio::time::sleep(Duration::from_millis(
                            self.timings.mutation_settle_ms,
                        ))
                        .await;
                        self.ensure_present();
                    }
                    Some(DomEvent::Hover(node)) => self.hover_probe(node).await,
                    None => {
                        tracing::debug!(affordance = self.spec.key, "event channel closed");
                        return;
                    }
                },
            }
        }
    }
}
