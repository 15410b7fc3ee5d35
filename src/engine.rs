//! Composition root: wires the store, presence reconcilers, dispatcher, and
//! provider registry together and exposes the small set of entry points the
//! host glue calls (compose action, summarize, settings, DOM notifications).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::AppConfig;
use crate::dom::{DomEvent, HostDom, NodeId, SelectorChain};
use crate::executor::dispatcher::{ActionDispatcher, DispatchOutcome, DispatchRecord};
use crate::executor::prompts::ComposeMode;
use crate::keyboard::{is_settings_chord, KeyChord};
use crate::llm::registry::ProviderRegistry;
use crate::presence::{AffordanceScope, AffordanceSpec, EnsureOutcome, Reconciler, ReconcilerTimings};
use crate::settings::SettingsController;
use crate::store::{KeyValueBackend, PreferenceStore};

pub struct Engine {
    dom: Arc<dyn HostDom>,
    store: Arc<PreferenceStore>,
    registry: Arc<ProviderRegistry>,
    dispatcher: Arc<ActionDispatcher>,
    composer: Arc<Reconciler>,
    messages: Arc<Reconciler>,
    message_container_chain: SelectorChain,
    composer_marker_selector: String,
}

impl Engine {
    pub fn bootstrap(
        dom: Arc<dyn HostDom>,
        backend: Arc<dyn KeyValueBackend>,
        config: AppConfig,
    ) -> Self {
        let store = Arc::new(PreferenceStore::new(backend));
        let registry = Arc::new(ProviderRegistry::from_config(&config));

        let dispatcher = Arc::new(ActionDispatcher::new(
            dom.clone(),
            store.clone(),
            registry.clone(),
            SelectorChain::from(config.selectors.message_input.clone()),
            SelectorChain::from(config.selectors.message_text.clone()),
            config.ui.clone(),
        ));

        let presence = &config.presence;
        let composer = Arc::new(Reconciler::new(
            dom.clone(),
            AffordanceSpec {
                key: "composer-control",
                marker: config.ui.composer_marker.clone(),
                anchors: SelectorChain::from(config.selectors.composer_anchor.clone()),
                scope: AffordanceScope::Global,
            },
            ReconcilerTimings {
                initial_delay_ms: presence.initial_delay_ms,
                startup_retry_interval_ms: presence.startup_retry_interval_ms,
                max_startup_attempts: presence.max_startup_attempts,
                heartbeat_ms: presence.composer_heartbeat_ms,
                mutation_settle_ms: presence.composer_mutation_settle_ms,
                url_poll_interval_ms: presence.url_poll_interval_ms,
                navigation_settle_ms: presence.navigation_settle_ms,
                hover_probe_delays_ms: presence.hover_probe_delays_ms.clone(),
            },
        ));

        let messages = Arc::new(Reconciler::new(
            dom.clone(),
            AffordanceSpec {
                key: "message-button",
                marker: config.ui.message_marker.clone(),
                anchors: SelectorChain::from(config.selectors.message_actions_group.clone()),
                scope: AffordanceScope::PerContainer {
                    containers: SelectorChain::from(config.selectors.message_actions.clone()),
                },
            },
            ReconcilerTimings {
                initial_delay_ms: presence.initial_delay_ms,
                startup_retry_interval_ms: presence.startup_retry_interval_ms,
                max_startup_attempts: presence.max_startup_attempts,
                heartbeat_ms: presence.message_heartbeat_ms,
                mutation_settle_ms: presence.message_mutation_settle_ms,
                url_poll_interval_ms: presence.url_poll_interval_ms,
                navigation_settle_ms: presence.navigation_settle_ms,
                hover_probe_delays_ms: presence.hover_probe_delays_ms.clone(),
            },
        ));

        Self {
            dom,
            store,
            registry,
            dispatcher,
            composer,
            messages,
            message_container_chain: SelectorChain::from(config.selectors.message_container.clone()),
            composer_marker_selector: format!(".{}", config.ui.composer_marker),
        }
    }

    /// Spawn the reconciler trigger loops. The returned handle feeds them
    /// mutation notifications and stops them.
    pub fn start(&self) -> EngineHandle {
        let stop = Arc::new(AtomicBool::new(false));
        let (composer_tx, composer_rx) = mpsc::channel(32);
        let (message_tx, message_rx) = mpsc::channel(32);

        let tasks = vec![
            tokio::spawn(self.composer.clone().run(composer_rx, stop.clone())),
            tokio::spawn(self.messages.clone().run(message_rx, stop.clone())),
        ];
        tracing::info!("presence reconcilers running");

        EngineHandle {
            stop,
            composer_tx,
            message_tx,
            tasks,
        }
    }

    /// One synchronous reconciliation pass over both affordances, outside
    /// the trigger loops. Idempotent.
    pub fn ensure_affordances(&self) -> (EnsureOutcome, EnsureOutcome) {
        (self.composer.ensure_present(), self.messages.ensure_present())
    }

    /// Tear down and rebuild the composer control; used after custom
    /// operations change so the menu reflects the current list.
    pub fn refresh_composer(&self) -> EnsureOutcome {
        self.composer.rebuild()
    }

    /// Entry point for the composer control's primary action and menu.
    pub async fn compose_action(&self, mode: ComposeMode) -> DispatchRecord {
        let Some(affordance) = self.dom.query(&self.composer_marker_selector) else {
            tracing::warn!("compose action triggered without a composer control");
            return DispatchRecord::new(
                format!("transform:{}", mode.id()),
                DispatchOutcome::Skipped("composer control not present"),
            );
        };
        self.dispatcher.transform_draft(affordance, mode).await
    }

    /// Entry point for a per-message button click. The clicked button
    /// resolves to its enclosing message container.
    pub async fn summarize(&self, button: NodeId) -> DispatchRecord {
        let Some(message) = self.message_container_chain.closest(self.dom.as_ref(), button)
        else {
            tracing::warn!("summarize button outside any known message container");
            return DispatchRecord::new(
                "summarize",
                DispatchOutcome::Skipped("message container not found"),
            );
        };
        self.dispatcher.summarize_message(button, message).await
    }

    /// True when the chord should toggle the settings surface.
    pub fn handle_key(&self, chord: &KeyChord) -> bool {
        is_settings_chord(chord)
    }

    pub fn settings(&self) -> SettingsController {
        SettingsController::new(self.store.clone(), self.registry.clone())
    }

    pub fn store(&self) -> &Arc<PreferenceStore> {
        &self.store
    }
}

/// Live handle to a started engine: mutation-event intake plus shutdown.
pub struct EngineHandle {
    stop: Arc<AtomicBool>,
    composer_tx: mpsc::Sender<DomEvent>,
    message_tx: mpsc::Sender<DomEvent>,
    tasks: Vec<JoinHandle<()>>,
}

impl EngineHandle {
    /// Forward a structural notification to both reconcilers. Dropped events
    /// are harmless; the heartbeat re-asserts presence regardless.
    pub async fn notify(&self, event: DomEvent) {
        let _ = self.composer_tx.send(event.clone()).await;
        let _ = self.message_tx.send(event).await;
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub async fn shutdown(self) {
        self.stop();
        for task in self.tasks {
            task.abort();
            let _ = task.await;
        }
    }
}
