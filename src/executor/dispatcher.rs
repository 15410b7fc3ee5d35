use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::UiConfig;
use crate::dom::{AffordanceState, HostDom, NodeId, SelectorChain};
use crate::errors::SparkResult;
use crate::executor::draft::{self, DraftOutcome};
use crate::executor::prompts::{self, ComposeMode};
use crate::llm::registry::ProviderSource;
use crate::llm::types::{ChatMessage, GenerationOptions};
use crate::store::PreferenceStore;

/// Summaries are pointless below this much source text; shorter extractions
/// abort before any provider call.
const MIN_SUMMARY_CHARS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The result was written back into the host page.
    Applied,
    /// Expected transient condition; aborted silently, logged only.
    Skipped(&'static str),
    /// Configuration or provider failure, surfaced on the affordance.
    Failed(String),
}

/// Diagnostic record of one dispatch, returned to the embedding for logging.
#[derive(Debug, Clone)]
pub struct DispatchRecord {
    pub action: String,
    pub outcome: DispatchOutcome,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl DispatchRecord {
    pub(crate) fn new(action: impl Into<String>, outcome: DispatchOutcome) -> Self {
        Self {
            action: action.into(),
            outcome,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Orchestrates one user-triggered text operation end to end: locate input
/// text, build the provider request, invoke it, apply the result, and keep
/// the affordance's visual state on the idle/busy/success/error lifecycle.
/// Nothing thrown here ever escapes to the host page.
pub struct ActionDispatcher {
    dom: Arc<dyn HostDom>,
    store: Arc<PreferenceStore>,
    providers: Arc<dyn ProviderSource>,
    input_chain: SelectorChain,
    message_text_chain: SelectorChain,
    ui: UiConfig,
    /// Per-affordance busy guard; the only defense against re-triggering the
    /// same affordance mid-flight. Different affordances run concurrently.
    busy: Arc<Mutex<HashSet<NodeId>>>,
}

impl ActionDispatcher {
    pub fn new(
        dom: Arc<dyn HostDom>,
        store: Arc<PreferenceStore>,
        providers: Arc<dyn ProviderSource>,
        input_chain: SelectorChain,
        message_text_chain: SelectorChain,
        ui: UiConfig,
    ) -> Self {
        Self {
            dom,
            store,
            providers,
            input_chain,
            message_text_chain,
            ui,
            busy: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Summarize a message in place: extract its displayed text, ask the
    /// active provider for a summary, and append it as a dismissible block
    /// (replacing any earlier summary for the same message).
    pub async fn summarize_message(&self, affordance: NodeId, message: NodeId) -> DispatchRecord {
        let action = "summarize";
        if !self.begin(affordance) {
            return DispatchRecord::new(action, DispatchOutcome::Skipped("affordance busy"));
        }
        self.dom.set_affordance_state(affordance, AffordanceState::Busy);

        let text = self.extract_message_text(message);
        let text = text.trim();
        if text.chars().count() < MIN_SUMMARY_CHARS {
            tracing::debug!(action, len = text.len(), "message too short, skipping");
            self.finish_silent(affordance);
            return DispatchRecord::new(action, DispatchOutcome::Skipped("message too short"));
        }

        let language = self.store.summarization_language();
        let messages = prompts::summary_messages(text, &language);
        match self.generate(&messages, prompts::summary_options()).await {
            Ok(summary) => {
                // The flight may have outlived the message; never mutate a
                // node that has left the document.
                if !self.dom.contains(message) {
                    tracing::debug!(action, "message removed during flight");
                    self.finish_silent(affordance);
                    return DispatchRecord::new(
                        action,
                        DispatchOutcome::Skipped("message removed during flight"),
                    );
                }
                let marker_selector = format!(".{}", self.ui.summary_marker);
                if let Some(previous) = self.dom.query_within(message, &marker_selector) {
                    self.dom.remove_node(previous);
                }
                self.dom
                    .append_summary_block(message, &self.ui.summary_marker, &summary);
                self.finish(affordance, AffordanceState::Success);
                DispatchRecord::new(action, DispatchOutcome::Applied)
            }
            Err(e) => {
                tracing::error!(action, error = %e, "summarize failed");
                self.finish(affordance, AffordanceState::Error);
                DispatchRecord::new(action, DispatchOutcome::Failed(e.to_string()))
            }
        }
    }

    /// Rewrite the in-progress draft with a built-in or user-defined
    /// transformation and put the result back into the compose box.
    pub async fn transform_draft(&self, affordance: NodeId, mode: ComposeMode) -> DispatchRecord {
        let action = format!("transform:{}", mode.id());
        if !self.begin(affordance) {
            return DispatchRecord::new(action, DispatchOutcome::Skipped("affordance busy"));
        }
        self.dom.set_affordance_state(affordance, AffordanceState::Busy);

        let (input, text) = match draft::extract_draft(self.dom.as_ref(), &self.input_chain) {
            DraftOutcome::Text { input, text } => (input, text),
            DraftOutcome::Empty => {
                tracing::debug!(%action, "draft is empty, skipping");
                self.finish_silent(affordance);
                return DispatchRecord::new(action, DispatchOutcome::Skipped("draft is empty"));
            }
            DraftOutcome::MissingInput => {
                tracing::warn!(%action, "no message input found");
                self.finish_silent(affordance);
                return DispatchRecord::new(
                    action,
                    DispatchOutcome::Skipped("no message input found"),
                );
            }
        };

        let prompt = match &mode {
            ComposeMode::Builtin(transform) => prompts::builtin_user_prompt(*transform, &text),
            ComposeMode::Custom(id) => match self.store.find_custom_operation(id) {
                Some(operation) => prompts::custom_user_prompt(&operation, &text),
                None => {
                    tracing::error!(%action, id, "custom operation not found");
                    self.finish(affordance, AffordanceState::Error);
                    return DispatchRecord::new(
                        action,
                        DispatchOutcome::Failed("Custom operation not found".to_string()),
                    );
                }
            },
        };

        let messages = [ChatMessage::user(prompt)];
        match self.generate(&messages, prompts::transform_options()).await {
            Ok(replacement) => {
                if !self.dom.contains(input) {
                    tracing::debug!(%action, "input removed during flight");
                    self.finish_silent(affordance);
                    return DispatchRecord::new(
                        action,
                        DispatchOutcome::Skipped("input removed during flight"),
                    );
                }
                self.apply_draft(input, &replacement).await;
                self.finish(affordance, AffordanceState::Success);
                DispatchRecord::new(action, DispatchOutcome::Applied)
            }
            Err(e) => {
                tracing::error!(%action, error = %e, "transform failed");
                self.finish(affordance, AffordanceState::Error);
                DispatchRecord::new(action, DispatchOutcome::Failed(e.to_string()))
            }
        }
    }

    fn extract_message_text(&self, message: NodeId) -> String {
        self.message_text_chain
            .first_match_within(self.dom.as_ref(), message)
            .map(|content| self.dom.text_content(content))
            .unwrap_or_else(|| self.dom.text_content(message))
    }

    async fn generate(
        &self,
        messages: &[ChatMessage],
        options: GenerationOptions,
    ) -> SparkResult<String> {
        let provider = self.providers.active(&self.store)?;
        provider.generate(messages, &options).await
    }

    /// Prefer the rich-editor replacement; fall back to select-all-and-insert
    /// emulation with a settle delay, then park the cursor at the end.
    async fn apply_draft(&self, input: NodeId, text: &str) {
        if !self.dom.set_text(input, text) {
            tokio::time::sleep(Duration::from_millis(self.ui.insert_settle_ms)).await;
            self.dom.set_text_emulated(input, text);
        }
        self.dom.move_cursor_to_end(input);
    }

    fn begin(&self, affordance: NodeId) -> bool {
        self.busy.lock().unwrap().insert(affordance)
    }

    /// Silent abort path: straight back to idle, no glyph.
    fn finish_silent(&self, affordance: NodeId) {
        self.dom.set_affordance_state(affordance, AffordanceState::Idle);
        self.busy.lock().unwrap().remove(&affordance);
    }

    /// Show the outcome glyph, then auto-revert to idle after the configured
    /// display interval. The revert re-checks that the node still exists.
    fn finish(&self, affordance: NodeId, state: AffordanceState) {
        self.dom.set_affordance_state(affordance, state);
        let dom = self.dom.clone();
        let busy = self.busy.clone();
        let revert_ms = self.ui.state_revert_ms;
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(revert_ms)).await;
            if dom.contains(affordance) {
                dom.set_affordance_state(affordance, AffordanceState::Idle);
            }
            busy.lock().unwrap().remove(&affordance);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::dom::memory::MemoryDom;
    use crate::errors::SparkError;
    use crate::executor::prompts::BuiltinTransform;
    use crate::llm::provider::LlmProvider;
    use crate::store::{MemoryBackend, PreferenceStore};

    #[derive(Clone)]
    enum StubBehavior {
        Reply(String),
        Fail(String),
        Slow(String, u64),
    }

    struct StubProvider {
        behavior: StubBehavior,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl LlmProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        async fn generate(
            &self,
            _messages: &[ChatMessage],
            _options: &GenerationOptions,
        ) -> SparkResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                StubBehavior::Reply(text) => Ok(text.clone()),
                StubBehavior::Fail(message) => Err(SparkError::Provider(message.clone())),
                StubBehavior::Slow(text, ms) => {
                    tokio::time::sleep(Duration::from_millis(*ms)).await;
                    Ok(text.clone())
                }
            }
        }
    }

    struct StubSource {
        behavior: StubBehavior,
        calls: Arc<AtomicUsize>,
    }

    impl StubSource {
        fn new(behavior: StubBehavior) -> (Arc<Self>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Arc::new(Self {
                    behavior,
                    calls: calls.clone(),
                }),
                calls,
            )
        }
    }

    impl ProviderSource for StubSource {
        fn active(&self, _store: &PreferenceStore) -> SparkResult<Box<dyn LlmProvider>> {
            Ok(Box::new(StubProvider {
                behavior: self.behavior.clone(),
                calls: self.calls.clone(),
            }))
        }
    }

    struct Fixture {
        dom: Arc<MemoryDom>,
        dispatcher: Arc<ActionDispatcher>,
        store: Arc<PreferenceStore>,
        affordance: NodeId,
    }

    fn fixture(behavior: StubBehavior) -> (Fixture, Arc<AtomicUsize>) {
        let dom = Arc::new(MemoryDom::new());
        let affordance = dom.add_classed(dom.root(), "div", &["control"]);
        let store = Arc::new(PreferenceStore::new(Arc::new(MemoryBackend::new())));
        let (source, calls) = StubSource::new(behavior);
        let ui = UiConfig {
            state_revert_ms: 30,
            insert_settle_ms: 1,
            ..UiConfig::default()
        };
        let dispatcher = Arc::new(ActionDispatcher::new(
            dom.clone(),
            store.clone(),
            source,
            SelectorChain::new([".ql-editor"]),
            SelectorChain::new([".message-text"]),
            ui,
        ));
        (
            Fixture {
                dom,
                dispatcher,
                store,
                affordance,
            },
            calls,
        )
    }

    fn add_message(dom: &MemoryDom, text: &str) -> NodeId {
        let message = dom.add_classed(dom.root(), "div", &["message-item"]);
        let body = dom.add_classed(message, "div", &["message-text"]);
        dom.set_node_text(body, text);
        message
    }

    fn add_editor(dom: &MemoryDom, text: &str) -> NodeId {
        let editor = dom.add_classed(dom.root(), "div", &["ql-editor"]);
        dom.set_node_text(editor, text);
        editor
    }

    #[tokio::test]
    async fn summarize_appends_block_and_replaces_previous() {
        let (fx, _) = fixture(StubBehavior::Reply("a short summary".into()));
        let message = add_message(&fx.dom, "a long enough message body");

        let record = fx.dispatcher.summarize_message(fx.affordance, message).await;
        assert_eq!(record.outcome, DispatchOutcome::Applied);
        assert_eq!(fx.dom.query_all(".sparkpane-summary").len(), 1);

        // Second summary replaces, never stacks.
        tokio::time::sleep(Duration::from_millis(60)).await;
        let record = fx.dispatcher.summarize_message(fx.affordance, message).await;
        assert_eq!(record.outcome, DispatchOutcome::Applied);
        let blocks = fx.dom.query_all(".sparkpane-summary");
        assert_eq!(blocks.len(), 1);
        assert_eq!(fx.dom.node_text(blocks[0]), "a short summary");
    }

    #[tokio::test]
    async fn length_guard_skips_without_provider_call() {
        let (fx, calls) = fixture(StubBehavior::Reply("unused".into()));
        let message = add_message(&fx.dom, "  tiny  ");

        let record = fx.dispatcher.summarize_message(fx.affordance, message).await;
        assert_eq!(record.outcome, DispatchOutcome::Skipped("message too short"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        // Silent abort goes straight back to idle.
        assert_eq!(
            fx.dom.affordance_state(fx.affordance),
            Some(AffordanceState::Idle)
        );
    }

    #[tokio::test]
    async fn provider_failure_surfaces_error_state_then_reverts() {
        let (fx, _) = fixture(StubBehavior::Fail("invalid api key".into()));
        let message = add_message(&fx.dom, "a long enough message body");

        let record = fx.dispatcher.summarize_message(fx.affordance, message).await;
        assert_eq!(
            record.outcome,
            DispatchOutcome::Failed("invalid api key".into())
        );
        assert_eq!(
            fx.dom.affordance_state(fx.affordance),
            Some(AffordanceState::Error)
        );

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(
            fx.dom.affordance_state(fx.affordance),
            Some(AffordanceState::Idle)
        );
    }

    #[tokio::test]
    async fn missing_credential_is_surfaced_as_failure() {
        // Real registry against an empty store: no key configured.
        let dom = Arc::new(MemoryDom::new());
        let affordance = dom.add_classed(dom.root(), "div", &["control"]);
        let store = Arc::new(PreferenceStore::new(Arc::new(MemoryBackend::new())));
        let registry = Arc::new(crate::llm::ProviderRegistry::from_config(
            &crate::config::AppConfig::default(),
        ));
        let dispatcher = ActionDispatcher::new(
            dom.clone(),
            store,
            registry,
            SelectorChain::new([".ql-editor"]),
            SelectorChain::new([".message-text"]),
            UiConfig {
                state_revert_ms: 30,
                ..UiConfig::default()
            },
        );
        let message = dom.add_classed(dom.root(), "div", &["message-item"]);
        let body = dom.add_classed(message, "div", &["message-text"]);
        dom.set_node_text(body, "a long enough message body");

        let record = dispatcher.summarize_message(affordance, message).await;
        match record.outcome {
            DispatchOutcome::Failed(message) => assert!(message.contains("API key")),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(dom.affordance_state(affordance), Some(AffordanceState::Error));
    }

    #[tokio::test]
    async fn transform_replaces_draft_and_moves_cursor() {
        let (fx, _) = fixture(StubBehavior::Reply("Better text".into()));
        let editor = add_editor(&fx.dom, "ok text here");
        fx.dom.enable_rich_edit(editor);

        let record = fx
            .dispatcher
            .transform_draft(fx.affordance, ComposeMode::Builtin(BuiltinTransform::Improve))
            .await;
        assert_eq!(record.outcome, DispatchOutcome::Applied);
        assert_eq!(fx.dom.node_text(editor), "Better text");
        assert_eq!(fx.dom.cursor(editor), Some("Better text".chars().count()));
    }

    #[tokio::test]
    async fn transform_falls_back_to_emulated_insert() {
        let (fx, _) = fixture(StubBehavior::Reply("Replacement".into()));
        let editor = add_editor(&fx.dom, "draft body text");
        // Rich-editor API left unavailable.

        let record = fx
            .dispatcher
            .transform_draft(fx.affordance, ComposeMode::Builtin(BuiltinTransform::Fix))
            .await;
        assert_eq!(record.outcome, DispatchOutcome::Applied);
        assert_eq!(fx.dom.node_text(editor), "Replacement");
    }

    #[tokio::test]
    async fn empty_draft_skips_silently() {
        let (fx, calls) = fixture(StubBehavior::Reply("unused".into()));
        add_editor(&fx.dom, "   Message #general");

        let record = fx
            .dispatcher
            .transform_draft(fx.affordance, ComposeMode::Builtin(BuiltinTransform::Shorten))
            .await;
        assert_eq!(record.outcome, DispatchOutcome::Skipped("draft is empty"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_custom_operation_is_a_visible_failure() {
        let (fx, calls) = fixture(StubBehavior::Reply("unused".into()));
        add_editor(&fx.dom, "draft body text");

        let record = fx
            .dispatcher
            .transform_draft(fx.affordance, ComposeMode::Custom("missing-id".into()))
            .await;
        assert_eq!(
            record.outcome,
            DispatchOutcome::Failed("Custom operation not found".into())
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            fx.dom.affordance_state(fx.affordance),
            Some(AffordanceState::Error)
        );
    }

    #[tokio::test]
    async fn custom_operation_prompt_reaches_provider() {
        let (fx, calls) = fixture(StubBehavior::Reply("joke version".into()));
        let editor = add_editor(&fx.dom, "serious draft text");
        let op = fx
            .store
            .add_custom_operation("Make Funny", "Rewrite as a joke")
            .unwrap();

        let record = fx
            .dispatcher
            .transform_draft(fx.affordance, ComposeMode::Custom(op.id))
            .await;
        assert_eq!(record.outcome, DispatchOutcome::Applied);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(fx.dom.node_text(editor), "joke version");
    }

    #[tokio::test]
    async fn busy_affordance_rejects_second_trigger() {
        let (fx, calls) = fixture(StubBehavior::Slow("slow result".into(), 80));
        let message = add_message(&fx.dom, "a long enough message body");

        let first = {
            let dispatcher = fx.dispatcher.clone();
            let affordance = fx.affordance;
            tokio::spawn(async move { dispatcher.summarize_message(affordance, message).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = fx.dispatcher.summarize_message(fx.affordance, message).await;
        assert_eq!(second.outcome, DispatchOutcome::Skipped("affordance busy"));

        let first = first.await.unwrap();
        assert_eq!(first.outcome, DispatchOutcome::Applied);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn two_different_affordances_run_concurrently() {
        let (fx, calls) = fixture(StubBehavior::Slow("summary".into(), 40));
        let message_a = add_message(&fx.dom, "first long enough message");
        let message_b = add_message(&fx.dom, "second long enough message");
        let button_b = fx.dom.add_classed(fx.dom.root(), "div", &["control-b"]);

        let (a, b) = tokio::join!(
            fx.dispatcher.summarize_message(fx.affordance, message_a),
            fx.dispatcher.summarize_message(button_b, message_b),
        );
        assert_eq!(a.outcome, DispatchOutcome::Applied);
        assert_eq!(b.outcome, DispatchOutcome::Applied);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn orphaned_flight_never_mutates_removed_message() {
        let (fx, _) = fixture(StubBehavior::Slow("summary".into(), 40));
        let message = add_message(&fx.dom, "a long enough message body");

        let flight = {
            let dispatcher = fx.dispatcher.clone();
            let affordance = fx.affordance;
            tokio::spawn(async move { dispatcher.summarize_message(affordance, message).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        fx.dom.remove_node(message);

        let record = flight.await.unwrap();
        assert_eq!(
            record.outcome,
            DispatchOutcome::Skipped("message removed during flight")
        );
        assert!(fx.dom.query_all(".sparkpane-summary").is_empty());
    }
}
