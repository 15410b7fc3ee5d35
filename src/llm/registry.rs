use crate::config::{AppConfig, LlmConfig};
use crate::errors::{SparkError, SparkResult};
use crate::llm::provider::LlmProvider;
use crate::llm::providers::gemini_generate::GeminiGenerateProvider;
use crate::llm::providers::openai_chat::OpenAiChatProvider;
use crate::llm::types::{ChatMessage, GenerationOptions, ProviderKind};
use crate::store::PreferenceStore;

/// Resolution seam between the dispatcher and the configured backends; the
/// dispatcher only ever asks for "the active provider, credential included".
pub trait ProviderSource: Send + Sync {
    fn active(&self, store: &PreferenceStore) -> SparkResult<Box<dyn LlmProvider>>;
}

/// Builds provider clients from configured endpoints. Clients are built per
/// call because the active backend and its credential are user preferences
/// that can change at any time between dispatches.
pub struct ProviderRegistry {
    llm: LlmConfig,
}

impl ProviderRegistry {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            llm: config.llm.clone(),
        }
    }

    pub fn build(&self, kind: ProviderKind, api_key: String) -> Box<dyn LlmProvider> {
        match kind {
            ProviderKind::OpenAi => Box::new(OpenAiChatProvider::new(
                self.llm.openai.api_base.clone(),
                self.llm.openai.model.clone(),
                api_key,
            )),
            ProviderKind::Gemini => Box::new(GeminiGenerateProvider::new(
                self.llm.gemini.api_base.clone(),
                self.llm.gemini.model.clone(),
                api_key,
            )),
        }
    }

    /// One-shot probe used by the settings "test" action.
    pub async fn verify_credential(&self, kind: ProviderKind, api_key: &str) -> SparkResult<()> {
        let provider = self.build(kind, api_key.to_string());
        let messages = [ChatMessage::user("Say \"API test successful\"")];
        let options = GenerationOptions {
            max_output_tokens: 10,
            temperature: 0.0,
        };
        provider.generate(&messages, &options).await.map(|_| ())
    }
}

impl ProviderSource for ProviderRegistry {
    /// Resolve the stored provider preference and its credential.
    /// A missing credential is a configuration error naming the provider;
    /// the dispatcher surfaces it on the triggering affordance.
    fn active(&self, store: &PreferenceStore) -> SparkResult<Box<dyn LlmProvider>> {
        let kind = store.ai_provider();
        let key = store.api_key(kind).ok_or_else(|| {
            SparkError::Config(format!(
                "No {} API key configured; open settings to add one",
                kind.display_name()
            ))
        })?;
        Ok(self.build(kind, key))
    }
}
