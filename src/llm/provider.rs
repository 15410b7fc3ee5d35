use async_trait::async_trait;

use crate::errors::SparkResult;
use crate::llm::types::{ChatMessage, GenerationOptions};

/// Unified text-generation trait over the interchangeable backends.
/// The dispatcher is the only caller and is responsible for catching and
/// surfacing errors; providers just report them faithfully.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Backend identifier (matches the stored provider preference).
    fn name(&self) -> &str;

    /// One-shot generation: send the role-tagged messages, return the
    /// trimmed response text. An empty response is an error, never `Ok("")`.
    async fn generate(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> SparkResult<String>;
}
