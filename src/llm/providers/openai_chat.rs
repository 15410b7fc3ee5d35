use async_trait::async_trait;

use crate::errors::{SparkError, SparkResult};
use crate::llm::provider::LlmProvider;
use crate::llm::providers::provider_error_message;
use crate::llm::types::{ChatMessage, GenerationOptions};

/// Chat-completion style backend: one POST with a bearer token, the message
/// list verbatim, and the generation options.
pub struct OpenAiChatProvider {
    api_base: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiChatProvider {
    pub fn new(api_base: String, model: String, api_key: String) -> Self {
        Self {
            api_base,
            model,
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiChatProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> SparkResult<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": options.max_output_tokens,
            "temperature": options.temperature,
        });

        tracing::debug!(
            provider = self.name(),
            model = %self.model,
            messages = messages.len(),
            max_tokens = options.max_output_tokens,
            "sending chat-completion request"
        );

        let response = self
            .client
            .post(&self.api_base)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let err_body = response.text().await.unwrap_or_default();
            return Err(SparkError::Provider(provider_error_message(status, &err_body)));
        }

        let json: serde_json::Value = response.json().await?;
        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .map(str::trim)
            .unwrap_or("");

        if content.is_empty() {
            return Err(SparkError::Provider("No response generated".to_string()));
        }

        tracing::debug!(provider = self.name(), content_len = content.len(), "response received");
        Ok(content.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::Role;

    #[test]
    fn messages_serialize_to_wire_roles() {
        let messages = vec![
            ChatMessage::system("be brief"),
            ChatMessage::user("hello"),
        ];
        let wire = serde_json::to_value(&messages).unwrap();
        assert_eq!(wire[0]["role"], "system");
        assert_eq!(wire[1]["role"], "user");
        assert_eq!(wire[1]["content"], "hello");
        assert_eq!(messages[0].role, Role::System);
    }
}
