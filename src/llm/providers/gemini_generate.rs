use async_trait::async_trait;

use crate::errors::{SparkError, SparkResult};
use crate::llm::provider::LlmProvider;
use crate::llm::providers::provider_error_message;
use crate::llm::types::{ChatMessage, GenerationOptions, Role};

/// Generate-content style backend: the role-tagged messages are flattened
/// into a single prompt string and the API key travels as a query parameter.
pub struct GeminiGenerateProvider {
    api_base: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiGenerateProvider {
    pub fn new(api_base: String, model: String, api_key: String) -> Self {
        Self {
            api_base,
            model,
            api_key,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            self.model
        )
    }
}

/// System content becomes an `Instructions:` block; user content is appended
/// raw, in message order.
pub(crate) fn flatten_messages(messages: &[ChatMessage]) -> String {
    let mut prompt = String::new();
    for message in messages {
        match message.role {
            Role::System => {
                prompt.push_str("Instructions: ");
                prompt.push_str(&message.content);
                prompt.push_str("\n\n");
            }
            Role::User => prompt.push_str(&message.content),
        }
    }
    prompt
}

#[async_trait]
impl LlmProvider for GeminiGenerateProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> SparkResult<String> {
        let prompt = flatten_messages(messages);
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "maxOutputTokens": options.max_output_tokens,
                "temperature": options.temperature,
            },
        });

        tracing::debug!(
            provider = self.name(),
            model = %self.model,
            prompt_len = prompt.len(),
            "sending generate-content request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let err_body = response.text().await.unwrap_or_default();
            return Err(SparkError::Provider(provider_error_message(status, &err_body)));
        }

        let json: serde_json::Value = response.json().await?;
        let content = json["candidates"][0]["content"]["parts"][0]["text"]
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

    #[test]
    fn flatten_prefixes_system_and_appends_user_raw() {
        let messages = vec![
            ChatMessage::system("summarize briefly"),
            ChatMessage::user("the text"),
        ];
        assert_eq!(
            flatten_messages(&messages),
            "Instructions: summarize briefly\n\nthe text"
        );
    }

    #[test]
    fn flatten_without_system_is_user_only() {
        let messages = vec![ChatMessage::user("just this")];
        assert_eq!(flatten_messages(&messages), "just this");
    }

    #[test]
    fn endpoint_joins_base_and_model() {
        let p = GeminiGenerateProvider::new(
            "https://generativelanguage.googleapis.com/v1beta/models/".into(),
            "gemini-2.0-flash".into(),
            "k".into(),
        );
        assert_eq!(
            p.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }
}
