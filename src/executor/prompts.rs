use crate::llm::types::{ChatMessage, GenerationOptions};
use crate::store::CustomOperation;

/// Built-in draft transformations, in menu order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinTransform {
    Improve,
    Translate,
    Fix,
    Professional,
    Casual,
    Shorten,
}

impl BuiltinTransform {
    pub const ALL: [BuiltinTransform; 6] = [
        BuiltinTransform::Improve,
        BuiltinTransform::Translate,
        BuiltinTransform::Fix,
        BuiltinTransform::Professional,
        BuiltinTransform::Casual,
        BuiltinTransform::Shorten,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            BuiltinTransform::Improve => "improve",
            BuiltinTransform::Translate => "translate",
            BuiltinTransform::Fix => "fix",
            BuiltinTransform::Professional => "professional",
            BuiltinTransform::Casual => "casual",
            BuiltinTransform::Shorten => "shorten",
        }
    }
}

/// A draft transformation selected from the composer menu: built-in, or a
/// user-defined operation referenced by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeMode {
    Builtin(BuiltinTransform),
    Custom(String),
}

impl ComposeMode {
    /// Menu action ids: builtin names, or `custom_<id>`.
    pub fn parse(action: &str) -> Option<Self> {
        if let Some(id) = action.strip_prefix("custom_") {
            if id.is_empty() {
                return None;
            }
            return Some(ComposeMode::Custom(id.to_string()));
        }
        BuiltinTransform::ALL
            .iter()
            .find(|t| t.id() == action)
            .map(|t| ComposeMode::Builtin(*t))
    }

    pub fn id(&self) -> String {
        match self {
            ComposeMode::Builtin(t) => t.id().to_string(),
            ComposeMode::Custom(id) => format!("custom_{id}"),
        }
    }
}

pub fn summary_options() -> GenerationOptions {
    GenerationOptions {
        max_output_tokens: 200,
        temperature: 0.3,
    }
}

pub fn transform_options() -> GenerationOptions {
    GenerationOptions {
        max_output_tokens: 500,
        temperature: 0.7,
    }
}

/// Summarization request. With language "auto" the model matches the source
/// language; any other value forces an explicit response language.
pub fn summary_messages(text: &str, language: &str) -> Vec<ChatMessage> {
    let mut system = String::from(
        "You are a helpful assistant that summarizes chat messages. \
         Provide a concise, clear summary that captures the key points. \
         Use proper formatting with line breaks where appropriate and \
         bullet points where appropriate.",
    );
    if language == "auto" {
        system.push_str(" Respond in the same language as the original message.");
    } else {
        system.push_str(&format!(" Always respond in {language}."));
    }

    vec![
        ChatMessage::system(system),
        ChatMessage::user(format!("Please summarize this message:\n\n{text}")),
    ]
}

pub fn builtin_user_prompt(transform: BuiltinTransform, text: &str) -> String {
    match transform {
        BuiltinTransform::Improve => format!(
            "This is a chat message, please correct my mistakes and keep the way I wrote it \
             but improve it (write only the text, without any introduction)\n\n{text}"
        ),
        BuiltinTransform::Translate => format!(
            "Translate the following text to English. Return ONLY the translated text, \
             without any additional comments or introductions or formatting.\n\n{text}"
        ),
        BuiltinTransform::Fix => format!(
            "Fix all spelling and grammar mistakes in the following text. Do not change \
             the tone or meaning. Return only the corrected text.\n\n{text}"
        ),
        BuiltinTransform::Professional => format!(
            "Rewrite the following text to have a more professional and formal tone. \
             Return only the rewritten text.\n\n{text}"
        ),
        BuiltinTransform::Casual => format!(
            "Rewrite the following text to have a more casual and friendly tone. \
             Return only the rewritten text.\n\n{text}"
        ),
        BuiltinTransform::Shorten => format!(
            "Make the following text more concise and to the point. Remove any \
             unnecessary words or sentences. Return only the shortened text.\n\n{text}"
        ),
    }
}

/// User-defined operations always carry the return-only instruction so a
/// chatty model cannot wrap the replacement text in commentary.
pub fn custom_user_prompt(operation: &CustomOperation, text: &str) -> String {
    format!(
        "{}\n\nReturn ONLY the response text, without any additional comments, \
         introductions, or formatting.\n\n{}",
        operation.prompt, text
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::Role;

    #[test]
    fn auto_language_never_names_a_language() {
        let messages = summary_messages("some text", "auto");
        assert_eq!(messages[0].role, Role::System);
        assert!(!messages[0].content.contains("Always respond in"));
        assert!(messages[0]
            .content
            .contains("same language as the original message"));
    }

    #[test]
    fn explicit_language_is_forced() {
        let messages = summary_messages("some text", "Hebrew");
        assert!(messages[0].content.contains("Always respond in Hebrew."));
        assert!(!messages[0].content.contains("same language"));
    }

    #[test]
    fn summary_user_message_carries_the_text() {
        let messages = summary_messages("the quick brown fox", "auto");
        assert_eq!(messages[1].role, Role::User);
        assert!(messages[1].content.contains("the quick brown fox"));
    }

    #[test]
    fn shorten_prompt_contains_instruction_and_input() {
        let prompt = builtin_user_prompt(BuiltinTransform::Shorten, "Hello there friend");
        assert!(prompt
            .to_lowercase()
            .contains("make the following text more concise"));
        assert!(prompt.contains("Hello there friend"));
    }

    #[test]
    fn every_builtin_embeds_the_input() {
        for transform in BuiltinTransform::ALL {
            let prompt = builtin_user_prompt(transform, "INPUT MARKER");
            assert!(prompt.contains("INPUT MARKER"), "{transform:?}");
        }
    }

    #[test]
    fn custom_prompt_appends_return_only_suffix() {
        let op = CustomOperation {
            id: "x".into(),
            title: "Make Funny".into(),
            prompt: "Rewrite as a joke".into(),
        };
        let prompt = custom_user_prompt(&op, "serious text");
        assert!(prompt.starts_with("Rewrite as a joke"));
        assert!(prompt.contains("Return ONLY the response text"));
        assert!(prompt.ends_with("serious text"));
    }

    #[test]
    fn mode_parse_round_trips_action_ids() {
        assert_eq!(
            ComposeMode::parse("shorten"),
            Some(ComposeMode::Builtin(BuiltinTransform::Shorten))
        );
        assert_eq!(
            ComposeMode::parse("custom_abc"),
            Some(ComposeMode::Custom("abc".into()))
        );
        assert_eq!(ComposeMode::parse("custom_"), None);
        assert_eq!(ComposeMode::parse("unknown"), None);
    }
}
