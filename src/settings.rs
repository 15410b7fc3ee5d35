//! Interface layer for the settings surface. The host renders the modal; this
//! controller owns the behavior behind it: provider selection, credential
//! save/clear/test, summarization language, and custom-operation CRUD. Every
//! operation reports back as a [`SettingsStatus`] for inline display.

use std::sync::Arc;

use crate::llm::registry::ProviderRegistry;
use crate::llm::types::ProviderKind;
use crate::store::PreferenceStore;

/// Languages offered for summarization; "auto" matches the source message.
pub const LANGUAGES: [&str; 15] = [
    "auto",
    "English",
    "Hebrew",
    "Spanish",
    "French",
    "German",
    "Italian",
    "Portuguese",
    "Russian",
    "Chinese",
    "Japanese",
    "Korean",
    "Arabic",
    "Dutch",
    "Polish",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Error,
    Info,
}

/// Human-readable outcome of a settings action, rendered inline by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsStatus {
    pub kind: StatusKind,
    pub message: String,
}

impl SettingsStatus {
    fn success(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Success,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            message: message.into(),
        }
    }

    fn info(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Info,
            message: message.into(),
        }
    }
}

pub struct SettingsController {
    store: Arc<PreferenceStore>,
    registry: Arc<ProviderRegistry>,
}

impl SettingsController {
    pub fn new(store: Arc<PreferenceStore>, registry: Arc<ProviderRegistry>) -> Self {
        Self { store, registry }
    }

    pub fn select_provider(&self, kind: ProviderKind) -> SettingsStatus {
        if self.store.set_ai_provider(kind) {
            SettingsStatus::success(format!("AI provider changed to {}", kind.display_name()))
        } else {
            SettingsStatus::error("Failed to save AI provider preference")
        }
    }

    pub fn save_key(&self, kind: ProviderKind, key: &str) -> SettingsStatus {
        let key = key.trim();
        if key.is_empty() {
            return SettingsStatus::error("Please enter an API key");
        }
        let expected_prefix = match kind {
            ProviderKind::OpenAi => "sk-",
            ProviderKind::Gemini => "AIza",
        };
        if !key.starts_with(expected_prefix) {
            return SettingsStatus::error(format!(
                "{} API key should start with \"{expected_prefix}\"",
                kind.display_name()
            ));
        }
        if self.store.set_api_key(kind, key) {
            SettingsStatus::success(format!("{} API key saved", kind.display_name()))
        } else {
            SettingsStatus::error("Failed to save API key")
        }
    }

    pub fn clear_key(&self, kind: ProviderKind) -> SettingsStatus {
        self.store.clear_api_key(kind);
        SettingsStatus::info(format!("{} API key cleared", kind.display_name()))
    }

    /// Masked display form of the stored credential ("•••" + last 4), or
    /// None when no key is set.
    pub fn masked_key(&self, kind: ProviderKind) -> Option<String> {
        let key = self.store.api_key(kind)?;
        let tail: String = key
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        Some(format!("•••{tail}"))
    }

    /// Probe a candidate key against the live backend before saving it.
    pub async fn test_key(&self, kind: ProviderKind, key: &str) -> SettingsStatus {
        let key = key.trim();
        if key.is_empty() {
            return SettingsStatus::error("Please enter an API key to test");
        }
        match self.registry.verify_credential(kind, key).await {
            Ok(()) => SettingsStatus::success(format!(
                "{} API key is working correctly",
                kind.display_name()
            )),
            Err(e) => SettingsStatus::error(format!("API test failed: {e}")),
        }
    }

    pub fn select_language(&self, language: &str) -> SettingsStatus {
        let language = language.trim();
        if language.is_empty() {
            return SettingsStatus::error("Please choose a language");
        }
        if self.store.set_summarization_language(language) {
            SettingsStatus::success(format!("Language preference saved: {language}"))
        } else {
            SettingsStatus::error("Failed to save language preference")
        }
    }

    pub fn add_operation(&self, title: &str, prompt: &str) -> SettingsStatus {
        match self.store.add_custom_operation(title, prompt) {
            Some(operation) => {
                SettingsStatus::success(format!("Operation \"{}\" added", operation.title))
            }
            None => SettingsStatus::error("Please fill in both title and prompt"),
        }
    }

    pub fn update_operation(&self, id: &str, title: &str, prompt: &str) -> SettingsStatus {
        if title.trim().is_empty() || prompt.trim().is_empty() {
            return SettingsStatus::error("Please fill in both title and prompt");
        }
        if self.store.update_custom_operation(id, title, prompt) {
            SettingsStatus::success(format!("Operation \"{}\" updated", title.trim()))
        } else {
            SettingsStatus::error("Operation no longer exists")
        }
    }

    pub fn delete_operation(&self, id: &str) -> SettingsStatus {
        if self.store.delete_custom_operation(id) {
            SettingsStatus::info("Operation deleted")
        } else {
            SettingsStatus::error("Failed to delete operation")
        }
    }
}
