pub mod backend;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use backend::{FileBackend, KeyValueBackend, MemoryBackend};

use crate::llm::types::ProviderKind;

const KEY_PROVIDER: &str = "sparkpane_ai_provider";
const KEY_OPENAI: &str = "sparkpane_openai_key";
const KEY_GEMINI: &str = "sparkpane_gemini_key";
const KEY_LANGUAGE: &str = "sparkpane_summarization_language";
const KEY_OPERATIONS: &str = "sparkpane_custom_operations";

/// A user-defined named text-transformation prompt. Ordered list, insertion
/// order is menu order; `id` is the only uniqueness key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomOperation {
    pub id: String,
    pub title: String,
    pub prompt: String,
}

/// Fail-soft facade over a [`KeyValueBackend`]: a broken preference store
/// must never take the host page down with it, so every failure is logged
/// and converted to a `None`/`false`/empty return.
pub struct PreferenceStore {
    backend: Arc<dyn KeyValueBackend>,
}

impl PreferenceStore {
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self { backend }
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(key, error = %e, "store read failed");
                None
            }
        }
    }

    pub fn set_string(&self, key: &str, value: &str) -> bool {
        match self.backend.set(key, value) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(key, error = %e, "store write failed");
                false
            }
        }
    }

    /// Idempotent delete; true even when the key was absent.
    pub fn remove_key(&self, key: &str) -> bool {
        match self.backend.remove(key) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(key, error = %e, "store delete failed");
                false
            }
        }
    }

    pub fn ai_provider(&self) -> ProviderKind {
        self.get_string(KEY_PROVIDER)
            .map(|v| ProviderKind::parse(&v))
            .unwrap_or(ProviderKind::OpenAi)
    }

    pub fn set_ai_provider(&self, kind: ProviderKind) -> bool {
        self.set_string(KEY_PROVIDER, kind.as_str())
    }

    pub fn summarization_language(&self) -> String {
        self.get_string(KEY_LANGUAGE)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "auto".to_string())
    }

    pub fn set_summarization_language(&self, language: &str) -> bool {
        self.set_string(KEY_LANGUAGE, language)
    }

    fn key_slot(kind: ProviderKind) -> &'static str {
        match kind {
            ProviderKind::OpenAi => KEY_OPENAI,
            ProviderKind::Gemini => KEY_GEMINI,
        }
    }

    fn env_slot(kind: ProviderKind) -> &'static str {
        match kind {
            ProviderKind::OpenAi => "SPARKPANE_OPENAI_API_KEY",
            ProviderKind::Gemini => "SPARKPANE_GEMINI_API_KEY",
        }
    }

    /// Credential lookup: store first, environment second. The credential is
    /// only ever handed to the matching provider's client.
    pub fn api_key(&self, kind: ProviderKind) -> Option<String> {
        self.get_string(Self::key_slot(kind))
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(Self::env_slot(kind)).ok())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn set_api_key(&self, kind: ProviderKind, key: &str) -> bool {
        self.set_string(Self::key_slot(kind), key)
    }

    pub fn clear_api_key(&self, kind: ProviderKind) -> bool {
        self.remove_key(Self::key_slot(kind))
    }

    /// Empty on missing key or parse failure; a corrupted blob is logged and
    /// treated as "no operations" rather than propagated.
    pub fn custom_operations(&self) -> Vec<CustomOperation> {
        let Some(raw) = self.get_string(KEY_OPERATIONS) else {
            return Vec::new();
        };
        match serde_json::from_str(&raw) {
            Ok(ops) => ops,
            Err(e) => {
                tracing::error!(error = %e, "custom operations blob unparsable, ignoring");
                Vec::new()
            }
        }
    }

    /// Replace-all write; there is no partial update.
    pub fn set_custom_operations(&self, operations: &[CustomOperation]) -> bool {
        match serde_json::to_string(operations) {
            Ok(raw) => self.set_string(KEY_OPERATIONS, &raw),
            Err(e) => {
                tracing::error!(error = %e, "custom operations serialize failed");
                false
            }
        }
    }

    /// None when a field trims to empty or the write fails.
    pub fn add_custom_operation(&self, title: &str, prompt: &str) -> Option<CustomOperation> {
        let title = title.trim();
        let prompt = prompt.trim();
        if title.is_empty() || prompt.is_empty() {
            return None;
        }
        let operation = CustomOperation {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            prompt: prompt.to_string(),
        };
        let mut operations = self.custom_operations();
        operations.push(operation.clone());
        if self.set_custom_operations(&operations) {
            Some(operation)
        } else {
            None
        }
    }

    /// In-place update by id lookup; false when the id is unknown.
    pub fn update_custom_operation(&self, id: &str, title: &str, prompt: &str) -> bool {
        let title = title.trim();
        let prompt = prompt.trim();
        if title.is_empty() || prompt.is_empty() {
            return false;
        }
        let mut operations = self.custom_operations();
        let Some(existing) = operations.iter_mut().find(|op| op.id == id) else {
            return false;
        };
        existing.title = title.to_string();
        existing.prompt = prompt.to_string();
        self.set_custom_operations(&operations)
    }

    pub fn delete_custom_operation(&self, id: &str) -> bool {
        let operations: Vec<CustomOperation> = self
            .custom_operations()
            .into_iter()
            .filter(|op| op.id != id)
            .collect();
        self.set_custom_operations(&operations)
    }

    pub fn find_custom_operation(&self, id: &str) -> Option<CustomOperation> {
        self.custom_operations().into_iter().find(|op| op.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{SparkError, SparkResult};

    fn store() -> PreferenceStore {
        PreferenceStore::new(Arc::new(MemoryBackend::new()))
    }

    #[test]
    fn empty_store_bootstrap_defaults() {
        let store = store();
        assert_eq!(store.ai_provider(), ProviderKind::OpenAi);
        assert_eq!(store.summarization_language(), "auto");
        assert!(store.custom_operations().is_empty());
    }

    #[test]
    fn custom_operation_round_trip() {
        let store = store();
        let op = store
            .add_custom_operation("Make Funny", "Rewrite as a joke")
            .unwrap();
        assert!(!op.id.is_empty());
        assert_eq!(store.custom_operations().len(), 1);

        assert!(store.update_custom_operation(
            &op.id,
            "Make Funnier",
            "Rewrite as a joke, exaggerated"
        ));
        assert_eq!(store.custom_operations()[0].title, "Make Funnier");

        assert!(store.delete_custom_operation(&op.id));
        assert!(store.custom_operations().is_empty());
    }

    #[test]
    fn add_rejects_blank_fields_and_trims() {
        let store = store();
        assert!(store.add_custom_operation("  ", "prompt").is_none());
        assert!(store.add_custom_operation("title", "   ").is_none());
        let op = store.add_custom_operation("  Tidy  ", "  Do it  ").unwrap();
        assert_eq!(op.title, "Tidy");
        assert_eq!(op.prompt, "Do it");
    }

    #[test]
    fn ids_are_fresh_and_unique() {
        let store = store();
        let a = store.add_custom_operation("A", "pa").unwrap();
        let b = store.add_custom_operation("B", "pb").unwrap();
        assert_ne!(a.id, b.id);
        // Insertion order is menu order.
        let titles: Vec<_> = store
            .custom_operations()
            .into_iter()
            .map(|op| op.title)
            .collect();
        assert_eq!(titles, vec!["A", "B"]);
    }

    #[test]
    fn corrupted_blob_reads_as_empty() {
        let store = store();
        assert!(store.set_string("sparkpane_custom_operations", "not json"));
        assert!(store.custom_operations().is_empty());
    }

    #[test]
    fn remove_key_is_idempotent() {
        let store = store();
        assert!(store.remove_key("sparkpane_openai_key"));
        assert!(store.remove_key("sparkpane_openai_key"));
    }

    struct FailingBackend;

    impl KeyValueBackend for FailingBackend {
        fn get(&self, _key: &str) -> SparkResult<Option<String>> {
            Err(SparkError::Storage("backend down".into()))
        }
        fn set(&self, _key: &str, _value: &str) -> SparkResult<()> {
            Err(SparkError::Storage("quota exceeded".into()))
        }
        fn remove(&self, _key: &str) -> SparkResult<()> {
            Err(SparkError::Storage("backend down".into()))
        }
    }

    #[test]
    fn failures_never_escape_the_store() {
        let store = PreferenceStore::new(Arc::new(FailingBackend));
        assert_eq!(store.get_string("k"), None);
        assert!(!store.set_string("k", "v"));
        assert!(!store.remove_key("k"));
        assert_eq!(store.ai_provider(), ProviderKind::OpenAi);
        assert!(store.custom_operations().is_empty());
        assert!(store.add_custom_operation("t", "p").is_none());
    }
}
