use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::SparkResult;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
    #[serde(default)]
    pub presence: PresenceConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Chat-completion style backend.
    #[serde(default = "default_openai")]
    pub openai: ProviderEntry,
    /// Generate-content style backend.
    #[serde(default = "default_gemini")]
    pub gemini: ProviderEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub api_base: String,
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            openai: default_openai(),
            gemini: default_gemini(),
        }
    }
}

fn default_openai() -> ProviderEntry {
    ProviderEntry {
        api_base: "https://api.openai.com/v1/chat/completions".into(),
        model: "gpt-4o".into(),
    }
}

fn default_gemini() -> ProviderEntry {
    ProviderEntry {
        api_base: "https://generativelanguage.googleapis.com/v1beta/models".into(),
        model: "gemini-2.0-flash".into(),
    }
}

/// Host-DOM lookup chains, in priority order (first structural match wins).
/// These are configuration, not contract: the host application renames its
/// internals without notice, so every chain tolerates total absence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Anchor points for the composer control, tried in order.
    pub composer_anchor: Vec<String>,
    /// The message-draft input element.
    pub message_input: Vec<String>,
    /// Per-message root containers (used via closest() from a clicked button).
    pub message_container: Vec<String>,
    /// Per-message action-button containers.
    pub message_actions: Vec<String>,
    /// Button group inside an actions container; falls back to the container.
    pub message_actions_group: Vec<String>,
    /// Message body text, tried in order before falling back to full text.
    pub message_text: Vec<String>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            composer_anchor: vec![".p-composer__actions".into(), ".p-composer__body".into()],
            message_input: vec![
                "[data-qa=\"message_input\"]".into(),
                ".ql-editor".into(),
                "[contenteditable=\"true\"]".into(),
            ],
            message_container: vec![
                "[data-qa=\"virtual-list-item\"]".into(),
                ".c-virtual_list__item".into(),
                "[role=\"listitem\"]".into(),
                ".c-message_kit__message".into(),
            ],
            message_actions: vec![".c-message_actions__container".into()],
            message_actions_group: vec![
                ".c-message_actions__group".into(),
                "[role=\"group\"]".into(),
            ],
            message_text: vec![
                ".c-message_kit__text".into(),
                "[data-qa=\"message-text\"]".into(),
                ".p-rich_text_section".into(),
                ".c-message__body".into(),
                ".c-message_content".into(),
            ],
        }
    }
}

/// Timings for the presence reconcilers. The host re-renders whenever it
/// likes, so presence is re-asserted from several independent triggers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    pub initial_delay_ms: u64,
    pub startup_retry_interval_ms: u64,
    pub max_startup_attempts: u32,
    pub composer_heartbeat_ms: u64,
    pub message_heartbeat_ms: u64,
    pub composer_mutation_settle_ms: u64,
    pub message_mutation_settle_ms: u64,
    pub url_poll_interval_ms: u64,
    pub navigation_settle_ms: u64,
    pub hover_probe_delays_ms: Vec<u64>,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 2000,
            startup_retry_interval_ms: 200,
            max_startup_attempts: 40,
            composer_heartbeat_ms: 1000,
            message_heartbeat_ms: 2000,
            composer_mutation_settle_ms: 500,
            message_mutation_settle_ms: 100,
            url_poll_interval_ms: 1000,
            navigation_settle_ms: 1000,
            hover_probe_delays_ms: vec![50, 100, 200],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Marker class on the injected composer control.
    pub composer_marker: String,
    /// Marker class on the injected per-message button.
    pub message_marker: String,
    /// Marker class on an inserted summary block.
    pub summary_marker: String,
    /// How long a success/error glyph stays before reverting to idle.
    pub state_revert_ms: u64,
    /// Settle delay between select-all and insert in the emulated edit path.
    pub insert_settle_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            composer_marker: "sparkpane-composer-control".into(),
            message_marker: "sparkpane-summarize-button".into(),
            summary_marker: "sparkpane-summary".into(),
            state_revert_ms: 2000,
            insert_settle_ms: 50,
        }
    }
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("sparkpane.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Some(candidate);
            }
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        let candidate = cwd.join("sparkpane.toml");
        if candidate.exists() {
            tracing::debug!(path = %candidate.display(), "config found in working directory");
            return Some(candidate);
        }
    }

    None
}

/// Load the config file, or fall back to built-in defaults when absent.
/// A present-but-unparsable file is an error; silently masking a typo with
/// defaults would be worse than failing loudly.
pub fn load_config() -> SparkResult<AppConfig> {
    let Some(path) = resolve_config_path() else {
        tracing::debug!("no sparkpane.toml found, using built-in defaults");
        return Ok(AppConfig::default());
    };
    let content = std::fs::read_to_string(&path)?;
    let config: AppConfig = toml::from_str(&content)?;
    tracing::info!(path = %path.display(), "config loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_section() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.llm.openai.model, "gpt-4o");
        assert!(!cfg.selectors.message_input.is_empty());
        assert_eq!(cfg.presence.max_startup_attempts, 40);
        assert_eq!(cfg.ui.state_revert_ms, 2000);
    }

    #[test]
    fn partial_toml_fills_missing_sections() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [ui]
            composer_marker = "x-control"
            message_marker = "x-button"
            summary_marker = "x-summary"
            state_revert_ms = 500
            insert_settle_ms = 10
            "#,
        )
        .unwrap();
        assert_eq!(cfg.ui.composer_marker, "x-control");
        assert_eq!(cfg.llm.gemini.model, "gemini-2.0-flash");
    }
}
