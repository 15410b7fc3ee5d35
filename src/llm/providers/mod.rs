pub mod gemini_generate;
pub mod openai_chat;

/// Turn a non-2xx response body into the message surfaced to the user:
/// the backend's own `error.message` when the body is JSON and carries one,
/// otherwise the bare HTTP status.
pub(crate) fn provider_error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("HTTP {status}"))
}
