//! Chat-completion plumbing shared by statement extraction and insights.

mod openai;

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{LedgerError, LedgerResult};

pub(crate) use openai::OpenAiClient;

/// A model that turns a prompt into raw text. Callers validate the text;
/// implementations only transport it.
pub(crate) trait CompletionClient {
    fn complete(&self, prompt: &str) -> LedgerResult<String>;
}

static CODE_FENCE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)^```[A-Za-z]*\s*\n(.*?)\n?\s*```$").ok());

/// Drop a surrounding Markdown code fence, if any.
pub(crate) fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    CODE_FENCE
        .as_ref()
        .and_then(|re| re.captures(trimmed))
        .and_then(|caps| caps.get(1))
        .map_or(trimmed, |body| body.as_str().trim())
}

/// Parse a model reply as a JSON value. Empty output is an AI failure;
/// anything that is not JSON is bad input.
pub(crate) fn parse_reply(raw: &str) -> LedgerResult<serde_json::Value> {
    if raw.trim().is_empty() {
        return Err(LedgerError::AiError("model returned an empty response".into()));
    }
    serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| LedgerError::invalid(format!("model response is not JSON: {e}")))
}
