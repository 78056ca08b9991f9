//! Conversation compaction support: token estimation and summarization.
//!
//! Long tutoring sessions are kept bounded by condensing older messages
//! into a short summary while a recent window stays verbatim. The token
//! estimate is a cheap chars/4 heuristic, not an exact tokenizer -- the
//! thresholds it feeds are soft limits, not billing.

use mentora_types::ai::{AiError, CompletionRequest, Message, TaskType};
use mentora_types::conversation::StoredMessage;

use crate::ai::router::AiRouter;

/// Instructions for the summarization call.
const SUMMARY_INSTRUCTIONS: &str = "You summarize tutoring conversations. Capture:
1. Topics covered so far
2. What the student understood and what they struggled with
3. Worked examples and where the student got stuck

Keep the summary under 150 words. Write it in the dominant language of the conversation.";

/// Per-message character overhead for role and structure.
const MESSAGE_OVERHEAD_CHARS: usize = 10;

/// Estimate the token count of a message window.
///
/// Uses the rough 1-token-per-4-characters average for mixed English/Malay
/// chat text.
pub fn estimate_tokens(messages: &[StoredMessage]) -> usize {
    let total_chars: usize = messages
        .iter()
        .map(|m| m.content.len() + MESSAGE_OVERHEAD_CHARS)
        .sum();
    total_chars.div_ceil(4)
}

/// Summarize a message segment via a separate analysis-tagged router call.
///
/// The previous summary, when present, is fed back as context so the new
/// summary stays cumulative.
#[tracing::instrument(skip_all, fields(message_count = messages.len()))]
pub async fn summarize(
    router: &AiRouter,
    messages: &[StoredMessage],
    previous_summary: Option<&str>,
) -> Result<String, AiError> {
    if messages.is_empty() {
        return Ok(String::new());
    }

    let transcript: String = messages
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut body = String::new();
    if let Some(previous) = previous_summary.filter(|s| !s.is_empty()) {
        body.push_str(&format!("Summary of the conversation so far:\n{previous}\n\n"));
    }
    body.push_str(&format!(
        "Summarize this conversation segment:\n\n<conversation>\n{transcript}\n</conversation>"
    ));

    let request = CompletionRequest {
        messages: vec![
            Message::system(SUMMARY_INSTRUCTIONS),
            Message::user(body),
        ],
        model: None,
        max_tokens: Some(300),
        temperature: Some(0.2),
        task: TaskType::Analysis,
    };

    let response = router.complete(&request).await?;
    Ok(response.content.trim().to_string())
}
