//! Tutor prompts and prompt assembly.
//!
//! The system prompt is static pedagogical instruction; per-turn context
//! comes from the conversation's post-compaction view. When a summary
//! exists it is injected as a synthetic user/assistant exchange so every
//! provider sees it as ordinary conversation history.

use mentora_types::ai::Message;
use mentora_types::chat::InboundMessage;
use mentora_types::conversation::Conversation;

/// Fixed, user-safe reply when every provider failed. Vendor error text is
/// never shown to the student.
pub const APOLOGY: &str = "Maaf, saya sedang mengalami masalah teknikal. Cuba lagi sebentar.";

/// Confirmation for `/clear`.
pub const CLEAR_CONFIRMATION: &str =
    "Perbualan telah dipadam. Hantar soalan baru bila anda sedia!";

/// Generic noun used when the sender has no usable display name.
const FALLBACK_NAME: &str = "pelajar";

/// Acknowledgment paired with the injected summary message.
pub(crate) const SUMMARY_ACK: &str =
    "Baik, saya ingat perbualan kita setakat ini. Mari sambung.";

/// Static pedagogical instructions for the teaching completion.
pub fn system_prompt() -> &'static str {
    "You are Mentora, a friendly and encouraging mathematics tutor for Malaysian secondary school students.

CURRICULUM: KSSM Matematik (Form 1, 2, 3) — focus on Algebra topics.

LANGUAGE: Respond in the same language the student uses. Most students use Bahasa Melayu or English. Mix both if the student does.

TEACHING STYLE:
- Start with what the student knows, build from there
- Use simple, relatable examples (Malaysian context: ringgit, kopitiam, school scenarios)
- Break complex problems into small steps
- Celebrate small wins (\"Bagus!\", \"Betul!\")
- If the student is stuck, give a hint before the answer
- Use mathematical notation where needed
- Keep responses concise — this is a chat, not a textbook

RULES:
- Never give answers without explanation
- Always check if the student understood before moving on
- If unsure of the student's level, ask a diagnostic question
- Be patient and never condescending"
}

/// Localized welcome for `/start`, naming the student when possible.
///
/// Name fallback chain: first name, then username, then a generic noun.
pub fn welcome_message(msg: &InboundMessage) -> String {
    let name = msg
        .first_name
        .as_deref()
        .filter(|s| !s.is_empty())
        .or(msg.username.as_deref().filter(|s| !s.is_empty()))
        .unwrap_or(FALLBACK_NAME);

    format!(
        "Hai {name}!

Saya Mentora — tutor matematik peribadi anda!

Saya boleh membantu anda dengan KSSM Matematik:
- Tingkatan 1
- Tingkatan 2
- Tingkatan 3

Apa yang anda ingin belajar hari ini?"
    )
}

/// Usage hint for unrecognized commands.
pub fn unknown_command(command: &str) -> String {
    format!("Arahan tidak diketahui: {command}\nGuna /start untuk bermula.")
}

/// Assemble the completion prompt: one system message followed by the
/// conversation's context messages.
///
/// With a summary, the context is a synthetic exchange carrying the
/// summary plus only the messages after the compaction watermark; without
/// one, the full message log is used.
pub fn build_prompt(conversation: &Conversation) -> Vec<Message> {
    let mut messages = vec![Message::system(system_prompt())];

    match &conversation.summary {
        Some(summary) if conversation.compacted_at > 0 => {
            messages.push(Message::user(format!(
                "Previous conversation summary: {summary}"
            )));
            messages.push(Message::assistant(SUMMARY_ACK));
            messages.extend(
                conversation
                    .uncompacted()
                    .iter()
                    .map(|m| Message {
                        role: m.role,
                        content: m.content.clone(),
                        image_urls: Vec::new(),
                    }),
            );
        }
        _ => {
            messages.extend(conversation.messages.iter().map(|m| Message {
                role: m.role,
                content: m.content.clone(),
                image_urls: Vec::new(),
            }));
        }
    }

    messages
}
