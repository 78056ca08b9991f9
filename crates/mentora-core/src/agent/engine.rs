//! The conversation engine: Mentora's message-processing pipeline.
//!
//! Per inbound message: dispatch commands, fetch-or-create the active
//! conversation, persist the user message (with reply-to context), run the
//! compaction check, assemble the prompt, call the router, persist the
//! assistant reply, and emit analytics events. A transport/model failure
//! never surfaces to the chat layer -- the student gets a fixed apology.
//!
//! Turns for one user are serialized with a per-user async lock, so a
//! burst of messages from the same student cannot interleave the
//! load-compact-append sequence on their conversation.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::json;

use mentora_types::ai::{CompletionRequest, TaskType};
use mentora_types::chat::InboundMessage;
use mentora_types::config::EngineConfig;
use mentora_types::conversation::{Conversation, StoredMessage};
use mentora_types::event::{Event, EventKind};

use crate::agent::events::EventDispatcher;
use crate::agent::store::ConversationStore;
use crate::agent::{prompt, summarizer};
use crate::ai::router::AiRouter;

/// Core conversation processor, generic over the persistence backend.
pub struct Engine<S> {
    router: Arc<AiRouter>,
    store: S,
    events: EventDispatcher,
    config: EngineConfig,
    user_locks: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
}

impl<S: ConversationStore> Engine<S> {
    pub fn new(
        router: Arc<AiRouter>,
        store: S,
        events: EventDispatcher,
        config: EngineConfig,
    ) -> Self {
        Self {
            router,
            store,
            events,
            config,
            user_locks: DashMap::new(),
        }
    }

    /// Handle an incoming message and produce the response text.
    ///
    /// Never fails: command handling, store errors, and provider errors
    /// all resolve to a user-facing string.
    pub async fn process_message(&self, msg: &InboundMessage) -> String {
        tracing::info!(
            channel = %msg.channel,
            user_id = %msg.user_id,
            text_len = msg.text.len(),
            "processing message"
        );

        let lock = self.user_lock(&msg.user_id);
        let _guard = lock.lock().await;

        // Commands never reach the router.
        if msg.text.starts_with('/') {
            return self.handle_command(msg).await;
        }

        let mut conversation = self.active_or_new_conversation(msg).await;

        let user_message = StoredMessage::user(user_message_content(msg));
        let persisted = match self.store.add_message(&conversation.id, &user_message).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(
                    conversation_id = %conversation.id,
                    error = %err,
                    "failed to persist user message, continuing"
                );
                false
            }
        };
        self.events.dispatch(Event::new(
            EventKind::MessageSent,
            conversation.id,
            &msg.user_id,
            json!({
                "channel": msg.channel,
                "has_image": msg.has_image(),
                "has_reply": msg.has_reply(),
            }),
        ));

        // Re-read to pick up the just-appended state; degrade to the local
        // copy when the store cannot serve it.
        if persisted {
            match self.store.get_conversation(&conversation.id).await {
                Ok(Some(fresh)) => conversation = fresh,
                Ok(None) => conversation.messages.push(user_message),
                Err(err) => {
                    tracing::warn!(
                        conversation_id = %conversation.id,
                        error = %err,
                        "failed to re-read conversation, using local copy"
                    );
                    conversation.messages.push(user_message);
                }
            }
        } else {
            conversation.messages.push(user_message);
        }

        self.maybe_compact(&mut conversation).await;

        let request = CompletionRequest {
            messages: prompt::build_prompt(&conversation),
            model: None,
            max_tokens: Some(self.config.max_response_tokens),
            temperature: None,
            task: TaskType::Teaching,
        };

        let response = match self.router.complete(&request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(user_id = %msg.user_id, error = %err, "AI completion failed");
                return prompt::APOLOGY.to_string();
            }
        };

        let assistant = StoredMessage::assistant(
            response.content.clone(),
            response.model.clone(),
            response.input_tokens,
            response.output_tokens,
        );
        if let Err(err) = self.store.add_message(&conversation.id, &assistant).await {
            tracing::warn!(
                conversation_id = %conversation.id,
                error = %err,
                "failed to persist assistant message"
            );
        }
        self.events.dispatch(Event::new(
            EventKind::AiResponse,
            conversation.id,
            &msg.user_id,
            json!({
                "channel": msg.channel,
                "model": response.model,
                "input_tokens": response.input_tokens,
                "output_tokens": response.output_tokens,
            }),
        ));

        response.content
    }

    async fn handle_command(&self, msg: &InboundMessage) -> String {
        let command = msg.text.split_whitespace().next().unwrap_or(&msg.text);

        match command {
            "/start" => {
                self.end_active_conversation(&msg.user_id).await;
                prompt::welcome_message(msg)
            }
            "/clear" => {
                self.end_active_conversation(&msg.user_id).await;
                prompt::CLEAR_CONFIRMATION.to_string()
            }
            other => prompt::unknown_command(other),
        }
    }

    /// End the user's active conversation, if any. Store failures are
    /// logged; the command still answers.
    async fn end_active_conversation(&self, user_id: &str) {
        match self.store.get_active_conversation(user_id).await {
            Ok(Some(conversation)) => {
                if let Err(err) = self.store.end_conversation(&conversation.id).await {
                    tracing::warn!(
                        conversation_id = %conversation.id,
                        error = %err,
                        "failed to end conversation"
                    );
                }
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(user_id = %user_id, error = %err, "failed to look up active conversation");
            }
        }
    }

    /// Fetch the active conversation or lazily create one.
    ///
    /// A create failure degrades to an ephemeral conversation so the turn
    /// still produces an answer.
    async fn active_or_new_conversation(&self, msg: &InboundMessage) -> Conversation {
        match self.store.get_active_conversation(&msg.user_id).await {
            Ok(Some(conversation)) => return conversation,
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(user_id = %msg.user_id, error = %err, "failed to load active conversation");
            }
        }

        let conversation = Conversation::new(&msg.user_id);
        if let Err(err) = self.store.create_conversation(&conversation).await {
            tracing::warn!(
                user_id = %msg.user_id,
                error = %err,
                "failed to persist new conversation, continuing unpersisted"
            );
        }
        self.events.dispatch(Event::new(
            EventKind::SessionStarted,
            conversation.id,
            &msg.user_id,
            json!({"channel": msg.channel}),
        ));

        conversation
    }

    /// Compact the conversation when thresholds are exceeded.
    ///
    /// Compaction never blocks or fails the turn: on any failure the
    /// uncompacted history is still used for the current prompt and the
    /// check will fire again on a later turn.
    async fn maybe_compact(&self, conversation: &mut Conversation) {
        let uncompacted = conversation.uncompacted();
        if uncompacted.len() <= self.config.compact_threshold
            && summarizer::estimate_tokens(uncompacted) <= self.config.compact_token_threshold
        {
            return;
        }

        let compact_up_to = conversation
            .messages
            .len()
            .saturating_sub(self.config.keep_recent);
        if compact_up_to <= conversation.compacted_at {
            // Everything new is inside the verbatim window.
            return;
        }

        let segment = &conversation.messages[conversation.compacted_at..compact_up_to];
        let summary = match summarizer::summarize(
            &self.router,
            segment,
            conversation.summary.as_deref(),
        )
        .await
        {
            Ok(summary) if !summary.is_empty() => summary,
            Ok(_) => return,
            Err(err) => {
                tracing::warn!(
                    conversation_id = %conversation.id,
                    error = %err,
                    "summarization failed, continuing without compaction"
                );
                return;
            }
        };

        if let Err(err) = self
            .store
            .set_summary(&conversation.id, &summary, compact_up_to)
            .await
        {
            tracing::warn!(
                conversation_id = %conversation.id,
                error = %err,
                "failed to persist summary, continuing without compaction"
            );
            return;
        }

        tracing::debug!(
            conversation_id = %conversation.id,
            compacted_at = compact_up_to,
            "conversation compacted"
        );
        conversation.summary = Some(summary);
        conversation.compacted_at = compact_up_to;
    }

    fn user_lock(&self, user_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.user_locks
            .entry(user_id.to_string())
            .or_default()
            .clone()
    }
}

/// Content stored for a user message: the inbound text, prefixed with an
/// explicit marker when the student replied to an earlier message, so the
/// model sees what was being replied to.
fn user_message_content(msg: &InboundMessage) -> String {
    match msg.reply_to_text.as_deref().filter(|t| !t.is_empty()) {
        Some(quoted) => format!("[Replying to: \"{quoted}\"]\n{}", msg.text),
        None => msg.text.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::events::{EventDispatcher, MemoryEventLogger, NopEventLogger};
    use crate::agent::store::MemoryConversationStore;
    use crate::ai::box_provider::BoxAiProvider;
    use crate::ai::provider::AiProvider;
    use futures_util::Stream;
    use mentora_types::ai::{
        AiError, CompletionResponse, MessageRole, ModelInfo, StreamChunk,
    };
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// Shared handles into the scripted provider so tests can steer
    /// responses and inspect every request the engine issued.
    #[derive(Clone)]
    struct Script {
        response: Arc<Mutex<String>>,
        fail: Arc<AtomicBool>,
        requests: Arc<Mutex<Vec<CompletionRequest>>>,
    }

    impl Script {
        fn new(response: &str) -> Self {
            Self {
                response: Arc::new(Mutex::new(response.to_string())),
                fail: Arc::new(AtomicBool::new(false)),
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn set_response(&self, response: &str) {
            *self.response.lock().unwrap() = response.to_string();
        }

        fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }

        fn last_request(&self) -> CompletionRequest {
            self.requests
                .lock()
                .unwrap()
                .last()
                .cloned()
                .expect("no requests recorded")
        }

        fn analysis_calls(&self) -> usize {
            self.requests()
                .iter()
                .filter(|r| r.task == TaskType::Analysis)
                .count()
        }
    }

    struct ScriptedProvider {
        script: Script,
    }

    impl AiProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "mock"
        }

        fn models(&self) -> Vec<ModelInfo> {
            vec![ModelInfo {
                id: "mock".to_string(),
                name: "Mock Model".to_string(),
                max_tokens: 4096,
                description: "test mock".to_string(),
            }]
        }

        fn complete(
            &self,
            request: &CompletionRequest,
        ) -> impl Future<Output = Result<CompletionResponse, AiError>> + Send {
            self.script.requests.lock().unwrap().push(request.clone());
            let fail = self.script.fail.load(Ordering::SeqCst);
            let content = self.script.response.lock().unwrap().clone();
            async move {
                if fail {
                    return Err(AiError::Transport("mock provider down".to_string()));
                }
                let output_tokens = content.len() as u32;
                Ok(CompletionResponse {
                    content,
                    model: "mock".to_string(),
                    input_tokens: 10,
                    output_tokens,
                })
            }
        }

        fn stream_complete(
            &self,
            _request: CompletionRequest,
        ) -> Pin<Box<dyn Stream<Item = Result<StreamChunk, AiError>> + Send + 'static>> {
            let content = self.script.response.lock().unwrap().clone();
            Box::pin(async_stream::stream! {
                yield Ok(StreamChunk { content, done: true });
            })
        }

        fn health_check(&self) -> impl Future<Output = Result<(), AiError>> + Send {
            async { Ok(()) }
        }
    }

    type TestEngine = Engine<Arc<MemoryConversationStore>>;

    fn make_engine(config: EngineConfig) -> (TestEngine, Script, Arc<MemoryConversationStore>) {
        let script = Script::new("response");
        let mut router = AiRouter::new();
        router.register(
            "mock",
            BoxAiProvider::new(ScriptedProvider {
                script: script.clone(),
            }),
        );
        let store = Arc::new(MemoryConversationStore::new());
        let (events, _handle) = EventDispatcher::spawn(NopEventLogger, 64);
        let engine = Engine::new(Arc::new(router), Arc::clone(&store), events, config);
        (engine, script, store)
    }

    fn inbound(user_id: &str, text: &str) -> InboundMessage {
        InboundMessage {
            channel: "telegram".to_string(),
            user_id: user_id.to_string(),
            text: text.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_process_message_returns_ai_response() {
        let (engine, script, _) = make_engine(EngineConfig::default());
        script.set_response("Algebra is about unknowns.");

        let reply = engine
            .process_message(&inbound("123", "What is algebra?"))
            .await;
        assert_eq!(reply, "Algebra is about unknowns.");
    }

    #[tokio::test]
    async fn test_start_command_welcomes_by_name_without_calling_ai() {
        let (engine, script, _) = make_engine(EngineConfig::default());

        let msg = InboundMessage {
            first_name: Some("Ali".to_string()),
            ..inbound("123", "/start")
        };
        let reply = engine.process_message(&msg).await;

        assert!(reply.contains("Ali"), "welcome should name the student: {reply}");
        assert!(script.requests().is_empty(), "commands must not call the router");
    }

    #[tokio::test]
    async fn test_start_command_without_name_still_welcomes() {
        let (engine, _, _) = make_engine(EngineConfig::default());
        let reply = engine.process_message(&inbound("123", "/start")).await;
        assert!(reply.contains("pelajar"));
    }

    #[tokio::test]
    async fn test_unknown_command_returns_hint() {
        let (engine, script, _) = make_engine(EngineConfig::default());
        let reply = engine.process_message(&inbound("123", "/quiz algebra")).await;
        assert!(reply.contains("/quiz"));
        assert!(reply.contains("/start"));
        assert!(script.requests().is_empty());
    }

    #[tokio::test]
    async fn test_ai_failure_returns_apology_not_error() {
        let (engine, script, store) = make_engine(EngineConfig::default());
        script.fail.store(true, Ordering::SeqCst);

        let reply = engine.process_message(&inbound("123", "What is x+1?")).await;
        assert_eq!(reply, prompt::APOLOGY);

        // The user's message was still recorded.
        let conv = store.get_active_conversation("123").await.unwrap().unwrap();
        assert_eq!(conv.messages.len(), 1);
        assert_eq!(conv.messages[0].content, "What is x+1?");
    }

    #[tokio::test]
    async fn test_conversation_history_included_in_prompt() {
        let (engine, script, _) = make_engine(EngineConfig::default());

        script.set_response("Response 1");
        engine.process_message(&inbound("123", "What is x?")).await;

        script.set_response("Response 2");
        engine.process_message(&inbound("123", "What about y?")).await;

        let msgs = script.last_request().messages;
        assert_eq!(msgs.len(), 4);
        assert_eq!(msgs[0].role, MessageRole::System);
        assert_eq!(msgs[1].content, "What is x?");
        assert_eq!(msgs[2].role, MessageRole::Assistant);
        assert_eq!(msgs[2].content, "Response 1");
        assert_eq!(msgs[3].content, "What about y?");
    }

    #[tokio::test]
    async fn test_assistant_message_persisted_with_model_and_tokens() {
        let (engine, script, store) = make_engine(EngineConfig::default());
        script.set_response("Betul!");

        engine.process_message(&inbound("123", "Is 2+2=4?")).await;

        let conv = store.get_active_conversation("123").await.unwrap().unwrap();
        assert_eq!(conv.messages.len(), 2);
        let assistant = &conv.messages[1];
        assert_eq!(assistant.role, MessageRole::Assistant);
        assert_eq!(assistant.model.as_deref(), Some("mock"));
        assert_eq!(assistant.input_tokens, Some(10));
        assert!(assistant.output_tokens.is_some());
    }

    #[tokio::test]
    async fn test_double_start_fully_clears_history() {
        let (engine, script, store) = make_engine(EngineConfig::default());

        engine.process_message(&inbound("123", "Old question")).await;
        engine.process_message(&inbound("123", "/start")).await;
        engine.process_message(&inbound("123", "/start")).await;
        engine.process_message(&inbound("123", "Fresh start")).await;

        // Prompt carries no pre-/start content.
        let msgs = script.last_request().messages;
        assert_eq!(msgs.len(), 2, "expected system + fresh user only");
        assert_eq!(msgs[1].content, "Fresh start");

        // The new active conversation's log starts after the second /start.
        let conv = store.get_active_conversation("123").await.unwrap().unwrap();
        assert_eq!(conv.messages.len(), 2);
        assert_eq!(conv.messages[0].content, "Fresh start");
    }

    #[tokio::test]
    async fn test_clear_ends_conversation() {
        let (engine, _, store) = make_engine(EngineConfig::default());

        engine.process_message(&inbound("123", "Question")).await;
        assert!(store.get_active_conversation("123").await.unwrap().is_some());

        let reply = engine.process_message(&inbound("123", "/clear")).await;
        assert_eq!(reply, prompt::CLEAR_CONFIRMATION);
        assert!(store.get_active_conversation("123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reply_to_text_prefixes_stored_message() {
        let (engine, script, store) = make_engine(EngineConfig::default());

        let msg = InboundMessage {
            reply_to_text: Some("Step 2: isolate x".to_string()),
            ..inbound("123", "I don't get it")
        };
        engine.process_message(&msg).await;

        let conv = store.get_active_conversation("123").await.unwrap().unwrap();
        let stored = &conv.messages[0].content;
        assert!(stored.contains("Replying to"), "got: {stored}");
        assert!(stored.contains("Step 2: isolate x"));
        assert!(stored.contains("I don't get it"));

        // The prompt's final user message carries the same context.
        let msgs = script.last_request().messages;
        let last_user = msgs.last().unwrap();
        assert!(last_user.content.contains("Step 2: isolate x"));
    }

    fn compaction_config() -> EngineConfig {
        EngineConfig {
            compact_threshold: 6,
            compact_token_threshold: 1_000_000,
            keep_recent: 2,
            max_response_tokens: 1024,
        }
    }

    #[tokio::test]
    async fn test_compaction_sets_summary_and_watermark() {
        let (engine, script, store) = make_engine(compaction_config());

        for i in 0..4 {
            script.set_response(&format!("response {i}"));
            engine
                .process_message(&inbound("123", &format!("question {i}")))
                .await;
        }

        let conv = store.get_active_conversation("123").await.unwrap().unwrap();
        assert_eq!(conv.messages.len(), 8);
        let summary = conv.summary.as_deref().expect("summary should be set");
        assert!(!summary.is_empty());
        assert!(conv.compacted_at > 0 && conv.compacted_at < 8);
    }

    #[tokio::test]
    async fn test_compacted_prompt_injects_summary() {
        let (engine, script, _) = make_engine(compaction_config());

        for i in 0..4 {
            script.set_response(&format!("response {i}"));
            engine
                .process_message(&inbound("123", &format!("question {i}")))
                .await;
        }

        script.set_response("final response");
        engine.process_message(&inbound("123", "another question")).await;

        let msgs = script.last_request().messages;
        // Without compaction this would be system + 9 messages = 10.
        assert!(msgs.len() < 10, "expected a compacted prompt, got {}", msgs.len());
        assert_eq!(msgs[0].role, MessageRole::System);
        assert!(msgs[1].content.contains("Previous conversation summary"));
    }

    #[tokio::test]
    async fn test_compaction_not_repeated_while_under_threshold() {
        let (engine, script, _) = make_engine(compaction_config());

        for i in 0..4 {
            script.set_response(&format!("response {i}"));
            engine
                .process_message(&inbound("123", &format!("q{i}")))
                .await;
        }
        let after_first_burst = script.analysis_calls();
        assert_eq!(after_first_burst, 1, "expected exactly one summarization");

        for i in 0..2 {
            script.set_response(&format!("more response {i}"));
            engine
                .process_message(&inbound("123", &format!("more q{i}")))
                .await;
        }
        assert_eq!(
            script.analysis_calls(),
            after_first_burst,
            "already-summarized content must not be re-summarized"
        );
    }

    #[tokio::test]
    async fn test_compaction_triggers_on_token_threshold() {
        let config = EngineConfig {
            compact_threshold: 100,
            compact_token_threshold: 200,
            keep_recent: 2,
            max_response_tokens: 1024,
        };
        let (engine, script, store) = make_engine(config);

        let long_text = "a".repeat(400);
        for _ in 0..3 {
            script.set_response(&long_text);
            engine.process_message(&inbound("token-user", &long_text)).await;
        }

        let conv = store
            .get_active_conversation("token-user")
            .await
            .unwrap()
            .unwrap();
        assert!(
            conv.summary.is_some(),
            "token-size threshold should have triggered compaction"
        );
    }

    #[tokio::test]
    async fn test_no_compaction_under_thresholds() {
        let config = EngineConfig {
            compact_threshold: 20,
            compact_token_threshold: 1_000_000,
            keep_recent: 6,
            max_response_tokens: 1024,
        };
        let (engine, script, store) = make_engine(config);

        for i in 0..3 {
            script.set_response(&format!("response {i}"));
            engine
                .process_message(&inbound("123", &format!("q{i}")))
                .await;
        }

        // system + u0 a0 u1 a1 u2 = 6, the full uncompacted log.
        assert_eq!(script.last_request().messages.len(), 6);
        assert_eq!(script.analysis_calls(), 0);

        let conv = store.get_active_conversation("123").await.unwrap().unwrap();
        assert!(conv.summary.is_none());
        assert_eq!(conv.compacted_at, 0);
    }

    #[tokio::test]
    async fn test_concurrent_messages_from_one_user_are_serialized() {
        let (engine, _, store) = make_engine(EngineConfig::default());
        let engine = Arc::new(engine);

        let a = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.process_message(&inbound("123", "first")).await })
        };
        let b = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.process_message(&inbound("123", "second")).await })
        };
        a.await.unwrap();
        b.await.unwrap();

        let conv = store.get_active_conversation("123").await.unwrap().unwrap();
        assert_eq!(conv.messages.len(), 4);
        assert_eq!(conv.messages[0].role, MessageRole::User);
        assert_eq!(conv.messages[1].role, MessageRole::Assistant);
        assert_eq!(conv.messages[2].role, MessageRole::User);
        assert_eq!(conv.messages[3].role, MessageRole::Assistant);
    }

    #[tokio::test]
    async fn test_events_emitted_for_a_turn() {
        use mentora_types::event::EventKind;

        let script = Script::new("ok");
        let mut router = AiRouter::new();
        router.register(
            "mock",
            BoxAiProvider::new(ScriptedProvider {
                script: script.clone(),
            }),
        );
        let logger = Arc::new(MemoryEventLogger::new());
        let (events, handle) = EventDispatcher::spawn(Arc::clone(&logger), 64);
        let engine = Engine::new(
            Arc::new(router),
            Arc::new(MemoryConversationStore::new()),
            events,
            EngineConfig::default(),
        );

        engine.process_message(&inbound("123", "What is x?")).await;

        drop(engine);
        handle.await.unwrap();

        let kinds: Vec<EventKind> = logger.events().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::SessionStarted,
                EventKind::MessageSent,
                EventKind::AiResponse
            ]
        );

        let events = logger.events();
        let ai_event = &events[2];
        assert_eq!(ai_event.data["model"], "mock");
        assert_eq!(ai_event.data["channel"], "telegram");
    }
}
