//! Application state wiring the core services together.
//!
//! The engine is generic over its store; AppState pins it to the concrete
//! SQLite implementation.

use std::sync::Arc;

use mentora_core::agent::engine::Engine;
use mentora_core::agent::events::EventDispatcher;
use mentora_core::ai::router::AiRouter;
use mentora_infra::ai::build_router;
use mentora_infra::sqlite::conversation::SqliteConversationStore;
use mentora_infra::sqlite::event::SqliteEventLogger;
use mentora_infra::sqlite::pool::DatabasePool;
use mentora_types::config::AppConfig;

/// Concrete engine type pinned to the SQLite store.
pub type ConcreteEngine = Engine<SqliteConversationStore>;

/// Shared application state for HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ConcreteEngine>,
    pub router: Arc<AiRouter>,
}

impl AppState {
    /// Initialize the application state: connect to the database, build
    /// the provider chain, and wire the engine.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let pool = DatabasePool::new(&config.database.url).await?;

        let router = Arc::new(build_router(&config.providers));

        let logger = SqliteEventLogger::new(pool.clone());
        // The drain task lives for the process; its handle is not awaited.
        let (events, _drain) = EventDispatcher::spawn(logger, 256);

        let store = SqliteConversationStore::new(pool);
        let engine = Engine::new(Arc::clone(&router), store, events, config.engine);

        Ok(Self {
            engine: Arc::new(engine),
            router,
        })
    }
}
