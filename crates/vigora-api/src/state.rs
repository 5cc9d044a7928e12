//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by the REST API.
//! Services are generic over repository/hasher/provider traits, but AppState
//! pins them to the concrete infra implementations.

use std::sync::Arc;

use vigora_core::activity::ActivityService;
use vigora_core::auth::AuthService;
use vigora_core::chat::{ChatService, TurnCoordinator};
use vigora_core::profile::ProfileService;
use vigora_infra::crypto::Argon2PasswordHasher;
use vigora_infra::llm::gemini::GeminiProvider;
use vigora_infra::sqlite::activity::SqliteActivityRepository;
use vigora_infra::sqlite::chat::SqliteChatRepository;
use vigora_infra::sqlite::pool::DatabasePool;
use vigora_infra::sqlite::session::SqliteSessionRepository;
use vigora_infra::sqlite::user::SqliteUserRepository;

use crate::config::ServerConfig;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteAuthService =
    AuthService<SqliteSessionRepository, SqliteUserRepository, Argon2PasswordHasher>;

pub type ConcreteChatService = ChatService<SqliteChatRepository>;

pub type ConcreteTurnCoordinator = TurnCoordinator<SqliteChatRepository, GeminiProvider>;

pub type ConcreteActivityService = ActivityService<SqliteActivityRepository>;

pub type ConcreteProfileService = ProfileService<SqliteUserRepository>;

/// Shared application state holding all services.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<ConcreteAuthService>,
    pub chats: Arc<ConcreteChatService>,
    pub turns: Arc<ConcreteTurnCoordinator>,
    pub activities: Arc<ConcreteActivityService>,
    pub profiles: Arc<ConcreteProfileService>,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: connect to the DB, wire services.
    pub async fn init(config: &ServerConfig) -> anyhow::Result<Self> {
        // Ensure data directory exists
        tokio::fs::create_dir_all(&config.data_dir).await?;

        let db_url = format!(
            "sqlite://{}?mode=rwc",
            config.data_dir.join("vigora.db").display()
        );
        let db_pool = DatabasePool::new(&db_url).await?;

        let auth = AuthService::new(
            SqliteSessionRepository::new(db_pool.clone()),
            SqliteUserRepository::new(db_pool.clone()),
            Argon2PasswordHasher::new(),
        );

        let chats = Arc::new(ChatService::new(SqliteChatRepository::new(db_pool.clone())));

        let mut provider =
            GeminiProvider::new(config.gemini_api_key.clone(), config.model.clone());
        if let Some(base_url) = &config.gemini_base_url {
            provider = provider.with_base_url(base_url.clone());
        }
        let turns = TurnCoordinator::new(Arc::clone(&chats), Arc::new(provider));

        let activities = ActivityService::new(SqliteActivityRepository::new(db_pool.clone()));
        let profiles = ProfileService::new(SqliteUserRepository::new(db_pool.clone()));

        Ok(Self {
            auth: Arc::new(auth),
            chats,
            turns: Arc::new(turns),
            activities: Arc::new(activities),
            profiles: Arc::new(profiles),
            db_pool,
        })
    }
}
