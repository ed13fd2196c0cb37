//! Application state wiring the interview engine to its adapters.
//!
//! AppState holds the concrete service used by both CLI and REST API.
//! `InterviewService` is generic over repository/cache/hasher traits; AppState
//! pins it to the concrete infra implementations.

use std::path::PathBuf;
use std::sync::Arc;

use mockloop_core::clock::SystemClock;
use mockloop_core::interview::service::InterviewService;
use mockloop_infra::cache::{AnySessionCache, open_session_cache};
use mockloop_infra::config::{load_engine_config, resolve_data_dir};
use mockloop_infra::crypto::hash::Sha256ContentHasher;
use mockloop_infra::llm::build_registry;
use mockloop_infra::sqlite::interview::SqliteInterviewRepository;
use mockloop_infra::sqlite::pool::{DatabasePool, database_url_in};
use mockloop_types::config::EngineConfig;

/// Concrete type alias for the service generics pinned to infra implementations.
pub type ConcreteInterviewService =
    InterviewService<SqliteInterviewRepository, AnySessionCache, Sha256ContentHasher>;

/// Shared application state.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub interview_service: Arc<ConcreteInterviewService>,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize from the resolved data directory and its `config.toml`.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;
        let config = load_engine_config(&data_dir).await;
        Self::with_config(data_dir, config).await
    }

    /// Connect to `{data_dir}/mockloop.db` and wire the engine with `config`.
    pub async fn with_config(data_dir: PathBuf, config: EngineConfig) -> anyhow::Result<Self> {
        let db_url = format!("{}?mode=rwc", database_url_in(&data_dir));
        let db_pool = DatabasePool::new(&db_url).await?;

        let clock = Arc::new(SystemClock);
        let cache = open_session_cache(config.cache_backend, &db_pool, clock.clone()).await;
        tracing::debug!(backend = ?cache.backend(), data_dir = %data_dir.display(), "session cache opened");

        let registry = build_registry(&config);
        // A missing key for the default provider only matters once an
        // interview uses it; listing and showing still work.
        if let Err(e) = registry.validate(&[config.default_provider.as_str()]) {
            tracing::warn!(
                provider = %config.default_provider,
                error = %e,
                "default provider unavailable"
            );
        }

        let service = InterviewService::new(
            Arc::new(SqliteInterviewRepository::new(db_pool)),
            Arc::new(cache),
            Arc::new(Sha256ContentHasher::new()),
            Arc::new(registry),
            config,
        )
        .with_clock(clock);

        Ok(Self {
            interview_service: Arc::new(service),
            data_dir,
        })
    }
}
