//! Core application: configuration, service wiring and lifecycle.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::api::ApiServer;
use crate::api::auth::AuthState;
use crate::api::routes::ApiState;
use crate::core::config::{AppConfig, LogFormat};
use crate::core::shutdown::ShutdownService;
use crate::data::cache::CacheService;
use crate::data::postgres::PostgresService;
use crate::data::search::SearchService;
use crate::data::topics::TopicService;
use crate::domain::Services;
use crate::domain::consumers::Workflow;
use crate::domain::expiration::ExpirationJob;
use crate::external::payment::PaymentClient;
use crate::external::ticketing::TicketingClient;

pub struct CoreApp {
    pub config: AppConfig,
    pub shutdown: ShutdownService,
    pub store: Arc<PostgresService>,
    pub cache: Arc<CacheService>,
    pub topics: Arc<TopicService>,
    pub search: Arc<SearchService>,
    pub services: Arc<Services>,
}

impl CoreApp {
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();

        let config = AppConfig::load()?;
        init_logging(&config);

        tracing::info!(
            version = env!("CARGO_PKG_VERSION"),
            cache_backend = %config.cache.backend,
            "Application starting"
        );

        let app = Self::init(config).await?;
        app.start().await
    }

    async fn init(config: AppConfig) -> Result<Self> {
        let store = Arc::new(
            PostgresService::init(&config.database)
                .await
                .context("Failed to initialize store")?,
        );
        tracing::debug!("Store initialized");

        let cache = Arc::new(
            CacheService::new(&config.cache)
                .await
                .context("Failed to initialize cache")?,
        );
        tracing::debug!(backend = cache.backend_name(), "Cache initialized");

        let topics = Arc::new(
            TopicService::from_cache_config(&config.cache)
                .await
                .context("Failed to initialize topics")?,
        );
        tracing::debug!(backend = topics.backend_name(), "Topics initialized");

        let search = Arc::new(
            SearchService::init(&config.search)
                .await
                .context("Failed to initialize search index")?,
        );
        tracing::debug!(index = %config.search.index, "Search initialized");

        let ticketing =
            Arc::new(TicketingClient::new(&config.ticketing).context("Ticketing client")?);
        let payment = Arc::new(PaymentClient::new(&config.payment).context("Payment client")?);

        let services = Arc::new(Services::new(
            Arc::clone(&store),
            Arc::clone(&search),
            Arc::clone(&cache),
            Arc::clone(&topics),
            payment,
            ticketing,
        ));

        Ok(Self {
            config,
            shutdown: ShutdownService::new(),
            store,
            cache,
            topics,
            search,
            services,
        })
    }

    async fn start(self) -> Result<()> {
        self.shutdown.install_signal_handlers();
        self.start_background_tasks().await?;

        let state = ApiState {
            services: Arc::clone(&self.services),
            store: Arc::clone(&self.store),
            search: Arc::clone(&self.search),
            cache: Arc::clone(&self.cache),
            events_cache_ttl: self.config.cache.events_ttl,
        };

        let auth_state = AuthState {
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
            users_hash_key: self.config.cache.users_hash_key.clone(),
        };

        let server = ApiServer::new(
            self.config.server.clone(),
            state,
            auth_state,
            self.shutdown.clone(),
        );
        server.start().await?;

        // HTTP is down; drain consumers and close the pool
        self.shutdown.shutdown().await;
        self.store.close().await;

        Ok(())
    }

    async fn start_background_tasks(&self) -> Result<()> {
        // Workflow consumers need a ticketing client of their own
        let ticketing = Arc::new(
            TicketingClient::new(&self.config.ticketing).context("Workflow ticketing client")?,
        );

        let workflow = Workflow::new(
            Arc::clone(&self.store),
            ticketing,
            Arc::clone(&self.topics),
            &self.config.bus,
        );
        for handle in workflow.start(self.shutdown.subscribe()) {
            self.shutdown.register(handle).await;
        }

        let expiration = ExpirationJob::new(Arc::clone(&self.store), Arc::clone(&self.topics));
        self.shutdown
            .register(expiration.start(self.shutdown.subscribe()))
            .await;

        tracing::debug!("Background tasks started");
        Ok(())
    }
}

fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("info,kassa_server={}", config.log.level)));

    match config.log.format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .json()
                .with_target(false)
                .with_env_filter(filter)
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .compact()
                .with_target(false)
                .with_env_filter(filter)
                .init();
        }
    }
}
