//! Application Startup
//!
//! Backend selection, shared state and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use redis::aio::ConnectionManager;
use tokio::net::TcpListener;

use crate::application::services::{ChatAssemblyService, ChatService, MessageDispatcher};
use crate::config::{AuthStrategy, Settings, StorageBackend};
use crate::domain::{ChatStore, IdentityProvider};
use crate::infrastructure::cache::{self, RedisSessionIdentityProvider};
use crate::infrastructure::database;
use crate::infrastructure::identity::JwtIdentityProvider;
use crate::infrastructure::memory::InMemoryChatStore;
use crate::infrastructure::realtime::ListenerRegistry;
use crate::infrastructure::repositories::PgChatStore;
use crate::presentation::http::{handlers, routes};
use crate::presentation::middleware::{cors, logging};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ChatStore>,
    pub registry: Arc<ListenerRegistry>,
    pub dispatcher: Arc<MessageDispatcher>,
    pub assembly: Arc<ChatAssemblyService>,
    pub chats: Arc<ChatService>,
    pub identity: Arc<dyn IdentityProvider>,
    /// Present only when sessions are resolved through Redis
    pub redis: Option<ConnectionManager>,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Wire the services around an already constructed store and identity provider.
    pub fn new(
        store: Arc<dyn ChatStore>,
        identity: Arc<dyn IdentityProvider>,
        redis: Option<ConnectionManager>,
        settings: Settings,
    ) -> Self {
        let registry = Arc::new(ListenerRegistry::new(settings.delivery.clone()));
        let dispatcher = Arc::new(MessageDispatcher::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            &settings.delivery,
        ));
        let assembly = Arc::new(ChatAssemblyService::new(
            Arc::clone(&store),
            settings.history.clone(),
        ));
        let chats = Arc::new(ChatService::new(Arc::clone(&store), Arc::clone(&dispatcher)));

        Self {
            store,
            registry,
            dispatcher,
            assembly,
            chats,
            identity,
            redis,
            settings: Arc::new(settings),
        }
    }

    /// Connect the configured storage and identity backends.
    pub async fn build(settings: Settings) -> Result<Self> {
        let store: Arc<dyn ChatStore> = match settings.storage.backend {
            StorageBackend::Postgres => {
                let pool = database::connect(&settings.database).await?;
                tracing::info!("Database connection pool created");
                Arc::new(PgChatStore::new(pool))
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory chat store; data is lost on shutdown");
                Arc::new(InMemoryChatStore::new())
            }
        };

        let (identity, redis) = match settings.auth.strategy {
            AuthStrategy::Jwt => {
                let provider: Arc<dyn IdentityProvider> =
                    Arc::new(JwtIdentityProvider::new(&settings.jwt.secret));
                (provider, None)
            }
            AuthStrategy::Session => {
                let redis = cache::create_redis_client(&settings.redis).await?;
                let provider: Arc<dyn IdentityProvider> = Arc::new(RedisSessionIdentityProvider::new(
                    redis.clone(),
                    settings.redis.session_prefix.clone(),
                ));
                (provider, Some(redis))
            }
        };

        Ok(Self::new(store, identity, redis, settings))
    }
}

/// Router with the tracing and CORS layers applied
pub fn build_router(state: AppState) -> Router {
    let cors = cors::create_cors_layer(&state.settings.cors);
    routes::create_router(state)
        .layer(logging::create_trace_layer())
        .layer(cors)
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        handlers::health::init_server_start();

        let addr = settings.server_addr();
        let state = AppState::build(settings).await?;
        let router = build_router(state);

        let listener = TcpListener::bind(&addr).await?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self { listener, router })
    }

    /// Run the server until Ctrl+C
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        tracing::info!("Server stopped");
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
