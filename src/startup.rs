//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use sqlx::PgPool;
use tokio::net::TcpListener;

use crate::application::services::{ChatService, ChatServiceImpl};
use crate::config::Settings;
use crate::infrastructure::bus::{ChatBridge, MessageBroker, RedisBroker};
use crate::infrastructure::database;
use crate::infrastructure::repositories::{
    PgConversationRepository, PgMessageRepository, PgUserRepository,
};
use crate::presentation::http::handlers::health;
use crate::presentation::http::routes;
use crate::presentation::middleware::{create_cors_layer, create_trace_layer};
use crate::presentation::websocket::{ConnectionRegistry, Gateway};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub settings: Arc<Settings>,
    pub chat: Arc<dyn ChatService>,
    pub bridge: Arc<ChatBridge>,
    pub gateway: Arc<Gateway>,
}

impl AppState {
    /// Wire the gateway around an existing chat service and bus bridge.
    pub fn new(
        db: PgPool,
        settings: Settings,
        chat: Arc<dyn ChatService>,
        bridge: Arc<ChatBridge>,
    ) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let gateway = Arc::new(Gateway::new(
            registry,
            bridge.clone(),
            chat.clone(),
            settings.websocket.outbound_queue_capacity,
        ));

        Self {
            db,
            settings: Arc::new(settings),
            chat,
            bridge,
            gateway,
        }
    }
}

/// Full router with tracing and CORS applied
pub fn build_router(state: AppState) -> Router {
    let cors = create_cors_layer(&state.settings.cors);
    routes::create_router(state)
        .layer(create_trace_layer())
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
        health::init_server_start();

        // Create database pool
        let db = database::create_pool(&settings.database).await?;
        tracing::info!("Database connection pool created");

        if settings.database.run_migrations {
            database::run_migrations(&db).await?;
            tracing::info!("Database migrations applied");
        }

        // The broker connects in the background; until then delivery is
        // local-only
        let broker: Arc<dyn MessageBroker> = Arc::new(RedisBroker::connect(&settings.redis)?);
        let bridge = Arc::new(ChatBridge::new(broker));

        let chat: Arc<dyn ChatService> = Arc::new(ChatServiceImpl::new(
            Arc::new(PgUserRepository::new(db.clone())),
            Arc::new(PgMessageRepository::new(db.clone())),
            Arc::new(PgConversationRepository::new(db.clone())),
            bridge.clone(),
        ));

        let addr = settings.server_addr();
        let state = AppState::new(db, settings, chat, bridge);
        let router = build_router(state);

        // Bind to address
        let listener = TcpListener::bind(&addr).await?;
        tracing::info!("Listening on {}", addr);

        Ok(Self { listener, router })
    }

    /// Run the server until stopped
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
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
