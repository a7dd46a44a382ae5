mod config;
mod constants;
mod domain;
mod models;
mod prompts;
mod routes;
mod scheduler;
mod services;
mod storage;

use axum::{Json, Router, routing::get};
use serde_json::json;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use config::Config;
use constants::MAX_CONVERSATION_HISTORY;
use services::blog::BlogPublisher;
use services::conversations::InMemoryConversations;
use services::instagram::InstagramClient;
use services::openai::ChatClient;
use services::publisher::{MediaPublisher, PollConfig};
use services::replies::ReplyGenerator;
use services::webhook::WebhookDispatcher;
use services::wordpress::WordPressClient;

const SERVICE_NAME: &str = "instagram-dm-bot";

pub struct AppState {
    pub db: PgPool,
    pub verify_token: String,
    pub replies: Arc<ReplyGenerator>,
    pub publisher: MediaPublisher,
    pub webhook: Arc<WebhookDispatcher>,
    pub blog: Arc<BlogPublisher>,
    pub uploads_dir: PathBuf,
    pub public_base_url: Option<String>,
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "service": SERVICE_NAME }))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("igbot=info,tower_http=info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    services::db::init_schema(&pool)
        .await
        .expect("Failed to initialize database schema");

    // Clients are built once here and handed to the services that need them
    let chat = ChatClient::new(&config.openai);
    let instagram = InstagramClient::new(&config.instagram);
    let wordpress = WordPressClient::new(config.wordpress.as_ref());
    if !wordpress.is_configured() {
        tracing::warn!("WordPress not configured, daily blog posts will fail until it is");
    }

    let conversations = Arc::new(InMemoryConversations::new(MAX_CONVERSATION_HISTORY));
    let replies = Arc::new(ReplyGenerator::new(
        chat,
        conversations,
        config.system_prompt.clone(),
    ));

    let publisher = MediaPublisher::new(
        instagram.clone(),
        PollConfig {
            interval: config.container_poll_interval,
            max_attempts: config.container_poll_attempts,
        },
    );

    let webhook = Arc::new(WebhookDispatcher::new(
        replies.clone(),
        instagram,
        config.instagram.app_secret.clone(),
    ));

    let blog = Arc::new(BlogPublisher::new(pool.clone(), replies.clone(), wordpress));

    let state = Arc::new(AppState {
        db: pool.clone(),
        verify_token: config.verify_token.clone(),
        replies,
        publisher,
        webhook,
        blog: blog.clone(),
        uploads_dir: config.uploads_dir.clone(),
        public_base_url: config.public_base_url.clone(),
    });

    let cron_expr = config.daily_post_cron.clone();
    tokio::spawn(async move {
        if let Err(e) = scheduler::run_blog_worker(pool, blog, &cron_expr).await {
            tracing::error!("Blog scheduler stopped: {e}");
        }
    });

    let app = Router::new()
        .route("/health", get(health))
        .merge(routes::build_routes())
        .nest_service("/uploads", ServeDir::new(&config.uploads_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {}: {}", addr, e));

    tracing::info!("Listening on http://{}", addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server failed");
}
