//! Forum Backend
//!
//! A REST backend for a small discussion forum with SQLite persistence:
//! categories, topics, posts, votes, subscriptions with an activity feed,
//! and private messaging.

mod api;
mod config;
mod db;
mod errors;
mod identity;
mod models;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Forum Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Create application state
    let state = AppState {
        repo,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes
    let api_routes = Router::new()
        // Users
        .route("/users", post(api::register_user))
        .route("/users/{id}", get(api::get_user_profile))
        .route("/users/{id}", put(api::update_profile))
        .route("/users/{id}", delete(api::delete_user))
        // Categories
        .route("/categories", get(api::list_categories))
        .route("/categories", post(api::create_category))
        .route("/categories/{id}", get(api::get_category))
        .route("/categories/{id}", delete(api::delete_category))
        .route("/categories/{id}/topics", get(api::list_category_topics))
        // Topics
        .route("/topics", post(api::create_topic))
        .route("/topics/{id}", get(api::get_topic))
        .route("/topics/{id}", delete(api::delete_topic))
        .route("/topics/{id}/posts", get(api::list_topic_posts))
        .route("/topics/{id}/posts", post(api::create_post))
        .route("/topics/{id}/subscription", post(api::toggle_subscription))
        // Posts
        .route("/posts/{id}", delete(api::delete_post))
        .route("/posts/{id}/vote/{direction}", post(api::vote_post))
        .route("/posts/{id}/read", post(api::mark_post_read))
        .route("/posts/{id}/read", delete(api::mark_post_unread))
        // Feed
        .route("/feed", get(api::get_feed))
        // Messages
        .route("/messages", post(api::send_message))
        .route("/messages/inbox", get(api::inbox))
        .route("/messages/outbox", get(api::outbox))
        .route("/messages/bucket", get(api::bucket))
        .route("/messages/{id}", get(api::get_message))
        .route("/messages/{id}", delete(api::delete_message))
        .route("/messages/{id}/restore", post(api::restore_message))
        .route("/messages/{id}/read", post(api::mark_message_read))
        .route("/messages/{id}/read", delete(api::mark_message_unread));

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
