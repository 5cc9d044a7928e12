//! Axum router configuration with middleware.
//!
//! All routes are under `/api`. Middleware: CORS, tracing.
//! Protected handlers authenticate via the [`CurrentUser`] extractor;
//! register/login and `/health` are public.
//!
//! [`CurrentUser`]: crate::http::extractors::auth::CurrentUser

use axum::Router;
use axum::routing::{delete, get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Auth
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/session", get(handlers::auth::session))
        // Chat CRUD
        .route(
            "/chats",
            post(handlers::chat::create_chat).get(handlers::chat::list_chats),
        )
        .route(
            "/chats/{id}",
            get(handlers::chat::get_chat)
                .patch(handlers::chat::rename_chat)
                .delete(handlers::chat::delete_chat),
        )
        .route("/chats/{id}/messages", get(handlers::chat::get_messages))
        // AI turns (buffered or SSE-streamed)
        .route(
            "/chat",
            post(handlers::turn::create_turn).get(handlers::turn::load_chat),
        )
        // Profile
        .route(
            "/user/profile",
            get(handlers::profile::get_profile).patch(handlers::profile::update_profile),
        )
        .route("/user/account", delete(handlers::profile::delete_account))
        // Activities
        .route(
            "/activities",
            post(handlers::activity::create_activity).get(handlers::activity::list_activities),
        )
        .route("/activities/stats", get(handlers::activity::activity_stats))
        .route(
            "/activities/{id}",
            axum::routing::patch(handlers::activity::update_activity)
                .delete(handlers::activity::delete_activity),
        );

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint (no auth required).
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
