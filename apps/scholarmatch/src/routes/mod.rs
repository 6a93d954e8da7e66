pub mod handlers;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::contract::validation::MAX_RESUME_BYTES;
use crate::state::AppState;

/// Oversized documents must reach the upload validator so the client gets
/// the size message instead of a bare 413.
const BODY_LIMIT: usize = 2 * MAX_RESUME_BYTES;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Résumé extraction
        .route("/api/resume/upload", post(handlers::handle_upload_resume))
        .route(
            "/api/resume/:id",
            get(handlers::handle_get_resume).put(handlers::handle_update_resume),
        )
        // Academic profile
        .route("/api/scholar/fetch", post(handlers::handle_fetch_profile))
        .route("/api/scholar/:id", get(handlers::handle_get_profile))
        .route(
            "/api/scholar/:id/refresh",
            post(handlers::handle_refresh_profile),
        )
        // Project suggestions
        .route(
            "/api/projects/suggestions",
            post(handlers::handle_suggestions),
        )
        .route("/api/projects/:id", get(handlers::handle_get_project))
        .route(
            "/api/projects/:id/bookmark",
            post(handlers::handle_bookmark_project),
        )
        .route(
            "/api/projects/:id/apply",
            post(handlers::handle_apply_to_project),
        )
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(state)
}
