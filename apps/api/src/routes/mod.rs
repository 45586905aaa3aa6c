pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::diary::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/diary",
            post(handlers::handle_create_diary)
                .get(handlers::handle_read_diary)
                .put(handlers::handle_update_diary)
                .delete(handlers::handle_delete_diary),
        )
        .route("/api/v1/diaries", get(handlers::handle_read_diaries))
        .route("/api/v1/weather", get(handlers::handle_resolve_weather))
        .route(
            "/api/v1/weather/ingest",
            post(handlers::handle_ingest_weather),
        )
        .with_state(state)
}
