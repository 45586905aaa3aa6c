use std::sync::Arc;

use crate::diary::DiaryService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub diary: Arc<DiaryService>,
}
