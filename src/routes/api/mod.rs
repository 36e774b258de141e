pub mod sync;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;

use crate::store::JobStore;
use crate::sync::SyncOptions;

/// Shared handler state: the injected store plus per-run options.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn JobStore>,
    pub options: SyncOptions,
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/sync", get(sync::trigger).post(sync::trigger))
        .with_state(state);

    Router::new().nest("/api/v1", api)
}
