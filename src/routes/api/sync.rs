use std::collections::HashMap;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use serde_json::Value;

use crate::error::AppError;
use crate::models::sync_report::SyncReport;
use crate::routes::api::AppState;
use crate::sync::run_sync;

/// GET/POST /api/v1/sync
///
/// Trigger one sync pass. `adzunaCountries` may arrive as a
/// comma-separated query parameter or as a string/array field in a
/// JSON body; malformed input degrades to defaults rather than failing
/// the run. The only fatal outcome is an unreachable store.
pub async fn trigger(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    raw_body: Bytes,
) -> Result<Json<SyncReport>, AppError> {
    if let Err(e) = state.store.ping().await {
        return Err(AppError::Config(format!("Store unreachable: {e}")));
    }

    let body: Option<Value> = serde_json::from_slice(&raw_body).ok();
    let requested = parse_requested_countries(&query, body.as_ref());
    let report = run_sync(&state.options, state.store.as_ref(), &requested).await;
    Ok(Json(report))
}

/// Pull the raw region tokens out of body or query string. Body takes
/// precedence over the query string; anything unusable yields an empty
/// list, which downstream resolution turns into the fallback region.
fn parse_requested_countries(query: &HashMap<String, String>, body: Option<&Value>) -> Vec<String> {
    if let Some(value) = body.and_then(|b| b.get("adzunaCountries")) {
        match value {
            Value::String(s) => return split_list(s),
            Value::Array(items) => {
                return items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            }
            _ => return Vec::new(),
        }
    }

    query
        .get("adzunaCountries")
        .map(|s| split_list(s))
        .unwrap_or_default()
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
