use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::error::AppResult;
use crate::state::AppState;
use crate::store::query;

pub fn router() -> Router<AppState> {
    Router::new().route("/search/", get(search))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    query: Option<String>,
}

/// GET /search/?query=... — case-insensitive substring match over usernames,
/// real names and post bodies. An `X-Requested-With: XMLHttpRequest` caller
/// gets the bare results; everyone else gets the query echoed back too.
async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let term = params.query.unwrap_or_default();
    let conn = state.db.get()?;
    let results = query::global_search(&conn, &term)?;

    let is_partial = headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
        .unwrap_or(false);

    if is_partial {
        Ok(Json(results).into_response())
    } else {
        Ok(Json(json!({ "query": term.trim(), "results": results })).into_response())
    }
}
