use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::post;
use axum::Router;

use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;
use crate::store::{follows, users};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/follow/{user_id}/", post(follow))
        .route("/unfollow/{user_id}/", post(unfollow))
}

/// POST /follow/{user_id}/ — start following. Following twice and following
/// yourself both fall through to the redirect without changing anything.
async fn follow(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    user: CurrentUser,
    headers: HeaderMap,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    users::find_by_id(&conn, &user_id)?.ok_or(AppError::NotFound)?;
    if user_id != user.id {
        follows::follow(&conn, &user.id, &user_id)?;
    }
    Ok(back(&headers))
}

/// POST /unfollow/{user_id}/ — stop following. Unfollowing someone you never
/// followed is a no-op.
async fn unfollow(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    user: CurrentUser,
    headers: HeaderMap,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    users::find_by_id(&conn, &user_id)?.ok_or(AppError::NotFound)?;
    follows::unfollow(&conn, &user.id, &user_id)?;
    Ok(back(&headers))
}

/// Send the caller back to the page the button lived on.
fn back(headers: &HeaderMap) -> Response {
    let target = headers
        .get(axum::http::header::REFERER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("/");
    Redirect::to(target).into_response()
}
