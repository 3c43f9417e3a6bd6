use axum::extract::{Multipart, Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::forms::{CommentInput, PostInput};
use crate::routes::{read_upload_form, uploads};
use crate::state::AppState;
use crate::store::{posts, query};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/create/", post(create_post))
        .route("/post/{id}/", get(post_detail))
        .route("/add_comment/{post_id}/", post(add_comment))
        .route(
            "/add_comment/{post_id}/{parent_comment_id}/",
            post(add_reply),
        )
        .route("/like_post/{id}/", post(like_post))
        .route("/delete_post/{id}/", post(delete_post))
        .route("/news_feed/", get(news_feed))
}

/// GET / — every post, newest first. Public.
async fn home(State(state): State<AppState>) -> AppResult<Response> {
    let conn = state.db.get()?;
    let posts = posts::list_all(&conn)?;
    Ok(Json(json!({ "posts": posts })).into_response())
}

/// POST /create/ — multipart with a `text` field and an optional `image`.
async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> AppResult<Response> {
    let form = read_upload_form(multipart).await?;
    let input = PostInput {
        body: form.field("text").unwrap_or_default().to_string(),
    };
    if let Err(errors) = input.validate() {
        return Err(AppError::Validation(errors));
    }

    let image_path = match &form.image {
        Some((file_name, data)) => {
            Some(uploads::save_image(&state, file_name.as_deref(), data).await?)
        }
        None => None,
    };

    let conn = state.db.get()?;
    posts::create_post(&conn, &user.id, input.body.trim(), image_path.as_deref())?;
    Ok(Redirect::to("/").into_response())
}

/// GET /post/{id}/ — detail view with the comment thread, oldest first.
async fn post_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
    MaybeUser(viewer): MaybeUser,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let post = posts::get_view(&conn, &id)?.ok_or(AppError::NotFound)?;
    let comments = posts::list_comments(&conn, &id)?;
    let like_count = posts::like_count(&conn, &id)?;
    let liked = match &viewer {
        Some(user) => posts::has_liked(&conn, &id, &user.id)?,
        None => false,
    };

    Ok(Json(json!({
        "post": post,
        "comments": comments,
        "like_count": like_count,
        "liked": liked,
    }))
    .into_response())
}

/// POST /add_comment/{post_id}/
async fn add_comment(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    user: CurrentUser,
    Form(input): Form<CommentInput>,
) -> AppResult<Response> {
    submit_comment(&state, &post_id, None, &user, input)
}

/// POST /add_comment/{post_id}/{parent_comment_id}/ — one level of reply.
async fn add_reply(
    State(state): State<AppState>,
    Path((post_id, parent_comment_id)): Path<(String, String)>,
    user: CurrentUser,
    Form(input): Form<CommentInput>,
) -> AppResult<Response> {
    submit_comment(&state, &post_id, Some(parent_comment_id), &user, input)
}

fn submit_comment(
    state: &AppState,
    post_id: &str,
    parent_comment_id: Option<String>,
    user: &CurrentUser,
    input: CommentInput,
) -> AppResult<Response> {
    if let Err(errors) = input.validate() {
        return Err(AppError::Validation(errors));
    }

    let conn = state.db.get()?;
    posts::add_comment(
        &conn,
        post_id,
        &user.id,
        input.body.trim(),
        parent_comment_id.as_deref(),
    )?;
    Ok(Redirect::to(&format!("/post/{}/", post_id)).into_response())
}

/// POST /like_post/{id}/ — idempotent toggle.
async fn like_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: CurrentUser,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    posts::toggle_like(&conn, &id, &user.id)?;
    Ok(Redirect::to("/").into_response())
}

/// POST /delete_post/{id}/ — only the owner's delete takes effect; anyone
/// else is redirected as if nothing happened.
async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: CurrentUser,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let deleted = posts::delete_post(&conn, &id, &user.id)?;
    if !deleted {
        tracing::debug!("Ignored delete of post {} by non-owner {}", id, user.id);
    }
    Ok(Redirect::to("/").into_response())
}

/// GET /news_feed/ — posts from followed users only.
async fn news_feed(State(state): State<AppState>, user: CurrentUser) -> AppResult<Response> {
    let conn = state.db.get()?;
    let feed = query::feed_for(&conn, &user.id)?;
    Ok(Json(json!({ "posts": feed })).into_response())
}
