use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde_json::json;

use crate::auth::{password, session};
use crate::error::{AppError, AppResult, FieldError};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::forms::{LoginInput, PasswordChangeInput, ProfileInput, RegisterInput};
use crate::routes::{read_upload_form, uploads};
use crate::state::AppState;
use crate::store::{query, users};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register/", post(register))
        .route("/login/", post(login))
        // Logout doubles as a plain link target, so GET must work too
        .route("/logout/", get(logout).post(logout))
        .route("/profile/", get(own_profile).post(update_profile))
        .route("/profile/{username}/", get(user_profile))
        .route("/my_profile/", get(my_profile))
        .route("/password_change/", post(password_change))
        .route("/password_change/done/", get(password_change_done))
}

/// POST /register/ — create an account and log the new user in.
async fn register(State(state): State<AppState>, multipart: Multipart) -> AppResult<Response> {
    let form = read_upload_form(multipart).await?;
    let input = RegisterInput {
        username: form.field("username").unwrap_or_default().to_string(),
        password: form.field("password").unwrap_or_default().to_string(),
        password_confirm: form.field("password_confirm").unwrap_or_default().to_string(),
        first_name: form.field("first_name").map(str::to_string),
        last_name: form.field("last_name").map(str::to_string),
    };

    let mut errors = input.validate().err().unwrap_or_default();
    let username = input.username.trim().to_string();

    {
        let conn = state.db.get()?;
        if !username.is_empty() && users::username_taken(&conn, &username)? {
            errors.push(FieldError::new("username", "taken"));
        }
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let hash = password::hash_password(&input.password)?;
    let user = {
        let conn = state.db.get()?;
        insert_account(
            &conn,
            &username,
            &hash,
            input.first_name.as_deref(),
            input.last_name.as_deref(),
        )?
    };

    // The avatar is only written once the row exists; a failed insert must
    // not leave files behind
    if let Some((file_name, data)) = &form.image {
        let path = uploads::save_image(&state, file_name.as_deref(), data).await?;
        let conn = state.db.get()?;
        users::update_avatar(&conn, &user.id, &path)?;
    }

    tracing::info!("Registered user {}", user.username);
    let token = session::create_session(&state.db, &user.id, state.config.auth.session_hours)?;
    let cookie = session::session_cookie(
        &state.config.auth.cookie_name,
        &token,
        state.config.auth.session_hours,
    );
    Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/")).into_response())
}

/// Insert the account row, folding a uniqueness race lost between the
/// `username_taken` pre-check and the INSERT into the same `taken` error the
/// pre-check produces.
fn insert_account(
    conn: &rusqlite::Connection,
    username: &str,
    password_hash: &str,
    first_name: Option<&str>,
    last_name: Option<&str>,
) -> AppResult<crate::db::models::User> {
    match users::create_user(conn, username, password_hash, first_name, last_name, None) {
        Err(AppError::Database(rusqlite::Error::SqliteFailure(f, _)))
            if f.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(AppError::Validation(vec![FieldError::new(
                "username", "taken",
            )]))
        }
        other => other,
    }
}

/// POST /login/ — authenticate and establish a session. A bad pair is a
/// form-level error, not a field-level one.
async fn login(
    State(state): State<AppState>,
    Form(input): Form<LoginInput>,
) -> AppResult<Response> {
    if let Err(errors) = input.validate() {
        return Err(AppError::Validation(errors));
    }

    let user = {
        let conn = state.db.get()?;
        users::verify_credentials(&conn, input.username.trim(), &input.password)?
    };
    let Some(user) = user else {
        return Err(AppError::Validation(vec![FieldError::form(
            "invalid_credentials",
        )]));
    };

    let token = session::create_session(&state.db, &user.id, state.config.auth.session_hours)?;
    let cookie = session::session_cookie(
        &state.config.auth.cookie_name,
        &token,
        state.config.auth.session_hours,
    );
    Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/")).into_response())
}

/// GET or POST /logout/ — drop the session and clear the cookie.
async fn logout(State(state): State<AppState>, user: CurrentUser) -> AppResult<Response> {
    session::delete_session(&state.db, &user.session_token)?;
    let cookie = session::clear_cookie(&state.config.auth.cookie_name);
    Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/")).into_response())
}

/// GET /profile/ — the authenticated user's own record, for the edit form.
async fn own_profile(State(state): State<AppState>, user: CurrentUser) -> AppResult<Response> {
    let conn = state.db.get()?;
    let record = users::find_by_id(&conn, &user.id)?.ok_or(AppError::NotFound)?;
    Ok(Json(json!({ "user": record })).into_response())
}

/// POST /profile/ — edit own profile fields.
async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> AppResult<Response> {
    let form = read_upload_form(multipart).await?;
    let input = ProfileInput {
        first_name: form.field("first_name").map(str::to_string),
        last_name: form.field("last_name").map(str::to_string),
    };
    if let Err(errors) = input.validate() {
        return Err(AppError::Validation(errors));
    }

    let avatar_path = match &form.image {
        Some((file_name, data)) => {
            Some(uploads::save_image(&state, file_name.as_deref(), data).await?)
        }
        None => None,
    };

    let conn = state.db.get()?;
    users::update_profile(
        &conn,
        &user.id,
        input.first_name.as_deref(),
        input.last_name.as_deref(),
        avatar_path.as_deref(),
    )?;
    Ok(Redirect::to("/profile/").into_response())
}

/// GET /profile/{username}/ — public profile with posts and follow state.
async fn user_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
    MaybeUser(viewer): MaybeUser,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let viewer_id = viewer.as_ref().map(|u| u.id.as_str());
    let view = query::profile_view(&conn, &username, viewer_id)?.ok_or(AppError::NotFound)?;
    Ok(Json(json!({ "profile": view })).into_response())
}

/// GET /my_profile/ — convenience redirect to one's public profile.
async fn my_profile(user: CurrentUser) -> Redirect {
    Redirect::to(&format!("/profile/{}/", user.username))
}

/// POST /password_change/ — verify the old password, store the new hash and
/// drop every other session the user holds.
async fn password_change(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(input): Form<PasswordChangeInput>,
) -> AppResult<Response> {
    if let Err(errors) = input.validate() {
        return Err(AppError::Validation(errors));
    }

    {
        let conn = state.db.get()?;
        let record = users::find_by_id(&conn, &user.id)?.ok_or(AppError::NotFound)?;
        if !password::verify_password(&input.old_password, &record.password_hash) {
            return Err(AppError::Validation(vec![FieldError::new(
                "old_password",
                "incorrect",
            )]));
        }
        let new_hash = password::hash_password(&input.new_password)?;
        users::update_password(&conn, &user.id, &new_hash)?;
    }

    session::delete_other_sessions(&state.db, &user.id, &user.session_token)?;
    Ok(Redirect::to("/password_change/done/").into_response())
}

/// GET /password_change/done/
async fn password_change_done(_user: CurrentUser) -> Json<serde_json::Value> {
    Json(json!({ "changed": true }))
}
