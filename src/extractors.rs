use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use rusqlite::{params, OptionalExtension};

use crate::error::AppError;
use crate::state::AppState;

/// The authenticated identity for the current request. Handlers receive it
/// explicitly instead of reading ambient session state.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
    pub session_token: String,
}

/// Extractor that requires authentication.
/// Returns 401 if no valid session cookie is present.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_session_token(parts, &state.config.auth.cookie_name)
            .ok_or(AppError::Unauthorized)?;

        let conn = state.db.get()?;
        // Only a missing row means unauthenticated; a database failure
        // stays a database failure
        conn.query_row(
            "SELECT u.id, u.username, s.token FROM sessions s \
             JOIN users u ON u.id = s.user_id \
             WHERE s.token = ?1 AND s.expires_at > datetime('now')",
            params![token],
            |row| {
                Ok(CurrentUser {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    session_token: row.get(2)?,
                })
            },
        )
        .optional()?
        .ok_or(AppError::Unauthorized)
    }
}

/// Optional identity extractor — returns None instead of 401 when the
/// request is unauthenticated. Used by the public views.
pub struct MaybeUser(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(MaybeUser(Some(user))),
            Err(_) => Ok(MaybeUser(None)),
        }
    }
}

fn extract_session_token<'a>(parts: &'a Parts, cookie_name: &str) -> Option<&'a str> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == cookie_name {
                Some(val)
            } else {
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session;
    use crate::config::Config;
    use crate::db;
    use crate::store::users;
    use axum::http::Request;

    fn parts_with_cookie(value: &str) -> Parts {
        let req = Request::builder()
            .uri("/")
            .header(header::COOKIE, value)
            .body(())
            .unwrap();
        req.into_parts().0
    }

    fn test_state() -> AppState {
        AppState {
            db: db::test_pool(),
            config: Config::default(),
        }
    }

    #[tokio::test]
    async fn valid_session_resolves_the_user() {
        let state = test_state();
        let user_id = {
            let conn = state.db.get().unwrap();
            users::create_user(&conn, "alice", "hash", None, None, None)
                .unwrap()
                .id
        };
        let token = session::create_session(&state.db, &user_id, 1).unwrap();

        let mut parts = parts_with_cookie(&format!("ripple_session={}", token));
        let user = CurrentUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert_eq!(user.id, user_id);
        assert_eq!(user.username, "alice");
        assert_eq!(user.session_token, token);
    }

    #[tokio::test]
    async fn unknown_token_is_unauthorized() {
        let state = test_state();
        let mut parts = parts_with_cookie("ripple_session=not-a-real-token");
        let err = CurrentUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn expired_session_is_unauthorized() {
        let state = test_state();
        let user_id = {
            let conn = state.db.get().unwrap();
            users::create_user(&conn, "alice", "hash", None, None, None)
                .unwrap()
                .id
        };
        let token = session::create_session(&state.db, &user_id, 1).unwrap();
        {
            let conn = state.db.get().unwrap();
            conn.execute(
                "UPDATE sessions SET expires_at = datetime('now', '-1 minute') WHERE token = ?1",
                params![token],
            )
            .unwrap();
        }

        let mut parts = parts_with_cookie(&format!("ripple_session={}", token));
        let err = CurrentUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[test]
    fn extracts_named_cookie() {
        let parts = parts_with_cookie("other=1; ripple_session=tok123; theme=dark");
        assert_eq!(
            extract_session_token(&parts, "ripple_session"),
            Some("tok123")
        );
    }

    #[test]
    fn missing_cookie_returns_none() {
        let parts = parts_with_cookie("other=1");
        assert_eq!(extract_session_token(&parts, "ripple_session"), None);
    }
}
