use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/uploads/{*path}", get(serve))
}

/// Persist an uploaded image under the uploads dir. Returns the stored file
/// name, which is what the database keeps.
pub async fn save_image(
    state: &AppState,
    original_name: Option<&str>,
    data: &[u8],
) -> AppResult<String> {
    let ext = original_name
        .and_then(|name| name.rsplit('.').next())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(char::is_alphanumeric))
        .unwrap_or("bin");
    let file_name = format!("{}.{}", uuid::Uuid::now_v7(), ext.to_lowercase());

    let dir = state.config.uploads_path();
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to create uploads dir: {}", e)))?;
    tokio::fs::write(dir.join(&file_name), data)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to store upload: {}", e)))?;

    Ok(file_name)
}

async fn serve(State(state): State<AppState>, Path(path): Path<String>) -> Response {
    // Stored names are flat uuids; anything with a separator is not ours
    if path.contains("..") || path.contains('/') || path.contains('\\') {
        return StatusCode::NOT_FOUND.into_response();
    }

    let file_path = state.config.uploads_path().join(&path);
    match tokio::fs::read(&file_path).await {
        Ok(data) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, mime.as_ref().to_string()),
                    (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
                ],
                data,
            )
                .into_response()
        }
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db;

    fn test_state(dir: &std::path::Path) -> AppState {
        let mut config = Config::default();
        config.database.path = Some(dir.join("test.db"));
        config.storage.path = Some(dir.join("uploads"));
        let pool = db::create_pool(config.db_path()).unwrap();
        db::run_migrations(&pool).unwrap();
        AppState {
            db: pool,
            config,
        }
    }

    #[tokio::test]
    async fn save_image_writes_file_with_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(tmp.path());

        let name = save_image(&state, Some("selfie.JPG"), b"fakejpeg")
            .await
            .unwrap();
        assert!(name.ends_with(".jpg"));
        let stored = tmp.path().join("uploads").join(&name);
        assert_eq!(std::fs::read(stored).unwrap(), b"fakejpeg");
    }

    #[tokio::test]
    async fn save_image_defaults_unknown_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let state = test_state(tmp.path());

        let name = save_image(&state, None, b"data").await.unwrap();
        assert!(name.ends_with(".bin"));

        let name = save_image(&state, Some("no-extension-at-all!"), b"data")
            .await
            .unwrap();
        assert!(name.ends_with(".bin"));
    }
}
