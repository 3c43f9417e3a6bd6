pub mod accounts;
pub mod posts;
pub mod search;
pub mod social;
pub mod uploads;

use std::collections::HashMap;

use axum::extract::Multipart;

use crate::error::{AppError, AppResult};

/// A parsed multipart submission: text fields by name, plus at most one
/// uploaded file from the `image` field. An empty file part (no file chosen
/// in the form) counts as absent.
pub(crate) struct UploadForm {
    pub fields: HashMap<String, String>,
    pub image: Option<(Option<String>, Vec<u8>)>,
}

impl UploadForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

pub(crate) async fn read_upload_form(mut multipart: Multipart) -> AppResult<UploadForm> {
    let mut fields = HashMap::new();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed form data: {}", e)))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == "image" {
            let file_name = field.file_name().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Malformed form data: {}", e)))?;
            if !data.is_empty() {
                image = Some((file_name, data.to_vec()));
            }
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(format!("Malformed form data: {}", e)))?;
            fields.insert(name, value);
        }
    }

    Ok(UploadForm { fields, image })
}
