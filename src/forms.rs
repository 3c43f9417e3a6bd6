//! Typed inputs for every form-submitting action, each with an explicit
//! `validate()` returning the full list of field-level error codes.

use serde::Deserialize;

use crate::error::FieldError;

pub const MAX_USERNAME_LEN: usize = 64;
pub const MAX_NAME_LEN: usize = 64;
pub const MAX_POST_LEN: usize = 2000;
pub const MAX_COMMENT_LEN: usize = 500;
pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Default)]
pub struct RegisterInput {
    pub username: String,
    pub password: String,
    pub password_confirm: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl RegisterInput {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        let username = self.username.trim();
        if username.is_empty() {
            errors.push(FieldError::new("username", "required"));
        } else if username.len() > MAX_USERNAME_LEN {
            errors.push(FieldError::new("username", "too_long"));
        }

        if self.password.is_empty() {
            errors.push(FieldError::new("password", "required"));
        } else if self.password.len() < MIN_PASSWORD_LEN {
            errors.push(FieldError::new("password", "too_short"));
        }

        if self.password != self.password_confirm {
            errors.push(FieldError::new("password_confirm", "password_mismatch"));
        }

        for (field, value) in [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
        ] {
            if let Some(v) = value {
                if v.len() > MAX_NAME_LEN {
                    errors.push(FieldError::new(field, "too_long"));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

impl LoginInput {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if self.username.trim().is_empty() {
            errors.push(FieldError::new("username", "required"));
        }
        if self.password.is_empty() {
            errors.push(FieldError::new("password", "required"));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Default)]
pub struct ProfileInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl ProfileInput {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        for (field, value) in [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
        ] {
            if let Some(v) = value {
                if v.len() > MAX_NAME_LEN {
                    errors.push(FieldError::new(field, "too_long"));
                }
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Default)]
pub struct PostInput {
    pub body: String,
}

impl PostInput {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let body = self.body.trim();
        if body.is_empty() {
            return Err(vec![FieldError::new("body", "required")]);
        }
        if body.len() > MAX_POST_LEN {
            return Err(vec![FieldError::new("body", "too_long")]);
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct CommentInput {
    pub body: String,
}

impl CommentInput {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let body = self.body.trim();
        if body.is_empty() {
            return Err(vec![FieldError::new("body", "required")]);
        }
        if body.len() > MAX_COMMENT_LEN {
            return Err(vec![FieldError::new("body", "too_long")]);
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct PasswordChangeInput {
    pub old_password: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

impl PasswordChangeInput {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if self.old_password.is_empty() {
            errors.push(FieldError::new("old_password", "required"));
        }
        if self.new_password.is_empty() {
            errors.push(FieldError::new("new_password", "required"));
        } else if self.new_password.len() < MIN_PASSWORD_LEN {
            errors.push(FieldError::new("new_password", "too_short"));
        }
        if self.new_password != self.new_password_confirm {
            errors.push(FieldError::new("new_password_confirm", "password_mismatch"));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
