//! Form payloads and their validation rules
//!
//! Every field defaults to empty so a missing field is reported by the
//! validator as required instead of failing deserialization.

use serde::Deserialize;
use std::collections::BTreeMap;
use validator::{Validate, ValidationErrors};

/// Messages per field name
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoginForm {
    #[validate(length(min = 1, message = "This field is required."))]
    pub username: String,

    #[validate(length(min = 1, message = "This field is required."))]
    pub password: String,

    /// Checkbox: present when ticked
    pub remember_me: Option<String>,
}

impl LoginForm {
    pub fn remember(&self) -> bool {
        self.remember_me.as_deref().is_some_and(|value| !value.is_empty())
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ProfileForm {
    #[validate(length(min = 1, max = 64, message = "Between 1 and 64 characters."))]
    pub username: String,

    #[validate(
        email(message = "Invalid email address."),
        length(max = 120, message = "At most 120 characters.")
    )]
    pub email: String,
}

/// Shared by article creation and modification
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ArticleForm {
    #[validate(length(min = 1, max = 100, message = "Between 1 and 100 characters."))]
    pub title: String,

    #[validate(length(min = 1, message = "This field is required."))]
    pub synthesis: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ResetRequestForm {
    #[validate(email(message = "Invalid email address."))]
    pub email: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ResetPasswordForm {
    #[validate(length(min = 1, message = "This field is required."))]
    pub password: String,

    #[validate(must_match(other = "password", message = "Passwords must match."))]
    pub password2: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct KeywordForm {
    #[validate(length(min = 1, max = 40, message = "Between 1 and 40 characters."))]
    pub keywords: String,

    /// Article to link the keyword to; the placeholder article otherwise
    pub article_id: Option<i32>,
}

/// Flatten validator output into per-field messages
pub fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    errors
        .field_errors()
        .iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|err| {
                    err.message
                        .as_ref()
                        .map(|message| message.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({}).", err.code))
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

/// A single message for `field`
pub fn field_error(field: &str, message: impl Into<String>) -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.insert(field.to_string(), vec![message.into()]);
    errors
}
