//! Presence-aware helpers for partial updates.
//!
//! Update payloads distinguish three states per field: absent (leave as is),
//! `null` (clear, for nullable columns) and a value. Nullable fields use
//! `Option<Option<T>>` together with [`double_option`]; non-nullable fields
//! use a plain `Option<T>`, where `null` reads the same as a missing key.

use crate::error::AppError;
use serde::{Deserialize, Deserializer};

/// Deserialize a present field into `Some(value)`, keeping an explicit
/// `null` as `Some(None)`. Combine with `#[serde(default)]` so that a
/// missing key stays `None`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A required text field that was supplied in an update must not be blank.
pub fn non_blank(field: &str, value: Option<String>) -> Result<Option<String>, AppError> {
    match value {
        Some(v) if v.trim().is_empty() => Err(AppError::validation(format!(
            "{field} cannot be empty"
        ))),
        other => Ok(other),
    }
}

/// Required field on create: missing, null and blank all count as absent.
pub fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
