use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::errors::AppError;

pub fn utc_now() -> DateTime<Utc> {
    Utc::now()
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
/// Use together with `#[serde(default)]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub fn require_text(field: &str, value: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::bad_request(format!("{field} is required")));
    }
    max_length(field, Some(value), max_len)
}

pub fn max_length(field: &str, value: Option<&str>, max_len: usize) -> Result<(), AppError> {
    match value {
        Some(v) if v.chars().count() > max_len => Err(AppError::bad_request(format!(
            "{field} must be at most {max_len} characters"
        ))),
        _ => Ok(()),
    }
}

pub fn one_of<T>(field: &str, value: Option<T>, allowed: &[T]) -> Result<(), AppError>
where
    T: PartialEq + std::fmt::Debug,
{
    match value {
        Some(v) if !allowed.contains(&v) => Err(AppError::bad_request(format!(
            "{field} must be one of {allowed:?}"
        ))),
        _ => Ok(()),
    }
}

pub fn in_range(field: &str, value: Option<i64>, min: i64, max: i64) -> Result<(), AppError> {
    match value {
        Some(v) if v < min || v > max => Err(AppError::bad_request(format!(
            "{field} must be between {min} and {max}"
        ))),
        _ => Ok(()),
    }
}
