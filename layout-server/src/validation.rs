//! Input validation for untrusted data.
//!
//! All user-supplied input MUST be validated before use.
//! This module provides validators for the strings the HTTP surface accepts.

use layout_core::VariableValues;
use thiserror::Error;

/// Maximum length for saved QR code file names.
pub const MAX_FILENAME_LEN: usize = 255;
/// Maximum length for layout names.
pub const MAX_LAYOUT_NAME_LEN: usize = 200;
/// Maximum length of a single variable value.
pub const MAX_VARIABLE_VALUE_LEN: usize = 1_048_576; // 1MB
/// Maximum number of variable values in one processing batch.
pub const MAX_VARIABLES_PER_BATCH: usize = 1_000;
/// Maximum length of an uploaded QR code data URI.
pub const MAX_QR_DATA_LEN: usize = 4_194_304; // 4MB
/// Body limit for QR code uploads: the data URI plus multipart framing.
pub const MAX_QR_UPLOAD_BODY_LEN: usize = MAX_QR_DATA_LEN + 65_536;

/// Validation error types.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// File name exceeds maximum length.
    #[error("filename too long (max {MAX_FILENAME_LEN} chars)")]
    FilenameTooLong,
    /// File name is empty, hidden, or contains path components.
    #[error("filename must be a plain file name")]
    FilenameInvalid,
    /// Layout name is empty or blank.
    #[error("layout name must not be empty")]
    LayoutNameEmpty,
    /// Layout name exceeds maximum length.
    #[error("layout name too long (max {MAX_LAYOUT_NAME_LEN} chars)")]
    LayoutNameTooLong,
    /// A variable value exceeds maximum length.
    #[error("value for variable '{0}' too long (max {MAX_VARIABLE_VALUE_LEN} bytes)")]
    VariableValueTooLong(String),
    /// Too many variable values in one batch.
    #[error("too many variables (max {MAX_VARIABLES_PER_BATCH})")]
    TooManyVariables,
    /// QR code payload exceeds maximum length.
    #[error("QR code data too large (max {MAX_QR_DATA_LEN} bytes)")]
    QrDataTooLarge,
}

/// Check if a character is valid in a file name.
fn is_valid_filename_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

/// Validate a file name for the QR code folder.
///
/// Valid file names:
/// - 1-255 characters
/// - ASCII alphanumeric, hyphen, underscore, dot only
/// - No leading dot (no hidden files, no `.` or `..`)
///
/// # Errors
///
/// Returns [`ValidationError::FilenameTooLong`] if the name exceeds 255 characters.
/// Returns [`ValidationError::FilenameInvalid`] if the name is empty, starts
/// with a dot, or contains other characters.
pub fn validate_filename(name: &str) -> Result<(), ValidationError> {
    if name.len() > MAX_FILENAME_LEN {
        return Err(ValidationError::FilenameTooLong);
    }
    if name.is_empty() || name.starts_with('.') || !name.chars().all(is_valid_filename_char) {
        return Err(ValidationError::FilenameInvalid);
    }
    Ok(())
}

/// Validate a layout name.
///
/// # Errors
///
/// Returns [`ValidationError::LayoutNameEmpty`] if the name is blank.
/// Returns [`ValidationError::LayoutNameTooLong`] if the name exceeds 200 characters.
pub fn validate_layout_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::LayoutNameEmpty);
    }
    if name.chars().count() > MAX_LAYOUT_NAME_LEN {
        return Err(ValidationError::LayoutNameTooLong);
    }
    Ok(())
}

/// Validate a batch of variable values.
///
/// # Errors
///
/// Returns [`ValidationError::TooManyVariables`] if the batch is too large.
/// Returns [`ValidationError::VariableValueTooLong`] naming the first
/// oversized value.
pub fn validate_variable_values(values: &VariableValues) -> Result<(), ValidationError> {
    if values.len() > MAX_VARIABLES_PER_BATCH {
        return Err(ValidationError::TooManyVariables);
    }
    if let Some((name, _)) = values
        .iter()
        .find(|(_, v)| v.value.len() > MAX_VARIABLE_VALUE_LEN)
    {
        return Err(ValidationError::VariableValueTooLong(name.clone()));
    }
    Ok(())
}

/// Validate an uploaded QR code payload size.
///
/// # Errors
///
/// Returns [`ValidationError::QrDataTooLarge`] if the payload exceeds 4MB.
pub fn validate_qr_data(data: &str) -> Result<(), ValidationError> {
    if data.len() > MAX_QR_DATA_LEN {
        return Err(ValidationError::QrDataTooLarge);
    }
    Ok(())
}
