//! Configuration validation errors and semantic validation.

use crate::BundleConfig;
use thiserror::Error;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Smallest accepted streaming chunk.
pub const MIN_CHUNK_SIZE: usize = 1024;
/// Largest accepted streaming chunk; keeps per-entry buffering bounded.
pub const MAX_CHUNK_SIZE: usize = 64 * 1024 * 1024;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::VersionMismatch { .. } => 66,
        }
    }
}

/// Validate a bundle configuration semantically.
pub fn validate_config(config: &BundleConfig) -> ValidationResult<()> {
    if config.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: config.schema_version.clone(),
        });
    }

    if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&config.chunk_size) {
        return Err(ValidationError::InvalidValue {
            field: "chunk_size".to_string(),
            message: format!(
                "Must be in [{}, {}], got {}",
                MIN_CHUNK_SIZE, MAX_CHUNK_SIZE, config.chunk_size
            ),
        });
    }

    if config.handshake_timeout_secs == 0 {
        return Err(ValidationError::InvalidValue {
            field: "handshake_timeout_secs".to_string(),
            message: "Must be positive".to_string(),
        });
    }

    if config.backup_dir.as_os_str().is_empty() {
        return Err(ValidationError::InvalidValue {
            field: "backup_dir".to_string(),
            message: "Must not be empty".to_string(),
        });
    }

    if config.assets_root.as_os_str().is_empty() {
        return Err(ValidationError::InvalidValue {
            field: "assets_root".to_string(),
            message: "Must not be empty".to_string(),
        });
    }

    for (i, id) in config.extra_incompatible_filters.iter().enumerate() {
        if id.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: format!("extra_incompatible_filters[{}]", i),
                message: "Filter id must not be blank".to_string(),
            });
        }
    }

    Ok(())
}
