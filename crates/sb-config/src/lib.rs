//! Scene bundle configuration loading and validation.
//!
//! This crate provides:
//! - The typed [`BundleConfig`] struct (JSON on disk)
//! - Config resolution (CLI → env → XDG → defaults)
//! - Semantic validation with stable error codes

pub mod bundle;
pub mod resolve;
pub mod validate;

pub use bundle::{BundleConfig, Compression};
pub use resolve::{load_config, resolve_config_path, ConfigSource, ResolvedConfig};
pub use validate::{validate_config, ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
