//! Core types and configuration for uvimage.
//!
//! This crate defines the image spec ([`ImageSpec`]), the `uvimage.toml`
//! schema ([`SpecFile`]), framework version resolution
//! ([`VersionResolver`]), and shared error types.

pub mod config;
pub mod error;
pub mod spec;
pub mod version;

pub use config::{BuilderConfig, DEFAULT_SPEC_FILE, SpecFile};
pub use error::{Error, Result};
pub use spec::{ImageSpec, SecretMount};
pub use version::{DEFAULT_FRAMEWORK_VERSION, FixedVersion, InstalledFramework, VersionResolver};
