//! Build flytekit container images with uv.
//!
//! This is the facade crate: it wires the recipe compiler and build context
//! from `uvimage-build` to the docker invocation in `uvimage-docker`, and
//! re-exports the sub-crates.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use uvimage::{BuildEngineRegistry, SpecFile};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let spec_file = SpecFile::load(Path::new("uvimage.toml"))?;
//! let registry = BuildEngineRegistry::with_defaults(&spec_file.builder);
//! let image = registry.build(&spec_file.builder.engine, &spec_file.image).await?;
//! println!("{image}");
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod error;
pub mod registry;

pub use builder::UvImageBuilder;
pub use error::BuildError;
pub use registry::{BuildEngineRegistry, ImageBuilder, UV_ENGINE};

// Core types flattened into root namespace for convenience.
pub use uvimage_core::*;

/// Dockerfile compilation and build context assembly.
///
/// See [`uvimage-build`](https://crates.io/crates/uvimage-build) for details.
pub mod build {
    pub use uvimage_build::*;
}

/// `docker build` invocation and environment checks.
///
/// See [`uvimage-docker`](https://crates.io/crates/uvimage-docker) for details.
pub mod docker {
    pub use uvimage_docker::*;
}
