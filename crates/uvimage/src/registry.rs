use std::collections::BTreeMap;

use async_trait::async_trait;
use uvimage_core::{BuilderConfig, ImageSpec, VersionResolver};
use uvimage_docker::DockerExecutor;

use crate::builder::UvImageBuilder;
use crate::error::BuildError;

/// Engine name of [`UvImageBuilder`].
pub const UV_ENGINE: &str = "uv";

/// A named strategy that turns an [`ImageSpec`] into a built image.
#[async_trait(?Send)]
pub trait ImageBuilder {
    /// Key the builder is registered under.
    fn name(&self) -> &str;

    /// Builds the image and returns its reference.
    async fn build_image(&self, spec: &ImageSpec) -> Result<String, BuildError>;
}

#[async_trait(?Send)]
impl<E, V> ImageBuilder for UvImageBuilder<E, V>
where
    E: DockerExecutor,
    V: VersionResolver,
{
    fn name(&self) -> &str {
        UV_ENGINE
    }

    async fn build_image(&self, spec: &ImageSpec) -> Result<String, BuildError> {
        self.build(spec).await
    }
}

/// Image builders keyed by engine name. Owned by the caller; there is no
/// process-wide registry.
#[derive(Default)]
pub struct BuildEngineRegistry {
    builders: BTreeMap<String, Box<dyn ImageBuilder>>,
}

impl BuildEngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the `uv` builder configured from `config`.
    pub fn with_defaults(config: &BuilderConfig) -> Self {
        let mut registry = Self::new();
        registry.register(UvImageBuilder::from_config(config));
        registry
    }

    /// Registers `builder` under its name, returning any builder it replaces.
    pub fn register(
        &mut self,
        builder: impl ImageBuilder + 'static,
    ) -> Option<Box<dyn ImageBuilder>> {
        let name = builder.name().to_owned();
        tracing::debug!(engine = %name, "registering image builder");
        self.builders.insert(name, Box::new(builder))
    }

    pub fn get(&self, name: &str) -> Option<&dyn ImageBuilder> {
        self.builders.get(name).map(|b| b.as_ref())
    }

    /// Registered engine names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.builders.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }

    /// Builds `spec` with the engine registered as `engine`.
    pub async fn build(&self, engine: &str, spec: &ImageSpec) -> Result<String, BuildError> {
        let builder = self.get(engine).ok_or_else(|| BuildError::UnknownEngine {
            name: engine.to_owned(),
            available: self.names().into_iter().map(str::to_owned).collect(),
        })?;
        builder.build_image(spec).await
    }
}
