use uvimage_build::{BuildContext, Recipe, RecipeCompiler};
use uvimage_core::{BuilderConfig, ImageSpec, InstalledFramework, VersionResolver};
use uvimage_docker::{BuildRequest, DockerClient, DockerExecutor, RealExecutor};

use crate::error::BuildError;

/// Builds flytekit images from an [`ImageSpec`] with uv inside `docker build`.
///
/// Each build compiles the recipe, assembles a temporary build context,
/// writes the Dockerfile into it and runs the container build. The context
/// is removed however the build ends.
pub struct UvImageBuilder<E: DockerExecutor = RealExecutor, V: VersionResolver = InstalledFramework>
{
    client: DockerClient<E>,
    versions: V,
    push: bool,
}

impl UvImageBuilder<RealExecutor, InstalledFramework> {
    pub fn new() -> Self {
        Self::from_config(&BuilderConfig::default())
    }

    pub fn from_config(config: &BuilderConfig) -> Self {
        Self {
            client: DockerClient::with_program(config.program.as_str()),
            versions: InstalledFramework::new(),
            push: config.push,
        }
    }
}

impl Default for UvImageBuilder<RealExecutor, InstalledFramework> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: DockerExecutor, V: VersionResolver> UvImageBuilder<E, V> {
    pub fn with_parts(executor: E, versions: V) -> Self {
        Self {
            client: DockerClient::with_executor(executor),
            versions,
            push: true,
        }
    }

    /// Whether the built image is pushed to its registry (`--push`).
    pub fn push(mut self, push: bool) -> Self {
        self.push = push;
        self
    }

    /// Compiles the Dockerfile for `spec`, pinning the resolved flytekit version.
    pub fn compile(&self, spec: &ImageSpec) -> Result<Recipe, BuildError> {
        spec.validate()
            .map_err(|e| BuildError::InvalidSpec { source: e })?;

        let framework_version = self.versions.framework_version();
        RecipeCompiler::new(spec)
            .with_framework_version(framework_version.as_deref())
            .compile()
            .map_err(|e| BuildError::UnsupportedConfiguration { source: e })
    }

    /// Builds (and by default pushes) the image and returns its reference.
    ///
    /// Without an explicit tag the image is tagged with a digest of the
    /// Dockerfile, the platform and the copied source files.
    pub async fn build(&self, spec: &ImageSpec) -> Result<String, BuildError> {
        // Configuration errors surface before any file is copied.
        let recipe = self.compile(spec)?;

        let context = BuildContext::assemble(spec.source_root.as_deref())
            .map_err(|e| BuildError::ContextAssembly { source: e })?;
        let content_tag = context
            .content_tag(&recipe, &spec.platform)
            .map_err(|e| BuildError::ContextAssembly { source: e })?;
        let image = spec.image_name(&content_tag);
        tracing::info!(image = %image, files = context.files().len(), "building image");

        let dockerfile = context
            .write_recipe(&recipe)
            .map_err(|e| BuildError::ContextAssembly { source: e })?;

        let request = BuildRequest {
            context_dir: context.path(),
            dockerfile: &dockerfile,
            image: &image,
            platform: &spec.platform,
            push: self.push,
            secrets: &spec.pip_secret_mounts,
        };
        self.client
            .build_image(&request)
            .await
            .map_err(|e| BuildError::from_docker(&image, e))?;

        context.close().map_err(|e| BuildError::ContextCleanup {
            image: image.clone(),
            source: e,
        })?;

        tracing::info!(image = %image, pushed = self.push, "image built");
        Ok(image)
    }
}
