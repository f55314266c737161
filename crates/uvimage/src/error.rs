use uvimage_build::{ContextError, RecipeError};
use uvimage_docker::DockerError;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("invalid image spec")]
    InvalidSpec { source: uvimage_core::Error },

    #[error("unsupported image configuration")]
    UnsupportedConfiguration { source: RecipeError },

    #[error("failed to assemble build context")]
    ContextAssembly { source: ContextError },

    #[error("{program} not found — install Docker with buildx and put it on PATH")]
    BuildToolNotFound { program: String, source: DockerError },

    #[error("failed to build image {image}\n{stderr}")]
    BuildFailed {
        image: String,
        stdout: String,
        stderr: String,
        source: DockerError,
    },

    #[error("failed to invoke the image build")]
    Invocation { source: DockerError },

    #[error("image {image} was built but its build context could not be removed")]
    ContextCleanup { image: String, source: ContextError },

    #[error("unknown build engine {name:?} (available: {})", .available.join(", "))]
    UnknownEngine { name: String, available: Vec<String> },
}

impl BuildError {
    /// Classifies a failed `docker build` for `image`.
    pub(crate) fn from_docker(image: &str, e: DockerError) -> Self {
        match e {
            DockerError::NotFound { ref program, .. } => Self::BuildToolNotFound {
                program: program.clone(),
                source: e,
            },
            DockerError::CommandFailed {
                ref stdout,
                ref stderr,
                ..
            } => Self::BuildFailed {
                image: image.to_owned(),
                stdout: stdout.clone(),
                stderr: stderr.clone(),
                source: e,
            },
            other => Self::Invocation { source: other },
        }
    }
}
