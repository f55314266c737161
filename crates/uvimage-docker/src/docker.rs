use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DockerError {
    #[error("{program} not found — install Docker with buildx and put it on PATH")]
    NotFound {
        program: String,
        source: std::io::Error,
    },

    #[error("failed to run {program}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("docker command failed ({status}): {args:?}\n{stderr}")]
    CommandFailed {
        args: Vec<String>,
        status: String,
        stdout: String,
        stderr: String,
    },

    #[error("path is not valid UTF-8: {0}")]
    InvalidPath(PathBuf),
}
