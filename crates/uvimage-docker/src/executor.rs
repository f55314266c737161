use crate::docker::DockerError;

/// Default container build program.
pub const DEFAULT_PROGRAM: &str = "docker";

/// Captured output of a successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Abstraction over docker CLI execution for testability.
///
/// Production code uses [`RealExecutor`], tests use mockall-generated mocks.
#[allow(async_fn_in_trait)]
pub trait DockerExecutor: Send + Sync {
    /// Run the program with `args` and capture both output streams.
    ///
    /// A non-zero exit maps to [`DockerError::CommandFailed`].
    async fn exec(&self, args: &[String]) -> Result<CommandOutput, DockerError>;
}

/// Runs a real docker-compatible CLI as a child process.
#[derive(Debug, Clone)]
pub struct RealExecutor {
    program: String,
}

impl RealExecutor {
    pub fn new() -> Self {
        Self::with_program(DEFAULT_PROGRAM)
    }

    /// Uses another docker-compatible executable, e.g. `podman`.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for RealExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerExecutor for RealExecutor {
    async fn exec(&self, args: &[String]) -> Result<CommandOutput, DockerError> {
        use std::process::Stdio;

        let output = tokio::process::Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    DockerError::NotFound {
                        program: self.program.clone(),
                        source: e,
                    }
                } else {
                    DockerError::Spawn {
                        program: self.program.clone(),
                        source: e,
                    }
                }
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            Ok(CommandOutput { stdout, stderr })
        } else {
            Err(DockerError::CommandFailed {
                args: args.to_vec(),
                status: output.status.to_string(),
                stdout,
                stderr,
            })
        }
    }
}
