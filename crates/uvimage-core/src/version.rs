//! Resolution of the flytekit version pinned into generated images.

use std::process::Command;

/// flytekit version pinned when the installed version cannot be determined.
pub const DEFAULT_FRAMEWORK_VERSION: &str = "1.16.1";

/// Source of the orchestration framework version to pin in the image.
pub trait VersionResolver {
    /// The installed flytekit version, or `None` when it is unknown.
    fn framework_version(&self) -> Option<String>;
}

/// A version known up front, e.g. from a command-line flag.
#[derive(Debug, Clone, Default)]
pub struct FixedVersion(pub Option<String>);

impl VersionResolver for FixedVersion {
    fn framework_version(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Asks the local Python interpreter which flytekit it has installed.
#[derive(Debug, Clone)]
pub struct InstalledFramework {
    python: String,
}

impl InstalledFramework {
    pub fn new() -> Self {
        Self {
            python: "python3".to_owned(),
        }
    }

    pub fn with_python(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
        }
    }
}

impl Default for InstalledFramework {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionResolver for InstalledFramework {
    fn framework_version(&self) -> Option<String> {
        let output = Command::new(&self.python)
            .args(["-c", "import flytekit; print(flytekit.__version__)"])
            .output();

        match output {
            Ok(output) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout).trim().to_owned();
                if version.is_empty() {
                    None
                } else {
                    tracing::debug!(%version, "resolved installed flytekit version");
                    Some(version)
                }
            }
            Ok(output) => {
                tracing::debug!(
                    status = %output.status,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "flytekit is not importable"
                );
                None
            }
            Err(e) => {
                tracing::debug!(python = %self.python, error = %e, "failed to run python");
                None
            }
        }
    }
}
