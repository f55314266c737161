use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::spec::ImageSpec;

/// File name looked up when no spec path is given.
pub const DEFAULT_SPEC_FILE: &str = "uvimage.toml";

/// uvimage.toml contents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecFile {
    pub image: ImageSpec,
    #[serde(default)]
    pub builder: BuilderConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderConfig {
    /// Build engine selected from the registry
    #[serde(default = "default_engine")]
    pub engine: String,
    /// Container build executable
    #[serde(default = "default_program")]
    pub program: String,
    /// Push the image once it is built
    #[serde(default = "default_push")]
    pub push: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            program: default_program(),
            push: default_push(),
        }
    }
}

impl SpecFile {
    /// Load and validate a spec file.
    ///
    /// A relative `source_root` is resolved against the directory containing
    /// the spec file.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| crate::Error::ConfigLoad {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut file: SpecFile = toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })?;

        if let Some(root) = file.image.source_root.take() {
            file.image.source_root = Some(match path.parent() {
                Some(base) if root.is_relative() => base.join(root),
                _ => root,
            });
        }

        file.image.validate()?;
        tracing::debug!(path = %path.display(), image = %file.image.name, "spec file loaded");
        Ok(file)
    }
}

fn default_engine() -> String {
    "uv".to_owned()
}

fn default_program() -> String {
    "docker".to_owned()
}

fn default_push() -> bool {
    true
}
