use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load spec file from {path}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse spec file at {path}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    // ── Image spec validation ──
    #[error("image name must not be empty — set [image].name")]
    EmptyName,

    #[error("secret mount id '{id}' is declared more than once in pip_secret_mounts")]
    DuplicateSecretMount { id: String },
}
