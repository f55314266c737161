use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;

use uvimage_core::{DEFAULT_FRAMEWORK_VERSION, ImageSpec};

/// The only base image the generated recipe supports.
pub const DEFAULT_BASE_IMAGE: &str = "ghcr.io/astral-sh/uv:python3.12-bookworm-slim";

/// Python version pinned when the spec does not set one.
pub const DEFAULT_PYTHON_VERSION: &str = "3.12";

/// Working directory holding the uv project and application code.
pub const APP_DIR: &str = "/app";

const UV_CACHE_MOUNT: &str = "--mount=type=cache,target=/root/.cache/uv";

/// Ordered Dockerfile instructions, one per line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    lines: Vec<String>,
}

impl Recipe {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Dockerfile text: the instructions joined by newlines.
    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Compiles an [`ImageSpec`] into a Dockerfile that installs flytekit and
/// the spec's dependencies into a uv-managed virtualenv.
///
/// Compilation is pure: the same spec and framework version always yield
/// the same recipe.
pub struct RecipeCompiler<'a> {
    spec: &'a ImageSpec,
    framework_version: Option<&'a str>,
}

impl<'a> RecipeCompiler<'a> {
    pub fn new(spec: &'a ImageSpec) -> Self {
        Self {
            spec,
            framework_version: None,
        }
    }

    /// flytekit version to pin; falls back to [`DEFAULT_FRAMEWORK_VERSION`].
    pub fn with_framework_version(mut self, version: Option<&'a str>) -> Self {
        self.framework_version = version;
        self
    }

    pub fn compile(&self) -> Result<Recipe, RecipeError> {
        let spec = self.spec;

        let base_image = match spec.base_image.as_deref() {
            None | Some(DEFAULT_BASE_IMAGE) => DEFAULT_BASE_IMAGE,
            Some(other) => {
                return Err(RecipeError::UnsupportedBaseImage {
                    image: other.to_owned(),
                });
            }
        };
        if let Some(path) = &spec.requirements {
            return Err(RecipeError::RequirementsUnsupported { path: path.clone() });
        }

        let mut lines = vec![format!("FROM {base_image}"), format!("WORKDIR {APP_DIR}")];

        if !spec.apt_packages.is_empty() {
            lines.push(format!(
                "RUN apt-get update && apt-get install -y {} && rm -rf /var/lib/apt/lists/*",
                spec.apt_packages.join(" ")
            ));
        }

        if !spec.env.is_empty() {
            let pairs: Vec<String> = spec
                .env
                .iter()
                .map(|(key, value)| format!("{key}={}", env_value(value)))
                .collect();
            lines.push(format!("ENV {}", pairs.join(" ")));
        }

        // uv project scaffold
        let python_version = match spec.python_version.as_deref() {
            Some(version) => version,
            None => DEFAULT_PYTHON_VERSION,
        };
        lines.push("ENV UV_COMPILE_BYTECODE=1".to_owned());
        lines.push("ENV UV_LINK_MODE=copy".to_owned());
        lines.push(format!("RUN uv init --bare --python {python_version}"));

        let framework_version = match self.framework_version {
            Some(version) => version,
            None => DEFAULT_FRAMEWORK_VERSION,
        };
        lines.push(format!(
            "RUN {UV_CACHE_MOUNT} uv add flytekit=={framework_version}"
        ));

        let mounts = self.mounts();

        if !spec.packages.is_empty() {
            let mut parts = vec![format!("RUN {mounts} uv add")];
            parts.extend(spec.packages.iter().map(|p| shell_words::quote(p).into_owned()));
            if let Some(index) = &spec.pip_index {
                parts.push(format!("--index {}", shell_words::quote(index)));
            }
            for extra in &spec.pip_extra_index_url {
                parts.push(format!("--index {}", shell_words::quote(extra)));
            }
            lines.push(parts.join(" "));
        }

        // Dependency layer is built before application code is copied in.
        lines.push(format!("RUN {mounts} uv sync --no-install-project"));
        lines.push(format!("COPY . {APP_DIR}"));
        lines.push(format!("RUN {mounts} uv sync"));
        lines.push(format!("ENV PATH={APP_DIR}/.venv/bin:$PATH"));
        lines.push("ENTRYPOINT []".to_owned());

        lines.extend(spec.commands.iter().map(|cmd| format!("RUN {cmd}")));

        Ok(Recipe { lines })
    }

    /// uv cache mount followed by one secret mount per configured secret.
    fn mounts(&self) -> String {
        let mut mounts = vec![UV_CACHE_MOUNT.to_owned()];
        mounts.extend(
            self.spec
                .pip_secret_mounts
                .iter()
                .map(|m| format!("--mount=type=secret,id={},env={}", m.id, m.env)),
        );
        mounts.join(" ")
    }
}

/// Quotes an `ENV` value when Dockerfile word splitting would break it.
fn env_value(value: &str) -> Cow<'_, str> {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '\\'));
    if !needs_quotes {
        return Cow::Borrowed(value);
    }

    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    Cow::Owned(format!("\"{escaped}\""))
}

#[derive(Debug, thiserror::Error)]
pub enum RecipeError {
    #[error("base image {image:?} is not supported — only {} can be used", DEFAULT_BASE_IMAGE)]
    UnsupportedBaseImage { image: String },
    #[error("requirements files are not supported ({path}) — list dependencies in `packages`")]
    RequirementsUnsupported { path: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_value_plain() {
        assert_eq!(env_value("bar"), "bar");
        assert_eq!(env_value("/app/.venv/bin:$PATH"), "/app/.venv/bin:$PATH");
    }

    #[test]
    fn env_value_quotes_whitespace_and_escapes() {
        assert_eq!(env_value("hello world"), "\"hello world\"");
        assert_eq!(env_value(r#"say "hi""#), r#""say \"hi\"""#);
        assert_eq!(env_value(""), "\"\"");
    }
}
