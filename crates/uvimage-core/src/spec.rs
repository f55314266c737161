use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Declarative description of a Python runtime image.
///
/// Deserialized from the `[image]` table of a spec file. Ordered collections
/// keep their input order all the way into the generated Dockerfile; `env`
/// is a [`BTreeMap`] so its entries are emitted in key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSpec {
    /// Image name, the last path segment of the image reference.
    pub name: String,
    /// Registry and repository prefix, e.g. `ghcr.io/acme`.
    #[serde(default)]
    pub registry: Option<String>,
    /// Explicit tag. When unset, a digest of the recipe and source files is used.
    #[serde(default)]
    pub tag: Option<String>,
    /// Source tree copied into the image at the working directory.
    #[serde(default)]
    pub source_root: Option<PathBuf>,
    /// Base image override.
    #[serde(default)]
    pub base_image: Option<String>,
    /// Python version pinned in the generated project (defaults to 3.12).
    #[serde(default)]
    pub python_version: Option<String>,
    /// Dependency specifiers installed with `uv add`.
    #[serde(default)]
    pub packages: Vec<String>,
    /// Requirements file to install from.
    #[serde(default)]
    pub requirements: Option<PathBuf>,
    /// OS packages installed with apt-get.
    #[serde(default)]
    pub apt_packages: Vec<String>,
    /// Environment variables baked into the image.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Shell commands appended as the final `RUN` instructions.
    #[serde(default)]
    pub commands: Vec<String>,
    /// Target platform passed to the builder.
    #[serde(default = "default_platform")]
    pub platform: String,
    /// Package index used by `uv add`.
    #[serde(default)]
    pub pip_index: Option<String>,
    /// Additional package indices, in priority order.
    #[serde(default)]
    pub pip_extra_index_url: Vec<String>,
    /// Build secrets exposed to dependency installation steps.
    #[serde(default)]
    pub pip_secret_mounts: Vec<SecretMount>,
}

/// A BuildKit secret exposed as an environment variable during a `RUN` step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretMount {
    /// Secret id known to the builder.
    pub id: String,
    /// Environment variable the secret is exposed as.
    pub env: String,
}

impl SecretMount {
    pub fn new(id: impl Into<String>, env: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            env: env.into(),
        }
    }
}

impl Default for ImageSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            registry: None,
            tag: None,
            source_root: None,
            base_image: None,
            python_version: None,
            packages: Vec::new(),
            requirements: None,
            apt_packages: Vec::new(),
            env: BTreeMap::new(),
            commands: Vec::new(),
            platform: default_platform(),
            pip_index: None,
            pip_extra_index_url: Vec::new(),
            pip_secret_mounts: Vec::new(),
        }
    }
}

impl ImageSpec {
    /// Creates a spec with the given name and every other field at its default.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Checks the invariants the recipe compiler relies on.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyName`](crate::Error::EmptyName) if `name` is blank
    /// - [`Error::DuplicateSecretMount`](crate::Error::DuplicateSecretMount) if a
    ///   secret id appears more than once
    pub fn validate(&self) -> crate::Result<()> {
        if self.name.trim().is_empty() {
            return Err(crate::Error::EmptyName);
        }

        let mut seen = HashSet::new();
        for mount in &self.pip_secret_mounts {
            if !seen.insert(mount.id.as_str()) {
                return Err(crate::Error::DuplicateSecretMount {
                    id: mount.id.clone(),
                });
            }
        }

        Ok(())
    }

    /// Full image reference the build is tagged and pushed as.
    ///
    /// An explicit `tag` wins; otherwise `content_tag`, a digest of the
    /// build inputs, is used.
    ///
    /// ```
    /// use uvimage_core::ImageSpec;
    ///
    /// let spec = ImageSpec {
    ///     registry: Some("ghcr.io/acme".to_owned()),
    ///     tag: Some("v1".to_owned()),
    ///     ..ImageSpec::named("trainer")
    /// };
    /// assert_eq!(spec.image_name("3f2a9c01d4e5b687"), "ghcr.io/acme/trainer:v1");
    /// assert_eq!(
    ///     ImageSpec::named("trainer").image_name("3f2a9c01d4e5b687"),
    ///     "trainer:3f2a9c01d4e5b687"
    /// );
    /// ```
    pub fn image_name(&self, content_tag: &str) -> String {
        let tag = match &self.tag {
            Some(tag) => tag.as_str(),
            None => content_tag,
        };

        match self.registry.as_deref().map(|r| r.trim_end_matches('/')) {
            Some(registry) if !registry.is_empty() => {
                format!("{registry}/{name}:{tag}", name = self.name)
            }
            _ => format!("{name}:{tag}", name = self.name),
        }
    }
}

pub(crate) fn default_platform() -> String {
    "linux/amd64".to_owned()
}
