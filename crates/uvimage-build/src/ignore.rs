//! Ignore rules deciding which source files enter the build context.

use std::path::{Path, PathBuf};
use std::process::Command;

use glob::{MatchOptions, Pattern};

/// Path components that never belong in an image build context.
const STANDARD_EXCLUDES: &[&str] = &[".git", "__pycache__", ".cache", ".venv", ".DS_Store"];

/// File extensions that never belong in an image build context.
const STANDARD_EXCLUDED_EXTENSIONS: &[&str] = &["pyc"];

/// Project files the generated Dockerfile creates itself (`uv init`).
const PROJECT_FILES: &[&str] = &["pyproject.toml", "uv.lock"];

/// `*` and `?` do not cross `/`, like Docker's pattern matcher.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// One exclusion strategy. A path is excluded if any rule in an
/// [`IgnoreGroup`] matches it.
#[derive(Debug, Clone)]
pub enum IgnoreRule {
    /// Paths git reports as ignored (`.gitignore`, `.git/info/exclude`, global excludes).
    Git(GitIgnore),
    /// Patterns from `.dockerignore`.
    Docker(DockerIgnore),
    /// Caches, virtualenvs, bytecode and VCS metadata.
    Standard,
    /// `pyproject.toml` and `uv.lock`, which would clobber the generated project.
    ProjectFiles,
}

impl IgnoreRule {
    /// `path` is relative to the source root.
    pub fn is_ignored(&self, path: &Path) -> bool {
        match self {
            Self::Git(git) => git.is_ignored(path),
            Self::Docker(docker) => docker.is_ignored(path),
            Self::Standard => is_standard_exclude(path),
            Self::ProjectFiles => path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| PROJECT_FILES.contains(&name)),
        }
    }
}

fn is_standard_exclude(path: &Path) -> bool {
    path.components().any(|component| {
        let name = component.as_os_str();
        STANDARD_EXCLUDES.iter().any(|ex| name == *ex)
            || Path::new(name)
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| STANDARD_EXCLUDED_EXTENSIONS.contains(&ext))
    })
}

/// Ignore rules applied to a single source root, combined with logical OR.
#[derive(Debug, Clone)]
pub struct IgnoreGroup {
    root: PathBuf,
    rules: Vec<IgnoreRule>,
}

impl IgnoreGroup {
    pub fn new(root: impl Into<PathBuf>, rules: Vec<IgnoreRule>) -> Self {
        Self {
            root: root.into(),
            rules,
        }
    }

    /// The rule set used for uv images: git, `.dockerignore`, standard
    /// exclusions, and uv project files.
    pub fn for_uv(root: &Path) -> Result<Self, IgnoreError> {
        let rules = vec![
            IgnoreRule::Git(GitIgnore::load(root)),
            IgnoreRule::Docker(DockerIgnore::load(root)?),
            IgnoreRule::Standard,
            IgnoreRule::ProjectFiles,
        ];
        Ok(Self::new(root, rules))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn rules(&self) -> &[IgnoreRule] {
        &self.rules
    }

    /// Accepts paths relative to the root or absolute paths below it.
    pub fn is_ignored(&self, path: &Path) -> bool {
        let relative = relative_to(&self.root, path);
        self.rules.iter().any(|rule| rule.is_ignored(&relative))
    }
}

/// `path` relative to `root`, or `path` unchanged when it is not below `root`.
pub(crate) fn relative_to(root: &Path, path: &Path) -> PathBuf {
    if path.starts_with(root) {
        path.components().skip(root.components().count()).collect()
    } else {
        path.to_path_buf()
    }
}

/// Paths ignored according to git, captured once per build.
#[derive(Debug, Clone, Default)]
pub struct GitIgnore {
    ignored: Vec<PathBuf>,
}

impl GitIgnore {
    /// Asks git for the ignored files and directories under `root`.
    ///
    /// Outside a repository, or without git installed, nothing is ignored.
    pub fn load(root: &Path) -> Self {
        let output = Command::new("git")
            .args([
                "ls-files",
                "-z",
                "--others",
                "--ignored",
                "--exclude-standard",
                "--directory",
            ])
            .current_dir(root)
            .output();

        match output {
            Ok(output) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let ignored = stdout
                    .split('\0')
                    .filter(|entry| !entry.is_empty())
                    .map(PathBuf::from)
                    .collect();
                Self { ignored }
            }
            Ok(output) => {
                tracing::debug!(
                    root = %root.display(),
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "not a git repository; .gitignore rules not applied"
                );
                Self::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, "git not available; .gitignore rules not applied");
                Self::default()
            }
        }
    }

    pub fn from_paths(ignored: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            ignored: ignored.into_iter().collect(),
        }
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        self.ignored.iter().any(|ignored| path.starts_with(ignored))
    }
}

/// `.dockerignore` patterns. The last matching pattern wins, so `!pattern`
/// re-includes paths excluded by an earlier line.
#[derive(Debug, Clone, Default)]
pub struct DockerIgnore {
    patterns: Vec<IgnorePattern>,
}

#[derive(Debug, Clone)]
struct IgnorePattern {
    pattern: Pattern,
    negated: bool,
}

impl DockerIgnore {
    /// Loads `<root>/.dockerignore`; a missing file yields no patterns.
    pub fn load(root: &Path) -> Result<Self, IgnoreError> {
        let path = root.join(".dockerignore");
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content).map_err(|e| e.with_file(&path)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(IgnoreError::Read { path, source: e }),
        }
    }

    pub fn parse(content: &str) -> Result<Self, IgnoreError> {
        let mut patterns = Vec::new();

        for line in content.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (negated, raw) = match line.strip_prefix('!') {
                Some(rest) => (true, rest.trim()),
                None => (false, line),
            };
            let normalized = raw
                .trim_start_matches("./")
                .trim_start_matches('/')
                .trim_end_matches('/');
            if normalized.is_empty() {
                continue;
            }

            let pattern = Pattern::new(normalized).map_err(|e| IgnoreError::Pattern {
                file: PathBuf::from(".dockerignore"),
                pattern: line.to_owned(),
                source: e,
            })?;
            patterns.push(IgnorePattern { pattern, negated });
        }

        Ok(Self { patterns })
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        let mut ignored = false;
        for rule in &self.patterns {
            // A pattern matching a parent directory covers everything below it.
            let matched = path
                .ancestors()
                .filter(|ancestor| !ancestor.as_os_str().is_empty())
                .any(|ancestor| rule.pattern.matches_path_with(ancestor, MATCH_OPTIONS));
            if matched {
                ignored = !rule.negated;
            }
        }
        ignored
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IgnoreError {
    #[error("failed to read ignore file {path}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid ignore pattern {pattern:?} in {file}")]
    Pattern {
        file: PathBuf,
        pattern: String,
        source: glob::PatternError,
    },
}

impl IgnoreError {
    fn with_file(self, path: &Path) -> Self {
        match self {
            Self::Pattern {
                pattern, source, ..
            } => Self::Pattern {
                file: path.to_path_buf(),
                pattern,
                source,
            },
            other => other,
        }
    }
}
