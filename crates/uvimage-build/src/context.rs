use std::path::{Path, PathBuf};

use tempfile::TempDir;
use walkdir::WalkDir;

use crate::digest::ContentDigest;
use crate::ignore::{IgnoreError, IgnoreGroup, relative_to};
use crate::recipe::Recipe;

/// File name of the generated recipe inside the context.
pub const DOCKERFILE_NAME: &str = "Dockerfile";

/// Ephemeral directory handed to the container builder.
///
/// Holds the selected source files and the generated Dockerfile. The
/// directory is removed when the context is dropped, whichever way the
/// build ends.
#[derive(Debug)]
pub struct BuildContext {
    dir: TempDir,
    files: Vec<PathBuf>,
}

impl BuildContext {
    /// Creates a fresh context and copies every non-ignored file under
    /// `source_root` into it, preserving relative paths.
    ///
    /// Without a source root the context starts empty.
    pub fn assemble(source_root: Option<&Path>) -> Result<Self, ContextError> {
        let dir = tempfile::Builder::new()
            .prefix("uvimage-")
            .tempdir()
            .map_err(|e| ContextError::CreateTempDir { source: e })?;
        let mut context = Self {
            dir,
            files: Vec::new(),
        };

        if let Some(root) = source_root {
            let root = root.canonicalize().map_err(|e| ContextError::SourceRoot {
                path: root.to_path_buf(),
                source: e,
            })?;
            let ignore = IgnoreGroup::for_uv(&root)?;
            let files: Vec<PathBuf> = ls_files(&root, &ignore)?
                .iter()
                .map(|file| relative_to(&root, file))
                .collect();
            context.copy_files(&root, &files)?;
            tracing::info!(
                source_root = %root.display(),
                context = %context.path().display(),
                files = files.len(),
                "copied source root into build context"
            );
            context.files = files;
        }

        Ok(context)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn dockerfile_path(&self) -> PathBuf {
        self.path().join(DOCKERFILE_NAME)
    }

    /// Writes the recipe as the context's Dockerfile and returns its path.
    pub fn write_recipe(&self, recipe: &Recipe) -> Result<PathBuf, ContextError> {
        let path = self.dockerfile_path();
        std::fs::write(&path, recipe.render()).map_err(|e| ContextError::WriteDockerfile {
            path: path.clone(),
            source: e,
        })?;
        tracing::debug!(path = %path.display(), "generated Dockerfile:\n{recipe}");
        Ok(path)
    }

    /// Removes the context directory, reporting failures instead of
    /// ignoring them as `Drop` does.
    pub fn close(self) -> Result<(), ContextError> {
        let path = self.path().to_path_buf();
        self.dir
            .close()
            .map_err(|e| ContextError::Cleanup { path, source: e })
    }

    /// Context-relative paths of the copied source files, sorted.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Tag naming the image built from `recipe` with this context.
    ///
    /// The digest covers the Dockerfile text (including the pinned flytekit
    /// version), the target platform, and the path and contents of every
    /// copied file. Editing any source file yields a new tag.
    pub fn content_tag(&self, recipe: &Recipe, platform: &str) -> Result<String, ContextError> {
        let mut digest = ContentDigest::new();
        digest.update("recipe", recipe.render().as_bytes());
        digest.update("platform", platform.as_bytes());
        for relative in &self.files {
            let path = self.path().join(relative);
            digest
                .update_file(relative, &path)
                .map_err(|e| ContextError::Digest { path, source: e })?;
        }
        Ok(digest.tag())
    }

    fn copy_files(&self, root: &Path, files: &[PathBuf]) -> Result<(), ContextError> {
        for relative in files {
            let src = root.join(relative);
            let dst = self.path().join(relative);

            if let Some(parent) = dst.parent() {
                std::fs::create_dir_all(parent).map_err(|e| ContextError::Create {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }

            // fs::copy reads through symlinks, so links land as regular files.
            std::fs::copy(&src, &dst).map_err(|e| ContextError::CopyFile {
                path: src.clone(),
                source: e,
            })?;
        }
        Ok(())
    }
}

/// Lists the files under `root` that survive the ignore rules, as absolute
/// paths in sorted order.
///
/// Symlinks are not followed: a link to a file is listed like a file, a
/// link to a directory is skipped. Ignored directories are not descended
/// into.
pub fn ls_files(root: &Path, ignore: &IgnoreGroup) -> Result<Vec<PathBuf>, ContextError> {
    let root = std::path::absolute(root).map_err(|e| ContextError::SourceRoot {
        path: root.to_path_buf(),
        source: e,
    })?;

    let walker = WalkDir::new(&root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || !ignore.is_ignored(&relative_to(&root, entry.path()))
        });

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| ContextError::Walk {
            root: root.clone(),
            source: e,
        })?;

        let file_type = entry.file_type();
        let is_file = file_type.is_file()
            || (file_type.is_symlink() && !entry.path().is_dir());
        if is_file {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("failed to create temporary build context")]
    CreateTempDir { source: std::io::Error },
    #[error("failed to resolve source root {path}")]
    SourceRoot {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to load ignore rules")]
    Ignore {
        #[from]
        source: IgnoreError,
    },
    #[error("failed to walk source root {root}")]
    Walk {
        root: PathBuf,
        source: walkdir::Error,
    },
    #[error("failed to create directory {path}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to copy file {path}")]
    CopyFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to hash {path}")]
    Digest {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write Dockerfile at {path}")]
    WriteDockerfile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to remove build context {path}")]
    Cleanup {
        path: PathBuf,
        source: std::io::Error,
    },
}
