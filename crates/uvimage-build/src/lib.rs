//! Dockerfile generation and build context assembly for uvimage.
//!
//! # Build pipeline
//!
//! ```text
//! uvimage build
//!   1. Recipe    ── RecipeCompiler::compile()  (pure, fails fast on unsupported config)
//!   2. Context   ── BuildContext::assemble()   (source_root → temp dir, ignore rules applied)
//!   3. Tag       ── BuildContext::content_tag() (recipe + platform + copied files)
//!   4. Dockerfile ── BuildContext::write_recipe()
//!   5. Build     ── docker build --push        (uvimage-docker)
//!   6. Cleanup   ── temp dir removed on drop
//! ```
//!
//! # Context strategy
//!
//! The context mirrors `source_root` minus anything matched by an
//! [`IgnoreGroup`](ignore::IgnoreGroup):
//! - paths git reports as ignored
//! - `.dockerignore` patterns
//! - `.git/`, `.venv/`, `__pycache__/`, `*.pyc` and similar
//! - `pyproject.toml` / `uv.lock`, since the recipe runs `uv init` itself

pub mod context;
pub mod digest;
pub mod ignore;
pub mod recipe;

pub use context::{BuildContext, ContextError, ls_files};
pub use digest::{CONTENT_TAG_LEN, ContentDigest};
pub use ignore::{IgnoreError, IgnoreGroup, IgnoreRule};
pub use recipe::{Recipe, RecipeCompiler, RecipeError};
