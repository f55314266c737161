use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use proptest::prelude::*;
use tempfile::TempDir;
use uvimage_build::context::{BuildContext, ContextError, ls_files};
use uvimage_build::ignore::IgnoreGroup;
use uvimage_build::recipe::{DEFAULT_BASE_IMAGE, RecipeCompiler, RecipeError};
use uvimage_core::{ImageSpec, SecretMount};

fn compile(spec: &ImageSpec) -> Vec<String> {
    RecipeCompiler::new(spec)
        .with_framework_version(Some("1.16.1"))
        .compile()
        .unwrap()
        .lines()
        .to_vec()
}

fn position(lines: &[String], needle: &str) -> usize {
    lines
        .iter()
        .position(|l| l.contains(needle))
        .unwrap_or_else(|| panic!("no line containing {needle:?} in:\n{}", lines.join("\n")))
}

/// Creates a small Python project tree.
fn python_project(dir: &Path) {
    std::fs::create_dir_all(dir.join("pkg/sub")).unwrap();
    std::fs::write(dir.join("main.py"), "print('hi')").unwrap();
    std::fs::write(dir.join("pkg/__init__.py"), "").unwrap();
    std::fs::write(dir.join("pkg/sub/tasks.py"), "def task(): ...").unwrap();
    std::fs::write(dir.join("pyproject.toml"), "[project]\nname = \"x\"").unwrap();
    std::fs::write(dir.join("uv.lock"), "version = 1").unwrap();
}

fn git(dir: &Path, args: &[&str]) {
    Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
}

// ── Recipe Tests ──

#[test]
fn recipe_scenario_emits_instructions_in_order() {
    let spec = ImageSpec {
        packages: vec!["requests".to_owned()],
        apt_packages: vec!["curl".to_owned()],
        env: BTreeMap::from([("FOO".to_owned(), "bar".to_owned())]),
        commands: vec!["echo done".to_owned()],
        ..ImageSpec::named("scenario")
    };

    let lines = compile(&spec);

    assert_eq!(
        lines,
        vec![
            format!("FROM {DEFAULT_BASE_IMAGE}"),
            "WORKDIR /app".to_owned(),
            "RUN apt-get update && apt-get install -y curl && rm -rf /var/lib/apt/lists/*"
                .to_owned(),
            "ENV FOO=bar".to_owned(),
            "ENV UV_COMPILE_BYTECODE=1".to_owned(),
            "ENV UV_LINK_MODE=copy".to_owned(),
            "RUN uv init --bare --python 3.12".to_owned(),
            "RUN --mount=type=cache,target=/root/.cache/uv uv add flytekit==1.16.1".to_owned(),
            "RUN --mount=type=cache,target=/root/.cache/uv uv add requests".to_owned(),
            "RUN --mount=type=cache,target=/root/.cache/uv uv sync --no-install-project"
                .to_owned(),
            "COPY . /app".to_owned(),
            "RUN --mount=type=cache,target=/root/.cache/uv uv sync".to_owned(),
            "ENV PATH=/app/.venv/bin:$PATH".to_owned(),
            "ENTRYPOINT []".to_owned(),
            "RUN echo done".to_owned(),
        ]
    );
}

#[test]
fn recipe_minimal_spec_installs_only_flytekit() {
    let lines = compile(&ImageSpec::named("minimal"));

    assert_eq!(lines.len(), 11);
    assert!(!lines.iter().any(|l| l.contains("apt-get")));
    assert_eq!(lines.iter().filter(|l| l.contains("uv add")).count(), 1);
    assert_eq!(lines.last().map(String::as_str), Some("ENTRYPOINT []"));
}

#[test]
fn recipe_omits_empty_apt_and_env() {
    let lines = compile(&ImageSpec::named("empty"));

    assert!(!lines.iter().any(|l| l.starts_with("RUN apt-get")));
    // Only the fixed uv/PATH ENV lines remain.
    let env_lines: Vec<_> = lines.iter().filter(|l| l.starts_with("ENV ")).collect();
    assert_eq!(
        env_lines,
        vec![
            "ENV UV_COMPILE_BYTECODE=1",
            "ENV UV_LINK_MODE=copy",
            "ENV PATH=/app/.venv/bin:$PATH"
        ]
    );
}

#[test]
fn recipe_falls_back_to_default_framework_version() {
    let spec = ImageSpec::named("fallback");
    let recipe = RecipeCompiler::new(&spec).compile().unwrap();

    assert!(recipe.render().contains("uv add flytekit==1.16.1"));
}

#[test]
fn recipe_pins_resolved_framework_version() {
    let spec = ImageSpec::named("pinned");
    let recipe = RecipeCompiler::new(&spec)
        .with_framework_version(Some("1.14.6"))
        .compile()
        .unwrap();

    assert!(recipe.render().contains("uv add flytekit==1.14.6"));
    assert!(!recipe.render().contains("flytekit==1.16.1"));
}

#[test]
fn recipe_pins_python_version() {
    let spec = ImageSpec {
        python_version: Some("3.11".to_owned()),
        ..ImageSpec::named("py311")
    };

    let lines = compile(&spec);
    assert!(lines.contains(&"RUN uv init --bare --python 3.11".to_owned()));
}

#[test]
fn recipe_accepts_explicit_default_base_image() {
    let spec = ImageSpec {
        base_image: Some(DEFAULT_BASE_IMAGE.to_owned()),
        ..ImageSpec::named("explicit")
    };

    let lines = compile(&spec);
    assert_eq!(lines[0], format!("FROM {DEFAULT_BASE_IMAGE}"));
}

#[test]
fn recipe_rejects_other_base_image() {
    let spec = ImageSpec {
        base_image: Some("python:3.12-slim".to_owned()),
        ..ImageSpec::named("custom-base")
    };

    let result = RecipeCompiler::new(&spec).compile();
    assert!(matches!(
        result,
        Err(RecipeError::UnsupportedBaseImage { ref image }) if image == "python:3.12-slim"
    ));
}

#[test]
fn recipe_rejects_requirements_even_with_packages() {
    let spec = ImageSpec {
        requirements: Some(PathBuf::from("requirements.txt")),
        packages: vec!["requests".to_owned()],
        ..ImageSpec::named("reqs")
    };

    let result = RecipeCompiler::new(&spec).compile();
    assert!(matches!(
        result,
        Err(RecipeError::RequirementsUnsupported { .. })
    ));
    assert!(result.unwrap_err().to_string().contains("requirements.txt"));
}

#[test]
fn recipe_preserves_package_order() {
    let spec = ImageSpec {
        packages: vec!["b-pkg".to_owned(), "a-pkg".to_owned()],
        ..ImageSpec::named("order")
    };

    let lines = compile(&spec);
    let add = &lines[position(&lines, "uv add b-pkg")];
    assert!(add.ends_with("uv add b-pkg a-pkg"));
}

#[test]
fn recipe_appends_commands_last_in_order() {
    let spec = ImageSpec {
        commands: vec!["x".to_owned(), "y".to_owned()],
        ..ImageSpec::named("cmds")
    };

    let lines = compile(&spec);
    let n = lines.len();
    assert_eq!(lines[n - 2], "RUN x");
    assert_eq!(lines[n - 1], "RUN y");
    assert_eq!(lines[n - 3], "ENTRYPOINT []");
}

#[test]
fn recipe_propagates_secret_mounts_to_add_and_sync() {
    let spec = ImageSpec {
        packages: vec!["private-pkg".to_owned()],
        pip_secret_mounts: vec![SecretMount::new("s1", "ENV1")],
        ..ImageSpec::named("secrets")
    };

    let lines = compile(&spec);
    let mount = "--mount=type=secret,id=s1,env=ENV1";

    assert!(lines[position(&lines, "uv add private-pkg")].contains(mount));
    assert!(lines[position(&lines, "uv sync --no-install-project")].contains(mount));
    let final_sync = lines
        .iter()
        .find(|l| l.ends_with("uv sync"))
        .unwrap();
    assert!(final_sync.contains(mount));
    // The framework install does not need credentials.
    assert!(!lines[position(&lines, "flytekit==")].contains(mount));
}

#[test]
fn recipe_emits_one_mount_per_secret() {
    let spec = ImageSpec {
        pip_secret_mounts: vec![SecretMount::new("a", "A_TOKEN"), SecretMount::new("b", "B_TOKEN")],
        ..ImageSpec::named("two-secrets")
    };

    let lines = compile(&spec);
    let sync = &lines[position(&lines, "--no-install-project")];

    assert!(sync.contains(
        "--mount=type=secret,id=a,env=A_TOKEN --mount=type=secret,id=b,env=B_TOKEN"
    ));
}

#[test]
fn recipe_adds_index_flags_in_order() {
    let spec = ImageSpec {
        packages: vec!["requests".to_owned()],
        pip_index: Some("https://pypi.internal/simple".to_owned()),
        pip_extra_index_url: vec![
            "https://mirror-a/simple".to_owned(),
            "https://mirror-b/simple".to_owned(),
        ],
        ..ImageSpec::named("indices")
    };

    let lines = compile(&spec);
    let add = &lines[position(&lines, "uv add requests")];

    assert!(add.ends_with(
        "uv add requests --index https://pypi.internal/simple \
         --index https://mirror-a/simple --index https://mirror-b/simple"
    ));
}

#[test]
fn recipe_skips_index_flags_without_packages() {
    let spec = ImageSpec {
        pip_index: Some("https://pypi.internal/simple".to_owned()),
        ..ImageSpec::named("no-packages")
    };

    assert!(!compile(&spec).iter().any(|l| l.contains("--index")));
}

#[test]
fn recipe_quotes_specifiers_with_shell_metacharacters() {
    let spec = ImageSpec {
        packages: vec!["numpy>=2".to_owned(), "pandas".to_owned()],
        ..ImageSpec::named("quoted")
    };

    let lines = compile(&spec);
    assert!(lines[position(&lines, "uv add 'numpy>=2'")].ends_with("uv add 'numpy>=2' pandas"));
}

#[test]
fn recipe_env_is_sorted_and_quoted() {
    let spec = ImageSpec {
        env: BTreeMap::from([
            ("ZED".to_owned(), "last".to_owned()),
            ("ALPHA".to_owned(), "hello world".to_owned()),
        ]),
        ..ImageSpec::named("env")
    };

    let lines = compile(&spec);
    assert_eq!(lines[2], "ENV ALPHA=\"hello world\" ZED=last");
}

#[test]
fn recipe_render_joins_lines_without_trailing_newline() {
    let spec = ImageSpec::named("render");
    let recipe = RecipeCompiler::new(&spec).compile().unwrap();

    let text = recipe.render();
    assert_eq!(text.lines().count(), recipe.lines().len());
    assert!(!text.ends_with('\n'));
    assert_eq!(recipe.to_string(), text);
}

proptest! {
    #[test]
    fn recipe_is_deterministic(
        packages in proptest::collection::vec("[a-z][a-z0-9_-]{0,12}", 0..6),
        apt in proptest::collection::vec("[a-z][a-z0-9-]{0,12}", 0..4),
        commands in proptest::collection::vec("[a-z ]{1,20}", 0..4),
        env in proptest::collection::btree_map("[A-Z][A-Z0-9_]{0,8}", "[a-z0-9]{0,8}", 0..4),
    ) {
        let spec = ImageSpec {
            packages,
            apt_packages: apt,
            commands,
            env,
            ..ImageSpec::named("prop")
        };
        let first = RecipeCompiler::new(&spec).compile().unwrap();
        let second = RecipeCompiler::new(&spec.clone()).compile().unwrap();

        prop_assert_eq!(first.render(), second.render());
    }

    #[test]
    fn recipe_keeps_packages_and_commands_in_input_order(
        packages in proptest::collection::vec("[a-z][a-z0-9_-]{0,12}", 1..6),
        commands in proptest::collection::vec("[a-z][a-z ]{0,20}", 1..4),
    ) {
        let spec = ImageSpec {
            packages: packages.clone(),
            commands: commands.clone(),
            ..ImageSpec::named("prop-order")
        };
        let lines = compile(&spec);

        let expected_add = format!("uv add {}", packages.join(" "));
        prop_assert!(lines.iter().any(|l| l.ends_with(&expected_add)));

        let tail: Vec<String> = lines[lines.len() - commands.len()..].to_vec();
        let expected: Vec<String> = commands.iter().map(|c| format!("RUN {c}")).collect();
        prop_assert_eq!(tail, expected);
    }
}

// ── Build Context Tests ──

#[test]
fn context_without_source_root_is_empty() {
    let context = BuildContext::assemble(None).unwrap();

    assert!(context.path().is_dir());
    assert_eq!(std::fs::read_dir(context.path()).unwrap().count(), 0);
}

#[test]
fn context_copies_tree_and_skips_project_files() {
    let tmp = TempDir::new().unwrap();
    python_project(tmp.path());

    let context = BuildContext::assemble(Some(tmp.path())).unwrap();

    assert!(context.path().join("main.py").exists());
    assert!(context.path().join("pkg/__init__.py").exists());
    assert_eq!(
        std::fs::read_to_string(context.path().join("pkg/sub/tasks.py")).unwrap(),
        "def task(): ..."
    );
    assert!(!context.path().join("pyproject.toml").exists());
    assert!(!context.path().join("uv.lock").exists());
}

#[test]
fn context_skips_standard_exclusions() {
    let tmp = TempDir::new().unwrap();
    python_project(tmp.path());
    std::fs::create_dir_all(tmp.path().join(".venv/bin")).unwrap();
    std::fs::write(tmp.path().join(".venv/bin/python"), "").unwrap();
    std::fs::create_dir_all(tmp.path().join("pkg/__pycache__")).unwrap();
    std::fs::write(tmp.path().join("pkg/__pycache__/x.cpython-312.pyc"), "").unwrap();
    std::fs::write(tmp.path().join("stale.pyc"), "").unwrap();

    let context = BuildContext::assemble(Some(tmp.path())).unwrap();

    assert!(!context.path().join(".venv").exists());
    assert!(!context.path().join("pkg/__pycache__").exists());
    assert!(!context.path().join("stale.pyc").exists());
    assert!(context.path().join("main.py").exists());
}

#[test]
fn context_respects_dockerignore() {
    let tmp = TempDir::new().unwrap();
    python_project(tmp.path());
    std::fs::create_dir_all(tmp.path().join("data")).unwrap();
    std::fs::write(tmp.path().join("data/big.csv"), "1,2,3").unwrap();
    std::fs::write(tmp.path().join("notes.md"), "notes").unwrap();
    std::fs::write(tmp.path().join("README.md"), "readme").unwrap();
    std::fs::write(tmp.path().join(".dockerignore"), "data/\n*.md\n!README.md\n").unwrap();

    let context = BuildContext::assemble(Some(tmp.path())).unwrap();

    assert!(!context.path().join("data").exists());
    assert!(!context.path().join("notes.md").exists());
    assert!(context.path().join("README.md").exists());
    assert!(context.path().join(".dockerignore").exists());
}

#[test]
fn context_respects_gitignore() {
    let tmp = TempDir::new().unwrap();
    let project = tmp.path();
    python_project(project);
    std::fs::create_dir_all(project.join("outputs")).unwrap();
    std::fs::write(project.join("outputs/model.bin"), "weights").unwrap();
    std::fs::write(project.join("debug.log"), "log").unwrap();
    std::fs::write(project.join(".gitignore"), "outputs/\n*.log\n").unwrap();

    git(project, &["init"]);
    git(project, &["config", "user.email", "test@test.com"]);
    git(project, &["config", "user.name", "Test"]);
    git(project, &["add", "."]);
    git(project, &["commit", "-m", "init"]);

    let context = BuildContext::assemble(Some(project)).unwrap();

    assert!(!context.path().join("outputs").exists());
    assert!(!context.path().join("debug.log").exists());
    assert!(!context.path().join(".git").exists());
    assert!(context.path().join("main.py").exists());
    assert!(context.path().join(".gitignore").exists());
}

#[test]
fn context_write_recipe_creates_dockerfile() {
    let spec = ImageSpec::named("write");
    let recipe = RecipeCompiler::new(&spec).compile().unwrap();
    let context = BuildContext::assemble(None).unwrap();

    let path = context.write_recipe(&recipe).unwrap();

    assert_eq!(path, context.path().join("Dockerfile"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), recipe.render());
}

#[test]
fn context_is_removed_on_drop() {
    let tmp = TempDir::new().unwrap();
    python_project(tmp.path());

    let context = BuildContext::assemble(Some(tmp.path())).unwrap();
    let path = context.path().to_path_buf();
    assert!(path.exists());

    drop(context);
    assert!(!path.exists());
}

#[test]
fn context_close_removes_directory() {
    let context = BuildContext::assemble(None).unwrap();
    let path = context.path().to_path_buf();

    context.close().unwrap();
    assert!(!path.exists());
}

#[test]
fn context_missing_source_root_is_error() {
    let tmp = TempDir::new().unwrap();
    let result = BuildContext::assemble(Some(tmp.path().join("does-not-exist").as_path()));

    assert!(matches!(result, Err(ContextError::SourceRoot { .. })));
}

#[test]
fn context_invalid_dockerignore_is_error() {
    let tmp = TempDir::new().unwrap();
    python_project(tmp.path());
    std::fs::write(tmp.path().join(".dockerignore"), "[broken\n").unwrap();

    let result = BuildContext::assemble(Some(tmp.path()));
    assert!(matches!(result, Err(ContextError::Ignore { .. })));
}

#[cfg(unix)]
#[test]
fn context_copies_symlinked_file_as_content() {
    let tmp = TempDir::new().unwrap();
    python_project(tmp.path());
    std::os::unix::fs::symlink(tmp.path().join("main.py"), tmp.path().join("alias.py")).unwrap();

    let context = BuildContext::assemble(Some(tmp.path())).unwrap();
    let copied = context.path().join("alias.py");

    assert!(!copied.symlink_metadata().unwrap().file_type().is_symlink());
    assert_eq!(std::fs::read_to_string(copied).unwrap(), "print('hi')");
}

#[cfg(unix)]
#[test]
fn context_does_not_descend_into_symlinked_directory() {
    let tmp = TempDir::new().unwrap();
    let outside = TempDir::new().unwrap();
    python_project(tmp.path());
    std::fs::write(outside.path().join("secret.txt"), "outside").unwrap();
    std::os::unix::fs::symlink(outside.path(), tmp.path().join("linked")).unwrap();

    let context = BuildContext::assemble(Some(tmp.path())).unwrap();

    assert!(!context.path().join("linked").exists());
}

#[cfg(unix)]
#[test]
fn context_broken_symlink_aborts_with_copy_error() {
    let tmp = TempDir::new().unwrap();
    python_project(tmp.path());
    std::os::unix::fs::symlink(tmp.path().join("gone.py"), tmp.path().join("dangling.py")).unwrap();

    let result = BuildContext::assemble(Some(tmp.path()));
    assert!(matches!(result, Err(ContextError::CopyFile { .. })));
}

// ── Content Tag Tests ──

fn recipe_with_version(version: &str) -> uvimage_build::Recipe {
    RecipeCompiler::new(&ImageSpec::named("wf"))
        .with_framework_version(Some(version))
        .compile()
        .unwrap()
}

fn tag_of(root: &Path, version: &str, platform: &str) -> String {
    let context = BuildContext::assemble(Some(root)).unwrap();
    context
        .content_tag(&recipe_with_version(version), platform)
        .unwrap()
}

#[test]
fn context_lists_copied_files_relative() {
    let tmp = TempDir::new().unwrap();
    python_project(tmp.path());

    let context = BuildContext::assemble(Some(tmp.path())).unwrap();

    assert_eq!(
        context.files(),
        [
            PathBuf::from("main.py"),
            PathBuf::from("pkg/__init__.py"),
            PathBuf::from("pkg/sub/tasks.py"),
        ]
    );
}

#[test]
fn content_tag_is_stable_for_unchanged_inputs() {
    let tmp = TempDir::new().unwrap();
    python_project(tmp.path());

    let first = tag_of(tmp.path(), "1.16.1", "linux/amd64");
    let second = tag_of(tmp.path(), "1.16.1", "linux/amd64");

    assert_eq!(first, second);
    assert_eq!(first.len(), uvimage_build::CONTENT_TAG_LEN);
}

#[test]
fn content_tag_changes_when_source_file_changes() {
    let tmp = TempDir::new().unwrap();
    python_project(tmp.path());
    let before = tag_of(tmp.path(), "1.16.1", "linux/amd64");

    std::fs::write(tmp.path().join("main.py"), "print('changed')").unwrap();
    let after = tag_of(tmp.path(), "1.16.1", "linux/amd64");

    assert_ne!(before, after);
}

#[test]
fn content_tag_changes_when_file_is_added_or_renamed() {
    let tmp = TempDir::new().unwrap();
    python_project(tmp.path());
    let before = tag_of(tmp.path(), "1.16.1", "linux/amd64");

    std::fs::rename(tmp.path().join("main.py"), tmp.path().join("app.py")).unwrap();
    let renamed = tag_of(tmp.path(), "1.16.1", "linux/amd64");
    std::fs::write(tmp.path().join("extra.py"), "").unwrap();
    let added = tag_of(tmp.path(), "1.16.1", "linux/amd64");

    assert_ne!(before, renamed);
    assert_ne!(renamed, added);
}

#[test]
fn content_tag_ignores_excluded_files() {
    let tmp = TempDir::new().unwrap();
    python_project(tmp.path());
    let before = tag_of(tmp.path(), "1.16.1", "linux/amd64");

    std::fs::write(tmp.path().join("pyproject.toml"), "[project]\nname = \"y\"").unwrap();
    std::fs::create_dir_all(tmp.path().join("__pycache__")).unwrap();
    std::fs::write(tmp.path().join("__pycache__/main.cpython-312.pyc"), "x").unwrap();
    let after = tag_of(tmp.path(), "1.16.1", "linux/amd64");

    assert_eq!(before, after);
}

#[test]
fn content_tag_changes_with_framework_version_and_platform() {
    let tmp = TempDir::new().unwrap();
    python_project(tmp.path());

    let base = tag_of(tmp.path(), "1.16.1", "linux/amd64");
    let other_version = tag_of(tmp.path(), "1.15.0", "linux/amd64");
    let other_platform = tag_of(tmp.path(), "1.16.1", "linux/arm64");

    assert_ne!(base, other_version);
    assert_ne!(base, other_platform);
}

#[test]
fn content_tag_without_source_root_depends_on_recipe() {
    let context = BuildContext::assemble(None).unwrap();

    let a = context
        .content_tag(&recipe_with_version("1.16.1"), "linux/amd64")
        .unwrap();
    let b = context
        .content_tag(&recipe_with_version("1.16.1"), "linux/amd64")
        .unwrap();
    let c = context
        .content_tag(&recipe_with_version("1.16.2"), "linux/amd64")
        .unwrap();

    assert_eq!(a, b);
    assert_ne!(a, c);
}

// ── File Selection Tests ──

#[test]
fn ls_files_returns_sorted_absolute_paths() {
    let tmp = TempDir::new().unwrap();
    python_project(tmp.path());
    let group = IgnoreGroup::new(tmp.path(), vec![]);

    let files = ls_files(tmp.path(), &group).unwrap();

    assert_eq!(files.len(), 5);
    assert!(files.iter().all(|f| f.is_absolute()));
    let mut sorted = files.clone();
    sorted.sort();
    assert_eq!(files, sorted);
}

#[test]
fn ls_files_applies_group_rules() {
    let tmp = TempDir::new().unwrap();
    python_project(tmp.path());
    let group = IgnoreGroup::for_uv(tmp.path()).unwrap();

    let files = ls_files(tmp.path(), &group).unwrap();
    let names: Vec<_> = files
        .iter()
        .map(|f| f.strip_prefix(tmp.path()).unwrap().to_path_buf())
        .collect();

    assert_eq!(
        names,
        vec![
            PathBuf::from("main.py"),
            PathBuf::from("pkg/__init__.py"),
            PathBuf::from("pkg/sub/tasks.py"),
        ]
    );
}
