use std::fmt;
use std::path::Path;

use uvimage_core::SecretMount;

use crate::docker::DockerError;
use crate::executor::{CommandOutput, DockerExecutor, RealExecutor};

/// Docker operations client, parameterized over the executor for testability.
pub struct DockerClient<E: DockerExecutor = RealExecutor> {
    executor: E,
}

impl DockerClient<RealExecutor> {
    pub fn new() -> Self {
        Self {
            executor: RealExecutor::new(),
        }
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            executor: RealExecutor::with_program(program),
        }
    }
}

impl Default for DockerClient<RealExecutor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: DockerExecutor> DockerClient<E> {
    pub fn with_executor(executor: E) -> Self {
        Self { executor }
    }

    // ── Build ──

    /// Runs `docker build` for the request and returns the captured output.
    pub async fn build_image(
        &self,
        request: &BuildRequest<'_>,
    ) -> Result<CommandOutput, DockerError> {
        let build_args = request.build_args()?;
        tracing::info!(
            image = request.image,
            command = %shell_words::join(&build_args),
            "running docker build"
        );

        let output = self.executor.exec(&build_args).await?;
        tracing::debug!(
            stdout = %output.stdout.trim_end(),
            stderr = %output.stderr.trim_end(),
            "docker build finished"
        );
        Ok(output)
    }

    // ── Doctor ──

    /// Runs every diagnostic check without early return.
    pub async fn doctor(&self) -> DoctorReport {
        let mut report = DoctorReport::default();

        // 1. docker CLI
        match self
            .executor
            .exec(&args(["version", "--format", "{{.Client.Version}}"]))
            .await
        {
            Ok(out) => report.docker = CheckResult::ok(out.stdout.trim()),
            Err(e) => report.docker = CheckResult::fail(&e.to_string()),
        }

        // 2. daemon
        match self
            .executor
            .exec(&args(["info", "--format", "{{.ServerVersion}}"]))
            .await
        {
            Ok(out) if !out.stdout.trim().is_empty() => {
                report.daemon = CheckResult::ok(out.stdout.trim())
            }
            Ok(_) => report.daemon = CheckResult::fail("daemon did not report a version"),
            Err(e) => report.daemon = CheckResult::fail(&first_line(&e.to_string())),
        }

        // 3. buildx plugin, required for secret mounts and --platform
        match self.executor.exec(&args(["buildx", "version"])).await {
            Ok(out) => report.buildx = CheckResult::ok(&first_line(&out.stdout)),
            Err(e) => report.buildx = CheckResult::fail(&first_line(&e.to_string())),
        }

        report
    }
}

/// Everything `docker build` needs for one image.
#[derive(Debug, Clone)]
pub struct BuildRequest<'a> {
    pub context_dir: &'a Path,
    pub dockerfile: &'a Path,
    pub image: &'a str,
    pub platform: &'a str,
    pub push: bool,
    pub secrets: &'a [SecretMount],
}

impl BuildRequest<'_> {
    /// Arguments passed to the docker program, context directory last.
    pub fn build_args(&self) -> Result<Vec<String>, DockerError> {
        let context = path_str(self.context_dir)?;
        let dockerfile = path_str(self.dockerfile)?;

        let mut build_args = args([
            "build",
            "--tag",
            self.image,
            "--file",
            dockerfile,
            "--platform",
            self.platform,
        ]);
        if self.push {
            build_args.push("--push".to_owned());
        }
        for secret in self.secrets {
            build_args.push("--secret".to_owned());
            build_args.push(format!("id={},env={}", secret.id, secret.env));
        }
        build_args.push(context.to_owned());
        Ok(build_args)
    }
}

fn path_str(path: &Path) -> Result<&str, DockerError> {
    path.to_str()
        .ok_or_else(|| DockerError::InvalidPath(path.to_path_buf()))
}

fn args<const N: usize>(a: [&str; N]) -> Vec<String> {
    a.iter().map(|s| (*s).to_owned()).collect()
}

fn first_line(s: &str) -> String {
    match s.lines().next() {
        Some(line) => line.trim().to_owned(),
        None => String::new(),
    }
}

// ── Doctor report ──

#[derive(Debug, Default, Clone)]
pub struct DoctorReport {
    pub docker: CheckResult,
    pub daemon: CheckResult,
    pub buildx: CheckResult,
}

impl DoctorReport {
    pub fn all_passed(&self) -> bool {
        self.docker.passed && self.daemon.passed && self.buildx.passed
    }
}

impl fmt::Display for DoctorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = [
            ("Docker CLI", &self.docker),
            ("Docker daemon", &self.daemon),
            ("Buildx", &self.buildx),
        ];
        for (label, check) in rows {
            writeln!(f, "  {label:<14} {}  {}", check.icon(), check.detail)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct CheckResult {
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    pub fn ok(detail: &str) -> Self {
        Self {
            passed: true,
            detail: detail.to_owned(),
        }
    }

    pub fn fail(detail: &str) -> Self {
        Self {
            passed: false,
            detail: detail.to_owned(),
        }
    }

    pub fn icon(&self) -> &'static str {
        if self.passed { "OK" } else { "NG" }
    }
}
