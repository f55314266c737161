mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use uvimage_core::DEFAULT_SPEC_FILE;

#[derive(Parser)]
#[command(name = "uvimage", about = "Build flytekit container images with uv and docker")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and push the image described by a spec file
    Build {
        /// Spec file
        #[arg(default_value = DEFAULT_SPEC_FILE)]
        spec: PathBuf,
        /// Build engine (overrides [builder].engine)
        #[arg(long)]
        engine: Option<String>,
        /// Build without pushing to the registry
        #[arg(long)]
        no_push: bool,
    },
    /// Print the generated Dockerfile without building
    Render {
        /// Spec file
        #[arg(default_value = DEFAULT_SPEC_FILE)]
        spec: PathBuf,
        /// Write the Dockerfile to a file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// flytekit version to pin (default: the locally installed one)
        #[arg(long)]
        framework_version: Option<String>,
    },
    /// List registered build engines
    Engines,
    /// Check docker and buildx setup
    Doctor {
        /// Container build executable
        #[arg(long, default_value = uvimage_docker::DEFAULT_PROGRAM)]
        program: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            spec,
            engine,
            no_push,
        } => commands::build(&spec, engine.as_deref(), no_push).await?,
        Commands::Render {
            spec,
            output,
            framework_version,
        } => commands::render(&spec, output.as_deref(), framework_version)?,
        Commands::Engines => commands::engines()?,
        Commands::Doctor { program } => commands::doctor(&program).await?,
    }

    Ok(())
}
