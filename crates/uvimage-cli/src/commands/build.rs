use std::path::Path;

use uvimage::BuildEngineRegistry;
use uvimage_core::SpecFile;

/// Build the image described by `spec_path` and print its reference.
pub async fn build(spec_path: &Path, engine: Option<&str>, no_push: bool) -> anyhow::Result<()> {
    let spec_file = SpecFile::load(spec_path)?;

    let mut config = spec_file.builder.clone();
    if no_push {
        config.push = false;
    }
    let engine = match engine {
        Some(name) => name,
        None => config.engine.as_str(),
    };

    let registry = BuildEngineRegistry::with_defaults(&config);
    let image = registry.build(engine, &spec_file.image).await?;

    println!("{image}");
    Ok(())
}
