use std::path::Path;

use uvimage_build::RecipeCompiler;
use uvimage_core::{InstalledFramework, SpecFile, VersionResolver};

pub fn render(
    spec_path: &Path,
    output: Option<&Path>,
    framework_version: Option<String>,
) -> anyhow::Result<()> {
    let spec_file = SpecFile::load(spec_path)?;

    let version =
        framework_version.or_else(|| InstalledFramework::new().framework_version());
    let recipe = RecipeCompiler::new(&spec_file.image)
        .with_framework_version(version.as_deref())
        .compile()?;

    match output {
        Some(path) => {
            std::fs::write(path, recipe.render())?;
            println!("Wrote Dockerfile to {}", path.display());
        }
        None => println!("{recipe}"),
    }
    Ok(())
}
