use uvimage::BuildEngineRegistry;
use uvimage_core::BuilderConfig;

pub fn engines() -> anyhow::Result<()> {
    let registry = BuildEngineRegistry::with_defaults(&BuilderConfig::default());
    for name in registry.names() {
        println!("{name}");
    }
    Ok(())
}
