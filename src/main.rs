mod config;

use config::Config;
use log::{debug, info};
use packforge::pack::MANIFEST_PATH;
use packforge::{Error, IdentifierStore, OverrideOutcome, Pack, ResourceContext};
use std::path::{Path, PathBuf};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install logger immediately, then set runtime max level from config after loading it.
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Trace)
        .try_init();
    // Startup default when config is missing or malformed.
    log::set_max_level(log::LevelFilter::Warn);

    let config_path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(config::DEFAULT_CONFIG_PATH), PathBuf::from);
    let cfg = config::load(&config_path);
    log::set_max_level(cfg.log_level.as_level_filter());

    run(&cfg)?;
    Ok(())
}

/// Source and vanilla packs are only read; never create them by accident.
fn open_existing(path: &Path) -> packforge::Result<Pack> {
    if !path.exists() {
        return Err(Error::NotFound {
            what: format!("the pack '{}'", path.display()),
        });
    }
    Pack::open(path)
}

fn run(cfg: &Config) -> packforge::Result<()> {
    let mut output = Pack::open(&cfg.output)?.with_pack_format(cfg.pack_format);
    if !output.exists(MANIFEST_PATH) {
        output.create(&cfg.description)?;
    }
    for source in &cfg.sources {
        let source = open_existing(source)?;
        output.include(&source)?;
    }

    let store = IdentifierStore::load(&cfg.store)?;
    let mut ctx = ResourceContext::new(output)
        .with_store(store)
        .with_generated_namespace(cfg.generated_namespace.as_str());
    if let Some(vanilla) = &cfg.vanilla {
        ctx = ctx.with_vanilla(open_existing(vanilla)?);
    }

    for (base, target) in &cfg.overrides {
        match ctx.injector().add_custom_model_data(base, target)? {
            OverrideOutcome::Added(value) => {
                info!("{target}: custom model data {value} on {base}.");
            }
            OverrideOutcome::AlreadyPresent(value) => {
                debug!("{target}: already present as {value} on {base}.");
            }
        }
    }

    let index = ctx.finish()?;
    info!(
        "Wrote '{}' ({} overrides, {} glyphs).",
        cfg.output.display(),
        index.override_count(),
        index.glyph_count()
    );
    Ok(())
}
