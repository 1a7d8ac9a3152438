//! Reel Gallery - headless scrolling gallery simulation
//!
//! Scrolls through a presentation of video artifacts and lets the playback
//! pool decide which cards hold a real decoding resource at each step.
//!
//! Usage: `reel-gallery [CONFIG.json] [ARTIFACTS] [VIEWPORT]`

mod gallery;

use anyhow::{Context, Result};
use gallery::Gallery;
use reel_core::{ConfigFile, PoolConfig};
use reel_pool::headless::HeadlessFactory;
use reel_pool::PoolManager;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_ARTIFACTS: usize = 24;
const DEFAULT_VIEWPORT: usize = 6;

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut args = std::env::args().skip(1);
    let config = match args.next().map(PathBuf::from) {
        Some(path) => {
            ConfigFile::load_from_file(&path)
                .with_context(|| format!("Failed to load pool config from {}", path.display()))?
                .pool
        }
        None => PoolConfig::default(),
    };
    let artifacts = parse_count(args.next(), DEFAULT_ARTIFACTS).context("Invalid artifact count")?;
    let viewport = parse_count(args.next(), DEFAULT_VIEWPORT).context("Invalid viewport size")?;

    info!(
        max_slots = config.max_slots,
        artifacts, viewport, "Reel gallery starting..."
    );

    let pool = PoolManager::new(config, HeadlessFactory::new())?;
    let mut gallery = Gallery::new(pool, artifacts);
    let reports = gallery.run(viewport);

    let counters = gallery.pool().counters();
    info!(
        artifacts = gallery.artifacts().len(),
        grants = counters.grants,
        evictions = counters.evictions,
        queued = counters.queued,
        released = counters.released,
        failures = counters.failures,
        "Scroll complete"
    );

    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}

fn parse_count(arg: Option<String>, default: usize) -> Result<usize> {
    match arg {
        Some(value) => Ok(value.parse()?),
        None => Ok(default),
    }
}
