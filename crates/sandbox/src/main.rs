//! Sandbox that drives the stat engine from a data directory.
//!
//! Spawns one hero, initializes it, then walks it through every configured
//! effect source: enter, a few periodic ticks, exit. Every attribute change
//! of the hero's vitals is logged.
mod config;

use anyhow::{Context, Result};
use config::SandboxConfig;
use stats_content::{ContentFactory, StatsContent, bundled};
use stats_core::{Attribute, AttributeChange, EntityId, StatWorld};
use tracing::info;

fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = SandboxConfig::from_env();
    let content = match &config.data_dir {
        Some(dir) => ContentFactory::new(dir)
            .load_all()
            .with_context(|| format!("loading content from {}", dir.display()))?,
        None => bundled::load().context("loading bundled content")?,
    };

    let mut world = content.build_world();
    let hero = world.spawn_standard();
    content.initializer()?.initialize(&mut world, hero)?;
    watch_vitals(&mut world, hero)?;
    log_vitals(&world, hero, "initialized");

    for source in &content.sources {
        run_source(&content, &mut world, hero, &source.name, config.ticks);
    }

    Ok(())
}

fn watch_vitals(world: &mut StatWorld, hero: EntityId) -> Result<()> {
    for attribute in [Attribute::Health, Attribute::MaxHealth, Attribute::Mana, Attribute::Stamina] {
        world.subscribe(
            hero,
            attribute,
            Box::new(|change: &AttributeChange| {
                info!(
                    entity = %change.entity,
                    attribute = %change.attribute,
                    old = change.old_value,
                    new = change.new_value,
                    "attribute changed"
                );
            }),
        )?;
    }
    Ok(())
}

fn run_source(content: &StatsContent, world: &mut StatWorld, hero: EntityId, name: &str, ticks: u32) {
    let Some(mut source) = content.source(name) else {
        return;
    };
    info!(source = name, "entering");
    source.on_trigger_enter(world, hero);

    let handles: Vec<_> = source.tracked().iter().map(|(handle, _)| handle).collect();
    for _ in 0..ticks {
        for &handle in &handles {
            let periodic = world.active_effect(handle).is_some_and(|active| active.is_periodic());
            if periodic {
                if let Err(err) = world.execute_periodic(handle) {
                    tracing::warn!(%handle, "tick failed: {err}");
                }
            }
        }
    }

    info!(source = name, "leaving");
    source.on_trigger_exit(world, hero);
    log_vitals(world, hero, name);
}

fn log_vitals(world: &StatWorld, hero: EntityId, label: &str) {
    let read = |attribute| world.current(hero, attribute).unwrap_or_default();
    info!(
        label,
        health = read(Attribute::Health),
        max_health = read(Attribute::MaxHealth),
        mana = read(Attribute::Mana),
        stamina = read(Attribute::Stamina),
        "vitals"
    );
}
