//! Tile yields example: loading a ruleset from disk and resolving tiles.
//!
//! Loads the sample ruleset in `data/standard` (mixed RON, TOML and JSON
//! files), builds a few tiles, and prints each tile's per-source breakdown
//! and final rounded yields. All tiles are then resolved in one batch.
//!
//! Run with: `cargo run -p epoch-examples --example tile_yields`

use std::path::Path;

use epoch_data::{TileSpec, load_ruleset};
use epoch_yields::{YieldMode, resolve_all};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/standard");
    let ruleset = load_ruleset(&dir).expect("load sample ruleset");

    let tiles = [
        TileSpec::new("grassland"),
        TileSpec::new("grassland").with_improvement("farm"),
        TileSpec::new("grassland")
            .with_resource("wheat")
            .with_improvement("farm")
            .with_policy("agrarian_reform"),
        TileSpec::new("hills").with_improvement("mine"),
        TileSpec::new("desert")
            .with_resource("silver")
            .with_policy("mercantilism")
            .with_policy("mercantilism"),
    ];

    let mut stacks = Vec::with_capacity(tiles.len());
    for tile in &tiles {
        let stack = ruleset.tile_stack(tile).expect("tile resolves");
        println!("--- {} ---", describe(tile));
        for source in stack.breakdown() {
            let label = source.name.as_deref().unwrap_or("?");
            println!("  {:<18} {:<22} {}", label, mode_name(source.mode), values(source));
        }
        let out = stack.resolve();
        println!("  = {} (total {})\n", values(&out), out.total_value());
        stacks.push(stack);
    }

    let totals: f64 = resolve_all(&stacks).iter().map(|y| y.total_value()).sum();
    println!("Batch-resolved {} tiles, {totals} total yield.", stacks.len());
}

fn describe(tile: &TileSpec) -> String {
    let mut parts = vec![tile.terrain.clone()];
    parts.extend(tile.resource.iter().cloned());
    parts.extend(tile.improvements.iter().cloned());
    parts.extend(tile.policies.iter().map(|p| format!("[{p}]")));
    parts.join(" + ")
}

fn mode_name(mode: YieldMode) -> &'static str {
    match mode {
        YieldMode::Base => "base",
        YieldMode::Additive => "additive",
        YieldMode::PercentageAdditive => "percentage (additive)",
        YieldMode::PercentageCumulative => "percentage (cumulative)",
    }
}

fn values(y: &epoch_yields::Yields) -> String {
    let parts: Vec<String> = y
        .iter()
        .filter(|&(_, v)| v != 0.0)
        .map(|(c, v)| format!("{c} {v}"))
        .collect();
    if parts.is_empty() {
        "nothing".to_string()
    } else {
        parts.join(", ")
    }
}
