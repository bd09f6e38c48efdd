//! Validate a portal catalog before deploying it
//!
//! Usage: cargo run --bin catalog-check -- [catalog.json] [role...]
//!
//! Without a path the embedded catalog is checked. Any roles given after the
//! path are resolved against the catalog and the visible portals printed.

use anyhow::{Context, Result};
use dashboard::access::{accessible_resources, group_by_category};
use dashboard::catalog::{Catalog, RoleSet};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let mut args = std::env::args().skip(1);
    let catalog = match args.next() {
        Some(path) if path != "-" => {
            Catalog::from_file(&path).with_context(|| format!("Failed to read {}", path))?
        }
        _ => Catalog::builtin().context("Failed to parse embedded catalog")?,
    };
    catalog.validate().context("Catalog failed validation")?;

    let summary = catalog.summary();
    println!(
        "catalog v{}: {} portals ({} public)",
        catalog.version, summary.total, summary.public
    );
    for (category, count) in &summary.per_category {
        println!("  {:<28} {}", category.display_name(), count);
    }

    let roles: RoleSet = args.collect();
    if roles.is_empty() {
        return Ok(());
    }

    let grouped = group_by_category(accessible_resources(&roles, &catalog.portals));
    println!(
        "\nroles [{}] see {} portals:",
        roles.iter().collect::<Vec<_>>().join(", "),
        grouped.total_resources()
    );
    for group in grouped.iter() {
        println!("  {}", group.category.display_name());
        for portal in &group.resources {
            println!("    {} ({})", portal.name, portal.url);
        }
    }

    Ok(())
}
