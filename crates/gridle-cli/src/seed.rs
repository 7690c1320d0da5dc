//! Seed command: turn a preprocess report into a starting configuration.

use std::path::Path;

use anyhow::Context;
use gridle_core::Defaults;
use gridle_core::config::PreprocessReport;

/// Print a configuration whose color map is seeded from the report's colors.
pub fn execute(defaults: &Path, report: &Path) -> anyhow::Result<()> {
    let defaults = Defaults::load(defaults)
        .with_context(|| format!("Failed to load defaults from {}", defaults.display()))?;
    let output = std::fs::read_to_string(report)
        .with_context(|| format!("Failed to read report {}", report.display()))?;

    let report = PreprocessReport::extract(&output)?;
    tracing::debug!(
        "Seeding {} colors for {}",
        report.colors.len(),
        report.image_path
    );

    let config = report.into_configuration(&defaults);
    println!("{}", config.to_json_pretty()?);
    Ok(())
}
