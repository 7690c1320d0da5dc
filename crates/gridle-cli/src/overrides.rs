//! Command-line configuration arguments.
//!
//! `--set KEY=VALUE` supplies a raw scalar override and `--set KEY` alone
//! switches a flag such as `HorizontalZip` on. `--color INDEX:TYPE[:VALUE]`
//! supplies one color map entry; an empty `TYPE` keeps the entry's current
//! type.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use gridle_core::{
    Configuration, Defaults, OperatingMode, RawColorEntry, RawOverrides, merge_color_map,
    merge_overrides,
};

/// Arguments shared by every command that builds a configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Path to the defaults document
    #[arg(long)]
    pub defaults: PathBuf,

    /// Operating mode: single, compare-prob0, compare-prob1 or compare-two
    #[arg(long, default_value = "single")]
    pub mode: OperatingMode,

    /// Override a field (KEY=VALUE), or switch a flag on (KEY)
    #[arg(long = "set", value_name = "KEY[=VALUE]", value_parser = parse_set)]
    pub overrides: Vec<(String, String)>,

    /// Color map entry as INDEX:TYPE[:VALUE]
    #[arg(long = "color", value_name = "INDEX:TYPE[:VALUE]", value_parser = parse_color)]
    pub colors: Vec<RawColorEntry>,
}

impl ConfigArgs {
    /// Load the defaults and merge every override into a run configuration.
    pub fn build(&self) -> anyhow::Result<Configuration> {
        let defaults = Defaults::load(&self.defaults)
            .with_context(|| format!("Failed to load defaults from {}", self.defaults.display()))?;
        let base = Configuration::from_defaults(&defaults);

        let overrides: RawOverrides = self.overrides.iter().cloned().collect();
        let mut config = merge_overrides(&base, &overrides, self.mode)?;
        config.color_map = merge_color_map(&self.colors, &config.color_map)?;
        config.validate(self.mode)?;

        tracing::debug!(
            "Built {} configuration with {} color map entries",
            self.mode,
            config.color_map.len()
        );
        Ok(config)
    }
}

fn parse_set(arg: &str) -> Result<(String, String), String> {
    let (key, value) = arg.split_once('=').unwrap_or((arg, ""));
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in {arg:?}"));
    }
    Ok((key.to_string(), value.to_string()))
}

fn parse_color(arg: &str) -> Result<RawColorEntry, String> {
    let mut parts = arg.splitn(3, ':');
    let index = parts
        .next()
        .unwrap_or_default()
        .trim()
        .parse::<usize>()
        .map_err(|_| format!("expected INDEX:TYPE[:VALUE], got {arg:?}"))?;
    let kind = parts
        .next()
        .map(str::trim)
        .filter(|kind| !kind.is_empty())
        .map(str::to_string);
    let value = parts.next().map(str::to_string);
    Ok(RawColorEntry { index, kind, value })
}
