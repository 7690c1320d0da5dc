//! The defaults document.

use std::path::Path;

use crate::error::ConfigError;

use super::{ColorMapEntry, ColorRule, Configuration, Rgb};

/// Reference configuration loaded once at startup.
///
/// Supplies fallback values and the canonical color map used to guess the
/// rule for a color. There is no way to mutate it after construction; share
/// it behind an `Arc` when several stages need it.
#[derive(Debug, Clone, PartialEq)]
pub struct Defaults {
    config: Configuration,
}

impl Defaults {
    pub fn new(config: Configuration) -> Self {
        Self { config }
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Configuration::from_json(text).map(Self::new)
    }

    /// Read and parse a defaults file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let defaults = Self::from_json(&text)?;
        tracing::debug!(
            "Loaded defaults from {} ({} color map entries)",
            path.display(),
            defaults.config.color_map.len()
        );
        Ok(defaults)
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    /// First defaults entry whose color equals `color`.
    pub fn lookup(&self, color: Rgb) -> Option<&ColorMapEntry> {
        self.config.color_map.iter().find(|entry| entry.color == color)
    }

    /// Build a color map for the colors found in an image.
    ///
    /// Known colors take the rule of their defaults entry; unknown colors
    /// start as `Constant(0.0)`.
    pub fn seed_color_map(&self, colors: &[Rgb]) -> Vec<ColorMapEntry> {
        colors
            .iter()
            .map(|&color| match self.lookup(color) {
                Some(known) => ColorMapEntry::new(known.rule, color),
                None => {
                    tracing::debug!("No default rule for {}, using Constant(0)", color);
                    ColorMapEntry::new(ColorRule::Constant(0.0), color)
                }
            })
            .collect()
    }
}

impl Configuration {
    /// Start a configuration from the defaults, color map included.
    pub fn from_defaults(defaults: &Defaults) -> Self {
        defaults.configuration().clone()
    }
}
