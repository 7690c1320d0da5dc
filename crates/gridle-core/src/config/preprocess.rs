//! The solver's preprocess report.
//!
//! When asked to preprocess an image the solver prints a JSON document
//! between two marker lines:
//!
//! ```text
//! **JSON_START**
//! { "ImagePath": "...", "ColorMap": [{"r": 0, "g": 0, "b": 0}, ...], ... }
//! **EOF**
//! ```
//!
//! Anything outside the markers is log noise and is ignored.

use serde::Deserialize;

use crate::error::ConfigError;

use super::{Configuration, Defaults, Rgb};

const START_MARKER: &str = "**JSON_START**";
const END_MARKER: &str = "**EOF**";

/// Colors and suggested scalars found in a preprocessed image.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PreprocessReport {
    pub image_path: String,
    #[serde(rename = "ColorMap")]
    pub colors: Vec<Rgb>,
    #[serde(default)]
    pub pixels_per_meter: Option<f64>,
    #[serde(default)]
    pub max_iterations: Option<u64>,
    #[serde(default)]
    pub max_rel_err: Option<f64>,
}

impl PreprocessReport {
    /// Pull the framed report out of raw solver output.
    pub fn extract(output: &str) -> Result<Self, ConfigError> {
        let start = output
            .find(START_MARKER)
            .ok_or_else(|| ConfigError::MalformedReport(format!("no {START_MARKER} marker")))?
            + START_MARKER.len();
        let body = &output[start..];
        let end = body
            .find(END_MARKER)
            .ok_or_else(|| ConfigError::MalformedReport(format!("no {END_MARKER} marker")))?;
        Ok(serde_json::from_str(body[..end].trim())?)
    }

    /// Configuration for this image: defaults first, then the report's image
    /// path, then a color map seeded from the defaults.
    ///
    /// Scalars the report suggests are not applied; the defaults document is
    /// the authority for those.
    pub fn into_configuration(self, defaults: &Defaults) -> Configuration {
        let color_map = defaults.seed_color_map(&self.colors);
        Configuration {
            image_path: Some(self.image_path),
            color_map,
            ..Configuration::from_defaults(defaults)
        }
    }
}
