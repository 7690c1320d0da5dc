//! Configuration document types and their JSON wire format.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

use super::OperatingMode;

/// An sRGB color key, used to match image colors against the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<r{}, g{}, b{}>", self.r, self.g, self.b)
    }
}

/// The kind of a color map entry, without its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Constant,
    HorizontalLerp,
    VerticalLerp,
}

impl EntryKind {
    /// Name used in the `Type` field of the wire format.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Constant => "Constant",
            Self::HorizontalLerp => "HorizontalLerp",
            Self::VerticalLerp => "VerticalLerp",
        }
    }
}

impl FromStr for EntryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Constant" => Ok(Self::Constant),
            "HorizontalLerp" => Ok(Self::HorizontalLerp),
            "VerticalLerp" => Ok(Self::VerticalLerp),
            other => Err(format!("unknown color map type: {other}")),
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the solver treats pixels of one color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorRule {
    /// Fixed potential.
    Constant(f64),
    /// Interpolate between the constant pixels on either side of a run.
    HorizontalLerp,
    /// Interpolate between the constant pixels above and below a run.
    VerticalLerp,
}

impl ColorRule {
    pub fn kind(&self) -> EntryKind {
        match self {
            Self::Constant(_) => EntryKind::Constant,
            Self::HorizontalLerp => EntryKind::HorizontalLerp,
            Self::VerticalLerp => EntryKind::VerticalLerp,
        }
    }

    /// The constant value, if this is a Constant rule.
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Constant(value) => Some(*value),
            _ => None,
        }
    }
}

/// One color map entry: a rule and the image color it applies to.
///
/// The color is only a matching key. Two entries may share a color; the
/// first one wins when matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireEntry", try_from = "WireEntry")]
pub struct ColorMapEntry {
    pub rule: ColorRule,
    pub color: Rgb,
}

impl ColorMapEntry {
    pub fn new(rule: ColorRule, color: Rgb) -> Self {
        Self { rule, color }
    }

    pub fn constant(value: f64, color: Rgb) -> Self {
        Self::new(ColorRule::Constant(value), color)
    }
}

/// `{"Type": ..., "Value"?: ..., "Color": {...}}`
#[derive(Serialize, Deserialize)]
struct WireEntry {
    #[serde(rename = "Type")]
    kind: String,
    #[serde(rename = "Value", default, skip_serializing_if = "Option::is_none")]
    value: Option<f64>,
    #[serde(rename = "Color")]
    color: Rgb,
}

impl From<ColorMapEntry> for WireEntry {
    fn from(entry: ColorMapEntry) -> Self {
        Self {
            kind: entry.rule.kind().as_str().to_string(),
            value: entry.rule.value(),
            color: entry.color,
        }
    }
}

impl TryFrom<WireEntry> for ColorMapEntry {
    type Error = String;

    fn try_from(wire: WireEntry) -> Result<Self, Self::Error> {
        let rule = match wire.kind.parse::<EntryKind>()? {
            EntryKind::Constant => match wire.value {
                Some(value) => ColorRule::Constant(value),
                None => return Err(format!("Constant entry for {} has no Value", wire.color)),
            },
            EntryKind::HorizontalLerp => ColorRule::HorizontalLerp,
            EntryKind::VerticalLerp => ColorRule::VerticalLerp,
        };
        Ok(Self::new(rule, wire.color))
    }
}

/// Solver used by the executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalculationMode {
    FiniteDiff,
    MatrixInversion,
    RedBlack,
    GaussSeidel,
}

impl FromStr for CalculationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FiniteDiff" => Ok(Self::FiniteDiff),
            "MatrixInversion" => Ok(Self::MatrixInversion),
            "RedBlack" => Ok(Self::RedBlack),
            "GaussSeidel" => Ok(Self::GaussSeidel),
            other => Err(format!("unknown calculation mode: {other}")),
        }
    }
}

/// Named fields of a [`Configuration`], keyed by their JSON names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigField {
    ImagePath,
    MaxRelErr,
    MaxIterations,
    PixelsPerMeter,
    ScaleFactor,
    CalculationMode,
    HorizontalZip,
    VerticalZip,
    AnalyticInnerRadius,
    AnalyticOuterRadius,
    ColorMap,
}

impl ConfigField {
    /// Fields that may be set through raw overrides, in serialization order.
    pub const OVERRIDABLE: [ConfigField; 10] = [
        Self::ImagePath,
        Self::MaxRelErr,
        Self::MaxIterations,
        Self::PixelsPerMeter,
        Self::ScaleFactor,
        Self::CalculationMode,
        Self::HorizontalZip,
        Self::VerticalZip,
        Self::AnalyticInnerRadius,
        Self::AnalyticOuterRadius,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::ImagePath => "ImagePath",
            Self::MaxRelErr => "MaxRelErr",
            Self::MaxIterations => "MaxIterations",
            Self::PixelsPerMeter => "PixelsPerMeter",
            Self::ScaleFactor => "ScaleFactor",
            Self::CalculationMode => "CalculationMode",
            Self::HorizontalZip => "HorizontalZip",
            Self::VerticalZip => "VerticalZip",
            Self::AnalyticInnerRadius => "AnalyticInnerRadius",
            Self::AnalyticOuterRadius => "AnalyticOuterRadius",
            Self::ColorMap => "ColorMap",
        }
    }

    /// Look up an overridable field by its JSON key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::OVERRIDABLE.into_iter().find(|field| field.key() == key)
    }
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// The document written to the solver's standard input.
///
/// Field order is the serialization order: scalars, flags, radii, color map.
/// Unset optional fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Configuration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rel_err: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixels_per_meter: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_factor: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculation_mode: Option<CalculationMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizontal_zip: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical_zip: Option<bool>,
    #[serde(
        rename = "AnalyticInnerRadius",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub inner_radius: Option<f64>,
    #[serde(
        rename = "AnalyticOuterRadius",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub outer_radius: Option<f64>,
    #[serde(default)]
    pub color_map: Vec<ColorMapEntry>,
}

impl Configuration {
    /// Parse a configuration document.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize for the solver's standard input.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, ConfigError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Human-readable serialization.
    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Whether the field currently has a value.
    pub fn has(&self, field: ConfigField) -> bool {
        match field {
            ConfigField::ImagePath => self.image_path.is_some(),
            ConfigField::MaxRelErr => self.max_rel_err.is_some(),
            ConfigField::MaxIterations => self.max_iterations.is_some(),
            ConfigField::PixelsPerMeter => self.pixels_per_meter.is_some(),
            ConfigField::ScaleFactor => self.scale_factor.is_some(),
            ConfigField::CalculationMode => self.calculation_mode.is_some(),
            ConfigField::HorizontalZip => self.horizontal_zip.is_some(),
            ConfigField::VerticalZip => self.vertical_zip.is_some(),
            ConfigField::AnalyticInnerRadius => self.inner_radius.is_some(),
            ConfigField::AnalyticOuterRadius => self.outer_radius.is_some(),
            ConfigField::ColorMap => !self.color_map.is_empty(),
        }
    }

    /// Check that every field the mode needs is present.
    pub fn validate(&self, mode: OperatingMode) -> Result<(), ConfigError> {
        match mode
            .required_fields()
            .iter()
            .copied()
            .find(|&field| !self.has(field))
        {
            Some(missing) => Err(ConfigError::MissingRequiredField(missing)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_wire_format() {
        let entry = ColorMapEntry::constant(1.5, Rgb::new(10, 20, 30));
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(
            json,
            r#"{"Type":"Constant","Value":1.5,"Color":{"r":10,"g":20,"b":30}}"#
        );

        let lerp = ColorMapEntry::new(ColorRule::VerticalLerp, Rgb::new(1, 2, 3));
        let json = serde_json::to_string(&lerp).unwrap();
        assert_eq!(json, r#"{"Type":"VerticalLerp","Color":{"r":1,"g":2,"b":3}}"#);
    }

    #[test]
    fn test_lerp_ignores_value_on_input() {
        let entry: ColorMapEntry = serde_json::from_str(
            r#"{"Type":"HorizontalLerp","Value":4.0,"Color":{"r":0,"g":0,"b":0}}"#,
        )
        .unwrap();
        assert_eq!(entry.rule, ColorRule::HorizontalLerp);
    }

    #[test]
    fn test_constant_without_value_rejected() {
        let result: Result<ColorMapEntry, _> =
            serde_json::from_str(r#"{"Type":"Constant","Color":{"r":0,"g":0,"b":0}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_type_rejected() {
        let result: Result<ColorMapEntry, _> =
            serde_json::from_str(r#"{"Type":"Outside","Color":{"r":0,"g":0,"b":0}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_field_order_is_fixed() {
        let config = Configuration {
            max_rel_err: Some(0.01),
            max_iterations: Some(50),
            pixels_per_meter: Some(10.0),
            horizontal_zip: Some(true),
            inner_radius: Some(1.0),
            outer_radius: Some(2.0),
            color_map: vec![ColorMapEntry::constant(1.0, Rgb::new(0, 0, 0))],
            ..Default::default()
        };
        let json = String::from_utf8(config.to_json_bytes().unwrap()).unwrap();
        let order = [
            "MaxRelErr",
            "MaxIterations",
            "PixelsPerMeter",
            "HorizontalZip",
            "AnalyticInnerRadius",
            "AnalyticOuterRadius",
            "ColorMap",
        ];
        let positions: Vec<usize> = order.iter().map(|k| json.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{json}");
        assert!(!json.contains("VerticalZip"));
        assert!(!json.contains("ImagePath"));
    }

    #[test]
    fn test_validate_compare_mode_needs_radii() {
        let config = Configuration {
            max_rel_err: Some(0.01),
            max_iterations: Some(50),
            pixels_per_meter: Some(10.0),
            color_map: vec![ColorMapEntry::constant(1.0, Rgb::new(0, 0, 0))],
            ..Default::default()
        };
        assert!(config.validate(OperatingMode::SingleSimulation).is_ok());
        assert!(matches!(
            config.validate(OperatingMode::CompareProb0),
            Err(ConfigError::MissingRequiredField(ConfigField::AnalyticInnerRadius))
        ));
    }

    #[test]
    fn test_validate_needs_color_map() {
        let config = Configuration {
            max_rel_err: Some(0.01),
            max_iterations: Some(50),
            pixels_per_meter: Some(10.0),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(OperatingMode::CompareTwo),
            Err(ConfigError::MissingRequiredField(ConfigField::ColorMap))
        ));
    }

    #[test]
    fn test_field_key_lookup() {
        assert_eq!(ConfigField::from_key("MaxRelErr"), Some(ConfigField::MaxRelErr));
        assert_eq!(ConfigField::from_key("ColorMap"), None);
        assert_eq!(ConfigField::from_key("Bogus"), None);
    }
}
