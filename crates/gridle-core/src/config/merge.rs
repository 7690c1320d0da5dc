//! Merging raw front-end values into a configuration.
//!
//! Raw values arrive as strings keyed by their JSON field name. Empty or
//! absent values fall back to the base configuration; anything else must
//! parse for its field.

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::ConfigError;

use super::{ColorMapEntry, ColorRule, ConfigField, Configuration, EntryKind, OperatingMode};

/// Raw override values keyed by JSON field name.
///
/// A key with an empty value still counts as present, which is how the zip
/// flags are switched on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOverrides {
    values: BTreeMap<String, String>,
}

impl RawOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Mark a presence-only key such as `HorizontalZip`.
    pub fn flag(&mut self, key: impl Into<String>) -> &mut Self {
        self.set(key, "")
    }

    pub fn contains(&self, field: ConfigField) -> bool {
        self.values.contains_key(field.key())
    }

    /// Trimmed value for the field, `None` when absent or empty.
    pub fn value(&self, field: ConfigField) -> Option<&str> {
        self.values
            .get(field.key())
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawOverrides {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut overrides = Self::new();
        for (key, value) in iter {
            overrides.set(key, value);
        }
        overrides
    }
}

/// One raw color map field from the front end.
///
/// Several raw entries may share an index (one carrying the type, another
/// the value); they are grouped before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawColorEntry {
    pub index: usize,
    pub kind: Option<String>,
    pub value: Option<String>,
}

impl RawColorEntry {
    pub fn new(index: usize, kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            index,
            kind: Some(kind.into()),
            value: Some(value.into()),
        }
    }
}

/// Merge raw overrides into `base` for a run in `mode`.
///
/// `base` is never modified; on error nothing is produced. The zip flags are
/// derived from `overrides` alone: a present key sets the flag, an absent key
/// leaves it unset even if `base` had it. In the comparison modes the radii
/// must be supplied in `overrides` as well; `base` radii are not used there.
pub fn merge_overrides(
    base: &Configuration,
    overrides: &RawOverrides,
    mode: OperatingMode,
) -> Result<Configuration, ConfigError> {
    for key in overrides.keys() {
        if ConfigField::from_key(key).is_none() {
            tracing::warn!("Unknown configuration key \"{}\", ignoring", key);
        }
    }

    let merged = Configuration {
        image_path: overrides
            .value(ConfigField::ImagePath)
            .map(str::to_string)
            .or_else(|| base.image_path.clone()),
        max_rel_err: number(overrides, ConfigField::MaxRelErr, base.max_rel_err)?,
        max_iterations: parsed(overrides, ConfigField::MaxIterations, base.max_iterations)?,
        pixels_per_meter: number(overrides, ConfigField::PixelsPerMeter, base.pixels_per_meter)?,
        scale_factor: parsed(overrides, ConfigField::ScaleFactor, base.scale_factor)?,
        calculation_mode: parsed(overrides, ConfigField::CalculationMode, base.calculation_mode)?,
        horizontal_zip: overrides
            .contains(ConfigField::HorizontalZip)
            .then_some(true),
        vertical_zip: overrides.contains(ConfigField::VerticalZip).then_some(true),
        inner_radius: radius(overrides, ConfigField::AnalyticInnerRadius, base.inner_radius, mode)?,
        outer_radius: radius(overrides, ConfigField::AnalyticOuterRadius, base.outer_radius, mode)?,
        color_map: base.color_map.clone(),
    };

    Ok(merged)
}

/// Merge raw color map fields over `prior`.
///
/// Indices must cover `0..=max` without holes. Each entry keeps the color of
/// `prior[index]`; a missing declared type keeps the prior rule's type.
pub fn merge_color_map(
    raw: &[RawColorEntry],
    prior: &[ColorMapEntry],
) -> Result<Vec<ColorMapEntry>, ConfigError> {
    if raw.is_empty() {
        return Ok(prior.to_vec());
    }

    let mut grouped: BTreeMap<usize, (Option<&str>, Option<&str>)> = BTreeMap::new();
    for entry in raw {
        let slot = grouped.entry(entry.index).or_default();
        if let Some(kind) = entry.kind.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            slot.0 = Some(kind);
        }
        if let Some(value) = entry.value.as_deref() {
            slot.1 = Some(value);
        }
    }

    // BTreeMap keys are sorted, so a hole shows up as the first key that
    // does not match its position.
    if let Some(gap) = grouped
        .keys()
        .enumerate()
        .find_map(|(expected, &index)| (expected != index).then_some(expected))
    {
        return Err(ConfigError::IndexGap(gap));
    }

    grouped
        .into_iter()
        .map(|(index, (kind, value))| {
            let previous = prior.get(index).ok_or(ConfigError::UnknownIndex(index))?;
            let kind = match kind {
                Some(kind) => kind.parse::<EntryKind>().map_err(|_| {
                    ConfigError::UnknownEntryType {
                        index,
                        kind: kind.to_string(),
                    }
                })?,
                None => previous.rule.kind(),
            };
            let rule = match kind {
                EntryKind::Constant => {
                    let value = value
                        .and_then(parse_finite)
                        .ok_or(ConfigError::InvalidColorValue(index))?;
                    ColorRule::Constant(value)
                }
                EntryKind::HorizontalLerp => ColorRule::HorizontalLerp,
                EntryKind::VerticalLerp => ColorRule::VerticalLerp,
            };
            Ok(ColorMapEntry::new(rule, previous.color))
        })
        .collect()
}

fn parse_finite(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// A radius override. Modes that compare against the analytic solution need
/// an explicit value; other modes fall back like any scalar.
fn radius(
    overrides: &RawOverrides,
    field: ConfigField,
    fallback: Option<f64>,
    mode: OperatingMode,
) -> Result<Option<f64>, ConfigError> {
    if mode.requires_radii() && overrides.value(field).is_none() {
        return Err(ConfigError::MissingRequiredField(field));
    }
    number(overrides, field, fallback)
}

/// Parse a floating point override, rejecting NaN and infinities.
fn number(
    overrides: &RawOverrides,
    field: ConfigField,
    fallback: Option<f64>,
) -> Result<Option<f64>, ConfigError> {
    match overrides.value(field) {
        None => Ok(fallback),
        Some(raw) => parse_finite(raw).map(Some).ok_or_else(|| ConfigError::Parse {
            field,
            value: raw.to_string(),
        }),
    }
}

fn parsed<T: FromStr>(
    overrides: &RawOverrides,
    field: ConfigField,
    fallback: Option<T>,
) -> Result<Option<T>, ConfigError> {
    match overrides.value(field) {
        None => Ok(fallback),
        Some(raw) => raw.parse::<T>().map(Some).map_err(|_| ConfigError::Parse {
            field,
            value: raw.to_string(),
        }),
    }
}
