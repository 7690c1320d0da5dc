//! Configuration documents for the Gridle solver.
//!
//! A run is described by a [`Configuration`]: solver scalars, two zip flags,
//! optional analytic radii for the comparison modes, and an ordered color map
//! that tells the solver what each color in the source image means.
//!
//! # Building a run configuration
//!
//! ```text
//! Defaults (loaded once)
//!     │
//!     └── Configuration::from_defaults
//!             │
//!             ├── merge_overrides   (raw scalar/flag values from the front end)
//!             │
//!             └── merge_color_map   (raw per-entry type/value pairs)
//!                     │
//!                     └── Configuration::to_json_bytes → child stdin
//! ```
//!
//! # Module Structure
//!
//! - `model` - Document types and their wire format
//! - `mode` - Operating modes and their command-line flags
//! - `merge` - Override and color map merging
//! - `defaults` - The immutable defaults document and color matching
//! - `preprocess` - Reading the solver's preprocess report

mod defaults;
mod merge;
mod mode;
mod model;
mod preprocess;

pub use defaults::Defaults;
pub use merge::{RawColorEntry, RawOverrides, merge_color_map, merge_overrides};
pub use mode::OperatingMode;
pub use model::{
    CalculationMode, ColorMapEntry, ColorRule, ConfigField, Configuration, EntryKind, Rgb,
};
pub use preprocess::PreprocessReport;
