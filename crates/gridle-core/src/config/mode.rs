//! Operating modes of the solver.

use std::fmt;
use std::str::FromStr;

use super::ConfigField;

/// Fields every mode needs before a run can start.
const BASE_REQUIRED: [ConfigField; 4] = [
    ConfigField::MaxRelErr,
    ConfigField::MaxIterations,
    ConfigField::PixelsPerMeter,
    ConfigField::ColorMap,
];

const COMPARE_REQUIRED: [ConfigField; 6] = [
    ConfigField::MaxRelErr,
    ConfigField::MaxIterations,
    ConfigField::PixelsPerMeter,
    ConfigField::ColorMap,
    ConfigField::AnalyticInnerRadius,
    ConfigField::AnalyticOuterRadius,
];

/// What the solver is asked to do for one run.
///
/// The mode picks the single command-line flag passed to the executable and
/// decides which optional fields become required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatingMode {
    /// Solve the grid once.
    SingleSimulation,
    /// Compare against the analytic solution of problem 0.
    CompareProb0,
    /// Compare against the analytic solution of problem 1.
    CompareProb1,
    /// Compare two solvers on the same grid.
    CompareTwo,
}

impl OperatingMode {
    pub const ALL: [OperatingMode; 4] = [
        Self::SingleSimulation,
        Self::CompareProb0,
        Self::CompareProb1,
        Self::CompareTwo,
    ];

    /// Command-line flag understood by the executable.
    pub fn flag(self) -> &'static str {
        match self {
            Self::SingleSimulation => "--single",
            Self::CompareProb0 => "--compare-prob0",
            Self::CompareProb1 => "--compare-prob1",
            Self::CompareTwo => "--compare-two",
        }
    }

    /// Short name used on the command line of the front end.
    pub fn name(self) -> &'static str {
        match self {
            Self::SingleSimulation => "single",
            Self::CompareProb0 => "compare-prob0",
            Self::CompareProb1 => "compare-prob1",
            Self::CompareTwo => "compare-two",
        }
    }

    /// Whether the analytic radii must be supplied.
    pub fn requires_radii(self) -> bool {
        matches!(self, Self::CompareProb0 | Self::CompareProb1)
    }

    pub fn required_fields(self) -> &'static [ConfigField] {
        if self.requires_radii() {
            &COMPARE_REQUIRED
        } else {
            &BASE_REQUIRED
        }
    }
}

impl FromStr for OperatingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.name() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|m| m.name()).collect();
                format!("unknown mode {s:?}, expected one of {}", names.join(", "))
            })
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
