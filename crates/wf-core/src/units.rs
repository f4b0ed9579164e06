use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WfError;

/// Unit that length values in the file are written in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthUnit {
    /// `m`
    #[default]
    Meters,
    /// `cm`
    Centimeters,
    /// `mm`
    Millimeters,
}

impl LengthUnit {
    /// Meters per file unit.
    pub fn factor(self) -> f64 {
        match self {
            Self::Meters => 1.0,
            Self::Centimeters => 0.01,
            Self::Millimeters => 0.001,
        }
    }

    /// The name used for this unit in a worldfile.
    pub fn name(self) -> &'static str {
        match self {
            Self::Meters => "m",
            Self::Centimeters => "cm",
            Self::Millimeters => "mm",
        }
    }
}

impl FromStr for LengthUnit {
    type Err = WfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "m" => Ok(Self::Meters),
            "cm" => Ok(Self::Centimeters),
            "mm" => Ok(Self::Millimeters),
            other => Err(WfError::UnknownUnit {
                kind: "length",
                name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unit that angle values in the file are written in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleUnit {
    /// `degrees`
    #[default]
    Degrees,
    /// `radians`
    Radians,
}

impl AngleUnit {
    /// Radians per file unit.
    pub fn factor(self) -> f64 {
        match self {
            Self::Degrees => std::f64::consts::PI / 180.0,
            Self::Radians => 1.0,
        }
    }

    /// The name used for this unit in a worldfile.
    pub fn name(self) -> &'static str {
        match self {
            Self::Degrees => "degrees",
            Self::Radians => "radians",
        }
    }
}

impl FromStr for AngleUnit {
    type Err = WfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "degrees" => Ok(Self::Degrees),
            "radians" => Ok(Self::Radians),
            other => Err(WfError::UnknownUnit {
                kind: "angle",
                name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for AngleUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Active conversion factors for one loaded worldfile.
///
/// File text always stays in file units; conversion happens only when a value
/// crosses the typed accessor boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitTable {
    /// Unit of length values in the file.
    pub length: LengthUnit,
    /// Unit of angle values in the file.
    pub angle: AngleUnit,
}

impl UnitTable {
    /// Create a table with explicit units.
    pub fn new(length: LengthUnit, angle: AngleUnit) -> Self {
        Self { length, angle }
    }

    /// File value to meters.
    pub fn length_from_file(&self, raw: f64) -> f64 {
        raw * self.length.factor()
    }

    /// Meters to file value.
    pub fn length_to_file(&self, meters: f64) -> f64 {
        meters / self.length.factor()
    }

    /// File value to radians.
    pub fn angle_from_file(&self, raw: f64) -> f64 {
        raw * self.angle.factor()
    }

    /// Radians to file value.
    pub fn angle_to_file(&self, radians: f64) -> f64 {
        radians / self.angle.factor()
    }
}
