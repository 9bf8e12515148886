//! Manufacturing constraint profile.

use serde::{Deserialize, Serialize};

/// Static manufacturing constraints consumed read-only by the sanitizer.
///
/// All thresholds are millimeters. The defaults are the documented
/// fallback used when no profile is configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineProfile {
    /// Smallest tool diameter the machine can drive; holes and circles
    /// below this get a warning.
    pub min_tool_diameter_mm: f64,
    /// Deepest single cut/extrude the machine supports.
    pub max_cut_depth_mm: f64,
    /// Thinnest wall a shell operation may leave.
    pub min_wall_thickness_mm: f64,
    /// Largest rectangular dimension accepted; exceeding it is an error.
    pub max_feature_size_mm: f64,
}

impl Default for MachineProfile {
    fn default() -> Self {
        Self {
            min_tool_diameter_mm: 0.5,
            max_cut_depth_mm: 100.0,
            min_wall_thickness_mm: 0.8,
            max_feature_size_mm: 1000.0,
        }
    }
}
