// Visual frame descriptors (axis, legend, size).
//
// These are value objects owned by the render layer. The engine only
// toggles visibility, sizes and series color keys; everything else travels
// through `properties` untouched.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisDescriptor {
    pub visible: bool,
    pub properties: IndexMap<String, Value>,
}

impl Default for AxisDescriptor {
    fn default() -> Self {
        Self {
            visible: true,
            properties: IndexMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegendDescriptor {
    pub visible: bool,
    /// Series full name -> full name of the series whose color it reuses.
    pub series_colors: IndexMap<String, String>,
    pub properties: IndexMap<String, Value>,
}

impl Default for LegendDescriptor {
    fn default() -> Self {
        Self {
            visible: true,
            series_colors: IndexMap::new(),
            properties: IndexMap::new(),
        }
    }
}

/// Size scale used by the render layer for marks of the resulting geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeFrame {
    pub size: f64,
    pub smallest: f64,
    pub largest: f64,
    /// True once the user picked a size; defaults are then left alone.
    pub user_defined: bool,
}

impl Default for SizeFrame {
    fn default() -> Self {
        Self {
            size: 1.0,
            smallest: 1.0,
            largest: 1.0,
            user_defined: false,
        }
    }
}

/// Frame attached to a single aesthetic slot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelFrame {
    pub properties: IndexMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualFrames {
    pub x_axis: AxisDescriptor,
    pub y_axis: AxisDescriptor,
    pub secondary_y_axis: AxisDescriptor,
    pub color_legend: LegendDescriptor,
    pub shape_legend: LegendDescriptor,
    pub size_legend: LegendDescriptor,
    pub size: SizeFrame,
}
