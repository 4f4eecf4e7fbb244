use crate::chart_type::ChartType;
use crate::frame::SizeFrame;
use serde::Deserialize;

/// Engine-wide settings, loaded from JSON by the CLI or built in code.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Upper bound on runtime members generated from one design field.
    #[serde(default = "default_max_expansion")]
    pub max_expansion: usize,
    /// Geometry given to comparison series cloned next to their raw value.
    #[serde(default = "default_comparison_series_type")]
    pub comparison_series_type: ChartType,
    #[serde(default)]
    pub sizes: GeometrySizes,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_max_expansion() -> usize {
    64
}

fn default_comparison_series_type() -> ChartType {
    ChartType::Line
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_expansion: default_max_expansion(),
            comparison_series_type: default_comparison_series_type(),
            sizes: GeometrySizes::default(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SizeDefaults {
    pub size: f64,
    pub smallest: f64,
    pub largest: f64,
}

impl SizeDefaults {
    pub fn to_frame(self) -> SizeFrame {
        SizeFrame {
            size: self.size,
            smallest: self.smallest,
            largest: self.largest,
            user_defined: false,
        }
    }
}

/// Default size frames per resulting geometry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeometrySizes {
    pub bar: SizeDefaults,
    pub line: SizeDefaults,
    pub point: SizeDefaults,
    pub other: SizeDefaults,
}

impl Default for GeometrySizes {
    fn default() -> Self {
        Self {
            bar: SizeDefaults {
                size: 30.0,
                smallest: 10.0,
                largest: 30.0,
            },
            line: SizeDefaults {
                size: 2.0,
                smallest: 1.0,
                largest: 6.0,
            },
            point: SizeDefaults {
                size: 6.0,
                smallest: 3.0,
                largest: 15.0,
            },
            other: SizeDefaults {
                size: 1.0,
                smallest: 1.0,
                largest: 1.0,
            },
        }
    }
}

impl GeometrySizes {
    pub fn for_chart_type(&self, chart_type: ChartType) -> SizeDefaults {
        if chart_type.is_bar_family() {
            self.bar
        } else if chart_type.is_line_family() {
            self.line
        } else if matches!(chart_type, ChartType::Point | ChartType::PointStack) {
            self.point
        } else {
            self.other
        }
    }
}
