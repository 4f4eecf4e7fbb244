use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chart geometry, either declared by the user or inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    #[default]
    Auto,
    Bar,
    BarStack,
    Line,
    LineStack,
    Step,
    StepStack,
    Area,
    AreaStack,
    Point,
    PointStack,
    Pie,
    Donut,
    Pie3d,
}

impl ChartType {
    pub fn is_auto(self) -> bool {
        self == ChartType::Auto
    }

    pub fn is_pie_family(self) -> bool {
        matches!(self, ChartType::Pie | ChartType::Donut | ChartType::Pie3d)
    }

    pub fn is_bar_family(self) -> bool {
        matches!(self, ChartType::Bar | ChartType::BarStack)
    }

    pub fn is_line_family(self) -> bool {
        matches!(
            self,
            ChartType::Line | ChartType::LineStack | ChartType::Step | ChartType::StepStack
        )
    }

    pub fn is_stacked(self) -> bool {
        matches!(
            self,
            ChartType::BarStack
                | ChartType::LineStack
                | ChartType::StepStack
                | ChartType::AreaStack
                | ChartType::PointStack
        )
    }

    /// Bar or stacked bar.
    pub fn bar(stacked: bool) -> ChartType {
        if stacked {
            ChartType::BarStack
        } else {
            ChartType::Bar
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ChartType::Auto => "auto",
            ChartType::Bar => "bar",
            ChartType::BarStack => "bar_stack",
            ChartType::Line => "line",
            ChartType::LineStack => "line_stack",
            ChartType::Step => "step",
            ChartType::StepStack => "step_stack",
            ChartType::Area => "area",
            ChartType::AreaStack => "area_stack",
            ChartType::Point => "point",
            ChartType::PointStack => "point_stack",
            ChartType::Pie => "pie",
            ChartType::Donut => "donut",
            ChartType::Pie3d => "pie3d",
        }
    }

    const ALL: [ChartType; 14] = [
        ChartType::Auto,
        ChartType::Bar,
        ChartType::BarStack,
        ChartType::Line,
        ChartType::LineStack,
        ChartType::Step,
        ChartType::StepStack,
        ChartType::Area,
        ChartType::AreaStack,
        ChartType::Point,
        ChartType::PointStack,
        ChartType::Pie,
        ChartType::Donut,
        ChartType::Pie3d,
    ];
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChartType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChartType::ALL
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown chart type '{}'", s))
    }
}
