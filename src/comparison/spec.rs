// Date comparison settings as edited by the user

use crate::field::{CompareMode, DateLevel};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonScope {
    /// Compare whole periods.
    #[default]
    All,
    /// Compare each period only up to the same point as the current one.
    ToDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonDisplay {
    #[default]
    Value,
    Change,
    Percent,
    ValueAndChange,
    ValueAndPercent,
}

impl ComparisonDisplay {
    /// Raw values are plotted next to the comparison series.
    pub fn is_value_plus_comparison(self) -> bool {
        matches!(self, ComparisonDisplay::ValueAndChange | ComparisonDisplay::ValueAndPercent)
    }

    pub fn compare_mode(self) -> CompareMode {
        match self {
            ComparisonDisplay::Value => CompareMode::Value,
            ComparisonDisplay::Change | ComparisonDisplay::ValueAndChange => CompareMode::Change,
            ComparisonDisplay::Percent | ComparisonDisplay::ValueAndPercent => CompareMode::Percent,
        }
    }
}

/// The last `count` periods of `level`, e.g. the last 3 years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardPeriods {
    pub level: DateLevel,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default = "default_include_current")]
    pub include_current: bool,
    #[serde(default)]
    pub scope: ComparisonScope,
}

fn default_count() -> u32 {
    2
}

fn default_include_current() -> bool {
    true
}

/// Inclusive date range compared as one custom period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default)]
    pub label: Option<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| format!("{} - {}", self.start, self.end))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComparisonPeriods {
    Standard(StandardPeriods),
    Custom { ranges: Vec<DateRange> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateComparisonSpec {
    pub periods: ComparisonPeriods,
    /// Level the compared values are broken down to inside each period.
    /// `None` compares whole periods.
    #[serde(default)]
    pub granularity: DateLevel,
    #[serde(default)]
    pub display: ComparisonDisplay,
    /// Lay periods out as facets instead of series.
    #[serde(default)]
    pub facet: bool,
    /// Compared date column; found on the axes when unset.
    #[serde(default)]
    pub date_field: Option<String>,
}

impl DateComparisonSpec {
    pub fn standard(level: DateLevel, count: u32, granularity: DateLevel) -> Self {
        Self {
            periods: ComparisonPeriods::Standard(StandardPeriods {
                level,
                count,
                include_current: true,
                scope: ComparisonScope::All,
            }),
            granularity,
            display: ComparisonDisplay::Value,
            facet: false,
            date_field: None,
        }
    }

    pub fn with_display(mut self, display: ComparisonDisplay) -> Self {
        self.display = display;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.granularity != DateLevel::None && !self.granularity.is_interval() {
            return Err(format!(
                "granularity {} is not an interval level",
                self.granularity.label()
            ));
        }

        match &self.periods {
            ComparisonPeriods::Standard(std) => {
                if !std.level.is_interval() || std.level == DateLevel::Hour
                    || std.level == DateLevel::Minute || std.level == DateLevel::Second
                {
                    return Err(format!("period level {} is not comparable", std.level.label()));
                }
                if std.count == 0 {
                    return Err("period count must be positive".to_string());
                }
                if finer_than(std.level, self.granularity) {
                    return Err(format!(
                        "granularity {} is coarser than period {}",
                        self.granularity.label(),
                        std.level.label()
                    ));
                }
            }
            ComparisonPeriods::Custom { ranges } => {
                if ranges.is_empty() {
                    return Err("custom periods need at least one range".to_string());
                }
                if let Some(bad) = ranges.iter().find(|r| r.end < r.start) {
                    return Err(format!("range {} ends before it starts", bad.label()));
                }
                let span = super::period::span_level(ranges);
                if finer_than(span, self.granularity) {
                    return Err(format!(
                        "granularity {} is coarser than the longest range ({})",
                        self.granularity.label(),
                        span.label()
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// True when `period` is strictly finer than `granularity`.
fn finer_than(period: DateLevel, granularity: DateLevel) -> bool {
    match (period.interval_rank(), granularity.interval_rank()) {
        (Some(p), Some(g)) => p > g,
        _ => false,
    }
}
