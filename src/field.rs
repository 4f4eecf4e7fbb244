//! Field references bound to chart axes and aesthetic slots.
//!
//! A [`FieldRef`] is either a [`DimensionRef`] (grouping column, possibly a
//! date at some level) or a [`MeasureRef`] (aggregated column). Everything the
//! grouping and inference engines need to know is carried as plain data so
//! they can match on it exhaustively.

use crate::aesthetic::AestheticSet;
use crate::chart_type::ChartType;
use crate::frame::AxisDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    #[default]
    String,
    Integer,
    Double,
    Boolean,
    Date,
    Time,
    TimeInstant,
}

impl DataType {
    pub fn is_date(self) -> bool {
        matches!(self, DataType::Date | DataType::Time | DataType::TimeInstant)
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, DataType::Integer | DataType::Double)
    }
}

/// Date grouping level of a dimension.
///
/// Interval levels (`Year` .. `Second`) bucket the timeline; part levels
/// (`MonthOfYear`, `DayOfWeek`, ...) fold it onto a repeating cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateLevel {
    #[default]
    None,
    Year,
    Quarter,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
    QuarterOfYear,
    MonthOfYear,
    WeekOfYear,
    DayOfYear,
    MonthOfQuarter,
    WeekOfQuarter,
    DayOfQuarter,
    WeekOfMonth,
    DayOfMonth,
    DayOfWeek,
    HourOfDay,
    /// Month a full week belongs to, so a week never straddles two months.
    MonthOfFullWeek,
}

impl DateLevel {
    pub fn label(self) -> &'static str {
        match self {
            DateLevel::None => "None",
            DateLevel::Year => "Year",
            DateLevel::Quarter => "Quarter",
            DateLevel::Month => "Month",
            DateLevel::Week => "Week",
            DateLevel::Day => "Day",
            DateLevel::Hour => "Hour",
            DateLevel::Minute => "Minute",
            DateLevel::Second => "Second",
            DateLevel::QuarterOfYear => "QuarterOfYear",
            DateLevel::MonthOfYear => "MonthOfYear",
            DateLevel::WeekOfYear => "WeekOfYear",
            DateLevel::DayOfYear => "DayOfYear",
            DateLevel::MonthOfQuarter => "MonthOfQuarter",
            DateLevel::WeekOfQuarter => "WeekOfQuarter",
            DateLevel::DayOfQuarter => "DayOfQuarter",
            DateLevel::WeekOfMonth => "WeekOfMonth",
            DateLevel::DayOfMonth => "DayOfMonth",
            DateLevel::DayOfWeek => "DayOfWeek",
            DateLevel::HourOfDay => "HourOfDay",
            DateLevel::MonthOfFullWeek => "MonthOfFullWeek",
        }
    }

    /// Position on the coarse-to-fine timeline, for interval levels only.
    pub fn interval_rank(self) -> Option<u8> {
        match self {
            DateLevel::Year => Some(0),
            DateLevel::Quarter => Some(1),
            DateLevel::Month => Some(2),
            DateLevel::Week => Some(3),
            DateLevel::Day => Some(4),
            DateLevel::Hour => Some(5),
            DateLevel::Minute => Some(6),
            DateLevel::Second => Some(7),
            _ => None,
        }
    }

    pub fn is_interval(self) -> bool {
        self.interval_rank().is_some()
    }

    /// Day, any finer interval, or no level at all (raw instants).
    pub fn is_day_or_finer(self) -> bool {
        matches!(
            self,
            DateLevel::None
                | DateLevel::Day
                | DateLevel::Hour
                | DateLevel::Minute
                | DateLevel::Second
        )
    }
}

impl FromStr for DateLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = match s.to_ascii_lowercase().as_str() {
            "year" => DateLevel::Year,
            "quarter" => DateLevel::Quarter,
            "month" => DateLevel::Month,
            "week" => DateLevel::Week,
            "day" => DateLevel::Day,
            "hour" => DateLevel::Hour,
            "minute" => DateLevel::Minute,
            "second" => DateLevel::Second,
            "quarter_of_year" => DateLevel::QuarterOfYear,
            "month_of_year" => DateLevel::MonthOfYear,
            "week_of_year" => DateLevel::WeekOfYear,
            "day_of_year" => DateLevel::DayOfYear,
            "week_of_month" => DateLevel::WeekOfMonth,
            "day_of_month" => DateLevel::DayOfMonth,
            "day_of_week" => DateLevel::DayOfWeek,
            "hour_of_day" => DateLevel::HourOfDay,
            _ => return Err(format!("unknown date level '{}'", s)),
        };
        Ok(level)
    }
}

/// Where a field's column comes from at resolve time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldSource {
    #[default]
    Column,
    /// Column name(s) read from a parameter.
    Variable { name: String },
    /// Column name built from a `$param` template.
    Script { text: String },
    /// Drill hierarchy, expanded down to `depth` (0 = top level only).
    Drill { levels: Vec<String>, depth: usize },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Highlight {
    pub name: String,
    pub condition: String,
    pub color: String,
}

/// User-visible formatting attached to a field, kept across re-resolves.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldFormat {
    pub text_format: Option<String>,
    pub highlights: Vec<Highlight>,
    pub hyperlink: Option<String>,
    pub axis: Option<AxisDescriptor>,
}

impl FieldFormat {
    pub fn is_empty(&self) -> bool {
        self == &FieldFormat::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingOption {
    #[default]
    None,
    Top,
    Bottom,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Ranking {
    pub option: RankingOption,
    pub n: u32,
    /// Aggregate the ranking is computed on.
    pub by: Option<MeasureRef>,
}

impl Ranking {
    pub fn is_active(&self) -> bool {
        self.option != RankingOption::None && self.n > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    None,
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Sort {
    pub order: SortOrder,
    /// Sort by the value of this aggregate instead of the dimension itself.
    pub by: Option<MeasureRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFormula {
    Sum,
    Average,
    Count,
    DistinctCount,
    Min,
    Max,
    Median,
}

impl AggregateFormula {
    pub fn label(self) -> &'static str {
        match self {
            AggregateFormula::Sum => "Sum",
            AggregateFormula::Average => "Average",
            AggregateFormula::Count => "Count",
            AggregateFormula::DistinctCount => "DistinctCount",
            AggregateFormula::Min => "Min",
            AggregateFormula::Max => "Max",
            AggregateFormula::Median => "Median",
        }
    }
}

impl FromStr for AggregateFormula {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let formula = match s.to_ascii_lowercase().as_str() {
            "sum" => AggregateFormula::Sum,
            "avg" | "average" => AggregateFormula::Average,
            "count" => AggregateFormula::Count,
            "distinct_count" => AggregateFormula::DistinctCount,
            "min" => AggregateFormula::Min,
            "max" => AggregateFormula::Max,
            "median" => AggregateFormula::Median,
            _ => return Err(format!("unknown aggregate formula '{}'", s)),
        };
        Ok(formula)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareMode {
    Value,
    Change,
    Percent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Calculator {
    RunningTotal,
    PercentOfTotal,
    /// Period-over-period comparison against the given period level.
    PeriodComparison { mode: CompareMode, period: DateLevel },
}

impl Calculator {
    pub fn label(&self) -> &'static str {
        match self {
            Calculator::RunningTotal => "RunningTotal",
            Calculator::PercentOfTotal => "PercentOfTotal",
            Calculator::PeriodComparison { mode, .. } => match mode {
                CompareMode::Value => "ValueOf",
                CompareMode::Change => "ChangeFrom",
                CompareMode::Percent => "PercentChangeFrom",
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DimensionRef {
    pub name: String,
    pub data_type: DataType,
    pub source: FieldSource,
    pub date_level: DateLevel,
    pub time_series: bool,
    pub ranking: Ranking,
    pub sort: Sort,
    pub named_group: Option<String>,
    /// Backed by an OLAP cube member rather than a plain column.
    pub cube: bool,
    pub axis_size: Option<f64>,
    pub format: FieldFormat,
}

impl DimensionRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn date(name: impl Into<String>, level: DateLevel) -> Self {
        Self {
            name: name.into(),
            data_type: DataType::Date,
            date_level: level,
            ..Default::default()
        }
    }

    pub fn full_name(&self) -> String {
        match self.date_level {
            DateLevel::None => self.name.clone(),
            level => format!("{}({})", level.label(), self.name),
        }
    }

    pub fn is_date(&self) -> bool {
        self.data_type.is_date()
    }

    /// Date dimension that plots along a continuous timeline.
    pub fn is_time_series_at_fine_level(&self) -> bool {
        !self.cube && self.is_date() && self.time_series && self.date_level.is_day_or_finer()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasureRef {
    pub name: String,
    pub data_type: DataType,
    pub source: FieldSource,
    pub formula: Option<AggregateFormula>,
    /// Rendered and grouped like a dimension.
    pub discrete: bool,
    pub secondary: bool,
    pub chart_type: ChartType,
    pub runtime_chart_type: ChartType,
    pub calculator: Option<Calculator>,
    /// Per-aggregate aesthetics, active in multi-style mode only.
    pub aesthetics: AestheticSet,
    pub axis_size: Option<f64>,
    pub format: FieldFormat,
}

impl MeasureRef {
    pub fn new(name: impl Into<String>, formula: AggregateFormula) -> Self {
        Self {
            name: name.into(),
            data_type: DataType::Double,
            formula: Some(formula),
            ..Default::default()
        }
    }

    pub fn full_name(&self) -> String {
        let base = match self.formula {
            Some(formula) => format!("{}({})", formula.label(), self.name),
            None => self.name.clone(),
        };
        match &self.calculator {
            Some(calc) => format!("{}({})", calc.label(), base),
            None => base,
        }
    }

    pub fn is_running_total(&self) -> bool {
        matches!(self.calculator, Some(Calculator::RunningTotal))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum FieldRef {
    Dimension(DimensionRef),
    Measure(MeasureRef),
}

impl FieldRef {
    pub fn name(&self) -> &str {
        match self {
            FieldRef::Dimension(d) => &d.name,
            FieldRef::Measure(m) => &m.name,
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        match self {
            FieldRef::Dimension(d) => d.name = name.into(),
            FieldRef::Measure(m) => m.name = name.into(),
        }
    }

    pub fn full_name(&self) -> String {
        match self {
            FieldRef::Dimension(d) => d.full_name(),
            FieldRef::Measure(m) => m.full_name(),
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            FieldRef::Dimension(d) => d.data_type,
            FieldRef::Measure(m) => m.data_type,
        }
    }

    pub fn set_data_type(&mut self, data_type: DataType) {
        match self {
            FieldRef::Dimension(d) => d.data_type = data_type,
            FieldRef::Measure(m) => m.data_type = data_type,
        }
    }

    pub fn source(&self) -> &FieldSource {
        match self {
            FieldRef::Dimension(d) => &d.source,
            FieldRef::Measure(m) => &m.source,
        }
    }

    /// True for aggregates that are not rendered as a dimension.
    pub fn is_measure(&self) -> bool {
        matches!(self, FieldRef::Measure(m) if !m.discrete)
    }

    pub fn is_discrete_measure(&self) -> bool {
        matches!(self, FieldRef::Measure(m) if m.discrete)
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, FieldRef::Measure(_))
    }

    pub fn is_date(&self) -> bool {
        matches!(self, FieldRef::Dimension(d) if d.is_date())
    }

    pub fn as_dimension(&self) -> Option<&DimensionRef> {
        match self {
            FieldRef::Dimension(d) => Some(d),
            FieldRef::Measure(_) => None,
        }
    }

    pub fn as_dimension_mut(&mut self) -> Option<&mut DimensionRef> {
        match self {
            FieldRef::Dimension(d) => Some(d),
            FieldRef::Measure(_) => None,
        }
    }

    pub fn as_measure(&self) -> Option<&MeasureRef> {
        match self {
            FieldRef::Measure(m) => Some(m),
            FieldRef::Dimension(_) => None,
        }
    }

    pub fn as_measure_mut(&mut self) -> Option<&mut MeasureRef> {
        match self {
            FieldRef::Measure(m) => Some(m),
            FieldRef::Dimension(_) => None,
        }
    }

    pub fn format(&self) -> &FieldFormat {
        match self {
            FieldRef::Dimension(d) => &d.format,
            FieldRef::Measure(m) => &m.format,
        }
    }

    pub fn format_mut(&mut self) -> &mut FieldFormat {
        match self {
            FieldRef::Dimension(d) => &mut d.format,
            FieldRef::Measure(m) => &mut m.format,
        }
    }

    pub fn axis_size(&self) -> Option<f64> {
        match self {
            FieldRef::Dimension(d) => d.axis_size,
            FieldRef::Measure(m) => m.axis_size,
        }
    }

    pub fn set_axis_size(&mut self, size: Option<f64>) {
        match self {
            FieldRef::Dimension(d) => d.axis_size = size,
            FieldRef::Measure(m) => m.axis_size = size,
        }
    }
}

impl From<DimensionRef> for FieldRef {
    fn from(dim: DimensionRef) -> Self {
        FieldRef::Dimension(dim)
    }
}

impl From<MeasureRef> for FieldRef {
    fn from(measure: MeasureRef) -> Self {
        FieldRef::Measure(measure)
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_full_name() {
        assert_eq!(DimensionRef::new("Region").full_name(), "Region");
        assert_eq!(
            DimensionRef::date("OrderDate", DateLevel::MonthOfYear).full_name(),
            "MonthOfYear(OrderDate)"
        );
    }

    #[test]
    fn test_measure_full_name_with_calculator() {
        let mut sales = MeasureRef::new("Sales", AggregateFormula::Sum);
        assert_eq!(sales.full_name(), "Sum(Sales)");
        sales.calculator = Some(Calculator::RunningTotal);
        assert_eq!(sales.full_name(), "RunningTotal(Sum(Sales))");
        assert!(sales.is_running_total());
    }

    #[test]
    fn test_discrete_measure_is_not_measure() {
        let mut m = MeasureRef::new("Qty", AggregateFormula::Count);
        m.discrete = true;
        let field = FieldRef::from(m);
        assert!(!field.is_measure());
        assert!(field.is_discrete_measure());
        assert!(field.is_aggregate());
    }

    #[test]
    fn test_fine_time_series() {
        let mut dim = DimensionRef::date("OrderDate", DateLevel::Day);
        assert!(!dim.is_time_series_at_fine_level());
        dim.time_series = true;
        assert!(dim.is_time_series_at_fine_level());
        dim.date_level = DateLevel::Month;
        assert!(!dim.is_time_series_at_fine_level());
        dim.date_level = DateLevel::Hour;
        dim.cube = true;
        assert!(!dim.is_time_series_at_fine_level());
    }

    #[test]
    fn test_field_ref_serde_tagged() {
        let field: FieldRef =
            serde_json::from_str(r#"{"role":"measure","name":"Sales","formula":"sum"}"#).unwrap();
        assert_eq!(field.full_name(), "Sum(Sales)");
    }
}
