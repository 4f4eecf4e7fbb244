// Syntax tree for the binding DSL

use crate::aesthetic::Channel;
use crate::binding::AxisKind;
use crate::chart_type::ChartType;
use crate::field::{AggregateFormula, FieldRef};

/// One `|`-separated stage of a binding pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Query the fields refer to
    Source(String),
    /// Fields appended to an axis, outer first
    Axis(AxisKind, Vec<FieldRef>),
    /// Global aesthetic binding
    Aesthetic(Channel, FieldRef),
    Path(FieldRef),
    ChartType(ChartType),
    /// Formula for measures declared without one
    Aggregate(AggregateFormula),
    MultiStyle,
    Separated,
}
