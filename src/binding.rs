//! Design-time chart binding.
//!
//! [`ChartBinding`] is what the UI edits: axes, aesthetics, nominal chart
//! type and style flags. It also owns the last [`RuntimeSnapshot`] produced
//! by [`crate::runtime::resolve`], plus the bookkeeping the date comparison
//! pass needs to undo itself.

use crate::aesthetic::AestheticSet;
use crate::chart_type::ChartType;
use crate::comparison::ComparisonState;
use crate::field::{AggregateFormula, DimensionRef, FieldFormat, FieldRef, MeasureRef};
use crate::frame::VisualFrames;
use crate::ir::RuntimeSnapshot;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisKind {
    X,
    Y,
    Group,
}

impl AxisKind {
    /// The other positional axis. `Group` has no opposite.
    pub fn opposite(self) -> Option<AxisKind> {
        match self {
            AxisKind::X => Some(AxisKind::Y),
            AxisKind::Y => Some(AxisKind::X),
            AxisKind::Group => None,
        }
    }
}

/// Shape of an axis as seen by chart type inference: decided by the last
/// (innermost) field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisShape {
    Empty,
    Dimension,
    Measure,
}

/// Ordered list of fields on one axis. Outer fields come first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindingAxis {
    fields: Vec<FieldRef>,
}

impl BindingAxis {
    pub fn new(fields: Vec<FieldRef>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldRef] {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut Vec<FieldRef> {
        &mut self.fields
    }

    pub fn into_fields(self) -> Vec<FieldRef> {
        self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn push(&mut self, field: impl Into<FieldRef>) {
        self.fields.push(field.into());
    }

    pub fn insert(&mut self, index: usize, field: impl Into<FieldRef>) {
        self.fields.insert(index, field.into());
    }

    /// Removes every field whose full name matches, returning how many went.
    pub fn remove_by_full_name(&mut self, full_name: &str) -> usize {
        let before = self.fields.len();
        self.fields.retain(|f| f.full_name() != full_name);
        before - self.fields.len()
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    pub fn shape(&self) -> AxisShape {
        axis_shape(&self.fields)
    }
}

pub fn axis_shape(fields: &[FieldRef]) -> AxisShape {
    match fields.last() {
        None => AxisShape::Empty,
        Some(f) if f.is_measure() => AxisShape::Measure,
        Some(_) => AxisShape::Dimension,
    }
}

/// Splits an axis into the fields preceding its trailing run of measures and
/// that run itself.
pub fn split_trailing_measures(fields: &[FieldRef]) -> (&[FieldRef], &[FieldRef]) {
    let run = fields.iter().rev().take_while(|f| f.is_measure()).count();
    fields.split_at(fields.len() - run)
}

/// Aggregation defaults applied to measures that carry no formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateInfo {
    pub default_formula: AggregateFormula,
}

impl Default for AggregateInfo {
    fn default() -> Self {
        Self {
            default_formula: AggregateFormula::Sum,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartBinding {
    /// Query whose columns the fields refer to.
    pub source: String,
    pub x: BindingAxis,
    pub y: BindingAxis,
    /// Breakdown fields.
    pub group: BindingAxis,
    pub aesthetics: AestheticSet,
    pub chart_type: ChartType,
    pub multi_style: bool,
    pub separated: bool,
    /// Orders points along a line.
    pub path: Option<FieldRef>,
    pub aggregate: AggregateInfo,
    pub frames: VisualFrames,

    #[serde(skip)]
    pub(crate) runtime: RuntimeSnapshot,
    #[serde(skip)]
    pub(crate) comparison: Option<ComparisonState>,
    /// Formats of comparison fields from the last torn-down cycle.
    #[serde(skip)]
    pub(crate) carried_formats: IndexMap<String, FieldFormat>,
}

impl ChartBinding {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    pub fn axis(&self, kind: AxisKind) -> &BindingAxis {
        match kind {
            AxisKind::X => &self.x,
            AxisKind::Y => &self.y,
            AxisKind::Group => &self.group,
        }
    }

    pub fn axis_mut(&mut self, kind: AxisKind) -> &mut BindingAxis {
        match kind {
            AxisKind::X => &mut self.x,
            AxisKind::Y => &mut self.y,
            AxisKind::Group => &mut self.group,
        }
    }

    pub fn with_x(mut self, field: impl Into<FieldRef>) -> Self {
        self.x.push(field);
        self
    }

    pub fn with_y(mut self, field: impl Into<FieldRef>) -> Self {
        self.y.push(field);
        self
    }

    pub fn with_group(mut self, field: impl Into<FieldRef>) -> Self {
        self.group.push(field);
        self
    }

    pub fn with_chart_type(mut self, chart_type: ChartType) -> Self {
        self.chart_type = chart_type;
        self
    }

    pub fn with_multi_style(mut self, multi_style: bool) -> Self {
        self.multi_style = multi_style;
        self
    }

    /// Last resolved runtime form of this binding.
    pub fn runtime(&self) -> &RuntimeSnapshot {
        &self.runtime
    }

    /// Mutable access for interactive edits on resolved fields (formats,
    /// axis descriptors). Edits survive the next resolve when the field's
    /// full name is unchanged.
    pub fn runtime_mut(&mut self) -> &mut RuntimeSnapshot {
        &mut self.runtime
    }

    pub fn is_comparison_active(&self) -> bool {
        self.comparison.is_some()
    }

    /// Measures on X and Y, outer to inner.
    pub fn axis_measures(&self) -> impl Iterator<Item = &MeasureRef> {
        self.x
            .fields()
            .iter()
            .chain(self.y.fields())
            .filter_map(FieldRef::as_measure)
    }

    /// Design-time date dimensions on `kind`.
    pub fn date_dimensions(&self, kind: AxisKind) -> impl Iterator<Item = &DimensionRef> {
        self.axis(kind)
            .fields()
            .iter()
            .filter_map(FieldRef::as_dimension)
            .filter(|d| d.is_date())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::DateLevel;

    #[test]
    fn test_axis_shape_from_last_field() {
        let mut axis = BindingAxis::default();
        assert_eq!(axis.shape(), AxisShape::Empty);
        axis.push(MeasureRef::new("Sales", AggregateFormula::Sum));
        axis.push(DimensionRef::new("Region"));
        assert_eq!(axis.shape(), AxisShape::Dimension);
        axis.push(MeasureRef::new("Profit", AggregateFormula::Sum));
        assert_eq!(axis.shape(), AxisShape::Measure);
    }

    #[test]
    fn test_split_trailing_measures() {
        let fields: Vec<FieldRef> = vec![
            DimensionRef::new("Region").into(),
            MeasureRef::new("Sales", AggregateFormula::Sum).into(),
            MeasureRef::new("Profit", AggregateFormula::Sum).into(),
        ];
        let (head, run) = split_trailing_measures(&fields);
        assert_eq!(head.len(), 1);
        assert_eq!(run.len(), 2);
    }

    #[test]
    fn test_remove_by_full_name() {
        let mut axis = BindingAxis::default();
        axis.push(DimensionRef::date("OrderDate", DateLevel::Year));
        axis.push(DimensionRef::date("OrderDate", DateLevel::Month));
        assert_eq!(axis.remove_by_full_name("Year(OrderDate)"), 1);
        assert_eq!(axis.len(), 1);
    }

    #[test]
    fn test_deserialize_binding() {
        let json = r#"{
            "source": "orders",
            "x": [{"role": "dimension", "name": "Region"}],
            "y": [{"role": "measure", "name": "Sales", "formula": "sum"}],
            "chart_type": "auto"
        }"#;
        let binding: ChartBinding = serde_json::from_str(json).unwrap();
        assert_eq!(binding.source, "orders");
        assert_eq!(binding.y.shape(), AxisShape::Measure);
        assert!(!binding.is_comparison_active());
    }
}
