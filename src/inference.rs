//! Chart type inference.
//!
//! [`infer_chart_type`] is a pure decision table over an [`InferenceInput`];
//! [`apply_chart_types`] builds those inputs from a runtime snapshot and
//! writes the results back (shared type, per-measure types, effective
//! multi-style flag).

use crate::aesthetic::{AestheticSet, Channel};
use crate::binding::AxisShape;
use crate::chart_type::ChartType;
use crate::field::{FieldRef, MeasureRef};
use crate::ir::RuntimeSnapshot;
use tracing::debug;

/// Immutable flags read by the decision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InferenceFlags {
    /// A text (label / word cloud) field is bound.
    pub text_bound: bool,
    /// A non-measure aesthetic or breakdown field splits the measure.
    pub stack: bool,
    /// Some measure on the chart carries a running-total calculator.
    pub running_total: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InferenceInput {
    pub x: AxisShape,
    pub y: AxisShape,
    /// The innermost X field is a non-cube, day-or-finer, time-series date.
    pub x_time_series: bool,
    pub measure_count: usize,
    pub flags: InferenceFlags,
}

impl InferenceInput {
    pub fn new(
        xref: Option<&FieldRef>,
        yref: Option<&FieldRef>,
        measure_count: usize,
        flags: InferenceFlags,
    ) -> Self {
        let shape = |f: Option<&FieldRef>| match f {
            None => AxisShape::Empty,
            Some(f) if f.is_measure() => AxisShape::Measure,
            Some(_) => AxisShape::Dimension,
        };
        let x_time_series = matches!(
            xref,
            Some(FieldRef::Dimension(d)) if d.is_time_series_at_fine_level()
        );
        Self {
            x: shape(xref),
            y: shape(yref),
            x_time_series,
            measure_count,
            flags,
        }
    }
}

/// Effective geometry for an `Auto` chart.
pub fn infer_chart_type(input: &InferenceInput) -> ChartType {
    use AxisShape::*;

    match (input.x, input.y) {
        (Empty, Empty) => {
            if input.flags.text_bound || input.measure_count == 0 {
                ChartType::Point
            } else {
                ChartType::Bar
            }
        }
        (Empty, other) | (other, Empty) => {
            if other == Dimension || input.flags.text_bound {
                ChartType::Point
            } else {
                ChartType::Bar
            }
        }
        (Dimension, Dimension) => ChartType::Point,
        (Measure, Measure) => ChartType::Point,
        (Dimension, Measure) if input.x_time_series => {
            if input.flags.running_total {
                ChartType::Step
            } else {
                ChartType::Line
            }
        }
        (Dimension, Measure) | (Measure, Dimension) => ChartType::bar(input.flags.stack),
    }
}

/// Shared type for a multi-style chart whose measures all declare a
/// pie-family type; `None` when any measure is outside the family.
pub fn collapse_pie_family(types: &[ChartType]) -> Option<ChartType> {
    let first = *types.first()?;
    if !types.iter().all(|t| t.is_pie_family()) {
        return None;
    }
    if types.iter().all(|t| *t == first) {
        Some(first)
    } else {
        Some(ChartType::Pie)
    }
}

fn has_breakdown(snapshot: &RuntimeSnapshot) -> bool {
    snapshot.group.iter().any(|f| !f.is_measure())
}

fn flags_for(snapshot: &RuntimeSnapshot, aesthetics: &AestheticSet) -> InferenceFlags {
    InferenceFlags {
        text_bound: aesthetics.is_bound(Channel::Text),
        stack: aesthetics.has_non_measure() || has_breakdown(snapshot),
        running_total: snapshot.axis_measures().any(MeasureRef::is_running_total),
    }
}

fn input_for(snapshot: &RuntimeSnapshot, aesthetics: &AestheticSet) -> InferenceInput {
    let measure_count = snapshot
        .all_fields()
        .into_iter()
        .filter(|f| f.is_measure())
        .count();
    InferenceInput::new(
        snapshot.x.last(),
        snapshot.y.last(),
        measure_count,
        flags_for(snapshot, aesthetics),
    )
}

/// Assigns the shared and per-measure runtime chart types.
///
/// `snapshot.flags.multi_style` must hold the user's flag on entry; it is
/// cleared when a pie-family collapse makes per-measure styling moot.
pub fn apply_chart_types(snapshot: &mut RuntimeSnapshot, nominal: ChartType) {
    if snapshot.flags.multi_style {
        let declared: Vec<ChartType> = snapshot.axis_measures().map(|m| m.chart_type).collect();
        if let Some(shared) = collapse_pie_family(&declared) {
            debug!(chart_type = %shared, "collapsed multi-style pie family");
            snapshot.flags.multi_style = false;
            snapshot.chart_type = shared;
            for m in snapshot.axis_measures_mut() {
                m.runtime_chart_type = shared;
            }
            return;
        }

        let per_measure: Vec<ChartType> = snapshot
            .axis_measures()
            .map(|m| {
                if !m.chart_type.is_auto() {
                    m.chart_type
                } else if !nominal.is_auto() {
                    nominal
                } else {
                    infer_chart_type(&input_for(snapshot, &snapshot.effective_aesthetics(m)))
                }
            })
            .collect();

        for (m, chart_type) in snapshot.axis_measures_mut().zip(per_measure.iter().copied()) {
            m.runtime_chart_type = chart_type;
        }
        snapshot.chart_type = if !nominal.is_auto() {
            nominal
        } else {
            per_measure
                .first()
                .copied()
                .unwrap_or_else(|| infer_chart_type(&input_for(snapshot, &AestheticSet::default())))
        };
        debug!(
            chart_type = %snapshot.chart_type,
            measures = per_measure.len(),
            "assigned multi-style chart types"
        );
        return;
    }

    let chart_type = if nominal.is_auto() {
        infer_chart_type(&input_for(snapshot, &snapshot.aesthetics))
    } else {
        nominal
    };
    snapshot.chart_type = chart_type;
    for m in snapshot.axis_measures_mut() {
        m.runtime_chart_type = chart_type;
    }
    debug!(chart_type = %chart_type, nominal = %nominal, "assigned chart type");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{AggregateFormula, Calculator, DateLevel, DimensionRef};

    fn sales() -> MeasureRef {
        MeasureRef::new("Sales", AggregateFormula::Sum)
    }

    fn daily() -> DimensionRef {
        let mut d = DimensionRef::date("OrderDate", DateLevel::Day);
        d.time_series = true;
        d
    }

    fn infer(snapshot: &mut RuntimeSnapshot) -> ChartType {
        apply_chart_types(snapshot, ChartType::Auto);
        snapshot.chart_type
    }

    #[test]
    fn test_measure_only_is_bar_unless_text() {
        let mut snap = RuntimeSnapshot {
            y: vec![sales().into()],
            ..Default::default()
        };
        assert_eq!(infer(&mut snap), ChartType::Bar);
        snap.aesthetics.bind(Channel::Text, DimensionRef::new("Word"));
        assert_eq!(infer(&mut snap), ChartType::Point);
    }

    #[test]
    fn test_dimension_only_is_point() {
        let mut snap = RuntimeSnapshot {
            x: vec![DimensionRef::new("Region").into()],
            ..Default::default()
        };
        assert_eq!(infer(&mut snap), ChartType::Point);
    }

    #[test]
    fn test_two_dimensions_ignore_stacking() {
        let mut snap = RuntimeSnapshot {
            x: vec![DimensionRef::new("Region").into()],
            y: vec![DimensionRef::new("Segment").into()],
            group: vec![DimensionRef::new("Category").into()],
            ..Default::default()
        };
        snap.aesthetics.bind(Channel::Color, DimensionRef::new("Ship Mode"));
        assert_eq!(infer(&mut snap), ChartType::Point);
    }

    #[test]
    fn test_breakdown_or_color_stacks_bars() {
        let mut snap = RuntimeSnapshot {
            x: vec![DimensionRef::new("Region").into()],
            y: vec![sales().into()],
            ..Default::default()
        };
        assert_eq!(infer(&mut snap), ChartType::Bar);
        snap.group.push(DimensionRef::new("Segment").into());
        assert_eq!(infer(&mut snap), ChartType::BarStack);
        snap.group.clear();
        snap.aesthetics.bind(Channel::Color, DimensionRef::new("Segment"));
        assert_eq!(infer(&mut snap), ChartType::BarStack);
    }

    #[test]
    fn test_measure_on_color_does_not_stack() {
        let mut snap = RuntimeSnapshot {
            x: vec![DimensionRef::new("Region").into()],
            y: vec![sales().into()],
            ..Default::default()
        };
        snap.aesthetics.bind(Channel::Color, MeasureRef::new("Profit", AggregateFormula::Sum));
        assert_eq!(infer(&mut snap), ChartType::Bar);
    }

    #[test]
    fn test_time_series_line_and_step() {
        let mut snap = RuntimeSnapshot {
            x: vec![daily().into()],
            y: vec![sales().into()],
            ..Default::default()
        };
        assert_eq!(infer(&mut snap), ChartType::Line);

        let mut running = sales();
        running.calculator = Some(Calculator::RunningTotal);
        snap.y.push(running.into());
        assert_eq!(infer(&mut snap), ChartType::Step);
    }

    #[test]
    fn test_time_series_on_y_stays_bar() {
        let mut snap = RuntimeSnapshot {
            x: vec![sales().into()],
            y: vec![daily().into()],
            ..Default::default()
        };
        assert_eq!(infer(&mut snap), ChartType::Bar);
    }

    #[test]
    fn test_monthly_date_is_not_time_series() {
        let mut month = daily();
        month.date_level = DateLevel::Month;
        let mut snap = RuntimeSnapshot {
            x: vec![month.into()],
            y: vec![sales().into()],
            ..Default::default()
        };
        assert_eq!(infer(&mut snap), ChartType::Bar);
    }

    #[test]
    fn test_nominal_type_wins() {
        let mut snap = RuntimeSnapshot {
            x: vec![DimensionRef::new("Region").into()],
            y: vec![sales().into()],
            ..Default::default()
        };
        apply_chart_types(&mut snap, ChartType::Area);
        assert_eq!(snap.chart_type, ChartType::Area);
        assert_eq!(snap.y[0].as_measure().unwrap().runtime_chart_type, ChartType::Area);
    }

    #[test]
    fn test_multi_style_pie_collapse() {
        let mut a = sales();
        a.chart_type = ChartType::Donut;
        let mut b = MeasureRef::new("Profit", AggregateFormula::Sum);
        b.chart_type = ChartType::Donut;
        let mut snap = RuntimeSnapshot {
            y: vec![a.into(), b.into()],
            ..Default::default()
        };
        snap.flags.multi_style = true;
        assert_eq!(infer(&mut snap), ChartType::Donut);
        assert!(!snap.flags.multi_style);

        if let FieldRef::Measure(m) = &mut snap.y[1] {
            m.chart_type = ChartType::Pie3d;
        }
        snap.flags.multi_style = true;
        assert_eq!(infer(&mut snap), ChartType::Pie);
    }

    #[test]
    fn test_multi_style_per_measure_types() {
        let mut a = sales();
        a.aesthetics.bind(Channel::Color, DimensionRef::new("Segment"));
        let mut b = MeasureRef::new("Profit", AggregateFormula::Sum);
        b.chart_type = ChartType::Line;
        let mut snap = RuntimeSnapshot {
            x: vec![DimensionRef::new("Region").into()],
            y: vec![a.into(), b.into()],
            ..Default::default()
        };
        snap.flags.multi_style = true;
        apply_chart_types(&mut snap, ChartType::Auto);
        assert!(snap.flags.multi_style);
        let types: Vec<ChartType> = snap.axis_measures().map(|m| m.runtime_chart_type).collect();
        assert_eq!(types, vec![ChartType::BarStack, ChartType::Line]);
        assert_eq!(snap.chart_type, ChartType::BarStack);
    }

    #[test]
    fn test_multi_style_reads_global_slots() {
        let mut snap = RuntimeSnapshot {
            x: vec![DimensionRef::new("Region").into()],
            y: vec![sales().into()],
            ..Default::default()
        };
        snap.flags.multi_style = true;
        snap.aesthetics.bind(Channel::Color, DimensionRef::new("Segment"));
        assert_eq!(infer(&mut snap), ChartType::BarStack);

        let mut cloud = RuntimeSnapshot {
            y: vec![sales().into()],
            ..Default::default()
        };
        cloud.flags.multi_style = true;
        cloud.aesthetics.bind(Channel::Text, DimensionRef::new("Word"));
        assert_eq!(infer(&mut cloud), ChartType::Point);
        let types: Vec<ChartType> = cloud.axis_measures().map(|m| m.runtime_chart_type).collect();
        assert_eq!(types, vec![ChartType::Point]);
    }

    #[test]
    fn test_decision_table_is_pure() {
        let input = InferenceInput {
            x: AxisShape::Dimension,
            y: AxisShape::Measure,
            x_time_series: true,
            measure_count: 1,
            flags: InferenceFlags {
                running_total: true,
                ..Default::default()
            },
        };
        assert_eq!(infer_chart_type(&input), infer_chart_type(&input));
        assert_eq!(infer_chart_type(&input), ChartType::Step);
    }
}
