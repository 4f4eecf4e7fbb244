use crate::aesthetic::AestheticSet;
use crate::binding::{axis_shape, AxisKind, AxisShape};
use crate::chart_type::ChartType;
use crate::comparison::spec::ComparisonDisplay;
use crate::field::{DimensionRef, FieldRef, MeasureRef};
use crate::frame::VisualFrames;
use serde::{Deserialize, Serialize};

// =============================================================================
// Runtime snapshot
// =============================================================================

/// Flags in effect for this cycle (after pie collapsing and comparison
/// overrides), as opposed to the flags the user set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StyleFlags {
    pub multi_style: bool,
    pub separated: bool,
}

/// Resolved, query/render-ready form of a binding for one cycle.
///
/// Rebuilt wholesale by every resolve; never patched field by field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RuntimeSnapshot {
    pub x: Vec<FieldRef>,
    pub y: Vec<FieldRef>,
    pub group: Vec<FieldRef>,
    /// Global aesthetics; per-aggregate ones live on each measure.
    pub aesthetics: AestheticSet,
    pub path: Option<FieldRef>,
    pub chart_type: ChartType,
    pub flags: StyleFlags,
    pub frames: VisualFrames,
    /// Date-derived grouping columns requested by the comparison pass.
    pub temp_groups: Vec<DimensionRef>,
    pub comparison: Option<ComparisonInfo>,
}

impl RuntimeSnapshot {
    pub fn axis(&self, kind: AxisKind) -> &[FieldRef] {
        match kind {
            AxisKind::X => &self.x,
            AxisKind::Y => &self.y,
            AxisKind::Group => &self.group,
        }
    }

    pub fn axis_mut(&mut self, kind: AxisKind) -> &mut Vec<FieldRef> {
        match kind {
            AxisKind::X => &mut self.x,
            AxisKind::Y => &mut self.y,
            AxisKind::Group => &mut self.group,
        }
    }

    pub fn axis_shape(&self, kind: AxisKind) -> AxisShape {
        axis_shape(self.axis(kind))
    }

    /// Measures (discrete or not) on X then Y.
    pub fn axis_measures(&self) -> impl Iterator<Item = &MeasureRef> {
        self.x.iter().chain(&self.y).filter_map(FieldRef::as_measure)
    }

    pub fn axis_measures_mut(&mut self) -> impl Iterator<Item = &mut MeasureRef> {
        self.x
            .iter_mut()
            .chain(self.y.iter_mut())
            .filter_map(FieldRef::as_measure_mut)
    }

    /// Aesthetics in effect for `measure` in multi-style mode: its own slots,
    /// with the channels it leaves empty taken from the global set.
    pub fn effective_aesthetics(&self, measure: &MeasureRef) -> AestheticSet {
        measure.aesthetics.layered_over(&self.aesthetics)
    }

    /// Every field on an axis, in an active aesthetic slot, or on the path.
    /// Outside multi-style the global slots are active; inside it, each
    /// measure's slots layered over the global ones.
    pub fn all_fields(&self) -> Vec<&FieldRef> {
        let mut fields: Vec<&FieldRef> = self.x.iter().chain(&self.y).chain(&self.group).collect();
        if self.flags.multi_style {
            for m in self.axis_measures() {
                fields.extend(
                    m.aesthetics
                        .layered(&self.aesthetics)
                        .map(|(_, slot)| slot.field.as_ref()),
                );
            }
        } else {
            fields.extend(self.aesthetics.fields());
        }
        fields.extend(self.path.as_ref());
        fields
    }

    pub fn all_dimensions(&self) -> Vec<&DimensionRef> {
        self.all_fields()
            .into_iter()
            .filter_map(FieldRef::as_dimension)
            .collect()
    }

    /// Every aggregate the binding needs from a query, deduplicated by full
    /// name in first-seen order. Includes sort-by and ranking aggregates.
    pub fn all_aggregates(&self) -> Vec<MeasureRef> {
        let mut out: Vec<MeasureRef> = Vec::new();
        let mut push = |m: &MeasureRef| {
            if is_well_formed(m) && !out.iter().any(|o| o.full_name() == m.full_name()) {
                out.push(m.clone());
            }
        };

        for field in self.all_fields() {
            match field {
                FieldRef::Measure(m) => push(m),
                FieldRef::Dimension(d) => {
                    if let Some(by) = d.sort.by.as_ref() {
                        push(by);
                    }
                    if let Some(by) = d.ranking.by.as_ref() {
                        push(by);
                    }
                }
            }
        }
        out
    }

    /// Visits every field in place: axes, per-aggregate aesthetics, global
    /// aesthetics and the path field.
    pub fn visit_fields_mut(&mut self, mut visit: impl FnMut(&mut FieldRef)) {
        for field in self.x.iter_mut().chain(self.y.iter_mut()).chain(self.group.iter_mut()) {
            visit(field);
            if let FieldRef::Measure(m) = field {
                for nested in m.aesthetics.fields_mut() {
                    visit(nested);
                }
            }
        }
        for field in self.aesthetics.fields_mut() {
            visit(field);
        }
        if let Some(path) = self.path.as_mut() {
            visit(path);
        }
    }

    pub fn find_field(&self, full_name: &str) -> Option<&FieldRef> {
        self.all_fields()
            .into_iter()
            .find(|f| f.full_name() == full_name)
    }
}

/// An aggregate with no backing column cannot be queried.
pub fn is_well_formed(measure: &MeasureRef) -> bool {
    !measure.name.trim().is_empty()
}

// =============================================================================
// Date comparison overlay
// =============================================================================

/// Where the derived period dimension ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodPlacement {
    /// Replaces the compared dimension on its own axis.
    Axis,
    /// Outer dimension on the compared dimension's axis.
    Facet,
    /// Bound to the color aesthetic.
    Color,
    /// Outer dimension on the opposite axis.
    OppositeAxis,
}

/// Runtime comparison refs attached by the date comparison pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonInfo {
    /// Full name of the compared date dimension before the overlay.
    pub base_dimension: String,
    pub axis: AxisKind,
    pub period: DimensionRef,
    pub granularity: Option<DimensionRef>,
    pub placement: PeriodPlacement,
    pub display: ComparisonDisplay,
    /// Full names of every field the pass created.
    pub generated: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aesthetic::Channel;
    use crate::field::{AggregateFormula, RankingOption};

    fn snapshot() -> RuntimeSnapshot {
        let mut region = DimensionRef::new("Region");
        region.ranking.option = RankingOption::Top;
        region.ranking.n = 3;
        region.ranking.by = Some(MeasureRef::new("Profit", AggregateFormula::Sum));
        RuntimeSnapshot {
            x: vec![region.into()],
            y: vec![MeasureRef::new("Sales", AggregateFormula::Sum).into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_all_aggregates_include_ranking_reference() {
        let snap = snapshot();
        let names: Vec<String> = snap.all_aggregates().iter().map(|m| m.full_name()).collect();
        // X before Y: the ranking aggregate of Region is seen first.
        assert_eq!(names, vec!["Sum(Profit)", "Sum(Sales)"]);
    }

    #[test]
    fn test_multi_style_layers_measure_slots_over_global() {
        let mut snap = snapshot();
        snap.aesthetics.bind(Channel::Color, DimensionRef::new("Segment"));
        snap.aesthetics.bind(Channel::Shape, DimensionRef::new("Ship Mode"));
        if let FieldRef::Measure(m) = &mut snap.y[0] {
            m.aesthetics.bind(Channel::Color, DimensionRef::new("Category"));
        }
        let names = |s: &RuntimeSnapshot| -> Vec<String> {
            s.all_dimensions().iter().map(|d| d.full_name()).collect()
        };
        let dims = names(&snap);
        assert!(dims.contains(&"Segment".to_string()));
        assert!(!dims.contains(&"Category".to_string()));

        snap.flags.multi_style = true;
        let dims = names(&snap);
        assert!(dims.contains(&"Category".to_string()));
        assert!(dims.contains(&"Ship Mode".to_string()));
        assert!(!dims.contains(&"Segment".to_string()));
    }

    #[test]
    fn test_malformed_aggregate_is_dropped() {
        let mut snap = snapshot();
        snap.y.push(MeasureRef::new("  ", AggregateFormula::Sum).into());
        assert_eq!(snap.all_aggregates().len(), 2);
    }
}
