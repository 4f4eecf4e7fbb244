//! Period-over-period date comparison.
//!
//! [`apply_date_comparison`] overlays comparison semantics on a resolved
//! snapshot: the compared date dimension is split into a period dimension
//! and a granularity dimension, aggregates pick up a comparison calculator
//! and the chart type is re-derived. The overlay is computed on a copy; the
//! pre-comparison snapshot is kept so [`clear_date_comparison`] can restore
//! it before the next cycle.

pub mod grouping;
pub mod period;
pub mod spec;

use self::grouping::{period_column, DateGroupingUtility};
use self::period::{levels_for, DerivedLevels};
use self::spec::{ComparisonPeriods, DateComparisonSpec};
use crate::aesthetic::Channel;
use crate::binding::{AxisKind, ChartBinding};
use crate::chart_type::ChartType;
use crate::config::EngineConfig;
use crate::field::{
    Calculator, CompareMode, DataType, DateLevel, DimensionRef, FieldFormat, FieldRef, Ranking,
    Sort,
};
use crate::inference::apply_chart_types;
use crate::ir::{ComparisonInfo, PeriodPlacement, RuntimeSnapshot};
use crate::resolve::{carry_formats, collect_formats, FormatLedger};
use tracing::{debug, trace};

/// Undo record for an applied comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonState {
    base: RuntimeSnapshot,
    generated: Vec<String>,
}

impl ComparisonState {
    /// Snapshot as it was before the overlay.
    pub fn base(&self) -> &RuntimeSnapshot {
        &self.base
    }

    pub fn generated(&self) -> &[String] {
        &self.generated
    }
}

/// Restores the pre-comparison snapshot. Formats the user gave generated
/// fields are kept aside for the next overlay; edits to other fields are
/// carried onto the restored snapshot. Returns false when nothing was
/// applied.
pub fn clear_date_comparison(binding: &mut ChartBinding) -> bool {
    let Some(state) = binding.comparison.take() else {
        return false;
    };

    let (carried, kept): (FormatLedger, FormatLedger) = collect_formats(&binding.runtime)
        .into_iter()
        .partition(|(name, _)| state.generated.contains(name));

    let mut base = state.base;
    carry_formats(&kept, &mut base);
    binding.runtime = base;
    binding.carried_formats = carried;

    debug!(
        generated = state.generated.len(),
        carried = binding.carried_formats.len(),
        "cleared date comparison"
    );
    true
}

/// Tears down any previous comparison, then overlays `spec` on the current
/// runtime snapshot. An absent or invalid spec, or a binding with no single
/// comparable date dimension, leaves the binding uncompared.
pub fn apply_date_comparison(
    binding: &mut ChartBinding,
    spec: Option<&DateComparisonSpec>,
    grouping: &dyn DateGroupingUtility,
    config: &EngineConfig,
) -> bool {
    clear_date_comparison(binding);

    let Some(spec) = spec else {
        return false;
    };
    if let Err(reason) = spec.validate() {
        debug!(%reason, "ignoring invalid date comparison");
        return false;
    }

    let base = binding.runtime.clone();
    let Some(target) = find_target(&base, spec) else {
        debug!("no comparable date dimension, skipping comparison");
        return false;
    };

    let mut overlay = Overlay {
        spec,
        config,
        levels: levels_for(spec),
        target,
        generated: Vec::new(),
        clones: Vec::new(),
        series: Vec::new(),
    };
    let snapshot = overlay.run(
        base.clone(),
        grouping,
        &binding.carried_formats,
        binding.chart_type,
    );

    debug!(
        date = %overlay.target.dim.full_name(),
        placement = ?snapshot.comparison.as_ref().map(|c| c.placement),
        generated = overlay.generated.len(),
        "applied date comparison"
    );
    binding.comparison = Some(ComparisonState {
        base,
        generated: overlay.generated,
    });
    binding.runtime = snapshot;
    true
}

/// The date dimension being compared and where it sits.
struct Target {
    axis: AxisKind,
    opposite: AxisKind,
    index: usize,
    dim: DimensionRef,
}

/// Exactly one date dimension on X (else Y), with an aggregate on the
/// opposite axis.
fn find_target(snapshot: &RuntimeSnapshot, spec: &DateComparisonSpec) -> Option<Target> {
    let wanted = |d: &DimensionRef| match spec.date_field.as_deref() {
        Some(name) => d.name.eq_ignore_ascii_case(name) || d.full_name() == name,
        None => true,
    };

    for axis in [AxisKind::X, AxisKind::Y] {
        let Some(opposite) = axis.opposite() else { continue };
        let dates: Vec<(usize, &DimensionRef)> = snapshot
            .axis(axis)
            .iter()
            .enumerate()
            .filter_map(|(idx, f)| f.as_dimension().map(|d| (idx, d)))
            .filter(|(_, d)| d.is_date() && wanted(*d))
            .collect();

        match dates.as_slice() {
            [] => continue,
            [(index, dim)] => {
                if snapshot.axis(opposite).iter().any(FieldRef::is_measure) {
                    return Some(Target {
                        axis,
                        opposite,
                        index: *index,
                        dim: (*dim).clone(),
                    });
                }
                trace!(axis = ?axis, "date dimension has no aggregate opposite");
            }
            _ => {
                debug!(axis = ?axis, count = dates.len(), "ambiguous comparison date dimension");
                return None;
            }
        }
    }
    None
}

struct Overlay<'a> {
    spec: &'a DateComparisonSpec,
    config: &'a EngineConfig,
    levels: DerivedLevels,
    target: Target,
    /// Full names of every field this overlay created.
    generated: Vec<String>,
    /// Full names of aggregates cloned next to their raw value.
    clones: Vec<String>,
    /// (comparison series, base series) pairs sharing a legend color.
    series: Vec<(String, String)>,
}

impl Overlay<'_> {
    fn run(
        &mut self,
        mut snap: RuntimeSnapshot,
        grouping: &dyn DateGroupingUtility,
        carried: &FormatLedger,
        nominal: ChartType,
    ) -> RuntimeSnapshot {
        let base_stacked = snap.chart_type.is_stacked();

        // 1. Raw values plotted beside the comparison need per-measure styling
        if self.spec.display.is_value_plus_comparison() {
            snap.flags.multi_style = true;
        }

        // 2. Derived dimensions
        let granularity = self
            .levels
            .granularity
            .map(|level| self.derived_dimension(level));
        let period = self.period_dimension();
        trace!(
            period = %period.full_name(),
            granularity = ?granularity.as_ref().map(DimensionRef::full_name),
            "derived comparison dimensions"
        );

        // 3. Drop the compared dimension and its duplicates
        let position = self.detach_base(&mut snap);

        // 4. Place the period
        let placement = self.place(&mut snap, position, &period, granularity.as_ref());
        self.generated.extend(granularity.iter().map(DimensionRef::full_name));
        self.generated.push(period.full_name());

        // 5. Temporary grouping columns
        snap.temp_groups = grouping.temp_groups_for(self.spec, &self.target.dim);

        // 6. Plain ordering on the derived dimensions
        let derived: Vec<String> = self.generated.clone();
        snap.visit_fields_mut(|field| {
            if let FieldRef::Dimension(d) = field {
                if derived.contains(&d.full_name()) {
                    reset_ordering(d);
                }
            }
        });

        // 7. Comparison calculators
        self.apply_calculators(&mut snap);

        // 8. Formats from the previous overlay
        let ledger: FormatLedger = carried
            .iter()
            .filter(|(name, _)| self.generated.contains(name))
            .map(|(name, format)| (name.clone(), format.clone()))
            .collect();
        let restored = carry_formats(&ledger, &mut snap);
        trace!(restored, "restored comparison field formats");

        // 9. Chart type and visual frames
        self.assign_chart_types(&mut snap, nominal, base_stacked);
        if !snap.frames.size.user_defined {
            snap.frames.size = self.config.sizes.for_chart_type(snap.chart_type).to_frame();
        }
        if placement == PeriodPlacement::Color {
            snap.frames.color_legend.visible = true;
        }
        for (series, base) in &self.series {
            snap.frames
                .color_legend
                .series_colors
                .insert(series.clone(), base.clone());
        }

        snap.comparison = Some(ComparisonInfo {
            base_dimension: self.target.dim.full_name(),
            axis: self.target.axis,
            period,
            granularity,
            placement,
            display: self.spec.display,
            generated: self.generated.clone(),
        });
        snap
    }

    fn derived_dimension(&self, level: DateLevel) -> DimensionRef {
        let base = &self.target.dim;
        DimensionRef {
            name: base.name.clone(),
            data_type: base.data_type,
            source: base.source.clone(),
            date_level: level,
            cube: base.cube,
            axis_size: base.axis_size,
            ..Default::default()
        }
    }

    fn period_dimension(&self) -> DimensionRef {
        match &self.spec.periods {
            ComparisonPeriods::Standard(_) => {
                let mut period = self.derived_dimension(self.levels.period);
                period.axis_size = None;
                period
            }
            ComparisonPeriods::Custom { .. } => DimensionRef {
                data_type: DataType::String,
                ..DimensionRef::new(period_column(&self.target.dim.name))
            },
        }
    }

    /// Removes every axis dimension on the compared column and returns the
    /// position the compared dimension held, adjusted for removals.
    fn detach_base(&self, snap: &mut RuntimeSnapshot) -> usize {
        let name = self.target.dim.name.as_str();
        let same_column =
            |f: &FieldRef| f.as_dimension().is_some() && f.name().eq_ignore_ascii_case(name);

        let shifted = snap.axis(self.target.axis)[..self.target.index]
            .iter()
            .filter(|f| same_column(*f))
            .count();
        for kind in [AxisKind::X, AxisKind::Y, AxisKind::Group] {
            snap.axis_mut(kind).retain(|f| !same_column(f));
        }
        self.target.index - shifted
    }

    fn color_bound(&self, snap: &RuntimeSnapshot) -> bool {
        if snap.flags.multi_style {
            snap.axis(self.target.opposite)
                .iter()
                .filter_map(FieldRef::as_measure)
                .any(|m| snap.effective_aesthetics(m).is_bound(Channel::Color))
        } else {
            snap.aesthetics.is_bound(Channel::Color)
        }
    }

    fn place(
        &self,
        snap: &mut RuntimeSnapshot,
        position: usize,
        period: &DimensionRef,
        granularity: Option<&DimensionRef>,
    ) -> PeriodPlacement {
        let Some(granularity) = granularity else {
            snap.axis_mut(self.target.axis).insert(position, period.clone().into());
            return PeriodPlacement::Axis;
        };

        let placement = if self.spec.facet {
            PeriodPlacement::Facet
        } else if !self.color_bound(snap) {
            PeriodPlacement::Color
        } else {
            PeriodPlacement::OppositeAxis
        };

        snap.axis_mut(self.target.axis)
            .insert(position, granularity.clone().into());
        match placement {
            PeriodPlacement::Facet => {
                snap.axis_mut(self.target.axis).insert(position, period.clone().into());
            }
            PeriodPlacement::Color if snap.flags.multi_style => {
                for field in snap.axis_mut(self.target.opposite).iter_mut() {
                    if let Some(m) = field.as_measure_mut() {
                        m.aesthetics.bind(Channel::Color, period.clone());
                    }
                }
            }
            PeriodPlacement::Color => {
                snap.aesthetics.bind(Channel::Color, period.clone());
            }
            PeriodPlacement::OppositeAxis | PeriodPlacement::Axis => {
                snap.axis_mut(self.target.opposite).insert(0, period.clone().into());
            }
        }
        placement
    }

    fn apply_calculators(&mut self, snap: &mut RuntimeSnapshot) {
        let mode = self.spec.display.compare_mode();
        if mode == CompareMode::Value {
            return;
        }
        let calculator = Calculator::PeriodComparison {
            mode,
            period: self.levels.period,
        };

        let axis = snap.axis_mut(self.target.opposite);
        if self.spec.display.is_value_plus_comparison() {
            let mut clones: Vec<FieldRef> = Vec::new();
            for raw in axis.iter().filter_map(FieldRef::as_measure).filter(|m| !m.discrete) {
                let mut clone = raw.clone();
                clone.calculator = Some(calculator.clone());
                clone.secondary = true;
                clone.axis_size = None;
                clone.format = FieldFormat::default();
                self.series.push((clone.full_name(), raw.full_name()));
                self.clones.push(clone.full_name());
                clones.push(clone.into());
            }
            axis.extend(clones);
        } else {
            for m in axis.iter_mut().filter_map(FieldRef::as_measure_mut) {
                if m.discrete {
                    continue;
                }
                let raw = m.full_name();
                m.calculator = Some(calculator.clone());
                m.format = FieldFormat::default();
                self.series.push((m.full_name(), raw));
            }
        }
        self.generated
            .extend(self.series.iter().map(|(series, _)| series.clone()));
    }

    fn assign_chart_types(
        &self,
        snap: &mut RuntimeSnapshot,
        nominal: ChartType,
        base_stacked: bool,
    ) {
        apply_chart_types(snap, nominal);
        if !nominal.is_auto() && self.clones.is_empty() {
            return;
        }

        let to_bar = |t: ChartType| {
            if t.is_pie_family() {
                t
            } else {
                ChartType::bar(base_stacked)
            }
        };
        if nominal.is_auto() {
            snap.chart_type = to_bar(snap.chart_type);
        }

        let multi_style = snap.flags.multi_style;
        let shared = snap.chart_type;
        let series_type = self.config.comparison_series_type;
        for m in snap.axis_measures_mut() {
            if !multi_style {
                m.runtime_chart_type = shared;
            } else if !m.chart_type.is_auto() {
                continue;
            } else if self.clones.contains(&m.full_name()) {
                m.runtime_chart_type = series_type;
            } else if nominal.is_auto() {
                m.runtime_chart_type = to_bar(m.runtime_chart_type);
            }
        }
    }
}

fn reset_ordering(dim: &mut DimensionRef) {
    dim.sort = Sort::default();
    dim.ranking = Ranking::default();
    dim.named_group = None;
}
