//! Runtime field resolution.
//!
//! Design-time fields name columns indirectly (plain column, parameter,
//! `$param` script, drill hierarchy). [`FieldResolver`] turns each of them
//! into zero or more concrete runtime fields against the live column set;
//! [`reconcile`] then carries user edits from the previous cycle forward.

use crate::aesthetic::{AestheticSet, Channel};
use crate::binding::AggregateInfo;
use crate::error::{BindingError, ChartResult};
use crate::field::{AggregateFormula, FieldFormat, FieldRef, FieldSource, MeasureRef};
use crate::ir::RuntimeSnapshot;
use crate::preprocessor::expand_script;
use crate::schema::{ColumnMeta, ParameterTable, SchemaSource};
use indexmap::IndexMap;
use tracing::{debug, trace, warn};

/// Formats keyed by field full name.
pub type FormatLedger = IndexMap<String, FieldFormat>;

pub struct FieldResolver<'a> {
    query: &'a str,
    columns: Vec<ColumnMeta>,
    params: &'a dyn ParameterTable,
    aggregate: &'a AggregateInfo,
    max_expansion: usize,
}

impl<'a> FieldResolver<'a> {
    pub fn new(
        query: &'a str,
        schema: &dyn SchemaSource,
        params: &'a dyn ParameterTable,
        aggregate: &'a AggregateInfo,
        max_expansion: usize,
    ) -> Self {
        let columns = schema.columns_for(query);
        trace!(query, columns = columns.len(), "loaded live columns");
        Self {
            query,
            columns,
            params,
            aggregate,
            max_expansion: max_expansion.max(1),
        }
    }

    fn column(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Resolves every field of an axis, preserving order.
    pub fn resolve_axis(&self, fields: &[FieldRef]) -> ChartResult<Vec<FieldRef>> {
        let mut out = Vec::with_capacity(fields.len());
        for field in fields {
            out.extend(self.resolve_field(field)?);
        }
        Ok(out)
    }

    /// Resolves a slot or path field to exactly one runtime field: the first
    /// member if it expands, the design field if it resolves to nothing.
    pub fn resolve_single(&self, field: &FieldRef) -> ChartResult<FieldRef> {
        let members = self.resolve_field(field)?;
        Ok(members.into_iter().next().unwrap_or_else(|| field.clone()))
    }

    pub fn resolve_aesthetics(&self, set: &AestheticSet) -> ChartResult<AestheticSet> {
        let mut out = set.clone();
        for channel in Channel::ALL {
            if let Some(slot) = out.slot_mut(channel).as_mut() {
                let resolved = self.resolve_single(&slot.field)?;
                *slot.field = resolved;
            }
        }
        Ok(out)
    }

    /// Expands one design field into its runtime members.
    pub fn resolve_field(&self, field: &FieldRef) -> ChartResult<Vec<FieldRef>> {
        let mut members = match field.source() {
            FieldSource::Column => match self.column(field.name()) {
                Some(col) => vec![self.bind_column(field, col)],
                None => {
                    warn!(
                        query = self.query,
                        field = %field.full_name(),
                        "column not found, keeping design field"
                    );
                    vec![field.clone()]
                }
            },
            FieldSource::Variable { name } => self.resolve_variable(field, name),
            FieldSource::Script { text } => vec![self.resolve_script(field, text)?],
            FieldSource::Drill { levels, depth } => self.resolve_drill(field, levels, *depth),
        };

        if members.len() > self.max_expansion {
            warn!(
                field = %field.full_name(),
                members = members.len(),
                limit = self.max_expansion,
                "truncating field expansion"
            );
            members.truncate(self.max_expansion);
        }

        // Sizing belongs to the first generated member only.
        let design_size = field.axis_size();
        for (idx, member) in members.iter_mut().enumerate() {
            member.set_axis_size(if idx == 0 { design_size } else { None });
        }

        members.into_iter().map(|m| self.resolve_nested(m)).collect()
    }

    fn resolve_variable(&self, field: &FieldRef, name: &str) -> Vec<FieldRef> {
        let Some(value) = self.params.lookup(name) else {
            debug!(
                field = %field.full_name(),
                variable = name,
                "variable unset, keeping design field"
            );
            return vec![field.clone()];
        };

        let members: Vec<FieldRef> = value
            .values()
            .into_iter()
            .filter_map(|col_name| match self.column(col_name) {
                Some(col) => Some(self.bind_column(field, col)),
                None => {
                    warn!(variable = name, column = col_name, "variable names an unknown column");
                    None
                }
            })
            .collect();

        if members.is_empty() {
            vec![field.clone()]
        } else {
            members
        }
    }

    fn resolve_script(&self, field: &FieldRef, text: &str) -> ChartResult<FieldRef> {
        let script_error = |reason: String| BindingError::ScriptField {
            field: field.name().to_string(),
            script: text.to_string(),
            reason,
        };

        let column_name =
            expand_script(text, self.params).map_err(|e| script_error(e.to_string()))?;
        let column_name = column_name.trim();
        let col = self.column(column_name).ok_or_else(|| {
            script_error(format!(
                "column '{}' not found in '{}'",
                column_name, self.query
            ))
        })?;
        Ok(self.bind_column(field, col))
    }

    fn resolve_drill(&self, field: &FieldRef, levels: &[String], depth: usize) -> Vec<FieldRef> {
        let members: Vec<FieldRef> = levels
            .iter()
            .take(depth.saturating_add(1))
            .filter_map(|level| match self.column(level) {
                Some(col) => Some(self.bind_column(field, col)),
                None => {
                    warn!(
                        field = %field.full_name(),
                        level = level.as_str(),
                        "drill level not found"
                    );
                    None
                }
            })
            .collect();

        if members.is_empty() {
            vec![field.clone()]
        } else {
            members
        }
    }

    /// Copies `field` onto a live column.
    fn bind_column(&self, field: &FieldRef, col: &ColumnMeta) -> FieldRef {
        let mut bound = field.clone();
        bound.set_name(col.name.clone());
        bound.set_data_type(col.data_type);
        match &mut bound {
            FieldRef::Dimension(d) => {
                d.source = FieldSource::Column;
                d.cube = d.cube || col.cube;
            }
            FieldRef::Measure(m) => m.source = FieldSource::Column,
        }
        bound
    }

    /// Resolves the fields a runtime field points at: per-aggregate
    /// aesthetics, ranking and sort-by aggregates.
    fn resolve_nested(&self, mut field: FieldRef) -> ChartResult<FieldRef> {
        match &mut field {
            FieldRef::Measure(m) => {
                self.default_formula(m);
                m.aesthetics = self.resolve_aesthetics(&m.aesthetics)?;
            }
            FieldRef::Dimension(d) => {
                if let Some(by) = d.ranking.by.take() {
                    d.ranking.by = Some(self.resolve_measure_ref(&by)?);
                }
                if let Some(by) = d.sort.by.take() {
                    d.sort.by = Some(self.resolve_measure_ref(&by)?);
                }
            }
        }
        Ok(field)
    }

    fn resolve_measure_ref(&self, measure: &MeasureRef) -> ChartResult<MeasureRef> {
        match self.resolve_single(&FieldRef::Measure(measure.clone()))? {
            FieldRef::Measure(m) => Ok(m),
            FieldRef::Dimension(_) => Ok(measure.clone()),
        }
    }

    fn default_formula(&self, measure: &mut MeasureRef) {
        if measure.formula.is_none() {
            measure.formula = Some(if measure.data_type.is_numeric() {
                self.aggregate.default_formula
            } else {
                AggregateFormula::Count
            });
        }
    }
}

// =============================================================================
// Reconciliation
// =============================================================================

/// Formats of every field in `snapshot`, including aesthetic slot fields and
/// per-aggregate aesthetics. Only non-default formats are recorded.
pub fn collect_formats(snapshot: &RuntimeSnapshot) -> FormatLedger {
    let mut ledger = FormatLedger::new();
    let mut record = |field: &FieldRef| {
        if !field.format().is_empty() {
            ledger
                .entry(field.full_name())
                .or_insert_with(|| field.format().clone());
        }
    };

    for field in snapshot.x.iter().chain(&snapshot.y).chain(&snapshot.group) {
        record(field);
        if let FieldRef::Measure(m) = field {
            m.aesthetics.fields().for_each(&mut record);
        }
    }
    snapshot.aesthetics.fields().for_each(&mut record);
    snapshot.path.iter().for_each(&mut record);
    ledger
}

/// Copies a carried format onto `field` when its full name is in `ledger`.
pub fn apply_format(ledger: &FormatLedger, field: &mut FieldRef) -> bool {
    match ledger.get(&field.full_name()) {
        Some(format) => {
            *field.format_mut() = format.clone();
            true
        }
        None => false,
    }
}

/// Applies `ledger` to every field of `snapshot`, returning how many fields
/// picked up a carried format.
pub fn carry_formats(ledger: &FormatLedger, snapshot: &mut RuntimeSnapshot) -> usize {
    let mut carried = 0usize;
    snapshot.visit_fields_mut(|field| {
        if apply_format(ledger, field) {
            carried += 1;
        }
    });
    carried
}

/// Carries formatting state from the previous cycle's snapshot onto a freshly
/// resolved one. Fields are matched by full name regardless of which axis or
/// slot they moved to; slot frames are matched by channel and full name.
pub fn reconcile(prev: &RuntimeSnapshot, mut next: RuntimeSnapshot) -> RuntimeSnapshot {
    let ledger = collect_formats(prev);
    let carried = carry_formats(&ledger, &mut next);

    for channel in Channel::ALL {
        let Some(old) = prev.aesthetics.get(channel) else { continue };
        if let Some(new) = next.aesthetics.slot_mut(channel).as_mut() {
            if new.field.full_name() == old.field.full_name() {
                new.frame = old.frame.clone();
            }
        }
    }

    trace!(carried, "reconciled runtime formats");
    next
}
