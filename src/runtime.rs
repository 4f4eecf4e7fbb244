// Resolution pipeline: design binding -> runtime snapshot

use crate::binding::ChartBinding;
use crate::comparison::grouping::{DateGroupingUtility, StandardDateGrouping};
use crate::comparison::spec::DateComparisonSpec;
use crate::comparison::{apply_date_comparison, clear_date_comparison};
use crate::config::EngineConfig;
use crate::error::{BindingError, ChartResult};
use crate::grouping::{group_fields, FieldGroups};
use crate::inference::apply_chart_types;
use crate::ir::{RuntimeSnapshot, StyleFlags};
use crate::resolve::{reconcile, FieldResolver};
use crate::schema::{ParameterTable, SchemaSource};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Resolves the design-time binding into a fresh runtime snapshot.
///
/// Any active comparison is torn down before the new snapshot is installed.
/// On error the binding is left exactly as it was.
pub fn resolve<'b>(
    binding: &'b mut ChartBinding,
    schema: &dyn SchemaSource,
    params: &dyn ParameterTable,
    config: &EngineConfig,
) -> ChartResult<&'b RuntimeSnapshot> {
    let next = build_snapshot(binding, schema, params, config)?;
    clear_date_comparison(binding);
    binding.runtime = reconcile(&binding.runtime, next);
    Ok(&binding.runtime)
}

fn build_snapshot(
    binding: &ChartBinding,
    schema: &dyn SchemaSource,
    params: &dyn ParameterTable,
    config: &EngineConfig,
) -> ChartResult<RuntimeSnapshot> {
    let resolver = FieldResolver::new(
        &binding.source,
        schema,
        params,
        &binding.aggregate,
        config.max_expansion,
    );

    // 1. Fields
    let mut snapshot = RuntimeSnapshot {
        x: resolver.resolve_axis(binding.x.fields())?,
        y: resolver.resolve_axis(binding.y.fields())?,
        group: resolver.resolve_axis(binding.group.fields())?,
        aesthetics: resolver.resolve_aesthetics(&binding.aesthetics)?,
        path: binding
            .path
            .as_ref()
            .map(|p| resolver.resolve_single(p))
            .transpose()?,
        chart_type: binding.chart_type,
        flags: StyleFlags {
            multi_style: binding.multi_style,
            separated: binding.separated,
        },
        frames: binding.frames.clone(),
        temp_groups: Vec::new(),
        comparison: None,
    };

    // 2. Chart types
    apply_chart_types(&mut snapshot, binding.chart_type);

    debug!(
        source = binding.source.as_str(),
        x = snapshot.x.len(),
        y = snapshot.y.len(),
        chart_type = %snapshot.chart_type,
        "resolved binding"
    );
    Ok(snapshot)
}

/// Everything one cycle reads besides the binding itself.
pub struct CycleContext<'a> {
    pub schema: &'a dyn SchemaSource,
    pub params: &'a dyn ParameterTable,
    pub comparison: Option<&'a DateComparisonSpec>,
    pub grouping: &'a dyn DateGroupingUtility,
    pub config: &'a EngineConfig,
}

impl<'a> CycleContext<'a> {
    pub fn new(
        schema: &'a dyn SchemaSource,
        params: &'a dyn ParameterTable,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            schema,
            params,
            comparison: None,
            grouping: &StandardDateGrouping,
            config,
        }
    }

    pub fn with_comparison(mut self, spec: Option<&'a DateComparisonSpec>) -> Self {
        self.comparison = spec;
        self
    }

    pub fn with_grouping(mut self, grouping: &'a dyn DateGroupingUtility) -> Self {
        self.grouping = grouping;
        self
    }
}

/// One full cycle: clear, resolve, then overlay the comparison if any.
pub fn run_cycle<'b>(
    binding: &'b mut ChartBinding,
    ctx: &CycleContext<'_>,
) -> ChartResult<&'b RuntimeSnapshot> {
    resolve(binding, ctx.schema, ctx.params, ctx.config)?;
    apply_date_comparison(binding, ctx.comparison, ctx.grouping, ctx.config);
    Ok(binding.runtime())
}

/// A binding shared between an editor and readers. Each cycle holds the
/// lock end to end, so readers never observe a half-built snapshot.
#[derive(Debug, Clone, Default)]
pub struct SharedBinding {
    inner: Arc<Mutex<ChartBinding>>,
}

impl SharedBinding {
    pub fn new(binding: ChartBinding) -> Self {
        Self {
            inner: Arc::new(Mutex::new(binding)),
        }
    }

    fn lock(&self) -> ChartResult<MutexGuard<'_, ChartBinding>> {
        self.inner.lock().map_err(|_| BindingError::LockPoisoned)
    }

    pub fn run_cycle(&self, ctx: &CycleContext<'_>) -> ChartResult<RuntimeSnapshot> {
        let mut binding = self.lock()?;
        let snapshot = run_cycle(&mut binding, ctx)?.clone();
        Ok(snapshot)
    }

    /// Applies a design-time edit under the lock.
    pub fn edit<T>(&self, f: impl FnOnce(&mut ChartBinding) -> T) -> ChartResult<T> {
        let mut binding = self.lock()?;
        Ok(f(&mut binding))
    }

    pub fn snapshot(&self) -> ChartResult<RuntimeSnapshot> {
        Ok(self.lock()?.runtime().clone())
    }

    pub fn groups(&self) -> ChartResult<FieldGroups> {
        Ok(group_fields(self.lock()?.runtime()))
    }
}
