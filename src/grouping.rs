//! Field grouping.
//!
//! In multi-style mode every measure may carry its own aesthetics, so one
//! query cannot answer the whole chart. [`group_fields`] partitions the
//! runtime fields into groups that share a dimension set; each group becomes
//! one independent query downstream.

use crate::binding::split_trailing_measures;
use crate::field::{DimensionRef, FieldRef, MeasureRef, RankingOption};
use crate::ir::{is_well_formed, RuntimeSnapshot};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use tracing::debug;

/// Semantic identity of a dimension within a group key.
///
/// Two distinct dimension instances with the same full name and ranking
/// collapse to one key entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DimensionKey {
    pub full_name: String,
    pub ranking: RankingOption,
    pub n: u32,
}

impl DimensionKey {
    pub fn of(dim: &DimensionRef) -> Self {
        let (ranking, n) = if dim.ranking.is_active() {
            (dim.ranking.option, dim.ranking.n)
        } else {
            (RankingOption::None, 0)
        };
        Self {
            full_name: dim.full_name(),
            ranking,
            n,
        }
    }
}

pub type DimensionSetKey = BTreeSet<DimensionKey>;

/// Dimensions and aggregates answered by one query.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FieldGroup {
    pub dimensions: Vec<DimensionRef>,
    pub aggregates: Vec<MeasureRef>,
}

impl FieldGroup {
    pub fn key(&self) -> DimensionSetKey {
        self.dimensions.iter().map(DimensionKey::of).collect()
    }

    fn add_dimension(&mut self, dim: &DimensionRef) {
        let key = DimensionKey::of(dim);
        if self.dimensions.iter().any(|d| DimensionKey::of(d) == key) {
            return;
        }
        self.dimensions.push(dim.clone());
        if let Some(by) = dim.sort.by.as_ref() {
            self.add_aggregate(by);
        }
        if let Some(by) = dim.ranking.by.as_ref() {
            self.add_aggregate(by);
        }
    }

    fn add_aggregate(&mut self, measure: &MeasureRef) {
        if !is_well_formed(measure) {
            debug!(measure = %measure.full_name(), "skipping malformed aggregate");
            return;
        }
        let name = measure.full_name();
        if !self.aggregates.iter().any(|a| a.full_name() == name) {
            self.aggregates.push(measure.clone());
        }
    }

    fn add_field(&mut self, field: &FieldRef) {
        match field {
            FieldRef::Dimension(d) => self.add_dimension(d),
            FieldRef::Measure(m) => self.add_aggregate(m),
        }
    }

    fn merge(&mut self, other: FieldGroup) {
        for dim in &other.dimensions {
            self.add_dimension(dim);
        }
        for agg in &other.aggregates {
            self.add_aggregate(agg);
        }
    }
}

/// Groups in first-seen order, keyed by their dimension set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldGroups {
    groups: IndexMap<DimensionSetKey, FieldGroup>,
}

impl Serialize for FieldGroups {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.groups.values())
    }
}

impl FieldGroups {
    fn insert(&mut self, group: FieldGroup) {
        let key = group.key();
        match self.groups.get_mut(&key) {
            Some(existing) => existing.merge(group),
            None => {
                self.groups.insert(key, group);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, key: &DimensionSetKey) -> Option<&FieldGroup> {
        self.groups.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DimensionSetKey, &FieldGroup)> {
        self.groups.iter()
    }

    pub fn groups(&self) -> impl Iterator<Item = &FieldGroup> {
        self.groups.values()
    }

    /// Distinct aggregate full names across all groups, first-seen order.
    pub fn aggregate_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for agg in self.groups().flat_map(|g| &g.aggregates) {
            let name = agg.full_name();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

/// Partitions the snapshot's fields into independent query groups.
pub fn group_fields(snapshot: &RuntimeSnapshot) -> FieldGroups {
    let mut groups = FieldGroups::default();

    if !snapshot.flags.multi_style {
        let mut group = FieldGroup::default();
        for field in snapshot.all_fields() {
            group.add_field(field);
        }
        groups.insert(group);
        debug!(groups = groups.len(), "grouped fields without multi-style");
        return groups;
    }

    // 1. Classify axis fields
    let mut shared = FieldGroup::default();
    let mut per_measure: Vec<&MeasureRef> = Vec::new();
    for axis in [&snapshot.x, &snapshot.y] {
        let (head, run) = split_trailing_measures(axis);
        for field in head {
            shared.add_field(field);
        }
        per_measure.extend(run.iter().filter_map(FieldRef::as_measure));
    }

    // 2. Other dimensions: breakdown and path
    for field in snapshot.group.iter().chain(snapshot.path.as_ref()) {
        shared.add_field(field);
    }

    if per_measure.is_empty() {
        groups.insert(shared);
        debug!(groups = groups.len(), "grouped fields without axis measures");
        return groups;
    }

    // 3. One candidate group per measure, merged by dimension set
    for measure in per_measure {
        let aesthetics = snapshot.effective_aesthetics(measure);
        let mut group = shared.clone();
        for field in aesthetics.dimension_fields() {
            group.add_field(field);
        }
        group.add_aggregate(measure);
        for agg in aesthetics.aggregates() {
            group.add_aggregate(agg);
        }
        groups.insert(group);
    }

    debug!(groups = groups.len(), "grouped multi-style fields");
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aesthetic::Channel;
    use crate::field::AggregateFormula;

    fn sum(name: &str) -> MeasureRef {
        MeasureRef::new(name, AggregateFormula::Sum)
    }

    fn multi(x: Vec<FieldRef>, y: Vec<FieldRef>) -> RuntimeSnapshot {
        let mut snap = RuntimeSnapshot {
            x,
            y,
            ..Default::default()
        };
        snap.flags.multi_style = true;
        snap
    }

    fn aggregate_set(groups: &FieldGroups) -> BTreeSet<String> {
        groups.aggregate_names().into_iter().collect()
    }

    fn expected_set(snapshot: &RuntimeSnapshot) -> BTreeSet<String> {
        snapshot.all_aggregates().iter().map(|m| m.full_name()).collect()
    }

    #[test]
    fn test_single_group_without_multi_style() {
        let mut snap = RuntimeSnapshot {
            x: vec![DimensionRef::new("Region").into()],
            y: vec![sum("Sales").into(), sum("Profit").into()],
            ..Default::default()
        };
        snap.aesthetics.bind(Channel::Color, DimensionRef::new("Segment"));
        let groups = group_fields(&snap);
        assert_eq!(groups.len(), 1);
        let group = groups.groups().next().unwrap();
        assert_eq!(group.dimensions.len(), 2);
        assert_eq!(group.aggregates.len(), 2);
    }

    #[test]
    fn test_measures_with_same_aesthetics_share_a_group() {
        let snap = multi(
            vec![DimensionRef::new("Region").into()],
            vec![sum("Sales").into(), sum("Profit").into()],
        );
        let groups = group_fields(&snap);
        assert_eq!(groups.len(), 1);
        assert_eq!(aggregate_set(&groups), expected_set(&snap));
    }

    #[test]
    fn test_per_measure_color_splits_groups() {
        let mut sales = sum("Sales");
        sales.aesthetics.bind(Channel::Color, DimensionRef::new("Segment"));
        let mut profit = sum("Profit");
        profit.aesthetics.bind(Channel::Size, sum("Quantity"));
        let snap = multi(
            vec![DimensionRef::new("Region").into()],
            vec![sales.into(), profit.into()],
        );

        let groups = group_fields(&snap);
        assert_eq!(groups.len(), 2);
        let keys: Vec<Vec<String>> = groups
            .iter()
            .map(|(k, _)| k.iter().map(|d| d.full_name.clone()).collect())
            .collect();
        assert_eq!(keys[0], vec!["Region", "Segment"]);
        assert_eq!(keys[1], vec!["Region"]);
        assert_eq!(aggregate_set(&groups), expected_set(&snap));
    }

    #[test]
    fn test_semantic_dimension_dedupe() {
        let mut sales = sum("Sales");
        sales.aesthetics.bind(Channel::Color, DimensionRef::new("Region"));
        let snap = multi(
            vec![DimensionRef::new("Region").into()],
            vec![sales.into(), sum("Profit").into()],
        );
        let groups = group_fields(&snap);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups.groups().next().unwrap().dimensions.len(), 1);
    }

    #[test]
    fn test_ranking_distinguishes_keys() {
        let mut ranked = DimensionRef::new("Region");
        ranked.ranking.option = RankingOption::Top;
        ranked.ranking.n = 5;
        ranked.ranking.by = Some(sum("Discount"));
        let mut sales = sum("Sales");
        sales.aesthetics.bind(Channel::Color, ranked);
        let snap = multi(
            vec![DimensionRef::new("Region").into()],
            vec![sales.into(), sum("Profit").into()],
        );

        let groups = group_fields(&snap);
        assert_eq!(groups.len(), 2);
        let first = groups.groups().next().unwrap();
        assert!(first.aggregates.iter().any(|a| a.full_name() == "Sum(Discount)"));
        assert_eq!(aggregate_set(&groups), expected_set(&snap));
    }

    #[test]
    fn test_discrete_measure_is_shared() {
        let mut discrete = sum("Quantity");
        discrete.discrete = true;
        let mut sales = sum("Sales");
        sales.aesthetics.bind(Channel::Color, DimensionRef::new("Segment"));
        let snap = multi(
            vec![DimensionRef::new("Region").into(), discrete.into()],
            vec![sales.into(), sum("Profit").into()],
        );
        let groups = group_fields(&snap);
        for group in groups.groups() {
            assert!(group.aggregates.iter().any(|a| a.full_name() == "Sum(Quantity)"));
        }
    }

    #[test]
    fn test_malformed_aggregate_filtered() {
        let snap = multi(
            vec![DimensionRef::new("Region").into()],
            vec![sum("").into(), sum("Sales").into()],
        );
        let groups = group_fields(&snap);
        assert_eq!(groups.aggregate_names(), vec!["Sum(Sales)"]);
    }

    #[test]
    fn test_global_slot_fills_empty_measure_channel() {
        let mut sales = sum("Sales");
        sales.aesthetics.bind(Channel::Color, DimensionRef::new("Segment"));
        let mut snap = multi(
            vec![DimensionRef::new("Region").into()],
            vec![sales.into(), sum("Profit").into()],
        );
        snap.aesthetics.bind(Channel::Color, DimensionRef::new("Category"));
        snap.aesthetics.bind(Channel::Size, sum("Quantity"));

        let groups = group_fields(&snap);
        let keys: Vec<Vec<String>> = groups
            .iter()
            .map(|(k, _)| k.iter().map(|d| d.full_name.clone()).collect())
            .collect();
        assert_eq!(keys, vec![vec!["Region", "Segment"], vec!["Category", "Region"]]);
        for group in groups.groups() {
            assert!(group.aggregates.iter().any(|a| a.full_name() == "Sum(Quantity)"));
        }
        assert_eq!(aggregate_set(&groups), expected_set(&snap));
    }

    #[test]
    fn test_breakdown_joins_every_group() {
        let mut sales = sum("Sales");
        sales.aesthetics.bind(Channel::Color, DimensionRef::new("Segment"));
        let mut snap = multi(
            vec![DimensionRef::new("Region").into()],
            vec![sales.into(), sum("Profit").into()],
        );
        snap.group.push(DimensionRef::new("Category").into());
        for group in group_fields(&snap).groups() {
            assert!(group.dimensions.iter().any(|d| d.name == "Category"));
        }
    }
}
