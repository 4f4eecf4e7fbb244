// Temporary date grouping columns needed by a comparison query

use super::spec::{ComparisonPeriods, ComparisonScope, DateComparisonSpec};
use crate::field::{DataType, DimensionRef};

/// Supplies the date-derived grouping columns a comparison needs from the
/// query layer (period buckets, range and to-date filters).
pub trait DateGroupingUtility {
    fn temp_groups_for(&self, spec: &DateComparisonSpec, dim: &DimensionRef) -> Vec<DimensionRef>;
}

/// Column holding the custom period label each row falls in.
pub fn period_column(base: &str) -> String {
    format!("Period({})", base)
}

/// Column flagging rows inside the compared periods.
pub fn range_column(base: &str) -> String {
    format!("ComparisonRange({})", base)
}

/// Column flagging rows up to the same point in each period as today.
pub fn to_date_column(base: &str) -> String {
    format!("ToDate({})", base)
}

/// Naming scheme understood by the bundled query layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardDateGrouping;

impl DateGroupingUtility for StandardDateGrouping {
    fn temp_groups_for(&self, spec: &DateComparisonSpec, dim: &DimensionRef) -> Vec<DimensionRef> {
        let flag = |name: String| DimensionRef {
            data_type: DataType::Boolean,
            ..DimensionRef::new(name)
        };

        match &spec.periods {
            ComparisonPeriods::Standard(std) => {
                let mut groups = vec![flag(range_column(&dim.name))];
                if std.scope == ComparisonScope::ToDate {
                    groups.push(flag(to_date_column(&dim.name)));
                }
                groups
            }
            ComparisonPeriods::Custom { ranges } => {
                let labels: Vec<String> = ranges.iter().map(|r| r.label()).collect();
                vec![DimensionRef {
                    named_group: Some(labels.join(",")),
                    ..DimensionRef::new(period_column(&dim.name))
                }]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparison::spec::StandardPeriods;
    use crate::field::DateLevel;

    #[test]
    fn test_to_date_scope_adds_filter_column() {
        let mut spec = DateComparisonSpec::standard(DateLevel::Year, 2, DateLevel::Month);
        let dim = DimensionRef::date("OrderDate", DateLevel::Day);
        let names = |spec: &DateComparisonSpec| -> Vec<String> {
            StandardDateGrouping
                .temp_groups_for(spec, &dim)
                .into_iter()
                .map(|d| d.name)
                .collect()
        };
        assert_eq!(names(&spec), vec!["ComparisonRange(OrderDate)"]);

        spec.periods = ComparisonPeriods::Standard(StandardPeriods {
            level: DateLevel::Year,
            count: 2,
            include_current: true,
            scope: ComparisonScope::ToDate,
        });
        assert_eq!(
            names(&spec),
            vec!["ComparisonRange(OrderDate)", "ToDate(OrderDate)"]
        );
    }
}
