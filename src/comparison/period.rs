// Date level arithmetic for period comparison

use super::spec::{ComparisonPeriods, DateComparisonSpec, DateRange};
use crate::field::DateLevel;

/// Levels of the two dimensions derived from the compared date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedLevels {
    /// Level of the period dimension (one series or facet per period).
    pub period: DateLevel,
    /// Level of the granularity dimension plotted inside each period;
    /// `None` when whole periods are compared.
    pub granularity: Option<DateLevel>,
}

/// Part level of `granularity` within one `period`, e.g. months of a year.
pub fn part_level(period: DateLevel, granularity: DateLevel) -> Option<DateLevel> {
    use DateLevel::*;

    let part = match (period, granularity) {
        (Year, Quarter) => QuarterOfYear,
        (Year, Month) => MonthOfYear,
        (Year, Week) => WeekOfYear,
        (Year, Day) => DayOfYear,
        (Quarter, Month) => MonthOfQuarter,
        (Quarter, Week) => WeekOfQuarter,
        (Quarter, Day) => DayOfQuarter,
        (Month, Week) => WeekOfMonth,
        (Month, Day) => DayOfMonth,
        (Week, Day) => DayOfWeek,
        (Day, Hour) => HourOfDay,
        _ => return Option::None,
    };
    Some(part)
}

pub fn derive_levels(period: DateLevel, granularity: DateLevel) -> DerivedLevels {
    if granularity == DateLevel::None || granularity == period {
        return DerivedLevels {
            period,
            granularity: None,
        };
    }

    // Weeks straddle month boundaries; bucket each week into the month that
    // holds all of it.
    if period == DateLevel::Month && granularity == DateLevel::Week {
        return DerivedLevels {
            period: DateLevel::MonthOfFullWeek,
            granularity: Some(DateLevel::WeekOfMonth),
        };
    }

    DerivedLevels {
        period,
        granularity: Some(part_level(period, granularity).unwrap_or(granularity)),
    }
}

/// Smallest standard period that holds the longest custom range.
pub fn span_level(ranges: &[DateRange]) -> DateLevel {
    let longest = ranges.iter().map(DateRange::days).max().unwrap_or(1);
    match longest {
        d if d > 92 => DateLevel::Year,
        d if d > 31 => DateLevel::Quarter,
        d if d > 7 => DateLevel::Month,
        d if d > 1 => DateLevel::Week,
        _ => DateLevel::Day,
    }
}

pub fn levels_for(spec: &DateComparisonSpec) -> DerivedLevels {
    let period = match &spec.periods {
        ComparisonPeriods::Standard(std) => std.level,
        ComparisonPeriods::Custom { ranges } => span_level(ranges),
    };
    derive_levels(period, spec.granularity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn range(start: (i32, u32, u32), end: (i32, u32, u32)) -> DateRange {
        DateRange {
            label: None,
            start: NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            end: NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
        }
    }

    #[test]
    fn test_year_month_is_month_of_year() {
        let levels = derive_levels(DateLevel::Year, DateLevel::Month);
        assert_eq!(levels.period, DateLevel::Year);
        assert_eq!(levels.granularity, Some(DateLevel::MonthOfYear));
    }

    #[test]
    fn test_month_week_uses_full_weeks() {
        let levels = derive_levels(DateLevel::Month, DateLevel::Week);
        assert_eq!(levels.period, DateLevel::MonthOfFullWeek);
        assert_eq!(levels.granularity, Some(DateLevel::WeekOfMonth));
    }

    #[test]
    fn test_equal_levels_have_no_granularity() {
        assert_eq!(derive_levels(DateLevel::Quarter, DateLevel::Quarter).granularity, None);
        assert_eq!(derive_levels(DateLevel::Quarter, DateLevel::None).granularity, None);
    }

    #[test]
    fn test_unmapped_pair_keeps_interval() {
        let levels = derive_levels(DateLevel::Year, DateLevel::Hour);
        assert_eq!(levels.granularity, Some(DateLevel::Hour));
    }

    #[test]
    fn test_part_level_pairs() {
        assert_eq!(part_level(DateLevel::Day, DateLevel::Hour), Some(DateLevel::HourOfDay));
        assert_eq!(part_level(DateLevel::Month, DateLevel::Year), None);
        assert_eq!(part_level(DateLevel::Year, DateLevel::None), None);
    }

    #[test]
    fn test_span_level_from_longest_range() {
        assert_eq!(span_level(&[range((2024, 1, 1), (2024, 1, 1))]), DateLevel::Day);
        assert_eq!(span_level(&[range((2024, 1, 1), (2024, 1, 7))]), DateLevel::Week);
        assert_eq!(
            span_level(&[
                range((2024, 1, 1), (2024, 1, 7)),
                range((2024, 3, 1), (2024, 5, 31)),
            ]),
            DateLevel::Quarter
        );
        assert_eq!(span_level(&[range((2023, 1, 1), (2023, 12, 31))]), DateLevel::Year);
    }
}
