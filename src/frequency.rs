//! Recurrence rules and their expansion into due dates.
//!
//! Only the rule shapes the protocol builder offers are supported. Expansion
//! is day-granular: hour-based rules become one occurrence per day carrying a
//! per-day count (see [`daily_count`]).

use std::collections::BTreeSet;

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::models::enums::IntervalUnit;

const HOURS_PER_DAY: u32 = 24;
/// Second weekly slot of a twice-weekly rule, in days after the cycle start.
const TWICE_WEEKLY_OFFSET: u64 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FrequencyRule {
    Daily,
    Weekly,
    TwiceDaily,
    TwiceWeekly,
    Interval {
        every_n: u32,
        unit: IntervalUnit,
    },
    /// Fires on each selected day of month, from `start_month` onwards.
    ManualDates {
        start_month: u32,
        days_of_month: BTreeSet<u32>,
    },
    /// No automatic occurrences; logged by completion events only.
    AsNeeded,
}

/// Expands `rule` into ascending, duplicate-free due dates in `[anchor, horizon]`.
///
/// An anchor after the horizon yields nothing. The function is pure: window
/// extension relies on identical inputs producing identical dates.
pub fn expand(rule: &FrequencyRule, anchor: NaiveDate, horizon: NaiveDate) -> Vec<NaiveDate> {
    if anchor > horizon {
        return Vec::new();
    }

    match rule {
        FrequencyRule::Daily | FrequencyRule::TwiceDaily => step_days(anchor, horizon, 1),
        FrequencyRule::Weekly => step_days(anchor, horizon, 7),
        FrequencyRule::TwiceWeekly => twice_weekly(anchor, horizon),
        FrequencyRule::Interval { every_n, unit: IntervalUnit::Days } => {
            step_days(anchor, horizon, *every_n)
        }
        FrequencyRule::Interval { every_n, unit: IntervalUnit::Hours } => {
            step_days(anchor, horizon, hour_rule_day_step(*every_n))
        }
        FrequencyRule::ManualDates { start_month, days_of_month } => {
            manual_dates(*start_month, days_of_month, anchor, horizon)
        }
        FrequencyRule::AsNeeded => Vec::new(),
    }
}

/// Expected repetitions per due date.
pub fn daily_count(rule: &FrequencyRule) -> u32 {
    match rule {
        FrequencyRule::TwiceDaily => 2,
        FrequencyRule::Interval { every_n, unit: IntervalUnit::Hours }
            if (1..=HOURS_PER_DAY).contains(every_n) =>
        {
            HOURS_PER_DAY / every_n
        }
        _ => 1,
    }
}

/// Human-readable label, matching the frequency picker wording.
pub fn describe(rule: &FrequencyRule) -> String {
    match rule {
        FrequencyRule::Daily => "Daily".into(),
        FrequencyRule::Weekly => "Weekly".into(),
        FrequencyRule::TwiceDaily => "Twice daily".into(),
        FrequencyRule::TwiceWeekly => "Twice weekly".into(),
        FrequencyRule::Interval { every_n: 1, unit } => match unit {
            IntervalUnit::Hours => "Every hour".into(),
            IntervalUnit::Days => "Every day".into(),
        },
        FrequencyRule::Interval { every_n, unit } => format!("Every {every_n} {}", unit.as_str()),
        FrequencyRule::ManualDates { start_month, days_of_month } => {
            let days: Vec<String> = days_of_month.iter().map(|d| d.to_string()).collect();
            format!(
                "Monthly on day {} from {}",
                days.join(", "),
                month_name(*start_month)
            )
        }
        FrequencyRule::AsNeeded => "As needed".into(),
    }
}

/// Rejects rules the expansion cannot honour.
pub fn validate(rule: &FrequencyRule) -> Result<(), ProtocolError> {
    match rule {
        FrequencyRule::Interval { every_n, .. } if *every_n < 1 => Err(ProtocolError::Validation(
            "interval frequency must repeat at least every 1 unit".into(),
        )),
        FrequencyRule::ManualDates { start_month, days_of_month } => {
            if !(1..=12).contains(start_month) {
                return Err(ProtocolError::Validation(format!(
                    "start month {start_month} is outside 1..=12"
                )));
            }
            if days_of_month.is_empty() {
                return Err(ProtocolError::Validation(
                    "manual dates need at least one day of month".into(),
                ));
            }
            if let Some(day) = days_of_month.iter().find(|d| !(1..=31).contains(*d)) {
                return Err(ProtocolError::Validation(format!(
                    "day of month {day} is outside 1..=31"
                )));
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn step_days(anchor: NaiveDate, horizon: NaiveDate, step: u32) -> Vec<NaiveDate> {
    if step == 0 {
        return Vec::new();
    }

    let mut dates = Vec::new();
    let mut current = anchor;
    while current <= horizon {
        dates.push(current);
        match current.checked_add_days(Days::new(u64::from(step))) {
            Some(next) => current = next,
            None => break,
        }
    }
    dates
}

/// Rules of 24 hours or less land once per day; longer ones round up to whole days.
fn hour_rule_day_step(every_n: u32) -> u32 {
    if every_n == 0 {
        0
    } else if every_n <= HOURS_PER_DAY {
        1
    } else {
        every_n.div_ceil(HOURS_PER_DAY)
    }
}

fn twice_weekly(anchor: NaiveDate, horizon: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut cycle_start = anchor;
    loop {
        for offset in [0, TWICE_WEEKLY_OFFSET] {
            if let Some(date) = cycle_start.checked_add_days(Days::new(offset)) {
                if date <= horizon {
                    dates.push(date);
                }
            }
        }
        match cycle_start.checked_add_days(Days::new(7)) {
            Some(next) if next <= horizon => cycle_start = next,
            _ => break,
        }
    }
    dates
}

fn manual_dates(
    start_month: u32,
    days_of_month: &BTreeSet<u32>,
    anchor: NaiveDate,
    horizon: NaiveDate,
) -> Vec<NaiveDate> {
    let mut year = anchor.year();
    if start_month < anchor.month() {
        year += 1;
    }
    let mut month = start_month;

    let mut dates = Vec::new();
    loop {
        let Some(first_of_month) = NaiveDate::from_ymd_opt(year, month, 1) else {
            break;
        };
        if first_of_month > horizon {
            break;
        }

        // Days past the end of the month are skipped, never rolled over.
        for &day in days_of_month {
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                if date >= anchor && date <= horizon {
                    dates.push(date);
                }
            }
        }

        if month == 12 {
            month = 1;
            year += 1;
        } else {
            month += 1;
        }
    }
    dates
}

fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        12 => "December",
        _ => "an invalid month",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn manual(start_month: u32, days: &[u32]) -> FrequencyRule {
        FrequencyRule::ManualDates {
            start_month,
            days_of_month: days.iter().copied().collect(),
        }
    }

    fn all_shapes() -> Vec<FrequencyRule> {
        vec![
            FrequencyRule::Daily,
            FrequencyRule::Weekly,
            FrequencyRule::TwiceDaily,
            FrequencyRule::TwiceWeekly,
            FrequencyRule::Interval { every_n: 3, unit: IntervalUnit::Days },
            FrequencyRule::Interval { every_n: 8, unit: IntervalUnit::Hours },
            FrequencyRule::Interval { every_n: 36, unit: IntervalUnit::Hours },
            manual(1, &[1, 15]),
            manual(12, &[31]),
            FrequencyRule::AsNeeded,
        ]
    }

    #[test]
    fn horizon_before_anchor_is_empty_for_every_shape() {
        let anchor = date(2026, 1, 1);
        let horizon = anchor.pred_opt().unwrap();
        for rule in all_shapes() {
            assert!(expand(&rule, anchor, horizon).is_empty(), "{rule:?}");
        }
    }

    #[test]
    fn expansion_is_ascending_and_unique() {
        let anchor = date(2026, 1, 20);
        let horizon = date(2026, 6, 30);
        for rule in all_shapes() {
            let dates = expand(&rule, anchor, horizon);
            assert!(dates.windows(2).all(|w| w[0] < w[1]), "{rule:?}");
            assert!(dates.iter().all(|d| *d >= anchor && *d <= horizon), "{rule:?}");
        }
    }

    #[test]
    fn daily_covers_anchor_through_horizon_inclusive() {
        let dates = expand(&FrequencyRule::Daily, date(2026, 3, 1), date(2026, 3, 14));
        assert_eq!(dates.len(), 14);
        assert_eq!(dates.first(), Some(&date(2026, 3, 1)));
        assert_eq!(dates.last(), Some(&date(2026, 3, 14)));
    }

    #[test]
    fn weekly_steps_seven_days_from_anchor() {
        let dates = expand(&FrequencyRule::Weekly, date(2026, 3, 1), date(2026, 3, 14));
        assert_eq!(dates, vec![date(2026, 3, 1), date(2026, 3, 8)]);
    }

    #[test]
    fn every_three_days_over_ten_days_yields_four() {
        let rule = FrequencyRule::Interval { every_n: 3, unit: IntervalUnit::Days };
        let anchor = date(2026, 5, 1);
        let dates = expand(&rule, anchor, date(2026, 5, 10));
        let offsets: Vec<i64> = dates.iter().map(|d| (*d - anchor).num_days()).collect();
        assert_eq!(offsets, vec![0, 3, 6, 9]);
    }

    #[test]
    fn hour_rule_is_one_row_per_day_with_count() {
        let rule = FrequencyRule::Interval { every_n: 8, unit: IntervalUnit::Hours };
        let dates = expand(&rule, date(2026, 5, 1), date(2026, 5, 3));
        assert_eq!(dates.len(), 3);
        assert_eq!(daily_count(&rule), 3);

        let awkward = FrequencyRule::Interval { every_n: 7, unit: IntervalUnit::Hours };
        assert_eq!(daily_count(&awkward), 3);
    }

    #[test]
    fn hour_rule_longer_than_a_day_rounds_up_to_days() {
        let rule = FrequencyRule::Interval { every_n: 36, unit: IntervalUnit::Hours };
        let anchor = date(2026, 5, 1);
        let dates = expand(&rule, anchor, date(2026, 5, 7));
        assert_eq!(
            dates,
            vec![date(2026, 5, 1), date(2026, 5, 3), date(2026, 5, 5), date(2026, 5, 7)]
        );
        assert_eq!(daily_count(&rule), 1);
    }

    #[test]
    fn twice_daily_is_daily_with_count_two() {
        let dates = expand(&FrequencyRule::TwiceDaily, date(2026, 5, 1), date(2026, 5, 5));
        assert_eq!(dates.len(), 5);
        assert_eq!(daily_count(&FrequencyRule::TwiceDaily), 2);
    }

    #[test]
    fn twice_weekly_fires_on_cycle_start_and_three_days_later() {
        let dates = expand(&FrequencyRule::TwiceWeekly, date(2026, 5, 1), date(2026, 5, 14));
        assert_eq!(
            dates,
            vec![date(2026, 5, 1), date(2026, 5, 4), date(2026, 5, 8), date(2026, 5, 11)]
        );
    }

    #[test]
    fn manual_dates_skip_days_missing_from_short_months() {
        let dates = expand(&manual(2, &[30, 31]), date(2026, 1, 10), date(2026, 3, 31));
        assert_eq!(dates, vec![date(2026, 3, 30), date(2026, 3, 31)]);
    }

    #[test]
    fn manual_dates_start_next_year_when_month_already_passed() {
        let dates = expand(&manual(3, &[5]), date(2026, 6, 1), date(2027, 4, 30));
        assert_eq!(
            dates.first(),
            Some(&date(2027, 3, 5)),
            "March has passed in 2026, so the first firing is March 2027"
        );
        assert_eq!(dates, vec![date(2027, 3, 5), date(2027, 4, 5)]);
    }

    #[test]
    fn manual_dates_wrap_the_year_and_drop_days_before_anchor() {
        let dates = expand(&manual(11, &[1, 20]), date(2026, 11, 10), date(2027, 1, 25));
        assert_eq!(
            dates,
            vec![
                date(2026, 11, 20),
                date(2026, 12, 1),
                date(2026, 12, 20),
                date(2027, 1, 1),
                date(2027, 1, 20),
            ]
        );
    }

    #[test]
    fn manual_dates_handle_leap_february() {
        let dates = expand(&manual(2, &[29]), date(2028, 1, 1), date(2028, 2, 29));
        assert_eq!(dates, vec![date(2028, 2, 29)]);
    }

    #[test]
    fn as_needed_never_expands() {
        assert!(expand(&FrequencyRule::AsNeeded, date(2026, 1, 1), date(2026, 12, 31)).is_empty());
    }

    #[test]
    fn expansion_is_deterministic() {
        let rule = manual(4, &[2, 9, 16]);
        let a = expand(&rule, date(2026, 2, 1), date(2026, 9, 1));
        let b = expand(&rule, date(2026, 2, 1), date(2026, 9, 1));
        assert_eq!(a, b);
    }

    #[test]
    fn validation_rejects_malformed_rules() {
        assert!(validate(&manual(2, &[])).is_err());
        assert!(validate(&manual(0, &[1])).is_err());
        assert!(validate(&manual(13, &[1])).is_err());
        assert!(validate(&manual(2, &[0])).is_err());
        assert!(validate(&manual(2, &[32])).is_err());
        let every = |every_n, unit| FrequencyRule::Interval { every_n, unit };
        assert!(validate(&every(0, IntervalUnit::Days)).is_err());
        assert!(validate(&every(1, IntervalUnit::Hours)).is_ok());
        assert!(validate(&manual(2, &[31])).is_ok());
    }

    #[test]
    fn describe_matches_picker_labels() {
        assert_eq!(describe(&FrequencyRule::TwiceWeekly), "Twice weekly");
        assert_eq!(
            describe(&FrequencyRule::Interval { every_n: 6, unit: IntervalUnit::Hours }),
            "Every 6 hours"
        );
        assert_eq!(describe(&manual(3, &[1, 15])), "Monthly on day 1, 15 from March");
    }

    #[test]
    fn rule_json_shape() {
        let json = serde_json::to_string(&manual(2, &[31, 30])).unwrap();
        assert_eq!(json, r#"{"type":"manual_dates","start_month":2,"days_of_month":[30,31]}"#);
        let rule: FrequencyRule = serde_json::from_str(r#"{"type":"twice_weekly"}"#).unwrap();
        assert_eq!(rule, FrequencyRule::TwiceWeekly);
    }
}
