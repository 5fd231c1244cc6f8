//! Time bucketing for chart series.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};

/// The Monday that closes the week containing `date` (the date itself if it
/// is a Monday). Weeks run Tuesday through Monday.
pub fn week_ending_monday(date: NaiveDate) -> NaiveDate {
    let to_monday = (7 - date.weekday().num_days_from_monday()) % 7;
    date + Duration::days(to_monday as i64)
}

/// Cumulative count of `dates` per Tuesday-Monday week.
///
/// Every week between the first and the last date is present, labelled by
/// its closing Monday; weeks without dates repeat the running count.
pub fn weekly_cumulative(dates: &[NaiveDate]) -> Vec<(NaiveDate, u64)> {
    let mut per_week: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for &date in dates {
        *per_week.entry(week_ending_monday(date)).or_insert(0) += 1;
    }

    let (Some(&first), Some(&last)) = (per_week.keys().next(), per_week.keys().next_back()) else {
        return Vec::new();
    };

    let mut series = Vec::new();
    let mut running = 0;
    let mut week = first;
    while week <= last {
        running += per_week.get(&week).copied().unwrap_or(0);
        series.push((week, running));
        week += Duration::days(7);
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, m, d).unwrap()
    }

    #[test]
    fn test_week_label_is_closing_monday() {
        // 2023-01-02 is a Monday
        assert_eq!(week_ending_monday(ymd(1, 2)), ymd(1, 2));
        assert_eq!(week_ending_monday(ymd(1, 3)), ymd(1, 9));
        assert_eq!(week_ending_monday(ymd(1, 8)), ymd(1, 9));
    }

    #[test]
    fn test_weekly_cumulative_carries_empty_weeks() {
        let dates = vec![ymd(1, 3), ymd(1, 9), ymd(1, 25), ymd(1, 4)];
        assert_eq!(
            weekly_cumulative(&dates),
            vec![(ymd(1, 9), 3), (ymd(1, 16), 3), (ymd(1, 23), 3), (ymd(1, 30), 4)]
        );
    }

    #[test]
    fn test_weekly_cumulative_empty() {
        assert!(weekly_cumulative(&[]).is_empty());
    }
}
