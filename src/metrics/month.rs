//! Calendar month keys used to label cohorts and periods.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};

/// A `(year, month)` pair, ordered chronologically.
///
/// Constructed only through [`MonthKey::new`] or [`MonthKey::of`], so the
/// month is always in `1..=12` and the year is one chrono can represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    /// `None` for month 0/13+ and for years at or beyond chrono's date range,
    /// so keys built here always have a representable neighbour month.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if year <= NaiveDate::MIN.year() || year >= NaiveDate::MAX.year() {
            return None;
        }
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    /// Truncates a date to its month.
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .expect("MonthKey always holds a representable month")
    }

    pub fn last_day(&self) -> NaiveDate {
        if self.month == 12 {
            return NaiveDate::from_ymd_opt(self.year, 12, 31)
                .expect("MonthKey always holds a representable month");
        }
        self.next()
            .first_day()
            .pred_opt()
            .expect("a month always has a last day")
    }

    /// The following month; saturates at the last month chrono can represent.
    pub fn next(&self) -> Self {
        if self.month == 12 {
            if self.year >= NaiveDate::MAX.year() {
                return *self;
            }
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// The preceding month; saturates at the first month chrono can represent.
    pub fn previous(&self) -> Self {
        if self.month == 1 {
            if self.year <= NaiveDate::MIN.year() {
                return *self;
            }
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// Number of months from `self` to `later`; negative if `later` is earlier.
    pub fn months_until(&self, later: MonthKey) -> i64 {
        (later.year as i64 - self.year as i64) * 12 + later.month as i64 - self.month as i64
    }

    /// Full English month name, e.g. `"February"`.
    pub fn name(&self) -> String {
        self.first_day().format("%B").to_string()
    }

    /// All months from `self` to `last`, inclusive. Empty if `last` is earlier.
    pub fn through(&self, last: MonthKey) -> Vec<MonthKey> {
        let mut months = Vec::new();
        let mut current = *self;
        while current <= last {
            months.push(current);
            let next = current.next();
            if next == current {
                break;
            }
            current = next;
        }
        months
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
