//! Cohort x period revenue matrices.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::config::CohortSettings;
use crate::db::models::MonthlyRevenue;
use crate::metrics::MonthKey;

/// Sparse `(cohort, period) -> value` matrix.
///
/// A period never precedes its cohort. Combinations without data are absent
/// rather than zero, so "no invoices" and "zero revenue" stay distinguishable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CohortMatrix {
    cells: BTreeMap<MonthKey, BTreeMap<MonthKey, f64>>,
}

impl CohortMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a cell. Returns `false`, leaving the matrix unchanged, when the
    /// period precedes the cohort.
    pub fn insert(&mut self, cohort: MonthKey, period: MonthKey, value: f64) -> bool {
        if period < cohort {
            debug!("Dropping {period} revenue for cohort {cohort}: period precedes cohort");
            return false;
        }
        self.cells.entry(cohort).or_default().insert(period, value);
        true
    }

    pub fn get(&self, cohort: MonthKey, period: MonthKey) -> Option<f64> {
        self.cells.get(&cohort)?.get(&period).copied()
    }

    /// Cohorts with at least one cell, in chronological order.
    pub fn cohorts(&self) -> Vec<MonthKey> {
        self.cells.keys().copied().collect()
    }

    /// Union of all periods with at least one cell, in chronological order.
    pub fn periods(&self) -> Vec<MonthKey> {
        let periods: BTreeSet<MonthKey> =
            self.cells.values().flat_map(|row| row.keys().copied()).collect();
        periods.into_iter().collect()
    }

    pub fn row(&self, cohort: MonthKey) -> Option<&BTreeMap<MonthKey, f64>> {
        self.cells.get(&cohort)
    }

    pub fn len(&self) -> usize {
        self.cells.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fixed cohort revenue table used instead of live invoices.
///
/// Each cohort maps to a sequence whose first value belongs to the cohort's
/// own month, the second to the month after, and so on.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticRevenue {
    table: BTreeMap<u32, Vec<f64>>,
}

impl SyntheticRevenue {
    pub fn new(table: BTreeMap<u32, Vec<f64>>) -> Self {
        Self { table }
    }

    /// The published January-August reference table.
    pub fn reference() -> Self {
        let rows: [(u32, &[f64]); 8] = [
            (1, &[292.0, 644.0, 621.0, 317.0, 649.0, 556.0, 328.0, 536.0]),
            (2, &[754.0, 317.0, 307.0, 187.0, 228.0, 57.0, 95.0]),
            (3, &[51.0, 693.0, 173.0, 99.0, 356.0, 378.0]),
            (4, &[206.0, 278.0, 79.0, 52.0, 85.0]),
            (5, &[69.0, 63.0, 56.0, 85.0]),
            (6, &[404.0, 160.0, 329.0]),
            (7, &[276.0, 119.0]),
            (8, &[293.0]),
        ];
        Self::new(rows.iter().map(|(m, v)| (*m, v.to_vec())).collect())
    }

    /// Value for `period_month` in the cohort that started in `cohort_month`.
    pub fn value(&self, cohort_month: u32, period_month: u32) -> Option<f64> {
        let offset = period_month.checked_sub(cohort_month)? as usize;
        self.table.get(&cohort_month)?.get(offset).copied()
    }
}

/// Groups companies into monthly cohorts and bins revenue by invoice month.
#[derive(Debug, Clone)]
pub struct CohortBinner {
    first: MonthKey,
    last: MonthKey,
}

impl CohortBinner {
    /// Returns `None` if the months do not form a valid range in `year`.
    pub fn new(year: i32, first_month: u32, last_month: u32) -> Option<Self> {
        let first = MonthKey::new(year, first_month)?;
        let last = MonthKey::new(year, last_month)?;
        (first <= last).then_some(Self { first, last })
    }

    pub fn from_settings(settings: &CohortSettings) -> Option<Self> {
        Self::new(settings.year, settings.first_month, settings.last_month)
    }

    /// Cohorts analysed, in order.
    pub fn cohorts(&self) -> Vec<MonthKey> {
        self.first.through(self.last)
    }

    /// Inclusive period range a cohort accumulates revenue over.
    pub fn period_range(&self, cohort: MonthKey) -> (MonthKey, MonthKey) {
        (cohort, self.last)
    }

    /// Adds one cohort's monthly revenue groups to `matrix`.
    ///
    /// Groups outside the cohort's period range are ignored. Returns the
    /// number of cells written.
    pub fn bin(&self, matrix: &mut CohortMatrix, cohort: MonthKey, rows: &[MonthlyRevenue]) -> usize {
        let (from, to) = self.period_range(cohort);
        let mut written = 0;
        for row in rows.iter().filter(|row| row.month >= from && row.month <= to) {
            if matrix.insert(cohort, row.month, row.revenue) {
                written += 1;
            }
        }
        written
    }

    /// Builds the matrix from a synthetic table instead of live invoices.
    pub fn bin_synthetic(&self, table: &SyntheticRevenue) -> CohortMatrix {
        let mut matrix = CohortMatrix::new();
        for cohort in self.cohorts() {
            let (from, to) = self.period_range(cohort);
            for period in from.through(to) {
                if let Some(value) = table.value(cohort.month(), period.month()) {
                    matrix.insert(cohort, period, value);
                }
            }
        }
        matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(m: u32) -> MonthKey {
        MonthKey::new(2023, m).unwrap()
    }

    #[test]
    fn test_matrix_rejects_period_before_cohort() {
        let mut matrix = CohortMatrix::new();
        assert!(!matrix.insert(month(3), month(2), 10.0));
        assert!(matrix.insert(month(3), month(3), 0.0));
        assert_eq!(matrix.get(month(3), month(3)), Some(0.0));
        assert_eq!(matrix.get(month(3), month(4)), None);
        assert_eq!(matrix.len(), 1);
    }

    #[test]
    fn test_bin_filters_to_period_range() {
        let binner = CohortBinner::new(2023, 1, 8).unwrap();
        let mut matrix = CohortMatrix::new();
        let rows = vec![
            MonthlyRevenue { month: month(3), revenue: 5.0 },
            MonthlyRevenue { month: month(4), revenue: 120.5 },
            MonthlyRevenue { month: month(9), revenue: 99.0 },
        ];
        assert_eq!(binner.bin(&mut matrix, month(4), &rows), 1);
        assert_eq!(matrix.get(month(4), month(4)), Some(120.5));
        assert_eq!(matrix.get(month(4), month(3)), None);
        assert_eq!(matrix.get(month(4), month(9)), None);
    }

    #[test]
    fn test_synthetic_reference_reproduces_table() {
        let binner = CohortBinner::new(2023, 1, 8).unwrap();
        let matrix = binner.bin_synthetic(&SyntheticRevenue::reference());

        let january: Vec<f64> = matrix.row(month(1)).unwrap().values().copied().collect();
        assert_eq!(
            january,
            vec![292.0, 644.0, 621.0, 317.0, 649.0, 556.0, 328.0, 536.0]
        );
        assert_eq!(matrix.get(month(2), month(2)), Some(754.0));
        assert_eq!(matrix.get(month(2), month(8)), Some(95.0));
        assert_eq!(matrix.get(month(8), month(8)), Some(293.0));
        assert_eq!(matrix.row(month(8)).unwrap().len(), 1);
        // 8 + 7 + ... + 1 cells
        assert_eq!(matrix.len(), 36);
    }

    #[test]
    fn test_synthetic_never_precedes_cohort() {
        let binner = CohortBinner::new(2023, 1, 8).unwrap();
        let matrix = binner.bin_synthetic(&SyntheticRevenue::reference());
        for cohort in matrix.cohorts() {
            for period in matrix.row(cohort).unwrap().keys() {
                assert!(*period >= cohort);
            }
        }
    }

    #[test]
    fn test_synthetic_truncates_at_last_month() {
        let binner = CohortBinner::new(2023, 1, 3).unwrap();
        let matrix = binner.bin_synthetic(&SyntheticRevenue::reference());
        assert_eq!(matrix.cohorts(), vec![month(1), month(2), month(3)]);
        assert_eq!(matrix.periods(), vec![month(1), month(2), month(3)]);
        assert_eq!(matrix.get(month(1), month(3)), Some(621.0));
    }

    #[test]
    fn test_invalid_range() {
        assert!(CohortBinner::new(2023, 5, 4).is_none());
        assert!(CohortBinner::new(2023, 0, 4).is_none());
    }
}
