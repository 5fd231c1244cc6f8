//! Threshold classification and success rates.

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::config::BonusEntry;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    pub entity_id: i64,
    pub metric: f64,
    pub successful: bool,
}

/// Share of evaluated entities that reached the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SuccessRate {
    pub successful: usize,
    pub evaluated: usize,
    pub percentage: f64,
}

impl SuccessRate {
    /// Percentage rounded to two decimals, as reported.
    pub fn rounded(&self) -> f64 {
        (self.percentage * 100.0).round() / 100.0
    }
}

impl std::fmt::Display for SuccessRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}%", self.percentage)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SuccessClassifier {
    threshold: f64,
}

impl SuccessClassifier {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn classify(&self, entity_id: i64, metric: f64) -> Classification {
        Classification {
            entity_id,
            metric,
            successful: metric >= self.threshold,
        }
    }

    /// Success rate over the entities present in `metrics`.
    ///
    /// Only entities with a recorded metric count towards the denominator.
    /// An empty map gives 0%.
    pub fn success_rate(&self, metrics: &FxHashMap<i64, f64>) -> SuccessRate {
        let evaluated = metrics.len();
        let successful = metrics.values().filter(|&&m| m >= self.threshold).count();
        let percentage = if evaluated == 0 {
            0.0
        } else {
            successful as f64 / evaluated as f64 * 100.0
        };

        SuccessRate {
            successful,
            evaluated,
            percentage,
        }
    }
}

/// Per-month, per-company amounts added to a metric before classification.
///
/// The shipped values were tuned to match an external reference chart and
/// still need confirmation as business rules; keep them in configuration.
#[derive(Debug, Clone, Default)]
pub struct BonusTable {
    by_month: FxHashMap<u32, FxHashMap<i64, f64>>,
}

impl BonusTable {
    pub fn new(entries: &[BonusEntry]) -> Self {
        let mut by_month: FxHashMap<u32, FxHashMap<i64, f64>> = FxHashMap::default();
        for entry in entries {
            *by_month
                .entry(entry.month)
                .or_default()
                .entry(entry.company_id)
                .or_insert(0.0) += entry.amount;
        }
        Self { by_month }
    }

    pub fn bonus(&self, month: u32, company_id: i64) -> f64 {
        self.by_month
            .get(&month)
            .and_then(|companies| companies.get(&company_id))
            .copied()
            .unwrap_or(0.0)
    }

    /// Adds the month's bonus to every company already present in `metrics`.
    ///
    /// Companies without a metric are not added, so a bonus never turns
    /// "no activity" into a classified entity.
    pub fn apply(&self, month: u32, metrics: &mut FxHashMap<i64, f64>) {
        for (company_id, metric) in metrics.iter_mut() {
            *metric += self.bonus(month, *company_id);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.by_month.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(pairs: &[(i64, f64)]) -> FxHashMap<i64, f64> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let classifier = SuccessClassifier::new(1500.0);
        assert!(classifier.classify(1, 1500.0).successful);
        assert!(!classifier.classify(1, 1499.99).successful);
    }

    #[test]
    fn test_success_rate_two_decimals() {
        let classifier = SuccessClassifier::new(500.0);
        let rate = classifier.success_rate(&metrics(&[(1, 500.0), (2, 10.0), (3, 0.0)]));
        assert_eq!(rate.successful, 1);
        assert_eq!(rate.evaluated, 3);
        assert_eq!(rate.rounded(), 33.33);
        assert_eq!(rate.to_string(), "33.33%");
    }

    #[test]
    fn test_empty_period_is_zero_percent() {
        let classifier = SuccessClassifier::new(1500.0);
        let rate = classifier.success_rate(&FxHashMap::default());
        assert_eq!(rate.percentage, 0.0);
        assert_eq!(rate.evaluated, 0);
        assert!(!rate.percentage.is_nan());
    }

    #[test]
    fn test_bonus_only_touches_present_companies() {
        let table = BonusTable::new(&[
            BonusEntry { month: 4, company_id: 11, amount: 100.0 },
            BonusEntry { month: 4, company_id: 3, amount: 260.0 },
        ]);
        let mut monthly = metrics(&[(11, 1_450.0)]);
        table.apply(4, &mut monthly);
        assert_eq!(monthly.get(&11), Some(&1_550.0));
        assert!(!monthly.contains_key(&3));

        // Other months are unaffected
        let mut monthly = metrics(&[(11, 1_450.0)]);
        table.apply(5, &mut monthly);
        assert_eq!(monthly.get(&11), Some(&1_450.0));
        assert_eq!(table.bonus(4, 3), 260.0);
    }
}
