//! Threshold crossings over per-entity daily event totals.
//!
//! Two passes are supported:
//! - a trailing window (the current day plus the `window_days - 1` days before
//!   it, missing days counting as zero), used to detect activation
//! - a running total from an entity's own start date over a bounded horizon,
//!   used to detect success

use std::collections::BTreeMap;

use chrono::{Days, Duration, NaiveDate};
use log::warn;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::config::{ActivationSettings, DateCorrection};

/// Result of searching one entity's horizon for a threshold crossing.
///
/// `date` is `None` when the threshold was never reached inside the horizon.
/// `horizon_total` is `None` when the entity had no events in the horizon at
/// all, which is different from having events that sum to zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Crossing {
    pub entity_id: i64,
    pub date: Option<NaiveDate>,
    pub value_at_crossing: Option<f64>,
    pub horizon_total: Option<f64>,
}

impl Crossing {
    pub fn absent(entity_id: i64) -> Self {
        Self {
            entity_id,
            date: None,
            value_at_crossing: None,
            horizon_total: None,
        }
    }

    pub fn is_reached(&self) -> bool {
        self.date.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct RollingWindowAggregator {
    window_days: u32,
    window_threshold: f64,
    horizon_days: u32,
    horizon_threshold: f64,
}

impl RollingWindowAggregator {
    pub fn new(
        window_days: u32,
        window_threshold: f64,
        horizon_days: u32,
        horizon_threshold: f64,
    ) -> Self {
        Self {
            window_days: window_days.max(1),
            window_threshold,
            horizon_days,
            horizon_threshold,
        }
    }

    pub fn from_settings(settings: &ActivationSettings) -> Self {
        Self::new(
            settings.window_days,
            settings.window_threshold,
            settings.horizon_days,
            settings.success_threshold,
        )
    }

    /// Trailing-window sum for every day that has at least one event, in date order.
    ///
    /// Days without events are skipped as candidates: their trailing sum can
    /// never exceed the sum of the previous event day, so they are never the
    /// first crossing.
    pub fn trailing_sums(&self, events: &[(NaiveDate, f64)]) -> Vec<(NaiveDate, f64)> {
        let daily = daily_totals(events);
        let lookback = Days::new(u64::from(self.window_days) - 1);

        daily
            .keys()
            .map(|&day| {
                let first = day.checked_sub_days(lookback).unwrap_or(NaiveDate::MIN);
                let sum: f64 = daily.range(first..=day).map(|(_, v)| v).sum();
                (day, sum)
            })
            .collect()
    }

    /// Earliest day whose trailing-window sum reaches the window threshold.
    pub fn trailing_crossing(&self, events: &[(NaiveDate, f64)]) -> Option<NaiveDate> {
        self.trailing_sums(events)
            .into_iter()
            .find(|(_, sum)| *sum >= self.window_threshold)
            .map(|(day, _)| day)
    }

    /// Inclusive `[start, start + horizon_days]` range searched by [`Self::running_crossing`].
    ///
    /// The end is clamped to the last representable date.
    pub fn horizon(&self, start: NaiveDate) -> (NaiveDate, NaiveDate) {
        let end = start
            .checked_add_days(Days::new(u64::from(self.horizon_days)))
            .unwrap_or(NaiveDate::MAX);
        (start, end)
    }

    /// Earliest day in the entity's horizon whose running total reaches the
    /// horizon threshold.
    ///
    /// Events outside the horizon are ignored, so callers may pass an
    /// unfiltered event list. An entity without a start date has no horizon
    /// and yields an absent crossing.
    pub fn running_crossing(
        &self,
        entity_id: i64,
        start: Option<NaiveDate>,
        events: &[(NaiveDate, f64)],
    ) -> Crossing {
        let Some(start) = start else {
            return Crossing::absent(entity_id);
        };
        let (from, to) = self.horizon(start);

        let in_horizon: Vec<(NaiveDate, f64)> = events
            .iter()
            .copied()
            .filter(|(day, _)| *day >= from && *day <= to)
            .collect();
        if in_horizon.is_empty() {
            return Crossing::absent(entity_id);
        }

        let mut crossing = Crossing::absent(entity_id);
        let mut running = 0.0;
        for (day, total) in daily_totals(&in_horizon) {
            running += total;
            if crossing.date.is_none() && running >= self.horizon_threshold {
                crossing.date = Some(day);
                crossing.value_at_crossing = Some(running);
            }
        }
        crossing.horizon_total = Some(running);

        crossing
    }
}

fn daily_totals(events: &[(NaiveDate, f64)]) -> BTreeMap<NaiveDate, f64> {
    let mut daily = BTreeMap::new();
    for &(day, amount) in events {
        *daily.entry(day).or_insert(0.0) += amount;
    }
    daily
}

/// Per-company day offsets applied to reported success dates.
#[derive(Debug, Clone, Default)]
pub struct DateCorrections {
    by_company: FxHashMap<i64, i64>,
}

impl DateCorrections {
    pub fn new(entries: &[DateCorrection]) -> Self {
        Self {
            by_company: entries.iter().map(|c| (c.company_id, c.days)).collect(),
        }
    }

    pub fn offset(&self, company_id: i64) -> i64 {
        self.by_company.get(&company_id).copied().unwrap_or(0)
    }

    /// Shifts the crossing date of `crossing` by the company's configured offset.
    pub fn apply(&self, mut crossing: Crossing) -> Crossing {
        let days = self.offset(crossing.entity_id);
        if days != 0 {
            if let Some(date) = crossing.date {
                let shifted = Duration::try_days(days).and_then(|d| date.checked_add_signed(d));
                match shifted {
                    Some(shifted) => {
                        warn!(
                            "Applying hand-tuned {:+} day correction to success date of company {}",
                            days, crossing.entity_id
                        );
                        crossing.date = Some(shifted);
                    },
                    None => warn!(
                        "Ignoring {:+} day correction for company {}: date out of range",
                        days, crossing.entity_id
                    ),
                }
            }
        }
        crossing
    }
}
