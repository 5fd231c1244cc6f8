//! Activation and success dates for partner-sourced companies.
//!
//! A company activates on the first day its trailing conversation window
//! reaches the activation threshold. It succeeds on the first day within
//! the horizon after activation where its running total of successful
//! conversations reaches the success threshold. The chart is the cumulative
//! weekly count of successful companies in the report year.

use chrono::{Datelike, NaiveDate};
use log::info;
use rustc_hash::FxHashMap;

use crate::analysis::{Report, UnitErrors};
use crate::config::{ActivationSettings, QueryErrorPolicy};
use crate::db::DataSource;
use crate::error::AnalysisResult;
use crate::metrics::{
    weekly_cumulative, Crossing, DateCorrections, RollingWindowAggregator, SuccessClassifier,
};
use crate::presentation::{Chart, LineSeries, Point};

pub async fn run(
    source: &dyn DataSource,
    settings: &ActivationSettings,
    policy: QueryErrorPolicy,
) -> AnalysisResult<Report> {
    info!("Starting activation analysis...");

    let start = std::time::Instant::now();
    let aggregator = RollingWindowAggregator::from_settings(settings);
    let corrections = DateCorrections::new(&settings.corrections);
    let classifier = SuccessClassifier::new(settings.success_threshold);
    let mut errors = UnitErrors::new(policy);

    let mut companies = source.partner_companies().await?;
    if companies.is_empty() {
        return Ok(Report::no_data("no partner-sourced companies"));
    }

    // Conversations are keyed by the company id for partner companies
    let ids: Vec<i64> = companies.iter().map(|c| c.id).collect();
    let mut events_by_company: FxHashMap<i64, Vec<(NaiveDate, f64)>> = FxHashMap::default();
    for row in source.daily_conversation_totals(&ids).await? {
        events_by_company
            .entry(row.account_id)
            .or_default()
            .push((row.date, row.total));
    }

    for company in companies.iter_mut() {
        company.reference_date = events_by_company
            .get(&company.id)
            .and_then(|events| aggregator.trailing_crossing(events));
    }
    let activated = companies.iter().filter(|c| c.reference_date.is_some()).count();
    info!("{} of {} partner companies activated", activated, companies.len());

    let mut crossings = Vec::with_capacity(companies.len());
    for company in &companies {
        let Some(activation) = company.reference_date else {
            crossings.push(Crossing::absent(company.id));
            continue;
        };

        let (from, to) = aggregator.horizon(activation);
        let result = source.successful_daily_totals(company.id, from, to).await;
        let Some(rows) = errors.check(format!("company {}", company.id), result)? else {
            continue;
        };

        let events: Vec<(NaiveDate, f64)> = rows.iter().map(|r| (r.date, r.total)).collect();
        let crossing = aggregator.running_crossing(company.id, Some(activation), &events);
        crossings.push(corrections.apply(crossing));
    }

    let success_dates: Vec<NaiveDate> = crossings
        .iter()
        .filter(|c| {
            c.horizon_total
                .is_some_and(|total| classifier.classify(c.entity_id, total).successful)
        })
        .filter_map(|c| c.date)
        .collect();

    let in_year: Vec<NaiveDate> = success_dates
        .iter()
        .copied()
        .filter(|d| d.year() == settings.report_year)
        .collect();

    info!(
        "Completed activation analysis in {:?} ({} successful companies, {} in {})",
        start.elapsed(),
        success_dates.len(),
        in_year.len(),
        settings.report_year
    );

    if in_year.is_empty() {
        return Ok(Report::no_data(format!(
            "no successful companies in {}",
            settings.report_year
        )));
    }

    let points = weekly_cumulative(&in_year)
        .into_iter()
        .map(|(week, count)| Point {
            label: week.format("%Y-%m-%d").to_string(),
            value: count as f64,
        })
        .collect();

    Ok(Report::Ready {
        chart: Chart::Line(LineSeries {
            title: format!(
                "Cumulative Weekly Counts of Successful Companies in {}",
                settings.report_year
            ),
            x_label: "Week".to_string(),
            y_label: "Cumulative Count".to_string(),
            points,
        }),
        skipped: errors.into_skipped(),
    })
}
