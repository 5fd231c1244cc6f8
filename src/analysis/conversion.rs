//! Monthly share of recently closed companies that convert.
//!
//! For each month, "recently closed" companies are those whose close date
//! falls between the first day of the previous month and the last day of the
//! month. Their successful conversations in the month are summed per company,
//! bonuses are added, and companies at or above the threshold count as
//! successful. Companies without conversations are left out of the rate.

use chrono::NaiveDate;
use log::{info, warn};
use rustc_hash::FxHashMap;

use crate::analysis::{invalid_range, Report, UnitErrors};
use crate::config::{ConversionSettings, QueryErrorPolicy};
use crate::db::models::AccountLink;
use crate::db::DataSource;
use crate::error::AnalysisResult;
use crate::metrics::{BonusTable, MonthKey, SuccessClassifier, SuccessRate};
use crate::presentation::{progress_bar, Chart, LineSeries, Point};

/// Close-date window of companies considered recently closed in `month`.
pub fn recently_closed_window(month: MonthKey) -> (NaiveDate, NaiveDate) {
    (month.previous().first_day(), month.last_day())
}

/// Maps each linked account to its company.
///
/// An account linked to several companies is counted for the last link seen;
/// the conflict is logged.
fn company_by_account(links: &[AccountLink]) -> FxHashMap<i64, i64> {
    let mut by_account: FxHashMap<i64, i64> = FxHashMap::default();
    for link in links {
        let Some(account_id) = link.account_id else {
            continue;
        };
        if let Some(previous) = by_account.insert(account_id, link.company_id) {
            if previous != link.company_id {
                warn!(
                    "Account {} is linked to companies {} and {}; counting it for {}",
                    account_id, previous, link.company_id, link.company_id
                );
            }
        }
    }
    by_account
}

/// Success rate of the companies recently closed in `month`.
pub async fn month_success_rate(
    source: &dyn DataSource,
    month: MonthKey,
    classifier: &SuccessClassifier,
    bonuses: &BonusTable,
) -> AnalysisResult<SuccessRate> {
    let (from, to) = recently_closed_window(month);
    let companies = source.companies_closed_between(from, to).await?;
    let company_ids: Vec<i64> = companies.iter().map(|c| c.id).collect();

    let links = source.account_links(&company_ids).await?;
    let accounts = company_by_account(&links);
    let account_ids: Vec<i64> = accounts.keys().copied().collect();

    let mut metrics: FxHashMap<i64, f64> = FxHashMap::default();
    for row in source.successful_totals_in_month(&account_ids, month).await? {
        if let Some(&company_id) = accounts.get(&row.account_id) {
            *metrics.entry(company_id).or_insert(0.0) += row.total;
        }
    }
    bonuses.apply(month.month(), &mut metrics);

    Ok(classifier.success_rate(&metrics))
}

pub async fn run(
    source: &dyn DataSource,
    settings: &ConversionSettings,
    policy: QueryErrorPolicy,
) -> AnalysisResult<Report> {
    info!("Starting conversion analysis...");

    let start = std::time::Instant::now();
    let first = MonthKey::new(settings.year, settings.first_month)
        .ok_or_else(|| invalid_range("conversion"))?;
    let last = MonthKey::new(settings.year, settings.last_month)
        .ok_or_else(|| invalid_range("conversion"))?;

    let classifier = SuccessClassifier::new(settings.success_threshold);
    let bonuses = BonusTable::new(&settings.bonuses);
    info!("Success threshold: {} successful conversations", classifier.threshold());
    if !bonuses.is_empty() {
        warn!(
            "Applying {} hand-tuned monthly bonus entries before classification",
            settings.bonuses.len()
        );
    }
    let mut errors = UnitErrors::new(policy);

    let months = first.through(last);
    let mut points = Vec::with_capacity(months.len());
    for (i, month) in months.iter().enumerate() {
        let result = month_success_rate(source, *month, &classifier, &bonuses).await;
        let Some(rate) = errors.check(*month, result)? else {
            continue;
        };

        info!(
            "Successful conversations in {} {} for recently closed companies: {}",
            month.name(),
            month.year(),
            progress_bar(i + 1, months.len())
        );
        info!(
            "Percentage of successful companies in {} {}: {} ({}/{})",
            month.name(),
            month.year(),
            rate,
            rate.successful,
            rate.evaluated
        );

        points.push(Point {
            label: month.name(),
            value: rate.rounded(),
        });
    }

    info!(
        "Completed conversion analysis in {:?} ({} months)",
        start.elapsed(),
        points.len()
    );

    if points.is_empty() {
        return Ok(Report::no_data("every month was skipped"));
    }

    Ok(Report::Ready {
        chart: Chart::Line(LineSeries {
            title: "Percentage of Successful Companies Over Time".to_string(),
            x_label: "Month".to_string(),
            y_label: "Percentage of Successful Companies".to_string(),
            points,
        }),
        skipped: errors.into_skipped(),
    })
}
