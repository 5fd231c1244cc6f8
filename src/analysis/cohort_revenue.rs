//! Invoice revenue by close-month cohort.

use log::info;

use crate::analysis::{invalid_range, Report, UnitErrors};
use crate::config::{CohortSettings, CohortSource, QueryErrorPolicy};
use crate::db::DataSource;
use crate::error::AnalysisResult;
use crate::metrics::{CohortBinner, CohortMatrix, MonthKey, SyntheticRevenue};
use crate::presentation::{Chart, Heatmap};

/// Builds the cohort matrix from live invoices.
///
/// A cohort is the set of companies closed in that month; its revenue is
/// summed per invoice month from the cohort month through the binner's last
/// month.
async fn live_matrix(
    source: &dyn DataSource,
    binner: &CohortBinner,
    errors: &mut UnitErrors,
) -> AnalysisResult<CohortMatrix> {
    let mut matrix = CohortMatrix::new();

    for cohort in binner.cohorts() {
        let result = cohort_revenue(source, binner, cohort, &mut matrix).await;
        if let Some(cells) = errors.check(format!("cohort {cohort}"), result)? {
            info!("Cohort {}: {} invoice months with revenue", cohort, cells);
        }
    }

    Ok(matrix)
}

async fn cohort_revenue(
    source: &dyn DataSource,
    binner: &CohortBinner,
    cohort: MonthKey,
    matrix: &mut CohortMatrix,
) -> AnalysisResult<usize> {
    let companies = source
        .companies_closed_between(cohort.first_day(), cohort.last_day())
        .await?;
    if companies.is_empty() {
        return Ok(0);
    }

    let company_ids: Vec<i64> = companies.iter().map(|c| c.id).collect();
    let billing_ids: Vec<String> = source
        .account_links(&company_ids)
        .await?
        .into_iter()
        .filter_map(|link| link.billing_id)
        .filter(|id| !id.is_empty())
        .collect();

    let (from, to) = binner.period_range(cohort);
    let rows = source.invoice_revenue_by_month(&billing_ids, from, to).await?;

    Ok(binner.bin(matrix, cohort, &rows))
}

pub async fn run(
    source: &dyn DataSource,
    settings: &CohortSettings,
    policy: QueryErrorPolicy,
) -> AnalysisResult<Report> {
    info!("Starting cohort revenue analysis ({:?} source)...", settings.source);

    let start = std::time::Instant::now();
    let binner = CohortBinner::from_settings(settings).ok_or_else(|| invalid_range("cohort"))?;
    let mut errors = UnitErrors::new(policy);

    let matrix = match settings.source {
        CohortSource::Live => live_matrix(source, &binner, &mut errors).await?,
        CohortSource::Synthetic => binner.bin_synthetic(&SyntheticRevenue::reference()),
    };

    info!(
        "Completed cohort revenue analysis in {:?} ({} cohorts, {} cells)",
        start.elapsed(),
        matrix.cohorts().len(),
        matrix.len()
    );

    if matrix.is_empty() {
        return Ok(Report::no_data("no invoice revenue for any cohort"));
    }

    Ok(Report::Ready {
        chart: Chart::Heatmap(Heatmap::from_matrix(
            &matrix,
            "Cohort Analysis - Revenue per Close Month",
            format!("Invoice Month ({})", settings.year),
            "Cohort (Close Date)",
            "Revenue",
        )),
        skipped: errors.into_skipped(),
    })
}
