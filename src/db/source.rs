use async_trait::async_trait;
use chrono::NaiveDate;

use crate::db::models::{AccountLink, AccountTotal, Company, DailyTotal, MonthlyRevenue};
use crate::error::AnalysisResult;
use crate::metrics::MonthKey;

/// Read-only queries the analyses issue against the company/conversation/invoice store.
///
/// Every query is single-shot; failures surface as
/// [`AnalysisError::Query`](crate::error::AnalysisError::Query) or
/// [`AnalysisError::Connection`](crate::error::AnalysisError::Connection).
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Companies brought in by a partner. `reference_date` is left empty.
    async fn partner_companies(&self) -> AnalysisResult<Vec<Company>>;

    /// Conversation totals per account and day, successful or not.
    async fn daily_conversation_totals(&self, account_ids: &[i64]) -> AnalysisResult<Vec<DailyTotal>>;

    /// Successful-conversation totals per day for one account in `[from, to]`.
    async fn successful_daily_totals(
        &self,
        account_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AnalysisResult<Vec<DailyTotal>>;

    /// Companies whose close date lies in `[from, to]`, with the close date
    /// as `reference_date`.
    async fn companies_closed_between(&self, from: NaiveDate, to: NaiveDate) -> AnalysisResult<Vec<Company>>;

    async fn account_links(&self, company_ids: &[i64]) -> AnalysisResult<Vec<AccountLink>>;

    /// Successful-conversation totals per account within `month`. Accounts
    /// without conversations are absent from the result.
    async fn successful_totals_in_month(
        &self,
        account_ids: &[i64],
        month: MonthKey,
    ) -> AnalysisResult<Vec<AccountTotal>>;

    /// Invoice amounts for the given billing ids grouped by invoice month,
    /// restricted to `[from, to]`. Months without invoices are absent.
    async fn invoice_revenue_by_month(
        &self,
        billing_ids: &[String],
        from: MonthKey,
        to: MonthKey,
    ) -> AnalysisResult<Vec<MonthlyRevenue>>;

    /// Source name for logging
    fn source_name(&self) -> &'static str;
}
