//! In-memory [`DataSource`] over a fixed snapshot.
//!
//! Mirrors the PostgreSQL queries' filtering and grouping so analyses can run
//! against fixture data.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::db::models::{
    AccountLink, AccountTotal, Company, Conversation, DailyTotal, Invoice, MonthlyRevenue,
};
use crate::db::DataSource;
use crate::error::{AnalysisError, AnalysisResult};
use crate::metrics::MonthKey;

/// A company row as stored in the `company` table.
#[derive(Debug, Clone)]
pub struct CompanyRecord {
    pub id: i64,
    pub name: String,
    pub associated_partner: Option<String>,
    pub close_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    companies: Vec<CompanyRecord>,
    conversations: Vec<Conversation>,
    links: Vec<AccountLink>,
    invoices: Vec<Invoice>,
    failing_accounts: FxHashSet<i64>,
    failing_companies: FxHashSet<i64>,
    failing_billing_ids: FxHashSet<String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_company(mut self, company: CompanyRecord) -> Self {
        self.companies.push(company);
        self
    }

    pub fn with_conversation(mut self, conversation: Conversation) -> Self {
        self.conversations.push(conversation);
        self
    }

    pub fn with_link(mut self, link: AccountLink) -> Self {
        self.links.push(link);
        self
    }

    pub fn with_invoice(mut self, invoice: Invoice) -> Self {
        self.invoices.push(invoice);
        self
    }

    /// Makes the per-account successful-conversation queries that touch
    /// `account_id` fail with a query error.
    pub fn failing_account(mut self, account_id: i64) -> Self {
        self.failing_accounts.insert(account_id);
        self
    }

    /// Makes the company queries that return or filter on `company_id` fail:
    /// closed-company lookups whose window contains its close date, and
    /// account-link lookups that include it.
    pub fn failing_company(mut self, company_id: i64) -> Self {
        self.failing_companies.insert(company_id);
        self
    }

    /// Makes invoice revenue queries that include `billing_id` fail.
    pub fn failing_billing_id(mut self, billing_id: impl Into<String>) -> Self {
        self.failing_billing_ids.insert(billing_id.into());
        self
    }

    fn check_accounts(&self, context: &str, account_ids: &[i64]) -> AnalysisResult<()> {
        match account_ids.iter().find(|id| self.failing_accounts.contains(*id)) {
            Some(id) => Err(simulated(context, format!("account {id}"))),
            None => Ok(()),
        }
    }

    fn check_companies(&self, context: &str, company_ids: &[i64]) -> AnalysisResult<()> {
        match company_ids.iter().find(|id| self.failing_companies.contains(*id)) {
            Some(id) => Err(simulated(context, format!("company {id}"))),
            None => Ok(()),
        }
    }

    fn to_company(record: &CompanyRecord, reference_date: Option<NaiveDate>) -> Company {
        Company::new(record.id, record.name.clone(), reference_date)
    }
}

fn simulated(context: &str, unit: String) -> AnalysisError {
    AnalysisError::query(context, format!("simulated failure for {unit}"))
}

#[async_trait]
impl DataSource for MemorySource {
    async fn partner_companies(&self) -> AnalysisResult<Vec<Company>> {
        let mut companies: Vec<Company> = self
            .companies
            .iter()
            .filter(|c| c.associated_partner.as_deref().is_some_and(|p| !p.is_empty()))
            .map(|c| Self::to_company(c, None))
            .collect();
        companies.sort_by_key(|c| c.id);
        Ok(companies)
    }

    async fn daily_conversation_totals(&self, account_ids: &[i64]) -> AnalysisResult<Vec<DailyTotal>> {
        let wanted: FxHashSet<i64> = account_ids.iter().copied().collect();

        let mut grouped: BTreeMap<(i64, NaiveDate), f64> = BTreeMap::new();
        for c in self.conversations.iter().filter(|c| wanted.contains(&c.account_id)) {
            *grouped.entry((c.account_id, c.date)).or_insert(0.0) += c.total;
        }

        Ok(grouped
            .into_iter()
            .map(|((account_id, date), total)| DailyTotal::new(account_id, date, total))
            .collect())
    }

    async fn successful_daily_totals(
        &self,
        account_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AnalysisResult<Vec<DailyTotal>> {
        self.check_accounts("successful_daily_totals", &[account_id])?;

        let mut grouped: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for c in self.conversations.iter().filter(|c| {
            c.account_id == account_id && c.successful && c.date >= from && c.date <= to
        }) {
            *grouped.entry(c.date).or_insert(0.0) += c.total;
        }

        Ok(grouped
            .into_iter()
            .map(|(date, total)| DailyTotal::new(account_id, date, total))
            .collect())
    }

    async fn companies_closed_between(&self, from: NaiveDate, to: NaiveDate) -> AnalysisResult<Vec<Company>> {
        let mut companies: Vec<Company> = self
            .companies
            .iter()
            .filter(|c| c.close_date.is_some_and(|d| d >= from && d <= to))
            .map(|c| Self::to_company(c, c.close_date))
            .collect();
        companies.sort_by_key(|c| c.id);

        let ids: Vec<i64> = companies.iter().map(|c| c.id).collect();
        self.check_companies("companies_closed_between", &ids)?;
        Ok(companies)
    }

    async fn account_links(&self, company_ids: &[i64]) -> AnalysisResult<Vec<AccountLink>> {
        self.check_companies("account_links", company_ids)?;
        let wanted: FxHashSet<i64> = company_ids.iter().copied().collect();
        Ok(self
            .links
            .iter()
            .filter(|l| wanted.contains(&l.company_id))
            .cloned()
            .collect())
    }

    async fn successful_totals_in_month(
        &self,
        account_ids: &[i64],
        month: MonthKey,
    ) -> AnalysisResult<Vec<AccountTotal>> {
        self.check_accounts("successful_totals_in_month", account_ids)?;
        let wanted: FxHashSet<i64> = account_ids.iter().copied().collect();

        let mut grouped: FxHashMap<i64, f64> = FxHashMap::default();
        for c in self.conversations.iter().filter(|c| {
            wanted.contains(&c.account_id) && c.successful && MonthKey::of(c.date) == month
        }) {
            *grouped.entry(c.account_id).or_insert(0.0) += c.total;
        }

        Ok(grouped
            .into_iter()
            .map(|(account_id, total)| AccountTotal { account_id, total })
            .collect())
    }

    async fn invoice_revenue_by_month(
        &self,
        billing_ids: &[String],
        from: MonthKey,
        to: MonthKey,
    ) -> AnalysisResult<Vec<MonthlyRevenue>> {
        if let Some(id) = billing_ids.iter().find(|id| self.failing_billing_ids.contains(*id)) {
            return Err(simulated("invoice_revenue_by_month", format!("billing id {id}")));
        }
        let wanted: FxHashSet<&str> = billing_ids.iter().map(String::as_str).collect();

        let mut grouped: BTreeMap<MonthKey, f64> = BTreeMap::new();
        for invoice in self.invoices.iter().filter(|i| wanted.contains(i.billing_id.as_str())) {
            let month = MonthKey::of(invoice.sent_date);
            if month >= from && month <= to {
                *grouped.entry(month).or_insert(0.0) += invoice.amount;
            }
        }

        Ok(grouped
            .into_iter()
            .map(|(month, revenue)| MonthlyRevenue { month, revenue })
            .collect())
    }

    fn source_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, m, d).unwrap()
    }

    fn company(id: i64, partner: Option<&str>, close_date: Option<NaiveDate>) -> CompanyRecord {
        CompanyRecord {
            id,
            name: format!("Company {id}"),
            associated_partner: partner.map(str::to_string),
            close_date,
        }
    }

    fn conversation(account_id: i64, date: NaiveDate, total: f64, successful: bool) -> Conversation {
        Conversation {
            account_id,
            date,
            total,
            successful,
        }
    }

    #[tokio::test]
    async fn test_partner_filter_skips_blank_partner() {
        let source = MemorySource::new()
            .with_company(company(2, Some("acme"), None))
            .with_company(company(1, Some(""), None))
            .with_company(company(3, None, None));
        let ids: Vec<i64> = source
            .partner_companies()
            .await
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![2]);
    }

    #[tokio::test]
    async fn test_successful_daily_totals_filters_and_groups() {
        let source = MemorySource::new()
            .with_conversation(conversation(1, ymd(3, 1), 10.0, true))
            .with_conversation(conversation(1, ymd(3, 1), 5.0, true))
            .with_conversation(conversation(1, ymd(3, 1), 99.0, false))
            .with_conversation(conversation(1, ymd(3, 9), 7.0, true))
            .with_conversation(conversation(2, ymd(3, 1), 50.0, true));
        let rows = source
            .successful_daily_totals(1, ymd(3, 1), ymd(3, 8))
            .await
            .unwrap();
        assert_eq!(rows, vec![DailyTotal::new(1, ymd(3, 1), 15.0)]);
    }

    #[tokio::test]
    async fn test_invoice_months_are_bounded() {
        let source = MemorySource::new()
            .with_invoice(Invoice { billing_id: "cus_1".into(), sent_date: ymd(2, 3), amount: 5.0 })
            .with_invoice(Invoice { billing_id: "cus_1".into(), sent_date: ymd(3, 3), amount: 5.0 })
            .with_invoice(Invoice { billing_id: "cus_1".into(), sent_date: ymd(3, 20), amount: 2.5 })
            .with_invoice(Invoice { billing_id: "cus_2".into(), sent_date: ymd(3, 3), amount: 1.0 });
        let from = MonthKey::new(2023, 3).unwrap();
        let to = MonthKey::new(2023, 8).unwrap();
        let rows = source
            .invoice_revenue_by_month(&["cus_1".to_string()], from, to)
            .await
            .unwrap();
        assert_eq!(rows, vec![MonthlyRevenue { month: from, revenue: 7.5 }]);
    }

    #[tokio::test]
    async fn test_failing_account_surfaces_query_error() {
        let source = MemorySource::new().failing_account(4);
        let err = source
            .successful_totals_in_month(&[1, 4], MonthKey::new(2023, 1).unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Query);
    }

    #[tokio::test]
    async fn test_failing_company_and_billing_id() {
        let source = MemorySource::new()
            .with_company(company(1, None, Some(ymd(1, 10))))
            .with_company(company(2, None, Some(ymd(2, 10))))
            .failing_company(2)
            .failing_billing_id("cus_2");

        assert_eq!(source.companies_closed_between(ymd(1, 1), ymd(1, 31)).await.unwrap().len(), 1);
        assert!(source.companies_closed_between(ymd(2, 1), ymd(2, 28)).await.is_err());
        assert!(source.account_links(&[1]).await.is_ok());
        assert!(source.account_links(&[1, 2]).await.is_err());

        let month = MonthKey::new(2023, 1).unwrap();
        assert!(source.invoice_revenue_by_month(&["cus_1".to_string()], month, month).await.is_ok());
        assert!(source.invoice_revenue_by_month(&["cus_2".to_string()], month, month).await.is_err());
    }
}
