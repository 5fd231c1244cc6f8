use async_trait::async_trait;
use chrono::NaiveDate;
use log::debug;

use crate::db::models::{AccountLink, AccountTotal, Company, DailyTotal, MonthlyRevenue};
use crate::db::postgres::PostgresClient;
use crate::db::DataSource;
use crate::error::{AnalysisError, AnalysisResult};
use crate::metrics::MonthKey;

// Bind parameters are always sent as int8, text or date; every one is cast
// explicitly so id columns of any integer width compare against them.

const PARTNER_COMPANIES_SQL: &str = r#"
    SELECT id::bigint AS id, name::text AS name
    FROM company
    WHERE associated_partner IS NOT NULL AND associated_partner != ''
    ORDER BY id
"#;

const COMPANIES_CLOSED_BETWEEN_SQL: &str = r#"
    SELECT id::bigint AS id, name::text AS name, close_date::date AS close_date
    FROM company
    WHERE close_date::date BETWEEN $1::date AND $2::date
    ORDER BY id
"#;

const ACCOUNT_LINKS_SQL: &str = r#"
    SELECT
        company_id::bigint AS company_id,
        account_identifier::bigint AS account_id,
        stripe_company_ids::text AS billing_id
    FROM company_identifiers
    WHERE company_id::bigint = ANY($1::bigint[])
"#;

const DAILY_CONVERSATION_TOTALS_SQL: &str = r#"
    SELECT
        account_id::bigint AS account_id,
        date::date AS date,
        SUM(total)::float8 AS daily_total
    FROM conversations
    WHERE account_id::bigint = ANY($1::bigint[])
    GROUP BY account_id, date::date
    HAVING SUM(total) IS NOT NULL
    ORDER BY account_id, date::date
"#;

const SUCCESSFUL_DAILY_TOTALS_SQL: &str = r#"
    SELECT
        account_id::bigint AS account_id,
        date::date AS date,
        SUM(total)::float8 AS daily_total
    FROM conversations
    WHERE account_id::bigint = $1::bigint
      AND successful = TRUE
      AND date::date BETWEEN $2::date AND $3::date
    GROUP BY account_id, date::date
    HAVING SUM(total) IS NOT NULL
    ORDER BY date::date
"#;

const SUCCESSFUL_TOTALS_IN_MONTH_SQL: &str = r#"
    SELECT account_id::bigint AS account_id, SUM(total)::float8 AS total
    FROM conversations
    WHERE account_id::bigint = ANY($1::bigint[])
      AND successful = TRUE
      AND date::date BETWEEN $2::date AND $3::date
    GROUP BY account_id
    HAVING SUM(total) IS NOT NULL
"#;

const INVOICE_REVENUE_BY_MONTH_SQL: &str = r#"
    SELECT
        date_trunc('month', sent_date)::date AS invoice_month,
        SUM(amount)::float8 AS revenue
    FROM stripe_invoice
    WHERE company_id::text = ANY($1::text[])
      AND sent_date::date BETWEEN $2::date AND $3::date
    GROUP BY invoice_month
    HAVING SUM(amount) IS NOT NULL
    ORDER BY invoice_month
"#;

#[async_trait]
impl DataSource for PostgresClient {
    // ==================== COMPANIES ====================

    async fn partner_companies(&self) -> AnalysisResult<Vec<Company>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(PARTNER_COMPANIES_SQL, &[])
            .await
            .map_err(|e| AnalysisError::query("partner_companies", e))?;

        Ok(rows
            .iter()
            .map(|row| Company::new(row.get("id"), row.get::<_, String>("name"), None))
            .collect())
    }

    async fn companies_closed_between(&self, from: NaiveDate, to: NaiveDate) -> AnalysisResult<Vec<Company>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(COMPANIES_CLOSED_BETWEEN_SQL, &[&from, &to])
            .await
            .map_err(|e| AnalysisError::query("companies_closed_between", e))?;

        Ok(rows
            .iter()
            .map(|row| {
                Company::new(
                    row.get("id"),
                    row.get::<_, String>("name"),
                    row.get::<_, Option<NaiveDate>>("close_date"),
                )
            })
            .collect())
    }

    async fn account_links(&self, company_ids: &[i64]) -> AnalysisResult<Vec<AccountLink>> {
        if company_ids.is_empty() {
            return Ok(vec![]);
        }

        let client = self.pool.get().await?;
        let rows = client
            .query(ACCOUNT_LINKS_SQL, &[&company_ids])
            .await
            .map_err(|e| AnalysisError::query("account_links", e))?;

        Ok(rows
            .iter()
            .map(|row| AccountLink {
                company_id: row.get("company_id"),
                account_id: row.get("account_id"),
                billing_id: row.get("billing_id"),
            })
            .collect())
    }

    // ==================== CONVERSATIONS ====================

    async fn daily_conversation_totals(&self, account_ids: &[i64]) -> AnalysisResult<Vec<DailyTotal>> {
        if account_ids.is_empty() {
            return Ok(vec![]);
        }

        let client = self.pool.get().await?;
        let rows = client
            .query(DAILY_CONVERSATION_TOTALS_SQL, &[&account_ids])
            .await
            .map_err(|e| AnalysisError::query("daily_conversation_totals", e))?;

        debug!("Fetched {} daily conversation totals", rows.len());
        Ok(rows.iter().map(row_to_daily_total).collect())
    }

    async fn successful_daily_totals(
        &self,
        account_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AnalysisResult<Vec<DailyTotal>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(SUCCESSFUL_DAILY_TOTALS_SQL, &[&account_id, &from, &to])
            .await
            .map_err(|e| AnalysisError::query(format!("successful_daily_totals({account_id})"), e))?;

        Ok(rows.iter().map(row_to_daily_total).collect())
    }

    async fn successful_totals_in_month(
        &self,
        account_ids: &[i64],
        month: MonthKey,
    ) -> AnalysisResult<Vec<AccountTotal>> {
        if account_ids.is_empty() {
            return Ok(vec![]);
        }

        let client = self.pool.get().await?;
        let rows = client
            .query(SUCCESSFUL_TOTALS_IN_MONTH_SQL, &[&account_ids, &month.first_day(), &month.last_day()])
            .await
            .map_err(|e| AnalysisError::query(format!("successful_totals_in_month({month})"), e))?;

        Ok(rows
            .iter()
            .map(|row| AccountTotal {
                account_id: row.get("account_id"),
                total: row.get("total"),
            })
            .collect())
    }

    // ==================== INVOICES ====================

    async fn invoice_revenue_by_month(
        &self,
        billing_ids: &[String],
        from: MonthKey,
        to: MonthKey,
    ) -> AnalysisResult<Vec<MonthlyRevenue>> {
        if billing_ids.is_empty() {
            return Ok(vec![]);
        }

        let client = self.pool.get().await?;
        let rows = client
            .query(INVOICE_REVENUE_BY_MONTH_SQL, &[&billing_ids, &from.first_day(), &to.last_day()])
            .await
            .map_err(|e| AnalysisError::query(format!("invoice_revenue_by_month({from}..{to})"), e))?;

        Ok(rows
            .iter()
            .map(|row| MonthlyRevenue {
                month: MonthKey::of(row.get::<_, NaiveDate>("invoice_month")),
                revenue: row.get("revenue"),
            })
            .collect())
    }

    fn source_name(&self) -> &'static str {
        "postgres"
    }
}

fn row_to_daily_total(row: &tokio_postgres::Row) -> DailyTotal {
    DailyTotal::new(row.get("account_id"), row.get("date"), row.get("daily_total"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_SQL: [&str; 7] = [
        PARTNER_COMPANIES_SQL,
        COMPANIES_CLOSED_BETWEEN_SQL,
        ACCOUNT_LINKS_SQL,
        DAILY_CONVERSATION_TOTALS_SQL,
        SUCCESSFUL_DAILY_TOTALS_SQL,
        SUCCESSFUL_TOTALS_IN_MONTH_SQL,
        INVOICE_REVENUE_BY_MONTH_SQL,
    ];

    #[test]
    fn test_every_parameter_is_cast() {
        for sql in ALL_SQL {
            for (i, _) in sql.match_indices('$') {
                let rest = sql[i + 1..].trim_start_matches(|c: char| c.is_ascii_digit());
                assert!(rest.starts_with("::"), "uncast parameter in {sql}");
            }
        }
    }

    #[test]
    fn test_id_filters_bind_as_bigint() {
        assert!(ACCOUNT_LINKS_SQL.contains("company_id::bigint = ANY($1::bigint[])"));
        assert!(DAILY_CONVERSATION_TOTALS_SQL.contains("account_id::bigint = ANY($1::bigint[])"));
        assert!(SUCCESSFUL_DAILY_TOTALS_SQL.contains("account_id::bigint = $1::bigint"));
        assert!(SUCCESSFUL_TOTALS_IN_MONTH_SQL.contains("account_id::bigint = ANY($1::bigint[])"));
        assert!(INVOICE_REVENUE_BY_MONTH_SQL.contains("ANY($1::text[])"));
    }
}
