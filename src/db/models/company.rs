use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A customer company (PostgreSQL `company`).
///
/// `reference_date` is the activation date for partner-sourced companies and
/// the close date for recently closed ones. It is `None` when the company
/// never activated or has no close date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub reference_date: Option<NaiveDate>,
}

impl Company {
    pub fn new(id: i64, name: impl Into<String>, reference_date: Option<NaiveDate>) -> Self {
        Self {
            id,
            name: name.into(),
            reference_date,
        }
    }
}

/// External identifiers of a company (PostgreSQL `company_identifiers`).
///
/// Conversations are keyed by `account_id`, invoices by `billing_id`. Either
/// may be missing for a given company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountLink {
    pub company_id: i64,
    pub account_id: Option<i64>,
    pub billing_id: Option<String>,
}
