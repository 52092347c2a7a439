//! Dashboard data types.

use buku_shared::types::Amount;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Headline totals for the dashboard.
///
/// Balance-sheet totals are as of `as_of`; revenue and expenses cover
/// `period_start..=as_of`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardTotals {
    /// Reference date.
    pub as_of: NaiveDate,
    /// First day of the month containing `as_of`.
    pub period_start: NaiveDate,
    /// Sum of asset balances.
    pub total_assets: Amount,
    /// Sum of liability balances.
    pub total_liabilities: Amount,
    /// Sum of equity balances.
    pub total_equity: Amount,
    /// Revenue earned this month.
    pub monthly_revenue: Amount,
    /// Expenses incurred this month.
    pub monthly_expenses: Amount,
    /// `monthly_revenue - monthly_expenses`.
    pub net_income: Amount,
}

/// Returns the first day of the month containing `date`.
#[must_use]
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}
