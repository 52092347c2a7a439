//! Dashboard totals.
//!
//! The totals themselves are computed by
//! [`BalanceAggregator::dashboard_totals`](crate::ledger::BalanceAggregator::dashboard_totals);
//! this module holds the result type and period helpers.

pub mod types;

pub use types::*;
