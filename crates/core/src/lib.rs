//! Core ledger logic for Buku.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Persistence is reached only through the [`ledger::LedgerRepository`] trait.
//!
//! # Modules
//!
//! - `ledger` - Chart of accounts, double-entry transactions and balances
//! - `dashboard` - Dashboard totals derived from posted balances
//! - `integration` - Posting payroll and reward events into the ledger

pub mod dashboard;
pub mod integration;
pub mod ledger;
