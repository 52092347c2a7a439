//! Domain events consumed from the payroll and reward subsystems.

use buku_shared::types::{EmployeeId, TransactionId};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::Transaction;

/// Reference prefix for payroll postings.
pub const PAYROLL_REFERENCE_PREFIX: &str = "PAY-";

/// Reference prefix for reward postings.
pub const REWARD_REFERENCE_PREFIX: &str = "RWD-";

/// A salary payment was made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollPaid {
    /// Identity of the payroll record; drives idempotency.
    pub payroll_id: Uuid,
    /// The employee paid.
    pub employee_id: EmployeeId,
    /// Net salary in major currency units, as the payroll subsystem
    /// reports it. Converted exactly at the ledger's minor-unit scale.
    pub net_salary: Decimal,
    /// Payroll month, 1-12.
    pub period_month: u32,
    /// Payroll year.
    pub period_year: i32,
    /// Accounting date of the payment.
    pub pay_date: NaiveDate,
}

impl PayrollPaid {
    /// Deterministic ledger reference for this event.
    #[must_use]
    pub fn reference(&self) -> String {
        format!("{PAYROLL_REFERENCE_PREFIX}{}", self.payroll_id)
    }
}

/// An employee redeemed reward points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardClaimed {
    /// Identity of the claim; drives idempotency.
    pub claim_id: Uuid,
    /// The employee claiming.
    pub employee_id: EmployeeId,
    /// Points redeemed.
    pub points: i64,
    /// Reward title.
    pub title: String,
    /// Accounting date of the claim.
    pub claimed_date: NaiveDate,
}

impl RewardClaimed {
    /// Deterministic ledger reference for this event.
    #[must_use]
    pub fn reference(&self) -> String {
        format!("{REWARD_REFERENCE_PREFIX}{}", self.claim_id)
    }
}

/// Events the bridge knows how to post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    /// Salary paid.
    PayrollPaid(PayrollPaid),
    /// Reward points redeemed.
    RewardClaimed(RewardClaimed),
}

impl DomainEvent {
    /// Deterministic ledger reference for this event.
    #[must_use]
    pub fn reference(&self) -> String {
        match self {
            Self::PayrollPaid(event) => event.reference(),
            Self::RewardClaimed(event) => event.reference(),
        }
    }
}

/// Result of handling one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeOutcome {
    /// A new posted transaction was written.
    Posted(Transaction),
    /// The event was already posted earlier.
    Skipped {
        /// The derived reference.
        reference: String,
        /// The transaction already carrying it.
        existing: TransactionId,
    },
}

impl BridgeOutcome {
    /// Returns true if this call wrote a transaction.
    #[must_use]
    pub const fn is_posted(&self) -> bool {
        matches!(self, Self::Posted(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_references_are_deterministic() {
        let payroll_id = Uuid::nil();
        let event = PayrollPaid {
            payroll_id,
            employee_id: EmployeeId::new(),
            net_salary: dec!(5000000),
            period_month: 5,
            period_year: 2025,
            pay_date: NaiveDate::from_ymd_opt(2025, 5, 31).unwrap(),
        };
        assert_eq!(event.reference(), format!("PAY-{payroll_id}"));
        assert_eq!(DomainEvent::PayrollPaid(event.clone()).reference(), event.reference());
    }

    #[test]
    fn test_event_tagged_serde() {
        let event = DomainEvent::RewardClaimed(RewardClaimed {
            claim_id: Uuid::nil(),
            employee_id: EmployeeId::new(),
            points: 12,
            title: "Voucher".to_string(),
            claimed_date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "reward_claimed");
        assert_eq!(json["points"], 12);

        let back: DomainEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
