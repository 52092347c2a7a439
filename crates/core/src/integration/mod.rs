//! Integration with payroll and reward subsystems.
//!
//! External subsystems publish [`DomainEvent`]s; the [`IntegrationBridge`]
//! turns each into exactly one posted ledger transaction.

pub mod bridge;
pub mod events;

pub use bridge::IntegrationBridge;
pub use events::{BridgeOutcome, DomainEvent, PayrollPaid, RewardClaimed};
