//! Posts payroll and reward events into the ledger.
//!
//! Each event maps to one posted transaction between fixed control
//! accounts, keyed by a reference derived from the event's identity.
//! Replaying an event is a no-op.

use buku_shared::config::{IntegrationConfig, LedgerConfig};
use buku_shared::types::Amount;
use chrono::NaiveDate;
use tracing::{info, warn};

use super::events::{BridgeOutcome, DomainEvent, PayrollPaid, RewardClaimed};
use crate::ledger::{
    Account, AccountRegistry, CreateTransactionInput, JournalEntryInput, LedgerEngine, LedgerError,
};

/// Control account roles, used in error messages.
const SALARY_EXPENSE: &str = "salary expense";
const SALARY_PAYABLE: &str = "salary payable";
const REWARD_EXPENSE: &str = "reward expense";
const CASH: &str = "cash";

/// A fully resolved posting derived from an event.
struct Posting {
    reference: String,
    date: NaiveDate,
    description: String,
    debit: Account,
    credit: Account,
    amount: Amount,
}

/// Consumes domain events and posts them to the ledger.
#[derive(Clone)]
pub struct IntegrationBridge {
    registry: AccountRegistry,
    engine: LedgerEngine,
    config: IntegrationConfig,
    minor_unit_scale: u32,
}

impl IntegrationBridge {
    /// Creates a bridge posting through `engine` against control accounts
    /// resolved via `registry`.
    ///
    /// Decimal event amounts are converted at `ledger.minor_unit_scale`.
    #[must_use]
    pub fn new(
        registry: AccountRegistry,
        engine: LedgerEngine,
        config: IntegrationConfig,
        ledger: &LedgerConfig,
    ) -> Self {
        Self {
            registry,
            engine,
            config,
            minor_unit_scale: ledger.minor_unit_scale,
        }
    }

    /// Handles any supported event.
    ///
    /// # Errors
    ///
    /// See [`Self::on_payroll_paid`] and [`Self::on_reward_claimed`].
    pub async fn handle(&self, event: &DomainEvent) -> Result<BridgeOutcome, LedgerError> {
        match event {
            DomainEvent::PayrollPaid(event) => self.on_payroll_paid(event).await,
            DomainEvent::RewardClaimed(event) => self.on_reward_claimed(event).await,
        }
    }

    /// Posts a salary payment: debit salary expense, credit salary payable.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEvent` for a bad period or non-positive salary,
    /// `InvalidAmount` if the salary has more fractional digits than the
    /// minor unit allows, `MissingControlAccount`/`InactiveControlAccount`
    /// if a control account cannot be used, or any engine error.
    pub async fn on_payroll_paid(&self, event: &PayrollPaid) -> Result<BridgeOutcome, LedgerError> {
        if !(1..=12).contains(&event.period_month) {
            return Err(LedgerError::InvalidEvent(format!(
                "payroll period month must be 1-12, got {}",
                event.period_month
            )));
        }
        let net_salary = Amount::try_from_decimal(event.net_salary, self.minor_unit_scale)?;
        if !net_salary.is_positive() {
            return Err(LedgerError::InvalidEvent(format!(
                "net salary must be positive, got {}",
                event.net_salary
            )));
        }

        let accounts = &self.config.payroll;
        let debit = self
            .control_account(SALARY_EXPENSE, &accounts.expense_code)
            .await?;
        let credit = self
            .control_account(SALARY_PAYABLE, &accounts.payable_code)
            .await?;

        self.post(Posting {
            reference: event.reference(),
            date: event.pay_date,
            description: format!(
                "Gaji karyawan {} periode {:02}/{}",
                event.employee_id, event.period_month, event.period_year
            ),
            debit,
            credit,
            amount: net_salary,
        })
        .await
    }

    /// Posts a reward redemption: debit reward expense, credit cash.
    ///
    /// The amount is `points * point_value`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEvent` for non-positive points or amount,
    /// `InvalidAmount` on overflow, `MissingControlAccount`/
    /// `InactiveControlAccount`, or any engine error.
    pub async fn on_reward_claimed(
        &self,
        event: &RewardClaimed,
    ) -> Result<BridgeOutcome, LedgerError> {
        if event.points <= 0 {
            return Err(LedgerError::InvalidEvent(format!(
                "reward points must be positive, got {}",
                event.points
            )));
        }
        let accounts = &self.config.reward;
        let amount = Amount::from_minor(accounts.point_value).checked_mul(event.points)?;
        if !amount.is_positive() {
            return Err(LedgerError::InvalidEvent(format!(
                "reward amount must be positive, got {amount}"
            )));
        }

        let debit = self
            .control_account(REWARD_EXPENSE, &accounts.expense_code)
            .await?;
        let credit = self.control_account(CASH, &accounts.cash_code).await?;

        self.post(Posting {
            reference: event.reference(),
            date: event.claimed_date,
            description: format!(
                "Klaim reward '{}' oleh karyawan {} ({} poin)",
                event.title.trim(),
                event.employee_id,
                event.points
            ),
            debit,
            credit,
            amount,
        })
        .await
    }

    /// Resolves a control account by code; never falls back to another.
    async fn control_account(&self, role: &'static str, code: &str) -> Result<Account, LedgerError> {
        let account = self.registry.lookup_by_code(code).await?.ok_or_else(|| {
            warn!(role, account_code = code, "Control account missing");
            LedgerError::MissingControlAccount {
                role,
                code: code.to_string(),
            }
        })?;

        if !account.is_active {
            warn!(role, account_code = code, "Control account inactive");
            return Err(LedgerError::InactiveControlAccount {
                role,
                code: code.to_string(),
            });
        }
        Ok(account)
    }

    async fn post(&self, posting: Posting) -> Result<BridgeOutcome, LedgerError> {
        if let Some(existing) = self.engine.find_by_reference(&posting.reference).await? {
            info!(
                reference = %posting.reference,
                transaction_id = %existing.id,
                "Event already posted, skipping"
            );
            return Ok(BridgeOutcome::Skipped {
                reference: posting.reference,
                existing: existing.id,
            });
        }

        let input = CreateTransactionInput {
            date: posting.date,
            description: posting.description,
            reference: Some(posting.reference.clone()),
            entries: vec![
                JournalEntryInput::debit(posting.debit.id, posting.amount),
                JournalEntryInput::credit(posting.credit.id, posting.amount),
            ],
            created_by: self.config.system_user_id,
        };

        match self.engine.create_and_post(input).await {
            Ok(transaction) => {
                info!(
                    reference = %posting.reference,
                    transaction_id = %transaction.id,
                    debit_account = %posting.debit.code,
                    credit_account = %posting.credit.code,
                    amount = %posting.amount.to_decimal(self.minor_unit_scale),
                    "Event posted"
                );
                Ok(BridgeOutcome::Posted(transaction))
            }
            // Lost a race with a concurrent delivery of the same event
            Err(LedgerError::DuplicateReference(reference)) => {
                let existing = self
                    .engine
                    .find_by_reference(&reference)
                    .await?
                    .ok_or_else(|| LedgerError::DuplicateReference(reference.clone()))?;
                info!(reference = %reference, transaction_id = %existing.id, "Event already posted, skipping");
                Ok(BridgeOutcome::Skipped {
                    reference,
                    existing: existing.id,
                })
            }
            Err(err) => {
                warn!(reference = %posting.reference, error = %err, "Event posting rejected");
                Err(err)
            }
        }
    }
}
