//! Provisions the default chart of accounts.
//!
//! Safe to run repeatedly: accounts whose code already exists are left
//! untouched. After seeding, the configured integration control accounts
//! are checked so payroll and reward events can post.
//!
//! Usage: cargo run --bin seeder

use std::sync::Arc;

use anyhow::Context;
use buku_core::ledger::{AccountRegistry, AccountType, CreateAccountInput, LedgerRepository};
use buku_db::SeaOrmLedgerRepository;
use buku_shared::AppConfig;
use buku_shared::types::AccountId;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// One row of the default chart: code, name, type, parent code.
type ChartRow = (&'static str, &'static str, AccountType, Option<&'static str>);

/// Parents are listed before their children.
const DEFAULT_CHART: &[ChartRow] = &[
    ("1", "Aset", AccountType::Asset, None),
    ("1000", "Kas", AccountType::Asset, Some("1")),
    ("1100", "Bank", AccountType::Asset, Some("1")),
    ("1200", "Piutang Usaha", AccountType::Asset, Some("1")),
    ("2", "Kewajiban", AccountType::Liability, None),
    ("2000", "Utang Usaha", AccountType::Liability, Some("2")),
    ("2100", "Utang Gaji", AccountType::Liability, Some("2")),
    ("3", "Ekuitas", AccountType::Equity, None),
    ("3000", "Modal Pemilik", AccountType::Equity, Some("3")),
    ("3100", "Laba Ditahan", AccountType::Equity, Some("3")),
    ("4", "Pendapatan", AccountType::Revenue, None),
    ("4000", "Pendapatan Usaha", AccountType::Revenue, Some("4")),
    ("5", "Beban", AccountType::Expense, None),
    ("5000", "Beban Gaji", AccountType::Expense, Some("5")),
    ("5100", "Beban Insentif", AccountType::Expense, Some("5")),
    ("5200", "Beban Operasional", AccountType::Expense, Some("5")),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "buku=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = buku_db::connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!("Connected to database");

    let repo: Arc<dyn LedgerRepository> = Arc::new(SeaOrmLedgerRepository::new(db));
    let registry = AccountRegistry::new(repo);

    let created = seed_chart(&registry).await?;
    info!(created, total = DEFAULT_CHART.len(), "Chart of accounts seeded");

    let integration = &config.integration;
    for code in [
        integration.payroll.expense_code.as_str(),
        integration.payroll.payable_code.as_str(),
        integration.reward.expense_code.as_str(),
        integration.reward.cash_code.as_str(),
    ] {
        match registry.lookup_by_code(code).await? {
            Some(account) if account.is_active => {}
            Some(_) => warn!(account_code = code, "Control account is inactive"),
            None => warn!(account_code = code, "Control account is missing"),
        }
    }

    Ok(())
}

/// Creates every chart row whose code does not exist yet.
///
/// Returns the number of accounts created.
async fn seed_chart(registry: &AccountRegistry) -> anyhow::Result<usize> {
    let mut created = 0;

    for &(code, name, account_type, parent_code) in DEFAULT_CHART {
        if registry.lookup_by_code(code).await?.is_some() {
            info!(account_code = code, "Account already exists, skipping");
            continue;
        }

        let parent_id = match parent_code {
            Some(parent) => Some(resolve(registry, parent).await?),
            None => None,
        };

        registry
            .create_account(CreateAccountInput {
                code: code.to_string(),
                name: name.to_string(),
                account_type,
                parent_id,
            })
            .await
            .with_context(|| format!("Failed to create account {code}"))?;
        created += 1;
    }

    Ok(created)
}

async fn resolve(registry: &AccountRegistry, code: &str) -> anyhow::Result<AccountId> {
    registry
        .lookup_by_code(code)
        .await?
        .map(|account| account.id)
        .with_context(|| format!("Parent account {code} not found"))
}
