//! Application configuration management.

use serde::Deserialize;
use uuid::Uuid;

use crate::types::UserId;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Ledger configuration.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Payroll/reward integration configuration.
    #[serde(default)]
    pub integration: IntegrationConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Timeout for establishing a new connection.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Timeout for acquiring a pooled connection.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_acquire_timeout() -> u64 {
    5
}

/// Ledger configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedgerConfig {
    /// Number of fractional digits in one major currency unit (0 for rupiah).
    #[serde(default)]
    pub minor_unit_scale: u32,
}

/// Integration bridge configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct IntegrationConfig {
    /// User recorded as `created_by` on bridge transactions.
    #[serde(default = "default_system_user_id")]
    pub system_user_id: UserId,
    /// Control accounts for payroll events.
    #[serde(default)]
    pub payroll: PayrollAccountsConfig,
    /// Control accounts and conversion for reward events.
    #[serde(default)]
    pub reward: RewardAccountsConfig,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            system_user_id: default_system_user_id(),
            payroll: PayrollAccountsConfig::default(),
            reward: RewardAccountsConfig::default(),
        }
    }
}

fn default_system_user_id() -> UserId {
    UserId::from_uuid(Uuid::nil())
}

/// Payroll control account codes.
#[derive(Debug, Clone, Deserialize)]
pub struct PayrollAccountsConfig {
    /// Salary expense account code.
    #[serde(default = "default_salary_expense_code")]
    pub expense_code: String,
    /// Salary payable account code.
    #[serde(default = "default_salary_payable_code")]
    pub payable_code: String,
}

impl Default for PayrollAccountsConfig {
    fn default() -> Self {
        Self {
            expense_code: default_salary_expense_code(),
            payable_code: default_salary_payable_code(),
        }
    }
}

fn default_salary_expense_code() -> String {
    "5000".to_string()
}

fn default_salary_payable_code() -> String {
    "2100".to_string()
}

/// Reward control account codes.
#[derive(Debug, Clone, Deserialize)]
pub struct RewardAccountsConfig {
    /// Reward expense account code.
    #[serde(default = "default_reward_expense_code")]
    pub expense_code: String,
    /// Cash account the reward is paid from.
    #[serde(default = "default_cash_code")]
    pub cash_code: String,
    /// Minor units paid out per reward point.
    #[serde(default = "default_point_value")]
    pub point_value: i64,
}

impl Default for RewardAccountsConfig {
    fn default() -> Self {
        Self {
            expense_code: default_reward_expense_code(),
            cash_code: default_cash_code(),
            point_value: default_point_value(),
        }
    }
}

fn default_reward_expense_code() -> String {
    "5100".to_string()
}

fn default_cash_code() -> String {
    "1000".to_string()
}

fn default_point_value() -> i64 {
    1_000
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Sources, later ones winning: `config/default`, `config/{RUN_MODE}`,
    /// then `BUKU__*` environment variables (`BUKU__DATABASE__URL`).
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("BUKU")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
