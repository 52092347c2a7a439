//! Migration runner for the ledger schema.
//!
//! Usage:
//!   migrator up      - Apply pending migrations
//!   migrator down    - Roll back the last migration
//!   migrator status  - Show applied migrations
//!   migrator fresh   - Drop the ledger schema and re-apply it
//!
//! Reads `DATABASE_URL` from the environment or `.env`.

use buku_db::migration::Migrator;
use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // The migrator CLI installs its own tracing subscriber
    cli::run_cli(Migrator).await;
}
