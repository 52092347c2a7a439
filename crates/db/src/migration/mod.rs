//! Database migrations for the ledger schema.

pub use sea_orm_migration::prelude::*;

mod m20260108_000001_initial;

/// Runs the ledger schema migrations.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20260108_000001_initial::Migration)]
    }
}
