//! Repository implementations backed by `SeaORM`.

pub mod ledger;

pub use ledger::SeaOrmLedgerRepository;
