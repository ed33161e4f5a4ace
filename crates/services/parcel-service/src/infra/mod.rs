//! Infrastructure layer - database, migrations and the unit of work.

mod db;
pub mod migrations;
mod unit_of_work;

pub use db::{ping, Database};
pub use migrations::Migrator;
pub use unit_of_work::{Persistence, TransactionContext, TxFuture, UnitOfWork};
