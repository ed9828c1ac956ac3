pub mod connection;
pub mod migration_runner;
pub mod rate_store;

pub use connection::Database;
pub use rate_store::SqliteRateStore;
