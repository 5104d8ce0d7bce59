pub mod sqlite;

pub use sqlite::SqliteLoanStore;
