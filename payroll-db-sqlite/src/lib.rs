//! SQLite storage for the payroll engine.

mod decimal;
mod factory;
mod repository;

pub use factory::{SqliteRepositoryFactory, connection_url};
pub use repository::SqliteRepository;
