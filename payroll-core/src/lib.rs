pub mod calculations;
pub mod config;
pub mod db;
pub mod ledger;
pub mod lifecycle;
pub mod models;
pub mod quota;
pub mod verification;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{ConfigError, PayrollConfig};
pub use db::repository::{PayrollRepository, RepositoryError};
pub use lifecycle::{PaystubError, PaystubPreview, PaystubRequest, PaystubService};
pub use models::*;
