//! Reference data for the payroll engine: the 2025 jurisdiction tables, the
//! CSV loader that validates them, and the shared logging setup.

pub mod loader;
pub mod logging;

pub use loader::{REQUIRED_STATES, TableLoadError, TableLoader, TableSources};
