//! Withholding and paycheck calculations.
//!
//! Pure functions over a [`JurisdictionTable`](crate::models::JurisdictionTable):
//! nothing here reads or writes persistent state. Every tax item is rounded
//! half-up to the cent where it is computed and subtotals are sums of those
//! rounded items.

pub mod amount_words;
pub mod common;
pub mod earnings;
pub mod federal;
pub mod fica;
pub mod state;
pub mod withholding;

pub use amount_words::amount_in_words;
pub use earnings::{
    DEFAULT_OVERTIME_MULTIPLIER, DeductionOverrides, EarningsInput, InputError, PtoUsage,
    compute_deductions, compute_earnings, compute_net_pay, compute_pto_activity,
};
pub use federal::compute_federal_income_tax;
pub use fica::{MedicareTax, compute_medicare_tax, compute_social_security_tax};
pub use state::{compute_local_income_tax, compute_state_disability_tax, compute_state_income_tax};
pub use withholding::{JurisdictionContext, WithholdingError, YtdContext, compute_all};
