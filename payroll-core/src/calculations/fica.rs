//! Social Security and Medicare withholding.
//!
//! Social Security stops once year-to-date wages reach the wage base; a
//! paycheck that crosses the base is taxed only on the part below it.
//! Medicare has no cap, but wages above the filing-status threshold also owe
//! the Additional Medicare surtax.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::WithholdingError;
use crate::calculations::common::{max, portion_under_cap, round_half_up};
use crate::models::{FilingStatus, JurisdictionTable};

/// Medicare withheld from one paycheck, split into its two rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MedicareTax {
    pub base: Decimal,
    pub additional: Decimal,
}

impl MedicareTax {
    pub fn total(&self) -> Decimal {
        self.base + self.additional
    }
}

pub fn compute_social_security_tax(
    table: &JurisdictionTable,
    gross: Decimal,
    ytd_ss_wages: Decimal,
) -> Decimal {
    let fica = table.fica();
    let taxable = portion_under_cap(gross, ytd_ss_wages, fica.ss_wage_base);

    round_half_up(taxable * fica.ss_rate)
}

/// # Errors
///
/// Returns [`WithholdingError::MissingFederalSchedule`] when no
/// Additional Medicare threshold exists for `filing_status`.
pub fn compute_medicare_tax(
    table: &JurisdictionTable,
    gross: Decimal,
    filing_status: FilingStatus,
    ytd_medicare_wages: Decimal,
) -> Result<MedicareTax, WithholdingError> {
    let threshold = table
        .federal(filing_status)
        .ok_or(WithholdingError::MissingFederalSchedule(filing_status))?
        .additional_medicare_threshold;
    let fica = table.fica();
    let gross = max(gross, Decimal::ZERO);

    let surtaxed = if ytd_medicare_wages >= threshold {
        gross
    } else {
        max(ytd_medicare_wages + gross - threshold, Decimal::ZERO)
    };

    Ok(MedicareTax {
        base: round_half_up(gross * fica.medicare_rate),
        additional: round_half_up(surtaxed * fica.additional_medicare_rate),
    })
}
