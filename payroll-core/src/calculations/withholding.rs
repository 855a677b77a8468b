use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::calculations::federal::compute_federal_income_tax;
use crate::calculations::fica::{compute_medicare_tax, compute_social_security_tax};
use crate::calculations::state::{
    compute_local_income_tax, compute_state_disability_tax, compute_state_income_tax,
    normalize_state,
};
use crate::models::{Employee, FilingStatus, JurisdictionTable, PayFrequency, Withholding, YtdLedger};

/// Jurisdiction lookups that failed. These are configuration problems and
/// never resolve to a zero tax.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WithholdingError {
    #[error("no tax table for state '{0}'")]
    UnknownState(String),

    #[error("no local tax rate for '{locality}' in {state}")]
    UnknownLocality { state: String, locality: String },

    #[error("no federal schedule for filing status {0}")]
    MissingFederalSchedule(FilingStatus),
}

/// Who and where is being taxed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JurisdictionContext {
    pub state: String,
    pub locality: Option<String>,
    pub filing_status: FilingStatus,
    pub pay_frequency: PayFrequency,
    pub federal_extra_withholding: Decimal,
    pub state_extra_withholding: Decimal,
}

impl JurisdictionContext {
    pub fn for_employee(employee: &Employee) -> Self {
        Self {
            state: normalize_state(&employee.state),
            locality: employee.locality.clone(),
            filing_status: employee.filing_status,
            pay_frequency: employee.pay_frequency,
            federal_extra_withholding: employee.federal_additional_withholding,
            state_extra_withholding: employee.state_additional_withholding,
        }
    }
}

/// Year-to-date wage bases as they stood before the current paycheck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct YtdContext {
    pub ss_wages: Decimal,
    pub medicare_wages: Decimal,
    pub gross: Decimal,
}

impl From<&YtdLedger> for YtdContext {
    fn from(ledger: &YtdLedger) -> Self {
        Self {
            ss_wages: ledger.ss_wages,
            medicare_wages: ledger.medicare_wages,
            gross: ledger.gross,
        }
    }
}

/// Every tax for one paycheck, itemized.
///
/// # Errors
///
/// Fails on the first unknown state, locality or filing status.
pub fn compute_all(
    table: &JurisdictionTable,
    gross: Decimal,
    jurisdiction: &JurisdictionContext,
    ytd: &YtdContext,
) -> Result<Withholding, WithholdingError> {
    let federal_income_tax = compute_federal_income_tax(
        table,
        gross,
        jurisdiction.filing_status,
        jurisdiction.pay_frequency,
        jurisdiction.federal_extra_withholding,
    )?;
    let social_security_tax = compute_social_security_tax(table, gross, ytd.ss_wages);
    let medicare = compute_medicare_tax(
        table,
        gross,
        jurisdiction.filing_status,
        ytd.medicare_wages,
    )?;
    let state_income_tax = compute_state_income_tax(
        table,
        gross,
        &jurisdiction.state,
        jurisdiction.filing_status,
        jurisdiction.pay_frequency,
        jurisdiction.state_extra_withholding,
    )?;
    let state_disability_tax =
        compute_state_disability_tax(table, gross, &jurisdiction.state, ytd.gross)?;
    let local_income_tax = compute_local_income_tax(
        table,
        gross,
        &jurisdiction.state,
        jurisdiction.locality.as_deref(),
    )?;

    let withholding = Withholding {
        federal_income_tax,
        social_security_tax,
        medicare_tax: medicare.base,
        additional_medicare_tax: medicare.additional,
        state_income_tax,
        state_disability_tax,
        local_income_tax,
    };

    debug!(
        %gross,
        state = %jurisdiction.state,
        total = %withholding.total(),
        "computed withholding"
    );

    Ok(withholding)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::test_support::sample_table;

    fn context(state: &str, locality: Option<&str>) -> JurisdictionContext {
        JurisdictionContext {
            state: state.to_string(),
            locality: locality.map(str::to_string),
            filing_status: FilingStatus::Single,
            pay_frequency: PayFrequency::Biweekly,
            federal_extra_withholding: dec!(0),
            state_extra_withholding: dec!(0),
        }
    }

    #[test]
    fn compute_all_itemizes_california_paycheck() {
        let result = compute_all(
            &sample_table(),
            dec!(2000),
            &context("CA", None),
            &YtdContext::default(),
        )
        .unwrap();

        assert_eq!(
            result,
            Withholding {
                federal_income_tax: dec!(163.69),
                social_security_tax: dec!(124.00),
                medicare_tax: dec!(29.00),
                additional_medicare_tax: dec!(0.00),
                state_income_tax: dec!(67.04),
                state_disability_tax: dec!(18.00),
                local_income_tax: dec!(0),
            }
        );
        assert_eq!(result.total_federal(), dec!(316.69));
        assert_eq!(result.total_state(), dec!(85.04));
        assert_eq!(result.total(), dec!(401.73));
    }

    #[test]
    fn compute_all_includes_local_tax() {
        let result = compute_all(
            &sample_table(),
            dec!(2000),
            &context("NY", Some("New York City")),
            &YtdContext::default(),
        )
        .unwrap();

        assert_eq!(result.local_income_tax, dec!(77.52));
        assert_eq!(result.total(), dec!(497.86));
    }

    #[test]
    fn compute_all_uses_ytd_wage_bases() {
        let ytd = YtdContext {
            ss_wages: dec!(168000),
            medicare_wages: dec!(199000),
            gross: dec!(168000),
        };

        let result = compute_all(&sample_table(), dec!(3000), &context("TX", None), &ytd).unwrap();

        assert_eq!(result.social_security_tax, dec!(37.20));
        assert_eq!(result.additional_medicare_tax, dec!(18.00));
    }

    #[test]
    fn compute_all_rejects_unknown_state() {
        let result = compute_all(
            &sample_table(),
            dec!(2000),
            &context("XX", None),
            &YtdContext::default(),
        );

        assert_eq!(result, Err(WithholdingError::UnknownState("XX".to_string())));
    }
}
