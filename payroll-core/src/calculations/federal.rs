//! Federal income tax withholding under the annualized percentage method.
//!
//! | Step | Description |
//! |------|-------------|
//! | 1    | Per-period gross × periods per year (52, 26, 24 or 12) |
//! | 2    | Minus the filing-status standard deduction, floored at zero |
//! | 3    | Marginal brackets for the filing status |
//! | 4    | Annual tax ÷ periods per year, rounded half-up to the cent |
//! | 5    | Plus the employee's extra per-period withholding |

use rust_decimal::Decimal;

use crate::calculations::WithholdingError;
use crate::calculations::common::{annualized_withholding, max, round_half_up};
use crate::models::{FilingStatus, JurisdictionTable, PayFrequency};

/// Federal income tax to withhold from one paycheck.
///
/// # Errors
///
/// Returns [`WithholdingError::MissingFederalSchedule`] when the table has
/// no schedule for `filing_status`.
pub fn compute_federal_income_tax(
    table: &JurisdictionTable,
    gross: Decimal,
    filing_status: FilingStatus,
    pay_frequency: PayFrequency,
    extra_withholding: Decimal,
) -> Result<Decimal, WithholdingError> {
    let parameters = table
        .federal(filing_status)
        .ok_or(WithholdingError::MissingFederalSchedule(filing_status))?;

    let tax = annualized_withholding(
        max(gross, Decimal::ZERO),
        pay_frequency.periods_per_year_decimal(),
        parameters.standard_deduction,
        &parameters.brackets,
    );

    Ok(tax + round_half_up(extra_withholding))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::{BracketSchedule, FederalFilingParameters, TaxBracket};
    use crate::test_support::sample_table;

    fn with_head_of_household() -> JurisdictionTable {
        sample_table().with_federal(
            FilingStatus::HeadOfHousehold,
            FederalFilingParameters {
                standard_deduction: dec!(21900),
                additional_medicare_threshold: dec!(200000),
                brackets: BracketSchedule::new(vec![
                    TaxBracket::new(Some(dec!(16550)), dec!(0.10)),
                    TaxBracket::new(Some(dec!(63100)), dec!(0.12)),
                    TaxBracket::new(None, dec!(0.22)),
                ]),
            },
        )
    }

    #[test]
    fn single_biweekly_spans_two_brackets() {
        // 2000 × 26 = 52000 − 14600 = 37400
        // 11600 × 10% + 25800 × 12% = 4256 / 26 = 163.69
        let result = compute_federal_income_tax(
            &sample_table(),
            dec!(2000),
            FilingStatus::Single,
            PayFrequency::Biweekly,
            dec!(0),
        )
        .unwrap();

        assert_eq!(result, dec!(163.69));
    }

    #[test]
    fn extra_withholding_is_added_after_rounding() {
        let result = compute_federal_income_tax(
            &sample_table(),
            dec!(2000),
            FilingStatus::Single,
            PayFrequency::Biweekly,
            dec!(25),
        )
        .unwrap();

        assert_eq!(result, dec!(188.69));
    }

    #[test]
    fn married_monthly_uses_married_schedule() {
        // 120000 − 29200 = 90800; 2320 + 67600 × 12% = 10432 / 12
        let result = compute_federal_income_tax(
            &sample_table(),
            dec!(10000),
            FilingStatus::Married,
            PayFrequency::Monthly,
            dec!(0),
        )
        .unwrap();

        assert_eq!(result, dec!(869.33));
    }

    #[test]
    fn income_below_standard_deduction_withholds_nothing() {
        let result = compute_federal_income_tax(
            &sample_table(),
            dec!(250),
            FilingStatus::Single,
            PayFrequency::Weekly,
            dec!(0),
        )
        .unwrap();

        assert_eq!(result, dec!(0.00));
    }

    #[test]
    fn missing_filing_status_is_an_error() {
        let result = compute_federal_income_tax(
            &sample_table(),
            dec!(2000),
            FilingStatus::HeadOfHousehold,
            PayFrequency::Biweekly,
            dec!(0),
        );

        assert_eq!(
            result,
            Err(WithholdingError::MissingFederalSchedule(
                FilingStatus::HeadOfHousehold
            ))
        );
    }

    #[test]
    fn half_cent_per_period_rounds_up_every_time() {
        let table = with_head_of_household();
        let monthly = |gross| {
            compute_federal_income_tax(
                &table,
                gross,
                FilingStatus::HeadOfHousehold,
                PayFrequency::Monthly,
                dec!(0),
            )
            .unwrap()
        };

        // 24000.60 − 21900 = 2100.60 × 10% = 210.06 / 12 = 17.505
        assert_eq!(monthly(dec!(2000.05)), dec!(17.51));
        // 24003.00 − 21900 = 2103.00 × 10% = 210.30 / 12 = 17.525
        assert_eq!(monthly(dec!(2000.25)), dec!(17.53));

        let repeated: Vec<_> = (0..100).map(|_| monthly(dec!(2000.05))).collect();
        assert!(repeated.iter().all(|tax| *tax == dec!(17.51)));
    }
}
