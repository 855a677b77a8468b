//! State income tax, state disability insurance and local income tax.

use rust_decimal::Decimal;

use crate::calculations::WithholdingError;
use crate::calculations::common::{annualized_withholding, max, portion_under_cap, round_half_up};
use crate::models::{FilingStatus, JurisdictionTable, PayFrequency, StateTaxEntry, StateTaxRegime};

/// Canonical form of a state code as keyed in the table.
pub fn normalize_state(state: &str) -> String {
    state.trim().to_ascii_uppercase()
}

fn lookup_state<'a>(
    table: &'a JurisdictionTable,
    state: &str,
) -> Result<&'a StateTaxEntry, WithholdingError> {
    let code = normalize_state(state);
    table
        .state(&code)
        .ok_or(WithholdingError::UnknownState(code))
}

/// State income tax for one paycheck.
///
/// Progressive states use the federal-style annualized method on the state's
/// schedule with no standard deduction. State schedules are not split by
/// filing status, so `_filing_status` does not affect the result.
///
/// # Errors
///
/// Returns [`WithholdingError::UnknownState`] for a state the table lacks.
pub fn compute_state_income_tax(
    table: &JurisdictionTable,
    gross: Decimal,
    state: &str,
    _filing_status: FilingStatus,
    pay_frequency: PayFrequency,
    extra_withholding: Decimal,
) -> Result<Decimal, WithholdingError> {
    let entry = lookup_state(table, state)?;
    let gross = max(gross, Decimal::ZERO);

    let tax = match &entry.regime {
        StateTaxRegime::None => Decimal::ZERO,
        StateTaxRegime::Flat { rate } => round_half_up(gross * rate + extra_withholding),
        StateTaxRegime::Progressive { schedule } => {
            annualized_withholding(
                gross,
                pay_frequency.periods_per_year_decimal(),
                Decimal::ZERO,
                schedule,
            ) + round_half_up(extra_withholding)
        }
    };

    Ok(tax)
}

/// State disability insurance, capped by the state's wage base on
/// year-to-date gross when one is declared.
///
/// # Errors
///
/// Returns [`WithholdingError::UnknownState`] for a state the table lacks.
pub fn compute_state_disability_tax(
    table: &JurisdictionTable,
    gross: Decimal,
    state: &str,
    ytd_gross: Decimal,
) -> Result<Decimal, WithholdingError> {
    let entry = lookup_state(table, state)?;

    let Some(sdi) = &entry.sdi else {
        return Ok(Decimal::ZERO);
    };

    let taxable = match sdi.wage_base {
        Some(base) => portion_under_cap(gross, ytd_gross, base),
        None => max(gross, Decimal::ZERO),
    };

    Ok(round_half_up(taxable * sdi.rate))
}

/// Flat local income tax. No locality means no local tax.
///
/// # Errors
///
/// Returns [`WithholdingError::UnknownLocality`] when a locality is given
/// but has no configured rate in `state`.
pub fn compute_local_income_tax(
    table: &JurisdictionTable,
    gross: Decimal,
    state: &str,
    locality: Option<&str>,
) -> Result<Decimal, WithholdingError> {
    let Some(locality) = locality.map(str::trim).filter(|l| !l.is_empty()) else {
        return Ok(Decimal::ZERO);
    };
    let state = normalize_state(state);

    let rate = table
        .local_rate(&state, locality)
        .ok_or_else(|| WithholdingError::UnknownLocality {
            state: state.clone(),
            locality: locality.to_string(),
        })?;

    Ok(round_half_up(max(gross, Decimal::ZERO) * rate))
}
