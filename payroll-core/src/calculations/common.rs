//! Common utility functions for withholding calculations.
//!
//! This module provides shared functionality used across the federal, state
//! and FICA calculations: cent rounding and marginal bracket evaluation.

use rust_decimal::Decimal;

use crate::models::BracketSchedule;

/// Rounds a decimal value to exactly two decimal places using half-up rounding.
///
/// This follows standard financial rounding conventions where values at exactly
/// 0.005 are rounded up to 0.01 (away from zero).
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use payroll_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(123.454)), dec!(123.45));
/// assert_eq!(round_half_up(dec!(123.455)), dec!(123.46));
/// assert_eq!(round_half_up(dec!(-123.455)), dec!(-123.46)); // Away from zero
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
}

/// Returns the maximum of two decimal values.
pub fn max(
    a: Decimal,
    b: Decimal,
) -> Decimal {
    if a > b { a } else { b }
}

/// Returns the minimum of two decimal values.
pub fn min(
    a: Decimal,
    b: Decimal,
) -> Decimal {
    if a < b { a } else { b }
}

/// Tax on `income` under a marginal schedule, unrounded.
///
/// Each bracket taxes only the slice of income between the previous bound
/// and its own. Income at or below zero owes nothing.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use payroll_core::calculations::common::marginal_tax;
/// use payroll_core::models::{BracketSchedule, TaxBracket};
///
/// let schedule = BracketSchedule::new(vec![
///     TaxBracket::new(Some(dec!(10000)), dec!(0.10)),
///     TaxBracket::new(None, dec!(0.20)),
/// ]);
///
/// assert_eq!(marginal_tax(dec!(15000), &schedule), dec!(2000));
/// ```
pub fn marginal_tax(
    income: Decimal,
    schedule: &BracketSchedule,
) -> Decimal {
    let mut tax = Decimal::ZERO;
    let mut lower = Decimal::ZERO;

    for bracket in schedule.brackets() {
        if income <= lower {
            break;
        }
        let upper = match bracket.upper_bound {
            Some(bound) => min(income, bound),
            None => income,
        };
        tax += (upper - lower) * bracket.rate;
        match bracket.upper_bound {
            Some(bound) => lower = bound,
            None => break,
        }
    }

    tax
}

/// Per-period withholding under the annualized method, rounded to the cent.
///
/// Annualizes `gross` over `periods_per_year`, subtracts `deduction`
/// (floored at zero), applies the schedule and divides back down.
pub fn annualized_withholding(
    gross: Decimal,
    periods_per_year: Decimal,
    deduction: Decimal,
    schedule: &BracketSchedule,
) -> Decimal {
    let annual_wages = gross * periods_per_year;
    let taxable = max(annual_wages - deduction, Decimal::ZERO);
    let annual_tax = marginal_tax(taxable, schedule);

    round_half_up(annual_tax / periods_per_year)
}

/// The part of `amount` that still fits under `cap` after `already_counted`.
///
/// Used for every wage-base limit (Social Security, SDI).
pub fn portion_under_cap(
    amount: Decimal,
    already_counted: Decimal,
    cap: Decimal,
) -> Decimal {
    let remaining = max(cap - already_counted, Decimal::ZERO);
    min(max(amount, Decimal::ZERO), remaining)
}
