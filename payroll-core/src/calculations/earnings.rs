//! Earnings, deductions and PTO for a single paycheck.
//!
//! | Line      | Amount |
//! |-----------|--------|
//! | Regular   | hours × rate (rate defaults to the employee's pay rate) |
//! | Overtime  | hours × rate × multiplier (default 1.5) |
//! | Other     | bonus + commission + tips |
//! | Gross     | sum of the lines above, each rounded to the cent |
//!
//! Reimbursements are carried on the paystub but are not wages.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calculations::common::round_half_up;
use crate::models::{DeductionElections, Deductions, Earnings, PtoActivity};

pub const DEFAULT_OVERTIME_MULTIPLIER: Decimal = dec!(1.5);

/// Request data rejected before anything is computed or stored.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: Decimal },

    #[error("pay period ends {end} before it starts {start}")]
    PeriodOutOfOrder { start: NaiveDate, end: NaiveDate },

    #[error("deductions and taxes exceed gross pay; net would be {0}")]
    NegativeNetPay(Decimal),

    #[error("net pay {0} cannot be spelled out")]
    AmountOutOfRange(Decimal),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EarningsInput {
    pub regular_hours: Decimal,
    /// Overrides the employee's pay rate for this paycheck.
    pub hourly_rate: Option<Decimal>,
    pub overtime_hours: Decimal,
    pub overtime_multiplier: Option<Decimal>,
    pub bonus: Decimal,
    pub commission: Decimal,
    pub tips: Decimal,
    pub reimbursements: Decimal,
}

/// Per-paycheck deduction amounts. `None` falls back to the employee's
/// standing election.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeductionOverrides {
    pub retirement_401k: Option<Decimal>,
    pub hsa: Option<Decimal>,
    pub fsa: Option<Decimal>,
    pub health_insurance: Option<Decimal>,
    pub dental_insurance: Option<Decimal>,
    pub vision_insurance: Option<Decimal>,
    pub life_insurance: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PtoUsage {
    pub vacation_hours: Decimal,
    pub sick_hours: Decimal,
    pub personal_hours: Decimal,
}

fn non_negative(field: &'static str, value: Decimal) -> Result<(), InputError> {
    if value < Decimal::ZERO {
        Err(InputError::Negative { field, value })
    } else {
        Ok(())
    }
}

fn non_negative_opt(field: &'static str, value: Option<Decimal>) -> Result<(), InputError> {
    value.map_or(Ok(()), |v| non_negative(field, v))
}

impl EarningsInput {
    /// # Errors
    ///
    /// [`InputError::Negative`] for any negative hours, rate, multiplier
    /// or amount.
    pub fn validate(&self) -> Result<(), InputError> {
        non_negative("regular_hours", self.regular_hours)?;
        non_negative_opt("hourly_rate", self.hourly_rate)?;
        non_negative("overtime_hours", self.overtime_hours)?;
        non_negative_opt("overtime_multiplier", self.overtime_multiplier)?;
        non_negative("bonus", self.bonus)?;
        non_negative("commission", self.commission)?;
        non_negative("tips", self.tips)?;
        non_negative("reimbursements", self.reimbursements)
    }
}

impl DeductionOverrides {
    pub fn validate(&self) -> Result<(), InputError> {
        non_negative_opt("retirement_401k", self.retirement_401k)?;
        non_negative_opt("hsa", self.hsa)?;
        non_negative_opt("fsa", self.fsa)?;
        non_negative_opt("health_insurance", self.health_insurance)?;
        non_negative_opt("dental_insurance", self.dental_insurance)?;
        non_negative_opt("vision_insurance", self.vision_insurance)?;
        non_negative_opt("life_insurance", self.life_insurance)
    }
}

impl PtoUsage {
    pub fn validate(&self) -> Result<(), InputError> {
        non_negative("vacation_hours", self.vacation_hours)?;
        non_negative("sick_hours", self.sick_hours)?;
        non_negative("personal_hours", self.personal_hours)
    }
}

pub fn compute_earnings(input: &EarningsInput, default_rate: Decimal) -> Earnings {
    let rate = input.hourly_rate.unwrap_or(default_rate);
    let multiplier = input
        .overtime_multiplier
        .unwrap_or(DEFAULT_OVERTIME_MULTIPLIER);
    let overtime_rate = rate * multiplier;

    let regular_pay = round_half_up(input.regular_hours * rate);
    let overtime_pay = round_half_up(input.overtime_hours * overtime_rate);
    let bonus = round_half_up(input.bonus);
    let commission = round_half_up(input.commission);
    let tips = round_half_up(input.tips);

    Earnings {
        regular_hours: input.regular_hours,
        regular_rate: rate,
        regular_pay,
        overtime_hours: input.overtime_hours,
        overtime_multiplier: multiplier,
        overtime_rate,
        overtime_pay,
        bonus,
        commission,
        tips,
        reimbursements: round_half_up(input.reimbursements),
        gross: regular_pay + overtime_pay + bonus + commission + tips,
    }
}

/// A positive 401(k) election percentage wins over a fixed request amount.
pub fn compute_deductions(
    gross: Decimal,
    elections: &DeductionElections,
    overrides: &DeductionOverrides,
) -> Deductions {
    let retirement_401k = if elections.retirement_401k_percent > Decimal::ZERO {
        gross * elections.retirement_401k_percent / dec!(100)
    } else {
        overrides.retirement_401k.unwrap_or_default()
    };
    let pick = |value: Option<Decimal>, election: Decimal| round_half_up(value.unwrap_or(election));

    Deductions {
        retirement_401k: round_half_up(retirement_401k),
        hsa: round_half_up(overrides.hsa.unwrap_or_default()),
        fsa: round_half_up(overrides.fsa.unwrap_or_default()),
        health_insurance: pick(overrides.health_insurance, elections.health_insurance),
        dental_insurance: pick(overrides.dental_insurance, elections.dental_insurance),
        vision_insurance: pick(overrides.vision_insurance, elections.vision_insurance),
        life_insurance: pick(overrides.life_insurance, elections.life_insurance),
    }
}

/// Vacation accrues per hour worked; sick time at half that. Personal time
/// is only ever used.
pub fn compute_pto_activity(
    earnings: &Earnings,
    accrual_rate: Decimal,
    usage: &PtoUsage,
) -> PtoActivity {
    let vacation_accrued = earnings.hours_worked() * accrual_rate;

    PtoActivity {
        vacation_accrued,
        vacation_used: usage.vacation_hours,
        sick_accrued: vacation_accrued / dec!(2),
        sick_used: usage.sick_hours,
        personal_used: usage.personal_hours,
    }
}

/// # Errors
///
/// [`InputError::NegativeNetPay`] when taxes and deductions exceed gross.
pub fn compute_net_pay(
    gross: Decimal,
    total_taxes: Decimal,
    total_deductions: Decimal,
) -> Result<Decimal, InputError> {
    let net = gross - total_taxes - total_deductions;
    if net < Decimal::ZERO {
        return Err(InputError::NegativeNetPay(net));
    }
    Ok(net)
}
