use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::{FilingStatus, PayFrequency};

/// Vacation hours accrued per hour worked when an employee has no explicit rate.
pub const DEFAULT_PTO_ACCRUAL_RATE: Decimal = dec!(0.0384);

/// Standing per-paystub deduction elections. Request overrides win over these.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeductionElections {
    /// Percent of gross, e.g. `6` for 6%.
    pub retirement_401k_percent: Decimal,
    pub health_insurance: Decimal,
    pub dental_insurance: Decimal,
    pub vision_insurance: Decimal,
    pub life_insurance: Decimal,
}

/// Accrued and used hours for one kind of paid time off.
///
/// The balance is derived; it is refreshed by [`PtoBucket::recompute`] and
/// rebuilt on deserialization rather than read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "PtoHours")]
pub struct PtoBucket {
    pub accrued: Decimal,
    pub used: Decimal,
    balance: Decimal,
}

#[derive(Deserialize)]
struct PtoHours {
    accrued: Decimal,
    used: Decimal,
}

impl From<PtoHours> for PtoBucket {
    fn from(hours: PtoHours) -> Self {
        Self::new(hours.accrued, hours.used)
    }
}

impl PtoBucket {
    pub fn new(accrued: Decimal, used: Decimal) -> Self {
        Self {
            accrued,
            used,
            balance: accrued - used,
        }
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn recompute(&mut self) {
        self.balance = self.accrued - self.used;
    }
}

/// Year-to-date cumulative totals for one employee.
///
/// Wage and tax fields only grow, except when a void reverses a paystub's
/// stored deltas (see [`crate::ledger`]).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct YtdLedger {
    pub gross: Decimal,
    #[serde(default)]
    pub overtime_pay: Decimal,
    #[serde(default)]
    pub bonus: Decimal,
    pub ss_wages: Decimal,
    pub medicare_wages: Decimal,
    pub net_pay: Decimal,
    pub federal_income_tax: Decimal,
    pub state_income_tax: Decimal,
    pub sdi_tax: Decimal,
    pub local_tax: Decimal,
    pub social_security_tax: Decimal,
    pub medicare_tax: Decimal,
    pub retirement_401k: Decimal,
    #[serde(default)]
    pub health_insurance: Decimal,
    pub vacation: PtoBucket,
    pub sick: PtoBucket,
    pub personal: PtoBucket,
}

impl YtdLedger {
    /// Refreshes every PTO balance from its accrued and used hours.
    pub fn recompute_pto_balances(&mut self) {
        self.vacation.recompute();
        self.sick.recompute();
        self.personal.recompute();
    }
}

/// Fields supplied when creating an employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEmployee {
    pub account_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub pay_rate: Decimal,
    pub pay_frequency: PayFrequency,
    pub filing_status: FilingStatus,
    pub state: String,
    pub locality: Option<String>,
    pub federal_allowances: u32,
    pub state_allowances: u32,
    pub federal_additional_withholding: Decimal,
    pub state_additional_withholding: Decimal,
    #[serde(default)]
    pub elections: DeductionElections,
    #[serde(default = "default_pto_accrual_rate")]
    pub pto_accrual_rate: Decimal,
    pub hire_date: Option<NaiveDate>,
}

fn default_pto_accrual_rate() -> Decimal {
    DEFAULT_PTO_ACCRUAL_RATE
}

impl NewEmployee {
    /// An hourly single filer with no elections, used as a starting point.
    pub fn new(
        account_id: i64,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        pay_rate: Decimal,
        pay_frequency: PayFrequency,
        state: impl Into<String>,
    ) -> Self {
        Self {
            account_id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            pay_rate,
            pay_frequency,
            filing_status: FilingStatus::Single,
            state: state.into(),
            locality: None,
            federal_allowances: 0,
            state_allowances: 0,
            federal_additional_withholding: Decimal::ZERO,
            state_additional_withholding: Decimal::ZERO,
            elections: DeductionElections::default(),
            pto_accrual_rate: DEFAULT_PTO_ACCRUAL_RATE,
            hire_date: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    pub account_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub pay_rate: Decimal,
    pub pay_frequency: PayFrequency,
    pub filing_status: FilingStatus,
    pub state: String,
    pub locality: Option<String>,
    /// Carried for W-4 completeness; the bracket engine does not use them.
    pub federal_allowances: u32,
    pub state_allowances: u32,
    pub federal_additional_withholding: Decimal,
    pub state_additional_withholding: Decimal,
    pub elections: DeductionElections,
    pub pto_accrual_rate: Decimal,
    pub hire_date: Option<NaiveDate>,
    pub ytd: YtdLedger,
    /// Version of `ytd` as last read; the store rejects a ledger write
    /// carrying a stale value.
    #[serde(default)]
    pub ledger_version: i64,
}

impl Employee {
    pub fn from_new(id: i64, new: NewEmployee) -> Self {
        Self {
            id,
            account_id: new.account_id,
            first_name: new.first_name,
            last_name: new.last_name,
            pay_rate: new.pay_rate,
            pay_frequency: new.pay_frequency,
            filing_status: new.filing_status,
            state: new.state,
            locality: new.locality,
            federal_allowances: new.federal_allowances,
            state_allowances: new.state_allowances,
            federal_additional_withholding: new.federal_additional_withholding,
            state_additional_withholding: new.state_additional_withholding,
            elections: new.elections,
            pto_accrual_rate: new.pto_accrual_rate,
            hire_date: new.hire_date,
            ytd: YtdLedger::default(),
            ledger_version: 0,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
