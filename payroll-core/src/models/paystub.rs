use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{PayFrequency, Withholding, YtdLedger};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaystubStatus {
    Draft,
    Finalized,
    Voided,
}

impl PaystubStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Finalized => "finalized",
            Self::Voided => "voided",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "finalized" => Some(Self::Finalized),
            "voided" => Some(Self::Voided),
            _ => None,
        }
    }
}

impl fmt::Display for PaystubStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Earnings breakdown. Each pay line is rounded to the cent; `gross` is
/// their sum. Reimbursements are recorded but are not wages.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Earnings {
    pub regular_hours: Decimal,
    pub regular_rate: Decimal,
    pub regular_pay: Decimal,
    pub overtime_hours: Decimal,
    pub overtime_multiplier: Decimal,
    pub overtime_rate: Decimal,
    pub overtime_pay: Decimal,
    pub bonus: Decimal,
    pub commission: Decimal,
    pub tips: Decimal,
    pub reimbursements: Decimal,
    pub gross: Decimal,
}

impl Earnings {
    pub fn hours_worked(&self) -> Decimal {
        self.regular_hours + self.overtime_hours
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Deductions {
    pub retirement_401k: Decimal,
    pub hsa: Decimal,
    pub fsa: Decimal,
    pub health_insurance: Decimal,
    pub dental_insurance: Decimal,
    pub vision_insurance: Decimal,
    pub life_insurance: Decimal,
}

impl Deductions {
    pub fn pre_tax_total(&self) -> Decimal {
        self.retirement_401k + self.hsa + self.fsa
    }

    pub fn post_tax_total(&self) -> Decimal {
        self.health_insurance + self.dental_insurance + self.vision_insurance + self.life_insurance
    }

    pub fn total(&self) -> Decimal {
        self.pre_tax_total() + self.post_tax_total()
    }
}

/// PTO hours accrued and taken on one paystub.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PtoActivity {
    pub vacation_accrued: Decimal,
    pub vacation_used: Decimal,
    pub sick_accrued: Decimal,
    pub sick_used: Decimal,
    pub personal_used: Decimal,
}

/// What one paystub adds to the employee's [`YtdLedger`]. Stored with the
/// paystub so a void subtracts exactly these numbers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LedgerDelta {
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
    pub vacation_accrued: Decimal,
    pub vacation_used: Decimal,
    pub sick_accrued: Decimal,
    pub sick_used: Decimal,
    pub personal_used: Decimal,
}

impl LedgerDelta {
    pub fn from_parts(
        earnings: &Earnings,
        withholding: &Withholding,
        deductions: &Deductions,
        pto: &PtoActivity,
        net_pay: Decimal,
    ) -> Self {
        Self {
            gross: earnings.gross,
            overtime_pay: earnings.overtime_pay,
            bonus: earnings.bonus,
            ss_wages: earnings.gross,
            medicare_wages: earnings.gross,
            net_pay,
            federal_income_tax: withholding.federal_income_tax,
            state_income_tax: withholding.state_income_tax,
            sdi_tax: withholding.state_disability_tax,
            local_tax: withholding.local_income_tax,
            social_security_tax: withholding.social_security_tax,
            medicare_tax: withholding.medicare_total(),
            retirement_401k: deductions.retirement_401k,
            health_insurance: deductions.health_insurance,
            vacation_accrued: pto.vacation_accrued,
            vacation_used: pto.vacation_used,
            sick_accrued: pto.sick_accrued,
            sick_used: pto.sick_used,
            personal_used: pto.personal_used,
        }
    }
}

/// A computed paystub that has not been stored yet (the `draft` state).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPaystub {
    pub verification_id: String,
    pub account_id: i64,
    pub employee_id: i64,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub pay_date: NaiveDate,
    pub pay_frequency: PayFrequency,
    pub state: String,
    pub locality: Option<String>,
    pub earnings: Earnings,
    pub withholding: Withholding,
    pub deductions: Deductions,
    pub net_pay: Decimal,
    pub amount_in_words: String,
    pub pto: PtoActivity,
    pub ytd_before: YtdLedger,
    pub deltas: LedgerDelta,
    pub created_at: DateTime<Utc>,
}

/// A stored paystub. Nothing changes after finalization except the single
/// move to [`PaystubStatus::Voided`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paystub {
    pub id: i64,
    pub verification_id: String,
    pub account_id: i64,
    pub employee_id: i64,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub pay_date: NaiveDate,
    pub pay_frequency: PayFrequency,
    pub state: String,
    pub locality: Option<String>,
    pub earnings: Earnings,
    pub withholding: Withholding,
    pub deductions: Deductions,
    pub net_pay: Decimal,
    pub amount_in_words: String,
    pub pto: PtoActivity,
    pub ytd_before: YtdLedger,
    pub deltas: LedgerDelta,
    pub status: PaystubStatus,
    pub created_at: DateTime<Utc>,
    pub finalized_at: Option<DateTime<Utc>>,
    pub voided_at: Option<DateTime<Utc>>,
    pub void_reason: Option<String>,
}

impl Paystub {
    /// Stores `new` as finalized under `id`.
    pub fn finalize(id: i64, new: NewPaystub, finalized_at: DateTime<Utc>) -> Self {
        Self {
            id,
            verification_id: new.verification_id,
            account_id: new.account_id,
            employee_id: new.employee_id,
            period_start: new.period_start,
            period_end: new.period_end,
            pay_date: new.pay_date,
            pay_frequency: new.pay_frequency,
            state: new.state,
            locality: new.locality,
            earnings: new.earnings,
            withholding: new.withholding,
            deductions: new.deductions,
            net_pay: new.net_pay,
            amount_in_words: new.amount_in_words,
            pto: new.pto,
            ytd_before: new.ytd_before,
            deltas: new.deltas,
            status: PaystubStatus::Finalized,
            created_at: new.created_at,
            finalized_at: Some(finalized_at),
            voided_at: None,
            void_reason: None,
        }
    }

    pub fn is_voided(&self) -> bool {
        self.status == PaystubStatus::Voided
    }

    pub fn total_taxes(&self) -> Decimal {
        self.withholding.total()
    }

    pub fn total_deductions(&self) -> Decimal {
        self.deductions.total()
    }

    /// The employee's ledger as it stood right after this paystub.
    pub fn ytd_after(&self) -> YtdLedger {
        let mut after = self.ytd_before.clone();
        crate::ledger::add_delta(&mut after, &self.deltas);
        after
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn status_parse_accepts_every_code_it_emits() {
        for status in [
            PaystubStatus::Draft,
            PaystubStatus::Finalized,
            PaystubStatus::Voided,
        ] {
            assert_eq!(PaystubStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PaystubStatus::parse("deleted"), None);
    }

    #[test]
    fn deduction_totals_split_pre_and_post_tax() {
        let deductions = Deductions {
            retirement_401k: dec!(120.00),
            hsa: dec!(50.00),
            fsa: dec!(25.00),
            health_insurance: dec!(80.00),
            dental_insurance: dec!(10.00),
            vision_insurance: dec!(5.00),
            life_insurance: dec!(7.50),
        };

        assert_eq!(deductions.pre_tax_total(), dec!(195.00));
        assert_eq!(deductions.post_tax_total(), dec!(102.50));
        assert_eq!(deductions.total(), dec!(297.50));
    }

    #[test]
    fn delta_uses_medicare_total_and_gross_wage_bases() {
        let earnings = Earnings {
            gross: dec!(3000.00),
            ..Earnings::default()
        };
        let withholding = Withholding {
            medicare_tax: dec!(43.50),
            additional_medicare_tax: dec!(18.00),
            ..Withholding::default()
        };

        let delta = LedgerDelta::from_parts(
            &earnings,
            &withholding,
            &Deductions::default(),
            &PtoActivity::default(),
            dec!(2900.00),
        );

        assert_eq!(delta.ss_wages, dec!(3000.00));
        assert_eq!(delta.medicare_wages, dec!(3000.00));
        assert_eq!(delta.medicare_tax, dec!(61.50));
        assert_eq!(delta.net_pay, dec!(2900.00));
    }

    #[test]
    fn delta_carries_overtime_bonus_and_health_premium() {
        let earnings = Earnings {
            overtime_pay: dec!(281.25),
            bonus: dec!(500.00),
            gross: dec!(2781.25),
            ..Earnings::default()
        };
        let deductions = Deductions {
            health_insurance: dec!(85.50),
            dental_insurance: dec!(12.00),
            ..Deductions::default()
        };

        let delta = LedgerDelta::from_parts(
            &earnings,
            &Withholding::default(),
            &deductions,
            &PtoActivity::default(),
            dec!(2683.75),
        );

        assert_eq!(delta.overtime_pay, dec!(281.25));
        assert_eq!(delta.bonus, dec!(500.00));
        assert_eq!(delta.health_insurance, dec!(85.50));
    }
}
