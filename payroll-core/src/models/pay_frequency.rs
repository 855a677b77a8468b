use std::fmt;

use chrono::{Datelike, Days, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Cadence of pay periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayFrequency {
    Weekly,
    Biweekly,
    Semimonthly,
    Monthly,
}

impl PayFrequency {
    pub const ALL: [PayFrequency; 4] = [
        Self::Weekly,
        Self::Biweekly,
        Self::Semimonthly,
        Self::Monthly,
    ];

    /// Number of pay periods in a year; used to annualize and de-annualize
    /// per-period wages for bracket lookups.
    pub fn periods_per_year(&self) -> u32 {
        match self {
            Self::Weekly => 52,
            Self::Biweekly => 26,
            Self::Semimonthly => 24,
            Self::Monthly => 12,
        }
    }

    pub fn periods_per_year_decimal(&self) -> Decimal {
        Decimal::from(self.periods_per_year())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Semimonthly => "semimonthly",
            Self::Monthly => "monthly",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "weekly" => Some(Self::Weekly),
            "biweekly" => Some(Self::Biweekly),
            "semimonthly" => Some(Self::Semimonthly),
            "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }

    /// Suggests the pay date following `last_pay_date`.
    ///
    /// Semimonthly schedules pay on the 15th and on the last day of the
    /// month. Monthly schedules keep the day of month, clamped to the end of
    /// shorter months.
    pub fn next_pay_date(&self, last_pay_date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Weekly => last_pay_date.checked_add_days(Days::new(7)),
            Self::Biweekly => last_pay_date.checked_add_days(Days::new(14)),
            Self::Semimonthly => {
                if last_pay_date.day() < 15 {
                    last_pay_date.with_day(15)
                } else if last_pay_date.day() == 15 {
                    last_day_of_month(last_pay_date)
                } else {
                    last_pay_date
                        .with_day(1)?
                        .checked_add_months(Months::new(1))?
                        .with_day(15)
                }
            }
            // chrono clamps to the last valid day of the target month
            Self::Monthly => last_pay_date.checked_add_months(Months::new(1)),
        }
    }
}

fn last_day_of_month(date: NaiveDate) -> Option<NaiveDate> {
    date.with_day(1)?
        .checked_add_months(Months::new(1))?
        .pred_opt()
}

impl fmt::Display for PayFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
