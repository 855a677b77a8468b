use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::{DeductionOverrides, EarningsInput, InputError, PtoUsage};
use crate::models::{Deductions, Earnings, LedgerDelta, PtoActivity, Withholding};

/// Everything the caller supplies to generate one paystub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaystubRequest {
    pub employee_id: i64,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub pay_date: NaiveDate,
    #[serde(default)]
    pub earnings: EarningsInput,
    #[serde(default)]
    pub deductions: DeductionOverrides,
    #[serde(default)]
    pub pto: PtoUsage,
}

impl PaystubRequest {
    pub fn new(
        employee_id: i64,
        period_start: NaiveDate,
        period_end: NaiveDate,
        pay_date: NaiveDate,
    ) -> Self {
        Self {
            employee_id,
            period_start,
            period_end,
            pay_date,
            earnings: EarningsInput::default(),
            deductions: DeductionOverrides::default(),
            pto: PtoUsage::default(),
        }
    }

    pub fn with_regular_hours(mut self, hours: Decimal) -> Self {
        self.earnings.regular_hours = hours;
        self
    }

    /// # Errors
    ///
    /// Rejects a period that ends before it starts and any negative amount.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.period_end < self.period_start {
            return Err(InputError::PeriodOutOfOrder {
                start: self.period_start,
                end: self.period_end,
            });
        }
        self.earnings.validate()?;
        self.deductions.validate()?;
        self.pto.validate()
    }
}

/// A fully computed paystub body that has not been stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaystubPreview {
    pub earnings: Earnings,
    pub withholding: Withholding,
    pub deductions: Deductions,
    pub pto: PtoActivity,
    pub net_pay: Decimal,
    pub amount_in_words: String,
    pub deltas: LedgerDelta,
}

impl PaystubPreview {
    pub fn total_taxes(&self) -> Decimal {
        self.withholding.total()
    }

    pub fn total_deductions(&self) -> Decimal {
        self.deductions.total()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn period_must_not_end_before_it_starts() {
        let request = PaystubRequest::new(1, date(14), date(1), date(15));

        assert_eq!(
            request.validate(),
            Err(InputError::PeriodOutOfOrder {
                start: date(14),
                end: date(1),
            })
        );
    }

    #[test]
    fn negative_pto_usage_is_rejected() {
        let mut request = PaystubRequest::new(1, date(1), date(14), date(15));
        request.pto.sick_hours = dec!(-4);

        assert!(matches!(
            request.validate(),
            Err(InputError::Negative { field: "sick_hours", .. })
        ));
    }
}
