use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Itemized taxes withheld from one paystub. Every item is already rounded
/// to the cent; subtotals are plain sums of items.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Withholding {
    pub federal_income_tax: Decimal,
    pub social_security_tax: Decimal,
    /// Base Medicare at the uncapped rate.
    pub medicare_tax: Decimal,
    /// Surtax on wages above the filing-status threshold.
    pub additional_medicare_tax: Decimal,
    pub state_income_tax: Decimal,
    pub state_disability_tax: Decimal,
    pub local_income_tax: Decimal,
}

impl Withholding {
    pub fn medicare_total(&self) -> Decimal {
        self.medicare_tax + self.additional_medicare_tax
    }

    /// Federal income tax plus Social Security and Medicare.
    pub fn total_federal(&self) -> Decimal {
        self.federal_income_tax + self.social_security_tax + self.medicare_total()
    }

    /// State income tax plus SDI.
    pub fn total_state(&self) -> Decimal {
        self.state_income_tax + self.state_disability_tax
    }

    pub fn total_local(&self) -> Decimal {
        self.local_income_tax
    }

    pub fn total(&self) -> Decimal {
        self.total_federal() + self.total_state() + self.total_local()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn subtotals_sum_items() {
        let withholding = Withholding {
            federal_income_tax: dec!(210.15),
            social_security_tax: dec!(124.00),
            medicare_tax: dec!(29.00),
            additional_medicare_tax: dec!(18.00),
            state_income_tax: dec!(100.00),
            state_disability_tax: dec!(18.00),
            local_income_tax: dec!(77.52),
        };

        assert_eq!(withholding.medicare_total(), dec!(47.00));
        assert_eq!(withholding.total_federal(), dec!(381.15));
        assert_eq!(withholding.total_state(), dec!(118.00));
        assert_eq!(withholding.total_local(), dec!(77.52));
        assert_eq!(withholding.total(), dec!(576.67));
    }
}
