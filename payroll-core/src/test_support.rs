//! Small 2025 jurisdiction table shared by unit tests.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::models::{
    BracketSchedule, FederalFilingParameters, FicaRates, FilingStatus, JurisdictionTable, SdiRule,
    StateTaxEntry, StateTaxRegime, TaxBracket,
};

fn schedule(bounds: &[(Decimal, Decimal)], top_rate: Decimal) -> BracketSchedule {
    let mut brackets: Vec<_> = bounds
        .iter()
        .map(|&(bound, rate)| TaxBracket::new(Some(bound), rate))
        .collect();
    brackets.push(TaxBracket::new(None, top_rate));
    BracketSchedule::new(brackets)
}

pub(crate) fn fica_2025() -> FicaRates {
    FicaRates {
        ss_rate: dec!(0.062),
        ss_wage_base: dec!(168600),
        medicare_rate: dec!(0.0145),
        additional_medicare_rate: dec!(0.009),
    }
}

pub(crate) fn sample_table() -> JurisdictionTable {
    let single = schedule(
        &[
            (dec!(11600), dec!(0.10)),
            (dec!(47150), dec!(0.12)),
            (dec!(100525), dec!(0.22)),
            (dec!(191950), dec!(0.24)),
            (dec!(243725), dec!(0.32)),
            (dec!(609350), dec!(0.35)),
        ],
        dec!(0.37),
    );
    let married = schedule(
        &[
            (dec!(23200), dec!(0.10)),
            (dec!(94300), dec!(0.12)),
            (dec!(201050), dec!(0.22)),
            (dec!(383900), dec!(0.24)),
            (dec!(487450), dec!(0.32)),
            (dec!(731200), dec!(0.35)),
        ],
        dec!(0.37),
    );

    JurisdictionTable::new(2025, fica_2025())
        .with_federal(
            FilingStatus::Single,
            FederalFilingParameters {
                standard_deduction: dec!(14600),
                additional_medicare_threshold: dec!(200000),
                brackets: single,
            },
        )
        .with_federal(
            FilingStatus::Married,
            FederalFilingParameters {
                standard_deduction: dec!(29200),
                additional_medicare_threshold: dec!(250000),
                brackets: married,
            },
        )
        .with_state(StateTaxEntry {
            code: "TX".to_string(),
            regime: StateTaxRegime::None,
            sdi: None,
        })
        .with_state(StateTaxEntry {
            code: "MA".to_string(),
            regime: StateTaxRegime::Flat { rate: dec!(0.05) },
            sdi: None,
        })
        .with_state(StateTaxEntry {
            code: "CA".to_string(),
            regime: StateTaxRegime::Progressive {
                schedule: schedule(
                    &[
                        (dec!(10412), dec!(0.01)),
                        (dec!(24684), dec!(0.02)),
                        (dec!(38959), dec!(0.04)),
                        (dec!(54081), dec!(0.06)),
                        (dec!(68350), dec!(0.08)),
                        (dec!(349137), dec!(0.093)),
                        (dec!(418961), dec!(0.103)),
                        (dec!(698271), dec!(0.113)),
                    ],
                    dec!(0.123),
                ),
            },
            sdi: Some(SdiRule {
                rate: dec!(0.009),
                wage_base: Some(dec!(153164)),
            }),
        })
        .with_state(StateTaxEntry {
            code: "NY".to_string(),
            regime: StateTaxRegime::Progressive {
                schedule: schedule(
                    &[
                        (dec!(8500), dec!(0.04)),
                        (dec!(11700), dec!(0.045)),
                        (dec!(13900), dec!(0.0525)),
                        (dec!(80650), dec!(0.055)),
                        (dec!(215400), dec!(0.06)),
                        (dec!(1077550), dec!(0.0685)),
                        (dec!(5000000), dec!(0.0965)),
                        (dec!(25000000), dec!(0.103)),
                    ],
                    dec!(0.109),
                ),
            },
            sdi: None,
        })
        .with_state(StateTaxEntry {
            // flat state with uncapped SDI
            code: "HI".to_string(),
            regime: StateTaxRegime::Flat { rate: dec!(0.05) },
            sdi: Some(SdiRule {
                rate: dec!(0.005),
                wage_base: None,
            }),
        })
        .with_locality("NY", "New York City", dec!(0.03876))
        .with_locality("NY", "Yonkers", dec!(0.016875))
}
