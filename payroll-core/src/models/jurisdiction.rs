use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{BracketSchedule, FilingStatus};

/// How a state taxes wages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateTaxRegime {
    None,
    Flat { rate: Decimal },
    Progressive { schedule: BracketSchedule },
}

impl StateTaxRegime {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Flat { .. } => "flat",
            Self::Progressive { .. } => "progressive",
        }
    }
}

/// State disability insurance. A missing wage base means wages are taxed
/// without a cap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdiRule {
    pub rate: Decimal,
    pub wage_base: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTaxEntry {
    pub code: String,
    pub regime: StateTaxRegime,
    pub sdi: Option<SdiRule>,
}

/// Social Security and Medicare constants for one tax year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FicaRates {
    pub ss_rate: Decimal,
    pub ss_wage_base: Decimal,
    pub medicare_rate: Decimal,
    pub additional_medicare_rate: Decimal,
}

/// Federal parameters that vary by filing status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederalFilingParameters {
    pub standard_deduction: Decimal,
    pub additional_medicare_threshold: Decimal,
    pub brackets: BracketSchedule,
}

/// Reference data for every jurisdiction the engine can withhold for.
///
/// Built once (see the `payroll-data` crate) and shared read-only; there are
/// no mutating accessors after construction.
#[derive(Debug, Clone)]
pub struct JurisdictionTable {
    tax_year: i32,
    fica: FicaRates,
    federal: HashMap<FilingStatus, FederalFilingParameters>,
    states: HashMap<String, StateTaxEntry>,
    localities: HashMap<(String, String), Decimal>,
}

impl JurisdictionTable {
    pub fn new(tax_year: i32, fica: FicaRates) -> Self {
        Self {
            tax_year,
            fica,
            federal: HashMap::new(),
            states: HashMap::new(),
            localities: HashMap::new(),
        }
    }

    pub fn with_federal(
        mut self,
        status: FilingStatus,
        parameters: FederalFilingParameters,
    ) -> Self {
        self.federal.insert(status, parameters);
        self
    }

    pub fn with_state(mut self, entry: StateTaxEntry) -> Self {
        self.states.insert(entry.code.clone(), entry);
        self
    }

    pub fn with_locality(
        mut self,
        state: impl Into<String>,
        locality: impl Into<String>,
        rate: Decimal,
    ) -> Self {
        self.localities
            .insert((state.into(), locality.into()), rate);
        self
    }

    pub fn tax_year(&self) -> i32 {
        self.tax_year
    }

    pub fn fica(&self) -> &FicaRates {
        &self.fica
    }

    pub fn federal(&self, status: FilingStatus) -> Option<&FederalFilingParameters> {
        self.federal.get(&status)
    }

    pub fn state(&self, code: &str) -> Option<&StateTaxEntry> {
        self.states.get(code)
    }

    pub fn local_rate(&self, state: &str, locality: &str) -> Option<Decimal> {
        self.localities
            .get(&(state.to_string(), locality.to_string()))
            .copied()
    }

    /// State codes, sorted.
    pub fn state_codes(&self) -> Vec<&str> {
        let mut codes: Vec<_> = self.states.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }

    /// Localities with a configured rate in `state`, sorted.
    pub fn localities_for(&self, state: &str) -> Vec<&str> {
        let mut names: Vec<_> = self
            .localities
            .keys()
            .filter(|(s, _)| s == state)
            .map(|(_, locality)| locality.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}
