//! Jurisdiction table loader.
//!
//! A tax year is described by six CSV files. The 2025 set is embedded in the
//! binary; a directory containing the same six file names can replace it.
//!
//! | File | Columns |
//! |------------------------|--------------------------------------------------------------------|
//! | `fica.csv` | `tax_year,ss_rate,ss_wage_base,medicare_rate,additional_medicare_rate` |
//! | `federal_filing.csv` | `filing_status,standard_deduction,additional_medicare_threshold` |
//! | `federal_brackets.csv` | `filing_status,upper_bound,rate` |
//! | `state_regimes.csv` | `state,regime,flat_rate,sdi_rate,sdi_wage_base` |
//! | `state_brackets.csv` | `state,upper_bound,rate` |
//! | `local_rates.csv` | `state,locality,rate` |
//!
//! An empty `upper_bound` marks the top bracket. `regime` is one of `none`,
//! `flat` or `progressive`. Bracket rows are read in file order.
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use payroll_core::models::{
    BracketSchedule, FederalFilingParameters, FicaRates, FilingStatus, JurisdictionTable, SdiRule,
    StateTaxEntry, StateTaxRegime, TaxBracket,
};
use regex::Regex;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info};

pub const FICA_FILE: &str = "fica.csv";
pub const FEDERAL_FILING_FILE: &str = "federal_filing.csv";
pub const FEDERAL_BRACKETS_FILE: &str = "federal_brackets.csv";
pub const STATE_REGIMES_FILE: &str = "state_regimes.csv";
pub const STATE_BRACKETS_FILE: &str = "state_brackets.csv";
pub const LOCAL_RATES_FILE: &str = "local_rates.csv";

/// The 50 states plus DC. Every table must cover all of them.
pub const REQUIRED_STATES: [&str; 51] = [
    "AK", "AL", "AR", "AZ", "CA", "CO", "CT", "DC", "DE", "FL", "GA", "HI", "IA", "ID", "IL", "IN",
    "KS", "KY", "LA", "MA", "MD", "ME", "MI", "MN", "MO", "MS", "MT", "NC", "ND", "NE", "NH", "NJ",
    "NM", "NV", "NY", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VA", "VT", "WA",
    "WI", "WV", "WY",
];

static STATE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2}$").expect("hardcoded regex should be valid"));

/// Errors that can occur when loading jurisdiction tables.
#[derive(Debug, Error)]
pub enum TableLoadError {
    #[error("CSV parse error in {file}: {message}")]
    CsvParse { file: &'static str, message: String },

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{file} must contain exactly one row, found {rows}")]
    RowCount { file: &'static str, rows: usize },

    #[error("invalid state code '{0}'")]
    InvalidStateCode(String),

    #[error("unknown filing status '{0}'")]
    UnknownFilingStatus(String),

    #[error("no federal parameters for filing status {0}")]
    MissingFilingStatus(FilingStatus),

    #[error("state {state} has unknown regime '{regime}'")]
    UnknownRegime { state: String, regime: String },

    #[error("flat-tax state {0} has no rate")]
    MissingFlatRate(String),

    #[error("state {0} appears more than once")]
    DuplicateState(String),

    #[error("{file} references state {state} that has no regime row")]
    UndeclaredState { file: &'static str, state: String },

    #[error("invalid bracket schedule for {0}")]
    MalformedSchedule(String),

    #[error("rate {rate} for {what} is outside [0, 1]")]
    RateOutOfRange { what: String, rate: Decimal },

    #[error("tables are missing states: {}", .0.join(", "))]
    MissingStates(Vec<String>),
}

impl TableLoadError {
    fn csv(file: &'static str, err: csv::Error) -> Self {
        TableLoadError::CsvParse {
            file,
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FicaRecord {
    tax_year: i32,
    ss_rate: Decimal,
    ss_wage_base: Decimal,
    medicare_rate: Decimal,
    additional_medicare_rate: Decimal,
}

#[derive(Debug, Deserialize)]
struct FederalFilingRecord {
    filing_status: String,
    standard_deduction: Decimal,
    additional_medicare_threshold: Decimal,
}

#[derive(Debug, Deserialize)]
struct FederalBracketRecord {
    filing_status: String,
    #[serde(deserialize_with = "deserialize_optional_decimal")]
    upper_bound: Option<Decimal>,
    rate: Decimal,
}

#[derive(Debug, Deserialize)]
struct StateRegimeRecord {
    state: String,
    regime: String,
    #[serde(deserialize_with = "deserialize_optional_decimal")]
    flat_rate: Option<Decimal>,
    #[serde(deserialize_with = "deserialize_optional_decimal")]
    sdi_rate: Option<Decimal>,
    #[serde(deserialize_with = "deserialize_optional_decimal")]
    sdi_wage_base: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct StateBracketRecord {
    state: String,
    #[serde(deserialize_with = "deserialize_optional_decimal")]
    upper_bound: Option<Decimal>,
    rate: Decimal,
}

#[derive(Debug, Deserialize)]
struct LocalRateRecord {
    state: String,
    locality: String,
    rate: Decimal,
}

fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<Decimal>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Raw CSV text for one tax year.
#[derive(Debug, Clone)]
pub struct TableSources {
    pub fica: String,
    pub federal_filing: String,
    pub federal_brackets: String,
    pub state_regimes: String,
    pub state_brackets: String,
    pub local_rates: String,
}

impl TableSources {
    /// The 2025 tables compiled into this crate.
    pub fn embedded_2025() -> Self {
        Self {
            fica: include_str!("../data/2025/fica.csv").to_string(),
            federal_filing: include_str!("../data/2025/federal_filing.csv").to_string(),
            federal_brackets: include_str!("../data/2025/federal_brackets.csv").to_string(),
            state_regimes: include_str!("../data/2025/state_regimes.csv").to_string(),
            state_brackets: include_str!("../data/2025/state_brackets.csv").to_string(),
            local_rates: include_str!("../data/2025/local_rates.csv").to_string(),
        }
    }

    /// Reads the six table files from `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`TableLoadError::Io`] naming the first file that cannot be read.
    pub fn from_dir(dir: &Path) -> Result<Self, TableLoadError> {
        let read = |name: &str| {
            let path = dir.join(name);
            std::fs::read_to_string(&path).map_err(|source| TableLoadError::Io { path, source })
        };
        Ok(Self {
            fica: read(FICA_FILE)?,
            federal_filing: read(FEDERAL_FILING_FILE)?,
            federal_brackets: read(FEDERAL_BRACKETS_FILE)?,
            state_regimes: read(STATE_REGIMES_FILE)?,
            state_brackets: read(STATE_BRACKETS_FILE)?,
            local_rates: read(LOCAL_RATES_FILE)?,
        })
    }
}

/// Builds and validates a [`JurisdictionTable`] from CSV sources.
pub struct TableLoader;

impl TableLoader {
    /// Loads from `dir` when given, otherwise the embedded 2025 tables.
    pub fn load(dir: Option<&Path>) -> Result<JurisdictionTable, TableLoadError> {
        let sources = match dir {
            Some(dir) => {
                info!(dir = %dir.display(), "loading jurisdiction tables from directory");
                TableSources::from_dir(dir)?
            }
            None => TableSources::embedded_2025(),
        };
        Self::build(&sources)
    }

    pub fn embedded_2025() -> Result<JurisdictionTable, TableLoadError> {
        Self::build(&TableSources::embedded_2025())
    }

    /// Parse rows of any table file from a reader.
    pub fn parse<T, R>(file: &'static str, reader: R) -> Result<Vec<T>, TableLoadError>
    where
        T: DeserializeOwned,
        R: Read,
    {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: T = result.map_err(|e| TableLoadError::csv(file, e))?;
            records.push(record);
        }

        Ok(records)
    }

    /// Parses every file, validates it and assembles the table.
    ///
    /// # Errors
    ///
    /// Any parse failure, malformed schedule, unknown code or missing state
    /// aborts the load; a partially valid table is never returned.
    pub fn build(sources: &TableSources) -> Result<JurisdictionTable, TableLoadError> {
        let fica_rows: Vec<FicaRecord> = Self::parse(FICA_FILE, sources.fica.as_bytes())?;
        let [fica] = <[FicaRecord; 1]>::try_from(fica_rows).map_err(|rows| {
            TableLoadError::RowCount {
                file: FICA_FILE,
                rows: rows.len(),
            }
        })?;
        for (what, rate) in [
            ("social security", fica.ss_rate),
            ("medicare", fica.medicare_rate),
            ("additional medicare", fica.additional_medicare_rate),
        ] {
            check_rate(what, rate)?;
        }

        let mut table = JurisdictionTable::new(
            fica.tax_year,
            FicaRates {
                ss_rate: fica.ss_rate,
                ss_wage_base: fica.ss_wage_base,
                medicare_rate: fica.medicare_rate,
                additional_medicare_rate: fica.additional_medicare_rate,
            },
        );

        for (status, parameters) in Self::federal(sources)? {
            table = table.with_federal(status, parameters);
        }

        let states = Self::states(sources)?;
        let declared: BTreeSet<String> = states.iter().map(|s| s.code.clone()).collect();
        let missing: Vec<String> = REQUIRED_STATES
            .iter()
            .filter(|code| !declared.contains(**code))
            .map(|code| code.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(TableLoadError::MissingStates(missing));
        }
        for entry in states {
            table = table.with_state(entry);
        }

        let localities: Vec<LocalRateRecord> =
            Self::parse(LOCAL_RATES_FILE, sources.local_rates.as_bytes())?;
        let locality_count = localities.len();
        for record in localities {
            let state = state_code(&record.state)?;
            if !declared.contains(&state) {
                return Err(TableLoadError::UndeclaredState {
                    file: LOCAL_RATES_FILE,
                    state,
                });
            }
            check_rate(&format!("{state} {}", record.locality), record.rate)?;
            table = table.with_locality(state, record.locality, record.rate);
        }

        info!(
            tax_year = table.tax_year(),
            states = declared.len(),
            localities = locality_count,
            "jurisdiction tables loaded"
        );
        Ok(table)
    }

    fn federal(
        sources: &TableSources,
    ) -> Result<Vec<(FilingStatus, FederalFilingParameters)>, TableLoadError> {
        let filings: Vec<FederalFilingRecord> =
            Self::parse(FEDERAL_FILING_FILE, sources.federal_filing.as_bytes())?;
        let bracket_rows: Vec<FederalBracketRecord> =
            Self::parse(FEDERAL_BRACKETS_FILE, sources.federal_brackets.as_bytes())?;

        let mut brackets: BTreeMap<&'static str, Vec<TaxBracket>> = BTreeMap::new();
        for row in bracket_rows {
            let status = filing_status(&row.filing_status)?;
            brackets
                .entry(status.as_str())
                .or_default()
                .push(TaxBracket::new(row.upper_bound, row.rate));
        }

        let mut parameters = Vec::with_capacity(filings.len());
        for filing in filings {
            let status = filing_status(&filing.filing_status)?;
            let schedule = BracketSchedule::new(brackets.remove(status.as_str()).unwrap_or_default());
            if !schedule.is_well_formed() {
                return Err(TableLoadError::MalformedSchedule(format!("federal {status}")));
            }
            debug!(%status, brackets = schedule.brackets().len(), "federal schedule parsed");
            parameters.push((
                status,
                FederalFilingParameters {
                    standard_deduction: filing.standard_deduction,
                    additional_medicare_threshold: filing.additional_medicare_threshold,
                    brackets: schedule,
                },
            ));
        }

        for status in FilingStatus::ALL {
            if !parameters.iter().any(|(s, _)| *s == status) {
                return Err(TableLoadError::MissingFilingStatus(status));
            }
        }
        Ok(parameters)
    }

    fn states(sources: &TableSources) -> Result<Vec<StateTaxEntry>, TableLoadError> {
        let regimes: Vec<StateRegimeRecord> =
            Self::parse(STATE_REGIMES_FILE, sources.state_regimes.as_bytes())?;
        let bracket_rows: Vec<StateBracketRecord> =
            Self::parse(STATE_BRACKETS_FILE, sources.state_brackets.as_bytes())?;

        let mut brackets: BTreeMap<String, Vec<TaxBracket>> = BTreeMap::new();
        for row in bracket_rows {
            let state = state_code(&row.state)?;
            brackets
                .entry(state)
                .or_default()
                .push(TaxBracket::new(row.upper_bound, row.rate));
        }

        let mut seen = BTreeSet::new();
        let mut entries = Vec::with_capacity(regimes.len());
        for record in regimes {
            let code = state_code(&record.state)?;
            if !seen.insert(code.clone()) {
                return Err(TableLoadError::DuplicateState(code));
            }

            let regime = match record.regime.as_str() {
                "none" => StateTaxRegime::None,
                "flat" => {
                    let rate = record
                        .flat_rate
                        .ok_or_else(|| TableLoadError::MissingFlatRate(code.clone()))?;
                    check_rate(&code, rate)?;
                    StateTaxRegime::Flat { rate }
                }
                "progressive" => {
                    let schedule =
                        BracketSchedule::new(brackets.remove(&code).unwrap_or_default());
                    if !schedule.is_well_formed() {
                        return Err(TableLoadError::MalformedSchedule(code));
                    }
                    StateTaxRegime::Progressive { schedule }
                }
                other => {
                    return Err(TableLoadError::UnknownRegime {
                        state: code,
                        regime: other.to_string(),
                    });
                }
            };

            let sdi = match record.sdi_rate {
                Some(rate) => {
                    check_rate(&format!("{code} SDI"), rate)?;
                    Some(SdiRule {
                        rate,
                        wage_base: record.sdi_wage_base,
                    })
                }
                None => None,
            };

            entries.push(StateTaxEntry { code, regime, sdi });
        }

        // Brackets left over belong to a state without a progressive regime row.
        if let Some(state) = brackets.into_keys().next() {
            return Err(TableLoadError::UndeclaredState {
                file: STATE_BRACKETS_FILE,
                state,
            });
        }
        Ok(entries)
    }
}

fn state_code(raw: &str) -> Result<String, TableLoadError> {
    let code = raw.trim().to_ascii_uppercase();
    if STATE_CODE.is_match(&code) {
        Ok(code)
    } else {
        Err(TableLoadError::InvalidStateCode(raw.to_string()))
    }
}

fn filing_status(raw: &str) -> Result<FilingStatus, TableLoadError> {
    FilingStatus::parse(raw).ok_or_else(|| TableLoadError::UnknownFilingStatus(raw.to_string()))
}

fn check_rate(what: &str, rate: Decimal) -> Result<(), TableLoadError> {
    if rate < Decimal::ZERO || rate > Decimal::ONE {
        return Err(TableLoadError::RateOutOfRange {
            what: what.to_string(),
            rate,
        });
    }
    Ok(())
}
