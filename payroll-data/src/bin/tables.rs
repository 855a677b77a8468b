use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use payroll_core::PayrollConfig;
use payroll_core::calculations::state::normalize_state;
use payroll_core::calculations::{JurisdictionContext, YtdContext, compute_all};
use payroll_core::models::{FilingStatus, JurisdictionTable, PayFrequency, StateTaxRegime};
use payroll_data::{TableLoader, logging};
use rust_decimal::Decimal;
use tracing::debug;

/// Inspect and validate the payroll jurisdiction tables.
///
/// Tables come from `--tables-dir`, then the config file's `tables_dir`
/// (or `PAYROLL_TABLES_DIR`), and otherwise the embedded 2025 set.
#[derive(Parser, Debug)]
#[command(name = "payroll-tables")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Directory holding the six jurisdiction CSV files
    #[arg(short, long)]
    tables_dir: Option<PathBuf>,

    /// Payroll TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "payroll_data=trace"
    #[arg(long)]
    log_level: Option<String>,

    /// Also append log output to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and validate the tables, then print a summary
    Check,
    /// Show one state's regime, SDI rule and localities
    State { code: String },
    /// Compute first-paycheck withholding for a gross amount
    Withhold {
        #[arg(long)]
        gross: Decimal,
        #[arg(long)]
        state: String,
        #[arg(long)]
        locality: Option<String>,
        #[arg(long, default_value = "single", value_parser = parse_filing_status)]
        filing_status: FilingStatus,
        #[arg(long, default_value = "biweekly", value_parser = parse_pay_frequency)]
        frequency: PayFrequency,
    },
}

fn parse_filing_status(s: &str) -> Result<FilingStatus, String> {
    FilingStatus::parse(s).ok_or_else(|| format!("unknown filing status '{s}'"))
}

fn parse_pay_frequency(s: &str) -> Result<PayFrequency, String> {
    PayFrequency::parse(s).ok_or_else(|| format!("unknown pay frequency '{s}'"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_default_logging();
    if let Some(level) = &cli.log_level {
        logging::set_log_level(level)?;
    }
    if let Some(path) = &cli.log_file {
        logging::enable_file_logging(path)?;
    }

    let config = match &cli.config {
        Some(path) => PayrollConfig::from_file(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?,
        None => PayrollConfig::default(),
    }
    .with_env_overrides();

    let tables_dir = cli.tables_dir.clone().or(config.tables_dir);
    debug!(?tables_dir, "resolved tables directory");

    let table = TableLoader::load(tables_dir.as_deref())
        .context("Failed to load jurisdiction tables")?;

    match cli.command {
        Command::Check => print_summary(&table),
        Command::State { code } => print_state(&table, &code)?,
        Command::Withhold {
            gross,
            state,
            locality,
            filing_status,
            frequency,
        } => {
            let context = JurisdictionContext {
                state: normalize_state(&state),
                locality,
                filing_status,
                pay_frequency: frequency,
                federal_extra_withholding: Decimal::ZERO,
                state_extra_withholding: Decimal::ZERO,
            };
            let withholding = compute_all(&table, gross, &context, &YtdContext::default())
                .context("Failed to compute withholding")?;

            println!("Federal income tax:    {:>10}", withholding.federal_income_tax);
            println!("Social Security:       {:>10}", withholding.social_security_tax);
            println!("Medicare:              {:>10}", withholding.medicare_total());
            println!("State income tax:      {:>10}", withholding.state_income_tax);
            println!("State disability:      {:>10}", withholding.state_disability_tax);
            println!("Local income tax:      {:>10}", withholding.local_income_tax);
            println!("Total:                 {:>10}", withholding.total());
            println!("Net before deductions: {:>10}", gross - withholding.total());
        }
    }

    Ok(())
}

fn print_summary(table: &JurisdictionTable) {
    let fica = table.fica();
    println!("Tax year {}", table.tax_year());
    println!(
        "FICA: SS {} up to {}, Medicare {} (+{} additional)",
        fica.ss_rate, fica.ss_wage_base, fica.medicare_rate, fica.additional_medicare_rate
    );
    for status in FilingStatus::ALL {
        if let Some(federal) = table.federal(status) {
            println!(
                "  {status:<18} deduction {:>8}  brackets {}",
                federal.standard_deduction,
                federal.brackets.brackets().len()
            );
        }
    }

    let codes = table.state_codes();
    let mut counts = [0usize; 3];
    let mut localities = 0;
    for code in &codes {
        if let Some(entry) = table.state(code) {
            match entry.regime {
                StateTaxRegime::None => counts[0] += 1,
                StateTaxRegime::Flat { .. } => counts[1] += 1,
                StateTaxRegime::Progressive { .. } => counts[2] += 1,
            }
        }
        localities += table.localities_for(code).len();
    }
    println!(
        "{} jurisdictions: {} without income tax, {} flat, {} progressive; {} localities",
        codes.len(),
        counts[0],
        counts[1],
        counts[2],
        localities
    );
}

fn print_state(table: &JurisdictionTable, code: &str) -> Result<()> {
    let code = normalize_state(code);
    let entry = table
        .state(&code)
        .with_context(|| format!("Unknown state: {code}"))?;

    println!("{} ({})", entry.code, entry.regime.kind());
    match &entry.regime {
        StateTaxRegime::None => {}
        StateTaxRegime::Flat { rate } => println!("  rate {rate}"),
        StateTaxRegime::Progressive { schedule } => {
            for bracket in schedule.brackets() {
                match bracket.upper_bound {
                    Some(bound) => println!("  up to {bound:>10}  {}", bracket.rate),
                    None => println!("  above            {}", bracket.rate),
                }
            }
        }
    }
    if let Some(sdi) = &entry.sdi {
        match sdi.wage_base {
            Some(base) => println!("  SDI {} up to {base}", sdi.rate),
            None => println!("  SDI {} (uncapped)", sdi.rate),
        }
    }
    for locality in table.localities_for(&code) {
        if let Some(rate) = table.local_rate(&code, locality) {
            println!("  local {locality}: {rate}");
        }
    }
    Ok(())
}
