mod account;
mod employee;
mod filing_status;
mod jurisdiction;
mod pay_frequency;
mod paystub;
mod tax_bracket;
mod withholding;

pub use account::{Account, NewAccount, PaystubLimit, RewardTier};
pub use employee::{
    DEFAULT_PTO_ACCRUAL_RATE, DeductionElections, Employee, NewEmployee, PtoBucket, YtdLedger,
};
pub use filing_status::FilingStatus;
pub use jurisdiction::{
    FederalFilingParameters, FicaRates, JurisdictionTable, SdiRule, StateTaxEntry, StateTaxRegime,
};
pub use pay_frequency::PayFrequency;
pub use paystub::{
    Deductions, Earnings, LedgerDelta, NewPaystub, Paystub, PaystubStatus, PtoActivity,
};
pub use tax_bracket::{BracketSchedule, TaxBracket};
pub use withholding::Withholding;
