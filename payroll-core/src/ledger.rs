//! Year-to-date ledger updates driven by paystubs.
//!
//! A paystub stores the exact deltas it added. Finalization adds them and a
//! void subtracts the same stored numbers; nothing is recomputed on reversal.

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use crate::models::{Employee, LedgerDelta, Paystub, YtdLedger};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("reversal would drive ytd {field} negative ({current} - {delta})")]
    Underflow {
        field: &'static str,
        current: Decimal,
        delta: Decimal,
    },

    #[error("paystub {paystub_id} belongs to employee {owner}, not {employee_id}")]
    EmployeeMismatch {
        paystub_id: i64,
        owner: i64,
        employee_id: i64,
    },
}

fn paired_fields<'a>(
    ledger: &'a mut YtdLedger,
    delta: &LedgerDelta,
) -> [(&'static str, &'a mut Decimal, Decimal); 19] {
    [
        ("gross", &mut ledger.gross, delta.gross),
        ("overtime_pay", &mut ledger.overtime_pay, delta.overtime_pay),
        ("bonus", &mut ledger.bonus, delta.bonus),
        ("ss_wages", &mut ledger.ss_wages, delta.ss_wages),
        ("medicare_wages", &mut ledger.medicare_wages, delta.medicare_wages),
        ("net_pay", &mut ledger.net_pay, delta.net_pay),
        ("federal_income_tax", &mut ledger.federal_income_tax, delta.federal_income_tax),
        ("state_income_tax", &mut ledger.state_income_tax, delta.state_income_tax),
        ("sdi_tax", &mut ledger.sdi_tax, delta.sdi_tax),
        ("local_tax", &mut ledger.local_tax, delta.local_tax),
        ("social_security_tax", &mut ledger.social_security_tax, delta.social_security_tax),
        ("medicare_tax", &mut ledger.medicare_tax, delta.medicare_tax),
        ("retirement_401k", &mut ledger.retirement_401k, delta.retirement_401k),
        ("health_insurance", &mut ledger.health_insurance, delta.health_insurance),
        ("vacation_accrued", &mut ledger.vacation.accrued, delta.vacation_accrued),
        ("vacation_used", &mut ledger.vacation.used, delta.vacation_used),
        ("sick_accrued", &mut ledger.sick.accrued, delta.sick_accrued),
        ("sick_used", &mut ledger.sick.used, delta.sick_used),
        ("personal_used", &mut ledger.personal.used, delta.personal_used),
    ]
}

/// Adds `delta` to `ledger` and refreshes PTO balances.
pub fn add_delta(ledger: &mut YtdLedger, delta: &LedgerDelta) {
    for (_, field, amount) in paired_fields(ledger, delta) {
        *field += amount;
    }
    ledger.recompute_pto_balances();
}

/// Subtracts `delta` from `ledger`. On underflow the ledger is left as it was.
///
/// # Errors
///
/// [`LedgerError::Underflow`] naming the first field that would go negative.
pub fn subtract_delta(ledger: &mut YtdLedger, delta: &LedgerDelta) -> Result<(), LedgerError> {
    let mut next = ledger.clone();
    for (name, field, amount) in paired_fields(&mut next, delta) {
        let current = *field;
        if current - amount < Decimal::ZERO {
            return Err(LedgerError::Underflow {
                field: name,
                current,
                delta: amount,
            });
        }
        *field = current - amount;
    }
    next.recompute_pto_balances();
    *ledger = next;
    Ok(())
}

fn check_owner(employee: &Employee, paystub: &Paystub) -> Result<(), LedgerError> {
    if paystub.employee_id != employee.id {
        return Err(LedgerError::EmployeeMismatch {
            paystub_id: paystub.id,
            owner: paystub.employee_id,
            employee_id: employee.id,
        });
    }
    Ok(())
}

/// # Errors
///
/// [`LedgerError::EmployeeMismatch`] when the paystub is someone else's.
pub fn apply_paystub_deltas(employee: &mut Employee, paystub: &Paystub) -> Result<(), LedgerError> {
    check_owner(employee, paystub)?;
    add_delta(&mut employee.ytd, &paystub.deltas);
    debug!(
        employee_id = employee.id,
        paystub_id = paystub.id,
        ytd_gross = %employee.ytd.gross,
        "applied paystub to ytd ledger"
    );
    Ok(())
}

/// # Errors
///
/// [`LedgerError::EmployeeMismatch`] when the paystub is someone else's,
/// [`LedgerError::Underflow`] when a cumulative field would go negative.
pub fn reverse_paystub_deltas(
    employee: &mut Employee,
    paystub: &Paystub,
) -> Result<(), LedgerError> {
    check_owner(employee, paystub)?;
    subtract_delta(&mut employee.ytd, &paystub.deltas)?;
    debug!(
        employee_id = employee.id,
        paystub_id = paystub.id,
        ytd_gross = %employee.ytd.gross,
        "reversed paystub from ytd ledger"
    );
    Ok(())
}
