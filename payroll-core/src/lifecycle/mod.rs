//! Paystub generation and voiding.
//!
//! [`PaystubService`] is the only code that touches a paystub, the owning
//! employee's ledger and the account's usage counter together.
//!
//! # Generate
//!
//! | Step | Action |
//! |------|--------|
//! | 1    | Quota check; nothing is touched when the limit is reached |
//! | 2    | Earnings and gross pay |
//! | 3    | Withholding against the pre-paystub YTD wage bases |
//! | 4    | Deductions and net pay |
//! | 5    | Store the paystub as finalized with its YTD snapshot and deltas |
//! | 6-8  | Apply deltas, count usage, award points (one repository write) |
//!
//! If the write in 6-8 fails, the paystub from step 5 is voided right away
//! and the caller gets [`PaystubError::LedgerApplyFailure`].
//!
//! # Void
//!
//! Subtracts the paystub's stored deltas, marks it voided and gives back one
//! unit of quota, all in one repository write. Points are kept.
//!
//! # Concurrency
//!
//! Within one service, work on the same account or employee is serialized
//! through per-entity async locks held for the whole operation. Across
//! services sharing a store, every ledger and usage write carries the
//! versions it read, so a write based on an outdated YTD snapshot is
//! rejected with [`RepositoryError::Conflict`]. For generate that surfaces as
//! a retryable [`PaystubError::LedgerApplyFailure`] with the paystub voided.

mod error;
mod locks;
mod request;

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{error, info, warn};

pub use error::PaystubError;
pub use request::{PaystubPreview, PaystubRequest};

use crate::calculations::state::normalize_state;
use crate::calculations::{
    InputError, JurisdictionContext, YtdContext, amount_in_words, compute_all, compute_deductions,
    compute_earnings, compute_net_pay, compute_pto_activity,
};
use crate::db::{PayrollRepository, RepositoryError};
use crate::ledger::{apply_paystub_deltas, reverse_paystub_deltas};
use crate::models::{Account, Employee, JurisdictionTable, LedgerDelta, NewPaystub, Paystub};
use crate::quota::{self, BillingEvent, RewardsConfig};
use crate::verification::{self, Verification};
use locks::EntityLocks;

/// Reason recorded on a paystub voided because its ledger write failed.
pub const LEDGER_FAILURE_VOID_REASON: &str = "system: ledger update failed";

const DEFAULT_VOID_REASON: &str = "no reason given";

/// Computes a paystub body for `employee` without storing anything.
///
/// # Errors
///
/// [`PaystubError::InvalidInput`] for bad request data or negative net pay,
/// [`PaystubError::Withholding`] for unknown jurisdictions.
pub fn compute_paystub(
    tables: &JurisdictionTable,
    employee: &Employee,
    request: &PaystubRequest,
) -> Result<PaystubPreview, PaystubError> {
    request.validate()?;

    let earnings = compute_earnings(&request.earnings, employee.pay_rate);
    let withholding = compute_all(
        tables,
        earnings.gross,
        &JurisdictionContext::for_employee(employee),
        &YtdContext::from(&employee.ytd),
    )?;
    let deductions = compute_deductions(earnings.gross, &employee.elections, &request.deductions);
    let net_pay = compute_net_pay(earnings.gross, withholding.total(), deductions.total())?;
    let words = amount_in_words(net_pay).ok_or(InputError::AmountOutOfRange(net_pay))?;
    let pto = compute_pto_activity(&earnings, employee.pto_accrual_rate, &request.pto);
    let deltas = LedgerDelta::from_parts(&earnings, &withholding, &deductions, &pto, net_pay);

    Ok(PaystubPreview {
        earnings,
        withholding,
        deductions,
        pto,
        net_pay,
        amount_in_words: words,
        deltas,
    })
}

pub struct PaystubService {
    repo: Arc<dyn PayrollRepository>,
    tables: Arc<JurisdictionTable>,
    rewards: RewardsConfig,
    locks: EntityLocks,
}

impl PaystubService {
    pub fn new(
        repo: Arc<dyn PayrollRepository>,
        tables: Arc<JurisdictionTable>,
        rewards: RewardsConfig,
    ) -> Self {
        Self {
            repo,
            tables,
            rewards,
            locks: EntityLocks::default(),
        }
    }

    pub fn repository(&self) -> &Arc<dyn PayrollRepository> {
        &self.repo
    }

    pub fn tables(&self) -> &JurisdictionTable {
        &self.tables
    }

    async fn employee(&self, id: i64) -> Result<Employee, PaystubError> {
        match self.repo.get_employee(id).await {
            Err(RepositoryError::NotFound) => Err(PaystubError::not_found("employee", id)),
            other => Ok(other?),
        }
    }

    async fn account(&self, id: i64) -> Result<Account, PaystubError> {
        match self.repo.get_account(id).await {
            Err(RepositoryError::NotFound) => Err(PaystubError::not_found("account", id)),
            other => Ok(other?),
        }
    }

    async fn paystub(&self, id: i64) -> Result<Paystub, PaystubError> {
        match self.repo.get_paystub(id).await {
            Err(RepositoryError::NotFound) => Err(PaystubError::not_found("paystub", id)),
            other => Ok(other?),
        }
    }

    /// Runs earnings, withholding and deductions against the employee's
    /// current ledger. Nothing is stored and no quota is used.
    pub async fn preview(&self, request: &PaystubRequest) -> Result<PaystubPreview, PaystubError> {
        let employee = self.employee(request.employee_id).await?;
        compute_paystub(&self.tables, &employee, request)
    }

    pub async fn generate(&self, request: PaystubRequest) -> Result<Paystub, PaystubError> {
        request.validate()?;
        let owner = self.employee(request.employee_id).await?;
        let _guard = self
            .locks
            .account_and_employee(owner.account_id, owner.id)
            .await;

        // re-read under the lock
        let mut account = self.account(owner.account_id).await?;
        let mut employee = self.employee(owner.id).await?;

        if let Err(error) = quota::check(&account) {
            warn!(
                account_id = account.id,
                used = account.paystubs_used_this_month,
                "paystub quota exceeded"
            );
            return Err(error.into());
        }

        let preview = compute_paystub(&self.tables, &employee, &request)?;
        let now = Utc::now();
        let draft = NewPaystub {
            verification_id: verification::new_verification_id(now.date_naive()),
            account_id: account.id,
            employee_id: employee.id,
            period_start: request.period_start,
            period_end: request.period_end,
            pay_date: request.pay_date,
            pay_frequency: employee.pay_frequency,
            state: normalize_state(&employee.state),
            locality: employee.locality.clone(),
            earnings: preview.earnings,
            withholding: preview.withholding,
            deductions: preview.deductions,
            net_pay: preview.net_pay,
            amount_in_words: preview.amount_in_words,
            pto: preview.pto,
            ytd_before: employee.ytd.clone(),
            deltas: preview.deltas,
            created_at: now,
        };

        let paystub = self.repo.insert_paystub(draft).await?;

        let applied = apply_paystub_deltas(&mut employee, &paystub);
        quota::record_generation(&mut account);
        quota::award_paystub_points(&mut account, &self.rewards);

        let saved = match applied {
            Ok(()) => {
                self.repo
                    .save_ledger_and_usage(&employee, &account)
                    .await
            }
            Err(error) => Err(RepositoryError::Database(error.to_string())),
        };

        if let Err(source) = saved {
            error!(
                paystub_id = paystub.id,
                employee_id = employee.id,
                error = %source,
                "ledger update failed; voiding paystub"
            );
            if let Err(compensation) = self
                .repo
                .mark_paystub_voided(paystub.id, LEDGER_FAILURE_VOID_REASON, Utc::now())
                .await
            {
                error!(
                    paystub_id = paystub.id,
                    error = %compensation,
                    "failed to void paystub after ledger failure"
                );
            }
            return Err(PaystubError::LedgerApplyFailure {
                paystub_id: paystub.id,
                source,
            });
        }

        info!(
            paystub_id = paystub.id,
            employee_id = employee.id,
            gross = %paystub.earnings.gross,
            net = %paystub.net_pay,
            verification_id = %paystub.verification_id,
            "paystub finalized"
        );

        Ok(paystub)
    }

    pub async fn void(&self, paystub_id: i64, reason: &str) -> Result<Paystub, PaystubError> {
        let reason = match reason.trim() {
            "" => DEFAULT_VOID_REASON,
            trimmed => trimmed,
        };

        let existing = self.paystub(paystub_id).await?;
        if existing.is_voided() {
            return Err(PaystubError::AlreadyVoided(paystub_id));
        }
        let _guard = self
            .locks
            .account_and_employee(existing.account_id, existing.employee_id)
            .await;

        let paystub = self.paystub(paystub_id).await?;
        if paystub.is_voided() {
            return Err(PaystubError::AlreadyVoided(paystub_id));
        }
        let mut account = self.account(paystub.account_id).await?;
        let mut employee = self.employee(paystub.employee_id).await?;

        reverse_paystub_deltas(&mut employee, &paystub)?;
        quota::record_void(&mut account);

        let voided = match self
            .repo
            .void_paystub(paystub_id, reason, Utc::now(), &employee, &account)
            .await
        {
            Err(RepositoryError::Conflict(detail)) => {
                // voided elsewhere, or the ledger moved under us
                if self.paystub(paystub_id).await?.is_voided() {
                    return Err(PaystubError::AlreadyVoided(paystub_id));
                }
                warn!(paystub_id, %detail, "void lost a concurrent ledger update");
                return Err(RepositoryError::Conflict(detail).into());
            }
            other => other?,
        };

        info!(
            paystub_id,
            employee_id = employee.id,
            reason,
            "paystub voided"
        );

        Ok(voided)
    }

    /// Looks a paystub up by the id printed on it.
    pub async fn verify(&self, verification_id: &str) -> Result<Verification, PaystubError> {
        let verification_id = verification_id.trim().to_ascii_uppercase();
        if !verification::is_well_formed(&verification_id) {
            return Err(PaystubError::not_found("verification id", verification_id));
        }
        match self
            .repo
            .get_paystub_by_verification_id(&verification_id)
            .await
        {
            Ok(paystub) => Ok(Verification::of(paystub)),
            Err(RepositoryError::NotFound) => {
                Err(PaystubError::not_found("verification id", verification_id))
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Applies a plan change from the billing system.
    pub async fn apply_billing_event(
        &self,
        account_id: i64,
        event: BillingEvent,
    ) -> Result<Account, PaystubError> {
        let _guard = self.locks.account(account_id).await;
        let mut account = self.account(account_id).await?;
        quota::apply_billing_event(&mut account, event);
        self.repo.save_account(&account).await?;
        info!(account_id, ?event, "billing event applied");
        self.account(account_id).await
    }

    /// The pay date after the employee's most recent non-voided paystub, or
    /// `None` when there is none yet.
    pub async fn next_pay_date(&self, employee_id: i64) -> Result<Option<NaiveDate>, PaystubError> {
        let employee = self.employee(employee_id).await?;
        let paystubs = self.repo.list_paystubs(employee_id).await?;

        Ok(paystubs
            .iter()
            .filter(|p| !p.is_voided())
            .map(|p| p.pay_date)
            .max()
            .and_then(|last| employee.pay_frequency.next_pay_date(last)))
    }
}
