use thiserror::Error;

use crate::calculations::{InputError, WithholdingError};
use crate::db::RepositoryError;
use crate::ledger::LedgerError;
use crate::quota::QuotaError;

#[derive(Debug, Error)]
pub enum PaystubError {
    #[error("monthly paystub limit reached ({used}/{limit})")]
    QuotaExceeded { limit: u32, used: u32 },

    #[error(transparent)]
    Withholding(#[from] WithholdingError),

    #[error("paystub {0} is already voided")]
    AlreadyVoided(i64),

    /// The paystub was stored, its ledger update failed, and it has been
    /// voided again.
    #[error("ledger update for paystub {paystub_id} failed; paystub voided: {source}")]
    LedgerApplyFailure {
        paystub_id: i64,
        #[source]
        source: RepositoryError,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<QuotaError> for PaystubError {
    fn from(error: QuotaError) -> Self {
        match error {
            QuotaError::Exceeded { limit, used } => Self::QuotaExceeded { limit, used },
        }
    }
}

impl From<InputError> for PaystubError {
    fn from(error: InputError) -> Self {
        Self::InvalidInput(error.to_string())
    }
}

fn is_transient(error: &RepositoryError) -> bool {
    matches!(
        error,
        RepositoryError::Conflict(_) | RepositoryError::Connection(_)
    )
}

impl PaystubError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Whether the same request may succeed later without being changed.
    ///
    /// A quota error clears after a usage reset or plan change; store
    /// conflicts and connection failures are transient. Jurisdiction,
    /// input and ledger errors need a fix first.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::QuotaExceeded { .. } => true,
            Self::LedgerApplyFailure { source, .. } => is_transient(source),
            Self::Repository(error) => is_transient(error),
            Self::Withholding(_)
            | Self::AlreadyVoided(_)
            | Self::InvalidInput(_)
            | Self::NotFound { .. }
            | Self::Ledger(_) => false,
        }
    }
}
