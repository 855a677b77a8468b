use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{Account, Employee, NewAccount, NewEmployee, NewPaystub, Paystub};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    /// A conditional write lost to a concurrent change: the paystub was
    /// already voided, or the record's version moved since it was read.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Account and ledger writes are optimistic. Each write carries the version
/// the caller read (`Account::version`, `Employee::ledger_version`); the store
/// applies it only when that still matches and then bumps the stored version.
/// A mismatch is a [`RepositoryError::Conflict`] and nothing is written.
#[async_trait]
pub trait PayrollRepository: Send + Sync {
    // Accounts
    async fn create_account(&self, account: NewAccount) -> Result<Account, RepositoryError>;
    async fn get_account(&self, id: i64) -> Result<Account, RepositoryError>;
    /// Persists limit, usage counter and reward fields if `account.version`
    /// is current.
    async fn save_account(&self, account: &Account) -> Result<(), RepositoryError>;

    // Employees
    async fn create_employee(&self, employee: NewEmployee) -> Result<Employee, RepositoryError>;
    async fn get_employee(&self, id: i64) -> Result<Employee, RepositoryError>;
    async fn list_employees(&self, account_id: i64) -> Result<Vec<Employee>, RepositoryError>;

    // Paystubs
    /// Stores a computed paystub as finalized and returns it with its id.
    async fn insert_paystub(&self, paystub: NewPaystub) -> Result<Paystub, RepositoryError>;
    async fn get_paystub(&self, id: i64) -> Result<Paystub, RepositoryError>;
    async fn get_paystub_by_verification_id(
        &self,
        verification_id: &str,
    ) -> Result<Paystub, RepositoryError>;
    /// Paystubs for one employee, oldest pay date first.
    async fn list_paystubs(&self, employee_id: i64) -> Result<Vec<Paystub>, RepositoryError>;

    /// Writes `employee.ytd` together with the account's usage and rewards.
    /// Either both are stored or neither; a stale version on either record
    /// is a [`RepositoryError::Conflict`].
    async fn save_ledger_and_usage(
        &self,
        employee: &Employee,
        account: &Account,
    ) -> Result<(), RepositoryError>;

    /// Marks a paystub voided without touching any ledger. Used to cancel a
    /// paystub whose ledger update failed.
    ///
    /// Returns [`RepositoryError::Conflict`] if it is already voided.
    async fn mark_paystub_voided(
        &self,
        paystub_id: i64,
        reason: &str,
        voided_at: DateTime<Utc>,
    ) -> Result<Paystub, RepositoryError>;

    /// Voids a paystub and stores the reversed `employee.ytd` and account in
    /// one atomic step, only if the paystub is not already voided.
    ///
    /// Returns [`RepositoryError::Conflict`] if it is already voided or
    /// either version is stale.
    async fn void_paystub(
        &self,
        paystub_id: i64,
        reason: &str,
        voided_at: DateTime<Utc>,
        employee: &Employee,
        account: &Account,
    ) -> Result<Paystub, RepositoryError>;
}
