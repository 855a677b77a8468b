//! In-process repository backed by hash maps.
//!
//! Every multi-record write happens under one write lock, which gives the
//! same all-or-nothing behavior the SQLite backend gets from transactions.
//! Versions are checked before anything is changed.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::factory::{DbConfig, RepositoryFactory};
use super::repository::{PayrollRepository, RepositoryError};
use crate::models::{
    Account, Employee, NewAccount, NewEmployee, NewPaystub, Paystub, PaystubStatus,
};

#[derive(Default)]
struct Store {
    accounts: HashMap<i64, Account>,
    employees: HashMap<i64, Employee>,
    paystubs: BTreeMap<i64, Paystub>,
    last_id: i64,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

#[derive(Default)]
pub struct InMemoryRepository {
    store: RwLock<Store>,
    fail_ledger_writes: AtomicBool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `save_ledger_and_usage` fail, to exercise compensation paths.
    pub fn set_fail_ledger_writes(&self, fail: bool) {
        self.fail_ledger_writes.store(fail, Ordering::SeqCst);
    }
}

fn check_version(record: &str, id: i64, stored: i64, read: i64) -> Result<(), RepositoryError> {
    if stored != read {
        return Err(RepositoryError::Conflict(format!(
            "{record} {id} changed since it was read (version {read}, now {stored})"
        )));
    }
    Ok(())
}

/// Version-checked slots for one ledger and usage write.
fn writable<'a>(
    accounts: &'a mut HashMap<i64, Account>,
    employees: &'a mut HashMap<i64, Employee>,
    employee: &Employee,
    account: &Account,
) -> Result<(&'a mut Employee, &'a mut Account), RepositoryError> {
    let stored_employee = employees
        .get_mut(&employee.id)
        .ok_or(RepositoryError::NotFound)?;
    let stored_account = accounts
        .get_mut(&account.id)
        .ok_or(RepositoryError::NotFound)?;
    check_version(
        "employee ledger",
        employee.id,
        stored_employee.ledger_version,
        employee.ledger_version,
    )?;
    check_version("account", account.id, stored_account.version, account.version)?;
    Ok((stored_employee, stored_account))
}

fn store_ledger_and_usage(
    stored_employee: &mut Employee,
    stored_account: &mut Account,
    employee: &Employee,
    account: &Account,
) {
    stored_employee.ytd = employee.ytd.clone();
    stored_employee.ledger_version += 1;
    *stored_account = Account {
        version: stored_account.version + 1,
        ..account.clone()
    };
}

fn void_in_place(
    paystub: &mut Paystub,
    reason: &str,
    voided_at: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    if paystub.is_voided() {
        return Err(RepositoryError::Conflict(format!(
            "paystub {} is already voided",
            paystub.id
        )));
    }
    paystub.status = PaystubStatus::Voided;
    paystub.voided_at = Some(voided_at);
    paystub.void_reason = Some(reason.to_string());
    Ok(())
}

#[async_trait]
impl PayrollRepository for InMemoryRepository {
    async fn create_account(&self, account: NewAccount) -> Result<Account, RepositoryError> {
        let mut store = self.store.write().await;
        let id = store.next_id();
        let account = Account::from_new(id, account, Utc::now());
        store.accounts.insert(id, account.clone());
        Ok(account)
    }

    async fn get_account(&self, id: i64) -> Result<Account, RepositoryError> {
        let store = self.store.read().await;
        store
            .accounts
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn save_account(&self, account: &Account) -> Result<(), RepositoryError> {
        let mut store = self.store.write().await;
        let stored = store
            .accounts
            .get_mut(&account.id)
            .ok_or(RepositoryError::NotFound)?;
        check_version("account", account.id, stored.version, account.version)?;
        *stored = Account {
            version: stored.version + 1,
            ..account.clone()
        };
        Ok(())
    }

    async fn create_employee(&self, employee: NewEmployee) -> Result<Employee, RepositoryError> {
        let mut store = self.store.write().await;
        if !store.accounts.contains_key(&employee.account_id) {
            return Err(RepositoryError::NotFound);
        }
        let id = store.next_id();
        let employee = Employee::from_new(id, employee);
        store.employees.insert(id, employee.clone());
        Ok(employee)
    }

    async fn get_employee(&self, id: i64) -> Result<Employee, RepositoryError> {
        let store = self.store.read().await;
        store
            .employees
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn list_employees(&self, account_id: i64) -> Result<Vec<Employee>, RepositoryError> {
        let store = self.store.read().await;
        let mut employees: Vec<_> = store
            .employees
            .values()
            .filter(|e| e.account_id == account_id)
            .cloned()
            .collect();
        employees.sort_by_key(|e| e.id);
        Ok(employees)
    }

    async fn insert_paystub(&self, paystub: NewPaystub) -> Result<Paystub, RepositoryError> {
        let mut store = self.store.write().await;
        if store
            .paystubs
            .values()
            .any(|p| p.verification_id == paystub.verification_id)
        {
            return Err(RepositoryError::Conflict(format!(
                "verification id {} already issued",
                paystub.verification_id
            )));
        }
        let id = store.next_id();
        let paystub = Paystub::finalize(id, paystub, Utc::now());
        store.paystubs.insert(id, paystub.clone());
        Ok(paystub)
    }

    async fn get_paystub(&self, id: i64) -> Result<Paystub, RepositoryError> {
        let store = self.store.read().await;
        store
            .paystubs
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn get_paystub_by_verification_id(
        &self,
        verification_id: &str,
    ) -> Result<Paystub, RepositoryError> {
        let store = self.store.read().await;
        store
            .paystubs
            .values()
            .find(|p| p.verification_id == verification_id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn list_paystubs(&self, employee_id: i64) -> Result<Vec<Paystub>, RepositoryError> {
        let store = self.store.read().await;
        let mut paystubs: Vec<_> = store
            .paystubs
            .values()
            .filter(|p| p.employee_id == employee_id)
            .cloned()
            .collect();
        paystubs.sort_by_key(|p| (p.pay_date, p.id));
        Ok(paystubs)
    }

    async fn save_ledger_and_usage(
        &self,
        employee: &Employee,
        account: &Account,
    ) -> Result<(), RepositoryError> {
        if self.fail_ledger_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(
                "ledger writes are disabled".to_string(),
            ));
        }
        let mut store = self.store.write().await;
        let Store {
            accounts,
            employees,
            ..
        } = &mut *store;

        let (stored_employee, stored_account) = writable(accounts, employees, employee, account)?;
        store_ledger_and_usage(stored_employee, stored_account, employee, account);
        Ok(())
    }

    async fn mark_paystub_voided(
        &self,
        paystub_id: i64,
        reason: &str,
        voided_at: DateTime<Utc>,
    ) -> Result<Paystub, RepositoryError> {
        let mut store = self.store.write().await;
        let paystub = store
            .paystubs
            .get_mut(&paystub_id)
            .ok_or(RepositoryError::NotFound)?;
        void_in_place(paystub, reason, voided_at)?;
        Ok(paystub.clone())
    }

    async fn void_paystub(
        &self,
        paystub_id: i64,
        reason: &str,
        voided_at: DateTime<Utc>,
        employee: &Employee,
        account: &Account,
    ) -> Result<Paystub, RepositoryError> {
        let mut store = self.store.write().await;
        let Store {
            accounts,
            employees,
            paystubs,
            ..
        } = &mut *store;

        let paystub = paystubs
            .get_mut(&paystub_id)
            .ok_or(RepositoryError::NotFound)?;
        if paystub.is_voided() {
            return Err(RepositoryError::Conflict(format!(
                "paystub {paystub_id} is already voided"
            )));
        }
        let (stored_employee, stored_account) = writable(accounts, employees, employee, account)?;

        void_in_place(paystub, reason, voided_at)?;
        store_ledger_and_usage(stored_employee, stored_account, employee, account);

        Ok(paystub.clone())
    }
}

/// Registers the in-memory backend under `"memory"`.
pub struct MemoryRepositoryFactory;

#[async_trait]
impl RepositoryFactory for MemoryRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn create(
        &self,
        _config: &DbConfig,
    ) -> Result<Box<dyn PayrollRepository>, RepositoryError> {
        Ok(Box::new(InMemoryRepository::new()))
    }
}
