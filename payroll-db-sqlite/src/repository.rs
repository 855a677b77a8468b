use std::fmt::Display;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use payroll_core::models::{
    Account, Employee, FilingStatus, NewAccount, NewEmployee, NewPaystub, PayFrequency, Paystub,
    PaystubLimit, PaystubStatus, RewardTier, YtdLedger,
};
use payroll_core::{PayrollRepository, RepositoryError};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::{Executor, FromRow, Sqlite};
use tracing::{debug, info};

use crate::decimal::{parse_decimal, parse_json, to_json};

pub struct SqliteRepository {
    pool: SqlitePool,
}

/// Each connection to `sqlite::memory:` opens its own empty database, so an
/// in-memory pool is pinned to a single connection that is never recycled.
fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

impl SqliteRepository {
    /// Connects using a sqlx URL such as `sqlite:payroll.db?mode=rwc` or
    /// `sqlite::memory:`. Foreign keys are enforced.
    pub async fn new(database_url: &str) -> Result<Self, RepositoryError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| RepositoryError::Configuration(e.to_string()))?
            .foreign_keys(true);

        let pool_options = if is_in_memory(database_url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };
        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| RepositoryError::Connection(e.to_string()))?;
        Ok(Self { pool })
    }

    pub fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<(), RepositoryError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        info!("sqlite migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn database_error(err: sqlx::Error) -> RepositoryError {
    match &err {
        sqlx::Error::RowNotFound => RepositoryError::NotFound,
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::Conflict(db.message().to_string())
        }
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => RepositoryError::NotFound,
        _ => RepositoryError::Database(err.to_string()),
    }
}

fn invalid(column: &str, value: impl Display) -> RepositoryError {
    RepositoryError::Database(format!("Invalid value '{}' in column '{}'", value, column))
}

fn to_i64(column: &str, value: u64) -> Result<i64, RepositoryError> {
    i64::try_from(value).map_err(|_| invalid(column, value))
}

fn already_voided(paystub_id: i64) -> RepositoryError {
    RepositoryError::Conflict(format!("paystub {} is already voided", paystub_id))
}

/// Explains a versioned UPDATE that matched no row: the row is either gone
/// or was written by someone else after it was read.
async fn stale_or_missing(
    conn: &mut SqliteConnection,
    table: &'static str,
    id: i64,
) -> RepositoryError {
    let exists: Result<Option<i64>, sqlx::Error> =
        sqlx::query_scalar(&format!("SELECT 1 FROM {table} WHERE id = ?"))
            .bind(id)
            .fetch_optional(conn)
            .await;
    match exists {
        Ok(Some(_)) => RepositoryError::Conflict(format!(
            "{table} row {id} changed since it was read"
        )),
        Ok(None) => RepositoryError::NotFound,
        Err(e) => database_error(e),
    }
}

// Accounts

const SELECT_ACCOUNT: &str = "SELECT id, company_name, paystub_limit, paystubs_used_this_month,
        reward_points, lifetime_points, reward_tier, created_at, version
     FROM accounts";

#[derive(FromRow)]
struct AccountRow {
    id: i64,
    company_name: String,
    paystub_limit: i64,
    paystubs_used_this_month: i64,
    reward_points: i64,
    lifetime_points: i64,
    reward_tier: String,
    created_at: DateTime<Utc>,
    version: i64,
}

impl TryFrom<AccountRow> for Account {
    type Error = RepositoryError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(Account {
            id: row.id,
            company_name: row.company_name,
            paystub_limit: PaystubLimit::from_sentinel(row.paystub_limit)
                .ok_or_else(|| invalid("paystub_limit", row.paystub_limit))?,
            paystubs_used_this_month: u32::try_from(row.paystubs_used_this_month)
                .map_err(|_| invalid("paystubs_used_this_month", row.paystubs_used_this_month))?,
            reward_points: u64::try_from(row.reward_points)
                .map_err(|_| invalid("reward_points", row.reward_points))?,
            lifetime_points: u64::try_from(row.lifetime_points)
                .map_err(|_| invalid("lifetime_points", row.lifetime_points))?,
            reward_tier: RewardTier::parse(&row.reward_tier)
                .ok_or_else(|| invalid("reward_tier", &row.reward_tier))?,
            created_at: row.created_at,
            version: row.version,
        })
    }
}

async fn write_account(
    conn: &mut SqliteConnection,
    account: &Account,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        "UPDATE accounts SET
            company_name = ?, paystub_limit = ?, paystubs_used_this_month = ?,
            reward_points = ?, lifetime_points = ?, reward_tier = ?,
            version = version + 1
         WHERE id = ? AND version = ?",
    )
    .bind(&account.company_name)
    .bind(account.paystub_limit.to_sentinel())
    .bind(i64::from(account.paystubs_used_this_month))
    .bind(to_i64("reward_points", account.reward_points)?)
    .bind(to_i64("lifetime_points", account.lifetime_points)?)
    .bind(account.reward_tier.as_str())
    .bind(account.id)
    .bind(account.version)
    .execute(&mut *conn)
    .await
    .map_err(database_error)?;

    if result.rows_affected() == 0 {
        return Err(stale_or_missing(conn, "accounts", account.id).await);
    }
    Ok(())
}

// Employees

const SELECT_EMPLOYEE: &str = "SELECT id, account_id, first_name, last_name, pay_rate,
        pay_frequency, filing_status, state, locality, federal_allowances, state_allowances,
        federal_additional_withholding, state_additional_withholding, pto_accrual_rate,
        hire_date, elections, ytd, ledger_version
     FROM employees";

#[derive(FromRow)]
struct EmployeeRow {
    id: i64,
    account_id: i64,
    first_name: String,
    last_name: String,
    pay_rate: String,
    pay_frequency: String,
    filing_status: String,
    state: String,
    locality: Option<String>,
    federal_allowances: i64,
    state_allowances: i64,
    federal_additional_withholding: String,
    state_additional_withholding: String,
    pto_accrual_rate: String,
    hire_date: Option<NaiveDate>,
    elections: String,
    ytd: String,
    ledger_version: i64,
}

impl TryFrom<EmployeeRow> for Employee {
    type Error = RepositoryError;

    fn try_from(row: EmployeeRow) -> Result<Self, Self::Error> {
        Ok(Employee {
            id: row.id,
            account_id: row.account_id,
            first_name: row.first_name,
            last_name: row.last_name,
            pay_rate: parse_decimal("pay_rate", &row.pay_rate)?,
            pay_frequency: PayFrequency::parse(&row.pay_frequency)
                .ok_or_else(|| invalid("pay_frequency", &row.pay_frequency))?,
            filing_status: FilingStatus::parse(&row.filing_status)
                .ok_or_else(|| invalid("filing_status", &row.filing_status))?,
            state: row.state,
            locality: row.locality,
            federal_allowances: u32::try_from(row.federal_allowances)
                .map_err(|_| invalid("federal_allowances", row.federal_allowances))?,
            state_allowances: u32::try_from(row.state_allowances)
                .map_err(|_| invalid("state_allowances", row.state_allowances))?,
            federal_additional_withholding: parse_decimal(
                "federal_additional_withholding",
                &row.federal_additional_withholding,
            )?,
            state_additional_withholding: parse_decimal(
                "state_additional_withholding",
                &row.state_additional_withholding,
            )?,
            elections: parse_json("elections", &row.elections)?,
            pto_accrual_rate: parse_decimal("pto_accrual_rate", &row.pto_accrual_rate)?,
            hire_date: row.hire_date,
            ytd: parse_json("ytd", &row.ytd)?,
            ledger_version: row.ledger_version,
        })
    }
}

async fn write_ledger(
    conn: &mut SqliteConnection,
    employee: &Employee,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        "UPDATE employees SET ytd = ?, ledger_version = ledger_version + 1
         WHERE id = ? AND ledger_version = ?",
    )
    .bind(to_json("ytd", &employee.ytd)?)
    .bind(employee.id)
    .bind(employee.ledger_version)
    .execute(&mut *conn)
    .await
    .map_err(database_error)?;

    if result.rows_affected() == 0 {
        return Err(stale_or_missing(conn, "employees", employee.id).await);
    }
    Ok(())
}

// Paystubs

const SELECT_PAYSTUB: &str = "SELECT id, verification_id, account_id, employee_id,
        period_start, period_end, pay_date, pay_frequency, state, locality, net_pay,
        amount_in_words, earnings, withholding, deductions, pto, ytd_before, deltas,
        status, created_at, finalized_at, voided_at, void_reason
     FROM paystubs";

#[derive(FromRow)]
struct PaystubRow {
    id: i64,
    verification_id: String,
    account_id: i64,
    employee_id: i64,
    period_start: NaiveDate,
    period_end: NaiveDate,
    pay_date: NaiveDate,
    pay_frequency: String,
    state: String,
    locality: Option<String>,
    net_pay: String,
    amount_in_words: String,
    earnings: String,
    withholding: String,
    deductions: String,
    pto: String,
    ytd_before: String,
    deltas: String,
    status: String,
    created_at: DateTime<Utc>,
    finalized_at: Option<DateTime<Utc>>,
    voided_at: Option<DateTime<Utc>>,
    void_reason: Option<String>,
}

impl TryFrom<PaystubRow> for Paystub {
    type Error = RepositoryError;

    fn try_from(row: PaystubRow) -> Result<Self, Self::Error> {
        Ok(Paystub {
            id: row.id,
            verification_id: row.verification_id,
            account_id: row.account_id,
            employee_id: row.employee_id,
            period_start: row.period_start,
            period_end: row.period_end,
            pay_date: row.pay_date,
            pay_frequency: PayFrequency::parse(&row.pay_frequency)
                .ok_or_else(|| invalid("pay_frequency", &row.pay_frequency))?,
            state: row.state,
            locality: row.locality,
            earnings: parse_json("earnings", &row.earnings)?,
            withholding: parse_json("withholding", &row.withholding)?,
            deductions: parse_json("deductions", &row.deductions)?,
            net_pay: parse_decimal("net_pay", &row.net_pay)?,
            amount_in_words: row.amount_in_words,
            pto: parse_json("pto", &row.pto)?,
            ytd_before: parse_json("ytd_before", &row.ytd_before)?,
            deltas: parse_json("deltas", &row.deltas)?,
            status: PaystubStatus::parse(&row.status)
                .ok_or_else(|| invalid("status", &row.status))?,
            created_at: row.created_at,
            finalized_at: row.finalized_at,
            voided_at: row.voided_at,
            void_reason: row.void_reason,
        })
    }
}

/// Sets a paystub voided unless it already is. Returns whether a row changed.
async fn void_if_not_voided<'e, E>(
    executor: E,
    paystub_id: i64,
    reason: &str,
    voided_at: DateTime<Utc>,
) -> Result<bool, RepositoryError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "UPDATE paystubs SET status = ?, voided_at = ?, void_reason = ?
         WHERE id = ? AND status != ?",
    )
    .bind(PaystubStatus::Voided.as_str())
    .bind(voided_at)
    .bind(reason)
    .bind(paystub_id)
    .bind(PaystubStatus::Voided.as_str())
    .execute(executor)
    .await
    .map_err(database_error)?;

    Ok(result.rows_affected() == 1)
}

#[async_trait]
impl PayrollRepository for SqliteRepository {
    async fn create_account(&self, account: NewAccount) -> Result<Account, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO accounts (company_name, paystub_limit, reward_tier, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&account.company_name)
        .bind(account.paystub_limit.to_sentinel())
        .bind(RewardTier::default().as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        self.get_account(result.last_insert_rowid()).await
    }

    async fn get_account(&self, id: i64) -> Result<Account, RepositoryError> {
        let row: AccountRow = sqlx::query_as(&format!("{SELECT_ACCOUNT} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(database_error)?
            .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn save_account(&self, account: &Account) -> Result<(), RepositoryError> {
        let mut conn = self.pool.acquire().await.map_err(database_error)?;
        write_account(&mut *conn, account).await
    }

    async fn create_employee(&self, employee: NewEmployee) -> Result<Employee, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO employees (
                account_id, first_name, last_name, pay_rate, pay_frequency, filing_status,
                state, locality, federal_allowances, state_allowances,
                federal_additional_withholding, state_additional_withholding,
                pto_accrual_rate, hire_date, elections, ytd
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(employee.account_id)
        .bind(&employee.first_name)
        .bind(&employee.last_name)
        .bind(employee.pay_rate.to_string())
        .bind(employee.pay_frequency.as_str())
        .bind(employee.filing_status.as_str())
        .bind(&employee.state)
        .bind(employee.locality.as_deref())
        .bind(i64::from(employee.federal_allowances))
        .bind(i64::from(employee.state_allowances))
        .bind(employee.federal_additional_withholding.to_string())
        .bind(employee.state_additional_withholding.to_string())
        .bind(employee.pto_accrual_rate.to_string())
        .bind(employee.hire_date)
        .bind(to_json("elections", &employee.elections)?)
        .bind(to_json("ytd", &YtdLedger::default())?)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        let id = result.last_insert_rowid();
        debug!(employee_id = id, account_id = employee.account_id, "employee created");
        self.get_employee(id).await
    }

    async fn get_employee(&self, id: i64) -> Result<Employee, RepositoryError> {
        let row: EmployeeRow = sqlx::query_as(&format!("{SELECT_EMPLOYEE} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(database_error)?
            .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn list_employees(&self, account_id: i64) -> Result<Vec<Employee>, RepositoryError> {
        let rows: Vec<EmployeeRow> =
            sqlx::query_as(&format!("{SELECT_EMPLOYEE} WHERE account_id = ? ORDER BY id"))
                .bind(account_id)
                .fetch_all(&self.pool)
                .await
                .map_err(database_error)?;

        rows.into_iter().map(Employee::try_from).collect()
    }

    async fn insert_paystub(&self, paystub: NewPaystub) -> Result<Paystub, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO paystubs (
                verification_id, account_id, employee_id, period_start, period_end, pay_date,
                pay_frequency, state, locality, gross, net_pay, amount_in_words,
                earnings, withholding, deductions, pto, ytd_before, deltas,
                status, created_at, finalized_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&paystub.verification_id)
        .bind(paystub.account_id)
        .bind(paystub.employee_id)
        .bind(paystub.period_start)
        .bind(paystub.period_end)
        .bind(paystub.pay_date)
        .bind(paystub.pay_frequency.as_str())
        .bind(&paystub.state)
        .bind(paystub.locality.as_deref())
        .bind(paystub.earnings.gross.to_string())
        .bind(paystub.net_pay.to_string())
        .bind(&paystub.amount_in_words)
        .bind(to_json("earnings", &paystub.earnings)?)
        .bind(to_json("withholding", &paystub.withholding)?)
        .bind(to_json("deductions", &paystub.deductions)?)
        .bind(to_json("pto", &paystub.pto)?)
        .bind(to_json("ytd_before", &paystub.ytd_before)?)
        .bind(to_json("deltas", &paystub.deltas)?)
        .bind(PaystubStatus::Finalized.as_str())
        .bind(paystub.created_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        self.get_paystub(result.last_insert_rowid()).await
    }

    async fn get_paystub(&self, id: i64) -> Result<Paystub, RepositoryError> {
        let row: PaystubRow = sqlx::query_as(&format!("{SELECT_PAYSTUB} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(database_error)?
            .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn get_paystub_by_verification_id(
        &self,
        verification_id: &str,
    ) -> Result<Paystub, RepositoryError> {
        let row: PaystubRow =
            sqlx::query_as(&format!("{SELECT_PAYSTUB} WHERE verification_id = ?"))
                .bind(verification_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(database_error)?
                .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    async fn list_paystubs(&self, employee_id: i64) -> Result<Vec<Paystub>, RepositoryError> {
        let rows: Vec<PaystubRow> = sqlx::query_as(&format!(
            "{SELECT_PAYSTUB} WHERE employee_id = ? ORDER BY pay_date, id"
        ))
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        rows.into_iter().map(Paystub::try_from).collect()
    }

    async fn save_ledger_and_usage(
        &self,
        employee: &Employee,
        account: &Account,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;

        write_ledger(&mut *tx, employee).await?;
        write_account(&mut *tx, account).await?;

        tx.commit().await.map_err(database_error)
    }

    async fn mark_paystub_voided(
        &self,
        paystub_id: i64,
        reason: &str,
        voided_at: DateTime<Utc>,
    ) -> Result<Paystub, RepositoryError> {
        if !void_if_not_voided(&self.pool, paystub_id, reason, voided_at).await? {
            // Either missing or already voided; get_paystub reports NotFound.
            self.get_paystub(paystub_id).await?;
            return Err(already_voided(paystub_id));
        }
        self.get_paystub(paystub_id).await
    }

    async fn void_paystub(
        &self,
        paystub_id: i64,
        reason: &str,
        voided_at: DateTime<Utc>,
        employee: &Employee,
        account: &Account,
    ) -> Result<Paystub, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;

        // Write first so the transaction takes the write lock up front.
        if !void_if_not_voided(&mut *tx, paystub_id, reason, voided_at).await? {
            let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM paystubs WHERE id = ?")
                .bind(paystub_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(database_error)?;
            return Err(match exists {
                Some(_) => already_voided(paystub_id),
                None => RepositoryError::NotFound,
            });
        }
        write_ledger(&mut *tx, employee).await?;
        write_account(&mut *tx, account).await?;

        tx.commit().await.map_err(database_error)?;
        debug!(
            paystub_id,
            employee_id = employee.id,
            "paystub voided and ledger restored"
        );

        self.get_paystub(paystub_id).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use payroll_core::models::{
        Deductions, Earnings, LedgerDelta, PtoActivity, PtoBucket, Withholding,
    };
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    async fn setup_test_db() -> SqliteRepository {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");

        let repo = SqliteRepository::new_with_pool(pool);
        repo.run_migrations()
            .await
            .expect("Failed to run migrations");
        repo
    }

    async fn seeded() -> (SqliteRepository, Account, Employee) {
        let repo = setup_test_db().await;
        let account = repo
            .create_account(NewAccount {
                company_name: "Acme".to_string(),
                paystub_limit: PaystubLimit::Monthly(10),
            })
            .await
            .expect("account");
        let mut new = NewEmployee::new(
            account.id,
            "Ada",
            "Lovelace",
            dec!(25.00),
            PayFrequency::Biweekly,
            "NY",
        );
        new.locality = Some("New York City".to_string());
        new.elections.retirement_401k_percent = dec!(0.05);
        new.hire_date = NaiveDate::from_ymd_opt(2024, 6, 3);
        let employee = repo.create_employee(new).await.expect("employee");
        (repo, account, employee)
    }

    fn draft(account: &Account, employee: &Employee, verification_id: &str) -> NewPaystub {
        let date = |d| NaiveDate::from_ymd_opt(2025, 3, d).expect("valid date");
        let earnings = Earnings {
            regular_hours: dec!(80),
            regular_rate: dec!(25.00),
            regular_pay: dec!(2000.00),
            gross: dec!(2000.00),
            ..Earnings::default()
        };
        let withholding = Withholding {
            federal_income_tax: dec!(163.69),
            social_security_tax: dec!(124.00),
            medicare_tax: dec!(29.00),
            ..Withholding::default()
        };
        let deductions = Deductions {
            retirement_401k: dec!(100.00),
            ..Deductions::default()
        };
        let pto = PtoActivity {
            vacation_accrued: dec!(3.072),
            ..PtoActivity::default()
        };
        let net_pay = dec!(1583.31);
        NewPaystub {
            verification_id: verification_id.to_string(),
            account_id: account.id,
            employee_id: employee.id,
            period_start: date(1),
            period_end: date(14),
            pay_date: date(15),
            pay_frequency: employee.pay_frequency,
            state: employee.state.clone(),
            locality: employee.locality.clone(),
            deltas: LedgerDelta::from_parts(&earnings, &withholding, &deductions, &pto, net_pay),
            earnings,
            withholding,
            deductions,
            net_pay,
            amount_in_words: "ONE THOUSAND FIVE HUNDRED EIGHTY THREE DOLLARS AND 31/100"
                .to_string(),
            pto,
            ytd_before: employee.ytd.clone(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_account_round_trip() {
        let repo = setup_test_db().await;

        let mut account = repo
            .create_account(NewAccount {
                company_name: "Globex".to_string(),
                paystub_limit: PaystubLimit::Unlimited,
            })
            .await
            .expect("Should create account");

        assert_eq!(account.paystub_limit, PaystubLimit::Unlimited);
        assert_eq!(account.reward_tier, RewardTier::Bronze);
        assert_eq!(account.paystubs_used_this_month, 0);

        account.paystub_limit = PaystubLimit::Monthly(3);
        account.paystubs_used_this_month = 2;
        account.reward_points = 1020;
        account.lifetime_points = 1020;
        account.reward_tier = RewardTier::Gold;
        repo.save_account(&account).await.expect("Should save");

        let stored = repo.get_account(account.id).await.expect("account");
        assert_eq!(stored.version, account.version + 1);
        assert_eq!(
            stored,
            Account {
                version: account.version + 1,
                ..account.clone()
            }
        );

        // saving the copy read before the first save is stale
        let stale = repo.save_account(&account).await;
        assert!(matches!(stale, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_get_account_not_found() {
        let repo = setup_test_db().await;

        assert_eq!(repo.get_account(42).await, Err(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_employee_round_trip() {
        let (repo, account, employee) = seeded().await;

        assert_eq!(employee.pay_rate.to_string(), "25.00");
        assert_eq!(employee.locality.as_deref(), Some("New York City"));
        assert_eq!(employee.elections.retirement_401k_percent, dec!(0.05));
        assert_eq!(employee.ytd, YtdLedger::default());

        let listed = repo.list_employees(account.id).await.expect("Should list");
        assert_eq!(listed, vec![employee]);
    }

    #[tokio::test]
    async fn test_employee_requires_existing_account() {
        let repo = setup_test_db().await;

        let result = repo
            .create_employee(NewEmployee::new(
                99,
                "Ada",
                "Lovelace",
                dec!(25),
                PayFrequency::Weekly,
                "TX",
            ))
            .await;

        assert_eq!(result, Err(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_insert_paystub_finalizes() {
        let (repo, account, employee) = seeded().await;
        let new = draft(&account, &employee, "PS-20250315-0A1B2C3D");

        let stored = repo.insert_paystub(new.clone()).await.expect("Should insert");

        assert_eq!(stored.status, PaystubStatus::Finalized);
        assert!(stored.finalized_at.is_some());
        assert_eq!(stored.earnings, new.earnings);
        assert_eq!(stored.deltas, new.deltas);
        assert_eq!(stored.net_pay, dec!(1583.31));
        assert_eq!(
            repo.get_paystub_by_verification_id("PS-20250315-0A1B2C3D")
                .await,
            Ok(stored)
        );
    }

    #[tokio::test]
    async fn test_duplicate_verification_id_conflicts() {
        let (repo, account, employee) = seeded().await;
        repo.insert_paystub(draft(&account, &employee, "PS-20250315-00000001"))
            .await
            .expect("first insert");

        let result = repo
            .insert_paystub(draft(&account, &employee, "PS-20250315-00000001"))
            .await;

        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_list_paystubs_by_pay_date() {
        let (repo, account, employee) = seeded().await;
        let mut later = draft(&account, &employee, "PS-20250329-00000002");
        later.pay_date = NaiveDate::from_ymd_opt(2025, 3, 29).expect("valid date");
        repo.insert_paystub(later).await.expect("insert later");
        repo.insert_paystub(draft(&account, &employee, "PS-20250315-00000001"))
            .await
            .expect("insert earlier");

        let listed = repo.list_paystubs(employee.id).await.expect("Should list");

        let ids: Vec<_> = listed.iter().map(|p| p.verification_id.as_str()).collect();
        assert_eq!(ids, vec!["PS-20250315-00000001", "PS-20250329-00000002"]);
    }

    #[tokio::test]
    async fn test_save_ledger_and_usage() {
        let (repo, mut account, mut employee) = seeded().await;
        let ledger = YtdLedger {
            gross: dec!(2000.00),
            overtime_pay: dec!(112.50),
            health_insurance: dec!(85.50),
            vacation: PtoBucket::new(dec!(3.072), dec!(0)),
            ..YtdLedger::default()
        };
        employee.ytd = ledger.clone();
        account.paystubs_used_this_month = 1;

        repo.save_ledger_and_usage(&employee, &account)
            .await
            .expect("Should save");

        let stored = repo.get_employee(employee.id).await.expect("employee");
        assert_eq!(stored.ytd, ledger);
        assert_eq!(stored.ledger_version, employee.ledger_version + 1);
        assert_eq!(stored.ytd.vacation.balance(), dec!(3.072));
        assert_eq!(
            repo.get_account(account.id)
                .await
                .expect("account")
                .paystubs_used_this_month,
            1
        );
    }

    #[tokio::test]
    async fn test_save_ledger_rolls_back_when_account_is_missing() {
        let (repo, mut account, mut employee) = seeded().await;
        employee.ytd.gross = dec!(2000.00);
        account.id = 999;

        let result = repo.save_ledger_and_usage(&employee, &account).await;

        assert_eq!(result, Err(RepositoryError::NotFound));
        let stored = repo.get_employee(employee.id).await.expect("employee");
        assert_eq!(stored.ytd, YtdLedger::default());
        assert_eq!(stored.ledger_version, 0);
    }

    #[tokio::test]
    async fn test_stale_ledger_version_conflicts() {
        let (repo, account, employee) = seeded().await;
        let mut first = employee.clone();
        first.ytd.gross = dec!(2000.00);
        repo.save_ledger_and_usage(&first, &account)
            .await
            .expect("first save");
        let fresh_account = repo.get_account(account.id).await.expect("account");

        // same ledger version as the first writer, current account version
        let mut second = employee.clone();
        second.ytd.gross = dec!(4000.00);
        let result = repo.save_ledger_and_usage(&second, &fresh_account).await;

        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
        let stored = repo.get_employee(employee.id).await.expect("employee");
        assert_eq!(stored.ytd.gross, dec!(2000.00));
        assert_eq!(stored.ledger_version, 1);
        assert_eq!(
            repo.get_account(account.id).await.expect("account"),
            fresh_account
        );
    }

    #[tokio::test]
    async fn test_stale_account_version_rolls_back_ledger() {
        let (repo, account, mut employee) = seeded().await;
        let mut rewarded = account.clone();
        rewarded.reward_points = 10;
        repo.save_account(&rewarded).await.expect("save account");

        employee.ytd.gross = dec!(2000.00);
        let result = repo.save_ledger_and_usage(&employee, &account).await;

        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
        let stored = repo.get_employee(employee.id).await.expect("employee");
        assert_eq!(stored.ytd, YtdLedger::default());
        assert_eq!(stored.ledger_version, 0);
    }

    #[tokio::test]
    async fn test_mark_voided_twice_conflicts() {
        let (repo, account, employee) = seeded().await;
        let stored = repo
            .insert_paystub(draft(&account, &employee, "PS-20250315-00000003"))
            .await
            .expect("insert");
        let at = Utc::now();

        let voided = repo
            .mark_paystub_voided(stored.id, "system: ledger update failed", at)
            .await
            .expect("first void");
        assert_eq!(voided.status, PaystubStatus::Voided);
        assert_eq!(voided.void_reason.as_deref(), Some("system: ledger update failed"));

        let again = repo.mark_paystub_voided(stored.id, "again", at).await;
        assert!(matches!(again, Err(RepositoryError::Conflict(_))));

        let missing = repo.mark_paystub_voided(4242, "none", at).await;
        assert_eq!(missing, Err(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_void_paystub_writes_ledger_once() {
        let (repo, account, employee) = seeded().await;
        let stored = repo
            .insert_paystub(draft(&account, &employee, "PS-20250315-00000004"))
            .await
            .expect("insert");

        let voided = repo
            .void_paystub(stored.id, "entered twice", Utc::now(), &employee, &account)
            .await
            .expect("void");
        assert_eq!(voided.status, PaystubStatus::Voided);
        assert!(voided.voided_at.is_some());

        // fresh versions, so only the voided status can reject this
        let current = repo.get_employee(employee.id).await.expect("employee");
        let mut other = repo.get_account(account.id).await.expect("account");
        other.paystubs_used_this_month = 7;
        let second = repo
            .void_paystub(stored.id, "again", Utc::now(), &current, &other)
            .await;
        assert!(matches!(second, Err(RepositoryError::Conflict(_))));
        assert_eq!(
            repo.get_account(account.id)
                .await
                .expect("account")
                .paystubs_used_this_month,
            0
        );

        let missing = repo
            .void_paystub(4242, "none", Utc::now(), &current, &other)
            .await;
        assert_eq!(missing, Err(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_stale_void_keeps_paystub_finalized() {
        let (repo, account, employee) = seeded().await;
        let stored = repo
            .insert_paystub(draft(&account, &employee, "PS-20250315-00000005"))
            .await
            .expect("insert");
        let mut moved = employee.clone();
        moved.ytd.gross = dec!(2000.00);
        repo.save_ledger_and_usage(&moved, &account)
            .await
            .expect("save");
        let fresh_account = repo.get_account(account.id).await.expect("account");

        let result = repo
            .void_paystub(stored.id, "entered twice", Utc::now(), &employee, &fresh_account)
            .await;

        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
        let after = repo.get_paystub(stored.id).await.expect("paystub");
        assert_eq!(after.status, PaystubStatus::Finalized);
        assert_eq!(after.void_reason, None);
        assert_eq!(
            repo.get_employee(employee.id).await.expect("employee").ytd.gross,
            dec!(2000.00)
        );
    }
}
