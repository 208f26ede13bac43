//! Synthetic demo data for the banking warehouse.
//!
//! Generation and insertion are kept apart: [`Fabricator`] only draws
//! records from a random source, [`Seeder`] writes them inside a single
//! transaction that is either committed whole or rolled back whole.

use chrono::{Days, Local, NaiveDate};
use fake::faker::address::en::{CityName, CountryName};
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use postgres::Transaction as PgTransaction;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::config::DatabaseSettings;
use crate::error::{Error, Result};
use crate::executor::connect;

pub const SCHEMA_DDL: &str = include_str!("../sql/banking.sql");

pub const SALARY: &str = "Salary";

const SALARY_CENTS: (i64, i64) = (150_000, 500_000);
const REGULAR_CENTS: (i64, i64) = (550, 100_000);
const CUSTOMER_HISTORY_DAYS: u64 = 5 * 365;
const ACCOUNT_HISTORY_DAYS: u64 = 3 * 365;
const FIRST_CUSTOMER_ID: usize = 1000;
const FIRST_ACCOUNT_ID: usize = 20_000;
const PROGRESS_EVERY: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionType {
    pub name: &'static str,
    pub is_debit: bool,
}

pub const TRANSACTION_TYPES: [TransactionType; 8] = [
    TransactionType { name: "Deposit", is_debit: false },
    TransactionType { name: "Withdrawal", is_debit: true },
    TransactionType { name: "Transfer Out", is_debit: true },
    TransactionType { name: "Transfer In", is_debit: false },
    TransactionType { name: "Online Purchase", is_debit: true },
    TransactionType { name: "ATM Withdrawal", is_debit: true },
    TransactionType { name: SALARY, is_debit: false },
    TransactionType { name: "Bill Payment", is_debit: true },
];

const ACCOUNT_TYPES: [&str; 2] = ["Checking", "Savings"];
const ACCOUNT_STATUS: &str = "Active";

/// How much to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedPlan {
    pub customers: usize,
    pub transactions: usize,
}

impl Default for SeedPlan {
    fn default() -> Self {
        Self {
            customers: 500,
            transactions: 20_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    pub customer_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub city: String,
    pub country: String,
    pub registration_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub account_id: String,
    pub customer_key: i32,
    pub account_type: &'static str,
    pub open_date: NaiveDate,
    pub status: &'static str,
}

/// A transaction type as stored, with its surrogate key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeKey {
    pub key: i32,
    pub name: String,
    pub is_debit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub date_key: i32,
    pub account_key: i32,
    pub type_key: i32,
    pub amount: Decimal,
    pub location: String,
}

/// Draws fake records from a ChaCha stream.
pub struct Fabricator {
    rng: ChaCha8Rng,
    today: NaiveDate,
    next_account_id: usize,
}

impl Fabricator {
    pub fn new(seed: Option<u64>) -> Self {
        Self::with_today(seed.unwrap_or_else(rand::random), Local::now().date_naive())
    }

    pub fn with_today(seed: u64, today: NaiveDate) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            today,
            next_account_id: FIRST_ACCOUNT_ID,
        }
    }

    fn date_within(&mut self, days: u64) -> NaiveDate {
        let back = self.rng.gen_range(0..=days);

        self.today.checked_sub_days(Days::new(back)).unwrap_or(self.today)
    }

    pub fn customers(&mut self, count: usize) -> Vec<Customer> {
        (0..count)
            .map(|i| Customer {
                customer_id: format!("CUST{}", FIRST_CUSTOMER_ID + i),
                first_name: FirstName().fake_with_rng(&mut self.rng),
                last_name: LastName().fake_with_rng(&mut self.rng),
                email: SafeEmail().fake_with_rng(&mut self.rng),
                city: CityName().fake_with_rng(&mut self.rng),
                country: CountryName().fake_with_rng(&mut self.rng),
                registration_date: self.date_within(CUSTOMER_HISTORY_DAYS),
            })
            .collect()
    }

    /// One or two accounts per customer.
    pub fn accounts(&mut self, customer_keys: &[i32]) -> Vec<Account> {
        let mut accounts = Vec::with_capacity(customer_keys.len() * 2);

        for &customer_key in customer_keys {
            for _ in 0..self.rng.gen_range(1..=2) {
                let account_type = ACCOUNT_TYPES[self.rng.gen_range(0..ACCOUNT_TYPES.len())];

                accounts.push(Account {
                    account_id: format!("ACC{}", self.next_account_id),
                    customer_key,
                    account_type,
                    open_date: self.date_within(ACCOUNT_HISTORY_DAYS),
                    status: ACCOUNT_STATUS,
                });

                self.next_account_id += 1;
            }
        }

        accounts
    }

    /// Salary pays more than everything else; debits are stored negative.
    pub fn amount(&mut self, ty: &TypeKey) -> Decimal {
        let (low, high) = if ty.name == SALARY {
            SALARY_CENTS
        } else {
            REGULAR_CENTS
        };

        let cents = self.rng.gen_range(low..=high);

        Decimal::new(if ty.is_debit { -cents } else { cents }, 2)
    }

    pub fn transactions(
        &mut self,
        count: usize,
        types: &[TypeKey],
        account_keys: &[i32],
        date_keys: &[i32],
    ) -> Result<Vec<Transaction>> {
        if types.is_empty() || account_keys.is_empty() || date_keys.is_empty() {
            return Err(Error::Seed(format!(
                "need transaction types, accounts and dates to draw from (have {}, {}, {})",
                types.len(),
                account_keys.len(),
                date_keys.len()
            )));
        }

        let mut transactions = Vec::with_capacity(count);

        for _ in 0..count {
            let ty = &types[self.rng.gen_range(0..types.len())];
            let date_key = date_keys[self.rng.gen_range(0..date_keys.len())];
            let account_key = account_keys[self.rng.gen_range(0..account_keys.len())];
            let amount = self.amount(ty);

            transactions.push(Transaction {
                date_key,
                account_key,
                type_key: ty.key,
                amount,
                location: CityName().fake_with_rng(&mut self.rng),
            });
        }

        Ok(transactions)
    }
}

/// Row counts written by one successful run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub transaction_types: usize,
    pub customers: usize,
    pub accounts: usize,
    pub transactions: usize,
}

pub struct Seeder<'s> {
    database: &'s DatabaseSettings,
    plan: SeedPlan,
    create_schema: bool,
}

impl<'s> Seeder<'s> {
    pub fn new(database: &'s DatabaseSettings, plan: SeedPlan) -> Self {
        Self {
            database,
            plan,
            create_schema: false,
        }
    }

    pub fn create_schema(mut self, create: bool) -> Self {
        self.create_schema = create;
        self
    }

    /// Insert everything or nothing.
    pub fn run(&self, fabricator: &mut Fabricator) -> Result<SeedReport> {
        let mut client = connect(self.database)?;

        let outcome = match client.transaction() {
            Ok(mut tx) => match self.populate(&mut tx, fabricator) {
                Ok(report) => {
                    info!("committing");
                    tx.commit().map_err(Error::query).map(|()| report)
                }
                Err(err) => {
                    warn!(%err, "rolling back every insert of this run");
                    if let Err(rollback) = tx.rollback() {
                        warn!(%rollback, "rollback failed");
                    }
                    Err(err)
                }
            },
            Err(err) => Err(Error::connection(err)),
        };

        if let Err(err) = client.close() {
            warn!(%err, "closing the connection failed");
        }
        info!("connection closed");

        outcome
    }

    fn populate(&self, tx: &mut PgTransaction<'_>, fabricator: &mut Fabricator) -> Result<SeedReport> {
        let mut report = SeedReport::default();

        if self.create_schema {
            info!("creating tables");
            tx.batch_execute(SCHEMA_DDL).map_err(Error::query)?;
        }

        // Keys come back from our own inserts, so rows left by earlier runs
        // are never drawn from.
        let insert = tx
            .prepare(
                "INSERT INTO Dim_TransactionTypes (TransactionTypeName, IsDebit) VALUES ($1, $2) \
                 RETURNING TransactionTypeKey",
            )
            .map_err(Error::query)?;
        let mut types = Vec::with_capacity(TRANSACTION_TYPES.len());
        for ty in &TRANSACTION_TYPES {
            let row = tx.query_one(&insert, &[&ty.name, &ty.is_debit]).map_err(Error::query)?;

            types.push(TypeKey {
                key: row.try_get(0).map_err(column_error)?,
                name: ty.name.to_string(),
                is_debit: ty.is_debit,
            });
        }
        report.transaction_types = types.len();
        info!(count = report.transaction_types, "transaction types added");

        let customers = fabricator.customers(self.plan.customers);
        let insert = tx
            .prepare(
                "INSERT INTO Dim_Customers (CustomerID, FirstName, LastName, Email, City, Country, RegistrationDate) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING CustomerKey",
            )
            .map_err(Error::query)?;
        let mut customer_keys = Vec::with_capacity(customers.len());
        for c in &customers {
            let row = tx.query_one(
                &insert,
                &[
                    &c.customer_id,
                    &c.first_name,
                    &c.last_name,
                    &c.email,
                    &c.city,
                    &c.country,
                    &c.registration_date,
                ],
            )
            .map_err(Error::query)?;

            customer_keys.push(row.try_get(0).map_err(column_error)?);
        }
        report.customers = customers.len();
        info!(count = report.customers, "customers added");

        let accounts = fabricator.accounts(&customer_keys);
        let insert = tx
            .prepare(
                "INSERT INTO Dim_Accounts (AccountID, CustomerKey, AccountType, OpenDate, Status) \
                 VALUES ($1, $2, $3, $4, $5) RETURNING AccountKey",
            )
            .map_err(Error::query)?;
        let mut account_keys = Vec::with_capacity(accounts.len());
        for a in &accounts {
            let row = tx.query_one(
                &insert,
                &[&a.account_id, &a.customer_key, &a.account_type, &a.open_date, &a.status],
            )
            .map_err(Error::query)?;

            account_keys.push(row.try_get(0).map_err(column_error)?);
        }
        report.accounts = accounts.len();
        info!(count = report.accounts, "accounts added");

        let date_keys = keys(tx, "SELECT DateKey FROM Dim_Date")?;

        let transactions =
            fabricator.transactions(self.plan.transactions, &types, &account_keys, &date_keys)?;
        let insert = tx
            .prepare(
                "INSERT INTO Fact_Transactions (DateKey, AccountKey, TransactionTypeKey, Amount, Location) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .map_err(Error::query)?;
        for (n, t) in transactions.iter().enumerate() {
            tx.execute(
                &insert,
                &[&t.date_key, &t.account_key, &t.type_key, &t.amount, &t.location],
            )
            .map_err(Error::query)?;

            if (n + 1) % PROGRESS_EVERY == 0 {
                info!(inserted = n + 1, total = transactions.len(), "inserting transactions");
            }
        }
        report.transactions = transactions.len();
        info!(count = report.transactions, "transactions added");

        Ok(report)
    }
}

fn keys(tx: &mut PgTransaction<'_>, query: &str) -> Result<Vec<i32>> {
    tx.query(query, &[])
        .map_err(Error::query)?
        .iter()
        .map(|row| row.try_get(0).map_err(column_error))
        .collect()
}

fn column_error(err: postgres::Error) -> Error {
    Error::Seed(format!("unexpected column type: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::scratch_database;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
    }

    fn stored_types() -> Vec<TypeKey> {
        TRANSACTION_TYPES
            .iter()
            .zip(1..)
            .map(|(ty, key)| TypeKey {
                key,
                name: ty.name.to_string(),
                is_debit: ty.is_debit,
            })
            .collect()
    }

    #[test]
    fn reference_types_match_the_debit_table() {
        let debits: Vec<&str> = TRANSACTION_TYPES
            .iter()
            .filter(|ty| ty.is_debit)
            .map(|ty| ty.name)
            .collect();

        assert_eq!(TRANSACTION_TYPES.len(), 8);
        assert_eq!(
            debits,
            ["Withdrawal", "Transfer Out", "Online Purchase", "ATM Withdrawal", "Bill Payment"]
        );
    }

    #[test]
    fn amounts_respect_sign_and_range() {
        let mut fabricator = Fabricator::with_today(7, today());
        let types = stored_types();
        let accounts: Vec<i32> = (1..=750).collect();
        let dates = [20230101, 20240229, 20251231];

        let transactions = fabricator
            .transactions(20_000, &types, &accounts, &dates)
            .unwrap();

        assert_eq!(transactions.len(), 20_000);

        let salary_low = Decimal::new(150_000, 2);
        let salary_high = Decimal::new(500_000, 2);
        let regular_low = Decimal::new(550, 2);
        let regular_high = Decimal::new(100_000, 2);

        for t in &transactions {
            let ty = &types[(t.type_key - 1) as usize];
            let magnitude = t.amount.abs();

            if ty.is_debit {
                assert!(t.amount.is_sign_negative(), "{t:?}");
            } else {
                assert!(t.amount.is_sign_positive(), "{t:?}");
            }

            if ty.name == SALARY {
                assert!(magnitude >= salary_low && magnitude <= salary_high, "{t:?}");
            } else {
                assert!(magnitude >= regular_low && magnitude <= regular_high, "{t:?}");
            }

            assert_eq!(t.amount.scale(), 2);
            assert!(accounts.contains(&t.account_key));
            assert!(dates.contains(&t.date_key));
        }
    }

    #[test]
    fn every_type_gets_drawn() {
        let mut fabricator = Fabricator::with_today(11, today());
        let types = stored_types();

        let transactions = fabricator.transactions(2_000, &types, &[1], &[20240101]).unwrap();

        for ty in &types {
            assert!(transactions.iter().any(|t| t.type_key == ty.key), "{} never drawn", ty.name);
        }
    }

    #[test]
    fn one_or_two_accounts_per_customer() {
        let mut fabricator = Fabricator::with_today(3, today());
        let customer_keys: Vec<i32> = (1..=500).collect();

        let accounts = fabricator.accounts(&customer_keys);

        assert!((500..=1000).contains(&accounts.len()));
        for key in &customer_keys {
            let owned = accounts.iter().filter(|a| a.customer_key == *key).count();
            assert!((1..=2).contains(&owned), "customer {key} has {owned} accounts");
        }

        assert_eq!(accounts[0].account_id, "ACC20000");
        let oldest = today().checked_sub_days(Days::new(ACCOUNT_HISTORY_DAYS)).unwrap();
        assert!(accounts.iter().all(|a| a.open_date >= oldest && a.open_date <= today()));
        assert!(accounts.iter().all(|a| ACCOUNT_TYPES.contains(&a.account_type)));
    }

    #[test]
    fn customers_get_sequential_ids_and_recent_dates() {
        let mut fabricator = Fabricator::with_today(5, today());

        let customers = fabricator.customers(500);

        assert_eq!(customers.len(), 500);
        assert_eq!(customers[0].customer_id, "CUST1000");
        assert_eq!(customers[499].customer_id, "CUST1499");

        let oldest = today().checked_sub_days(Days::new(CUSTOMER_HISTORY_DAYS)).unwrap();
        for c in &customers {
            assert!(c.registration_date >= oldest && c.registration_date <= today());
            assert!(c.email.contains('@'));
            assert!(!c.first_name.is_empty() && !c.last_name.is_empty());
        }
    }

    #[test]
    fn same_seed_same_data() {
        let first = Fabricator::with_today(42, today()).customers(20);
        let second = Fabricator::with_today(42, today()).customers(20);

        assert_eq!(first, second);
    }

    #[test]
    fn empty_pools_are_refused() {
        let mut fabricator = Fabricator::with_today(1, today());

        let err = fabricator.transactions(10, &stored_types(), &[], &[20240101]).unwrap_err();

        assert!(matches!(err, Error::Seed(_)));
    }

    #[test]
    fn bundled_ddl_creates_every_table() {
        for table in [
            "Dim_Date",
            "Dim_Customers",
            "Dim_Accounts",
            "Dim_TransactionTypes",
            "Fact_Transactions",
        ] {
            assert!(SCHEMA_DDL.contains(&format!("CREATE TABLE IF NOT EXISTS {table}")));
        }
    }

    const TABLES: [&str; 4] = [
        "Dim_TransactionTypes",
        "Dim_Customers",
        "Dim_Accounts",
        "Fact_Transactions",
    ];

    fn counts(client: &mut postgres::Client) -> Vec<i64> {
        TABLES
            .iter()
            .map(|table| {
                client
                    .query_one(&format!("SELECT count(*) FROM {table}"), &[])
                    .unwrap()
                    .get(0)
            })
            .collect()
    }

    #[test]
    #[ignore = "needs DATABASE_URL"]
    fn seeds_only_this_runs_customers_and_refuses_a_second_run() {
        let Some(mut scratch) = scratch_database("analyst_seed_twice") else {
            return;
        };

        scratch.client.batch_execute(SCHEMA_DDL).unwrap();
        scratch
            .client
            .batch_execute(
                "INSERT INTO Dim_Customers (CustomerID, FirstName, LastName, RegistrationDate) \
                 VALUES ('OLD1', 'Ada', 'Byron', '2020-01-01'), ('OLD2', 'Alan', 'Turing', '2020-01-01')",
            )
            .unwrap();

        let plan = SeedPlan {
            customers: 20,
            transactions: 200,
        };

        let report = Seeder::new(&scratch.settings, plan)
            .create_schema(true)
            .run(&mut Fabricator::with_today(9, today()))
            .unwrap();

        assert_eq!(report.transaction_types, 8);
        assert_eq!(report.customers, 20);
        assert!((20..=40).contains(&report.accounts), "{report:?}");
        assert_eq!(report.transactions, 200);

        let old_accounts: i64 = scratch
            .client
            .query_one(
                "SELECT count(*) FROM Dim_Accounts a JOIN Dim_Customers c USING (CustomerKey) \
                 WHERE c.CustomerID LIKE 'OLD%'",
                &[],
            )
            .unwrap()
            .get(0);
        assert_eq!(old_accounts, 0);

        let wrong_sign: i64 = scratch
            .client
            .query_one(
                "SELECT count(*) FROM Fact_Transactions f JOIN Dim_TransactionTypes t USING (TransactionTypeKey) \
                 WHERE t.IsDebit <> (f.Amount < 0)",
                &[],
            )
            .unwrap()
            .get(0);
        assert_eq!(wrong_sign, 0);

        let before = counts(&mut scratch.client);
        assert_eq!(before, [8, 22, report.accounts as i64, 200]);

        let err = Seeder::new(&scratch.settings, plan)
            .run(&mut Fabricator::with_today(10, today()))
            .unwrap_err();

        assert!(matches!(err, Error::Query(_)), "{err:?}");
        assert_eq!(counts(&mut scratch.client), before);
    }

    #[test]
    #[ignore = "needs DATABASE_URL"]
    fn late_failure_rolls_back_earlier_batches() {
        let Some(mut scratch) = scratch_database("analyst_seed_rollback") else {
            return;
        };

        // no dates to draw from: types, customers and accounts insert fine,
        // then the transaction batch fails
        scratch.client.batch_execute(SCHEMA_DDL).unwrap();
        scratch.client.batch_execute("DELETE FROM Dim_Date").unwrap();

        let plan = SeedPlan {
            customers: 10,
            transactions: 50,
        };

        let err = Seeder::new(&scratch.settings, plan)
            .run(&mut Fabricator::with_today(4, today()))
            .unwrap_err();

        assert!(matches!(err, Error::Seed(_)), "{err:?}");
        assert_eq!(counts(&mut scratch.client), [0, 0, 0, 0]);
    }
}
