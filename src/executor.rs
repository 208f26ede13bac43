use postgres::{Client, NoTls, SimpleQueryMessage};
use tracing::{debug, info};

use crate::config::DatabaseSettings;
use crate::error::{Error, Result};
use crate::table::QueryResult;

/// Runs one SQL string and hands back the full result.
pub trait QueryRunner {
    fn run(&mut self, sql: &str) -> Result<QueryResult>;
}

pub fn connect(database: &DatabaseSettings) -> Result<Client> {
    debug!("connecting to the database");

    Client::connect(&database.url, NoTls).map_err(Error::connection)
}

/// Opens a fresh connection for every statement and drops it before
/// returning. Unless writes are allowed the statement runs in a read-only
/// transaction that is rolled back afterwards.
///
/// The text is prepared before it runs: the server refuses to prepare more
/// than one command, so nothing can `COMMIT` its way out of the transaction.
pub struct PgExecutor<'s> {
    database: &'s DatabaseSettings,
    allow_writes: bool,
}

impl<'s> PgExecutor<'s> {
    pub fn new(database: &'s DatabaseSettings, allow_writes: bool) -> Self {
        Self {
            database,
            allow_writes,
        }
    }
}

impl QueryRunner for PgExecutor<'_> {
    fn run(&mut self, sql: &str) -> Result<QueryResult> {
        let mut client = connect(self.database)?;

        let mut transaction = client
            .build_transaction()
            .read_only(!self.allow_writes)
            .start()
            .map_err(Error::query)?;

        transaction.prepare(sql).map_err(Error::query)?;

        let messages = transaction.simple_query(sql).map_err(Error::query)?;

        if self.allow_writes {
            transaction.commit().map_err(Error::query)?;
        } else {
            transaction.rollback().map_err(Error::query)?;
        }

        let result = collect(messages);

        info!(rows = result.rows().len(), "query finished");

        Ok(result)
    }
}

fn collect(messages: Vec<SimpleQueryMessage>) -> QueryResult {
    let mut columns: Option<Vec<String>> = None;
    let mut rows = Vec::new();
    let mut affected = 0;

    for message in messages {
        match message {
            SimpleQueryMessage::RowDescription(description) => {
                columns.get_or_insert_with(|| {
                    description.iter().map(|c| c.name().to_string()).collect()
                });
            }
            SimpleQueryMessage::Row(row) => {
                columns.get_or_insert_with(|| {
                    row.columns().iter().map(|c| c.name().to_string()).collect()
                });

                rows.push((0..row.len()).map(|i| row.get(i).map(str::to_string)).collect());
            }
            SimpleQueryMessage::CommandComplete(count) => affected = count,
            _ => {}
        }
    }

    match columns {
        Some(columns) => QueryResult::new(columns, rows),
        None => QueryResult::affected(affected),
    }
}
