use std::path::PathBuf;

use analyst_driver::GenerationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("could not reach the database: {0}")]
    Connection(String),

    #[error("schema introspection failed: {0}")]
    Catalog(String),

    #[error("SQL error: {0}")]
    Query(String),

    #[error("refused to run generated SQL: {0}")]
    Rejected(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("'{}' not found, run read-schema first", .0.display())]
    SchemaMissing(PathBuf),

    #[error("seeding failed: {0}")]
    Seed(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn connection(err: postgres::Error) -> Self {
        Self::Connection(err.to_string())
    }

    /// The server rejected the catalog query, or the connection dropped under it.
    pub(crate) fn catalog(err: postgres::Error) -> Self {
        match server_message(&err) {
            Some(message) => Self::Catalog(message),
            None => Self::connection(err),
        }
    }

    /// The server rejected a statement, or the connection dropped under it.
    pub(crate) fn query(err: postgres::Error) -> Self {
        match server_message(&err) {
            Some(message) => Self::Query(message),
            None => Self::connection(err),
        }
    }

    /// Errors that mean the statement itself was bad, as opposed to the plumbing.
    pub fn is_statement_error(&self) -> bool {
        matches!(self, Self::Query(_) | Self::Rejected(_))
    }
}

fn server_message(err: &postgres::Error) -> Option<String> {
    err.as_db_error()
        .map(|db| format!("{} (SQLSTATE {})", db.message(), db.code().code()))
}
