//! Ask a PostgreSQL database questions in plain language.
//!
//! `read-schema` writes a text description of the tables, `analyst` feeds it
//! to a hosted model together with each question, runs the SQL that comes
//! back and asks the model to summarise the rows. `seed-data` fills a demo
//! banking warehouse and `list-models` shows which models the key can use.

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod schema;
pub mod seed;
pub mod session;
pub mod table;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
