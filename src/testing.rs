//! Throwaway schemas for tests that need a live PostgreSQL.
//!
//! Tests using these are `#[ignore]`d and return early when `DATABASE_URL`
//! is unset; run them with `cargo test -- --ignored`.

use postgres::{Client, NoTls};

use crate::config::DatabaseSettings;

pub(crate) struct ScratchDatabase {
    pub settings: DatabaseSettings,
    pub client: Client,
}

impl Drop for ScratchDatabase {
    fn drop(&mut self) {
        let _ = self.client.batch_execute(&format!(
            "DROP SCHEMA IF EXISTS {} CASCADE",
            self.settings.schema
        ));
    }
}

/// A fresh, empty schema that every connection made with `settings` uses as
/// its search path.
pub(crate) fn scratch_database(schema: &str) -> Option<ScratchDatabase> {
    let url = std::env::var("DATABASE_URL").ok()?;

    let mut admin = Client::connect(&url, NoTls).expect("DATABASE_URL is reachable");
    admin
        .batch_execute(&format!(
            "DROP SCHEMA IF EXISTS {schema} CASCADE; CREATE SCHEMA {schema};"
        ))
        .expect("scratch schema created");

    let settings = DatabaseSettings {
        url: with_search_path(&url, schema),
        schema: schema.to_string(),
    };
    let client = Client::connect(&settings.url, NoTls).expect("scratch schema reachable");

    Some(ScratchDatabase { settings, client })
}

fn with_search_path(url: &str, schema: &str) -> String {
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        let separator = if url.contains('?') { '&' } else { '?' };
        format!("{url}{separator}options=-c%20search_path%3D{schema}")
    } else {
        format!("{url} options='-c search_path={schema}'")
    }
}

#[test]
fn search_path_is_added_to_both_url_styles() {
    assert_eq!(
        with_search_path("host=localhost dbname=banking", "scratch"),
        "host=localhost dbname=banking options='-c search_path=scratch'"
    );
    assert_eq!(
        with_search_path("postgres://me@localhost/banking", "scratch"),
        "postgres://me@localhost/banking?options=-c%20search_path%3Dscratch"
    );
    assert_eq!(
        with_search_path("postgres://me@localhost/banking?sslmode=disable", "scratch"),
        "postgres://me@localhost/banking?sslmode=disable&options=-c%20search_path%3Dscratch"
    );
}
