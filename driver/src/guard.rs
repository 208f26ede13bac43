use sqlparser::ast::Statement;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

/// What a piece of generated SQL would do if we ran it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// A single query statement.
    ReadOnly,
    /// A single statement that is not a query, with its leading keyword.
    Mutating(String),
    /// Zero or several statements.
    Multiple(usize),
    /// sqlparser could not read it; the server gets the final word.
    Unparsed(String),
}

pub fn classify(sql: &str) -> Verdict {
    let statements = match Parser::parse_sql(&PostgreSqlDialect {}, sql) {
        Ok(statements) => statements,
        Err(err) => return Verdict::Unparsed(err.to_string()),
    };

    match statements.as_slice() {
        [Statement::Query(_)] => Verdict::ReadOnly,
        [statement] => Verdict::Mutating(keyword(statement)),
        _ => Verdict::Multiple(statements.len()),
    }
}

fn keyword(statement: &Statement) -> String {
    statement
        .to_string()
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_is_read_only() {
        assert_eq!(
            classify("SELECT COUNT(*) FROM dim_customers WHERE country = 'France';"),
            Verdict::ReadOnly
        );
    }

    #[test]
    fn cte_is_read_only() {
        let sql = "WITH totals AS (SELECT accountkey, SUM(amount) AS total FROM fact_transactions GROUP BY accountkey) SELECT * FROM totals ORDER BY total DESC LIMIT 5";

        assert_eq!(classify(sql), Verdict::ReadOnly);
    }

    #[test]
    fn delete_is_mutating() {
        assert_eq!(
            classify("DELETE FROM dim_customers"),
            Verdict::Mutating("DELETE".to_string())
        );
    }

    #[test]
    fn ddl_is_mutating() {
        assert_eq!(
            classify("DROP TABLE fact_transactions"),
            Verdict::Mutating("DROP".to_string())
        );
    }

    #[test]
    fn stacked_statements_are_flagged() {
        assert_eq!(
            classify("SELECT 1; DELETE FROM dim_accounts"),
            Verdict::Multiple(2)
        );
    }

    #[test]
    fn prose_is_unparsed() {
        assert!(matches!(
            classify("Sorry, I cannot answer that."),
            Verdict::Unparsed(_)
        ));
    }
}
