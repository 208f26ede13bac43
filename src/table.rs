use std::fmt;

const NULL: &str = "NULL";
const GAP: &str = "  ";

/// Materialised result of one statement. Every value is kept in its text
/// form; `None` is SQL NULL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
    affected: Option<u64>,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self {
            columns,
            rows,
            affected: None,
        }
    }

    /// A statement that produced no row set.
    pub fn affected(count: u64) -> Self {
        Self {
            affected: Some(count),
            ..Self::default()
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn cell(&self, row: usize, column: usize) -> &str {
        self.rows[row]
            .get(column)
            .and_then(Option::as_deref)
            .unwrap_or(NULL)
    }
}

fn width(text: &str) -> usize {
    text.chars().count()
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(count) = self.affected {
            return write!(f, "Statement executed, {count} row(s) affected");
        }

        if self.rows.is_empty() {
            return write!(f, "Empty result set\nColumns: [{}]", self.columns.join(", "));
        }

        let index_width = width(&(self.rows.len() - 1).to_string());

        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(c, name)| {
                (0..self.rows.len())
                    .map(|r| width(self.cell(r, c)))
                    .chain([width(name)])
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        write!(f, "{:index_width$}", "")?;
        for (name, &width) in self.columns.iter().zip(&widths) {
            write!(f, "{GAP}{name:<width$}")?;
        }

        for row in 0..self.rows.len() {
            write!(f, "\n{row:>index_width$}")?;
            for (column, &width) in widths.iter().enumerate() {
                write!(f, "{GAP}{:<width$}", self.cell(row, column))?;
            }
        }

        Ok(())
    }
}
