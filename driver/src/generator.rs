use tracing::warn;

use crate::client::{tidy, Completion};
use crate::error::GenerationError;
use crate::prompt::{insight_prompt, sql_prompt};

pub const INSIGHT_FALLBACK: &str = "I was unable to analyze the results.";

/// Turns a question about the schema into a SQL string.
pub struct SqlGenerator<'c, C: ?Sized> {
    client: &'c C,
}

impl<'c, C: Completion + ?Sized> SqlGenerator<'c, C> {
    pub fn new(client: &'c C) -> Self {
        Self { client }
    }

    pub fn generate(&self, schema: &str, question: &str) -> Result<String, GenerationError> {
        let output = self.client.complete(&sql_prompt(schema, question))?;

        let sql = extract_sql(&output);

        if sql.is_empty() {
            return Err(GenerationError::Empty("no SQL in the response".to_string()));
        }

        Ok(sql)
    }
}

/// Writes a one-sentence summary of a result table.
pub struct InsightGenerator<'c, C: ?Sized> {
    client: &'c C,
}

impl<'c, C: Completion + ?Sized> InsightGenerator<'c, C> {
    pub fn new(client: &'c C) -> Self {
        Self { client }
    }

    pub fn generate(&self, question: &str, data: &str) -> Result<String, GenerationError> {
        let output = tidy(&self.client.complete(&insight_prompt(question, data))?);

        if output.is_empty() {
            return Err(GenerationError::Empty("no insight in the response".to_string()));
        }

        Ok(output)
    }

    /// Same as [`generate`](Self::generate), but a failure becomes [`INSIGHT_FALLBACK`].
    pub fn generate_or_fallback(&self, question: &str, data: &str) -> String {
        self.generate(question, data).unwrap_or_else(|err| {
            warn!(%err, "insight generation failed");
            INSIGHT_FALLBACK.to_string()
        })
    }
}

/// Pull the SQL out of a completion, dropping fence lines and blank lines.
pub fn extract_sql(output: &str) -> String {
    tidy(output)
        .lines()
        .filter(|line| !line.trim_start().starts_with("```") && !line.trim().is_empty())
        .collect::<Vec<&str>>()
        .join("\n")
        .trim()
        .to_string()
}
