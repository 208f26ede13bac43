//! Prompt templates for the two questions we ask the model.
//!
//! Both are rendered with a single `format!` pass, so whatever the schema,
//! question or data contain is inserted verbatim and never re-expanded.

pub fn sql_prompt(schema: &str, question: &str) -> String {
    format!(
        r#"
You are an expert PostgreSQL data analyst. Based on the database schema below,
write a single, valid PostgreSQL query to answer the user's question.
Only return the SQL query and nothing else.

SCHEMA:
{schema}

USER QUESTION:
"{question}"

SQL QUERY:
"#
    )
}

pub fn insight_prompt(question: &str, data: &str) -> String {
    format!(
        r#"
You are a helpful bank manager. A user asked this question:
"{question}"

You ran a query and got this data as a result:
"{data}"

Based on the question and the data, write a single, friendly,
one-sentence business insight. If the data is empty,
say that no results were found.

INSIGHT:
"#
    )
}
