//! The interactive question → SQL → result → insight loop.
//!
//! Each turn walks `AwaitingInput → GeneratingSql → ExecutingQuery →
//! GeneratingInsight → Reporting` and comes back for the next question. A
//! failure while generating or running SQL is printed and the turn is
//! dropped; the loop itself only ends on `exit`, blank input, Ctrl-C or
//! end of input.

use std::collections::VecDeque;
use std::io::{self, Write};

use analyst_driver::{classify, Completion, InsightGenerator, SqlGenerator, Verdict};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{info, info_span, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::executor::QueryRunner;
use crate::table::QueryResult;

pub const PROMPT: &str = "Ask a question (e.g., 'How many customers do we have?'):\n> ";
pub const FAREWELL: &str = "Analyst signing off. Goodbye!";
const SQL_HINT: &str = "The AI may have generated an invalid query. Please try rephrasing your question.";
const RULE: &str = "-------------------";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Line(String),
    Interrupted,
    Closed,
}

/// Where questions come from.
pub trait LineSource {
    fn read_line(&mut self, prompt: &str) -> Result<Input>;
}

/// Line editor on the controlling terminal, with in-memory history.
pub struct Terminal {
    editor: DefaultEditor,
}

impl Terminal {
    pub fn new() -> Result<Self> {
        let editor = DefaultEditor::new().map_err(readline_error)?;

        Ok(Self { editor })
    }
}

impl LineSource for Terminal {
    fn read_line(&mut self, prompt: &str) -> Result<Input> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(Input::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(Input::Interrupted),
            Err(ReadlineError::Eof) => Ok(Input::Closed),
            Err(err) => Err(readline_error(err)),
        }
    }
}

fn readline_error(err: ReadlineError) -> Error {
    match err {
        ReadlineError::Io(err) => Error::Io(err),
        other => Error::Io(io::Error::other(other.to_string())),
    }
}

/// Pre-recorded input, mostly for tests and piping.
#[derive(Debug, Default)]
pub struct Script {
    lines: VecDeque<Input>,
}

impl Script {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(|l| Input::Line(l.into())).collect(),
        }
    }

    pub fn then(mut self, input: Input) -> Self {
        self.lines.push_back(input);
        self
    }
}

impl LineSource for Script {
    fn read_line(&mut self, _prompt: &str) -> Result<Input> {
        Ok(self.lines.pop_front().unwrap_or(Input::Closed))
    }
}

/// The steps of a turn that can abandon it. Insight generation never does,
/// it falls back to a fixed sentence instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    GeneratingSql,
    ExecutingQuery,
}

#[derive(Debug)]
pub struct Answer {
    pub sql: String,
    pub result: QueryResult,
    pub insight: String,
}

/// How a turn ended.
#[derive(Debug)]
pub enum Turn {
    Exit,
    Answered(Answer),
    /// The turn was abandoned at `stage`; the loop goes back to waiting.
    Recovered { stage: Stage, error: Error },
}

fn is_exit(line: &str) -> bool {
    let line = line.trim();

    line.is_empty() || line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit")
}

pub struct Session<'s, C, R> {
    schema: &'s str,
    client: C,
    runner: R,
    allow_writes: bool,
}

impl<'s, C: Completion, R: QueryRunner> Session<'s, C, R> {
    pub fn new(schema: &'s str, client: C, runner: R) -> Self {
        Self {
            schema,
            client,
            runner,
            allow_writes: false,
        }
    }

    pub fn allow_writes(mut self, allow: bool) -> Self {
        self.allow_writes = allow;
        self
    }

    pub fn run(&mut self, input: &mut impl LineSource, out: &mut impl Write) -> Result<()> {
        writeln!(out, "AI Banking Analyst is online. Chat with your database!")?;
        writeln!(out, "   Type 'exit' to quit.\n")?;

        loop {
            let question = match input.read_line(PROMPT)? {
                Input::Line(line) => line,
                Input::Interrupted | Input::Closed => break,
            };

            if let Turn::Exit = self.turn(&question, out)? {
                break;
            }
        }

        writeln!(out, "\n{FAREWELL}")?;

        Ok(())
    }

    /// Run one question through every stage, reporting to `out` as we go.
    pub fn turn(&mut self, question: &str, out: &mut impl Write) -> io::Result<Turn> {
        if is_exit(question) {
            return Ok(Turn::Exit);
        }

        let span = info_span!("turn", id = %Uuid::new_v4());
        let _entered = span.enter();

        writeln!(out, "\nAI is thinking... (Generating SQL)")?;

        let sql = match self.generate_sql(question) {
            Ok(sql) => sql,
            Err(error) => return recover(out, Stage::GeneratingSql, error),
        };

        writeln!(out, "\nGenerated SQL:\n{sql}\n")?;
        writeln!(out, "Running query...")?;

        let result = match self.runner.run(&sql) {
            Ok(result) => result,
            Err(error) => return recover(out, Stage::ExecutingQuery, error),
        };

        let rendered = result.to_string();

        writeln!(out, "\nQuery Results:\n{rendered}\n")?;
        writeln!(out, "AI is thinking... (Analyzing results)")?;

        let insight = InsightGenerator::new(&self.client).generate_or_fallback(question, &rendered);

        writeln!(out, "\n{RULE}\nAI BANKING INSIGHT:\n{insight}\n{RULE}\n")?;

        info!(rows = result.rows().len(), "turn answered");

        Ok(Turn::Answered(Answer {
            sql,
            result,
            insight,
        }))
    }

    fn generate_sql(&self, question: &str) -> Result<String> {
        let sql = SqlGenerator::new(&self.client).generate(self.schema, question)?;

        match classify(&sql) {
            Verdict::ReadOnly => {}
            Verdict::Mutating(_) if self.allow_writes => {}
            Verdict::Mutating(keyword) => {
                return Err(Error::Rejected(format!(
                    "{keyword} statements are not allowed (start with --allow-writes to permit them)\n{sql}"
                )));
            }
            Verdict::Multiple(count) => {
                return Err(Error::Rejected(format!(
                    "expected a single statement, got {count}\n{sql}"
                )));
            }
            Verdict::Unparsed(reason) if self.allow_writes => {
                warn!(%reason, "generated SQL did not parse locally, sending it as is");
            }
            Verdict::Unparsed(reason) => {
                return Err(Error::Rejected(format!(
                    "could not confirm the statement is read-only ({reason})\n{sql}"
                )));
            }
        }

        Ok(sql)
    }
}

fn recover(out: &mut impl Write, stage: Stage, error: Error) -> io::Result<Turn> {
    warn!(?stage, %error, "turn abandoned");

    writeln!(out, "\nError: {error}")?;

    if error.is_statement_error() {
        writeln!(out, "   {SQL_HINT}")?;
    }

    writeln!(out)?;

    Ok(Turn::Recovered { stage, error })
}
