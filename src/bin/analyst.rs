use std::io;

use analyst::config::{DatabaseArgs, ModelArgs, SchemaFileArgs, Settings, API_KEY_VAR};
use analyst::executor::PgExecutor;
use analyst::session::{Session, Terminal};
use analyst::{logging, schema};
use clap::Parser;
use eyre::{Context, Result};

/// Chat with the database: questions in, SQL and a one-line insight out.
#[derive(Parser)]
#[command(name = "analyst")]
struct Cli {
    #[command(flatten)]
    database: DatabaseArgs,

    #[command(flatten)]
    model: ModelArgs,

    #[command(flatten)]
    schema: SchemaFileArgs,

    /// Run generated statements that are not plain queries
    #[arg(long)]
    allow_writes: bool,
}

fn main() -> Result<()> {
    logging::init("warn");

    let cli = Cli::parse();

    let settings = Settings::new(cli.database, cli.model, cli.schema, cli.allow_writes)
        .wrap_err_with(|| format!("set {API_KEY_VAR} (or pass --api-key) and start again"))?;

    let schema = schema::load_artifact(&settings.schema_file)?;

    let mut session = Session::new(
        &schema,
        settings.model.client(),
        PgExecutor::new(&settings.database, settings.allow_writes),
    )
    .allow_writes(settings.allow_writes);

    let mut terminal = Terminal::new().wrap_err("could not open the terminal")?;

    session.run(&mut terminal, &mut io::stdout().lock())?;

    Ok(())
}
