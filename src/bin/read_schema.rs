use analyst::config::{DatabaseArgs, DatabaseSettings, SchemaFileArgs};
use analyst::{logging, schema};
use clap::Parser;
use eyre::{Context, Result};

/// Describe the database's tables in the file the analyst reads at startup.
#[derive(Parser)]
#[command(name = "read-schema")]
struct Cli {
    #[command(flatten)]
    database: DatabaseArgs,

    #[command(flatten)]
    schema: SchemaFileArgs,
}

fn main() -> Result<()> {
    logging::init("info");

    let cli = Cli::parse();
    let database = DatabaseSettings::from(cli.database);
    let path = cli.schema.schema_file;

    println!("Reading database schema...");

    let text = schema::introspect(&database).wrap_err("could not read the schema")?;

    if text.is_empty() {
        println!("No base tables found in schema '{}'.", database.schema);
    }

    println!("\n--- AI KNOWLEDGE BASE (Database Schema) ---\n");
    print!("{text}");
    println!("\n-------------------------------------------");

    schema::write_artifact(&path, &text)
        .wrap_err_with(|| format!("could not write {}", path.display()))?;

    println!("\nSchema saved to '{}'", path.display());

    Ok(())
}
