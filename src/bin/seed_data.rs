use analyst::config::{DatabaseArgs, DatabaseSettings};
use analyst::logging;
use analyst::seed::{Fabricator, SeedPlan, Seeder};
use clap::Parser;
use eyre::{Context, Result};

/// Fill the demo banking tables with fake customers, accounts and
/// transactions. Everything is inserted in one transaction.
#[derive(Parser)]
#[command(name = "seed-data")]
struct Cli {
    #[command(flatten)]
    database: DatabaseArgs,

    #[arg(long, default_value_t = SeedPlan::default().customers)]
    customers: usize,

    #[arg(long, default_value_t = SeedPlan::default().transactions)]
    transactions: usize,

    /// Make the generated data reproducible
    #[arg(long)]
    seed: Option<u64>,

    /// Create the tables (and fill the date dimension) first
    #[arg(long)]
    create_schema: bool,
}

fn main() -> Result<()> {
    logging::init("info");

    let cli = Cli::parse();
    let database = DatabaseSettings::from(cli.database);
    let plan = SeedPlan {
        customers: cli.customers,
        transactions: cli.transactions,
    };

    let report = Seeder::new(&database, plan)
        .create_schema(cli.create_schema)
        .run(&mut Fabricator::new(cli.seed))
        .wrap_err("nothing was written")?;

    println!(
        "Database populated: {} transaction types, {} customers, {} accounts, {} transactions.",
        report.transaction_types, report.customers, report.accounts, report.transactions
    );

    Ok(())
}
