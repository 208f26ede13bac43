use analyst::config::{ModelArgs, ModelSettings, API_KEY_VAR};
use analyst::logging;
use analyst_driver::models::generation_models;
use clap::Parser;
use eyre::{Context, Result};

/// Print the models the API key can call `generateContent` on.
#[derive(Parser)]
#[command(name = "list-models")]
struct Cli {
    #[command(flatten)]
    model: ModelArgs,
}

fn main() -> Result<()> {
    logging::init("info");

    let cli = Cli::parse();
    let settings = ModelSettings::try_from(cli.model)
        .wrap_err_with(|| format!("set {API_KEY_VAR} (or pass --api-key) and start again"))?;

    println!("Connecting to the Generative Language API...");

    let models = settings
        .client()
        .list_models()
        .wrap_err("could not list models")?;

    println!("\n--- Available Models ---");
    for model in generation_models(&models) {
        println!("✅ {}", model.name);
    }
    println!("\n------------------------");

    Ok(())
}
