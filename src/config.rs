use std::fmt;
use std::path::PathBuf;

use analyst_driver::client::{DEFAULT_API_BASE, DEFAULT_MODEL};
use analyst_driver::GeminiClient;
use clap::Args;

use crate::error::{Error, Result};

pub const DEFAULT_DATABASE_URL: &str = "host=localhost dbname=banking";
pub const DEFAULT_SCHEMA_FILE: &str = "db_schema.txt";
pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";

#[derive(Debug, Clone, Args)]
pub struct DatabaseArgs {
    /// libpq connection string or postgres:// URL
    #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    pub database_url: String,

    /// Schema whose base tables are described to the model
    #[arg(long, env = "ANALYST_DB_SCHEMA", default_value = "public")]
    pub db_schema: String,
}

#[derive(Debug, Clone, Args)]
pub struct ModelArgs {
    /// API key for the Generative Language API
    #[arg(long, env = API_KEY_VAR, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model used for SQL and insight generation
    #[arg(long, env = "ANALYST_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Base URL of the API
    #[arg(long, env = "ANALYST_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,
}

#[derive(Debug, Clone, Args)]
pub struct SchemaFileArgs {
    /// Where the schema description lives
    #[arg(long, env = "ANALYST_SCHEMA_FILE", default_value = DEFAULT_SCHEMA_FILE)]
    pub schema_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub url: String,
    pub schema: String,
}

impl From<DatabaseArgs> for DatabaseSettings {
    fn from(args: DatabaseArgs) -> Self {
        Self {
            url: args.database_url,
            schema: args.db_schema,
        }
    }
}

#[derive(Clone)]
pub struct ModelSettings {
    api_key: String,
    pub model: String,
    pub api_base: String,
}

impl ModelSettings {
    pub fn client(&self) -> GeminiClient {
        GeminiClient::new(self.api_key.clone(), &self.model).with_api_base(&self.api_base)
    }
}

impl fmt::Debug for ModelSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSettings")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl TryFrom<ModelArgs> for ModelSettings {
    type Error = Error;

    fn try_from(args: ModelArgs) -> Result<Self> {
        let api_key = args
            .api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::Configuration(format!("'{API_KEY_VAR}' environment variable not set")))?;

        Ok(Self {
            api_key,
            model: args.model,
            api_base: args.api_base,
        })
    }
}

/// Everything the interactive analyst needs, fixed at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub model: ModelSettings,
    pub schema_file: PathBuf,
    pub allow_writes: bool,
}

impl Settings {
    pub fn new(
        database: DatabaseArgs,
        model: ModelArgs,
        schema_file: SchemaFileArgs,
        allow_writes: bool,
    ) -> Result<Self> {
        Ok(Self {
            database: database.into(),
            model: model.try_into()?,
            schema_file: schema_file.schema_file,
            allow_writes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_args(api_key: Option<&str>) -> ModelArgs {
        ModelArgs {
            api_key: api_key.map(str::to_string),
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    #[test]
    fn missing_api_key_is_a_configuration_error() {
        let err = ModelSettings::try_from(model_args(None)).unwrap_err();

        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains(API_KEY_VAR));
    }

    #[test]
    fn blank_api_key_is_a_configuration_error() {
        assert!(ModelSettings::try_from(model_args(Some("   "))).is_err());
    }

    #[test]
    fn debug_output_hides_the_key() {
        let settings = ModelSettings::try_from(model_args(Some("secret-key"))).unwrap();

        assert!(!format!("{settings:?}").contains("secret-key"));
    }

    #[test]
    fn client_uses_the_configured_model() {
        let mut args = model_args(Some("k"));
        args.model = "gemini-2.5-flash".to_string();

        let settings = ModelSettings::try_from(args).unwrap();

        assert_eq!(settings.client().model(), "models/gemini-2.5-flash");
    }
}
