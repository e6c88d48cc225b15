use crate::constants::{DEFAULT_BATCH_SIZE, DEFAULT_DBNAME, DEFAULT_SQL_DIR};
use crate::errors::{AppError, AppResult};
use crate::parser::MalformedRowPolicy;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Resolved configuration with all values filled in (no Options).
///
/// This struct represents the pipeline defaults and can be deserialized by the TOML
/// loader. All fields have concrete values, making it safe to access directly without unwrapping.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolvedConfig {
    /// Rows per INSERT statement and per committed transaction.
    pub batch_size: usize,
    /// Directory holding the `<Table>_pre.sql` / `<Table>_post.sql` scripts
    pub sql_dir: PathBuf,
    /// What to do with a row element whose attributes cannot be parsed
    pub on_malformed_row: MalformedRowPolicy,
    /// Whether to draw a progress bar over the input file
    pub progress: bool,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            sql_dir: PathBuf::from(DEFAULT_SQL_DIR),
            on_malformed_row: MalformedRowPolicy::Skip,
            progress: true,
        }
    }
}

impl ResolvedConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.batch_size == 0 {
            return Err(AppError::InvalidInput(
                "Batch size must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Database connection parameters. Only the database name is required.
#[derive(Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectionConfig {
    pub dbname: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            dbname: DEFAULT_DBNAME.to_string(),
            host: None,
            port: None,
            username: None,
            password: None,
        }
    }
}

// Keeps the password out of logs and panic messages.
impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("dbname", &self.dbname)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Configuration that can be loaded from a TOML file.
///
/// Holds the table to load, an optional `[database]` section and the flattened
/// pipeline defaults. The parser rejects unknown keys to catch typos.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolvedConfigFile {
    /// Table to load, e.g. `"Posts"`
    pub table: String,
    /// Dump file; defaults to `<Table>.xml`
    pub file: Option<PathBuf>,
    /// Keep post bodies when loading `Posts` (defaults to `false`)
    #[serde(default)]
    pub with_post_body: bool,
    /// Skip the confirmation prompt before dropping the table (defaults to `false`)
    #[serde(default)]
    pub assume_yes: bool,
    #[serde(default)]
    pub database: ConnectionConfig,
    /// Flattened resolved configuration with pipeline defaults
    #[serde(flatten)]
    pub resolved: ResolvedConfig,
}

impl ResolvedConfigFile {
    /// Loads and validates configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the file cannot be read, the TOML is malformed,
    /// required fields are missing or unknown keys are present, and
    /// `InvalidInput` if `batch_size` is not positive.
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        let config: ResolvedConfigFile = toml::from_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;

        config.resolved.validate()?;
        Ok(config)
    }
}
