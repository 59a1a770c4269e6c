use std::path::{Path, PathBuf};

use clap::Args;
use serde::Deserialize;
use timestone_query::QueryConfig;
use timestone_staging::BatchConfig;

use super::error::CliError;

// ═══════════════════════════════════════════════════════════════
//  Config file (TOML)
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub query: QuerySection,
    #[serde(default)]
    pub staging: BatchConfig,
    #[serde(default)]
    pub transfer: TransferSection,
    #[serde(default)]
    pub notify: NotifySection,
}

#[derive(Debug, Default, Deserialize)]
pub struct QuerySection {
    pub database: Option<String>,
    pub table: Option<String>,
    pub credential_profile: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub max_rows: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransferSection {
    pub remote: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NotifySection {
    pub webhook_url: Option<String>,
}

pub fn load_config(path: &Path) -> Result<Config, CliError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| CliError::Config(format!("cannot read config {}: {e}", path.display())))?;
    parse_config(&content).map_err(|e| CliError::Config(format!("bad config {}: {e}", path.display())))
}

fn parse_config(content: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(content)
}

/// A missing file at `path` is an empty config; an unreadable or invalid
/// one is an error.
pub fn load_config_or_default(path: &Path) -> Result<Config, CliError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }
    load_config(path)
}

// ═══════════════════════════════════════════════════════════════
//  Shared CLI args
// ═══════════════════════════════════════════════════════════════

/// Where queries go. Every flag overrides `[query]` in the config file.
#[derive(Args, Clone, Debug, Default)]
pub struct QueryArgs {
    /// Database name
    #[arg(long, env = "TIMESTONE_DATABASE")]
    pub database: Option<String>,

    /// Table name
    #[arg(long)]
    pub table: Option<String>,

    /// Named profile in the shared credentials file
    #[arg(long)]
    pub profile: Option<String>,

    /// Service region
    #[arg(long)]
    pub region: Option<String>,

    /// Fixed query endpoint (skips endpoint discovery)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Page size hint
    #[arg(long)]
    pub max_rows: Option<u32>,

    /// Serve pages from a recorded JSON file instead of the service
    #[arg(long)]
    pub pages: Option<PathBuf>,
}

/// Raw sensor input and the stream choice.
#[derive(Args, Clone, Debug)]
pub struct SourceArgs {
    /// A device export zip or a single sensor CSV
    #[arg(long)]
    pub path: PathBuf,

    /// Comma separated streams to ingest, e.g. "acc,temp"
    #[arg(short, long)]
    pub streams: Option<String>,

    /// Ingest every stream, ignoring --streams
    #[arg(long)]
    pub all_streams: bool,

    /// Remove the extracted files when done
    #[arg(long)]
    pub cleanup: bool,
}

// ═══════════════════════════════════════════════════════════════
//  Effective: merged settings
// ═══════════════════════════════════════════════════════════════

/// Final settings after merging: config file < env/CLI.
pub struct Effective {
    pub file: Config,
}

impl Effective {
    pub fn new(config_path: &Path) -> Result<Self, CliError> {
        Ok(Self {
            file: load_config_or_default(config_path)?,
        })
    }

    /// Database from the command line, else from the config file.
    pub fn database(&self, args: &QueryArgs) -> Option<String> {
        args.database.clone().or_else(|| self.file.query.database.clone())
    }

    pub fn query_config(&self, args: &QueryArgs, default_table: &str) -> Result<QueryConfig, CliError> {
        let file = &self.file.query;
        let database = self
            .database(args)
            .ok_or_else(|| CliError::Config("database is required: set [query] database or --database".into()))?;
        let table = args
            .table
            .clone()
            .or_else(|| file.table.clone())
            .unwrap_or_else(|| default_table.to_string());

        let mut config = QueryConfig::new(database, table);
        config.credential_profile = args.profile.clone().or_else(|| file.credential_profile.clone());
        if let Some(region) = args.region.clone().or_else(|| file.region.clone()) {
            config.region = region;
        }
        config.endpoint = args.endpoint.clone().or_else(|| file.endpoint.clone());
        config.max_rows = args.max_rows.or(file.max_rows);
        config.validate()?;
        Ok(config)
    }

    pub fn batch_config(&self, output_dir: Option<&Path>) -> BatchConfig {
        let mut config = self.file.staging.clone();
        if let Some(dir) = output_dir {
            config.output_dir = dir.to_path_buf();
        }
        config
    }

    pub fn remote(&self, arg: Option<&str>) -> Option<String> {
        arg.map(str::to_string).or_else(|| self.file.transfer.remote.clone())
    }

    pub fn webhook_url(&self) -> Option<&str> {
        self.file.notify.webhook_url.as_deref()
    }
}
