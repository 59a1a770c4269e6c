use timestone_api::Page;
use timestone_query::{
    HttpQueryService, QueryConfig, QueryError, QueryRequest, QueryService, ReplayQueryService,
};

use super::config::{Effective, QueryArgs};
use super::error::CliError;

const RECORDED_DATABASE: &str = "recorded";

/// The query service a command talks to.
pub enum Backend {
    Http(HttpQueryService),
    Replay(ReplayQueryService),
}

impl QueryService for Backend {
    async fn query(&self, request: &QueryRequest) -> Result<Page, QueryError> {
        match self {
            Backend::Http(s) => s.query(request).await,
            Backend::Replay(s) => s.query(request).await,
        }
    }

    async fn cancel_query(&self, query_id: &str) -> Result<(), QueryError> {
        match self {
            Backend::Http(s) => s.cancel_query(query_id).await,
            Backend::Replay(s) => s.cancel_query(query_id).await,
        }
    }
}

/// Pick the backend from `args` and resolve the query config.
///
/// With `--pages` the database may be left unset; query text is then built
/// against a placeholder and ignored by the recording. Any other config
/// problem is still an error.
pub async fn connect(
    eff: &Effective,
    args: &QueryArgs,
    default_table: &str,
) -> Result<(Backend, QueryConfig), CliError> {
    match &args.pages {
        Some(path) => {
            let service = ReplayQueryService::from_file(path)?;
            let config = if eff.database(args).is_some() {
                eff.query_config(args, default_table)?
            } else {
                let table = args.table.as_deref().unwrap_or(default_table);
                tracing::debug!(table, "no database configured, using a placeholder for recorded pages");
                let config = QueryConfig::new(RECORDED_DATABASE, table);
                config.validate()?;
                config
            };
            Ok((Backend::Replay(service), config))
        }
        None => {
            let config = eff.query_config(args, default_table)?;
            tracing::info!(
                database = %config.database,
                table = %config.table,
                region = %config.region,
                "using query service"
            );
            Ok((Backend::Http(HttpQueryService::connect(&config).await?), config))
        }
    }
}
