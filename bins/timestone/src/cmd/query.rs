use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use timestone_api::decode_page;
use timestone_query::{QueryError, QueryExecutor};
use tokio_util::sync::CancellationToken;

use super::backend::connect;
use super::config::{Effective, QueryArgs};
use super::error::CliError;

#[derive(Args, Clone, Debug)]
pub struct QueryCmdArgs {
    /// Query to run (repeatable)
    #[arg(short, long)]
    pub query: Vec<String>,

    /// File of ';'-separated queries
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Print timing and scan cost for each query
    #[arg(long)]
    pub timing: bool,

    #[command(flatten)]
    pub target: QueryArgs,
}

pub async fn run(eff: &Effective, args: &QueryCmdArgs, cancel: &CancellationToken) -> Result<(), CliError> {
    let mut queries = args.query.clone();
    if let Some(file) = &args.file {
        queries.extend(split_statements(&std::fs::read_to_string(file)?));
    }
    if queries.is_empty() {
        return Err(CliError::Config("nothing to run: pass --query or --file".into()));
    }

    let (backend, config) = connect(eff, &args.target, "eda").await?;
    let executor = QueryExecutor::new(backend).with_max_rows(config.max_rows);

    let stdout = std::io::stdout();
    let results = executor
        .run_all(&queries, cancel, |_, page| {
            let (schema, rows) = decode_page(&page.schema, &page.rows)?;
            let mut out = stdout.lock();
            writeln!(out, "{schema}")?;
            for row in rows {
                writeln!(out, "{row}")?;
            }
            Ok::<_, QueryError>(())
        })
        .await;

    let mut failed = 0;
    for (query, result) in queries.iter().zip(&results) {
        match result {
            Ok(stats) => {
                if args.timing {
                    println!("{}", stats.timing_line());
                    println!("Estimated cost: ${:.3}", stats.estimated_cost());
                }
                tracing::info!(rows = stats.rows, pages = stats.pages, "query done");
            }
            Err(e) => {
                failed += 1;
                tracing::error!(query = %query, error = %e, "query failed");
            }
        }
    }

    if let Some(Err(QueryError::Interrupted)) = results.last() {
        return Err(QueryError::Interrupted.into());
    }
    if failed > 0 {
        return Err(CliError::Config(format!("{failed} of {} queries failed", queries.len())));
    }
    Ok(())
}

/// Split query text on `;`, dropping blank statements. Quoted `;` are kept.
pub fn split_statements(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    for c in text.chars() {
        match c {
            '\'' => {
                in_quote = !in_quote;
                current.push(c);
            }
            ';' if !in_quote => out.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    out.push(current);
    out.into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_statements() {
        let text = "SELECT 1;\n\nSELECT ';' AS x ;  ;\nSELECT 2";
        assert_eq!(
            split_statements(text),
            vec!["SELECT 1", "SELECT ';' AS x", "SELECT 2"]
        );
    }
}
