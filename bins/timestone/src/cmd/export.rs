use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use clap::Args;
use timestone_api::ResultTable;
use timestone_query::{write_csv, QueryExecutor};
use tokio_util::sync::CancellationToken;

use super::backend::connect;
use super::config::{Effective, QueryArgs};
use super::error::CliError;

#[derive(Args, Clone, Debug)]
pub struct ExportArgs {
    /// Query whose result is exported
    #[arg(short, long)]
    pub query: String,

    /// Destination CSV file
    #[arg(short, long)]
    pub out: PathBuf,

    #[command(flatten)]
    pub target: QueryArgs,
}

pub async fn run(eff: &Effective, args: &ExportArgs, cancel: &CancellationToken) -> Result<(), CliError> {
    let (backend, config) = connect(eff, &args.target, "eda").await?;
    let executor = QueryExecutor::new(backend).with_max_rows(config.max_rows);

    let (pages, stats) = executor.collect(&args.query, cancel).await?;
    let table = ResultTable::from_pages(&pages)?;

    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    write_csv(&table, BufWriter::new(File::create(&args.out)?))?;

    tracing::info!(query_id = ?stats.query_id, pages = stats.pages, "export finished");
    println!(
        "Wrote {} rows x {} columns to {}",
        table.len(),
        table.columns.len(),
        args.out.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::config::Config;

    #[tokio::test]
    async fn test_export_from_recorded_pages() {
        let dir = tempfile::tempdir().unwrap();
        let pages = dir.path().join("recorded.json");
        std::fs::write(
            &pages,
            r#"{"ColumnInfo": [
                  {"Name": "ppt_id", "Type": {"ScalarType": "VARCHAR"}},
                  {"Name": "n", "Type": {"ScalarType": "BIGINT"}},
                  {"Name": "tags", "Type": {"ArrayColumnInfo": {"Type": {"ScalarType": "VARCHAR"}}}}],
                "Rows": [
                  {"Data": [{"ScalarValue": "fc096"}, {"ScalarValue": "12"}, {"ArrayValue": [{"ScalarValue": "a"}, {"ScalarValue": "b"}]}]},
                  {"Data": [{"ScalarValue": "fc097"}, {"NullValue": true}, {"ArrayValue": []}]}]}"#,
        )
        .unwrap();

        let out = dir.path().join("nested/out.csv");
        let args = ExportArgs {
            query: "SELECT * FROM x".into(),
            out: out.clone(),
            target: QueryArgs {
                pages: Some(pages),
                ..Default::default()
            },
        };
        run(&Effective { file: Config::default() }, &args, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(out).unwrap(),
            "ppt_id,n,tags\nfc096,12,\"[\"\"a\"\",\"\"b\"\"]\"\nfc097,,[]\n"
        );
    }
}
