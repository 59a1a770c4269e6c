use std::path::PathBuf;

use clap::Args;
use timestone_query::wear::{
    analyze_participant, fetch_participant, filter_participants, list_participants, write_dropped,
    write_summary, DEFAULT_THRESHOLD,
};
use timestone_query::QueryExecutor;
use tokio_util::sync::CancellationToken;

use super::backend::connect;
use super::config::{Effective, QueryArgs};
use super::error::CliError;

#[derive(Args, Clone, Debug)]
pub struct WearArgs {
    /// Comma separated participant ids (default: every participant in the table)
    #[arg(long)]
    pub participants: Option<String>,

    /// Keep only participants matching this regex at their start
    #[arg(long)]
    pub filter: Option<String>,

    /// Directory for wear_time_summary.csv and dropped_times/
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Values below this count as "not worn"
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f64,

    #[command(flatten)]
    pub target: QueryArgs,
}

pub async fn run(eff: &Effective, args: &WearArgs, cancel: &CancellationToken) -> Result<(), CliError> {
    let (backend, config) = connect(eff, &args.target, "eda").await?;
    let executor = QueryExecutor::new(backend).with_max_rows(config.max_rows);

    let mut participants = match &args.participants {
        Some(list) => list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        None => list_participants(&executor, &config, cancel).await?,
    };
    if let Some(pattern) = &args.filter {
        participants = filter_participants(&participants, pattern)?;
    }
    if participants.is_empty() {
        println!("No participants to scan. If you used a filter, double check the regex.");
        return Ok(());
    }

    let mut analyses = Vec::with_capacity(participants.len());
    for ppt_id in &participants {
        let table = fetch_participant(&executor, &config, ppt_id, cancel).await?;
        let analysis = analyze_participant(ppt_id, &table, args.threshold)?;
        write_dropped(&args.output, &analysis)?;
        println!(
            "Participant {ppt_id} had {} ({}%) rows dropped.",
            analysis.dropped_rows(),
            analysis.dropped_percent()
        );
        analyses.push(analysis);
    }

    let path = write_summary(&args.output, &analyses)?;
    println!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::config::Config;

    const RECORDED: &str = r#"[
      {"QueryId": "q-1", "ColumnInfo": [
          {"Name": "time", "Type": {"ScalarType": "TIMESTAMP"}},
          {"Name": "value", "Type": {"ScalarType": "DOUBLE"}},
          {"Name": "dev_id", "Type": {"ScalarType": "VARCHAR"}}],
       "Rows": [
          {"Data": [{"ScalarValue": "2019-08-01 10:00:00.000000000"}, {"ScalarValue": "0.5"}, {"ScalarValue": "A1"}]},
          {"Data": [{"ScalarValue": "2019-08-01 10:00:00.250000000"}, {"ScalarValue": "0.6"}, {"ScalarValue": "A1"}]}]},
      {"QueryId": "q-1", "ColumnInfo": [
          {"Name": "time", "Type": {"ScalarType": "TIMESTAMP"}},
          {"Name": "value", "Type": {"ScalarType": "DOUBLE"}},
          {"Name": "dev_id", "Type": {"ScalarType": "VARCHAR"}}],
       "Rows": [
          {"Data": [{"ScalarValue": "2019-08-01 10:00:20.000000000"}, {"ScalarValue": "0.0"}, {"ScalarValue": "A1"}]}]}
    ]"#;

    #[tokio::test]
    async fn test_wear_from_recorded_pages() {
        let dir = tempfile::tempdir().unwrap();
        let pages = dir.path().join("recorded.json");
        std::fs::write(&pages, RECORDED).unwrap();

        let eff = Effective { file: Config::default() };
        let args = WearArgs {
            participants: Some("fc096, fc097".into()),
            filter: Some("fc09[6]".into()),
            output: dir.path().join("out"),
            threshold: DEFAULT_THRESHOLD,
            target: QueryArgs {
                pages: Some(pages),
                ..Default::default()
            },
        };
        run(&eff, &args, &CancellationToken::new()).await.unwrap();

        let summary = std::fs::read_to_string(dir.path().join("out/wear_time_summary.csv")).unwrap();
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("fc096,A1,2019-08-01,"));

        let dropped = std::fs::read_to_string(dir.path().join("out/dropped_times/fc096.csv")).unwrap();
        assert_eq!(
            dropped,
            "start_time,end_time\n2019-08-01 10:00:20,2019-08-01 10:00:20\n"
        );
        assert!(!dir.path().join("out/dropped_times/fc097.csv").exists());
    }
}
