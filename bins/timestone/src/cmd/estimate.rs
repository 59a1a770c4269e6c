use std::path::PathBuf;

use clap::Args;
use timestone_staging::{count_rows, WriteCostModel};

use super::config::SourceArgs;
use super::error::CliError;
use super::prep::Inputs;

#[derive(Args, Clone, Debug)]
pub struct EstimateArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

pub fn run(args: &EstimateArgs) -> Result<(), CliError> {
    let inputs = Inputs::resolve(&args.source)?;
    let result = report(&inputs.paths);
    inputs.finish(args.source.cleanup)?;
    println!("{}", result?);
    Ok(())
}

/// Cost and duration of writing `paths` record by record.
pub fn report(paths: &[PathBuf]) -> Result<String, CliError> {
    let model = WriteCostModel::default();
    let mut path_rows = Vec::with_capacity(paths.len());
    for path in paths {
        let rows = count_rows(path)?;
        tracing::debug!(path = %path.display(), rows, "counted");
        path_rows.push((path.clone(), rows));
    }
    let rows: usize = path_rows.iter().map(|(_, r)| r).sum();
    let cost = model.walking_cost(&path_rows)?;
    let minutes = model.walking_time(&path_rows);
    Ok(format!(
        "{} files, {rows} records. Estimated cost: ${cost:.2}. Estimated time: {minutes:.1} minutes.",
        path_rows.len()
    ))
}
