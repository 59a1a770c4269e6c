use std::path::PathBuf;

use clap::Args;
use timestone_staging::{remove_unzipped, unzip_walk, BatchWriter, StreamSelection};

use super::config::{Effective, SourceArgs};
use super::error::CliError;
use super::estimate;
use super::notify::Notifier;

#[derive(Args, Clone, Debug)]
pub struct PrepArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Directory that receives pending_upload/ (overrides [staging] output_dir)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the estimated cost without writing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

/// Sensor files selected from a source, plus the zip they came from.
pub struct Inputs {
    pub paths: Vec<PathBuf>,
    pub zip: Option<PathBuf>,
}

impl Inputs {
    pub fn resolve(source: &SourceArgs) -> Result<Self, CliError> {
        let selection = StreamSelection::from_flags(source.streams.as_deref(), source.all_streams)?;
        let is_zip = source
            .path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("zip"));

        let (paths, zip) = if is_zip {
            (unzip_walk(&source.path)?, Some(source.path.clone()))
        } else {
            (vec![source.path.clone()], None)
        };
        let paths = selection.apply(paths);
        tracing::info!(files = paths.len(), streams = %selection, "inputs selected");
        Ok(Self { paths, zip })
    }

    /// Remove extracted files if this came from a zip and `cleanup` is set.
    pub fn finish(&self, cleanup: bool) -> Result<(), CliError> {
        if let (true, Some(zip)) = (cleanup, &self.zip) {
            remove_unzipped(zip)?;
        }
        Ok(())
    }
}

pub async fn run(eff: &Effective, args: &PrepArgs) -> Result<(), CliError> {
    let inputs = Inputs::resolve(&args.source)?;
    if inputs.paths.is_empty() {
        inputs.finish(args.source.cleanup)?;
        return Err(CliError::Config(format!(
            "no sensor files selected from {}",
            args.source.path.display()
        )));
    }

    if args.dry_run {
        let result = estimate::report(&inputs.paths);
        inputs.finish(args.source.cleanup)?;
        println!("{}", result?);
        return Ok(());
    }

    println!("Prepping files for bulk upload");
    let mut writer = BatchWriter::new(eff.batch_config(args.output.as_deref()));
    let staged = writer.stage(&inputs.paths);
    inputs.finish(args.source.cleanup)?;
    let report = staged?;

    let summary = format!(
        "Staged {} files ({} records, {} bytes) into {} files under {}",
        report.files_read,
        report.records_written,
        report.bytes_written,
        report.outputs.len(),
        writer.pending_dir().display()
    );
    println!("{summary}");
    if report.malformed_rows > 0 {
        println!(
            "Warning: {} rows had the wrong number of fields and were padded or cut",
            report.malformed_rows
        );
    }
    for path in &report.outputs {
        println!("  {}", path.display());
    }

    Notifier::new(eff.webhook_url())
        .send(&format!("timestone prep: {summary}"))
        .await;
    Ok(())
}
