use std::path::PathBuf;

use clap::Args;
use timestone_staging::{package, send, PENDING_DIR};

use super::config::Effective;
use super::error::CliError;
use super::notify::Notifier;

#[derive(Args, Clone, Debug)]
pub struct TransferArgs {
    /// Staged directory to ship (default: <staging output_dir>/pending_upload)
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Destination as host:path (overrides [transfer] remote)
    #[arg(long)]
    pub remote: Option<String>,

    /// Archive path (default: <dir>.tar.gz)
    #[arg(long)]
    pub archive: Option<PathBuf>,
}

pub async fn run(eff: &Effective, args: &TransferArgs) -> Result<(), CliError> {
    let dir = args
        .dir
        .clone()
        .unwrap_or_else(|| eff.batch_config(None).output_dir.join(PENDING_DIR));
    if !dir.is_dir() {
        return Err(CliError::Config(format!("{} is not a directory", dir.display())));
    }
    let archive = args.archive.clone().unwrap_or_else(|| {
        let mut name = dir.clone().into_os_string();
        name.push(".tar.gz");
        PathBuf::from(name)
    });

    let mut report = package(&dir, &archive)?;
    println!(
        "Packaged {} ({} bytes) into {} ({} bytes, ratio {:.1})",
        dir.display(),
        report.staged_bytes,
        archive.display(),
        report.archive_bytes,
        report.compression_ratio()
    );

    if let Some(remote) = eff.remote(args.remote.as_deref()) {
        send(&archive, &remote)?;
        println!("Sent {} to {remote}", archive.display());
        report.remote = Some(remote);
    }

    let text = match &report.remote {
        Some(remote) => format!(
            "timestone transfer: {} bytes staged, {} bytes sent to {remote}",
            report.staged_bytes, report.archive_bytes
        ),
        None => format!(
            "timestone transfer: {} bytes staged, archive at {}",
            report.staged_bytes,
            report.archive.display()
        ),
    };
    Notifier::new(eff.webhook_url()).send(&text).await;
    Ok(())
}
