use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::StagingError;

#[derive(Debug, Clone, PartialEq)]
pub struct TransferReport {
    pub archive: PathBuf,
    pub staged_bytes: u64,
    pub archive_bytes: u64,
    pub remote: Option<String>,
}

impl TransferReport {
    /// Staged size over archive size; 0 for an empty archive.
    pub fn compression_ratio(&self) -> f64 {
        if self.archive_bytes == 0 {
            return 0.0;
        }
        self.staged_bytes as f64 / self.archive_bytes as f64
    }
}

/// Total size of every file under `dir`.
pub fn dir_size(dir: &Path) -> Result<u64, StagingError> {
    let mut total = 0;
    for entry in fs::read_dir(dir).map_err(StagingError::io(dir))? {
        let entry = entry.map_err(StagingError::io(dir))?;
        let meta = entry.metadata().map_err(StagingError::io(entry.path()))?;
        total += if meta.is_dir() {
            dir_size(&entry.path())?
        } else {
            meta.len()
        };
    }
    Ok(total)
}

/// Compress `dir` into a gzipped tarball at `archive`.
pub fn package(dir: &Path, archive: &Path) -> Result<TransferReport, StagingError> {
    let staged_bytes = dir_size(dir)?;
    let parent = dir
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = dir
        .file_name()
        .ok_or_else(|| StagingError::BadLayout(format!("{} has no directory name", dir.display())))?;

    tracing::info!(dir = %dir.display(), archive = %archive.display(), staged_bytes, "packaging");
    let mut tar = Command::new("tar");
    tar.arg("czf").arg(archive).arg("-C").arg(parent).arg(name);
    run(tar, "tar")?;

    let archive_bytes = fs::metadata(archive).map_err(StagingError::io(archive))?.len();
    Ok(TransferReport {
        archive: archive.to_path_buf(),
        staged_bytes,
        archive_bytes,
        remote: None,
    })
}

/// Copy `archive` to `remote` (`host:path`) with scp.
pub fn send(archive: &Path, remote: &str) -> Result<(), StagingError> {
    tracing::info!(archive = %archive.display(), remote, "sending");
    let mut scp = Command::new("scp");
    scp.arg(archive).arg(remote);
    run(scp, "scp")
}

fn run(mut cmd: Command, program: &str) -> Result<(), StagingError> {
    let status = cmd.status().map_err(StagingError::io(program))?;
    if !status.success() {
        return Err(StagingError::Command {
            program: program.to_string(),
            status: status.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_size_recurses() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("top.csv"), "12345").unwrap();
        fs::write(dir.path().join("a/b/deep.csv"), "123").unwrap();
        assert_eq!(dir_size(dir.path()).unwrap(), 8);
    }

    #[test]
    fn test_package() {
        let dir = tempfile::tempdir().unwrap();
        let pending = dir.path().join("pending_upload");
        fs::create_dir_all(pending.join("20190801_20190831/eda")).unwrap();
        let body = "Time,MeasureValue,ppt_id,dev_id\n".repeat(200);
        fs::write(pending.join("20190801_20190831/eda/combined_0.csv"), &body).unwrap();

        let archive = dir.path().join("pending.tar.gz");
        let report = package(&pending, &archive).unwrap();
        assert_eq!(report.staged_bytes, body.len() as u64);
        assert!(report.archive_bytes > 0);
        assert!(report.compression_ratio() > 1.0);
    }

    #[test]
    fn test_failed_command() {
        let err = run(Command::new("false"), "false").unwrap_err();
        assert!(matches!(err, StagingError::Command { .. }));
    }

    #[test]
    fn test_ratio_of_empty_archive() {
        let report = TransferReport {
            archive: PathBuf::from("x"),
            staged_bytes: 10,
            archive_bytes: 0,
            remote: None,
        };
        assert_eq!(report.compression_ratio(), 0.0);
    }
}
