//! Naming conventions of the device export tree:
//! `<export>_<YYYYMMDD>_<YYYYMMDD>/<study>/<SITE>/<number>/<device>/<stream>.csv`.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::StagingError;

static MONTH_RE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"\d{8}_\d{8}"));

/// `(device_id, participant_id)` for a sensor file.
///
/// The device is the parent directory; the participant is the lower-cased
/// site directory followed by the participant number directory.
pub fn extract_ids_from_path(path: &Path) -> Result<(String, String), StagingError> {
    let parts: Vec<&str> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect();
    if parts.len() < 4 {
        return Err(StagingError::BadLayout(format!(
            "{} needs <site>/<number>/<device>/<file>",
            path.display()
        )));
    }
    let n = parts.len();
    let device = parts[n - 2].to_string();
    let participant = format!("{}{}", parts[n - 4].to_lowercase(), parts[n - 3]);
    Ok((device, participant))
}

/// Export period such as `20190801_20190831`, taken from anywhere in the path.
pub fn extract_month(path: &Path) -> Result<String, StagingError> {
    let re = MONTH_RE
        .as_ref()
        .map_err(|e| StagingError::BadLayout(e.to_string()))?;
    let text = path.to_string_lossy();
    re.find(&text)
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| StagingError::BadLayout(format!("{} has no YYYYMMDD_YYYYMMDD period", path.display())))
}

/// Stream name of a sensor file: its name up to the first dot.
pub fn stream_of(path: &Path) -> Result<String, StagingError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.split('.').next())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| StagingError::BadLayout(format!("{} has no file name", path.display())))
}

// ═══════════════════════════════════════════════════════════════
//  Stream selection
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamSelection {
    All,
    Only(Vec<String>),
}

impl StreamSelection {
    /// `--all-streams` wins over `--streams`; neither is an error.
    pub fn from_flags(streams: Option<&str>, all_streams: bool) -> Result<Self, StagingError> {
        match (all_streams, streams) {
            (true, _) => Ok(StreamSelection::All),
            (false, Some(list)) => {
                let names = split_streams(list);
                if names.is_empty() {
                    return Err(StagingError::NoStreams);
                }
                Ok(StreamSelection::Only(names))
            }
            (false, None) => Err(StagingError::NoStreams),
        }
    }

    pub fn apply(&self, paths: Vec<PathBuf>) -> Vec<PathBuf> {
        match self {
            StreamSelection::All => paths,
            StreamSelection::Only(names) => paths
                .into_iter()
                .filter(|p| {
                    let text = p.to_string_lossy();
                    names.iter().any(|s| text.contains(s.as_str()))
                })
                .collect(),
        }
    }
}

impl fmt::Display for StreamSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamSelection::All => f.write_str("all"),
            StreamSelection::Only(names) => f.write_str(&names.join(",")),
        }
    }
}

/// Keep paths containing any of the comma-separated `streams`.
pub fn filter_streams(paths: Vec<PathBuf>, streams: &str) -> Vec<PathBuf> {
    StreamSelection::Only(split_streams(streams)).apply(paths)
}

fn split_streams(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
