use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("unexpected layout: {0}")]
    BadLayout(String),

    #[error("no streams selected: pass --streams or --all-streams")]
    NoStreams,

    #[error("{program} exited with {status}")]
    Command { program: String, status: String },
}

impl StagingError {
    pub fn io(path: impl AsRef<Path>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        move |source| StagingError::Io { path, source }
    }
}
