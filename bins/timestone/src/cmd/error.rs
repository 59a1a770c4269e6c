use timestone_api::DecodeError;
use timestone_query::QueryError;
use timestone_staging::StagingError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    Query(#[from] QueryError),

    #[error("{0}")]
    Staging(#[from] StagingError),

    #[error("{0}")]
    Decode(#[from] DecodeError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
