use timestone_api::DecodeError;

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("config: {0}")]
    Config(String),

    #[error("aws: {0}")]
    Sdk(String),

    #[error("service returned {status} ({kind}): {message}")]
    Service { status: u16, kind: String, message: String },

    #[error("{0}")]
    Decode(#[from] DecodeError),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("query interrupted")]
    Interrupted,

    #[error("invalid participant id {0:?}")]
    InvalidParticipant(String),

    #[error("pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("{0}")]
    Handler(String),
}
