/// Failure while turning a query result into text or typed values.
///
/// Both variants are final for the row or page being decoded: nothing is
/// rendered partially and retrying the same input gives the same error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Row arity differs from the schema it is paired with.
    #[error("schema mismatch: schema has {expected} columns, row has {actual}")]
    SchemaMismatch { expected: usize, actual: usize },

    /// A node carries no recognised tag, several tags, or a tag whose
    /// payload does not fit the paired column type.
    #[error("malformed result: {0}")]
    MalformedResult(String),
}

impl DecodeError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResult(msg.into())
    }
}
