use thiserror::Error;

/// Envelope-level failures. Receivers drop the offending message and keep the
/// connection open.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("envelope has no `type` field")]
    MissingType,

    #[error("unknown envelope type `{0}`")]
    UnknownType(String),

    #[error("`{kind}` envelope requires `{field}`")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },

    #[error("`{kind}` is not valid in the current state: {reason}")]
    Unexpected { kind: &'static str, reason: String },
}
