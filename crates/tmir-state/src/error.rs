//! Error types for frame decoding.

use thiserror::Error;

/// Reasons an inbound frame is rejected before it reaches the reconciler.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Frame is not a JSON object")]
    NotAnObject,

    #[error("Malformed `{kind}` message: {source}")]
    Shape {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, DecodeError>;
