//! Error types for offer document ingestion.

use thiserror::Error;

/// Why an offer document could not be turned into trips.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// The document did not yield any XML element at all.
    #[error("empty tree: offer document could not be parsed as XML")]
    EmptyTree,
    /// The document parsed but contains no TRIAS `Trip` element.
    #[error("invalid TRIAS data: no trips found")]
    InvalidData,
}

impl ExtractError {
    /// Process exit status used when the service runs in fail-fast mode.
    pub fn exit_code(&self) -> u8 {
        match self {
            ExtractError::EmptyTree => 1,
            ExtractError::InvalidData => 2,
        }
    }

    /// Stable identifier reported to RPC callers.
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractError::EmptyTree => "EmptyTreeError",
            ExtractError::InvalidData => "InvalidDataError",
        }
    }
}

impl From<ExtractError> for tonic::Status {
    fn from(err: ExtractError) -> Self {
        tonic::Status::invalid_argument(format!("{}: {}", err.kind(), err))
    }
}
