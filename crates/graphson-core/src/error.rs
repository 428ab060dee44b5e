//! Error types for graphson operations.
//!
//! Every failure aborts the running import. Errors raised while a record is being processed are
//! wrapped in [`GraphsonError::InRecord`] so the caller can locate the offending record, while
//! [`GraphsonError::root`] and [`GraphsonError::code`] still expose the underlying kind.

use std::fmt;

use thiserror::Error;

/// Result type alias for graphson operations.
pub type GraphsonResult<T> = Result<T, GraphsonError>;

/// The kind of record being processed when an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Vertex,
    Edge,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Vertex => f.write_str("vertex"),
            RecordKind::Edge => f.write_str("edge"),
        }
    }
}

/// Position of a record inside the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLocator {
    /// Which array the record was read from.
    pub kind: RecordKind,
    /// Zero-based position inside that array.
    pub index: u64,
    /// Raw `_id` of the record, when it could be read.
    pub id: Option<String>,
}

impl fmt::Display for RecordLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.kind, self.index)?;
        if let Some(id) = &self.id {
            write!(f, " (_id {})", id)?;
        }
        Ok(())
    }
}

/// Which end of an edge failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Out,
    In,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Out => f.write_str("out"),
            Direction::In => f.write_str("in"),
        }
    }
}

/// Main error type for all graphson operations.
#[derive(Error, Debug)]
pub enum GraphsonError {
    /// The token stream is not a well-formed document.
    #[error("Malformed stream: {message}")]
    MalformedStream {
        message: String,
        code: ErrorCode,
        /// Byte offset in the input, when the cursor knows it.
        offset: Option<u64>,
    },

    /// An embedded type tag is not recognized.
    #[error("Unknown type tag: '{tag}'")]
    UnknownTypeTag { tag: String },

    /// An integer literal does not fit in 64 signed bits.
    #[error("Numeric overflow: {literal} does not fit in a 64-bit signed integer")]
    NumericOverflow { literal: String },

    /// An edge endpoint does not resolve to a materialized vertex.
    #[error("Vertex not found: {direction} vertex {vertex_id} is not materialized")]
    VertexNotFound {
        vertex_id: String,
        direction: Direction,
    },

    /// The store already holds an edge with this id.
    #[error("Duplicate edge id: {edge_id}")]
    DuplicateEdgeId { edge_id: String },

    /// The store refused a property write.
    #[error("Property write rejected for key '{key}': {message}")]
    PropertyWriteRejected {
        key: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The store failed to commit a batch.
    #[error("Store commit failed: {message}")]
    StoreCommitFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Any other destination store failure.
    #[error("Graph store error: {message}")]
    Store {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An error raised while processing a specific record.
    #[error("{locator}: {source}")]
    InRecord {
        locator: RecordLocator,
        #[source]
        source: Box<GraphsonError>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error from the underlying stream.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Task join error from spawn_blocking.
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Stream (STREAM_xxx)
    StreamMalformed,
    StreamUnexpectedEof,
    StreamIo,

    // Values (VAL_xxx)
    ValUnknownTypeTag,
    ValNumericOverflow,
    ValTypeMismatch,
    ValMissingField,

    // Graph (GRP_xxx)
    GrpVertexNotFound,
    GrpDuplicateEdgeId,
    GrpPropertyRejected,
    GrpOperationFailed,

    // Transactions (TX_xxx)
    TxCommitFailed,

    // Configuration (CFG_xxx)
    CfgInvalid,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::StreamMalformed => "STREAM_001",
            ErrorCode::StreamUnexpectedEof => "STREAM_002",
            ErrorCode::StreamIo => "STREAM_003",
            ErrorCode::ValUnknownTypeTag => "VAL_001",
            ErrorCode::ValNumericOverflow => "VAL_002",
            ErrorCode::ValTypeMismatch => "VAL_003",
            ErrorCode::ValMissingField => "VAL_004",
            ErrorCode::GrpVertexNotFound => "GRP_001",
            ErrorCode::GrpDuplicateEdgeId => "GRP_002",
            ErrorCode::GrpPropertyRejected => "GRP_003",
            ErrorCode::GrpOperationFailed => "GRP_004",
            ErrorCode::TxCommitFailed => "TX_001",
            ErrorCode::CfgInvalid => "CFG_001",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl GraphsonError {
    /// Create a malformed stream error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedStream {
            message: message.into(),
            code: ErrorCode::StreamMalformed,
            offset: None,
        }
    }

    /// Create a malformed stream error at a byte offset.
    pub fn malformed_at(message: impl Into<String>, offset: u64) -> Self {
        Self::MalformedStream {
            message: message.into(),
            code: ErrorCode::StreamMalformed,
            offset: Some(offset),
        }
    }

    /// Create an error for input that ended in the middle of a document.
    pub fn unexpected_eof(offset: u64) -> Self {
        Self::MalformedStream {
            message: "unexpected end of input".to_string(),
            code: ErrorCode::StreamUnexpectedEof,
            offset: Some(offset),
        }
    }

    /// Create an error for a value whose shape does not match its type tag.
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::MalformedStream {
            message: message.into(),
            code: ErrorCode::ValTypeMismatch,
            offset: None,
        }
    }

    /// Create an error for a record lacking a required reserved key.
    pub fn missing_field(field: &str) -> Self {
        Self::MalformedStream {
            message: format!("record is missing required key '{}'", field),
            code: ErrorCode::ValMissingField,
            offset: None,
        }
    }

    /// Create a property rejection error.
    pub fn property_rejected(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PropertyWriteRejected {
            key: key.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a generic graph store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            code: ErrorCode::GrpOperationFailed,
            source: None,
        }
    }

    /// Create a graph store error that keeps the backend error as its source.
    pub fn store_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Store {
            message: message.into(),
            code: ErrorCode::GrpOperationFailed,
            source: Some(Box::new(source)),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Attach a record locator. Errors that already carry one are returned unchanged.
    pub fn in_record(self, locator: RecordLocator) -> Self {
        match self {
            wrapped @ Self::InRecord { .. } => wrapped,
            other => Self::InRecord {
                locator,
                source: Box::new(other),
            },
        }
    }

    /// The error with any record context stripped.
    pub fn root(&self) -> &GraphsonError {
        match self {
            Self::InRecord { source, .. } => source.root(),
            other => other,
        }
    }

    /// The record locator, if the error was raised inside a record.
    pub fn locator(&self) -> Option<&RecordLocator> {
        match self {
            Self::InRecord { locator, .. } => Some(locator),
            _ => None,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MalformedStream { code, .. } => *code,
            Self::UnknownTypeTag { .. } => ErrorCode::ValUnknownTypeTag,
            Self::NumericOverflow { .. } => ErrorCode::ValNumericOverflow,
            Self::VertexNotFound { .. } => ErrorCode::GrpVertexNotFound,
            Self::DuplicateEdgeId { .. } => ErrorCode::GrpDuplicateEdgeId,
            Self::PropertyWriteRejected { .. } => ErrorCode::GrpPropertyRejected,
            Self::StoreCommitFailed { .. } => ErrorCode::TxCommitFailed,
            Self::Store { code, .. } => *code,
            Self::InRecord { source, .. } => source.code(),
            Self::Configuration(_) => ErrorCode::CfgInvalid,
            Self::Io(_) => ErrorCode::StreamIo,
            Self::Serialization(_) => ErrorCode::StreamMalformed,
            _ => ErrorCode::Internal,
        }
    }

    /// Whether the error comes from the token cursor rather than from decoding or the store.
    pub fn is_stream_error(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::StreamMalformed | ErrorCode::StreamUnexpectedEof | ErrorCode::StreamIo
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator() -> RecordLocator {
        RecordLocator {
            kind: RecordKind::Edge,
            index: 3,
            id: Some("\"7\"".to_string()),
        }
    }

    #[test]
    fn test_in_record_preserves_root_kind() {
        let err = GraphsonError::DuplicateEdgeId {
            edge_id: "7".to_string(),
        }
        .in_record(locator());

        assert_eq!(err.code(), ErrorCode::GrpDuplicateEdgeId);
        assert!(matches!(err.root(), GraphsonError::DuplicateEdgeId { .. }));
        assert_eq!(err.locator().unwrap().index, 3);
    }

    #[test]
    fn test_in_record_is_not_nested_twice() {
        let err = GraphsonError::malformed("bad")
            .in_record(locator())
            .in_record(RecordLocator {
                kind: RecordKind::Vertex,
                index: 0,
                id: None,
            });

        assert_eq!(err.locator().unwrap().kind, RecordKind::Edge);
    }

    #[test]
    fn test_display_includes_locator() {
        let err = GraphsonError::VertexNotFound {
            vertex_id: "\"9\"".to_string(),
            direction: Direction::In,
        }
        .in_record(locator());

        let text = err.to_string();
        assert!(text.starts_with("edge #3 (_id \"7\")"));
        assert!(text.contains("in vertex \"9\""));
    }

    #[test]
    fn test_io_errors_are_stream_errors() {
        let err: GraphsonError =
            std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "closed").into();
        assert!(err.is_stream_error());
        assert!(!GraphsonError::store("boom").is_stream_error());
    }

    #[test]
    fn test_error_code_as_str() {
        assert_eq!(ErrorCode::StreamMalformed.as_str(), "STREAM_001");
        assert_eq!(ErrorCode::TxCommitFailed.as_str(), "TX_001");
    }
}
