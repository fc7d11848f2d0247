//! Custom error types for the report generator.
//!
//! This module provides the error hierarchy using `thiserror`. Load and
//! column-resolution errors abort a whole run; everything raised while
//! building one professor's report is caught by the driver and recorded as a
//! per-professor failure instead.
//!
//! Errors are serializable so a front-end (or `--json` output) can display a
//! stable code next to the message.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the report generator.
#[derive(Error, Debug)]
pub enum ReportError {
    /// The input file could not be read as a table.
    #[error("Failed to load dataset: {0}")]
    Load(String),

    /// An anchor column (or, in strict mode, a derived column) is missing.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// The requested professor has no rows in the dataset.
    #[error("Professor '{0}' not found in dataset")]
    UnknownProfessor(String),

    /// A chart could not be rasterized.
    #[error("Failed to render {topic} chart: {reason}")]
    Render { topic: String, reason: String },

    /// The PDF document could not be assembled or written.
    #[error("Failed to compose document: {0}")]
    Compose(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// PDF object model error.
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Raster decode error while embedding a chart.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ReportError>,
    },
}

impl ReportError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ReportError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Shorthand for a [`ReportError::Render`] failure.
    pub fn render(topic: impl Into<String>, reason: impl ToString) -> Self {
        ReportError::Render {
            topic: topic.into(),
            reason: reason.to_string(),
        }
    }

    /// Get a stable error code for front-end handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Load(_) => "LOAD_ERROR",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::UnknownProfessor(_) => "UNKNOWN_PROFESSOR",
            Self::Render { .. } => "RENDER_ERROR",
            Self::Compose(_) => "COMPOSE_ERROR",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Pdf(_) => "COMPOSE_ERROR",
            Self::Image(_) => "RENDER_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Whether this error aborts the whole run rather than one professor.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Load(_) | Self::ColumnNotFound(_) | Self::UnknownProfessor(_) => true,
            Self::InvalidConfig(_) => true,
            Self::WithContext { source, .. } => source.is_fatal(),
            _ => false,
        }
    }
}

/// Serialize implementation for front-end compatibility.
///
/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for ReportError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ReportError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ReportError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ReportError::Io(e).with_context(context))
    }
}

/// A non-fatal problem met while draining the scratch area.
///
/// Never raised as an error; collected, logged and reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupWarning {
    pub path: PathBuf,
    pub reason: String,
}

impl std::fmt::Display for CleanupWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to delete {}: {}", self.path.display(), self.reason)
    }
}
