//! Pipeline module.
//!
//! This module provides the batch driver and its progress reporting.

mod builder;
pub mod progress;

pub use builder::{
    GeneratedReport, ProfessorFailure, ReportPipeline, ReportPipelineBuilder, RunSummary,
};
pub use progress::{ClosureProgressReporter, ProgressReporter, ProgressUpdate, ReportStage};
