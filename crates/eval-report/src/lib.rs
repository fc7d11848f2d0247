//! Evaluation Report Library
//!
//! Turns a student-evaluation survey export into one PDF report per
//! professor, built with Polars, plotters and lopdf.
//!
//! # Overview
//!
//! - **Loading**: `.xlsx`/`.xls`/`.ods` (calamine) and `.csv` (Polars) exports,
//!   normalized to text and sorted by professor
//! - **Column Resolution**: topic columns located from two named anchors and
//!   an explicit [`ColumnLayout`]
//! - **Aggregation**: specialization, course and year, attendance, workload,
//!   teaching methods, graded questions (Pareto order), comments and the
//!   completion trend
//! - **Charts**: pie, bar, Pareto and trend charts rasterized into a scratch
//!   directory
//! - **Documents**: multi-page US-Letter PDFs with wrapped, paginated comments
//! - **Isolation**: a failing professor (or chart) never stops the batch
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use eval_report::{ReportConfig, ReportPipeline};
//!
//! let config = ReportConfig::builder()
//!     .destination_dir("reports")
//!     .build()?;
//!
//! let summary = ReportPipeline::builder()
//!     .config(config)
//!     .on_progress(|update| println!("{}", update.message))
//!     .build()?
//!     .run_file("responses.xlsx", None)?;
//!
//! println!(
//!     "{} reports written, {} failed",
//!     summary.reports.len(),
//!     summary.failures.len()
//! );
//! ```
//!
//! # Configuration
//!
//! The layout defaults match the standard export ("Level 2" = professor,
//! "Level 3" = course/year). A drifted export is handled by adjusting the
//! layout instead of the code:
//!
//! ```rust,ignore
//! use eval_report::{ReportConfig, YearMatch};
//!
//! let config = ReportConfig::builder()
//!     .group_by_column("Profesor")
//!     .course_year_column("Disciplina")
//!     .strict_layout(true)               // fail on missing topic columns
//!     .year_match(YearMatch::RejectAmbiguous)
//!     .build()?;
//! ```

pub mod aggregate;
pub mod chart;
pub mod columns;
pub mod config;
pub mod document;
pub mod error;
pub mod loader;
pub mod output;
pub mod pipeline;
pub mod scratch;
pub mod utils;

// Re-exports for convenient access
pub use aggregate::{
    CategoryBreakdown, CategoryCount, CommentSection, CompletionStatus, CompletionTrend,
    GradeDistribution, ProfessorStats, QuestionOutcome, QuestionStats, TeachingMethods,
};
pub use chart::{ChartArtifact, ChartKind, ChartRenderer, ChartTopic};
pub use columns::ColumnMap;
pub use config::{
    ColumnLayout, ConfigValidationError, ReportConfig, ReportConfigBuilder, YearMatch,
};
pub use document::{ComposedPage, ComposedReport, DocumentComposer, PageKind, plan_pages};
pub use error::{CleanupWarning, ReportError, Result as ReportResult, ResultExt};
pub use loader::{ProfessorSubset, ResponseTable, load_table};
pub use output::{MovedFile, relocate, report_file_name, sanitize_filename, unique_path};
pub use pipeline::{
    ClosureProgressReporter, GeneratedReport, ProfessorFailure, ProgressReporter, ProgressUpdate,
    ReportPipeline, ReportPipelineBuilder, ReportStage, RunSummary,
};
pub use scratch::clear_dir;
