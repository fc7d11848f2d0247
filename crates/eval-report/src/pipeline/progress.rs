//! Progress reporting for report runs.
//!
//! A run emits human-readable [`ProgressUpdate`]s at each milestone: the file
//! is loaded, the professor count is known, each professor starts, each
//! finished report is moved. A front-end subscribes with a closure or a
//! [`ProgressReporter`] implementation.
//!
//! # Example
//!
//! ```rust,ignore
//! use eval_report::ReportPipeline;
//!
//! let summary = ReportPipeline::builder()
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .run_file("responses.xlsx", None)?;
//! ```

use serde::{Deserialize, Serialize};

/// Stages of a report run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStage {
    /// Reading and sorting the input file
    Loading,
    /// Locating topic columns from the anchors
    ResolvingColumns,
    /// Aggregating and composing one document per professor
    Generating,
    /// Moving finished documents to the destination
    Relocating,
    /// Draining the scratch area
    Cleanup,
    /// Run finished
    Complete,
    /// Run aborted
    Failed,
}

impl ReportStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Loading => "Loading Dataset",
            Self::ResolvingColumns => "Resolving Columns",
            Self::Generating => "Generating Reports",
            Self::Relocating => "Moving Reports",
            Self::Cleanup => "Cleaning Up",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Share of the whole run taken by this stage (0.0 - 1.0).
    pub fn weight(&self) -> f32 {
        match self {
            Self::Loading => 0.10,
            Self::ResolvingColumns => 0.02,
            Self::Generating => 0.80,
            Self::Relocating => 0.05,
            Self::Cleanup => 0.03,
            Self::Complete | Self::Failed => 0.0,
        }
    }

    /// Cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Loading => 0.0,
            Self::ResolvingColumns => 0.10,
            Self::Generating => 0.12,
            Self::Relocating => 0.92,
            Self::Cleanup => 0.97,
            Self::Complete => 1.0,
            Self::Failed => 0.0,
        }
    }
}

/// One progress notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Current stage
    pub stage: ReportStage,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Human-readable status line
    pub message: String,

    /// Items handled so far in this stage (professors, files)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_processed: Option<usize>,

    /// Items in this stage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_total: Option<usize>,
}

impl ProgressUpdate {
    /// Creates a progress update for a stage.
    pub fn new(stage: ReportStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + (stage.weight() * stage_progress.clamp(0.0, 1.0));
        Self {
            stage,
            progress: progress.clamp(0.0, 1.0),
            message: message.into(),
            items_processed: None,
            items_total: None,
        }
    }

    /// Creates a progress update with item counts.
    pub fn with_items(
        stage: ReportStage,
        current: usize,
        total: usize,
        message: impl Into<String>,
    ) -> Self {
        let stage_progress = if total > 0 {
            current as f32 / total as f32
        } else {
            0.0
        };
        Self {
            items_processed: Some(current),
            items_total: Some(total),
            ..Self::new(stage, stage_progress, message)
        }
    }

    /// Creates a completion progress update.
    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            stage: ReportStage::Complete,
            progress: 1.0,
            message: message.into(),
            items_processed: None,
            items_total: None,
        }
    }

    /// Creates a failed progress update.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            stage: ReportStage::Failed,
            progress: 0.0,
            message: message.into(),
            items_processed: None,
            items_total: None,
        }
    }
}

/// Receiver of progress updates.
///
/// Implementations must be `Send + Sync` so a front-end can run the batch on
/// a worker thread and forward updates to its own event loop.
pub trait ProgressReporter: Send + Sync {
    /// Called synchronously at every milestone. Keep it cheap.
    fn report(&self, update: ProgressUpdate);
}

/// [`ProgressReporter`] backed by a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_progress_update_new() {
        let update = ProgressUpdate::new(ReportStage::Loading, 1.0, "File loaded");
        assert_eq!(update.stage, ReportStage::Loading);
        assert!((update.progress - 0.10).abs() < 1e-6);
        assert_eq!(update.message, "File loaded");
        assert!(update.items_total.is_none());
    }

    #[test]
    fn test_progress_update_with_items() {
        let update = ProgressUpdate::with_items(
            ReportStage::Generating,
            1,
            4,
            "Generating report for SMITH J (2/4)",
        );
        assert_eq!(update.items_processed, Some(1));
        assert_eq!(update.items_total, Some(4));
        assert!((update.progress - (0.12 + 0.80 * 0.25)).abs() < 1e-6);
    }

    #[test]
    fn test_with_items_zero_total() {
        let update = ProgressUpdate::with_items(ReportStage::Relocating, 0, 0, "Nothing to move");
        assert!((update.progress - ReportStage::Relocating.base_progress()).abs() < 1e-6);
    }

    #[test]
    fn test_terminal_updates() {
        assert_eq!(ProgressUpdate::complete("Done").progress, 1.0);
        let failed = ProgressUpdate::failed("boom");
        assert_eq!(failed.stage, ReportStage::Failed);
        assert_eq!(failed.message, "boom");
    }

    #[test]
    fn test_stage_weights_cover_run() {
        let stages = [
            ReportStage::Loading,
            ReportStage::ResolvingColumns,
            ReportStage::Generating,
            ReportStage::Relocating,
            ReportStage::Cleanup,
        ];
        let total: f32 = stages.iter().map(|s| s.weight()).sum();
        assert!((total - 1.0).abs() < 1e-6);
        for pair in stages.windows(2) {
            let end = pair[0].base_progress() + pair[0].weight();
            assert!((end - pair[1].base_progress()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_closure_progress_reporter() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let counter = call_count.clone();
        let reporter = ClosureProgressReporter::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        reporter.report(ProgressUpdate::new(ReportStage::Loading, 0.0, "Loading"));
        reporter.report(ProgressUpdate::complete("Done"));

        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_progress_update_serializes_stage() {
        let json = serde_json::to_string(&ProgressUpdate::new(
            ReportStage::ResolvingColumns,
            0.0,
            "Resolving",
        ))
        .unwrap();
        assert!(json.contains("\"stage\":\"resolving_columns\""));
        assert!(!json.contains("items_total"));
    }
}
