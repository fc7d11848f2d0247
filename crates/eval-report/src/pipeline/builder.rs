//! Report pipeline driver.
//!
//! This module provides [`ReportPipeline`], which runs a whole batch: clear
//! the working directories, resolve columns, generate one document per
//! professor, move the documents to their destination and drain the scratch
//! area.

use crate::aggregate::ProfessorStats;
use crate::chart::ChartRenderer;
use crate::columns::ColumnMap;
use crate::config::{ConfigValidationError, ReportConfig};
use crate::document::{ComposedReport, DocumentComposer};
use crate::error::{CleanupWarning, ReportError, Result, ResultExt};
use crate::loader::{ResponseTable, load_table};
use crate::output::{MovedFile, relocate, report_file_name, unique_path};
use crate::pipeline::progress::{
    ClosureProgressReporter, ProgressReporter, ProgressUpdate, ReportStage,
};
use crate::scratch::clear_dir;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// One professor's finished document.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedReport {
    pub professor: String,
    /// Final location of the PDF.
    pub path: PathBuf,
    pub page_count: usize,
    /// Charts replaced by a placeholder.
    pub warnings: Vec<String>,
    /// Page-by-page record of what was drawn.
    #[serde(skip)]
    pub document: ComposedReport,
}

/// A professor whose document could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfessorFailure {
    pub professor: String,
    pub code: String,
    pub message: String,
}

impl ProfessorFailure {
    fn new(professor: &str, error: &ReportError) -> Self {
        Self {
            professor: professor.to_string(),
            code: error.error_code().to_string(),
            message: error.to_string(),
        }
    }
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub reports: Vec<GeneratedReport>,
    pub failures: Vec<ProfessorFailure>,
    pub moved: Vec<MovedFile>,
    pub cleanup_warnings: Vec<CleanupWarning>,
    pub duration_ms: u64,
}

impl RunSummary {
    /// Professors the run attempted.
    pub fn attempted(&self) -> usize {
        self.reports.len() + self.failures.len()
    }

    /// True when professors were attempted and none produced a document.
    pub fn all_failed(&self) -> bool {
        self.reports.is_empty() && !self.failures.is_empty()
    }

    pub fn report_for(&self, professor: &str) -> Option<&GeneratedReport> {
        self.reports.iter().find(|r| r.professor == professor)
    }
}

/// The report pipeline.
///
/// Use [`ReportPipeline::builder()`] to create one.
///
/// # Example
///
/// ```rust,ignore
/// use eval_report::{ReportConfig, ReportPipeline};
///
/// let summary = ReportPipeline::builder()
///     .config(ReportConfig::builder().destination_dir("reports").build()?)
///     .on_progress(|update| println!("{}", update.message))
///     .build()?
///     .run_file("responses.xlsx", None)?;
///
/// for failure in &summary.failures {
///     eprintln!("{}: {}", failure.professor, failure.message);
/// }
/// ```
pub struct ReportPipeline {
    config: ReportConfig,
    renderer: ChartRenderer,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

// Front-ends run batches on a worker thread
static_assertions::assert_impl_all!(ReportPipeline: Send);

impl ReportPipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> ReportPipelineBuilder {
        ReportPipelineBuilder::default()
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Load `path` and generate reports for `professor`, or for everyone.
    pub fn run_file(&self, path: impl AsRef<Path>, professor: Option<&str>) -> Result<RunSummary> {
        let path = path.as_ref();
        self.finish(self.run_file_internal(path, professor))
    }

    /// Generate reports from an already loaded table.
    pub fn run(&self, table: &ResponseTable, professor: Option<&str>) -> Result<RunSummary> {
        self.finish(self.generate(table, professor, Instant::now()))
    }

    /// Load a table with this pipeline's configuration.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<ResponseTable> {
        load_table(path, &self.config)
    }

    /// Emit the terminal progress update for a run.
    fn finish(&self, result: Result<RunSummary>) -> Result<RunSummary> {
        match result {
            Ok(summary) => {
                self.report_progress(ProgressUpdate::complete(format!(
                    "Generated {} of {} reports",
                    summary.reports.len(),
                    summary.attempted()
                )));
                Ok(summary)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Report run failed: {}", e);
                Err(e)
            }
        }
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn run_file_internal(&self, path: &Path, professor: Option<&str>) -> Result<RunSummary> {
        let start = Instant::now();
        self.report_progress(ProgressUpdate::new(
            ReportStage::Loading,
            0.0,
            format!("Loading {}...", path.display()),
        ));

        let table = self.load(path)?;
        self.report_progress(ProgressUpdate::new(
            ReportStage::Loading,
            1.0,
            format!("File loaded: {} responses", table.height()),
        ));

        self.generate(&table, professor, start)
    }

    fn generate(
        &self,
        table: &ResponseTable,
        professor: Option<&str>,
        start: Instant,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let staging = &self.config.staging_dir;

        summary.cleanup_warnings.extend(clear_dir(&self.config.scratch_dir));
        summary.cleanup_warnings.extend(clear_dir(staging));
        std::fs::create_dir_all(staging)
            .context(format!("Failed to create staging directory {}", staging.display()))?;

        self.report_progress(ProgressUpdate::new(
            ReportStage::ResolvingColumns,
            0.0,
            "Resolving columns...",
        ));
        let columns = ColumnMap::resolve(&table.column_names(), &self.config.layout)?;

        let professors = self.select_professors(table, professor)?;
        let count = professors.len();
        info!("Found {} professors", count);
        self.report_progress(ProgressUpdate::with_items(
            ReportStage::Generating,
            0,
            count,
            format!("Found {} professors", count),
        ));

        let mut staged = Vec::with_capacity(count);
        for (index, name) in professors.iter().enumerate() {
            self.report_progress(ProgressUpdate::with_items(
                ReportStage::Generating,
                index,
                count,
                format!("Generating report for {} ({}/{})", name, index + 1, count),
            ));

            match self.generate_one(table, &columns, name) {
                Ok(document) => staged.push(document),
                Err(e) => {
                    error!("Report for '{}' failed: {}", name, e);
                    summary.failures.push(ProfessorFailure::new(name, &e));
                }
            }
            summary
                .cleanup_warnings
                .extend(clear_dir(&self.config.scratch_dir));
        }

        let staged_count = staged.len();
        for (index, document) in staged.into_iter().enumerate() {
            let base_name = report_file_name(&document.professor);
            match relocate(&document.path, &self.config.destination_dir, &base_name) {
                Ok(moved) => {
                    if let Some(leftover) = &moved.leftover {
                        summary.cleanup_warnings.push(leftover.clone());
                    }
                    self.report_progress(ProgressUpdate::with_items(
                        ReportStage::Relocating,
                        index + 1,
                        staged_count,
                        format!("Moved {} to {}", file_name(&moved.to), self.config.destination_dir.display()),
                    ));
                    summary.reports.push(GeneratedReport {
                        professor: document.professor.clone(),
                        path: moved.to.clone(),
                        page_count: document.page_count(),
                        warnings: document.warnings.clone(),
                        document,
                    });
                    summary.moved.push(moved);
                }
                Err(e) => {
                    error!("Could not move report for '{}': {}", document.professor, e);
                    summary
                        .failures
                        .push(ProfessorFailure::new(&document.professor, &e));
                }
            }
        }

        self.report_progress(ProgressUpdate::new(
            ReportStage::Cleanup,
            0.0,
            "Cleaning up temporary files...",
        ));
        summary
            .cleanup_warnings
            .extend(clear_dir(&self.config.scratch_dir));
        if !summary.cleanup_warnings.is_empty() {
            warn!(
                "{} temporary files could not be removed",
                summary.cleanup_warnings.len()
            );
        }

        summary.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Generated {} reports ({} failed) in {} ms",
            summary.reports.len(),
            summary.failures.len(),
            summary.duration_ms
        );
        Ok(summary)
    }

    fn select_professors(&self, table: &ResponseTable, professor: Option<&str>) -> Result<Vec<String>> {
        let all = table.professors()?;
        match professor {
            Some(name) if all.iter().any(|p| p == name) => Ok(vec![name.to_string()]),
            Some(name) => Err(ReportError::UnknownProfessor(name.to_string())),
            None => Ok(all),
        }
    }

    /// Aggregate and compose one professor into the staging directory.
    fn generate_one(
        &self,
        table: &ResponseTable,
        columns: &ColumnMap,
        professor: &str,
    ) -> Result<ComposedReport> {
        let subset = table.subset(professor)?;
        let stats = ProfessorStats::compute(table, &subset, columns, &self.config)?;
        let output = unique_path(&self.config.staging_dir, &report_file_name(professor));
        DocumentComposer::new(&self.config, &self.renderer).compose(&stats, &output)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Builder for creating a [`ReportPipeline`] instance.
///
/// Use [`ReportPipeline::builder()`] to get started.
#[derive(Default)]
pub struct ReportPipelineBuilder {
    config: Option<ReportConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(ReportPipelineBuilder: Send);

impl ReportPipelineBuilder {
    /// Set the report configuration.
    pub fn config(mut self, config: ReportConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during a run.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use eval_report::{ProgressReporter, ProgressUpdate};
    /// use std::sync::Arc;
    ///
    /// struct StatusBar;
    ///
    /// impl ProgressReporter for StatusBar {
    ///     fn report(&self, update: ProgressUpdate) {
    ///         println!("{}: {}", update.stage.display_name(), update.message);
    ///     }
    /// }
    ///
    /// let pipeline = ReportPipeline::builder()
    ///     .progress_reporter(Arc::new(StatusBar))
    ///     .build()?;
    /// ```
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<ReportPipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let renderer = ChartRenderer::new(config.scratch_dir.clone());
        Ok(ReportPipeline {
            config,
            renderer,
            progress_reporter: self.progress_reporter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn row(values: &[&str]) -> Vec<Option<String>> {
        values
            .iter()
            .map(|v| if v.is_empty() { None } else { Some(v.to_string()) })
            .collect()
    }

    fn config(dir: &Path) -> ReportConfig {
        ReportConfig::builder()
            .scratch_dir(dir.join("temp"))
            .staging_dir(dir.join("output"))
            .destination_dir(dir.join("reports"))
            .logo_path(None)
            .has_metadata_row(false)
            .build()
            .unwrap()
    }

    fn table(config: &ReportConfig, professors: &[&str]) -> ResponseTable {
        let mut grid = vec![row(&["Spec", "Level 2", "Level 3", "Attendance", "Workload"])];
        for name in professors {
            grid.push(row(&["Finance", name, "Curs-Anul 1", "100%", "Mic"]));
        }
        ResponseTable::from_grid(grid, config).unwrap()
    }

    #[test]
    fn test_pipeline_builder_default() {
        let pipeline = ReportPipeline::builder().build().unwrap();
        assert_eq!(pipeline.config().layout.group_by_column, "Level 2");
        assert!(pipeline.progress_reporter.is_none());
    }

    #[test]
    fn test_pipeline_builder_rejects_invalid_config() {
        let mut config = ReportConfig::default();
        config.layout.course_year_column = config.layout.group_by_column.clone();
        assert!(ReportPipeline::builder().config(config).build().is_err());
    }

    #[test]
    fn test_pipeline_builder_rejects_destination_in_staging() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.destination_dir = config.staging_dir.clone();

        let result = ReportPipeline::builder().config(config).build();
        assert!(matches!(
            result,
            Err(ConfigValidationError::OverlappingDirs { .. })
        ));
    }

    #[test]
    fn test_pipeline_builder_with_progress_callback() {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let sink = messages.clone();

        let pipeline = ReportPipeline::builder()
            .on_progress(move |update| sink.lock().unwrap().push(update.message))
            .build()
            .unwrap();
        pipeline.report_progress(ProgressUpdate::new(ReportStage::Loading, 0.5, "Test"));

        assert_eq!(*messages.lock().unwrap(), vec!["Test".to_string()]);
    }

    #[test]
    fn test_run_generates_and_moves_reports() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let table = table(&config, &["SMITH J", "DOE A"]);

        let messages = Arc::new(Mutex::new(Vec::new()));
        let sink = messages.clone();
        let summary = ReportPipeline::builder()
            .config(config)
            .on_progress(move |update| sink.lock().unwrap().push(update.message))
            .build()
            .unwrap()
            .run(&table, None)
            .unwrap();

        assert!(summary.failures.is_empty());
        assert_eq!(summary.reports.len(), 2);
        assert_eq!(summary.moved.len(), 2);
        for report in &summary.reports {
            assert!(report.path.starts_with(dir.path().join("reports")));
            assert!(report.path.is_file());
        }
        assert!(dir.path().join("reports").join("report_SMITH J.pdf").is_file());
        assert_eq!(std::fs::read_dir(dir.path().join("temp")).unwrap().count(), 0);

        let messages = messages.lock().unwrap();
        assert!(messages.iter().any(|m| m == "Found 2 professors"));
        assert!(messages.iter().any(|m| m.starts_with("Generating report for DOE A")));
        assert!(messages.iter().any(|m| m.starts_with("Moved report_DOE A.pdf")));
        assert_eq!(messages.last().unwrap(), "Generated 2 of 2 reports");
    }

    #[test]
    fn test_run_single_professor() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let table = table(&config, &["SMITH J", "DOE A"]);
        let pipeline = ReportPipeline::builder().config(config).build().unwrap();

        let summary = pipeline.run(&table, Some("DOE A")).unwrap();
        assert_eq!(summary.reports.len(), 1);
        assert_eq!(summary.reports[0].professor, "DOE A");
    }

    #[test]
    fn test_unknown_professor_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let table = table(&config, &["SMITH J"]);
        let pipeline = ReportPipeline::builder().config(config).build().unwrap();

        let err = pipeline.run(&table, Some("NOBODY")).unwrap_err();
        assert!(matches!(err, ReportError::UnknownProfessor(ref p) if p == "NOBODY"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_missing_anchor_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let grid = vec![row(&["Spec", "Level 2"]), row(&["Finance", "SMITH J"])];
        let table = ResponseTable::from_grid(grid, &config).unwrap();
        let pipeline = ReportPipeline::builder().config(config).build().unwrap();

        let err = pipeline.run(&table, None).unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
    }

    #[test]
    fn test_failing_professor_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        // No filesystem accepts a 300-byte file name.
        let long_name = "A".repeat(300);
        let table = table(&config, &["SMITH J", &long_name]);
        let pipeline = ReportPipeline::builder().config(config).build().unwrap();

        let summary = pipeline.run(&table, None).unwrap();
        assert_eq!(summary.reports.len(), 1);
        assert_eq!(summary.reports[0].professor, "SMITH J");
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].professor, long_name);
        assert!(!summary.all_failed());
    }

    #[test]
    fn test_summary_all_failed() {
        let mut summary = RunSummary::default();
        assert!(!summary.all_failed());
        summary.failures.push(ProfessorFailure::new(
            "X",
            &ReportError::Compose("disk full".to_string()),
        ));
        assert!(summary.all_failed());
        assert_eq!(summary.failures[0].code, "COMPOSE_ERROR");
    }
}
