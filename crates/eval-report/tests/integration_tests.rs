//! Integration tests for the report pipeline.
//!
//! These tests run the full batch on a fixture export and inspect both the
//! recorded page text and the PDFs written to disk.

use eval_report::{
    ColumnMap, ComposedPage, ConfigValidationError, PageKind, ProfessorStats, ReportConfig,
    ReportError, ReportPipeline, RunSummary, load_table,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture() -> PathBuf {
    fixtures_path().join("evaluations.csv")
}

fn config(dir: &Path) -> ReportConfig {
    ReportConfig::builder()
        .scratch_dir(dir.join("temp"))
        .staging_dir(dir.join("output"))
        .destination_dir(dir.join("reports"))
        .logo_path(None)
        .build()
        .unwrap()
}

fn run_all(dir: &TempDir) -> RunSummary {
    ReportPipeline::builder()
        .config(config(dir.path()))
        .build()
        .unwrap()
        .run_file(fixture(), None)
        .unwrap()
}

fn entry_count(dir: &Path) -> usize {
    fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

fn page<'a>(summary: &'a RunSummary, professor: &str, kind: PageKind) -> &'a ComposedPage {
    summary
        .report_for(professor)
        .unwrap_or_else(|| panic!("no report for {}", professor))
        .document
        .pages_of(kind)
        .next()
        .unwrap_or_else(|| panic!("no {:?} page for {}", kind, professor))
}

// ============================================================================
// Full Run
// ============================================================================

#[test]
fn test_full_run_one_report_per_professor() {
    let dir = tempfile::tempdir().unwrap();
    let summary = run_all(&dir);

    assert!(summary.failures.is_empty(), "{:?}", summary.failures);
    assert_eq!(summary.reports.len(), 4);

    let names: BTreeSet<String> = fs::read_dir(dir.path().join("reports"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    let expected: BTreeSet<String> = [
        "report_DOE J.pdf",
        "report_DOE J_1.pdf",
        "report_POPESCU Ana.pdf",
        "report_SMITH J.pdf",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    assert_eq!(names, expected);

    for report in &summary.reports {
        let doc = lopdf::Document::load(&report.path).unwrap();
        assert_eq!(doc.get_pages().len(), report.page_count);
    }
}

#[test]
fn test_run_drains_scratch_and_staging() {
    let dir = tempfile::tempdir().unwrap();
    run_all(&dir);

    assert_eq!(entry_count(&dir.path().join("temp")), 0);
    assert_eq!(entry_count(&dir.path().join("output")), 0);
}

#[test]
fn test_page_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let summary = run_all(&dir);
    let report = summary.report_for("SMITH J").unwrap();

    let kinds: Vec<PageKind> = report
        .document
        .pages
        .iter()
        .filter(|p| !p.continued)
        .map(|p| p.kind)
        .collect();

    let mut expected = vec![
        PageKind::Title,
        PageKind::Specialization,
        PageKind::Years,
        PageKind::Courses,
        PageKind::Attendance,
        PageKind::Workload,
        PageKind::TeachingMethods,
    ];
    expected.extend((0..12).map(PageKind::Question));
    expected.extend((0..3).map(PageKind::Comments));
    assert_eq!(kinds, expected);
}

// ============================================================================
// Page Content
// ============================================================================

#[test]
fn test_specialization_percentages() {
    let dir = tempfile::tempdir().unwrap();
    let summary = run_all(&dir);
    let spec = page(&summary, "SMITH J", PageKind::Specialization);

    assert!(spec.contains("Total Students for Professor: 5"));
    assert!(spec.contains("Number of Different Specializations: 2"));
    assert!(spec.contains("• Finance: 3 students (60.0%)"));
    assert!(spec.contains("• Marketing: 2 students (40.0%)"));
}

#[test]
fn test_empty_question_has_no_responses_page() {
    let dir = tempfile::tempdir().unwrap();
    let summary = run_all(&dir);
    let q12 = page(&summary, "SMITH J", PageKind::Question(11));

    assert!(q12.contains("Question 12 - No Responses"));
    assert!(q12.contains("No responses found for this question."));
    assert!(q12.contains("Question: Overall rating of the laboratory sessions"));
}

#[test]
fn test_question_pareto_order() {
    let dir = tempfile::tempdir().unwrap();
    let summary = run_all(&dir);
    let q1 = page(&summary, "SMITH J", PageKind::Question(0));

    assert!(q1.contains("Question: The course objectives were clearly presented"));
    assert!(q1.contains("Average Score: 9.00/10"));

    let grades: Vec<&str> = q1
        .lines
        .iter()
        .filter(|l| l.starts_with("• Grade"))
        .map(String::as_str)
        .collect();
    assert_eq!(
        grades,
        vec![
            "• Grade 9: 3 students (60.0% of responses, 60.0% of total) - Cumulative: 60.0%",
            "• Grade 8: 1 students (20.0% of responses, 20.0% of total) - Cumulative: 80.0%",
            "• Grade 10: 1 students (20.0% of responses, 20.0% of total) - Cumulative: 100.0%",
        ]
    );
}

#[test]
fn test_question_counts_only_valid_grades() {
    let dir = tempfile::tempdir().unwrap();
    let summary = run_all(&dir);

    // "N/A" is not numeric
    let q2 = page(&summary, "SMITH J", PageKind::Question(1));
    assert!(q2.contains("Students who Responded: 4"));
    assert!(q2.contains("Students with No Response: 1"));
    assert!(q2.contains("Average Score: 8.25/10"));

    // 11 is numeric but not a grade: counted in the mean only
    let q3 = page(&summary, "SMITH J", PageKind::Question(2));
    assert!(q3.contains("Students who Responded: 4"));
    assert!(q3.contains("Average Score: 8.80/10"));
}

#[test]
fn test_category_pages() {
    let dir = tempfile::tempdir().unwrap();
    let summary = run_all(&dir);

    let years = page(&summary, "SMITH J", PageKind::Years);
    assert!(years.contains("• Anul 1: 3 students (60.0% of responses, 60.0% of total)"));
    assert!(years.contains("• Anul 2: 2 students (40.0% of responses, 40.0% of total)"));

    let courses = page(&summary, "SMITH J", PageKind::Courses);
    assert!(courses.contains("• Curs: 3 students (60.0% of responses, 60.0% of total)"));

    let attendance = page(&summary, "SMITH J", PageKind::Attendance);
    let items: Vec<&str> = attendance
        .lines
        .iter()
        .filter(|l| l.starts_with("• "))
        .map(String::as_str)
        .collect();
    assert_eq!(
        items,
        vec![
            "• 100%: 2 students (50.0% of responses, 40.0% of total)",
            "• 50%: 1 students (25.0% of responses, 20.0% of total)",
            "• 75%: 1 students (25.0% of responses, 20.0% of total)",
            "• No Response: 1 students (20.0% of total)",
        ]
    );

    let methods = page(&summary, "SMITH J", PageKind::TeachingMethods);
    assert!(methods.contains("• Predare CLASICĂ:"));
    assert!(methods.contains("Used by: 3 students (60.0%)"));
    assert!(methods.contains("Total Method Implementations: 6"));
}

#[test]
fn test_workload_scale_zero_filled() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let table = load_table(fixture(), &config).unwrap();
    let columns = ColumnMap::resolve(&table.column_names(), &config.layout).unwrap();
    let subset = table.subset("SMITH J").unwrap();
    let stats = ProfessorStats::compute(&table, &subset, &columns, &config).unwrap();

    let workload = stats.workload.unwrap();
    assert_eq!(
        workload.labels(),
        vec!["Foarte mic", "Mic", "Mediu", "Mare", "Foarte mare"]
    );
    assert_eq!(workload.counts(), vec![0, 2, 0, 3, 0]);
}

#[test]
fn test_comment_pages() {
    let dir = tempfile::tempdir().unwrap();
    let summary = run_all(&dir);

    let pros = page(&summary, "SMITH J", PageKind::Comments(0));
    assert!(pros.contains("Positive Aspects (Pros) - Student Comments:"));
    assert!(pros.contains("Students with Comments: 2"));
    assert!(pros.contains("Great, very clear explanations"));
    assert!(pros.contains("Comment Rate: 40.0%"));

    // a whitespace-only answer is not a comment
    let improvements = page(&summary, "SMITH J", PageKind::Comments(2));
    assert!(improvements.contains("Students with Comments: 1"));

    let none = page(&summary, "DOE J", PageKind::Comments(0));
    assert!(none.contains("No comments provided by students for this section."));

    let romanian = page(&summary, "POPESCU Ana", PageKind::Comments(0));
    assert!(romanian.contains("Foarte bună organizare"));
}

#[test]
fn test_title_page_completion_trend() {
    let dir = tempfile::tempdir().unwrap();
    let summary = run_all(&dir);
    let title = page(&summary, "SMITH J", PageKind::Title);

    assert!(title.contains("Performance Evaluation Report"));
    assert!(title.contains("Total Students who Completed the Form: 5"));
    assert!(title.contains("Peak completion day: 15 January (2 completions)"));
    assert!(title.contains("Average daily completions: 2"));
    assert!(title.contains("Total days with responses: 3"));
    assert!(title.contains("Data range: 15 January to 18 January"));
}

// ============================================================================
// Filtering, Collisions and Errors
// ============================================================================

#[test]
fn test_single_professor_filter() {
    let dir = tempfile::tempdir().unwrap();
    let summary = ReportPipeline::builder()
        .config(config(dir.path()))
        .build()
        .unwrap()
        .run_file(fixture(), Some("POPESCU Ana"))
        .unwrap();

    assert_eq!(summary.reports.len(), 1);
    assert_eq!(
        summary.reports[0].path,
        dir.path().join("reports").join("report_POPESCU Ana.pdf")
    );
}

#[test]
fn test_existing_destination_file_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let reports = dir.path().join("reports");
    fs::create_dir_all(&reports).unwrap();
    fs::write(reports.join("report_SMITH J.pdf"), b"previous run").unwrap();

    let summary = ReportPipeline::builder()
        .config(config(dir.path()))
        .build()
        .unwrap()
        .run_file(fixture(), Some("SMITH J"))
        .unwrap();

    assert_eq!(summary.reports[0].path, reports.join("report_SMITH J_1.pdf"));
    assert_eq!(fs::read(reports.join("report_SMITH J.pdf")).unwrap(), b"previous run");
}

#[test]
fn test_same_sanitized_names_share_destination_suffixes() {
    let dir = tempfile::tempdir().unwrap();
    let reports = dir.path().join("reports");
    fs::create_dir_all(&reports).unwrap();
    fs::write(reports.join("report_DOE J.pdf"), b"previous run").unwrap();

    let summary = run_all(&dir);

    let doe = summary.report_for("DOE J").unwrap();
    let doe_dotted = summary.report_for("DOE, J.").unwrap();
    assert_eq!(doe.path, reports.join("report_DOE J_1.pdf"));
    assert_eq!(doe_dotted.path, reports.join("report_DOE J_2.pdf"));
    assert!(!reports.join("report_DOE J_1_1.pdf").exists());
    assert_eq!(fs::read(reports.join("report_DOE J.pdf")).unwrap(), b"previous run");
}

#[test]
fn test_destination_inside_working_dirs_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let shared = dir.path().join("output");
    fs::create_dir_all(&shared).unwrap();
    fs::write(shared.join("keep_me.txt"), b"user file").unwrap();

    let as_staging = ReportConfig::builder()
        .base(config(dir.path()))
        .destination_dir(&shared)
        .build();
    assert!(matches!(
        as_staging,
        Err(ConfigValidationError::OverlappingDirs { .. })
    ));

    let as_scratch = ReportConfig::builder()
        .base(config(dir.path()))
        .destination_dir(dir.path().join("temp"))
        .build();
    assert!(matches!(
        as_scratch,
        Err(ConfigValidationError::OverlappingDirs { .. })
    ));

    assert_eq!(fs::read(shared.join("keep_me.txt")).unwrap(), b"user file");
}

#[test]
fn test_unknown_professor() {
    let dir = tempfile::tempdir().unwrap();
    let result = ReportPipeline::builder()
        .config(config(dir.path()))
        .build()
        .unwrap()
        .run_file(fixture(), Some("NOBODY"));

    assert!(matches!(result, Err(ReportError::UnknownProfessor(_))));
}

#[test]
fn test_unsupported_extension() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("responses.txt");
    fs::write(&input, "Level 2\nSMITH J\n").unwrap();

    let err = ReportPipeline::builder()
        .config(config(dir.path()))
        .build()
        .unwrap()
        .run_file(&input, None)
        .unwrap_err();
    assert_eq!(err.error_code(), "LOAD_ERROR");
}

#[test]
fn test_strict_layout_rejects_short_export() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("short.csv");
    fs::write(
        &input,
        "Specializare,Level 2,Level 3\n,,\nFinance,SMITH J,Curs-Anul 1\n",
    )
    .unwrap();

    let config = ReportConfig::builder()
        .base(config(dir.path()))
        .strict_layout(true)
        .build()
        .unwrap();
    let err = ReportPipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .run_file(&input, None)
        .unwrap_err();
    assert!(matches!(err, ReportError::ColumnNotFound(_)));
}

#[test]
fn test_short_export_skips_missing_topics() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("short.csv");
    fs::write(
        &input,
        "Specializare,Level 2,Level 3\n,,\nFinance,SMITH J,Curs-Anul 1\n",
    )
    .unwrap();

    let summary = ReportPipeline::builder()
        .config(config(dir.path()))
        .build()
        .unwrap()
        .run_file(&input, None)
        .unwrap();

    let kinds: Vec<PageKind> = summary.reports[0]
        .document
        .pages
        .iter()
        .map(|p| p.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            PageKind::Title,
            PageKind::Specialization,
            PageKind::Years,
            PageKind::Courses
        ]
    );
}

#[test]
fn test_progress_milestones() {
    let dir = tempfile::tempdir().unwrap();
    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = messages.clone();

    ReportPipeline::builder()
        .config(config(dir.path()))
        .on_progress(move |update| sink.lock().unwrap().push(update.message))
        .build()
        .unwrap()
        .run_file(fixture(), None)
        .unwrap();

    let messages = messages.lock().unwrap();
    assert!(messages.iter().any(|m| m == "File loaded: 9 responses"));
    assert!(messages.iter().any(|m| m == "Found 4 professors"));
    assert_eq!(
        messages
            .iter()
            .filter(|m| m.starts_with("Generating report for"))
            .count(),
        4
    );
    assert_eq!(messages.iter().filter(|m| m.starts_with("Moved ")).count(), 4);
}

#[test]
fn test_summary_serializes() {
    let dir = tempfile::tempdir().unwrap();
    let summary = run_all(&dir);
    let json: serde_json::Value = serde_json::to_value(&summary).unwrap();

    assert_eq!(json["reports"].as_array().unwrap().len(), 4);
    assert!(json["reports"][0].get("document").is_none());
    assert!(json["failures"].as_array().unwrap().is_empty());
}
