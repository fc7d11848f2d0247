//! Report composition.
//!
//! A report is a fixed sequence of pages planned from the professor's
//! statistics (see [`plan_pages`]). Each page has a text block at the top and,
//! where the topic has data, a chart fitted into the space below. Chart
//! failures are isolated per topic: the page gets a placeholder and the
//! failure becomes a warning on the [`ComposedReport`].

use super::pdf::{PAGE_WIDTH, PdfCanvas};
use super::text::{fit_image, truncate, wrap_text};
use crate::aggregate::{
    CategoryBreakdown, CommentSection, CompletionStatus, ProfessorStats, QuestionOutcome,
    QuestionStats, TeachingMethods,
};
use crate::chart::{ChartArtifact, ChartRenderer, ChartTopic};
use crate::config::ReportConfig;
use crate::error::{ReportError, Result};
use crate::utils::percentage;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const MARGIN: f32 = 50.0;
const INDENT: f32 = 70.0;
const SUB_INDENT: f32 = 90.0;

const TITLE_Y: f32 = 750.0;
const PROFESSOR_Y: f32 = 720.0;

/// Breakdown lists stop before this baseline to leave room for the chart.
const LIST_FLOOR: f32 = 320.0;
const QUESTION_LIST_FLOOR: f32 = 340.0;

const CHART_BOTTOM: f32 = 50.0;
const CHART_MAX_WIDTH: f32 = 400.0;

const COMMENTS_START_Y: f32 = 570.0;
const CONTINUED_START_Y: f32 = 670.0;
const COMMENTS_FLOOR: f32 = 80.0;
const COMMENT_LINE_HEIGHT: f32 = 12.0;

const BULLET_BLUE: (f32, f32, f32) = (0.2, 0.4, 0.8);
const GRAY: (f32, f32, f32) = (0.5, 0.5, 0.5);

/// One page of the report plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "page", content = "index", rename_all = "snake_case")]
pub enum PageKind {
    Title,
    Specialization,
    Years,
    Courses,
    Attendance,
    Workload,
    TeachingMethods,
    /// Index into [`ProfessorStats::questions`].
    Question(usize),
    /// Index into [`ProfessorStats::comments`].
    Comments(usize),
}

/// Ordered pages for one professor.
///
/// Title and specialization pages are always present. Year and course pages
/// need at least one parsed answer; attendance and workload pages need the
/// column and at least one answer; the teaching-methods page needs at least
/// one method column. Every question and comment column gets its own page.
pub fn plan_pages(stats: &ProfessorStats) -> Vec<PageKind> {
    let mut pages = vec![PageKind::Title, PageKind::Specialization];

    if stats.years.has_responses() {
        pages.push(PageKind::Years);
    }
    if stats.courses.has_responses() {
        pages.push(PageKind::Courses);
    }
    if stats.attendance.as_ref().is_some_and(|b| b.has_responses()) {
        pages.push(PageKind::Attendance);
    }
    if stats.workload.as_ref().is_some_and(|b| b.has_responses()) {
        pages.push(PageKind::Workload);
    }
    if stats.teaching_methods.is_some() {
        pages.push(PageKind::TeachingMethods);
    }
    pages.extend((0..stats.questions.len()).map(PageKind::Question));
    pages.extend((0..stats.comments.len()).map(PageKind::Comments));
    pages
}

/// A written page and the text drawn on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposedPage {
    pub kind: PageKind,
    /// Overflow page of a comment section.
    pub continued: bool,
    pub lines: Vec<String>,
}

impl ComposedPage {
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|line| line.contains(needle))
    }
}

/// Result of composing one professor's document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposedReport {
    pub professor: String,
    pub path: PathBuf,
    pub pages: Vec<ComposedPage>,
    pub charts: Vec<ChartArtifact>,
    /// Charts that could not be drawn or embedded.
    pub warnings: Vec<String>,
}

impl ComposedReport {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Pages of `kind`, continuation pages included.
    pub fn pages_of(&self, kind: PageKind) -> impl Iterator<Item = &ComposedPage> {
        self.pages.iter().filter(move |p| p.kind == kind)
    }

    /// Every line of text in page order.
    pub fn text(&self) -> Vec<&str> {
        self.pages
            .iter()
            .flat_map(|p| p.lines.iter().map(String::as_str))
            .collect()
    }
}

/// Lays out report pages and writes the PDF.
pub struct DocumentComposer<'a> {
    config: &'a ReportConfig,
    renderer: &'a ChartRenderer,
}

impl<'a> DocumentComposer<'a> {
    pub fn new(config: &'a ReportConfig, renderer: &'a ChartRenderer) -> Self {
        Self { config, renderer }
    }

    /// Compose the full report for `stats` and write it to `output`.
    pub fn compose(&self, stats: &ProfessorStats, output: &Path) -> Result<ComposedReport> {
        let plan = plan_pages(stats);
        debug!("Planned {} pages for '{}'", plan.len(), stats.professor);

        let mut session = Session {
            config: self.config,
            renderer: self.renderer,
            stats,
            canvas: PdfCanvas::new(),
            kinds: Vec::new(),
            charts: Vec::new(),
            warnings: Vec::new(),
        };

        for kind in plan {
            session.start_page(kind, false)?;
            match kind {
                PageKind::Title => session.title_page()?,
                PageKind::Specialization => session.specialization_page()?,
                PageKind::Years => session.breakdown_page(kind, &stats.years)?,
                PageKind::Courses => session.breakdown_page(kind, &stats.courses)?,
                PageKind::Attendance | PageKind::Workload => {
                    let breakdown = match kind {
                        PageKind::Attendance => stats.attendance.as_ref(),
                        _ => stats.workload.as_ref(),
                    };
                    if let Some(breakdown) = breakdown {
                        session.breakdown_page(kind, breakdown)?;
                    }
                }
                PageKind::TeachingMethods => {
                    if let Some(methods) = &stats.teaching_methods {
                        session.teaching_methods_page(methods)?;
                    }
                }
                PageKind::Question(index) => session.question_page(&stats.questions[index])?,
                PageKind::Comments(index) => {
                    session.comments_page(kind, &stats.comments[index])?
                }
            }
        }

        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let Session {
            canvas,
            kinds,
            charts,
            warnings,
            ..
        } = session;
        let title = format!("Performance Evaluation Report - {}", stats.professor);
        let texts = canvas.save(output, &title)?;

        let pages = kinds
            .into_iter()
            .zip(texts)
            .map(|((kind, continued), lines)| ComposedPage {
                kind,
                continued,
                lines,
            })
            .collect::<Vec<_>>();

        info!(
            "Wrote {} ({} pages, {} charts)",
            output.display(),
            pages.len(),
            charts.len()
        );
        Ok(ComposedReport {
            professor: stats.professor.clone(),
            path: output.to_path_buf(),
            pages,
            charts,
            warnings,
        })
    }
}

/// Mutable state while one document is being laid out.
struct Session<'a> {
    config: &'a ReportConfig,
    renderer: &'a ChartRenderer,
    stats: &'a ProfessorStats,
    canvas: PdfCanvas,
    kinds: Vec<(PageKind, bool)>,
    charts: Vec<ChartArtifact>,
    warnings: Vec<String>,
}

impl Session<'_> {
    fn start_page(&mut self, kind: PageKind, continued: bool) -> Result<()> {
        if !self.kinds.is_empty() {
            self.canvas.show_page()?;
        }
        self.kinds.push((kind, continued));
        Ok(())
    }

    fn text(&mut self, size: f32, x: f32, y: f32, text: &str) {
        self.canvas.set_font_size(size);
        self.canvas.draw_string(x, y, text);
    }

    fn header(&mut self, title: &str, title_size: f32) {
        self.text(title_size, MARGIN, TITLE_Y, title);
        let professor = format!("Professor: {}", self.stats.professor);
        self.text(16.0, MARGIN, PROFESSOR_Y, &professor);
    }

    fn total_line(&self) -> String {
        format!("Total Students for Professor: {}", self.stats.total)
    }

    /// Render a chart and place it, or note why it is missing.
    fn place_chart(
        &mut self,
        topic: ChartTopic,
        rendered: Result<Option<ChartArtifact>>,
        area: ChartArea,
    ) -> Result<()> {
        let artifact = match rendered {
            Ok(Some(artifact)) => artifact,
            Ok(None) => return Ok(()),
            Err(e @ ReportError::Render { .. }) => {
                self.chart_unavailable(topic, &e, area);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let (pixel_width, pixel_height) =
            image::image_dimensions(&artifact.path).unwrap_or(topic.kind().size());
        let (width, height) = fit_image(pixel_width, pixel_height, area.max_width, area.max_height);
        let x = area.x.unwrap_or((PAGE_WIDTH - width) / 2.0);

        match self.canvas.draw_image(&artifact.path, x, area.y, width, height) {
            Ok(()) => self.charts.push(artifact),
            Err(e) => self.chart_unavailable(topic, &e, area),
        }
        Ok(())
    }

    fn chart_unavailable(&mut self, topic: ChartTopic, error: &ReportError, area: ChartArea) {
        warn!(
            "Chart '{}' skipped for '{}': {}",
            topic.slug(),
            self.stats.professor,
            error
        );
        self.warnings.push(error.to_string());
        self.canvas.set_fill_rgb(GRAY.0, GRAY.1, GRAY.2);
        let x = area.x.unwrap_or(PAGE_WIDTH / 2.0 - 50.0);
        self.text(12.0, x, area.y + area.max_height / 2.0, "Chart unavailable");
        self.canvas.reset_fill();
    }

    fn title_page(&mut self) -> Result<()> {
        let stats = self.stats;
        if let Some(logo) = self.config.logo_path.as_deref().filter(|p| p.is_file()) {
            match image::image_dimensions(logo) {
                Ok((w, h)) => {
                    let (width, height) = fit_image(w, h, 300.0, 120.0);
                    let x = (PAGE_WIDTH - width) / 2.0;
                    if let Err(e) = self.canvas.draw_image(logo, x, 650.0, width, height) {
                        warn!("Logo {} not embedded: {}", logo.display(), e);
                    }
                }
                Err(e) => warn!("Logo {} not readable: {}", logo.display(), e),
            }
        }

        self.text(24.0, MARGIN, 600.0, "Performance Evaluation Report");
        let professor = format!("Professor: {}", self.stats.professor);
        self.text(20.0, MARGIN, 570.0, &professor);
        let completed = format!(
            "Total Students who Completed the Form: {}",
            self.stats.total
        );
        self.text(14.0, MARGIN, 530.0, &completed);

        match &stats.completion {
            CompletionStatus::Trend(trend) => {
                let rendered = self.renderer.render_trend(&stats.professor, trend);
                self.place_chart(
                    ChartTopic::Completion,
                    rendered,
                    ChartArea {
                        x: Some(MARGIN),
                        y: 200.0,
                        max_width: 500.0,
                        max_height: 300.0,
                    },
                )?;
                let mut y = 180.0;
                for line in trend.summary_lines() {
                    self.text(10.0, MARGIN, y, &line);
                    y -= 15.0;
                }
            }
            status => {
                if let Some(message) = status.message() {
                    self.text(12.0, MARGIN, 400.0, &message);
                }
            }
        }

        let generated = format!(
            "Generated on: {}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        self.text(8.0, MARGIN, 50.0, &generated);
        Ok(())
    }

    fn specialization_page(&mut self) -> Result<()> {
        let stats = self.stats;
        let breakdown = &stats.specialization;
        self.header("Student Specializations", 26.0);

        let lines = [
            self.total_line(),
            format!("Specialization Responses: {}", breakdown.responses),
            format!(
                "Number of Different Specializations: {}",
                breakdown.entries.len()
            ),
        ];
        let mut y = 690.0;
        for line in &lines {
            self.text(12.0, MARGIN, y, line);
            y -= 20.0;
        }

        self.text(14.0, MARGIN, 610.0, "Specialization Breakdown:");
        if !breakdown.has_responses() {
            self.text(
                10.0,
                INDENT,
                590.0,
                "No specialization data available for this professor.",
            );
            return Ok(());
        }

        let items: Vec<String> = breakdown
            .entries
            .iter()
            .map(|e| {
                format!(
                    "• {}: {} students ({:.1}%)",
                    e.label,
                    e.count,
                    breakdown.percent_of_responses(e.count)
                )
            })
            .collect();
        self.bullet_list(&items, 590.0, LIST_FLOOR);

        let rendered = self.renderer.render_breakdown(
            &stats.professor,
            ChartTopic::Specialization,
            breakdown,
        );
        self.place_chart(ChartTopic::Specialization, rendered, ChartArea::below(LIST_FLOOR))
    }

    fn breakdown_page(&mut self, kind: PageKind, breakdown: &CategoryBreakdown) -> Result<()> {
        let (title, noun, heading, topic) = match kind {
            PageKind::Years => (
                "Academic Years",
                "Year",
                "Academic Year Breakdown:",
                ChartTopic::Years,
            ),
            PageKind::Courses => ("Courses", "Course", "Courses Breakdown:", ChartTopic::Courses),
            PageKind::Attendance => (
                "Student Attendance",
                "Attendance",
                "Attendance Rate Breakdown:",
                ChartTopic::Attendance,
            ),
            _ => (
                "Student Workload",
                "Workload",
                "Workload Level Breakdown:",
                ChartTopic::Workload,
            ),
        };
        self.header(title, 26.0);

        let lines = [
            self.total_line(),
            format!("{} Responses: {}", noun, breakdown.responses),
            format!("Students with No Response: {}", breakdown.no_response()),
            format!("Response Rate: {:.1}%", breakdown.response_rate()),
        ];
        let mut y = 690.0;
        for line in &lines {
            self.text(12.0, MARGIN, y, line);
            y -= 20.0;
        }
        self.text(14.0, MARGIN, 600.0, heading);

        let items: Vec<String> = breakdown
            .entries
            .iter()
            .map(|e| {
                format!(
                    "• {}: {} students ({:.1}% of responses, {:.1}% of total)",
                    e.label,
                    e.count,
                    breakdown.percent_of_responses(e.count),
                    breakdown.percent_of_total(e.count)
                )
            })
            .collect();
        let y = self.bullet_list(&items, 580.0, LIST_FLOOR);

        let missing = breakdown.no_response();
        if missing > 0 {
            let line = format!(
                "• No Response: {} students ({:.1}% of total)",
                missing,
                percentage(missing, breakdown.total)
            );
            self.text(10.0, INDENT, y, &line);
        }

        let rendered = self
            .renderer
            .render_breakdown(&self.stats.professor, topic, breakdown);
        self.place_chart(topic, rendered, ChartArea::below(LIST_FLOOR))
    }

    fn teaching_methods_page(&mut self, methods: &TeachingMethods) -> Result<()> {
        self.header("Teaching Methods", 26.0);

        let lines = [
            self.total_line(),
            format!(
                "Number of Teaching Methods Analyzed: {}",
                methods.analyzed()
            ),
            format!("Total Method Implementations: {}", methods.implementations()),
        ];
        let mut y = 690.0;
        for line in &lines {
            self.text(12.0, MARGIN, y, line);
            y -= 20.0;
        }
        self.text(14.0, MARGIN, 620.0, "Teaching Methods Breakdown:");

        let mut y = 600.0;
        for method in &methods.methods {
            self.text(10.0, INDENT, y, &format!("• {}:", method.label));
            y -= 12.0;
            let usage = format!(
                "Used by: {} students ({:.1}%)",
                method.count,
                methods.percent(method.count)
            );
            self.text(10.0, SUB_INDENT, y, &usage);
            y -= 18.0;
            if y < LIST_FLOOR {
                break;
            }
        }

        let rendered = self
            .renderer
            .render_teaching_methods(&self.stats.professor, methods);
        self.place_chart(ChartTopic::TeachingMethods, rendered, ChartArea::below(LIST_FLOOR))
    }

    fn question_page(&mut self, question: &QuestionStats) -> Result<()> {
        let number = question.number;
        let text = format!(
            "Question: {}",
            truncate(&question.text, self.config.question_text_limit)
        );

        let distribution = match &question.outcome {
            QuestionOutcome::Distribution(distribution) => distribution,
            outcome => {
                let (suffix, message) = match outcome {
                    QuestionOutcome::NoResponses => {
                        ("No Responses", "No responses found for this question.")
                    }
                    QuestionOutcome::NoValidData => (
                        "No Valid Data",
                        "No valid numeric responses found for this question.",
                    ),
                    _ => ("No Valid Grades", "No valid grades found for this question."),
                };
                self.header(&format!("Question {} - {}", number, suffix), 24.0);
                self.text(11.0, MARGIN, 690.0, &text);
                let total = self.total_line();
                self.text(12.0, MARGIN, 670.0, &total);
                self.text(12.0, MARGIN, 640.0, message);
                return Ok(());
            }
        };

        self.header(
            &format!("Question {} - Grade Distribution Analysis", number),
            24.0,
        );
        self.text(11.0, MARGIN, 690.0, &text);

        let lines = [
            self.total_line(),
            format!("Students who Responded: {}", question.responses()),
            format!("Students with No Response: {}", question.no_response()),
            format!(
                "Response Rate: {:.1}%",
                percentage(question.responses(), question.total)
            ),
            format!("Average Score: {:.2}/10", distribution.mean),
        ];
        let mut y = 660.0;
        for line in &lines {
            self.text(12.0, MARGIN, y, line);
            y -= 20.0;
        }
        self.text(14.0, MARGIN, 550.0, "Grade Distribution (Pareto Order):");

        let items: Vec<String> = distribution
            .grades
            .iter()
            .map(|g| {
                format!(
                    "• Grade {}: {} students ({:.1}% of responses, {:.1}% of total) - Cumulative: {:.1}%",
                    g.grade,
                    g.count,
                    percentage(g.count, distribution.responses),
                    percentage(g.count, question.total),
                    g.cumulative_percent
                )
            })
            .collect();
        self.bullet_list(&items, 530.0, QUESTION_LIST_FLOOR);

        let topic = ChartTopic::Question(number);
        let rendered = self.renderer.render_question(&self.stats.professor, question);
        self.place_chart(topic, rendered, ChartArea::below(QUESTION_LIST_FLOOR))
    }

    fn comments_page(&mut self, kind: PageKind, section: &CommentSection) -> Result<()> {
        self.header(&section.title, 26.0);

        let lines = [
            self.total_line(),
            format!("Students with Comments: {}", section.comments.len()),
            format!("Students with No Comments: {}", section.without_comment()),
            format!("Comment Rate: {:.1}%", section.comment_rate()),
        ];
        let mut y = 690.0;
        for line in &lines {
            self.text(12.0, MARGIN, y, line);
            y -= 20.0;
        }
        self.text(
            14.0,
            MARGIN,
            600.0,
            &format!("{} - Student Comments:", section.title),
        );

        if section.comments.is_empty() {
            self.canvas.set_fill_rgb(GRAY.0, GRAY.1, GRAY.2);
            self.text(
                12.0,
                INDENT,
                COMMENTS_START_Y,
                "No comments provided by students for this section.",
            );
            self.canvas.reset_fill();
            return Ok(());
        }

        let mut y = COMMENTS_START_Y;
        let mut page_top = COMMENTS_START_Y;
        for comment in &section.comments {
            let wrapped = wrap_text(comment, self.config.comment_wrap_width);
            let needed = (wrapped.len() + 2) as f32 * COMMENT_LINE_HEIGHT;
            if y - needed < COMMENTS_FLOOR && y < page_top {
                y = self.continue_comments(kind, section)?;
                page_top = y;
            }

            self.canvas
                .set_fill_rgb(BULLET_BLUE.0, BULLET_BLUE.1, BULLET_BLUE.2);
            self.text(14.0, MARGIN, y, "•");
            self.canvas.reset_fill();

            for line in &wrapped {
                if y < COMMENTS_FLOOR {
                    y = self.continue_comments(kind, section)?;
                    page_top = y;
                }
                self.text(10.0, INDENT, y, line);
                y -= COMMENT_LINE_HEIGHT;
            }
            y -= 15.0;
        }
        Ok(())
    }

    /// Open a continuation page for a comment section and return the first
    /// free baseline.
    fn continue_comments(&mut self, kind: PageKind, section: &CommentSection) -> Result<f32> {
        self.start_page(kind, true)?;
        self.header(&format!("{} (continued)", section.title), 26.0);
        let total = self.total_line();
        self.text(12.0, MARGIN, 690.0, &total);
        Ok(CONTINUED_START_Y)
    }

    /// Draw bullet lines from `start` down, 15pt apart, stopping once the
    /// baseline drops below `floor`. Returns the next free baseline.
    fn bullet_list(&mut self, items: &[String], start: f32, floor: f32) -> f32 {
        let mut y = start;
        for item in items {
            self.text(10.0, INDENT, y, item);
            y -= 15.0;
            if y < floor {
                break;
            }
        }
        y
    }
}

/// Box a chart is fitted into. `x: None` centres it horizontally.
#[derive(Debug, Clone, Copy)]
struct ChartArea {
    x: Option<f32>,
    y: f32,
    max_width: f32,
    max_height: f32,
}

impl ChartArea {
    /// Centred box between the page bottom margin and a text floor.
    fn below(floor: f32) -> Self {
        Self {
            x: None,
            y: CHART_BOTTOM,
            max_width: CHART_MAX_WIDTH,
            max_height: floor - 10.0 - CHART_BOTTOM,
        }
    }
}
