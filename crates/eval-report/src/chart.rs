//! Chart rendering.
//!
//! Every chart is rasterized with plotters' bitmap backend into the scratch
//! directory, under a name derived from the professor and the topic. The
//! drawing routines return `Box<dyn Error>` (plotters' error type is generic
//! over the backend); [`ChartRenderer`] maps failures to
//! [`ReportError::Render`] for the topic being drawn.

use crate::aggregate::{CategoryBreakdown, CompletionTrend, QuestionOutcome, QuestionStats, TeachingMethods};
use crate::error::{ReportError, Result};
use crate::output::sanitize_filename;
use chrono::Duration;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::f64::consts::PI;
use std::path::{Path, PathBuf};
use tracing::debug;

type DrawResult = std::result::Result<(), Box<dyn Error>>;

const FONT: &str = "sans-serif";

const PIE_SIZE: (u32, u32) = (900, 750);
const BAR_SIZE: (u32, u32) = (900, 750);
const PARETO_SIZE: (u32, u32) = (1050, 750);
const TREND_SIZE: (u32, u32) = (1050, 600);

const PALETTE: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

const METHOD_COLORS: [RGBColor; 4] = [
    RGBColor(76, 175, 80),
    RGBColor(33, 150, 243),
    RGBColor(255, 152, 0),
    RGBColor(156, 39, 176),
];

const SKY_BLUE: RGBColor = RGBColor(135, 206, 235);
const LIGHT_CORAL: RGBColor = RGBColor(240, 128, 128);
const LIGHT_BLUE: RGBColor = RGBColor(173, 216, 230);
const TREND_BLUE: RGBColor = RGBColor(46, 134, 193);

/// Shape of a rendered chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Pie,
    Bar,
    Pareto,
    Trend,
}

impl ChartKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Pie => "pie",
            Self::Bar => "bar",
            Self::Pareto => "pareto",
            Self::Trend => "trend",
        }
    }

    pub fn size(&self) -> (u32, u32) {
        match self {
            Self::Pie => PIE_SIZE,
            Self::Bar => BAR_SIZE,
            Self::Pareto => PARETO_SIZE,
            Self::Trend => TREND_SIZE,
        }
    }
}

/// The statistical theme a chart belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartTopic {
    Completion,
    Specialization,
    Years,
    Courses,
    Attendance,
    Workload,
    TeachingMethods,
    /// 1-based question number.
    Question(usize),
}

impl ChartTopic {
    pub fn kind(&self) -> ChartKind {
        match self {
            Self::Completion => ChartKind::Trend,
            Self::Specialization | Self::Years | Self::Courses => ChartKind::Pie,
            Self::Attendance | Self::Workload | Self::TeachingMethods => ChartKind::Bar,
            Self::Question(_) => ChartKind::Pareto,
        }
    }

    /// Short name used in artifact file names and warnings.
    pub fn slug(&self) -> String {
        match self {
            Self::Completion => "completion_trends".to_string(),
            Self::Specialization => "specialization".to_string(),
            Self::Years => "years".to_string(),
            Self::Courses => "courses".to_string(),
            Self::Attendance => "attendance".to_string(),
            Self::Workload => "workload".to_string(),
            Self::TeachingMethods => "teaching_methods".to_string(),
            Self::Question(n) => format!("question_{}", n),
        }
    }

    pub fn title(&self) -> String {
        match self {
            Self::Completion => "Daily Form Completion Trends".to_string(),
            Self::Specialization => "Student Specialization Distribution".to_string(),
            Self::Years => "Academic Year Distribution".to_string(),
            Self::Courses => "Courses Distribution".to_string(),
            Self::Attendance => "Student Attendance Rate Distribution".to_string(),
            Self::Workload => "Student Workload Distribution".to_string(),
            Self::TeachingMethods => "Teaching Methods Implementation".to_string(),
            Self::Question(n) => format!("Question {} - Grade Distribution (Pareto Analysis)", n),
        }
    }
}

/// A chart written to the scratch directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartArtifact {
    pub topic: ChartTopic,
    pub path: PathBuf,
}

/// Renders topic charts into a scratch directory.
#[derive(Debug, Clone)]
pub struct ChartRenderer {
    scratch_dir: PathBuf,
}

impl ChartRenderer {
    pub fn new(scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
        }
    }

    /// `<kind>_<sanitized professor>_<topic>.png` inside the scratch directory.
    pub fn artifact_path(&self, professor: &str, topic: ChartTopic) -> PathBuf {
        self.scratch_dir.join(format!(
            "{}_{}_{}.png",
            topic.kind().prefix(),
            sanitize_filename(professor),
            topic.slug()
        ))
    }

    /// Pie (specialization, years, courses) or bar (attendance, workload)
    /// chart of a categorical breakdown. `Ok(None)` when there is no data.
    pub fn render_breakdown(
        &self,
        professor: &str,
        topic: ChartTopic,
        breakdown: &CategoryBreakdown,
    ) -> Result<Option<ChartArtifact>> {
        if !breakdown.has_responses() || breakdown.entries.is_empty() {
            return Ok(None);
        }
        let labels = breakdown.labels();
        let counts = breakdown.counts();

        self.render(professor, topic, |path| match topic.kind() {
            ChartKind::Pie => draw_pie(path, &topic.title(), &labels, &counts),
            _ => {
                let (x_desc, color) = match topic {
                    ChartTopic::Workload => ("Workload Level", LIGHT_CORAL),
                    _ => ("Attendance Rate", SKY_BLUE),
                };
                let bar_labels: Vec<String> = counts.iter().map(|c| c.to_string()).collect();
                draw_bars(
                    path,
                    &BarSpec {
                        title: &topic.title(),
                        x_desc,
                        y_desc: "Number of Students",
                        labels: &labels,
                        counts: &counts,
                        value_labels: &bar_labels,
                        colors: &[color],
                    },
                )
            }
        })
    }

    /// Bar chart of teaching-method usage, labelled with counts and shares.
    pub fn render_teaching_methods(
        &self,
        professor: &str,
        methods: &TeachingMethods,
    ) -> Result<Option<ChartArtifact>> {
        if methods.methods.is_empty() {
            return Ok(None);
        }
        let labels: Vec<String> = methods.methods.iter().map(|m| m.label.clone()).collect();
        let counts: Vec<usize> = methods.methods.iter().map(|m| m.count).collect();
        let value_labels: Vec<String> = counts
            .iter()
            .map(|&c| format!("{} ({:.1}%)", c, methods.percent(c)))
            .collect();
        let topic = ChartTopic::TeachingMethods;

        self.render(professor, topic, |path| {
            draw_bars(
                path,
                &BarSpec {
                    title: &topic.title(),
                    x_desc: "Teaching Method",
                    y_desc: "Number of Students Reporting Method",
                    labels: &labels,
                    counts: &counts,
                    value_labels: &value_labels,
                    colors: &METHOD_COLORS,
                },
            )
        })
    }

    /// Pareto chart of a question's grade distribution.
    pub fn render_question(
        &self,
        professor: &str,
        question: &QuestionStats,
    ) -> Result<Option<ChartArtifact>> {
        let QuestionOutcome::Distribution(distribution) = &question.outcome else {
            return Ok(None);
        };
        let labels: Vec<String> = distribution.grades.iter().map(|g| g.grade.to_string()).collect();
        let counts: Vec<usize> = distribution.grades.iter().map(|g| g.count).collect();
        let cumulative: Vec<f64> = distribution
            .grades
            .iter()
            .map(|g| g.cumulative_percent)
            .collect();
        let topic = ChartTopic::Question(question.number);

        self.render(professor, topic, |path| {
            draw_pareto(path, &topic.title(), &labels, &counts, &cumulative)
        })
    }

    /// Line chart of daily completions.
    pub fn render_trend(
        &self,
        professor: &str,
        trend: &CompletionTrend,
    ) -> Result<Option<ChartArtifact>> {
        let topic = ChartTopic::Completion;
        self.render(professor, topic, |path| draw_trend(path, &topic.title(), trend))
    }

    fn render<F>(&self, professor: &str, topic: ChartTopic, draw: F) -> Result<Option<ChartArtifact>>
    where
        F: FnOnce(&Path) -> DrawResult,
    {
        std::fs::create_dir_all(&self.scratch_dir)
            .map_err(|e| ReportError::render(topic.slug(), e))?;
        let path = self.artifact_path(professor, topic);
        draw(&path).map_err(|e| ReportError::render(topic.slug(), e))?;
        if !path.is_file() {
            return Err(ReportError::render(topic.slug(), "no image was written"));
        }
        debug!("Rendered {} chart at {}", topic.slug(), path.display());
        Ok(Some(ChartArtifact { topic, path }))
    }
}

struct BarSpec<'a> {
    title: &'a str,
    x_desc: &'a str,
    y_desc: &'a str,
    labels: &'a [String],
    counts: &'a [usize],
    value_labels: &'a [String],
    /// Cycled per bar.
    colors: &'a [RGBColor],
}

/// Label of the category at integral position `x`, blank between categories.
fn category_label(labels: &[String], x: f64) -> String {
    let index = x.round();
    if (x - index).abs() > 1e-6 || index < 0.0 {
        return String::new();
    }
    labels.get(index as usize).cloned().unwrap_or_default()
}

fn count_axis_top(counts: &[usize]) -> f64 {
    let max = counts.iter().copied().max().unwrap_or(0).max(1) as f64;
    (max * 1.2).ceil() + 1.0
}

fn value_label_style(size: u32) -> TextStyle<'static> {
    TextStyle::from((FONT, size).into_font()).pos(Pos::new(HPos::Center, VPos::Bottom))
}

fn draw_pie(path: &Path, title: &str, labels: &[String], counts: &[usize]) -> DrawResult {
    let root = BitMapBackend::new(path, PIE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let area = root.titled(title, (FONT, 30).into_font())?;

    let (width, height) = area.dim_in_pixel();
    let center = (width as f64 / 2.0, height as f64 / 2.0);
    let radius = (width.min(height) as f64 / 2.0) * 0.72;
    let total: usize = counts.iter().sum();

    let label_style = TextStyle::from((FONT, 20).into_font()).pos(Pos::new(HPos::Center, VPos::Center));
    let pct_style = TextStyle::from((FONT, 18).into_font())
        .color(&WHITE)
        .pos(Pos::new(HPos::Center, VPos::Center));

    // counter-clockwise from twelve o'clock
    let mut start = PI / 2.0;
    for (index, (label, &count)) in labels.iter().zip(counts).enumerate() {
        if count == 0 {
            continue;
        }
        let fraction = count as f64 / total as f64;
        let sweep = fraction * 2.0 * PI;
        let steps = ((fraction * 180.0).ceil() as usize).max(2);

        let mut points = vec![(center.0 as i32, center.1 as i32)];
        for step in 0..=steps {
            let angle = start + sweep * step as f64 / steps as f64;
            points.push(polar(center, radius, angle));
        }
        let color = PALETTE[index % PALETTE.len()];
        area.draw(&Polygon::new(points, color.filled()))?;

        let middle = start + sweep / 2.0;
        area.draw(&Text::new(label.clone(), polar(center, radius * 1.15, middle), label_style.clone()))?;
        area.draw(&Text::new(
            format!("{:.1}%", fraction * 100.0),
            polar(center, radius * 0.6, middle),
            pct_style.clone(),
        ))?;
        start += sweep;
    }

    root.present()?;
    Ok(())
}

fn polar(center: (f64, f64), radius: f64, angle: f64) -> (i32, i32) {
    (
        (center.0 + radius * angle.cos()).round() as i32,
        (center.1 - radius * angle.sin()).round() as i32,
    )
}

fn draw_bars(path: &Path, spec: &BarSpec<'_>) -> DrawResult {
    let root = BitMapBackend::new(path, BAR_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let n = spec.counts.len();
    let mut chart = ChartBuilder::on(&root)
        .caption(spec.title, (FONT, 30).into_font())
        .margin(20)
        .x_label_area_size(70)
        .y_label_area_size(70)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), 0f64..count_axis_top(spec.counts))?;

    let x_formatter = |x: &f64| category_label(spec.labels, *x);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&x_formatter)
        .y_label_formatter(&|y: &f64| format!("{:.0}", y))
        .x_desc(spec.x_desc)
        .y_desc(spec.y_desc)
        .label_style((FONT, 16))
        .draw()?;

    chart.draw_series(spec.counts.iter().enumerate().map(|(i, &count)| {
        let x = i as f64;
        let color = spec.colors[i % spec.colors.len()];
        Rectangle::new([(x - 0.35, 0.0), (x + 0.35, count as f64)], color.filled())
    }))?;
    chart.draw_series(spec.counts.iter().enumerate().map(|(i, &count)| {
        Rectangle::new(
            [(i as f64 - 0.35, 0.0), (i as f64 + 0.35, count as f64)],
            BLACK.stroke_width(1),
        )
    }))?;
    chart.draw_series(spec.counts.iter().zip(spec.value_labels).enumerate().map(
        |(i, (&count, text))| Text::new(text.clone(), (i as f64, count as f64), value_label_style(18)),
    ))?;

    root.present()?;
    Ok(())
}

fn draw_pareto(
    path: &Path,
    title: &str,
    labels: &[String],
    counts: &[usize],
    cumulative: &[f64],
) -> DrawResult {
    let root = BitMapBackend::new(path, PARETO_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let n = counts.len();
    let x_range = -0.5f64..(n as f64 - 0.5);
    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT, 28).into_font())
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .right_y_label_area_size(70)
        .build_cartesian_2d(x_range.clone(), 0f64..count_axis_top(counts))?
        .set_secondary_coord(x_range, 0f64..110f64);

    let x_formatter = |x: &f64| category_label(labels, *x);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&x_formatter)
        .y_label_formatter(&|y: &f64| format!("{:.0}", y))
        .x_desc("Grade (1-10)")
        .y_desc("Number of Students")
        .label_style((FONT, 16))
        .draw()?;
    chart
        .configure_secondary_axes()
        .y_desc("Cumulative Percentage (%)")
        .y_label_formatter(&|y: &f64| format!("{:.0}", y))
        .label_style((FONT, 16))
        .draw()?;

    chart.draw_series(counts.iter().enumerate().map(|(i, &count)| {
        let x = i as f64;
        Rectangle::new([(x - 0.4, 0.0), (x + 0.4, count as f64)], LIGHT_BLUE.filled())
    }))?;
    chart.draw_series(
        counts
            .iter()
            .enumerate()
            .map(|(i, &count)| Text::new(count.to_string(), (i as f64, count as f64), value_label_style(18))),
    )?;

    let points: Vec<(f64, f64)> = cumulative
        .iter()
        .enumerate()
        .map(|(i, &pct)| (i as f64, pct))
        .collect();
    chart.draw_secondary_series(LineSeries::new(points.clone(), RED.stroke_width(3)))?;
    chart.draw_secondary_series(points.iter().map(|&p| Circle::new(p, 6, RED.filled())))?;
    chart.draw_secondary_series(points.iter().map(|&(x, pct)| {
        Text::new(
            format!("{:.1}%", pct),
            (x, pct + 2.0),
            value_label_style(16).color(&RED),
        )
    }))?;

    root.present()?;
    Ok(())
}

fn draw_trend(path: &Path, title: &str, trend: &CompletionTrend) -> DrawResult {
    let root = BitMapBackend::new(path, TREND_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let first = trend.first_date();
    let span = (trend.last_date() - first).num_days();
    let counts: Vec<usize> = trend.days().iter().map(|d| d.count).collect();

    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT, 30).into_font())
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d(-1i64..span + 1, 0f64..count_axis_top(&counts))?;

    let x_formatter = |d: &i64| (first + Duration::days(*d)).format("%d %b").to_string();
    chart
        .configure_mesh()
        .x_labels(((span + 3) as usize).min(16))
        .x_label_formatter(&x_formatter)
        .y_label_formatter(&|y: &f64| format!("{:.0}", y))
        .x_desc("Date")
        .y_desc("Number of Completions")
        .label_style((FONT, 16))
        .draw()?;

    let points: Vec<(i64, f64)> = trend
        .days()
        .iter()
        .map(|d| ((d.date - first).num_days(), d.count as f64))
        .collect();
    chart.draw_series(LineSeries::new(points.clone(), TREND_BLUE.stroke_width(3)))?;
    chart.draw_series(points.iter().map(|&p| Circle::new(p, 6, TREND_BLUE.filled())))?;
    chart.draw_series(points.iter().map(|&(x, y)| {
        Text::new(format!("{}", y as usize), (x, y + 0.05), value_label_style(16))
    }))?;

    root.present()?;
    Ok(())
}
