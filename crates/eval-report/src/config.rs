//! Configuration types for the report generator.
//!
//! The spreadsheet layout is a positional contract: two named anchor columns
//! and fixed offsets from them. [`ColumnLayout`] spells that contract out so a
//! drifting export schema is visible in one place instead of being buried in
//! index arithmetic. Everything else (labels, scales, directories, wrapping)
//! lives in [`ReportConfig`], built with the fluent [`ReportConfigBuilder`].

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Default Romanian workload scale, ascending.
pub const DEFAULT_WORKLOAD_SCALE: [&str; 5] = ["Foarte mic", "Mic", "Mediu", "Mare", "Foarte mare"];

/// Default labels for the four teaching-method indicator columns, in column order.
pub const DEFAULT_TEACHING_METHODS: [&str; 4] = [
    "Predare CLASICĂ",
    "Predare online SINCRONĂ",
    "Predare online ASINCRONĂ",
    "Predare MIXTĂ",
];

/// Default titles for the three free-text comment columns, in column order.
pub const DEFAULT_COMMENT_SECTIONS: [&str; 3] = [
    "Positive Aspects (Pros)",
    "Negative Aspects (Cons)",
    "Areas of Improvement",
];

/// How to treat a course/year cell containing more than one year segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum YearMatch {
    /// The first year-like segment is the year; later ones are dropped.
    #[default]
    FirstMatch,
    /// An ambiguous cell yields no year at all (the course is still kept).
    RejectAmbiguous,
}

/// Positional layout of the survey export.
///
/// Offsets are counted from the anchors: the specialization column sits
/// `specialization_offset` columns before the group-by anchor; attendance
/// and workload sit `attendance_offset` / `workload_offset` columns after the
/// course/year anchor; then come `teaching_method_count` method flags,
/// `question_count` graded questions and `comment_count` comment columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnLayout {
    /// Column holding the professor name ("Level 2").
    pub group_by_column: String,
    /// Column holding the combined course/year label ("Level 3").
    pub course_year_column: String,
    pub specialization_offset: usize,
    pub attendance_offset: usize,
    pub workload_offset: usize,
    pub teaching_method_count: usize,
    pub question_count: usize,
    pub comment_count: usize,
    /// Completion timestamp column, looked up by name.
    pub timestamp_column: Option<String>,
    /// Treat a missing derived column as an error instead of skipping its topic.
    pub strict: bool,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            group_by_column: "Level 2".to_string(),
            course_year_column: "Level 3".to_string(),
            specialization_offset: 1,
            attendance_offset: 1,
            workload_offset: 2,
            teaching_method_count: 4,
            question_count: 12,
            comment_count: 3,
            timestamp_column: Some("Timestamp (dd/mm/yyyy)".to_string()),
            strict: false,
        }
    }
}

/// Configuration for a report run.
///
/// Use [`ReportConfig::builder()`] to create a new configuration with the
/// fluent API, or [`ReportConfig::from_json_file`] to load one from disk.
///
/// # Example
///
/// ```rust,ignore
/// use eval_report::config::ReportConfig;
///
/// let config = ReportConfig::builder()
///     .destination_dir("reports")
///     .comment_wrap_width(90)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Positional column contract.
    pub layout: ColumnLayout,

    /// Delimiter between course and year segments in the course/year column.
    /// Default: '-'
    pub course_delimiter: char,

    /// Case-insensitive token marking a segment as the academic year.
    /// Default: "anul"
    pub year_marker: String,

    /// Policy for cells with several year segments.
    /// Default: FirstMatch
    pub year_match: YearMatch,

    /// Workload levels in ascending order; always rendered, zero-filled.
    pub workload_scale: Vec<String>,

    /// One label per teaching-method column, position-matched.
    pub teaching_method_labels: Vec<String>,

    /// One section title per comment column, position-matched.
    pub comment_sections: Vec<String>,

    /// Whether the first record after the header holds the question texts.
    /// Default: true
    pub has_metadata_row: bool,

    /// Maximum characters per wrapped comment line.
    /// Default: 85
    pub comment_wrap_width: usize,

    /// Question texts longer than this are truncated with "...".
    /// Default: 80
    pub question_text_limit: usize,

    /// Transient chart images. Default: "temp"
    pub scratch_dir: PathBuf,

    /// PDFs are written here first. Default: "output"
    pub staging_dir: PathBuf,

    /// PDFs are relocated here at the end of a run. Default: "reports"
    pub destination_dir: PathBuf,

    /// Optional logo drawn on the title page when the file exists.
    pub logo_path: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            layout: ColumnLayout::default(),
            course_delimiter: '-',
            year_marker: "anul".to_string(),
            year_match: YearMatch::default(),
            workload_scale: DEFAULT_WORKLOAD_SCALE.iter().map(|s| s.to_string()).collect(),
            teaching_method_labels: DEFAULT_TEACHING_METHODS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            comment_sections: DEFAULT_COMMENT_SECTIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            has_metadata_row: true,
            comment_wrap_width: 85,
            question_text_limit: 80,
            scratch_dir: PathBuf::from("temp"),
            staging_dir: PathBuf::from("output"),
            destination_dir: PathBuf::from("reports"),
            logo_path: Some(PathBuf::from("assets/LOGO-ULBS_orizontal.png")),
        }
    }
}

impl ReportConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ReportConfigBuilder {
        ReportConfigBuilder::default()
    }

    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: ReportConfig = serde_json::from_str(&content)?;
        config
            .validate()
            .map_err(|e| crate::error::ReportError::InvalidConfig(e.to_string()))?;
        Ok(config)
    }

    /// Label for the teaching-method column at `index`.
    pub fn teaching_method_label(&self, index: usize) -> String {
        self.teaching_method_labels
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("Method {}", index + 1))
    }

    /// Title for the comment column at `index`.
    pub fn comment_section(&self, index: usize) -> String {
        self.comment_sections
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("Comments {}", index + 1))
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let layout = &self.layout;
        if layout.group_by_column.trim().is_empty() {
            return Err(ConfigValidationError::EmptyAnchor("group_by_column".to_string()));
        }
        if layout.course_year_column.trim().is_empty() {
            return Err(ConfigValidationError::EmptyAnchor(
                "course_year_column".to_string(),
            ));
        }
        if layout.group_by_column == layout.course_year_column {
            return Err(ConfigValidationError::SameAnchors(
                layout.group_by_column.clone(),
            ));
        }
        if layout.specialization_offset == 0 {
            return Err(ConfigValidationError::ZeroOffset(
                "specialization_offset".to_string(),
            ));
        }
        if layout.attendance_offset == 0 || layout.workload_offset == 0 {
            return Err(ConfigValidationError::ZeroOffset(
                "attendance_offset/workload_offset".to_string(),
            ));
        }
        if self.teaching_method_labels.len() != layout.teaching_method_count {
            return Err(ConfigValidationError::LabelCountMismatch {
                field: "teaching_method_labels".to_string(),
                expected: layout.teaching_method_count,
                actual: self.teaching_method_labels.len(),
            });
        }
        if self.comment_sections.len() != layout.comment_count {
            return Err(ConfigValidationError::LabelCountMismatch {
                field: "comment_sections".to_string(),
                expected: layout.comment_count,
                actual: self.comment_sections.len(),
            });
        }
        if self.workload_scale.is_empty() {
            return Err(ConfigValidationError::EmptyWorkloadScale);
        }
        if self.comment_wrap_width < 20 {
            return Err(ConfigValidationError::InvalidWidth {
                field: "comment_wrap_width".to_string(),
                value: self.comment_wrap_width,
            });
        }
        if self.question_text_limit < 10 {
            return Err(ConfigValidationError::InvalidWidth {
                field: "question_text_limit".to_string(),
                value: self.question_text_limit,
            });
        }
        if self.year_marker.trim().is_empty() {
            return Err(ConfigValidationError::EmptyAnchor("year_marker".to_string()));
        }

        // scratch and staging are wiped during a run
        let dirs = [
            ("scratch_dir", normalized_dir(&self.scratch_dir)),
            ("staging_dir", normalized_dir(&self.staging_dir)),
            ("destination_dir", normalized_dir(&self.destination_dir)),
        ];
        for (index, (first, a)) in dirs.iter().enumerate() {
            for (second, b) in &dirs[index + 1..] {
                if a.starts_with(b) || b.starts_with(a) {
                    return Err(ConfigValidationError::OverlappingDirs {
                        first: first.to_string(),
                        second: second.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Absolute, lexically normalized form of a directory for overlap checks.
///
/// The directories may not exist yet, so symlinks are not resolved.
fn normalized_dir(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("'{0}' must not be empty")]
    EmptyAnchor(String),

    #[error("Both anchors name the same column '{0}'")]
    SameAnchors(String),

    #[error("'{0}' must be at least 1")]
    ZeroOffset(String),

    #[error("'{field}' has {actual} entries but the layout expects {expected}")]
    LabelCountMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("Workload scale must have at least one level")]
    EmptyWorkloadScale,

    #[error("Invalid width for '{field}': {value}")]
    InvalidWidth { field: String, value: usize },

    #[error("'{first}' and '{second}' must be separate directories, neither inside the other")]
    OverlappingDirs { first: String, second: String },
}

/// Builder for [`ReportConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct ReportConfigBuilder {
    base: Option<ReportConfig>,
    group_by_column: Option<String>,
    course_year_column: Option<String>,
    strict_layout: Option<bool>,
    year_match: Option<YearMatch>,
    has_metadata_row: Option<bool>,
    comment_wrap_width: Option<usize>,
    scratch_dir: Option<PathBuf>,
    staging_dir: Option<PathBuf>,
    destination_dir: Option<PathBuf>,
    logo_path: Option<Option<PathBuf>>,
}

impl ReportConfigBuilder {
    /// Start from an existing configuration (e.g. one loaded from JSON)
    /// instead of the defaults.
    pub fn base(mut self, config: ReportConfig) -> Self {
        self.base = Some(config);
        self
    }

    /// Set the group-by (professor) anchor column name.
    pub fn group_by_column(mut self, name: impl Into<String>) -> Self {
        self.group_by_column = Some(name.into());
        self
    }

    /// Set the course/year anchor column name.
    pub fn course_year_column(mut self, name: impl Into<String>) -> Self {
        self.course_year_column = Some(name.into());
        self
    }

    /// Fail on missing derived columns instead of skipping their topics.
    pub fn strict_layout(mut self, strict: bool) -> Self {
        self.strict_layout = Some(strict);
        self
    }

    /// Set the multi-year cell policy.
    pub fn year_match(mut self, policy: YearMatch) -> Self {
        self.year_match = Some(policy);
        self
    }

    /// Whether the first record holds question texts.
    pub fn has_metadata_row(mut self, has: bool) -> Self {
        self.has_metadata_row = Some(has);
        self
    }

    /// Set the comment wrap width in characters.
    pub fn comment_wrap_width(mut self, width: usize) -> Self {
        self.comment_wrap_width = Some(width);
        self
    }

    /// Set the scratch directory for chart images.
    pub fn scratch_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(path.into());
        self
    }

    /// Set the staging directory for freshly written PDFs.
    pub fn staging_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(path.into());
        self
    }

    /// Set the user-facing destination directory.
    pub fn destination_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.destination_dir = Some(path.into());
        self
    }

    /// Set (or clear, with `None`) the title-page logo.
    pub fn logo_path(mut self, path: Option<PathBuf>) -> Self {
        self.logo_path = Some(path);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `ReportConfig` or an error if validation fails.
    pub fn build(self) -> Result<ReportConfig, ConfigValidationError> {
        let mut config = self.base.unwrap_or_default();

        if let Some(name) = self.group_by_column {
            config.layout.group_by_column = name;
        }
        if let Some(name) = self.course_year_column {
            config.layout.course_year_column = name;
        }
        if let Some(strict) = self.strict_layout {
            config.layout.strict = strict;
        }
        if let Some(policy) = self.year_match {
            config.year_match = policy;
        }
        if let Some(has) = self.has_metadata_row {
            config.has_metadata_row = has;
        }
        if let Some(width) = self.comment_wrap_width {
            config.comment_wrap_width = width;
        }
        if let Some(path) = self.scratch_dir {
            config.scratch_dir = path;
        }
        if let Some(path) = self.staging_dir {
            config.staging_dir = path;
        }
        if let Some(path) = self.destination_dir {
            config.destination_dir = path;
        }
        if let Some(logo) = self.logo_path {
            config.logo_path = logo;
        }

        config.validate()?;
        Ok(config)
    }
}
