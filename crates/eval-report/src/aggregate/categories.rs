//! Categorical topics: specialization, academic year, course, attendance,
//! workload and teaching methods.

use crate::config::YearMatch;
use crate::utils::{percentage, present};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// One category and the number of students who chose it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub label: String,
    pub count: usize,
}

impl CategoryCount {
    pub fn new(label: impl Into<String>, count: usize) -> Self {
        Self {
            label: label.into(),
            count,
        }
    }
}

/// Counts for one categorical topic.
///
/// `responses` is the number of rows that produced a value and `total` the
/// professor's row count, so `no_response() == total - responses`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub entries: Vec<CategoryCount>,
    pub responses: usize,
    pub total: usize,
}

impl CategoryBreakdown {
    pub fn new(entries: Vec<CategoryCount>, responses: usize, total: usize) -> Self {
        Self {
            entries,
            responses,
            total,
        }
    }

    /// Rows that produced no value for this topic.
    pub fn no_response(&self) -> usize {
        self.total.saturating_sub(self.responses)
    }

    pub fn has_responses(&self) -> bool {
        self.responses > 0
    }

    pub fn percent_of_responses(&self, count: usize) -> f64 {
        percentage(count, self.responses)
    }

    pub fn percent_of_total(&self, count: usize) -> f64 {
        percentage(count, self.total)
    }

    pub fn response_rate(&self) -> f64 {
        percentage(self.responses, self.total)
    }

    pub fn labels(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.label.clone()).collect()
    }

    pub fn counts(&self) -> Vec<usize> {
        self.entries.iter().map(|e| e.count).collect()
    }
}

/// Count values, most frequent first; ties keep first-appearance order.
pub fn value_counts<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<CategoryCount> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values {
        let entry = counts.entry(value).or_insert(0);
        if *entry == 0 {
            order.push(value);
        }
        *entry += 1;
    }

    let mut entries: Vec<CategoryCount> = order
        .into_iter()
        .map(|label| CategoryCount::new(label, counts[label]))
        .collect();
    // sort_by is stable, so equal counts stay in encounter order
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries
}

/// Breakdown of a free categorical column, most frequent first.
pub fn categorical_breakdown(values: &[Option<String>]) -> CategoryBreakdown {
    let present_values: Vec<&str> = values.iter().filter_map(present).collect();
    CategoryBreakdown::new(
        value_counts(present_values.iter().copied()),
        present_values.len(),
        values.len(),
    )
}

/// Breakdown ordered ascending by label.
pub fn label_sorted_breakdown(values: &[Option<String>]) -> CategoryBreakdown {
    let mut breakdown = categorical_breakdown(values);
    breakdown.entries.sort_by(|a, b| a.label.cmp(&b.label));
    breakdown
}

/// Workload breakdown on a fixed ascending scale.
///
/// Every scale level is present (zero-filled); values outside the scale are
/// appended in encounter order.
pub fn workload_breakdown(values: &[Option<String>], scale: &[String]) -> CategoryBreakdown {
    let raw = categorical_breakdown(values);
    let count_of = |label: &str| {
        raw.entries
            .iter()
            .find(|e| e.label == label)
            .map_or(0, |e| e.count)
    };

    let mut entries: Vec<CategoryCount> = scale
        .iter()
        .map(|level| CategoryCount::new(level.clone(), count_of(level)))
        .collect();

    let mut extras: Vec<&str> = Vec::new();
    for value in values.iter().filter_map(present) {
        if !scale.iter().any(|level| level == value) && !extras.contains(&value) {
            extras.push(value);
        }
    }
    entries.extend(
        extras
            .into_iter()
            .map(|label| CategoryCount::new(label, count_of(label))),
    );

    CategoryBreakdown::new(entries, raw.responses, raw.total)
}

/// Course and year parsed from one course/year cell.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CourseYear {
    pub course: Option<String>,
    pub year: Option<String>,
}

/// Split a course/year cell into its course label and academic year.
///
/// Segments containing `marker` (case-insensitive) are year segments; the
/// rest are re-joined with `delimiter` to form the course. A cell made only of
/// year segments keeps the whole text as its course.
///
/// ```rust,ignore
/// let parsed = parse_course_year("Matematică-Curs-Anul 1", '-', "anul", YearMatch::FirstMatch);
/// assert_eq!(parsed.course.as_deref(), Some("Matematică-Curs"));
/// assert_eq!(parsed.year.as_deref(), Some("Anul 1"));
/// ```
pub fn parse_course_year(cell: &str, delimiter: char, marker: &str, policy: YearMatch) -> CourseYear {
    let marker = marker.to_lowercase();
    let mut years: Vec<&str> = Vec::new();
    let mut course_parts: Vec<&str> = Vec::new();

    for segment in cell.split(delimiter).map(str::trim) {
        if segment.to_lowercase().contains(&marker) {
            years.push(segment);
        } else {
            course_parts.push(segment);
        }
    }

    let year = match (years.len(), policy) {
        (0, _) => None,
        (1, _) | (_, YearMatch::FirstMatch) => Some(years[0].to_string()),
        (_, YearMatch::RejectAmbiguous) => {
            debug!("Ambiguous year segments {:?} in '{}'", years, cell);
            None
        }
    };

    let course = if course_parts.is_empty() {
        cell.trim().to_string()
    } else {
        course_parts.join(&delimiter.to_string()).trim().to_string()
    };

    CourseYear {
        course: (!course.is_empty()).then_some(course),
        year,
    }
}

/// Year and course breakdowns for a course/year column.
pub fn course_year_breakdowns(
    values: &[Option<String>],
    delimiter: char,
    marker: &str,
    policy: YearMatch,
) -> (CategoryBreakdown, CategoryBreakdown) {
    let mut years: Vec<String> = Vec::new();
    let mut courses: Vec<String> = Vec::new();

    for cell in values.iter().filter_map(present) {
        let parsed = parse_course_year(cell, delimiter, marker, policy);
        if let Some(course) = parsed.course {
            courses.push(course);
        }
        if let Some(year) = parsed.year {
            years.push(year);
        }
    }

    let total = values.len();
    let year_breakdown = CategoryBreakdown::new(
        value_counts(years.iter().map(String::as_str)),
        years.len(),
        total,
    );
    let course_breakdown = CategoryBreakdown::new(
        value_counts(courses.iter().map(String::as_str)),
        courses.len(),
        total,
    );
    (year_breakdown, course_breakdown)
}

/// How many students reported one teaching method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeachingMethodUsage {
    pub label: String,
    pub count: usize,
    /// False when the method's column is absent from the table.
    pub column_present: bool,
}

/// Usage of every configured teaching method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeachingMethods {
    pub methods: Vec<TeachingMethodUsage>,
    pub total: usize,
}

impl TeachingMethods {
    /// Build from position-matched (label, column values) pairs; an absent
    /// column counts as zero.
    pub fn from_columns(columns: Vec<(String, Option<Vec<Option<String>>>)>, total: usize) -> Self {
        let methods = columns
            .into_iter()
            .map(|(label, values)| TeachingMethodUsage {
                label,
                count: values
                    .as_deref()
                    .map_or(0, crate::utils::count_present),
                column_present: values.is_some(),
            })
            .collect();
        Self { methods, total }
    }

    /// Number of method columns found in the table.
    pub fn analyzed(&self) -> usize {
        self.methods.iter().filter(|m| m.column_present).count()
    }

    /// Sum of all method counts.
    pub fn implementations(&self) -> usize {
        self.methods.iter().map(|m| m.count).sum()
    }

    pub fn percent(&self, count: usize) -> f64 {
        percentage(count, self.total)
    }
}
