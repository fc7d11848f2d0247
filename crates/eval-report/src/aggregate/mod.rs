//! Per-professor aggregation.
//!
//! [`ProfessorStats::compute`] turns one professor's rows into every statistic
//! the report pages need. Topics are computed independently: an absent column
//! or an empty answer set degrades that topic to "skipped" or "zero-filled"
//! and never affects the others.

pub mod categories;
pub mod questions;
pub mod trend;

pub use categories::{
    CategoryBreakdown, CategoryCount, CourseYear, TeachingMethodUsage, TeachingMethods,
    categorical_breakdown, course_year_breakdowns, label_sorted_breakdown, parse_course_year,
    value_counts, workload_breakdown,
};
pub use questions::{
    CommentSection, GradeCount, GradeDistribution, QuestionOutcome, QuestionStats, grade_outcome,
};
pub use trend::{CompletionStatus, CompletionTrend, DailyCount, completion_status, parse_timestamp};

use crate::columns::ColumnMap;
use crate::config::ReportConfig;
use crate::error::Result;
use crate::loader::{ProfessorSubset, ResponseTable};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Every statistic for one professor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfessorStats {
    pub professor: String,
    /// Row count of the professor's subset.
    pub total: usize,
    /// Empty when the specialization column is absent.
    pub specialization: CategoryBreakdown,
    pub years: CategoryBreakdown,
    pub courses: CategoryBreakdown,
    /// `None` when the attendance column is absent.
    pub attendance: Option<CategoryBreakdown>,
    /// `None` when the workload column is absent.
    pub workload: Option<CategoryBreakdown>,
    /// `None` when no teaching-method column exists.
    pub teaching_methods: Option<TeachingMethods>,
    pub questions: Vec<QuestionStats>,
    pub comments: Vec<CommentSection>,
    pub completion: CompletionStatus,
}

impl ProfessorStats {
    /// Aggregate one professor's subset.
    pub fn compute(
        table: &ResponseTable,
        subset: &ProfessorSubset,
        columns: &ColumnMap,
        config: &ReportConfig,
    ) -> Result<Self> {
        let total = subset.height();

        let specialization = match subset.optional_values(columns.specialization.as_deref())? {
            Some(values) => categorical_breakdown(&values),
            None => CategoryBreakdown::new(Vec::new(), 0, total),
        };

        let course_year = subset.column_values(&columns.course_year)?;
        let (years, courses) = course_year_breakdowns(
            &course_year,
            config.course_delimiter,
            &config.year_marker,
            config.year_match,
        );

        let attendance = subset
            .optional_values(columns.attendance.as_deref())?
            .map(|values| label_sorted_breakdown(&values));

        let workload = subset
            .optional_values(columns.workload.as_deref())?
            .map(|values| workload_breakdown(&values, &config.workload_scale));

        let teaching_methods = if columns.has_teaching_methods() {
            let mut method_columns = Vec::with_capacity(columns.teaching_methods.len());
            for (index, column) in columns.teaching_methods.iter().enumerate() {
                method_columns.push((
                    config.teaching_method_label(index),
                    subset.optional_values(column.as_deref())?,
                ));
            }
            Some(TeachingMethods::from_columns(method_columns, total))
        } else {
            None
        };

        let mut questions = Vec::with_capacity(columns.questions.len());
        for (index, column) in columns.questions.iter().enumerate() {
            let values = subset.column_values(column)?;
            let text = table
                .question_text(column)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Evaluation Question {}", index + 1));
            questions.push(QuestionStats {
                number: index + 1,
                column: column.clone(),
                text,
                total,
                outcome: grade_outcome(&values),
            });
        }

        let mut comments = Vec::with_capacity(columns.comments.len());
        for (index, column) in columns.comments.iter().enumerate() {
            let values = subset.column_values(column)?;
            comments.push(CommentSection::from_values(
                config.comment_section(index),
                &values,
            ));
        }

        let completion = match config.layout.timestamp_column.as_deref() {
            Some(name) => {
                let values = subset.optional_values(columns.timestamp.as_deref())?;
                completion_status(name, values.as_deref())
            }
            None => CompletionStatus::NoTimestamps,
        };

        debug!(
            "Aggregated '{}': {} rows, {} questions, {} comment sections",
            subset.name(),
            total,
            questions.len(),
            comments.len()
        );

        Ok(Self {
            professor: subset.name().to_string(),
            total,
            specialization,
            years,
            courses,
            attendance,
            workload,
            teaching_methods,
            questions,
            comments,
            completion,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(values: &[&str]) -> Vec<Option<String>> {
        values
            .iter()
            .map(|v| if v.is_empty() { None } else { Some(v.to_string()) })
            .collect()
    }

    fn header() -> Vec<Option<String>> {
        let mut names = vec![
            "Spec".to_string(),
            "Level 2".to_string(),
            "Level 3".to_string(),
            "Attendance".to_string(),
            "Workload".to_string(),
        ];
        names.extend((1..=4).map(|i| format!("M{}", i)));
        names.extend((1..=2).map(|i| format!("Q{}", i)));
        names.into_iter().map(Some).collect()
    }

    /// A table cut short after two questions: questions 3-12 and comments are absent.
    fn table_and_columns() -> (ResponseTable, ColumnMap, ReportConfig) {
        let config = ReportConfig::default();
        let grid = vec![
            header(),
            row(&["", "", "", "", "", "", "", "", "", "Was it clear?", ""]),
            row(&["Finance", "SMITH J", "Curs-Anul 1", "100%", "Mic", "x", "", "", "", "9", ""]),
            row(&["Finance", "SMITH J", "Curs-Anul 1", "50%", "Mare", "", "x", "", "", "10", ""]),
            row(&["", "SMITH J", "Seminar-Anul 2", "", "Mare", "x", "", "", "", "9", ""]),
            row(&["Marketing", "DOE A", "Curs-Anul 3", "100%", "Mediu", "x", "x", "", "", "4", "5"]),
        ];
        let table = ResponseTable::from_grid(grid, &config).unwrap();
        let columns = ColumnMap::resolve(&table.column_names(), &config.layout).unwrap();
        (table, columns, config)
    }

    #[test]
    fn test_compute_professor_stats() {
        let (table, columns, config) = table_and_columns();
        let subset = table.subset("SMITH J").unwrap();
        let stats = ProfessorStats::compute(&table, &subset, &columns, &config).unwrap();

        assert_eq!(stats.total, 3);
        assert_eq!(stats.specialization.entries, vec![CategoryCount::new("Finance", 2)]);
        assert_eq!(stats.specialization.responses, 2);

        assert_eq!(stats.years.labels(), vec!["Anul 1", "Anul 2"]);
        assert_eq!(stats.courses.labels(), vec!["Curs", "Seminar"]);

        let attendance = stats.attendance.as_ref().unwrap();
        assert_eq!(attendance.labels(), vec!["100%", "50%"]);
        assert_eq!(attendance.no_response(), 1);

        let workload = stats.workload.as_ref().unwrap();
        assert_eq!(workload.counts(), vec![0, 1, 0, 2, 0]);

        let methods = stats.teaching_methods.as_ref().unwrap();
        assert_eq!(methods.methods.len(), 4);
        assert_eq!(methods.methods[0].count, 2);
        assert_eq!(methods.methods[1].count, 1);
        assert_eq!(methods.methods[3].count, 0);
        assert_eq!(methods.methods[0].label, "Predare CLASICĂ");

        assert_eq!(stats.questions.len(), 2);
        assert_eq!(stats.questions[0].text, "Was it clear?");
        assert_eq!(stats.questions[1].text, "Evaluation Question 2");
        assert_eq!(stats.questions[1].outcome, QuestionOutcome::NoResponses);
        assert_eq!(stats.questions[0].responses(), 3);

        assert!(stats.comments.is_empty());
        assert!(matches!(stats.completion, CompletionStatus::ColumnMissing { .. }));
    }

    #[test]
    fn test_topics_are_independent_per_professor() {
        let (table, columns, config) = table_and_columns();
        let subset = table.subset("DOE A").unwrap();
        let stats = ProfessorStats::compute(&table, &subset, &columns, &config).unwrap();

        assert_eq!(stats.total, 1);
        assert_eq!(stats.specialization.labels(), vec!["Marketing"]);
        assert_eq!(stats.questions[1].responses(), 1);
        assert_eq!(stats.workload.unwrap().counts(), vec![0, 0, 1, 0, 0]);
    }
}
