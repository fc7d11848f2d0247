//! Positional column resolution.
//!
//! Survey exports name only a handful of columns reliably. Everything else is
//! located by offset from two anchors, as described by [`ColumnLayout`].

use crate::config::ColumnLayout;
use crate::error::{ReportError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Resolved column names for every topic.
///
/// Derived columns that fall past the end of the table are absent; the topics
/// that depend on them are skipped downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMap {
    pub group_by: String,
    pub course_year: String,
    pub specialization: Option<String>,
    pub attendance: Option<String>,
    pub workload: Option<String>,
    /// One slot per configured method, position-matched to its label.
    pub teaching_methods: Vec<Option<String>>,
    pub questions: Vec<String>,
    pub comments: Vec<String>,
    pub timestamp: Option<String>,
}

impl ColumnMap {
    /// Resolve every derived column from the table's column order.
    ///
    /// # Errors
    ///
    /// [`ReportError::ColumnNotFound`] when either anchor is missing, or when
    /// `layout.strict` is set and any derived column is out of range.
    pub fn resolve(columns: &[String], layout: &ColumnLayout) -> Result<Self> {
        let position = |name: &str| {
            columns
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| ReportError::ColumnNotFound(name.to_string()))
        };
        let group_index = position(&layout.group_by_column)?;
        let course_index = position(&layout.course_year_column)?;
        let at = |index: usize| columns.get(index).cloned();

        let specialization = group_index
            .checked_sub(layout.specialization_offset)
            .and_then(at);
        let attendance = at(course_index + layout.attendance_offset);
        let workload_index = course_index + layout.workload_offset;
        let workload = at(workload_index);

        let methods_start = workload_index + 1;
        let teaching_methods: Vec<Option<String>> = (0..layout.teaching_method_count)
            .map(|i| at(methods_start + i))
            .collect();

        let questions_start = methods_start + layout.teaching_method_count;
        let questions: Vec<String> = (0..layout.question_count)
            .filter_map(|i| at(questions_start + i))
            .collect();

        let comments_start = questions_start + layout.question_count;
        let comments: Vec<String> = (0..layout.comment_count)
            .filter_map(|i| at(comments_start + i))
            .collect();

        let timestamp = layout
            .timestamp_column
            .as_ref()
            .filter(|name| columns.contains(name))
            .cloned();

        let map = Self {
            group_by: layout.group_by_column.clone(),
            course_year: layout.course_year_column.clone(),
            specialization,
            attendance,
            workload,
            teaching_methods,
            questions,
            comments,
            timestamp,
        };

        let missing = map.missing_topics(layout);
        if !missing.is_empty() {
            if layout.strict {
                return Err(ReportError::ColumnNotFound(missing.join(", ")));
            }
            warn!("Columns out of range, topics skipped: {}", missing.join(", "));
        }
        debug!("Resolved columns: {:?}", map);
        Ok(map)
    }

    /// Names of derived topics whose columns could not be located.
    pub fn missing_topics(&self, layout: &ColumnLayout) -> Vec<String> {
        let mut missing = Vec::new();
        if self.specialization.is_none() {
            missing.push("specialization".to_string());
        }
        if self.attendance.is_none() {
            missing.push("attendance".to_string());
        }
        if self.workload.is_none() {
            missing.push("workload".to_string());
        }
        for (i, slot) in self.teaching_methods.iter().enumerate() {
            if slot.is_none() {
                missing.push(format!("teaching method {}", i + 1));
            }
        }
        for i in self.questions.len()..layout.question_count {
            missing.push(format!("question {}", i + 1));
        }
        for i in self.comments.len()..layout.comment_count {
            missing.push(format!("comment section {}", i + 1));
        }
        missing
    }

    /// Whether at least one teaching-method column exists.
    pub fn has_teaching_methods(&self) -> bool {
        self.teaching_methods.iter().any(Option::is_some)
    }
}
