//! Graded questions and free-text comments.

use crate::utils::{as_grade, parse_numeric_string, percentage, present};
use serde::{Deserialize, Serialize};

/// Responses for one grade, in Pareto position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeCount {
    pub grade: u8,
    pub count: usize,
    /// Running share of all graded responses up to and including this grade.
    pub cumulative_percent: f64,
}

/// Pareto-ordered grade histogram for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeDistribution {
    /// Grades with at least one response, most frequent first.
    pub grades: Vec<GradeCount>,
    /// Responses that are integer grades in 1..=10.
    pub responses: usize,
    /// Mean over every numeric answer, in range or not.
    pub mean: f64,
}

/// What a question column holds for one professor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionOutcome {
    /// Every cell is missing.
    NoResponses,
    /// Answers exist but none is numeric.
    NoValidData,
    /// Numeric answers exist but none is a grade 1..=10.
    NoValidGrades,
    Distribution(GradeDistribution),
}

/// One question topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionStats {
    /// 1-based position among the question columns.
    pub number: usize,
    pub column: String,
    pub text: String,
    pub total: usize,
    pub outcome: QuestionOutcome,
}

impl QuestionStats {
    /// Students counted as responding to this question.
    pub fn responses(&self) -> usize {
        match &self.outcome {
            QuestionOutcome::Distribution(d) => d.responses,
            _ => 0,
        }
    }

    pub fn no_response(&self) -> usize {
        self.total.saturating_sub(self.responses())
    }
}

/// Build the outcome of one question column.
pub fn grade_outcome(values: &[Option<String>]) -> QuestionOutcome {
    let answered: Vec<&str> = values.iter().filter_map(present).collect();
    if answered.is_empty() {
        return QuestionOutcome::NoResponses;
    }

    let numeric: Vec<f64> = answered
        .iter()
        .filter_map(|v| parse_numeric_string(v))
        .collect();
    if numeric.is_empty() {
        return QuestionOutcome::NoValidData;
    }

    let mut histogram = [0usize; 10];
    for grade in numeric.iter().filter_map(|v| as_grade(*v)) {
        histogram[usize::from(grade) - 1] += 1;
    }
    let responses: usize = histogram.iter().sum();
    if responses == 0 {
        return QuestionOutcome::NoValidGrades;
    }

    let mut ranked: Vec<(u8, usize)> = (1u8..=10)
        .zip(histogram)
        .filter(|(_, count)| *count > 0)
        .collect();
    // stable: ties stay in ascending grade order
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let mut running = 0;
    let grades = ranked
        .into_iter()
        .map(|(grade, count)| {
            running += count;
            GradeCount {
                grade,
                count,
                cumulative_percent: percentage(running, responses),
            }
        })
        .collect();

    let mean = numeric.iter().sum::<f64>() / numeric.len() as f64;
    QuestionOutcome::Distribution(GradeDistribution {
        grades,
        responses,
        mean,
    })
}

/// Free-text answers for one comment column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentSection {
    pub title: String,
    /// Non-blank comments in row order.
    pub comments: Vec<String>,
    pub total: usize,
}

impl CommentSection {
    pub fn from_values(title: impl Into<String>, values: &[Option<String>]) -> Self {
        let comments = values
            .iter()
            .filter_map(present)
            .filter(|c| !c.trim().is_empty())
            .map(str::to_string)
            .collect();
        Self {
            title: title.into(),
            comments,
            total: values.len(),
        }
    }

    pub fn without_comment(&self) -> usize {
        self.total.saturating_sub(self.comments.len())
    }

    pub fn comment_rate(&self) -> f64 {
        percentage(self.comments.len(), self.total)
    }
}
