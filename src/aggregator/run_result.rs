//! `RunResult` (§3) and its supporting `Category`/`Classification` enums.

use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexSet;

use crate::aggregator::column::Column;
use crate::aggregator::task::TaskId;
use crate::decimal::ExtReal;

/// The verdict about the tool's verdict (Glossary: Category).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Correct,
    CorrectUnconfirmed,
    Wrong,
    Unknown,
    Error,
    Missing,
}

impl Category {
    pub fn parse(value: &str) -> Self {
        match value {
            "correct" => Self::Correct,
            "correct-unconfirmed" => Self::CorrectUnconfirmed,
            "wrong" => Self::Wrong,
            "error" => Self::Error,
            "missing" => Self::Missing,
            _ => Self::Unknown,
        }
    }
}

/// The shape of a status string (Glossary: Classification).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    True,
    False,
}

/// Derives the [`Classification`] of a status string: `TRUE` or any `FALSE(...)` spelling.
pub fn classify_status(status: &str) -> Option<Classification> {
    let upper = status.trim().to_ascii_uppercase();
    if upper == "TRUE" {
        Some(Classification::True)
    } else if upper.starts_with("FALSE") {
        Some(Classification::False)
    } else {
        None
    }
}

/// For one `(run set × task)`.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub task_id: TaskId,
    pub status: String,
    pub category: Category,
    pub score: Option<ExtReal>,
    pub logfile: Option<PathBuf>,
    pub columns: Arc<Vec<Column>>,
    pub values: Vec<Option<String>>,
    pub diff_relevant_columns: IndexSet<String>,
    pub sourcefiles_exist: bool,
}

impl RunResult {
    /// A synthetic result used by the task reconciler (C6) to fill a task missing from one run
    /// set: category `Missing`, all values `None`.
    pub fn missing(task_id: TaskId, columns: Arc<Vec<Column>>) -> Self {
        let len = columns.len();
        Self {
            task_id,
            status: String::new(),
            category: Category::Missing,
            score: None,
            logfile: None,
            columns,
            values: vec![None; len],
            diff_relevant_columns: IndexSet::new(),
            sourcefiles_exist: false,
        }
    }

    /// Index of `title` in this result's column list, if present.
    pub fn column_index(&self, title: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.title == title)
    }

    pub fn value_of(&self, title: &str) -> Option<&str> {
        self.column_index(title)
            .and_then(|i| self.values.get(i))
            .and_then(|v| v.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::true_status("TRUE", Some(Classification::True))]
    #[case::false_plain("FALSE", Some(Classification::False))]
    #[case::false_with_property("FALSE(unreach-call)", Some(Classification::False))]
    #[case::timeout("TIMEOUT", None)]
    fn classify(#[case] status: &str, #[case] expected: Option<Classification>) {
        assert_eq!(classify_status(status), expected);
    }

    #[test]
    fn missing_result_has_null_values_matching_column_count() {
        let columns = Arc::new(vec![Column::new("status"), Column::new("cputime")]);
        let result = RunResult::missing(TaskId::new("foo.c", "", None), columns.clone());
        assert_eq!(result.values.len(), columns.len());
        assert!(result.values.iter().all(Option::is_none));
        assert_eq!(result.category, Category::Missing);
    }
}
