//! Statistics engine (C7, spec §4.7)
//!
//! Operates column-wise, for one run set at a time: eleven statistics rows (total, correct and
//! its true/false split, correct-unconfirmed and its split, incorrect and its true/false split,
//! score), each with one cell per column.

use std::collections::HashSet;

use log::warn;

use crate::aggregator::column::{Column, ColumnType};
use crate::aggregator::run_result::{classify_status, Category, Classification, RunResult};
use crate::decimal::{ExtReal, StatValue};

/// Which of the eleven statistics rows a [`StatsRow`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatRowKind {
    Total,
    Correct,
    CorrectTrue,
    CorrectFalse,
    CorrectUnconfirmed,
    CorrectUnconfirmedTrue,
    CorrectUnconfirmedFalse,
    Incorrect,
    WrongTrue,
    WrongFalse,
    Score,
}

impl StatRowKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Total => "total",
            Self::Correct => "correct",
            Self::CorrectTrue => "correct-true",
            Self::CorrectFalse => "correct-false",
            Self::CorrectUnconfirmed => "correct-unconfirmed",
            Self::CorrectUnconfirmedTrue => "correct-unconfirmed-true",
            Self::CorrectUnconfirmedFalse => "correct-unconfirmed-false",
            Self::Incorrect => "incorrect",
            Self::WrongTrue => "wrong-true",
            Self::WrongFalse => "wrong-false",
            Self::Score => "score",
        }
    }
}

/// One statistics row: a cell per column, aligned with the run set's column order.
#[derive(Debug, Clone)]
pub struct StatsRow {
    pub kind: StatRowKind,
    pub cells: Vec<Option<StatValue>>,
}

/// Computes the full statistics table for one run set's columns and (already reconciled) results.
///
/// When `correct_only` is set, the `incorrect`/`wrong-true`/`wrong-false` rows are omitted
/// outright (§4.7 "Correct-only toggle"), not merely left empty.
pub fn compute_statistics(columns: &[Column], results: &[RunResult], correct_only: bool) -> Vec<StatsRow> {
    let mut kinds = vec![
        StatRowKind::Total,
        StatRowKind::Correct,
        StatRowKind::CorrectTrue,
        StatRowKind::CorrectFalse,
        StatRowKind::CorrectUnconfirmed,
        StatRowKind::CorrectUnconfirmedTrue,
        StatRowKind::CorrectUnconfirmedFalse,
    ];
    if !correct_only {
        kinds.push(StatRowKind::Incorrect);
        kinds.push(StatRowKind::WrongTrue);
        kinds.push(StatRowKind::WrongFalse);
    }
    kinds.push(StatRowKind::Score);

    let main_status_index = columns.iter().position(|column| column.is_main_status);
    let mut warned_columns: HashSet<String> = HashSet::new();

    kinds
        .into_iter()
        .map(|kind| {
            let mut cells: Vec<Option<StatValue>> = columns
                .iter()
                .map(|column| cell_for(kind, column, results, &mut warned_columns))
                .collect();

            // Post-rule (§4.7): the main-status column's cell is this row's "total" count; if
            // it is absent or zero, every other column's cell in the same row is meaningless.
            let row_has_data = main_status_index
                .and_then(|index| cells[index].as_ref())
                .is_some_and(|value| value.sum != ExtReal::ZERO);
            if !row_has_data {
                for (index, cell) in cells.iter_mut().enumerate() {
                    if Some(index) != main_status_index {
                        *cell = None;
                    }
                }
            }

            StatsRow { kind, cells }
        })
        .collect()
}

fn matches_kind(kind: StatRowKind, result: &RunResult) -> bool {
    let classification = classify_status(&result.status);
    match kind {
        StatRowKind::Total => !result.status.is_empty(),
        StatRowKind::Correct => result.category == Category::Correct,
        StatRowKind::CorrectTrue => {
            result.category == Category::Correct && classification == Some(Classification::True)
        }
        StatRowKind::CorrectFalse => {
            result.category == Category::Correct && classification == Some(Classification::False)
        }
        StatRowKind::CorrectUnconfirmed => result.category == Category::CorrectUnconfirmed,
        StatRowKind::CorrectUnconfirmedTrue => {
            result.category == Category::CorrectUnconfirmed
                && classification == Some(Classification::True)
        }
        StatRowKind::CorrectUnconfirmedFalse => {
            result.category == Category::CorrectUnconfirmed
                && classification == Some(Classification::False)
        }
        StatRowKind::Incorrect => result.category == Category::Wrong,
        StatRowKind::WrongTrue => {
            result.category == Category::Wrong && classification == Some(Classification::True)
        }
        StatRowKind::WrongFalse => {
            result.category == Category::Wrong && classification == Some(Classification::False)
        }
        StatRowKind::Score => true,
    }
}

fn cell_for(
    kind: StatRowKind,
    column: &Column,
    results: &[RunResult],
    warned_columns: &mut HashSet<String>,
) -> Option<StatValue> {
    if kind == StatRowKind::Score {
        if !column.is_main_status {
            return None;
        }
        let scores: Vec<ExtReal> = results.iter().filter_map(|r| r.score).collect();
        return Some(StatValue::from_list(&scores));
    }

    let subset: Vec<&RunResult> = results.iter().filter(|r| matches_kind(kind, r)).collect();

    match column.column_type {
        ColumnType::Status | ColumnType::MainStatus => {
            Some(StatValue::count(subset.len() as u64))
        }
        ColumnType::Text => None,
        ColumnType::Integer | ColumnType::Decimal | ColumnType::Measurement => {
            let values: Vec<ExtReal> = subset
                .iter()
                .filter_map(|r| r.value_of(&column.title))
                .filter_map(|raw| match ExtReal::parse(raw) {
                    Some(value) => Some(column.convert(value)),
                    None => {
                        if warned_columns.insert(column.title.clone()) {
                            warn!(
                                "Non-numeric value '{raw}' encountered in column '{}' during statistics aggregation",
                                column.title
                            );
                        }
                        None
                    }
                })
                .collect();
            Some(StatValue::from_list(&values))
        }
    }
}
