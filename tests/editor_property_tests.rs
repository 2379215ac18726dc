//! Property-based tests for the editor state machine and the scorer.
//!
//! Uses proptest to verify invariants hold across random inputs.

#![allow(clippy::unwrap_used)]

use limpiar::{
    CellValue, Column, ColumnType, DuplicateConfig, Duplicates, EditorSession, FactorId, Keep,
    PipelineConfig, QualityFactor, QualityMetrics, Row, TableDocument, FALLBACK_SCORE,
};
use proptest::prelude::*;

fn base_document() -> TableDocument {
    TableDocument::from_csv_str("name,age\nana,34\nbo,29\ncy,41\n").unwrap()
}

/// A random structural edit applied through the session.
#[derive(Debug, Clone)]
enum Edit {
    SetAge(usize, f64),
    SetName(usize, String),
    DeleteFirstRow,
    AddColumn(String),
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (0usize..3, -100.0f64..100.0).prop_map(|(r, v)| Edit::SetAge(r, v)),
        (0usize..3, "[a-z]{1,8}").prop_map(|(r, s)| Edit::SetName(r, s)),
        Just(Edit::DeleteFirstRow),
        "[a-z]{3,10}".prop_map(Edit::AddColumn),
    ]
}

fn apply(session: &mut EditorSession, edit: &Edit) {
    match edit {
        Edit::SetAge(row, value) => {
            let row = *row % session.document().num_rows().max(1);
            if session.begin_cell_edit(row, "age").is_ok() {
                session.update_cell(CellValue::Number(*value)).unwrap();
                session.end_cell_edit().unwrap();
            }
        }
        Edit::SetName(row, value) => {
            let row = *row % session.document().num_rows().max(1);
            if session.begin_cell_edit(row, "name").is_ok() {
                session
                    .update_cell(CellValue::Text(value.clone()))
                    .unwrap();
                session.end_cell_edit().unwrap();
            }
        }
        Edit::DeleteFirstRow => {
            if session.document().num_rows() > 0 {
                session.delete_row(0).unwrap();
            }
        }
        Edit::AddColumn(name) => {
            if !session.document().has_column(name) {
                session
                    .add_column(name, ColumnType::Text, CellValue::Null)
                    .unwrap();
            }
        }
    }
}

proptest! {
    /// N commits followed by N undos restores the pre-commit document.
    #[test]
    fn prop_undo_restores_initial_state(edits in prop::collection::vec(edit_strategy(), 1..12)) {
        let initial = base_document();
        let mut session = EditorSession::new(initial.clone());
        for edit in &edits {
            apply(&mut session, edit);
        }
        while session.undo() {}
        prop_assert_eq!(session.document(), &initial);
    }

    /// N undos followed by N redos restores the most recent state.
    #[test]
    fn prop_redo_restores_latest_state(edits in prop::collection::vec(edit_strategy(), 1..12)) {
        let mut session = EditorSession::new(base_document());
        for edit in &edits {
            apply(&mut session, edit);
        }
        let latest = session.document().clone();
        let undone = {
            let mut n = 0;
            while session.undo() {
                n += 1;
            }
            n
        };
        for _ in 0..undone {
            prop_assert!(session.redo());
        }
        prop_assert_eq!(session.document(), &latest);
    }

    /// Ending a cell edit at the original value never records history;
    /// ending at a different value records exactly one entry.
    #[test]
    fn prop_cell_edit_commit_suppression(
        keystrokes in prop::collection::vec(-100.0f64..100.0, 1..6),
        revert in proptest::bool::ANY,
    ) {
        let mut session = EditorSession::new(base_document());
        let before = session.undo_depth();

        session.begin_cell_edit(0, "age").unwrap();
        for value in &keystrokes {
            session.update_cell(CellValue::Number(*value)).unwrap();
        }
        if revert {
            session.update_cell(CellValue::Number(34.0)).unwrap();
        }
        let committed = session.end_cell_edit().unwrap();

        let expected = usize::from(!revert && keystrokes.last() != Some(&34.0));
        prop_assert_eq!(session.undo_depth() - before, expected);
        prop_assert_eq!(committed, expected == 1);
    }

    /// The score stays within [0, 100] for any metric values, including
    /// the all-absent case.
    #[test]
    fn prop_score_bounds(
        missing in proptest::option::of(-50.0f64..200.0),
        duplicates in proptest::option::of(-10.0f64..1e6),
        outliers in proptest::option::of(-1.0f64..10.0),
        correlation in proptest::option::of(-1.0f64..2.0),
        cardinality in proptest::option::of(0.0f64..1e9),
    ) {
        let metrics = QualityMetrics {
            missing_values_pct: missing,
            duplicate_records_count: duplicates,
            outlier_rate: outliers,
            feature_correlation_mean: correlation,
            cardinality_categorical: cardinality,
            ..Default::default()
        };
        let score = metrics.score();
        prop_assert!(score <= 100);
        if missing.is_none()
            && duplicates.is_none()
            && outliers.is_none()
            && correlation.is_none()
            && cardinality.is_none()
        {
            prop_assert_eq!(score, FALLBACK_SCORE);
        }
    }

    /// Keep-first dedup output length equals the number of distinct
    /// composite keys, and the first occurrence of each key survives.
    #[test]
    fn prop_dedup_first_keeps_distinct_keys(keys in prop::collection::vec(0u8..6, 1..30)) {
        let columns = vec![
            Column::new("k", ColumnType::Numeric),
            Column::new("pos", ColumnType::Numeric),
        ];
        let rows: Vec<Row> = keys
            .iter()
            .enumerate()
            .map(|(i, k)| {
                let mut row = Row::new();
                row.insert("k".to_string(), CellValue::Number(f64::from(*k)));
                row.insert("pos".to_string(), CellValue::Number(i as f64));
                row
            })
            .collect();
        let doc = TableDocument::new(columns, rows).unwrap();

        let mut config = PipelineConfig::default();
        config.duplicates = DuplicateConfig {
            subset: Some(vec!["k".to_string()]),
            keep: Keep::First,
        };
        let outcome = Duplicates.fix(&doc, &config).unwrap();

        let distinct: std::collections::HashSet<u8> = keys.iter().copied().collect();
        prop_assert_eq!(outcome.document.num_rows(), distinct.len());

        // each retained row is the first occurrence of its key
        for row in outcome.document.rows() {
            let k = row["k"].as_number().unwrap() as u8;
            let pos = row["pos"].as_number().unwrap() as usize;
            let first = keys.iter().position(|x| *x == k).unwrap();
            prop_assert_eq!(pos, first);
        }
        prop_assert_eq!(Duplicates.id(), FactorId::Duplicates);
    }
}
