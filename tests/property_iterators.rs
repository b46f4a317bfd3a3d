//! Property tests for the iterator invariants shared by every row-bearing
//! cursor.

use proptest::prelude::*;
use std::sync::Arc;

use graphflow::context::iterator::SequentialIter;
use graphflow::{DataSet, Iter, Row, Value};

fn dataset(rows: &[i64]) -> Arc<Value> {
    let mut ds = DataSet::new(["col1", "col2"]);
    for &i in rows {
        ds.push(Row::from(vec![Value::Int(i), Value::string(i.to_string())]));
    }
    Arc::new(Value::dataset(ds))
}

fn seq_iter(rows: &[i64]) -> Iter {
    Iter::Sequential(SequentialIter::new(dataset(rows)))
}

fn drain_col1(iter: &mut Iter) -> Vec<i64> {
    let mut out = Vec::new();
    while iter.valid() {
        out.push(iter.get_column("col1").as_int().unwrap());
        iter.next();
    }
    out
}

proptest! {
    #[test]
    fn copy_has_same_size_and_starts_at_begin(rows in proptest::collection::vec(-100i64..100, 0..50), advance in 0usize..60) {
        let mut iter = seq_iter(&rows);
        for _ in 0..advance {
            iter.next();
        }
        let copy = iter.copy();
        prop_assert_eq!(copy.size(), iter.size());
        prop_assert_eq!(copy.valid(), !rows.is_empty());
        let mut copy = copy;
        prop_assert_eq!(drain_col1(&mut copy), rows);
    }

    #[test]
    fn reset_replays_the_same_suffix(rows in proptest::collection::vec(-100i64..100, 1..50), pos_seed in 0usize..50) {
        let pos = pos_seed % rows.len();
        let mut iter = seq_iter(&rows);
        iter.reset(pos);
        prop_assert!(iter.valid());

        // a fresh copy advanced to `pos` yields the same sequence
        let mut skipped = iter.copy();
        for _ in 0..pos {
            skipped.next();
        }
        prop_assert_eq!(drain_col1(&mut iter), drain_col1(&mut skipped));
    }

    #[test]
    fn unstable_erase_shrinks_by_one(rows in proptest::collection::vec(-100i64..100, 1..50), pos_seed in 0usize..50) {
        let pos = pos_seed % rows.len();
        let mut iter = seq_iter(&rows);
        iter.reset(pos);
        let before = iter.size();
        iter.unstable_erase();
        prop_assert_eq!(iter.size(), before - 1);
    }

    #[test]
    fn erase_range_degenerate_is_noop(rows in proptest::collection::vec(-100i64..100, 0..50), a in 0usize..60, b in 0usize..60) {
        let mut iter = seq_iter(&rows);
        let first = a.max(b);
        let last = a.min(b);
        iter.erase_range(first, last);
        prop_assert_eq!(iter.size(), rows.len());
    }

    #[test]
    fn erase_range_clamps_to_end(rows in proptest::collection::vec(-100i64..100, 0..50), first in 0usize..60) {
        let mut iter = seq_iter(&rows);
        iter.erase_range(first, usize::MAX);
        prop_assert_eq!(iter.size(), first.min(rows.len()));
        let mut expected: Vec<i64> = rows.clone();
        expected.truncate(first);
        prop_assert_eq!(drain_col1(&mut iter), expected);
    }

    #[test]
    fn negative_column_index_counts_from_the_end(rows in proptest::collection::vec(-100i64..100, 1..20), idx in -5i64..5) {
        let iter = seq_iter(&rows);
        let width = 2i64;
        let value = iter.get_column_by_index(idx);
        if idx.unsigned_abs() as i64 >= width {
            prop_assert!(value.is_bad_null());
        } else {
            let expected = iter.get_column_by_index((width + idx) % width);
            prop_assert_eq!(value, expected);
        }
    }

    #[test]
    fn unknown_column_name_is_plain_null(rows in proptest::collection::vec(-100i64..100, 1..20), name in "[a-z]{1,8}") {
        prop_assume!(name != "col1" && name != "col2");
        let iter = seq_iter(&rows);
        let value = iter.get_column(&name);
        prop_assert!(value.is_null() && !value.is_bad_null());
    }

    #[test]
    fn stable_erase_preserves_survivor_order(rows in proptest::collection::vec(-100i64..100, 0..50)) {
        let mut iter = seq_iter(&rows);
        while iter.valid() {
            if iter.get_column("col1").as_int().unwrap() % 2 == 0 {
                iter.erase();
            } else {
                iter.next();
            }
        }
        iter.reset(0);
        let expected: Vec<i64> = rows.iter().copied().filter(|i| i % 2 != 0).collect();
        prop_assert_eq!(drain_col1(&mut iter), expected);
    }
}
