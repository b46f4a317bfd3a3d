//! Sequential iterator: one logical row per dataset row.

use std::collections::HashMap;
use std::sync::Arc;

use super::{dataset_of, resolve_slot, RowSlot, RowView};
use crate::value::{Value, NULL_VALUE};

/// Cursor over the rows of a dataset-shaped value.
///
/// Union construction appends further iterators' rows positionally; the
/// column map stays the left input's, so callers must guarantee matching
/// arities.
#[derive(Debug, Clone)]
pub struct SequentialIter {
    storages: Vec<Arc<Value>>,
    rows: Vec<RowSlot>,
    cursor: usize,
    col_names: Vec<String>,
    col_indices: HashMap<String, usize>,
}

impl SequentialIter {
    pub fn new(value: Arc<Value>) -> SequentialIter {
        let (rows, col_names) = match dataset_of(&value) {
            Some(ds) => (
                (0..ds.rows.len()).map(|row| RowSlot { storage: 0, row }).collect(),
                ds.col_names.clone(),
            ),
            None => {
                debug_assert!(false, "sequential iterator over non-dataset value");
                (Vec::new(), Vec::new())
            }
        };
        let col_indices = col_names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        SequentialIter {
            storages: vec![value],
            rows,
            cursor: 0,
            col_names,
            col_indices,
        }
    }

    /// Union of two sequential iterators; right rows are appended after the
    /// left ones.
    pub fn union(left: SequentialIter, right: SequentialIter) -> SequentialIter {
        Self::union_all(vec![left, right])
    }

    /// Union of any number of sequential iterators. The first input's
    /// column map wins.
    pub fn union_all(inputs: Vec<SequentialIter>) -> SequentialIter {
        let mut out = SequentialIter {
            storages: Vec::new(),
            rows: Vec::new(),
            cursor: 0,
            col_names: Vec::new(),
            col_indices: HashMap::new(),
        };
        for (i, input) in inputs.into_iter().enumerate() {
            if i == 0 {
                out.col_names = input.col_names;
                out.col_indices = input.col_indices;
            }
            let base = out.storages.len();
            out.storages.extend(input.storages);
            out.rows.extend(input.rows.into_iter().map(|slot| RowSlot {
                storage: slot.storage + base,
                row: slot.row,
            }));
        }
        out
    }

    pub fn valid(&self) -> bool {
        self.cursor < self.rows.len()
    }

    pub fn next(&mut self) {
        if self.valid() {
            self.cursor += 1;
        }
    }

    pub fn size(&self) -> usize {
        self.rows.len()
    }

    pub(super) fn reset(&mut self, pos: usize) {
        self.cursor = pos;
    }

    pub fn erase(&mut self) {
        if self.valid() {
            self.rows.remove(self.cursor);
        }
    }

    pub fn unstable_erase(&mut self) {
        if self.valid() {
            self.rows.swap_remove(self.cursor);
        }
    }

    pub fn erase_range(&mut self, first: usize, last: usize) {
        if first >= last || first >= self.rows.len() {
            return;
        }
        let last = last.min(self.rows.len());
        self.rows.drain(first..last);
        self.cursor = 0;
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.cursor = 0;
    }

    pub fn row(&self) -> Option<RowView<'_>> {
        self.current_slot()
            .map(|slot| RowView::flat(resolve_slot(&self.storages, slot)))
    }

    pub fn get_column(&self, name: &str) -> &Value {
        let Some(slot) = self.current_slot() else {
            return &NULL_VALUE;
        };
        let Some(&idx) = self.col_indices.get(name) else {
            return &NULL_VALUE;
        };
        let row = resolve_slot(&self.storages, slot);
        debug_assert!(idx < row.len());
        row.values.get(idx).unwrap_or(&NULL_VALUE)
    }

    /// `tag.prop` columns materialized by upstream operators.
    pub fn get_tag_prop(&self, tag: &str, prop: &str) -> &Value {
        self.get_column(&format!("{tag}.{prop}"))
    }

    pub fn get_edge_prop(&self, edge: &str, prop: &str) -> &Value {
        self.get_column(&format!("{edge}.{prop}"))
    }

    pub fn col_names(&self) -> &[String] {
        &self.col_names
    }

    pub fn col_indices(&self) -> &HashMap<String, usize> {
        &self.col_indices
    }

    pub fn backing(&self) -> Option<&Arc<Value>> {
        if self.storages.len() == 1 {
            self.storages.first()
        } else {
            None
        }
    }

    pub(crate) fn storages(&self) -> &[Arc<Value>] {
        &self.storages
    }

    pub(crate) fn current_slot(&self) -> Option<RowSlot> {
        self.rows.get(self.cursor).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::super::Iter;
    use super::*;
    use crate::value::{DataSet, Row};

    fn number_dataset(n: i64) -> Arc<Value> {
        let mut ds = DataSet::new(["col1", "col2"]);
        for i in 0..n {
            ds.push(Row::from(vec![Value::Int(i), Value::string(i.to_string())]));
        }
        Arc::new(Value::dataset(ds))
    }

    #[test]
    fn test_round_trip() {
        let iter = Iter::Sequential(SequentialIter::new(number_dataset(10)));
        assert_eq!(iter.size(), 10);
        let mut iter = iter;
        let mut i = 0i64;
        while iter.valid() {
            assert_eq!(*iter.get_column("col1"), Value::Int(i));
            assert_eq!(*iter.get_column("col2"), Value::string(i.to_string()));
            i += 1;
            iter.next();
        }
        assert_eq!(i, 10);
    }

    #[test]
    fn test_copy_of_copy() {
        let iter = Iter::Sequential(SequentialIter::new(number_dataset(10)));
        let copy = iter.copy().copy();
        assert_eq!(copy.size(), 10);
        let mut copy = copy;
        let mut i = 0i64;
        while copy.valid() {
            assert_eq!(*copy.get_column("col1"), Value::Int(i));
            i += 1;
            copy.next();
        }
    }

    #[test]
    fn test_erase_even_rows() {
        let mut iter = Iter::Sequential(SequentialIter::new(number_dataset(10)));
        while iter.valid() {
            if iter.get_column("col1").as_int().unwrap() % 2 == 0 {
                iter.erase();
            } else {
                iter.next();
            }
        }
        iter.reset(0);
        let mut remaining = Vec::new();
        while iter.valid() {
            remaining.push(iter.get_column("col1").as_int().unwrap());
            iter.next();
        }
        assert_eq!(remaining, vec![1, 3, 5, 7, 9]);
    }

    #[test]
    fn test_unstable_erase_breaks_order() {
        let mut iter = Iter::Sequential(SequentialIter::new(number_dataset(3)));
        iter.unstable_erase();
        assert_eq!(iter.size(), 2);
        let mut remaining = Vec::new();
        while iter.valid() {
            remaining.push(iter.get_column("col1").as_int().unwrap());
            iter.next();
        }
        assert_eq!(remaining, vec![2, 1]);
    }

    #[test]
    fn test_erase_range_clamps() {
        // past-the-end clamps
        let mut iter = Iter::Sequential(SequentialIter::new(number_dataset(10)));
        iter.erase_range(5, 11);
        assert_eq!(iter.size(), 5);
        let mut remaining = Vec::new();
        while iter.valid() {
            remaining.push(iter.get_column("col1").as_int().unwrap());
            iter.next();
        }
        assert_eq!(remaining, vec![0, 1, 2, 3, 4]);

        // whole range
        let mut iter = Iter::Sequential(SequentialIter::new(number_dataset(10)));
        iter.erase_range(0, 10);
        assert_eq!(iter.size(), 0);

        // prefix
        let mut iter = Iter::Sequential(SequentialIter::new(number_dataset(10)));
        iter.erase_range(0, 5);
        assert_eq!(iter.size(), 5);
        assert_eq!(*iter.get_column("col1"), Value::Int(5));

        // degenerate ranges are no-ops
        let mut iter = Iter::Sequential(SequentialIter::new(number_dataset(10)));
        iter.erase_range(5, 5);
        iter.erase_range(7, 2);
        iter.erase_range(10, 12);
        assert_eq!(iter.size(), 10);
    }

    #[test]
    fn test_column_by_modular_index() {
        let iter = Iter::Sequential(SequentialIter::new(number_dataset(3)));
        assert_eq!(*iter.get_column_by_index(0), Value::Int(0));
        assert_eq!(*iter.get_column_by_index(1), Value::string("0"));
        assert_eq!(*iter.get_column_by_index(-1), Value::string("0"));
        assert!(iter.get_column_by_index(2).is_bad_null());
        assert!(iter.get_column_by_index(-2).is_bad_null());
    }

    #[test]
    fn test_unknown_column_is_null() {
        let iter = Iter::Sequential(SequentialIter::new(number_dataset(1)));
        let v = iter.get_column("nope");
        assert!(v.is_null() && !v.is_bad_null());
    }

    #[test]
    fn test_union_keeps_left_columns() {
        let left = SequentialIter::new(number_dataset(2));
        let right = SequentialIter::new(number_dataset(3));
        let union = Iter::Sequential(SequentialIter::union(left, right));
        assert_eq!(union.size(), 5);
        let mut union = union;
        let mut seen = Vec::new();
        while union.valid() {
            seen.push(union.get_column("col1").as_int().unwrap());
            union.next();
        }
        assert_eq!(seen, vec![0, 1, 0, 1, 2]);
    }

    #[test]
    fn test_reset_replays_suffix() {
        let mut iter = Iter::Sequential(SequentialIter::new(number_dataset(10)));
        iter.reset(7);
        let mut seen = Vec::new();
        while iter.valid() {
            seen.push(iter.get_column("col1").as_int().unwrap());
            iter.next();
        }
        assert_eq!(seen, vec![7, 8, 9]);
    }
}
