//! Join iterator: cartesian-concatenated rows of two parent iterators
//! without copying their storage.
//!
//! Each join row is a list of segment slots borrowed from the parents'
//! backing values; column lookups go through maps built once at
//! construction. On a column-name collision between the two inputs the
//! later (right) binding wins; callers pre-rename when they need both.

use std::collections::HashMap;
use std::sync::Arc;

use super::{resolve_slot, Iter, RowSlot, RowView};
use crate::error::{Status, StatusResult};
use crate::value::{Value, NULL_VALUE};

/// One published join row: its segments, rebased onto the join iterator's
/// storage list.
#[derive(Debug, Clone)]
pub(crate) struct JoinRow {
    segs: Vec<RowSlot>,
}

#[derive(Debug, Clone)]
pub struct JoinIter {
    storages: Vec<Arc<Value>>,
    col_names: Vec<String>,
    rows: Vec<JoinRow>,
    cursor: usize,
    /// column name -> (segment, column within segment)
    col_indices: HashMap<String, (usize, usize)>,
    /// output position -> (segment, column within segment)
    col_idx_indices: HashMap<usize, (usize, usize)>,
    seg_count: usize,
    lhs_storage_count: usize,
}

impl JoinIter {
    /// Build the output index over two input iterators. Only row-bearing
    /// kinds (sequential, property, join) can participate.
    pub fn with_inputs(col_names: Vec<String>, lhs: &Iter, rhs: &Iter) -> StatusResult<JoinIter> {
        let mut iter = JoinIter {
            storages: Vec::new(),
            col_names,
            rows: Vec::new(),
            cursor: 0,
            col_indices: HashMap::new(),
            col_idx_indices: HashMap::new(),
            seg_count: 0,
            lhs_storage_count: 0,
        };
        let mut out_idx = 0;
        iter.append_input(lhs, &mut out_idx)?;
        iter.lhs_storage_count = iter.storages.len();
        iter.append_input(rhs, &mut out_idx)?;
        debug_assert_eq!(out_idx, iter.col_names.len());
        Ok(iter)
    }

    fn append_input(&mut self, input: &Iter, out_idx: &mut usize) -> StatusResult<()> {
        let seg_base = self.seg_count;
        match input {
            Iter::Sequential(_) | Iter::Prop(_) => {
                for (pos, name) in input.col_names().iter().enumerate() {
                    self.col_indices.insert(name.clone(), (seg_base, pos));
                    self.col_idx_indices.insert(*out_idx, (seg_base, pos));
                    *out_idx += 1;
                }
                self.seg_count += 1;
            }
            Iter::Join(j) => {
                for pos in 0..j.col_names.len() {
                    let &(seg, inner) = j
                        .col_idx_indices
                        .get(&pos)
                        .expect("join input missing positional mapping");
                    let name = &j.col_names[pos];
                    self.col_indices
                        .insert(name.clone(), (seg_base + seg, inner));
                    self.col_idx_indices
                        .insert(*out_idx, (seg_base + seg, inner));
                    *out_idx += 1;
                }
                self.seg_count += j.seg_count;
            }
            other => {
                return Err(Status::Internal(format!(
                    "cannot join over a {:?} iterator",
                    other.kind()
                )));
            }
        }
        self.storages.extend_from_slice(input.storages());
        Ok(())
    }

    /// Rebase slots of the left input onto this iterator's storage list.
    pub(crate) fn rebase_lhs(&self, slots: &[RowSlot]) -> Vec<RowSlot> {
        slots.to_vec()
    }

    /// Rebase slots of the right input onto this iterator's storage list.
    pub(crate) fn rebase_rhs(&self, slots: &[RowSlot]) -> Vec<RowSlot> {
        slots
            .iter()
            .map(|s| RowSlot {
                storage: s.storage + self.lhs_storage_count,
                row: s.row,
            })
            .collect()
    }

    /// Append one joined row; segments must already be rebased.
    pub(crate) fn add_row(&mut self, segs: Vec<RowSlot>) {
        debug_assert_eq!(segs.len(), self.seg_count);
        self.rows.push(JoinRow { segs });
    }

    pub fn reserve(&mut self, n: usize) {
        self.rows.reserve(n);
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
        let row = self.rows.get(self.cursor)?;
        let segments = row
            .segs
            .iter()
            .map(|&slot| resolve_slot(&self.storages, slot))
            .collect();
        Some(RowView::mapped(
            segments,
            self.col_names.len(),
            &self.col_idx_indices,
        ))
    }

    pub fn get_column(&self, name: &str) -> &Value {
        let Some(row) = self.rows.get(self.cursor) else {
            return &NULL_VALUE;
        };
        let Some(&(seg, inner)) = self.col_indices.get(name) else {
            return &NULL_VALUE;
        };
        debug_assert!(seg < row.segs.len());
        let seg_row = resolve_slot(&self.storages, row.segs[seg]);
        debug_assert!(inner < seg_row.len());
        seg_row.values.get(inner).unwrap_or(&NULL_VALUE)
    }

    pub fn col_names(&self) -> &[String] {
        &self.col_names
    }

    pub fn col_indices(&self) -> &HashMap<String, (usize, usize)> {
        &self.col_indices
    }

    pub fn col_idx_indices(&self) -> &HashMap<usize, (usize, usize)> {
        &self.col_idx_indices
    }

    pub(crate) fn storages(&self) -> &[Arc<Value>] {
        &self.storages
    }

    pub(crate) fn current_segments(&self) -> Option<&[RowSlot]> {
        self.rows.get(self.cursor).map(|r| r.segs.as_slice())
    }
}
