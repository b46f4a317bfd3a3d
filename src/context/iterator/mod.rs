//! # Iterator Family
//!
//! Polymorphic cursors over the result shapes a plan node can publish:
//!
//! | Kind | Backing value | Rows |
//! |------|---------------|------|
//! | `Default` | any scalar | exactly one |
//! | `Sequential` | dataset | one logical row per dataset row |
//! | `Prop` | dataset with `tag.prop` / edge-key headers | like sequential |
//! | `Neighbors` | list of neighbor-response datasets | one per edge |
//! | `Join` | borrowed rows of two parent iterators | concatenated segments |
//!
//! Iterators share ownership of their backing [`Value`] through an `Arc` and
//! keep only row indices; erasure drops rows from the cursor's view without
//! touching the underlying storage. `copy()` yields a fresh iterator over the
//! same backing positioned at the beginning.

mod join;
mod neighbors;
mod prop;
mod sequential;

pub use join::JoinIter;
pub use neighbors::NeighborsIter;
pub use prop::PropIter;
pub use sequential::SequentialIter;

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::value::{DataSet, List, Row, Value, EMPTY, NULL_BAD_TYPE, NULL_VALUE};

/// Discriminates the iterator variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IterKind {
    Default,
    Sequential,
    Prop,
    Neighbors,
    Join,
}

/// A reference to one storage row: which backing value, which row in it.
///
/// Slots are only meaningful relative to the owning iterator's storage list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowSlot {
    pub(crate) storage: usize,
    pub(crate) row: usize,
}

/// Resolve a slot against a storage list.
pub(crate) fn resolve_slot<'a>(storages: &'a [Arc<Value>], slot: RowSlot) -> &'a Row {
    match &*storages[slot.storage] {
        Value::DataSet(ds) => &ds.rows[slot.row],
        other => unreachable!("row slot into non-dataset storage: {}", other.type_name()),
    }
}

pub(crate) fn dataset_of(value: &Value) -> Option<&DataSet> {
    match value {
        Value::DataSet(ds) => Some(ds),
        _ => None,
    }
}

/// Zero-copy view over the current logical row.
///
/// Segments borrow rows from the iterator's backing storage; the view never
/// outlives the iterator it came from. Indexing is total: positions past the
/// end resolve to the empty sentinel.
#[derive(Debug, Clone)]
pub struct RowView<'a> {
    segments: Vec<&'a Row>,
    layout: RowLayout<'a>,
}

#[derive(Debug, Clone, Copy)]
enum RowLayout<'a> {
    /// Single segment, positional indexing
    Flat,
    /// Concatenated segments indexed through a shared column map
    Mapped {
        width: usize,
        index: &'a HashMap<usize, (usize, usize)>,
    },
}

impl<'a> RowView<'a> {
    pub(crate) fn flat(row: &'a Row) -> RowView<'a> {
        RowView {
            segments: vec![row],
            layout: RowLayout::Flat,
        }
    }

    pub(crate) fn mapped(
        segments: Vec<&'a Row>,
        width: usize,
        index: &'a HashMap<usize, (usize, usize)>,
    ) -> RowView<'a> {
        RowView {
            segments,
            layout: RowLayout::Mapped { width, index },
        }
    }

    /// Number of addressable columns.
    pub fn width(&self) -> usize {
        match self.layout {
            RowLayout::Flat => self.segments[0].len(),
            RowLayout::Mapped { width, .. } => width,
        }
    }

    /// Total indexing: out-of-range positions yield the empty sentinel,
    /// unmapped in-range positions the null sentinel.
    pub fn get(&self, idx: usize) -> &'a Value {
        match self.layout {
            RowLayout::Flat => self.segments[0].values.get(idx).unwrap_or(&EMPTY),
            RowLayout::Mapped { width, index } => {
                if idx >= width {
                    return &EMPTY;
                }
                match index.get(&idx) {
                    Some(&(seg, inner)) => {
                        debug_assert!(seg < self.segments.len());
                        self.segments[seg].values.get(inner).unwrap_or(&EMPTY)
                    }
                    None => &NULL_VALUE,
                }
            }
        }
    }

    pub fn segments(&self) -> &[&'a Row] {
        &self.segments
    }

    /// Materialize the view into an owned row, in declared column order.
    pub fn to_row(&self) -> Row {
        Row::new((0..self.width()).map(|i| self.get(i).clone()).collect())
    }
}

/// Two views are equal when their segment sequences are equal pairwise by
/// value.
impl PartialEq for RowView<'_> {
    fn eq(&self, other: &RowView<'_>) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(other.segments.iter())
                .all(|(a, b)| a == b)
    }
}

impl Eq for RowView<'_> {}

/// Segment hashes are combined with xor; symmetric, but `==` is the source
/// of truth so collisions are harmless.
impl Hash for RowView<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut combined = 0u64;
        for seg in &self.segments {
            let mut h = std::collections::hash_map::DefaultHasher::new();
            seg.hash(&mut h);
            combined ^= h.finish();
        }
        state.write_u64(combined);
    }
}

/// Modular positional lookup shared by every row-bearing iterator:
/// `-1` addresses the last column, `|idx| >= width` is a bad-type null.
pub(crate) fn column_by_index<'a>(row: Option<RowView<'a>>, idx: i64) -> &'a Value {
    let Some(row) = row else {
        return &NULL_VALUE;
    };
    let width = row.width() as i64;
    if idx.unsigned_abs() >= width as u64 {
        return &NULL_BAD_TYPE;
    }
    row.get(((width + idx) % width) as usize)
}

/// Wraps a single scalar value; one logical element, no rows.
///
/// `row()`, `get_column()`, and the graph accessors are contract violations
/// on this kind.
#[derive(Debug, Clone)]
pub struct DefaultIter {
    value: Arc<Value>,
    counter: i64,
}

impl DefaultIter {
    pub fn new(value: Arc<Value>) -> DefaultIter {
        DefaultIter { value, counter: 0 }
    }

    pub fn valid(&self) -> bool {
        self.counter <= 0
    }

    pub fn next(&mut self) {
        self.counter += 1;
    }

    pub fn erase(&mut self) {
        self.counter -= 1;
    }

    pub fn size(&self) -> usize {
        1
    }

    fn reset(&mut self, pos: usize) {
        debug_assert!(pos < self.size());
        self.counter = pos as i64;
    }

    pub fn value(&self) -> &Arc<Value> {
        &self.value
    }
}

/// The polymorphic cursor.
#[derive(Debug, Clone)]
pub enum Iter {
    Default(DefaultIter),
    Sequential(SequentialIter),
    Prop(PropIter),
    Neighbors(NeighborsIter),
    Join(JoinIter),
}

impl Iter {
    /// Default-kind iterator over a scalar.
    pub fn default_kind(value: Arc<Value>) -> Iter {
        Iter::Default(DefaultIter::new(value))
    }

    pub fn kind(&self) -> IterKind {
        match self {
            Iter::Default(_) => IterKind::Default,
            Iter::Sequential(_) => IterKind::Sequential,
            Iter::Prop(_) => IterKind::Prop,
            Iter::Neighbors(_) => IterKind::Neighbors,
            Iter::Join(_) => IterKind::Join,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Iter::Default(_))
    }

    pub fn valid(&self) -> bool {
        match self {
            Iter::Default(it) => it.valid(),
            Iter::Sequential(it) => it.valid(),
            Iter::Prop(it) => it.valid(),
            Iter::Neighbors(it) => it.valid(),
            Iter::Join(it) => it.valid(),
        }
    }

    /// Advance the cursor; no-op at the end.
    pub fn next(&mut self) {
        match self {
            Iter::Default(it) => it.next(),
            Iter::Sequential(it) => it.next(),
            Iter::Prop(it) => it.next(),
            Iter::Neighbors(it) => it.next(),
            Iter::Join(it) => it.next(),
        }
    }

    /// Number of elements under the cursor. Always 0 for the neighbors
    /// iterator, which is not random-access; drive it with
    /// `valid()`/`next()` instead.
    pub fn size(&self) -> usize {
        match self {
            Iter::Default(it) => it.size(),
            Iter::Sequential(it) => it.size(),
            Iter::Prop(it) => it.size(),
            Iter::Neighbors(_) => 0,
            Iter::Join(it) => it.size(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Seek to `pos` from the beginning. `pos` must satisfy
    /// `0 <= pos < size()`, or both may be zero.
    pub fn reset(&mut self, pos: usize) {
        debug_assert!(
            (pos == 0 && self.size() == 0) || pos < self.size() || matches!(self, Iter::Neighbors(_)),
            "reset past the end: pos={pos}, size={}",
            self.size()
        );
        match self {
            Iter::Default(it) => it.reset(pos),
            Iter::Sequential(it) => it.reset(pos),
            Iter::Prop(it) => it.reset(pos),
            Iter::Neighbors(it) => it.reset(),
            Iter::Join(it) => it.reset(pos),
        }
    }

    /// Fresh iterator over the same backing, positioned at the beginning.
    pub fn copy(&self) -> Iter {
        let mut copy = self.clone();
        copy.reset(0);
        copy
    }

    /// Remove the element at the cursor; the cursor moves to the next
    /// element and the remaining order is preserved.
    pub fn erase(&mut self) {
        match self {
            Iter::Default(it) => it.erase(),
            Iter::Sequential(it) => it.erase(),
            Iter::Prop(it) => it.erase(),
            Iter::Neighbors(it) => it.erase(),
            Iter::Join(it) => it.erase(),
        }
    }

    /// O(1) removal that swaps the current element with the last one and
    /// pops. Breaks the original order. The neighbors iterator erases via a
    /// kept/dropped bitmap, so its unstable erase degrades to the stable
    /// one.
    pub fn unstable_erase(&mut self) {
        match self {
            Iter::Default(it) => it.erase(),
            Iter::Sequential(it) => it.unstable_erase(),
            Iter::Prop(it) => it.unstable_erase(),
            Iter::Neighbors(it) => it.erase(),
            Iter::Join(it) => it.unstable_erase(),
        }
    }

    /// Erase `[first, last)`. `first >= last` or `first >= size` is a no-op;
    /// `last > size` clamps to the end. The cursor is reset to the
    /// beginning afterwards. Unsupported on the neighbors iterator.
    pub fn erase_range(&mut self, first: usize, last: usize) {
        match self {
            Iter::Default(_) => {}
            Iter::Sequential(it) => it.erase_range(first, last),
            Iter::Prop(it) => it.erase_range(first, last),
            Iter::Neighbors(_) => {
                debug_assert!(false, "erase_range on a neighbors iterator");
            }
            Iter::Join(it) => it.erase_range(first, last),
        }
    }

    /// Empty the collection; the cursor ends up at the end.
    pub fn clear(&mut self) {
        match self {
            Iter::Default(it) => it.reset(0),
            Iter::Sequential(it) => it.clear(),
            Iter::Prop(it) => it.clear(),
            Iter::Neighbors(it) => it.clear(),
            Iter::Join(it) => it.clear(),
        }
    }

    /// Current logical row, if the cursor is valid. Contract violation on
    /// the default and neighbors kinds.
    pub fn row(&self) -> Option<RowView<'_>> {
        match self {
            Iter::Default(_) => {
                debug_assert!(false, "row() on a default iterator");
                None
            }
            Iter::Sequential(it) => it.row(),
            Iter::Prop(it) => it.row(),
            Iter::Neighbors(_) => {
                debug_assert!(false, "row() on a neighbors iterator");
                None
            }
            Iter::Join(it) => it.row(),
        }
    }

    /// Column by name at the cursor; unknown names resolve to the null
    /// sentinel.
    pub fn get_column(&self, name: &str) -> &Value {
        match self {
            Iter::Default(_) => {
                debug_assert!(false, "get_column() on a default iterator");
                &EMPTY
            }
            Iter::Sequential(it) => it.get_column(name),
            Iter::Prop(it) => it.get_column(name),
            Iter::Neighbors(it) => it.get_column(name),
            Iter::Join(it) => it.get_column(name),
        }
    }

    /// Column by signed index; `-1` is the last column, `|idx| >= width`
    /// yields the bad-type sentinel.
    pub fn get_column_by_index(&self, idx: i64) -> &Value {
        match self {
            Iter::Default(_) => {
                debug_assert!(false, "get_column_by_index() on a default iterator");
                &EMPTY
            }
            Iter::Sequential(it) => column_by_index(it.row(), idx),
            Iter::Prop(it) => column_by_index(it.row(), idx),
            Iter::Neighbors(it) => it.get_column_by_index(idx),
            Iter::Join(it) => column_by_index(it.row(), idx),
        }
    }

    /// Tag property at the cursor; kinds without tag context return empty.
    pub fn get_tag_prop(&self, tag: &str, prop: &str) -> &Value {
        match self {
            Iter::Default(_) => &EMPTY,
            Iter::Sequential(it) => it.get_tag_prop(tag, prop),
            Iter::Prop(it) => it.get_prop(tag, prop),
            Iter::Neighbors(it) => it.get_tag_prop(tag, prop),
            Iter::Join(_) => &EMPTY,
        }
    }

    /// Edge property at the cursor; kinds without edge context return
    /// empty.
    pub fn get_edge_prop(&self, edge: &str, prop: &str) -> &Value {
        match self {
            Iter::Default(_) => &EMPTY,
            Iter::Sequential(it) => it.get_edge_prop(edge, prop),
            Iter::Prop(it) => it.get_prop(edge, prop),
            Iter::Neighbors(it) => it.get_edge_prop(edge, prop),
            Iter::Join(_) => &EMPTY,
        }
    }

    /// Reconstruct the vertex at the cursor; empty on kinds without vertex
    /// context.
    pub fn get_vertex(&self) -> Value {
        match self {
            Iter::Prop(it) => it.get_vertex(),
            Iter::Neighbors(it) => it.get_vertex(),
            _ => Value::Empty,
        }
    }

    /// Reconstruct the edge at the cursor; empty on kinds without edge
    /// context.
    pub fn get_edge(&self) -> Value {
        match self {
            Iter::Prop(it) => it.get_edge(),
            Iter::Neighbors(it) => it.get_edge(),
            _ => Value::Empty,
        }
    }

    /// Batch vertex extraction for subgraph-style consumers.
    pub fn get_vertices(&mut self) -> List {
        match self {
            Iter::Prop(it) => it.get_vertices(),
            Iter::Neighbors(it) => it.get_vertices(),
            _ => List::default(),
        }
    }

    /// Batch edge extraction; deduplicated by (src, type, rank, dst).
    pub fn get_edges(&mut self) -> List {
        match self {
            Iter::Prop(it) => it.get_edges(),
            Iter::Neighbors(it) => it.get_edges(),
            _ => List::default(),
        }
    }

    /// Backing value, when the iterator has a single one.
    pub fn backing(&self) -> Option<&Arc<Value>> {
        match self {
            Iter::Default(it) => Some(it.value()),
            Iter::Sequential(it) => it.backing(),
            Iter::Prop(it) => Some(it.backing()),
            Iter::Neighbors(it) => Some(it.backing()),
            Iter::Join(_) => None,
        }
    }

    /// Ordered output column names, for kinds that have a header.
    pub fn col_names(&self) -> &[String] {
        match self {
            Iter::Default(_) | Iter::Neighbors(_) => &[],
            Iter::Sequential(it) => it.col_names(),
            Iter::Prop(it) => it.col_names(),
            Iter::Join(it) => it.col_names(),
        }
    }

    /// Storage list and current-row slots, for operators that assemble
    /// zero-copy rows (hash join).
    pub(crate) fn storages(&self) -> &[Arc<Value>] {
        match self {
            Iter::Sequential(it) => it.storages(),
            Iter::Prop(it) => it.storages(),
            Iter::Join(it) => it.storages(),
            _ => &[],
        }
    }

    pub(crate) fn current_slots(&self) -> Option<Vec<RowSlot>> {
        match self {
            Iter::Sequential(it) => it.current_slot().map(|s| vec![s]),
            Iter::Prop(it) => it.current_slot().map(|s| vec![s]),
            Iter::Join(it) => it.current_segments().map(<[RowSlot]>::to_vec),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_iter_single_element() {
        let constant = Arc::new(Value::Int(1));
        let mut iter = Iter::default_kind(Arc::clone(&constant));
        assert_eq!(iter.size(), 1);
        assert!(iter.valid());
        assert_eq!(iter.backing().map(|v| (**v).clone()), Some(Value::Int(1)));
        iter.next();
        assert!(!iter.valid());
        iter.next();
        assert!(!iter.valid());
    }

    #[test]
    fn test_default_iter_erase_revives() {
        let mut iter = Iter::default_kind(Arc::new(Value::Bool(true)));
        iter.next();
        assert!(!iter.valid());
        iter.erase();
        assert!(iter.valid());
    }

    #[test]
    fn test_default_iter_copy_resets() {
        let mut iter = Iter::default_kind(Arc::new(Value::Int(7)));
        iter.next();
        assert!(!iter.valid());
        assert!(iter.copy().valid());
    }

    #[test]
    fn test_row_view_xor_hash_symmetric() {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let r1 = Row::from(vec![Value::Int(1)]);
        let r2 = Row::from(vec![Value::Int(2)]);
        let idx = HashMap::new();
        let a = RowView::mapped(vec![&r1, &r2], 2, &idx);
        let b = RowView::mapped(vec![&r2, &r1], 2, &idx);

        let mut ha = DefaultHasher::new();
        a.hash(&mut ha);
        let mut hb = DefaultHasher::new();
        b.hash(&mut hb);
        assert_eq!(ha.finish(), hb.finish());
        // Equality still distinguishes segment order
        assert_ne!(a, b);
    }
}
