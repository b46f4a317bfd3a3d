//! Property iterator: rows whose columns encode `tag.prop` pairs or edge
//! key triples, with vertex/edge reconstruction.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use super::{dataset_of, resolve_slot, RowSlot, RowView};
use crate::value::data::{COL_DST, COL_RANK, COL_SRC, COL_TYPE, COL_VID};
use crate::value::{Edge, List, Row, Tag, Value, Vertex, NULL_VALUE};

/// Per-name (tag or edge) property layout: property name to column index.
type PropMap = HashMap<String, usize>;

/// Cursor over a property-response dataset.
///
/// Column names of the form `name.prop` are grouped under `name`; the
/// reserved `_src`/`_type`/`_rank`/`_dst` props mark an edge group.
#[derive(Debug, Clone)]
pub struct PropIter {
    storage: Arc<Value>,
    rows: Vec<RowSlot>,
    cursor: usize,
    col_names: Vec<String>,
    col_indices: HashMap<String, usize>,
    /// Insertion-ordered groups; lookup goes through `group_pos`
    groups: Vec<(String, PropMap)>,
    group_pos: HashMap<String, usize>,
}

impl PropIter {
    pub fn new(value: Arc<Value>) -> PropIter {
        let mut iter = PropIter {
            storage: Arc::clone(&value),
            rows: Vec::new(),
            cursor: 0,
            col_names: Vec::new(),
            col_indices: HashMap::new(),
            groups: Vec::new(),
            group_pos: HashMap::new(),
        };
        let Some(ds) = dataset_of(&value) else {
            debug_assert!(false, "property iterator over non-dataset value");
            return iter;
        };
        iter.rows = (0..ds.rows.len()).map(|row| RowSlot { storage: 0, row }).collect();
        iter.col_names = ds.col_names.clone();
        let mut groups: Vec<(String, PropMap)> = Vec::new();
        let mut group_pos: HashMap<String, usize> = HashMap::new();
        for (idx, name) in ds.col_names.iter().enumerate() {
            iter.col_indices.insert(name.clone(), idx);
            if let Some((group, prop)) = name.split_once('.') {
                let pos = *group_pos.entry(group.to_string()).or_insert_with(|| {
                    groups.push((group.to_string(), PropMap::new()));
                    groups.len() - 1
                });
                groups[pos].1.insert(prop.to_string(), idx);
            }
        }
        iter.groups = groups;
        iter.group_pos = group_pos;
        iter
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
            .map(|slot| RowView::flat(resolve_slot(std::slice::from_ref(&self.storage), slot)))
    }

    fn current_row(&self) -> Option<&Row> {
        self.current_slot()
            .map(|slot| resolve_slot(std::slice::from_ref(&self.storage), slot))
    }

    pub fn get_column(&self, name: &str) -> &Value {
        let Some(row) = self.current_row() else {
            return &NULL_VALUE;
        };
        match self.col_indices.get(name) {
            Some(&idx) => row.values.get(idx).unwrap_or(&NULL_VALUE),
            None => &NULL_VALUE,
        }
    }

    /// Property of a named tag or edge group at the cursor.
    pub fn get_prop(&self, name: &str, prop: &str) -> &Value {
        let Some(row) = self.current_row() else {
            return &NULL_VALUE;
        };
        let Some(&pos) = self.group_pos.get(name) else {
            return &NULL_VALUE;
        };
        match self.groups[pos].1.get(prop) {
            Some(&idx) => row.values.get(idx).unwrap_or(&NULL_VALUE),
            None => &NULL_VALUE,
        }
    }

    /// Rebuild the vertex of the current row by grouping `tag.*` columns
    /// under their tag. Tags come out in reverse insertion order of the
    /// header.
    pub fn get_vertex(&self) -> Value {
        let Some(row) = self.current_row() else {
            return Value::Empty;
        };
        let vid = match self.col_indices.get(COL_VID) {
            Some(&idx) => row.values[idx].clone(),
            None => return Value::Empty,
        };
        let mut tags = Vec::new();
        for (name, props) in self.groups.iter().rev() {
            // Groups carrying an edge key are not tags
            if props.contains_key(COL_SRC) {
                continue;
            }
            let mut tag_props = BTreeMap::new();
            for (prop, &idx) in props {
                let val = &row.values[idx];
                if val.is_empty() {
                    continue;
                }
                tag_props.insert(prop.clone(), val.clone());
            }
            if tag_props.is_empty() {
                continue;
            }
            tags.push(Tag::new(name.clone(), tag_props));
        }
        Value::Vertex(Box::new(Vertex::new(vid, tags)))
    }

    /// Rebuild the edge of the current row from the reserved
    /// `_src`/`_type`/`_rank`/`_dst` props plus the group's property
    /// columns.
    pub fn get_edge(&self) -> Value {
        let Some(row) = self.current_row() else {
            return Value::Empty;
        };
        for (name, props) in &self.groups {
            let Some(&src_idx) = props.get(COL_SRC) else {
                continue;
            };
            let etype = props
                .get(COL_TYPE)
                .and_then(|&i| row.values[i].as_int())
                .unwrap_or_default();
            let ranking = props
                .get(COL_RANK)
                .and_then(|&i| row.values[i].as_int())
                .unwrap_or_default();
            let dst = props
                .get(COL_DST)
                .map(|&i| row.values[i].clone())
                .unwrap_or_default();
            let mut edge_props = BTreeMap::new();
            for (prop, &idx) in props {
                if prop.starts_with('_') {
                    continue;
                }
                let val = &row.values[idx];
                if val.is_empty() {
                    continue;
                }
                edge_props.insert(prop.clone(), val.clone());
            }
            return Value::Edge(Box::new(Edge {
                src: row.values[src_idx].clone(),
                dst,
                etype,
                name: name.clone(),
                ranking,
                props: edge_props,
            }));
        }
        Value::Empty
    }

    pub fn get_vertices(&mut self) -> List {
        self.reset(0);
        let mut out = Vec::new();
        while self.valid() {
            out.push(self.get_vertex());
            self.next();
        }
        self.reset(0);
        List::new(out)
    }

    pub fn get_edges(&mut self) -> List {
        self.reset(0);
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        while self.valid() {
            let edge = self.get_edge();
            if let Value::Edge(e) = &edge {
                if seen.insert((e.src.clone(), e.etype, e.ranking, e.dst.clone())) {
                    out.push(edge);
                }
            }
            self.next();
        }
        self.reset(0);
        List::new(out)
    }

    pub fn col_names(&self) -> &[String] {
        &self.col_names
    }

    pub fn col_indices(&self) -> &HashMap<String, usize> {
        &self.col_indices
    }

    pub fn backing(&self) -> &Arc<Value> {
        &self.storage
    }

    pub(crate) fn storages(&self) -> &[Arc<Value>] {
        std::slice::from_ref(&self.storage)
    }

    pub(crate) fn current_slot(&self) -> Option<RowSlot> {
        self.rows.get(self.cursor).copied()
    }
}
