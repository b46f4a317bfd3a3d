//! Neighbors iterator: cursor over the edges of a neighbor-expansion
//! response.
//!
//! The backing value is a list of datasets, one per storage partition
//! group, each with the wire header convention:
//!
//! ```text
//! | _vid | _stats | _tag:<tag>:<p1>:<p2>... | _edge:<±><name>:<p1>:...:_dst:_type:_rank | _expr |
//! ```
//!
//! Tag columns hold one property list per row; edge columns hold a list of
//! edge rows. The cursor flattens datasets x rows x edge-columns x edges
//! into a single traversal. Erasure flips a kept/dropped bit instead of
//! mutating the rows, so both erase flavors collapse into the stable one.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use crate::value::data::{
    COL_DST, COL_EXPR, COL_RANK, COL_STATS, COL_TYPE, COL_VID, EDGE_COL_PREFIX, TAG_COL_PREFIX,
};
use crate::value::{Edge, List, Row, Tag, Value, Vertex, EMPTY, NULL_BAD_TYPE, NULL_VALUE};

/// Layout of one `_tag:`/`_edge:` column: where it lives and how its
/// property list is ordered.
#[derive(Debug, Clone)]
struct PropIndex {
    col_idx: usize,
    prop_list: Vec<String>,
    prop_indices: HashMap<String, usize>,
}

impl PropIndex {
    fn new(col_idx: usize, props: &[&str]) -> PropIndex {
        let prop_list: Vec<String> = props
            .iter()
            .filter(|p| !p.is_empty())
            .map(|p| p.to_string())
            .collect();
        let prop_indices = prop_list
            .iter()
            .enumerate()
            .map(|(i, p)| (p.clone(), i))
            .collect();
        PropIndex {
            col_idx,
            prop_list,
            prop_indices,
        }
    }
}

/// Parsed header of one response dataset.
#[derive(Debug, Clone, Default)]
struct DataSetIndex {
    col_indices: HashMap<String, usize>,
    /// edge column -> edge name with the direction sign stripped
    edge_names: HashMap<usize, String>,
    edge_inbound: HashMap<usize, bool>,
    edge_cols: Vec<usize>,
    /// insertion-ordered so vertex reconstruction is deterministic
    tag_groups: Vec<(String, PropIndex)>,
    tag_pos: HashMap<String, usize>,
    edge_props: HashMap<String, PropIndex>,
}

impl DataSetIndex {
    fn build(col_names: &[String]) -> Option<DataSetIndex> {
        let mut index = DataSetIndex::default();
        for (idx, name) in col_names.iter().enumerate() {
            index.col_indices.insert(name.clone(), idx);
            if let Some(rest) = name.strip_prefix(TAG_COL_PREFIX) {
                let parts: Vec<&str> = rest.split(':').collect();
                let tag = parts[0].to_string();
                index
                    .tag_groups
                    .push((tag.clone(), PropIndex::new(idx, &parts[1..])));
                index.tag_pos.insert(tag, index.tag_groups.len() - 1);
            } else if let Some(rest) = name.strip_prefix(EDGE_COL_PREFIX) {
                let parts: Vec<&str> = rest.split(':').collect();
                let signed = parts[0];
                let inbound = match signed.chars().next() {
                    Some('+') => false,
                    Some('-') => true,
                    _ => return None,
                };
                let edge = signed[1..].to_string();
                index
                    .edge_props
                    .insert(edge.clone(), PropIndex::new(idx, &parts[1..]));
                index.edge_names.insert(idx, edge);
                index.edge_inbound.insert(idx, inbound);
                index.edge_cols.push(idx);
            }
        }
        for required in [COL_VID, COL_STATS, COL_EXPR] {
            if !index.col_indices.contains_key(required) {
                return None;
            }
        }
        Some(index)
    }
}

/// One cursor position: dataset, row, edge column, edge offset.
#[derive(Debug, Clone, Copy)]
struct EdgePos {
    ds: usize,
    row: usize,
    col: usize,
    edge: usize,
}

#[derive(Debug, Clone)]
pub struct NeighborsIter {
    value: Arc<Value>,
    ds_indices: Vec<DataSetIndex>,
    positions: Vec<EdgePos>,
    kept: Vec<bool>,
    cursor: usize,
    /// Header validation outcome; a malformed header makes the iterator
    /// permanently invalid.
    header_ok: bool,
}

impl NeighborsIter {
    pub fn new(value: Arc<Value>) -> NeighborsIter {
        let mut iter = NeighborsIter {
            value: Arc::clone(&value),
            ds_indices: Vec::new(),
            positions: Vec::new(),
            kept: Vec::new(),
            cursor: 0,
            header_ok: false,
        };
        let Value::List(datasets) = &*value else {
            tracing::warn!(
                got = value.type_name(),
                "neighbors iterator expects a list of datasets"
            );
            return iter;
        };
        for ds_val in &datasets.values {
            let Value::DataSet(ds) = ds_val else {
                return iter;
            };
            match DataSetIndex::build(&ds.col_names) {
                Some(index) => iter.ds_indices.push(index),
                None => {
                    tracing::warn!(header = ?ds.col_names, "malformed neighbor response header");
                    iter.ds_indices.clear();
                    return iter;
                }
            }
        }
        iter.header_ok = true;
        for (ds_idx, ds_val) in datasets.values.iter().enumerate() {
            let Value::DataSet(ds) = ds_val else {
                unreachable!();
            };
            let index = &iter.ds_indices[ds_idx];
            for (row_idx, row) in ds.rows.iter().enumerate() {
                for &col in &index.edge_cols {
                    let Some(Value::List(edges)) = row.values.get(col) else {
                        continue;
                    };
                    for edge_idx in 0..edges.len() {
                        iter.positions.push(EdgePos {
                            ds: ds_idx,
                            row: row_idx,
                            col,
                            edge: edge_idx,
                        });
                    }
                }
            }
        }
        iter.kept = vec![true; iter.positions.len()];
        iter
    }

    pub fn valid(&self) -> bool {
        self.header_ok && self.cursor < self.positions.len()
    }

    pub fn next(&mut self) {
        if !self.valid() {
            return;
        }
        self.cursor += 1;
        while self.cursor < self.positions.len() && !self.kept[self.cursor] {
            self.cursor += 1;
        }
    }

    pub(super) fn reset(&mut self) {
        self.cursor = 0;
        while self.cursor < self.positions.len() && !self.kept[self.cursor] {
            self.cursor += 1;
        }
    }

    /// Drop the current edge from the view and advance.
    pub fn erase(&mut self) {
        if self.valid() {
            self.kept[self.cursor] = false;
            self.next();
        }
    }

    pub fn clear(&mut self) {
        self.header_ok = false;
        self.ds_indices.clear();
        self.positions.clear();
        self.kept.clear();
        self.cursor = 0;
    }

    fn current(&self) -> Option<(&DataSetIndex, &Row, EdgePos)> {
        if !self.valid() {
            return None;
        }
        let pos = self.positions[self.cursor];
        let Value::List(datasets) = &*self.value else {
            return None;
        };
        let Value::DataSet(ds) = &datasets.values[pos.ds] else {
            return None;
        };
        Some((&self.ds_indices[pos.ds], &ds.rows[pos.row], pos))
    }

    /// The edge row (a list of property values) at the cursor.
    fn current_edge_row(&self) -> Option<&List> {
        let (_, row, pos) = self.current()?;
        let Value::List(edges) = &row.values[pos.col] else {
            return None;
        };
        match &edges.values[pos.edge] {
            Value::List(edge_row) => Some(edge_row),
            _ => None,
        }
    }

    pub fn get_column(&self, name: &str) -> &Value {
        let Some((index, row, _)) = self.current() else {
            return &NULL_VALUE;
        };
        match index.col_indices.get(name) {
            Some(&idx) => row.values.get(idx).unwrap_or(&NULL_VALUE),
            None => &NULL_VALUE,
        }
    }

    pub fn get_column_by_index(&self, idx: i64) -> &Value {
        let Some((_, row, _)) = self.current() else {
            return &NULL_VALUE;
        };
        let width = row.len() as i64;
        if idx.unsigned_abs() >= width as u64 {
            return &NULL_BAD_TYPE;
        }
        &row.values[((width + idx) % width) as usize]
    }

    /// Tag property of the current row's source vertex; empty when the tag
    /// is not part of this dataset.
    pub fn get_tag_prop(&self, tag: &str, prop: &str) -> &Value {
        let Some((index, row, _)) = self.current() else {
            return &NULL_VALUE;
        };
        let Some(&pos) = index.tag_pos.get(tag) else {
            return &EMPTY;
        };
        let prop_index = &index.tag_groups[pos].1;
        let Some(Value::List(cell)) = row.values.get(prop_index.col_idx) else {
            return &EMPTY;
        };
        match prop_index.prop_indices.get(prop) {
            Some(&i) => cell.values.get(i).unwrap_or(&EMPTY),
            None => &EMPTY,
        }
    }

    /// Edge property of the current edge. `"*"` matches whatever edge the
    /// cursor is on.
    pub fn get_edge_prop(&self, edge: &str, prop: &str) -> &Value {
        let Some((index, _, pos)) = self.current() else {
            return &NULL_VALUE;
        };
        let Some(name) = index.edge_names.get(&pos.col) else {
            return &EMPTY;
        };
        if edge != "*" && edge != name {
            return &EMPTY;
        }
        let prop_index = &index.edge_props[name];
        let Some(edge_row) = self.current_edge_row() else {
            return &EMPTY;
        };
        match prop_index.prop_indices.get(prop) {
            Some(&i) => edge_row.values.get(i).unwrap_or(&EMPTY),
            None => &EMPTY,
        }
    }

    /// Synthesize the source vertex of the current row from its tag
    /// columns.
    pub fn get_vertex(&self) -> Value {
        let Some((index, row, _)) = self.current() else {
            return Value::Empty;
        };
        let Some(&vid_idx) = index.col_indices.get(COL_VID) else {
            return Value::Empty;
        };
        let mut tags = Vec::new();
        for (name, prop_index) in &index.tag_groups {
            let Some(Value::List(cell)) = row.values.get(prop_index.col_idx) else {
                continue;
            };
            let mut props = BTreeMap::new();
            for (i, prop) in prop_index.prop_list.iter().enumerate() {
                if let Some(v) = cell.values.get(i) {
                    props.insert(prop.clone(), v.clone());
                }
            }
            tags.push(Tag::new(name.clone(), props));
        }
        Value::Vertex(Box::new(Vertex::new(row.values[vid_idx].clone(), tags)))
    }

    /// Synthesize the current edge. Inbound edges are normalized: src and
    /// dst are swapped and the type is negated.
    pub fn get_edge(&self) -> Value {
        let Some((index, row, pos)) = self.current() else {
            return Value::Empty;
        };
        let Some(name) = index.edge_names.get(&pos.col) else {
            return Value::Empty;
        };
        let Some(edge_row) = self.current_edge_row() else {
            return Value::Empty;
        };
        let prop_index = &index.edge_props[name];
        let fetch = |key: &str| -> Value {
            prop_index
                .prop_indices
                .get(key)
                .and_then(|&i| edge_row.values.get(i))
                .cloned()
                .unwrap_or_default()
        };
        let vid_idx = index.col_indices[COL_VID];
        let vid = row.values[vid_idx].clone();
        let dst = fetch(COL_DST);
        let raw_type = fetch(COL_TYPE).as_int().unwrap_or_default();
        let ranking = fetch(COL_RANK).as_int().unwrap_or_default();
        let inbound = index.edge_inbound[&pos.col];
        let (src, dst, etype) = if inbound {
            (dst, vid, -raw_type)
        } else {
            (vid, dst, raw_type)
        };
        let mut props = BTreeMap::new();
        for (i, prop) in prop_index.prop_list.iter().enumerate() {
            if prop.starts_with('_') {
                continue;
            }
            if let Some(v) = edge_row.values.get(i) {
                props.insert(prop.clone(), v.clone());
            }
        }
        Value::Edge(Box::new(Edge {
            src,
            dst,
            etype,
            name: name.clone(),
            ranking,
            props,
        }))
    }

    /// All vertices reachable by the cursor, one per surviving edge
    /// position.
    pub fn get_vertices(&mut self) -> List {
        self.reset();
        let mut out = Vec::new();
        while self.valid() {
            out.push(self.get_vertex());
            self.next();
        }
        self.reset();
        List::new(out)
    }

    /// All surviving edges, deduplicated by (src, type, rank, dst).
    pub fn get_edges(&mut self) -> List {
        self.reset();
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
        self.reset();
        List::new(out)
    }

    pub fn backing(&self) -> &Arc<Value> {
        &self.value
    }
}
