//! Schema catalog: spaces, tag schemas, and edge schemas.
//!
//! A read-mostly snapshot of the metadata service, resolved by name or id.
//! Property iterators and request builders consult it for column layouts
//! and vid-type checks.

use std::collections::HashMap;

use crate::error::{Status, StatusResult};
use crate::value::Value;

/// Vertex-id type of a space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VidType {
    Int64,
    FixedString(usize),
}

/// One graph space.
#[derive(Debug, Clone)]
pub struct SpaceInfo {
    pub id: i64,
    pub name: String,
    pub vid_type: VidType,
    pub partition_num: i32,
}

impl SpaceInfo {
    /// Whether a value is usable as a vertex id in this space.
    pub fn is_valid_vid(&self, value: &Value) -> bool {
        match self.vid_type {
            VidType::Int64 => value.is_int(),
            VidType::FixedString(max) => {
                value.as_str().map(|s| s.len() <= max).unwrap_or(false)
            }
        }
    }
}

/// Column of a tag or edge schema.
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub name: String,
    pub type_name: String,
    pub nullable: bool,
    pub default: Option<Value>,
    pub ttl_seconds: Option<u64>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> ColumnDef {
        ColumnDef {
            name: name.into(),
            type_name: type_name.into(),
            nullable: true,
            default: None,
            ttl_seconds: None,
        }
    }
}

/// Property schema of a tag or an edge type.
#[derive(Debug, Clone)]
pub struct PropSchema {
    pub id: i64,
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

impl PropSchema {
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// In-memory catalog keyed by space.
#[derive(Debug, Default)]
pub struct SchemaCatalog {
    spaces: HashMap<String, SpaceInfo>,
    /// (space id, tag name) -> schema
    tags: HashMap<(i64, String), PropSchema>,
    /// (space id, edge name) -> schema
    edges: HashMap<(i64, String), PropSchema>,
}

impl SchemaCatalog {
    pub fn new() -> SchemaCatalog {
        SchemaCatalog::default()
    }

    pub fn add_space(&mut self, space: SpaceInfo) {
        self.spaces.insert(space.name.clone(), space);
    }

    pub fn add_tag(&mut self, space_id: i64, schema: PropSchema) {
        self.tags.insert((space_id, schema.name.clone()), schema);
    }

    pub fn add_edge(&mut self, space_id: i64, schema: PropSchema) {
        self.edges.insert((space_id, schema.name.clone()), schema);
    }

    pub fn space_id_by_name(&self, name: &str) -> StatusResult<i64> {
        self.spaces
            .get(name)
            .map(|s| s.id)
            .ok_or_else(|| Status::SchemaNotFound(format!("space `{name}`")))
    }

    pub fn space_by_name(&self, name: &str) -> StatusResult<&SpaceInfo> {
        self.spaces
            .get(name)
            .ok_or_else(|| Status::SchemaNotFound(format!("space `{name}`")))
    }

    pub fn tag_id_by_name(&self, space: i64, tag: &str) -> StatusResult<i64> {
        self.get_tag_schema(space, tag).map(|s| s.id)
    }

    pub fn edge_type_by_name(&self, space: i64, edge: &str) -> StatusResult<i64> {
        self.get_edge_schema(space, edge).map(|s| s.id)
    }

    pub fn get_tag_schema(&self, space: i64, tag: &str) -> StatusResult<&PropSchema> {
        self.tags
            .get(&(space, tag.to_string()))
            .ok_or_else(|| Status::SchemaNotFound(format!("tag `{tag}`")))
    }

    pub fn get_edge_schema(&self, space: i64, edge: &str) -> StatusResult<&PropSchema> {
        self.edges
            .get(&(space, edge.to_string()))
            .ok_or_else(|| Status::SchemaNotFound(format!("edge `{edge}`")))
    }
}
