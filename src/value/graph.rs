//! Graph values: vertices, edges, and paths.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use super::Value;

/// A named property group on a vertex.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Tag {
    pub name: String,
    pub props: BTreeMap<String, Value>,
}

impl Tag {
    pub fn new(name: impl Into<String>, props: BTreeMap<String, Value>) -> Tag {
        Tag {
            name: name.into(),
            props,
        }
    }
}

/// A vertex: id plus its tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Vertex {
    pub vid: Value,
    pub tags: Vec<Tag>,
}

impl Vertex {
    pub fn new(vid: Value, tags: Vec<Tag>) -> Vertex {
        Vertex { vid, tags }
    }

    pub(crate) fn memory_usage(&self) -> usize {
        self.vid.memory_usage()
            + self
                .tags
                .iter()
                .flat_map(|t| t.props.values())
                .map(Value::memory_usage)
                .sum::<usize>()
    }
}

impl fmt::Display for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.vid)?;
        for tag in &self.tags {
            write!(f, " :{}", tag.name)?;
        }
        write!(f, ")")
    }
}

/// An edge between two vertices. `etype` is negative for the reversed view
/// of an edge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Edge {
    pub src: Value,
    pub dst: Value,
    pub etype: i64,
    pub name: String,
    pub ranking: i64,
    pub props: BTreeMap<String, Value>,
}

impl Edge {
    pub(crate) fn memory_usage(&self) -> usize {
        self.src.memory_usage()
            + self.dst.memory_usage()
            + self.name.len()
            + self.props.values().map(Value::memory_usage).sum::<usize>()
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({})-[:{}@{}]->({})",
            self.src, self.name, self.ranking, self.dst
        )
    }
}

/// A single expansion step on a path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Step {
    pub dst: Vertex,
    pub etype: i64,
    pub name: String,
    pub ranking: i64,
    pub props: BTreeMap<String, Value>,
}

/// A path: a head vertex plus alternating steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Path {
    pub src: Vertex,
    pub steps: Vec<Step>,
}

impl Path {
    pub(crate) fn memory_usage(&self) -> usize {
        self.src.memory_usage()
            + self
                .steps
                .iter()
                .map(|s| s.dst.memory_usage() + s.name.len())
                .sum::<usize>()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.src)?;
        for step in &self.steps {
            write!(f, "-[:{}@{}]->{}", step.name, step.ranking, step.dst)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_equality_ignores_prop_order() {
        let mut p1 = BTreeMap::new();
        p1.insert("a".to_string(), Value::Int(1));
        p1.insert("b".to_string(), Value::Int(2));
        let mut p2 = BTreeMap::new();
        p2.insert("b".to_string(), Value::Int(2));
        p2.insert("a".to_string(), Value::Int(1));

        let v1 = Vertex::new(Value::string("0"), vec![Tag::new("t", p1)]);
        let v2 = Vertex::new(Value::string("0"), vec![Tag::new("t", p2)]);
        assert_eq!(v1, v2);
    }

    #[test]
    fn test_edge_display() {
        let e = Edge {
            src: Value::string("1"),
            dst: Value::string("2"),
            etype: 3,
            name: "like".to_string(),
            ranking: 0,
            props: BTreeMap::new(),
        };
        assert_eq!(e.to_string(), "(\"1\")-[:like@0]->(\"2\")");
    }
}
