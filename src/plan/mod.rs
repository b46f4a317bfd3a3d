//! Plan-node graph.
//!
//! Nodes live in an arena owned by the plan and refer to each other by
//! index; executors are looked up through the same indices. A node is an
//! immutable descriptor: kind, node-specific parameters, the variable it
//! publishes, and the ids it depends on. The graph is a DAG with a single
//! terminal root; control-flow nodes additionally point at the head of a
//! separate body subplan.

use serde_json::json;
use std::collections::HashSet;

use crate::expr::Expression;
use crate::storage::{EdgeDirection, OrderBy, PropRequest};

pub type NodeId = usize;

/// Parameters of a neighbor-expansion leaf.
#[derive(Debug, Clone)]
pub struct GetNeighborsNode {
    pub input_var: String,
    pub space: i64,
    pub src: Expression,
    pub edge_types: Vec<i64>,
    pub direction: EdgeDirection,
    pub stat_props: Vec<String>,
    pub vertex_props: Vec<PropRequest>,
    pub edge_props: Vec<PropRequest>,
    pub dedup: bool,
    pub random: bool,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<usize>,
    pub filter: Option<Expression>,
}

impl GetNeighborsNode {
    pub fn new(input_var: impl Into<String>, space: i64, src: Expression) -> GetNeighborsNode {
        GetNeighborsNode {
            input_var: input_var.into(),
            space,
            src,
            edge_types: Vec::new(),
            direction: EdgeDirection::OutEdge,
            stat_props: Vec::new(),
            vertex_props: Vec::new(),
            edge_props: Vec::new(),
            dedup: false,
            random: false,
            order_by: Vec::new(),
            limit: None,
            filter: None,
        }
    }
}

/// Parameters of a property-fetch leaf.
#[derive(Debug, Clone)]
pub struct GetPropsNode {
    pub input_var: String,
    pub space: i64,
    pub src: Expression,
    pub vertex_props: Vec<PropRequest>,
    pub edge_props: Vec<PropRequest>,
    pub dedup: bool,
    pub limit: Option<usize>,
    pub filter: Option<Expression>,
}

/// Node kinds with their parameters.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Leaf of a pure subplan; publishes an empty success result
    Start,
    Filter {
        input_var: String,
        condition: Expression,
        /// keep row order while erasing
        stable: bool,
    },
    Project {
        input_var: String,
        columns: Vec<(String, Expression)>,
    },
    Limit {
        input_var: String,
        offset: usize,
        count: usize,
    },
    HashJoin {
        left_var: String,
        right_var: String,
        hash_keys: Vec<Expression>,
        probe_keys: Vec<Expression>,
        col_names: Vec<String>,
    },
    Unwind {
        input_var: String,
        unwind_expr: Expression,
        alias: String,
    },
    GetNeighbors(GetNeighborsNode),
    GetProps(GetPropsNode),
    VarStepsNeighbors {
        base: GetNeighborsNode,
        steps: usize,
        /// publish the union of every step instead of only the last one
        collect_all: bool,
    },
    Loop {
        condition: Expression,
        body: NodeId,
        /// counter variable bumped before each body run
        loop_var: String,
    },
    Select {
        condition: Expression,
        then_body: NodeId,
        else_body: NodeId,
    },
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Start => "Start",
            NodeKind::Filter { .. } => "Filter",
            NodeKind::Project { .. } => "Project",
            NodeKind::Limit { .. } => "Limit",
            NodeKind::HashJoin { .. } => "HashJoin",
            NodeKind::Unwind { .. } => "Unwind",
            NodeKind::GetNeighbors(_) => "GetNeighbors",
            NodeKind::GetProps(_) => "GetProps",
            NodeKind::VarStepsNeighbors { .. } => "VarStepsNeighbors",
            NodeKind::Loop { .. } => "Loop",
            NodeKind::Select { .. } => "Select",
        }
    }

    /// Variables this node reads.
    pub fn input_vars(&self) -> Vec<&str> {
        match self {
            NodeKind::Start | NodeKind::Loop { .. } | NodeKind::Select { .. } => Vec::new(),
            NodeKind::Filter { input_var, .. }
            | NodeKind::Project { input_var, .. }
            | NodeKind::Limit { input_var, .. }
            | NodeKind::Unwind { input_var, .. } => vec![input_var],
            NodeKind::HashJoin {
                left_var,
                right_var,
                ..
            } => vec![left_var, right_var],
            NodeKind::GetNeighbors(gn) => vec![&gn.input_var],
            NodeKind::GetProps(gp) => vec![&gp.input_var],
            NodeKind::VarStepsNeighbors { base, .. } => vec![&base.input_var],
        }
    }
}

/// Immutable descriptor of one operation in the query DAG.
#[derive(Debug, Clone)]
pub struct PlanNode {
    id: NodeId,
    kind: NodeKind,
    output_var: String,
    deps: Vec<NodeId>,
}

impl PlanNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn output_var(&self) -> &str {
        &self.output_var
    }

    pub fn deps(&self) -> &[NodeId] {
        &self.deps
    }

    /// Structured single-node description; arrays render as JSON.
    pub fn explain(&self) -> serde_json::Value {
        let params = match &self.kind {
            NodeKind::Start => json!({}),
            NodeKind::Filter {
                input_var,
                condition,
                stable,
            } => json!({
                "condition": condition.to_string(),
                "inputVar": input_var,
                "isStable": stable,
            }),
            NodeKind::Project { input_var, columns } => json!({
                "inputVar": input_var,
                "columns": columns
                    .iter()
                    .map(|(name, e)| json!({"name": name, "expr": e.to_string()}))
                    .collect::<Vec<_>>(),
            }),
            NodeKind::Limit {
                input_var,
                offset,
                count,
            } => json!({
                "inputVar": input_var,
                "offset": offset,
                "count": count,
            }),
            NodeKind::HashJoin {
                left_var,
                right_var,
                hash_keys,
                probe_keys,
                col_names,
            } => json!({
                "leftVar": left_var,
                "rightVar": right_var,
                "hashKeys": hash_keys.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "probeKeys": probe_keys.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "colNames": col_names,
            }),
            NodeKind::Unwind {
                input_var,
                unwind_expr,
                alias,
            } => json!({
                "inputVar": input_var,
                "unwindExpr": unwind_expr.to_string(),
                "alias": alias,
            }),
            NodeKind::GetNeighbors(gn) => Self::explain_neighbors(gn),
            NodeKind::GetProps(gp) => json!({
                "inputVar": gp.input_var,
                "space": gp.space,
                "src": gp.src.to_string(),
                "vertexProps": gp.vertex_props,
                "edgeProps": gp.edge_props,
                "dedup": gp.dedup,
                "limit": gp.limit,
            }),
            NodeKind::VarStepsNeighbors {
                base,
                steps,
                collect_all,
            } => {
                let mut params = Self::explain_neighbors(base);
                params["steps"] = json!(steps);
                params["collectAll"] = json!(collect_all);
                params
            }
            NodeKind::Loop {
                condition,
                body,
                loop_var,
            } => json!({
                "condition": condition.to_string(),
                "loopBody": body,
                "loopVar": loop_var,
            }),
            NodeKind::Select {
                condition,
                then_body,
                else_body,
            } => json!({
                "condition": condition.to_string(),
                "thenBody": then_body,
                "elseBody": else_body,
            }),
        };
        json!({
            "id": self.id,
            "name": self.name(),
            "outputVar": self.output_var,
            "inputVars": self.kind.input_vars(),
            "dependencies": self.deps,
            "params": params,
        })
    }

    fn explain_neighbors(gn: &GetNeighborsNode) -> serde_json::Value {
        json!({
            "inputVar": gn.input_var,
            "space": gn.space,
            "src": gn.src.to_string(),
            "edgeTypes": gn.edge_types,
            "direction": gn.direction,
            "statProps": gn.stat_props,
            "vertexProps": gn.vertex_props,
            "edgeProps": gn.edge_props,
            "dedup": gn.dedup,
            "random": gn.random,
            "orderBy": gn.order_by,
            "limit": gn.limit,
            "filter": gn.filter.as_ref().map(ToString::to_string),
        })
    }
}

/// Arena of plan nodes plus the terminal root.
#[derive(Debug, Default)]
pub struct ExecutionPlan {
    nodes: Vec<PlanNode>,
    root: Option<NodeId>,
}

impl ExecutionPlan {
    pub fn new() -> ExecutionPlan {
        ExecutionPlan::default()
    }

    /// Add a node depending on `deps`; the output variable defaults to
    /// `__<Kind>_<id>`.
    pub fn add_node(&mut self, kind: NodeKind, deps: Vec<NodeId>) -> NodeId {
        let id = self.nodes.len();
        debug_assert!(deps.iter().all(|&d| d < id), "dependency on a later node");
        let output_var = format!("__{}_{id}", kind.name());
        self.nodes.push(PlanNode {
            id,
            kind,
            output_var,
            deps,
        });
        id
    }

    /// Add a loop node; its counter variable is derived from the node id.
    pub fn add_loop(&mut self, condition: Expression, body: NodeId, deps: Vec<NodeId>) -> NodeId {
        let id = self.nodes.len();
        self.add_node(
            NodeKind::Loop {
                condition,
                body,
                loop_var: format!("__loop_{id}"),
            },
            deps,
        )
    }

    pub fn set_output_var(&mut self, id: NodeId, var: impl Into<String>) {
        self.nodes[id].output_var = var.into();
    }

    pub fn set_root(&mut self, id: NodeId) {
        debug_assert!(id < self.nodes.len());
        self.root = Some(id);
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &PlanNode {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ids of every node reachable from `head` through dependency edges,
    /// including `head` itself.
    pub fn reachable_from(&self, head: NodeId) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        let mut stack = vec![head];
        let mut out = Vec::new();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            out.push(id);
            stack.extend(self.nodes[id].deps.iter().copied());
        }
        out
    }

    /// Structured description of the whole plan, root first.
    pub fn explain(&self) -> serde_json::Value {
        let mut nodes: Vec<serde_json::Value> =
            self.nodes.iter().map(PlanNode::explain).collect();
        nodes.reverse();
        json!({
            "root": self.root,
            "nodes": nodes,
        })
    }
}
