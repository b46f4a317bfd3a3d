//! # GraphFlow Query Engine
//!
//! The per-query execution substrate of a distributed property-graph
//! database: it takes an optimized dataflow plan and runs it against
//! remote storage and metadata services, gluing plan nodes to
//! heterogeneous tabular and graph results.
//!
//! ## Pipeline Architecture
//!
//! ```text
//! Optimized Plan (DAG of plan nodes)
//!     v
//! [Scheduler]            -> one executor future per node
//!     v
//! [Executors]            -> read inputs from ExecutionContext,
//!     |                     evaluate expressions row-by-row,
//!     |                     call storage for leaf operators
//!     v
//! [ExecutionContext]     -> named, versioned results
//!     v
//! Root result            -> encoded by the service shell
//! ```
//!
//! ## Subsystems
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `value` | Tagged value union: scalars, containers, graph values |
//! | `context` | Execution context, results, iterator family, expression scope |
//! | `expr` | Expression tree evaluated against the bound iterator |
//! | `plan` | Plan-node arena with explain output |
//! | `executor` | Scheduler, data operators, control flow, storage leaves |
//! | `storage` | Async storage client interface + in-memory mock |
//! | `schema` | Space/tag/edge schema catalog |
//! | `config` | Figment-based configuration |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use graphflow::{Config, ExecutionPlan, NodeKind, QueryContext, Scheduler};
//!
//! let config = Config::load()?;
//! let qctx = Arc::new(QueryContext::new(storage, schema, space, &config.execution));
//!
//! let mut plan = ExecutionPlan::new();
//! let start = plan.add_node(NodeKind::Start, vec![]);
//! // ... build the rest of the DAG ...
//! plan.set_root(start);
//!
//! Scheduler::new(qctx.clone(), Arc::new(plan)).execute().await?;
//! ```

pub mod config;
pub mod error;
pub mod value;

pub mod context;
pub mod expr;
pub mod plan;
pub mod schema;
pub mod storage;

pub mod executor;

// Re-export the types that make up the public surface.
pub use config::{Config, ExecutionConfig, LoggingConfig};
pub use error::{ErrorCode, Status, StatusResult};
pub use value::{DataSet, Edge, List, NullKind, Path, Row, Tag, Value, Vertex};

pub use context::{
    CancelHandle, ExecResult, ExecutionContext, Iter, IterKind, MemoryTracker, QueryContext,
    QueryDeadline, QueryExpressionContext, ResultState, RowView,
};
pub use expr::{BinaryOp, ExprKind, Expression, UnaryOp};
pub use plan::{ExecutionPlan, GetNeighborsNode, GetPropsNode, NodeId, NodeKind, PlanNode};
pub use schema::{ColumnDef, PropSchema, SchemaCatalog, SpaceInfo, VidType};
pub use storage::{
    EdgeDirection, GetNeighborsRequest, GetNeighborsResponse, GetPropsRequest, GetPropsResponse,
    MockStorageClient, StorageClient, StorageRpcResponse,
};

pub use executor::Scheduler;
