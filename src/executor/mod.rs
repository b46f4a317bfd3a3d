//! # Plan execution driver
//!
//! The scheduler walks the plan DAG once, manufactures one executor future
//! per node, and wires them together along dependency edges: every node
//! awaits the union of its dependencies' futures before running its own
//! body, and independent branches run in parallel on the task runner.
//!
//! A dependency failure skips the downstream body and republishes the
//! failing status wrapped with the downstream node's kind; cancellation
//! and timeouts pass through unwrapped so the root future resolves with
//! the right kind.
//!
//! Control-flow executors re-enter [`Scheduler::run_subplan`] for their
//! body subplans; each entry memoizes futures for exactly one pass, which
//! is what lets a loop run its body repeatedly while every executor body
//! still runs at most once per pass.

pub mod logic;
pub mod query;
pub mod storage_access;

use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::context::{ExecResult, QueryContext};
use crate::error::{Status, StatusResult};
use crate::plan::{ExecutionPlan, NodeId, NodeKind, PlanNode};

/// Rows scanned between cooperative yield points in long scans.
const YIELD_INTERVAL: usize = 1024;

/// Executes one plan against one query context.
#[derive(Clone)]
pub struct Scheduler {
    qctx: Arc<QueryContext>,
    plan: Arc<ExecutionPlan>,
}

type SharedStatus = Shared<BoxFuture<'static, Result<(), Status>>>;

impl Scheduler {
    pub fn new(qctx: Arc<QueryContext>, plan: Arc<ExecutionPlan>) -> Scheduler {
        Scheduler { qctx, plan }
    }

    pub fn qctx(&self) -> &Arc<QueryContext> {
        &self.qctx
    }

    pub fn plan(&self) -> &Arc<ExecutionPlan> {
        &self.plan
    }

    /// Run the whole plan; resolves once the root node has published.
    pub async fn execute(&self) -> StatusResult<()> {
        let root = self
            .plan
            .root()
            .ok_or_else(|| Status::Internal("plan has no root node".to_string()))?;
        self.run_subplan(root).await
    }

    /// Run the sub-DAG rooted at `root`. Each call is one pass: executor
    /// futures are memoized for the duration of the pass only, so
    /// control-flow nodes can re-enter the same subplan.
    pub(crate) fn run_subplan(&self, root: NodeId) -> BoxFuture<'static, StatusResult<()>> {
        let this = self.clone();
        async move {
            let mut order = this.plan.reachable_from(root);
            order.sort_unstable();

            let mut futures: HashMap<NodeId, SharedStatus> = HashMap::new();
            for id in order {
                let deps: Vec<SharedStatus> = this
                    .plan
                    .node(id)
                    .deps()
                    .iter()
                    .map(|dep| futures[dep].clone())
                    .collect();
                let node_name = this.plan.node(id).name();
                let runner = this.clone();
                let body = async move {
                    for dep in deps {
                        if let Err(status) = dep.await {
                            return Err(status.with_node(node_name));
                        }
                    }
                    runner.exec_node(id).await
                };
                let handle = tokio::spawn(body);
                let shared = async move {
                    match handle.await {
                        Ok(result) => result,
                        Err(join_err) => {
                            Err(Status::Internal(format!("executor task failed: {join_err}")))
                        }
                    }
                }
                .boxed()
                .shared();
                futures.insert(id, shared);
            }
            futures[&root].clone().await
        }
        .boxed()
    }

    /// Dispatch one node to its executor and record timing.
    async fn exec_node(&self, id: NodeId) -> StatusResult<()> {
        self.qctx.deadline().check()?;
        let node = self.plan.node(id);
        let label = format!("{}_{}", node.name(), node.id());
        tracing::debug!(node = %label, output = node.output_var(), "executing plan node");

        let started = Instant::now();
        let result = match node.kind() {
            NodeKind::Start => logic::StartExecutor::new(&self.qctx, node).execute().await,
            NodeKind::Filter {
                input_var,
                condition,
                stable,
            } => {
                query::FilterExecutor::new(&self.qctx, node)
                    .execute(input_var, condition, *stable)
                    .await
            }
            NodeKind::Project { input_var, columns } => {
                query::ProjectExecutor::new(&self.qctx, node)
                    .execute(input_var, columns)
                    .await
            }
            NodeKind::Limit {
                input_var,
                offset,
                count,
            } => {
                query::LimitExecutor::new(&self.qctx, node)
                    .execute(input_var, *offset, *count)
                    .await
            }
            NodeKind::HashJoin {
                left_var,
                right_var,
                hash_keys,
                probe_keys,
                col_names,
            } => {
                query::HashJoinExecutor::new(&self.qctx, node)
                    .execute(left_var, right_var, hash_keys, probe_keys, col_names)
                    .await
            }
            NodeKind::Unwind {
                input_var,
                unwind_expr,
                alias,
            } => {
                query::UnwindExecutor::new(&self.qctx, node)
                    .execute(input_var, unwind_expr, alias)
                    .await
            }
            NodeKind::GetNeighbors(gn) => {
                storage_access::GetNeighborsExecutor::new(&self.qctx, node)
                    .execute(gn)
                    .await
            }
            NodeKind::GetProps(gp) => {
                storage_access::GetPropsExecutor::new(&self.qctx, node)
                    .execute(gp)
                    .await
            }
            NodeKind::VarStepsNeighbors {
                base,
                steps,
                collect_all,
            } => {
                storage_access::VarStepsNeighborsExecutor::new(&self.qctx, node)
                    .execute(base, *steps, *collect_all)
                    .await
            }
            NodeKind::Loop {
                condition,
                body,
                loop_var,
            } => {
                logic::LoopExecutor::new(self, node)
                    .execute(condition, *body, loop_var)
                    .await
            }
            NodeKind::Select {
                condition,
                then_body,
                else_body,
            } => {
                logic::SelectExecutor::new(self, node)
                    .execute(condition, *then_body, *else_body)
                    .await
            }
        };

        self.qctx.add_stat(
            &label,
            "total",
            format!("{}us", started.elapsed().as_micros()),
        );
        if let Err(status) = &result {
            tracing::error!(node = %label, %status, "plan node failed");
        }
        result
    }
}

/// Publish a result under the node's output variable, charging the memory
/// budget first.
pub(crate) fn finish(qctx: &QueryContext, node: &PlanNode, result: ExecResult) -> StatusResult<()> {
    qctx.memory().charge(result.value().memory_usage())?;
    qctx.ectx().set_result(node.output_var(), result);
    Ok(())
}

/// Cooperative yield inside long scans: checks the deadline and gives the
/// runner a chance to schedule other executors.
pub(crate) async fn maybe_yield(qctx: &QueryContext, scanned: usize) -> StatusResult<()> {
    if scanned % YIELD_INTERVAL == 0 && scanned > 0 {
        qctx.deadline().check()?;
        tokio::task::yield_now().await;
    }
    Ok(())
}
