//! Leaf executors backed by storage RPCs: neighbor expansion, bounded
//! variable-length expansion, and property fetches.

use std::collections::HashSet;
use std::time::Instant;

use crate::context::iterator::NeighborsIter;
use crate::context::{ExecResult, IterKind, QueryContext, QueryExpressionContext, ResultState};
use crate::error::{Status, StatusResult};
use crate::expr::Expression;
use crate::plan::{GetNeighborsNode, GetPropsNode, PlanNode};
use crate::storage::{GetNeighborsRequest, GetPropsRequest, StorageRpcResponse};
use crate::value::data::{COL_DST, COL_VID};
use crate::value::{DataSet, Row, Value};

use super::finish;

/// Map an RPC's completeness onto a result state.
///
/// Full completeness is a success; partial completeness either degrades to
/// a partial-success state (raising the query-global flag) or fails with
/// the first partition's error, depending on configuration. Zero
/// completeness always fails.
pub(crate) fn handle_completeness<T>(
    qctx: &QueryContext,
    node_name: &str,
    resp: &StorageRpcResponse<T>,
) -> StatusResult<ResultState> {
    let completeness = resp.completeness();
    if completeness == 100 {
        return Ok(ResultState::Success);
    }
    for (part, code) in resp.failed_parts() {
        tracing::error!(node = node_name, part = %part, code = %code, "storage partition failed");
    }
    if completeness == 0 || !qctx.accept_partial_success() {
        return match resp.failed_parts().iter().next() {
            Some((part, code)) => Err(Status::PartitionFailed(format!(
                "{node_name}: part {part}: {code}, completeness: {completeness}"
            ))),
            None => Err(Status::StorageRpcFailed(format!(
                "{node_name}: incomplete response without failed parts, completeness: {completeness}"
            ))),
        };
    }
    qctx.set_partial_success();
    Ok(ResultState::PartialSuccess)
}

/// Record the per-host `exec/total` latency breakdown of a response.
pub(crate) fn record_host_latency<T>(
    qctx: &QueryContext,
    label: &str,
    resp: &StorageRpcResponse<T>,
) {
    for (host, exec, total) in resp.host_latency() {
        qctx.add_stat(
            label,
            format!("{host} exec/total"),
            format!("{exec}(us)/{total}(us)"),
        );
    }
}

/// Evaluate the source-id expression over the input rows into a request
/// dataset, dropping values that are not valid vids for the space.
fn build_request_dataset(
    qctx: &QueryContext,
    input_var: &str,
    src: &Expression,
    dedup: bool,
) -> DataSet {
    let mut iter = qctx.ectx().get_iter(input_var);
    let mut request = DataSet::new([COL_VID]);
    let mut unique = HashSet::new();
    while iter.valid() {
        let ctx = QueryExpressionContext::new(qctx.ectx()).with_iter(&iter);
        let vid = src.eval(&ctx);
        iter.next();
        if !qctx.space().is_valid_vid(&vid) {
            tracing::warn!(
                vid = %vid,
                space = %qctx.space().name,
                "skipping source id with mismatched vid type"
            );
            continue;
        }
        if dedup && !unique.insert(vid.clone()) {
            continue;
        }
        request.push(Row::from(vec![vid]));
    }
    request
}

fn neighbors_request(gn: &GetNeighborsNode, request_ds: DataSet) -> GetNeighborsRequest {
    GetNeighborsRequest {
        space: gn.space,
        col_names: request_ds.col_names,
        rows: request_ds.rows,
        edge_types: gn.edge_types.clone(),
        direction: gn.direction,
        stat_props: gn.stat_props.clone(),
        vertex_props: gn.vertex_props.clone(),
        edge_props: gn.edge_props.clone(),
        expressions: Vec::new(),
        dedup: gn.dedup,
        random: gn.random,
        order_by: gn.order_by.clone(),
        limit: gn.limit,
        filter: gn.filter.as_ref().map(ToString::to_string),
    }
}

fn response_datasets(resp: StorageRpcResponse<crate::storage::GetNeighborsResponse>) -> Vec<Value> {
    resp.into_responses()
        .into_iter()
        .filter_map(|r| r.vertices)
        .map(Value::dataset)
        .collect()
}

/// Publish an empty neighbors result for an empty request.
fn finish_empty_neighbors(qctx: &QueryContext, node: &PlanNode) -> StatusResult<()> {
    finish(
        qctx,
        node,
        ExecResult::builder()
            .value(Value::list(vec![]))
            .iter_kind(IterKind::Neighbors)
            .build(),
    )
}

/// One-step neighbor expansion over a batched id set.
pub(crate) struct GetNeighborsExecutor<'a> {
    qctx: &'a QueryContext,
    node: &'a PlanNode,
}

impl<'a> GetNeighborsExecutor<'a> {
    pub fn new(qctx: &'a QueryContext, node: &'a PlanNode) -> Self {
        GetNeighborsExecutor { qctx, node }
    }

    pub async fn execute(&self, gn: &GetNeighborsNode) -> StatusResult<()> {
        let request_ds = build_request_dataset(self.qctx, &gn.input_var, &gn.src, gn.dedup);
        if request_ds.rows.is_empty() {
            tracing::debug!(node = self.node.output_var(), "empty neighbor request");
            return finish_empty_neighbors(self.qctx, self.node);
        }

        let label = format!("{}_{}", self.node.name(), self.node.id());
        let rpc_started = Instant::now();
        let resp = self
            .qctx
            .storage()
            .get_neighbors(neighbors_request(gn, request_ds))
            .await;
        self.qctx.add_stat(
            &label,
            "total_rpc_time",
            format!("{}us", rpc_started.elapsed().as_micros()),
        );
        record_host_latency(self.qctx, &label, &resp);
        // a cancelled query discards the response
        self.qctx.deadline().check()?;

        let state = handle_completeness(self.qctx, self.node.name(), &resp)?;
        let datasets = response_datasets(resp);
        finish(
            self.qctx,
            self.node,
            ExecResult::builder()
                .value(Value::list(datasets))
                .state(state)
                .iter_kind(IterKind::Neighbors)
                .build(),
        )
    }
}

/// Bounded variable-length expansion: iterates one-step expansions,
/// feeding each step's distinct destination ids into the next step.
pub(crate) struct VarStepsNeighborsExecutor<'a> {
    qctx: &'a QueryContext,
    node: &'a PlanNode,
}

impl<'a> VarStepsNeighborsExecutor<'a> {
    pub fn new(qctx: &'a QueryContext, node: &'a PlanNode) -> Self {
        VarStepsNeighborsExecutor { qctx, node }
    }

    pub async fn execute(
        &self,
        gn: &GetNeighborsNode,
        steps: usize,
        collect_all: bool,
    ) -> StatusResult<()> {
        let label = format!("{}_{}", self.node.name(), self.node.id());
        let mut request_ds = build_request_dataset(self.qctx, &gn.input_var, &gn.src, gn.dedup);
        let mut collected: Vec<Value> = Vec::new();
        let mut last_step: Vec<Value> = Vec::new();
        let mut state = ResultState::Success;

        for step in 1..=steps {
            if request_ds.rows.is_empty() {
                tracing::debug!(node = self.node.output_var(), step, "expansion frontier empty");
                break;
            }
            self.qctx.deadline().check()?;

            let rpc_started = Instant::now();
            let resp = self
                .qctx
                .storage()
                .get_neighbors(neighbors_request(gn, request_ds.clone()))
                .await;
            self.qctx.add_stat(
                &label,
                format!("step{step}_rpc_time"),
                format!("{}us", rpc_started.elapsed().as_micros()),
            );
            record_host_latency(self.qctx, &label, &resp);
            self.qctx.deadline().check()?;

            // partial success at any step is preserved in the final state
            if handle_completeness(self.qctx, self.node.name(), &resp)?
                == ResultState::PartialSuccess
            {
                state = ResultState::PartialSuccess;
            }
            let datasets = response_datasets(resp);

            if step < steps {
                request_ds = next_frontier(&datasets);
            }
            if collect_all {
                collected.extend(datasets.clone());
            }
            last_step = datasets;
        }

        let published = if collect_all { collected } else { last_step };
        finish(
            self.qctx,
            self.node,
            ExecResult::builder()
                .value(Value::list(published))
                .state(state)
                .iter_kind(IterKind::Neighbors)
                .build(),
        )
    }
}

/// Distinct destination ids of one step's responses, as the next request
/// dataset.
fn next_frontier(datasets: &[Value]) -> DataSet {
    let mut iter = NeighborsIter::new(std::sync::Arc::new(Value::list(datasets.to_vec())));
    let mut frontier = DataSet::new([COL_VID]);
    let mut unique = HashSet::new();
    while iter.valid() {
        let dst = iter.get_edge_prop("*", COL_DST).clone();
        iter.next();
        if dst.is_empty() || dst.is_null() {
            continue;
        }
        if unique.insert(dst.clone()) {
            frontier.push(Row::from(vec![dst]));
        }
    }
    frontier
}

/// Property fetch for a batched id set, published behind a property
/// iterator.
pub(crate) struct GetPropsExecutor<'a> {
    qctx: &'a QueryContext,
    node: &'a PlanNode,
}

impl<'a> GetPropsExecutor<'a> {
    pub fn new(qctx: &'a QueryContext, node: &'a PlanNode) -> Self {
        GetPropsExecutor { qctx, node }
    }

    pub async fn execute(&self, gp: &GetPropsNode) -> StatusResult<()> {
        let request_ds = build_request_dataset(self.qctx, &gp.input_var, &gp.src, gp.dedup);
        if request_ds.rows.is_empty() {
            return finish(
                self.qctx,
                self.node,
                ExecResult::builder()
                    .value(Value::dataset(DataSet::default()))
                    .iter_kind(IterKind::Prop)
                    .build(),
            );
        }

        let label = format!("{}_{}", self.node.name(), self.node.id());
        let rpc_started = Instant::now();
        let resp = self
            .qctx
            .storage()
            .get_props(GetPropsRequest {
                space: gp.space,
                rows: request_ds.rows,
                vertex_props: gp.vertex_props.clone(),
                edge_props: gp.edge_props.clone(),
                expressions: Vec::new(),
                dedup: gp.dedup,
                order_by: Vec::new(),
                limit: gp.limit,
                filter: gp.filter.as_ref().map(ToString::to_string),
            })
            .await;
        self.qctx.add_stat(
            &label,
            "total_rpc_time",
            format!("{}us", rpc_started.elapsed().as_micros()),
        );
        record_host_latency(self.qctx, &label, &resp);
        self.qctx.deadline().check()?;

        let state = handle_completeness(self.qctx, self.node.name(), &resp)?;
        let merged = merge_prop_datasets(resp.into_responses().into_iter().filter_map(|r| r.props));
        finish(
            self.qctx,
            self.node,
            ExecResult::builder()
                .value(Value::dataset(merged))
                .state(state)
                .iter_kind(IterKind::Prop)
                .build(),
        )
    }
}

/// Concatenate per-partition property datasets; headers are identical by
/// construction.
fn merge_prop_datasets(datasets: impl Iterator<Item = DataSet>) -> DataSet {
    let mut merged = DataSet::default();
    for ds in datasets {
        if merged.col_names.is_empty() {
            merged.col_names = ds.col_names;
        } else {
            debug_assert_eq!(merged.col_names, ds.col_names);
        }
        merged.rows.extend(ds.rows);
    }
    merged
}
