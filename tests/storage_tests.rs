//! Storage-backed leaf executors against the in-memory mock client:
//! neighbor expansion, partial success handling, bounded multi-step
//! expansion, and property fetches.

use std::collections::BTreeMap;
use std::sync::Arc;

use graphflow::plan::GetPropsNode;
use graphflow::value::data::{COL_EXPR, COL_STATS, COL_VID};
use graphflow::{
    DataSet, ErrorCode, ExecutionConfig, ExecutionPlan, Expression, GetNeighborsNode,
    GetNeighborsResponse, GetPropsResponse, MockStorageClient, NodeKind, QueryContext,
    ResultState, Row, Scheduler, SchemaCatalog, SpaceInfo, Status, StorageRpcResponse, Value,
    VidType,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

fn test_qctx(storage: Arc<MockStorageClient>, accept_partial: bool) -> Arc<QueryContext> {
    init_tracing();
    let space = SpaceInfo {
        id: 1,
        name: "test".to_string(),
        vid_type: VidType::FixedString(64),
        partition_num: 10,
    };
    let mut catalog = SchemaCatalog::new();
    catalog.add_space(space.clone());
    let config = ExecutionConfig {
        timeout_ms: 0,
        accept_partial_success: accept_partial,
        ..ExecutionConfig::default()
    };
    Arc::new(QueryContext::new(storage, Arc::new(catalog), space, &config))
}

fn vid_dataset(vids: &[&str]) -> DataSet {
    let mut ds = DataSet::new(["vid"]);
    for vid in vids {
        ds.push(Row::from(vec![Value::string(*vid)]));
    }
    ds
}

fn edge_row(dst: &str, etype: i64, rank: i64) -> Value {
    Value::list(vec![Value::string(dst), Value::Int(etype), Value::Int(rank)])
}

/// One neighbor response dataset: each (vid, dsts) pair becomes a row with
/// outbound `know` edges.
fn neighbors_dataset(rows: &[(&str, &[&str])]) -> DataSet {
    let mut ds = DataSet::new([
        COL_VID,
        COL_STATS,
        "_edge:+know:_dst:_type:_rank",
        COL_EXPR,
    ]);
    for (vid, dsts) in rows {
        let edges: Vec<Value> = dsts
            .iter()
            .enumerate()
            .map(|(rank, dst)| edge_row(dst, 5, rank as i64))
            .collect();
        ds.push(Row::from(vec![
            Value::string(*vid),
            Value::Empty,
            Value::list(edges),
            Value::Empty,
        ]));
    }
    ds
}

fn neighbors_ok(rows: &[(&str, &[&str])]) -> StorageRpcResponse<GetNeighborsResponse> {
    StorageRpcResponse::ok(vec![GetNeighborsResponse {
        vertices: Some(neighbors_dataset(rows)),
    }])
}

/// Plan: Start (seeded with vids) -> GetNeighbors.
fn expand_plan(
    qctx: &QueryContext,
    vids: &[&str],
    dedup: bool,
) -> (ExecutionPlan, String) {
    let mut plan = ExecutionPlan::new();
    let start = plan.add_node(NodeKind::Start, vec![]);
    let input_var = plan.node(start).output_var().to_string();
    qctx.ectx().set_value(&input_var, Value::dataset(vid_dataset(vids)));

    let mut gn = GetNeighborsNode::new(input_var, 1, Expression::input_prop("vid"));
    gn.dedup = dedup;
    let expand = plan.add_node(NodeKind::GetNeighbors(gn), vec![start]);
    let out = plan.node(expand).output_var().to_string();
    plan.set_root(expand);
    (plan, out)
}

fn count_edges(qctx: &QueryContext, var: &str) -> usize {
    let mut iter = qctx.ectx().get_iter(var);
    let mut count = 0;
    while iter.valid() {
        count += 1;
        iter.next();
    }
    count
}

#[tokio::test]
async fn test_get_neighbors_round_trip() {
    let storage = Arc::new(MockStorageClient::new());
    storage.push_neighbors_response(neighbors_ok(&[("a", &["b", "c"]), ("b", &["c"])]));
    let qctx = test_qctx(Arc::clone(&storage), false);

    let (plan, out) = expand_plan(&qctx, &["a", "b"], false);
    Scheduler::new(Arc::clone(&qctx), Arc::new(plan))
        .execute()
        .await
        .unwrap();

    assert_eq!(count_edges(&qctx, &out), 3);
    assert_eq!(qctx.ectx().get_result(&out).state(), ResultState::Success);
    assert!(!qctx.is_partial_success());

    let requests = storage.neighbors_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].rows.len(), 2);
    assert_eq!(requests[0].col_names, vec![COL_VID.to_string()]);
}

#[tokio::test]
async fn test_get_neighbors_dedups_and_skips_bad_vids() {
    let storage = Arc::new(MockStorageClient::new());
    storage.push_neighbors_response(neighbors_ok(&[("a", &["b"])]));
    let qctx = test_qctx(Arc::clone(&storage), false);

    // duplicate vids plus one value of the wrong type
    let mut ds = vid_dataset(&["a", "a", "b"]);
    ds.push(Row::from(vec![Value::Int(42)]));
    let mut plan = ExecutionPlan::new();
    let start = plan.add_node(NodeKind::Start, vec![]);
    let input_var = plan.node(start).output_var().to_string();
    qctx.ectx().set_value(&input_var, Value::dataset(ds));
    let mut gn = GetNeighborsNode::new(input_var, 1, Expression::input_prop("vid"));
    gn.dedup = true;
    let expand = plan.add_node(NodeKind::GetNeighbors(gn), vec![start]);
    plan.set_root(expand);

    Scheduler::new(Arc::clone(&qctx), Arc::new(plan))
        .execute()
        .await
        .unwrap();

    let requests = storage.neighbors_requests();
    assert_eq!(requests[0].rows.len(), 2);
}

#[tokio::test]
async fn test_get_neighbors_empty_input_skips_rpc() {
    let storage = Arc::new(MockStorageClient::new());
    let qctx = test_qctx(Arc::clone(&storage), false);

    let (plan, out) = expand_plan(&qctx, &[], false);
    Scheduler::new(Arc::clone(&qctx), Arc::new(plan))
        .execute()
        .await
        .unwrap();

    assert_eq!(count_edges(&qctx, &out), 0);
    assert!(storage.neighbors_requests().is_empty());
}

#[tokio::test]
async fn test_partial_success_accepted() {
    let storage = Arc::new(MockStorageClient::new());
    let mut failed = BTreeMap::new();
    failed.insert(3, ErrorCode::LeaderChanged);
    failed.insert(7, ErrorCode::PartNotFound);
    storage.push_neighbors_response(StorageRpcResponse::partial(
        60,
        failed,
        vec![GetNeighborsResponse {
            vertices: Some(neighbors_dataset(&[("a", &["b"])])),
        }],
    ));
    let qctx = test_qctx(Arc::clone(&storage), true);

    let (plan, out) = expand_plan(&qctx, &["a"], false);
    Scheduler::new(Arc::clone(&qctx), Arc::new(plan))
        .execute()
        .await
        .unwrap();

    // rows from the responding partitions are still produced
    assert_eq!(count_edges(&qctx, &out), 1);
    assert_eq!(
        qctx.ectx().get_result(&out).state(),
        ResultState::PartialSuccess
    );
    assert!(qctx.is_partial_success());
}

#[tokio::test]
async fn test_partial_success_rejected() {
    let storage = Arc::new(MockStorageClient::new());
    let mut failed = BTreeMap::new();
    failed.insert(3, ErrorCode::LeaderChanged);
    storage.push_neighbors_response(StorageRpcResponse::partial(
        60,
        failed,
        vec![GetNeighborsResponse {
            vertices: Some(neighbors_dataset(&[("a", &["b"])])),
        }],
    ));
    let qctx = test_qctx(Arc::clone(&storage), false);

    let (plan, out) = expand_plan(&qctx, &["a"], false);
    let err = Scheduler::new(Arc::clone(&qctx), Arc::new(plan))
        .execute()
        .await
        .unwrap_err();

    match err {
        Status::PartitionFailed(msg) => {
            assert!(msg.contains("part 3"), "missing partition in {msg}");
            assert!(msg.contains("E_LEADER_CHANGED"), "missing code in {msg}");
        }
        other => panic!("expected partition failure, got {other:?}"),
    }
    assert_eq!(qctx.ectx().num_versions(&out), 0);
    assert!(!qctx.is_partial_success());
}

#[tokio::test]
async fn test_zero_completeness_fails_even_when_partial_accepted() {
    let storage = Arc::new(MockStorageClient::new());
    let mut failed = BTreeMap::new();
    failed.insert(1, ErrorCode::RpcFailure);
    storage.push_neighbors_response(StorageRpcResponse::partial(0, failed, vec![]));
    let qctx = test_qctx(Arc::clone(&storage), true);

    let (plan, _) = expand_plan(&qctx, &["a"], false);
    let err = Scheduler::new(Arc::clone(&qctx), Arc::new(plan))
        .execute()
        .await
        .unwrap_err();
    assert!(matches!(err, Status::PartitionFailed(_)));
}

#[tokio::test]
async fn test_var_steps_feeds_frontier_forward() {
    let storage = Arc::new(MockStorageClient::new());
    // step 1: a -> {b, c}; step 2: b,c -> {d}
    storage.push_neighbors_response(neighbors_ok(&[("a", &["b", "c"])]));
    storage.push_neighbors_response(neighbors_ok(&[("b", &["d"]), ("c", &["d"])]));
    let qctx = test_qctx(Arc::clone(&storage), false);

    let mut plan = ExecutionPlan::new();
    let start = plan.add_node(NodeKind::Start, vec![]);
    let input_var = plan.node(start).output_var().to_string();
    qctx.ectx()
        .set_value(&input_var, Value::dataset(vid_dataset(&["a"])));
    let gn = GetNeighborsNode::new(input_var, 1, Expression::input_prop("vid"));
    let expand = plan.add_node(
        NodeKind::VarStepsNeighbors {
            base: gn,
            steps: 2,
            collect_all: false,
        },
        vec![start],
    );
    let out = plan.node(expand).output_var().to_string();
    plan.set_root(expand);

    Scheduler::new(Arc::clone(&qctx), Arc::new(plan))
        .execute()
        .await
        .unwrap();

    // only the last step is published without collect_all
    assert_eq!(count_edges(&qctx, &out), 2);

    let requests = storage.neighbors_requests();
    assert_eq!(requests.len(), 2);
    // second request carries the distinct dst ids of step one
    let step2: Vec<&Value> = requests[1]
        .rows
        .iter()
        .map(|r| &r.values[0])
        .collect();
    assert_eq!(step2, vec![&Value::string("b"), &Value::string("c")]);
}

#[tokio::test]
async fn test_var_steps_collect_all_unions_steps() {
    let storage = Arc::new(MockStorageClient::new());
    storage.push_neighbors_response(neighbors_ok(&[("a", &["b"])]));
    storage.push_neighbors_response(neighbors_ok(&[("b", &["c"])]));
    let qctx = test_qctx(Arc::clone(&storage), false);

    let mut plan = ExecutionPlan::new();
    let start = plan.add_node(NodeKind::Start, vec![]);
    let input_var = plan.node(start).output_var().to_string();
    qctx.ectx()
        .set_value(&input_var, Value::dataset(vid_dataset(&["a"])));
    let gn = GetNeighborsNode::new(input_var, 1, Expression::input_prop("vid"));
    let expand = plan.add_node(
        NodeKind::VarStepsNeighbors {
            base: gn,
            steps: 2,
            collect_all: true,
        },
        vec![start],
    );
    let out = plan.node(expand).output_var().to_string();
    plan.set_root(expand);

    Scheduler::new(Arc::clone(&qctx), Arc::new(plan))
        .execute()
        .await
        .unwrap();

    assert_eq!(count_edges(&qctx, &out), 2);
}

#[tokio::test]
async fn test_var_steps_partial_midway_is_preserved() {
    let storage = Arc::new(MockStorageClient::new());
    let mut failed = BTreeMap::new();
    failed.insert(2, ErrorCode::LeaderChanged);
    storage.push_neighbors_response(StorageRpcResponse::partial(
        80,
        failed,
        vec![GetNeighborsResponse {
            vertices: Some(neighbors_dataset(&[("a", &["b"])])),
        }],
    ));
    storage.push_neighbors_response(neighbors_ok(&[("b", &["c"])]));
    let qctx = test_qctx(Arc::clone(&storage), true);

    let mut plan = ExecutionPlan::new();
    let start = plan.add_node(NodeKind::Start, vec![]);
    let input_var = plan.node(start).output_var().to_string();
    qctx.ectx()
        .set_value(&input_var, Value::dataset(vid_dataset(&["a"])));
    let gn = GetNeighborsNode::new(input_var, 1, Expression::input_prop("vid"));
    let expand = plan.add_node(
        NodeKind::VarStepsNeighbors {
            base: gn,
            steps: 2,
            collect_all: false,
        },
        vec![start],
    );
    let out = plan.node(expand).output_var().to_string();
    plan.set_root(expand);

    Scheduler::new(Arc::clone(&qctx), Arc::new(plan))
        .execute()
        .await
        .unwrap();

    assert_eq!(
        qctx.ectx().get_result(&out).state(),
        ResultState::PartialSuccess
    );
    assert!(qctx.is_partial_success());
}

#[tokio::test]
async fn test_get_props_merges_partition_datasets() {
    let storage = Arc::new(MockStorageClient::new());
    let mut ds1 = DataSet::new([COL_VID, "person.name"]);
    ds1.push(Row::from(vec![Value::string("a"), Value::string("ann")]));
    let mut ds2 = DataSet::new([COL_VID, "person.name"]);
    ds2.push(Row::from(vec![Value::string("b"), Value::string("bob")]));
    storage.push_props_response(StorageRpcResponse::ok(vec![
        GetPropsResponse { props: Some(ds1) },
        GetPropsResponse { props: Some(ds2) },
    ]));
    let qctx = test_qctx(Arc::clone(&storage), false);

    let mut plan = ExecutionPlan::new();
    let start = plan.add_node(NodeKind::Start, vec![]);
    let input_var = plan.node(start).output_var().to_string();
    qctx.ectx()
        .set_value(&input_var, Value::dataset(vid_dataset(&["a", "b"])));
    let fetch = plan.add_node(
        NodeKind::GetProps(GetPropsNode {
            input_var,
            space: 1,
            src: Expression::input_prop("vid"),
            vertex_props: vec![],
            edge_props: vec![],
            dedup: true,
            limit: None,
            filter: None,
        }),
        vec![start],
    );
    let out = plan.node(fetch).output_var().to_string();
    plan.set_root(fetch);

    Scheduler::new(Arc::clone(&qctx), Arc::new(plan))
        .execute()
        .await
        .unwrap();

    let mut iter = qctx.ectx().get_iter(&out);
    assert_eq!(iter.size(), 2);
    let mut names = Vec::new();
    while iter.valid() {
        names.push(iter.get_tag_prop("person", "name").clone());
        iter.next();
    }
    assert_eq!(names, vec![Value::string("ann"), Value::string("bob")]);
}
