//! Storage client interface.
//!
//! The query layer talks to storage nodes through this async trait; every
//! call fans out to partitions and comes back as a
//! [`StorageRpcResponse`]: a completeness percentage, a per-partition
//! error map, per-host latency, and the payload datasets. Leaf executors
//! turn completeness into result states; nothing here interprets rows.

pub mod mock;

pub use mock::MockStorageClient;

use futures_util::future::BoxFuture;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::ErrorCode;
use crate::value::{DataSet, Row, Value};

/// Edge direction selector for neighbor expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum EdgeDirection {
    #[default]
    OutEdge,
    InEdge,
    Both,
}

/// The properties requested from one tag or edge type.
#[derive(Debug, Clone, Serialize)]
pub struct PropRequest {
    pub name: String,
    pub props: Vec<String>,
}

/// Ordering request applied storage-side.
#[derive(Debug, Clone, Serialize)]
pub struct OrderBy {
    pub prop: String,
    pub ascending: bool,
}

/// Parameters of a `get_neighbors` call.
#[derive(Debug, Clone, Default)]
pub struct GetNeighborsRequest {
    pub space: i64,
    pub col_names: Vec<String>,
    pub rows: Vec<Row>,
    pub edge_types: Vec<i64>,
    pub direction: EdgeDirection,
    pub stat_props: Vec<String>,
    pub vertex_props: Vec<PropRequest>,
    pub edge_props: Vec<PropRequest>,
    pub expressions: Vec<String>,
    pub dedup: bool,
    pub random: bool,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<usize>,
    pub filter: Option<String>,
}

/// Parameters of a `get_props` call.
#[derive(Debug, Clone, Default)]
pub struct GetPropsRequest {
    pub space: i64,
    pub rows: Vec<Row>,
    pub vertex_props: Vec<PropRequest>,
    pub edge_props: Vec<PropRequest>,
    pub expressions: Vec<String>,
    pub dedup: bool,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<usize>,
    pub filter: Option<String>,
}

/// Rows to insert or delete, preserialized by the mutation planner.
#[derive(Debug, Clone, Default)]
pub struct MutateRequest {
    pub space: i64,
    pub rows: Vec<Row>,
    pub overwritable: bool,
}

/// Payload of one neighbor-expansion response.
#[derive(Debug, Clone, Default)]
pub struct GetNeighborsResponse {
    pub vertices: Option<DataSet>,
}

/// Payload of one property-fetch response.
#[derive(Debug, Clone, Default)]
pub struct GetPropsResponse {
    pub props: Option<DataSet>,
}

/// Payload of a mutation response.
#[derive(Debug, Clone, Default)]
pub struct ExecResponse;

/// Per-host latency sample: (host, exec micros, total micros).
pub type HostLatency = (String, u64, u64);

/// Aggregated multi-partition RPC response.
#[derive(Debug, Clone)]
pub struct StorageRpcResponse<T> {
    completeness: u32,
    failed_parts: BTreeMap<i32, ErrorCode>,
    host_latency: Vec<HostLatency>,
    responses: Vec<T>,
}

impl<T> StorageRpcResponse<T> {
    pub fn ok(responses: Vec<T>) -> StorageRpcResponse<T> {
        StorageRpcResponse {
            completeness: 100,
            failed_parts: BTreeMap::new(),
            host_latency: Vec::new(),
            responses,
        }
    }

    pub fn partial(
        completeness: u32,
        failed_parts: BTreeMap<i32, ErrorCode>,
        responses: Vec<T>,
    ) -> StorageRpcResponse<T> {
        debug_assert!(completeness < 100);
        StorageRpcResponse {
            completeness,
            failed_parts,
            host_latency: Vec::new(),
            responses,
        }
    }

    pub fn with_host_latency(mut self, latency: Vec<HostLatency>) -> StorageRpcResponse<T> {
        self.host_latency = latency;
        self
    }

    /// Percentage of partitions that responded successfully.
    pub fn completeness(&self) -> u32 {
        self.completeness
    }

    pub fn failed_parts(&self) -> &BTreeMap<i32, ErrorCode> {
        &self.failed_parts
    }

    pub fn host_latency(&self) -> &[HostLatency] {
        &self.host_latency
    }

    pub fn responses(&self) -> &[T] {
        &self.responses
    }

    pub fn into_responses(self) -> Vec<T> {
        self.responses
    }
}

/// Async storage-node client.
///
/// Methods return boxed futures so the client can live behind a trait
/// object in the query context.
pub trait StorageClient: Send + Sync {
    fn get_neighbors(
        &self,
        req: GetNeighborsRequest,
    ) -> BoxFuture<'_, StorageRpcResponse<GetNeighborsResponse>>;

    fn get_props(&self, req: GetPropsRequest)
        -> BoxFuture<'_, StorageRpcResponse<GetPropsResponse>>;

    fn add_vertices(&self, req: MutateRequest) -> BoxFuture<'_, StorageRpcResponse<ExecResponse>>;

    fn add_edges(&self, req: MutateRequest) -> BoxFuture<'_, StorageRpcResponse<ExecResponse>>;

    fn delete_vertices(
        &self,
        req: MutateRequest,
    ) -> BoxFuture<'_, StorageRpcResponse<ExecResponse>>;

    fn delete_edges(&self, req: MutateRequest) -> BoxFuture<'_, StorageRpcResponse<ExecResponse>>;

    fn update_vertex(
        &self,
        space: i64,
        vid: Value,
        props: Vec<(String, Value)>,
    ) -> BoxFuture<'_, StorageRpcResponse<ExecResponse>>;

    fn update_edge(
        &self,
        space: i64,
        edge_key: Row,
        props: Vec<(String, Value)>,
    ) -> BoxFuture<'_, StorageRpcResponse<ExecResponse>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_response() {
        let resp: StorageRpcResponse<GetNeighborsResponse> = StorageRpcResponse::ok(vec![]);
        assert_eq!(resp.completeness(), 100);
        assert!(resp.failed_parts().is_empty());
    }

    #[test]
    fn test_partial_response() {
        let mut failed = BTreeMap::new();
        failed.insert(3, ErrorCode::LeaderChanged);
        let resp: StorageRpcResponse<GetNeighborsResponse> =
            StorageRpcResponse::partial(60, failed, vec![]);
        assert_eq!(resp.completeness(), 60);
        assert_eq!(
            resp.failed_parts().iter().next(),
            Some((&3, &ErrorCode::LeaderChanged))
        );
    }
}
