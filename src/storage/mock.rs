//! In-memory storage client for tests and benches.
//!
//! Responses are canned: tests enqueue one `StorageRpcResponse` per
//! expected call, and the mock records every request it serves so tests
//! can assert on the built request datasets.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use parking_lot::Mutex;
use std::collections::VecDeque;

use super::{
    ExecResponse, GetNeighborsRequest, GetNeighborsResponse, GetPropsRequest, GetPropsResponse,
    MutateRequest, StorageClient, StorageRpcResponse,
};
use crate::value::{Row, Value};

#[derive(Default)]
pub struct MockStorageClient {
    neighbors_responses: Mutex<VecDeque<StorageRpcResponse<GetNeighborsResponse>>>,
    props_responses: Mutex<VecDeque<StorageRpcResponse<GetPropsResponse>>>,
    neighbors_requests: Mutex<Vec<GetNeighborsRequest>>,
    props_requests: Mutex<Vec<GetPropsRequest>>,
}

impl MockStorageClient {
    pub fn new() -> MockStorageClient {
        MockStorageClient::default()
    }

    /// Enqueue the response for the next `get_neighbors` call.
    pub fn push_neighbors_response(&self, resp: StorageRpcResponse<GetNeighborsResponse>) {
        self.neighbors_responses.lock().push_back(resp);
    }

    /// Enqueue the response for the next `get_props` call.
    pub fn push_props_response(&self, resp: StorageRpcResponse<GetPropsResponse>) {
        self.props_responses.lock().push_back(resp);
    }

    /// Requests served so far, in call order.
    pub fn neighbors_requests(&self) -> Vec<GetNeighborsRequest> {
        self.neighbors_requests.lock().clone()
    }

    pub fn props_requests(&self) -> Vec<GetPropsRequest> {
        self.props_requests.lock().clone()
    }
}

impl StorageClient for MockStorageClient {
    fn get_neighbors(
        &self,
        req: GetNeighborsRequest,
    ) -> BoxFuture<'_, StorageRpcResponse<GetNeighborsResponse>> {
        self.neighbors_requests.lock().push(req);
        let resp = self
            .neighbors_responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| StorageRpcResponse::ok(vec![]));
        async move { resp }.boxed()
    }

    fn get_props(
        &self,
        req: GetPropsRequest,
    ) -> BoxFuture<'_, StorageRpcResponse<GetPropsResponse>> {
        self.props_requests.lock().push(req);
        let resp = self
            .props_responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| StorageRpcResponse::ok(vec![]));
        async move { resp }.boxed()
    }

    fn add_vertices(&self, _req: MutateRequest) -> BoxFuture<'_, StorageRpcResponse<ExecResponse>> {
        async { StorageRpcResponse::ok(vec![ExecResponse]) }.boxed()
    }

    fn add_edges(&self, _req: MutateRequest) -> BoxFuture<'_, StorageRpcResponse<ExecResponse>> {
        async { StorageRpcResponse::ok(vec![ExecResponse]) }.boxed()
    }

    fn delete_vertices(
        &self,
        _req: MutateRequest,
    ) -> BoxFuture<'_, StorageRpcResponse<ExecResponse>> {
        async { StorageRpcResponse::ok(vec![ExecResponse]) }.boxed()
    }

    fn delete_edges(&self, _req: MutateRequest) -> BoxFuture<'_, StorageRpcResponse<ExecResponse>> {
        async { StorageRpcResponse::ok(vec![ExecResponse]) }.boxed()
    }

    fn update_vertex(
        &self,
        _space: i64,
        _vid: Value,
        _props: Vec<(String, Value)>,
    ) -> BoxFuture<'_, StorageRpcResponse<ExecResponse>> {
        async { StorageRpcResponse::ok(vec![ExecResponse]) }.boxed()
    }

    fn update_edge(
        &self,
        _space: i64,
        _edge_key: Row,
        _props: Vec<(String, Value)>,
    ) -> BoxFuture<'_, StorageRpcResponse<ExecResponse>> {
        async { StorageRpcResponse::ok(vec![ExecResponse]) }.boxed()
    }
}
