//! Query-scoped state: deadline, memory budget, collaborator handles, and
//! the execution context itself.
//!
//! Everything here is created when a request arrives and dropped together
//! when the response completes.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::ExecutionConfig;
use crate::error::{Status, StatusResult};
use crate::schema::{SchemaCatalog, SpaceInfo};
use crate::storage::StorageClient;

use super::ExecutionContext;

/// Cooperative deadline for one query.
///
/// A single shared atomic carries both explicit cancellation and timeout
/// expiry; executors poll it at every await boundary. In-flight RPCs are
/// not aborted, their results are simply discarded.
#[derive(Debug, Clone)]
pub struct QueryDeadline {
    cancelled: Arc<AtomicBool>,
    start: Instant,
    timeout: Option<Duration>,
}

impl QueryDeadline {
    pub fn new(timeout: Option<Duration>) -> QueryDeadline {
        QueryDeadline {
            cancelled: Arc::new(AtomicBool::new(false)),
            start: Instant::now(),
            timeout,
        }
    }

    /// No deadline; the query runs until completion or cancellation.
    pub fn unbounded() -> QueryDeadline {
        QueryDeadline::new(None)
    }

    /// Poll the deadline. `Err(Cancelled)` once cancelled, `Err(Timeout)`
    /// past the allowed duration.
    pub fn check(&self) -> StatusResult<()> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Err(Status::Cancelled);
        }
        if let Some(timeout) = self.timeout {
            let elapsed = self.start.elapsed();
            if elapsed > timeout {
                self.cancelled.store(true, Ordering::Relaxed);
                return Err(Status::Timeout {
                    elapsed_ms: elapsed.as_millis() as u64,
                });
            }
        }
        Ok(())
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Handle for cancelling from another task or thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            cancelled: Arc::clone(&self.cancelled),
        }
    }
}

/// Clonable handle that cancels the associated query.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Byte budget for values held in the execution context.
///
/// Executors charge the tracker when publishing; exceeding the cap turns
/// into an out-of-memory status on the charging executor.
#[derive(Debug, Default)]
pub struct MemoryTracker {
    used: AtomicUsize,
    limit: Option<usize>,
}

impl MemoryTracker {
    pub fn new(limit: Option<usize>) -> MemoryTracker {
        MemoryTracker {
            used: AtomicUsize::new(0),
            limit,
        }
    }

    pub fn charge(&self, bytes: usize) -> StatusResult<()> {
        let used = self.used.fetch_add(bytes, Ordering::Relaxed) + bytes;
        if let Some(limit) = self.limit {
            if used > limit {
                return Err(Status::OutOfMemory { limit, used });
            }
        }
        Ok(())
    }

    pub fn release(&self, bytes: usize) {
        self.used.fetch_sub(bytes.min(self.used()), Ordering::Relaxed);
    }

    pub fn used(&self) -> usize {
        self.used.load(Ordering::Relaxed)
    }
}

/// Everything one query needs while it runs.
pub struct QueryContext {
    ectx: ExecutionContext,
    deadline: QueryDeadline,
    memory: MemoryTracker,
    storage: Arc<dyn StorageClient>,
    schema: Arc<SchemaCatalog>,
    space: SpaceInfo,
    accept_partial_success: bool,
    partial_success: AtomicBool,
    /// executor label -> key/value stats (timings, per-host latency)
    stats: Mutex<BTreeMap<String, BTreeMap<String, String>>>,
}

impl QueryContext {
    pub fn new(
        storage: Arc<dyn StorageClient>,
        schema: Arc<SchemaCatalog>,
        space: SpaceInfo,
        config: &ExecutionConfig,
    ) -> QueryContext {
        let timeout = match config.timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };
        let memory_limit = match config.memory_limit_bytes {
            0 => None,
            bytes => Some(bytes),
        };
        QueryContext {
            ectx: ExecutionContext::new(),
            deadline: QueryDeadline::new(timeout),
            memory: MemoryTracker::new(memory_limit),
            storage,
            schema,
            space,
            accept_partial_success: config.accept_partial_success,
            partial_success: AtomicBool::new(false),
            stats: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn ectx(&self) -> &ExecutionContext {
        &self.ectx
    }

    pub fn deadline(&self) -> &QueryDeadline {
        &self.deadline
    }

    pub fn memory(&self) -> &MemoryTracker {
        &self.memory
    }

    pub fn storage(&self) -> &Arc<dyn StorageClient> {
        &self.storage
    }

    pub fn schema(&self) -> &Arc<SchemaCatalog> {
        &self.schema
    }

    pub fn space(&self) -> &SpaceInfo {
        &self.space
    }

    pub fn accept_partial_success(&self) -> bool {
        self.accept_partial_success
    }

    /// Raise the query-global partial success flag.
    pub fn set_partial_success(&self) {
        self.partial_success.store(true, Ordering::Relaxed);
    }

    pub fn is_partial_success(&self) -> bool {
        self.partial_success.load(Ordering::Relaxed)
    }

    /// Record one key/value observation for an executor label.
    pub fn add_stat(
        &self,
        executor: &str,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.stats
            .lock()
            .entry(executor.to_string())
            .or_default()
            .insert(key.into(), value.into());
    }

    /// Snapshot of the collected per-executor statistics.
    pub fn stats(&self) -> BTreeMap<String, BTreeMap<String, String>> {
        self.stats.lock().clone()
    }
}
