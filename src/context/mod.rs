//! # Per-query context
//!
//! [`ExecutionContext`] is the per-query store of named, versioned results
//! that plan nodes read and write. Each name maps to an ordered history of
//! [`ExecResult`]s, newest first; executors publish by prepending a new
//! version. The context lives exactly as long as the request.
//!
//! The plan graph guarantees that no two concurrently running executors
//! touch the same variable; the interior lock only makes that guarantee
//! memory-safe, it is not a scheduling mechanism.

pub mod expression;
pub mod iterator;
pub mod query;

pub use expression::QueryExpressionContext;
pub use iterator::{Iter, IterKind, RowView};
pub use query::{CancelHandle, MemoryTracker, QueryContext, QueryDeadline};

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::value::Value;
use iterator::{DefaultIter, NeighborsIter, PropIter, SequentialIter};

/// Execution state of one published result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultState {
    #[default]
    Unexecuted,
    PartialSuccess,
    Success,
}

/// How a result manufactures iterators over its value.
#[derive(Debug)]
enum IterSeed {
    /// Build an iterator of this kind over the backing value on demand
    Kind(IterKind),
    /// Clone a pre-built iterator (join results, filtered views)
    Materialized(Iter),
}

/// The atomic publication unit of a plan node: an owned value, an execution
/// state, and an iterator factory.
///
/// `iter()` returns a fresh iterator positioned at the beginning on every
/// call; results are shared cheaply because value and factory live behind
/// `Arc`s.
#[derive(Debug, Clone)]
pub struct ExecResult {
    value: Arc<Value>,
    state: ResultState,
    msg: Option<String>,
    seed: Arc<IterSeed>,
}

impl Default for ExecResult {
    fn default() -> ExecResult {
        ExecResult {
            value: Arc::new(Value::Empty),
            state: ResultState::Unexecuted,
            msg: None,
            seed: Arc::new(IterSeed::Kind(IterKind::Default)),
        }
    }
}

impl ExecResult {
    /// Successful result; the iterator kind is chosen from the value's
    /// shape (datasets get a sequential cursor, everything else the scalar
    /// one).
    pub fn from_value(value: Value) -> ExecResult {
        let kind = if value.is_dataset() {
            IterKind::Sequential
        } else {
            IterKind::Default
        };
        ExecResult {
            value: Arc::new(value),
            state: ResultState::Success,
            msg: None,
            seed: Arc::new(IterSeed::Kind(kind)),
        }
    }

    pub fn builder() -> ResultBuilder {
        ResultBuilder::default()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn value_ptr(&self) -> Arc<Value> {
        Arc::clone(&self.value)
    }

    /// Take the value out of the result, dropping the iterator factory.
    /// Clones only when iterators still share the backing.
    pub fn move_value(self) -> Value {
        match Arc::try_unwrap(self.value) {
            Ok(value) => value,
            Err(shared) => (*shared).clone(),
        }
    }

    pub fn state(&self) -> ResultState {
        self.state
    }

    pub fn msg(&self) -> Option<&str> {
        self.msg.as_deref()
    }

    /// A fresh iterator over the value, positioned at the beginning.
    pub fn iter(&self) -> Iter {
        match &*self.seed {
            IterSeed::Materialized(it) => it.copy(),
            IterSeed::Kind(kind) => match kind {
                IterKind::Default => Iter::Default(DefaultIter::new(Arc::clone(&self.value))),
                IterKind::Sequential => {
                    Iter::Sequential(SequentialIter::new(Arc::clone(&self.value)))
                }
                IterKind::Prop => Iter::Prop(PropIter::new(Arc::clone(&self.value))),
                IterKind::Neighbors => {
                    Iter::Neighbors(NeighborsIter::new(Arc::clone(&self.value)))
                }
                IterKind::Join => {
                    debug_assert!(false, "join iterators cannot be built from a value");
                    Iter::Default(DefaultIter::new(Arc::clone(&self.value)))
                }
            },
        }
    }
}

/// Builder mirroring the three result constructors: empty, value-only, and
/// fully specified.
#[derive(Default)]
pub struct ResultBuilder {
    value: Option<Value>,
    state: Option<ResultState>,
    msg: Option<String>,
    iter: Option<Iter>,
    kind: Option<IterKind>,
}

impl ResultBuilder {
    pub fn value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn state(mut self, state: ResultState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn msg(mut self, msg: impl Into<String>) -> Self {
        self.msg = Some(msg.into());
        self
    }

    /// Seed the result with a pre-built iterator; the backing value is
    /// taken from the iterator when not set explicitly.
    pub fn iter(mut self, iter: Iter) -> Self {
        self.iter = Some(iter);
        self
    }

    pub fn iter_kind(mut self, kind: IterKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn build(self) -> ExecResult {
        let ResultBuilder {
            value,
            state,
            msg,
            iter,
            kind,
        } = self;
        let value = match (value, &iter) {
            (Some(v), _) => Arc::new(v),
            (None, Some(it)) => it
                .backing()
                .cloned()
                .unwrap_or_else(|| Arc::new(Value::Empty)),
            (None, None) => Arc::new(Value::Empty),
        };
        let seed = if let Some(mut it) = iter {
            it.reset(0);
            IterSeed::Materialized(it)
        } else if let Some(kind) = kind {
            IterSeed::Kind(kind)
        } else if value.is_dataset() {
            IterSeed::Kind(IterKind::Sequential)
        } else {
            IterSeed::Kind(IterKind::Default)
        };
        ExecResult {
            value,
            state: state.unwrap_or(ResultState::Success),
            msg,
            seed: Arc::new(seed),
        }
    }
}

/// Named, versioned store of results, keyed by plan variable name.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    /// name -> history of results, newest first
    results: RwLock<HashMap<String, Vec<ExecResult>>>,
}

impl ExecutionContext {
    pub fn new() -> ExecutionContext {
        ExecutionContext::default()
    }

    /// Latest value for `name`; the empty value when the name is absent.
    pub fn get_value(&self, name: &str) -> Arc<Value> {
        self.results
            .read()
            .get(name)
            .and_then(|hist| hist.first())
            .map(ExecResult::value_ptr)
            .unwrap_or_else(|| Arc::new(Value::Empty))
    }

    /// Latest result for `name`. Reading an unknown name is a contract
    /// violation; release builds observe an unexecuted empty result.
    pub fn get_result(&self, name: &str) -> ExecResult {
        let guard = self.results.read();
        match guard.get(name).and_then(|hist| hist.first()) {
            Some(result) => result.clone(),
            None => {
                debug_assert!(false, "read of undefined variable `{name}`");
                ExecResult::default()
            }
        }
    }

    /// Fresh iterator over the latest result of `name`.
    pub fn get_iter(&self, name: &str) -> Iter {
        self.get_result(name).iter()
    }

    /// Publish a plain value as a success result.
    pub fn set_value(&self, name: &str, value: Value) {
        self.set_result(name, ExecResult::from_value(value));
    }

    /// Prepend a new version for `name`.
    pub fn set_result(&self, name: &str, result: ExecResult) {
        self.results
            .write()
            .entry(name.to_string())
            .or_default()
            .insert(0, result);
    }

    pub fn num_versions(&self, name: &str) -> usize {
        self.results.read().get(name).map_or(0, Vec::len)
    }

    /// Full history for `name`, newest first.
    pub fn history(&self, name: &str) -> Vec<ExecResult> {
        self.results.read().get(name).cloned().unwrap_or_default()
    }

    /// Keep at most the newest `keep` versions; zero removes the entry.
    pub fn truncate(&self, name: &str, keep: usize) {
        let mut guard = self.results.write();
        if keep == 0 {
            guard.remove(name);
            return;
        }
        if let Some(hist) = guard.get_mut(name) {
            hist.truncate(keep);
            if hist.is_empty() {
                guard.remove(name);
            }
        }
    }

    /// Drop every version of `name`.
    pub fn delete(&self, name: &str) {
        self.results.write().remove(name);
    }

    pub fn exists(&self, name: &str) -> bool {
        self.results.read().contains_key(name)
    }

    /// Pre-register a variable so downstream reads see a defined (if
    /// unexecuted) result. Used by control-flow executors for their body
    /// subplans' outputs.
    pub fn ensure_var(&self, name: &str) {
        self.results
            .write()
            .entry(name.to_string())
            .or_insert_with(|| vec![ExecResult::default()]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{DataSet, Row};

    #[test]
    fn test_set_then_get() {
        let ectx = ExecutionContext::new();
        ectx.set_value("a", Value::Int(42));
        assert_eq!(*ectx.get_value("a"), Value::Int(42));
    }

    #[test]
    fn test_versions_are_prepended() {
        let ectx = ExecutionContext::new();
        ectx.set_value("a", Value::Int(1));
        ectx.set_value("a", Value::Int(2));
        assert_eq!(ectx.num_versions("a"), 2);
        let hist = ectx.history("a");
        assert_eq!(*hist[0].value(), Value::Int(2));
        assert_eq!(*hist[1].value(), Value::Int(1));
    }

    #[test]
    fn test_truncate_keeps_newest() {
        let ectx = ExecutionContext::new();
        for i in 0..5 {
            ectx.set_value("a", Value::Int(i));
        }
        ectx.truncate("a", 2);
        assert_eq!(ectx.num_versions("a"), 2);
        assert_eq!(*ectx.get_value("a"), Value::Int(4));

        ectx.truncate("a", 0);
        assert_eq!(ectx.num_versions("a"), 0);
        assert!(!ectx.exists("a"));
    }

    #[test]
    fn test_delete() {
        let ectx = ExecutionContext::new();
        ectx.set_value("a", Value::Int(1));
        ectx.delete("a");
        assert_eq!(ectx.num_versions("a"), 0);
        ectx.delete("a");
        assert_eq!(ectx.num_versions("a"), 0);
    }

    #[test]
    fn test_absent_value_is_empty() {
        let ectx = ExecutionContext::new();
        assert!(ectx.get_value("missing").is_empty());
    }

    #[test]
    fn test_result_iter_is_fresh_each_call() {
        let mut ds = DataSet::new(["c"]);
        ds.push(Row::from(vec![Value::Int(1)]));
        ds.push(Row::from(vec![Value::Int(2)]));
        let result = ExecResult::from_value(Value::dataset(ds));

        let mut it1 = result.iter();
        it1.next();
        it1.next();
        assert!(!it1.valid());

        let it2 = result.iter();
        assert!(it2.valid());
        assert_eq!(it2.size(), 2);
    }

    #[test]
    fn test_builder_defaults_to_value_shape() {
        let scalar = ExecResult::builder().value(Value::Int(1)).build();
        assert_eq!(scalar.iter().kind(), IterKind::Default);

        let ds = ExecResult::builder()
            .value(Value::dataset(DataSet::new(["c"])))
            .build();
        assert_eq!(ds.iter().kind(), IterKind::Sequential);
    }

    #[test]
    fn test_ensure_var_registers_unexecuted() {
        let ectx = ExecutionContext::new();
        ectx.ensure_var("body_out");
        assert!(ectx.exists("body_out"));
        assert_eq!(ectx.get_result("body_out").state(), ResultState::Unexecuted);
        // publishing replaces the placeholder as the newest version
        ectx.set_value("body_out", Value::Bool(true));
        assert_eq!(*ectx.get_value("body_out"), Value::Bool(true));
    }
}
