//! Per-row evaluation scope handed to the expression tree.
//!
//! Adapts named lookups (`$var`, `$var.prop`, `$-.prop`, tag/edge
//! properties, source and destination vertex properties) to whichever
//! iterator the owning executor is currently scanning. Rebinding is just
//! constructing a new context over the same references, which is O(1); the
//! iterator is never cloned.

use super::iterator::Iter;
use super::ExecutionContext;
use crate::value::{Value, NULL_VALUE};

/// Evaluation scope: the execution context plus an optionally bound
/// iterator positioned on the current row.
#[derive(Clone, Copy)]
pub struct QueryExpressionContext<'a> {
    ectx: Option<&'a ExecutionContext>,
    iter: Option<&'a Iter>,
}

impl<'a> QueryExpressionContext<'a> {
    pub fn new(ectx: &'a ExecutionContext) -> QueryExpressionContext<'a> {
        QueryExpressionContext {
            ectx: Some(ectx),
            iter: None,
        }
    }

    /// Scope without any variable store; only row lookups resolve.
    pub fn row_only(iter: &'a Iter) -> QueryExpressionContext<'a> {
        QueryExpressionContext {
            ectx: None,
            iter: Some(iter),
        }
    }

    /// Bind the current iterator row.
    pub fn with_iter(mut self, iter: &'a Iter) -> QueryExpressionContext<'a> {
        self.iter = Some(iter);
        self
    }

    /// Latest value of variable `name` ($var).
    pub fn get_var(&self, name: &str) -> Value {
        match self.ectx {
            Some(ectx) => (*ectx.get_value(name)).clone(),
            None => Value::Empty,
        }
    }

    /// Version `version` (0 = newest) of variable `name`.
    pub fn get_versioned_var(&self, name: &str, version: i64) -> Value {
        let Some(ectx) = self.ectx else {
            return Value::Empty;
        };
        if version < 0 {
            return NULL_VALUE.clone();
        }
        let hist = ectx.history(name);
        match hist.get(version as usize) {
            Some(result) => result.value().clone(),
            None => NULL_VALUE.clone(),
        }
    }

    /// Property `prop` of variable `name` ($var.prop), read at the head of
    /// a fresh iterator over the variable's latest result.
    pub fn get_var_prop(&self, name: &str, prop: &str) -> Value {
        let Some(ectx) = self.ectx else {
            return Value::Empty;
        };
        let iter = ectx.get_iter(name);
        iter.get_column(prop).clone()
    }

    /// Property `prop` of the current input row ($-.prop).
    pub fn get_input_prop(&self, prop: &str) -> Value {
        match self.iter {
            Some(iter) => iter.get_column(prop).clone(),
            None => Value::Empty,
        }
    }

    pub fn get_tag_prop(&self, tag: &str, prop: &str) -> Value {
        match self.iter {
            Some(iter) => iter.get_tag_prop(tag, prop).clone(),
            None => Value::Empty,
        }
    }

    pub fn get_edge_prop(&self, edge: &str, prop: &str) -> Value {
        match self.iter {
            Some(iter) => iter.get_edge_prop(edge, prop).clone(),
            None => Value::Empty,
        }
    }

    /// Source-vertex property ($^.tag.prop); on a neighbors row these are
    /// the tag columns of the expanded vertex.
    pub fn get_src_prop(&self, tag: &str, prop: &str) -> Value {
        match self.iter {
            Some(iter) => iter.get_tag_prop(tag, prop).clone(),
            None => Value::Empty,
        }
    }

    /// Destination-vertex property ($$.tag.prop); resolves through
    /// materialized `tag.prop` columns of the bound row.
    pub fn get_dst_prop(&self, tag: &str, prop: &str) -> Value {
        match self.iter {
            Some(iter) => iter.get_column(&format!("{tag}.{prop}")).clone(),
            None => Value::Empty,
        }
    }

    pub fn get_vertex(&self) -> Value {
        match self.iter {
            Some(iter) => iter.get_vertex(),
            None => Value::Empty,
        }
    }

    pub fn get_edge(&self) -> Value {
        match self.iter {
            Some(iter) => iter.get_edge(),
            None => Value::Empty,
        }
    }

    /// Write-through to the execution context.
    pub fn set_var(&self, name: &str, value: Value) {
        if let Some(ectx) = self.ectx {
            ectx.set_value(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::iterator::SequentialIter;
    use super::*;
    use crate::value::{DataSet, Row};
    use std::sync::Arc;

    fn input_iter() -> Iter {
        let mut ds = DataSet::new(["name", "age"]);
        ds.push(Row::from(vec![Value::string("ann"), Value::Int(30)]));
        Iter::Sequential(SequentialIter::new(Arc::new(Value::dataset(ds))))
    }

    #[test]
    fn test_var_lookups() {
        let ectx = ExecutionContext::new();
        ectx.set_value("a", Value::Int(1));
        ectx.set_value("a", Value::Int(2));

        let ctx = QueryExpressionContext::new(&ectx);
        assert_eq!(ctx.get_var("a"), Value::Int(2));
        assert_eq!(ctx.get_versioned_var("a", 0), Value::Int(2));
        assert_eq!(ctx.get_versioned_var("a", 1), Value::Int(1));
        assert!(ctx.get_versioned_var("a", 2).is_null());
        assert!(ctx.get_versioned_var("a", -1).is_null());
    }

    #[test]
    fn test_input_prop_follows_bound_iter() {
        let ectx = ExecutionContext::new();
        let iter = input_iter();
        let ctx = QueryExpressionContext::new(&ectx).with_iter(&iter);
        assert_eq!(ctx.get_input_prop("name"), Value::string("ann"));
        assert_eq!(ctx.get_input_prop("age"), Value::Int(30));
        assert!(ctx.get_input_prop("missing").is_null());
    }

    #[test]
    fn test_var_prop_reads_head_row() {
        let ectx = ExecutionContext::new();
        let mut ds = DataSet::new(["c"]);
        ds.push(Row::from(vec![Value::Int(7)]));
        ds.push(Row::from(vec![Value::Int(8)]));
        ectx.set_value("v", Value::dataset(ds));

        let ctx = QueryExpressionContext::new(&ectx);
        assert_eq!(ctx.get_var_prop("v", "c"), Value::Int(7));
    }

    #[test]
    fn test_set_var_writes_through() {
        let ectx = ExecutionContext::new();
        let ctx = QueryExpressionContext::new(&ectx);
        ctx.set_var("out", Value::Bool(true));
        assert_eq!(*ectx.get_value("out"), Value::Bool(true));
    }
}
