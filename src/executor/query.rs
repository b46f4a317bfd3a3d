//! Data operators: Filter, Project, Limit, Unwind, and the hash join.

use std::collections::HashMap;

use crate::context::iterator::{Iter, JoinIter, RowSlot};
use crate::context::{ExecResult, QueryContext, QueryExpressionContext};
use crate::error::{Status, StatusResult};
use crate::expr::Expression;
use crate::plan::PlanNode;
use crate::value::{DataSet, List, Row, Value};

use super::{finish, maybe_yield};

fn input_rows_iter(qctx: &QueryContext, node: &PlanNode, input_var: &str) -> StatusResult<Iter> {
    let iter = qctx.ectx().get_iter(input_var);
    if iter.is_default() {
        return Err(Status::Internal(format!(
            "{}: input `{input_var}` has no rows to iterate",
            node.name()
        )));
    }
    Ok(iter)
}

/// Erases rows whose predicate does not hold; the surviving rows stay in
/// the input's backing storage and are republished behind the filtered
/// cursor.
pub(crate) struct FilterExecutor<'a> {
    qctx: &'a QueryContext,
    node: &'a PlanNode,
}

impl<'a> FilterExecutor<'a> {
    pub fn new(qctx: &'a QueryContext, node: &'a PlanNode) -> Self {
        FilterExecutor { qctx, node }
    }

    pub async fn execute(
        &self,
        input_var: &str,
        condition: &Expression,
        stable: bool,
    ) -> StatusResult<()> {
        let mut iter = input_rows_iter(self.qctx, self.node, input_var)?;
        let mut scanned = 0usize;
        while iter.valid() {
            let ctx = QueryExpressionContext::new(self.qctx.ectx()).with_iter(&iter);
            let value = condition.eval(&ctx);
            if value.is_bad_null() || (!value.is_empty() && !value.is_null() && !value.is_bool()) {
                return Err(Status::TypeMismatch(format!(
                    "filter condition evaluated to {}, expected bool, empty, or null",
                    value.type_name()
                )));
            }
            let keep = value.as_bool().unwrap_or(false);
            if keep {
                iter.next();
            } else if stable {
                iter.erase();
            } else {
                iter.unstable_erase();
            }
            scanned += 1;
            maybe_yield(self.qctx, scanned).await?;
        }
        iter.reset(0);
        self.qctx.add_stat(
            &format!("{}_{}", self.node.name(), self.node.id()),
            "rows",
            iter.size().to_string(),
        );
        finish(self.qctx, self.node, ExecResult::builder().iter(iter).build())
    }
}

/// Builds a new dataset with one configured expression per output column.
pub(crate) struct ProjectExecutor<'a> {
    qctx: &'a QueryContext,
    node: &'a PlanNode,
}

impl<'a> ProjectExecutor<'a> {
    pub fn new(qctx: &'a QueryContext, node: &'a PlanNode) -> Self {
        ProjectExecutor { qctx, node }
    }

    pub async fn execute(
        &self,
        input_var: &str,
        columns: &[(String, Expression)],
    ) -> StatusResult<()> {
        let mut iter = input_rows_iter(self.qctx, self.node, input_var)?;
        let mut ds = DataSet::new(columns.iter().map(|(name, _)| name.clone()));
        let mut scanned = 0usize;
        while iter.valid() {
            let ctx = QueryExpressionContext::new(self.qctx.ectx()).with_iter(&iter);
            let row: Vec<Value> = columns.iter().map(|(_, e)| e.eval(&ctx)).collect();
            ds.push(Row::from(row));
            iter.next();
            scanned += 1;
            maybe_yield(self.qctx, scanned).await?;
        }
        finish(self.qctx, self.node, ExecResult::from_value(Value::dataset(ds)))
    }
}

/// Offset/count pagination via two saturating range erases.
pub(crate) struct LimitExecutor<'a> {
    qctx: &'a QueryContext,
    node: &'a PlanNode,
}

impl<'a> LimitExecutor<'a> {
    pub fn new(qctx: &'a QueryContext, node: &'a PlanNode) -> Self {
        LimitExecutor { qctx, node }
    }

    pub async fn execute(&self, input_var: &str, offset: usize, count: usize) -> StatusResult<()> {
        let mut iter = input_rows_iter(self.qctx, self.node, input_var)?;
        iter.erase_range(0, offset);
        iter.erase_range(count, iter.size());
        finish(self.qctx, self.node, ExecResult::builder().iter(iter).build())
    }
}

/// Flattens a list-valued expression into one output row per element;
/// non-list values pass through as a single row.
pub(crate) struct UnwindExecutor<'a> {
    qctx: &'a QueryContext,
    node: &'a PlanNode,
}

impl<'a> UnwindExecutor<'a> {
    pub fn new(qctx: &'a QueryContext, node: &'a PlanNode) -> Self {
        UnwindExecutor { qctx, node }
    }

    pub async fn execute(
        &self,
        input_var: &str,
        unwind_expr: &Expression,
        alias: &str,
    ) -> StatusResult<()> {
        let mut iter = input_rows_iter(self.qctx, self.node, input_var)?;
        let mut ds = DataSet::new([alias]);
        let mut scanned = 0usize;
        while iter.valid() {
            let ctx = QueryExpressionContext::new(self.qctx.ectx()).with_iter(&iter);
            match unwind_expr.eval(&ctx) {
                Value::List(list) => {
                    for item in list.values {
                        ds.push(Row::from(vec![item]));
                    }
                }
                other => ds.push(Row::from(vec![other])),
            }
            iter.next();
            scanned += 1;
            maybe_yield(self.qctx, scanned).await?;
        }
        finish(self.qctx, self.node, ExecResult::from_value(Value::dataset(ds)))
    }
}

/// Classical hash join: build over the smaller input, probe with the
/// larger one, emit zero-copy join rows that borrow both parents'
/// storage.
pub(crate) struct HashJoinExecutor<'a> {
    qctx: &'a QueryContext,
    node: &'a PlanNode,
}

impl<'a> HashJoinExecutor<'a> {
    pub fn new(qctx: &'a QueryContext, node: &'a PlanNode) -> Self {
        HashJoinExecutor { qctx, node }
    }

    pub async fn execute(
        &self,
        left_var: &str,
        right_var: &str,
        hash_keys: &[Expression],
        probe_keys: &[Expression],
        col_names: &[String],
    ) -> StatusResult<()> {
        let mut lhs = input_rows_iter(self.qctx, self.node, left_var)?;
        let mut rhs = input_rows_iter(self.qctx, self.node, right_var)?;
        let mut out = JoinIter::with_inputs(col_names.to_vec(), &lhs, &rhs)?;

        if lhs.size() != 0 && rhs.size() != 0 {
            if lhs.size() <= rhs.size() {
                let table = self.build(hash_keys, &mut lhs).await?;
                self.probe(probe_keys, &mut rhs, &table, &mut out, false)
                    .await?;
            } else {
                let table = self.build(probe_keys, &mut rhs).await?;
                self.probe(hash_keys, &mut lhs, &table, &mut out, true)
                    .await?;
            }
        }
        finish(
            self.qctx,
            self.node,
            ExecResult::builder().iter(Iter::Join(out)).build(),
        )
    }

    /// key -> segment slots of every build row with that key
    async fn build(
        &self,
        keys: &[Expression],
        iter: &mut Iter,
    ) -> StatusResult<HashMap<List, Vec<Vec<RowSlot>>>> {
        let mut table: HashMap<List, Vec<Vec<RowSlot>>> = HashMap::new();
        let mut scanned = 0usize;
        while iter.valid() {
            let key = self.eval_key(keys, iter);
            let slots = iter
                .current_slots()
                .ok_or_else(|| Status::Internal("join input row has no storage".to_string()))?;
            table.entry(key).or_default().push(slots);
            iter.next();
            scanned += 1;
            maybe_yield(self.qctx, scanned).await?;
        }
        Ok(table)
    }

    async fn probe(
        &self,
        keys: &[Expression],
        iter: &mut Iter,
        table: &HashMap<List, Vec<Vec<RowSlot>>>,
        out: &mut JoinIter,
        exchanged: bool,
    ) -> StatusResult<()> {
        let mut scanned = 0usize;
        while iter.valid() {
            let key = self.eval_key(keys, iter);
            if let Some(matches) = table.get(&key) {
                let probe_slots = iter
                    .current_slots()
                    .ok_or_else(|| Status::Internal("join input row has no storage".to_string()))?;
                for build_slots in matches {
                    // output order is always (left segments, right segments)
                    let (lhs_slots, rhs_slots) = if exchanged {
                        (&probe_slots, build_slots)
                    } else {
                        (build_slots, &probe_slots)
                    };
                    let mut segs = out.rebase_lhs(lhs_slots);
                    segs.extend(out.rebase_rhs(rhs_slots));
                    out.add_row(segs);
                }
            }
            iter.next();
            scanned += 1;
            maybe_yield(self.qctx, scanned).await?;
        }
        Ok(())
    }

    fn eval_key(&self, keys: &[Expression], iter: &Iter) -> List {
        let ctx = QueryExpressionContext::new(self.qctx.ectx()).with_iter(iter);
        List::new(keys.iter().map(|k| k.eval(&ctx)).collect())
    }
}
