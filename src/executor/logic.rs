//! Control-flow executors: Start, Loop, and Select.

use crate::context::{ExecResult, QueryContext, QueryExpressionContext};
use crate::error::{Status, StatusResult};
use crate::expr::Expression;
use crate::plan::{NodeId, PlanNode};
use crate::value::Value;

use super::{finish, Scheduler};

/// Leaf of a pure subplan. Publishes an empty success result unless the
/// variable was seeded from outside (arguments, test fixtures).
pub(crate) struct StartExecutor<'a> {
    qctx: &'a QueryContext,
    node: &'a PlanNode,
}

impl<'a> StartExecutor<'a> {
    pub fn new(qctx: &'a QueryContext, node: &'a PlanNode) -> Self {
        StartExecutor { qctx, node }
    }

    pub async fn execute(&self) -> StatusResult<()> {
        if self.qctx.ectx().exists(self.node.output_var()) {
            return Ok(());
        }
        finish(
            self.qctx,
            self.node,
            ExecResult::builder().value(Value::Empty).build(),
        )
    }
}

/// Strict boolean read of a control predicate: empty and plain null count
/// as false, anything non-bool otherwise is a type error.
fn eval_condition(qctx: &QueryContext, condition: &Expression) -> StatusResult<bool> {
    let value = condition.eval(&QueryExpressionContext::new(qctx.ectx()));
    if let Some(b) = value.as_bool() {
        return Ok(b);
    }
    if value.is_empty() || (value.is_null() && !value.is_bad_null()) {
        return Ok(false);
    }
    Err(Status::TypeMismatch(format!(
        "control predicate evaluated to {}, expected bool",
        value.type_name()
    )))
}

/// Runs a body subplan while a predicate over the execution context holds.
///
/// The body's output variables are pre-registered so reads scheduled
/// before the first pass see defined results, and a counter variable is
/// bumped before each pass so multi-output operators can tell they are
/// being re-entered. On exit the loop publishes a single `false` under its
/// own output.
pub(crate) struct LoopExecutor<'a> {
    scheduler: &'a Scheduler,
    node: &'a PlanNode,
}

impl<'a> LoopExecutor<'a> {
    pub fn new(scheduler: &'a Scheduler, node: &'a PlanNode) -> Self {
        LoopExecutor { scheduler, node }
    }

    pub async fn execute(
        &self,
        condition: &Expression,
        body: NodeId,
        loop_var: &str,
    ) -> StatusResult<()> {
        let qctx = self.scheduler.qctx();
        for id in self.scheduler.plan().reachable_from(body) {
            qctx.ectx().ensure_var(self.scheduler.plan().node(id).output_var());
        }

        let mut iterations: i64 = 0;
        loop {
            qctx.deadline().check()?;
            if !eval_condition(qctx, condition)? {
                break;
            }
            iterations += 1;
            qctx.ectx().set_value(loop_var, Value::Int(iterations));
            tracing::debug!(node = self.node.output_var(), iterations, "loop body pass");
            self.scheduler.run_subplan(body).await?;
        }
        finish(
            qctx,
            self.node,
            ExecResult::builder().value(Value::Bool(false)).build(),
        )
    }
}

/// Evaluates a predicate once and hands control to one of two body
/// subplans, then republishes the chosen subplan's terminal result under
/// its own output variable.
pub(crate) struct SelectExecutor<'a> {
    scheduler: &'a Scheduler,
    node: &'a PlanNode,
}

impl<'a> SelectExecutor<'a> {
    pub fn new(scheduler: &'a Scheduler, node: &'a PlanNode) -> Self {
        SelectExecutor { scheduler, node }
    }

    pub async fn execute(
        &self,
        condition: &Expression,
        then_body: NodeId,
        else_body: NodeId,
    ) -> StatusResult<()> {
        let qctx = self.scheduler.qctx();
        let plan = self.scheduler.plan();
        for head in [then_body, else_body] {
            for id in plan.reachable_from(head) {
                qctx.ectx().ensure_var(plan.node(id).output_var());
            }
        }

        let chosen = if eval_condition(qctx, condition)? {
            then_body
        } else {
            else_body
        };
        tracing::debug!(
            node = self.node.output_var(),
            branch = plan.node(chosen).output_var(),
            "select branch taken"
        );
        self.scheduler.run_subplan(chosen).await?;

        let result = qctx.ectx().get_result(plan.node(chosen).output_var());
        finish(qctx, self.node, result)
    }
}
