//! Expression tree evaluated row-by-row against the bound iterator.
//!
//! This is the slice of the expression library the executors consume:
//! constants, variable and property references, and the usual arithmetic,
//! comparison, and logical operators with bad-null propagation.

use serde::Serialize;
use std::fmt;

use crate::context::QueryExpressionContext;
use crate::value::{NullKind, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    Not,
    Neg,
    IsNull,
    IsEmpty,
}

/// Expression node kinds, used by visitors and explain output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExprKind {
    Constant,
    Var,
    VersionedVar,
    VarProp,
    InputProp,
    TagProp,
    EdgeProp,
    SrcProp,
    DstProp,
    Vertex,
    Edge,
    Unary,
    Binary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expression {
    /// Literal value
    Constant(Value),
    /// `$var`
    Var(String),
    /// `$var` at a fixed history version
    VersionedVar { var: String, version: i64 },
    /// `$var.prop`
    VarProp { var: String, prop: String },
    /// `$-.prop`
    InputProp(String),
    /// `tag.prop` on the current row
    TagProp { tag: String, prop: String },
    /// `edge.prop` on the current edge
    EdgeProp { edge: String, prop: String },
    /// `$^.tag.prop`
    SrcProp { tag: String, prop: String },
    /// `$$.tag.prop`
    DstProp { tag: String, prop: String },
    /// The reconstructed vertex of the current row
    Vertex,
    /// The reconstructed edge of the current row
    Edge,
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
}

impl Expression {
    pub fn kind(&self) -> ExprKind {
        match self {
            Expression::Constant(_) => ExprKind::Constant,
            Expression::Var(_) => ExprKind::Var,
            Expression::VersionedVar { .. } => ExprKind::VersionedVar,
            Expression::VarProp { .. } => ExprKind::VarProp,
            Expression::InputProp(_) => ExprKind::InputProp,
            Expression::TagProp { .. } => ExprKind::TagProp,
            Expression::EdgeProp { .. } => ExprKind::EdgeProp,
            Expression::SrcProp { .. } => ExprKind::SrcProp,
            Expression::DstProp { .. } => ExprKind::DstProp,
            Expression::Vertex => ExprKind::Vertex,
            Expression::Edge => ExprKind::Edge,
            Expression::Unary { .. } => ExprKind::Unary,
            Expression::Binary { .. } => ExprKind::Binary,
        }
    }

    /// Evaluate against the given scope. Errors surface as bad-null
    /// values, never as panics; executors decide what a bad null means.
    pub fn eval(&self, ctx: &QueryExpressionContext<'_>) -> Value {
        match self {
            Expression::Constant(v) => v.clone(),
            Expression::Var(name) => ctx.get_var(name),
            Expression::VersionedVar { var, version } => ctx.get_versioned_var(var, *version),
            Expression::VarProp { var, prop } => ctx.get_var_prop(var, prop),
            Expression::InputProp(prop) => ctx.get_input_prop(prop),
            Expression::TagProp { tag, prop } => ctx.get_tag_prop(tag, prop),
            Expression::EdgeProp { edge, prop } => ctx.get_edge_prop(edge, prop),
            Expression::SrcProp { tag, prop } => ctx.get_src_prop(tag, prop),
            Expression::DstProp { tag, prop } => ctx.get_dst_prop(tag, prop),
            Expression::Vertex => ctx.get_vertex(),
            Expression::Edge => ctx.get_edge(),
            Expression::Unary { op, operand } => {
                let value = operand.eval(ctx);
                match op {
                    UnaryOp::Not => match value.as_bool() {
                        Some(b) => Value::Bool(!b),
                        None if value.is_null() => value,
                        None => Value::Null(NullKind::BadType),
                    },
                    UnaryOp::Neg => Value::Int(0).sub(&value),
                    UnaryOp::IsNull => Value::Bool(value.is_null()),
                    UnaryOp::IsEmpty => Value::Bool(value.is_empty()),
                }
            }
            Expression::Binary { op, lhs, rhs } => {
                let l = lhs.eval(ctx);
                let r = rhs.eval(ctx);
                match op {
                    BinaryOp::Add => l.add(&r),
                    BinaryOp::Sub => l.sub(&r),
                    BinaryOp::Mul => l.mul(&r),
                    BinaryOp::Div => l.div(&r),
                    BinaryOp::Eq => Value::Bool(Self::values_equal(&l, &r)),
                    BinaryOp::Ne => Value::Bool(!Self::values_equal(&l, &r)),
                    BinaryOp::Lt => Self::ordering(&l, &r, |o| o.is_lt()),
                    BinaryOp::Le => Self::ordering(&l, &r, |o| o.is_le()),
                    BinaryOp::Gt => Self::ordering(&l, &r, |o| o.is_gt()),
                    BinaryOp::Ge => Self::ordering(&l, &r, |o| o.is_ge()),
                    BinaryOp::And => l.logical_and(&r),
                    BinaryOp::Or => l.logical_or(&r),
                }
            }
        }
    }

    /// Query-level equality: mixed int/float pairs compare numerically,
    /// everything else falls back to strict value equality.
    fn values_equal(l: &Value, r: &Value) -> bool {
        if l.is_numeric() && r.is_numeric() {
            return l.compare(r) == Some(std::cmp::Ordering::Equal);
        }
        l == r
    }

    fn ordering(l: &Value, r: &Value, pred: impl Fn(std::cmp::Ordering) -> bool) -> Value {
        for v in [l, r] {
            if v.is_bad_null() {
                return v.clone();
            }
        }
        if l.is_null() || r.is_null() {
            return Value::Null(NullKind::Null);
        }
        match l.compare(r) {
            Some(o) => Value::Bool(pred(o)),
            None => Value::Null(NullKind::BadType),
        }
    }

    // Construction helpers used by planners and tests.

    pub fn constant(value: impl Into<Value>) -> Expression {
        Expression::Constant(value.into())
    }

    pub fn var(name: impl Into<String>) -> Expression {
        Expression::Var(name.into())
    }

    pub fn input_prop(prop: impl Into<String>) -> Expression {
        Expression::InputProp(prop.into())
    }

    pub fn var_prop(var: impl Into<String>, prop: impl Into<String>) -> Expression {
        Expression::VarProp {
            var: var.into(),
            prop: prop.into(),
        }
    }

    pub fn binary(op: BinaryOp, lhs: Expression, rhs: Expression) -> Expression {
        Expression::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn not(operand: Expression) -> Expression {
        Expression::Unary {
            op: UnaryOp::Not,
            operand: Box::new(operand),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Constant(v) => write!(f, "{v}"),
            Expression::Var(name) => write!(f, "${name}"),
            Expression::VersionedVar { var, version } => write!(f, "${var}@{version}"),
            Expression::VarProp { var, prop } => write!(f, "${var}.{prop}"),
            Expression::InputProp(prop) => write!(f, "$-.{prop}"),
            Expression::TagProp { tag, prop } => write!(f, "{tag}.{prop}"),
            Expression::EdgeProp { edge, prop } => write!(f, "{edge}.{prop}"),
            Expression::SrcProp { tag, prop } => write!(f, "$^.{tag}.{prop}"),
            Expression::DstProp { tag, prop } => write!(f, "$$.{tag}.{prop}"),
            Expression::Vertex => write!(f, "$$vertex"),
            Expression::Edge => write!(f, "$$edge"),
            Expression::Unary { op, operand } => write!(f, "{op:?}({operand})"),
            Expression::Binary { op, lhs, rhs } => write!(f, "({lhs} {op:?} {rhs})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::iterator::SequentialIter;
    use crate::context::{ExecutionContext, Iter};
    use crate::value::{DataSet, Row};
    use std::sync::Arc;

    fn iter_over(rows: Vec<Vec<Value>>) -> Iter {
        let mut ds = DataSet::new(["a", "b"]);
        for row in rows {
            ds.push(Row::from(row));
        }
        Iter::Sequential(SequentialIter::new(Arc::new(Value::dataset(ds))))
    }

    #[test]
    fn test_constant_arithmetic() {
        let ectx = ExecutionContext::new();
        let ctx = QueryExpressionContext::new(&ectx);
        let e = Expression::binary(
            BinaryOp::Add,
            Expression::constant(1i64),
            Expression::binary(
                BinaryOp::Mul,
                Expression::constant(2i64),
                Expression::constant(3i64),
            ),
        );
        assert_eq!(e.eval(&ctx), Value::Int(7));
    }

    #[test]
    fn test_input_prop_comparison() {
        let ectx = ExecutionContext::new();
        let iter = iter_over(vec![vec![Value::Int(5), Value::string("x")]]);
        let ctx = QueryExpressionContext::new(&ectx).with_iter(&iter);
        let e = Expression::binary(
            BinaryOp::Gt,
            Expression::input_prop("a"),
            Expression::constant(3i64),
        );
        assert_eq!(e.eval(&ctx), Value::Bool(true));
    }

    #[test]
    fn test_comparison_propagates_nulls() {
        let ectx = ExecutionContext::new();
        let ctx = QueryExpressionContext::new(&ectx);
        let e = Expression::binary(
            BinaryOp::Lt,
            Expression::constant(Value::Null(NullKind::Null)),
            Expression::constant(1i64),
        );
        assert!(e.eval(&ctx).is_null());

        let bad = Expression::binary(
            BinaryOp::Lt,
            Expression::constant(1i64),
            Expression::constant(Value::string("x")),
        );
        assert!(bad.eval(&ctx).is_bad_null());
    }

    #[test]
    fn test_not_requires_bool() {
        let ectx = ExecutionContext::new();
        let ctx = QueryExpressionContext::new(&ectx);
        assert_eq!(
            Expression::not(Expression::constant(false)).eval(&ctx),
            Value::Bool(true)
        );
        assert!(Expression::not(Expression::constant(1i64))
            .eval(&ctx)
            .is_bad_null());
    }

    #[test]
    fn test_var_reference() {
        let ectx = ExecutionContext::new();
        ectx.set_value("count", Value::Int(3));
        let ctx = QueryExpressionContext::new(&ectx);
        let e = Expression::binary(
            BinaryOp::Lt,
            Expression::var("count"),
            Expression::constant(10i64),
        );
        assert_eq!(e.eval(&ctx), Value::Bool(true));
    }
}
