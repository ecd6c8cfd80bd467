//! Scalar expression and predicate evaluation.
//! Null is a first-class value and propagates through property access,
//! arithmetic, and comparisons; predicates answer in Kleene three-valued
//! logic and only a definite `true` admits a row. Arithmetic over
//! non-numbers is a soft error that surfaces as NaN, never as an Err.

use std::collections::BTreeMap;

use crate::ast::{ArithOp, CompOp, Expression, WhereClause};
use crate::error::{EngineError, EngineResult};
use crate::value::{cmp_values, eq_values, PropertyMap, Value};

/// Variable binding environment. Pattern matching forks it per hop; the
/// session driver threads one across statements.
pub type Bindings = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Truth {
    True,
    False,
    Unknown,
}

impl Truth {
    pub(crate) fn from_option(b: Option<bool>) -> Truth {
        match b {
            Some(true) => Truth::True,
            Some(false) => Truth::False,
            None => Truth::Unknown,
        }
    }

    pub(crate) fn is_true(self) -> bool {
        self == Truth::True
    }

    pub(crate) fn negate(self) -> Truth {
        match self {
            Truth::True => Truth::False,
            Truth::False => Truth::True,
            Truth::Unknown => Truth::Unknown,
        }
    }

    pub(crate) fn and(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::False, _) | (_, Truth::False) => Truth::False,
            (Truth::True, Truth::True) => Truth::True,
            _ => Truth::Unknown,
        }
    }

    pub(crate) fn or(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::True, _) | (_, Truth::True) => Truth::True,
            (Truth::False, Truth::False) => Truth::False,
            _ => Truth::Unknown,
        }
    }
}

pub(crate) fn eval_expr(
    expr: &Expression,
    env: &Bindings,
    params: &PropertyMap,
) -> EngineResult<Value> {
    match expr {
        Expression::Literal(v) => Ok(v.clone()),
        Expression::Variable(name) => Ok(env.get(name).cloned().unwrap_or(Value::Null)),
        Expression::Property(var, prop) => Ok(lookup_property(env, var, prop)),
        Expression::Parameter(name) => Ok(params.get(name).cloned().unwrap_or(Value::Null)),
        Expression::All => Err(EngineError::evaluation(
            "'*' is only valid in RETURN and count(*)",
        )),
        Expression::ListLiteral(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(eval_expr(item, env, params)?);
            }
            Ok(Value::List(out))
        }
        Expression::Arith { left, op, right } => {
            let l = eval_expr(left, env, params)?;
            let r = eval_expr(right, env, params)?;
            Ok(arith_value(&l, *op, &r))
        }
        Expression::Neg(inner) => Ok(neg_value(eval_expr(inner, env, params)?)),
        Expression::Labels(var) => Ok(match env.get(var) {
            Some(Value::Node(n)) => {
                Value::List(n.labels.iter().map(|l| Value::Str(l.clone())).collect())
            }
            _ => Value::Null,
        }),
        Expression::TypeOf(var) => Ok(match env.get(var) {
            Some(Value::Rel(r)) => Value::Str(r.rel_type.clone()),
            _ => Value::Null,
        }),
        Expression::Id(var) => Ok(match env.get(var) {
            Some(Value::Node(n)) => n.id.clone(),
            Some(Value::Rel(r)) => r.id.clone(),
            _ => Value::Null,
        }),
        Expression::Nodes(var) => Ok(match env.get(var) {
            Some(Value::Path(p)) => {
                Value::List(p.nodes.iter().map(|n| Value::Node(Box::new(n.clone()))).collect())
            }
            _ => Value::Null,
        }),
        Expression::Length(inner) => Ok(length_value(eval_expr(inner, env, params)?)),
        Expression::Aggregate { .. } => Err(EngineError::evaluation(
            "aggregate function outside an aggregating RETURN",
        )),
    }
}

fn lookup_property(env: &Bindings, var: &str, prop: &str) -> Value {
    match env.get(var) {
        Some(Value::Node(n)) => n.properties.get(prop).cloned().unwrap_or(Value::Null),
        Some(Value::Rel(r)) => r.properties.get(prop).cloned().unwrap_or(Value::Null),
        Some(Value::Map(m)) => m.get(prop).cloned().unwrap_or(Value::Null),
        // Missing variable or a Null binding both read as Null.
        _ => Value::Null,
    }
}

pub(crate) fn neg_value(v: Value) -> Value {
    match v {
        Value::Null => Value::Null,
        Value::Int(n) => Value::Int(-n),
        Value::Float(f) => Value::Float(-f),
        _ => Value::Float(f64::NAN),
    }
}

pub(crate) fn length_value(v: Value) -> Value {
    match v {
        Value::Path(p) => Value::Int(p.len() as i64),
        Value::List(items) => Value::Int(items.len() as i64),
        Value::Str(s) => Value::Int(s.chars().count() as i64),
        _ => Value::Null,
    }
}

pub(crate) fn arith_value(l: &Value, op: ArithOp, r: &Value) -> Value {
    if l.is_null() || r.is_null() {
        return Value::Null;
    }
    if op == ArithOp::Add {
        // String concatenation, including the mixed string/number form.
        match (l, r) {
            (Value::Str(a), Value::Str(b)) => return Value::Str(format!("{}{}", a, b)),
            (Value::Str(a), Value::Int(_) | Value::Float(_)) => {
                return Value::Str(format!("{}{}", a, string_form(r)))
            }
            (Value::Int(_) | Value::Float(_), Value::Str(b)) => {
                return Value::Str(format!("{}{}", string_form(l), b))
            }
            _ => {}
        }
    }
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => match op {
            ArithOp::Add => Value::Int(a.wrapping_add(*b)),
            ArithOp::Sub => Value::Int(a.wrapping_sub(*b)),
            ArithOp::Mul => Value::Int(a.wrapping_mul(*b)),
            // Division follows the source language's float semantics.
            ArithOp::Div => Value::Float(*a as f64 / *b as f64),
        },
        _ => match (l.as_number(), r.as_number()) {
            (Some(a), Some(b)) => Value::Float(match op {
                ArithOp::Add => a + b,
                ArithOp::Sub => a - b,
                ArithOp::Mul => a * b,
                ArithOp::Div => a / b,
            }),
            // Non-numeric arithmetic is a soft error.
            _ => Value::Float(f64::NAN),
        },
    }
}

fn string_form(v: &Value) -> String {
    match v {
        Value::Int(n) => n.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Str(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn eval_where(
    clause: &WhereClause,
    env: &Bindings,
    params: &PropertyMap,
) -> EngineResult<Truth> {
    match clause {
        WhereClause::And(a, b) => Ok(eval_where(a, env, params)?.and(eval_where(b, env, params)?)),
        WhereClause::Or(a, b) => Ok(eval_where(a, env, params)?.or(eval_where(b, env, params)?)),
        WhereClause::Not(inner) => Ok(eval_where(inner, env, params)?.negate()),
        WhereClause::Condition { left, op, right } => {
            let lv = eval_expr(left, env, params)?;
            match op {
                CompOp::IsNull => return Ok(Truth::from_option(Some(lv.is_null()))),
                CompOp::IsNotNull => return Ok(Truth::from_option(Some(!lv.is_null()))),
                _ => {}
            }
            let rv = match right {
                Some(r) => eval_expr(r, env, params)?,
                None => Value::Null,
            };
            Ok(compare(&lv, *op, &rv))
        }
    }
}

fn compare(l: &Value, op: CompOp, r: &Value) -> Truth {
    match op {
        CompOp::Eq => Truth::from_option(eq_values(l, r)),
        CompOp::Ne => Truth::from_option(eq_values(l, r)).negate(),
        CompOp::Lt | CompOp::Le | CompOp::Gt | CompOp::Ge => match cmp_values(l, r) {
            Some(ord) => Truth::from_option(Some(match op {
                CompOp::Lt => ord.is_lt(),
                CompOp::Le => ord.is_le(),
                CompOp::Gt => ord.is_gt(),
                _ => ord.is_ge(),
            })),
            None => Truth::Unknown,
        },
        CompOp::In => match r {
            Value::List(items) => {
                if items.is_empty() {
                    return Truth::False;
                }
                let mut unknown = false;
                for item in items {
                    match eq_values(l, item) {
                        Some(true) => return Truth::True,
                        Some(false) => {}
                        None => unknown = true,
                    }
                }
                if unknown {
                    Truth::Unknown
                } else {
                    Truth::False
                }
            }
            // IN against a non-list answers Null.
            _ => Truth::Unknown,
        },
        CompOp::StartsWith | CompOp::EndsWith | CompOp::Contains => match (l, r) {
            (Value::Str(a), Value::Str(b)) => Truth::from_option(Some(match op {
                CompOp::StartsWith => a.starts_with(b.as_str()),
                CompOp::EndsWith => a.ends_with(b.as_str()),
                _ => a.contains(b.as_str()),
            })),
            _ => Truth::Unknown,
        },
        CompOp::IsNull | CompOp::IsNotNull => unreachable!("handled before value comparison"),
    }
}
