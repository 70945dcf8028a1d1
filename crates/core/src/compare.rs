//! Comparison operators used by query predicates.

use crate::types::DataType;
use crate::value::Value;
use core::cmp::Ordering;
use core::fmt;
use serde::{Deserialize, Serialize};

/// A predicate comparator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// Returns the operator as written in the query language.
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    /// Evaluates `lhs <op> rhs` with the semantics of the declared column type.
    ///
    /// Numeric columns compare numerically, text columns compare lexically
    /// (case-sensitive, byte order), booleans order `false < true`.
    /// `Null` equals only `Null`; ordering operators never match `Null`,
    /// nor do they match incomparable floats (NaN).
    pub fn evaluate(&self, data_type: DataType, lhs: &Value, rhs: &Value) -> bool {
        if lhs.is_null() || rhs.is_null() {
            let both = lhs.is_null() && rhs.is_null();
            return match self {
                CompareOp::Eq => both,
                CompareOp::Ne => !both,
                _ => false,
            };
        }

        match typed_cmp(data_type, lhs, rhs) {
            Some(ordering) => match self {
                CompareOp::Eq => ordering == Ordering::Equal,
                CompareOp::Ne => ordering != Ordering::Equal,
                CompareOp::Lt => ordering == Ordering::Less,
                CompareOp::Le => ordering != Ordering::Greater,
                CompareOp::Gt => ordering == Ordering::Greater,
                CompareOp::Ge => ordering != Ordering::Less,
            },
            None => matches!(self, CompareOp::Ne),
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Orders two non-null values under the declared type.
fn typed_cmp(data_type: DataType, lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match data_type {
        DataType::Int | DataType::Timestamp | DataType::Float => {
            match (lhs, rhs) {
                (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
                (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
                _ => {
                    let a = numeric(lhs)?;
                    let b = numeric(rhs)?;
                    a.partial_cmp(&b)
                }
            }
        }
        DataType::Text => Some(lhs.as_text()?.cmp(rhs.as_text()?)),
        DataType::Boolean => Some(lhs.as_bool()?.cmp(&rhs.as_bool()?)),
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Int(v) | Value::Timestamp(v) => Some(*v as f64),
        Value::Float(v) => Some(*v),
        _ => None,
    }
}
