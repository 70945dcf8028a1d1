//! Resolved row filters.
//!
//! A `Filter` is the executable form of a predicate: a conjunction of
//! column comparisons whose operands are already concrete values.

use rivulet_core::{CompareOp, DataType, Row, Value};
use serde::{Deserialize, Serialize};

/// A single `column <op> value` comparison.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Position of the column in the row.
    pub column: usize,
    /// Declared type of the column; selects comparison semantics.
    pub data_type: DataType,
    pub op: CompareOp,
    pub value: Value,
}

impl Condition {
    pub fn new(column: usize, data_type: DataType, op: CompareOp, value: Value) -> Self {
        Self {
            column,
            data_type,
            op,
            value,
        }
    }

    /// Evaluates the comparison against a row. Missing cells compare as null.
    #[inline]
    pub fn matches(&self, row: &Row) -> bool {
        let cell = row.get(self.column).unwrap_or(&Value::Null);
        self.op.evaluate(self.data_type, cell, &self.value)
    }
}

/// A conjunction of conditions. The empty filter matches every row.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    /// Returns the filter that matches every row.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(conditions: Vec<Condition>) -> Self {
        Self { conditions }
    }

    /// Adds a condition to the conjunction.
    pub fn and(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Returns true if every condition holds for the row.
    pub fn matches(&self, row: &Row) -> bool {
        self.conditions.iter().all(|c| c.matches(row))
    }

    /// Returns the key value if the filter pins the primary key with `=`.
    ///
    /// Stores use this to turn a scan into a point lookup.
    pub fn key_lookup(&self, pk_column: usize) -> Option<&Value> {
        self.conditions
            .iter()
            .find(|c| c.column == pk_column && c.op == CompareOp::Eq && !c.value.is_null())
            .map(|c| &c.value)
    }
}
