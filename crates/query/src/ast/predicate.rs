//! Predicate definitions for query filtering.

use super::ColumnRef;
use rivulet_core::{CompareOp, Value};

/// Right-hand side of a comparison or assignment.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    /// A literal, already coerced to its column's type.
    Literal(Value),
    /// A named placeholder, `:name`.
    Placeholder(String),
}

impl Operand {
    pub fn placeholder(name: impl Into<String>) -> Self {
        Operand::Placeholder(name.into())
    }

    pub fn as_placeholder(&self) -> Option<&str> {
        match self {
            Operand::Placeholder(name) => Some(name),
            Operand::Literal(_) => None,
        }
    }
}

/// `column <op> operand`.
#[derive(Clone, Debug, PartialEq)]
pub struct Term {
    pub column: ColumnRef,
    pub op: CompareOp,
    pub operand: Operand,
}

/// A conjunction of terms. Empty means "no where clause".
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Predicate {
    terms: Vec<Term>,
}

impl Predicate {
    pub fn new(terms: Vec<Term>) -> Self {
        Self { terms }
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Columns referenced by the predicate, in term order.
    pub fn columns(&self) -> impl Iterator<Item = &ColumnRef> {
        self.terms.iter().map(|t| &t.column)
    }
}
