//! Query descriptors.
//!
//! A `QueryDescriptor` is the parsed, schema-validated and immutable form of a
//! query string. It is a tagged variant over the four statement kinds plus the
//! list of named placeholders the statement references.

mod display;
mod predicate;

pub use predicate::{Operand, Predicate, Term};

use rivulet_core::DataType;
use serde::Serialize;

/// A resolved reference to a table column.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    /// Column name.
    pub name: String,
    /// Column index in the table schema.
    pub index: usize,
    /// Declared column type.
    pub data_type: DataType,
}

impl ColumnRef {
    pub fn new(name: impl Into<String>, index: usize, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            index,
            data_type,
        }
    }
}

/// Statement kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl QueryKind {
    pub fn name(&self) -> &'static str {
        match self {
            QueryKind::Select => "select",
            QueryKind::Insert => "insert",
            QueryKind::Update => "update",
            QueryKind::Delete => "delete",
        }
    }

    pub fn is_mutation(&self) -> bool {
        !matches!(self, QueryKind::Select)
    }
}

/// Projected columns of a select.
#[derive(Clone, Debug, PartialEq)]
pub enum Projection {
    /// `*`: every column.
    All,
    /// Explicit columns, held in schema-declared order.
    Columns(Vec<ColumnRef>),
}

/// `select <cols|*> from <table> [where <predicate>]`
#[derive(Clone, Debug, PartialEq)]
pub struct SelectOp {
    pub table: String,
    pub projection: Projection,
    pub predicate: Predicate,
}

/// `insert into <table> (<cols>) values (<operands>)`
#[derive(Clone, Debug, PartialEq)]
pub struct InsertOp {
    pub table: String,
    pub columns: Vec<ColumnRef>,
    pub values: Vec<Operand>,
}

/// `column = operand` in an update.
#[derive(Clone, Debug, PartialEq)]
pub struct SetClause {
    pub column: ColumnRef,
    pub operand: Operand,
}

/// `update <table> set <col> = <operand>, ... [where <predicate>]`
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateOp {
    pub table: String,
    pub assignments: Vec<SetClause>,
    pub predicate: Predicate,
}

/// `delete from <table> [where <predicate>]`
#[derive(Clone, Debug, PartialEq)]
pub struct DeleteOp {
    pub table: String,
    pub predicate: Predicate,
}

/// The statement a descriptor holds.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryOp {
    Select(SelectOp),
    Insert(InsertOp),
    Update(UpdateOp),
    Delete(DeleteOp),
}

/// Syntactic role of a placeholder occurrence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlotRole {
    /// Right-hand side of a where-clause term.
    Filter,
    /// An inserted value.
    Value,
    /// An update assignment.
    Assignment,
}

/// One position a placeholder fills.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PlaceholderSlot {
    /// Occurrence number among all placeholder occurrences, in text order.
    pub ordinal: usize,
    pub column: ColumnRef,
    pub role: SlotRole,
}

/// A distinct placeholder name and every slot it fills.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Placeholder {
    pub name: String,
    pub slots: Vec<PlaceholderSlot>,
}

/// A compiled query or mutation.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryDescriptor {
    op: QueryOp,
    placeholders: Vec<Placeholder>,
}

impl QueryDescriptor {
    /// Wraps a statement, collecting its placeholders in first-occurrence order.
    pub fn new(op: QueryOp) -> Self {
        let placeholders = collect_placeholders(&op);
        Self { op, placeholders }
    }

    pub fn op(&self) -> &QueryOp {
        &self.op
    }

    pub fn kind(&self) -> QueryKind {
        match self.op {
            QueryOp::Select(_) => QueryKind::Select,
            QueryOp::Insert(_) => QueryKind::Insert,
            QueryOp::Update(_) => QueryKind::Update,
            QueryOp::Delete(_) => QueryKind::Delete,
        }
    }

    pub fn is_mutation(&self) -> bool {
        self.kind().is_mutation()
    }

    /// The target table.
    pub fn table(&self) -> &str {
        match &self.op {
            QueryOp::Select(op) => &op.table,
            QueryOp::Insert(op) => &op.table,
            QueryOp::Update(op) => &op.table,
            QueryOp::Delete(op) => &op.table,
        }
    }

    /// The where clause, for statements that have one.
    pub fn predicate(&self) -> Option<&Predicate> {
        match &self.op {
            QueryOp::Select(op) => Some(&op.predicate),
            QueryOp::Update(op) => Some(&op.predicate),
            QueryOp::Delete(op) => Some(&op.predicate),
            QueryOp::Insert(_) => None,
        }
    }

    pub fn as_select(&self) -> Option<&SelectOp> {
        match &self.op {
            QueryOp::Select(op) => Some(op),
            _ => None,
        }
    }

    /// Distinct placeholders in order of first occurrence.
    pub fn placeholders(&self) -> &[Placeholder] {
        &self.placeholders
    }

    /// Distinct placeholder names in order of first occurrence.
    pub fn placeholder_names(&self) -> impl Iterator<Item = &str> {
        self.placeholders.iter().map(|p| p.name.as_str())
    }
}

fn filter_slots(predicate: &Predicate) -> impl Iterator<Item = (&ColumnRef, &Operand, SlotRole)> {
    predicate
        .terms()
        .iter()
        .map(|t| (&t.column, &t.operand, SlotRole::Filter))
}

fn collect_placeholders(op: &QueryOp) -> Vec<Placeholder> {
    let mut occurrences: Vec<(&ColumnRef, &Operand, SlotRole)> = Vec::new();

    match op {
        QueryOp::Select(select) => occurrences.extend(filter_slots(&select.predicate)),
        QueryOp::Insert(insert) => occurrences.extend(
            insert
                .columns
                .iter()
                .zip(&insert.values)
                .map(|(c, v)| (c, v, SlotRole::Value)),
        ),
        QueryOp::Update(update) => {
            occurrences.extend(
                update
                    .assignments
                    .iter()
                    .map(|a| (&a.column, &a.operand, SlotRole::Assignment)),
            );
            occurrences.extend(filter_slots(&update.predicate));
        }
        QueryOp::Delete(delete) => occurrences.extend(filter_slots(&delete.predicate)),
    }

    let mut placeholders: Vec<Placeholder> = Vec::new();
    let named = occurrences
        .into_iter()
        .filter_map(|(column, operand, role)| operand.as_placeholder().map(|n| (n, column, role)));
    for (ordinal, (name, column, role)) in named.enumerate() {
        let slot = PlaceholderSlot {
            ordinal,
            column: column.clone(),
            role,
        };
        match placeholders.iter_mut().find(|p| p.name == name) {
            Some(existing) => existing.slots.push(slot),
            None => placeholders.push(Placeholder {
                name: name.to_string(),
                slots: vec![slot],
            }),
        }
    }
    placeholders
}
