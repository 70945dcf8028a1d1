//! Canonical text form of descriptors.
//!
//! Lower-case keywords, single spaces, `, ` between list items and canonical
//! literal spelling. Parsing the output yields an equal descriptor.

use super::{
    DeleteOp, InsertOp, Operand, Predicate, Projection, QueryDescriptor, QueryOp, SelectOp,
    SetClause, Term, UpdateOp,
};
use std::fmt::{self, Display, Formatter};

impl Display for Operand {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Literal(value) => write!(f, "{value}"),
            Operand::Placeholder(name) => write!(f, ":{name}"),
        }
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.column.name, self.op, self.operand)
    }
}

impl Display for Predicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_list(f, self.terms(), " and ")
    }
}

impl Display for SetClause {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.column.name, self.operand)
    }
}

fn write_list<T: Display>(f: &mut Formatter<'_>, items: &[T], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn write_where(f: &mut Formatter<'_>, predicate: &Predicate) -> fmt::Result {
    if predicate.is_empty() {
        Ok(())
    } else {
        write!(f, " where {predicate}")
    }
}

impl Display for SelectOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("select ")?;
        match &self.projection {
            Projection::All => f.write_str("*")?,
            Projection::Columns(columns) => {
                let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
                write_list(f, &names, ", ")?;
            }
        }
        write!(f, " from {}", self.table)?;
        write_where(f, &self.predicate)
    }
}

impl Display for InsertOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "insert into {} (", self.table)?;
        let names: Vec<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
        write_list(f, &names, ", ")?;
        f.write_str(") values (")?;
        write_list(f, &self.values, ", ")?;
        f.write_str(")")
    }
}

impl Display for UpdateOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "update {} set ", self.table)?;
        write_list(f, &self.assignments, ", ")?;
        write_where(f, &self.predicate)
    }
}

impl Display for DeleteOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "delete from {}", self.table)?;
        write_where(f, &self.predicate)
    }
}

impl Display for QueryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            QueryOp::Select(op) => Display::fmt(op, f),
            QueryOp::Insert(op) => Display::fmt(op, f),
            QueryOp::Update(op) => Display::fmt(op, f),
            QueryOp::Delete(op) => Display::fmt(op, f),
        }
    }
}

impl Display for QueryDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self.op(), f)
    }
}
