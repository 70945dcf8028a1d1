//! Bound parameters and placeholder resolution.
//!
//! Resolution turns a descriptor plus `Params` into the concrete forms the
//! store understands: a `Filter` for predicates and a `MutationOp` for
//! insert/update/delete. Every placeholder must be bound, and every bound
//! value must be usable with each column it fills.

use crate::ast::{ColumnRef, Operand, Predicate, QueryDescriptor, QueryOp};
use crate::error::ExecError;
use hashbrown::HashMap;
use rivulet_core::{Row, Value};
use rivulet_storage::{Assignment, Condition, Filter, MutationOp};

/// Placeholder name → value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Params {
    values: HashMap<String, Value>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style binding.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Fails with `MissingBinding` for the first unbound placeholder.
    pub fn check_complete(&self, descriptor: &QueryDescriptor) -> Result<(), ExecError> {
        match descriptor
            .placeholder_names()
            .find(|name| !self.values.contains_key(*name))
        {
            Some(name) => Err(ExecError::MissingBinding {
                name: name.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Resolves an operand to a value of `column`'s type.
    pub fn resolve(&self, operand: &Operand, column: &ColumnRef) -> Result<Value, ExecError> {
        match operand {
            Operand::Literal(value) => Ok(value.clone()),
            Operand::Placeholder(name) => {
                let value = self.get(name).ok_or_else(|| ExecError::MissingBinding {
                    name: name.clone(),
                })?;
                value
                    .coerce_to(column.data_type)
                    .ok_or_else(|| ExecError::TypeMismatch {
                        placeholder: name.clone(),
                        column: column.name.clone(),
                        expected: column.data_type,
                        found: value.type_name(),
                    })
            }
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.set(k, v);
        }
        params
    }
}

/// Resolves a predicate into a store filter.
pub fn resolve_filter(predicate: &Predicate, params: &Params) -> Result<Filter, ExecError> {
    predicate
        .terms()
        .iter()
        .map(|term| {
            params
                .resolve(&term.operand, &term.column)
                .map(|value| Condition::new(term.column.index, term.column.data_type, term.op, value))
        })
        .collect::<Result<Vec<_>, ExecError>>()
        .map(Filter::new)
}

/// Resolves a mutation descriptor into `(table, op)`.
///
/// `width` is the number of columns of the target table; inserted rows are
/// widened with nulls for the columns the statement omits.
pub fn resolve_mutation(
    descriptor: &QueryDescriptor,
    params: &Params,
    width: usize,
) -> Result<MutationOp, ExecError> {
    if !descriptor.is_mutation() {
        return Err(ExecError::NotAMutation {
            kind: descriptor.kind().name(),
        });
    }
    params.check_complete(descriptor)?;
    match descriptor.op() {
        QueryOp::Select(_) => Err(ExecError::NotAMutation { kind: "select" }),
        QueryOp::Insert(insert) => {
            let mut row = Row::nulls(width);
            for (column, operand) in insert.columns.iter().zip(&insert.values) {
                row.set(column.index, params.resolve(operand, column)?);
            }
            Ok(MutationOp::Insert { rows: vec![row] })
        }
        QueryOp::Update(update) => {
            let assignments = update
                .assignments
                .iter()
                .map(|a| {
                    params
                        .resolve(&a.operand, &a.column)
                        .map(|value| Assignment::new(a.column.index, value))
                })
                .collect::<Result<Vec<_>, ExecError>>()?;
            Ok(MutationOp::Update {
                filter: resolve_filter(&update.predicate, params)?,
                assignments,
            })
        }
        QueryOp::Delete(delete) => Ok(MutationOp::Delete {
            filter: resolve_filter(&delete.predicate, params)?,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use rivulet_core::schema::{SchemaRegistry, TableBuilder};
    use rivulet_core::{CompareOp, DataType};

    fn registry() -> SchemaRegistry {
        let registry = SchemaRegistry::new();
        registry
            .define(
                TableBuilder::new("events")
                    .unwrap()
                    .add_column("id", DataType::Int)
                    .unwrap()
                    .add_column("title", DataType::Text)
                    .unwrap()
                    .add_column("at", DataType::Timestamp)
                    .unwrap()
                    .add_column("weight", DataType::Float)
                    .unwrap()
                    .add_nullable(&["at", "weight"])
                    .add_primary_key("id")
                    .unwrap()
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_params_builder() {
        let params = Params::new().bind("id", 1).bind("title", "x");
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("id"), Some(&Value::Int(1)));

        let collected: Params = [("id", Value::Int(1)), ("title", Value::from("x"))]
            .into_iter()
            .collect();
        assert_eq!(collected, params);
    }

    #[test]
    fn test_missing_binding() {
        let d = parse("delete from events where id = :id and title = :title", &registry()).unwrap();
        let err = resolve_mutation(&d, &Params::new().bind("id", 1), 4).unwrap_err();
        assert_eq!(err, ExecError::MissingBinding { name: "title".into() });
    }

    #[test]
    fn test_type_mismatch() {
        let d = parse("select * from events where title = :t", &registry()).unwrap();
        let err = resolve_filter(d.predicate().unwrap(), &Params::new().bind("t", 5)).unwrap_err();
        assert!(matches!(err, ExecError::TypeMismatch { found: "int", .. }));
    }

    #[test]
    fn test_bound_values_are_coerced() {
        let d = parse("select * from events where at > :since and weight = :w", &registry()).unwrap();
        let filter = resolve_filter(
            d.predicate().unwrap(),
            &Params::new().bind("since", 1_000).bind("w", 2),
        )
        .unwrap();
        assert_eq!(
            filter.conditions()[0],
            Condition::new(2, DataType::Timestamp, CompareOp::Gt, Value::Timestamp(1_000))
        );
        assert_eq!(filter.conditions()[1].value, Value::Float(2.0));
    }

    #[test]
    fn test_resolve_insert_widens_row() {
        let d = parse("insert into events (title, id) values (:t, 7)", &registry()).unwrap();
        let op = resolve_mutation(&d, &Params::new().bind("t", "launch"), 4).unwrap();
        assert_eq!(
            op,
            MutationOp::Insert {
                rows: vec![Row::new(vec![
                    Value::Int(7),
                    Value::from("launch"),
                    Value::Null,
                    Value::Null
                ])]
            }
        );
    }

    #[test]
    fn test_resolve_update() {
        let d = parse("update events set weight = :w where id = :id", &registry()).unwrap();
        let op = resolve_mutation(&d, &Params::new().bind("w", 0.5).bind("id", 3), 4).unwrap();
        match op {
            MutationOp::Update { filter, assignments } => {
                assert_eq!(assignments, vec![Assignment::new(3, Value::Float(0.5))]);
                assert_eq!(filter.key_lookup(0), Some(&Value::Int(3)));
            }
            other => panic!("unexpected op {other:?}"),
        }
    }

    #[test]
    fn test_select_is_not_a_mutation() {
        let d = parse("select * from events", &registry()).unwrap();
        assert_eq!(
            resolve_mutation(&d, &Params::new(), 4).unwrap_err(),
            ExecError::NotAMutation { kind: "select" }
        );
    }
}
