//! Constraint checking for stored rows.
//!
//! Every row written to the store passes through `ConstraintChecker::conform`,
//! which enforces the row width, not-null and declared-type constraints and
//! normalizes values to their column's representation.

use crate::error::{Result, StoreError};
use rivulet_core::schema::{Rejection, Table};
use rivulet_core::{Row, Value};

/// Constraint checker for validating rows against a table schema.
pub struct ConstraintChecker;

impl ConstraintChecker {
    /// Checks the row and returns it with each value coerced to its column type.
    pub fn conform(schema: &Table, row: Row) -> Result<Row> {
        Self::check_width(schema, &row)?;
        let values = row
            .into_values()
            .into_iter()
            .zip(schema.columns())
            .map(|(value, column)| Self::conform_value(schema, column.index(), value))
            .collect::<Result<Vec<_>>>()?;
        Ok(Row::new(values))
    }

    /// Checks a single value destined for the column at `index`.
    pub fn conform_value(schema: &Table, index: usize, value: Value) -> Result<Value> {
        let column = schema
            .columns()
            .get(index)
            .ok_or_else(|| StoreError::UnknownColumn {
                table: schema.name().to_string(),
                column: format!("#{index}"),
            })?;

        column.admit(value).map_err(|rejection| match rejection {
            Rejection::Null => StoreError::NullViolation {
                table: schema.name().to_string(),
                column: column.name().to_string(),
            },
            Rejection::Type(found) => StoreError::TypeMismatch {
                table: schema.name().to_string(),
                column: column.name().to_string(),
                expected: column.data_type(),
                found,
            },
        })
    }

    /// Checks that the row has one value per column.
    pub fn check_width(schema: &Table, row: &Row) -> Result<()> {
        if row.len() != schema.width() {
            return Err(StoreError::RowWidth {
                table: schema.name().to_string(),
                expected: schema.width(),
                found: row.len(),
            });
        }
        Ok(())
    }
}
