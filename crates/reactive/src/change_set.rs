//! Change set for tracking query result changes.
//!
//! A `ChangeSet` is handed to listeners on every notification. It carries the
//! complete new result plus the rows that appeared and disappeared relative to
//! the previous result. Rows are compared by value, so a row whose contents
//! changed shows up once in `removed` (old image) and once in `added`.

use rivulet_core::Row;
use rivulet_query::ResultSet;
use std::collections::BTreeMap;

/// A set of changes to a query result.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChangeSet {
    /// Rows present in the new result but not in the previous one
    pub added: Vec<Row>,
    /// Rows present in the previous result but not in the new one
    pub removed: Vec<Row>,
    /// The complete result after the change
    pub current_result: ResultSet,
}

impl ChangeSet {
    /// Creates a change set for a first result: every row is an addition.
    pub fn initial(result: ResultSet) -> Self {
        Self {
            added: result.rows().to_vec(),
            removed: Vec::new(),
            current_result: result,
        }
    }

    /// Computes the multiset difference between two results.
    pub fn diff(previous: Option<&ResultSet>, current: ResultSet) -> Self {
        let previous = match previous {
            Some(previous) => previous,
            None => return Self::initial(current),
        };

        let mut counts: BTreeMap<&Row, isize> = BTreeMap::new();
        for row in previous.rows() {
            *counts.entry(row).or_default() -= 1;
        }
        for row in current.rows() {
            *counts.entry(row).or_default() += 1;
        }

        let mut added = Vec::new();
        let mut removed = Vec::new();
        for (row, count) in counts {
            let target = if count > 0 { &mut added } else { &mut removed };
            for _ in 0..count.unsigned_abs() {
                target.push(row.clone());
            }
        }

        Self {
            added,
            removed,
            current_result: current,
        }
    }

    /// Returns the result after the change.
    #[inline]
    pub fn result(&self) -> &ResultSet {
        &self.current_result
    }

    /// Returns true if no row was added or removed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Returns the total number of added and removed rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivulet_core::Value;

    fn row(id: i64, name: &str) -> Row {
        Row::new(vec![Value::Int(id), Value::from(name)])
    }

    fn result(rows: Vec<Row>) -> ResultSet {
        ResultSet::new(vec!["id".into(), "name".into()], rows)
    }

    #[test]
    fn test_initial() {
        let changes = ChangeSet::initial(result(vec![row(1, "a"), row(2, "b")]));
        assert_eq!(changes.added.len(), 2);
        assert!(changes.removed.is_empty());
        assert_eq!(changes.result().len(), 2);
    }

    #[test]
    fn test_diff_without_previous_is_initial() {
        let current = result(vec![row(1, "a")]);
        assert_eq!(ChangeSet::diff(None, current.clone()), ChangeSet::initial(current));
    }

    #[test]
    fn test_diff_added_removed() {
        let before = result(vec![row(1, "a"), row(2, "b")]);
        let after = result(vec![row(2, "b"), row(3, "c")]);
        let changes = ChangeSet::diff(Some(&before), after);
        assert_eq!(changes.added, vec![row(3, "c")]);
        assert_eq!(changes.removed, vec![row(1, "a")]);
        assert_eq!(changes.len(), 2);
    }

    #[test]
    fn test_diff_modified_row() {
        let before = result(vec![row(1, "a")]);
        let after = result(vec![row(1, "z")]);
        let changes = ChangeSet::diff(Some(&before), after);
        assert_eq!(changes.added, vec![row(1, "z")]);
        assert_eq!(changes.removed, vec![row(1, "a")]);
    }

    #[test]
    fn test_diff_duplicates_and_identity() {
        // projections can produce duplicate rows
        let before = result(vec![row(1, "a"), row(1, "a")]);
        let after = result(vec![row(1, "a")]);
        let changes = ChangeSet::diff(Some(&before), after.clone());
        assert!(changes.added.is_empty());
        assert_eq!(changes.removed, vec![row(1, "a")]);

        let same = ChangeSet::diff(Some(&after), after.clone());
        assert!(same.is_empty());
        assert_eq!(same.result(), &after);
    }
}
