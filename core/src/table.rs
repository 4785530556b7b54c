//! In-memory table repositories.
//!
//! RULE: A stage receives earlier tables by shared reference only.
//! Once a Table is built it is never mutated; reconciliation passes
//! produce new tables instead.

use crate::{
    error::{SynthError, SynthResult},
    sink::Cell,
};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;

/// A row type persisted as one table.
///
/// Field names serialize to the entries of `HEADER`, in that order.
pub trait Record: Serialize + DeserializeOwned + Clone {
    const HEADER: &'static [&'static str];

    /// Lookup key. Unique for every table that is a foreign-key parent.
    fn key(&self) -> String;
}

#[derive(Debug, Clone)]
pub struct Table<R: Record> {
    name: String,
    rows: Vec<R>,
    index: HashMap<String, usize>,
}

impl<R: Record> Table<R> {
    pub fn new(name: impl Into<String>, rows: Vec<R>) -> Self {
        let mut index = HashMap::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            // First occurrence wins for lookups.
            index.entry(row.key()).or_insert(i);
        }
        Self {
            name: name.into(),
            rows,
            index,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&R> {
        self.index.get(key).map(|i| &self.rows[*i])
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Like `get`, for foreign keys that must resolve.
    pub fn require(&self, table: &'static str, key: &str) -> SynthResult<&R> {
        self.get(key).ok_or_else(|| SynthError::MissingParent {
            table,
            key: key.to_string(),
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = String> + '_ {
        self.rows.iter().map(Record::key)
    }

    /// Flatten every row into header-aligned cells.
    pub fn to_cells(&self) -> SynthResult<Vec<Vec<Cell>>> {
        self.rows
            .iter()
            .map(|row| {
                let value = serde_json::to_value(row)?;
                R::HEADER
                    .iter()
                    .map(|column| {
                        let field = value.get(*column).unwrap_or(&serde_json::Value::Null);
                        Cell::from_json(field).ok_or_else(|| SynthError::UnsupportedCell {
                            table: self.name.clone(),
                            column: column.to_string(),
                        })
                    })
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Pair {
        #[serde(rename = "pairid")]
        id: String,
        ratio: f64,
        note: Option<String>,
    }

    impl Record for Pair {
        const HEADER: &'static [&'static str] = &["pairid", "ratio", "note"];

        fn key(&self) -> String {
            self.id.clone()
        }
    }

    fn pair(id: &str, ratio: f64) -> Pair {
        Pair {
            id: id.into(),
            ratio,
            note: None,
        }
    }

    #[test]
    fn lookup_by_key_returns_first_occurrence() {
        let table = Table::new("pair", vec![pair("x", 1.0), pair("y", 2.0), pair("x", 3.0)]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.get("x").unwrap().ratio, 1.0);
        assert!(table.get("z").is_none());
        assert!(matches!(
            table.require("pair", "z"),
            Err(SynthError::MissingParent { table: "pair", .. })
        ));
    }

    #[test]
    fn cells_follow_header_order() {
        let table = Table::new("pair", vec![pair("x", 10.0)]);
        let cells = table.to_cells().unwrap();
        assert_eq!(
            cells[0],
            vec![Cell::Text("x".into()), Cell::Real(10.0), Cell::Null]
        );
    }
}
