//! Tabular sinks: where finished tables go.
//!
//! A sink receives one named output at a time: an ordered header and
//! header-aligned rows of cells. CsvSink writes `<dir>/<name>.csv`;
//! the SQLite sink lives in store/.

use crate::{
    error::SynthResult,
    table::{Record, Table},
};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

/// One value in a persisted row.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Int(i64),
    Real(f64),
    Text(String),
}

impl Cell {
    /// Map a serialized field onto a cell. Nested values have no cell form.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        use serde_json::Value;
        match value {
            Value::Null => Some(Cell::Null),
            Value::Bool(b) => Some(Cell::Int(*b as i64)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Cell::Int(i)),
                None => n.as_f64().map(Cell::Real),
            },
            Value::String(s) => Some(Cell::Text(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Text form used by delimited outputs. Whole floats keep a trailing `.0`.
    pub fn render(&self) -> String {
        match self {
            Cell::Null => String::new(),
            Cell::Int(i) => i.to_string(),
            Cell::Real(f) => format!("{f:?}"),
            Cell::Text(s) => s.clone(),
        }
    }
}

pub trait TabularSink {
    fn write_rows(&mut self, name: &str, header: &[&str], rows: &[Vec<Cell>]) -> SynthResult<()>;
}

/// Flatten a typed table and hand it to a sink under the table's name.
pub fn write_table<R: Record>(sink: &mut dyn TabularSink, table: &Table<R>) -> SynthResult<()> {
    let rows = table.to_cells()?;
    sink.write_rows(table.name(), R::HEADER, &rows)?;
    log::debug!("sink: wrote {} rows to '{}'", rows.len(), table.name());
    Ok(())
}

// ── CSV directory ─────────────────────────────────────────────

pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    /// Create the output directory if needed.
    pub fn create(dir: impl Into<PathBuf>) -> SynthResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        csv_path(&self.dir, name)
    }
}

impl TabularSink for CsvSink {
    fn write_rows(&mut self, name: &str, header: &[&str], rows: &[Vec<Cell>]) -> SynthResult<()> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_path(self.path_for(name))?;
        writer.write_record(header)?;
        for row in rows {
            writer.write_record(row.iter().map(Cell::render))?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn csv_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.csv"))
}

/// Read `<dir>/<name>.csv` back into typed rows. Columns match by header name.
pub fn read_table<R: Record>(dir: &Path, name: &str) -> SynthResult<Table<R>> {
    let mut reader = csv::Reader::from_path(csv_path(dir, name))?;
    let rows = reader
        .deserialize::<R>()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Table::new(name, rows))
}

// ── In-memory capture ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct CapturedTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

/// Keeps every output in memory, keyed by name. Used by tests and tooling.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub tables: BTreeMap<String, CapturedTable>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, name: &str) -> Option<&CapturedTable> {
        self.tables.get(name)
    }
}

impl TabularSink for MemorySink {
    fn write_rows(&mut self, name: &str, header: &[&str], rows: &[Vec<Cell>]) -> SynthResult<()> {
        self.tables.insert(
            name.to_string(),
            CapturedTable {
                header: header.iter().map(|h| h.to_string()).collect(),
                rows: rows.to_vec(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_floats_keep_decimal_point() {
        assert_eq!(Cell::Real(10.0).render(), "10.0");
        assert_eq!(Cell::Real(-4.75).render(), "-4.75");
        assert_eq!(Cell::Int(150_000).render(), "150000");
        assert_eq!(Cell::Null.render(), "");
    }

    #[test]
    fn json_numbers_keep_their_kind() {
        assert_eq!(Cell::from_json(&serde_json::json!(3)), Some(Cell::Int(3)));
        assert_eq!(Cell::from_json(&serde_json::json!(3.0)), Some(Cell::Real(3.0)));
        assert_eq!(Cell::from_json(&serde_json::json!([1])), None);
    }

    #[test]
    fn csv_sink_quotes_embedded_delimiters() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::create(dir.path()).unwrap();
        sink.write_rows(
            "quoted",
            &["name", "value"],
            &[vec![Cell::Text("e*trade, inc".into()), Cell::Int(1)]],
        )
        .unwrap();

        let written = fs::read_to_string(sink.path_for("quoted")).unwrap();
        assert_eq!(written, "name,value\n\"e*trade, inc\",1\n");
    }
}
