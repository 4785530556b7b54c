use super::SynthStore;
use crate::{
    error::SynthResult,
    sink::{Cell, TabularSink},
};
use rusqlite::{
    params_from_iter,
    types::{ToSqlOutput, Value},
    ToSql,
};

impl ToSql for Cell {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Cell::Null => ToSqlOutput::Owned(Value::Null),
            Cell::Int(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            Cell::Real(f) => ToSqlOutput::Owned(Value::Real(*f)),
            Cell::Text(s) => ToSqlOutput::Borrowed(s.as_str().into()),
        })
    }
}

/// Output names include SQL keywords (`transaction`), so every identifier is quoted.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

impl SynthStore {
    pub fn row_count(&self, table: &str) -> SynthResult<i64> {
        let count = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Column `column` of `table`, in insertion order, as cells.
    pub fn column_cells(&self, table: &str, column: &str) -> SynthResult<Vec<Cell>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM {} ORDER BY rowid ASC",
            quote_ident(column),
            quote_ident(table)
        ))?;
        let cells = stmt
            .query_map([], |row| {
                Ok(match row.get::<_, Value>(0)? {
                    Value::Null => Cell::Null,
                    Value::Integer(i) => Cell::Int(i),
                    Value::Real(f) => Cell::Real(f),
                    Value::Text(s) => Cell::Text(s),
                    Value::Blob(b) => Cell::Text(String::from_utf8_lossy(&b).into_owned()),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(cells)
    }
}

/// Each output replaces any same-named table; rows go in one transaction.
impl TabularSink for SynthStore {
    fn write_rows(&mut self, name: &str, header: &[&str], rows: &[Vec<Cell>]) -> SynthResult<()> {
        let table = quote_ident(name);
        let columns: Vec<String> = header.iter().map(|c| quote_ident(c)).collect();
        let placeholders: Vec<String> = (1..=header.len()).map(|i| format!("?{i}")).collect();

        let tx = self.conn.transaction()?;
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table}; CREATE TABLE {table} ({});",
            columns.join(", ")
        ))?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {table} ({}) VALUES ({})",
                columns.join(", "),
                placeholders.join(", ")
            ))?;
            for row in rows {
                stmt.execute(params_from_iter(row.iter()))?;
            }
        }
        tx.commit()?;
        log::debug!("store: wrote {} rows to {name}", rows.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_creates_keyword_named_table() {
        let mut store = SynthStore::in_memory().unwrap();
        let rows = vec![
            vec![Cell::Text("t001".into()), Cell::Int(500), Cell::Null],
            vec![Cell::Text("t002".into()), Cell::Int(750), Cell::Real(10.0)],
        ];
        store
            .write_rows("transaction", &["transactionid", "amount", "ret"], &rows)
            .unwrap();

        assert_eq!(store.row_count("transaction").unwrap(), 2);
        assert_eq!(
            store.column_cells("transaction", "ret").unwrap(),
            vec![Cell::Null, Cell::Real(10.0)]
        );
    }

    #[test]
    fn rewriting_a_table_replaces_it() {
        let mut store = SynthStore::in_memory().unwrap();
        let one = vec![vec![Cell::Int(1)]];
        let two = vec![vec![Cell::Int(1)], vec![Cell::Int(2)]];
        store.write_rows("numbers", &["n"], &two).unwrap();
        store.write_rows("numbers", &["n"], &one).unwrap();
        assert_eq!(store.row_count("numbers").unwrap(), 1);
    }
}
