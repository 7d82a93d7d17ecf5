use crate::error::Result;
use crate::structs::{Cell, Column, ColumnType, ConnectionDescriptor, TableRow};
use arrow_array::{ArrayRef, Float64Array, Int64Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use csv::Writer;
use log::debug;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use rusqlite::types::Value;
use rusqlite::{Connection, params_from_iter};
use serde::Serialize;
use std::{fs, fs::File, path::Path, sync::Arc};

/// Destination for whole tables keyed by relation name.
///
/// `replace_table` has full-replace semantics: any existing relation named
/// `name` is discarded and recreated with exactly `rows`. No uniqueness or
/// foreign-key constraints are declared.
pub trait TableSink {
    fn replace_table(&mut self, name: &str, columns: &[Column], rows: &[Vec<Cell>]) -> Result<()>;
}

/// Replaces the relation `T::TABLE` in `sink` with `rows`.
pub fn replace<T: TableRow>(sink: &mut dyn TableSink, rows: &[T]) -> Result<()> {
    let cells: Vec<Vec<Cell>> = rows.iter().map(TableRow::cells).collect();
    sink.replace_table(T::TABLE, T::COLUMNS, &cells)
}

/// Relational store backed by an SQLite database file.
pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    /// Opens (creating if needed) the store file named by `descriptor`.
    ///
    /// # Errors
    /// Returns `PipelineError::Io` if the host directory cannot be created and
    /// `PipelineError::Persistence` if the database cannot be opened.
    pub fn open(descriptor: &ConnectionDescriptor) -> Result<Self> {
        fs::create_dir_all(&descriptor.host)?;
        let path = descriptor.store_path();
        debug!("Opening store {}", descriptor.redacted_url());
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl TableSink for SqliteSink {
    fn replace_table(&mut self, name: &str, columns: &[Column], rows: &[Vec<Cell>]) -> Result<()> {
        let table = quote_ident(name);
        let definitions = columns
            .iter()
            .map(|c| format!("{} {}", quote_ident(c.name), sql_type(c.kind)))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");

        let tx = self.conn.transaction()?;
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table}; CREATE TABLE {table} ({definitions});"
        ))?;
        {
            let mut stmt = tx.prepare(&format!("INSERT INTO {table} VALUES ({placeholders})"))?;
            for row in rows {
                stmt.execute(params_from_iter(row.iter().map(sql_value)))?;
            }
        }
        tx.commit()?;

        debug!("Replaced relation {} with {} rows", name, rows.len());
        Ok(())
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn sql_type(kind: ColumnType) -> &'static str {
    match kind {
        ColumnType::Text => "TEXT",
        ColumnType::Integer => "INTEGER",
        ColumnType::Real => "REAL",
    }
}

fn sql_value(cell: &Cell) -> Value {
    match cell {
        Cell::Text(Some(v)) => Value::Text(v.clone()),
        Cell::Integer(Some(v)) => Value::Integer(*v),
        Cell::Real(Some(v)) => Value::Real(*v),
        Cell::Text(None) | Cell::Integer(None) | Cell::Real(None) => Value::Null,
    }
}

/// Writes report rows to a CSV file, one header row derived from the field names.
///
/// # Errors
/// Returns error if file cannot be created or written to.
pub fn write_csv<T: Serialize>(rows: &[T], output_path: &Path) -> Result<()> {
    let file = File::create(output_path)?;
    let mut writer = Writer::from_writer(file);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes report rows to a pretty-formatted JSON file.
///
/// # Errors
/// Returns error if file cannot be created or serialization fails.
pub fn write_json<T: Serialize>(rows: &[T], output_path: &Path) -> Result<()> {
    let file = File::create(output_path)?;
    serde_json::to_writer_pretty(file, rows)?;
    Ok(())
}

/// Writes a table to a columnar Parquet file using Arrow format.
///
/// The Arrow schema is derived from `T::COLUMNS`; every column is nullable.
///
/// # Arguments
/// * `rows` - Records to write
/// * `output_path` - Path where the Parquet file will be created
///
/// # Errors
/// Returns error if file cannot be created, schema is invalid, or Arrow operations fail.
pub fn write_parquet<T: TableRow>(rows: &[T], output_path: &Path) -> Result<()> {
    let schema = Arc::new(Schema::new(
        T::COLUMNS
            .iter()
            .map(|c| Field::new(c.name, arrow_type(c.kind), true))
            .collect::<Vec<_>>(),
    ));

    let cells: Vec<Vec<Cell>> = rows.iter().map(TableRow::cells).collect();
    let arrays: Vec<ArrayRef> = T::COLUMNS
        .iter()
        .enumerate()
        .map(|(i, c)| column_array(&cells, i, c.kind))
        .collect();

    let batch = RecordBatch::try_new(schema.clone(), arrays)?;

    let file = File::create(output_path)?;
    let props = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}

fn arrow_type(kind: ColumnType) -> DataType {
    match kind {
        ColumnType::Text => DataType::Utf8,
        ColumnType::Integer => DataType::Int64,
        ColumnType::Real => DataType::Float64,
    }
}

fn column_array(rows: &[Vec<Cell>], index: usize, kind: ColumnType) -> ArrayRef {
    match kind {
        ColumnType::Text => {
            let values: StringArray = rows
                .iter()
                .map(|r| match &r[index] {
                    Cell::Text(v) => v.as_deref(),
                    _ => None,
                })
                .collect();
            Arc::new(values)
        }
        ColumnType::Integer => {
            let values: Int64Array = rows
                .iter()
                .map(|r| match r[index] {
                    Cell::Integer(v) => v,
                    _ => None,
                })
                .collect();
            Arc::new(values)
        }
        ColumnType::Real => {
            let values: Float64Array = rows
                .iter()
                .map(|r| match r[index] {
                    Cell::Real(v) => v,
                    _ => None,
                })
                .collect();
            Arc::new(values)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::Airline;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    fn airline(id: i64, name: &str) -> Airline {
        Airline {
            id: Some(id),
            name: Some(name.to_string()),
            alias: None,
            iata: Some("2B".to_string()),
            icao: None,
            callsign: None,
            country: Some("Russia".to_string()),
            active: Some("Y".to_string()),
        }
    }

    fn count(sink: &SqliteSink, table: &str) -> i64 {
        sink.connection()
            .query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn replace_discards_previous_contents() {
        let mut sink = SqliteSink::in_memory().unwrap();
        replace(&mut sink, &[airline(1, "A"), airline(2, "B"), airline(3, "C")]).unwrap();
        assert_eq!(count(&sink, "airlines"), 3);

        replace(&mut sink, &[airline(9, "Z")]).unwrap();
        assert_eq!(count(&sink, "airlines"), 1);
        let name: String = sink
            .connection()
            .query_row("SELECT \"Name\" FROM airlines", [], |r| r.get(0))
            .unwrap();
        assert_eq!(name, "Z");
    }

    #[test]
    fn absent_cells_are_stored_as_null() {
        let mut sink = SqliteSink::in_memory().unwrap();
        replace(&mut sink, &[airline(1, "A")]).unwrap();
        let alias: Option<String> = sink
            .connection()
            .query_row("SELECT \"Alias\" FROM airlines", [], |r| r.get(0))
            .unwrap();
        assert_eq!(alias, None);
        let id: i64 = sink
            .connection()
            .query_row("SELECT \"Airline ID\" FROM airlines", [], |r| r.get(0))
            .unwrap();
        assert_eq!(id, 1);
    }

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_ident("Source airport"), "\"Source airport\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn parquet_snapshot_has_one_column_per_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("airlines.parquet");
        write_parquet(&[airline(1, "A"), airline(2, "B")], &path).unwrap();

        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&path).unwrap())
            .unwrap()
            .build()
            .unwrap();
        let batches: Vec<RecordBatch> = reader.map(|b| b.unwrap()).collect();
        let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
        assert_eq!(rows, 2);
        assert_eq!(batches[0].num_columns(), Airline::COLUMNS.len());
        assert!(batches[0].column_by_name("Airline ID").is_some());
    }
}
