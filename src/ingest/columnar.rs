//! Parquet encoding of weekend tables
//!
//! Tables are written with one UTF-8 column per header so that a Parquet directory holds
//! exactly the text a CSV directory would. Files produced elsewhere may use typed columns;
//! every cell is rendered back to text on read and parsed like a CSV cell.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::tables::Table;
use crate::{DriveGradeError, Result};

pub(crate) fn read_table(name: &str, path: &Path) -> Result<Table> {
    let context = || format!("{} table {}", name, path.display());
    let file = File::open(path).map_err(|e| DriveGradeError::file_error(path, e))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| DriveGradeError::parse(context(), e))?;
    let headers = builder.schema().fields().iter().map(|field| field.name().clone()).collect();
    let reader = builder.build().map_err(|e| DriveGradeError::parse(context(), e))?;

    let mut table = Table::with_headers(name, headers);
    for batch in reader {
        let batch = batch.map_err(|e| DriveGradeError::parse(context(), e))?;
        for row in 0..batch.num_rows() {
            // nulls render as empty cells
            let cells = batch
                .columns()
                .iter()
                .map(|column| array_value_to_string(column.as_ref(), row))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| DriveGradeError::parse(context(), e))?;
            table.push_row(cells.iter().map(|cell| cell.trim()));
        }
    }
    Ok(table)
}

pub(crate) fn write_table(table: &Table, path: &Path) -> Result<()> {
    let context = || format!("writing {}", path.display());
    let fields: Vec<Field> = table
        .headers()
        .iter()
        .map(|header| Field::new(header.as_str(), DataType::Utf8, false))
        .collect();
    let schema = Arc::new(Schema::new(fields));
    let columns: Vec<ArrayRef> = (0..table.headers().len())
        .map(|index| {
            let values = table.records().iter().map(|record| record.get(index).unwrap_or(""));
            Arc::new(StringArray::from_iter_values(values)) as ArrayRef
        })
        .collect();
    let batch = RecordBatch::try_new(schema.clone(), columns)
        .map_err(|e| DriveGradeError::parse(context(), e))?;

    let file = File::create(path).map_err(|e| DriveGradeError::file_error(path, e))?;
    let mut writer =
        ArrowWriter::try_new(file, schema, None).map_err(|e| DriveGradeError::parse(context(), e))?;
    writer.write(&batch).map_err(|e| DriveGradeError::parse(context(), e))?;
    writer.close().map_err(|e| DriveGradeError::parse(context(), e))?;
    Ok(())
}
