//! Result table export
//!
//! [`XlsxSink`] writes the single-sheet spreadsheet handed to the user.
//! With the `json` feature, [`JsonSink`] emits the same table as JSON.

use crate::error::{RadiobatchError, Result};
use crate::table::{Cell, ResultTable};
use log::info;
use rust_xlsxwriter::Workbook;
use std::path::{Path, PathBuf};

/// Name of the only worksheet
pub const SHEET_NAME: &str = "Sheet1";

/// MIME type of the spreadsheet artifact
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Largest column count a worksheet accepts
const MAX_COLUMNS: usize = 16_384;

/// Largest row count a worksheet accepts, header included
const MAX_ROWS: usize = 1_048_576;

/// Serializes a frozen table into a downloadable artifact
pub trait ExportSink {
    /// # Errors
    ///
    /// Returns [`RadiobatchError::Serialization`] if the table holds a value
    /// the format cannot represent
    fn serialize(&self, table: &ResultTable) -> Result<Vec<u8>>;

    /// File name for the given scope tag
    fn file_name(&self, scope: &str) -> String;

    fn mime_type(&self) -> &'static str;
}

/// Spreadsheet export: header row, then one row per case
///
/// Absent cells are left blank.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxSink;

impl ExportSink for XlsxSink {
    fn serialize(&self, table: &ResultTable) -> Result<Vec<u8>> {
        let columns = table.columns();
        if columns.len() > MAX_COLUMNS {
            return Err(RadiobatchError::Serialization(format!(
                "{} columns exceed the worksheet limit of {}",
                columns.len(),
                MAX_COLUMNS
            )));
        }
        if table.len() + 1 > MAX_ROWS {
            return Err(RadiobatchError::Serialization(format!(
                "{} rows exceed the worksheet limit of {}",
                table.len(),
                MAX_ROWS - 1
            )));
        }

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(SHEET_NAME)?;

        for (col, header) in columns.iter().enumerate() {
            worksheet.write_string(0, col as u16, *header)?;
        }

        for row_idx in 0..table.len() {
            let row = (row_idx + 1) as u32;
            for (col, cell) in table.row_cells(row_idx).into_iter().enumerate() {
                let col = col as u16;
                match cell {
                    Cell::Text(text) => {
                        worksheet.write_string(row, col, text)?;
                    }
                    Cell::Number(value) if value.is_finite() => {
                        worksheet.write_number(row, col, value)?;
                    }
                    Cell::Number(value) => {
                        return Err(RadiobatchError::Serialization(format!(
                            "non-finite value {} in column '{}' of {}",
                            value,
                            columns[col as usize],
                            table.rows()[row_idx].name()
                        )));
                    }
                    Cell::Absent => {}
                }
            }
        }

        Ok(workbook.save_to_buffer()?)
    }

    fn file_name(&self, scope: &str) -> String {
        export_file_name(scope)
    }

    fn mime_type(&self) -> &'static str {
        XLSX_MIME
    }
}

/// Spreadsheet file name for a scope tag, e.g. `Radiomics_Features_all.xlsx`
pub fn export_file_name(scope: &str) -> String {
    format!("Radiomics_Features_{}.xlsx", scope)
}

/// JSON export: an array of objects keyed by column header
///
/// Absent cells are `null`.
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSink;

#[cfg(feature = "json")]
impl ExportSink for JsonSink {
    fn serialize(&self, table: &ResultTable) -> Result<Vec<u8>> {
        use serde_json::{Map, Number, Value};

        let columns = table.columns();
        let mut rows = Vec::with_capacity(table.len());
        for row_idx in 0..table.len() {
            let mut object = Map::new();
            for (column, cell) in columns.iter().zip(table.row_cells(row_idx)) {
                let value = match cell {
                    Cell::Text(text) => Value::String(text.to_string()),
                    Cell::Number(n) => Number::from_f64(n).map(Value::Number).ok_or_else(|| {
                        RadiobatchError::Serialization(format!(
                            "non-finite value {} in column '{}'",
                            n, column
                        ))
                    })?,
                    Cell::Absent => Value::Null,
                };
                object.insert(column.to_string(), value);
            }
            rows.push(Value::Object(object));
        }
        Ok(serde_json::to_vec_pretty(&Value::Array(rows))?)
    }

    fn file_name(&self, scope: &str) -> String {
        format!("Radiomics_Features_{}.json", scope)
    }

    fn mime_type(&self) -> &'static str {
        "application/json"
    }
}

/// Serializes the table and writes it into `dir`
///
/// Returns the path of the written file.
pub fn write_export(
    sink: &dyn ExportSink,
    table: &ResultTable,
    dir: &Path,
    scope: &str,
) -> Result<PathBuf> {
    let bytes = sink.serialize(table)?;
    let path = dir.join(sink.file_name(scope));
    std::fs::write(&path, &bytes)?;
    info!(
        "Wrote {} ({} bytes, {})",
        path.display(),
        bytes.len(),
        sink.mime_type()
    );
    Ok(path)
}
