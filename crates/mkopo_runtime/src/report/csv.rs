use super::{NO_DATA, ReportTable};
use crate::errors::ReportError;

/// Encode the table as CSV: one header record, one record per row, column
/// order identical everywhere. An empty table becomes the no-data sentinel.
pub fn encode(table: &ReportTable) -> Result<Vec<u8>, ReportError> {
    if table.is_empty() {
        return Ok(NO_DATA.as_bytes().to_vec());
    }

    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|c| c.render()))?;
    }
    writer
        .into_inner()
        .map_err(|e| ReportError::Encode(e.to_string()))
}
