use crate::export::{ExportError, ROW_FIELDS, ResultRow, RowEncoder};

/// CSV with a header row; the header is written even for an empty group.
pub struct CsvEncoder;

impl RowEncoder for CsvEncoder {
    fn encode(&self, rows: &[ResultRow]) -> Result<Vec<u8>, ExportError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer.write_record(ROW_FIELDS)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer
            .into_inner()
            .map_err(|e| ExportError::Io(e.into_error()))
    }
}
