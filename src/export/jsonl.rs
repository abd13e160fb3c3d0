use std::io::Write;

use crate::export::{ExportError, ResultRow, RowEncoder};

/// One JSON object per line.
pub struct JsonlEncoder;

impl RowEncoder for JsonlEncoder {
    fn encode(&self, rows: &[ResultRow]) -> Result<Vec<u8>, ExportError> {
        let mut buf = Vec::new();
        for row in rows {
            serde_json::to_writer(&mut buf, row)?;
            buf.write_all(b"\n")?;
        }
        Ok(buf)
    }
}
