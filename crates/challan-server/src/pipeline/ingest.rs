//! Uploaded CSV decoding

use challan_common::{types::VEHICLE_NUMBER_COLUMN, InputRow};

use super::BatchError;

const UTF8_BOM: char = '\u{feff}';

/// Decode an uploaded buffer into rows, in file order.
///
/// The first line is the header and must name a `vehicle_number` column.
/// Every other column is carried along as passthrough data.
pub fn parse_input(bytes: &[u8]) -> Result<Vec<InputRow>, BatchError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| BatchError::Parse(format!("input is not valid UTF-8: {}", e)))?;
    let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);

    if text.trim().is_empty() {
        return Err(BatchError::Parse("input is empty".to_string()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| BatchError::Parse(format!("unreadable header row: {}", e)))?
        .clone();

    let vehicle_index = headers
        .iter()
        .position(|h| h.trim() == VEHICLE_NUMBER_COLUMN)
        .ok_or_else(|| {
            BatchError::Parse(format!("header row has no '{}' column", VEHICLE_NUMBER_COLUMN))
        })?;

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record =
            record.map_err(|e| BatchError::Parse(format!("row {}: {}", line + 1, e)))?;

        let mut row = InputRow::new(record.get(vehicle_index).unwrap_or_default().trim());
        row.passthrough = headers
            .iter()
            .zip(record.iter())
            .enumerate()
            .filter(|(i, _)| *i != vehicle_index)
            .map(|(_, (h, v))| (h.to_string(), v.to_string()))
            .collect();
        rows.push(row);
    }

    Ok(rows)
}
