//! Output record flattening and CSV rendering

use challan_common::{types::CHALLAN_CSV_HEADER, ChallanRecord};

use super::BatchError;

/// Concatenate per-row records, keeping row order and within-row order.
pub fn flatten(per_row: Vec<Vec<ChallanRecord>>) -> Vec<ChallanRecord> {
    per_row.into_iter().flatten().collect()
}

/// Render records as CSV. The header is always written, so no records
/// produce a header-only file.
pub fn render_csv(records: &[ChallanRecord]) -> Result<Vec<u8>, BatchError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(CHALLAN_CSV_HEADER)
        .map_err(|e| BatchError::Internal(format!("failed to write CSV header: {}", e)))?;

    for record in records {
        writer
            .write_record(record.csv_fields())
            .map_err(|e| BatchError::Internal(format!("failed to write CSV row: {}", e)))?;
    }

    writer
        .into_inner()
        .map_err(|e| BatchError::Internal(format!("failed to flush CSV: {}", e.error())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(vehicle: &str, number: &str, offences: &[&str]) -> ChallanRecord {
        ChallanRecord {
            vehicle_number: vehicle.to_string(),
            challan_number: number.to_string(),
            challan_date: "2024-01-15".to_string(),
            status: "Pending".to_string(),
            amount: "500".to_string(),
            offences: offences.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_flatten_preserves_order() {
        let flat = flatten(vec![
            vec![record("A", "1", &[]), record("A", "2", &[])],
            vec![],
            vec![record("C", "3", &[])],
        ]);
        let numbers: Vec<_> = flat.iter().map(|r| r.challan_number.as_str()).collect();
        assert_eq!(numbers, ["1", "2", "3"]);
    }

    #[test]
    fn test_render_empty_is_header_only() {
        let csv = render_csv(&[]).unwrap();
        assert_eq!(
            String::from_utf8(csv).unwrap(),
            "vehicle_number,challan_number,challan_date,status,amount,offences\n"
        );
    }

    #[test]
    fn test_render_joins_offences() {
        let csv = render_csv(&[record("KA01AB1234", "CH-1", &["Overspeeding", "No helmet"])]).unwrap();
        let text = String::from_utf8(csv).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "KA01AB1234,CH-1,2024-01-15,Pending,500,Overspeeding; No helmet");
    }

    #[test]
    fn test_render_quotes_embedded_commas() {
        let csv = render_csv(&[record("KA01", "CH-9", &["Signal jump, red light"])]).unwrap();
        let text = String::from_utf8(csv).unwrap();
        assert!(text.contains("\"Signal jump, red light\""));
    }
}
