//! Domain types shared by the pipeline and the API layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ChallanError;

/// Column every uploaded CSV must carry.
pub const VEHICLE_NUMBER_COLUMN: &str = "vehicle_number";

/// Header of the output CSV, in record field order.
pub const CHALLAN_CSV_HEADER: [&str; 6] = [
    "vehicle_number",
    "challan_number",
    "challan_date",
    "status",
    "amount",
    "offences",
];

/// Separator used when offences are flattened into a single CSV field.
pub const OFFENCE_SEPARATOR: &str = "; ";

/// One data row of an uploaded CSV
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRow {
    pub vehicle_number: String,
    /// Remaining columns as `(header, value)` pairs, in header order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub passthrough: Vec<(String, String)>,
}

impl InputRow {
    pub fn new(vehicle_number: impl Into<String>) -> Self {
        Self {
            vehicle_number: vehicle_number.into(),
            passthrough: Vec::new(),
        }
    }
}

/// A single challan returned by the lookup service for one vehicle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallanRecord {
    pub vehicle_number: String,
    pub challan_number: String,
    pub challan_date: String,
    pub status: String,
    pub amount: String,
    pub offences: Vec<String>,
}

impl ChallanRecord {
    /// Offence names joined into one field, empty when there are none.
    pub fn joined_offences(&self) -> String {
        self.offences.join(OFFENCE_SEPARATOR)
    }

    /// Field values in [`CHALLAN_CSV_HEADER`] order.
    pub fn csv_fields(&self) -> [String; 6] {
        [
            self.vehicle_number.clone(),
            self.challan_number.clone(),
            self.challan_date.clone(),
            self.status.clone(),
            self.amount.clone(),
            self.joined_offences(),
        ]
    }
}

/// An object in the shared bucket, as seen by quota eviction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageObject {
    pub name: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

/// Outcome recorded in the ledger for a finished batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    #[serde(rename = "success")]
    Success,
    #[serde(rename = "no results")]
    NoResults,
}

impl TransactionStatus {
    /// `Success` iff at least one challan was produced.
    pub fn from_output_count(output_count: usize) -> Self {
        if output_count > 0 {
            Self::Success
        } else {
            Self::NoResults
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NoResults => "no results",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = ChallanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "no results" => Ok(Self::NoResults),
            other => Err(ChallanError::InvalidStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(offences: &[&str]) -> ChallanRecord {
        ChallanRecord {
            vehicle_number: "KA01AB1234".to_string(),
            challan_number: "CH-1".to_string(),
            challan_date: "2024-03-01".to_string(),
            status: "Pending".to_string(),
            amount: "500".to_string(),
            offences: offences.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_joined_offences() {
        assert_eq!(record(&[]).joined_offences(), "");
        assert_eq!(record(&["Speeding"]).joined_offences(), "Speeding");
        assert_eq!(
            record(&["Speeding", "No helmet"]).joined_offences(),
            "Speeding; No helmet"
        );
    }

    #[test]
    fn test_csv_fields_follow_header_order() {
        let fields = record(&["Speeding"]).csv_fields();
        assert_eq!(fields[0], "KA01AB1234");
        assert_eq!(fields[4], "500");
        assert_eq!(fields[5], "Speeding");
        assert_eq!(fields.len(), CHALLAN_CSV_HEADER.len());
    }

    #[test]
    fn test_status_round_trips_through_text() {
        assert_eq!("success".parse::<TransactionStatus>().unwrap(), TransactionStatus::Success);
        assert_eq!(
            "no results".parse::<TransactionStatus>().unwrap(),
            TransactionStatus::NoResults
        );
        assert_eq!(
            "failed".parse::<TransactionStatus>(),
            Err(ChallanError::InvalidStatus("failed".to_string()))
        );
    }

    #[test]
    fn test_status_serializes_with_ledger_spelling() {
        let json = serde_json::to_string(&TransactionStatus::NoResults).unwrap();
        assert_eq!(json, "\"no results\"");
    }

    proptest! {
        #[test]
        fn status_is_success_iff_output_is_non_empty(count in 0usize..10_000) {
            let status = TransactionStatus::from_output_count(count);
            prop_assert_eq!(status == TransactionStatus::Success, count > 0);
        }
    }
}
