//! Challan lookups against the enrichment service

use challan_common::{ChallanRecord, InputRow};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::egress::EgressResolver;
use crate::config::EnrichmentConfig;

const CONSENT: &str = "Y";

#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("Challan lookup request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Challan lookup returned HTTP {0}")]
    Status(StatusCode),
}

/// What one input row produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// Lookup succeeded; may hold zero records
    Enriched(Vec<ChallanRecord>),
    /// Lookup and its retry both failed
    Skipped { reason: String },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    vehicle_registration_number: &'a str,
    consent: &'a str,
    latitude: &'a str,
    longitude: &'a str,
    external_ref: &'a str,
}

pub struct EnrichmentClient {
    client: Client,
    config: EnrichmentConfig,
}

impl EnrichmentClient {
    pub fn new(config: EnrichmentConfig) -> Result<Self, EnrichmentError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("challan-server/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, config })
    }

    /// Look up the challans of one row.
    ///
    /// A failed attempt re-resolves the egress IP into `current_ip` (kept for
    /// the remaining rows of the batch) and retries exactly once.
    #[instrument(skip(self, row, resolver, current_ip), fields(vehicle = %row.vehicle_number))]
    pub async fn enrich(
        &self,
        row: &InputRow,
        external_ref: &str,
        resolver: &EgressResolver,
        current_ip: &mut String,
    ) -> RowOutcome {
        let first = match self.attempt(row, external_ref, current_ip).await {
            Ok(body) => return RowOutcome::Enriched(parse_challans(&row.vehicle_number, &body)),
            Err(e) => e,
        };

        warn!(error = %first, "Challan lookup failed, retrying with a refreshed IP");
        *current_ip = resolver.resolve().await;

        match self.attempt(row, external_ref, current_ip).await {
            Ok(body) => RowOutcome::Enriched(parse_challans(&row.vehicle_number, &body)),
            Err(e) => {
                warn!(error = %e, "Challan lookup retry failed, skipping row");
                RowOutcome::Skipped {
                    reason: e.to_string(),
                }
            },
        }
    }

    async fn attempt(
        &self,
        row: &InputRow,
        external_ref: &str,
        ip: &str,
    ) -> Result<String, EnrichmentError> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .header("X-Ipay-Auth-Code", &self.config.auth_code)
            .header("X-Ipay-Client-Id", &self.config.client_id)
            .header("X-Ipay-Client-Secret", &self.config.client_secret)
            .header("X-Ipay-Endpoint-Ip", ip)
            .json(&LookupRequest {
                vehicle_registration_number: &row.vehicle_number,
                consent: CONSENT,
                latitude: &self.config.latitude,
                longitude: &self.config.longitude,
                external_ref,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EnrichmentError::Status(status));
        }

        let body = response.text().await?;
        debug!(external_ref, bytes = body.len(), "Challan lookup succeeded");

        Ok(body)
    }
}

/// Extract the challans of a successful lookup body.
///
/// Anything other than an array at `data.vehicalData` yields no records.
pub fn parse_challans(vehicle_number: &str, body: &str) -> Vec<ChallanRecord> {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return Vec::new();
    };

    let Some(entries) = value.pointer("/data/vehicalData").and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter(|entry| entry.is_object())
        .map(|entry| ChallanRecord {
            vehicle_number: vehicle_number.to_string(),
            challan_number: field_text(entry, "challanNumber"),
            challan_date: field_text(entry, "challanDate"),
            status: field_text(entry, "challanStatus"),
            amount: field_text(entry, "challanAmount"),
            offences: entry
                .get("offences")
                .and_then(Value::as_array)
                .map(|offences| {
                    offences
                        .iter()
                        .map(|o| field_text(o, "offenceName"))
                        .collect()
                })
                .unwrap_or_default(),
        })
        .collect()
}

fn field_text(entry: &Value, key: &str) -> String {
    entry.get(key).map(scalar_text).unwrap_or_default()
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
