//! Shared fixtures for the integration tests
//!
//! [`MemoryStore`] and [`MemoryLedger`] stand in for the bucket and the
//! Postgres ledger, with switches to inject failures.

#![allow(dead_code)]

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;
use wiremock::{MockServer, ResponseTemplate};

use challan_common::StorageObject;
use challan_server::config::{EgressConfig, EnrichmentConfig, QuotaConfig};
use challan_server::ledger::{Ledger, LedgerError, NewTransaction, Transaction, TransactionQuery};
use challan_server::pipeline::{BatchOrchestrator, EgressResolver, EnrichmentClient};
use challan_server::storage::{ObjectStore, UploadResult};

pub const ENRICHMENT_PATH: &str = "/identity/vehicleChallan";
pub const EGRESS_PATH: &str = "/ip";

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    fail_put_prefix: Mutex<Option<String>>,
    fail_delete: Mutex<Vec<String>>,
    fail_list: AtomicBool,
    panic_on_put: AtomicBool,
    puts: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, name: &str, size: usize, created_at: DateTime<Utc>) {
        self.objects.lock().unwrap().insert(
            name.to_string(),
            StoredObject {
                data: vec![b'x'; size],
                content_type: "text/csv".to_string(),
                created_at,
            },
        );
    }

    pub fn fail_puts_under(&self, prefix: &str) {
        *self.fail_put_prefix.lock().unwrap() = Some(prefix.to_string());
    }

    pub fn fail_delete_of(&self, name: &str) {
        self.fail_delete.lock().unwrap().push(name.to_string());
    }

    pub fn fail_listing(&self) {
        self.fail_list.store(true, Ordering::SeqCst);
    }

    pub fn panic_on_put(&self) {
        self.panic_on_put.store(true, Ordering::SeqCst);
    }

    pub fn names(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(name).cloned()
    }

    pub fn text(&self, name: &str) -> Option<String> {
        self.get(name).map(|o| String::from_utf8(o.data).unwrap())
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_objects(&self, limit: usize) -> anyhow::Result<Vec<StorageObject>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(anyhow!("injected list failure"));
        }

        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .take(limit)
            .map(|(name, object)| StorageObject {
                name: name.clone(),
                size_bytes: object.data.len() as u64,
                created_at: object.created_at,
            })
            .collect())
    }

    async fn put_object(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> anyhow::Result<UploadResult> {
        if self.panic_on_put.load(Ordering::SeqCst) {
            panic!("injected panic while storing {key}");
        }

        if let Some(prefix) = self.fail_put_prefix.lock().unwrap().as_deref() {
            if key.starts_with(prefix) {
                return Err(anyhow!("injected put failure").context(format!("put {key}")));
            }
        }

        self.puts.fetch_add(1, Ordering::SeqCst);
        let size = data.len() as u64;
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
                created_at: Utc::now(),
            },
        );

        Ok(UploadResult {
            key: key.to_string(),
            checksum: String::new(),
            size,
        })
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        if self.fail_delete.lock().unwrap().iter().any(|k| k == key) {
            return Err(anyhow!("injected delete failure"));
        }
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    fn object_url(&self, key: &str) -> String {
        format!("memory://challan-files/{}", key)
    }
}

#[derive(Default)]
pub struct MemoryLedger {
    rows: Mutex<Vec<Transaction>>,
    fail_inserts: AtomicBool,
    down: AtomicBool,
}

impl MemoryLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_inserts(&self) {
        self.fail_inserts.store(true, Ordering::SeqCst);
    }

    pub fn go_down(&self) {
        self.down.store(true, Ordering::SeqCst);
    }

    pub fn rows(&self) -> Vec<Transaction> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn insert(&self, entry: NewTransaction) -> Result<Transaction, LedgerError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("injected insert failure".to_string()));
        }

        let row = Transaction {
            id: Uuid::new_v4(),
            input_file_url: entry.input_file_url,
            input_count: entry.input_count,
            output_file_url: entry.output_file_url,
            output_count: entry.output_count,
            status: entry.status.to_string(),
            timestamp: Utc::now(),
        };
        self.rows.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn list(&self, query: TransactionQuery) -> Result<Vec<Transaction>, LedgerError> {
        let (limit, offset) = query.bounds();
        let mut rows = self.rows();
        rows.reverse();
        Ok(rows
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn ping(&self) -> Result<(), LedgerError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("injected outage".to_string()));
        }
        Ok(())
    }
}

/// Quota large enough that no eviction happens in ordinary tests.
pub fn roomy_quota() -> QuotaConfig {
    QuotaConfig {
        size_limit_bytes: 1024 * 1024 * 1024,
        delete_target_bytes: 200 * 1024 * 1024,
        list_limit: 1000,
    }
}

pub fn orchestrator(
    egress: &MockServer,
    enrichment: &MockServer,
    store: Arc<MemoryStore>,
    ledger: Arc<MemoryLedger>,
    quota: QuotaConfig,
) -> BatchOrchestrator {
    orchestrator_with_lookup_timeout(egress, enrichment, store, ledger, quota, 5)
}

pub fn orchestrator_with_lookup_timeout(
    egress: &MockServer,
    enrichment: &MockServer,
    store: Arc<MemoryStore>,
    ledger: Arc<MemoryLedger>,
    quota: QuotaConfig,
    lookup_timeout_secs: u64,
) -> BatchOrchestrator {
    let resolver = EgressResolver::new(EgressConfig {
        lookup_url: format!("{}{}", egress.uri(), EGRESS_PATH),
        fallback_ip: "14.142.186.142".to_string(),
        timeout_secs: 5,
    })
    .unwrap();

    let client = EnrichmentClient::new(EnrichmentConfig {
        endpoint: format!("{}{}", enrichment.uri(), ENRICHMENT_PATH),
        client_id: "test-client".to_string(),
        client_secret: "test-secret".to_string(),
        timeout_secs: lookup_timeout_secs,
        ..EnrichmentConfig::default()
    })
    .unwrap();

    BatchOrchestrator::new(store, ledger, Arc::new(resolver), client, quota)
}

pub fn ip_response(ip: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ip": ip }))
}

/// Successful lookup body carrying `entries` as the challan list.
pub fn challans_response(entries: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "statuscode": "TXN",
        "status": "Transaction Successful",
        "data": { "vehicalData": entries }
    }))
}

pub fn challan(number: &str, amount: u32, offences: &[&str]) -> serde_json::Value {
    serde_json::json!({
        "challanNumber": number,
        "challanDate": "2024-02-10 10:15:00",
        "challanStatus": "Pending",
        "challanAmount": amount,
        "offences": offences
            .iter()
            .map(|name| serde_json::json!({ "offenceName": name }))
            .collect::<Vec<_>>(),
    })
}
