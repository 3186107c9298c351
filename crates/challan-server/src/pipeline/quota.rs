//! Bucket quota eviction
//!
//! Before every batch the bucket is listed and, once its total size is over
//! `size_limit - delete_target`, the oldest objects are deleted until it is
//! back at or under that threshold.

use challan_common::StorageObject;
use tracing::{debug, error, info, instrument, warn};

use crate::config::QuotaConfig;
use crate::storage::ObjectStore;

/// Names to delete, oldest first, to bring `objects` under the threshold.
///
/// Objects are ordered by creation time, then by name.
pub fn plan_eviction(objects: &[StorageObject], quota: &QuotaConfig) -> Vec<String> {
    let total = total_size(objects);
    let threshold = quota.threshold_bytes();

    if total <= threshold {
        return Vec::new();
    }

    let mut ordered: Vec<&StorageObject> = objects.iter().collect();
    ordered.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.name.cmp(&b.name)));

    let mut deleted: u64 = 0;
    let mut selected = Vec::new();
    for object in ordered {
        if total - deleted <= threshold {
            break;
        }
        selected.push(object.name.clone());
        deleted = deleted.saturating_add(object.size_bytes).min(total);
    }

    selected
}

fn total_size(objects: &[StorageObject]) -> u64 {
    objects.iter().fold(0u64, |acc, o| acc.saturating_add(o.size_bytes))
}

/// Summary of one eviction pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionReport {
    pub scanned: usize,
    pub total_bytes: u64,
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
    pub freed_bytes: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct QuotaEvictor {
    quota: QuotaConfig,
}

impl QuotaEvictor {
    pub fn new(quota: QuotaConfig) -> Self {
        Self { quota }
    }

    /// Run one eviction pass. Never fails: a listing error skips the pass
    /// and a failed delete is logged before moving to the next object.
    #[instrument(skip(self, store))]
    pub async fn run(&self, store: &dyn ObjectStore) -> EvictionReport {
        let objects = match store.list_objects(self.quota.list_limit).await {
            Ok(objects) => objects,
            Err(e) => {
                let cause = format!("{:#}", e);
                error!(error = %cause, "Failed to list bucket, skipping eviction");
                return EvictionReport::default();
            },
        };

        let mut report = EvictionReport {
            scanned: objects.len(),
            total_bytes: total_size(&objects),
            ..EvictionReport::default()
        };

        let plan = plan_eviction(&objects, &self.quota);
        if plan.is_empty() {
            debug!(
                total_bytes = report.total_bytes,
                threshold_bytes = self.quota.threshold_bytes(),
                "Bucket within quota"
            );
            return report;
        }

        info!(
            total_bytes = report.total_bytes,
            threshold_bytes = self.quota.threshold_bytes(),
            planned = plan.len(),
            "Bucket over quota, evicting oldest objects"
        );

        for name in plan {
            match store.delete_object(&name).await {
                Ok(()) => {
                    let size = objects
                        .iter()
                        .find(|o| o.name == name)
                        .map_or(0, |o| o.size_bytes);
                    report.freed_bytes = report.freed_bytes.saturating_add(size);
                    report.deleted.push(name);
                },
                Err(e) => {
                    let cause = format!("{:#}", e);
                    warn!(object = %name, error = %cause, "Failed to evict object");
                    report.failed.push(name);
                },
            }
        }

        info!(
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            freed_bytes = report.freed_bytes,
            "Eviction finished"
        );

        report
    }
}
