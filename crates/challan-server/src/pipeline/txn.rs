//! Batch correlation ids and object names

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out batch ids: the current Unix time in milliseconds, bumped when
/// needed so that ids from one process are strictly increasing.
#[derive(Debug, Default)]
pub struct TxnIdGenerator {
    last: AtomicU64,
}

impl TxnIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> u64 {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        self.next_after(now)
    }

    fn next_after(&self, now: u64) -> u64 {
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last.saturating_add(1)))
            })
            .unwrap_or_else(|last| last);
        now.max(previous.saturating_add(1))
    }
}

pub fn input_key(txn_id: u64) -> String {
    format!("inputs/input_{}.csv", txn_id)
}

pub fn output_key(txn_id: u64) -> String {
    format!("outputs/output_{}.csv", txn_id)
}
