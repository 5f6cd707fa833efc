use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::store::StoredReport;

struct CacheEntry {
    expires_at: Instant,
    report: Arc<StoredReport>,
}

/// Short-lived report id -> event list cache, consulted before the store.
/// Expired entries are evicted when read and swept on every `set`.
pub struct ReportCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ReportCache {
    pub fn new(ttl: Duration) -> Self {
        ReportCache {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, report_id: &str) -> Option<Arc<StoredReport>> {
        let mut entries = self.entries.lock().await;
        match entries.get(report_id) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.report.clone()),
            Some(_) => {
                tracing::debug!(report = report_id, "Cache entry expired");
                entries.remove(report_id);
                None
            }
            None => None,
        }
    }

    /// Insert or replace, restarting the TTL. Expired entries are swept
    /// first so reports nobody reads again do not pile up.
    pub async fn set(&self, report_id: &str, report: Arc<StoredReport>) {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        let swept = before - entries.len();
        if swept > 0 {
            tracing::debug!(swept, "Swept expired cache entries");
        }

        entries.insert(
            report_id.to_string(),
            CacheEntry {
                expires_at: now + self.ttl,
                report,
            },
        );
    }

    pub async fn expire(&self, report_id: &str) {
        self.entries.lock().await.remove(report_id);
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}
