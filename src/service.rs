//! Report lifecycle: store parsed uploads, serve scored reports.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::ReportCache;
use crate::config::{ParserConfig, ScoringConfig};
use crate::error::{ServiceError, StoreError};
use crate::models::{HealRecord, ParsedLog, Report, ReportShell};
use crate::parser::LogParser;
use crate::scoring;
use crate::store::{ReportStore, StoredReport};

pub struct ReportService {
    store: Arc<dyn ReportStore>,
    cache: ReportCache,
    parser_config: ParserConfig,
    scoring_config: ScoringConfig,
}

impl ReportService {
    pub fn new(
        store: Arc<dyn ReportStore>,
        cache_ttl: Duration,
        parser_config: ParserConfig,
        scoring_config: ScoringConfig,
    ) -> Self {
        ReportService {
            store,
            cache: ReportCache::new(cache_ttl),
            parser_config,
            scoring_config,
        }
    }

    /// Fresh parser for one upload
    pub fn parser(&self) -> LogParser {
        LogParser::new(&self.parser_config)
    }

    /// Persist a parsed upload, prime the cache and return its scored report
    pub async fn add_report(&self, parsed: ParsedLog) -> Result<Report, ServiceError> {
        let stored = Arc::new(StoredReport {
            shell: parsed.shell,
            events: parsed.events,
        });
        let report_id = stored.shell.report_id.clone();

        let to_store = stored.clone();
        if let Err(e) = self.on_store(move |store| store.insert(to_store)).await {
            tracing::error!(report = %report_id, error = %e, "Failed to store report");
            return Err(e);
        }

        self.cache.set(&report_id, stored.clone()).await;

        tracing::info!(
            report = %report_id,
            name = %stored.shell.report_name,
            events = stored.events.len(),
            "Report added"
        );
        Ok(self.score(&stored, false))
    }

    /// Scored report, or `None` when `owner` has no report `report_id`
    pub async fn get_report(
        &self,
        owner: &str,
        report_id: &str,
        include_records: bool,
    ) -> Result<Option<Report>, ServiceError> {
        Ok(self
            .load(owner, report_id)
            .await?
            .map(|stored| self.score(&stored, include_records)))
    }

    pub async fn heal_records(
        &self,
        owner: &str,
        report_id: &str,
    ) -> Result<Option<Vec<HealRecord>>, ServiceError> {
        Ok(self
            .load(owner, report_id)
            .await?
            .map(|stored| scoring::heal_records(&stored.events)))
    }

    pub async fn list_reports(&self, owner: &str) -> Result<Vec<ReportShell>, ServiceError> {
        let owner = owner.to_string();
        self.on_store(move |store| store.list(&owner)).await
    }

    /// Returns false when there was nothing to delete
    pub async fn delete_report(&self, owner: &str, report_id: &str) -> Result<bool, ServiceError> {
        let (o, id) = (owner.to_string(), report_id.to_string());
        let removed = self.on_store(move |store| store.delete(&o, &id)).await?;
        if removed {
            self.cache.expire(report_id).await;
            tracing::info!(report = report_id, "Report deleted");
        }
        Ok(removed)
    }

    async fn load(
        &self,
        owner: &str,
        report_id: &str,
    ) -> Result<Option<Arc<StoredReport>>, ServiceError> {
        if let Some(hit) = self.cache.get(report_id).await {
            if hit.shell.owner_id == owner {
                tracing::debug!(report = report_id, "Cache hit");
                return Ok(Some(hit));
            }
        }

        let (o, id) = (owner.to_string(), report_id.to_string());
        let fetched = match self.on_store(move |store| store.fetch(&o, &id)).await {
            Ok(f) => f,
            Err(e) => {
                tracing::error!(report = report_id, error = %e, "Failed to fetch report");
                return Err(e);
            }
        };
        if let Some(stored) = &fetched {
            tracing::debug!(report = report_id, "Cache miss, loaded from store");
            self.cache.set(report_id, stored.clone()).await;
        }
        Ok(fetched)
    }

    /// Run a store operation on the blocking pool; file-backed stores do
    /// synchronous I/O and JSON work over whole event lists
    async fn on_store<T, F>(&self, op: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&dyn ReportStore) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        let result = tokio::task::spawn_blocking(move || op(store.as_ref())).await?;
        Ok(result?)
    }

    fn score(&self, stored: &StoredReport, include_records: bool) -> Report {
        scoring::score_report(
            &stored.events,
            &stored.shell.report_id,
            &stored.shell.report_name,
            &self.scoring_config,
            include_records,
        )
    }
}
