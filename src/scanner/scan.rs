use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::{BoxFuture, FutureExt};
use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use super::score::{rank, Scorer};
use super::source::SourceConnector;
use crate::domain::{Amount, Opportunity, OpportunityKind, RawOpportunity, ScoredOpportunity};
use crate::error::SourceError;

/// Scanner tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSettings {
    /// Sources fetched at once.
    pub max_fan_out: usize,
    /// Deadline for each source fetch.
    pub source_timeout: Duration,
    /// When non-empty, only these kinds are kept.
    pub focus: Vec<OpportunityKind>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            max_fan_out: 4,
            source_timeout: Duration::from_secs(15),
            focus: Vec::new(),
        }
    }
}

/// What one scan produced.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub opportunities: Vec<Opportunity>,
    /// Sources that failed and were skipped.
    pub failed_sources: Vec<String>,
    /// Records dropped during normalization or filtering.
    pub dropped: usize,
}

type Fetched = (String, Result<Vec<RawOpportunity>, SourceError>);

/// One source fetch, owning everything it touches.
fn fetch_with_timeout(
    source: Arc<dyn SourceConnector>,
    timeout: Duration,
) -> BoxFuture<'static, Fetched> {
    async move {
        let name = source.name().to_string();
        let result = match tokio::time::timeout(timeout, source.fetch()).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Timeout(name.clone())),
        };
        (name, result)
    }
    .boxed()
}

/// Aggregates connectors into one batch of opportunities and ranks them.
pub struct Scanner {
    sources: Vec<Arc<dyn SourceConnector>>,
    scorer: Arc<dyn Scorer>,
    settings: ScanSettings,
}

impl Scanner {
    pub fn new(scorer: Arc<dyn Scorer>, settings: ScanSettings) -> Self {
        Self {
            sources: Vec::new(),
            scorer,
            settings,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn SourceConnector>) -> Self {
        self.sources.push(source);
        self
    }

    #[must_use]
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Fetch every source and normalize the results.
    ///
    /// A failing or slow source is logged and skipped. Results keep source
    /// order. Opportunities costing more than `balance` are dropped.
    pub async fn scan(&self, balance: Amount) -> ScanReport {
        let fetches: Vec<BoxFuture<'static, Fetched>> = self
            .sources
            .iter()
            .map(|source| fetch_with_timeout(Arc::clone(source), self.settings.source_timeout))
            .collect();
        let fetched: Vec<Fetched> = stream::iter(fetches)
            .buffered(self.settings.max_fan_out.max(1))
            .collect()
            .await;

        let now = Utc::now();
        let mut report = ScanReport::default();
        for (name, result) in fetched {
            let records = match result {
                Ok(records) => records,
                Err(e) => {
                    warn!(source = %name, error = %e, "Source failed, skipping");
                    report.failed_sources.push(name);
                    continue;
                }
            };
            debug!(source = %name, count = records.len(), "Source returned records");

            for raw in records {
                let opportunity = match raw.normalize(&name, now) {
                    Ok(opportunity) => opportunity,
                    Err(e) => {
                        warn!(error = %e, "Dropping record");
                        report.dropped += 1;
                        continue;
                    }
                };
                if !self.settings.focus.is_empty() && !self.settings.focus.contains(&opportunity.kind) {
                    report.dropped += 1;
                    continue;
                }
                if opportunity.estimated_cost > balance {
                    debug!(
                        opportunity = %opportunity.reference(),
                        cost = %opportunity.estimated_cost,
                        balance = %balance,
                        "Unaffordable, skipping"
                    );
                    report.dropped += 1;
                    continue;
                }
                report.opportunities.push(opportunity);
            }
        }

        info!(
            found = report.opportunities.len(),
            failed_sources = report.failed_sources.len(),
            dropped = report.dropped,
            "Scan complete"
        );
        report
    }

    /// Rank with the configured scorer.
    #[must_use]
    pub fn rank(&self, opportunities: Vec<Opportunity>) -> Vec<ScoredOpportunity> {
        rank(self.scorer.as_ref(), opportunities)
    }
}
