use std::path::PathBuf;

use async_trait::async_trait;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use super::task::{payload_for, result_text, run_in_worker, TaskRun};
use super::{ExecutionContext, Strategy};
use crate::domain::{Amount, Opportunity, OpportunityKind, Outcome, StrategyId};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    pub min_capital: Amount,
    pub generation_cost: Amount,
    /// Where finished articles are saved.
    pub output_dir: PathBuf,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            min_capital: dec!(0.10),
            generation_cost: dec!(0.10),
            output_dir: PathBuf::from("./data/content"),
        }
    }
}

/// Writes an article in a worker, saves it locally, and books the
/// opportunity's estimated revenue.
pub struct ContentStrategy {
    id: StrategyId,
    config: ContentConfig,
}

impl ContentStrategy {
    #[must_use]
    pub fn new(config: ContentConfig) -> Self {
        Self {
            id: StrategyId::new("content"),
            config,
        }
    }

    /// Topic and intent for the writer, by content type.
    fn brief(opportunity: &Opportunity) -> (String, &'static str) {
        match opportunity.payload_str("type").unwrap_or("affiliate") {
            "affiliate" => {
                let niche = opportunity.payload_str("niche").unwrap_or("technology");
                (
                    format!("Best {niche} tools and services in 2026"),
                    "SEO review article with affiliate links",
                )
            }
            _ => (
                opportunity
                    .payload_str("topic")
                    .unwrap_or("trending news")
                    .to_string(),
                "informative news-style article for display ad revenue",
            ),
        }
    }

    fn output_path(&self, opportunity: &Opportunity) -> PathBuf {
        let name: String = opportunity
            .id
            .as_str()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.config.output_dir.join(format!("content_{name}.md"))
    }

    async fn save(&self, opportunity: &Opportunity, article: &str) -> Option<PathBuf> {
        let path = self.output_path(opportunity);
        let written = async {
            tokio::fs::create_dir_all(&self.config.output_dir).await?;
            tokio::fs::write(&path, article).await
        }
        .await;
        match written {
            Ok(()) => {
                info!(path = %path.display(), chars = article.len(), "Content saved");
                Some(path)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not save content");
                None
            }
        }
    }
}

#[async_trait]
impl Strategy for ContentStrategy {
    fn id(&self) -> &StrategyId {
        &self.id
    }

    fn description(&self) -> &'static str {
        "Write and save an article for affiliate or ad revenue"
    }

    fn accepted_kinds(&self) -> &[OpportunityKind] {
        &[OpportunityKind::Content]
    }

    fn min_capital(&self) -> Amount {
        self.config.min_capital
    }

    async fn execute(&self, opportunity: &Opportunity, ctx: &ExecutionContext) -> Result<Outcome> {
        let content_type = opportunity.payload_str("type").unwrap_or("affiliate");
        let (topic, intent) = Self::brief(opportunity);
        let payload = payload_for(&self.id, opportunity)
            .with_field("kind", "content")
            .with_field("topic", topic.clone())
            .with_field("intent", intent);

        let (worker_id, result, costs) =
            match run_in_worker(&self.id, payload, self.config.generation_cost, ctx).await? {
                TaskRun::Completed {
                    worker_id,
                    result,
                    costs,
                } => (worker_id, result, costs),
                TaskRun::Failed(outcome) => return Ok(outcome),
            };

        let Some(article) = result_text(&result, "content") else {
            return Ok(Outcome::failure(self.id.clone(), "content generation produced nothing")
                .with_costs(costs)
                .with_worker(worker_id));
        };

        let saved = self.save(opportunity, article).await;

        Ok(Outcome::success(self.id.clone(), opportunity.estimated_return)
            .with_costs(costs)
            .with_worker(worker_id)
            .with_details(json!({
                "type": content_type,
                "topic": topic,
                "chars": article.len(),
                "path": saved.map(|p| p.display().to_string()),
            })))
    }
}
