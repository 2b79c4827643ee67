use agora::domain::{Amount, RawOpportunity};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// A raw connector record with risk 1 (so its score equals its return).
pub fn raw(id: &str, kind: &str, estimated_return: Amount) -> RawOpportunity {
    RawOpportunity {
        id: id.to_string(),
        kind: kind.to_string(),
        title: format!("Opportunity {id}"),
        description: String::new(),
        payload: Value::Null,
        estimated_return,
        estimated_risk: 1.0,
        estimated_cost: Amount::ZERO,
        discovered_at: None,
    }
}

pub fn raw_at(id: &str, kind: &str, estimated_return: Amount, at: DateTime<Utc>) -> RawOpportunity {
    RawOpportunity {
        discovered_at: Some(at),
        ..raw(id, kind, estimated_return)
    }
}
