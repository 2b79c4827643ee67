//! Scoring and ranking.

use rust_decimal::prelude::ToPrimitive;

use crate::domain::{Opportunity, ScoredOpportunity};

/// Deterministic value function over an opportunity. Higher is better.
pub trait Scorer: Send + Sync {
    fn score(&self, opportunity: &Opportunity) -> f64;
}

/// `estimated_return / max(estimated_risk, risk_floor)`.
///
/// Non-positive returns score `penalty` regardless of risk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskAdjustedScorer {
    pub risk_floor: f64,
    pub penalty: f64,
}

impl Default for RiskAdjustedScorer {
    fn default() -> Self {
        Self {
            risk_floor: 1.0,
            penalty: -999.0,
        }
    }
}

impl Scorer for RiskAdjustedScorer {
    fn score(&self, opportunity: &Opportunity) -> f64 {
        let ret = opportunity.estimated_return.to_f64().unwrap_or(0.0);
        if ret <= 0.0 {
            return self.penalty;
        }
        ret / opportunity.estimated_risk.max(self.risk_floor)
    }
}

/// Score and order opportunities.
///
/// Descending score, then earliest discovery, then `(source_id, id)`.
/// NaN and infinite scores sort as `-inf`. Ranks start at 1.
pub fn rank(scorer: &dyn Scorer, opportunities: Vec<Opportunity>) -> Vec<ScoredOpportunity> {
    let mut scored: Vec<(f64, Opportunity)> = opportunities
        .into_iter()
        .map(|opp| {
            let score = scorer.score(&opp);
            let score = if score.is_finite() { score } else { f64::NEG_INFINITY };
            (score, opp)
        })
        .collect();

    scored.sort_by(|(sa, a), (sb, b)| {
        sb.total_cmp(sa)
            .then_with(|| a.discovered_at.cmp(&b.discovered_at))
            .then_with(|| a.source_id.cmp(&b.source_id))
            .then_with(|| a.id.as_str().cmp(b.id.as_str()))
    });

    scored
        .into_iter()
        .enumerate()
        .map(|(i, (score, opportunity))| ScoredOpportunity {
            opportunity,
            score,
            rank: i + 1,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OpportunityKind;
    use rust_decimal_macros::dec;

    #[test]
    fn return_over_risk() {
        let scorer = RiskAdjustedScorer::default();
        let opp = Opportunity::new("s", "a", OpportunityKind::Trade, dec!(10), 4.0);
        assert!((scorer.score(&opp) - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn risk_below_floor_is_clamped() {
        let scorer = RiskAdjustedScorer::default();
        let opp = Opportunity::new("s", "a", OpportunityKind::Trade, dec!(3), 0.0);
        assert!((scorer.score(&opp) - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn non_positive_return_is_penalized() {
        let scorer = RiskAdjustedScorer::default();
        let opp = Opportunity::new("s", "a", OpportunityKind::Trade, dec!(-1), 1.0);
        assert_eq!(scorer.score(&opp), -999.0);
    }

    struct NanScorer;

    impl Scorer for NanScorer {
        fn score(&self, opportunity: &Opportunity) -> f64 {
            if opportunity.id.as_str() == "nan" {
                f64::NAN
            } else {
                0.0
            }
        }
    }

    #[test]
    fn nan_sorts_last() {
        let opps = vec![
            Opportunity::new("s", "nan", OpportunityKind::Trade, dec!(1), 1.0),
            Opportunity::new("s", "zero", OpportunityKind::Trade, dec!(1), 1.0),
        ];
        let ranked = rank(&NanScorer, opps);
        assert_eq!(ranked[0].opportunity.id.as_str(), "zero");
        assert_eq!(ranked[1].score, f64::NEG_INFINITY);
        assert_eq!(ranked[1].rank, 2);
    }

    #[test]
    fn empty_input_ranks_empty() {
        assert!(rank(&RiskAdjustedScorer::default(), Vec::new()).is_empty());
    }
}
