//! Case complexity tier, risk level, and effort estimates.

mod estimates;
mod factors;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::context::EvaluationContext;
use super::evaluators::TrackEvaluation;

pub use estimates::{
    ComplexityConfig, DayRange, FeeEstimate, FeeRange, TierThreshold, TierThresholds,
    TimelineEstimate,
};
pub use factors::{identify_factors, ComplexityFactor, ComplexityTier, FactorCategory, SupportLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }

    /// Derived from the legal or very-complex factors only.
    pub fn from_factors(factors: &[ComplexityFactor]) -> Self {
        let bearing: Vec<&ComplexityFactor> =
            factors.iter().filter(|factor| factor.is_risk_bearing()).collect();
        if bearing.is_empty() {
            RiskLevel::Low
        } else if bearing.len() >= 2 || bearing.iter().any(|factor| factor.impact >= 4) {
            RiskLevel::High
        } else {
            RiskLevel::Medium
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityAssessment {
    pub tier: ComplexityTier,
    pub risk: RiskLevel,
    pub factors: Vec<ComplexityFactor>,
    pub max_impact: u8,
    pub average_impact: f64,
    pub timeline: TimelineEstimate,
    pub fees: FeeEstimate,
    pub support: SupportLevel,
    pub has_advantage: bool,
}

impl ComplexityAssessment {
    pub fn complexity_factors(&self) -> impl Iterator<Item = &ComplexityFactor> {
        self.factors.iter().filter(|factor| !factor.is_advantage())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ComplexityAnalyzer {
    config: ComplexityConfig,
}

impl ComplexityAnalyzer {
    pub fn new(config: ComplexityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ComplexityConfig {
        &self.config
    }

    pub fn analyze(
        &self,
        ctx: &EvaluationContext<'_>,
        track: &TrackEvaluation,
    ) -> ComplexityAssessment {
        self.assess(identify_factors(ctx, track))
    }

    /// Tier, risk, and estimates for an already enumerated factor list.
    pub fn assess(&self, factors: Vec<ComplexityFactor>) -> ComplexityAssessment {
        let impacts: Vec<u8> = factors
            .iter()
            .filter(|factor| !factor.is_advantage())
            .map(|factor| factor.impact)
            .collect();
        let max_impact = impacts.iter().copied().max().unwrap_or(0);
        let average_impact = if impacts.is_empty() {
            0.0
        } else {
            impacts.iter().map(|&impact| f64::from(impact)).sum::<f64>() / impacts.len() as f64
        };
        let tier = if impacts.is_empty() {
            ComplexityTier::Simple
        } else {
            self.config.thresholds.tier(max_impact, average_impact)
        };
        let risk = RiskLevel::from_factors(&factors);
        let timeline = self.config.timeline(tier, &factors);
        let fees = self.config.fees(tier, &factors);
        let support = self.config.support(tier, &factors);
        let has_advantage = factors.iter().any(ComplexityFactor::is_advantage);

        debug!(
            %tier,
            %risk,
            factors = factors.len(),
            max_impact,
            "complexity assessed"
        );

        ComplexityAssessment {
            tier,
            risk,
            factors,
            max_impact,
            average_impact,
            timeline,
            fees,
            support,
            has_advantage,
        }
    }
}
