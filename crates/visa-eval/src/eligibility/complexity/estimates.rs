use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::super::error::ConfigurationError;
use super::factors::{ComplexityFactor, ComplexityTier, SupportLevel};

/// Lower bound on maximum impact or average impact that places a case in a tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierThreshold {
    pub max_impact: u8,
    pub average_impact: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierThresholds {
    pub very_complex: TierThreshold,
    pub complex: TierThreshold,
    pub moderate: TierThreshold,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            very_complex: TierThreshold {
                max_impact: 4,
                average_impact: 3.0,
            },
            complex: TierThreshold {
                max_impact: 3,
                average_impact: 2.5,
            },
            moderate: TierThreshold {
                max_impact: 2,
                average_impact: 1.5,
            },
        }
    }
}

impl TierThresholds {
    /// Highest tier whose maximum-impact or average-impact bound is met. A lone impact-3
    /// factor averages 3.0 and therefore lands in VERY_COMPLEX.
    pub fn tier(&self, max_impact: u8, average_impact: f64) -> ComplexityTier {
        let reaches = |threshold: &TierThreshold| {
            max_impact >= threshold.max_impact || average_impact >= threshold.average_impact
        };
        if reaches(&self.very_complex) {
            ComplexityTier::VeryComplex
        } else if reaches(&self.complex) {
            ComplexityTier::Complex
        } else if reaches(&self.moderate) {
            ComplexityTier::Moderate
        } else {
            ComplexityTier::Simple
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRange {
    pub min_days: u32,
    pub max_days: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeRange {
    pub min: u32,
    pub max: u32,
}

/// Tier thresholds and the lookup tables behind timeline, fee, and support estimates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityConfig {
    #[serde(default)]
    pub thresholds: TierThresholds,
    pub timelines: BTreeMap<ComplexityTier, DayRange>,
    pub fees: BTreeMap<ComplexityTier, FeeRange>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_required_multiplier")]
    pub required_fee_multiplier: f64,
    #[serde(default = "default_advantage_multiplier")]
    pub advantage_fee_multiplier: f64,
    pub support_defaults: BTreeMap<ComplexityTier, SupportLevel>,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_required_multiplier() -> f64 {
    1.3
}

fn default_advantage_multiplier() -> f64 {
    0.9
}

impl Default for ComplexityConfig {
    fn default() -> Self {
        use ComplexityTier::*;
        Self {
            thresholds: TierThresholds::default(),
            timelines: BTreeMap::from([
                (Simple, DayRange { min_days: 14, max_days: 30 }),
                (Moderate, DayRange { min_days: 30, max_days: 60 }),
                (Complex, DayRange { min_days: 60, max_days: 90 }),
                (VeryComplex, DayRange { min_days: 90, max_days: 180 }),
            ]),
            fees: BTreeMap::from([
                (Simple, FeeRange { min: 0, max: 500 }),
                (Moderate, FeeRange { min: 500, max: 1500 }),
                (Complex, FeeRange { min: 1500, max: 3000 }),
                (VeryComplex, FeeRange { min: 3000, max: 6000 }),
            ]),
            currency: default_currency(),
            required_fee_multiplier: default_required_multiplier(),
            advantage_fee_multiplier: default_advantage_multiplier(),
            support_defaults: BTreeMap::from([
                (Simple, SupportLevel::Optional),
                (Moderate, SupportLevel::Recommended),
                (Complex, SupportLevel::HighlyRecommended),
                (VeryComplex, SupportLevel::Required),
            ]),
        }
    }
}

impl ComplexityConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for tier in ComplexityTier::ALL {
            let timeline = self.timelines.get(&tier).ok_or_else(|| {
                ConfigurationError::InvalidScoring(format!("no timeline for {tier}"))
            })?;
            if timeline.min_days > timeline.max_days {
                return Err(ConfigurationError::InvalidScoring(format!(
                    "{tier} timeline minimum exceeds maximum"
                )));
            }
            let fees = self
                .fees
                .get(&tier)
                .ok_or_else(|| ConfigurationError::InvalidScoring(format!("no fees for {tier}")))?;
            if fees.min > fees.max {
                return Err(ConfigurationError::InvalidScoring(format!(
                    "{tier} fee minimum exceeds maximum"
                )));
            }
            if !self.support_defaults.contains_key(&tier) {
                return Err(ConfigurationError::InvalidScoring(format!(
                    "no default support level for {tier}"
                )));
            }
        }
        for (name, value) in [
            ("requiredFeeMultiplier", self.required_fee_multiplier),
            ("advantageFeeMultiplier", self.advantage_fee_multiplier),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigurationError::InvalidScoring(format!(
                    "{name} must be positive (got {value})"
                )));
            }
        }
        Ok(())
    }

    pub fn timeline(&self, tier: ComplexityTier, factors: &[ComplexityFactor]) -> TimelineEstimate {
        let base = self.timelines.get(&tier).copied().unwrap_or(DayRange {
            min_days: 0,
            max_days: 0,
        });
        let added_days: i32 = factors.iter().map(|factor| factor.added_days).sum();
        let shift = |days: u32| (i64::from(days) + i64::from(added_days)).max(0) as u32;
        TimelineEstimate {
            min_days: shift(base.min_days),
            max_days: shift(base.max_days),
            added_days,
        }
    }

    pub fn fees(&self, tier: ComplexityTier, factors: &[ComplexityFactor]) -> FeeEstimate {
        let base = self
            .fees
            .get(&tier)
            .copied()
            .unwrap_or(FeeRange { min: 0, max: 0 });
        let mut multiplier = 1.0;
        if factors
            .iter()
            .any(|factor| !factor.is_advantage() && factor.support == SupportLevel::Required)
        {
            multiplier *= self.required_fee_multiplier;
        }
        if factors.iter().any(ComplexityFactor::is_advantage) {
            multiplier *= self.advantage_fee_multiplier;
        }
        FeeEstimate {
            min: (f64::from(base.min) * multiplier).round() as u32,
            max: (f64::from(base.max) * multiplier).round() as u32,
            currency: self.currency.clone(),
            multiplier,
        }
    }

    /// Strongest of the tier default and every non-advantage factor's recommendation.
    pub fn support(&self, tier: ComplexityTier, factors: &[ComplexityFactor]) -> SupportLevel {
        let default = self
            .support_defaults
            .get(&tier)
            .copied()
            .unwrap_or(SupportLevel::Optional);
        factors
            .iter()
            .filter(|factor| !factor.is_advantage())
            .map(|factor| factor.support)
            .fold(default, SupportLevel::max)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEstimate {
    pub min_days: u32,
    pub max_days: u32,
    pub added_days: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeEstimate {
    pub min: u32,
    pub max: u32,
    pub currency: String,
    pub multiplier: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maximum_impact_alone_reaches_very_complex() {
        let thresholds = TierThresholds::default();
        assert_eq!(thresholds.tier(4, 1.2), ComplexityTier::VeryComplex);
        assert_eq!(thresholds.tier(3, 1.0), ComplexityTier::Complex);
        assert_eq!(thresholds.tier(1, 1.0), ComplexityTier::Simple);
    }

    #[test]
    fn average_impact_thresholds_apply_independently() {
        let thresholds = TierThresholds {
            very_complex: TierThreshold {
                max_impact: 9,
                average_impact: 3.0,
            },
            ..TierThresholds::default()
        };
        assert_eq!(thresholds.tier(3, 3.0), ComplexityTier::VeryComplex);
        assert_eq!(thresholds.tier(1, 1.5), ComplexityTier::Moderate);
    }

    #[test]
    fn default_config_is_complete() {
        ComplexityConfig::default()
            .validate()
            .expect("default complexity config validates");
    }

    #[test]
    fn missing_tier_entries_are_rejected() {
        let mut config = ComplexityConfig::default();
        config.fees.remove(&ComplexityTier::Complex);
        match config.validate() {
            Err(ConfigurationError::InvalidScoring(message)) => {
                assert!(message.contains("COMPLEX"))
            }
            other => panic!("expected invalid scoring, got {other:?}"),
        }
    }
}
