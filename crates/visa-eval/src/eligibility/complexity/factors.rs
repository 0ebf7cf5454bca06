use std::fmt;

use serde::{Deserialize, Serialize};

use super::super::context::EvaluationContext;
use super::super::domain::ApplicationType;
use super::super::evaluators::TrackEvaluation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorCategory {
    Education,
    Experience,
    Legal,
    Immigration,
    Documentation,
    Employment,
    Eligibility,
    /// Favourable circumstance. Never counted towards tier or risk.
    Advantage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplexityTier {
    Simple,
    Moderate,
    Complex,
    VeryComplex,
}

impl ComplexityTier {
    pub const ALL: [ComplexityTier; 4] = [
        ComplexityTier::Simple,
        ComplexityTier::Moderate,
        ComplexityTier::Complex,
        ComplexityTier::VeryComplex,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ComplexityTier::Simple => "SIMPLE",
            ComplexityTier::Moderate => "MODERATE",
            ComplexityTier::Complex => "COMPLEX",
            ComplexityTier::VeryComplex => "VERY_COMPLEX",
        }
    }

    /// Tier implied by a single factor's impact.
    pub const fn from_impact(impact: u8) -> Self {
        match impact {
            0 | 1 => ComplexityTier::Simple,
            2 => ComplexityTier::Moderate,
            3 => ComplexityTier::Complex,
            _ => ComplexityTier::VeryComplex,
        }
    }
}

impl fmt::Display for ComplexityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SupportLevel {
    Optional,
    Recommended,
    HighlyRecommended,
    Required,
}

impl SupportLevel {
    pub const fn label(self) -> &'static str {
        match self {
            SupportLevel::Optional => "OPTIONAL",
            SupportLevel::Recommended => "RECOMMENDED",
            SupportLevel::HighlyRecommended => "HIGHLY_RECOMMENDED",
            SupportLevel::Required => "REQUIRED",
        }
    }
}

impl fmt::Display for SupportLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityFactor {
    pub category: FactorCategory,
    pub tier: ComplexityTier,
    /// 1 (minor) to 4 (dominant).
    pub impact: u8,
    pub description: String,
    /// Added processing days. Negative for advantages.
    pub added_days: i32,
    pub support: SupportLevel,
}

impl ComplexityFactor {
    pub fn new(
        category: FactorCategory,
        impact: u8,
        added_days: i32,
        support: SupportLevel,
        description: impl Into<String>,
    ) -> Self {
        let impact = impact.clamp(1, 4);
        Self {
            category,
            tier: ComplexityTier::from_impact(impact),
            impact,
            description: description.into(),
            added_days,
            support,
        }
    }

    pub fn is_advantage(&self) -> bool {
        self.category == FactorCategory::Advantage
    }

    /// Legal factors and any factor at the very-complex tier drive the risk level.
    pub fn is_risk_bearing(&self) -> bool {
        !self.is_advantage()
            && (self.category == FactorCategory::Legal || self.tier == ComplexityTier::VeryComplex)
    }
}

/// Enumerate complexity factors from the applicant and the track outcome, in a fixed order.
pub fn identify_factors(
    ctx: &EvaluationContext<'_>,
    track: &TrackEvaluation,
) -> Vec<ComplexityFactor> {
    let attributes = &ctx.applicant.evaluation;
    let mut factors = Vec::new();

    if let Some(education) = attributes.education.as_ref().filter(|e| e.foreign_degree) {
        let country = education.degree_country.as_deref().unwrap_or("abroad");
        factors.push(ComplexityFactor::new(
            FactorCategory::Education,
            2,
            14,
            SupportLevel::Recommended,
            format!("foreign degree from {country} requires verification"),
        ));
    }

    if let Some(experience) = attributes.experience.as_ref() {
        let mut countries: Vec<String> = experience
            .countries
            .iter()
            .map(|country| country.trim().to_ascii_uppercase())
            .filter(|country| !country.is_empty())
            .collect();
        countries.sort();
        countries.dedup();
        match countries.len() {
            0 | 1 => {}
            2 => factors.push(ComplexityFactor::new(
                FactorCategory::Experience,
                1,
                5,
                SupportLevel::Optional,
                "experience acquired in two countries",
            )),
            count => factors.push(ComplexityFactor::new(
                FactorCategory::Experience,
                2,
                10,
                SupportLevel::Recommended,
                format!("experience acquired in {count} countries"),
            )),
        }
    }

    let history = attributes.history;
    if history.unresolved_violations {
        factors.push(ComplexityFactor::new(
            FactorCategory::Legal,
            4,
            60,
            SupportLevel::Required,
            "unresolved immigration violations",
        ));
    } else if history.prior_violations > 0 {
        factors.push(ComplexityFactor::new(
            FactorCategory::Legal,
            3,
            30,
            SupportLevel::HighlyRecommended,
            format!("{} resolved immigration violation(s)", history.prior_violations),
        ));
    }
    if history.criminal_record {
        factors.push(ComplexityFactor::new(
            FactorCategory::Legal,
            4,
            45,
            SupportLevel::Required,
            "criminal record declared",
        ));
    }
    if history.tax_arrears {
        factors.push(ComplexityFactor::new(
            FactorCategory::Legal,
            3,
            21,
            SupportLevel::HighlyRecommended,
            "outstanding tax arrears",
        ));
    }
    match history.prior_refusals {
        0 => {}
        1 => factors.push(ComplexityFactor::new(
            FactorCategory::Immigration,
            2,
            14,
            SupportLevel::Recommended,
            "one prior visa refusal",
        )),
        refusals => factors.push(ComplexityFactor::new(
            FactorCategory::Immigration,
            3,
            30,
            SupportLevel::HighlyRecommended,
            format!("{refusals} prior visa refusals"),
        )),
    }

    if ctx.application_type == ApplicationType::Change {
        factors.push(ComplexityFactor::new(
            FactorCategory::Immigration,
            2,
            14,
            SupportLevel::Recommended,
            "change of status application",
        ));
    }

    let missing = ctx.documents.missing.len();
    if missing > 0 {
        let impact = if missing >= 3 { 3 } else { 2 };
        factors.push(ComplexityFactor::new(
            FactorCategory::Documentation,
            impact,
            7 * missing as i32,
            if missing >= 3 {
                SupportLevel::HighlyRecommended
            } else {
                SupportLevel::Recommended
            },
            format!("{missing} required document(s) missing"),
        ));
    }
    let invalid = ctx.documents.penalized_invalid_count();
    if invalid > 0 {
        factors.push(ComplexityFactor::new(
            FactorCategory::Documentation,
            1,
            3 * invalid as i32,
            SupportLevel::Optional,
            format!("{invalid} submitted document(s) need correction"),
        ));
    }

    if let Some(contract) = attributes.contract.as_ref() {
        if contract.duration_months < ctx.tables.minimum_contract_months {
            factors.push(ComplexityFactor::new(
                FactorCategory::Employment,
                2,
                7,
                SupportLevel::Recommended,
                format!("short contract of {} months", contract.duration_months),
            ));
        }
    }

    if track.is_disqualified() {
        let reasons: Vec<String> = track
            .disqualifiers
            .iter()
            .map(|disqualifier| disqualifier.summary())
            .collect();
        factors.push(ComplexityFactor::new(
            FactorCategory::Eligibility,
            3,
            0,
            SupportLevel::HighlyRecommended,
            format!("categorical disqualifier: {}", reasons.join("; ")),
        ));
    }

    if let Some(institution) = attributes.institution.as_ref() {
        if let Some(region) = institution.region.as_deref() {
            if ctx.tables.is_incentive_region(region) {
                factors.push(ComplexityFactor::new(
                    FactorCategory::Advantage,
                    1,
                    -7,
                    SupportLevel::Optional,
                    format!("{} is in the incentivised region {region}", institution.name),
                ));
            }
        }
    }

    factors
}
