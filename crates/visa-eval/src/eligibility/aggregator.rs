//! Merges every pipeline stage into the final decision artefact.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::bundle::ConfigVersions;
use super::classifier::Classification;
use super::complexity::{ComplexityAssessment, ComplexityTier, SupportLevel};
use super::documents::{DocumentDefect, DocumentValidation, InvalidDocument, MissingDocument};
use super::domain::{clamp_score, ApplicationType, Confidence, DocumentKind, Issue, VisaType};
use super::error::ConfigurationError;
use super::evaluators::{StatusBands, TrackEvaluation, TrackStatus};
use super::rules::{CategoryResult, RuleCategory, RuleEngineReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationTier {
    NotRecommended,
    Conditional,
    Recommended,
    HighlyRecommended,
}

impl RecommendationTier {
    pub const fn label(self) -> &'static str {
        match self {
            RecommendationTier::NotRecommended => "NOT_RECOMMENDED",
            RecommendationTier::Conditional => "CONDITIONAL",
            RecommendationTier::Recommended => "RECOMMENDED",
            RecommendationTier::HighlyRecommended => "HIGHLY_RECOMMENDED",
        }
    }
}

impl fmt::Display for RecommendationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationThresholds {
    pub highly_recommended: u8,
    pub recommended: u8,
    pub conditional: u8,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            highly_recommended: 85,
            recommended: 70,
            conditional: 50,
        }
    }
}

impl RecommendationThresholds {
    pub fn tier(&self, score: u8) -> RecommendationTier {
        if score >= self.highly_recommended {
            RecommendationTier::HighlyRecommended
        } else if score >= self.recommended {
            RecommendationTier::Recommended
        } else if score >= self.conditional {
            RecommendationTier::Conditional
        } else {
            RecommendationTier::NotRecommended
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceThresholds {
    pub high: u8,
    pub medium: u8,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            high: 85,
            medium: 65,
        }
    }
}

impl ConfidenceThresholds {
    pub fn confidence(&self, score: u8) -> Confidence {
        if score >= self.high {
            Confidence::High
        } else if score >= self.medium {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

/// Blend weights and the small signal-driven adjustments applied to the blended score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AggregationConfig {
    pub track_weight: f64,
    pub rule_weight: f64,
    pub complete_documents_bonus: i32,
    pub missing_document_penalty: i32,
    pub missing_document_penalty_cap: i32,
    pub simple_case_bonus: i32,
    pub very_complex_penalty: i32,
    pub advantage_bonus: i32,
    pub low_classification_penalty: i32,
    pub recommendation: RecommendationThresholds,
    pub confidence: ConfidenceThresholds,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            track_weight: 0.6,
            rule_weight: 0.4,
            complete_documents_bonus: 3,
            missing_document_penalty: 2,
            missing_document_penalty_cap: 10,
            simple_case_bonus: 2,
            very_complex_penalty: 5,
            advantage_bonus: 2,
            low_classification_penalty: 3,
            recommendation: RecommendationThresholds::default(),
            confidence: ConfidenceThresholds::default(),
        }
    }
}

impl AggregationConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (name, weight) in [
            ("trackWeight", self.track_weight),
            ("ruleWeight", self.rule_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigurationError::InvalidScoring(format!(
                    "{name} must be a non-negative number (got {weight})"
                )));
            }
        }
        if self.track_weight + self.rule_weight <= 0.0 {
            return Err(ConfigurationError::InvalidScoring(
                "trackWeight and ruleWeight must not both be zero".to_string(),
            ));
        }
        let recommendation = self.recommendation;
        if !(recommendation.highly_recommended >= recommendation.recommended
            && recommendation.recommended >= recommendation.conditional)
        {
            return Err(ConfigurationError::InvalidScoring(
                "recommendation thresholds must be descending".to_string(),
            ));
        }
        if self.confidence.high < self.confidence.medium {
            return Err(ConfigurationError::InvalidScoring(
                "confidence thresholds must be descending".to_string(),
            ));
        }
        Ok(())
    }
}

/// One signed adjustment applied on top of the blended base score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreAdjustment {
    pub reason: String,
    pub points: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub valid: bool,
    pub score: u8,
    pub completeness: f64,
    pub missing: Vec<MissingDocument>,
    pub invalid: Vec<InvalidDocument>,
    pub bonus: Vec<DocumentKind>,
}

impl From<&DocumentValidation> for DocumentSummary {
    fn from(validation: &DocumentValidation) -> Self {
        Self {
            valid: validation.valid,
            score: validation.score,
            completeness: validation.completeness,
            missing: validation.missing.clone(),
            invalid: validation.invalid.clone(),
            bonus: validation.bonus.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub title: String,
    pub description: String,
}

impl Resource {
    fn new(title: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
        }
    }
}

/// Final artefact of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityDecision {
    pub visa_type: VisaType,
    pub application_type: ApplicationType,
    pub score: u8,
    pub status: TrackStatus,
    pub confidence: Confidence,
    pub recommendation: RecommendationTier,
    pub classification: Classification,
    pub track: TrackEvaluation,
    pub breakdown: BTreeMap<RuleCategory, CategoryResult>,
    pub rule_score: u8,
    pub documents: DocumentSummary,
    pub complexity: ComplexityAssessment,
    pub adjustments: Vec<ScoreAdjustment>,
    pub issues: Vec<Issue>,
    pub strengths: Vec<String>,
    pub recommendations: Vec<String>,
    pub next_steps: Vec<String>,
    pub resources: Vec<Resource>,
    pub config_versions: ConfigVersions,
}

impl EligibilityDecision {
    pub fn is_disqualified(&self) -> bool {
        self.track.is_disqualified()
    }
}

/// Borrowed outputs of the upstream stages.
#[derive(Debug, Clone, Copy)]
pub struct StageOutputs<'a> {
    pub classification: &'a Classification,
    pub track: &'a TrackEvaluation,
    pub rules: &'a RuleEngineReport,
    pub documents: &'a DocumentValidation,
    pub complexity: &'a ComplexityAssessment,
}

#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    config: AggregationConfig,
    status_bands: StatusBands,
}

impl ResultAggregator {
    pub fn new(config: AggregationConfig, status_bands: StatusBands) -> Self {
        Self {
            config,
            status_bands,
        }
    }

    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    pub fn aggregate(
        &self,
        stages: StageOutputs<'_>,
        office: Option<&str>,
        config_versions: ConfigVersions,
    ) -> EligibilityDecision {
        let StageOutputs {
            classification,
            track,
            rules,
            documents,
            complexity,
        } = stages;

        let (score, adjustments) = if track.is_disqualified() {
            (0, Vec::new())
        } else {
            let adjustments = self.adjustments(classification, documents, complexity);
            let base = self.base_score(track.score, rules.overall_score);
            let delta: i32 = adjustments.iter().map(|adjustment| adjustment.points).sum();
            (clamp_score(base + f64::from(delta)), adjustments)
        };

        let (status, recommendation) = if track.is_disqualified() {
            (TrackStatus::Rejected, RecommendationTier::NotRecommended)
        } else {
            (
                self.status_bands.status(score),
                self.config.recommendation.tier(score),
            )
        };
        let confidence = self.confidence(score, classification, complexity);

        let mut issues = track.issues.clone();
        issues.extend(rules.issues.iter().cloned());

        let strengths = merge_unique([&track.strengths, &rules.strengths]);
        let mut recommendations = merge_unique([&track.recommendations, &rules.recommendations]);
        for step in document_actions(documents) {
            push_unique(&mut recommendations, step);
        }

        let next_steps = next_steps(recommendation, documents, complexity, track, office);
        let resources = resources(recommendation, documents, complexity);

        debug!(
            visa_type = %track.visa_type,
            application_type = %track.application_type,
            score,
            %status,
            %recommendation,
            "decision aggregated"
        );

        EligibilityDecision {
            visa_type: track.visa_type,
            application_type: track.application_type,
            score,
            status,
            confidence,
            recommendation,
            classification: classification.clone(),
            track: track.clone(),
            breakdown: rules.categories.clone(),
            rule_score: rules.overall_score,
            documents: DocumentSummary::from(documents),
            complexity: complexity.clone(),
            adjustments,
            issues,
            strengths,
            recommendations,
            next_steps,
            resources,
            config_versions,
        }
    }

    fn base_score(&self, track_score: u8, rule_score: u8) -> f64 {
        let total = self.config.track_weight + self.config.rule_weight;
        let blended = self.config.track_weight * f64::from(track_score)
            + self.config.rule_weight * f64::from(rule_score);
        (blended / total).round()
    }

    fn adjustments(
        &self,
        classification: &Classification,
        documents: &DocumentValidation,
        complexity: &ComplexityAssessment,
    ) -> Vec<ScoreAdjustment> {
        let config = &self.config;
        let mut adjustments = Vec::new();
        let mut push = |reason: String, points: i32| {
            if points != 0 {
                adjustments.push(ScoreAdjustment { reason, points });
            }
        };

        if documents.completeness >= 100.0 {
            push(
                "all required documents submitted".to_string(),
                config.complete_documents_bonus,
            );
        }
        let missing = documents.missing.len() as i32;
        if missing > 0 {
            let penalty = (missing * config.missing_document_penalty)
                .min(config.missing_document_penalty_cap);
            push(format!("{missing} required document(s) missing"), -penalty);
        }
        match complexity.tier {
            ComplexityTier::Simple => push("simple case".to_string(), config.simple_case_bonus),
            ComplexityTier::VeryComplex => push(
                "very complex case".to_string(),
                -config.very_complex_penalty,
            ),
            ComplexityTier::Moderate | ComplexityTier::Complex => {}
        }
        if complexity.has_advantage {
            push(
                "regional incentive advantage".to_string(),
                config.advantage_bonus,
            );
        }
        if classification.confidence == Confidence::Low {
            push(
                "application type inferred with low confidence".to_string(),
                -config.low_classification_penalty,
            );
        }
        adjustments
    }

    fn confidence(
        &self,
        score: u8,
        classification: &Classification,
        complexity: &ComplexityAssessment,
    ) -> Confidence {
        let mut confidence = self.config.confidence.confidence(score);
        if complexity.tier == ComplexityTier::VeryComplex {
            confidence = confidence.min(Confidence::Medium);
        }
        if complexity.tier == ComplexityTier::Complex
            || classification.confidence == Confidence::Low
        {
            confidence = confidence.downgraded();
        }
        confidence
    }
}

fn push_unique(list: &mut Vec<String>, item: String) {
    if !list.contains(&item) {
        list.push(item);
    }
}

fn merge_unique<'a>(sources: impl IntoIterator<Item = &'a Vec<String>>) -> Vec<String> {
    let mut merged = Vec::new();
    for item in sources.into_iter().flatten() {
        push_unique(&mut merged, item.clone());
    }
    merged
}

fn document_actions(documents: &DocumentValidation) -> Vec<String> {
    let mut actions = Vec::new();
    for missing in &documents.missing {
        if missing.documents.len() > 1 {
            let bundle: Vec<&str> = missing.documents.iter().map(|kind| kind.id()).collect();
            actions.push(format!("Submit one of: {}", bundle.join(", ")));
        } else {
            actions.push(format!("Submit {}", missing.id));
        }
    }
    for invalid in documents.invalid.iter().filter(|invalid| !invalid.optional) {
        actions.push(format!(
            "Correct {}: {}",
            invalid.document.id(),
            invalid.reasons.join("; ")
        ));
    }
    actions
}

fn next_steps(
    recommendation: RecommendationTier,
    documents: &DocumentValidation,
    complexity: &ComplexityAssessment,
    track: &TrackEvaluation,
    office: Option<&str>,
) -> Vec<String> {
    let mut steps = Vec::new();
    if track.is_disqualified() {
        for disqualifier in &track.disqualifiers {
            steps.push(format!("Resolve disqualifying condition: {disqualifier}"));
        }
    }
    steps.extend(document_actions(documents));

    match complexity.support {
        SupportLevel::Required => {
            steps.push("Engage a licensed immigration attorney before filing".to_string())
        }
        SupportLevel::HighlyRecommended => {
            steps.push("Consult an immigration specialist about the flagged risks".to_string())
        }
        SupportLevel::Recommended | SupportLevel::Optional => {}
    }

    let office = office.unwrap_or("the competent immigration office");
    match recommendation {
        RecommendationTier::HighlyRecommended => {
            steps.push(format!("Book a filing appointment at {office}"));
            steps.push("Bring originals of every submitted document".to_string());
        }
        RecommendationTier::Recommended => {
            steps.push("Review the listed issues and strengthen weak components".to_string());
            steps.push(format!("Book a filing appointment at {office}"));
        }
        RecommendationTier::Conditional => {
            steps.push("Re-run the evaluation after addressing the listed issues".to_string());
        }
        RecommendationTier::NotRecommended => {
            steps.push("Do not file until the application is re-evaluated".to_string());
            steps.push(
                "Review whether another visa category fits the planned activity".to_string(),
            );
        }
    }
    steps
}

fn resources(
    recommendation: RecommendationTier,
    documents: &DocumentValidation,
    complexity: &ComplexityAssessment,
) -> Vec<Resource> {
    let mut resources = vec![Resource::new(
        "Online visa portal",
        "Appointment booking and status tracking for residence applications",
    )];
    let needs_legalization = documents.invalid.iter().any(|invalid| {
        invalid.defects.iter().any(|defect| {
            matches!(
                defect,
                DocumentDefect::MissingApostille | DocumentDefect::MissingTranslation
            )
        })
    });
    if needs_legalization {
        resources.push(Resource::new(
            "Apostille and translation guide",
            "How to legalize and translate documents issued abroad",
        ));
    }
    if !documents.missing.is_empty() {
        resources.push(Resource::new(
            "Document checklist",
            "Full requirement list for the selected visa and application type",
        ));
    }
    if complexity.support >= SupportLevel::HighlyRecommended {
        resources.push(Resource::new(
            "Immigration legal aid",
            "Licensed counsel for cases with legal or immigration history",
        ));
    }
    if recommendation == RecommendationTier::NotRecommended {
        resources.push(Resource::new(
            "Visa category guide",
            "Eligibility summaries for alternative residence categories",
        ));
    }
    resources
}
