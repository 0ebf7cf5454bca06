//! Visa eligibility evaluation pipeline.
//!
//! Raw applicant data flows one way: classifier, document validator, track evaluator, rule
//! engine, complexity analyzer, and finally the aggregator that emits an
//! [`EligibilityDecision`]. Every table the pipeline consults comes from a versioned
//! [`ConfigBundle`] injected at construction.

pub mod aggregator;
pub mod bundle;
pub mod classifier;
pub mod complexity;
pub mod context;
pub mod documents;
pub mod domain;
pub mod engine;
pub mod error;
pub mod evaluators;
pub mod repository;
pub mod router;
pub mod rules;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use aggregator::{
    AggregationConfig, DocumentSummary, EligibilityDecision, RecommendationTier, Resource,
    ResultAggregator, ScoreAdjustment,
};
pub use bundle::{ConfigBundle, ConfigVersions};
pub use classifier::{classify, Classification, ClassificationSignal};
pub use complexity::{
    ComplexityAnalyzer, ComplexityAssessment, ComplexityConfig, ComplexityFactor, ComplexityTier,
    FactorCategory, RiskLevel, SupportLevel,
};
pub use context::EvaluationContext;
pub use documents::{
    DocumentCatalog, DocumentDefect, DocumentRequirementSet, DocumentValidation,
    DocumentValidator,
};
pub use domain::{
    ApplicantData, ApplicationType, Confidence, DocumentKind, EvaluationRequest, Issue, Severity,
    SubmittedDocument, SubmittedDocuments, VisaType,
};
pub use engine::EligibilityEngine;
pub use error::{ConfigurationError, EligibilityError, RuleExecutionError};
pub use evaluators::{
    Disqualifier, EligibilityTables, EvaluatorRegistry, TrackEvaluation, TrackEvaluator,
    TrackStatus,
};
pub use repository::{
    EvaluationId, EvaluationRecord, EvaluationRepository, EvaluationSummary, RepositoryError,
};
pub use router::eligibility_router;
pub use rules::{
    Rule, RuleBuilder, RuleCategory, RuleEngineReport, RuleRegistry, RuleSet, RuleSetConfig,
    RuleStatistics,
};
pub use scoring::ScoringConfig;
pub use service::{EligibilityService, EligibilityServiceError};
