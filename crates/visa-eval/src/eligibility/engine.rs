use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use super::aggregator::{EligibilityDecision, ResultAggregator, StageOutputs};
use super::bundle::{ConfigBundle, ConfigVersions};
use super::classifier::classify;
use super::complexity::ComplexityAnalyzer;
use super::context::EvaluationContext;
use super::documents::{DocumentCatalog, DocumentRequirementSet, DocumentValidator};
use super::domain::{ApplicantData, ApplicationType, EvaluationRequest, VisaType};
use super::error::{ConfigurationError, EligibilityError};
use super::evaluators::{EligibilityTables, EvaluatorRegistry};
use super::rules::{RuleRegistry, RuleSetConfig, RuleStatistics};

/// Evaluation pipeline over one loaded configuration bundle.
///
/// Everything except the rule registry is immutable after construction. The registry swaps
/// whole snapshots, so concurrent evaluations never observe a half-applied rule update.
#[derive(Debug)]
pub struct EligibilityEngine {
    validator: DocumentValidator,
    tables: Arc<EligibilityTables>,
    rules: RuleRegistry,
    evaluators: EvaluatorRegistry,
    complexity: ComplexityAnalyzer,
    aggregator: ResultAggregator,
    documents_version: String,
    scoring_version: String,
}

impl EligibilityEngine {
    pub fn from_bundle(bundle: ConfigBundle) -> Result<Self, ConfigurationError> {
        let ConfigBundle {
            catalog,
            tables,
            rules,
            scoring,
        } = bundle;

        let evaluators = EvaluatorRegistry::standard();
        ensure_catalog_covers(&catalog, &evaluators)?;

        let rules = RuleRegistry::from_config(&rules)?;
        let aggregator = ResultAggregator::new(scoring.aggregation, tables.status_bands);
        let engine = Self {
            documents_version: catalog.version.clone(),
            scoring_version: scoring.version,
            validator: DocumentValidator::new(Arc::new(catalog)),
            tables: Arc::new(tables),
            rules,
            evaluators,
            complexity: ComplexityAnalyzer::new(scoring.complexity),
            aggregator,
        };
        info!(versions = ?engine.config_versions(), "eligibility engine ready");
        Ok(engine)
    }

    pub fn with_defaults() -> Result<Self, ConfigurationError> {
        Self::from_bundle(ConfigBundle::embedded()?)
    }

    pub fn catalog(&self) -> &DocumentCatalog {
        self.validator.catalog()
    }

    pub fn tables(&self) -> &EligibilityTables {
        &self.tables
    }

    pub fn rule_registry(&self) -> &RuleRegistry {
        &self.rules
    }

    pub fn config_versions(&self) -> ConfigVersions {
        ConfigVersions {
            documents: self.documents_version.clone(),
            eligibility: self.tables.version.clone(),
            rules: self.rules.snapshot().version().to_string(),
            scoring: self.scoring_version.clone(),
        }
    }

    /// Run the full pipeline for one request. Deterministic for a fixed `today`.
    pub fn evaluate(
        &self,
        request: &EvaluationRequest,
        today: NaiveDate,
    ) -> Result<EligibilityDecision, EligibilityError> {
        let visa_type = VisaType::parse(&request.visa_type)?;
        let applicant = &request.applicant_data;

        let classification = classify(visa_type, request.application_type, &applicant.evaluation);
        let application_type = classification.application_type;
        debug!(
            %visa_type,
            %application_type,
            confidence = classification.confidence.label(),
            "application classified"
        );

        // Reject unsupported tracks before any stage runs.
        self.evaluators.get(visa_type, application_type)?;

        let documents = self.validator.validate(
            visa_type,
            application_type,
            &request.submitted_documents,
            applicant,
            today,
        )?;
        debug!(
            score = documents.score,
            missing = documents.missing.len(),
            invalid = documents.invalid.len(),
            "documents validated"
        );

        let ctx = EvaluationContext {
            visa_type,
            application_type,
            applicant,
            documents: &documents,
            tables: &self.tables,
            today,
        };

        let track = self.evaluators.evaluate(&ctx)?;
        let snapshot = self.rules.snapshot();
        let report = snapshot.evaluate(&ctx);
        debug!(
            track_score = track.score,
            rule_score = report.overall_score,
            "track and rules evaluated"
        );

        let complexity = self.complexity.analyze(&ctx, &track);
        let versions = ConfigVersions {
            documents: self.documents_version.clone(),
            eligibility: self.tables.version.clone(),
            rules: report.rule_set_version.clone(),
            scoring: self.scoring_version.clone(),
        };

        Ok(self.aggregator.aggregate(
            StageOutputs {
                classification: &classification,
                track: &track,
                rules: &report,
                documents: &documents,
                complexity: &complexity,
            },
            applicant.administrative.office.as_deref(),
            versions,
        ))
    }

    pub fn requirements(
        &self,
        visa_type: &str,
        application_type: ApplicationType,
        applicant: &ApplicantData,
    ) -> Result<DocumentRequirementSet, EligibilityError> {
        let visa_type = VisaType::parse(visa_type)?;
        self.validator
            .requirements(visa_type, application_type, applicant)
    }

    pub fn rule_statistics(&self) -> Vec<RuleStatistics> {
        self.rules.statistics()
    }

    /// Swap in a new rule-set snapshot. Returns the version now active.
    pub fn replace_rules(&self, config: &RuleSetConfig) -> Result<String, ConfigurationError> {
        self.rules.replace(config)
    }
}

fn ensure_catalog_covers(
    catalog: &DocumentCatalog,
    evaluators: &EvaluatorRegistry,
) -> Result<(), ConfigurationError> {
    for visa_type in VisaType::ALL {
        for application_type in ApplicationType::ALL {
            if evaluators.supports(visa_type, application_type)
                && !catalog.supports(visa_type, application_type)
            {
                return Err(ConfigurationError::InvalidCatalog(format!(
                    "no document requirements for {visa_type} {application_type}"
                )));
            }
        }
    }
    Ok(())
}
