use std::path::PathBuf;

use super::domain::{ApplicationType, VisaType};

/// Fatal errors surfaced to callers of the evaluation core.
#[derive(Debug, thiserror::Error)]
pub enum EligibilityError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("visa type '{visa_type}' is not cataloged")]
    UnsupportedVisaType { visa_type: String },
    #[error("application type '{application_type}' is not recognized")]
    UnknownApplicationType { application_type: String },
    #[error("{visa_type} does not support the {application_type} track")]
    UnsupportedApplicationType {
        visa_type: VisaType,
        application_type: ApplicationType,
    },
    #[error("{evaluator} requires applicant fields: {}", missing_fields.join(", "))]
    ValidationInput {
        evaluator: String,
        missing_fields: Vec<String>,
    },
}

impl EligibilityError {
    /// Whether the error originates from the caller's request rather than the deployment.
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, EligibilityError::Configuration(_))
    }
}

/// Malformed rule or catalog configuration. Raised at load time, never mid-evaluation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("rule '{rule_id}' is missing its {field}")]
    IncompleteRule { rule_id: String, field: &'static str },
    #[error("rule id '{0}' is registered more than once")]
    DuplicateRule(String),
    #[error("rule '{0}' is not registered")]
    UnknownRule(String),
    #[error("rule '{rule_id}' has invalid weight {weight}")]
    InvalidWeight { rule_id: String, weight: f64 },
    #[error("rule '{rule_id}' has invalid parameters: {reason}")]
    InvalidRuleParameters { rule_id: String, reason: String },
    #[error("rule set is invalid: {0}")]
    InvalidRuleSet(String),
    #[error("category weight table is invalid: {0}")]
    InvalidCategoryWeights(String),
    #[error("document catalog is invalid: {0}")]
    InvalidCatalog(String),
    #[error("eligibility tables are invalid: {0}")]
    InvalidTables(String),
    #[error("scoring configuration is invalid: {0}")]
    InvalidScoring(String),
    #[error("unable to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to parse configuration document '{name}': {source}")]
    Parse {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unable to parse institution table '{name}': {source}")]
    Csv {
        name: String,
        #[source]
        source: csv::Error,
    },
}

/// Failure inside a single rule action. Converted into a system issue by the rule engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleExecutionError {
    #[error("rule '{rule_id}' could not read {input}")]
    MissingInput { rule_id: String, input: String },
    #[error("rule '{rule_id}' failed: {reason}")]
    Failed { rule_id: String, reason: String },
    #[error("rule '{rule_id}' panicked: {message}")]
    Panicked { rule_id: String, message: String },
}

impl RuleExecutionError {
    pub fn rule_id(&self) -> &str {
        match self {
            RuleExecutionError::MissingInput { rule_id, .. }
            | RuleExecutionError::Failed { rule_id, .. }
            | RuleExecutionError::Panicked { rule_id, .. } => rule_id,
        }
    }
}
