use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::super::domain::{ApplicationType, VisaType};
use super::super::error::ConfigurationError;
use super::builtin::RuleKind;
use super::definition::{Rule, RuleBuilder, RuleCategory};

/// Relative weight of each category in the overall rule-engine score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryWeights(BTreeMap<RuleCategory, f64>);

impl Default for CategoryWeights {
    fn default() -> Self {
        Self(BTreeMap::from([
            (RuleCategory::Eligibility, 0.35),
            (RuleCategory::Qualification, 0.25),
            (RuleCategory::DocumentCompleteness, 0.20),
            (RuleCategory::RiskAssessment, 0.20),
        ]))
    }
}

impl CategoryWeights {
    pub fn new(weights: BTreeMap<RuleCategory, f64>) -> Result<Self, ConfigurationError> {
        let weights = Self(weights);
        weights.validate()?;
        Ok(weights)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if let Some((category, weight)) = self
            .0
            .iter()
            .find(|(_, weight)| !weight.is_finite() || **weight < 0.0)
        {
            return Err(ConfigurationError::InvalidCategoryWeights(format!(
                "{category} weight {weight} must be finite and non-negative"
            )));
        }
        if self.total() <= 0.0 {
            return Err(ConfigurationError::InvalidCategoryWeights(
                "category weights must sum to a positive value".to_string(),
            ));
        }
        Ok(())
    }

    /// Weight for `category`, zero when the table does not list it.
    pub fn weight(&self, category: RuleCategory) -> f64 {
        self.0.get(&category).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }
}

/// One configured rule: metadata, scope, and the built-in check it runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDefinition {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<RuleCategory>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Restrict the rule to these visa types. Empty means every visa type.
    #[serde(default)]
    pub visa_types: Vec<VisaType>,
    /// Restrict the rule to these tracks. Empty means every track.
    #[serde(default)]
    pub application_types: Vec<ApplicationType>,
    #[serde(default)]
    pub check: Option<RuleKind>,
}

fn default_weight() -> f64 {
    1.0
}

fn default_enabled() -> bool {
    true
}

impl RuleDefinition {
    pub fn build(&self) -> Result<Rule, ConfigurationError> {
        let check = self
            .check
            .clone()
            .ok_or_else(|| ConfigurationError::IncompleteRule {
                rule_id: self.id.clone(),
                field: "action",
            })?;
        check.validate(&self.id)?;

        let visa_types = self.visa_types.clone();
        let application_types = self.application_types.clone();
        let scope_check = check.clone();
        let action_check = check;
        let rule_id = self.id.clone();

        RuleBuilder::new(self.id.clone())
            .name(self.name.clone().unwrap_or_else(|| self.id.clone()))
            .maybe_category(self.category)
            .priority(self.priority)
            .weight(self.weight)
            .enabled(self.enabled)
            .condition(move |ctx| {
                (visa_types.is_empty() || visa_types.contains(&ctx.visa_type))
                    && (application_types.is_empty()
                        || application_types.contains(&ctx.application_type))
                    && scope_check.applies(ctx)
            })
            .action(move |ctx| action_check.run(&rule_id, ctx))
            .build()
    }
}

/// Versioned rule-set snapshot loaded at startup or swapped in through the admin API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSetConfig {
    pub version: String,
    #[serde(default)]
    pub category_weights: CategoryWeights,
    pub rules: Vec<RuleDefinition>,
}

impl RuleSetConfig {
    pub fn from_json(name: &str, raw: &str) -> Result<Self, ConfigurationError> {
        let config: RuleSetConfig =
            serde_json::from_str(raw).map_err(|source| ConfigurationError::Parse {
                name: name.to_string(),
                source,
            })?;
        config.category_weights.validate()?;
        Ok(config)
    }

    pub fn build_rules(&self) -> Result<Vec<Rule>, ConfigurationError> {
        if self.version.trim().is_empty() {
            return Err(ConfigurationError::InvalidRuleSet(
                "rule set version must not be empty".to_string(),
            ));
        }
        self.category_weights.validate()?;

        let mut seen = BTreeSet::new();
        let mut rules = Vec::with_capacity(self.rules.len());
        for definition in &self.rules {
            if !seen.insert(definition.id.as_str()) {
                return Err(ConfigurationError::DuplicateRule(definition.id.clone()));
            }
            rules.push(definition.build()?);
        }
        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_sum_to_one() {
        let weights = CategoryWeights::default();
        assert!((weights.total() - 1.0).abs() < 1e-9);
        assert!((weights.weight(RuleCategory::Eligibility) - 0.35).abs() < 1e-9);
    }

    #[test]
    fn zero_weight_table_is_rejected() {
        let weights = BTreeMap::from([(RuleCategory::Eligibility, 0.0)]);
        match CategoryWeights::new(weights) {
            Err(ConfigurationError::InvalidCategoryWeights(_)) => {}
            other => panic!("expected invalid category weights, got {other:?}"),
        }
    }

    #[test]
    fn definition_without_check_is_incomplete() {
        let raw = r#"{
            "version": "test",
            "rules": [{ "id": "orphan", "category": "eligibility" }]
        }"#;
        let config = RuleSetConfig::from_json("rules", raw).expect("parses");
        match config.build_rules() {
            Err(ConfigurationError::IncompleteRule { rule_id, field }) => {
                assert_eq!(rule_id, "orphan");
                assert_eq!(field, "action");
            }
            other => panic!("expected incomplete rule, got {other:?}"),
        }
    }

    #[test]
    fn definition_without_category_is_incomplete() {
        let raw = r#"{
            "version": "test",
            "rules": [{ "id": "uncategorized", "check": { "kind": "criminal_record" } }]
        }"#;
        let config = RuleSetConfig::from_json("rules", raw).expect("parses");
        match config.build_rules() {
            Err(ConfigurationError::IncompleteRule { field, .. }) => assert_eq!(field, "category"),
            other => panic!("expected incomplete rule, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let raw = r#"{
            "version": "test",
            "rules": [
                { "id": "dup", "category": "riskAssessment", "check": { "kind": "criminal_record" } },
                { "id": "dup", "category": "riskAssessment", "check": { "kind": "immigration_history" } }
            ]
        }"#;
        let config = RuleSetConfig::from_json("rules", raw).expect("parses");
        match config.build_rules() {
            Err(ConfigurationError::DuplicateRule(id)) => assert_eq!(id, "dup"),
            other => panic!("expected duplicate rule, got {other:?}"),
        }
    }
}
