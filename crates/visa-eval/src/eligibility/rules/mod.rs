//! Category-weighted rule engine.
//!
//! Rules live in an immutable [`RuleSet`] snapshot. Evaluations clone the current snapshot
//! handle and run without holding any lock; administrative changes build a new snapshot and
//! swap it in. Each category score is weight-normalized, so the order in which rules run
//! only affects the order of recorded diagnostics.

mod builtin;
mod config;
mod definition;

use std::collections::{BTreeMap, BTreeSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::context::EvaluationContext;
use super::domain::{clamp_score, Issue, Severity};
use super::error::{ConfigurationError, RuleExecutionError};

pub(crate) use builtin::degree_points;
pub use builtin::RuleKind;
pub use config::{CategoryWeights, RuleDefinition, RuleSetConfig};
pub use definition::{
    AppliedRule, CategoryResult, Rule, RuleAction, RuleBuilder, RuleCategory, RuleCondition,
    RuleOutcome, RuleStatistics, RuleStats,
};

/// Immutable, priority-ordered collection of rules plus the category weight table.
#[derive(Debug, Clone)]
pub struct RuleSet {
    version: String,
    category_weights: CategoryWeights,
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(
        version: impl Into<String>,
        category_weights: CategoryWeights,
        mut rules: Vec<Rule>,
    ) -> Result<Self, ConfigurationError> {
        category_weights.validate()?;
        let mut seen = BTreeSet::new();
        for rule in &rules {
            if !seen.insert(rule.id.as_str()) {
                return Err(ConfigurationError::DuplicateRule(rule.id.clone()));
            }
        }
        rules.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));
        Ok(Self {
            version: version.into(),
            category_weights,
            rules,
        })
    }

    pub fn from_config(config: &RuleSetConfig) -> Result<Self, ConfigurationError> {
        let rules = config.build_rules()?;
        Self::new(config.version.clone(), config.category_weights.clone(), rules)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn category_weights(&self) -> &CategoryWeights {
        &self.category_weights
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn get(&self, rule_id: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.id == rule_id)
    }

    /// Run every enabled rule of `category` whose condition holds, in priority order.
    pub fn evaluate_category(
        &self,
        category: RuleCategory,
        ctx: &EvaluationContext<'_>,
    ) -> CategoryResult {
        let mut result = CategoryResult {
            category,
            score: 0,
            flagged_empty: false,
            applied: Vec::new(),
            issues: Vec::new(),
            strengths: Vec::new(),
            recommendations: Vec::new(),
        };
        let mut numerator = 0.0;
        let mut denominator = 0.0;

        for rule in self
            .rules
            .iter()
            .filter(|rule| rule.enabled && rule.category == category)
        {
            match run_rule(rule, ctx) {
                Ok(None) => {}
                Ok(Some(outcome)) => {
                    let score = outcome.score.clamp(0.0, 100.0);
                    let score = if score.is_finite() { score } else { 0.0 };
                    numerator += score * rule.weight;
                    denominator += 100.0 * rule.weight;
                    result.applied.push(AppliedRule {
                        rule_id: rule.id.clone(),
                        name: rule.name.clone(),
                        priority: rule.priority,
                        weight: rule.weight,
                        score,
                        contribution: score * rule.weight,
                    });
                    result
                        .issues
                        .extend(outcome.issues.into_iter().map(|issue| match issue.rule_id {
                            Some(_) => issue,
                            None => issue.from_rule(rule.id.clone()),
                        }));
                    result.strengths.extend(outcome.strengths);
                    result.recommendations.extend(outcome.recommendations);
                }
                Err(error) => {
                    warn!(rule_id = error.rule_id(), %error, "rule failed, continuing");
                    result.issues.push(
                        Issue::new(Severity::System, error.to_string()).from_rule(error.rule_id()),
                    );
                }
            }
        }

        if denominator > 0.0 {
            result.score = clamp_score(numerator / denominator * 100.0);
        } else {
            result.flagged_empty = true;
            result.issues.push(Issue::info(format!(
                "no {category} rules applied to this application"
            )));
        }

        debug!(
            category = %category,
            score = result.score,
            applied = result.applied.len(),
            "rule category evaluated"
        );
        result
    }

    /// Evaluate every category and blend them with the category weight table.
    pub fn evaluate(&self, ctx: &EvaluationContext<'_>) -> RuleEngineReport {
        let mut report = RuleEngineReport {
            rule_set_version: self.version.clone(),
            overall_score: 0,
            categories: BTreeMap::new(),
            issues: Vec::new(),
            strengths: Vec::new(),
            recommendations: Vec::new(),
        };

        let mut weighted = 0.0;
        for category in RuleCategory::ALL {
            let result = self.evaluate_category(category, ctx);
            weighted += self.category_weights.weight(category) * f64::from(result.score);
            report.issues.extend(result.issues.iter().cloned());
            report.strengths.extend(result.strengths.iter().cloned());
            report
                .recommendations
                .extend(result.recommendations.iter().cloned());
            report.categories.insert(category, result);
        }

        let total = self.category_weights.total();
        report.overall_score = if total > 0.0 {
            clamp_score(weighted / total)
        } else {
            0
        };
        report
    }

    pub fn statistics(&self) -> Vec<RuleStatistics> {
        self.rules
            .iter()
            .map(|rule| RuleStatistics {
                id: rule.id.clone(),
                category: rule.category,
                enabled: rule.enabled,
                executions: rule.stats.executions(),
                last_run: rule.stats.last_run(),
            })
            .collect()
    }
}

fn run_rule(
    rule: &Rule,
    ctx: &EvaluationContext<'_>,
) -> Result<Option<RuleOutcome>, RuleExecutionError> {
    let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
        if !(rule.condition)(ctx) {
            return Ok(None);
        }
        rule.stats.record(Utc::now());
        (rule.action)(ctx).map(Some)
    }));

    match attempt {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|message| message.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(RuleExecutionError::Panicked {
                rule_id: rule.id.clone(),
                message,
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleEngineReport {
    pub rule_set_version: String,
    pub overall_score: u8,
    pub categories: BTreeMap<RuleCategory, CategoryResult>,
    pub issues: Vec<Issue>,
    pub strengths: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Holder of the current rule snapshot. Mutations swap in a rebuilt snapshot.
#[derive(Debug)]
pub struct RuleRegistry {
    current: RwLock<Arc<RuleSet>>,
}

impl RuleRegistry {
    pub fn new(rule_set: RuleSet) -> Self {
        Self {
            current: RwLock::new(Arc::new(rule_set)),
        }
    }

    pub fn from_config(config: &RuleSetConfig) -> Result<Self, ConfigurationError> {
        Ok(Self::new(RuleSet::from_config(config)?))
    }

    /// Current snapshot. A poisoned lock still guards a complete `Arc`, so it is recovered.
    pub fn snapshot(&self) -> Arc<RuleSet> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    fn swap<F>(&self, change: F) -> Result<Arc<RuleSet>, ConfigurationError>
    where
        F: FnOnce(&RuleSet) -> Result<RuleSet, ConfigurationError>,
    {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let next = Arc::new(change(&guard)?);
        *guard = Arc::clone(&next);
        Ok(next)
    }

    pub fn register_rule(&self, rule: Rule) -> Result<(), ConfigurationError> {
        let rule_id = rule.id.clone();
        let next = self.swap(|current| {
            if current.get(&rule.id).is_some() {
                return Err(ConfigurationError::DuplicateRule(rule.id.clone()));
            }
            let mut rules = current.rules.clone();
            rules.push(rule);
            RuleSet::new(current.version.clone(), current.category_weights.clone(), rules)
        })?;
        info!(rule_id = %rule_id, rules = next.rules.len(), "rule registered");
        Ok(())
    }

    pub fn remove_rule(&self, rule_id: &str) -> Result<Rule, ConfigurationError> {
        let mut removed = None;
        self.swap(|current| {
            let mut rules = current.rules.clone();
            let index = rules
                .iter()
                .position(|rule| rule.id == rule_id)
                .ok_or_else(|| ConfigurationError::UnknownRule(rule_id.to_string()))?;
            removed = Some(rules.remove(index));
            RuleSet::new(current.version.clone(), current.category_weights.clone(), rules)
        })?;
        info!(rule_id, "rule removed");
        removed.ok_or_else(|| ConfigurationError::UnknownRule(rule_id.to_string()))
    }

    pub fn toggle_rule(&self, rule_id: &str, enabled: bool) -> Result<(), ConfigurationError> {
        self.swap(|current| {
            if current.get(rule_id).is_none() {
                return Err(ConfigurationError::UnknownRule(rule_id.to_string()));
            }
            let rules = current
                .rules
                .iter()
                .map(|rule| {
                    if rule.id == rule_id {
                        rule.with_enabled(enabled)
                    } else {
                        rule.clone()
                    }
                })
                .collect();
            RuleSet::new(current.version.clone(), current.category_weights.clone(), rules)
        })?;
        info!(rule_id, enabled, "rule toggled");
        Ok(())
    }

    /// Replace the whole rule set, carrying statistics over for rule ids that survive.
    pub fn replace(&self, config: &RuleSetConfig) -> Result<String, ConfigurationError> {
        let next = self.swap(|current| {
            let mut rules = config.build_rules()?;
            for rule in &mut rules {
                if let Some(existing) = current.get(&rule.id) {
                    rule.stats = Arc::clone(&existing.stats);
                }
            }
            RuleSet::new(config.version.clone(), config.category_weights.clone(), rules)
        })?;
        info!(version = %next.version, rules = next.rules.len(), "rule set replaced");
        Ok(next.version.clone())
    }

    pub fn evaluate_category(
        &self,
        category: RuleCategory,
        ctx: &EvaluationContext<'_>,
    ) -> CategoryResult {
        self.snapshot().evaluate_category(category, ctx)
    }

    pub fn evaluate(&self, ctx: &EvaluationContext<'_>) -> RuleEngineReport {
        self.snapshot().evaluate(ctx)
    }

    pub fn statistics(&self) -> Vec<RuleStatistics> {
        self.snapshot().statistics()
    }
}
