use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::super::context::EvaluationContext;
use super::super::domain::Issue;
use super::super::error::{ConfigurationError, RuleExecutionError};

/// Rule groups, each normalized to its own 0-100 score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleCategory {
    Eligibility,
    Qualification,
    DocumentCompleteness,
    RiskAssessment,
}

impl RuleCategory {
    pub const ALL: [RuleCategory; 4] = [
        RuleCategory::Eligibility,
        RuleCategory::Qualification,
        RuleCategory::DocumentCompleteness,
        RuleCategory::RiskAssessment,
    ];

    pub const fn id(self) -> &'static str {
        match self {
            RuleCategory::Eligibility => "eligibility",
            RuleCategory::Qualification => "qualification",
            RuleCategory::DocumentCompleteness => "documentCompleteness",
            RuleCategory::RiskAssessment => "riskAssessment",
        }
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

pub type RuleCondition = Arc<dyn for<'a> Fn(&EvaluationContext<'a>) -> bool + Send + Sync>;
pub type RuleAction = Arc<
    dyn for<'a> Fn(&EvaluationContext<'a>) -> Result<RuleOutcome, RuleExecutionError>
        + Send
        + Sync,
>;

/// Partial result returned by a rule action. `score` is clamped to `[0, 100]` by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleOutcome {
    pub score: f64,
    pub issues: Vec<Issue>,
    pub strengths: Vec<String>,
    pub recommendations: Vec<String>,
}

impl RuleOutcome {
    pub fn scored(score: f64) -> Self {
        Self {
            score,
            ..Self::default()
        }
    }

    pub fn with_issue(mut self, issue: Issue) -> Self {
        self.issues.push(issue);
        self
    }

    pub fn with_strength(mut self, strength: impl Into<String>) -> Self {
        self.strengths.push(strength.into());
        self
    }

    pub fn with_recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendations.push(recommendation.into());
        self
    }
}

/// Execution counters shared across snapshot swaps of the same rule id.
#[derive(Debug, Default)]
pub struct RuleStats {
    executions: AtomicU64,
    last_run_millis: AtomicI64,
}

impl RuleStats {
    pub(crate) fn record(&self, at: DateTime<Utc>) {
        self.executions.fetch_add(1, Ordering::Relaxed);
        self.last_run_millis
            .fetch_max(at.timestamp_millis(), Ordering::Relaxed);
    }

    pub fn executions(&self) -> u64 {
        self.executions.load(Ordering::Relaxed)
    }

    pub fn last_run(&self) -> Option<DateTime<Utc>> {
        match self.last_run_millis.load(Ordering::Relaxed) {
            0 => None,
            millis => DateTime::<Utc>::from_timestamp_millis(millis),
        }
    }
}

/// Registered rule. Immutable once built apart from its shared statistics.
#[derive(Clone)]
pub struct Rule {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) category: RuleCategory,
    pub(crate) priority: i32,
    pub(crate) weight: f64,
    pub(crate) enabled: bool,
    pub(crate) condition: RuleCondition,
    pub(crate) action: RuleAction,
    pub(crate) stats: Arc<RuleStats>,
}

impl Rule {
    pub fn builder(id: impl Into<String>) -> RuleBuilder {
        RuleBuilder::new(id)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> RuleCategory {
        self.category
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn stats(&self) -> &RuleStats {
        &self.stats
    }

    pub(crate) fn with_enabled(&self, enabled: bool) -> Self {
        let mut rule = self.clone();
        rule.enabled = enabled;
        rule
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("category", &self.category)
            .field("priority", &self.priority)
            .field("weight", &self.weight)
            .field("enabled", &self.enabled)
            .field("executions", &self.stats.executions())
            .finish()
    }
}

pub struct RuleBuilder {
    id: String,
    name: Option<String>,
    category: Option<RuleCategory>,
    priority: i32,
    weight: f64,
    enabled: bool,
    condition: Option<RuleCondition>,
    action: Option<RuleAction>,
}

impl RuleBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            category: None,
            priority: 0,
            weight: 1.0,
            enabled: true,
            condition: None,
            action: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn category(mut self, category: RuleCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn maybe_category(mut self, category: Option<RuleCategory>) -> Self {
        self.category = category;
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn condition<F>(mut self, condition: F) -> Self
    where
        F: for<'a> Fn(&EvaluationContext<'a>) -> bool + Send + Sync + 'static,
    {
        self.condition = Some(Arc::new(condition));
        self
    }

    pub fn action<F>(mut self, action: F) -> Self
    where
        F: for<'a> Fn(&EvaluationContext<'a>) -> Result<RuleOutcome, RuleExecutionError>
            + Send
            + Sync
            + 'static,
    {
        self.action = Some(Arc::new(action));
        self
    }

    pub fn build(self) -> Result<Rule, ConfigurationError> {
        let id = self.id.trim().to_string();
        if id.is_empty() {
            return Err(ConfigurationError::IncompleteRule {
                rule_id: self.id,
                field: "id",
            });
        }
        let category = self.category.ok_or_else(|| ConfigurationError::IncompleteRule {
            rule_id: id.clone(),
            field: "category",
        })?;
        let condition = self
            .condition
            .ok_or_else(|| ConfigurationError::IncompleteRule {
                rule_id: id.clone(),
                field: "condition",
            })?;
        let action = self.action.ok_or_else(|| ConfigurationError::IncompleteRule {
            rule_id: id.clone(),
            field: "action",
        })?;
        if !self.weight.is_finite() || self.weight <= 0.0 {
            return Err(ConfigurationError::InvalidWeight {
                rule_id: id,
                weight: self.weight,
            });
        }

        Ok(Rule {
            name: self.name.unwrap_or_else(|| id.clone()),
            id,
            category,
            priority: self.priority,
            weight: self.weight,
            enabled: self.enabled,
            condition,
            action,
            stats: Arc::new(RuleStats::default()),
        })
    }
}

/// Diagnostic record of one rule that fired inside a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedRule {
    pub rule_id: String,
    pub name: String,
    pub priority: i32,
    pub weight: f64,
    pub score: f64,
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResult {
    pub category: RuleCategory,
    pub score: u8,
    /// Set when no rule applied; the score is then 0 by construction.
    pub flagged_empty: bool,
    pub applied: Vec<AppliedRule>,
    pub issues: Vec<Issue>,
    pub strengths: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleStatistics {
    pub id: String,
    pub category: RuleCategory,
    pub enabled: bool,
    pub executions: u64,
    pub last_run: Option<DateTime<Utc>>,
}
