use super::common::*;

use crate::eligibility::domain::{ApplicationType, Severity, VisaType};
use crate::eligibility::error::{ConfigurationError, RuleExecutionError};
use crate::eligibility::rules::{
    CategoryWeights, Rule, RuleCategory, RuleOutcome, RuleRegistry, RuleSet, RuleSetConfig,
};

fn constant_rule(
    id: &str,
    category: RuleCategory,
    priority: i32,
    weight: f64,
    score: f64,
) -> Rule {
    Rule::builder(id)
        .category(category)
        .priority(priority)
        .weight(weight)
        .condition(|_| true)
        .action(move |_| Ok(RuleOutcome::scored(score)))
        .build()
        .expect("rule builds")
}

fn rule_set(rules: Vec<Rule>) -> RuleSet {
    RuleSet::new("test-rules", CategoryWeights::default(), rules).expect("rule set builds")
}

#[test]
fn category_score_does_not_depend_on_execution_order() {
    let fixture = Fixture::professor();
    let forward = rule_set(vec![
        constant_rule("a", RuleCategory::Qualification, 10, 1.0, 100.0),
        constant_rule("b", RuleCategory::Qualification, 5, 3.0, 40.0),
    ]);
    let backward = rule_set(vec![
        constant_rule("a", RuleCategory::Qualification, 5, 1.0, 100.0),
        constant_rule("b", RuleCategory::Qualification, 10, 3.0, 40.0),
    ]);

    let first = forward.evaluate_category(RuleCategory::Qualification, &fixture.ctx());
    let second = backward.evaluate_category(RuleCategory::Qualification, &fixture.ctx());

    assert_eq!(first.score, 55);
    assert_eq!(first.score, second.score);
    assert_eq!(first.applied[0].rule_id, "a");
    assert_eq!(second.applied[0].rule_id, "b");
}

#[test]
fn panicking_rule_becomes_a_system_issue() {
    let fixture = Fixture::professor();
    let exploding = Rule::builder("exploding")
        .category(RuleCategory::Eligibility)
        .priority(50)
        .condition(|_| true)
        .action(|_| panic!("lookup table corrupted"))
        .build()
        .expect("rule builds");
    let set = rule_set(vec![
        exploding,
        constant_rule("steady", RuleCategory::Eligibility, 10, 1.0, 80.0),
    ]);

    let result = set.evaluate_category(RuleCategory::Eligibility, &fixture.ctx());

    assert_eq!(result.score, 80);
    assert_eq!(result.applied.len(), 1);
    let issue = result
        .issues
        .iter()
        .find(|issue| issue.severity == Severity::System)
        .expect("system issue recorded");
    assert_eq!(issue.rule_id.as_deref(), Some("exploding"));
    assert!(issue.message.contains("lookup table corrupted"));
}

#[test]
fn failing_rule_action_is_isolated() {
    let fixture = Fixture::professor();
    let failing = Rule::builder("needs_input")
        .category(RuleCategory::RiskAssessment)
        .condition(|_| true)
        .action(|_| {
            Err(RuleExecutionError::MissingInput {
                rule_id: "needs_input".to_string(),
                input: "stay.visa_expiry".to_string(),
            })
        })
        .build()
        .expect("rule builds");
    let set = rule_set(vec![
        failing,
        constant_rule("history", RuleCategory::RiskAssessment, 0, 1.0, 90.0),
    ]);

    let report = set.evaluate(&fixture.ctx());
    let risk = &report.categories[&RuleCategory::RiskAssessment];

    assert_eq!(risk.score, 90);
    assert!(report
        .issues
        .iter()
        .any(|issue| issue.severity == Severity::System
            && issue.rule_id.as_deref() == Some("needs_input")));
}

#[test]
fn category_without_applicable_rules_is_flagged_empty() {
    let fixture = Fixture::professor();
    let set = rule_set(vec![constant_rule(
        "only",
        RuleCategory::Eligibility,
        0,
        1.0,
        100.0,
    )]);

    let report = set.evaluate(&fixture.ctx());
    let qualification = &report.categories[&RuleCategory::Qualification];

    assert!(qualification.flagged_empty);
    assert_eq!(qualification.score, 0);
    assert!(!report.categories[&RuleCategory::Eligibility].flagged_empty);
    // Only eligibility scored, at weight 0.35 of 1.0.
    assert_eq!(report.overall_score, 35);
}

#[test]
fn out_of_range_rule_scores_are_clamped() {
    let fixture = Fixture::professor();
    let set = rule_set(vec![
        constant_rule("generous", RuleCategory::Eligibility, 0, 1.0, 250.0),
        constant_rule("harsh", RuleCategory::Eligibility, 0, 1.0, -40.0),
    ]);

    let result = set.evaluate_category(RuleCategory::Eligibility, &fixture.ctx());

    assert_eq!(result.score, 50);
    assert_eq!(result.applied[0].score, 100.0);
    assert_eq!(result.applied[1].score, 0.0);
}

#[test]
fn embedded_rules_score_a_strong_professor_at_the_top() {
    let fixture = Fixture::professor();
    let engine = engine();
    let report = engine.rule_registry().evaluate(&fixture.ctx());

    assert_eq!(report.rule_set_version, "rules-2025.3");
    for category in RuleCategory::ALL {
        assert_eq!(report.categories[&category].score, 100, "{category}");
    }
    assert_eq!(report.overall_score, 100);
}

#[test]
fn visa_scoped_rules_only_fire_for_their_visa() {
    let fixture = Fixture::professor();
    let engine = engine();
    let report = engine.rule_registry().evaluate(&fixture.ctx());
    let qualification = &report.categories[&RuleCategory::Qualification];
    let applied: Vec<&str> = qualification
        .applied
        .iter()
        .map(|rule| rule.rule_id.as_str())
        .collect();

    assert!(applied.contains(&"degree_level_professor"));
    assert!(!applied.contains(&"degree_level_general"));
    let eligibility = &report.categories[&RuleCategory::Eligibility];
    assert!(!eligibility
        .applied
        .iter()
        .any(|rule| rule.rule_id == "stay_window" || rule.rule_id == "source_visa_compatibility"));
}

#[test]
fn change_of_status_without_current_visa_records_a_system_issue() {
    let fixture = Fixture::new(
        VisaType::E1,
        ApplicationType::Change,
        professor_applicant(),
        &professor_documents(),
    );
    let engine = engine();
    let report = engine.rule_registry().evaluate(&fixture.ctx());

    assert!(report.issues.iter().any(|issue| {
        issue.severity == Severity::System
            && issue.rule_id.as_deref() == Some("source_visa_compatibility")
    }));
}

#[test]
fn registry_toggles_and_removes_rules() {
    let fixture = Fixture::professor();
    let engine = engine();
    let registry = engine.rule_registry();

    registry
        .toggle_rule("salary_floor", false)
        .expect("known rule toggles");
    let eligibility = registry.evaluate_category(RuleCategory::Eligibility, &fixture.ctx());
    assert!(eligibility
        .applied
        .iter()
        .all(|rule| rule.rule_id != "salary_floor"));
    let stats = registry.statistics();
    let salary = stats
        .iter()
        .find(|stat| stat.id == "salary_floor")
        .expect("disabled rule still listed");
    assert!(!salary.enabled);

    let removed = registry
        .remove_rule("salary_floor")
        .expect("known rule removes");
    assert_eq!(removed.id(), "salary_floor");
    assert!(registry
        .statistics()
        .iter()
        .all(|stat| stat.id != "salary_floor"));

    match registry.remove_rule("salary_floor") {
        Err(ConfigurationError::UnknownRule(id)) => assert_eq!(id, "salary_floor"),
        other => panic!("expected unknown rule, got {other:?}"),
    }
    match registry.toggle_rule("missing", true) {
        Err(ConfigurationError::UnknownRule(_)) => {}
        other => panic!("expected unknown rule, got {other:?}"),
    }
}

#[test]
fn registering_a_duplicate_id_is_rejected() {
    let engine = engine();
    let duplicate = constant_rule(
        "criminal_record",
        RuleCategory::RiskAssessment,
        0,
        1.0,
        100.0,
    );

    match engine.rule_registry().register_rule(duplicate) {
        Err(ConfigurationError::DuplicateRule(id)) => assert_eq!(id, "criminal_record"),
        other => panic!("expected duplicate rule, got {other:?}"),
    }
}

#[test]
fn registered_rules_join_the_next_evaluation() {
    let fixture = Fixture::professor();
    let registry = RuleRegistry::new(rule_set(vec![constant_rule(
        "base",
        RuleCategory::Eligibility,
        0,
        1.0,
        100.0,
    )]));

    registry
        .register_rule(constant_rule(
            "extra",
            RuleCategory::Eligibility,
            0,
            1.0,
            0.0,
        ))
        .expect("new id registers");

    let result = registry.evaluate_category(RuleCategory::Eligibility, &fixture.ctx());
    assert_eq!(result.score, 50);
    assert_eq!(result.applied.len(), 2);
}

#[test]
fn replacing_the_rule_set_keeps_statistics_for_surviving_ids() {
    let fixture = Fixture::professor();
    let engine = engine();
    let registry = engine.rule_registry();
    registry.evaluate(&fixture.ctx());
    let before = registry.snapshot();

    let raw = r#"{
        "version": "rules-next",
        "rules": [
            { "id": "institution_eligibility", "category": "eligibility",
              "check": { "kind": "institution_eligibility" } },
            { "id": "fresh_history", "category": "riskAssessment",
              "check": { "kind": "immigration_history" } }
        ]
    }"#;
    let config = RuleSetConfig::from_json("replacement", raw).expect("parses");
    let version = registry.replace(&config).expect("replacement builds");

    assert_eq!(version, "rules-next");
    assert_eq!(before.version(), "rules-2025.3");
    assert_eq!(registry.snapshot().version(), "rules-next");

    let stats = registry.statistics();
    assert_eq!(stats.len(), 2);
    let kept = stats
        .iter()
        .find(|stat| stat.id == "institution_eligibility")
        .expect("kept rule listed");
    assert_eq!(kept.executions, 1);
    assert!(kept.last_run.is_some());
    let fresh = stats
        .iter()
        .find(|stat| stat.id == "fresh_history")
        .expect("new rule listed");
    assert_eq!(fresh.executions, 0);
    assert!(fresh.last_run.is_none());
}

#[test]
fn invalid_replacement_leaves_the_current_snapshot() {
    let engine = engine();
    let registry = engine.rule_registry();
    let raw = r#"{
        "version": "rules-broken",
        "rules": [
            { "id": "late_filing", "category": "eligibility",
              "check": { "kind": "stay_window", "warning_days": -5 } }
        ]
    }"#;
    let config = RuleSetConfig::from_json("replacement", raw).expect("parses");

    match registry.replace(&config) {
        Err(ConfigurationError::InvalidRuleParameters { rule_id, .. }) => {
            assert_eq!(rule_id, "late_filing")
        }
        other => panic!("expected invalid parameters, got {other:?}"),
    }
    assert_eq!(registry.snapshot().version(), "rules-2025.3");
}

#[test]
fn builder_rejects_incomplete_or_weightless_rules() {
    match Rule::builder("no_action")
        .category(RuleCategory::Eligibility)
        .condition(|_| true)
        .build()
    {
        Err(ConfigurationError::IncompleteRule { field, .. }) => assert_eq!(field, "action"),
        other => panic!("expected incomplete rule, got {other:?}"),
    }

    match Rule::builder("weightless")
        .category(RuleCategory::Eligibility)
        .weight(0.0)
        .condition(|_| true)
        .action(|_| Ok(RuleOutcome::scored(100.0)))
        .build()
    {
        Err(ConfigurationError::InvalidWeight { rule_id, .. }) => assert_eq!(rule_id, "weightless"),
        other => panic!("expected invalid weight, got {other:?}"),
    }
}
