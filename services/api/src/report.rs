use crate::infra::build_engine;
use chrono::{Local, NaiveDate};
use clap::Args;
use std::fs;
use std::path::PathBuf;
use visa_eval::config::AppConfig;
use visa_eval::eligibility::{
    ApplicantData, ApplicationType, DocumentRequirementSet, EligibilityDecision,
    EvaluationRequest, Severity,
};
use visa_eval::error::AppError;

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// JSON file holding one evaluation request
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Evaluation date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Print the full decision as JSON instead of the summary report
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct RequirementsArgs {
    /// Visa category code, e.g. E-1
    #[arg(long)]
    pub(crate) visa_type: String,
    /// NEW, EXTENSION, CHANGE, or REENTRY
    #[arg(long)]
    pub(crate) application_type: ApplicationType,
    /// ISO alpha-3 nationality used for nationality-specific documents
    #[arg(long)]
    pub(crate) nationality: Option<String>,
    /// Number of accompanying dependents
    #[arg(long, default_value_t = 0)]
    pub(crate) dependents: u8,
    /// Print the requirement set as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let EvaluateArgs { input, today, json } = args;

    let config = AppConfig::load()?;
    let engine = build_engine(&config.evaluation)?;
    let raw = fs::read_to_string(&input)?;
    let request: EvaluationRequest = serde_json::from_str(&raw)?;
    let today = today.unwrap_or_else(|| Local::now().date_naive());

    let decision = engine.evaluate(&request, today)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&decision)?);
    } else {
        for line in decision_report(&decision, today) {
            println!("{line}");
        }
    }
    Ok(())
}

pub(crate) fn run_requirements(args: RequirementsArgs) -> Result<(), AppError> {
    let RequirementsArgs {
        visa_type,
        application_type,
        nationality,
        dependents,
        json,
    } = args;

    let config = AppConfig::load()?;
    let engine = build_engine(&config.evaluation)?;
    let mut applicant = ApplicantData::default();
    applicant.administrative.nationality = nationality;
    applicant.evaluation.dependents = dependents;

    let requirements = engine.requirements(&visa_type, application_type, &applicant)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&requirements)?);
    } else {
        for line in requirements_report(&requirements) {
            println!("{line}");
        }
    }
    Ok(())
}

pub(crate) fn decision_report(decision: &EligibilityDecision, today: NaiveDate) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Eligibility decision for {} {} (evaluated {today})",
            decision.visa_type, decision.application_type
        ),
        format!(
            "- Score {} | status {} | {} | confidence {}",
            decision.score,
            decision.status,
            decision.recommendation,
            decision.confidence.label()
        ),
        format!(
            "- Track inferred from {:?}: {}",
            decision.classification.signal, decision.classification.reason
        ),
    ];

    if decision.is_disqualified() {
        lines.push("- Disqualified:".to_string());
        for disqualifier in &decision.track.disqualifiers {
            lines.push(format!("    - {disqualifier}"));
        }
    } else {
        lines.push(format!(
            "- Track score {} ({}) | rule score {}",
            decision.track.score, decision.track.evaluator, decision.rule_score
        ));
        for component in &decision.track.components {
            lines.push(format!(
                "    - {:?} x{:.2}: {:.0} ({})",
                component.factor, component.weight, component.score, component.notes
            ));
        }
    }

    lines.push("Rule categories:".to_string());
    for (category, result) in &decision.breakdown {
        let suffix = if result.flagged_empty {
            " (no applicable rules)"
        } else {
            ""
        };
        lines.push(format!("  - {category}: {}{suffix}", result.score));
    }
    for adjustment in &decision.adjustments {
        lines.push(format!("  {:+} {}", adjustment.points, adjustment.reason));
    }

    let documents = &decision.documents;
    lines.push(format!(
        "Documents: score {} | {:.0}% complete | {} missing | {} need correction",
        documents.score,
        documents.completeness,
        documents.missing.len(),
        documents.invalid.iter().filter(|invalid| !invalid.optional).count()
    ));

    let complexity = &decision.complexity;
    lines.push(format!(
        "Complexity: {} | risk {} | {}-{} days | {}-{} {} | support {}",
        complexity.tier,
        complexity.risk,
        complexity.timeline.min_days,
        complexity.timeline.max_days,
        complexity.fees.min,
        complexity.fees.max,
        complexity.fees.currency,
        complexity.support
    ));
    for factor in &complexity.factors {
        lines.push(format!("  - {:?}: {}", factor.category, factor.description));
    }

    let notable: Vec<_> = decision
        .issues
        .iter()
        .filter(|issue| issue.severity >= Severity::Warning)
        .collect();
    if !notable.is_empty() {
        lines.push("Issues:".to_string());
        for issue in notable {
            lines.push(format!("  - [{:?}] {}", issue.severity, issue.message));
        }
    }
    if !decision.strengths.is_empty() {
        lines.push("Strengths:".to_string());
        lines.extend(decision.strengths.iter().map(|item| format!("  - {item}")));
    }
    lines.push("Next steps:".to_string());
    lines.extend(
        decision
            .next_steps
            .iter()
            .enumerate()
            .map(|(index, step)| format!("  {}. {step}", index + 1)),
    );
    lines.push(format!(
        "Configuration: documents {} | eligibility {} | rules {} | scoring {}",
        decision.config_versions.documents,
        decision.config_versions.eligibility,
        decision.config_versions.rules,
        decision.config_versions.scoring
    ));
    lines
}

pub(crate) fn requirements_report(requirements: &DocumentRequirementSet) -> Vec<String> {
    let mut lines = Vec::new();
    if let (Some(visa_type), Some(application_type)) =
        (requirements.visa_type, requirements.application_type)
    {
        lines.push(format!("Document requirements for {visa_type} {application_type}"));
    }
    let mut section = |title: &str, documents: Vec<&str>| {
        if !documents.is_empty() {
            lines.push(format!("{title}:"));
            lines.extend(documents.into_iter().map(|id| format!("  - {id}")));
        }
    };
    section(
        "Common",
        requirements.common.iter().map(|kind| kind.id()).collect(),
    );
    section(
        "Required",
        requirements.required.iter().map(|kind| kind.id()).collect(),
    );
    section(
        "Optional",
        requirements.optional.iter().map(|kind| kind.id()).collect(),
    );

    for (condition, documents) in &requirements.conditional {
        let ids: Vec<&str> = documents.iter().map(|kind| kind.id()).collect();
        lines.push(format!("When {condition:?}: {}", ids.join(", ")));
    }
    for alternative in &requirements.alternatives {
        let options: Vec<String> = alternative
            .options
            .iter()
            .map(|option| {
                let ids: Vec<&str> = option.iter().map(|kind| kind.id()).collect();
                ids.join(" + ")
            })
            .collect();
        lines.push(format!("One of ({}): {}", alternative.id, options.join(" | ")));
    }
    for note in &requirements.extensions {
        lines.push(format!("Note: {note}"));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use visa_eval::eligibility::EligibilityEngine;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date")
    }

    fn instructor_request() -> EvaluationRequest {
        serde_json::from_value(serde_json::json!({
            "visaType": "E-2",
            "applicantData": {
                "evaluation": {
                    "education": { "highestDegree": "bachelor", "foreignDegree": true },
                    "institution": {
                        "name": "Maple Language Academy",
                        "institutionType": "language_academy"
                    },
                    "position": {
                        "title": "English Instructor",
                        "level": "instructor",
                        "activity": "language_instruction"
                    },
                    "contract": { "durationMonths": 12, "annualSalary": 28000000, "weeklyHours": 30.0 }
                },
                "administrative": { "nationality": "NZL" }
            }
        }))
        .expect("request parses")
    }

    #[test]
    fn decision_report_summarises_every_stage() {
        let engine = EligibilityEngine::with_defaults().expect("engine builds");
        let decision = engine
            .evaluate(&instructor_request(), today())
            .expect("evaluates");

        let report = decision_report(&decision, today());

        assert!(report[0].starts_with("Eligibility decision for E-2 NEW"));
        assert!(report.iter().any(|line| line.starts_with("Documents: score")));
        assert!(report.iter().any(|line| line.starts_with("Complexity: ")));
        assert!(report.iter().any(|line| line == "Next steps:"));
        assert!(report
            .last()
            .is_some_and(|line| line.contains("rules-2025.3")));
    }

    #[test]
    fn requirements_report_lists_alternatives_and_notes() {
        let engine = EligibilityEngine::with_defaults().expect("engine builds");
        let mut applicant = ApplicantData::default();
        applicant.administrative.nationality = Some("PHL".to_string());

        let requirements = engine
            .requirements("E-1", ApplicationType::New, &applicant)
            .expect("resolves");
        let report = requirements_report(&requirements);

        assert_eq!(report[0], "Document requirements for E-1 NEW");
        assert!(report.iter().any(|line| line == "  - employment_contract"));
        assert!(report.iter().any(|line| line.starts_with("One of (degree_proof)")));
        assert!(report
            .iter()
            .any(|line| line.starts_with("Note:") && line.contains("tuberculosis_test")));
    }
}
