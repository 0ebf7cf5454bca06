use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::super::domain::{
    clamp_score, ApplicantData, ApplicationType, DocumentKind, SubmittedDocument,
    SubmittedDocuments, VisaType,
};
use super::super::error::EligibilityError;
use super::catalog::{DocumentCatalog, DocumentRequirementSet, ValidationRule};
use super::conditions::ConditionKey;

/// Why a submitted document failed its per-type validation rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentDefect {
    MissingApostille,
    MissingTranslation,
    MissingIssueDate,
    IssuedInFuture { issued: NaiveDate },
    Stale { age_days: i64, max_age_days: u32 },
    Expired { valid_until: NaiveDate },
    SalaryBelowMinimum { declared: Option<u64>, minimum: u64 },
    HoursBelowMinimum { declared: Option<f32>, minimum: f32 },
    MissingCertification { certification: String },
}

impl fmt::Display for DocumentDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentDefect::MissingApostille => write!(f, "apostille certification required"),
            DocumentDefect::MissingTranslation => write!(f, "certified translation required"),
            DocumentDefect::MissingIssueDate => write!(f, "issue date not declared"),
            DocumentDefect::IssuedInFuture { issued } => {
                write!(f, "issue date {issued} is in the future")
            }
            DocumentDefect::Stale {
                age_days,
                max_age_days,
            } => write!(
                f,
                "issued {age_days} days ago, exceeds the {max_age_days} day limit"
            ),
            DocumentDefect::Expired { valid_until } => write!(f, "expired on {valid_until}"),
            DocumentDefect::SalaryBelowMinimum { declared, minimum } => match declared {
                Some(amount) => write!(f, "annual salary {amount} below minimum {minimum}"),
                None => write!(f, "annual salary not declared (minimum {minimum})"),
            },
            DocumentDefect::HoursBelowMinimum { declared, minimum } => match declared {
                Some(hours) => write!(f, "{hours:.1} weekly hours below minimum {minimum:.1}"),
                None => write!(f, "weekly hours not declared (minimum {minimum:.1})"),
            },
            DocumentDefect::MissingCertification { certification } => {
                write!(f, "missing {certification} certification")
            }
        }
    }
}

/// Where a required slot comes from in the resolved requirement set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequirementSource {
    Required,
    Conditional { condition: ConditionKey },
    Alternative { group: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingDocument {
    /// Document id, or the alternative group id when no bundle was submitted.
    pub id: String,
    pub documents: Vec<DocumentKind>,
    pub source: RequirementSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidDocument {
    pub document: DocumentKind,
    pub defects: Vec<DocumentDefect>,
    pub reasons: Vec<String>,
    /// Optional documents are reported but not penalized.
    pub optional: bool,
}

/// Result of checking submitted documents against the resolved requirement set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentValidation {
    pub valid: bool,
    pub score: u8,
    pub completeness: f64,
    pub required_slots: usize,
    pub submitted_slots: usize,
    pub missing: Vec<MissingDocument>,
    pub invalid: Vec<InvalidDocument>,
    pub bonus: Vec<DocumentKind>,
    pub requirements: DocumentRequirementSet,
}

impl DocumentValidation {
    pub fn missing_ids(&self) -> Vec<&str> {
        self.missing.iter().map(|missing| missing.id.as_str()).collect()
    }

    pub fn penalized_invalid_count(&self) -> usize {
        self.invalid.iter().filter(|invalid| !invalid.optional).count()
    }
}

/// Check one declared document against its validation rule.
pub fn check_document(
    rule: &ValidationRule,
    document: &SubmittedDocument,
    today: NaiveDate,
) -> Vec<DocumentDefect> {
    let mut defects = Vec::new();

    if rule.apostille_required && document.apostilled != Some(true) {
        defects.push(DocumentDefect::MissingApostille);
    }
    if rule.translation_required && document.translated != Some(true) {
        defects.push(DocumentDefect::MissingTranslation);
    }

    match (document.issued_date, rule.max_age_days) {
        (Some(issued), _) if issued > today => {
            defects.push(DocumentDefect::IssuedInFuture { issued });
        }
        (Some(issued), Some(max_age_days)) => {
            let age_days = (today - issued).num_days();
            if age_days > i64::from(max_age_days) {
                defects.push(DocumentDefect::Stale {
                    age_days,
                    max_age_days,
                });
            }
        }
        (None, Some(_)) => defects.push(DocumentDefect::MissingIssueDate),
        (_, None) => {}
    }

    if let Some(valid_until) = document.valid_until {
        if valid_until < today {
            defects.push(DocumentDefect::Expired { valid_until });
        }
    }

    if let Some(minimum) = rule.min_annual_salary {
        if document.annual_salary.map(|amount| amount < minimum).unwrap_or(true) {
            defects.push(DocumentDefect::SalaryBelowMinimum {
                declared: document.annual_salary,
                minimum,
            });
        }
    }

    if let Some(minimum) = rule.min_weekly_hours {
        if document.weekly_hours.map(|hours| hours < minimum).unwrap_or(true) {
            defects.push(DocumentDefect::HoursBelowMinimum {
                declared: document.weekly_hours,
                minimum,
            });
        }
    }

    for certification in &rule.required_certifications {
        let held = document
            .certifications
            .iter()
            .any(|held| held.trim().eq_ignore_ascii_case(certification));
        if !held {
            defects.push(DocumentDefect::MissingCertification {
                certification: certification.clone(),
            });
        }
    }

    defects
}

/// Resolves requirement sets and validates submissions against them.
#[derive(Debug, Clone)]
pub struct DocumentValidator {
    catalog: Arc<DocumentCatalog>,
}

struct Tally {
    penalties: f64,
    required_slots: usize,
    submitted_slots: usize,
    missing: Vec<MissingDocument>,
    invalid: Vec<InvalidDocument>,
}

impl DocumentValidator {
    pub fn new(catalog: Arc<DocumentCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &DocumentCatalog {
        &self.catalog
    }

    pub fn requirements(
        &self,
        visa_type: VisaType,
        application_type: ApplicationType,
        applicant: &ApplicantData,
    ) -> Result<DocumentRequirementSet, EligibilityError> {
        self.catalog
            .requirements(visa_type, application_type, applicant)
    }

    pub fn validate(
        &self,
        visa_type: VisaType,
        application_type: ApplicationType,
        submitted: &SubmittedDocuments,
        applicant: &ApplicantData,
        today: NaiveDate,
    ) -> Result<DocumentValidation, EligibilityError> {
        let requirements = self.requirements(visa_type, application_type, applicant)?;
        let scoring = &self.catalog.scoring;

        let mut tally = Tally {
            penalties: 0.0,
            required_slots: 0,
            submitted_slots: 0,
            missing: Vec::new(),
            invalid: Vec::new(),
        };

        let mut slots: Vec<(DocumentKind, RequirementSource)> = requirements
            .always_required()
            .into_iter()
            .map(|kind| (kind, RequirementSource::Required))
            .collect();
        for (condition, documents) in &requirements.conditional {
            if !condition.holds(applicant) {
                continue;
            }
            for kind in documents {
                if !slots.iter().any(|(existing, _)| existing == kind) {
                    slots.push((
                        *kind,
                        RequirementSource::Conditional {
                            condition: *condition,
                        },
                    ));
                }
            }
        }

        let slot_kinds: BTreeSet<DocumentKind> = slots.iter().map(|(kind, _)| *kind).collect();
        for (kind, source) in slots {
            tally.required_slots += 1;
            match submitted.get(&kind) {
                None => {
                    tally.penalties += scoring.missing_penalty;
                    tally.missing.push(MissingDocument {
                        id: kind.id().to_string(),
                        documents: vec![kind],
                        source,
                    });
                }
                Some(document) => {
                    tally.submitted_slots += 1;
                    let defects = self.defects_for(kind, document, today);
                    if !defects.is_empty() {
                        tally.penalties += scoring.invalid_penalty;
                        tally.invalid.push(invalid_entry(kind, defects, false));
                    }
                }
            }
        }

        for alternative in &requirements.alternatives {
            tally.required_slots += 1;
            let complete: Vec<&Vec<DocumentKind>> = alternative
                .options
                .iter()
                .filter(|option| option.iter().all(|kind| submitted.contains_key(kind)))
                .collect();

            if complete.is_empty() {
                tally.penalties += scoring.missing_penalty;
                tally.missing.push(MissingDocument {
                    id: alternative.id.clone(),
                    documents: alternative.options.first().cloned().unwrap_or_default(),
                    source: RequirementSource::Alternative {
                        group: alternative.id.clone(),
                    },
                });
                continue;
            }

            tally.submitted_slots += 1;
            // Prefer the first bundle with the fewest defective documents.
            let chosen = complete
                .iter()
                .map(|option| {
                    let defective: Vec<InvalidDocument> = option
                        .iter()
                        .filter_map(|kind| {
                            let document = submitted.get(kind)?;
                            let defects = self.defects_for(*kind, document, today);
                            (!defects.is_empty()).then(|| invalid_entry(*kind, defects, false))
                        })
                        .collect();
                    defective
                })
                .min_by_key(|defective| defective.len())
                .unwrap_or_default();

            for entry in chosen {
                if tally
                    .invalid
                    .iter()
                    .any(|existing| existing.document == entry.document)
                {
                    continue;
                }
                tally.penalties += scoring.invalid_penalty;
                tally.invalid.push(entry);
            }
        }

        let mut bonus_points = 0.0;
        let mut bonus = Vec::new();
        for kind in &requirements.optional {
            if slot_kinds.contains(kind) {
                continue;
            }
            let Some(document) = submitted.get(kind) else {
                continue;
            };
            let defects = self.defects_for(*kind, document, today);
            if defects.is_empty() {
                bonus_points += scoring.optional_bonus;
                bonus.push(*kind);
            } else {
                tally.invalid.push(invalid_entry(*kind, defects, true));
            }
        }

        let score = clamp_score(scoring.starting_score - tally.penalties + bonus_points);
        let completeness = if tally.required_slots == 0 {
            100.0
        } else {
            tally.submitted_slots as f64 / tally.required_slots as f64 * 100.0
        };

        debug!(
            visa_type = %visa_type,
            application_type = %application_type,
            score,
            completeness,
            missing = tally.missing.len(),
            invalid = tally.invalid.len(),
            "document validation complete"
        );

        Ok(DocumentValidation {
            valid: tally.missing.is_empty(),
            score,
            completeness,
            required_slots: tally.required_slots,
            submitted_slots: tally.submitted_slots,
            missing: tally.missing,
            invalid: tally.invalid,
            bonus,
            requirements,
        })
    }

    fn defects_for(
        &self,
        kind: DocumentKind,
        document: &SubmittedDocument,
        today: NaiveDate,
    ) -> Vec<DocumentDefect> {
        match self.catalog.validation_rule(kind) {
            Some(rule) => check_document(rule, document, today),
            None => check_document(&ValidationRule::default(), document, today),
        }
    }
}

fn invalid_entry(
    document: DocumentKind,
    defects: Vec<DocumentDefect>,
    optional: bool,
) -> InvalidDocument {
    let reasons = defects.iter().map(ToString::to_string).collect();
    InvalidDocument {
        document,
        defects,
        reasons,
        optional,
    }
}
