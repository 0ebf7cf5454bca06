use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::super::domain::{ActivityKind, ApplicantData, ApplicationType, DocumentKind, VisaType};
use super::super::error::{ConfigurationError, EligibilityError};
use super::conditions::ConditionKey;

/// Penalty and bonus constants applied by the document validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentScoring {
    pub starting_score: f64,
    pub missing_penalty: f64,
    pub invalid_penalty: f64,
    pub optional_bonus: f64,
}

impl Default for DocumentScoring {
    fn default() -> Self {
        Self {
            starting_score: 100.0,
            missing_penalty: 15.0,
            invalid_penalty: 8.0,
            optional_bonus: 2.0,
        }
    }
}

/// Interchangeable document bundles that satisfy one logical requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternativeRequirement {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub options: Vec<Vec<DocumentKind>>,
}

/// Requirement template for one (visa type, application type) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackRequirements {
    pub required: Vec<DocumentKind>,
    pub optional: Vec<DocumentKind>,
    pub conditional: BTreeMap<ConditionKey, Vec<DocumentKind>>,
    pub alternatives: Vec<AlternativeRequirement>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisaDocumentEntry {
    pub title: String,
    pub tracks: BTreeMap<ApplicationType, TrackRequirements>,
}

/// Declared-metadata constraints for one document type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationRule {
    pub apostille_required: bool,
    pub translation_required: bool,
    pub max_age_days: Option<u32>,
    pub min_annual_salary: Option<u64>,
    pub min_weekly_hours: Option<f32>,
    pub required_certifications: Vec<String>,
}

/// Extra documents for applicants whose nationality is outside the exemption set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NationalityExtension {
    pub visa_types: Vec<VisaType>,
    pub exempt_nationalities: BTreeSet<String>,
    pub documents: Vec<DocumentKind>,
}

impl NationalityExtension {
    fn applies(&self, visa_type: VisaType, nationality: Option<&str>) -> bool {
        if !self.visa_types.contains(&visa_type) {
            return false;
        }

        match nationality {
            Some(code) => !self
                .exempt_nationalities
                .iter()
                .any(|exempt| exempt.eq_ignore_ascii_case(code.trim())),
            None => true,
        }
    }
}

/// Extra documents for particular visa and activity combinations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldExtension {
    pub visa_type: VisaType,
    pub activity: ActivityKind,
    pub documents: Vec<DocumentKind>,
}

/// Static mapping from (visa type, application type) to document requirements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentCatalog {
    pub version: String,
    #[serde(default)]
    pub scoring: DocumentScoring,
    #[serde(default)]
    pub common_documents: Vec<DocumentKind>,
    pub visas: BTreeMap<VisaType, VisaDocumentEntry>,
    #[serde(default)]
    pub validation_rules: BTreeMap<DocumentKind, ValidationRule>,
    #[serde(default)]
    pub nationality_extension: Option<NationalityExtension>,
    #[serde(default)]
    pub field_extensions: Vec<FieldExtension>,
}

/// Fully resolved requirement set for one applicant. Every list is always present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRequirementSet {
    pub visa_type: Option<VisaType>,
    pub application_type: Option<ApplicationType>,
    pub common: Vec<DocumentKind>,
    pub required: Vec<DocumentKind>,
    pub optional: Vec<DocumentKind>,
    pub conditional: BTreeMap<ConditionKey, Vec<DocumentKind>>,
    pub alternatives: Vec<AlternativeRequirement>,
    /// Human readable notes about applicant-specific extensions that were applied.
    pub extensions: Vec<String>,
}

impl DocumentRequirementSet {
    /// Common and required documents in resolution order, without duplicates.
    pub fn always_required(&self) -> Vec<DocumentKind> {
        let mut seen = BTreeSet::new();
        self.common
            .iter()
            .chain(self.required.iter())
            .copied()
            .filter(|kind| seen.insert(*kind))
            .collect()
    }

    fn contains(&self, kind: DocumentKind) -> bool {
        self.common.contains(&kind) || self.required.contains(&kind)
    }

    fn push_required(&mut self, kind: DocumentKind) -> bool {
        if self.contains(kind) {
            return false;
        }
        self.optional.retain(|optional| *optional != kind);
        self.required.push(kind);
        true
    }
}

impl DocumentCatalog {
    pub fn from_json(name: &str, raw: &str) -> Result<Self, ConfigurationError> {
        let catalog: DocumentCatalog =
            serde_json::from_str(raw).map_err(|source| ConfigurationError::Parse {
                name: name.to_string(),
                source,
            })?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Structural checks run once when the catalog is loaded.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.version.trim().is_empty() {
            return Err(ConfigurationError::InvalidCatalog(
                "catalog version must not be empty".to_string(),
            ));
        }

        let scoring = &self.scoring;
        let constants = [
            scoring.starting_score,
            scoring.missing_penalty,
            scoring.invalid_penalty,
            scoring.optional_bonus,
        ];
        if constants
            .iter()
            .any(|value| !value.is_finite() || *value < 0.0)
        {
            return Err(ConfigurationError::InvalidCatalog(
                "document scoring constants must be finite and non-negative".to_string(),
            ));
        }

        for (visa_type, entry) in &self.visas {
            if entry.tracks.is_empty() {
                return Err(ConfigurationError::InvalidCatalog(format!(
                    "{visa_type} has no application tracks"
                )));
            }
            for (application_type, track) in &entry.tracks {
                for alternative in &track.alternatives {
                    if alternative.options.is_empty()
                        || alternative.options.iter().any(|option| option.is_empty())
                    {
                        return Err(ConfigurationError::InvalidCatalog(format!(
                            "{visa_type} {application_type}: alternative '{}' has an empty option",
                            alternative.id
                        )));
                    }
                }
            }
        }

        for extension in &self.field_extensions {
            if !self.visas.contains_key(&extension.visa_type) {
                return Err(ConfigurationError::InvalidCatalog(format!(
                    "field extension references uncataloged visa {}",
                    extension.visa_type
                )));
            }
        }

        Ok(())
    }

    pub fn validation_rule(&self, kind: DocumentKind) -> Option<&ValidationRule> {
        self.validation_rules.get(&kind)
    }

    pub fn supports(&self, visa_type: VisaType, application_type: ApplicationType) -> bool {
        self.visas
            .get(&visa_type)
            .map(|entry| entry.tracks.contains_key(&application_type))
            .unwrap_or(false)
    }

    /// Resolve the requirement set that applies to this applicant.
    pub fn requirements(
        &self,
        visa_type: VisaType,
        application_type: ApplicationType,
        applicant: &ApplicantData,
    ) -> Result<DocumentRequirementSet, EligibilityError> {
        let entry =
            self.visas
                .get(&visa_type)
                .ok_or_else(|| EligibilityError::UnsupportedVisaType {
                    visa_type: visa_type.code().to_string(),
                })?;
        let track = entry.tracks.get(&application_type).ok_or(
            EligibilityError::UnsupportedApplicationType {
                visa_type,
                application_type,
            },
        )?;

        let mut set = DocumentRequirementSet {
            visa_type: Some(visa_type),
            application_type: Some(application_type),
            common: self.common_documents.clone(),
            required: Vec::new(),
            optional: Vec::new(),
            conditional: track.conditional.clone(),
            alternatives: track.alternatives.clone(),
            extensions: Vec::new(),
        };
        for kind in &track.required {
            set.push_required(*kind);
        }
        for kind in &track.optional {
            if !set.contains(*kind) && !set.optional.contains(kind) {
                set.optional.push(*kind);
            }
        }

        if let Some(extension) = &self.nationality_extension {
            let nationality = applicant.administrative.nationality.as_deref();
            if extension.applies(visa_type, nationality) {
                let added: Vec<DocumentKind> = extension
                    .documents
                    .iter()
                    .copied()
                    .filter(|kind| set.push_required(*kind))
                    .collect();
                if !added.is_empty() {
                    set.extensions.push(format!(
                        "nationality {} requires {}",
                        nationality.unwrap_or("undeclared"),
                        join_ids(&added)
                    ));
                }
            }
        }

        if let Some(position) = &applicant.evaluation.position {
            for extension in self
                .field_extensions
                .iter()
                .filter(|ext| ext.visa_type == visa_type && ext.activity == position.activity)
            {
                let added: Vec<DocumentKind> = extension
                    .documents
                    .iter()
                    .copied()
                    .filter(|kind| set.push_required(*kind))
                    .collect();
                if !added.is_empty() {
                    set.extensions.push(format!(
                        "{:?} activity requires {}",
                        extension.activity,
                        join_ids(&added)
                    ));
                }
            }
        }

        Ok(set)
    }
}

fn join_ids(kinds: &[DocumentKind]) -> String {
    kinds
        .iter()
        .map(|kind| kind.id())
        .collect::<Vec<_>>()
        .join(", ")
}
