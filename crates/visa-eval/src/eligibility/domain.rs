use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::EligibilityError;

/// Government-defined permit categories covered by the evaluation core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VisaType {
    /// Professor at an accredited higher-education institution.
    #[serde(rename = "E-1")]
    E1,
    /// Foreign language instructor.
    #[serde(rename = "E-2")]
    E2,
    /// Specially designated professional activity.
    #[serde(rename = "E-7")]
    E7,
}

impl VisaType {
    pub const ALL: [VisaType; 3] = [VisaType::E1, VisaType::E2, VisaType::E7];

    pub const fn code(self) -> &'static str {
        match self {
            VisaType::E1 => "E-1",
            VisaType::E2 => "E-2",
            VisaType::E7 => "E-7",
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            VisaType::E1 => "Professor",
            VisaType::E2 => "Foreign Language Instructor",
            VisaType::E7 => "Specially Designated Activities",
        }
    }

    /// Parse a caller supplied visa code, accepting `E-1`, `e1`, and similar spellings.
    pub fn parse(raw: &str) -> Result<Self, EligibilityError> {
        let normalized: String = raw
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_' && !c.is_whitespace())
            .collect::<String>()
            .to_ascii_uppercase();

        match normalized.as_str() {
            "E1" => Ok(VisaType::E1),
            "E2" => Ok(VisaType::E2),
            "E7" => Ok(VisaType::E7),
            _ => Err(EligibilityError::UnsupportedVisaType {
                visa_type: raw.to_string(),
            }),
        }
    }

    /// Whether a free-form visa code (for example `current_visa`) names this category.
    pub fn matches_code(self, raw: &str) -> bool {
        VisaType::parse(raw).map(|parsed| parsed == self).unwrap_or(false)
    }
}

impl fmt::Display for VisaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for VisaType {
    type Err = EligibilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VisaType::parse(s)
    }
}

/// Procedural track of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationType {
    New,
    Extension,
    Change,
    Reentry,
}

impl ApplicationType {
    pub const ALL: [ApplicationType; 4] = [
        ApplicationType::New,
        ApplicationType::Extension,
        ApplicationType::Change,
        ApplicationType::Reentry,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ApplicationType::New => "NEW",
            ApplicationType::Extension => "EXTENSION",
            ApplicationType::Change => "CHANGE",
            ApplicationType::Reentry => "REENTRY",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            ApplicationType::New => "new visa issuance",
            ApplicationType::Extension => "extension of stay",
            ApplicationType::Change => "change of status",
            ApplicationType::Reentry => "re-entry permit",
        }
    }
}

impl fmt::Display for ApplicationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ApplicationType {
    type Err = EligibilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "NEW" => Ok(ApplicationType::New),
            "EXTENSION" => Ok(ApplicationType::Extension),
            "CHANGE" | "CHANGE_OF_STATUS" => Ok(ApplicationType::Change),
            "REENTRY" | "RE_ENTRY" => Ok(ApplicationType::Reentry),
            _ => Err(EligibilityError::UnknownApplicationType {
                application_type: s.trim().to_string(),
            }),
        }
    }
}

/// Inbound evaluation request as received from the surrounding layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRequest {
    pub visa_type: String,
    #[serde(default)]
    pub application_type: Option<ApplicationType>,
    pub applicant_data: ApplicantData,
    #[serde(default)]
    pub submitted_documents: SubmittedDocuments,
}

/// Normalized applicant attributes plus administrative metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantData {
    #[serde(default)]
    pub evaluation: EvaluationAttributes,
    #[serde(default)]
    pub administrative: AdministrativeInfo,
}

/// Attributes consumed by classifiers, rules, and track evaluators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EvaluationAttributes {
    pub current_visa: Option<String>,
    pub has_visa: bool,
    pub flags: ApplicationFlags,
    pub education: Option<Education>,
    pub experience: Option<Experience>,
    pub institution: Option<Institution>,
    pub position: Option<Position>,
    pub contract: Option<ContractTerms>,
    pub activity_plan: Option<ActivityPlan>,
    pub teaching: Option<TeachingCredentials>,
    pub stay: Option<StayStatus>,
    pub history: ImmigrationHistory,
    pub previous_annual_salary: Option<u64>,
    pub employer_changed: bool,
    pub dependents: u8,
}

/// Explicit track overrides supplied by the applicant or case worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationFlags {
    pub extension: bool,
    pub change_of_status: bool,
    pub reentry: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegreeLevel {
    NoDegree,
    HighSchool,
    Associate,
    Bachelor,
    Master,
    Doctorate,
}

impl DegreeLevel {
    pub const fn label(self) -> &'static str {
        match self {
            DegreeLevel::NoDegree => "no degree",
            DegreeLevel::HighSchool => "high school diploma",
            DegreeLevel::Associate => "associate degree",
            DegreeLevel::Bachelor => "bachelor's degree",
            DegreeLevel::Master => "master's degree",
            DegreeLevel::Doctorate => "doctorate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    pub highest_degree: DegreeLevel,
    #[serde(default)]
    pub field_of_study: Option<String>,
    #[serde(default)]
    pub foreign_degree: bool,
    #[serde(default)]
    pub degree_country: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Experience {
    pub total_years: f32,
    pub relevant_years: f32,
    /// Countries (ISO alpha-3) where the experience was acquired.
    pub countries: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Institution {
    pub name: String,
    /// Identifier looked up in the institution eligibility table, e.g. `university`.
    pub institution_type: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default = "default_true")]
    pub accredited: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionLevel {
    Instructor,
    Lecturer,
    Researcher,
    AssistantProfessor,
    AssociateProfessor,
    FullProfessor,
    Specialist,
    Manager,
}

impl PositionLevel {
    /// Seniority score used by qualification checks.
    pub const fn seniority_score(self) -> u8 {
        match self {
            PositionLevel::FullProfessor => 100,
            PositionLevel::AssociateProfessor => 90,
            PositionLevel::AssistantProfessor => 80,
            PositionLevel::Manager => 80,
            PositionLevel::Researcher => 75,
            PositionLevel::Specialist => 70,
            PositionLevel::Lecturer => 65,
            PositionLevel::Instructor => 55,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Teaching,
    Research,
    TeachingAndResearch,
    LanguageInstruction,
    Engineering,
    InformationTechnology,
    Design,
    Management,
}

impl ActivityKind {
    pub const fn involves_research(self) -> bool {
        matches!(self, ActivityKind::Research | ActivityKind::TeachingAndResearch)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub title: String,
    pub level: PositionLevel,
    pub activity: ActivityKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContractTerms {
    pub duration_months: u32,
    pub annual_salary: u64,
    pub weekly_hours: f32,
    pub exclusive: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityPlan {
    pub teaching_plan: bool,
    pub research_plan: bool,
    pub weekly_teaching_hours: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeachingCredentials {
    /// Certifications such as `tefl`, `tesol`, or `celta`.
    pub certifications: Vec<String>,
    pub years: f32,
}

impl TeachingCredentials {
    pub fn has_certification(&self, name: &str) -> bool {
        self.certifications
            .iter()
            .any(|held| held.trim().eq_ignore_ascii_case(name))
    }
}

/// Current stay in-country, used by extension and re-entry tracks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StayStatus {
    pub visa_expiry: Option<NaiveDate>,
    pub planned_departure: Option<NaiveDate>,
    pub planned_return: Option<NaiveDate>,
    /// Holds a valid alien registration.
    pub registered: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImmigrationHistory {
    pub prior_violations: u32,
    pub unresolved_violations: bool,
    pub prior_refusals: u32,
    pub tax_arrears: bool,
    pub criminal_record: bool,
}

impl ImmigrationHistory {
    pub fn is_clean(&self) -> bool {
        self.prior_violations == 0
            && !self.unresolved_violations
            && self.prior_refusals == 0
            && !self.tax_arrears
            && !self.criminal_record
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdministrativeInfo {
    /// ISO-3166 alpha-3 nationality code.
    pub nationality: Option<String>,
    pub office: Option<String>,
    pub application_date: Option<NaiveDate>,
}

/// Closed set of document identifiers known to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Passport,
    Photo,
    ApplicationForm,
    FeeReceipt,
    AlienRegistrationCard,
    EmploymentContract,
    DegreeCertificate,
    DegreeApostille,
    DegreeVerificationLetter,
    Transcript,
    CareerCertificate,
    CriminalRecordCheck,
    HealthCertificate,
    TuberculosisTest,
    BusinessRegistration,
    InstitutionEstablishmentPermit,
    EmploymentRecommendation,
    ResearchPlan,
    TeachingPlan,
    PublicationList,
    TeachingCertificate,
    SalaryStatement,
    TaxPaymentCertificate,
    ResidenceProof,
    ReleaseLetter,
    FamilyRelationCertificate,
    ReturnTicket,
    ProfessionalLicense,
}

impl DocumentKind {
    pub const fn id(self) -> &'static str {
        match self {
            DocumentKind::Passport => "passport",
            DocumentKind::Photo => "photo",
            DocumentKind::ApplicationForm => "application_form",
            DocumentKind::FeeReceipt => "fee_receipt",
            DocumentKind::AlienRegistrationCard => "alien_registration_card",
            DocumentKind::EmploymentContract => "employment_contract",
            DocumentKind::DegreeCertificate => "degree_certificate",
            DocumentKind::DegreeApostille => "degree_apostille",
            DocumentKind::DegreeVerificationLetter => "degree_verification_letter",
            DocumentKind::Transcript => "transcript",
            DocumentKind::CareerCertificate => "career_certificate",
            DocumentKind::CriminalRecordCheck => "criminal_record_check",
            DocumentKind::HealthCertificate => "health_certificate",
            DocumentKind::TuberculosisTest => "tuberculosis_test",
            DocumentKind::BusinessRegistration => "business_registration",
            DocumentKind::InstitutionEstablishmentPermit => "institution_establishment_permit",
            DocumentKind::EmploymentRecommendation => "employment_recommendation",
            DocumentKind::ResearchPlan => "research_plan",
            DocumentKind::TeachingPlan => "teaching_plan",
            DocumentKind::PublicationList => "publication_list",
            DocumentKind::TeachingCertificate => "teaching_certificate",
            DocumentKind::SalaryStatement => "salary_statement",
            DocumentKind::TaxPaymentCertificate => "tax_payment_certificate",
            DocumentKind::ResidenceProof => "residence_proof",
            DocumentKind::ReleaseLetter => "release_letter",
            DocumentKind::FamilyRelationCertificate => "family_relation_certificate",
            DocumentKind::ReturnTicket => "return_ticket",
            DocumentKind::ProfessionalLicense => "professional_license",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Metadata declared by the caller for a submitted document. Content is never inspected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubmittedDocument {
    pub apostilled: Option<bool>,
    pub translated: Option<bool>,
    pub issued_date: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
    pub annual_salary: Option<u64>,
    pub weekly_hours: Option<f32>,
    pub certifications: Vec<String>,
}

pub type SubmittedDocuments = BTreeMap<DocumentKind, SubmittedDocument>;

/// Severity attached to issues raised anywhere in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
    /// Internal failure isolated during evaluation (for example a failing rule).
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
}

impl Issue {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            rule_id: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn critical(message: impl Into<String>) -> Self {
        Self::new(Severity::Critical, message)
    }

    pub fn from_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.rule_id = Some(rule_id.into());
        self
    }
}

/// Confidence label shared by the classifier and the final decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub const fn label(self) -> &'static str {
        match self {
            Confidence::Low => "LOW",
            Confidence::Medium => "MEDIUM",
            Confidence::High => "HIGH",
        }
    }

    /// One step lower, saturating at `Low`.
    pub const fn downgraded(self) -> Self {
        match self {
            Confidence::High => Confidence::Medium,
            Confidence::Medium | Confidence::Low => Confidence::Low,
        }
    }
}

/// Clamp a signed or fractional intermediate score into `[0, 100]`.
pub(crate) fn clamp_score(value: f64) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visa_type_parse_accepts_common_spellings() {
        assert_eq!(VisaType::parse("E-1").expect("parses"), VisaType::E1);
        assert_eq!(VisaType::parse(" e2 ").expect("parses"), VisaType::E2);
        assert_eq!(VisaType::parse("e_7").expect("parses"), VisaType::E7);
    }

    #[test]
    fn application_type_parse_reports_unknown_tracks() {
        assert_eq!(
            " change-of-status ".parse::<ApplicationType>().expect("parses"),
            ApplicationType::Change
        );
        match "transfer".parse::<ApplicationType>() {
            Err(EligibilityError::UnknownApplicationType { application_type }) => {
                assert_eq!(application_type, "transfer")
            }
            other => panic!("expected unknown application type, got {other:?}"),
        }
    }

    #[test]
    fn visa_type_parse_rejects_uncataloged_codes() {
        match VisaType::parse("D-2") {
            Err(EligibilityError::UnsupportedVisaType { visa_type }) => {
                assert_eq!(visa_type, "D-2")
            }
            other => panic!("expected unsupported visa type, got {other:?}"),
        }
    }

    #[test]
    fn request_deserializes_from_camel_case_payload() {
        let payload = serde_json::json!({
            "visaType": "E-1",
            "applicationType": "NEW",
            "applicantData": {
                "evaluation": {
                    "education": { "highestDegree": "doctorate" },
                    "history": { "priorViolations": 1 }
                },
                "administrative": { "nationality": "USA" }
            },
            "submittedDocuments": {
                "passport": { "issuedDate": "2024-01-10" }
            }
        });

        let request: EvaluationRequest =
            serde_json::from_value(payload).expect("request deserializes");
        assert_eq!(request.application_type, Some(ApplicationType::New));
        assert_eq!(
            request
                .applicant_data
                .evaluation
                .education
                .as_ref()
                .map(|education| education.highest_degree),
            Some(DegreeLevel::Doctorate)
        );
        assert_eq!(request.applicant_data.evaluation.history.prior_violations, 1);
        assert!(request
            .submitted_documents
            .contains_key(&DocumentKind::Passport));
    }

    #[test]
    fn clamp_score_bounds_values() {
        assert_eq!(clamp_score(-12.0), 0);
        assert_eq!(clamp_score(140.2), 100);
        assert_eq!(clamp_score(f64::NAN), 0);
        assert_eq!(clamp_score(69.5), 70);
    }
}
