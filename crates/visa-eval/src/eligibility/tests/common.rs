use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::eligibility::bundle::ConfigBundle;
use crate::eligibility::context::EvaluationContext;
use crate::eligibility::documents::{DocumentValidation, DocumentValidator};
use crate::eligibility::domain::{
    ActivityKind, ActivityPlan, AdministrativeInfo, ApplicantData, ApplicationType, ContractTerms,
    DegreeLevel, DocumentKind, Education, EvaluationAttributes, EvaluationRequest, Experience,
    Institution, Position, PositionLevel, StayStatus, SubmittedDocument, SubmittedDocuments,
    VisaType,
};
use crate::eligibility::engine::EligibilityEngine;
use crate::eligibility::evaluators::EligibilityTables;
use crate::eligibility::repository::{
    EvaluationId, EvaluationRecord, EvaluationRepository, RepositoryError,
};
use crate::eligibility::{eligibility_router, EligibilityService};

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date")
}

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn engine() -> EligibilityEngine {
    EligibilityEngine::with_defaults().expect("embedded bundle builds an engine")
}

pub(super) fn bundle() -> ConfigBundle {
    ConfigBundle::embedded().expect("embedded bundle is valid")
}

pub(super) fn tables() -> EligibilityTables {
    bundle().tables
}

pub(super) fn validator() -> DocumentValidator {
    DocumentValidator::new(Arc::new(bundle().catalog))
}

/// Senior professor at an accredited university with a clean record.
pub(super) fn professor_applicant() -> ApplicantData {
    ApplicantData {
        evaluation: EvaluationAttributes {
            education: Some(Education {
                highest_degree: DegreeLevel::Doctorate,
                field_of_study: Some("materials science".to_string()),
                foreign_degree: false,
                degree_country: None,
            }),
            experience: Some(Experience {
                total_years: 11.0,
                relevant_years: 8.0,
                countries: vec!["CAN".to_string()],
            }),
            institution: Some(Institution {
                name: "Hanbit National University".to_string(),
                institution_type: "university".to_string(),
                region: Some("seoul".to_string()),
                accredited: true,
            }),
            position: Some(Position {
                title: "Professor of Materials Science".to_string(),
                level: PositionLevel::FullProfessor,
                activity: ActivityKind::Teaching,
            }),
            contract: Some(ContractTerms {
                duration_months: 24,
                annual_salary: 60_000_000,
                weekly_hours: 9.0,
                exclusive: true,
            }),
            activity_plan: Some(ActivityPlan {
                teaching_plan: true,
                research_plan: true,
                weekly_teaching_hours: 9.0,
            }),
            ..EvaluationAttributes::default()
        },
        administrative: AdministrativeInfo {
            nationality: Some("CAN".to_string()),
            office: Some("Seoul Immigration Office".to_string()),
            application_date: None,
        },
    }
}

pub(super) fn issued(on: NaiveDate) -> SubmittedDocument {
    SubmittedDocument {
        issued_date: Some(on),
        ..SubmittedDocument::default()
    }
}

/// Every document an E-1 new application needs, each passing its validation rule.
pub(super) fn professor_documents() -> SubmittedDocuments {
    let recent = date(2025, 2, 10);
    BTreeMap::from([
        (DocumentKind::Passport, SubmittedDocument::default()),
        (DocumentKind::Photo, issued(recent)),
        (DocumentKind::ApplicationForm, SubmittedDocument::default()),
        (DocumentKind::FeeReceipt, SubmittedDocument::default()),
        (
            DocumentKind::EmploymentContract,
            SubmittedDocument {
                weekly_hours: Some(9.0),
                ..SubmittedDocument::default()
            },
        ),
        (DocumentKind::EmploymentRecommendation, SubmittedDocument::default()),
        (
            DocumentKind::InstitutionEstablishmentPermit,
            SubmittedDocument::default(),
        ),
        (
            DocumentKind::DegreeCertificate,
            SubmittedDocument {
                translated: Some(true),
                ..SubmittedDocument::default()
            },
        ),
        (
            DocumentKind::DegreeApostille,
            SubmittedDocument {
                apostilled: Some(true),
                ..SubmittedDocument::default()
            },
        ),
    ])
}

pub(super) fn professor_request() -> EvaluationRequest {
    EvaluationRequest {
        visa_type: "E-1".to_string(),
        application_type: None,
        applicant_data: professor_applicant(),
        submitted_documents: professor_documents(),
    }
}

/// Professor already holding E-1 and extending with the same institution.
pub(super) fn professor_extension_applicant() -> ApplicantData {
    let mut applicant = professor_applicant();
    applicant.evaluation.current_visa = Some("E-1".to_string());
    applicant.evaluation.has_visa = true;
    applicant.evaluation.stay = Some(StayStatus {
        visa_expiry: Some(date(2025, 6, 30)),
        planned_departure: None,
        planned_return: None,
        registered: true,
    });
    applicant
}

/// Native-speaker instructor at a registered academy.
pub(super) fn instructor_applicant() -> ApplicantData {
    ApplicantData {
        evaluation: EvaluationAttributes {
            education: Some(Education {
                highest_degree: DegreeLevel::Bachelor,
                field_of_study: Some("english literature".to_string()),
                foreign_degree: true,
                degree_country: Some("USA".to_string()),
            }),
            experience: Some(Experience {
                total_years: 3.0,
                relevant_years: 2.0,
                countries: vec!["USA".to_string()],
            }),
            institution: Some(Institution {
                name: "Bright Path Language Academy".to_string(),
                institution_type: "language_academy".to_string(),
                region: None,
                accredited: true,
            }),
            position: Some(Position {
                title: "English Instructor".to_string(),
                level: PositionLevel::Instructor,
                activity: ActivityKind::LanguageInstruction,
            }),
            contract: Some(ContractTerms {
                duration_months: 12,
                annual_salary: 30_000_000,
                weekly_hours: 25.0,
                exclusive: false,
            }),
            ..EvaluationAttributes::default()
        },
        administrative: AdministrativeInfo {
            nationality: Some("USA".to_string()),
            office: None,
            application_date: None,
        },
    }
}

/// Applicant, validated documents, and tables that an evaluation context borrows.
pub(super) struct Fixture {
    pub(super) visa_type: VisaType,
    pub(super) application_type: ApplicationType,
    pub(super) applicant: ApplicantData,
    pub(super) documents: DocumentValidation,
    pub(super) tables: EligibilityTables,
}

impl Fixture {
    pub(super) fn new(
        visa_type: VisaType,
        application_type: ApplicationType,
        applicant: ApplicantData,
        submitted: &SubmittedDocuments,
    ) -> Self {
        let documents = validator()
            .validate(visa_type, application_type, submitted, &applicant, today())
            .expect("track is cataloged");
        Self {
            visa_type,
            application_type,
            applicant,
            documents,
            tables: tables(),
        }
    }

    pub(super) fn professor() -> Self {
        Self::new(
            VisaType::E1,
            ApplicationType::New,
            professor_applicant(),
            &professor_documents(),
        )
    }

    pub(super) fn ctx(&self) -> EvaluationContext<'_> {
        EvaluationContext {
            visa_type: self.visa_type,
            application_type: self.application_type,
            applicant: &self.applicant,
            documents: &self.documents,
            tables: &self.tables,
            today: today(),
        }
    }
}

pub(super) fn build_service() -> (EligibilityService<MemoryRepository>, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::default());
    let service = EligibilityService::new(repository.clone(), Arc::new(engine()));
    (service, repository)
}

pub(super) fn router_with_service(service: EligibilityService<MemoryRepository>) -> axum::Router {
    eligibility_router(Arc::new(service))
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<Vec<EvaluationRecord>>>,
}

impl MemoryRepository {
    pub(super) fn len(&self) -> usize {
        self.records.lock().expect("repository mutex poisoned").len()
    }
}

impl EvaluationRepository for MemoryRepository {
    fn insert(&self, record: EvaluationRecord) -> Result<EvaluationRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.iter().any(|existing| existing.id == record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &EvaluationId) -> Result<Option<EvaluationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.iter().find(|record| &record.id == id).cloned())
    }

    fn recent(&self, limit: usize) -> Result<Vec<EvaluationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.iter().rev().take(limit).cloned().collect())
    }
}

pub(super) struct ConflictRepository;

impl EvaluationRepository for ConflictRepository {
    fn insert(&self, _record: EvaluationRecord) -> Result<EvaluationRecord, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn fetch(&self, _id: &EvaluationId) -> Result<Option<EvaluationRecord>, RepositoryError> {
        Ok(None)
    }

    fn recent(&self, _limit: usize) -> Result<Vec<EvaluationRecord>, RepositoryError> {
        Ok(Vec::new())
    }
}

pub(super) struct UnavailableRepository;

impl EvaluationRepository for UnavailableRepository {
    fn insert(&self, _record: EvaluationRecord) -> Result<EvaluationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }

    fn fetch(&self, _id: &EvaluationId) -> Result<Option<EvaluationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }

    fn recent(&self, _limit: usize) -> Result<Vec<EvaluationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
