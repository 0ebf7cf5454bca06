use chrono::NaiveDate;

use super::documents::DocumentValidation;
use super::domain::{ApplicantData, ApplicationType, VisaType};
use super::evaluators::EligibilityTables;

/// Read-only view shared by every rule and track evaluator during one evaluation.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub visa_type: VisaType,
    pub application_type: ApplicationType,
    pub applicant: &'a ApplicantData,
    pub documents: &'a DocumentValidation,
    pub tables: &'a EligibilityTables,
    pub today: NaiveDate,
}

impl<'a> EvaluationContext<'a> {
    /// Date the application is considered filed: the declared application date, else today.
    pub fn reference_date(&self) -> NaiveDate {
        self.applicant
            .administrative
            .application_date
            .unwrap_or(self.today)
    }

    pub fn nationality(&self) -> Option<&'a str> {
        self.applicant
            .administrative
            .nationality
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }
}
