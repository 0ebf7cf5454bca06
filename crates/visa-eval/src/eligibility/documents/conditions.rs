use serde::{Deserialize, Serialize};

use super::super::domain::ApplicantData;

/// Named applicant conditions that pull conditional documents into the required set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKey {
    SalaryIncreased,
    EmployerChanged,
    ForeignDegree,
    PriorViolations,
    ResearchPosition,
    HasDependents,
}

impl ConditionKey {
    pub const fn id(self) -> &'static str {
        match self {
            ConditionKey::SalaryIncreased => "salary_increased",
            ConditionKey::EmployerChanged => "employer_changed",
            ConditionKey::ForeignDegree => "foreign_degree",
            ConditionKey::PriorViolations => "prior_violations",
            ConditionKey::ResearchPosition => "research_position",
            ConditionKey::HasDependents => "has_dependents",
        }
    }

    pub fn holds(self, applicant: &ApplicantData) -> bool {
        let attributes = &applicant.evaluation;
        match self {
            ConditionKey::SalaryIncreased => match (
                attributes.previous_annual_salary,
                attributes.contract.as_ref(),
            ) {
                (Some(previous), Some(contract)) => contract.annual_salary > previous,
                _ => false,
            },
            ConditionKey::EmployerChanged => attributes.employer_changed,
            ConditionKey::ForeignDegree => attributes
                .education
                .as_ref()
                .map(|education| education.foreign_degree)
                .unwrap_or(false),
            ConditionKey::PriorViolations => {
                attributes.history.prior_violations > 0 || attributes.history.unresolved_violations
            }
            ConditionKey::ResearchPosition => attributes
                .position
                .as_ref()
                .map(|position| position.activity.involves_research())
                .unwrap_or(false),
            ConditionKey::HasDependents => attributes.dependents > 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eligibility::domain::{ContractTerms, EvaluationAttributes};

    #[test]
    fn salary_increase_requires_previous_salary_and_contract() {
        let mut applicant = ApplicantData::default();
        assert!(!ConditionKey::SalaryIncreased.holds(&applicant));

        applicant.evaluation = EvaluationAttributes {
            previous_annual_salary: Some(40_000_000),
            contract: Some(ContractTerms {
                annual_salary: 46_000_000,
                ..ContractTerms::default()
            }),
            ..EvaluationAttributes::default()
        };
        assert!(ConditionKey::SalaryIncreased.holds(&applicant));

        applicant.evaluation.previous_annual_salary = Some(50_000_000);
        assert!(!ConditionKey::SalaryIncreased.holds(&applicant));
    }

    #[test]
    fn prior_violations_include_unresolved_flag() {
        let mut applicant = ApplicantData::default();
        applicant.evaluation.history.unresolved_violations = true;
        assert!(ConditionKey::PriorViolations.holds(&applicant));
    }
}
