use serde::{Deserialize, Serialize};

use super::domain::{ApplicationType, Confidence, EvaluationAttributes, VisaType};

/// Which applicant signal decided the procedural track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSignal {
    RequestedType,
    ReentryFlag,
    ChangeOfStatusFlag,
    ExtensionFlag,
    SameVisaHeld,
    DifferentVisaHeld,
    VisaHeld,
    NoSignal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub application_type: ApplicationType,
    pub confidence: Confidence,
    pub signal: ClassificationSignal,
    pub reason: String,
}

impl Classification {
    fn new(
        application_type: ApplicationType,
        confidence: Confidence,
        signal: ClassificationSignal,
        reason: String,
    ) -> Self {
        Self {
            application_type,
            confidence,
            signal,
            reason,
        }
    }
}

/// Infer the procedural track for an application to `target`.
///
/// An explicitly requested type wins, then explicit flags (re-entry, change of status,
/// extension, in that order). Without flags the current visa is compared against the
/// target; holding an unidentified visa suggests an extension with low confidence, and no
/// signal at all falls back to a new application.
pub fn classify(
    target: VisaType,
    requested: Option<ApplicationType>,
    attributes: &EvaluationAttributes,
) -> Classification {
    if let Some(application_type) = requested {
        return Classification::new(
            application_type,
            Confidence::High,
            ClassificationSignal::RequestedType,
            format!("{} requested explicitly", application_type.description()),
        );
    }

    let flags = attributes.flags;
    if flags.reentry {
        return Classification::new(
            ApplicationType::Reentry,
            Confidence::High,
            ClassificationSignal::ReentryFlag,
            "re-entry permit flag set".to_string(),
        );
    }
    if flags.change_of_status {
        return Classification::new(
            ApplicationType::Change,
            Confidence::High,
            ClassificationSignal::ChangeOfStatusFlag,
            "change of status flag set".to_string(),
        );
    }
    if flags.extension {
        return Classification::new(
            ApplicationType::Extension,
            Confidence::High,
            ClassificationSignal::ExtensionFlag,
            "extension flag set".to_string(),
        );
    }

    let current = attributes
        .current_visa
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty());
    match current {
        Some(code) if target.matches_code(code) => Classification::new(
            ApplicationType::Extension,
            Confidence::Medium,
            ClassificationSignal::SameVisaHeld,
            format!("already holds {target}, treated as an extension of stay"),
        ),
        Some(code) => Classification::new(
            ApplicationType::Change,
            Confidence::Medium,
            ClassificationSignal::DifferentVisaHeld,
            format!("holds {code}, applying for {target} requires a change of status"),
        ),
        None if attributes.has_visa => Classification::new(
            ApplicationType::Extension,
            Confidence::Low,
            ClassificationSignal::VisaHeld,
            "holds an unspecified visa, assumed extension of stay".to_string(),
        ),
        None => Classification::new(
            ApplicationType::New,
            Confidence::Medium,
            ClassificationSignal::NoSignal,
            "no existing status declared, treated as a new application".to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eligibility::domain::ApplicationFlags;

    fn attributes() -> EvaluationAttributes {
        EvaluationAttributes::default()
    }

    #[test]
    fn requested_type_overrides_every_signal() {
        let mut attributes = attributes();
        attributes.flags.reentry = true;
        attributes.current_visa = Some("E-1".to_string());

        let classification = classify(VisaType::E1, Some(ApplicationType::New), &attributes);
        assert_eq!(classification.application_type, ApplicationType::New);
        assert_eq!(classification.confidence, Confidence::High);
        assert_eq!(classification.signal, ClassificationSignal::RequestedType);
    }

    #[test]
    fn reentry_flag_takes_precedence_over_other_flags() {
        let mut attributes = attributes();
        attributes.flags = ApplicationFlags {
            extension: true,
            change_of_status: true,
            reentry: true,
        };

        let classification = classify(VisaType::E2, None, &attributes);
        assert_eq!(classification.application_type, ApplicationType::Reentry);
        assert_eq!(classification.confidence, Confidence::High);
    }

    #[test]
    fn same_visa_is_an_extension_with_medium_confidence() {
        let mut attributes = attributes();
        attributes.current_visa = Some("e1".to_string());

        let classification = classify(VisaType::E1, None, &attributes);
        assert_eq!(classification.application_type, ApplicationType::Extension);
        assert_eq!(classification.confidence, Confidence::Medium);
    }

    #[test]
    fn different_visa_is_a_change_of_status() {
        let mut attributes = attributes();
        attributes.current_visa = Some("D-2".to_string());

        let classification = classify(VisaType::E7, None, &attributes);
        assert_eq!(classification.application_type, ApplicationType::Change);
        assert_eq!(classification.signal, ClassificationSignal::DifferentVisaHeld);
        assert!(classification.reason.contains("D-2"));
    }

    #[test]
    fn unspecified_visa_is_a_low_confidence_extension() {
        let mut attributes = attributes();
        attributes.has_visa = true;

        let classification = classify(VisaType::E2, None, &attributes);
        assert_eq!(classification.application_type, ApplicationType::Extension);
        assert_eq!(classification.confidence, Confidence::Low);
    }

    #[test]
    fn no_signal_defaults_to_new_application() {
        let classification = classify(VisaType::E1, None, &attributes());
        assert_eq!(classification.application_type, ApplicationType::New);
        assert_eq!(classification.signal, ClassificationSignal::NoSignal);
    }
}
