//! Document requirement catalog and declared-metadata validation.
//!
//! The catalog is configuration: it is loaded once from the versioned bundle and shared
//! read-only between evaluations. Validation only inspects metadata supplied by the
//! caller (apostille and translation flags, issue dates, declared thresholds).

mod catalog;
mod conditions;
mod validator;

pub use catalog::{
    AlternativeRequirement, DocumentCatalog, DocumentRequirementSet, DocumentScoring,
    FieldExtension, NationalityExtension, TrackRequirements, ValidationRule, VisaDocumentEntry,
};
pub use conditions::ConditionKey;
pub use validator::{
    check_document, DocumentDefect, DocumentValidation, DocumentValidator, InvalidDocument,
    MissingDocument, RequirementSource,
};
