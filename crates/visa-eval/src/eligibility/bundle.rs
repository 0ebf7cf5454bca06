//! Versioned configuration bundle injected into the engine at construction.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::documents::DocumentCatalog;
use super::error::ConfigurationError;
use super::evaluators::EligibilityTables;
use super::rules::RuleSetConfig;
use super::scoring::ScoringConfig;

pub const DOCUMENTS_FILE: &str = "documents.v1.json";
pub const ELIGIBILITY_FILE: &str = "eligibility.v1.json";
pub const INSTITUTIONS_FILE: &str = "institutions.v1.csv";
pub const RULES_FILE: &str = "rules.v1.json";
pub const SCORING_FILE: &str = "scoring.v1.json";

const EMBEDDED_DOCUMENTS: &str = include_str!("../../config/documents.v1.json");
const EMBEDDED_ELIGIBILITY: &str = include_str!("../../config/eligibility.v1.json");
const EMBEDDED_INSTITUTIONS: &str = include_str!("../../config/institutions.v1.csv");
const EMBEDDED_RULES: &str = include_str!("../../config/rules.v1.json");
const EMBEDDED_SCORING: &str = include_str!("../../config/scoring.v1.json");

/// Version strings of every configuration document behind a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigVersions {
    pub documents: String,
    pub eligibility: String,
    pub rules: String,
    pub scoring: String,
}

#[derive(Debug, Clone)]
pub struct ConfigBundle {
    pub catalog: DocumentCatalog,
    pub tables: EligibilityTables,
    pub rules: RuleSetConfig,
    pub scoring: ScoringConfig,
}

struct BundleSources {
    documents: String,
    eligibility: String,
    institutions: String,
    rules: String,
    scoring: String,
}

impl ConfigBundle {
    /// Bundle compiled into the binary.
    pub fn embedded() -> Result<Self, ConfigurationError> {
        Self::from_sources(BundleSources {
            documents: EMBEDDED_DOCUMENTS.to_string(),
            eligibility: EMBEDDED_ELIGIBILITY.to_string(),
            institutions: EMBEDDED_INSTITUTIONS.to_string(),
            rules: EMBEDDED_RULES.to_string(),
            scoring: EMBEDDED_SCORING.to_string(),
        })
    }

    /// Load a bundle from a directory. Files absent from the directory fall back to the
    /// embedded copy; files present but malformed are an error.
    pub fn load_dir(dir: &Path) -> Result<Self, ConfigurationError> {
        let bundle = Self::from_sources(BundleSources {
            documents: read_or_embedded(dir, DOCUMENTS_FILE, EMBEDDED_DOCUMENTS)?,
            eligibility: read_or_embedded(dir, ELIGIBILITY_FILE, EMBEDDED_ELIGIBILITY)?,
            institutions: read_or_embedded(dir, INSTITUTIONS_FILE, EMBEDDED_INSTITUTIONS)?,
            rules: read_or_embedded(dir, RULES_FILE, EMBEDDED_RULES)?,
            scoring: read_or_embedded(dir, SCORING_FILE, EMBEDDED_SCORING)?,
        })?;
        info!(
            dir = %dir.display(),
            documents = %bundle.catalog.version,
            rules = %bundle.rules.version,
            "configuration bundle loaded"
        );
        Ok(bundle)
    }

    fn from_sources(sources: BundleSources) -> Result<Self, ConfigurationError> {
        let catalog = DocumentCatalog::from_json(DOCUMENTS_FILE, &sources.documents)?;
        let tables = EligibilityTables::from_sources(
            ELIGIBILITY_FILE,
            &sources.eligibility,
            INSTITUTIONS_FILE,
            Cursor::new(sources.institutions.into_bytes()),
        )?;
        let rules = RuleSetConfig::from_json(RULES_FILE, &sources.rules)?;
        // Malformed rule definitions fail the load.
        rules.build_rules()?;
        let scoring = ScoringConfig::from_json(SCORING_FILE, &sources.scoring)?;
        Ok(Self {
            catalog,
            tables,
            rules,
            scoring,
        })
    }

    pub fn versions(&self) -> ConfigVersions {
        ConfigVersions {
            documents: self.catalog.version.clone(),
            eligibility: self.tables.version.clone(),
            rules: self.rules.version.clone(),
            scoring: self.scoring.version.clone(),
        }
    }
}

fn read_or_embedded(dir: &Path, name: &str, embedded: &str) -> Result<String, ConfigurationError> {
    let path = dir.join(name);
    if !path.exists() {
        warn!(path = %path.display(), "configuration file absent, using embedded default");
        return Ok(embedded.to_string());
    }
    fs::read_to_string(&path).map_err(|source| ConfigurationError::Read { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_bundle_loads() {
        let bundle = ConfigBundle::embedded().expect("embedded bundle is valid");
        let versions = bundle.versions();
        assert_eq!(versions.documents, "documents-2025.2");
        assert_eq!(versions.eligibility, "eligibility-2025.1");
        assert_eq!(versions.rules, "rules-2025.3");
        assert_eq!(versions.scoring, "scoring-2025.1");
        assert!(!bundle.tables.institutions.is_empty());
    }

    #[test]
    fn directory_overrides_single_files() {
        let dir = std::env::temp_dir().join(format!("visa-eval-bundle-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("temp dir");
        fs::write(dir.join(SCORING_FILE), r#"{"version": "scoring-override"}"#)
            .expect("write scoring override");

        let bundle = ConfigBundle::load_dir(&dir).expect("bundle with override loads");
        assert_eq!(bundle.scoring.version, "scoring-override");
        assert_eq!(bundle.rules.version, "rules-2025.3");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn malformed_override_is_a_parse_error() {
        let dir = std::env::temp_dir().join(format!("visa-eval-bad-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("temp dir");
        fs::write(dir.join(RULES_FILE), "not json").expect("write rules override");

        match ConfigBundle::load_dir(&dir) {
            Err(ConfigurationError::Parse { name, .. }) => assert_eq!(name, RULES_FILE),
            other => panic!("expected parse error, got {other:?}"),
        }

        fs::remove_dir_all(&dir).ok();
    }
}
