use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;

use serde::{Deserialize, Serialize};

use super::super::domain::VisaType;
use super::super::error::ConfigurationError;
use super::TrackStatus;

/// Score thresholds shared by track evaluators and the final decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBands {
    pub approved: u8,
    pub conditional: u8,
}

impl Default for StatusBands {
    fn default() -> Self {
        Self {
            approved: 70,
            conditional: 50,
        }
    }
}

impl StatusBands {
    pub fn status(&self, score: u8) -> TrackStatus {
        if score >= self.approved {
            TrackStatus::Approved
        } else if score >= self.conditional {
            TrackStatus::Conditional
        } else {
            TrackStatus::Rejected
        }
    }
}

/// Source visas accepted or refused for a change of status into one target visa.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChangeSourcePolicy {
    pub allowed: BTreeSet<String>,
    pub disallowed: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceVerdict {
    Allowed,
    Disallowed,
    /// Not listed either way; handled as discretionary.
    Unlisted,
}

impl ChangeSourcePolicy {
    pub fn verdict(&self, current_visa: &str) -> SourceVerdict {
        let code = normalize_visa_code(current_visa);
        if self.disallowed.iter().any(|listed| normalize_visa_code(listed) == code) {
            SourceVerdict::Disallowed
        } else if self.allowed.iter().any(|listed| normalize_visa_code(listed) == code) {
            SourceVerdict::Allowed
        } else {
            SourceVerdict::Unlisted
        }
    }
}

/// Canonical `X-n` spelling of a visa code: `d10` and `D_10` both become `D-10`.
pub fn normalize_visa_code(raw: &str) -> String {
    let compact: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_uppercase();
    let split = compact
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(compact.len());
    let (prefix, suffix) = compact.split_at(split);
    if prefix.is_empty() || suffix.is_empty() {
        compact
    } else {
        format!("{prefix}-{suffix}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstitutionEntry {
    pub eligible: bool,
    pub score: u8,
    pub note: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstitutionVerdict<'a> {
    Eligible(&'a InstitutionEntry),
    Ineligible(&'a InstitutionEntry),
    Unlisted,
}

/// Categorical institution and employer eligibility, keyed by visa type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstitutionTable {
    entries: BTreeMap<VisaType, BTreeMap<String, InstitutionEntry>>,
}

#[derive(Debug, Deserialize)]
struct InstitutionRow {
    visa_type: VisaType,
    institution_type: String,
    eligible: bool,
    score: u8,
    #[serde(default)]
    note: String,
}

impl InstitutionTable {
    pub fn from_reader<R: Read>(name: &str, reader: R) -> Result<Self, ConfigurationError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut table = InstitutionTable::default();

        for record in csv_reader.deserialize::<InstitutionRow>() {
            let row = record.map_err(|source| ConfigurationError::Csv {
                name: name.to_string(),
                source,
            })?;
            if row.score > 100 {
                return Err(ConfigurationError::InvalidTables(format!(
                    "{} {} score {} exceeds 100",
                    row.visa_type, row.institution_type, row.score
                )));
            }
            let key = normalize_institution_type(&row.institution_type);
            let previous = table.entries.entry(row.visa_type).or_default().insert(
                key,
                InstitutionEntry {
                    eligible: row.eligible,
                    score: if row.eligible { row.score } else { 0 },
                    note: row.note,
                },
            );
            if previous.is_some() {
                return Err(ConfigurationError::InvalidTables(format!(
                    "{} {} is listed more than once",
                    row.visa_type, row.institution_type
                )));
            }
        }

        Ok(table)
    }

    pub fn lookup(&self, visa_type: VisaType, institution_type: &str) -> InstitutionVerdict<'_> {
        let key = normalize_institution_type(institution_type);
        match self
            .entries
            .get(&visa_type)
            .and_then(|entries| entries.get(&key))
        {
            Some(entry) if entry.eligible => InstitutionVerdict::Eligible(entry),
            Some(entry) => InstitutionVerdict::Ineligible(entry),
            None => InstitutionVerdict::Unlisted,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn normalize_institution_type(raw: &str) -> String {
    raw.trim().to_ascii_lowercase().replace([' ', '-'], "_")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TablesDocument {
    version: String,
    #[serde(default)]
    status_bands: StatusBands,
    #[serde(default)]
    change_sources: BTreeMap<VisaType, ChangeSourcePolicy>,
    #[serde(default)]
    native_speaker_nationalities: BTreeSet<String>,
    #[serde(default)]
    salary_floors: BTreeMap<VisaType, u64>,
    #[serde(default)]
    weekly_hour_minimums: BTreeMap<VisaType, f32>,
    #[serde(default)]
    incentive_regions: BTreeSet<String>,
    #[serde(default = "default_minimum_contract_months")]
    minimum_contract_months: u32,
}

fn default_minimum_contract_months() -> u32 {
    12
}

/// Jurisdictional lookup tables injected into evaluators and rules.
#[derive(Debug, Clone, PartialEq)]
pub struct EligibilityTables {
    pub version: String,
    pub status_bands: StatusBands,
    pub change_sources: BTreeMap<VisaType, ChangeSourcePolicy>,
    pub native_speaker_nationalities: BTreeSet<String>,
    pub salary_floors: BTreeMap<VisaType, u64>,
    pub weekly_hour_minimums: BTreeMap<VisaType, f32>,
    pub incentive_regions: BTreeSet<String>,
    pub minimum_contract_months: u32,
    pub institutions: InstitutionTable,
}

impl EligibilityTables {
    pub fn from_sources<R: Read>(
        tables_name: &str,
        tables_json: &str,
        institutions_name: &str,
        institutions_csv: R,
    ) -> Result<Self, ConfigurationError> {
        let document: TablesDocument =
            serde_json::from_str(tables_json).map_err(|source| ConfigurationError::Parse {
                name: tables_name.to_string(),
                source,
            })?;
        let institutions = InstitutionTable::from_reader(institutions_name, institutions_csv)?;

        let tables = Self {
            version: document.version,
            status_bands: document.status_bands,
            change_sources: document.change_sources,
            native_speaker_nationalities: document
                .native_speaker_nationalities
                .into_iter()
                .map(|code| code.trim().to_ascii_uppercase())
                .collect(),
            salary_floors: document.salary_floors,
            weekly_hour_minimums: document.weekly_hour_minimums,
            incentive_regions: document
                .incentive_regions
                .into_iter()
                .map(|region| region.trim().to_ascii_lowercase())
                .collect(),
            minimum_contract_months: document.minimum_contract_months,
            institutions,
        };
        tables.validate()?;
        Ok(tables)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.version.trim().is_empty() {
            return Err(ConfigurationError::InvalidTables(
                "tables version must not be empty".to_string(),
            ));
        }
        let bands = self.status_bands;
        if bands.approved > 100 || bands.conditional >= bands.approved {
            return Err(ConfigurationError::InvalidTables(format!(
                "status bands must satisfy conditional < approved <= 100 (got {} / {})",
                bands.conditional, bands.approved
            )));
        }
        if let Some((visa_type, hours)) = self
            .weekly_hour_minimums
            .iter()
            .find(|(_, hours)| !hours.is_finite() || **hours < 0.0)
        {
            return Err(ConfigurationError::InvalidTables(format!(
                "{visa_type} weekly hour minimum {hours} is invalid"
            )));
        }
        if self.minimum_contract_months == 0 {
            return Err(ConfigurationError::InvalidTables(
                "minimum contract months must be positive".to_string(),
            ));
        }
        if self.institutions.is_empty() {
            return Err(ConfigurationError::InvalidTables(
                "institution table is empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn source_verdict(&self, target: VisaType, current_visa: &str) -> SourceVerdict {
        match self.change_sources.get(&target) {
            Some(policy) => policy.verdict(current_visa),
            None => SourceVerdict::Unlisted,
        }
    }

    pub fn is_native_speaker(&self, nationality: &str) -> bool {
        self.native_speaker_nationalities
            .contains(&nationality.trim().to_ascii_uppercase())
    }

    pub fn salary_floor(&self, visa_type: VisaType) -> Option<u64> {
        self.salary_floors.get(&visa_type).copied()
    }

    pub fn weekly_hour_minimum(&self, visa_type: VisaType) -> Option<f32> {
        self.weekly_hour_minimums.get(&visa_type).copied()
    }

    pub fn is_incentive_region(&self, region: &str) -> bool {
        self.incentive_regions
            .contains(&region.trim().to_ascii_lowercase())
    }

    pub fn institution(
        &self,
        visa_type: VisaType,
        institution_type: &str,
    ) -> InstitutionVerdict<'_> {
        self.institutions.lookup(visa_type, institution_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const TABLES: &str = r#"{
        "version": "test",
        "changeSources": { "E-1": { "allowed": ["D-2"], "disallowed": ["C-3"] } },
        "nativeSpeakerNationalities": ["usa"],
        "incentiveRegions": ["Gangwon"]
    }"#;

    const INSTITUTIONS: &str = "visa_type,institution_type,eligible,score,note\n\
        E-1,university,true,100,accredited\n\
        E-1,language_academy,false,40,not a university\n";

    fn tables() -> EligibilityTables {
        EligibilityTables::from_sources("tables", TABLES, "institutions", Cursor::new(INSTITUTIONS))
            .expect("tables load")
    }

    #[test]
    fn visa_codes_normalize_to_dashed_form() {
        assert_eq!(normalize_visa_code("d10"), "D-10");
        assert_eq!(normalize_visa_code(" C_3 "), "C-3");
        assert_eq!(normalize_visa_code("E-7"), "E-7");
    }

    #[test]
    fn source_verdict_distinguishes_listed_and_unlisted_codes() {
        let tables = tables();
        assert_eq!(tables.source_verdict(VisaType::E1, "d2"), SourceVerdict::Allowed);
        assert_eq!(tables.source_verdict(VisaType::E1, "C-3"), SourceVerdict::Disallowed);
        assert_eq!(tables.source_verdict(VisaType::E1, "H-2"), SourceVerdict::Unlisted);
        assert_eq!(tables.source_verdict(VisaType::E7, "D-2"), SourceVerdict::Unlisted);
    }

    #[test]
    fn ineligible_rows_never_carry_a_score() {
        let tables = tables();
        match tables.institution(VisaType::E1, "Language Academy") {
            InstitutionVerdict::Ineligible(entry) => assert_eq!(entry.score, 0),
            other => panic!("expected ineligible verdict, got {other:?}"),
        }
        assert_eq!(tables.institution(VisaType::E2, "university"), InstitutionVerdict::Unlisted);
    }

    #[test]
    fn lookups_are_case_insensitive() {
        let tables = tables();
        assert!(tables.is_native_speaker("USA"));
        assert!(tables.is_incentive_region("gangwon"));
    }

    #[test]
    fn duplicate_institution_rows_are_rejected() {
        let csv = format!("{INSTITUTIONS}E-1,university,true,90,again\n");
        match EligibilityTables::from_sources("tables", TABLES, "institutions", Cursor::new(csv)) {
            Err(ConfigurationError::InvalidTables(message)) => {
                assert!(message.contains("more than once"))
            }
            other => panic!("expected duplicate row error, got {other:?}"),
        }
    }

    #[test]
    fn inverted_status_bands_are_rejected() {
        let raw = r#"{ "version": "test", "statusBands": { "approved": 50, "conditional": 70 } }"#;
        match EligibilityTables::from_sources(
            "tables",
            raw,
            "institutions",
            Cursor::new(INSTITUTIONS),
        ) {
            Err(ConfigurationError::InvalidTables(_)) => {}
            other => panic!("expected invalid tables, got {other:?}"),
        }
    }
}
