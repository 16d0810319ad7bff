use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use super::domain::{InstitutionRecord, MsaMd};
use super::lookup::{LookupError, LookupResponse, RemoteLookup};
use super::path::ReportKey;
use crate::reports::ReportRecord;

/// Search results are capped so a one-letter query stays readable.
const SEARCH_LIMIT: usize = 25;

#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("unable to read disclosure data: {0}")]
    Io(#[from] std::io::Error),
    #[error("disclosure data is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FixtureFile {
    #[serde(default)]
    institutions: Vec<FixtureInstitution>,
    #[serde(default)]
    reports: Vec<FixtureReport>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FixtureInstitution {
    institution: InstitutionRecord,
    /// Years the institution filed in; empty means every year.
    #[serde(default)]
    years: Vec<String>,
    #[serde(default)]
    msa_mds: Vec<MsaMd>,
}

impl FixtureInstitution {
    fn filed_in(&self, year: &str) -> bool {
        self.years.is_empty() || self.years.iter().any(|filed| filed == year)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FixtureReport {
    year: String,
    institution_id: String,
    msa_md_id: String,
    report_id: String,
    report: ReportRecord,
}

/// Data source backed by a JSON document of institutions and published
/// reports, loaded once.
#[derive(Debug, Default)]
pub struct FixtureDataSource {
    institutions: Vec<FixtureInstitution>,
    reports: HashMap<ReportKey, ReportRecord>,
}

impl FixtureDataSource {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, FixtureError> {
        let file: FixtureFile = serde_json::from_reader(reader)?;
        let reports = file
            .reports
            .into_iter()
            .map(|entry| {
                let key = ReportKey::new(
                    entry.year,
                    entry.institution_id,
                    entry.msa_md_id,
                    entry.report_id,
                );
                (key, entry.report)
            })
            .collect::<HashMap<_, _>>();

        tracing::info!(
            institutions = file.institutions.len(),
            reports = reports.len(),
            "disclosure data loaded"
        );

        Ok(Self {
            institutions: file.institutions,
            reports,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, FixtureError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_json(raw: &str) -> Result<Self, FixtureError> {
        Self::from_reader(raw.as_bytes())
    }

    pub fn report(&self, key: &ReportKey) -> Option<ReportRecord> {
        self.reports.get(key).cloned()
    }

    fn find(&self, institution_id: &str, year: &str) -> Option<&FixtureInstitution> {
        self.institutions
            .iter()
            .filter(|entry| entry.filed_in(year))
            .find(|entry| entry.institution.matches_id(institution_id))
    }
}

#[async_trait]
impl RemoteLookup for FixtureDataSource {
    async fn institution_msa_mds(
        &self,
        institution_id: &str,
        year: &str,
    ) -> Result<LookupResponse, LookupError> {
        let entry = self
            .find(institution_id, year)
            .ok_or_else(|| LookupError::NotFound(institution_id.to_string()))?;

        Ok(LookupResponse {
            institution: entry.institution.clone(),
            msa_mds: entry.msa_mds.clone(),
        })
    }

    async fn search_institutions(
        &self,
        query: &str,
        year: &str,
    ) -> Result<Vec<InstitutionRecord>, LookupError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .institutions
            .iter()
            .filter(|entry| entry.filed_in(year))
            .filter(|entry| {
                entry.institution.name.to_lowercase().contains(&needle)
                    || entry.institution.matches_id(query)
            })
            .take(SEARCH_LIMIT)
            .map(|entry| entry.institution.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA: &str = r#"{
        "institutions": [
            {
                "institution": { "lei": "LEI123", "institutionId": "0000012345", "name": "First Prairie Bank" },
                "years": ["2017"],
                "msaMds": [ { "id": "10180", "name": "ABILENE, TX" } ]
            },
            {
                "institution": { "respondentId": "77", "name": "Lakeside Credit Union" },
                "msaMds": []
            }
        ],
        "reports": []
    }"#;

    #[tokio::test]
    async fn looks_up_by_any_identifier() {
        let source = FixtureDataSource::from_json(DATA).expect("fixture parses");
        let by_lei = source
            .institution_msa_mds("LEI123", "2017")
            .await
            .expect("lei resolves");
        assert_eq!(by_lei.msa_mds.len(), 1);

        let by_respondent = source
            .institution_msa_mds("0000012345", "2017")
            .await
            .expect("respondent id resolves");
        assert_eq!(by_respondent.institution.name, "First Prairie Bank");
    }

    #[tokio::test]
    async fn respects_filing_years() {
        let source = FixtureDataSource::from_json(DATA).expect("fixture parses");
        let err = source
            .institution_msa_mds("LEI123", "2018")
            .await
            .expect_err("did not file in 2018");
        assert_eq!(err, LookupError::NotFound("LEI123".to_string()));
    }

    #[tokio::test]
    async fn search_matches_names_case_insensitively() {
        let source = FixtureDataSource::from_json(DATA).expect("fixture parses");
        let found = source
            .search_institutions("lakeside", "2017")
            .await
            .expect("search runs");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].institution_id.as_deref(), Some("77"));

        let none = source
            .search_institutions("   ", "2017")
            .await
            .expect("blank search runs");
        assert!(none.is_empty());
    }
}
