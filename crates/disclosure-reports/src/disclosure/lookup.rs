use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::domain::{InstitutionRecord, MsaMd};

/// Answer to an institution lookup: the institution and the areas it
/// reported activity in for the year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupResponse {
    pub institution: InstitutionRecord,
    #[serde(default)]
    pub msa_mds: Vec<MsaMd>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("institution {0} was not found")]
    NotFound(String),
    #[error("lookup timed out after {0} ms")]
    Timeout(u64),
    #[error("lookup backend unavailable: {0}")]
    Unavailable(String),
    #[error("institution record carries no {0} identifier")]
    MissingIdentifier(&'static str),
    #[error("lookup task stopped before answering")]
    Interrupted,
}

/// Remote source of institution and MSA/MD records.
#[async_trait]
pub trait RemoteLookup: Send + Sync {
    async fn institution_msa_mds(
        &self,
        institution_id: &str,
        year: &str,
    ) -> Result<LookupResponse, LookupError>;

    async fn search_institutions(
        &self,
        query: &str,
        year: &str,
    ) -> Result<Vec<InstitutionRecord>, LookupError>;
}
