use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Id of the pseudo MSA/MD that aggregates every area an institution lends in.
pub const NATIONWIDE: &str = "nationwide";

/// Which identifier is authoritative for institutions in a given year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierScheme {
    RespondentId,
    Lei,
}

impl IdentifierScheme {
    pub const fn label(self) -> &'static str {
        match self {
            Self::RespondentId => "Respondent ID",
            Self::Lei => "LEI",
        }
    }
}

/// An institution keyed under the scheme of the year it was looked up for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Institution {
    pub id: String,
    pub name: String,
    pub scheme: IdentifierScheme,
}

/// Institution as the data source reports it. Older filings only carry the
/// respondent id, newer ones the LEI; some sources only send a generic id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstitutionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lei: Option<String>,
    #[serde(
        default,
        alias = "respondentId",
        skip_serializing_if = "Option::is_none"
    )]
    pub institution_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
}

impl InstitutionRecord {
    /// Picks the identifier authoritative for `scheme`, falling back to the
    /// generic id. `None` when neither is usable.
    pub fn normalize(&self, scheme: IdentifierScheme) -> Option<Institution> {
        let authoritative = match scheme {
            IdentifierScheme::Lei => self.lei.as_deref(),
            IdentifierScheme::RespondentId => self.institution_id.as_deref(),
        };

        authoritative
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .or_else(|| self.id.as_deref().map(str::trim).filter(|id| !id.is_empty()))
            .map(|id| Institution {
                id: id.to_string(),
                name: self.name.clone(),
                scheme,
            })
    }

    pub fn matches_id(&self, wanted: &str) -> bool {
        [&self.lei, &self.institution_id, &self.id]
            .into_iter()
            .flatten()
            .any(|id| id.trim().eq_ignore_ascii_case(wanted.trim()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsaMd {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl MsaMd {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
        }
    }

    pub fn nationwide() -> Self {
        Self {
            id: NATIONWIDE.to_string(),
            name: None,
        }
    }

    pub fn is_nationwide(&self) -> bool {
        self.id == NATIONWIDE
    }

    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ if self.is_nationwide() => "Nationwide",
            _ => &self.id,
        }
    }
}

/// A year offered by the year prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearOption {
    pub year: String,
    pub supported: bool,
}

/// Which years have published reports and which identifier scheme each
/// year uses.
///
/// Only 2017 is supported by default. Supporting further years is a
/// configuration change, not a code change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearPolicy {
    supported: Vec<String>,
    first_year: i32,
    lei_cutover: i32,
}

impl Default for YearPolicy {
    fn default() -> Self {
        Self::new(vec!["2017".to_string()], 2017, 2018)
    }
}

impl YearPolicy {
    pub fn new(supported: Vec<String>, first_year: i32, lei_cutover: i32) -> Self {
        Self {
            supported,
            first_year,
            lei_cutover,
        }
    }

    pub fn is_supported(&self, year: &str) -> bool {
        self.supported.iter().any(|supported| supported == year)
    }

    /// Unparseable years fall under the current scheme.
    pub fn scheme_for(&self, year: &str) -> IdentifierScheme {
        match year.trim().parse::<i32>() {
            Ok(value) if value < self.lei_cutover => IdentifierScheme::RespondentId,
            _ => IdentifierScheme::Lei,
        }
    }

    /// Newest first, from `today`'s year back to the first disclosure year.
    /// Supported years later than `today` are still listed.
    pub fn selectable_years(&self, today: NaiveDate) -> Vec<YearOption> {
        let newest_supported = self
            .supported
            .iter()
            .filter_map(|year| year.parse::<i32>().ok())
            .max()
            .unwrap_or(self.first_year);
        let newest = today.year().max(newest_supported);

        (self.first_year..=newest)
            .rev()
            .map(|year| {
                let year = year.to_string();
                YearOption {
                    supported: self.is_supported(&year),
                    year,
                }
            })
            .collect()
    }

    pub fn unavailable_message(year: &str) -> String {
        format!("Disclosure reports are not yet available for {year}.")
    }
}
