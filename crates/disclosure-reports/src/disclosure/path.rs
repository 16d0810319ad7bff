use std::fmt;

use serde::Serialize;

pub const ROUTE_PREFIX: &str = "/disclosure-reports";

/// Drill-down progress, derived from how many path segments are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    NoYear,
    YearSelected,
    InstitutionSelected,
    MsaMdSelected,
    ReportSelected,
}

impl Stage {
    pub const fn depth(self) -> usize {
        match self {
            Self::NoYear => 0,
            Self::YearSelected => 1,
            Self::InstitutionSelected => 2,
            Self::MsaMdSelected => 3,
            Self::ReportSelected => 4,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::NoYear => "Select a year",
            Self::YearSelected => "Select an institution",
            Self::InstitutionSelected => "Select a MSA/MD",
            Self::MsaMdSelected => "Select a report",
            Self::ReportSelected => "Report",
        }
    }
}

/// Identifies one institution lookup: the same institution id may resolve
/// differently per year because the identifier scheme changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LookupKey {
    pub institution_id: String,
    pub year: String,
}

/// Identifies one report record in the session cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ReportKey {
    pub year: String,
    pub institution_id: String,
    pub msa_md_id: String,
    pub report_id: String,
}

impl ReportKey {
    pub fn new(
        year: impl Into<String>,
        institution_id: impl Into<String>,
        msa_md_id: impl Into<String>,
        report_id: impl Into<String>,
    ) -> Self {
        Self {
            year: year.into(),
            institution_id: institution_id.into(),
            msa_md_id: msa_md_id.into(),
            report_id: report_id.into(),
        }
    }
}

/// `{year}/{institutionId}/{msaMdId}/{reportId}`, each present only when
/// everything before it is. The fields are private so that ordering can only
/// be established through [`NavigationPath::from_segments`] and
/// [`NavigationPath::child`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct NavigationPath {
    year: Option<String>,
    institution_id: Option<String>,
    msa_md_id: Option<String>,
    report_id: Option<String>,
}

impl NavigationPath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Takes segments left to right, stopping at the first blank one and
    /// ignoring anything past the fourth.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut path = Self::root();
        for segment in segments {
            let segment = segment.as_ref().trim();
            if segment.is_empty() {
                break;
            }
            match path.child(segment) {
                Some(next) => path = next,
                None => {
                    tracing::debug!(%segment, "ignoring path segment past the report");
                    break;
                }
            }
        }
        path
    }

    /// Parses the part of a request path below [`ROUTE_PREFIX`]; the prefix
    /// itself is optional. Segments are percent-decoded after splitting, so
    /// an encoded `/` stays inside its identifier.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.strip_prefix(ROUTE_PREFIX).unwrap_or(raw);
        let trimmed = trimmed.trim_start_matches('/');
        if trimmed.is_empty() {
            return Self::root();
        }
        Self::from_segments(trimmed.split('/').map(|segment| {
            urlencoding::decode(segment)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| segment.to_string())
        }))
    }

    pub fn year(&self) -> Option<&str> {
        self.year.as_deref()
    }

    pub fn institution_id(&self) -> Option<&str> {
        self.institution_id.as_deref()
    }

    pub fn msa_md_id(&self) -> Option<&str> {
        self.msa_md_id.as_deref()
    }

    pub fn report_id(&self) -> Option<&str> {
        self.report_id.as_deref()
    }

    pub fn stage(&self) -> Stage {
        match (
            &self.year,
            &self.institution_id,
            &self.msa_md_id,
            &self.report_id,
        ) {
            (None, ..) => Stage::NoYear,
            (Some(_), None, ..) => Stage::YearSelected,
            (Some(_), Some(_), None, _) => Stage::InstitutionSelected,
            (Some(_), Some(_), Some(_), None) => Stage::MsaMdSelected,
            (Some(_), Some(_), Some(_), Some(_)) => Stage::ReportSelected,
        }
    }

    /// Appends the next identifier; `None` once the report is chosen.
    pub fn child(&self, id: impl Into<String>) -> Option<Self> {
        let id = Some(id.into());
        let mut next = self.clone();
        match self.stage() {
            Stage::NoYear => next.year = id,
            Stage::YearSelected => next.institution_id = id,
            Stage::InstitutionSelected => next.msa_md_id = id,
            Stage::MsaMdSelected => next.report_id = id,
            Stage::ReportSelected => return None,
        }
        Some(next)
    }

    /// The path cut back to `stage`; paths already at or above it are
    /// returned unchanged.
    pub fn truncate(&self, stage: Stage) -> Self {
        let mut cut = self.clone();
        let depth = stage.depth();
        if depth < 4 {
            cut.report_id = None;
        }
        if depth < 3 {
            cut.msa_md_id = None;
        }
        if depth < 2 {
            cut.institution_id = None;
        }
        if depth < 1 {
            cut.year = None;
        }
        cut
    }

    pub fn lookup_key(&self) -> Option<LookupKey> {
        Some(LookupKey {
            institution_id: self.institution_id.clone()?,
            year: self.year.clone()?,
        })
    }

    pub fn report_key(&self) -> Option<ReportKey> {
        Some(ReportKey {
            year: self.year.clone()?,
            institution_id: self.institution_id.clone()?,
            msa_md_id: self.msa_md_id.clone()?,
            report_id: self.report_id.clone()?,
        })
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        [
            self.year(),
            self.institution_id(),
            self.msa_md_id(),
            self.report_id(),
        ]
        .into_iter()
        .flatten()
    }

    pub fn href(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for NavigationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(ROUTE_PREFIX)?;
        let mut empty = true;
        for segment in self.segments() {
            write!(f, "/{}", urlencoding::encode(segment))?;
            empty = false;
        }
        if empty {
            f.write_str("/")?;
        }
        Ok(())
    }
}
