use serde::Serialize;

use super::cache::CacheStats;
use super::catalog::ReportDescriptor;
use super::domain::{Institution, MsaMd};
use super::path::{NavigationPath, Stage};
use crate::reports::{ReportTable, TableLayout};

/// One of the four progress cards above the step content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressCard {
    pub title: &'static str,
    pub name: String,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearLink {
    pub year: String,
    pub supported: bool,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstitutionListItem {
    pub institution: Institution,
    pub identifier_label: &'static str,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MsaMdLink {
    pub id: String,
    pub name: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportLink {
    pub value: String,
    pub label: String,
    pub href: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ReportLink>,
}

/// Content for the current drill-down step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum StepView {
    YearSelector {
        years: Vec<YearLink>,
    },
    UnavailableYear {
        year: String,
        message: String,
    },
    InstitutionSearch {
        year: String,
        identifier_label: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        query: Option<String>,
        results: Vec<InstitutionListItem>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Loading {
        institution_id: String,
    },
    LookupFailed {
        institution_id: String,
        year: String,
        message: String,
        retry_href: String,
    },
    MsaMdSelector {
        institution: Institution,
        msa_mds: Vec<MsaMdLink>,
    },
    ReportSelector {
        msa_md: MsaMd,
        reports: Vec<ReportLink>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    YearSelector,
    UnavailableYear,
    InstitutionSearch,
    Loading,
    LookupFailed,
    MsaMdSelector,
    ReportSelector,
}

impl StepView {
    pub fn kind(&self) -> StepKind {
        match self {
            Self::YearSelector { .. } => StepKind::YearSelector,
            Self::UnavailableYear { .. } => StepKind::UnavailableYear,
            Self::InstitutionSearch { .. } => StepKind::InstitutionSearch,
            Self::Loading { .. } => StepKind::Loading,
            Self::LookupFailed { .. } => StepKind::LookupFailed,
            Self::MsaMdSelector { .. } => StepKind::MsaMdSelector,
            Self::ReportSelector { .. } => StepKind::ReportSelector,
        }
    }
}

/// Region next to the progress column once a report is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportViewer {
    pub report: ReportDescriptor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<TableLayout>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<ReportTable>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageView {
    pub path: String,
    pub stage: Stage,
    pub progress: Vec<ProgressCard>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<StepView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ReportViewer>,
    pub cache: CacheStats,
}

impl PageView {
    pub fn step_kind(&self) -> Option<StepKind> {
        self.step.as_ref().map(StepView::kind)
    }
}

/// A dependency the requested stage needs but cannot have.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "missing", content = "id", rename_all = "snake_case")]
pub enum MissingEntry {
    #[error("institution {0} has not been resolved")]
    Institution(String),
    #[error("MSA/MD {0} is not offered for this institution")]
    MsaMd(String),
    #[error("report {0} is not in the catalog for this area")]
    UnknownReport(String),
}

impl MissingEntry {
    /// Deepest stage that does not depend on the missing entry.
    pub const fn fallback_stage(&self) -> Stage {
        match self {
            Self::Institution(_) => Stage::YearSelected,
            Self::MsaMd(_) => Stage::InstitutionSelected,
            Self::UnknownReport(_) => Stage::MsaMdSelected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rendered {
    Page(PageView),
    Redirect {
        to: NavigationPath,
        location: String,
        reason: MissingEntry,
    },
}

impl Rendered {
    pub fn page(&self) -> Option<&PageView> {
        match self {
            Self::Page(page) => Some(page),
            Self::Redirect { .. } => None,
        }
    }

    pub fn into_page(self) -> Option<PageView> {
        match self {
            Self::Page(page) => Some(page),
            Self::Redirect { .. } => None,
        }
    }
}
