//! Drill-down navigation over published disclosure reports: year, then
//! institution, then MSA/MD, then report.

pub mod cache;
pub mod catalog;
pub mod controller;
pub mod domain;
mod html;
pub mod lookup;
pub mod path;
pub mod source;
pub mod views;

#[cfg(test)]
mod tests;

pub use cache::{CacheStats, SessionCache};
pub use catalog::{CatalogError, ReportCatalog, ReportDescriptor, ReportGroup};
pub use controller::{
    CompletionOutcome, FetchStatus, LookupCompletion, NavigationController, SelectionError,
    DEFAULT_LOOKUP_TIMEOUT,
};
pub use domain::{
    IdentifierScheme, Institution, InstitutionRecord, MsaMd, YearOption, YearPolicy, NATIONWIDE,
};
pub use lookup::{LookupError, LookupResponse, RemoteLookup};
pub use path::{LookupKey, NavigationPath, ReportKey, Stage, ROUTE_PREFIX};
pub use source::{FixtureDataSource, FixtureError};
pub use views::{
    InstitutionListItem, MissingEntry, MsaMdLink, PageView, ProgressCard, Rendered, ReportLink,
    ReportViewer, StepKind, StepView, YearLink,
};
