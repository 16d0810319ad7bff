use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::cache::SessionCache;
use super::catalog::{ReportCatalog, ReportDescriptor};
use super::domain::{Institution, MsaMd, YearPolicy, NATIONWIDE};
use super::lookup::{LookupError, LookupResponse, RemoteLookup};
use super::path::{LookupKey, NavigationPath, ReportKey, Stage};
use super::views::{
    InstitutionListItem, MissingEntry, MsaMdLink, PageView, ProgressCard, Rendered, ReportLink,
    ReportViewer, StepView, YearLink,
};
use crate::reports::ReportRecord;

pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of a lookup task, tagged with the request it answers.
#[derive(Debug)]
pub struct LookupCompletion {
    pub ticket: u64,
    pub key: LookupKey,
    pub result: Result<LookupResponse, LookupError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    Applied,
    /// The user moved on, or a newer request superseded this one.
    Stale,
}

/// Externally visible lookup state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    Idle,
    Pending { ticket: u64, key: LookupKey },
    Failed { key: LookupKey, error: LookupError },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("cannot select from {actual:?}, expected {expected:?}")]
    WrongStage { expected: Stage, actual: Stage },
    #[error("report {0} is not in the catalog")]
    UnknownReport(String),
}

enum FetchState {
    Idle,
    Pending {
        ticket: u64,
        key: LookupKey,
        task: JoinHandle<Result<LookupResponse, LookupError>>,
    },
    Failed {
        key: LookupKey,
        error: LookupError,
    },
}

struct SearchState {
    year: String,
    query: String,
    outcome: Result<Vec<Institution>, LookupError>,
}

/// Drives one session through year → institution → MSA/MD → report.
///
/// The path is owned by the host (usually the request URL) and handed in
/// through [`NavigationController::navigate`]. At most one institution
/// lookup is in flight; results that arrive for a path the user has left are
/// discarded.
pub struct NavigationController<L> {
    lookup: Arc<L>,
    cache: SessionCache,
    catalog: Arc<ReportCatalog>,
    policy: YearPolicy,
    lookup_timeout: Duration,
    path: NavigationPath,
    fetch: FetchState,
    next_ticket: u64,
    search: Option<SearchState>,
}

impl<L: RemoteLookup + 'static> NavigationController<L> {
    pub fn new(
        lookup: Arc<L>,
        cache: SessionCache,
        catalog: Arc<ReportCatalog>,
        policy: YearPolicy,
    ) -> Self {
        Self {
            lookup,
            cache,
            catalog,
            policy,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            path: NavigationPath::root(),
            fetch: FetchState::Idle,
            next_ticket: 0,
            search: None,
        }
    }

    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    pub fn path(&self) -> &NavigationPath {
        &self.path
    }

    pub fn stage(&self) -> Stage {
        self.path.stage()
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    pub fn catalog(&self) -> &ReportCatalog {
        &self.catalog
    }

    pub fn policy(&self) -> &YearPolicy {
        &self.policy
    }

    pub fn fetch_status(&self) -> FetchStatus {
        match &self.fetch {
            FetchState::Idle => FetchStatus::Idle,
            FetchState::Pending { ticket, key, .. } => FetchStatus::Pending {
                ticket: *ticket,
                key: key.clone(),
            },
            FetchState::Failed { key, error } => FetchStatus::Failed {
                key: key.clone(),
                error: error.clone(),
            },
        }
    }

    /// Moves to `path`, starting or abandoning the institution lookup as the
    /// new path requires.
    pub fn navigate(&mut self, path: NavigationPath) {
        if path != self.path {
            debug!(from = %self.path, to = %path, "navigating");
        }
        self.path = path;

        if self
            .search
            .as_ref()
            .is_some_and(|search| self.path.year() != Some(search.year.as_str()))
        {
            self.search = None;
        }

        if self.path.msa_md_id() == Some(NATIONWIDE) {
            self.cache.insert_msa_md(MsaMd::nationwide());
        }

        self.sync_lookup();
        self.cache_selected_msa_md();
    }

    /// Clears the session: cache, lookup, search and path.
    pub fn reset(&mut self) {
        self.cancel_lookup();
        self.search = None;
        self.cache.reset();
        self.path = NavigationPath::root();
        info!("navigation session reset");
    }

    fn sync_lookup(&mut self) {
        let wanted = self
            .path
            .lookup_key()
            .filter(|key| self.policy.is_supported(&key.year));

        let still_relevant = match (&self.fetch, &wanted) {
            (FetchState::Idle, _) => true,
            (
                FetchState::Pending { key, .. } | FetchState::Failed { key, .. },
                Some(wanted),
            ) => key == wanted,
            (_, None) => false,
        };
        if !still_relevant {
            self.cancel_lookup();
        }

        let Some(key) = wanted else {
            return;
        };
        // A pending or failed lookup for this key stays until it settles or
        // is retried.
        if !matches!(self.fetch, FetchState::Idle) || self.is_resolved(&key) {
            return;
        }
        self.start_lookup(key);
    }

    fn is_resolved(&self, key: &LookupKey) -> bool {
        self.cache.has_candidates(key) && self.cache.institution(&key.institution_id).is_some()
    }

    fn start_lookup(&mut self, key: LookupKey) {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let lookup = Arc::clone(&self.lookup);
        let timeout = self.lookup_timeout;
        let request = key.clone();

        info!(
            ticket,
            institution_id = %key.institution_id,
            year = %key.year,
            "starting institution lookup"
        );

        let task = tokio::spawn(async move {
            let call = lookup.institution_msa_mds(&request.institution_id, &request.year);
            match tokio::time::timeout(timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(LookupError::Timeout(millis(timeout))),
            }
        });

        self.fetch = FetchState::Pending { ticket, key, task };
    }

    fn cancel_lookup(&mut self) {
        if let FetchState::Pending { ticket, task, .. } = &self.fetch {
            debug!(ticket, "abandoning institution lookup");
            task.abort();
        }
        self.fetch = FetchState::Idle;
    }

    /// Waits for the in-flight lookup, if any, and applies its result.
    pub async fn settle(&mut self) -> Option<CompletionOutcome> {
        let (ticket, key, joined) = match &mut self.fetch {
            FetchState::Pending { ticket, key, task } => (*ticket, key.clone(), task.await),
            _ => return None,
        };

        let result = joined.unwrap_or_else(|err| {
            warn!(ticket, error = %err, "institution lookup task ended abnormally");
            Err(LookupError::Interrupted)
        });

        Some(self.apply_completion(LookupCompletion {
            ticket,
            key,
            result,
        }))
    }

    /// Applies a lookup result only if it answers the outstanding request for
    /// the current path.
    pub fn apply_completion(&mut self, completion: LookupCompletion) -> CompletionOutcome {
        let LookupCompletion {
            ticket,
            key,
            result,
        } = completion;

        let outstanding = matches!(
            &self.fetch,
            FetchState::Pending { ticket: current, .. } if *current == ticket
        );
        let on_path = self.path.lookup_key().as_ref() == Some(&key);
        if !(outstanding && on_path) {
            debug!(
                ticket,
                institution_id = %key.institution_id,
                year = %key.year,
                "discarding stale lookup result"
            );
            return CompletionOutcome::Stale;
        }

        self.fetch = match result.and_then(|response| self.store_lookup(&key, response)) {
            Ok(()) => FetchState::Idle,
            Err(error) => {
                warn!(
                    ticket,
                    institution_id = %key.institution_id,
                    year = %key.year,
                    %error,
                    "institution lookup failed"
                );
                FetchState::Failed { key, error }
            }
        };
        CompletionOutcome::Applied
    }

    fn store_lookup(&self, key: &LookupKey, response: LookupResponse) -> Result<(), LookupError> {
        let scheme = self.policy.scheme_for(&key.year);
        let institution = response
            .institution
            .normalize(scheme)
            .ok_or(LookupError::MissingIdentifier(scheme.label()))?;

        if institution.id != key.institution_id {
            self.cache
                .insert_institution(institution.id.clone(), institution.clone());
        }
        self.cache
            .insert_institution(key.institution_id.clone(), institution);

        let mut msa_mds = response.msa_mds;
        msa_mds.retain(|msa_md| !msa_md.is_nationwide());
        msa_mds.push(MsaMd::nationwide());
        debug!(
            institution_id = %key.institution_id,
            msa_mds = msa_mds.len(),
            "institution lookup stored"
        );
        self.cache.insert_candidates(key.clone(), msa_mds);
        self.cache_selected_msa_md();
        Ok(())
    }

    fn cache_selected_msa_md(&self) {
        let (Some(key), Some(id)) = (self.path.lookup_key(), self.path.msa_md_id()) else {
            return;
        };
        let selected = self
            .cache
            .candidates(&key)
            .and_then(|candidates| candidates.into_iter().find(|msa_md| msa_md.id == id));
        if let Some(msa_md) = selected {
            self.cache.insert_msa_md(msa_md);
        }
    }

    /// Re-issues the failed lookup for the current path. Returns whether a
    /// request was started.
    pub fn retry(&mut self) -> bool {
        let key = match &self.fetch {
            FetchState::Failed { key, .. } => key.clone(),
            _ => return false,
        };
        if self.path.lookup_key().as_ref() != Some(&key) {
            return false;
        }
        info!(institution_id = %key.institution_id, year = %key.year, "retrying institution lookup");
        self.fetch = FetchState::Idle;
        self.start_lookup(key);
        true
    }

    /// Runs an institution search for the selected year. Ignored outside the
    /// institution prompt; a blank query clears previous results.
    pub async fn search(&mut self, query: &str) {
        let Some(year) = self.path.year().map(str::to_string) else {
            return;
        };
        if self.path.stage() != Stage::YearSelected || !self.policy.is_supported(&year) {
            debug!(path = %self.path, "search ignored outside the institution prompt");
            return;
        }

        let query = query.trim();
        if query.is_empty() {
            self.search = None;
            return;
        }

        let scheme = self.policy.scheme_for(&year);
        let call = self.lookup.search_institutions(query, &year);
        let outcome = match tokio::time::timeout(self.lookup_timeout, call).await {
            Ok(Ok(records)) => Ok(records
                .iter()
                .filter_map(|record| record.normalize(scheme))
                .collect::<Vec<_>>()),
            Ok(Err(error)) => Err(error),
            Err(_) => Err(LookupError::Timeout(millis(self.lookup_timeout))),
        };

        match &outcome {
            Ok(found) => debug!(%query, %year, results = found.len(), "institution search"),
            Err(error) => warn!(%query, %year, %error, "institution search failed"),
        }

        self.search = Some(SearchState {
            year,
            query: query.to_string(),
            outcome,
        });
    }

    fn expect_stage(&self, expected: Stage) -> Result<(), SelectionError> {
        let actual = self.path.stage();
        if actual == expected {
            Ok(())
        } else {
            Err(SelectionError::WrongStage { expected, actual })
        }
    }

    fn descend(&self, id: &str) -> Result<NavigationPath, SelectionError> {
        self.path.child(id).ok_or_else(|| SelectionError::WrongStage {
            expected: Stage::MsaMdSelected,
            actual: self.path.stage(),
        })
    }

    /// Path to navigate to for `year`.
    pub fn select_year(&self, year: &str) -> Result<NavigationPath, SelectionError> {
        self.expect_stage(Stage::NoYear)?;
        self.descend(year)
    }

    /// Caches the chosen institution and returns the path to navigate to.
    pub fn select_institution(
        &self,
        institution: &Institution,
    ) -> Result<NavigationPath, SelectionError> {
        self.expect_stage(Stage::YearSelected)?;
        self.cache
            .insert_institution(institution.id.clone(), institution.clone());
        self.descend(&institution.id)
    }

    pub fn select_msa_md(&self, msa_md: &MsaMd) -> Result<NavigationPath, SelectionError> {
        self.expect_stage(Stage::InstitutionSelected)?;
        self.cache.insert_msa_md(msa_md.clone());
        self.descend(&msa_md.id)
    }

    pub fn select_report(&self, report_id: &str) -> Result<NavigationPath, SelectionError> {
        self.expect_stage(Stage::MsaMdSelected)?;
        if self.catalog.resolve(report_id).is_none() {
            return Err(SelectionError::UnknownReport(report_id.to_string()));
        }
        self.descend(report_id)
    }

    /// Report record the current path shows but the cache lacks.
    pub fn missing_report(&self) -> Option<ReportKey> {
        self.path
            .report_key()
            .filter(|key| !self.cache.has_report(key))
    }

    /// Stores a report record for the current path. Returns false when the
    /// path names no report.
    pub fn cache_report(&self, record: ReportRecord) -> bool {
        match self.path.report_key() {
            Some(key) => {
                self.cache.insert_report(key, record);
                true
            }
            None => false,
        }
    }

    pub fn render(&self) -> Rendered {
        self.render_on(Local::now().date_naive())
    }

    /// Builds the view for the current path. Stages whose dependencies are
    /// missing redirect to the deepest stage that can still be shown.
    pub fn render_on(&self, today: NaiveDate) -> Rendered {
        match self.content(today) {
            Ok((step, report)) => Rendered::Page(PageView {
                path: self.path.href(),
                stage: self.path.stage(),
                progress: self.progress_cards(),
                step,
                report,
                cache: self.cache.stats(),
            }),
            Err(reason) => {
                let to = self.path.truncate(reason.fallback_stage());
                warn!(from = %self.path, to = %to, %reason, "redirecting");
                Rendered::Redirect {
                    location: to.href(),
                    to,
                    reason,
                }
            }
        }
    }

    fn content(
        &self,
        today: NaiveDate,
    ) -> Result<(Option<StepView>, Option<ReportViewer>), MissingEntry> {
        let path = &self.path;
        let Some(year) = path.year() else {
            return Ok((Some(self.year_selector(today)), None));
        };
        if !self.policy.is_supported(year) {
            let step = StepView::UnavailableYear {
                year: year.to_string(),
                message: YearPolicy::unavailable_message(year),
            };
            return Ok((Some(step), None));
        }
        let Some(key) = path.lookup_key() else {
            return Ok((Some(self.institution_search(year)), None));
        };

        match &self.fetch {
            FetchState::Pending { key: pending, .. } if *pending == key => {
                let step = StepView::Loading {
                    institution_id: key.institution_id,
                };
                return Ok((Some(step), None));
            }
            FetchState::Failed { key: failed, error } if *failed == key => {
                let step = StepView::LookupFailed {
                    institution_id: key.institution_id,
                    year: key.year,
                    message: error.to_string(),
                    retry_href: format!("{}?retry=1", path.href()),
                };
                return Ok((Some(step), None));
            }
            _ => {}
        }

        let institution = self
            .cache
            .institution(&key.institution_id)
            .ok_or_else(|| MissingEntry::Institution(key.institution_id.clone()))?;
        let candidates = self
            .cache
            .candidates(&key)
            .ok_or_else(|| MissingEntry::Institution(key.institution_id.clone()))?;

        let Some(msa_md_id) = path.msa_md_id() else {
            let msa_mds = candidates
                .iter()
                .filter_map(|msa_md| {
                    path.child(msa_md.id.as_str()).map(|next| MsaMdLink {
                        id: msa_md.id.clone(),
                        name: msa_md.display_name().to_string(),
                        href: next.href(),
                    })
                })
                .collect();
            return Ok((
                Some(StepView::MsaMdSelector {
                    institution,
                    msa_mds,
                }),
                None,
            ));
        };

        let msa_md = self
            .cache
            .msa_md(msa_md_id)
            .filter(|_| candidates.iter().any(|candidate| candidate.id == msa_md_id))
            .ok_or_else(|| MissingEntry::MsaMd(msa_md_id.to_string()))?;

        let Some(report_id) = path.report_id() else {
            let reports = self
                .catalog
                .group_for(&msa_md)
                .map(|group| report_links(path, &group.reports))
                .unwrap_or_default();
            return Ok((Some(StepView::ReportSelector { msa_md, reports }), None));
        };

        let expected_group = self.catalog.group_for(&msa_md).map(|group| &group.group);
        let descriptor = self
            .catalog
            .resolve(report_id)
            .filter(|descriptor| descriptor.group.as_ref() == expected_group)
            .ok_or_else(|| MissingEntry::UnknownReport(report_id.to_string()))?;

        let layout = self.catalog.table_layout(&descriptor.value);
        let record = path.report_key().and_then(|key| self.cache.report(&key));
        let table = layout.and_then(|layout| layout.render(record.as_deref()));

        let viewer = ReportViewer {
            report: ReportDescriptor {
                options: Vec::new(),
                ..descriptor.clone()
            },
            layout,
            table,
        };
        Ok((None, Some(viewer)))
    }

    fn year_selector(&self, today: NaiveDate) -> StepView {
        let root = NavigationPath::root();
        let years = self
            .policy
            .selectable_years(today)
            .into_iter()
            .filter_map(|option| {
                root.child(option.year.as_str()).map(|next| YearLink {
                    href: next.href(),
                    year: option.year,
                    supported: option.supported,
                })
            })
            .collect();
        StepView::YearSelector { years }
    }

    fn institution_search(&self, year: &str) -> StepView {
        let scheme = self.policy.scheme_for(year);
        let search = self.search.as_ref().filter(|search| search.year == year);

        let (results, error) = match search.map(|search| &search.outcome) {
            Some(Ok(found)) => (
                found
                    .iter()
                    .filter_map(|institution| {
                        self.path
                            .child(institution.id.as_str())
                            .map(|next| InstitutionListItem {
                                institution: institution.clone(),
                                identifier_label: scheme.label(),
                                href: next.href(),
                            })
                    })
                    .collect(),
                None,
            ),
            Some(Err(error)) => (Vec::new(), Some(error.to_string())),
            None => (Vec::new(), None),
        };

        StepView::InstitutionSearch {
            year: year.to_string(),
            identifier_label: scheme.label(),
            query: search.map(|search| search.query.clone()),
            results,
            error,
        }
    }

    fn progress_cards(&self) -> Vec<ProgressCard> {
        let path = &self.path;
        let institution = path
            .institution_id()
            .map(|id| (self.cache.institution(id), id));
        let msa_md = path.msa_md_id().map(|id| (self.cache.msa_md(id), id));
        let report = path
            .report_id()
            .map(|id| (self.catalog.resolve(id), id));

        vec![
            card(
                "year",
                path.year().map(|year| (year.to_string(), String::new())),
                Some(Stage::NoYear.label()),
                Some(NavigationPath::root().href()),
            ),
            card(
                "institution",
                institution.map(|(found, id)| {
                    let name = found.map_or_else(|| id.to_string(), |found| found.name);
                    (name, id.to_string())
                }),
                path.year().map(|_| Stage::YearSelected.label()),
                path.year()
                    .map(|_| path.truncate(Stage::YearSelected).href()),
            ),
            card(
                "MSA/MD",
                msa_md.map(|(found, id)| {
                    let name = found.map_or_else(
                        || id.to_string(),
                        |found| found.display_name().to_string(),
                    );
                    (name, id.to_string())
                }),
                path.institution_id()
                    .map(|_| Stage::InstitutionSelected.label()),
                path.institution_id()
                    .map(|_| path.truncate(Stage::InstitutionSelected).href()),
            ),
            card(
                "report",
                report.map(|(found, id)| {
                    let name = found.map_or_else(|| id.to_string(), |found| found.label.clone());
                    (name, id.to_string())
                }),
                path.msa_md_id().map(|_| Stage::MsaMdSelected.label()),
                path.msa_md_id()
                    .map(|_| path.truncate(Stage::MsaMdSelected).href()),
            ),
        ]
    }
}

impl<L> Drop for NavigationController<L> {
    fn drop(&mut self) {
        if let FetchState::Pending { task, .. } = &self.fetch {
            task.abort();
        }
    }
}

fn card(
    title: &'static str,
    selected: Option<(String, String)>,
    prompt: Option<&str>,
    link: Option<String>,
) -> ProgressCard {
    let (name, id) =
        selected.unwrap_or_else(|| (prompt.unwrap_or_default().to_string(), String::new()));
    ProgressCard {
        title,
        name,
        id,
        link,
    }
}

fn report_links(path: &NavigationPath, descriptors: &[ReportDescriptor]) -> Vec<ReportLink> {
    descriptors
        .iter()
        .filter_map(|descriptor| {
            path.child(descriptor.value.as_str()).map(|next| ReportLink {
                value: descriptor.value.clone(),
                label: descriptor.label.clone(),
                href: next.href(),
                options: report_links(path, &descriptor.options),
            })
        })
        .collect()
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disclosure::source::FixtureDataSource;

    #[tokio::test]
    async fn descending_past_the_report_names_the_actual_stage() {
        let source = FixtureDataSource::from_json(include_str!(
            "../../tests/fixtures/disclosure.json"
        ))
        .expect("fixture loads");
        let mut controller = NavigationController::new(
            Arc::new(source),
            SessionCache::new(),
            Arc::new(ReportCatalog::standard().expect("bundled catalog")),
            YearPolicy::default(),
        );

        controller.navigate(NavigationPath::parse("2017/LEI123/10180"));
        assert!(controller.descend("aggregate-3").is_ok());

        controller.navigate(NavigationPath::parse("2017/LEI123/10180/aggregate-3"));
        assert_eq!(
            controller.descend("extra"),
            Err(SelectionError::WrongStage {
                expected: Stage::MsaMdSelected,
                actual: Stage::ReportSelected,
            })
        );
    }
}
