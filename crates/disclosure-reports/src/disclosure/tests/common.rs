use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Semaphore;

use crate::disclosure::{
    InstitutionRecord, LookupError, LookupResponse, MsaMd, NavigationController, NavigationPath,
    PageView, RemoteLookup, ReportCatalog, SessionCache, YearPolicy,
};
use crate::reports::{CharacteristicSection, DispositionVector, IncomeBracket, ReportRecord};

/// Scripted lookup that records every call. A gated lookup holds every
/// request until [`FakeLookup::open_gate`]; permits return on drop.
#[derive(Default)]
pub(super) struct FakeLookup {
    responses: Mutex<HashMap<String, Result<LookupResponse, LookupError>>>,
    searchable: Mutex<Vec<InstitutionRecord>>,
    calls: Mutex<Vec<(String, String)>>,
    searches: AtomicUsize,
    gate: Option<Semaphore>,
}

impl FakeLookup {
    pub(super) fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        }
    }

    pub(super) fn respond(&self, institution_id: &str, result: Result<LookupResponse, LookupError>) {
        self.responses
            .lock()
            .expect("responses lock")
            .insert(institution_id.to_string(), result);
    }

    pub(super) fn searchable(&self, record: InstitutionRecord) {
        self.searchable.lock().expect("search lock").push(record);
    }

    pub(super) fn open_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub(super) fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub(super) fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteLookup for FakeLookup {
    async fn institution_msa_mds(
        &self,
        institution_id: &str,
        year: &str,
    ) -> Result<LookupResponse, LookupError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((institution_id.to_string(), year.to_string()));

        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.map_err(|_| LookupError::Interrupted)?;
        }

        self.responses
            .lock()
            .expect("responses lock")
            .get(institution_id)
            .cloned()
            .unwrap_or_else(|| Err(LookupError::NotFound(institution_id.to_string())))
    }

    async fn search_institutions(
        &self,
        query: &str,
        _year: &str,
    ) -> Result<Vec<InstitutionRecord>, LookupError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        let needle = query.to_lowercase();
        Ok(self
            .searchable
            .lock()
            .expect("search lock")
            .iter()
            .filter(|record| record.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }
}

pub(super) fn record(id: &str, name: &str) -> InstitutionRecord {
    InstitutionRecord {
        institution_id: Some(id.to_string()),
        name: name.to_string(),
        ..InstitutionRecord::default()
    }
}

pub(super) fn first_prairie() -> LookupResponse {
    LookupResponse {
        institution: record("LEI123", "First Prairie Bank"),
        msa_mds: vec![
            MsaMd::new("10180", "ABILENE, TX"),
            MsaMd::new("11100", "AMARILLO, TX"),
        ],
    }
}

pub(super) fn lookup_with_first_prairie() -> Arc<FakeLookup> {
    let lookup = FakeLookup::default();
    lookup.respond("LEI123", Ok(first_prairie()));
    Arc::new(lookup)
}

pub(super) fn controller(lookup: Arc<FakeLookup>) -> NavigationController<FakeLookup> {
    let catalog = ReportCatalog::standard().expect("bundled catalog builds");
    NavigationController::new(
        lookup,
        SessionCache::new(),
        Arc::new(catalog),
        YearPolicy::default(),
    )
}

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2019, 6, 1).expect("valid date")
}

pub(super) fn path(raw: &str) -> NavigationPath {
    NavigationPath::parse(raw)
}

pub(super) fn page(controller: &NavigationController<FakeLookup>) -> PageView {
    match controller.render_on(today()) {
        crate::disclosure::Rendered::Page(page) => page,
        other => panic!("expected a page, got {other:?}"),
    }
}

/// Drives the controller to `raw` and lets the lookup finish.
pub(super) async fn arrive(controller: &mut NavigationController<FakeLookup>, raw: &str) {
    controller.navigate(path(raw));
    controller.settle().await;
}

pub(super) fn income_record() -> ReportRecord {
    ReportRecord::new(vec![CharacteristicSection::income(vec![IncomeBracket {
        label: "Less than 50% of MSA/MD median".to_string(),
        dispositions: DispositionVector::from_pairs([
            (3, 420),
            (1, 95),
            (0, 0),
            (2, 310),
            (0, 0),
            (1, 120),
        ]),
    }])])
}
