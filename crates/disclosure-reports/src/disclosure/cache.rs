use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;

use super::domain::{Institution, MsaMd};
use super::path::{LookupKey, ReportKey};
use crate::reports::ReportRecord;

#[derive(Debug, Default)]
struct CacheTables {
    institutions: HashMap<String, Institution>,
    msa_mds: HashMap<String, MsaMd>,
    reports: HashMap<ReportKey, Arc<ReportRecord>>,
    candidates: HashMap<LookupKey, Vec<MsaMd>>,
}

/// Entry counts, for logs and the JSON view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub institutions: usize,
    pub msa_mds: usize,
    pub reports: usize,
    pub candidate_lists: usize,
}

/// Session-scoped store of everything resolved while drilling down.
///
/// Entries are only ever added or replaced (last write wins for a key) until
/// [`SessionCache::reset`]. Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct SessionCache {
    tables: Arc<RwLock<CacheTables>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    // A writer that panicked cannot leave a table half-updated: every write
    // is a single map insert or clear.
    fn read(&self) -> RwLockReadGuard<'_, CacheTables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheTables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert_institution(&self, id: impl Into<String>, institution: Institution) {
        self.write().institutions.insert(id.into(), institution);
    }

    pub fn institution(&self, id: &str) -> Option<Institution> {
        self.read().institutions.get(id).cloned()
    }

    pub fn insert_msa_md(&self, msa_md: MsaMd) {
        self.write().msa_mds.insert(msa_md.id.clone(), msa_md);
    }

    pub fn msa_md(&self, id: &str) -> Option<MsaMd> {
        self.read().msa_mds.get(id).cloned()
    }

    pub fn insert_candidates(&self, key: LookupKey, msa_mds: Vec<MsaMd>) {
        self.write().candidates.insert(key, msa_mds);
    }

    /// MSA/MDs offered for an institution in a year, nationwide included.
    pub fn candidates(&self, key: &LookupKey) -> Option<Vec<MsaMd>> {
        self.read().candidates.get(key).cloned()
    }

    pub fn has_candidates(&self, key: &LookupKey) -> bool {
        self.read().candidates.contains_key(key)
    }

    pub fn insert_report(&self, key: ReportKey, record: ReportRecord) {
        self.write().reports.insert(key, Arc::new(record));
    }

    pub fn report(&self, key: &ReportKey) -> Option<Arc<ReportRecord>> {
        self.read().reports.get(key).cloned()
    }

    pub fn has_report(&self, key: &ReportKey) -> bool {
        self.read().reports.contains_key(key)
    }

    pub fn stats(&self) -> CacheStats {
        let tables = self.read();
        CacheStats {
            institutions: tables.institutions.len(),
            msa_mds: tables.msa_mds.len(),
            reports: tables.reports.len(),
            candidate_lists: tables.candidates.len(),
        }
    }

    pub fn reset(&self) {
        let mut tables = self.write();
        tables.institutions.clear();
        tables.msa_mds.clear();
        tables.reports.clear();
        tables.candidates.clear();
        tracing::debug!("session cache reset");
    }
}
