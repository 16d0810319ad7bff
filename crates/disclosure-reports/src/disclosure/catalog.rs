use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::domain::MsaMd;
use crate::reports::TableLayout;

const STANDARD_CATALOG: &str = include_str!("catalog.json");

/// Group offered for an ordinary MSA/MD.
pub const MSA_GROUP: &str = "msa";
/// Group offered for the nationwide pseudo MSA/MD.
pub const NATIONWIDE_GROUP: &str = "nationwide";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDescriptor {
    pub value: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ReportDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportGroup {
    pub group: String,
    pub reports: Vec<ReportDescriptor>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("report catalog is not valid json: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("report id '{0}' appears more than once in the catalog")]
    DuplicateId(String),
    #[error("report catalog entry '{0}' has an empty id")]
    EmptyId(String),
}

/// Immutable id → descriptor index over the two-level report configuration.
#[derive(Debug, Clone)]
pub struct ReportCatalog {
    groups: Vec<ReportGroup>,
    index: HashMap<String, ReportDescriptor>,
}

impl ReportCatalog {
    /// The catalog shipped with the crate.
    pub fn standard() -> Result<Self, CatalogError> {
        Self::from_json(STANDARD_CATALOG)
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let groups: Vec<ReportGroup> = serde_json::from_str(raw)?;
        Self::build(groups)
    }

    /// Stamps each descriptor with its group and flattens both levels into
    /// one index. Ids must be unique across groups and levels.
    pub fn build(mut groups: Vec<ReportGroup>) -> Result<Self, CatalogError> {
        let mut index = HashMap::new();

        for group in &mut groups {
            for entry in &mut group.reports {
                entry.group = Some(group.group.clone());
                for option in &mut entry.options {
                    option.group = Some(group.group.clone());
                    register(&mut index, option)?;
                }
                register(&mut index, entry)?;
            }
        }

        tracing::debug!(reports = index.len(), "report catalog built");
        Ok(Self { groups, index })
    }

    pub fn resolve(&self, report_id: &str) -> Option<&ReportDescriptor> {
        self.index.get(report_id)
    }

    /// Table renderer for a catalog report, if it has one.
    pub fn table_layout(&self, report_id: &str) -> Option<TableLayout> {
        self.resolve(report_id)
            .and_then(|descriptor| TableLayout::for_report(&descriptor.value))
    }

    pub fn groups(&self) -> &[ReportGroup] {
        &self.groups
    }

    pub fn group(&self, key: &str) -> Option<&ReportGroup> {
        self.groups.iter().find(|group| group.group == key)
    }

    /// The group a report selector shows for the chosen MSA/MD.
    pub fn group_for(&self, msa_md: &MsaMd) -> Option<&ReportGroup> {
        let key = if msa_md.is_nationwide() {
            NATIONWIDE_GROUP
        } else {
            MSA_GROUP
        };
        self.group(key)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

fn register(
    index: &mut HashMap<String, ReportDescriptor>,
    descriptor: &ReportDescriptor,
) -> Result<(), CatalogError> {
    if descriptor.value.trim().is_empty() {
        return Err(CatalogError::EmptyId(descriptor.label.clone()));
    }
    if index
        .insert(descriptor.value.clone(), descriptor.clone())
        .is_some()
    {
        return Err(CatalogError::DuplicateId(descriptor.value.clone()));
    }
    Ok(())
}
