use std::fmt;

use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// Outcome categories in the order every disclosure table lays them out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Originated,
    ApprovedNotAccepted,
    Denied,
    Withdrawn,
    ClosedIncomplete,
    Purchased,
}

impl Disposition {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::Originated,
            Self::ApprovedNotAccepted,
            Self::Denied,
            Self::Withdrawn,
            Self::ClosedIncomplete,
            Self::Purchased,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Originated => "Loans Originated",
            Self::ApprovedNotAccepted => "Apps. Approved But Not Accepted",
            Self::Denied => "Applications Denied",
            Self::Withdrawn => "Applications Withdrawn",
            Self::ClosedIncomplete => "Files Closed for Incompleteness",
            Self::Purchased => "Purchased Loans",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Originated => 0,
            Self::ApprovedNotAccepted => 1,
            Self::Denied => 2,
            Self::Withdrawn => 3,
            Self::ClosedIncomplete => 4,
            Self::Purchased => 5,
        }
    }

    /// Accepts the printed column label, the snake_case key, or the
    /// "Loans Purchased" spelling used by older report exports.
    pub fn from_name(raw: &str) -> Option<Self> {
        let wanted = squash(raw);
        Self::ordered().into_iter().find(|disposition| {
            squash(disposition.label()) == wanted
                || squash(disposition.key()) == wanted
                || (*disposition == Self::Purchased && wanted == "loanspurchased")
        })
    }

    const fn key(self) -> &'static str {
        match self {
            Self::Originated => "originated",
            Self::ApprovedNotAccepted => "approved_not_accepted",
            Self::Denied => "denied",
            Self::Withdrawn => "withdrawn",
            Self::ClosedIncomplete => "closed_incomplete",
            Self::Purchased => "purchased",
        }
    }
}

fn squash(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Application count and dollar amount for one disposition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispositionPair {
    pub count: u64,
    pub value: u64,
}

impl DispositionPair {
    pub const fn new(count: u64, value: u64) -> Self {
        Self { count, value }
    }
}

/// The six disposition pairs carried by every row of a report, regardless of
/// how deeply the row is nested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<DispositionEntry>", into = "Vec<DispositionEntry>")]
pub struct DispositionVector([DispositionPair; 6]);

impl DispositionVector {
    pub const fn new(pairs: [DispositionPair; 6]) -> Self {
        Self(pairs)
    }

    pub fn from_pairs(pairs: [(u64, u64); 6]) -> Self {
        Self(pairs.map(|(count, value)| DispositionPair::new(count, value)))
    }

    pub fn get(&self, disposition: Disposition) -> DispositionPair {
        self.0[disposition.index()]
    }

    /// Pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (Disposition, DispositionPair)> + '_ {
        Disposition::ordered()
            .into_iter()
            .map(move |disposition| (disposition, self.get(disposition)))
    }
}

/// Wire form of one disposition: the name is optional, in which case the
/// entry's position decides the category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispositionEntry {
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "dispositionName")]
    pub disposition: Option<String>,
    pub count: u64,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispositionError {
    #[error("expected 6 dispositions, found {0}")]
    WrongLength(usize),
    #[error("unknown disposition '{0}'")]
    Unknown(String),
    #[error("disposition '{0}' appears more than once")]
    Duplicate(&'static str),
}

impl TryFrom<Vec<DispositionEntry>> for DispositionVector {
    type Error = DispositionError;

    fn try_from(entries: Vec<DispositionEntry>) -> Result<Self, Self::Error> {
        if entries.len() != 6 {
            return Err(DispositionError::WrongLength(entries.len()));
        }

        let positional = Disposition::ordered();
        let mut slots: [Option<DispositionPair>; 6] = [None; 6];
        for (position, entry) in entries.into_iter().enumerate() {
            let disposition = match entry.disposition.as_deref() {
                Some(name) => Disposition::from_name(name)
                    .ok_or_else(|| DispositionError::Unknown(name.to_string()))?,
                None => positional[position],
            };
            let slot = &mut slots[disposition.index()];
            if slot.is_some() {
                return Err(DispositionError::Duplicate(disposition.label()));
            }
            *slot = Some(DispositionPair::new(entry.count, entry.value));
        }

        // Six entries with no duplicates fill every slot.
        Ok(Self(slots.map(Option::unwrap_or_default)))
    }
}

impl From<DispositionVector> for Vec<DispositionEntry> {
    fn from(vector: DispositionVector) -> Self {
        vector
            .iter()
            .map(|(disposition, pair)| DispositionEntry {
                disposition: Some(disposition.label().to_string()),
                count: pair.count,
                value: pair.value,
            })
            .collect()
    }
}

/// Borrower characteristic a report section is broken down by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CharacteristicKey {
    Race,
    Ethnicity,
    MinorityStatus,
    Income,
}

impl CharacteristicKey {
    /// Report JSON names sections by the plural of the characteristic.
    pub fn from_field(field: &str) -> Option<Self> {
        match field {
            "races" | "race" => Some(Self::Race),
            "ethnicities" | "ethnicity" => Some(Self::Ethnicity),
            "minorityStatuses" | "minorityStatus" => Some(Self::MinorityStatus),
            "incomes" | "income" => Some(Self::Income),
            _ => None,
        }
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::Race => "race",
            Self::Ethnicity => "ethnicity",
            Self::MinorityStatus => "minorityStatus",
            Self::Income => "income",
        }
    }

    pub fn title(self) -> String {
        match self {
            Self::MinorityStatus => "MINORITY STATUS".to_string(),
            other => other.key().to_ascii_uppercase(),
        }
    }

    pub const fn is_income(self) -> bool {
        matches!(self, Self::Income)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IncomeBracket {
    #[serde(alias = "income")]
    pub label: String,
    pub dispositions: DispositionVector,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GenderBreakdown {
    pub gender: String,
    pub dispositions: DispositionVector,
}

/// One characteristic value (e.g. a race) with its gender rows and the
/// value's own totals as published in the report.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CharacteristicBreakdown {
    #[serde(alias = "race", alias = "ethnicity", alias = "minorityStatus")]
    pub label: String,
    #[serde(default, alias = "gender")]
    pub genders: Vec<GenderBreakdown>,
    pub dispositions: DispositionVector,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionRows {
    Brackets(Vec<IncomeBracket>),
    Characteristics(Vec<CharacteristicBreakdown>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicSection {
    pub key: CharacteristicKey,
    pub rows: SectionRows,
}

impl CharacteristicSection {
    pub fn income(brackets: Vec<IncomeBracket>) -> Self {
        Self {
            key: CharacteristicKey::Income,
            rows: SectionRows::Brackets(brackets),
        }
    }

    pub fn characteristic(key: CharacteristicKey, values: Vec<CharacteristicBreakdown>) -> Self {
        Self {
            key,
            rows: SectionRows::Characteristics(values),
        }
    }
}

/// A published aggregate report. Sections keep the order the source
/// document lists them in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportRecord {
    pub table: Option<String>,
    pub description: Option<String>,
    pub sections: Vec<CharacteristicSection>,
}

impl ReportRecord {
    pub fn new(sections: Vec<CharacteristicSection>) -> Self {
        Self {
            sections,
            ..Self::default()
        }
    }
}

impl<'de> Deserialize<'de> for ReportRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(ReportRecordVisitor)
    }
}

struct ReportRecordVisitor;

impl<'de> Visitor<'de> for ReportRecordVisitor {
    type Value = ReportRecord;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a disclosure report object")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut record = ReportRecord::default();

        while let Some(field) = map.next_key::<String>()? {
            match field.as_str() {
                "table" => record.table = map.next_value()?,
                "description" => record.description = map.next_value()?,
                other => match CharacteristicKey::from_field(other) {
                    Some(CharacteristicKey::Income) => {
                        let brackets = map.next_value()?;
                        record.sections.push(CharacteristicSection::income(brackets));
                    }
                    Some(key) => {
                        let values = map.next_value()?;
                        record
                            .sections
                            .push(CharacteristicSection::characteristic(key, values));
                    }
                    None => {
                        map.next_value::<IgnoredAny>()?;
                    }
                },
            }
        }

        Ok(record)
    }
}
