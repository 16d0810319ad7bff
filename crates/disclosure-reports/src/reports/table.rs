use serde::Serialize;

use super::record::{
    CharacteristicSection, Disposition, DispositionVector, ReportRecord, SectionRows,
};

/// Count and amount for each of the six dispositions.
pub const DATA_COLUMNS: usize = 12;
/// Label column plus the data columns.
pub const TABLE_COLUMNS: usize = DATA_COLUMNS + 1;

/// Members of the aggregate table family, keyed by the report ids that use
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TableLayout {
    Aggregate3,
}

impl TableLayout {
    pub fn for_report(report_id: &str) -> Option<Self> {
        match report_id {
            "aggregate-3" => Some(Self::Aggregate3),
            _ => None,
        }
    }

    pub const fn label_heading(self) -> &'static str {
        match self {
            Self::Aggregate3 => "RACE AND SEX",
        }
    }

    /// Absent report data renders nothing; the viewer is simply not ready.
    pub fn render(self, record: Option<&ReportRecord>) -> Option<ReportTable> {
        let record = record?;
        let mut rows = Vec::new();
        for section in &record.sections {
            push_section(&mut rows, section);
        }
        Some(ReportTable { layout: self, rows })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TableRow {
    /// Full-width title naming the characteristic a section breaks down by.
    SectionTitle { label: String },
    /// Full-width title for one characteristic value within a section.
    CharacteristicTitle { label: String },
    Data {
        label: String,
        cells: [String; DATA_COLUMNS],
    },
}

impl TableRow {
    fn data(label: impl Into<String>, dispositions: &DispositionVector) -> Self {
        Self::Data {
            label: label.into(),
            cells: disposition_cells(dispositions),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::SectionTitle { label }
            | Self::CharacteristicTitle { label }
            | Self::Data { label, .. } => label,
        }
    }

    pub fn is_data(&self) -> bool {
        matches!(self, Self::Data { .. })
    }
}

/// Presentation grid for one report: the fixed two-row heading is implied by
/// the layout, `rows` is the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportTable {
    pub layout: TableLayout,
    pub rows: Vec<TableRow>,
}

impl ReportTable {
    pub fn data_rows(&self) -> impl Iterator<Item = &TableRow> {
        self.rows.iter().filter(|row| row.is_data())
    }
}

fn push_section(rows: &mut Vec<TableRow>, section: &CharacteristicSection) {
    rows.push(TableRow::SectionTitle {
        label: section.key.title(),
    });

    match &section.rows {
        SectionRows::Brackets(brackets) => {
            rows.extend(
                brackets
                    .iter()
                    .map(|bracket| TableRow::data(bracket.label.as_str(), &bracket.dispositions)),
            );
        }
        SectionRows::Characteristics(values) => {
            for value in values {
                rows.push(TableRow::CharacteristicTitle {
                    label: value.label.clone(),
                });
                rows.extend(
                    value
                        .genders
                        .iter()
                        .map(|gender| TableRow::data(gender.gender.as_str(), &gender.dispositions)),
                );
                rows.push(TableRow::data("Total", &value.dispositions));
            }
        }
    }
}

fn disposition_cells(dispositions: &DispositionVector) -> [String; DATA_COLUMNS] {
    let order = Disposition::ordered();
    std::array::from_fn(|column| {
        let pair = dispositions.get(order[column / 2]);
        if column % 2 == 0 {
            pair.count.to_string()
        } else {
            format_amount(pair.value)
        }
    })
}

/// `$` prefix with comma thousands separators.
pub fn format_amount(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    grouped.push('$');
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::record::{
        CharacteristicBreakdown, CharacteristicKey, GenderBreakdown, IncomeBracket,
    };

    fn vector(seed: u64) -> DispositionVector {
        DispositionVector::from_pairs([
            (seed, seed * 1000),
            (seed + 1, 0),
            (seed + 2, 2500),
            (0, 0),
            (1, 75),
            (seed * 3, 1_234_567),
        ])
    }

    fn bracket(label: &str, seed: u64) -> IncomeBracket {
        IncomeBracket {
            label: label.to_string(),
            dispositions: vector(seed),
        }
    }

    fn gender(label: &str, seed: u64) -> GenderBreakdown {
        GenderBreakdown {
            gender: label.to_string(),
            dispositions: vector(seed),
        }
    }

    fn fixture() -> ReportRecord {
        ReportRecord::new(vec![
            CharacteristicSection::income(vec![
                bracket("Less than 50% of MSA/MD median", 1),
                bracket("50-79% of MSA/MD median", 2),
                bracket("120% or more of MSA/MD median", 3),
            ]),
            CharacteristicSection::characteristic(
                CharacteristicKey::Race,
                vec![CharacteristicBreakdown {
                    label: "White".to_string(),
                    genders: vec![gender("Male", 4), gender("Female", 5)],
                    dispositions: vector(9),
                }],
            ),
        ])
    }

    #[test]
    fn absent_record_renders_nothing() {
        assert!(TableLayout::Aggregate3.render(None).is_none());
    }

    #[test]
    fn row_count_matches_section_structure() {
        let record = fixture();
        let table = TableLayout::Aggregate3
            .render(Some(&record))
            .expect("table renders");

        // 2 section titles + 3 brackets + (1 title + 2 genders + 1 total)
        assert_eq!(table.rows.len(), 9);

        let labels: Vec<&str> = table.rows.iter().map(TableRow::label).collect();
        assert_eq!(
            labels,
            vec![
                "INCOME",
                "Less than 50% of MSA/MD median",
                "50-79% of MSA/MD median",
                "120% or more of MSA/MD median",
                "RACE",
                "White",
                "Male",
                "Female",
                "Total",
            ]
        );
        assert!(matches!(table.rows[5], TableRow::CharacteristicTitle { .. }));
    }

    #[test]
    fn data_rows_pair_counts_with_amounts() {
        let record = fixture();
        let table = TableLayout::Aggregate3
            .render(Some(&record))
            .expect("table renders");

        assert_eq!(table.data_rows().count(), 6);
        for row in table.data_rows() {
            let TableRow::Data { cells, .. } = row else {
                unreachable!("filtered to data rows");
            };
            assert_eq!(cells.len() + 1, TABLE_COLUMNS);
            for amount in cells.iter().skip(1).step_by(2) {
                assert!(amount.starts_with('$'), "amount cell {amount}");
            }
        }

        let TableRow::Data { cells, .. } = &table.rows[8] else {
            panic!("total row should carry data");
        };
        assert_eq!(cells[0], "9");
        assert_eq!(cells[1], "$9,000");
        assert_eq!(cells[11], "$1,234,567");
    }

    #[test]
    fn rendering_is_idempotent() {
        let record = fixture();
        let first = TableLayout::Aggregate3.render(Some(&record));
        let second = TableLayout::Aggregate3.render(Some(&record));
        assert_eq!(first, second);
    }

    #[test]
    fn formats_amounts_with_grouping() {
        assert_eq!(format_amount(0), "$0");
        assert_eq!(format_amount(999), "$999");
        assert_eq!(format_amount(1000), "$1,000");
        assert_eq!(format_amount(12_345_678), "$12,345,678");
    }

    #[test]
    fn only_aggregate_three_has_a_layout() {
        assert_eq!(
            TableLayout::for_report("aggregate-3"),
            Some(TableLayout::Aggregate3)
        );
        assert_eq!(TableLayout::for_report("4-1"), None);
    }
}
