use std::fs;
use std::path::PathBuf;

use disclosure_reports::reports::{to_text, ReportRecord, TableLayout, TableRow, TABLE_COLUMNS};
use serde_json::Value;

fn published_report() -> ReportRecord {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/disclosure.json");
    let raw = fs::read_to_string(path).expect("fixture readable");
    let document: Value = serde_json::from_str(&raw).expect("fixture is json");
    let report = document["reports"][0]["report"].clone();
    serde_json::from_value(report).expect("report parses")
}

#[test]
fn sections_render_in_document_order() {
    let record = published_report();
    let table = TableLayout::Aggregate3
        .render(Some(&record))
        .expect("table renders");

    let titles: Vec<&str> = table
        .rows
        .iter()
        .filter_map(|row| match row {
            TableRow::SectionTitle { label } => Some(label.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(
        titles,
        vec!["INCOME", "RACE", "ETHNICITY", "MINORITY STATUS"]
    );

    // 4 section titles, 3 income brackets, then per value a title, its
    // genders and a total: (1+3+1) + (1+2+1) + (1+2+1) + (1+1+1).
    assert_eq!(table.rows.len(), 23);
    assert_eq!(table.data_rows().count(), 15);
}

#[test]
fn every_data_row_carries_twelve_cells() {
    let record = published_report();
    let table = TableLayout::Aggregate3
        .render(Some(&record))
        .expect("table renders");

    for row in table.data_rows() {
        match row {
            TableRow::Data { cells, .. } => {
                assert!(cells.iter().step_by(2).all(|count| count.parse::<u64>().is_ok()));
                assert!(cells.iter().skip(1).step_by(2).all(|amount| amount.starts_with('$')));
            }
            other => panic!("unexpected row {other:?}"),
        }
    }
}

#[test]
fn csv_export_keeps_a_uniform_width() {
    let record = published_report();
    let table = TableLayout::Aggregate3
        .render(Some(&record))
        .expect("table renders");

    let csv = table.to_csv().expect("csv export");
    let mut reader = csv::Reader::from_reader(csv.as_bytes());
    let headers = reader.headers().expect("header row").clone();
    assert_eq!(headers.len(), TABLE_COLUMNS);
    assert_eq!(&headers[0], "RACE AND SEX");

    let records: Vec<csv::StringRecord> = reader
        .records()
        .collect::<Result<_, _>>()
        .expect("rows parse");
    assert_eq!(records.len(), table.rows.len());
    assert!(records.iter().all(|record| record.len() == TABLE_COLUMNS));
}

#[test]
fn text_export_lists_every_row_label() {
    let record = published_report();
    let table = TableLayout::Aggregate3
        .render(Some(&record))
        .expect("table renders");

    let text = to_text(&table);
    for row in &table.rows {
        assert!(text.contains(row.label()), "missing {}", row.label());
    }
}
