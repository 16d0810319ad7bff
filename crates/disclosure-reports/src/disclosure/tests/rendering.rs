use std::sync::Arc;

use super::common::*;
use crate::disclosure::{LookupResponse, MissingEntry, MsaMd, Rendered, StepView};
use crate::reports::{TableLayout, TableRow};

fn redirect(rendered: Rendered) -> (String, MissingEntry) {
    match rendered {
        Rendered::Redirect {
            location, reason, ..
        } => (location, reason),
        Rendered::Page(page) => panic!("expected a redirect, got {page:?}"),
    }
}

#[tokio::test]
async fn unresolved_institution_falls_back_to_the_search() {
    let mut controller = controller(lookup_with_first_prairie());
    arrive(&mut controller, "/disclosure-reports/2017/LEI123/10180").await;
    controller.cache().reset();

    let (location, reason) = redirect(controller.render_on(today()));
    assert_eq!(location, "/disclosure-reports/2017");
    assert_eq!(reason, MissingEntry::Institution("LEI123".to_string()));
}

#[tokio::test]
async fn msa_md_outside_the_candidates_falls_back_to_the_list() {
    let mut controller = controller(lookup_with_first_prairie());
    arrive(&mut controller, "/disclosure-reports/2017/LEI123/99999").await;

    let (location, reason) = redirect(controller.render_on(today()));
    assert_eq!(location, "/disclosure-reports/2017/LEI123");
    assert_eq!(reason, MissingEntry::MsaMd("99999".to_string()));
}

#[tokio::test]
async fn unknown_report_falls_back_to_the_report_list() {
    let mut controller = controller(lookup_with_first_prairie());
    arrive(&mut controller, "/disclosure-reports/2017/LEI123/10180/99").await;

    let (location, reason) = redirect(controller.render_on(today()));
    assert_eq!(location, "/disclosure-reports/2017/LEI123/10180");
    assert_eq!(reason, MissingEntry::UnknownReport("99".to_string()));
}

#[tokio::test]
async fn reports_must_belong_to_the_areas_group() {
    let mut controller = controller(lookup_with_first_prairie());
    arrive(&mut controller, "/disclosure-reports/2017/LEI123/10180/A2").await;
    let (_, reason) = redirect(controller.render_on(today()));
    assert_eq!(reason, MissingEntry::UnknownReport("A2".to_string()));

    arrive(&mut controller, "/disclosure-reports/2017/LEI123/nationwide/A2").await;
    let page = page(&controller);
    let viewer = page.report.expect("nationwide report shown");
    assert_eq!(viewer.report.value, "A2");
    assert!(viewer.layout.is_none());
}

#[tokio::test]
async fn aggregate_report_without_a_record_renders_empty() {
    let mut controller = controller(lookup_with_first_prairie());
    arrive(
        &mut controller,
        "/disclosure-reports/2017/LEI123/10180/aggregate-3",
    )
    .await;

    let missing = controller.missing_report().expect("record not cached yet");
    assert_eq!(missing.report_id, "aggregate-3");

    let page = page(&controller);
    assert!(page.step.is_none());
    let viewer = page.report.as_ref().expect("report viewer shown");
    assert_eq!(viewer.layout, Some(TableLayout::Aggregate3));
    assert!(viewer.table.is_none());
    assert!(!page.to_html().contains("<table"));
}

#[tokio::test]
async fn aggregate_report_renders_the_cached_record() {
    let mut controller = controller(lookup_with_first_prairie());
    arrive(
        &mut controller,
        "/disclosure-reports/2017/LEI123/10180/aggregate-3",
    )
    .await;
    assert!(controller.cache_report(income_record()));
    assert!(controller.missing_report().is_none());

    let page = page(&controller);
    let table = page
        .report
        .as_ref()
        .and_then(|viewer| viewer.table.as_ref())
        .expect("table rendered");
    assert_eq!(table.rows.len(), 2);
    assert!(matches!(&table.rows[0], TableRow::SectionTitle { label } if label == "INCOME"));

    let html = page.to_html();
    assert!(html.contains("<table"));
    assert!(html.contains("$420"));
    assert!(html.contains("Disposition of Applications by Race and Sex of Applicant"));
}

#[tokio::test]
async fn other_reports_are_listed_without_a_table() {
    let mut controller = controller(lookup_with_first_prairie());
    arrive(&mut controller, "/disclosure-reports/2017/LEI123/10180/3-1").await;

    let page = page(&controller);
    let viewer = page.report.as_ref().expect("report viewer shown");
    assert!(viewer.layout.is_none());
    assert_eq!(page.progress[3].name, "3-1: Loans Sold by Borrower and Tract Characteristics");
    assert!(page.to_html().contains("not yet available online"));
}

#[tokio::test]
async fn markup_escapes_institution_names() {
    let lookup = FakeLookup::default();
    lookup.respond(
        "77",
        Ok(LookupResponse {
            institution: record("77", "Smith & Sons <Trust>"),
            msa_mds: vec![MsaMd::new("10180", "ABILENE, TX")],
        }),
    );
    let mut controller = controller(Arc::new(lookup));
    arrive(&mut controller, "/disclosure-reports/2017/77").await;

    let page = page(&controller);
    assert!(matches!(page.step, Some(StepView::MsaMdSelector { .. })));
    let html = page.to_html();
    assert!(html.contains("Smith &amp; Sons &lt;Trust&gt;"));
    assert!(!html.contains("<Trust>"));
    assert!(html.contains("href=\"/disclosure-reports/2017/77/nationwide\""));
}
