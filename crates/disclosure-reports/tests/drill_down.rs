use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use disclosure_reports::disclosure::{
    FixtureDataSource, NavigationController, NavigationPath, Rendered, ReportCatalog,
    SessionCache, StepView, YearPolicy,
};

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/disclosure.json")
}

fn controller() -> NavigationController<FixtureDataSource> {
    let source = FixtureDataSource::from_path(&fixture_path()).expect("fixture loads");
    let catalog = ReportCatalog::standard().expect("bundled catalog builds");
    NavigationController::new(
        Arc::new(source),
        SessionCache::new(),
        Arc::new(catalog),
        YearPolicy::default(),
    )
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2018, 11, 15).expect("valid date")
}

#[tokio::test]
async fn walks_from_year_to_rendered_report() {
    let source = Arc::new(FixtureDataSource::from_path(&fixture_path()).expect("fixture loads"));
    let mut controller = controller();

    let year = controller.select_year("2017").expect("root accepts a year");
    controller.navigate(year);
    controller.search("prairie").await;

    let institution = match controller.render_on(today()) {
        Rendered::Page(page) => match page.step {
            Some(StepView::InstitutionSearch { mut results, .. }) => {
                assert_eq!(results.len(), 1);
                results.remove(0).institution
            }
            other => panic!("expected search results, got {other:?}"),
        },
        other => panic!("expected a page, got {other:?}"),
    };
    assert_eq!(institution.id, "LEI123");

    let next = controller
        .select_institution(&institution)
        .expect("institution accepted");
    controller.navigate(next);
    controller.settle().await;

    match controller.render_on(today()) {
        Rendered::Page(page) => match page.step {
            Some(StepView::MsaMdSelector { msa_mds, .. }) => {
                assert_eq!(
                    msa_mds.last().map(|msa_md| msa_md.id.as_str()),
                    Some("nationwide")
                );
            }
            other => panic!("expected MSA/MD selector, got {other:?}"),
        },
        other => panic!("expected a page, got {other:?}"),
    }

    let key = controller.path().lookup_key().expect("institution selected");
    let msa_md = controller
        .cache()
        .candidates(&key)
        .and_then(|candidates| candidates.into_iter().find(|msa_md| msa_md.id == "10180"))
        .expect("abilene offered");

    let next = controller.select_msa_md(&msa_md).expect("area accepted");
    controller.navigate(next);
    let next = controller
        .select_report("aggregate-3")
        .expect("aggregate report accepted");
    controller.navigate(next);

    let key = controller.missing_report().expect("record still to load");
    let record = source.report(&key).expect("fixture publishes this report");
    assert!(controller.cache_report(record));

    let page = match controller.render_on(today()) {
        Rendered::Page(page) => page,
        other => panic!("expected a page, got {other:?}"),
    };
    let table = page
        .report
        .as_ref()
        .and_then(|viewer| viewer.table.as_ref())
        .expect("table rendered");
    assert_eq!(table.rows.len(), 23);

    let html = page.to_html();
    assert!(html.contains("First Prairie Bank"));
    assert!(html.contains("ABILENE, TX"));
    assert!(html.contains("$1,534"));
}

#[tokio::test]
async fn unknown_institution_surfaces_a_retryable_failure() {
    let mut controller = controller();
    controller.navigate(NavigationPath::parse("/disclosure-reports/2017/NOPE"));
    controller.settle().await;

    match controller.render_on(today()) {
        Rendered::Page(page) => match page.step {
            Some(StepView::LookupFailed {
                institution_id,
                message,
                ..
            }) => {
                assert_eq!(institution_id, "NOPE");
                assert!(message.contains("not found"), "{message}");
            }
            other => panic!("expected failure view, got {other:?}"),
        },
        other => panic!("expected a page, got {other:?}"),
    }
}

#[tokio::test]
async fn respondent_ids_resolve_for_legacy_years() {
    let mut controller = controller();
    controller.navigate(NavigationPath::parse("/disclosure-reports/2017/0000077"));
    controller.settle().await;

    let cached = controller
        .cache()
        .institution("0000077")
        .expect("institution cached under the path id");
    assert_eq!(cached.name, "Lakeside Credit Union");
}
