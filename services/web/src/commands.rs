use crate::infra::{parse_date, DisclosureContext, NavigationRequest};
use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use disclosure_reports::config::AppConfig;
use disclosure_reports::disclosure::{
    NavigationPath, PageView, Rendered, ReportCatalog, ReportDescriptor,
};
use disclosure_reports::error::AppError;
use disclosure_reports::reports::{to_text, ReportRecord, ReportTable};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Content markup as served under /disclosure-reports
    #[default]
    Html,
    /// The view model as JSON
    Json,
    /// The report table as CSV
    Csv,
    /// The report table as aligned text
    Text,
}

#[derive(Args, Debug)]
pub(crate) struct RenderArgs {
    /// Navigation path, e.g. 2017/LEI123/10180/aggregate-3
    pub(crate) path: String,
    #[arg(long, value_enum, default_value_t = OutputFormat::Html)]
    pub(crate) format: OutputFormat,
    /// Institution search to run at the institution prompt
    #[arg(long)]
    pub(crate) search: Option<String>,
    /// Date the year prompt is built for (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Disclosure data file to use instead of the bundled sample
    #[arg(long)]
    pub(crate) data: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct TableArgs {
    /// Report record JSON file as published for one institution and area
    pub(crate) file: PathBuf,
    /// Catalog id of the report the file holds
    #[arg(long, default_value = "aggregate-3")]
    pub(crate) report: String,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub(crate) format: OutputFormat,
}

#[derive(Args, Debug, Default)]
pub(crate) struct CatalogArgs {
    /// Print the catalog as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) async fn run_render(args: RenderArgs) -> Result<(), AppError> {
    let RenderArgs {
        path,
        format,
        search,
        today,
        data,
    } = args;

    let mut config = AppConfig::load()?;
    if data.is_some() {
        config.disclosure.data_path = data;
    }

    let context = DisclosureContext::from_config(&config.disclosure)?;
    let mut controller = context.controller();
    let path = NavigationPath::parse(&path);
    let request = NavigationRequest {
        path: path.clone(),
        query: search,
        retry: false,
        today,
    };
    let rendered = context.drive(&mut controller, request).await;

    println!("{}", render_output(rendered, format, &path)?);
    Ok(())
}

fn render_output(
    rendered: Rendered,
    format: OutputFormat,
    path: &NavigationPath,
) -> Result<String, AppError> {
    match format {
        OutputFormat::Json => to_json(&rendered),
        OutputFormat::Html => Ok(shown_page(rendered, path)?.to_html()),
        OutputFormat::Csv => Ok(shown_table(rendered, path)?.to_csv()?),
        OutputFormat::Text => Ok(to_text(&shown_table(rendered, path)?)),
    }
}

fn shown_page(rendered: Rendered, path: &NavigationPath) -> Result<PageView, AppError> {
    match rendered {
        Rendered::Page(page) => Ok(page),
        Rendered::Redirect {
            location, reason, ..
        } => Err(AppError::NotFound(format!(
            "{path} cannot be shown ({reason}); try {location}"
        ))),
    }
}

fn shown_table(rendered: Rendered, path: &NavigationPath) -> Result<ReportTable, AppError> {
    shown_page(rendered, path)?
        .report
        .and_then(|viewer| viewer.table)
        .ok_or_else(|| AppError::NotFound(format!("no table for {path}")))
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, AppError> {
    serde_json::to_string_pretty(value).map_err(|err| AppError::Io(std::io::Error::other(err)))
}

pub(crate) fn run_table(args: TableArgs) -> Result<(), AppError> {
    let TableArgs {
        file,
        report,
        format,
    } = args;

    let catalog = ReportCatalog::standard()?;
    let layout = catalog
        .table_layout(&report)
        .ok_or_else(|| AppError::NotFound(format!("report {report} has no table layout")))?;

    let reader = BufReader::new(File::open(&file)?);
    let record: ReportRecord = serde_json::from_reader(reader)
        .map_err(|err| AppError::Io(std::io::Error::other(err)))?;
    let table = layout
        .render(Some(&record))
        .ok_or_else(|| AppError::NotFound(format!("nothing to render in {}", file.display())))?;

    let output = match format {
        OutputFormat::Html => table.to_html(),
        OutputFormat::Csv => table.to_csv()?,
        OutputFormat::Text => to_text(&table),
        OutputFormat::Json => to_json(&table)?,
    };
    println!("{output}");
    Ok(())
}

pub(crate) fn run_catalog(args: CatalogArgs) -> Result<(), AppError> {
    let catalog = ReportCatalog::standard()?;
    if args.json {
        println!("{}", to_json(catalog.groups())?);
        return Ok(());
    }

    print!("{}", catalog_listing(&catalog));
    Ok(())
}

fn catalog_listing(catalog: &ReportCatalog) -> String {
    let mut out = String::new();
    for group in catalog.groups() {
        out.push_str(&format!("{}\n", group.group));
        push_descriptors(&mut out, &group.reports, 1);
    }
    out
}

fn push_descriptors(out: &mut String, descriptors: &[ReportDescriptor], depth: usize) {
    for descriptor in descriptors {
        out.push_str(&format!(
            "{}{:<12} {}\n",
            "  ".repeat(depth),
            descriptor.value,
            descriptor.label
        ));
        push_descriptors(out, &descriptor.options, depth + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use disclosure_reports::config::DisclosureConfig;

    async fn rendered(raw: &str) -> (Rendered, NavigationPath) {
        let context =
            DisclosureContext::from_config(&DisclosureConfig::default()).expect("bundled data");
        let mut controller = context.controller();
        let path = NavigationPath::parse(raw);
        let request = NavigationRequest {
            today: NaiveDate::from_ymd_opt(2018, 1, 2),
            ..NavigationRequest::to(path.clone())
        };
        (context.drive(&mut controller, request).await, path)
    }

    #[tokio::test]
    async fn text_output_prints_the_table() {
        let (rendered, path) = rendered("2017/LEI123/10180/aggregate-3").await;
        let text = render_output(rendered, OutputFormat::Text, &path).expect("text renders");
        assert!(text.contains("INCOME"));
        assert!(text.contains("$1,534"));
    }

    #[tokio::test]
    async fn table_formats_need_a_table() {
        let (rendered, path) = rendered("2017").await;
        let err = render_output(rendered, OutputFormat::Csv, &path).expect_err("no table");
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn redirects_are_reported_as_errors() {
        let (rendered, path) = rendered("2017/LEI123/10180/99").await;
        let err = render_output(rendered, OutputFormat::Html, &path).expect_err("redirect");
        assert!(err.to_string().contains("/disclosure-reports/2017/LEI123/10180"));
    }

    #[test]
    fn catalog_listing_indents_options() {
        let catalog = ReportCatalog::standard().expect("bundled catalog");
        let listing = catalog_listing(&catalog);
        assert!(listing.starts_with("msa\n"));
        assert!(listing.contains("\n    3-1 "));
        assert!(listing.contains("\nnationwide\n"));
    }
}
