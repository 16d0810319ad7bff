use std::fmt;

use super::views::{PageView, ProgressCard, ReportLink, ReportViewer, StepView};
use crate::markup::Escaped;

const HEADING: &str = "Disclosure reports";
const INTRO: &str = "These reports summarize lending activity for individual institutions, both nationwide and by MSA/MD.";

impl PageView {
    /// Markup for the content region; the surrounding page frame belongs to
    /// the host.
    pub fn to_html(&self) -> String {
        HtmlPage(self).to_string()
    }
}

struct HtmlPage<'a>(&'a PageView);

impl fmt::Display for HtmlPage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let page = self.0;
        writeln!(f, "<div class=\"Disclosure\" id=\"main-content\">")?;
        writeln!(f, "<h1>{}</h1>\n<p>{}</p>", HEADING, Escaped(INTRO))?;

        writeln!(f, "<ol class=\"ProgressCards\">")?;
        for card in &page.progress {
            write_card(f, card)?;
        }
        writeln!(f, "</ol>\n<hr>")?;

        if let Some(step) = &page.step {
            write_step(f, step, &page.path)?;
        }
        writeln!(f, "</div>")?;

        if let Some(viewer) = &page.report {
            write_report(f, viewer)?;
        }
        Ok(())
    }
}

fn write_card(f: &mut fmt::Formatter<'_>, card: &ProgressCard) -> fmt::Result {
    write!(
        f,
        "<li><div class=\"ProgressCard\"><h4>{}</h4><h2>{}</h2>",
        Escaped(card.title),
        Escaped(&card.name)
    )?;
    if !card.id.is_empty() {
        write!(f, "<h4>{}</h4>", Escaped(&card.id))?;
    }
    if let Some(link) = &card.link {
        write!(f, "<a href=\"{}\">Change</a>", Escaped(link))?;
    }
    writeln!(f, "</div></li>")
}

fn write_step(f: &mut fmt::Formatter<'_>, step: &StepView, path: &str) -> fmt::Result {
    match step {
        StepView::YearSelector { years } => {
            writeln!(f, "<h3>Select a year</h3>\n<ul class=\"YearSelector\">")?;
            for year in years {
                write!(f, "<li><a href=\"{}\">{}</a>", Escaped(&year.href), Escaped(&year.year))?;
                if !year.supported {
                    f.write_str(" <small>(not yet available)</small>")?;
                }
                writeln!(f, "</li>")?;
            }
            writeln!(f, "</ul>")
        }
        StepView::UnavailableYear { message, .. } => {
            writeln!(f, "<h3>{}</h3>", Escaped(message))
        }
        StepView::InstitutionSearch {
            identifier_label,
            query,
            results,
            error,
            ..
        } => {
            writeln!(
                f,
                "<form class=\"SearchList\" method=\"get\" action=\"{}\">",
                Escaped(path)
            )?;
            writeln!(
                f,
                "<label for=\"institution-search\">Enter an institution name or {}</label>",
                Escaped(identifier_label)
            )?;
            writeln!(
                f,
                "<input id=\"institution-search\" name=\"q\" type=\"text\" value=\"{}\">",
                Escaped(query.as_deref().unwrap_or_default())
            )?;
            writeln!(f, "<button type=\"submit\">Search</button>\n</form>")?;

            if let Some(error) = error {
                writeln!(f, "<p class=\"alert alert-error\">{}</p>", Escaped(error))?;
            } else if query.is_some() && results.is_empty() {
                writeln!(f, "<p>No institutions matched your search.</p>")?;
            }

            if !results.is_empty() {
                writeln!(f, "<ul class=\"SearchResults\">")?;
                for item in results {
                    writeln!(
                        f,
                        "<li><h4>{}</h4><p>{}: {}</p><a class=\"button-link\" href=\"{}\">View MSA/MDs</a></li>",
                        Escaped(&item.institution.name),
                        Escaped(item.identifier_label),
                        Escaped(&item.institution.id),
                        Escaped(&item.href)
                    )?;
                }
                writeln!(f, "</ul>")?;
            }
            Ok(())
        }
        StepView::Loading { institution_id } => writeln!(
            f,
            "<div class=\"LoadingIconWrapper\" role=\"status\">Loading MSA/MDs for {}&hellip;</div>",
            Escaped(institution_id)
        ),
        StepView::LookupFailed {
            institution_id,
            year,
            message,
            retry_href,
        } => writeln!(
            f,
            "<div class=\"alert alert-error\" role=\"alert\"><p>Unable to load MSA/MDs for {} in {}: {}</p><a class=\"button\" href=\"{}\">Try again</a></div>",
            Escaped(institution_id),
            Escaped(year),
            Escaped(message),
            Escaped(retry_href)
        ),
        StepView::MsaMdSelector {
            institution,
            msa_mds,
        } => {
            writeln!(
                f,
                "<h3>Select a MSA/MD for {}</h3>\n<ul class=\"MsaMds\">",
                Escaped(&institution.name)
            )?;
            for msa_md in msa_mds {
                writeln!(
                    f,
                    "<li><a href=\"{}\">{}</a> <small>{}</small></li>",
                    Escaped(&msa_md.href),
                    Escaped(&msa_md.name),
                    Escaped(&msa_md.id)
                )?;
            }
            writeln!(f, "</ul>")
        }
        StepView::ReportSelector { msa_md, reports } => {
            writeln!(
                f,
                "<h3>Select a report for {}</h3>",
                Escaped(msa_md.display_name())
            )?;
            write_report_links(f, reports)
        }
    }
}

fn write_report_links(f: &mut fmt::Formatter<'_>, links: &[ReportLink]) -> fmt::Result {
    writeln!(f, "<ul class=\"Reports\">")?;
    for link in links {
        write!(
            f,
            "<li><a href=\"{}\">{}</a>",
            Escaped(&link.href),
            Escaped(&link.label)
        )?;
        if !link.options.is_empty() {
            f.write_str("\n")?;
            write_report_links(f, &link.options)?;
        }
        writeln!(f, "</li>")?;
    }
    writeln!(f, "</ul>")
}

fn write_report(f: &mut fmt::Formatter<'_>, viewer: &ReportViewer) -> fmt::Result {
    writeln!(
        f,
        "<div class=\"Report\" id=\"report\">\n<h3>{}</h3>",
        Escaped(&viewer.report.label)
    )?;
    match (&viewer.layout, &viewer.table) {
        (Some(_), Some(table)) => f.write_str(&table.to_html())?,
        (Some(_), None) => {}
        (None, _) => writeln!(f, "<p>This report is not yet available online.</p>")?,
    }
    writeln!(f, "</div>")
}
