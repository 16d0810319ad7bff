use std::fmt::{self, Write as _};

use super::record::Disposition;
use super::table::{ReportTable, TableRow, TABLE_COLUMNS};
use crate::markup::Escaped;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("unable to flush csv output: {0}")]
    Flush(String),
    #[error(transparent)]
    Encoding(#[from] std::string::FromUtf8Error),
}

impl ReportTable {
    pub fn to_html(&self) -> String {
        HtmlTable(self).to_string()
    }

    /// One header line followed by one line per grid row; title rows leave
    /// the data columns empty so every record has the same width.
    pub fn to_csv(&self) -> Result<String, ExportError> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        let mut header = Vec::with_capacity(TABLE_COLUMNS);
        header.push(self.layout.label_heading().to_string());
        for disposition in Disposition::ordered() {
            header.push(format!("{} - Number", disposition.label()));
            header.push(format!("{} - $Amount", disposition.label()));
        }
        writer.write_record(&header)?;

        for row in &self.rows {
            match row {
                TableRow::SectionTitle { label } | TableRow::CharacteristicTitle { label } => {
                    let mut record = vec![String::new(); TABLE_COLUMNS];
                    record[0] = label.clone();
                    writer.write_record(&record)?;
                }
                TableRow::Data { label, cells } => {
                    writer.write_record(std::iter::once(label).chain(cells.iter()))?;
                }
            }
        }

        let bytes = writer
            .into_inner()
            .map_err(|err| ExportError::Flush(err.to_string()))?;
        Ok(String::from_utf8(bytes)?)
    }
}

struct HtmlTable<'a>(&'a ReportTable);

impl fmt::Display for HtmlTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.0;
        f.write_str("<table class=\"ReportTable\">\n<thead>\n<tr>")?;
        write!(
            f,
            "<th width=\"20%\" rowspan=\"2\">{}</th>",
            Escaped(table.layout.label_heading())
        )?;
        for disposition in Disposition::ordered() {
            write!(
                f,
                "<th colspan=\"2\" width=\"13.333%\">{}</th>",
                Escaped(disposition.label())
            )?;
        }
        f.write_str("</tr>\n<tr>")?;
        for _ in Disposition::ordered() {
            f.write_str("<th>Number</th><th>$Amount</th>")?;
        }
        f.write_str("</tr>\n</thead>\n<tbody>\n")?;

        for row in &table.rows {
            match row {
                TableRow::SectionTitle { label } => writeln!(
                    f,
                    "<tr class=\"characteristic-grey-title\"><th colspan=\"{TABLE_COLUMNS}\">{}</th></tr>",
                    Escaped(label)
                )?,
                TableRow::CharacteristicTitle { label } => writeln!(
                    f,
                    "<tr class=\"characteristic-title\"><th colspan=\"{TABLE_COLUMNS}\">{}</th></tr>",
                    Escaped(label)
                )?,
                TableRow::Data { label, cells } => {
                    write!(f, "<tr><th>{}</th>", Escaped(label))?;
                    for cell in cells {
                        write!(f, "<td>{}</td>", Escaped(cell))?;
                    }
                    f.write_str("</tr>\n")?;
                }
            }
        }

        f.write_str("</tbody>\n</table>\n")
    }
}

const TEXT_LABEL_WIDTH: usize = 34;
const TEXT_CELL_WIDTH: usize = 13;

/// Fixed-width rendering for terminals.
pub struct TextTable<'a>(pub &'a ReportTable);

impl fmt::Display for TextTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.0;
        let pair_width = TEXT_CELL_WIDTH * 2;

        write!(f, "{:<TEXT_LABEL_WIDTH$}", table.layout.label_heading())?;
        for disposition in Disposition::ordered() {
            let short: String = disposition.label().chars().take(pair_width - 1).collect();
            write!(f, "{short:>pair_width$}")?;
        }
        f.write_char('\n')?;

        for row in &table.rows {
            match row {
                TableRow::SectionTitle { label } => writeln!(f, "\n== {label} ==")?,
                TableRow::CharacteristicTitle { label } => writeln!(f, "-- {label}")?,
                TableRow::Data { label, cells } => {
                    write!(f, "{label:<TEXT_LABEL_WIDTH$}")?;
                    for cell in cells {
                        write!(f, "{cell:>TEXT_CELL_WIDTH$}")?;
                    }
                    f.write_char('\n')?;
                }
            }
        }
        Ok(())
    }
}

pub fn to_text(table: &ReportTable) -> String {
    TextTable(table).to_string()
}
