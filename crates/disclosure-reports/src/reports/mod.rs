//! Aggregate report records and the table family that lays them out.

mod export;
pub mod record;
pub mod table;

pub use export::{to_text, ExportError, TextTable};
pub use record::{
    CharacteristicBreakdown, CharacteristicKey, CharacteristicSection, Disposition,
    DispositionPair, DispositionVector, GenderBreakdown, IncomeBracket, ReportRecord,
    SectionRows,
};
pub use table::{format_amount, ReportTable, TableLayout, TableRow, DATA_COLUMNS, TABLE_COLUMNS};
