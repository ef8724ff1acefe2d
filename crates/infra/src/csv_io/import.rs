//! Bulk CSV import of person records.

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::debug;

use roster_persons::{DecimalInput, PersonInput, TextInput};

use crate::jobs::ImportReport;
use crate::store::{PersonStore, StoreError};

/// Header columns an import file is expected to carry (any order, any case).
/// A missing column makes every row fail with a required-field error.
pub const REQUIRED_COLUMNS: [&str; 6] = ["name", "date_of_birth", "cpf", "sex", "height", "weight"];

/// The input could not be processed at all; the job ends `Failed`. Row
/// problems, including columns absent from the header, are reported in the
/// [`ImportReport`] instead.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("could not read CSV header: {0}")]
    Csv(#[from] csv::Error),
    #[error("store unavailable: {0}")]
    Store(StoreError),
}

/// Column positions of the known fields in the file's header.
struct Columns([Option<usize>; 6]);

impl Columns {
    fn resolve(header: &StringRecord) -> Self {
        let normalized: Vec<String> = header
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_lowercase())
            .collect();

        let positions = REQUIRED_COLUMNS.map(|column| normalized.iter().position(|h| h == column));
        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .zip(positions)
            .filter_map(|(column, pos)| pos.is_none().then_some(*column))
            .collect();
        if !missing.is_empty() {
            debug!(?missing, "csv header lacks columns");
        }
        Self(positions)
    }

    fn input(&self, record: &StringRecord) -> PersonInput {
        let cell = |slot: usize| self.0[slot].and_then(|pos| record.get(pos)).map(str::to_string);
        PersonInput {
            name: cell(0).map(TextInput::Text),
            date_of_birth: cell(1).map(TextInput::Text),
            cpf: cell(2).map(TextInput::Text),
            sex: cell(3).map(TextInput::Text),
            height: cell(4).map(DecimalInput::Text),
            weight: cell(5).map(DecimalInput::Text),
        }
    }
}

fn row_error(row: usize, name: Option<&str>, reasons: impl std::fmt::Display) -> String {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => format!("Row {row} ({name}): {reasons}"),
        None => format!("Row {row}: {reasons}"),
    }
}

/// Validate and insert every data row of `csv_text`.
///
/// Rows are numbered from 1, header excluded. A bad row never stops the
/// import; only unreadable CSV or a store fault does.
pub fn import_csv<S>(csv_text: &str, store: &S) -> Result<ImportReport, ImportError>
where
    S: PersonStore + ?Sized,
{
    let csv_text = csv_text.strip_prefix('\u{feff}').unwrap_or(csv_text);
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(csv_text.as_bytes());

    let columns = Columns::resolve(reader.headers()?);
    let mut report = ImportReport::default();

    for (index, record) in reader.records().enumerate() {
        let row = index + 1;
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                report.errors.push(row_error(row, None, e));
                continue;
            }
        };

        let input = columns.input(&record);
        let name = input.name.as_ref().and_then(TextInput::as_str);
        let fields = match input.validate() {
            Ok(fields) => fields,
            Err(errors) => {
                report.errors.push(row_error(row, name, errors));
                continue;
            }
        };

        match store.insert(fields) {
            Ok(_) => report.created += 1,
            Err(e) => match e.as_field_errors() {
                Some(errors) => report.errors.push(row_error(row, name, errors)),
                None => return Err(ImportError::Store(e)),
            },
        }
    }

    debug!(created = report.created, rejected = report.errors.len(), "csv import finished");
    Ok(report)
}
