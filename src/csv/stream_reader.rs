//! Streaming CSV reader for the participant info export.
//!
//! The export is processed row by row without loading the whole file into
//! memory. The first line must be a header row; columns are matched against
//! the recognized header names below (case-sensitive), unrecognized columns
//! are ignored and missing columns leave the corresponding [`CsvRow`] field
//! empty.

use std::path::Path;

use csv::{ReaderBuilder, Trim};
use log::info;

use crate::error::MigrationError;

pub const HEADER_PARTICIPANT_ID: &str = "dn_extra_usn2";
pub const HEADER_PHONE_NUMBER: &str = "dn_telefoonnummer_1";
pub const HEADER_FIRST_NAME: &str = "dn_naam";
pub const HEADER_LAST_NAME: &str = "dn_achternaam";
pub const HEADER_ADDRESS: &str = "dn_adres";
pub const HEADER_HOUSE_NUMBER: &str = "dn_huisnummer";
pub const HEADER_HOUSE_NUMBER_SUFFIX: &str = "dn_huisnummer_toev";
pub const HEADER_CITY: &str = "dn_plaats";
pub const HEADER_ZIP_CODE: &str = "dn_postcode";

/// The header row must at least carry the participant ID, the phone number
/// and a city/postal code pair to be usable.
const MIN_HEADER_COLUMNS: usize = 4;

const PROGRESS_INTERVAL: usize = 1000;

/// A single row from the CSV file, mapped by header name.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CsvRow {
    pub participant_id: String,
    pub phone_number: String,
    pub first_name: String,
    pub last_name: String,
    /// Either a combined "street house-number" string or, for exports with
    /// separate columns, the street name only.
    pub address: String,
    pub house_number: String,
    pub house_number_suffix: String,
    pub city: String,
    pub zip_code: String,
}

/// Counters reported after a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSummary {
    /// Number of data rows delivered to the handler.
    pub rows: usize,
    /// Number of rows for which the handler reported failure.
    pub failures: usize,
}

/// Reads and processes a CSV file line by line.
///
/// Each data row is delivered to `handler` together with its 0-based index.
/// The handler returns whether the row was processed successfully; a `false`
/// return is counted but never stops the iteration. File, header and parse
/// errors are fatal and abort the run.
///
/// # Examples
///
/// ```no_run
/// use contact_migration::csv::stream_reader::stream_csv;
///
/// let summary = stream_csv("participants.csv", b';', |row, index| {
///     println!("{}: {}", index, row.participant_id);
///     true
/// })
/// .unwrap();
///
/// println!("{} rows, {} failures", summary.rows, summary.failures);
/// ```
pub fn stream_csv<P, F>(
    path: P,
    delimiter: u8,
    mut handler: F,
) -> Result<StreamSummary, MigrationError>
where
    P: AsRef<Path>,
    F: FnMut(&CsvRow, usize) -> bool,
{
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(false)
        .from_path(path.as_ref())
        .map_err(|error| MigrationError::CsvOpen(error.to_string()))?;

    let headers = reader
        .headers()
        .map_err(|error| MigrationError::CsvHeader(error.to_string()))?
        .clone();

    if headers.len() < MIN_HEADER_COLUMNS {
        return Err(MigrationError::MissingHeaders(
            headers.iter().map(str::to_string).collect(),
        ));
    }

    let mut row_index = 0;
    let mut failures = 0;

    for record in reader.records() {
        let record = record.map_err(|error| MigrationError::CsvRecord {
            row: row_index + 1,
            message: error.to_string(),
        })?;

        let mut row = CsvRow::default();
        for (i, value) in record.iter().enumerate() {
            if let Some(name) = headers.get(i) {
                match name {
                    HEADER_PARTICIPANT_ID => row.participant_id = value.to_string(),
                    HEADER_PHONE_NUMBER => row.phone_number = value.to_string(),
                    HEADER_FIRST_NAME => row.first_name = value.to_string(),
                    HEADER_LAST_NAME => row.last_name = value.to_string(),
                    HEADER_ADDRESS => row.address = value.to_string(),
                    HEADER_HOUSE_NUMBER => row.house_number = value.to_string(),
                    HEADER_HOUSE_NUMBER_SUFFIX => row.house_number_suffix = value.to_string(),
                    HEADER_CITY => row.city = value.to_string(),
                    HEADER_ZIP_CODE => row.zip_code = value.to_string(),
                    _ => {}
                }
            }
        }

        if !handler(&row, row_index) {
            failures += 1;
        }

        row_index += 1;

        if row_index % PROGRESS_INTERVAL == 0 {
            info!("Processing progress (rows_processed: {})", row_index);
        }
    }

    info!(
        "CSV processing completed (total_rows: {}, failures: {})",
        row_index, failures
    );

    Ok(StreamSummary {
        rows: row_index,
        failures,
    })
}

/// Reads an entire CSV file into a vector. Use only for small files; large
/// exports should go through [`stream_csv`].
pub fn read_csv_to_vec<P: AsRef<Path>>(
    path: P,
    delimiter: u8,
) -> Result<Vec<CsvRow>, MigrationError> {
    let mut rows = Vec::new();

    stream_csv(path, delimiter, |row, _index| {
        rows.push(row.clone());
        true
    })?;

    Ok(rows)
}
