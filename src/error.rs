use thiserror::Error;

#[derive(Error, Debug)]
/// Fatal migration error. Any of these aborts the whole run; per-row
/// problems are logged and counted instead of being raised.
pub enum MigrationError {
    #[error("failed to open CSV file: {0}")]
    CsvOpen(String),

    #[error("failed to read CSV headers: {0}")]
    CsvHeader(String),

    #[error("could not find required headers in CSV file, content of first row: {0:?}")]
    MissingHeaders(Vec<String>),

    #[error("failed to read CSV row {row}: {message}")]
    CsvRecord { row: usize, message: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unsupported ID mapping method: {0}")]
    IdMapping(String),
}
