/*!
 # Participant Contact Migration

 One-time batch job that migrates participant contact details (phone
 numbers and postal addresses) from a CSV export into the participant user
 and study databases.

 ## Core Concepts

 The job is a plain, single-threaded extract-transform-load pipeline:

 - **CSV Stream Reader** ([`csv::stream_reader`]): streams the export row by
   row, maps columns by recognized header names and delivers each row to a
   handler together with a 0-based index. Handler failures are counted but
   never stop the run; file and parse errors are fatal.
 - **Row Transformer** ([`migration::transform`]): normalizes the phone
   number (enforced `+` prefix) and builds a postal [`Address`], either by
   direct column mapping or by regex decomposition of a combined address
   string.
 - **Write-Back Processor** ([`migration::processor`]): per row, verifies
   the participant exists and is active, resolves the pseudonymized
   confidential ID to a user account and conditionally updates the phone
   number and address. Existing phone numbers are only overwritten with
   `force_override_phone`; with `dry_run` every write is suppressed.

 [`Address`]: migration::transform::Address

 ## Safety Properties

 - No row is written unless its participant is found and marked active.
 - Rows fail individually; one bad row never aborts the run.
 - Dry-run mode performs every lookup and computation but no write.

 ## Example

 ```rust,no_run
 use contact_migration::{
     config::Config,
     csv::stream_reader::stream_csv,
     db::{study_store::MongoStudyStore, user_store::MongoUserStore},
     migration::{
         processor::{MigrateContactsProcessor, MigrationOptions},
         transform::AddressTransformer,
     },
 };

 let config = Config::load().unwrap();

 let study_store = MongoStudyStore::connect(&config.db_configs.study_db).unwrap();
 let user_store = MongoUserStore::connect(&config.db_configs.participant_user_db).unwrap();

 let mut processor = MigrateContactsProcessor::new(
     MigrationOptions::from_config(&config),
     AddressTransformer::new(config.address_policy),
     &study_store,
     &user_store,
 );

 let summary = stream_csv(&config.info_csv, config.separator().unwrap(), |row, index| {
     processor.process_row(row, index)
 })
 .unwrap();

 println!("{} rows, {} failures", summary.rows, summary.failures);
 ```
*/

/// This module provides the job configuration loaded from YAML.
pub mod config;

/// This module provides the streaming CSV reader.
pub mod csv;

/// This module provides the store traits, document types and MongoDB
/// implementations.
pub mod db;

/// This module provides the fatal error type of the job.
pub mod error;

/// This module provides the confidential-ID transform.
pub mod ident;

/// This module provides the row transformer and the write-back processor.
pub mod migration;

pub use error::MigrationError;
