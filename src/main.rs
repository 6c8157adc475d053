use std::{path::Path, time::Instant};

use anyhow::Context;
use log::info;
use uuid::Uuid;

use contact_migration::{
    config::Config,
    csv::stream_reader::stream_csv,
    db::{study_store::MongoStudyStore, user_store::MongoUserStore},
    migration::{
        processor::{MigrateContactsProcessor, MigrationOptions},
        transform::AddressTransformer,
    },
};

fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(&config.logging.log_level),
    )
    .init();

    info!(
        "Start migration job (run_id: {}, instance_id: {}, study_key: {}, dry_run: {})",
        Uuid::new_v4(),
        config.instance_id,
        config.study_key,
        config.dry_run
    );
    let start = Instant::now();

    if !Path::new(&config.info_csv).exists() {
        anyhow::bail!("info CSV file does not exist: {}", config.info_csv);
    }
    let separator = config.separator()?;

    let study_store = MongoStudyStore::connect(&config.db_configs.study_db)
        .context("error connecting to study DB")?;
    let user_store = MongoUserStore::connect(&config.db_configs.participant_user_db)
        .context("error connecting to participant user DB")?;

    let mut processor = MigrateContactsProcessor::new(
        MigrationOptions::from_config(&config),
        AddressTransformer::new(config.address_policy),
        &study_store,
        &user_store,
    );

    let summary = stream_csv(&config.info_csv, separator, |row, index| {
        processor.process_row(row, index)
    })
    .context("failed to process CSV")?;

    info!(
        "Migration job completed (total_processed: {}, failures: {}, duration: {:?})",
        processor.processed_count(),
        summary.failures,
        start.elapsed()
    );

    Ok(())
}
