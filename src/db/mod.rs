//! Store access for the two external databases.
//!
//! The orchestrator only talks to the [`StudyStore`] and [`UserStore`]
//! traits; the MongoDB implementations live in [`study_store`] and
//! [`user_store`]. Tests substitute in-memory fakes through the same traits.

/// This module contains the document types stored in the databases.
pub mod models;

/// This module contains the MongoDB-backed study store.
pub mod study_store;

/// This module contains the MongoDB-backed participant user store.
pub mod user_store;

use mongodb::{
    options::{ClientOptions, Credential},
    sync::Client,
};
use thiserror::Error;

use crate::config::DbConfig;
use models::{ConfidentialResponse, Participant, User};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("document not found")]
    NotFound,

    #[error("database error: {0}")]
    Backend(String),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(error: mongodb::error::Error) -> Self {
        StoreError::Backend(error.to_string())
    }
}

/// Read access to study data plus the confidential-response write used by
/// the address migration.
pub trait StudyStore {
    fn get_participant_by_id(
        &self,
        instance_id: &str,
        study_key: &str,
        participant_id: &str,
    ) -> Result<Participant, StoreError>;

    fn get_profile_id_from_confidential_id(
        &self,
        instance_id: &str,
        confidential_id: &str,
        study_key: &str,
    ) -> Result<String, StoreError>;

    fn replace_confidential_response(
        &self,
        instance_id: &str,
        study_key: &str,
        response: &ConfidentialResponse,
    ) -> Result<(), StoreError>;
}

/// Lookup and full-document replace of participant user accounts.
pub trait UserStore {
    fn get_user_by_profile_id(
        &self,
        instance_id: &str,
        profile_id: &str,
    ) -> Result<User, StoreError>;

    fn replace_user(&self, instance_id: &str, user: &User) -> Result<(), StoreError>;
}

/// Opens a blocking client for one of the configured deployments.
pub(crate) fn connect_client(config: &DbConfig) -> Result<Client, StoreError> {
    let mut options = ClientOptions::parse(&config.connection_str).run()?;

    if !config.username.is_empty() {
        options.credential = Some(
            Credential::builder()
                .username(config.username.clone())
                .password(config.password.clone())
                .build(),
        );
    }

    let client = Client::with_options(options)?;
    Ok(client)
}
