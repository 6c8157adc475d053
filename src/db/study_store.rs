use mongodb::{
    bson::doc,
    sync::{Client, Collection},
};

use crate::config::DbConfig;

use super::{
    StoreError, StudyStore, connect_client,
    models::{ConfidentialIdMapEntry, ConfidentialResponse, Participant},
};

const CONFIDENTIAL_ID_MAP_COLLECTION: &str = "confidentialIDMap";

/// MongoDB-backed study store. One blocking client, opened at startup.
pub struct MongoStudyStore {
    client: Client,
}

impl MongoStudyStore {
    pub fn connect(config: &DbConfig) -> Result<Self, StoreError> {
        let client = connect_client(config)?;
        Ok(Self { client })
    }

    fn db_name(instance_id: &str) -> String {
        format!("{}_studyDB", instance_id)
    }

    fn participants(&self, instance_id: &str, study_key: &str) -> Collection<Participant> {
        self.client
            .database(&Self::db_name(instance_id))
            .collection(&format!("{}_participants", study_key))
    }

    fn confidential_id_map(&self, instance_id: &str) -> Collection<ConfidentialIdMapEntry> {
        self.client
            .database(&Self::db_name(instance_id))
            .collection(CONFIDENTIAL_ID_MAP_COLLECTION)
    }

    fn confidential_responses(
        &self,
        instance_id: &str,
        study_key: &str,
    ) -> Collection<ConfidentialResponse> {
        self.client
            .database(&Self::db_name(instance_id))
            .collection(&format!("{}_confidentialResponses", study_key))
    }
}

impl StudyStore for MongoStudyStore {
    fn get_participant_by_id(
        &self,
        instance_id: &str,
        study_key: &str,
        participant_id: &str,
    ) -> Result<Participant, StoreError> {
        let filter = doc! { "participantID": participant_id };

        self.participants(instance_id, study_key)
            .find_one(filter)
            .run()?
            .ok_or(StoreError::NotFound)
    }

    fn get_profile_id_from_confidential_id(
        &self,
        instance_id: &str,
        confidential_id: &str,
        study_key: &str,
    ) -> Result<String, StoreError> {
        let filter = doc! {
            "confidentialID": confidential_id,
            "studyKey": study_key,
        };

        let entry = self
            .confidential_id_map(instance_id)
            .find_one(filter)
            .run()?
            .ok_or(StoreError::NotFound)?;

        Ok(entry.profile_id)
    }

    fn replace_confidential_response(
        &self,
        instance_id: &str,
        study_key: &str,
        response: &ConfidentialResponse,
    ) -> Result<(), StoreError> {
        let filter = doc! {
            "key": &response.key,
            "participantID": &response.participant_id,
        };

        self.confidential_responses(instance_id, study_key)
            .replace_one(filter, response)
            .upsert(true)
            .run()?;

        Ok(())
    }
}
