//! In-memory fakes for the store traits, substituted for MongoDB in the
//! integration tests through the same `get`/`replace` interface.

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
};

use mongodb::bson::{Document, oid::ObjectId};

use contact_migration::db::{
    StoreError, StudyStore, UserStore,
    models::{ConfidentialResponse, Participant, PhoneContact, User},
};

#[derive(Default)]
pub struct FakeStudyStore {
    pub participants: Vec<Participant>,
    /// confidential ID -> profile ID
    pub profile_ids: HashMap<String, String>,
    pub responses: RefCell<Vec<ConfidentialResponse>>,
}

impl StudyStore for FakeStudyStore {
    fn get_participant_by_id(
        &self,
        _instance_id: &str,
        _study_key: &str,
        participant_id: &str,
    ) -> Result<Participant, StoreError> {
        self.participants
            .iter()
            .find(|participant| participant.participant_id == participant_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn get_profile_id_from_confidential_id(
        &self,
        _instance_id: &str,
        confidential_id: &str,
        _study_key: &str,
    ) -> Result<String, StoreError> {
        self.profile_ids
            .get(confidential_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn replace_confidential_response(
        &self,
        _instance_id: &str,
        _study_key: &str,
        response: &ConfidentialResponse,
    ) -> Result<(), StoreError> {
        let mut responses = self.responses.borrow_mut();
        responses.retain(|existing| {
            !(existing.key == response.key
                && existing.participant_id == response.participant_id)
        });
        responses.push(response.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeUserStore {
    /// profile ID -> user
    pub users: RefCell<HashMap<String, User>>,
    pub replace_calls: Cell<usize>,
}

impl FakeUserStore {
    pub fn insert(&self, profile_id: &str, user: User) {
        self.users.borrow_mut().insert(profile_id.to_string(), user);
    }

    pub fn user_for_profile(&self, profile_id: &str) -> Option<User> {
        self.users.borrow().get(profile_id).cloned()
    }
}

impl UserStore for FakeUserStore {
    fn get_user_by_profile_id(
        &self,
        _instance_id: &str,
        profile_id: &str,
    ) -> Result<User, StoreError> {
        self.users
            .borrow()
            .get(profile_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn replace_user(&self, _instance_id: &str, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.borrow_mut();
        let entry = users
            .values_mut()
            .find(|existing| existing.id == user.id)
            .ok_or(StoreError::NotFound)?;

        *entry = user.clone();
        self.replace_calls.set(self.replace_calls.get() + 1);
        Ok(())
    }
}

pub fn participant(participant_id: &str, status: &str) -> Participant {
    Participant {
        participant_id: participant_id.to_string(),
        study_status: status.to_string(),
        extra: Document::new(),
    }
}

pub fn user(phone: Option<&str>) -> User {
    User {
        id: ObjectId::new(),
        phone: phone.map(|number| PhoneContact {
            number: number.to_string(),
            confirmed: true,
        }),
        extra: Document::new(),
    }
}
