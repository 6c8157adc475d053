//! Document types shared between the stores and the migration processor.
//!
//! Only the fields this job reads or writes are modeled; everything else in
//! a document is kept in the flattened `extra` remainder so a full-document
//! replace never drops data written by other services.

use mongodb::bson::{Document, oid::ObjectId};
use serde::{Deserialize, Serialize};

pub const PARTICIPANT_STATUS_ACTIVE: &str = "active";

pub const RESPONSE_KEY_CONTACT: &str = "contact";

/// A study participant, read-only for this job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    #[serde(rename = "participantID")]
    pub participant_id: String,
    #[serde(rename = "studyStatus", default)]
    pub study_status: String,
    #[serde(flatten)]
    pub extra: Document,
}

impl Participant {
    pub fn is_active(&self) -> bool {
        self.study_status == PARTICIPANT_STATUS_ACTIVE
    }
}

/// Phone contact entry on a user account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneContact {
    pub number: String,
    #[serde(default)]
    pub confirmed: bool,
}

/// A participant user account. The only entity this job writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<PhoneContact>,
    #[serde(flatten)]
    pub extra: Document,
}

impl User {
    pub fn has_phone_number(&self) -> bool {
        self.phone
            .as_ref()
            .is_some_and(|contact| !contact.number.is_empty())
    }

    /// Replaces the phone contact, resetting the confirmed flag.
    pub fn set_phone_number(&mut self, number: &str) {
        self.phone = Some(PhoneContact {
            number: number.to_string(),
            confirmed: false,
        });
    }

    pub fn confirm_phone_number(&mut self) {
        if let Some(contact) = self.phone.as_mut() {
            contact.confirmed = true;
        }
    }
}

/// Entry of the confidential-ID map linking pseudonymized study data to a
/// user profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidentialIdMapEntry {
    #[serde(rename = "confidentialID")]
    pub confidential_id: String,
    #[serde(rename = "profileID")]
    pub profile_id: String,
    #[serde(rename = "studyKey")]
    pub study_key: String,
}

/// One slot of a confidential response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseItem {
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<ResponseItem>,
}

impl ResponseItem {
    pub fn slot(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
            items: Vec::new(),
        }
    }
}

/// A confidential response document, keyed by the confidential participant
/// ID so the contact details stay decoupled from the account identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidentialResponse {
    pub key: String,
    #[serde(rename = "participantID")]
    pub participant_id: String,
    pub response: ResponseItem,
}
