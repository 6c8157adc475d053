//! Keyed one-way transform from a participant ID to its confidential ID.
//!
//! Study data is stored under pseudonymized identifiers so it cannot be
//! linked back to an account without the study secrets. The transform hashes
//! the participant ID together with the instance-level global secret and the
//! study-specific secret key; the method is part of the study configuration
//! and must match the one the study was created with.

use sha2::{Digest, Sha224, Sha256};

use crate::error::MigrationError;

pub const ID_MAPPING_SHA224: &str = "sha224";
pub const ID_MAPPING_SHA256: &str = "sha256";
/// Identity mapping, used by test and legacy deployments.
pub const ID_MAPPING_SAME: &str = "same";

/// Computes the confidential ID for a participant.
pub fn compute_confidential_id(
    participant_id: &str,
    global_secret: &str,
    study_secret: &str,
    method: &str,
) -> Result<String, MigrationError> {
    match method {
        ID_MAPPING_SAME => Ok(participant_id.to_string()),
        ID_MAPPING_SHA224 => {
            let mut hasher = Sha224::new();
            hasher.update(participant_id.as_bytes());
            hasher.update(global_secret.as_bytes());
            hasher.update(study_secret.as_bytes());
            Ok(hex::encode(hasher.finalize()))
        }
        ID_MAPPING_SHA256 => {
            let mut hasher = Sha256::new();
            hasher.update(participant_id.as_bytes());
            hasher.update(global_secret.as_bytes());
            hasher.update(study_secret.as_bytes());
            Ok(hex::encode(hasher.finalize()))
        }
        other => Err(MigrationError::IdMapping(other.to_string())),
    }
}
