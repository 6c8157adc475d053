use mongodb::{
    bson::doc,
    sync::{Client, Collection},
};

use crate::config::DbConfig;

use super::{StoreError, UserStore, connect_client, models::User};

const USERS_COLLECTION: &str = "users";

/// MongoDB-backed participant user store.
pub struct MongoUserStore {
    client: Client,
}

impl MongoUserStore {
    pub fn connect(config: &DbConfig) -> Result<Self, StoreError> {
        let client = connect_client(config)?;
        Ok(Self { client })
    }

    fn users(&self, instance_id: &str) -> Collection<User> {
        self.client
            .database(&format!("{}_users", instance_id))
            .collection(USERS_COLLECTION)
    }
}

impl UserStore for MongoUserStore {
    fn get_user_by_profile_id(
        &self,
        instance_id: &str,
        profile_id: &str,
    ) -> Result<User, StoreError> {
        let filter = doc! { "profiles.id": profile_id };

        self.users(instance_id)
            .find_one(filter)
            .run()?
            .ok_or(StoreError::NotFound)
    }

    fn replace_user(&self, instance_id: &str, user: &User) -> Result<(), StoreError> {
        let result = self
            .users(instance_id)
            .replace_one(doc! { "_id": user.id }, user)
            .run()?;

        if result.matched_count == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }
}
