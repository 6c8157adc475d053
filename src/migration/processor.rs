//! Per-row write-back against the participant user and study databases.
//!
//! Each row walks a fixed sequence of checks and conditional writes; any
//! rejection logs the context, short-circuits the remaining steps and counts
//! the row as a failure without stopping the run.

use log::{debug, error, info};

use crate::{
    csv::stream_reader::CsvRow,
    db::{
        StudyStore, UserStore,
        models::{ConfidentialResponse, RESPONSE_KEY_CONTACT, ResponseItem, User},
    },
    ident,
};

use super::transform::{Address, AddressTransformer, prep_phone_number};

/// Run-wide settings, derived from the configuration at startup.
#[derive(Debug, Clone)]
pub struct MigrationOptions {
    pub instance_id: String,
    pub study_key: String,
    pub dry_run: bool,
    pub force_override_phone: bool,
    pub write_address: bool,
    pub global_secret: String,
    pub study_secret: String,
    pub id_mapping_method: String,
}

impl MigrationOptions {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            instance_id: config.instance_id.clone(),
            study_key: config.study_key.clone(),
            dry_run: config.dry_run,
            force_override_phone: config.force_override_phone,
            write_address: config.write_address,
            global_secret: config.study.global_secret.clone(),
            study_secret: config.study.secret_key.clone(),
            id_mapping_method: config.study.id_mapping_method.clone(),
        }
    }
}

/// Row handler for the contact migration. Driven by
/// [`stream_csv`](crate::csv::stream_reader::stream_csv), one row at a time.
pub struct MigrateContactsProcessor<'a> {
    options: MigrationOptions,
    transformer: AddressTransformer,
    study_store: &'a dyn StudyStore,
    user_store: &'a dyn UserStore,
    processed_count: usize,
}

impl<'a> MigrateContactsProcessor<'a> {
    pub fn new(
        options: MigrationOptions,
        transformer: AddressTransformer,
        study_store: &'a dyn StudyStore,
        user_store: &'a dyn UserStore,
    ) -> Self {
        Self {
            options,
            transformer,
            study_store,
            user_store,
            processed_count: 0,
        }
    }

    pub fn processed_count(&self) -> usize {
        self.processed_count
    }

    /// Processes one row. Returns whether the row completed all required
    /// steps; a `false` return has already been logged with its context.
    pub fn process_row(&mut self, row: &CsvRow, row_index: usize) -> bool {
        debug!(
            "Processing row (index: {}, pid: {})",
            row_index, row.participant_id
        );

        self.processed_count += 1;

        if row.participant_id.is_empty() {
            error!(
                "Missing required field '{}' in row (row_index: {})",
                crate::csv::stream_reader::HEADER_PARTICIPANT_ID,
                row_index
            );
            return false;
        }

        let phone_number = prep_phone_number(&row.phone_number);
        let address = self.transformer.address_from(row);

        debug!("Address: {:?}", address);

        if !self.participant_exists_and_active(&row.participant_id) {
            error!(
                "Participant does not exist or account was deleted (pid: {}, instance_id: {}, study_key: {}, row_index: {})",
                row.participant_id, self.options.instance_id, self.options.study_key, row_index
            );
            return false;
        }

        let confidential_id = match ident::compute_confidential_id(
            &row.participant_id,
            &self.options.global_secret,
            &self.options.study_secret,
            &self.options.id_mapping_method,
        ) {
            Ok(confidential_id) => confidential_id,
            Err(err) => {
                error!(
                    "Error computing participant IDs (instance_id: {}, study_key: {}, error: {})",
                    self.options.instance_id, self.options.study_key, err
                );
                return false;
            }
        };

        let profile_id = match self.study_store.get_profile_id_from_confidential_id(
            &self.options.instance_id,
            &confidential_id,
            &self.options.study_key,
        ) {
            Ok(profile_id) => profile_id,
            Err(err) => {
                error!(
                    "Error getting profile ID from confidential ID (instance_id: {}, study_key: {}, error: {})",
                    self.options.instance_id, self.options.study_key, err
                );
                return false;
            }
        };

        let mut user = match self
            .user_store
            .get_user_by_profile_id(&self.options.instance_id, &profile_id)
        {
            Ok(user) => user,
            Err(err) => {
                error!(
                    "Error getting user by profile ID (instance_id: {}, study_key: {}, error: {})",
                    self.options.instance_id, self.options.study_key, err
                );
                return false;
            }
        };

        if !self.update_phone_number(&mut user, &phone_number) {
            return false;
        }

        if self.options.write_address && !self.store_address(&confidential_id, &address) {
            return false;
        }

        true
    }

    fn participant_exists_and_active(&self, participant_id: &str) -> bool {
        match self.study_store.get_participant_by_id(
            &self.options.instance_id,
            &self.options.study_key,
            participant_id,
        ) {
            Ok(participant) => participant.is_active(),
            Err(err) => {
                error!("Error getting participant (error: {})", err);
                false
            }
        }
    }

    fn update_phone_number(&self, user: &mut User, phone_number: &str) -> bool {
        let mut should_update_phone_number = false;

        if user.has_phone_number() {
            if self.options.force_override_phone {
                user.set_phone_number(phone_number);
                user.confirm_phone_number();
                info!(
                    "Overriding phone number for user (user_id: {})",
                    user.id.to_hex()
                );
                should_update_phone_number = true;
            } else {
                info!(
                    "Phone number already exists for user, use the config 'force_override_phone' to override it (user_id: {})",
                    user.id.to_hex()
                );
            }
        } else {
            user.set_phone_number(phone_number);
            user.confirm_phone_number();
            should_update_phone_number = true;
        }

        if should_update_phone_number {
            if self.options.dry_run {
                info!(
                    "Would update phone number for user (user_id: {})",
                    user.id.to_hex()
                );
            } else {
                if let Err(err) = self
                    .user_store
                    .replace_user(&self.options.instance_id, user)
                {
                    error!(
                        "Error updating phone number for user (instance_id: {}, study_key: {}, error: {})",
                        self.options.instance_id, self.options.study_key, err
                    );
                    return false;
                }
                info!(
                    "Updated phone number for user (user_id: {})",
                    user.id.to_hex()
                );
            }
        }

        true
    }

    fn store_address(&self, confidential_id: &str, address: &Address) -> bool {
        let response = contact_response(confidential_id, address);

        if self.options.dry_run {
            let rendered = serde_json::to_string(&response)
                .unwrap_or_else(|_| format!("{:?}", response));
            info!(
                "Would store contact details for participant (confidential_id: {}, response: {})",
                confidential_id, rendered
            );
            return true;
        }

        if let Err(err) = self.study_store.replace_confidential_response(
            &self.options.instance_id,
            &self.options.study_key,
            &response,
        ) {
            error!(
                "Error storing contact details (instance_id: {}, study_key: {}, error: {})",
                self.options.instance_id, self.options.study_key, err
            );
            return false;
        }

        info!(
            "Stored contact details for participant (confidential_id: {})",
            confidential_id
        );
        true
    }
}

/// Builds the confidential response embedding the address. Only name and
/// address slots are populated; the remaining slots stay blank.
fn contact_response(confidential_id: &str, address: &Address) -> ConfidentialResponse {
    let full_name = format!("{} {}", address.first_name, address.last_name)
        .trim()
        .to_string();

    ConfidentialResponse {
        key: RESPONSE_KEY_CONTACT.to_string(),
        participant_id: confidential_id.to_string(),
        response: ResponseItem {
            key: RESPONSE_KEY_CONTACT.to_string(),
            value: String::new(),
            items: vec![
                ResponseItem::slot("fullName", &full_name),
                ResponseItem::slot("firstName", &address.first_name),
                ResponseItem::slot("lastName", &address.last_name),
                ResponseItem::slot("company", ""),
                ResponseItem::slot("email", ""),
                ResponseItem::slot("phone", ""),
                ResponseItem::slot("street", &address.street),
                ResponseItem::slot("street2", &address.street2),
                ResponseItem::slot("city", &address.city),
                ResponseItem::slot("postalCode", &address.postal_code),
                ResponseItem::slot("country", &address.country),
                ResponseItem::slot("houseNumber", &address.house_number),
            ],
        },
    }
}

#[cfg(test)]
mod tests {
    use mockall::mock;
    use mongodb::bson::{Document, oid::ObjectId};

    use crate::{
        db::{
            StoreError,
            models::{Participant, PhoneContact},
        },
        migration::transform::AddressPolicy,
    };

    use super::*;

    mock! {
        pub Study {}
        impl StudyStore for Study {
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
    }

    mock! {
        pub Users {}
        impl UserStore for Users {
            fn get_user_by_profile_id(
                &self,
                instance_id: &str,
                profile_id: &str,
            ) -> Result<User, StoreError>;
            fn replace_user(&self, instance_id: &str, user: &User) -> Result<(), StoreError>;
        }
    }

    fn options() -> MigrationOptions {
        MigrationOptions {
            instance_id: "nl".to_string(),
            study_key: "contact-study".to_string(),
            dry_run: false,
            force_override_phone: false,
            write_address: false,
            global_secret: "global".to_string(),
            study_secret: "study".to_string(),
            id_mapping_method: ident::ID_MAPPING_SAME.to_string(),
        }
    }

    fn row(participant_id: &str, phone_number: &str) -> CsvRow {
        CsvRow {
            participant_id: participant_id.to_string(),
            phone_number: phone_number.to_string(),
            first_name: "Jan".to_string(),
            last_name: "Jansen".to_string(),
            address: "Kerkstraat 12b".to_string(),
            city: "Utrecht".to_string(),
            zip_code: "3511AB".to_string(),
            ..CsvRow::default()
        }
    }

    fn participant(status: &str) -> Participant {
        Participant {
            participant_id: "P001".to_string(),
            study_status: status.to_string(),
            extra: Document::new(),
        }
    }

    fn user_without_phone() -> User {
        User {
            id: ObjectId::new(),
            phone: None,
            extra: Document::new(),
        }
    }

    fn user_with_phone(number: &str) -> User {
        User {
            id: ObjectId::new(),
            phone: Some(PhoneContact {
                number: number.to_string(),
                confirmed: true,
            }),
            extra: Document::new(),
        }
    }

    fn processor<'a>(
        options: MigrationOptions,
        study: &'a MockStudy,
        users: &'a MockUsers,
    ) -> MigrateContactsProcessor<'a> {
        MigrateContactsProcessor::new(
            options,
            AddressTransformer::new(AddressPolicy::RegexDecomposition),
            study,
            users,
        )
    }

    /// Wires up the happy path until the user lookup: active participant,
    /// identity ID mapping, profile ID "profile-1".
    fn expect_lookups(study: &mut MockStudy, users: &mut MockUsers, user: User) {
        study
            .expect_get_participant_by_id()
            .returning(|_, _, _| Ok(participant("active")));
        study
            .expect_get_profile_id_from_confidential_id()
            .returning(|_, _, _| Ok("profile-1".to_string()));
        users
            .expect_get_user_by_profile_id()
            .returning(move |_, _| Ok(user.clone()));
    }

    #[test]
    fn missing_participant_id_fails_without_any_store_call() {
        let study = MockStudy::new();
        let users = MockUsers::new();
        let mut processor = processor(options(), &study, &users);

        // any store call would panic: no expectations are registered
        assert!(!processor.process_row(&row("", "0612345678"), 0));
        assert_eq!(processor.processed_count(), 1);
    }

    #[test]
    fn inactive_participant_fails_without_user_lookup() {
        let mut study = MockStudy::new();
        study
            .expect_get_participant_by_id()
            .times(1)
            .returning(|_, _, _| Ok(participant("accountDeleted")));
        let users = MockUsers::new();

        let mut processor = processor(options(), &study, &users);

        assert!(!processor.process_row(&row("P001", "0612345678"), 0));
    }

    #[test]
    fn participant_lookup_error_fails_the_row() {
        let mut study = MockStudy::new();
        study
            .expect_get_participant_by_id()
            .returning(|_, _, _| Err(StoreError::NotFound));
        let users = MockUsers::new();

        let mut processor = processor(options(), &study, &users);

        assert!(!processor.process_row(&row("P001", "0612345678"), 0));
    }

    #[test]
    fn unknown_id_mapping_method_fails_the_row() {
        let mut study = MockStudy::new();
        study
            .expect_get_participant_by_id()
            .returning(|_, _, _| Ok(participant("active")));
        let users = MockUsers::new();

        let mut opts = options();
        opts.id_mapping_method = "rot13".to_string();
        let mut processor = processor(opts, &study, &users);

        assert!(!processor.process_row(&row("P001", "0612345678"), 0));
    }

    #[test]
    fn profile_id_lookup_error_fails_the_row() {
        let mut study = MockStudy::new();
        study
            .expect_get_participant_by_id()
            .returning(|_, _, _| Ok(participant("active")));
        study
            .expect_get_profile_id_from_confidential_id()
            .returning(|_, _, _| Err(StoreError::NotFound));
        let users = MockUsers::new();

        let mut processor = processor(options(), &study, &users);

        assert!(!processor.process_row(&row("P001", "0612345678"), 0));
    }

    #[test]
    fn sets_and_confirms_phone_number_for_user_without_one() {
        let mut study = MockStudy::new();
        let mut users = MockUsers::new();
        expect_lookups(&mut study, &mut users, user_without_phone());
        users
            .expect_replace_user()
            .times(1)
            .withf(|_, user| {
                let contact = user.phone.as_ref().unwrap();
                contact.number == "+31612345678" && contact.confirmed
            })
            .returning(|_, _| Ok(()));

        let mut processor = processor(options(), &study, &users);

        assert!(processor.process_row(&row("P001", "31612345678"), 0));
    }

    #[test]
    fn existing_phone_number_is_kept_without_force_flag() {
        let mut study = MockStudy::new();
        let mut users = MockUsers::new();
        expect_lookups(&mut study, &mut users, user_with_phone("+31611111111"));
        users.expect_replace_user().times(0);

        let mut processor = processor(options(), &study, &users);

        // skipped override still counts as success
        assert!(processor.process_row(&row("P001", "31622222222"), 0));
    }

    #[test]
    fn force_flag_overrides_existing_phone_number() {
        let mut study = MockStudy::new();
        let mut users = MockUsers::new();
        expect_lookups(&mut study, &mut users, user_with_phone("+31611111111"));
        users
            .expect_replace_user()
            .times(1)
            .withf(|_, user| user.phone.as_ref().unwrap().number == "+31622222222")
            .returning(|_, _| Ok(()));

        let mut opts = options();
        opts.force_override_phone = true;
        let mut processor = processor(opts, &study, &users);

        assert!(processor.process_row(&row("P001", "31622222222"), 0));
    }

    #[test]
    fn dry_run_never_writes_but_row_succeeds() {
        let mut study = MockStudy::new();
        let mut users = MockUsers::new();
        expect_lookups(&mut study, &mut users, user_without_phone());
        users.expect_replace_user().times(0);
        study.expect_replace_confidential_response().times(0);

        let mut opts = options();
        opts.dry_run = true;
        opts.write_address = true;
        let mut processor = processor(opts, &study, &users);

        assert!(processor.process_row(&row("P001", "31612345678"), 0));
    }

    #[test]
    fn replace_user_error_fails_the_row() {
        let mut study = MockStudy::new();
        let mut users = MockUsers::new();
        expect_lookups(&mut study, &mut users, user_without_phone());
        users
            .expect_replace_user()
            .returning(|_, _| Err(StoreError::Backend("connection reset".to_string())));

        let mut processor = processor(options(), &study, &users);

        assert!(!processor.process_row(&row("P001", "31612345678"), 0));
    }

    #[test]
    fn writes_address_as_confidential_response() {
        let mut study = MockStudy::new();
        let mut users = MockUsers::new();
        expect_lookups(&mut study, &mut users, user_without_phone());
        users.expect_replace_user().returning(|_, _| Ok(()));
        study
            .expect_replace_confidential_response()
            .times(1)
            .withf(|_, _, response| {
                response.participant_id == "P001"
                    && response
                        .response
                        .items
                        .iter()
                        .any(|item| item.key == "street" && item.value == "Kerkstraat")
                    && response
                        .response
                        .items
                        .iter()
                        .any(|item| item.key == "houseNumber" && item.value == "12b")
            })
            .returning(|_, _, _| Ok(()));

        let mut opts = options();
        opts.write_address = true;
        let mut processor = processor(opts, &study, &users);

        assert!(processor.process_row(&row("P001", "31612345678"), 0));
    }

    #[test]
    fn address_write_error_fails_the_row_after_phone_write() {
        let mut study = MockStudy::new();
        let mut users = MockUsers::new();
        expect_lookups(&mut study, &mut users, user_without_phone());
        // phone write succeeds, address write fails, no compensation
        users.expect_replace_user().times(1).returning(|_, _| Ok(()));
        study
            .expect_replace_confidential_response()
            .returning(|_, _, _| Err(StoreError::Backend("write failed".to_string())));

        let mut opts = options();
        opts.write_address = true;
        let mut processor = processor(opts, &study, &users);

        assert!(!processor.process_row(&row("P001", "31612345678"), 0));
    }

    #[test]
    fn contact_response_populates_name_and_address_slots_only() {
        let address = Address {
            first_name: "Jan".to_string(),
            last_name: "Jansen".to_string(),
            street: "Kerkstraat".to_string(),
            house_number: "12b".to_string(),
            street2: "Apt 3".to_string(),
            city: "Utrecht".to_string(),
            postal_code: "3511AB".to_string(),
            country: String::new(),
        };

        let response = contact_response("conf-1", &address);

        assert_eq!(response.key, RESPONSE_KEY_CONTACT);
        assert_eq!(response.participant_id, "conf-1");

        let slot = |key: &str| {
            response
                .response
                .items
                .iter()
                .find(|item| item.key == key)
                .map(|item| item.value.as_str())
        };

        assert_eq!(slot("fullName"), Some("Jan Jansen"));
        assert_eq!(slot("street"), Some("Kerkstraat"));
        assert_eq!(slot("street2"), Some("Apt 3"));
        assert_eq!(slot("postalCode"), Some("3511AB"));
        assert_eq!(slot("houseNumber"), Some("12b"));
        assert_eq!(slot("company"), Some(""));
        assert_eq!(slot("email"), Some(""));
        assert_eq!(slot("phone"), Some(""));
    }
}
