//! Converts a raw CSV row into normalized domain values: a phone number
//! with an enforced `+` prefix and a decomposed postal address.

use regex::Regex;
use serde::Deserialize;

use crate::csv::stream_reader::CsvRow;

// Street name, house number with optional letter suffix, optional secondary
// line after spaces and/or a hyphen. Matches Dutch address strings like
// "Kerkstraat 12b - 2e verdieping".
const ADDRESS_PATTERN: &str = r"^(.+?)\s+(\d+)([a-zA-Z]*)(?:\s*[-\s]\s*(.+))?$";

/// Normalizes a phone number by enforcing a leading `+`.
///
/// An empty input stays empty and an already prefixed number is returned
/// unchanged, so the normalization is idempotent. No further validation is
/// done; the numbers come from a curated export.
pub fn prep_phone_number(raw: &str) -> String {
    if raw.is_empty() || raw.starts_with('+') {
        return raw.to_string();
    }

    format!("+{}", raw)
}

/// A normalized postal address. Built once per row, written back as part of
/// a confidential response, then discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    pub street: String,
    pub house_number: String,
    pub street2: String,
    pub city: String,
    pub postal_code: String,
    /// Always left empty; the export does not carry a country column.
    pub country: String,
}

/// How address fields are obtained from the export. Exactly one policy is
/// active per deployment, selected in the configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressPolicy {
    /// The export has a single combined address column that is decomposed
    /// with a regex.
    #[default]
    RegexDecomposition,
    /// The export already separates street and house number columns.
    FieldMapped,
}

pub struct AddressTransformer {
    policy: AddressPolicy,
    pattern: Regex,
}

impl AddressTransformer {
    pub fn new(policy: AddressPolicy) -> Self {
        let pattern = Regex::new(ADDRESS_PATTERN).expect("address pattern is valid");
        Self { policy, pattern }
    }

    /// Builds an [`Address`] from a row.
    ///
    /// This never fails: when the combined address string cannot be
    /// decomposed the result falls back to name, city and postal code with
    /// the street fields left empty.
    pub fn address_from(&self, row: &CsvRow) -> Address {
        let mut result = Address {
            first_name: row.first_name.clone(),
            last_name: row.last_name.clone(),
            city: row.city.clone(),
            postal_code: row.zip_code.clone(),
            ..Address::default()
        };

        match self.policy {
            AddressPolicy::FieldMapped => {
                result.street = row.address.clone();
                result.house_number =
                    format!("{}{}", row.house_number, row.house_number_suffix);
            }
            AddressPolicy::RegexDecomposition => {
                let address = row.address.trim();
                if address.is_empty() {
                    return result;
                }

                let Some(captures) = self.pattern.captures(address) else {
                    return result;
                };

                result.street = captures[1].trim().to_string();
                // number + suffix, e.g. "12" + "b"
                result.house_number = format!("{}{}", &captures[2], &captures[3]);

                if let Some(extra) = captures.get(4) {
                    result.street2 = extra.as_str().trim().to_string();
                }
            }
        }

        result
    }
}
