//! DynamoDB adapter implementing the `PreferenceRepository` port.
//!
//! - `adapter`: converts a `Preference` to and from its DynamoDB item.
//! - `store`: get/put of items by primary key, against a real table
//!   (`DynamoRecordStore`) or a map (`InMemoryRecordStore`).
//! - `DynamoPreferenceRepo`: the repository port, composed of a store and the
//!   adapter.
//!
//! Notes:
//! - The domain `PreferenceRepository` trait is synchronous. The SDK-backed
//!   store bridges to the async AWS SDK with `block_on`.
//! - Table provisioning is out of scope; the table must exist with a string
//!   hash key named `PreferenceID`.

pub mod adapter;
pub mod store;

pub use adapter::{
    AdapterError, DynamoPreferenceAdapter, Item, Source, CORRELATIONS_ATTRIBUTE,
    POPULARITY_ATTRIBUTE, PREFERENCE_ID_ATTRIBUTE,
};
pub use store::{DynamoRecordStore, InMemoryRecordStore, RecordStore};

use domain::{CoreError, Preference, PreferenceKey, PreferenceRepository};
use tracing::debug;

const DEFAULT_PREFERENCES_TABLE: &str = "Preferences";

/// Configuration for DynamoDB table names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DynamoTables {
    pub preferences: String,
}

impl DynamoTables {
    pub fn new(preferences: impl Into<String>) -> Self {
        Self {
            preferences: preferences.into(),
        }
    }

    /// Build from `DYNAMO_TABLE_PREFERENCES`, falling back to "Preferences".
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let preferences = lookup("DYNAMO_TABLE_PREFERENCES")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PREFERENCES_TABLE.into());
        Self { preferences }
    }
}

impl Default for DynamoTables {
    fn default() -> Self {
        Self::new(DEFAULT_PREFERENCES_TABLE)
    }
}

/// Preference repository over any `RecordStore`.
pub struct DynamoPreferenceRepo<S: RecordStore> {
    store: S,
}

impl<S: RecordStore> DynamoPreferenceRepo<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl DynamoPreferenceRepo<DynamoRecordStore> {
    /// Repository against the table named by `DYNAMO_TABLE_PREFERENCES`.
    pub fn from_env() -> Result<Self, CoreError> {
        Ok(Self::new(DynamoRecordStore::from_env()?))
    }
}

impl<S: RecordStore> PreferenceRepository for DynamoPreferenceRepo<S> {
    fn get(&self, key: &PreferenceKey) -> Result<Option<Preference>, CoreError> {
        let Some(item) = self.store.get_item(&key.encode())? else {
            debug!(key = %key, "preference not found");
            return Ok(None);
        };
        let preference = DynamoPreferenceAdapter::new()
            .with_db_model(item)
            .to_object()
            .map_err(map_adapter_err)?;
        Ok(Some(preference))
    }

    fn put(&self, preference: Preference) -> Result<(), CoreError> {
        let item = DynamoPreferenceAdapter::new()
            .with_object(preference)
            .to_db_model()
            .map_err(map_adapter_err)?;
        self.store.put_item(item)
    }
}

fn map_adapter_err(e: AdapterError) -> CoreError {
    CoreError::Repository(format!("bad preference item: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_dynamodb::types::AttributeValue;
    use domain::{key, PreferenceCategory, PreferenceCorrelation};

    fn lotr() -> Preference {
        Preference::new(
            "Lord of the Rings",
            PreferenceCategory::Books,
            20,
            vec![
                PreferenceCorrelation::new(key::compose("Harry Potter", PreferenceCategory::Books), 10),
                PreferenceCorrelation::new(key::compose("Dune", PreferenceCategory::Movies), 2),
            ],
        )
        .unwrap()
    }

    #[test]
    fn repo_roundtrip_through_memory_store() {
        let repo = DynamoPreferenceRepo::new(InMemoryRecordStore::new());
        let pref = lotr();
        repo.put(pref.clone()).unwrap();

        let got = repo.get(&pref.key()).unwrap().unwrap();
        assert_eq!(got, pref);
        assert_eq!(got.sorted_correlations(), pref.sorted_correlations());
    }

    #[test]
    fn repo_writes_items_under_composite_key() {
        let repo = DynamoPreferenceRepo::new(InMemoryRecordStore::new());
        repo.put(lotr()).unwrap();
        let item = repo
            .store()
            .get_item("Lord of the Rings#BOOKS")
            .unwrap()
            .unwrap();
        assert_eq!(
            item[PREFERENCE_ID_ATTRIBUTE].as_s().unwrap(),
            "Lord of the Rings#BOOKS"
        );
        assert_eq!(item[POPULARITY_ATTRIBUTE].as_n().unwrap(), "20");
    }

    #[test]
    fn repo_get_missing_is_none() {
        let repo = DynamoPreferenceRepo::new(InMemoryRecordStore::new());
        let key = PreferenceKey::new("Nope", PreferenceCategory::Music).unwrap();
        assert!(repo.get(&key).unwrap().is_none());
    }

    #[test]
    fn repo_surfaces_malformed_items() {
        let store = InMemoryRecordStore::new();
        let mut item = Item::new();
        item.insert(
            PREFERENCE_ID_ATTRIBUTE.into(),
            AttributeValue::S("Dune#BOOKS".into()),
        );
        store.put_item(item).unwrap();

        let repo = DynamoPreferenceRepo::new(store);
        let key = PreferenceKey::new("Dune", PreferenceCategory::Books).unwrap();
        let err = repo.get(&key).unwrap_err();
        assert!(matches!(err, CoreError::Repository(msg) if msg.contains(POPULARITY_ATTRIBUTE)));
    }

    #[test]
    fn tables_from_lookup() {
        let t = DynamoTables::from_lookup(|_| None);
        assert_eq!(t, DynamoTables::default());

        let t = DynamoTables::from_lookup(|name| {
            (name == "DYNAMO_TABLE_PREFERENCES").then(|| "prefs-dev".to_string())
        });
        assert_eq!(t.preferences, "prefs-dev");

        let t = DynamoTables::from_lookup(|_| Some("  ".to_string()));
        assert_eq!(t.preferences, "Preferences");
    }
}
