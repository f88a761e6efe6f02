use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::{CoreError, Preference, PreferenceKey, PreferenceRepository};

/// Simple in-memory repository for tests. Not thread-safe for high concurrency
/// beyond the internal mutex guarding the map.
pub struct InMemoryPreferenceRepo {
    inner: Mutex<BTreeMap<PreferenceKey, Preference>>,
}

impl InMemoryPreferenceRepo {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn len(&self) -> Result<usize, CoreError> {
        let map = self
            .inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        Ok(map.len())
    }

    pub fn is_empty(&self) -> Result<bool, CoreError> {
        Ok(self.len()? == 0)
    }
}

impl Default for InMemoryPreferenceRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl PreferenceRepository for InMemoryPreferenceRepo {
    fn get(&self, key: &PreferenceKey) -> Result<Option<Preference>, CoreError> {
        let map = self
            .inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        Ok(map.get(key).cloned())
    }

    fn put(&self, preference: Preference) -> Result<(), CoreError> {
        let mut map = self
            .inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        map.insert(preference.key(), preference);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PreferenceCategory, PreferenceCorrelation};

    fn mk_pref(id: &str, popularity: u32) -> Preference {
        Preference::new(
            id,
            PreferenceCategory::Books,
            popularity,
            vec![PreferenceCorrelation::for_key(
                &PreferenceKey::new("Harry Potter", PreferenceCategory::Books).unwrap(),
                10,
            )],
        )
        .unwrap()
    }

    #[test]
    fn put_get_roundtrip() {
        let repo = InMemoryPreferenceRepo::new();
        let pref = mk_pref("Lord of the Rings", 20);
        repo.put(pref.clone()).unwrap();
        let got = repo.get(&pref.key()).unwrap().unwrap();
        assert_eq!(got, pref);
    }

    #[test]
    fn put_replaces_existing() {
        let repo = InMemoryPreferenceRepo::new();
        repo.put(mk_pref("Dune", 1)).unwrap();
        repo.put(mk_pref("Dune", 7)).unwrap();
        assert_eq!(repo.len().unwrap(), 1);
        let key = PreferenceKey::new("Dune", PreferenceCategory::Books).unwrap();
        assert_eq!(repo.get(&key).unwrap().unwrap().popularity(), 7);
    }

    #[test]
    fn same_id_different_category_is_distinct() {
        let repo = InMemoryPreferenceRepo::new();
        repo.put(mk_pref("Dune", 1)).unwrap();
        let movie = PreferenceKey::new("Dune", PreferenceCategory::Movies).unwrap();
        assert!(repo.get(&movie).unwrap().is_none());
        assert!(!repo.is_empty().unwrap());
    }
}
