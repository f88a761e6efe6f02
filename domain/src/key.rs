//! Composite preference keys.
//!
//! A key is the raw preference id joined to its category tag with `#`:
//! `Lord of the Rings#BOOKS`. It is used both as a record's primary key and as
//! the target of a correlation. Decoding splits at the last `#`, so an id may
//! itself contain `#` since category tags never do.

use std::fmt::{Display, Formatter};

use crate::{CoreError, PreferenceCategory};

pub const KEY_SEPARATOR: char = '#';

/// Encode `(id, category)` into its composite string.
pub fn compose(id: &str, category: PreferenceCategory) -> String {
    let tag = category.as_str();
    let mut s = String::with_capacity(id.len() + 1 + tag.len());
    s.push_str(id);
    s.push(KEY_SEPARATOR);
    s.push_str(tag);
    s
}

/// Split a composite string back into `(id, category)`.
pub fn decompose(s: &str) -> Result<(String, PreferenceCategory), CoreError> {
    let (id, tag) = s
        .rsplit_once(KEY_SEPARATOR)
        .ok_or_else(|| CoreError::InvalidKey(format!("missing separator in {s:?}")))?;
    if id.is_empty() {
        return Err(CoreError::InvalidKey(format!("empty id in {s:?}")));
    }
    let category = PreferenceCategory::parse(tag)
        .ok_or_else(|| CoreError::InvalidKey(format!("unknown category {tag:?}")))?;
    Ok((id.to_string(), category))
}

/// Decoded form of a composite key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PreferenceKey {
    id: String,
    category: PreferenceCategory,
}

impl PreferenceKey {
    pub fn new<S: Into<String>>(id: S, category: PreferenceCategory) -> Result<Self, CoreError> {
        let id = id.into();
        if id.is_empty() {
            return Err(CoreError::InvalidPreferenceId("empty".into()));
        }
        Ok(Self { id, category })
    }

    pub(crate) fn from_parts(id: String, category: PreferenceCategory) -> Self {
        Self { id, category }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let (id, category) = decompose(s)?;
        Ok(Self { id, category })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn category(&self) -> PreferenceCategory {
        self.category
    }

    pub fn encode(&self) -> String {
        compose(&self.id, self.category)
    }
}

impl Display for PreferenceKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.id, KEY_SEPARATOR, self.category.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_is_deterministic() {
        let a = compose("Lord of the Rings", PreferenceCategory::Books);
        let b = compose("Lord of the Rings", PreferenceCategory::Books);
        assert_eq!(a, b);
        assert_eq!(a, "Lord of the Rings#BOOKS");
    }

    #[test]
    fn decompose_inverts_compose() {
        for category in PreferenceCategory::ALL {
            let s = compose("Harry Potter", category);
            let (id, c) = decompose(&s).unwrap();
            assert_eq!(id, "Harry Potter");
            assert_eq!(c, category);
        }
    }

    #[test]
    fn id_containing_separator_survives() {
        let s = compose("C# in Depth", PreferenceCategory::Books);
        assert_eq!(s, "C# in Depth#BOOKS");
        let key = PreferenceKey::parse(&s).unwrap();
        assert_eq!(key.id(), "C# in Depth");
        assert_eq!(key.category(), PreferenceCategory::Books);
    }

    #[test]
    fn decompose_rejects_malformed() {
        assert!(matches!(decompose("no separator"), Err(CoreError::InvalidKey(_))));
        assert!(matches!(decompose("#BOOKS"), Err(CoreError::InvalidKey(_))));
        assert!(matches!(decompose("Dune#books"), Err(CoreError::InvalidKey(_))));
        assert!(matches!(decompose("Dune#"), Err(CoreError::InvalidKey(_))));
    }

    #[test]
    fn key_display_matches_encode() {
        let key = PreferenceKey::new("Kind of Blue", PreferenceCategory::Music).unwrap();
        assert_eq!(key.to_string(), key.encode());
        assert!(PreferenceKey::new("", PreferenceCategory::Music).is_err());
    }
}
