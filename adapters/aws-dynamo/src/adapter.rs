//! Conversion between `Preference` and its DynamoDB item.
//!
//! Item layout:
//! - `PreferenceID` (S): composite key `id#CATEGORY`, the table's primary key.
//! - `Popularity` (N): popularity score.
//! - `Correlations` (M): composite target key -> weight (N).
//!
//! Attribute names are the stored schema. Do not rename them.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use domain::{key, CoreError, Preference, PreferenceCorrelation};
use tracing::debug;

/// A DynamoDB item as returned by `GetItem` / accepted by `PutItem`.
pub type Item = HashMap<String, AttributeValue>;

pub const PREFERENCE_ID_ATTRIBUTE: &str = "PreferenceID";
pub const POPULARITY_ATTRIBUTE: &str = "Popularity";
pub const CORRELATIONS_ATTRIBUTE: &str = "Correlations";

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("illegal state: no Preference object set before conversion to an item")]
    MissingObject,
    #[error("illegal state: no item set before conversion to a Preference")]
    MissingRecord,
    #[error("item missing attribute {0}")]
    MissingAttribute(&'static str),
    #[error("item attribute {attribute} is malformed: {reason}")]
    InvalidAttribute { attribute: String, reason: String },
    #[error("item key is invalid: {0}")]
    InvalidKey(String),
    #[error("invalid preference in item: {0}")]
    Domain(#[from] CoreError),
}

impl AdapterError {
    /// True for the two "converted before any input was set" failures.
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, AdapterError::MissingObject | AdapterError::MissingRecord)
    }
}

/// The single input of a conversion.
#[derive(Clone, Debug)]
pub enum Source {
    Object(Preference),
    Record(Item),
}

/// Single-use conversion context. Holds at most one input; setting one
/// replaces the other.
#[derive(Clone, Debug, Default)]
pub struct DynamoPreferenceAdapter {
    source: Option<Source>,
}

impl DynamoPreferenceAdapter {
    pub fn new() -> Self {
        Self { source: None }
    }

    pub fn from_source(source: Source) -> Self {
        Self {
            source: Some(source),
        }
    }

    pub fn from_object(preference: Preference) -> Self {
        Self::from_source(Source::Object(preference))
    }

    pub fn from_db_model(item: Item) -> Self {
        Self::from_source(Source::Record(item))
    }

    pub fn with_object(mut self, preference: Preference) -> Self {
        self.source = Some(Source::Object(preference));
        self
    }

    pub fn with_db_model(mut self, item: Item) -> Self {
        self.source = Some(Source::Record(item));
        self
    }

    /// Serialize the held `Preference`. Fails if no object was set.
    pub fn to_db_model(&self) -> Result<Item, AdapterError> {
        match &self.source {
            Some(Source::Object(preference)) => Ok(preference_to_item(preference)),
            _ => Err(AdapterError::MissingObject),
        }
    }

    /// Rebuild a `Preference` from the held item. Fails if no item was set.
    pub fn to_object(&self) -> Result<Preference, AdapterError> {
        match &self.source {
            Some(Source::Record(item)) => item_to_preference(item),
            _ => Err(AdapterError::MissingRecord),
        }
    }
}

pub fn preference_to_item(preference: &Preference) -> Item {
    let composite = key::compose(preference.id(), preference.category());
    let correlations: HashMap<String, AttributeValue> = preference
        .correlations()
        .iter()
        .map(|c| {
            (
                c.to_preference_id.clone(),
                AttributeValue::N(c.weight.to_string()),
            )
        })
        .collect();
    debug!(key = %composite, correlations = correlations.len(), "preference -> item");

    let mut m = HashMap::new();
    m.insert(PREFERENCE_ID_ATTRIBUTE.into(), AttributeValue::S(composite));
    m.insert(
        POPULARITY_ATTRIBUTE.into(),
        AttributeValue::N(preference.popularity().to_string()),
    );
    m.insert(CORRELATIONS_ATTRIBUTE.into(), AttributeValue::M(correlations));
    m
}

pub fn item_to_preference(item: &Item) -> Result<Preference, AdapterError> {
    let composite = item
        .get(PREFERENCE_ID_ATTRIBUTE)
        .ok_or(AdapterError::MissingAttribute(PREFERENCE_ID_ATTRIBUTE))?
        .as_s()
        .map_err(|_| invalid(PREFERENCE_ID_ATTRIBUTE, "expected a string"))?;
    let (id, category) = key::decompose(composite).map_err(|e| match e {
        CoreError::InvalidKey(msg) => AdapterError::InvalidKey(msg),
        other => AdapterError::Domain(other),
    })?;

    let popularity = item
        .get(POPULARITY_ATTRIBUTE)
        .ok_or(AdapterError::MissingAttribute(POPULARITY_ATTRIBUTE))?
        .as_n()
        .map_err(|_| invalid(POPULARITY_ATTRIBUTE, "expected a number"))?
        .parse::<u32>()
        .map_err(|e| invalid(POPULARITY_ATTRIBUTE, &e.to_string()))?;

    // Items written without any correlations may omit the map entirely.
    let correlations = match item.get(CORRELATIONS_ATTRIBUTE) {
        None => Vec::new(),
        Some(v) => {
            let map = v
                .as_m()
                .map_err(|_| invalid(CORRELATIONS_ATTRIBUTE, "expected a map"))?;
            let mut out = Vec::with_capacity(map.len());
            for (target, weight) in map {
                let weight = weight
                    .as_n()
                    .map_err(|_| invalid(CORRELATIONS_ATTRIBUTE, "weight is not a number"))?
                    .parse::<i32>()
                    .map_err(|e| invalid(CORRELATIONS_ATTRIBUTE, &format!("weight of {target}: {e}")))?;
                out.push(PreferenceCorrelation::new(target.clone(), weight));
            }
            out
        }
    };
    debug!(key = %composite, correlations = correlations.len(), "item -> preference");

    Ok(Preference::new(id, category, popularity, correlations)?)
}

fn invalid(attribute: &str, reason: &str) -> AdapterError {
    AdapterError::InvalidAttribute {
        attribute: attribute.to_string(),
        reason: reason.to_string(),
    }
}
