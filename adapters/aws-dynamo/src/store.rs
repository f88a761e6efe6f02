//! Record stores: get/put of whole items by primary key.
//!
//! `DynamoRecordStore` talks to a real table. `InMemoryRecordStore` keeps
//! items in a map for tests and local runs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use aws_sdk_dynamodb::{types::AttributeValue, Client};
use aws_smithy_types::error::metadata::ProvideErrorMetadata;
use domain::CoreError;
use tokio::runtime::RuntimeFlavor;
use tracing::{debug, trace};

use crate::adapter::{Item, PREFERENCE_ID_ATTRIBUTE};
use crate::DynamoTables;

/// Storage boundary for preference items, keyed by the `PreferenceID` attribute.
pub trait RecordStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<Item>, CoreError>;
    /// Write an item, overwriting any item with the same key.
    fn put_item(&self, item: Item) -> Result<(), CoreError>;
}

/// In-memory record store for tests.
pub struct InMemoryRecordStore {
    inner: Mutex<HashMap<String, Item>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for InMemoryRecordStore {
    fn get_item(&self, key: &str) -> Result<Option<Item>, CoreError> {
        let map = self
            .inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        Ok(map.get(key).cloned())
    }

    fn put_item(&self, item: Item) -> Result<(), CoreError> {
        let key = item
            .get(PREFERENCE_ID_ATTRIBUTE)
            .and_then(|v| v.as_s().ok())
            .ok_or_else(|| CoreError::Repository(format!("item missing {PREFERENCE_ID_ATTRIBUTE}")))?
            .clone();
        let mut map = self
            .inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))?;
        map.insert(key, item);
        Ok(())
    }
}

/// Record store backed by AWS DynamoDB.
///
/// Supports both standalone mode (creates its own Tokio runtime) and embedded
/// mode (reuses the caller's runtime via `Handle::current()`). Embedded mode
/// needs a multi-thread runtime: inside a `current_thread` runtime (a plain
/// `#[tokio::test]`) every call fails with `CoreError::Repository` instead of
/// blocking.
#[derive(Clone)]
pub struct DynamoRecordStore {
    table: String,
    client: Client,
    // None when constructed inside an existing runtime
    rt: Option<Arc<tokio::runtime::Runtime>>,
}

impl DynamoRecordStore {
    /// Create a store from explicit table names and an AWS SDK client.
    pub fn with_client(tables: DynamoTables, client: Client) -> Result<Self, CoreError> {
        let rt = Self::maybe_create_runtime()?;
        Ok(Self {
            table: tables.preferences,
            client,
            rt,
        })
    }

    /// Construct with table names but create a default AWS SDK client using env/IMDS.
    pub fn new(tables: DynamoTables) -> Result<Self, CoreError> {
        let rt = Self::maybe_create_runtime()?;
        let conf = Self::block_on_with_rt(
            &rt,
            aws_config::load_defaults(aws_config::BehaviorVersion::latest()),
        )?;
        let client = Client::new(&conf);
        Ok(Self {
            table: tables.preferences,
            client,
            rt,
        })
    }

    /// Construct from `DYNAMO_TABLE_PREFERENCES` (defaults to "Preferences").
    pub fn from_env() -> Result<Self, CoreError> {
        Self::new(DynamoTables::from_env())
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Inside a Tokio runtime return None (reuse it), otherwise build one.
    fn maybe_create_runtime() -> Result<Option<Arc<tokio::runtime::Runtime>>, CoreError> {
        if tokio::runtime::Handle::try_current().is_ok() {
            Ok(None)
        } else {
            let rt = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .map_err(|e| CoreError::Repository(format!("tokio runtime init: {e}")))?;
            Ok(Some(Arc::new(rt)))
        }
    }

    /// Run an async future, using either our owned runtime or the current runtime.
    fn block_on<F: std::future::Future>(&self, fut: F) -> Result<F::Output, CoreError> {
        Self::block_on_with_rt(&self.rt, fut)
    }

    fn block_on_with_rt<F: std::future::Future>(
        rt: &Option<Arc<tokio::runtime::Runtime>>,
        fut: F,
    ) -> Result<F::Output, CoreError> {
        match rt {
            Some(rt) => Ok(rt.block_on(fut)),
            None => {
                let handle = tokio::runtime::Handle::current();
                // block_in_place panics on a current_thread runtime
                if handle.runtime_flavor() == RuntimeFlavor::CurrentThread {
                    return Err(CoreError::Repository(
                        "cannot block inside a current_thread tokio runtime".into(),
                    ));
                }
                Ok(tokio::task::block_in_place(|| handle.block_on(fut)))
            }
        }
    }
}

impl RecordStore for DynamoRecordStore {
    fn get_item(&self, key: &str) -> Result<Option<Item>, CoreError> {
        let table = self.table.clone();
        let key_attr = AttributeValue::S(key.to_string());
        let fut = async {
            self.client
                .get_item()
                .table_name(table)
                .key(PREFERENCE_ID_ATTRIBUTE, key_attr)
                .send()
                .await
        };
        let out = self.block_on(fut)?.map_err(map_sdk_err)?;
        trace!(table = %self.table, key, found = out.item().is_some(), "get_item");
        Ok(out.item().cloned())
    }

    fn put_item(&self, item: Item) -> Result<(), CoreError> {
        let table = self.table.clone();
        let fut = async {
            self.client
                .put_item()
                .table_name(table)
                .set_item(Some(item))
                .send()
                .await
        };
        self.block_on(fut)?.map_err(map_sdk_err)?;
        debug!(table = %self.table, "put_item");
        Ok(())
    }
}

fn map_sdk_err<E: ProvideErrorMetadata + std::fmt::Display>(e: E) -> CoreError {
    if let Some(code) = e.code() {
        if code == "ResourceNotFoundException" {
            return CoreError::Repository("missing table".into());
        }
    }
    CoreError::Repository(format!("dynamo error: {e}"))
}
