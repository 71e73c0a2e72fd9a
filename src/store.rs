//! Shadow document stores
//!
//! The handlers only ever need two operations from the store: read the whole
//! document for a thing, and merge an update into its desired section. Both
//! sit behind [`ShadowStore`] so a versioned store can be dropped in without
//! touching the mutation logic.

use crate::connection::Connection;
use crate::error::{Result, ShadowError};
use crate::protocol::{Method, Request};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// Keyed document store holding device shadows
#[async_trait]
pub trait ShadowStore: Send + Sync {
    /// Read the serialized shadow document of a thing
    async fn get(&self, thing: &str) -> Result<String>;

    /// Merge a serialized update document into the shadow of a thing
    async fn update(&self, thing: &str, payload: String) -> Result<()>;
}

/// Shadow store reached over a WebSocket request/response protocol
pub struct WebSocketShadowStore {
    connection: Connection,
}

impl WebSocketShadowStore {
    /// Connect to the store at the given URL
    pub async fn connect(url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let connection = Connection::connect(url, request_timeout).await?;
        Ok(Self { connection })
    }
}

#[async_trait]
impl ShadowStore for WebSocketShadowStore {
    async fn get(&self, thing: &str) -> Result<String> {
        let response = self
            .connection
            .send_request(Request::new(Method::Get, thing))
            .await?;

        response
            .into_payload()
            .ok_or_else(|| ShadowError::InvalidResponse("No payload in get response".to_string()))
    }

    async fn update(&self, thing: &str, payload: String) -> Result<()> {
        let request = Request::new(Method::Update, thing).with_payload(payload);
        self.connection.send_request(request).await?;
        Ok(())
    }
}

/// In-process shadow store
///
/// Updates are merged the way a device shadow service merges them: every key
/// of `state.desired` in the update replaces the same key in the stored
/// document, other keys are left alone.
#[derive(Default)]
pub struct MemoryShadowStore {
    documents: Mutex<HashMap<String, Value>>,
    fail_reads: AtomicBool,
    fail_updates: AtomicBool,
}

impl MemoryShadowStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding one document
    pub fn with_document(thing: impl Into<String>, document: Value) -> Self {
        let mut documents = HashMap::new();
        documents.insert(thing.into(), document);
        Self {
            documents: Mutex::new(documents),
            ..Self::default()
        }
    }

    /// Make every subsequent read fail
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent update fail
    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Get a copy of the stored document of a thing
    pub async fn document(&self, thing: &str) -> Option<Value> {
        self.documents.lock().await.get(thing).cloned()
    }

    /// Copy the desired light list into the reported section
    ///
    /// This is what the bridge on the device side does once it has applied
    /// the desired state to the lights.
    pub async fn acknowledge_desired(&self, thing: &str) {
        let mut documents = self.documents.lock().await;
        let Some(document) = documents.get_mut(thing) else {
            return;
        };
        let Some(desired) = document.pointer("/state/desired/lightDevices").cloned() else {
            return;
        };
        let state = section_mut(document, "state");
        let reported = section_mut(state, "reported");
        if let Some(reported) = reported.as_object_mut() {
            reported.insert("lightDevices".to_string(), desired);
        }
    }
}

/// Get a nested object, replacing anything that is not an object
fn section_mut<'a>(value: &'a mut Value, key: &str) -> &'a mut Value {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    let entry = &mut value[key];
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    entry
}

#[async_trait]
impl ShadowStore for MemoryShadowStore {
    async fn get(&self, thing: &str) -> Result<String> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ShadowError::Store {
                detail: "Service unavailable".to_string(),
            });
        }

        let documents = self.documents.lock().await;
        let document = documents.get(thing).ok_or_else(|| ShadowError::Store {
            detail: format!("No shadow exists with name: '{}'", thing),
        })?;
        Ok(serde_json::to_string(document)?)
    }

    async fn update(&self, thing: &str, payload: String) -> Result<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(ShadowError::Store {
                detail: "Service unavailable".to_string(),
            });
        }

        let update: Value = serde_json::from_str(&payload)?;
        let desired = update
            .pointer("/state/desired")
            .and_then(|v| v.as_object())
            .ok_or_else(|| ShadowError::InvalidResponse("Update has no state.desired object".to_string()))?;

        let mut documents = self.documents.lock().await;
        let document = documents
            .entry(thing.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        let state = section_mut(document, "state");
        let stored = section_mut(state, "desired");
        if let Some(stored) = stored.as_object_mut() {
            for (key, value) in desired {
                stored.insert(key.clone(), value.clone());
            }
        }

        Ok(())
    }
}
