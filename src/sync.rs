use crate::error::ShadowError;
use crate::locate::{is_addressed, locate, Target};
use crate::mutate::{self, Change, Mutation};
use crate::shadow::LightShadow;
use crate::types::LightDevice;
use thiserror::Error;

/// Why a read-modify-write cycle against the shadow did not complete
#[derive(Error, Debug)]
pub enum SyncError {
    /// The shadow could not be read or parsed
    #[error("device shadow unavailable: {0}")]
    Unavailable(#[source] ShadowError),

    /// The shadow was read but no light matches the target
    #[error("no {0} in device list")]
    NotFound(Target),

    /// The light was changed but the desired state could not be written
    #[error("failed to commit desired state: {0}")]
    Commit(#[source] ShadowError),
}

/// Read-modify-write cycle over the shadow's light list
///
/// Each call performs a fresh fetch and a full write of the list. Concurrent
/// calls against the same thing are not serialized; the last write wins.
#[derive(Clone)]
pub struct ShadowSync {
    shadow: LightShadow,
}

impl ShadowSync {
    /// Create a sync cycle over the given shadow
    pub fn new(shadow: LightShadow) -> Self {
        Self { shadow }
    }

    /// Get the underlying shadow
    pub fn shadow(&self) -> &LightShadow {
        &self.shadow
    }

    /// Fetch the current light list
    pub async fn devices(&self) -> Result<Vec<LightDevice>, SyncError> {
        self.shadow.fetch_devices().await.map_err(SyncError::Unavailable)
    }

    /// Fetch the light addressed by the target
    pub async fn find(&self, target: &Target) -> Result<LightDevice, SyncError> {
        let devices = self.devices().await?;
        locate(&devices, target)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(target.clone()))
    }

    /// Fetch the list, change the addressed lights, and write the list back
    ///
    /// A `None` target addresses every light, including none at all when the
    /// list is empty. A targeted change that matches nothing fails before
    /// anything is written.
    pub async fn apply(&self, target: Option<&Target>, change: &Change) -> Result<Mutation, SyncError> {
        let devices = self.devices().await?;

        if !is_addressed(&devices, target) {
            if let Some(target) = target {
                tracing::warn!("No {} among {} light(s)", target, devices.len());
                return Err(SyncError::NotFound(target.clone()));
            }
        }

        let mutation = mutate::apply(devices, target, change);

        self.shadow
            .commit_devices(&mutation.devices)
            .await
            .map_err(SyncError::Commit)?;

        Ok(mutation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryShadowStore;
    use crate::types::PowerState;
    use serde_json::json;
    use std::sync::Arc;

    fn setup() -> (Arc<MemoryShadowStore>, ShadowSync) {
        let store = Arc::new(MemoryShadowStore::with_document(
            "bridge",
            json!({"state": {"reported": {"lightDevices": [
                {"uri": "/a/light/endpoint-1", "name": "Kitchen", "powerOn": false, "brightness": 90},
                {"uri": "/a/light/endpoint-2", "name": "hall", "powerOn": false, "brightness": 5}
            ]}}}),
        ));
        let sync = ShadowSync::new(LightShadow::new(store.clone(), "bridge"));
        (store, sync)
    }

    #[tokio::test]
    async fn apply_writes_full_list_with_one_change() {
        let (store, sync) = setup();
        let target = Target::EndpointId("endpoint-1".to_string());
        let mutation = sync.apply(Some(&target), &Change::AdjustBrightness(30)).await.unwrap();
        assert_eq!(mutation.brightness(), Some(100));

        let document = store.document("bridge").await.unwrap();
        let desired = document["state"]["desired"]["lightDevices"].as_array().unwrap();
        assert_eq!(desired.len(), 2);
        assert_eq!(desired[0]["brightness"], 100);
        assert_eq!(desired[1]["brightness"], 5);
    }

    #[tokio::test]
    async fn missing_light_is_not_found_and_nothing_is_written() {
        let (store, sync) = setup();
        let target = Target::EndpointId("endpoint-9".to_string());
        let err = sync.apply(Some(&target), &Change::Power(PowerState::On)).await.unwrap_err();
        assert!(matches!(err, SyncError::NotFound(t) if t == target));

        let document = store.document("bridge").await.unwrap();
        assert!(document["state"].get("desired").is_none());
    }

    #[tokio::test]
    async fn unreadable_store_is_unavailable() {
        let (store, sync) = setup();
        store.fail_reads(true);
        let target = Target::EndpointId("endpoint-9".to_string());
        assert!(matches!(sync.find(&target).await, Err(SyncError::Unavailable(_))));
        assert!(matches!(
            sync.apply(Some(&target), &Change::Brightness(1)).await,
            Err(SyncError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn failed_write_is_a_commit_error() {
        let (store, sync) = setup();
        store.fail_updates(true);
        let target = Target::Name("HALL".to_string());
        let err = sync.apply(Some(&target), &Change::Power(PowerState::On)).await.unwrap_err();
        assert!(matches!(err, SyncError::Commit(_)));
    }

    #[tokio::test]
    async fn find_matches_by_name() {
        let (_store, sync) = setup();
        let light = sync.find(&Target::Name("kitchen".to_string())).await.unwrap();
        assert_eq!(light.endpoint_id(), "endpoint-1");
    }

    #[tokio::test]
    async fn broadcast_on_empty_list_still_commits() {
        let store = Arc::new(MemoryShadowStore::with_document("bridge", json!({"state": {}})));
        let sync = ShadowSync::new(LightShadow::new(store.clone(), "bridge"));
        let mutation = sync.apply(None, &Change::Power(PowerState::Off)).await.unwrap();
        assert!(mutation.devices.is_empty());

        let document = store.document("bridge").await.unwrap();
        assert_eq!(document["state"]["desired"]["lightDevices"], json!([]));
    }

    #[tokio::test]
    async fn rename_round_trips_sorted() {
        let (store, sync) = setup();
        sync.apply(
            Some(&Target::Name("kitchen".to_string())),
            &Change::Rename("Attic".to_string()),
        )
        .await
        .unwrap();
        store.acknowledge_desired("bridge").await;

        let names: Vec<_> = sync.devices().await.unwrap().into_iter().map(|d| d.name).collect();
        assert_eq!(names, ["Attic", "hall"]);
    }
}
