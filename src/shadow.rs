use crate::error::Result;
use crate::store::ShadowStore;
use crate::types::{DesiredUpdate, LightDevice, ShadowDocument};
use std::sync::Arc;

/// Reader and writer for the light list of one thing's shadow
///
/// `LightShadow` knows where the list lives inside the shadow document. It
/// reads `state.reported.lightDevices` and writes the whole list back into
/// `state.desired.lightDevices`.
#[derive(Clone)]
pub struct LightShadow {
    store: Arc<dyn ShadowStore>,
    thing_name: String,
    tag_device: bool,
}

impl LightShadow {
    /// Create a shadow handle for the given thing
    pub fn new(store: Arc<dyn ShadowStore>, thing_name: impl Into<String>) -> Self {
        Self {
            store,
            thing_name: thing_name.into(),
            tag_device: false,
        }
    }

    /// Also write the thing name into `state.desired.device` on commit
    pub fn tag_device(mut self, tag: bool) -> Self {
        self.tag_device = tag;
        self
    }

    /// Get the thing name
    pub fn thing_name(&self) -> &str {
        &self.thing_name
    }

    /// Fetch the lights currently reported by the device
    ///
    /// A document without a reported light list yields an empty list.
    pub async fn fetch_devices(&self) -> Result<Vec<LightDevice>> {
        let payload = self.store.get(&self.thing_name).await?;
        tracing::debug!("Shadow of {}: {}", self.thing_name, payload);

        let document: ShadowDocument = serde_json::from_str(&payload)?;
        let devices = document.state.reported.light_devices;

        for (index, device) in devices.iter().enumerate() {
            tracing::debug!("lightDevices[{}]: {} ({})", index, device.name, device.uri);
        }

        Ok(devices)
    }

    /// Write the full light list as the desired state
    pub async fn commit_devices(&self, devices: &[LightDevice]) -> Result<()> {
        let device = self.tag_device.then_some(self.thing_name.as_str());
        let payload = serde_json::to_string(&DesiredUpdate::new(devices, device))?;
        tracing::debug!("Updating shadow of {}: {}", self.thing_name, payload);

        self.store.update(&self.thing_name, payload).await?;

        tracing::info!("Committed {} light(s) to shadow of {}", devices.len(), self.thing_name);
        Ok(())
    }
}
