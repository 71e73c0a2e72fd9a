use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Endpoint identifier, the trailing segment of a device uri
pub type EndpointId = String;

/// Brightness value as stored in the shadow document
pub type Brightness = i64;

/// Lowest brightness a light accepts
pub const MIN_BRIGHTNESS: Brightness = 0;

/// Highest brightness a light accepts
pub const MAX_BRIGHTNESS: Brightness = 100;

/// Clamp a brightness value into the range a light accepts
pub fn clamp_brightness(value: Brightness) -> Brightness {
    value.clamp(MIN_BRIGHTNESS, MAX_BRIGHTNESS)
}

/// Derive the endpoint identifier from a device uri
///
/// The identifier is everything after the last `/`, or the whole uri when it
/// has none.
pub fn endpoint_id_from_uri(uri: &str) -> &str {
    uri.rsplit('/').next().unwrap_or(uri)
}

/// A light as reported in the shadow document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightDevice {
    pub uri: String,

    pub name: String,

    #[serde(rename = "powerOn", default)]
    pub power_on: bool,

    #[serde(default)]
    pub brightness: Brightness,

    /// Fields this crate does not interpret, written back unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LightDevice {
    /// Create a light record with no extra fields
    pub fn new(uri: impl Into<String>, name: impl Into<String>, power_on: bool, brightness: Brightness) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            power_on,
            brightness,
            extra: Map::new(),
        }
    }

    /// Get the endpoint identifier derived from the uri
    pub fn endpoint_id(&self) -> &str {
        endpoint_id_from_uri(&self.uri)
    }

    /// Get the power state as reported to the voice platform
    pub fn power_state(&self) -> PowerState {
        PowerState::from(self.power_on)
    }
}

/// Power state of a light
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PowerState {
    On,
    Off,
}

impl PowerState {
    /// Whether this state means the light is powered
    pub fn is_on(self) -> bool {
        self == PowerState::On
    }
}

impl From<bool> for PowerState {
    fn from(on: bool) -> Self {
        if on {
            PowerState::On
        } else {
            PowerState::Off
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerState::On => f.write_str("ON"),
            PowerState::Off => f.write_str("OFF"),
        }
    }
}

/// Shadow document as returned by the store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShadowDocument {
    #[serde(default)]
    pub state: ShadowState,
}

/// Reported and desired sections of a shadow document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShadowState {
    #[serde(default)]
    pub reported: LightSection,

    #[serde(default)]
    pub desired: LightSection,
}

/// The part of a shadow section this crate reads and writes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LightSection {
    #[serde(rename = "lightDevices", default)]
    pub light_devices: Vec<LightDevice>,

    /// Thing name tag written by the voice skill
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

/// Update payload replacing the desired section
#[derive(Debug, Clone, Serialize)]
pub struct DesiredUpdate<'a> {
    pub state: DesiredState<'a>,
}

/// State wrapper for a desired update
#[derive(Debug, Clone, Serialize)]
pub struct DesiredState<'a> {
    pub desired: DesiredLights<'a>,
}

/// Desired light list, optionally tagged with the thing name
#[derive(Debug, Clone, Serialize)]
pub struct DesiredLights<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<&'a str>,

    #[serde(rename = "lightDevices")]
    pub light_devices: &'a [LightDevice],
}

impl<'a> DesiredUpdate<'a> {
    /// Build an update carrying the full light list
    pub fn new(light_devices: &'a [LightDevice], device: Option<&'a str>) -> Self {
        Self {
            state: DesiredState {
                desired: DesiredLights {
                    device,
                    light_devices,
                },
            },
        }
    }
}
