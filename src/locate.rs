use crate::types::LightDevice;
use std::fmt;

/// How a front end picks lights out of the shadow's list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Exact match on the endpoint id derived from the uri
    EndpointId(String),
    /// Case-insensitive match on the light's name
    Name(String),
}

impl Target {
    /// Whether the given light is addressed by this target
    pub fn matches(&self, device: &LightDevice) -> bool {
        match self {
            Target::EndpointId(id) => device.endpoint_id() == id,
            Target::Name(name) => device.name.to_lowercase() == name.to_lowercase(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::EndpointId(id) => write!(f, "endpoint {}", id),
            Target::Name(name) => write!(f, "light named {}", name),
        }
    }
}

/// Find the first light addressed by the target
pub fn locate<'a>(devices: &'a [LightDevice], target: &Target) -> Option<&'a LightDevice> {
    devices.iter().find(|device| target.matches(device))
}

/// Whether the target addresses at least one light
///
/// An absent target addresses every light, and so matches even an empty list.
pub fn is_addressed(devices: &[LightDevice], target: Option<&Target>) -> bool {
    match target {
        Some(target) => devices.iter().any(|device| target.matches(device)),
        None => true,
    }
}
