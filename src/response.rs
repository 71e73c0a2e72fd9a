//! Events sent back to the voice platform
//!
//! Every event gets a fresh message id. Events answering a directive echo its
//! correlation token unchanged, or an empty string when the token was never
//! resolved.

use crate::directive::{
    Directive, Scope, NAMESPACE_ALEXA, NAMESPACE_BRIGHTNESS, NAMESPACE_DISCOVERY, NAMESPACE_HEALTH,
    NAMESPACE_POWER,
};
use crate::types::{Brightness, LightDevice, PowerState};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

/// Version of the smart home payload format
pub const PAYLOAD_VERSION: &str = "3";

/// Staleness reported for every property, in milliseconds
pub const UNCERTAINTY_MS: u64 = 1000;

/// Error kinds understood by the voice platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidAuthorizationCredential,
    NoSuchEndpoint,
    EndpointUnreachable,
    InvalidValue,
    InvalidDirective,
    InternalError,
}

/// Top-level response object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<EventContext>,
    pub event: Event,
}

/// Properties reported alongside an event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventContext {
    pub properties: Vec<Property>,
}

/// A single reported property
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub namespace: String,
    pub name: String,
    pub value: Value,
    pub time_of_sample: String,
    pub uncertainty_in_milliseconds: u64,
}

/// Event body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub header: EventHeader,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<EventEndpoint>,
    pub payload: EventPayload,
}

/// Event header
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventHeader {
    pub namespace: String,
    pub name: String,
    pub payload_version: String,
    pub message_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_token: Option<String>,
}

/// Endpoint an event is about
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEndpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    pub endpoint_id: String,
}

/// Event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventPayload {
    Discovery {
        endpoints: Vec<DiscoveredEndpoint>,
    },
    Error {
        #[serde(rename = "type")]
        kind: ErrorKind,
        message: String,
    },
    Empty {},
}

/// Endpoint descriptor returned by discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredEndpoint {
    pub endpoint_id: String,
    pub manufacturer_name: String,
    pub friendly_name: String,
    pub description: String,
    pub display_categories: Vec<String>,
    pub cookie: Map<String, Value>,
    pub capabilities: Vec<Capability>,
}

/// Capability interface of a discovered endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capability {
    #[serde(rename = "type")]
    pub capability_type: String,
    pub interface: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<CapabilityProperties>,
}

/// Properties exposed by a capability interface
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityProperties {
    pub supported: Vec<SupportedProperty>,
    pub proactively_reported: bool,
    pub retrievable: bool,
}

/// Name of a supported property
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportedProperty {
    pub name: String,
}

/// Who an event answers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyTo {
    pub endpoint_id: String,
    pub correlation_token: String,
    pub scope: Option<Scope>,
}

impl ReplyTo {
    /// Reply for a directive whose identifiers were never resolved
    pub fn unresolved() -> Self {
        Self::default()
    }

    /// Reply echoing the identifiers a directive carries
    pub fn to_directive(directive: &Directive) -> Self {
        Self {
            endpoint_id: directive.endpoint_id().unwrap_or_default().to_string(),
            correlation_token: directive.correlation_token().to_string(),
            scope: directive.endpoint.as_ref().and_then(|e| e.scope.clone()),
        }
    }

    fn endpoint(&self) -> EventEndpoint {
        EventEndpoint {
            scope: self.scope.clone(),
            endpoint_id: self.endpoint_id.clone(),
        }
    }
}

/// The property a control directive changed
#[derive(Debug, Clone, PartialEq)]
pub struct ChangedProperty {
    pub namespace: &'static str,
    pub name: &'static str,
    pub value: Value,
}

impl ChangedProperty {
    /// Power state property
    pub fn power(state: PowerState) -> Self {
        Self {
            namespace: NAMESPACE_POWER,
            name: "powerState",
            value: json!(state),
        }
    }

    /// Brightness property
    pub fn brightness(value: Brightness) -> Self {
        Self {
            namespace: NAMESPACE_BRIGHTNESS,
            name: "brightness",
            value: json!(value),
        }
    }
}

impl EventEnvelope {
    /// Error kind carried by an error event
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match &self.event.payload {
            EventPayload::Error { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Error message carried by an error event
    pub fn error_message(&self) -> Option<&str> {
        match &self.event.payload {
            EventPayload::Error { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Value of a context property
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.context
            .as_ref()?
            .properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }
}

fn time_of_sample() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn property(namespace: &str, name: &str, value: Value, now: &str) -> Property {
    Property {
        namespace: namespace.to_string(),
        name: name.to_string(),
        value,
        time_of_sample: now.to_string(),
        uncertainty_in_milliseconds: UNCERTAINTY_MS,
    }
}

fn header(namespace: &str, name: &str, correlation_token: Option<&str>) -> EventHeader {
    EventHeader {
        namespace: namespace.to_string(),
        name: name.to_string(),
        payload_version: PAYLOAD_VERSION.to_string(),
        message_id: Uuid::new_v4(),
        correlation_token: correlation_token.map(str::to_string),
    }
}

fn interface(name: &str, supported: Option<&str>) -> Capability {
    Capability {
        capability_type: "AlexaInterface".to_string(),
        interface: name.to_string(),
        version: PAYLOAD_VERSION.to_string(),
        properties: supported.map(|property| CapabilityProperties {
            supported: vec![SupportedProperty {
                name: property.to_string(),
            }],
            proactively_reported: true,
            retrievable: true,
        }),
    }
}

/// Describe one light for discovery
pub fn discovered_endpoint(device: &LightDevice, manufacturer_name: &str) -> DiscoveredEndpoint {
    DiscoveredEndpoint {
        endpoint_id: device.endpoint_id().to_string(),
        manufacturer_name: manufacturer_name.to_string(),
        friendly_name: device.name.clone(),
        description: device.uri.clone(),
        display_categories: vec!["LIGHT".to_string()],
        cookie: Map::new(),
        capabilities: vec![
            interface(NAMESPACE_ALEXA, None),
            interface(NAMESPACE_HEALTH, Some("connectivity")),
            interface(NAMESPACE_POWER, Some("powerState")),
            interface(NAMESPACE_BRIGHTNESS, Some("brightness")),
        ],
    }
}

/// Discovery response listing every light
pub fn discovery_response(devices: &[LightDevice], manufacturer_name: &str) -> EventEnvelope {
    EventEnvelope {
        context: None,
        event: Event {
            header: header(NAMESPACE_DISCOVERY, "Discover.Response", None),
            endpoint: None,
            payload: EventPayload::Discovery {
                endpoints: devices
                    .iter()
                    .map(|device| discovered_endpoint(device, manufacturer_name))
                    .collect(),
            },
        },
    }
}

/// State report for one light
pub fn state_report(device: &LightDevice, reply: &ReplyTo) -> EventEnvelope {
    let now = time_of_sample();
    EventEnvelope {
        context: Some(EventContext {
            properties: vec![
                property(NAMESPACE_HEALTH, "connectivity", json!({ "value": "OK" }), &now),
                property(NAMESPACE_POWER, "powerState", json!(device.power_state()), &now),
                property(NAMESPACE_BRIGHTNESS, "brightness", json!(device.brightness), &now),
            ],
        }),
        event: Event {
            header: header(NAMESPACE_ALEXA, "StateReport", Some(reply.correlation_token.as_str())),
            endpoint: Some(reply.endpoint()),
            payload: EventPayload::Empty {},
        },
    }
}

/// Acknowledge a control directive with the property it changed
pub fn control_response(changed: ChangedProperty, reply: &ReplyTo) -> EventEnvelope {
    let now = time_of_sample();
    EventEnvelope {
        context: Some(EventContext {
            properties: vec![property(changed.namespace, changed.name, changed.value, &now)],
        }),
        event: Event {
            header: header(NAMESPACE_ALEXA, "Response", Some(reply.correlation_token.as_str())),
            endpoint: Some(reply.endpoint()),
            payload: EventPayload::Empty {},
        },
    }
}

/// Error event
pub fn error_response(kind: ErrorKind, message: impl Into<String>, reply: &ReplyTo) -> EventEnvelope {
    let message = message.into();
    tracing::error!("{:?}: {}", kind, message);
    EventEnvelope {
        context: None,
        event: Event {
            header: header(NAMESPACE_ALEXA, "ErrorResponse", Some(reply.correlation_token.as_str())),
            endpoint: Some(reply.endpoint()),
            payload: EventPayload::Error { kind, message },
        },
    }
}
