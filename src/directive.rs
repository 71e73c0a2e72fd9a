use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Namespace of discovery directives
pub const NAMESPACE_DISCOVERY: &str = "Alexa.Discovery";
/// Base namespace, used by state reports and every event sent back
pub const NAMESPACE_ALEXA: &str = "Alexa";
/// Namespace of power control directives
pub const NAMESPACE_POWER: &str = "Alexa.PowerController";
/// Namespace of brightness control directives
pub const NAMESPACE_BRIGHTNESS: &str = "Alexa.BrightnessController";
/// Namespace of connectivity properties
pub const NAMESPACE_HEALTH: &str = "Alexa.EndpointHealth";

/// Smart home request as delivered to the handler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectiveRequest {
    pub directive: Directive,
}

/// A single directive from the voice platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Directive {
    pub header: DirectiveHeader,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<DirectiveEndpoint>,
    #[serde(default)]
    pub payload: DirectivePayload,
}

/// Directive header
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectiveHeader {
    pub namespace: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub payload_version: String,
    #[serde(default)]
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_token: Option<String>,
}

/// Endpoint addressed by a directive
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectiveEndpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<Value>,
}

/// Authorization scope carrying the user's access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    #[serde(rename = "type")]
    pub scope_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Scope {
    /// Create a bearer token scope
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            scope_type: "BearerToken".to_string(),
            token: Some(token.into()),
        }
    }
}

/// Command-specific directive payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectivePayload {
    /// Token location for discovery directives
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    /// Absolute brightness; anything but an integer reads as absent
    #[serde(default, deserialize_with = "integer_or_none", skip_serializing_if = "Option::is_none")]
    pub brightness: Option<i64>,
    /// Brightness change; anything but an integer reads as absent
    #[serde(default, deserialize_with = "integer_or_none", skip_serializing_if = "Option::is_none")]
    pub brightness_delta: Option<i64>,
}

fn integer_or_none<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Value::as_i64))
}

impl Directive {
    /// Correlation token, or empty when the directive carries none
    pub fn correlation_token(&self) -> &str {
        self.header.correlation_token.as_deref().unwrap_or("")
    }

    /// Addressed endpoint id, if any
    pub fn endpoint_id(&self) -> Option<&str> {
        self.endpoint
            .as_ref()
            .and_then(|e| e.endpoint_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// Access token of the addressed endpoint
    pub fn endpoint_token(&self) -> Option<&str> {
        self.endpoint
            .as_ref()
            .and_then(|e| e.scope.as_ref())
            .and_then(|s| s.token.as_deref())
            .filter(|token| !token.is_empty())
    }

    /// Access token carried in the payload of a discovery directive
    pub fn payload_token(&self) -> Option<&str> {
        self.payload
            .scope
            .as_ref()
            .and_then(|s| s.token.as_deref())
            .filter(|token| !token.is_empty())
    }
}
