use crate::directive::{
    Directive, DirectiveHeader, DirectiveRequest, NAMESPACE_ALEXA, NAMESPACE_BRIGHTNESS, NAMESPACE_DISCOVERY,
    NAMESPACE_POWER,
};
use crate::locate::Target;
use crate::mutate::Change;
use crate::response::{
    control_response, discovery_response, error_response, state_report, ChangedProperty, ErrorKind, EventEnvelope,
    ReplyTo,
};
use crate::shadow::LightShadow;
use crate::sync::{ShadowSync, SyncError};
use crate::types::PowerState;
use std::sync::Arc;

/// Decides whether a caller may act on an endpoint
pub trait AccessPolicy: Send + Sync {
    /// Whether the access token is accepted
    fn is_valid_token(&self, token: &str) -> bool;

    /// Whether the endpoint is reachable for this caller
    fn is_endpoint_online(&self, endpoint_id: &str, token: &str) -> bool;
}

/// Accepts every token and treats every endpoint as online
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn is_valid_token(&self, _token: &str) -> bool {
        true
    }

    fn is_endpoint_online(&self, _endpoint_id: &str, _token: &str) -> bool {
        true
    }
}

/// Handler chosen for a directive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Discovery,
    ReportState,
    Control,
    UnsupportedDirective,
    UnsupportedNamespace,
}

/// Pick the handler for a directive header
pub fn route(header: &DirectiveHeader) -> Route {
    match header.namespace.as_str() {
        NAMESPACE_DISCOVERY => Route::Discovery,
        NAMESPACE_POWER | NAMESPACE_BRIGHTNESS => Route::Control,
        NAMESPACE_ALEXA if header.name == "ReportState" => Route::ReportState,
        NAMESPACE_ALEXA => Route::UnsupportedDirective,
        _ => Route::UnsupportedNamespace,
    }
}

/// Smart home front end: discovery, state reports and control
#[derive(Clone)]
pub struct SmartHomeHandler {
    sync: ShadowSync,
    access: Arc<dyn AccessPolicy>,
    manufacturer_name: String,
}

impl SmartHomeHandler {
    /// Create a handler over the given shadow, accepting every caller
    pub fn new(shadow: LightShadow, manufacturer_name: impl Into<String>) -> Self {
        Self {
            sync: ShadowSync::new(shadow),
            access: Arc::new(AllowAll),
            manufacturer_name: manufacturer_name.into(),
        }
    }

    /// Use a different access policy
    pub fn with_access_policy(mut self, access: Arc<dyn AccessPolicy>) -> Self {
        self.access = access;
        self
    }

    /// Handle one directive
    ///
    /// Every failure is answered with an error event, never an `Err`.
    pub async fn handle(&self, request: DirectiveRequest) -> EventEnvelope {
        let directive = request.directive;
        tracing::info!(
            "Directive {}.{} (message {})",
            directive.header.namespace,
            directive.header.name,
            directive.header.message_id
        );

        match route(&directive.header) {
            Route::Discovery => self.discover(&directive).await,
            Route::ReportState => self.report_state(&directive).await,
            Route::Control => self.control(&directive).await,
            Route::UnsupportedDirective => {
                error_response(ErrorKind::InvalidDirective, "Directive not supported", &ReplyTo::unresolved())
            }
            Route::UnsupportedNamespace => {
                error_response(ErrorKind::InvalidDirective, "Namespace not supported", &ReplyTo::unresolved())
            }
        }
    }

    async fn discover(&self, directive: &Directive) -> EventEnvelope {
        let token = directive.payload_token();
        if !token.is_some_and(|token| self.access.is_valid_token(token)) {
            return error_response(
                ErrorKind::InvalidAuthorizationCredential,
                format!("Invalid access token: {}", token.unwrap_or_default()),
                &ReplyTo::unresolved(),
            );
        }

        let devices = match self.sync.devices().await {
            Ok(devices) => devices,
            Err(e) => {
                tracing::warn!("Discovery found no lights: {}", e);
                Vec::new()
            }
        };

        tracing::info!("Discovered {} light(s)", devices.len());
        discovery_response(&devices, &self.manufacturer_name)
    }

    /// Check token, endpoint id and liveness, in that order
    fn admit<'a>(&self, directive: &'a Directive, reply: &ReplyTo) -> Result<&'a str, EventEnvelope> {
        let token = directive.endpoint_token();
        let token = match token.filter(|token| self.access.is_valid_token(token)) {
            Some(token) => token,
            None => {
                return Err(error_response(
                    ErrorKind::InvalidAuthorizationCredential,
                    format!("Invalid access token: {}", token.unwrap_or_default()),
                    reply,
                ))
            }
        };

        let endpoint_id = directive.endpoint_id().ok_or_else(|| {
            error_response(ErrorKind::NoSuchEndpoint, "No endpointId provided in request", reply)
        })?;

        if !self.access.is_endpoint_online(endpoint_id, token) {
            return Err(error_response(ErrorKind::EndpointUnreachable, "Target is offline", reply));
        }

        Ok(endpoint_id)
    }

    async fn report_state(&self, directive: &Directive) -> EventEnvelope {
        let reply = ReplyTo::to_directive(directive);
        let endpoint_id = match self.admit(directive, &reply) {
            Ok(endpoint_id) => endpoint_id,
            Err(response) => return response,
        };

        match self.sync.find(&Target::EndpointId(endpoint_id.to_string())).await {
            Ok(device) => state_report(&device, &reply),
            Err(e) => sync_error_response(e, &reply),
        }
    }

    async fn control(&self, directive: &Directive) -> EventEnvelope {
        let reply = ReplyTo::to_directive(directive);
        let endpoint_id = match self.admit(directive, &reply) {
            Ok(endpoint_id) => endpoint_id,
            Err(response) => return response,
        };

        let change = match directive.header.name.as_str() {
            "TurnOn" => Change::Power(PowerState::On),
            "TurnOff" => Change::Power(PowerState::Off),
            "SetBrightness" => match directive.payload.brightness {
                Some(brightness) => Change::Brightness(brightness),
                None => {
                    return error_response(ErrorKind::InvalidValue, "No brightness provided in request", &reply)
                }
            },
            "AdjustBrightness" => match directive.payload.brightness_delta {
                Some(delta) => Change::AdjustBrightness(delta),
                None => {
                    return error_response(
                        ErrorKind::InvalidValue,
                        "No brightness delta provided in request",
                        &reply,
                    )
                }
            },
            _ => return error_response(ErrorKind::InvalidDirective, "Directive not supported", &reply),
        };

        let target = Target::EndpointId(endpoint_id.to_string());
        let mutation = match self.sync.apply(Some(&target), &change).await {
            Ok(mutation) => mutation,
            Err(e) => return sync_error_response(e, &reply),
        };

        let changed = match mutation.change {
            Change::Power(state) => ChangedProperty::power(state),
            _ => ChangedProperty::brightness(mutation.brightness().unwrap_or_default()),
        };
        control_response(changed, &reply)
    }
}

fn sync_error_response(error: SyncError, reply: &ReplyTo) -> EventEnvelope {
    match error {
        SyncError::Unavailable(e) => {
            tracing::warn!("Shadow read failed: {}", e);
            error_response(ErrorKind::EndpointUnreachable, "Unable to read device shadow", reply)
        }
        SyncError::NotFound(_) => {
            error_response(ErrorKind::EndpointUnreachable, "EndpointId not found in device list", reply)
        }
        SyncError::Commit(e) => {
            tracing::warn!("Shadow update failed: {}", e);
            error_response(ErrorKind::InternalError, "Unable to set device state", reply)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryShadowStore;
    use rstest::rstest;
    use serde_json::{json, Value};

    const TOKEN: &str = "corr-token==";

    fn setup() -> (Arc<MemoryShadowStore>, SmartHomeHandler) {
        let store = Arc::new(MemoryShadowStore::with_document(
            "bridge",
            json!({"state": {"reported": {"lightDevices": [
                {"uri": "/a/light/endpoint-1", "name": "Kitchen", "powerOn": false, "brightness": 90},
                {"uri": "/a/light/endpoint-2", "name": "Hall", "powerOn": true, "brightness": 5}
            ]}}}),
        ));
        let handler = SmartHomeHandler::new(LightShadow::new(store.clone(), "bridge"), "Intel");
        (store, handler)
    }

    fn directive(namespace: &str, name: &str, endpoint_id: Option<&str>, payload: Value) -> DirectiveRequest {
        let mut directive = json!({
            "header": {
                "namespace": namespace,
                "name": name,
                "payloadVersion": "3",
                "messageId": "m-1",
                "correlationToken": TOKEN
            },
            "payload": payload
        });
        if let Some(endpoint_id) = endpoint_id {
            directive["endpoint"] = json!({
                "scope": {"type": "BearerToken", "token": "access-token"},
                "endpointId": endpoint_id
            });
        }
        serde_json::from_value(json!({ "directive": directive })).unwrap()
    }

    struct Deny;

    impl AccessPolicy for Deny {
        fn is_valid_token(&self, _token: &str) -> bool {
            false
        }

        fn is_endpoint_online(&self, _endpoint_id: &str, _token: &str) -> bool {
            true
        }
    }

    struct Offline;

    impl AccessPolicy for Offline {
        fn is_valid_token(&self, _token: &str) -> bool {
            true
        }

        fn is_endpoint_online(&self, _endpoint_id: &str, _token: &str) -> bool {
            false
        }
    }

    #[rstest]
    #[case("Alexa.Discovery", "Discover", Route::Discovery)]
    #[case("Alexa.PowerController", "TurnOn", Route::Control)]
    #[case("Alexa.BrightnessController", "SetBrightness", Route::Control)]
    #[case("Alexa", "ReportState", Route::ReportState)]
    #[case("Alexa", "Discover", Route::UnsupportedDirective)]
    #[case("Alexa.ThermostatController", "SetTargetTemperature", Route::UnsupportedNamespace)]
    fn routes_by_namespace_and_name(#[case] namespace: &str, #[case] name: &str, #[case] expected: Route) {
        let request = directive(namespace, name, None, json!({}));
        assert_eq!(route(&request.directive.header), expected);
    }

    #[tokio::test]
    async fn unsupported_namespace_has_empty_identifiers() {
        let (_store, handler) = setup();
        let response = handler
            .handle(directive("Alexa.ColorController", "SetColor", Some("endpoint-1"), json!({})))
            .await;
        assert_eq!(response.error_kind(), Some(ErrorKind::InvalidDirective));
        assert_eq!(response.error_message(), Some("Namespace not supported"));
        assert_eq!(response.event.header.correlation_token.as_deref(), Some(""));
        assert_eq!(response.event.endpoint.unwrap().endpoint_id, "");
    }

    #[tokio::test]
    async fn discovery_lists_every_light() {
        let (_store, handler) = setup();
        let request = directive(
            "Alexa.Discovery",
            "Discover",
            None,
            json!({"scope": {"type": "BearerToken", "token": "access-token"}}),
        );
        let value = serde_json::to_value(handler.handle(request).await).unwrap();
        let endpoints = value["event"]["payload"]["endpoints"].as_array().unwrap();
        let ids: Vec<_> = endpoints.iter().map(|e| e["endpointId"].as_str().unwrap()).collect();
        assert_eq!(ids, ["endpoint-1", "endpoint-2"]);
    }

    #[tokio::test]
    async fn discovery_without_token_is_rejected() {
        let (_store, handler) = setup();
        let response = handler.handle(directive("Alexa.Discovery", "Discover", None, json!({}))).await;
        assert_eq!(response.error_kind(), Some(ErrorKind::InvalidAuthorizationCredential));
        assert_eq!(response.event.header.correlation_token.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn discovery_degrades_to_empty_list() {
        let (store, handler) = setup();
        store.fail_reads(true);
        let request = directive(
            "Alexa.Discovery",
            "Discover",
            None,
            json!({"scope": {"type": "BearerToken", "token": "access-token"}}),
        );
        let value = serde_json::to_value(handler.handle(request).await).unwrap();
        assert_eq!(value["event"]["payload"]["endpoints"], json!([]));
    }

    #[tokio::test]
    async fn report_state_snapshots_the_light() {
        let (_store, handler) = setup();
        let response = handler
            .handle(directive("Alexa", "ReportState", Some("endpoint-2"), json!({})))
            .await;
        assert_eq!(response.event.header.name, "StateReport");
        assert_eq!(response.event.header.correlation_token.as_deref(), Some(TOKEN));
        assert_eq!(response.property("powerState"), Some(&json!("ON")));
        assert_eq!(response.property("brightness"), Some(&json!(5)));
    }

    #[tokio::test]
    async fn report_state_for_unknown_endpoint() {
        let (_store, handler) = setup();
        let response = handler
            .handle(directive("Alexa", "ReportState", Some("endpoint-9"), json!({})))
            .await;
        assert_eq!(response.error_kind(), Some(ErrorKind::EndpointUnreachable));
        assert_eq!(response.error_message(), Some("EndpointId not found in device list"));
        assert_eq!(response.event.endpoint.unwrap().endpoint_id, "endpoint-9");
    }

    #[tokio::test]
    async fn unreadable_shadow_differs_from_unknown_endpoint() {
        let (store, handler) = setup();
        store.fail_reads(true);
        let response = handler
            .handle(directive("Alexa", "ReportState", Some("endpoint-1"), json!({})))
            .await;
        assert_eq!(response.error_kind(), Some(ErrorKind::EndpointUnreachable));
        assert_eq!(response.error_message(), Some("Unable to read device shadow"));
    }

    #[tokio::test]
    async fn missing_endpoint_id() {
        let (_store, handler) = setup();
        let mut request = directive("Alexa.PowerController", "TurnOn", Some("endpoint-1"), json!({}));
        if let Some(endpoint) = request.directive.endpoint.as_mut() {
            endpoint.endpoint_id = None;
        }
        let response = handler.handle(request).await;
        assert_eq!(response.error_kind(), Some(ErrorKind::NoSuchEndpoint));
        assert_eq!(response.event.header.correlation_token.as_deref(), Some(TOKEN));
    }

    #[tokio::test]
    async fn rejected_token() {
        let (_store, handler) = setup();
        let handler = handler.with_access_policy(Arc::new(Deny));
        let response = handler
            .handle(directive("Alexa.PowerController", "TurnOn", Some("endpoint-1"), json!({})))
            .await;
        assert_eq!(response.error_kind(), Some(ErrorKind::InvalidAuthorizationCredential));
        assert_eq!(response.error_message(), Some("Invalid access token: access-token"));
        assert_eq!(response.event.endpoint.unwrap().endpoint_id, "endpoint-1");
    }

    #[tokio::test]
    async fn offline_endpoint() {
        let (_store, handler) = setup();
        let handler = handler.with_access_policy(Arc::new(Offline));
        let response = handler
            .handle(directive("Alexa", "ReportState", Some("endpoint-1"), json!({})))
            .await;
        assert_eq!(response.error_kind(), Some(ErrorKind::EndpointUnreachable));
        assert_eq!(response.error_message(), Some("Target is offline"));
    }

    #[tokio::test]
    async fn turn_on_writes_desired_state() {
        let (store, handler) = setup();
        let response = handler
            .handle(directive("Alexa.PowerController", "TurnOn", Some("endpoint-1"), json!({})))
            .await;
        assert_eq!(response.event.header.name, "Response");
        assert_eq!(response.property("powerState"), Some(&json!("ON")));

        let document = store.document("bridge").await.unwrap();
        assert_eq!(document["state"]["desired"]["lightDevices"][0]["powerOn"], true);
        assert!(document["state"]["desired"].get("device").is_none());
    }

    #[tokio::test]
    async fn adjust_brightness_reports_clamped_value() {
        let (_store, handler) = setup();
        let response = handler
            .handle(directive(
                "Alexa.BrightnessController",
                "AdjustBrightness",
                Some("endpoint-1"),
                json!({"brightnessDelta": 30}),
            ))
            .await;
        assert_eq!(response.property("brightness"), Some(&json!(100)));
    }

    #[tokio::test]
    async fn set_brightness_zero_is_a_value() {
        let (_store, handler) = setup();
        let response = handler
            .handle(directive(
                "Alexa.BrightnessController",
                "SetBrightness",
                Some("endpoint-1"),
                json!({"brightness": 0}),
            ))
            .await;
        assert_eq!(response.error_kind(), None);
        assert_eq!(response.property("brightness"), Some(&json!(0)));
    }

    #[rstest]
    #[case("SetBrightness", "No brightness provided in request")]
    #[case("AdjustBrightness", "No brightness delta provided in request")]
    #[tokio::test]
    async fn missing_brightness_parameter(#[case] name: &str, #[case] message: &str) {
        let (_store, handler) = setup();
        let response = handler
            .handle(directive("Alexa.BrightnessController", name, Some("endpoint-1"), json!({})))
            .await;
        assert_eq!(response.error_kind(), Some(ErrorKind::InvalidValue));
        assert_eq!(response.error_message(), Some(message));
    }

    #[tokio::test]
    async fn unknown_control_name() {
        let (_store, handler) = setup();
        let response = handler
            .handle(directive("Alexa.PowerController", "Toggle", Some("endpoint-1"), json!({})))
            .await;
        assert_eq!(response.error_kind(), Some(ErrorKind::InvalidDirective));
        assert_eq!(response.event.header.correlation_token.as_deref(), Some(TOKEN));
    }

    #[tokio::test]
    async fn failed_write_is_internal_error() {
        let (store, handler) = setup();
        store.fail_updates(true);
        let response = handler
            .handle(directive("Alexa.PowerController", "TurnOff", Some("endpoint-2"), json!({})))
            .await;
        assert_eq!(response.error_kind(), Some(ErrorKind::InternalError));
        assert_eq!(response.error_message(), Some("Unable to set device state"));
    }
}
