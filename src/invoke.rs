use crate::config::SkillConfig;
use crate::directive::DirectiveRequest;
use crate::error::{Result, ShadowError};
use crate::response::{error_response, ErrorKind, ReplyTo};
use crate::router::SmartHomeHandler;
use crate::shadow::LightShadow;
use crate::skill::{SkillRequest, VoiceSkillHandler};
use crate::store::ShadowStore;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Both front ends, sharing one store and thing
#[derive(Clone)]
pub struct Handlers {
    pub smart_home: SmartHomeHandler,
    pub voice: VoiceSkillHandler,
}

impl Handlers {
    /// Build both front ends from configuration over the given store
    pub fn new(config: &SkillConfig, store: Arc<dyn ShadowStore>) -> Self {
        let shadow = LightShadow::new(store, config.thing_name.clone());
        Self {
            smart_home: SmartHomeHandler::new(shadow.clone(), config.manufacturer_name.clone()),
            voice: VoiceSkillHandler::new(shadow).with_application_id(config.application_id.clone()),
        }
    }
}

/// Kind of incoming event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Smart home directive, answered with an event envelope
    Directive,
    /// Custom skill request, answered with speech
    SkillRequest,
}

/// Classify an event by its top-level key
pub fn classify(event: &Value) -> Option<EventKind> {
    let object = event.as_object()?;
    if object.contains_key("directive") {
        Some(EventKind::Directive)
    } else if object.contains_key("request") {
        Some(EventKind::SkillRequest)
    } else {
        None
    }
}

/// Identifiers of a directive that did not parse, where they can still be read
fn salvage_reply(event: &Value) -> ReplyTo {
    let text = |pointer: &str| {
        event
            .pointer(pointer)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    ReplyTo {
        endpoint_id: text("/directive/endpoint/endpointId"),
        correlation_token: text("/directive/header/correlationToken"),
        scope: None,
    }
}

/// Handle one event and produce the JSON to return to the voice platform
///
/// Smart home failures, malformed directives included, are reported inside
/// the returned event. Errors are only returned for events that cannot be
/// classified, for skill requests that cannot be parsed, and for skill
/// requests from another application.
pub async fn handle_event(handlers: &Handlers, event: Value) -> Result<Value> {
    match classify(&event) {
        Some(EventKind::Directive) => {
            let request = match DirectiveRequest::deserialize(&event) {
                Ok(request) => request,
                Err(e) => {
                    let response = error_response(
                        ErrorKind::InvalidDirective,
                        format!("Malformed directive: {}", e),
                        &salvage_reply(&event),
                    );
                    return Ok(serde_json::to_value(response)?);
                }
            };
            tracing::info!(
                "Directive {}.{}",
                request.directive.header.namespace,
                request.directive.header.name
            );
            let response = handlers.smart_home.handle(request).await;
            Ok(serde_json::to_value(response)?)
        }
        Some(EventKind::SkillRequest) => {
            let request: SkillRequest = serde_json::from_value(event)?;
            tracing::info!("Skill request {}", request.request.request_type);
            let response = handlers.voice.handle(request).await?;
            Ok(serde_json::to_value(response)?)
        }
        None => {
            let keys = event
                .as_object()
                .map(|o| o.keys().cloned().collect::<Vec<_>>().join(", "))
                .unwrap_or_default();
            Err(ShadowError::UnrecognizedEvent(format!("expected 'directive' or 'request', got [{}]", keys)))
        }
    }
}
