//! Custom voice skill front end
//!
//! Lights are addressed by the name the user speaks rather than by endpoint
//! id. Writes from this front end tag the desired section with the thing name.

use crate::error::{Result, ShadowError};
use crate::locate::Target;
use crate::mutate::{Change, Mutation};
use crate::shadow::LightShadow;
use crate::sync::{ShadowSync, SyncError};
use crate::types::{Brightness, PowerState};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

const DIDNT_GET_THAT: &str = "Sorry, I didn't get that";
const NO_LIGHTS_FOUND: &str = "Sorry, no lights found.";
const HELP_SPEECH: &str = "You can ask questions such as, 'List Lights', or you can say 'exit'... Now, what can I help you with?";
const HELP_REPROMPT: &str = "You can say things like, 'List Lights', or you can say 'exit'... Now, what can I help you with?";

/// Session attribute holding the last prompt
pub const ATTR_SPEECH_OUTPUT: &str = "speechOutput";
/// Session attribute holding the last reprompt
pub const ATTR_REPROMPT_SPEECH: &str = "repromptSpeech";

/// Custom skill request envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    pub request: SkillRequestBody,
}

/// Session the request belongs to
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<Application>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

/// Skill application identity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub application_id: String,
}

/// The request itself: launch, intent or session end
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillRequestBody {
    #[serde(rename = "type")]
    pub request_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
}

/// A recognized intent with its slots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub name: String,
    #[serde(default)]
    pub slots: HashMap<String, Slot>,
}

/// A named string parameter of an intent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl SkillRequest {
    /// Application id from the session, or from the request context
    pub fn application_id(&self) -> Option<&str> {
        self.session
            .as_ref()
            .and_then(|s| s.application.as_ref())
            .map(|a| a.application_id.as_str())
            .or_else(|| {
                self.context
                    .as_ref()?
                    .pointer("/System/application/applicationId")?
                    .as_str()
            })
    }

    /// Value of a slot of the current intent, if filled
    pub fn slot(&self, name: &str) -> Option<&str> {
        self.request
            .intent
            .as_ref()?
            .slots
            .get(name)?
            .value
            .as_deref()
            .filter(|value| !value.is_empty())
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.session.as_ref()?.attributes.get(name)?.as_str()
    }
}

/// What the skill says back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Speech {
    /// Speak and end the session
    Tell(String),
    /// Speak, keep the session open, and reprompt if the user is silent
    Ask { speech: String, reprompt: String },
}

impl Speech {
    fn tell(text: impl Into<String>) -> Self {
        Speech::Tell(text.into())
    }

    /// The spoken text
    pub fn text(&self) -> &str {
        match self {
            Speech::Tell(text) => text,
            Speech::Ask { speech, .. } => speech,
        }
    }
}

/// Custom skill response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillResponse {
    pub version: String,
    #[serde(default)]
    pub session_attributes: Map<String, Value>,
    pub response: SkillResponseBody,
}

/// Spoken part of a response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillResponseBody {
    pub output_speech: OutputSpeech,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reprompt: Option<Reprompt>,
    pub should_end_session: bool,
}

/// Plain text speech
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSpeech {
    #[serde(rename = "type")]
    pub speech_type: String,
    pub text: String,
}

/// Speech used when the user does not answer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reprompt {
    pub output_speech: OutputSpeech,
}

impl OutputSpeech {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            speech_type: "PlainText".to_string(),
            text: text.into(),
        }
    }
}

impl SkillResponse {
    /// Build a response from speech and the session attributes to carry on
    pub fn new(speech: Speech, session_attributes: Map<String, Value>) -> Self {
        let response = match speech {
            Speech::Tell(text) => SkillResponseBody {
                output_speech: OutputSpeech::plain(text),
                reprompt: None,
                should_end_session: true,
            },
            Speech::Ask { speech, reprompt } => SkillResponseBody {
                output_speech: OutputSpeech::plain(speech),
                reprompt: Some(Reprompt {
                    output_speech: OutputSpeech::plain(reprompt),
                }),
                should_end_session: false,
            },
        };

        Self {
            version: "1.0".to_string(),
            session_attributes,
            response,
        }
    }

    /// The spoken text
    pub fn text(&self) -> &str {
        &self.response.output_speech.text
    }
}

/// Voice skill handler: lights by name, spoken answers
#[derive(Clone)]
pub struct VoiceSkillHandler {
    sync: ShadowSync,
    application_id: Option<String>,
}

impl VoiceSkillHandler {
    /// Create a handler over the given shadow
    pub fn new(shadow: LightShadow) -> Self {
        Self {
            sync: ShadowSync::new(shadow.tag_device(true)),
            application_id: None,
        }
    }

    /// Only accept requests from this skill application
    pub fn with_application_id(mut self, application_id: Option<String>) -> Self {
        self.application_id = application_id;
        self
    }

    /// Handle one skill request
    pub async fn handle(&self, request: SkillRequest) -> Result<SkillResponse> {
        if let Some(expected) = &self.application_id {
            let actual = request.application_id().unwrap_or_default();
            if actual != expected.as_str() {
                return Err(ShadowError::ApplicationMismatch {
                    expected: expected.clone(),
                    actual: actual.to_string(),
                });
            }
        }

        let mut attributes = request
            .session
            .as_ref()
            .map(|s| s.attributes.clone())
            .unwrap_or_default();

        let speech = match request.request.request_type.as_str() {
            "LaunchRequest" => Speech::tell("Bridge Operational"),
            "SessionEndedRequest" => Speech::tell("Goodbye!"),
            "IntentRequest" => {
                let name = request.request.intent.as_ref().map(|i| i.name.as_str()).unwrap_or_default();
                tracing::info!("Intent {}", name);
                self.intent(name, &request, &mut attributes).await
            }
            other => {
                tracing::warn!("Unhandled request type {}", other);
                Speech::tell(DIDNT_GET_THAT)
            }
        };

        tracing::debug!("Speech: {:?}", speech);
        Ok(SkillResponse::new(speech, attributes))
    }

    async fn intent(&self, name: &str, request: &SkillRequest, attributes: &mut Map<String, Value>) -> Speech {
        match name {
            "ListLightsIntent" => self.list_lights().await,
            "AllLightsStateIntent" => self.all_lights_state(request).await,
            "LightBrightnessIntent" => self.light_brightness(request).await,
            "LightStateIntent" => self.light_state(request).await,
            "LightRenameIntent" => self.light_rename(request).await,
            "AMAZON.HelpIntent" => {
                attributes.insert(ATTR_SPEECH_OUTPUT.to_string(), Value::from(HELP_SPEECH));
                attributes.insert(ATTR_REPROMPT_SPEECH.to_string(), Value::from(HELP_REPROMPT));
                Speech::Ask {
                    speech: HELP_SPEECH.to_string(),
                    reprompt: HELP_REPROMPT.to_string(),
                }
            }
            "AMAZON.RepeatIntent" => Speech::Ask {
                speech: request.attribute(ATTR_SPEECH_OUTPUT).unwrap_or(HELP_SPEECH).to_string(),
                reprompt: request.attribute(ATTR_REPROMPT_SPEECH).unwrap_or(HELP_REPROMPT).to_string(),
            },
            "AMAZON.StopIntent" | "AMAZON.CancelIntent" => Speech::tell("Goodbye!"),
            other => {
                tracing::warn!("Unhandled intent {}", other);
                Speech::tell(DIDNT_GET_THAT)
            }
        }
    }

    async fn list_lights(&self) -> Speech {
        match self.sync.devices().await {
            Ok(devices) if devices.is_empty() => Speech::tell(NO_LIGHTS_FOUND),
            Ok(devices) => Speech::Tell(
                devices
                    .iter()
                    .map(|d| format!("{} is {}", d.name, if d.power_on { "on" } else { "off" }))
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            Err(e) => Speech::Tell(format!(
                " - Error getting device list: {} {}",
                e,
                self.sync.shadow().thing_name()
            )),
        }
    }

    async fn all_lights_state(&self, request: &SkillRequest) -> Speech {
        let state = match request.slot("lightState").map(str::to_lowercase).as_deref() {
            Some("on") => PowerState::On,
            Some("off") => PowerState::Off,
            _ => return Speech::tell(DIDNT_GET_THAT),
        };

        // An empty list is answered without writing anything back
        match self.sync.devices().await {
            Ok(devices) if !devices.is_empty() => {}
            _ => return Speech::tell(NO_LIGHTS_FOUND),
        }

        match self.sync.apply(None, &Change::Power(state)).await {
            Ok(mutation) if mutation.devices.is_empty() => Speech::tell(NO_LIGHTS_FOUND),
            Ok(_) => Speech::Tell(format!("All lights {}", on_off(state))),
            Err(SyncError::Commit(e)) => Speech::Tell(format!(
                "All lights {}{}",
                on_off(state),
                self.update_failure(&e)
            )),
            Err(_) => Speech::tell(NO_LIGHTS_FOUND),
        }
    }

    async fn light_brightness(&self, request: &SkillRequest) -> Speech {
        let (Some(name), Some(brightness)) = (request.slot("lightName"), request.slot("lightBrightness")) else {
            return Speech::tell(DIDNT_GET_THAT);
        };
        let Ok(brightness) = brightness.trim().parse::<Brightness>() else {
            return Speech::tell(DIDNT_GET_THAT);
        };

        let change = Change::Brightness(brightness);
        self.update_named(name, &change, |mutation| {
            format!("{} brightness {}", name, mutation.brightness().unwrap_or_default())
        })
        .await
    }

    async fn light_state(&self, request: &SkillRequest) -> Speech {
        let (Some(name), Some(state)) = (request.slot("lightName"), request.slot("lightState")) else {
            return Speech::tell(DIDNT_GET_THAT);
        };
        let state = PowerState::from(state.eq_ignore_ascii_case("on"));

        self.update_named(name, &Change::Power(state), |_| format!("{} {}", name, on_off(state)))
            .await
    }

    async fn light_rename(&self, request: &SkillRequest) -> Speech {
        let (Some(name), Some(new_name)) = (request.slot("lightName"), request.slot("newLightName")) else {
            return Speech::tell(DIDNT_GET_THAT);
        };

        let change = Change::Rename(new_name.to_string());
        self.update_named(name, &change, |_| format!("{} renamed as {}", name, new_name))
            .await
    }

    /// Apply a change to the light with the spoken name and describe the outcome
    async fn update_named<F>(&self, name: &str, change: &Change, describe: F) -> Speech
    where
        F: FnOnce(&Mutation) -> String,
    {
        let target = Target::Name(name.to_string());
        match self.sync.apply(Some(&target), change).await {
            Ok(mutation) => Speech::Tell(describe(&mutation)),
            Err(SyncError::Unavailable(e)) => {
                tracing::warn!("Shadow read failed: {}", e);
                Speech::tell(NO_LIGHTS_FOUND)
            }
            Err(SyncError::NotFound(_)) => Speech::Tell(format!("Sorry, I can't find {}", name)),
            Err(SyncError::Commit(e)) => Speech::Tell(self.update_failure(&e)),
        }
    }

    fn update_failure(&self, error: &ShadowError) -> String {
        format!(" - Error updating light: {} {}", error, self.sync.shadow().thing_name())
    }
}

fn on_off(state: PowerState) -> &'static str {
    if state.is_on() {
        "on"
    } else {
        "off"
    }
}
