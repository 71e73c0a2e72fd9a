//! Voice-assistant handlers for lights kept in a device shadow
//!
//! A bridge device publishes the lights it knows about as a `lightDevices`
//! list in the reported section of its shadow document, and applies whatever
//! list appears in the desired section. This library answers voice-platform
//! events against that document:
//!
//! - Smart home directives: discovery, state reports, power and brightness
//!   control, addressed by endpoint id
//! - Custom skill intents: listing, switching, dimming and renaming lights by
//!   the name the user speaks
//!
//! Every change is a read-modify-write of the whole list: fetch the reported
//! list, change the addressed lights, write the full list as desired state.
//!
//! # Quick Start
//!
//! ```no_run
//! use shadow_lights::{handle_event, Handlers, SkillConfig, WebSocketShadowStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SkillConfig::new("LeetoniaLinuxSystem", "ws://127.0.0.1:8780");
//!     let store = WebSocketShadowStore::connect(config.store_url.clone(), config.request_timeout()).await?;
//!     let handlers = Handlers::new(&config, Arc::new(store));
//!
//!     let event = serde_json::json!({
//!         "directive": {
//!             "header": {"namespace": "Alexa.Discovery", "name": "Discover", "payloadVersion": "3", "messageId": "1"},
//!             "payload": {"scope": {"type": "BearerToken", "token": "access-token"}}
//!         }
//!     });
//!     let response = handle_event(&handlers, event).await?;
//!     println!("{}", response);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **Front ends**: [`SmartHomeHandler`] and [`VoiceSkillHandler`], joined by [`handle_event`]
//! - **Sync**: the read-modify-write cycle shared by both front ends
//! - **Locate / Mutate**: pure lookups and changes over the light list
//! - **Shadow**: where the list lives inside the shadow document
//! - **Store**: the document store, over WebSocket or in memory
//! - **Connection / Protocol**: the store's JSON request/response wire format

mod config;
mod connection;
mod directive;
mod error;
mod invoke;
mod locate;
mod mutate;
mod protocol;
mod response;
mod router;
mod shadow;
mod skill;
mod store;
mod sync;
mod types;

// Public exports
pub use config::{SkillConfig, ENV_APPLICATION_ID, ENV_STORE_URL, ENV_THING_NAME};
pub use directive::{
    Directive, DirectiveEndpoint, DirectiveHeader, DirectivePayload, DirectiveRequest, Scope,
    NAMESPACE_ALEXA, NAMESPACE_BRIGHTNESS, NAMESPACE_DISCOVERY, NAMESPACE_HEALTH, NAMESPACE_POWER,
};
pub use error::{Result, ShadowError};
pub use invoke::{classify, handle_event, EventKind, Handlers};
pub use locate::{is_addressed, locate, Target};
pub use mutate::{adjust_brightness, rename, set_brightness, set_power, Change, Mutation};
pub use response::{
    control_response, discovery_response, error_response, state_report, Capability,
    ChangedProperty, DiscoveredEndpoint, ErrorKind, Event, EventEnvelope, EventHeader,
    EventPayload, Property, ReplyTo, PAYLOAD_VERSION,
};
pub use router::{route, AccessPolicy, AllowAll, Route, SmartHomeHandler};
pub use shadow::LightShadow;
pub use skill::{SkillRequest, SkillResponse, Speech, VoiceSkillHandler};
pub use store::{MemoryShadowStore, ShadowStore, WebSocketShadowStore};
pub use sync::{ShadowSync, SyncError};
pub use types::{
    clamp_brightness, endpoint_id_from_uri, Brightness, EndpointId, LightDevice, PowerState,
    MAX_BRIGHTNESS, MIN_BRIGHTNESS,
};
