//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the API server
//! for the live household store.

use hearth_core::{Action, Store};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Applies an action to the shared store. The result arrives as a `StateChanged`.
    Dispatch { action: Action },
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The full store, sent on connect and after every transition.
    StateChanged { store: Arc<Store> },

    /// Reports a message the server could not understand.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dispatch_messages_wrap_a_tagged_action() {
        let message: ClientMessage = serde_json::from_value(json!({
            "type": "dispatch",
            "action": { "type": "SET_THEME", "payload": { "theme": "dark" } }
        }))
        .unwrap();
        let ClientMessage::Dispatch { action } = message;
        assert_eq!(action.kind(), "SET_THEME");
    }

    #[test]
    fn state_changes_carry_the_camel_case_store() {
        let wire = serde_json::to_value(ServerMessage::StateChanged {
            store: Arc::new(Store::default()),
        })
        .unwrap();
        assert_eq!(wire["type"], "state_changed");
        assert!(wire["store"]["currentUserId"].is_null());
        assert_eq!(wire["store"]["view"], "AUTH");
    }
}
