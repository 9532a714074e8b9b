//! Optional inspection channel.
//!
//! The store notifies an [`Inspector`] of its initial state, of every
//! commit and of action rejections. Without one nothing else changes.
//! Time travel is left to the inspector: feed an earlier snapshot back
//! through `Store::replace_state`.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::store::{ActionRecord, MutationRecord};

pub trait Inspector: Send + Sync {
    fn on_init(&self, _state: &Value) {}

    fn on_mutation(&self, mutation: &MutationRecord, state: &Value);

    fn on_action_error(&self, _action: &ActionRecord, _error: &anyhow::Error) {}
}

/// Event forwarded by [`ChannelInspector`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InspectorEvent {
    Init {
        state: Value,
    },
    Mutation {
        mutation: MutationRecord,
        state: Value,
    },
    ActionError {
        action: ActionRecord,
        message: String,
    },
}

/// Forwards every notification over an unbounded channel. Sends to a
/// closed channel are dropped.
pub struct ChannelInspector {
    tx: mpsc::UnboundedSender<InspectorEvent>,
}

impl ChannelInspector {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<InspectorEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: InspectorEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("inspector channel closed, event dropped");
        }
    }
}

impl Inspector for ChannelInspector {
    fn on_init(&self, state: &Value) {
        self.send(InspectorEvent::Init {
            state: state.clone(),
        });
    }

    fn on_mutation(&self, mutation: &MutationRecord, state: &Value) {
        self.send(InspectorEvent::Mutation {
            mutation: mutation.clone(),
            state: state.clone(),
        });
    }

    fn on_action_error(&self, action: &ActionRecord, error: &anyhow::Error) {
        self.send(InspectorEvent::ActionError {
            action: action.clone(),
            message: format!("{:#}", error),
        });
    }
}
