use serde::{Deserialize, Serialize};

use crate::ids::{GroupId, UserId};
use crate::models::{ChannelRef, Message};

/// Events pushed by the server over the realtime gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server accepted the Identify handshake
    Ready { user_id: UserId },

    /// A message was posted to a channel the connection is scoped to
    MessageCreate { message: Message },

    /// A peer started (or is still) typing
    TypingStart {
        channel: ChannelRef,
        user_id: UserId,
        display_name: String,
    },

    /// A peer stopped typing. Carries no display name.
    TypingStop { channel: ChannelRef, user_id: UserId },

    /// Server rejected a command
    Error { message: String },
}

impl GatewayEvent {
    /// Returns the channel this event is scoped to, if any.
    pub fn channel(&self) -> Option<&ChannelRef> {
        match self {
            Self::MessageCreate { message } => Some(&message.channel),
            Self::TypingStart { channel, .. } => Some(channel),
            Self::TypingStop { channel, .. } => Some(channel),
            _ => None,
        }
    }
}

/// Commands sent FROM client TO server over the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the connection
    Identify { token: String },

    /// Post a message; it comes back to every member, sender included, as MessageCreate
    SendMessage { channel: ChannelRef, content: String },

    StartTyping { channel: ChannelRef },

    StopTyping { channel: ChannelRef },

    /// Scope subsequent group pushes to this connection
    JoinGroup { group_id: GroupId },
}
