use serde::{Deserialize, Serialize};

use crate::models::{ActionId, UserId};

/// Membership change a viewer can request on a community action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Join,
    Leave,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Join => "join",
            Self::Leave => "leave",
        }
    }
}

/// Events published by the client so that every view holding session or
/// action state can follow changes without polling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientEvent {
    /// A login, registration or mount produced a user
    SignedIn { user_id: UserId },

    /// The user logged out
    SignedOut,

    /// The cached user was replaced with fresh server state
    UserRefreshed { user_id: UserId },

    /// The stored token was rejected or had expired and was discarded
    SessionExpired,

    /// A join/leave was confirmed by the server
    MutationCommitted {
        action_id: ActionId,
        kind: MutationKind,
        participants_count: u32,
    },

    /// A join/leave failed and the optimistic change was undone
    MutationRolledBack {
        action_id: ActionId,
        kind: MutationKind,
        reason: String,
    },
}

impl ClientEvent {
    /// Returns the action this event concerns, if any.
    /// Session-level events return `None`.
    pub fn action_id(&self) -> Option<ActionId> {
        match self {
            Self::MutationCommitted { action_id, .. } => Some(*action_id),
            Self::MutationRolledBack { action_id, .. } => Some(*action_id),
            _ => None,
        }
    }
}
