//! Type-safe wrappers for domain identifiers
//!
//! These newtypes prevent mixing different ID types at compile time.
//! For example, you cannot pass a `UserId` where a `MessageLogId` is
//! expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// User identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Create a new, random user ID
    pub fn new() -> Self {
        UserId(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        UserId(id)
    }
}

impl From<UserId> for Uuid {
    fn from(id: UserId) -> Self {
        id.0
    }
}

/// Message log identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct MessageLogId(pub Uuid);

impl MessageLogId {
    /// Create a new, random message log ID
    pub fn new() -> Self {
        MessageLogId(Uuid::new_v4())
    }
}

impl Default for MessageLogId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageLogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for MessageLogId {
    fn from(id: Uuid) -> Self {
        MessageLogId(id)
    }
}

impl From<MessageLogId> for Uuid {
    fn from(id: MessageLogId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_creation() {
        let id1 = UserId::new();
        let id2 = UserId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_message_log_id_creation() {
        let id1 = MessageLogId::new();
        let id2 = MessageLogId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_user_id_from_uuid() {
        let uuid = Uuid::new_v4();
        let user_id = UserId::from(uuid);
        assert_eq!(Uuid::from(user_id), uuid);
    }

    #[test]
    fn test_message_log_id_display() {
        let id = MessageLogId::new();
        let display = format!("{}", id);
        assert!(!display.is_empty());
    }

    #[test]
    fn test_message_log_id_serialization() {
        let id = MessageLogId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: MessageLogId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}
