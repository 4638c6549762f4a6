use chrono::{DateTime, Utc};
use occasio_core::{MessageLogId, MessageType, UserId};
use serde::{Deserialize, Serialize};

/// Wire payload for a queued message (§4.C). This is a hint: the worker
/// always re-reads authoritative state from the Store before acting on
/// it (H step 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuePayload {
    pub message_id: MessageLogId,
    pub user_id: UserId,
    pub message_type: MessageType,
    pub scheduled_send_time: DateTime<Utc>,
    pub retry_count: i32,
}

impl QueuePayload {
    pub fn to_json_bytes(&self) -> Vec<u8> {
        // Construction always succeeds: every field is a plain
        // serializable value with no custom fallible Serialize impl.
        serde_json::to_vec(self).expect("QueuePayload is always serializable")
    }

    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_through_json() {
        let payload = QueuePayload {
            message_id: MessageLogId::new(),
            user_id: UserId::new(),
            message_type: MessageType::Birthday,
            scheduled_send_time: Utc::now(),
            retry_count: 2,
        };
        let bytes = payload.to_json_bytes();
        let decoded = QueuePayload::from_json_bytes(&bytes).unwrap();
        assert_eq!(decoded.message_id, payload.message_id);
        assert_eq!(decoded.retry_count, payload.retry_count);
    }
}
