//! Core domain models for the occasion dispatch pipeline
//!
//! These models represent the core business entities and map to database
//! tables. `User` is owned and written by external CRUD; the core only
//! reads it. `MessageLog` is the state machine the core owns outright.

use crate::types::{MessageLogId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// User entity, read-only from the core's point of view.
///
/// Soft-deleted users (`deleted_at.is_some()`) are treated as absent by
/// every [`crate::timezone`] and occasion-matching operation.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// IANA timezone string, e.g. `"America/New_York"`.
    pub timezone: String,
    pub birthday_date: Option<NaiveDate>,
    pub anniversary_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// The core treats soft-deleted users as absent (§3).
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// The calendar date driving `message_type`, if the user celebrates it.
    pub fn occasion_date(&self, message_type: MessageType) -> Option<NaiveDate> {
        match message_type {
            MessageType::Birthday => self.birthday_date,
            MessageType::Anniversary => self.anniversary_date,
        }
    }
}

/// One of the two occasion kinds the core dispatches messages for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "message_type", rename_all = "UPPERCASE")]
pub enum MessageType {
    Birthday,
    Anniversary,
}

impl MessageType {
    pub const ALL: [MessageType; 2] = [MessageType::Birthday, MessageType::Anniversary];

    /// Stable lowercase token used inside idempotency keys and logs.
    pub fn as_key_token(self) -> &'static str {
        match self {
            MessageType::Birthday => "BIRTHDAY",
            MessageType::Anniversary => "ANNIVERSARY",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_key_token())
    }
}

/// The `message_logs` state machine (§3 Lifecycle).
///
/// SCHEDULED -> QUEUED -> SENDING -> SENT | FAILED | RETRYING.
/// RETRYING is transient: the next claim returns it to SENDING.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "message_status", rename_all = "UPPERCASE")]
pub enum MessageStatus {
    Scheduled,
    Queued,
    Sending,
    Sent,
    Failed,
    Retrying,
}

impl MessageStatus {
    /// (I2)/(I3): SENT and FAILED never transition further from the core's
    /// own state machine (FAILED can only move via an out-of-scope manual
    /// operator reschedule).
    pub fn is_terminal(self) -> bool {
        matches!(self, MessageStatus::Sent | MessageStatus::Failed)
    }
}

/// A row in `message_logs`: the durable record of one occasion's dispatch.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MessageLog {
    pub id: MessageLogId,
    pub user_id: UserId,
    pub message_type: MessageType,
    /// Rendered once at SCHEDULED creation; never re-rendered (I7).
    pub message_content: String,
    pub scheduled_send_time: DateTime<Utc>,
    pub actual_send_time: Option<DateTime<Utc>>,
    pub status: MessageStatus,
    pub retry_count: i32,
    pub last_retry_at: Option<DateTime<Utc>>,
    /// Unique: `"{user_id}:{message_type}:{local_occasion_date}"` (§3).
    pub idempotency_key: String,
    pub api_response_code: Option<i32>,
    pub api_response_body: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Build the unique idempotency key for an occasion (§3).
///
/// `local_occasion_date` is the calendar date evaluated in the user's own
/// timezone, formatted `YYYY-MM-DD`.
pub fn idempotency_key(
    user_id: UserId,
    message_type: MessageType,
    local_occasion_date: NaiveDate,
) -> String {
    format!(
        "{}:{}:{}",
        user_id,
        message_type.as_key_token(),
        local_occasion_date.format("%Y-%m-%d")
    )
}

/// Render the fixed message template for an occasion (§4.E).
///
/// Content is rendered exactly once and frozen into the SCHEDULED row (I7);
/// retries never call this again.
pub fn render_message_content(message_type: MessageType, user: &User) -> String {
    match message_type {
        MessageType::Birthday => format!(
            "Hey, {} {} it's your birthday!",
            user.first_name, user.last_name
        ),
        MessageType::Anniversary => {
            format!("Happy anniversary, {}!", user.first_name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_user() -> User {
        User {
            id: UserId::new(),
            email: "alice@example.com".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Anders".to_string(),
            timezone: "Europe/London".to_string(),
            birthday_date: NaiveDate::from_ymd_opt(1990, 5, 10),
            anniversary_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn test_idempotency_key_format() {
        let user_id = UserId::new();
        let date = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();
        let key = idempotency_key(user_id, MessageType::Birthday, date);
        assert_eq!(key, format!("{}:BIRTHDAY:2025-05-10", user_id));
    }

    #[test]
    fn test_render_birthday_message() {
        let user = sample_user();
        let content = render_message_content(MessageType::Birthday, &user);
        assert_eq!(content, "Hey, Alice Anders it's your birthday!");
    }

    #[test]
    fn test_render_anniversary_message() {
        let mut user = sample_user();
        user.first_name = "Bob".to_string();
        let content = render_message_content(MessageType::Anniversary, &user);
        assert_eq!(content, "Happy anniversary, Bob!");
    }

    #[test]
    fn test_soft_deleted_user_is_inactive() {
        let mut user = sample_user();
        assert!(user.is_active());
        user.deleted_at = Some(Utc::now());
        assert!(!user.is_active());
    }

    #[test]
    fn test_message_status_terminal() {
        assert!(MessageStatus::Sent.is_terminal());
        assert!(MessageStatus::Failed.is_terminal());
        assert!(!MessageStatus::Scheduled.is_terminal());
        assert!(!MessageStatus::Retrying.is_terminal());
    }

    #[test]
    fn test_occasion_date_selects_correct_field() {
        let user = sample_user();
        assert_eq!(
            user.occasion_date(MessageType::Birthday),
            user.birthday_date
        );
        assert_eq!(user.occasion_date(MessageType::Anniversary), None);
    }
}
