use async_trait::async_trait;
use chrono::Datelike;
use occasio_core::{MessageType, User, UserId};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::{DirectoryResult, UserDirectory};

/// In-memory `UserDirectory` fake for tests that don't need a database
/// (mirrors the hand-rolled test doubles used elsewhere in this
/// workspace rather than pulling in a mocking crate).
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: User) {
        self.users.write().unwrap().insert(user.id, user);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn by_id(&self, id: UserId) -> DirectoryResult<Option<User>> {
        Ok(self
            .users
            .read()
            .unwrap()
            .get(&id)
            .filter(|u| u.is_active())
            .cloned())
    }

    async fn with_occasion_on(
        &self,
        month: u32,
        day: u32,
        message_type: MessageType,
    ) -> DirectoryResult<Vec<User>> {
        let users = self.users.read().unwrap();
        Ok(users
            .values()
            .filter(|u| u.is_active())
            .filter(|u| {
                u.occasion_date(message_type)
                    .is_some_and(|d| u32::from(d.month()) == month && u32::from(d.day()) == day)
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn user_with_birthday(month: u32, day: u32) -> User {
        User {
            id: UserId::new(),
            email: "a@example.com".to_string(),
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            timezone: "UTC".to_string(),
            birthday_date: NaiveDate::from_ymd_opt(1990, month, day),
            anniversary_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[tokio::test]
    async fn test_with_occasion_on_matches_month_day_ignoring_year() {
        let dir = InMemoryUserDirectory::new();
        dir.insert(user_with_birthday(5, 10));

        let matches = dir
            .with_occasion_on(5, 10, MessageType::Birthday)
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
    }

    #[tokio::test]
    async fn test_with_occasion_on_excludes_soft_deleted() {
        let dir = InMemoryUserDirectory::new();
        let mut user = user_with_birthday(5, 10);
        user.deleted_at = Some(Utc::now());
        dir.insert(user);

        let matches = dir
            .with_occasion_on(5, 10, MessageType::Birthday)
            .await
            .unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn test_by_id_absent_returns_none() {
        let dir = InMemoryUserDirectory::new();
        assert!(dir.by_id(UserId::new()).await.unwrap().is_none());
    }
}
