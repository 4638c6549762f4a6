use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

use crate::{AckHandle, QueueConsumer, QueueDelivery, QueuePayload, QueueResult, QueueTransport};

#[derive(Default)]
struct Inner {
    queue: Mutex<VecDeque<QueuePayload>>,
    dead_letter: Mutex<Vec<QueuePayload>>,
    notify: Notify,
}

/// In-memory `QueueTransport` fake for tests that don't need a broker.
/// `nack_requeue` pushes the payload to the back of the same queue; there
/// is no separate delayed-retry queue, since tests don't depend on the
/// real redelivery timing.
#[derive(Clone, Default)]
pub struct InMemoryQueueTransport {
    inner: Arc<Inner>,
}

impl InMemoryQueueTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn dead_letters(&self) -> Vec<QueuePayload> {
        self.inner.dead_letter.lock().await.clone()
    }
}

struct MemoryAcker {
    inner: Arc<Inner>,
    payload: QueuePayload,
}

#[async_trait]
impl AckHandle for MemoryAcker {
    async fn ack(&self) -> QueueResult<()> {
        Ok(())
    }

    async fn nack_requeue(&self) -> QueueResult<()> {
        self.inner.queue.lock().await.push_back(self.payload.clone());
        self.inner.notify.notify_one();
        Ok(())
    }

    async fn nack_drop(&self) -> QueueResult<()> {
        self.inner.dead_letter.lock().await.push(self.payload.clone());
        Ok(())
    }
}

struct MemoryConsumer {
    inner: Arc<Inner>,
}

#[async_trait]
impl QueueConsumer for MemoryConsumer {
    async fn next(&mut self) -> QueueResult<Option<QueueDelivery>> {
        loop {
            if let Some(payload) = self.inner.queue.lock().await.pop_front() {
                let acker = Box::new(MemoryAcker {
                    inner: self.inner.clone(),
                    payload: payload.clone(),
                });
                return Ok(Some(QueueDelivery::new(payload, acker)));
            }
            self.inner.notify.notified().await;
        }
    }
}

#[async_trait]
impl QueueTransport for InMemoryQueueTransport {
    async fn publish(&self, payload: &QueuePayload) -> QueueResult<()> {
        self.inner.queue.lock().await.push_back(payload.clone());
        self.inner.notify.notify_one();
        Ok(())
    }

    /// No separate delayed-retry queue here (see the struct doc); the
    /// delay is ignored and the payload redelivers immediately, since
    /// tests don't depend on real redelivery timing.
    async fn publish_delayed(
        &self,
        payload: &QueuePayload,
        _delay: std::time::Duration,
    ) -> QueueResult<()> {
        self.publish(payload).await
    }

    async fn consume(&self, _prefetch: u16) -> QueueResult<Box<dyn QueueConsumer>> {
        Ok(Box::new(MemoryConsumer {
            inner: self.inner.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use occasio_core::{MessageLogId, MessageType, UserId};

    fn sample_payload() -> QueuePayload {
        QueuePayload {
            message_id: MessageLogId::new(),
            user_id: UserId::new(),
            message_type: MessageType::Birthday,
            scheduled_send_time: chrono::Utc::now(),
            retry_count: 0,
        }
    }

    #[tokio::test]
    async fn test_publish_then_consume() {
        let transport = InMemoryQueueTransport::new();
        let payload = sample_payload();
        transport.publish(&payload).await.unwrap();

        let mut consumer = transport.consume(1).await.unwrap();
        let delivery = consumer.next().await.unwrap().unwrap();
        assert_eq!(delivery.payload.message_id, payload.message_id);
        delivery.ack().await.unwrap();
    }

    #[tokio::test]
    async fn test_nack_requeue_redelivers() {
        let transport = InMemoryQueueTransport::new();
        let payload = sample_payload();
        transport.publish(&payload).await.unwrap();

        let mut consumer = transport.consume(1).await.unwrap();
        let delivery = consumer.next().await.unwrap().unwrap();
        delivery.nack_requeue().await.unwrap();

        let redelivered = consumer.next().await.unwrap().unwrap();
        assert_eq!(redelivered.payload.message_id, payload.message_id);
    }

    #[tokio::test]
    async fn test_publish_delayed_ignores_delay_and_still_delivers() {
        let transport = InMemoryQueueTransport::new();
        let payload = sample_payload();
        transport
            .publish_delayed(&payload, std::time::Duration::from_secs(10))
            .await
            .unwrap();

        let mut consumer = transport.consume(1).await.unwrap();
        let delivery = consumer.next().await.unwrap().unwrap();
        assert_eq!(delivery.payload.message_id, payload.message_id);
    }

    #[tokio::test]
    async fn test_nack_drop_goes_to_dead_letter() {
        let transport = InMemoryQueueTransport::new();
        let payload = sample_payload();
        transport.publish(&payload).await.unwrap();

        let mut consumer = transport.consume(1).await.unwrap();
        let delivery = consumer.next().await.unwrap().unwrap();
        delivery.nack_drop().await.unwrap();

        assert_eq!(transport.dead_letters().await.len(), 1);
    }
}
