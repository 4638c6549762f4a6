//! Queue Transport (component C): a durable work queue with a primary
//! queue, a delayed retry queue, and a dead-letter queue.
//!
//! This crate defines the trait the scheduler and worker crates depend
//! on, an AMQP (`lapin`) implementation, and an in-memory fake for tests.

mod error;
mod lapin_transport;
mod memory;
mod payload;

use async_trait::async_trait;

pub use error::{QueueError, QueueResult};
pub use lapin_transport::LapinQueueTransport;
pub use memory::InMemoryQueueTransport;
pub use payload::QueuePayload;

/// A message handed to a worker, plus the handle used to acknowledge it.
pub struct QueueDelivery {
    pub payload: QueuePayload,
    acker: Box<dyn AckHandle>,
}

impl QueueDelivery {
    pub fn new(payload: QueuePayload, acker: Box<dyn AckHandle>) -> Self {
        Self { payload, acker }
    }

    /// Remove the message permanently (H steps 2-4, 8, 10).
    pub async fn ack(&self) -> QueueResult<()> {
        self.acker.ack().await
    }

    /// Return to the retry queue for bounded redelivery after backoff
    /// (H step 9, `retry_count <= MAX_WORKER_RETRIES`).
    pub async fn nack_requeue(&self) -> QueueResult<()> {
        self.acker.nack_requeue().await
    }

    /// Send straight to the dead-letter queue (H step 9, retry budget
    /// exhausted).
    pub async fn nack_drop(&self) -> QueueResult<()> {
        self.acker.nack_drop().await
    }
}

/// Acknowledgement handle, abstracted over the wire transport so the
/// in-memory fake and the `lapin` transport share one `QueueDelivery`
/// shape.
#[async_trait]
pub trait AckHandle: Send + Sync {
    async fn ack(&self) -> QueueResult<()>;
    async fn nack_requeue(&self) -> QueueResult<()>;
    async fn nack_drop(&self) -> QueueResult<()>;
}

/// A bounded, ordered stream of deliveries from the primary queue
/// (§4.C: "bounded in-flight messages per consumer (prefetch)").
#[async_trait]
pub trait QueueConsumer: Send {
    async fn next(&mut self) -> QueueResult<Option<QueueDelivery>>;
}

/// Durable work queue (§4.C). `publish` only returns success once the
/// broker has durably accepted the message (publisher confirms).
#[async_trait]
pub trait QueueTransport: Send + Sync {
    async fn publish(&self, payload: &QueuePayload) -> QueueResult<()>;

    /// Publish to the delayed retry path rather than the primary queue
    /// (§4.C "a retry queue with delayed redelivery"; §4.H backoff note:
    /// "implementations may publish to a delayed retry queue instead of
    /// sleeping"). The caller acks the original delivery immediately after
    /// this succeeds, since this call is the redelivery.
    async fn publish_delayed(
        &self,
        payload: &QueuePayload,
        delay: std::time::Duration,
    ) -> QueueResult<()>;

    /// Open a bounded consumer against the primary queue with the given
    /// prefetch count (H: `prefetch = concurrency`).
    async fn consume(&self, prefetch: u16) -> QueueResult<Box<dyn QueueConsumer>>;
}
