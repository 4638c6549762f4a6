use async_trait::async_trait;
use futures::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions,
    BasicQosOptions, QueueDeclareOptions,
};
use lapin::types::{AMQPValue, FieldTable};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};

use crate::{AckHandle, QueueConsumer, QueueDelivery, QueuePayload, QueueError, QueueResult, QueueTransport};

const PRIMARY_QUEUE: &str = "occasio.messages";
const RETRY_QUEUE: &str = "occasio.messages.retry";
const DLQ_QUEUE: &str = "occasio.messages.dlq";

/// AMQP-backed `QueueTransport`. Declares three durable queues:
///
/// - `occasio.messages`: the primary queue workers consume from.
/// - `occasio.messages.retry`: holds nacked messages for the backoff
///   duration via a per-message TTL, then dead-letters them back onto
///   the primary queue for redelivery (§4.H backoff note).
/// - `occasio.messages.dlq`: terminal home for messages that exhaust
///   the worker retry budget (§4.H step 9).
pub struct LapinQueueTransport {
    channel: Channel,
    _connection: Connection,
}

impl LapinQueueTransport {
    pub async fn connect(amqp_url: &str) -> QueueResult<Self> {
        let connection =
            Connection::connect(amqp_url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;

        // Default exchange ("") routes a dead-lettered message to the queue
        // named by `x-dead-letter-routing-key` directly; both args are
        // required together or RabbitMQ silently discards the message
        // instead of dead-lettering it.
        let mut primary_args = FieldTable::default();
        primary_args.insert(
            "x-dead-letter-exchange".into(),
            AMQPValue::LongString("".into()),
        );
        primary_args.insert(
            "x-dead-letter-routing-key".into(),
            AMQPValue::LongString(DLQ_QUEUE.into()),
        );
        channel
            .queue_declare(
                PRIMARY_QUEUE,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                primary_args,
            )
            .await?;

        channel
            .queue_declare(
                DLQ_QUEUE,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        let mut retry_args = FieldTable::default();
        retry_args.insert(
            "x-dead-letter-exchange".into(),
            AMQPValue::LongString("".into()),
        );
        retry_args.insert(
            "x-dead-letter-routing-key".into(),
            AMQPValue::LongString(PRIMARY_QUEUE.into()),
        );
        channel
            .queue_declare(
                RETRY_QUEUE,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                retry_args,
            )
            .await?;

        Ok(Self {
            channel,
            _connection: connection,
        })
    }
}

#[async_trait]
impl QueueTransport for LapinQueueTransport {
    async fn publish(&self, payload: &QueuePayload) -> QueueResult<()> {
        let properties = BasicProperties::default().with_delivery_mode(2);
        // Publisher confirms: the outer `.await` sends the frame, the
        // inner `.await` waits for the broker's ack of durable receipt.
        self.channel
            .basic_publish(
                "",
                PRIMARY_QUEUE,
                BasicPublishOptions::default(),
                &payload.to_json_bytes(),
                properties,
            )
            .await?
            .await?;
        Ok(())
    }

    async fn publish_delayed(
        &self,
        payload: &QueuePayload,
        delay: std::time::Duration,
    ) -> QueueResult<()> {
        // Per-message TTL on the retry queue; once it expires, the retry
        // queue's own dead-letter args redeliver it onto the primary
        // queue (§4.H backoff note).
        let properties = BasicProperties::default()
            .with_delivery_mode(2)
            .with_expiration(delay.as_millis().to_string().into());

        self.channel
            .basic_publish(
                "",
                RETRY_QUEUE,
                BasicPublishOptions::default(),
                &payload.to_json_bytes(),
                properties,
            )
            .await?
            .await?;
        Ok(())
    }

    async fn consume(&self, prefetch: u16) -> QueueResult<Box<dyn QueueConsumer>> {
        self.channel
            .basic_qos(prefetch, BasicQosOptions::default())
            .await?;

        let consumer = self
            .channel
            .basic_consume(
                PRIMARY_QUEUE,
                "occasio-worker",
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        Ok(Box::new(LapinConsumer { consumer }))
    }
}

struct LapinConsumer {
    consumer: lapin::Consumer,
}

#[async_trait]
impl QueueConsumer for LapinConsumer {
    async fn next(&mut self) -> QueueResult<Option<QueueDelivery>> {
        let Some(delivery) = self.consumer.next().await else {
            return Ok(None);
        };
        let delivery = delivery?;
        let payload = QueuePayload::from_json_bytes(&delivery.data)?;

        let acker = Box::new(LapinAcker {
            acker: delivery.acker,
        });
        Ok(Some(QueueDelivery::new(payload, acker)))
    }
}

struct LapinAcker {
    acker: lapin::acker::Acker,
}

#[async_trait]
impl AckHandle for LapinAcker {
    async fn ack(&self) -> QueueResult<()> {
        self.acker
            .ack(BasicAckOptions::default())
            .await
            .map_err(QueueError::Transport)
    }

    async fn nack_requeue(&self) -> QueueResult<()> {
        self.acker
            .nack(BasicNackOptions {
                requeue: true,
                ..Default::default()
            })
            .await
            .map_err(QueueError::Transport)
    }

    async fn nack_drop(&self) -> QueueResult<()> {
        // requeue: false dead-letters via the primary queue's own
        // x-dead-letter-exchange/-routing-key args, landing on the DLQ
        // directly rather than the retry queue's TTL path.
        self.acker
            .nack(BasicNackOptions {
                requeue: false,
                ..Default::default()
            })
            .await
            .map_err(QueueError::Transport)
    }
}
