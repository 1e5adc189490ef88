use std::time::Duration;

use async_nats::jetstream::{self, consumer::pull::Config as PullConfig, stream::Config as StreamConfig};
use futures::StreamExt;
use tracing::warn;

use super::envelope::{Priority, TaskEnvelope};
use crate::error::BrokerError;

/// Durable priority queue between Orchestrator and Worker, built on
/// `async_nats` JetStream (`SPEC_FULL.md` §4.3a explains the AMQP->NATS
/// transport substitution). Each logical queue name maps to one stream
/// with a `<name>.hi` subject for priority >= 3 and a `<name>.lo` subject
/// for everything else; `receive` always drains `hi` before `lo`,
/// reproducing "priority order, then FIFO within a priority."
pub struct WorkQueue {
  context: jetstream::Context,
  name: String,
  hi_consumer: jetstream::consumer::Consumer<PullConfig>,
  lo_consumer: jetstream::consumer::Consumer<PullConfig>,
}

impl WorkQueue {
  /// `ttl` is the queue-level message TTL (`max_age`) so a stalled
  /// consumer cannot accumulate unboundedly stale refresh requests.
  pub async fn connect(client: async_nats::Client, queue_name: &str, ttl: Duration) -> Result<Self, BrokerError> {
    let context = jetstream::new(client);

    let hi_subject = format!("{queue_name}.hi");
    let lo_subject = format!("{queue_name}.lo");

    let stream = context
      .get_or_create_stream(StreamConfig {
        name: queue_name.to_string(),
        subjects: vec![hi_subject.clone(), lo_subject.clone()],
        max_age: ttl,
        ..Default::default()
      })
      .await
      .map_err(|e| BrokerError::Connection(e.to_string()))?;

    // prefetch=1: one in-flight message per consumer keeps the queue as
    // the true backpressure point (`spec.md` §4.3).
    let hi_consumer = stream
      .get_or_create_consumer(
        &format!("{queue_name}-hi"),
        PullConfig {
          durable_name: Some(format!("{queue_name}-hi")),
          filter_subject: hi_subject,
          max_ack_pending: 1,
          ..Default::default()
        },
      )
      .await
      .map_err(|e| BrokerError::Connection(e.to_string()))?;

    let lo_consumer = stream
      .get_or_create_consumer(
        &format!("{queue_name}-lo"),
        PullConfig {
          durable_name: Some(format!("{queue_name}-lo")),
          filter_subject: lo_subject,
          max_ack_pending: 1,
          ..Default::default()
        },
      )
      .await
      .map_err(|e| BrokerError::Connection(e.to_string()))?;

    Ok(Self {
      context,
      name: queue_name.to_string(),
      hi_consumer,
      lo_consumer,
    })
  }

  /// Publish is persistent by construction (JetStream streams durably);
  /// this is the equivalent of AMQP's `delivery_mode=2`.
  pub async fn publish(&self, priority: Priority, envelope: &TaskEnvelope) -> Result<(), BrokerError> {
    let subject = if priority.is_high() {
      format!("{}.hi", self.name)
    } else {
      format!("{}.lo", self.name)
    };

    let payload = serde_json::to_vec(envelope).map_err(|e| BrokerError::MalformedEnvelope(e.to_string()))?;

    self
      .context
      .publish(subject, payload.into())
      .await
      .map_err(|e| BrokerError::Connection(e.to_string()))?
      .await
      .map_err(|e| BrokerError::Connection(e.to_string()))?;

    Ok(())
  }

  /// Pull the next message, hi-priority subject first. Returns `None`
  /// when neither subject currently has a ready message (caller should
  /// poll again after a short sleep, matching a blocking consumer's
  /// prefetch=1 wait).
  pub async fn receive(&self) -> Result<Option<ReceivedTask>, BrokerError> {
    if let Some(task) = Self::try_pull(&self.hi_consumer).await? {
      return Ok(Some(task));
    }
    Self::try_pull(&self.lo_consumer).await
  }

  /// A message that fails to deserialize is term'd right here rather than
  /// surfaced as a bare `Err`: with `max_ack_pending: 1`, returning an error
  /// with no `Message` handle for the caller to reject would leave the
  /// message redelivered forever and wedge this subject's consumer
  /// (`spec.md` §4.3, "REJECT without requeue"; "infinite redelivery is
  /// explicitly avoided"). `Ok(None)` tells the caller to just poll again.
  async fn try_pull(consumer: &jetstream::consumer::Consumer<PullConfig>) -> Result<Option<ReceivedTask>, BrokerError> {
    let mut batch = consumer
      .fetch()
      .max_messages(1)
      .expires(Duration::from_millis(500))
      .messages()
      .await
      .map_err(|e| BrokerError::Connection(e.to_string()))?;

    let Some(message) = batch.next().await else {
      return Ok(None);
    };
    let message = message.map_err(|e| BrokerError::Connection(e.to_string()))?;

    match serde_json::from_slice::<TaskEnvelope>(&message.payload) {
      Ok(envelope) => Ok(Some(ReceivedTask { message, envelope })),
      Err(e) => {
        warn!(error = %e, "malformed task envelope, terminating without requeue");
        message
          .ack_with(jetstream::AckKind::Term)
          .await
          .map_err(|e| BrokerError::Connection(e.to_string()))?;
        Ok(None)
      }
    }
  }
}

/// A message pulled off the queue, not yet ack'd/rejected.
pub struct ReceivedTask {
  message: jetstream::Message,
  pub envelope: TaskEnvelope,
}

impl ReceivedTask {
  /// Handler succeeded: ACK.
  pub async fn ack(&self) -> Result<(), BrokerError> {
    self.message.ack().await.map_err(|e| BrokerError::Connection(e.to_string()))
  }

  /// Parse error, unknown task name, or business-logic failure: REJECT
  /// without requeue (`AckKind::Term` — terminal, no redelivery).
  pub async fn reject(&self) -> Result<(), BrokerError> {
    self
      .message
      .ack_with(jetstream::AckKind::Term)
      .await
      .map_err(|e| BrokerError::Connection(e.to_string()))
  }
}
