//! Terminal-event publication (§4.7, §8.8). One message per terminal Run,
//! keyed by `exchange_id` for partition affinity; delivery failures are
//! logged and non-fatal — the run's own outcome was already durable in the
//! store by the time `publish_terminal` runs.

use async_trait::async_trait;
use flow_domain::WorkflowFinishedEvent;

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish_terminal(&self, event: &WorkflowFinishedEvent);
}

/// Kafka-compatible backend. Keys each record by `exchange_id` so every
/// event for a given run lands on the same partition; failures are logged,
/// never returned, matching §4.7 "delivery errors are logged and
/// non-fatal".
pub struct KafkaEventPublisher {
    producer: rdkafka::producer::FutureProducer,
    topic: String,
}

impl KafkaEventPublisher {
    pub fn new(bootstrap_servers: &str, topic: impl Into<String>) -> Result<Self, rdkafka::error::KafkaError> {
        use rdkafka::config::ClientConfig;

        let producer = ClientConfig::new().set("bootstrap.servers", bootstrap_servers)
                                           .set("message.timeout.ms", "5000")
                                           .create()?;
        Ok(Self { producer, topic: topic.into() })
    }
}

#[async_trait]
impl EventPublisher for KafkaEventPublisher {
    async fn publish_terminal(&self, event: &WorkflowFinishedEvent) {
        use rdkafka::producer::FutureRecord;
        use std::time::Duration;

        let payload = match serde_json::to_string(event) {
            Ok(p) => p,
            Err(err) => {
                tracing::error!(exchange_id = %event.exchange_id, %err, "failed to serialize terminal event");
                return;
            }
        };
        let key = event.exchange_id.to_string();
        let record = FutureRecord::to(&self.topic).key(&key).payload(&payload);
        match self.producer.send(record, Duration::from_secs(5)).await {
            Ok((partition, offset)) => {
                tracing::info!(exchange_id = %event.exchange_id, partition, offset, "published terminal event");
            }
            Err((err, _)) => {
                tracing::error!(exchange_id = %event.exchange_id, %err, "failed to publish terminal event");
            }
        }
    }
}

/// Used when no bus is configured (§4.7 "a logging/no-op backend is
/// supplied for environments with no bus configured").
#[derive(Default)]
pub struct NoopEventPublisher;

#[async_trait]
impl EventPublisher for NoopEventPublisher {
    async fn publish_terminal(&self, event: &WorkflowFinishedEvent) {
        tracing::info!(
            exchange_id = %event.exchange_id,
            workflow_type = %event.workflow_type,
            success = event.success,
            "terminal event (no bus configured)"
        );
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn sample_event() -> WorkflowFinishedEvent {
        WorkflowFinishedEvent { exchange_id: Uuid::new_v4(),
                                 workflow_type: "W-A".to_string(),
                                 timestamp: Utc::now(),
                                 success: true,
                                 response: None,
                                 error_details: None,
                                 pdf_content: None }
    }

    #[tokio::test]
    async fn noop_publisher_never_panics_on_any_event() {
        let publisher = NoopEventPublisher;
        publisher.publish_terminal(&sample_event()).await;
    }
}
