//! Publishes domain events to NATS after their changes are committed.

use crate::domain::events::DomainEvent;

#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    /// Connects when `url` is set. A failed connection leaves publishing disabled.
    pub async fn connect(url: Option<&str>) -> Self {
        let Some(url) = url else {
            tracing::info!("NATS_URL not set, domain events will only be logged");
            return Self::default();
        };
        match async_nats::connect(url).await {
            Ok(client) => {
                tracing::info!(url, "Connected to NATS");
                Self::new(Some(client))
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "NATS unavailable, domain events will only be logged");
                Self::default()
            }
        }
    }

    pub fn is_connected(&self) -> bool { self.nats.is_some() }

    /// Best effort: a failed publish is logged and never fails the request.
    pub async fn publish_all(&self, events: Vec<DomainEvent>) {
        for event in events {
            let subject = event.subject();
            let Some(client) = &self.nats else {
                tracing::debug!(%subject, ?event, "Domain event");
                continue;
            };
            let payload = match serde_json::to_vec(&event) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(%subject, error = %e, "Failed to encode domain event");
                    continue;
                }
            };
            if let Err(e) = client.publish(subject.clone(), payload.into()).await {
                tracing::warn!(%subject, error = %e, "Failed to publish domain event");
            }
        }
    }
}
