//! Bus naming and subscription settings.

use std::time::Duration;

/// Where events are published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusSettings {
    /// NATS server URL.
    pub url: String,
    /// JetStream stream name.
    pub stream: String,
    /// Topic prefix of every routing subject.
    pub topic: String,
}

impl BusSettings {
    /// The routing subject for an event subject, e.g. `games.created`.
    #[must_use]
    pub fn routing_subject(&self, subject: &str) -> String {
        format!("{}.{}", self.topic, subject.to_lowercase())
    }

    /// The wildcard the stream is bound to, e.g. `games.>`.
    #[must_use]
    pub fn stream_subjects(&self) -> String {
        format!("{}.>", self.topic)
    }
}

/// A durable, explicitly acknowledged subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionSettings {
    /// Durable consumer name.
    pub name: String,
    /// Maximum unacknowledged messages handed to this subscriber.
    pub prefetch: u32,
    /// How long the broker waits for an acknowledgement before redelivering.
    pub ack_wait: Duration,
    /// Delivery attempts per message before the broker gives up.
    pub max_deliver: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bus() -> BusSettings {
        BusSettings {
            url: "nats://localhost:4222".to_owned(),
            stream: "GAMES".to_owned(),
            topic: "games".to_owned(),
        }
    }

    #[test]
    fn test_routing_subject_lowercases_event_subject() {
        assert_eq!(bus().routing_subject("Created"), "games.created");
        assert_eq!(bus().routing_subject("Deleted"), "games.deleted");
    }

    #[test]
    fn test_stream_subjects_cover_every_routing_subject() {
        assert_eq!(bus().stream_subjects(), "games.>");
    }
}
