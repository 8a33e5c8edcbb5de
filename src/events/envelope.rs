use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Principal;

// ============================================================================
// Event Envelope
// ============================================================================
//
// Wraps an event with the metadata subscribers need to order and attribute
// it. Generic over the payload type.
//
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EventEnvelope<E> {
    pub event_id: Uuid,
    pub aggregate_id: Uuid,
    /// Monotonic position of this event in its stream.
    pub sequence_number: i64,

    pub event_type: String,
    pub event_data: E,

    /// Who triggered this event, when known.
    pub origin: Option<Principal>,

    pub timestamp: DateTime<Utc>,
}

impl<E: DomainEvent> EventEnvelope<E> {
    pub fn new(aggregate_id: Uuid, sequence_number: i64, event_data: E, timestamp: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            aggregate_id,
            sequence_number,
            event_type: event_data.event_type().to_string(),
            event_data,
            origin: None,
            timestamp,
        }
    }
}

impl<E> EventEnvelope<E> {
    pub fn with_origin(mut self, origin: Option<Principal>) -> Self {
        self.origin = origin;
        self
    }

    /// True when `principal` caused this event.
    pub fn originated_by(&self, principal: &Principal) -> bool {
        self.origin.as_ref() == Some(principal)
    }
}

// ============================================================================
// Domain Event Trait
// ============================================================================

pub trait DomainEvent: Clone + Send + Sync {
    fn event_type(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;

    #[derive(Serialize, Deserialize, Clone, Debug)]
    struct TestEvent {
        data: String,
    }

    impl DomainEvent for TestEvent {
        fn event_type(&self) -> &'static str {
            "TestEvent"
        }
    }

    #[test]
    fn test_event_envelope_creation() {
        let aggregate_id = Uuid::new_v4();
        let now = Utc::now();

        let envelope = EventEnvelope::new(aggregate_id, 1, TestEvent { data: "test".to_string() }, now);

        assert_eq!(envelope.aggregate_id, aggregate_id);
        assert_eq!(envelope.sequence_number, 1);
        assert_eq!(envelope.event_type, "TestEvent");
        assert_eq!(envelope.timestamp, now);
        assert!(envelope.origin.is_none());
    }

    #[test]
    fn test_envelope_origin_matching() {
        let agent = Principal::new(Role::FulfillmentAgent, "p1");
        let other = Principal::new(Role::FulfillmentAgent, "p2");

        let envelope = EventEnvelope::new(Uuid::new_v4(), 1, TestEvent { data: "x".into() }, Utc::now())
            .with_origin(Some(agent.clone()));

        assert!(envelope.originated_by(&agent));
        assert!(!envelope.originated_by(&other));

        let anonymous = EventEnvelope::new(Uuid::new_v4(), 2, TestEvent { data: "y".into() }, Utc::now());
        assert!(!anonymous.originated_by(&agent));
    }
}
