// ============================================================================
// Event Infrastructure
// ============================================================================
//
// Generic building blocks shared by the domain and the store:
// - Aggregate: command -> events -> state, for any aggregate
// - DomainEvent / EventEnvelope: metadata wrapper used for store broadcasts
//
// No domain-specific code lives here.
//
// ============================================================================

pub mod aggregate;
pub mod envelope;

pub use aggregate::Aggregate;
pub use envelope::{DomainEvent, EventEnvelope};
