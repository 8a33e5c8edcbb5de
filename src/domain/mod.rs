// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// The order aggregate lives in its own subdirectory with:
// - Value objects
// - Events
// - Commands
// - Errors
// - Aggregate implementation (lifecycle state machine)
// - Tracking code generator
// - Command handler
//
// This layer knows nothing about views, actors or persistence.
//
// ============================================================================

pub mod order;
pub mod principal;

pub use principal::{Principal, Role};
