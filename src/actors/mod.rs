// ============================================================================
// Actors Module
// ============================================================================
//
// Actors own the clock; everything else is synchronous.
//
// - agent_session - settle-delay commit and delivery acknowledgment for a
//                   fulfillment agent's view
// - sweeper       - periodic notification expiry across views
//
// Note: order logic lives in the command handler and the views, NOT in
//       actors.
//
// ============================================================================

mod agent_session;
mod sweeper;

pub use agent_session::{
    AgentSessionActor, AgentState, BackToList, DragGesture, GetAgentState, ReleaseGesture, SelectOrder,
    UpdatePickupForm,
};
pub use sweeper::{ExpiringNotifications, NotificationSweeper, SweepNow, Watch};
