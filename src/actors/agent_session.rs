use actix::prelude::*;
use chrono::Utc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::domain::order::{Order, OrderError, PickupDetails};
use crate::gesture::{GestureOutcome, GesturePhase};
use crate::notifications::Notification;
use crate::views::{AgentScreen, FulfillmentSession, RoleView};

// ============================================================================
// Agent Session Actor - hosts the fulfillment view's timed behaviour
// ============================================================================
//
// Responsibilities:
// - Route agent input (select, form edits, drag/release) to the view
// - Fire the armed commit once the settle delay has elapsed (run_later)
// - Return to the list after the delivery acknowledgment (run_later)
//
// Store broadcasts reach the view directly through its subscription; this
// actor only owns the clock.
//
// ============================================================================

// ============================================================================
// Messages
// ============================================================================

#[derive(Message)]
#[rtype(result = "Result<(), OrderError>")]
pub struct SelectOrder {
    pub order_id: Uuid,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct UpdatePickupForm(pub PickupDetails);

#[derive(Message)]
#[rtype(result = "GesturePhase")]
pub struct DragGesture {
    pub offset: f64,
}

#[derive(Message)]
#[rtype(result = "GestureOutcome")]
pub struct ReleaseGesture;

#[derive(Message)]
#[rtype(result = "()")]
pub struct BackToList;

#[derive(Message)]
#[rtype(result = "AgentState")]
pub struct GetAgentState;

/// What the agent's screen currently shows.
#[derive(Debug, Clone)]
pub struct AgentState {
    pub screen: AgentScreen,
    pub focus: Option<Order>,
    pub active_tasks: Vec<Order>,
    pub past_tasks: Vec<Order>,
    pub pickup_form: PickupDetails,
    pub gesture_phase: GesturePhase,
    pub gesture_enabled: bool,
    pub gesture_label: Option<String>,
    pub notifications: Vec<Notification>,
}

// ============================================================================
// Agent Session Actor
// ============================================================================

pub struct AgentSessionActor {
    session: FulfillmentSession,
    completion_delay: Duration,
}

impl AgentSessionActor {
    pub fn new(session: FulfillmentSession, completion_delay: Duration) -> Self {
        Self {
            session,
            completion_delay,
        }
    }

    fn fire_commit(&mut self, ctx: &mut Context<Self>) {
        let Some(screen) = self.session.commit_due(Instant::now()) else {
            tracing::debug!("Commit timer fired with nothing due");
            return;
        };

        if screen == AgentScreen::Completed {
            ctx.run_later(self.completion_delay, |act, _ctx| {
                act.session.view().acknowledge_completion();
                tracing::debug!("Delivery acknowledged, back to task list");
            });
        }
    }
}

impl Actor for AgentSessionActor {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(agent = %self.session.principal(), "AgentSessionActor started");
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(agent = %self.session.principal(), "AgentSessionActor stopped");
    }
}

impl Handler<SelectOrder> for AgentSessionActor {
    type Result = Result<(), OrderError>;

    fn handle(&mut self, msg: SelectOrder, _: &mut Self::Context) -> Self::Result {
        self.session.view().select(msg.order_id, Utc::now())
    }
}

impl Handler<UpdatePickupForm> for AgentSessionActor {
    type Result = ();

    fn handle(&mut self, msg: UpdatePickupForm, _: &mut Self::Context) {
        self.session.view().update_pickup_form(msg.0);
    }
}

impl Handler<DragGesture> for AgentSessionActor {
    type Result = MessageResult<DragGesture>;

    fn handle(&mut self, msg: DragGesture, _: &mut Self::Context) -> Self::Result {
        MessageResult(self.session.view().drag(msg.offset))
    }
}

impl Handler<ReleaseGesture> for AgentSessionActor {
    type Result = MessageResult<ReleaseGesture>;

    fn handle(&mut self, _msg: ReleaseGesture, ctx: &mut Self::Context) -> Self::Result {
        let now = Instant::now();
        let outcome = self.session.view().release(now);

        if let GestureOutcome::Armed { due_at } = outcome {
            tracing::debug!(delay_ms = due_at.saturating_duration_since(now).as_millis() as u64, "Commit scheduled");
            ctx.run_later(due_at.saturating_duration_since(now), |act, ctx| act.fire_commit(ctx));
        }

        MessageResult(outcome)
    }
}

impl Handler<BackToList> for AgentSessionActor {
    type Result = ();

    fn handle(&mut self, _msg: BackToList, _: &mut Self::Context) {
        self.session.view().back_to_list();
    }
}

impl Handler<GetAgentState> for AgentSessionActor {
    type Result = MessageResult<GetAgentState>;

    fn handle(&mut self, _msg: GetAgentState, _: &mut Self::Context) -> Self::Result {
        let now = Utc::now();
        let view = self.session.view();
        let gesture = view.gesture();

        MessageResult(AgentState {
            screen: view.screen(),
            focus: view.focus().cloned(),
            active_tasks: view.active_tasks(),
            past_tasks: view.past_tasks(),
            pickup_form: view.pickup_form().clone(),
            gesture_phase: gesture.phase(),
            gesture_enabled: gesture.is_enabled(),
            gesture_label: gesture.label(),
            notifications: view.notifications().active(now).into_iter().cloned().collect(),
        })
    }
}
