use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::domain::order::OrderStatus;

// ============================================================================
// Commit Gesture Controller
// ============================================================================
//
//   Idle --drag--> Confirming --release >= threshold--> Committing --due--> Settled
//     ^                |                                      |
//     +--release < ----+                                      +-- poll() hands out
//        threshold                                                the commit once
//
// The controller knows nothing about pointers or animation: `drag` feeds it
// an offset, `release` ends the gesture, and `poll` fires the commit once
// the settle delay has elapsed. Binding to a different order or target
// returns it to Idle.
//
// ============================================================================

#[derive(Debug, Clone)]
pub struct GestureConfig {
    /// Offset the drag must reach before release commits.
    pub threshold: f64,
    /// Pause between reaching the threshold and applying the transition.
    pub settle_delay: Duration,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            threshold: 220.0,
            settle_delay: Duration::from_millis(1200),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GesturePhase {
    Idle,
    Confirming { offset: f64 },
    Committing { due_at: Instant },
    Settled,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureOutcome {
    /// Controller disabled, unbound, or not in a draggable phase.
    Ignored,
    /// Released short of the threshold; back to Idle.
    SnappedBack,
    /// Threshold reached; the commit fires at `due_at`.
    Armed { due_at: Instant },
}

/// The transition a completed gesture asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitRequest {
    pub order_id: Uuid,
    pub target: OrderStatus,
}

#[derive(Debug, Clone)]
pub struct CommitGestureController {
    config: GestureConfig,
    binding: Option<CommitRequest>,
    enabled: bool,
    phase: GesturePhase,
}

impl Default for CommitGestureController {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}

impl CommitGestureController {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            binding: None,
            enabled: false,
            phase: GesturePhase::Idle,
        }
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    pub fn phase(&self) -> GesturePhase {
        self.phase
    }

    pub fn binding(&self) -> Option<CommitRequest> {
        self.binding
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled && self.binding.is_some()
    }

    /// Label shown on the control, e.g. "Swipe to Picked Up".
    pub fn label(&self) -> Option<String> {
        self.binding.map(|b| format!("Swipe to {}", b.target.label()))
    }

    /// Attach to an order and the transition it would commit.
    ///
    /// Resets to Idle when either differs from the current binding.
    pub fn bind(&mut self, order_id: Uuid, target: OrderStatus) {
        let binding = CommitRequest { order_id, target };
        if self.binding != Some(binding) {
            tracing::debug!(order_id = %order_id, target = %target, "Gesture rebound");
            self.binding = Some(binding);
            self.phase = GesturePhase::Idle;
        }
    }

    pub fn unbind(&mut self) {
        self.binding = None;
        self.phase = GesturePhase::Idle;
    }

    /// Gate phase 1 on the target's preconditions.
    ///
    /// Disabling mid-drag snaps back; an already armed commit is kept.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled && matches!(self.phase, GesturePhase::Confirming { .. }) {
            self.phase = GesturePhase::Idle;
        }
    }

    /// Feed the current drag offset. Clamped to `[0, threshold]`.
    pub fn drag(&mut self, offset: f64) -> GesturePhase {
        if !self.is_enabled() || !matches!(self.phase, GesturePhase::Idle | GesturePhase::Confirming { .. }) {
            return self.phase;
        }

        let offset = if offset.is_finite() {
            offset.clamp(0.0, self.config.threshold)
        } else {
            0.0
        };
        self.phase = if offset > 0.0 {
            GesturePhase::Confirming { offset }
        } else {
            GesturePhase::Idle
        };
        self.phase
    }

    pub fn release(&mut self, now: Instant) -> GestureOutcome {
        let GesturePhase::Confirming { offset } = self.phase else {
            return GestureOutcome::Ignored;
        };
        if !self.is_enabled() {
            self.phase = GesturePhase::Idle;
            return GestureOutcome::Ignored;
        }

        if offset >= self.config.threshold {
            let due_at = now + self.config.settle_delay;
            self.phase = GesturePhase::Committing { due_at };
            tracing::debug!(binding = ?self.binding, "Gesture threshold reached, commit armed");
            GestureOutcome::Armed { due_at }
        } else {
            self.phase = GesturePhase::Idle;
            GestureOutcome::SnappedBack
        }
    }

    /// Hand out the commit once its settle delay has elapsed.
    ///
    /// Returns `Some` exactly once per armed gesture.
    pub fn poll(&mut self, now: Instant) -> Option<CommitRequest> {
        match self.phase {
            GesturePhase::Committing { due_at } if now >= due_at => {
                self.phase = GesturePhase::Settled;
                self.binding
            }
            _ => None,
        }
    }

    /// Fraction of the threshold covered, for rendering.
    pub fn progress(&self) -> f64 {
        match self.phase {
            GesturePhase::Idle => 0.0,
            GesturePhase::Confirming { offset } => offset / self.config.threshold,
            GesturePhase::Committing { .. } | GesturePhase::Settled => 1.0,
        }
    }

    pub fn reset(&mut self) {
        self.phase = GesturePhase::Idle;
    }
}
