use anyhow::Result;
use uuid::Uuid;

// ============================================================================
// Aggregate - command in, events out, state folded from events
// ============================================================================
//
// A transition is computed, never performed in place:
//   handle_command  -> validate against current state, emit events
//   apply_event     -> fold one event into a copy
//   execute         -> both, returning the new value
//
// ============================================================================

pub trait Aggregate: Sized + Clone + Send + Sync {
    type Event;
    type Command;
    type Error;

    /// Build the aggregate from the event that creates it.
    fn apply_first_event(event: &Self::Event) -> Result<Self, Self::Error>;

    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error>;

    /// Validate `command` and emit the events it produces. Pure.
    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    fn aggregate_id(&self) -> Uuid;

    /// Run a command against a copy of this aggregate.
    ///
    /// The receiver is left untouched; callers replace their reference with
    /// the returned value.
    fn execute(&self, command: &Self::Command) -> Result<(Self, Vec<Self::Event>), Self::Error> {
        let events = self.handle_command(command)?;
        let mut next = self.clone();
        for event in &events {
            next.apply_event(event)?;
        }
        Ok((next, events))
    }

    /// Replay a full history, creation event first.
    fn load_from_events(events: &[Self::Event]) -> Result<Self>
    where
        Self::Error: std::fmt::Display,
    {
        let Some((first, rest)) = events.split_first() else {
            anyhow::bail!("Empty history");
        };

        let mut aggregate =
            Self::apply_first_event(first).map_err(|e| anyhow::anyhow!("Replay failed at creation: {}", e))?;
        for (i, event) in rest.iter().enumerate() {
            aggregate
                .apply_event(event)
                .map_err(|e| anyhow::anyhow!("Replay failed at event {}: {}", i + 1, e))?;
        }

        Ok(aggregate)
    }
}
