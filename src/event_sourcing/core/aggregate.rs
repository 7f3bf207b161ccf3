use uuid::Uuid;
use super::event::EventEnvelope;

// ============================================================================
// Aggregate Root Pattern - Event Sourcing Core
// ============================================================================
//
// Key Principles:
// 1. Commands are validated before emitting events
// 2. Events represent facts that have already happened
// 3. Aggregates enforce business invariants
// 4. All state changes flow through events
//
// ============================================================================

/// Generic Aggregate trait - all event-sourced aggregates implement this
///
/// Type Parameters:
/// - `Event`: The domain event type for this aggregate
/// - `Command`: The command type for this aggregate
/// - `Error`: The error type for business rule violations
pub trait Aggregate: Sized + Send + Sync {
    type Event;
    type Command;
    type Error;

    /// Create new aggregate from first event
    fn apply_first_event(event: &Self::Event) -> Result<Self, Self::Error>;

    /// Apply subsequent events to update state
    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error>;

    /// Handle command and emit events (business logic)
    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// Get aggregate ID
    fn aggregate_id(&self) -> Uuid;

    /// Get current version (sequence number of the last applied event)
    fn version(&self) -> i64;

    /// Record the sequence number of the last applied event
    fn set_version(&mut self, version: i64);

    /// Rebuild an aggregate from its event history
    fn load_from_events(events: &[EventEnvelope<Self::Event>]) -> Result<Option<Self>, Self::Error> {
        let Some((first, rest)) = events.split_first() else {
            return Ok(None);
        };

        let mut aggregate = Self::apply_first_event(&first.event_data)?;
        aggregate.set_version(first.sequence_number);

        for envelope in rest {
            aggregate.apply_event(&envelope.event_data)?;
            aggregate.set_version(envelope.sequence_number);
        }

        Ok(Some(aggregate))
    }
}
