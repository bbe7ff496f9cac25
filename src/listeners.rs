//! Transition observers for Solmate
//!
//! Diagnostic logging and external-event publication are decoupled from
//! the state machine through a small observer interface. Listeners are
//! invoked synchronously after each transition and never influence what
//! the machine does; a missing subscriber changes nothing.

use crate::logging::get_logger;
use crate::machine::{ChargeState, MachineEvent};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

/// Observer hooks notified after each fired transition, in registration
/// order. Both hooks default to no-ops so a listener implements only what
/// it cares about.
pub trait TransitionListener: Send {
    /// Called once per transition with source and target states
    fn after_transition(&self, _event: &MachineEvent, _from: ChargeState, _to: ChargeState) {}

    /// Called once per state entry
    fn on_enter_state(&self, _state: ChargeState, _event: &MachineEvent) {}
}

/// Logs every transition and state entry for diagnosis
pub struct LogListener {
    logger: crate::logging::StructuredLogger,
}

impl LogListener {
    /// Create a new logging listener
    pub fn new() -> Self {
        Self {
            logger: get_logger("machine"),
        }
    }
}

impl Default for LogListener {
    fn default() -> Self {
        Self::new()
    }
}

impl TransitionListener for LogListener {
    fn after_transition(&self, event: &MachineEvent, from: ChargeState, to: ChargeState) {
        self.logger
            .info(&format!("{} --{}--> {}", from, event.name(), to));
    }

    fn on_enter_state(&self, state: ChargeState, event: &MachineEvent) {
        self.logger
            .debug(&format!("entered {} via {}", state, event.name()));
    }
}

/// State-change notification published toward the host event bus, for
/// UI/history consumers.
#[derive(Debug, Clone, Serialize)]
pub struct StateChangeEvent {
    /// Name of the event that fired the transition
    pub event: String,

    /// Source state
    pub source: String,

    /// Target state
    pub target: String,

    /// When the transition fired
    pub at: DateTime<Utc>,
}

/// Publishes a `StateChangeEvent` on every transition.
///
/// Backed by a tokio broadcast channel; publishing with no receivers is
/// fine and costs nothing.
pub struct EventBusListener {
    tx: broadcast::Sender<StateChangeEvent>,
}

impl EventBusListener {
    /// Create a listener together with an initial subscription
    pub fn new() -> (Self, broadcast::Receiver<StateChangeEvent>) {
        let (tx, rx) = broadcast::channel(64);
        (Self { tx }, rx)
    }

    /// Create a listener publishing into an existing channel
    pub fn from_sender(tx: broadcast::Sender<StateChangeEvent>) -> Self {
        Self { tx }
    }

    /// Subscribe another receiver
    pub fn subscribe(&self) -> broadcast::Receiver<StateChangeEvent> {
        self.tx.subscribe()
    }
}

impl TransitionListener for EventBusListener {
    fn after_transition(&self, event: &MachineEvent, from: ChargeState, to: ChargeState) {
        let _ = self.tx.send(StateChangeEvent {
            event: event.name().to_string(),
            source: from.as_str().to_string(),
            target: to.as_str().to_string(),
            at: Utc::now(),
        });
    }
}
