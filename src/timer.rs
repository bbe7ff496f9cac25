//! Single-shot debounce timers
//!
//! A `DebounceTimer` arms a delayed callback that, on expiry, sends a fixed
//! event into the owning state machine's event channel. There is no
//! repeating mode. Arming an already-armed timer is a contract violation
//! and reported as a hard error; cancellation is idempotent and effective
//! before the next tick even on a multi-threaded runtime.

use crate::error::{Result, SolmateError};
use crate::logging::get_logger;
use crate::machine::MachineEvent;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::{Duration, sleep};

/// Arm state shared with in-flight expiry tasks.
///
/// The generation counter makes cancellation race-free: an expiry task only
/// fires when the slot is still armed with the generation it was spawned
/// under, checked under the mutex. A cancel (or a cancel + re-arm) bumps
/// the generation, so a stale task can never deliver its event.
#[derive(Debug)]
struct TimerSlot {
    armed: bool,
    generation: u64,
}

/// Single-shot, cancelable delayed event source
pub struct DebounceTimer {
    name: &'static str,
    delay: Duration,
    event: MachineEvent,
    events_tx: mpsc::UnboundedSender<MachineEvent>,
    slot: Arc<Mutex<TimerSlot>>,
    logger: crate::logging::StructuredLogger,
}

impl DebounceTimer {
    /// Create a disarmed timer that will send `event` on expiry
    pub fn new(
        name: &'static str,
        delay: Duration,
        event: MachineEvent,
        events_tx: mpsc::UnboundedSender<MachineEvent>,
    ) -> Self {
        Self {
            name,
            delay,
            event,
            events_tx,
            slot: Arc::new(Mutex::new(TimerSlot {
                armed: false,
                generation: 0,
            })),
            logger: get_logger("timer"),
        }
    }

    /// Arm the timer.
    ///
    /// Fails if the timer is already armed: callers must pair `start` with
    /// `cancel` in their exit actions, so a double-arm indicates a bug.
    pub fn start(&self) -> Result<()> {
        let generation = {
            let mut slot = self
                .slot
                .lock()
                .map_err(|_| SolmateError::timer(self.name, "slot mutex poisoned"))?;
            if slot.armed {
                return Err(SolmateError::timer(self.name, "start() while already armed"));
            }
            slot.armed = true;
            slot.generation += 1;
            slot.generation
        };

        self.logger
            .debug(&format!("{} armed for {:?}", self.name, self.delay));

        let slot = Arc::clone(&self.slot);
        let tx = self.events_tx.clone();
        let event = self.event.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            sleep(delay).await;
            let fire = match slot.lock() {
                Ok(mut slot) => {
                    if slot.armed && slot.generation == generation {
                        slot.armed = false;
                        true
                    } else {
                        false
                    }
                }
                Err(_) => false,
            };
            if fire {
                let _ = tx.send(event);
            }
        });

        Ok(())
    }

    /// Disarm the timer. Safe to call whether armed or not; once this
    /// returns, the pending callback will never fire.
    pub fn cancel(&self) {
        if let Ok(mut slot) = self.slot.lock() {
            if slot.armed {
                self.logger.debug(&format!("{} canceled", self.name));
            }
            slot.armed = false;
            slot.generation += 1;
        }
    }

    /// Whether the timer is currently armed
    pub fn is_armed(&self) -> bool {
        self.slot.lock().map(|slot| slot.armed).unwrap_or(false)
    }
}
