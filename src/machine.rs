//! Charge-control state machine for Solmate
//!
//! This module contains the finite-state core that arbitrates between
//! rapidly-fluctuating power measurements and the charger's slow physical
//! response. States, guarded transitions and per-state entry/exit effects
//! live here; all policy is in the transition table and the evaluator, the
//! machine itself never polls a sensor.

use crate::config::ControlConfig;
use crate::error::Result;
use crate::listeners::TransitionListener;
use crate::logging::get_logger;
use crate::timer::DebounceTimer;
use std::collections::VecDeque;
use std::fmt;
use tokio::sync::mpsc;
use tokio::time::Duration;

/// Charge-control states. Exactly one is active at any instant.
///
/// `Initial` is the sole entry state; `Shutdown` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeState {
    Initial,
    Reset,
    NotCharging,
    ChargeStartPending,
    ChargingWarmup,
    Charging,
    StopChargePending,
    ChargingCooldown,
    Paused,
    Shutdown,
}

impl ChargeState {
    /// Stable snake_case name, used in logs and published events
    pub fn as_str(&self) -> &'static str {
        match self {
            ChargeState::Initial => "initial",
            ChargeState::Reset => "reset",
            ChargeState::NotCharging => "not_charging",
            ChargeState::ChargeStartPending => "charge_start_pending",
            ChargeState::ChargingWarmup => "charging_warmup",
            ChargeState::Charging => "charging",
            ChargeState::StopChargePending => "stop_charge_pending",
            ChargeState::ChargingCooldown => "charging_cooldown",
            ChargeState::Paused => "paused",
            ChargeState::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for ChargeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events accepted by the machine. Events with no matching transition from
/// the current state are silently ignored, never an error.
#[derive(Debug, Clone, PartialEq)]
pub enum MachineEvent {
    HaStartup,
    ResetComplete,
    StartChargeOnSurplus { surplus_w: f64, target_amps: i32 },
    StopChargeOnSurplus { surplus_w: f64, target_amps: i32 },
    ChargeStartTimerFired,
    CurrentChargingAmpsChanged { amps: i32 },
    ChargingWarmupTimeoutTimerFired,
    ManualStop,
    ChargeStopTimerFired,
    AlreadyStopped,
    ChargeSessionPauseTimerFired,
    ShutdownTriggered,
}

impl MachineEvent {
    /// Stable snake_case name, used in logs and published events
    pub fn name(&self) -> &'static str {
        match self {
            MachineEvent::HaStartup => "ha_startup",
            MachineEvent::ResetComplete => "reset_complete",
            MachineEvent::StartChargeOnSurplus { .. } => "start_charge_on_surplus",
            MachineEvent::StopChargeOnSurplus { .. } => "stop_charge_on_surplus",
            MachineEvent::ChargeStartTimerFired => "charge_start_timer_fired",
            MachineEvent::CurrentChargingAmpsChanged { .. } => "current_charging_amps_changed",
            MachineEvent::ChargingWarmupTimeoutTimerFired => {
                "charging_warmup_timeout_timer_fired"
            }
            MachineEvent::ManualStop => "manual_stop",
            MachineEvent::ChargeStopTimerFired => "charge_stop_timer_fired",
            MachineEvent::AlreadyStopped => "already_stopped",
            MachineEvent::ChargeSessionPauseTimerFired => "charge_session_pause_timer_fired",
            MachineEvent::ShutdownTriggered => "shutdown_triggered",
        }
    }

    /// Target amperage carried by surplus events
    fn target_amps(&self) -> Option<i32> {
        match self {
            MachineEvent::StartChargeOnSurplus { target_amps, .. }
            | MachineEvent::StopChargeOnSurplus { target_amps, .. } => Some(*target_amps),
            _ => None,
        }
    }

    /// Reported current draw carried by amps-changed events
    fn reported_amps(&self) -> Option<i32> {
        match self {
            MachineEvent::CurrentChargingAmpsChanged { amps } => Some(*amps),
            _ => None,
        }
    }
}

/// Commands issued toward the external charger points.
///
/// Fire-and-forget: the machine pushes each command exactly once per
/// transition and never retries; delivery is the collaborator's concern.
#[derive(Debug, Clone, PartialEq)]
pub enum ChargerCommand {
    /// Turn the charger switch on or off
    SetSwitch(bool),

    /// Set the requested-amperage setpoint
    SetRequestedAmps(i32),
}

/// Mutable fields owned exclusively by the state machine
#[derive(Debug, Clone)]
pub struct MachineContext {
    /// Whether a car is plugged in (supplied at startup, see controller)
    pub car_present: bool,

    /// Most recent current draw reported by the charger
    pub current_charging_amps: i32,

    /// Last amperage commanded toward the charger, to avoid redundant writes
    pub last_target_amps: i32,
}

/// The finite-state core.
///
/// `send` processes one event to completion, including any self-generated
/// follow-up events, before returning. Entry actions never recurse into
/// `send`; self-clearing states enqueue their follow-up on an internal
/// trampoline that drains after the current transition's listener
/// notifications, bounding depth by the number of states.
pub struct ChargeStateMachine {
    state: ChargeState,
    ctx: MachineContext,
    min_viable_amps: i32,
    commands_tx: mpsc::UnboundedSender<ChargerCommand>,
    charge_start_pending_timer: DebounceTimer,
    charge_stop_pending_timer: DebounceTimer,
    charge_session_pause_timer: DebounceTimer,
    listeners: Vec<Box<dyn TransitionListener>>,
    queue: VecDeque<MachineEvent>,
    dispatching: bool,
    logger: crate::logging::StructuredLogger,
}

impl ChargeStateMachine {
    /// Create a machine in the `Initial` state.
    ///
    /// Timer expiries are delivered through `events_tx`; the owner is
    /// expected to feed them back into `send`.
    pub fn new(
        control: &ControlConfig,
        car_present: bool,
        commands_tx: mpsc::UnboundedSender<ChargerCommand>,
        events_tx: &mpsc::UnboundedSender<MachineEvent>,
    ) -> Self {
        let charge_start_pending_timer = DebounceTimer::new(
            "charge_start_pending_timer",
            Duration::from_millis(control.charge_start_delay_ms),
            MachineEvent::ChargeStartTimerFired,
            events_tx.clone(),
        );
        let charge_stop_pending_timer = DebounceTimer::new(
            "charge_stop_pending_timer",
            Duration::from_millis(control.charge_stop_delay_ms),
            MachineEvent::ChargeStopTimerFired,
            events_tx.clone(),
        );
        let charge_session_pause_timer = DebounceTimer::new(
            "charge_session_pause_timer",
            Duration::from_millis(control.session_pause_ms),
            MachineEvent::ChargeSessionPauseTimerFired,
            events_tx.clone(),
        );

        Self {
            state: ChargeState::Initial,
            ctx: MachineContext {
                car_present,
                current_charging_amps: 0,
                last_target_amps: 0,
            },
            min_viable_amps: control.min_viable_amps,
            commands_tx,
            charge_start_pending_timer,
            charge_stop_pending_timer,
            charge_session_pause_timer,
            listeners: Vec::new(),
            queue: VecDeque::new(),
            dispatching: false,
            logger: get_logger("machine"),
        }
    }

    /// Register an observer, notified synchronously after every transition
    /// in registration order. Observers never influence machine behavior.
    pub fn add_listener(&mut self, listener: Box<dyn TransitionListener>) {
        self.listeners.push(listener);
    }

    /// Currently active state
    pub fn state(&self) -> ChargeState {
        self.state
    }

    /// Machine-owned context fields
    pub fn context(&self) -> &MachineContext {
        &self.ctx
    }

    /// Inject the car-presence reading consulted by the startup guard.
    /// Whether presence should track a live binary sensor is unresolved
    /// upstream, so the machine only consumes a supplied boolean.
    pub fn set_car_present(&mut self, present: bool) {
        self.ctx.car_present = present;
    }

    /// Process an event, firing the first matching guarded transition out
    /// of the current state. A no-op when nothing matches.
    ///
    /// The only error surfaced is a timer double-arm, which indicates a bug
    /// in the entry/exit pairing rather than a transient condition.
    pub fn send(&mut self, event: MachineEvent) -> Result<()> {
        self.queue.push_back(event);
        if self.dispatching {
            return Ok(());
        }

        self.dispatching = true;
        while let Some(event) = self.queue.pop_front() {
            if let Err(e) = self.dispatch(event) {
                self.dispatching = false;
                return Err(e);
            }
        }
        self.dispatching = false;
        Ok(())
    }

    /// Cancel all timers. Called on controller stop; the machine is not
    /// reusable afterwards.
    pub fn teardown(&mut self) {
        self.charge_start_pending_timer.cancel();
        self.charge_stop_pending_timer.cancel();
        self.charge_session_pause_timer.cancel();
        self.listeners.clear();
    }

    fn dispatch(&mut self, event: MachineEvent) -> Result<()> {
        let Some(next) = self.transition_for(&event) else {
            self.logger.trace(&format!(
                "no transition for {} in state {}, ignoring",
                event.name(),
                self.state
            ));
            return Ok(());
        };

        // The guard already saw the payload; make it the context's view of
        // the most recent reading before entry actions run.
        if let Some(amps) = event.reported_amps() {
            self.ctx.current_charging_amps = amps;
        }

        let from = self.state;
        self.exit_state(from);
        self.state = next;
        self.enter_state(next, &event)?;

        for listener in &self.listeners {
            listener.after_transition(&event, from, next);
        }
        for listener in &self.listeners {
            listener.on_enter_state(next, &event);
        }

        Ok(())
    }

    /// The transition table. Guards in the match arms; for a given
    /// (state, event) pair the arms are evaluated top-down, preserving the
    /// declared tie-breaking order.
    fn transition_for(&self, event: &MachineEvent) -> Option<ChargeState> {
        use ChargeState::*;
        use MachineEvent::*;

        match (self.state, event) {
            (Initial, HaStartup) if self.ctx.car_present => Some(Reset),
            (Initial, HaStartup) => Some(NotCharging),

            (Reset, ResetComplete) => Some(NotCharging),

            (NotCharging, StartChargeOnSurplus { .. }) => Some(ChargeStartPending),
            (NotCharging, ShutdownTriggered) => Some(Shutdown),

            (ChargeStartPending, StopChargeOnSurplus { .. }) => Some(NotCharging),
            (ChargeStartPending, ChargeStartTimerFired) => Some(ChargingWarmup),

            (ChargingWarmup, CurrentChargingAmpsChanged { amps })
                if *amps >= self.min_viable_amps =>
            {
                Some(Charging)
            }
            (ChargingWarmup, ChargingWarmupTimeoutTimerFired) => Some(ChargingCooldown),

            (Charging, StartChargeOnSurplus { .. }) => Some(Charging),
            (Charging, StopChargeOnSurplus { .. }) => Some(StopChargePending),
            (Charging, CurrentChargingAmpsChanged { amps })
                if *amps < self.min_viable_amps =>
            {
                Some(ChargingCooldown)
            }
            (Charging, ManualStop) => Some(ChargingCooldown),

            (StopChargePending, StartChargeOnSurplus { .. }) => Some(Charging),
            (StopChargePending, ChargeStopTimerFired) => Some(ChargingCooldown),

            (ChargingCooldown, CurrentChargingAmpsChanged { amps }) if *amps == 0 => {
                Some(Paused)
            }
            (ChargingCooldown, AlreadyStopped) => Some(Paused),

            (Paused, ChargeSessionPauseTimerFired) => Some(NotCharging),

            _ => None,
        }
    }

    /// Exit actions. Timer cancels are unconditional so that both normal
    /// and superseding-event exits leave the timer disarmed.
    fn exit_state(&mut self, state: ChargeState) {
        match state {
            ChargeState::ChargeStartPending => self.charge_start_pending_timer.cancel(),
            ChargeState::StopChargePending => self.charge_stop_pending_timer.cancel(),
            ChargeState::Paused => self.charge_session_pause_timer.cancel(),
            _ => {}
        }
    }

    fn enter_state(&mut self, state: ChargeState, event: &MachineEvent) -> Result<()> {
        match state {
            ChargeState::Initial | ChargeState::NotCharging => Ok(()),

            ChargeState::Reset => {
                // Self-clearing: switch off, then nothing left to wait for
                self.command(ChargerCommand::SetSwitch(false));
                self.queue.push_back(MachineEvent::ResetComplete);
                Ok(())
            }

            ChargeState::ChargeStartPending => self.charge_start_pending_timer.start(),

            ChargeState::ChargingWarmup => {
                self.command(ChargerCommand::SetRequestedAmps(self.min_viable_amps));
                self.command(ChargerCommand::SetSwitch(true));
                self.ctx.last_target_amps = self.min_viable_amps;
                Ok(())
            }

            ChargeState::Charging => {
                if let Some(target) = event.target_amps() {
                    if target != self.ctx.last_target_amps {
                        self.command(ChargerCommand::SetRequestedAmps(target));
                        self.ctx.last_target_amps = target;
                    }
                }
                Ok(())
            }

            ChargeState::StopChargePending => self.charge_stop_pending_timer.start(),

            ChargeState::ChargingCooldown => {
                self.command(ChargerCommand::SetSwitch(false));
                // Fast path: the switch-off is instantaneous from the
                // charger's perspective, so a sensor update to 0 A will
                // never arrive if the draw is already zero.
                if self.ctx.current_charging_amps == 0 {
                    self.queue.push_back(MachineEvent::AlreadyStopped);
                }
                Ok(())
            }

            ChargeState::Paused => self.charge_session_pause_timer.start(),

            ChargeState::Shutdown => {
                self.command(ChargerCommand::SetSwitch(false));
                Ok(())
            }
        }
    }

    fn command(&self, command: ChargerCommand) {
        // Fire-and-forget; a closed channel means the controller is gone
        // and the command has no destination anyway.
        let _ = self.commands_tx.send(command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_control() -> ControlConfig {
        ControlConfig {
            charge_start_delay_ms: 10,
            charge_stop_delay_ms: 10,
            session_pause_ms: 10,
            ..ControlConfig::default()
        }
    }

    fn machine(
        car_present: bool,
    ) -> (
        ChargeStateMachine,
        mpsc::UnboundedReceiver<ChargerCommand>,
        mpsc::UnboundedReceiver<MachineEvent>,
    ) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let machine = ChargeStateMachine::new(&short_control(), car_present, commands_tx, &events_tx);
        (machine, commands_rx, events_rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ChargerCommand>) -> Vec<ChargerCommand> {
        let mut commands = Vec::new();
        while let Ok(command) = rx.try_recv() {
            commands.push(command);
        }
        commands
    }

    fn start_event(target_amps: i32) -> MachineEvent {
        MachineEvent::StartChargeOnSurplus {
            surplus_w: f64::from(target_amps) * 240.0 / 0.9,
            target_amps,
        }
    }

    fn stop_event() -> MachineEvent {
        MachineEvent::StopChargeOnSurplus {
            surplus_w: -300.0,
            target_amps: -3,
        }
    }

    /// Drive a fresh machine into `Charging` with the given target
    fn charging_machine(
        target_amps: i32,
    ) -> (
        ChargeStateMachine,
        mpsc::UnboundedReceiver<ChargerCommand>,
        mpsc::UnboundedReceiver<MachineEvent>,
    ) {
        let (mut machine, mut commands_rx, events_rx) = machine(false);
        machine.send(MachineEvent::HaStartup).unwrap();
        machine.send(start_event(target_amps)).unwrap();
        machine.send(MachineEvent::ChargeStartTimerFired).unwrap();
        machine
            .send(MachineEvent::CurrentChargingAmpsChanged { amps: target_amps })
            .unwrap();
        assert_eq!(machine.state(), ChargeState::Charging);
        drain(&mut commands_rx);
        (machine, commands_rx, events_rx)
    }

    #[tokio::test]
    async fn test_startup_without_car_goes_to_not_charging() {
        let (mut machine, mut commands_rx, _events_rx) = machine(false);
        machine.send(MachineEvent::HaStartup).unwrap();
        assert_eq!(machine.state(), ChargeState::NotCharging);
        assert!(drain(&mut commands_rx).is_empty());
    }

    #[tokio::test]
    async fn test_startup_with_car_runs_self_clearing_reset() {
        let (mut machine, mut commands_rx, _events_rx) = machine(true);
        machine.send(MachineEvent::HaStartup).unwrap();
        // Reset switches the charger off and immediately clears itself
        assert_eq!(machine.state(), ChargeState::NotCharging);
        assert_eq!(
            drain(&mut commands_rx),
            vec![ChargerCommand::SetSwitch(false)]
        );
    }

    #[tokio::test]
    async fn test_unmatched_events_are_noops() {
        let (mut machine, mut commands_rx, _events_rx) = machine(false);
        machine.send(MachineEvent::HaStartup).unwrap();

        let before_state = machine.state();
        let before_ctx = machine.context().clone();
        for event in [
            MachineEvent::ResetComplete,
            MachineEvent::ChargeStartTimerFired,
            MachineEvent::ChargeStopTimerFired,
            MachineEvent::ChargeSessionPauseTimerFired,
            MachineEvent::ManualStop,
            MachineEvent::AlreadyStopped,
            MachineEvent::ChargingWarmupTimeoutTimerFired,
            MachineEvent::CurrentChargingAmpsChanged { amps: 7 },
        ] {
            machine.send(event).unwrap();
            assert_eq!(machine.state(), before_state);
            assert_eq!(
                machine.context().current_charging_amps,
                before_ctx.current_charging_amps
            );
            assert_eq!(
                machine.context().last_target_amps,
                before_ctx.last_target_amps
            );
        }
        assert!(drain(&mut commands_rx).is_empty());
    }

    #[tokio::test]
    async fn test_start_sequence_issues_warmup_commands_once() {
        let (mut machine, mut commands_rx, _events_rx) = machine(false);
        machine.send(MachineEvent::HaStartup).unwrap();

        machine.send(start_event(9)).unwrap();
        assert_eq!(machine.state(), ChargeState::ChargeStartPending);
        assert!(drain(&mut commands_rx).is_empty());

        machine.send(MachineEvent::ChargeStartTimerFired).unwrap();
        assert_eq!(machine.state(), ChargeState::ChargingWarmup);
        assert_eq!(
            drain(&mut commands_rx),
            vec![
                ChargerCommand::SetRequestedAmps(5),
                ChargerCommand::SetSwitch(true),
            ]
        );

        machine
            .send(MachineEvent::CurrentChargingAmpsChanged { amps: 6 })
            .unwrap();
        assert_eq!(machine.state(), ChargeState::Charging);
        // Entered via an amps report, which carries no new target
        assert!(drain(&mut commands_rx).is_empty());

        // A surplus update with a fresh target commands it exactly once
        machine.send(start_event(9)).unwrap();
        assert_eq!(
            drain(&mut commands_rx),
            vec![ChargerCommand::SetRequestedAmps(9)]
        );
    }

    #[tokio::test]
    async fn test_repeated_target_is_not_recommanded() {
        let (mut machine, mut commands_rx, _events_rx) = charging_machine(9);

        machine.send(start_event(9)).unwrap();
        assert_eq!(
            drain(&mut commands_rx),
            vec![ChargerCommand::SetRequestedAmps(9)]
        );

        machine.send(start_event(9)).unwrap();
        assert_eq!(machine.state(), ChargeState::Charging);
        assert!(drain(&mut commands_rx).is_empty());

        machine.send(start_event(12)).unwrap();
        assert_eq!(
            drain(&mut commands_rx),
            vec![ChargerCommand::SetRequestedAmps(12)]
        );
    }

    #[tokio::test]
    async fn test_stop_before_start_timer_cancels_pending_start() {
        let (mut machine, _commands_rx, mut events_rx) = machine(false);
        machine.send(MachineEvent::HaStartup).unwrap();

        machine.send(start_event(9)).unwrap();
        assert_eq!(machine.state(), ChargeState::ChargeStartPending);

        machine.send(stop_event()).unwrap();
        assert_eq!(machine.state(), ChargeState::NotCharging);

        // The canceled timer never delivers its event
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(events_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_start_timer_fires_into_warmup() {
        let (mut machine, _commands_rx, mut events_rx) = machine(false);
        machine.send(MachineEvent::HaStartup).unwrap();
        machine.send(start_event(9)).unwrap();

        let event = events_rx.recv().await.unwrap();
        assert_eq!(event, MachineEvent::ChargeStartTimerFired);
        machine.send(event).unwrap();
        assert_eq!(machine.state(), ChargeState::ChargingWarmup);
    }

    #[tokio::test]
    async fn test_stop_charge_debounce_path() {
        let (mut machine, mut commands_rx, _events_rx) = charging_machine(9);

        machine.send(stop_event()).unwrap();
        assert_eq!(machine.state(), ChargeState::StopChargePending);
        assert!(drain(&mut commands_rx).is_empty());

        // Surplus recovers before the stop timer fires: back to charging
        machine.send(start_event(7)).unwrap();
        assert_eq!(machine.state(), ChargeState::Charging);
        assert_eq!(
            drain(&mut commands_rx),
            vec![ChargerCommand::SetRequestedAmps(7)]
        );

        // And this time let the stop run its course
        machine.send(stop_event()).unwrap();
        machine.send(MachineEvent::ChargeStopTimerFired).unwrap();
        assert_eq!(machine.state(), ChargeState::ChargingCooldown);
        assert_eq!(
            drain(&mut commands_rx),
            vec![ChargerCommand::SetSwitch(false)]
        );
    }

    #[tokio::test]
    async fn test_cooldown_waits_for_current_to_drop() {
        let (mut machine, _commands_rx, _events_rx) = charging_machine(9);

        machine.send(MachineEvent::ManualStop).unwrap();
        // 9 A were still flowing when cooldown was entered
        assert_eq!(machine.state(), ChargeState::ChargingCooldown);

        machine
            .send(MachineEvent::CurrentChargingAmpsChanged { amps: 0 })
            .unwrap();
        assert_eq!(machine.state(), ChargeState::Paused);
    }

    #[tokio::test]
    async fn test_cooldown_fast_path_when_already_stopped() {
        let (mut machine, _commands_rx, _events_rx) = charging_machine(9);

        // Draw collapses below the viable minimum; context now reads 0 A,
        // so cooldown entry self-clears straight into paused.
        machine
            .send(MachineEvent::CurrentChargingAmpsChanged { amps: 0 })
            .unwrap();
        assert_eq!(machine.state(), ChargeState::Paused);
    }

    #[tokio::test]
    async fn test_pause_timer_returns_to_not_charging() {
        let (mut machine, _commands_rx, mut events_rx) = charging_machine(9);
        machine
            .send(MachineEvent::CurrentChargingAmpsChanged { amps: 0 })
            .unwrap();
        assert_eq!(machine.state(), ChargeState::Paused);

        let event = events_rx.recv().await.unwrap();
        assert_eq!(event, MachineEvent::ChargeSessionPauseTimerFired);
        machine.send(event).unwrap();
        assert_eq!(machine.state(), ChargeState::NotCharging);
    }

    #[tokio::test]
    async fn test_warmup_timeout_aborts_into_cooldown() {
        let (mut machine, mut commands_rx, _events_rx) = machine(false);
        machine.send(MachineEvent::HaStartup).unwrap();
        machine.send(start_event(9)).unwrap();
        machine.send(MachineEvent::ChargeStartTimerFired).unwrap();
        drain(&mut commands_rx);

        machine
            .send(MachineEvent::ChargingWarmupTimeoutTimerFired)
            .unwrap();
        // No current was ever reported, so the fast path applies
        assert_eq!(machine.state(), ChargeState::Paused);
        assert_eq!(
            drain(&mut commands_rx),
            vec![ChargerCommand::SetSwitch(false)]
        );
    }

    #[tokio::test]
    async fn test_shutdown_is_terminal() {
        let (mut machine, mut commands_rx, _events_rx) = machine(false);
        machine.send(MachineEvent::HaStartup).unwrap();
        machine.send(MachineEvent::ShutdownTriggered).unwrap();
        assert_eq!(machine.state(), ChargeState::Shutdown);
        drain(&mut commands_rx);

        for event in [
            MachineEvent::HaStartup,
            start_event(9),
            stop_event(),
            MachineEvent::CurrentChargingAmpsChanged { amps: 0 },
            MachineEvent::ShutdownTriggered,
        ] {
            machine.send(event).unwrap();
            assert_eq!(machine.state(), ChargeState::Shutdown);
        }
        assert!(drain(&mut commands_rx).is_empty());
    }

    #[tokio::test]
    async fn test_teardown_cancels_armed_timer() {
        let (mut machine, _commands_rx, mut events_rx) = machine(false);
        machine.send(MachineEvent::HaStartup).unwrap();
        machine.send(start_event(9)).unwrap();

        machine.teardown();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(events_rx.try_recv().is_err());
    }
}
