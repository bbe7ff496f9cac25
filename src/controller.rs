//! Controller wiring for Solmate
//!
//! The controller connects the state machine to live point updates: it
//! subscribes to sensor changes, recomputes the surplus, forwards evaluated
//! events into the machine, feeds timer expiries back in, and pumps the
//! machine's charger commands out to the point bus. All of this happens in
//! a single event loop task, so events are processed one at a time in
//! arrival order and no transition is ever observed half-applied.

use crate::config::Config;
use crate::error::Result;
use crate::evaluator;
use crate::listeners::{EventBusListener, LogListener, StateChangeEvent};
use crate::logging::get_logger;
use crate::machine::{ChargeState, ChargeStateMachine, ChargerCommand, MachineEvent};
use crate::points::{PointBus, PointChange, PointId};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

/// Pluggable car-presence supplier, sampled once at startup
pub type CarPresence = Box<dyn Fn() -> bool + Send + Sync>;

/// Presence supplier returning a fixed answer
pub fn fixed_presence(present: bool) -> CarPresence {
    Box::new(move || present)
}

/// Handle for interacting with a running controller from outside its loop
pub struct ControllerHandle {
    stop_tx: mpsc::UnboundedSender<()>,
    state_changes_tx: broadcast::Sender<StateChangeEvent>,
}

impl ControllerHandle {
    /// Request an orderly stop of the controller loop
    pub fn stop(&self) {
        let _ = self.stop_tx.send(());
    }

    /// Subscribe to published state-change events
    pub fn subscribe_state_changes(&self) -> broadcast::Receiver<StateChangeEvent> {
        self.state_changes_tx.subscribe()
    }
}

/// Owns the state machine and its event loop
pub struct Controller {
    control: crate::config::ControlConfig,
    bus: Arc<dyn PointBus>,
    machine: ChargeStateMachine,
    car_presence: CarPresence,

    consumption_point: PointId,
    production_point: PointId,
    battery_soc_point: PointId,
    switch_point: PointId,
    requested_amps_point: PointId,
    current_amps_point: PointId,

    events_rx: mpsc::UnboundedReceiver<MachineEvent>,
    commands_rx: mpsc::UnboundedReceiver<ChargerCommand>,
    stop_rx: mpsc::UnboundedReceiver<()>,

    logger: crate::logging::StructuredLogger,
}

impl Controller {
    /// Create a controller bound to a point bus.
    ///
    /// The machine starts in `Initial`; nothing happens until `run`.
    pub fn new(
        config: &Config,
        bus: Arc<dyn PointBus>,
        car_presence: CarPresence,
    ) -> (Self, ControllerHandle) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = mpsc::unbounded_channel();
        let (state_changes_tx, _) = broadcast::channel(64);

        let mut machine =
            ChargeStateMachine::new(&config.control, false, commands_tx, &events_tx);
        machine.add_listener(Box::new(LogListener::new()));
        machine.add_listener(Box::new(EventBusListener::from_sender(
            state_changes_tx.clone(),
        )));

        let controller = Self {
            control: config.control.clone(),
            bus,
            machine,
            car_presence,
            consumption_point: PointId::new(config.points.home_consumption.clone()),
            production_point: PointId::new(config.points.pv_production.clone()),
            battery_soc_point: PointId::new(config.points.battery_soc.clone()),
            switch_point: PointId::new(config.points.charger_switch.clone()),
            requested_amps_point: PointId::new(config.points.requested_amps.clone()),
            current_amps_point: PointId::new(config.points.current_amps.clone()),
            events_rx,
            commands_rx,
            stop_rx,
            logger: get_logger("controller"),
        };

        let handle = ControllerHandle {
            stop_tx,
            state_changes_tx,
        };

        (controller, handle)
    }

    /// Currently active machine state
    pub fn state(&self) -> ChargeState {
        self.machine.state()
    }

    /// Run the controller event loop until stopped.
    ///
    /// Exactly one event is processed to completion before the next one
    /// begins; suspension only happens between events.
    pub async fn run(mut self) -> Result<()> {
        self.logger.info("Starting charge controller");

        let mut changes = self.bus.subscribe();

        let present = (self.car_presence)();
        self.machine.set_car_present(present);
        self.forward(MachineEvent::HaStartup);
        self.pump_commands().await;

        loop {
            tokio::select! {
                change = changes.recv() => match change {
                    Ok(change) => self.handle_point_change(change).await,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        self.logger.warn(&format!(
                            "lagging behind point updates, {} notifications dropped",
                            missed
                        ));
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        self.logger.warn("point bus closed, stopping");
                        break;
                    }
                },
                Some(event) = self.events_rx.recv() => {
                    self.forward(event);
                    self.pump_commands().await;
                }
                _ = self.stop_rx.recv() => break,
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Orderly teardown: give the machine its shutdown event, deliver any
    /// commands it produced, then disarm everything.
    async fn shutdown(&mut self) {
        self.logger.info("Stopping charge controller");
        self.forward(MachineEvent::ShutdownTriggered);
        self.pump_commands().await;
        self.machine.teardown();
    }

    async fn handle_point_change(&mut self, change: PointChange) {
        if change.point == self.current_amps_point {
            match change.value {
                Some(value) => {
                    self.forward(MachineEvent::CurrentChargingAmpsChanged {
                        amps: value.round() as i32,
                    });
                }
                None => self
                    .logger
                    .debug("current-amps reading unavailable, skipping"),
            }
        } else if change.point == self.consumption_point
            || change.point == self.production_point
            || change.point == self.battery_soc_point
        {
            self.reevaluate_surplus().await;
        }
        // Changes to the switch/requested-amps points are echoes of our
        // own commands and carry no new information.

        self.pump_commands().await;
    }

    /// Re-run the surplus evaluation against a fresh snapshot and forward
    /// the outcome. A failed evaluation only skips this tick.
    async fn reevaluate_surplus(&mut self) {
        let consumption = self.bus.get_value(&self.consumption_point).await;
        let production = self.bus.get_value(&self.production_point).await;

        match evaluator::evaluate(consumption, production, &self.control) {
            Ok(eval) => {
                self.logger.debug(&format!(
                    "surplus {:.0} W, target {} A",
                    eval.surplus_w, eval.target_amps
                ));
                self.forward(eval.to_event(self.control.min_viable_amps));
            }
            Err(e) => self.logger.debug(&format!("skipping surplus tick: {}", e)),
        }
    }

    /// Send one event into the machine. A timer double-arm is a bug in the
    /// entry/exit pairing; it is reported loudly but only costs this event.
    fn forward(&mut self, event: MachineEvent) {
        if let Err(e) = self.machine.send(event) {
            self.logger.error(&format!("event dropped: {}", e));
        }
    }

    /// Deliver queued charger commands to the bus, exactly once each
    async fn pump_commands(&mut self) {
        while let Ok(command) = self.commands_rx.try_recv() {
            let result = match command {
                ChargerCommand::SetSwitch(on) => {
                    self.logger
                        .info(&format!("charger switch {}", if on { "on" } else { "off" }));
                    self.bus.set_switch(&self.switch_point, on).await
                }
                ChargerCommand::SetRequestedAmps(amps) => {
                    self.logger.info(&format!("requested amps -> {}", amps));
                    self.bus
                        .set_requested_amps(&self.requested_amps_point, amps)
                        .await
                }
            };
            if let Err(e) = result {
                // Delivery is the collaborator's concern; we never retry
                self.logger.error(&format!("command delivery failed: {}", e));
            }
        }
    }
}
