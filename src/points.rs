//! External point boundary for Solmate
//!
//! The controller never talks to sensors or the charger directly; it reads
//! snapshots and writes commands through the capabilities defined here. The
//! host platform (or a test harness) provides the implementation, injected
//! at construction rather than reached through globals.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
use tokio::sync::broadcast;

/// Opaque identifier of an external point (sensor, switch or number)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointId(String);

impl PointId {
    /// Create a new point identifier
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// Identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PointId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PointId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One change notification per underlying point change.
///
/// `value` is `None` when the new state is missing or non-numeric; the
/// consumer decides how to recover.
#[derive(Debug, Clone)]
pub struct PointChange {
    /// The point that changed
    pub point: PointId,

    /// New numeric value, if one could be read
    pub value: Option<f64>,
}

/// Capabilities the host platform exposes for external points.
///
/// Writes are fire-and-forget from the core's perspective: the core issues
/// each command exactly once and never retries. Retry/backpressure toward
/// the physical charger belongs to the implementation.
#[async_trait]
pub trait PointBus: Send + Sync {
    /// Read the current numeric value of a point, if available
    async fn get_value(&self, point: &PointId) -> Option<f64>;

    /// Command an on/off switch point
    async fn set_switch(&self, point: &PointId, on: bool) -> Result<()>;

    /// Command a requested-amperage setpoint
    async fn set_requested_amps(&self, point: &PointId, amps: i32) -> Result<()>;

    /// Subscribe to change notifications for all points on this bus
    fn subscribe(&self) -> broadcast::Receiver<PointChange>;
}

/// In-memory point bus for demos and tests.
///
/// Plays the role the mock sensor/switch/number entities play on the host
/// platform: values are set programmatically and every update fans out as
/// a change notification.
pub struct MemoryPointBus {
    values: RwLock<HashMap<PointId, f64>>,
    tx: broadcast::Sender<PointChange>,
}

impl MemoryPointBus {
    /// Create an empty bus
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(64);
        Self {
            values: RwLock::new(HashMap::new()),
            tx,
        }
    }

    /// Set a point value and notify subscribers
    pub fn set_value(&self, point: &PointId, value: f64) {
        if let Ok(mut values) = self.values.write() {
            values.insert(point.clone(), value);
        }
        let _ = self.tx.send(PointChange {
            point: point.clone(),
            value: Some(value),
        });
    }

    /// Drop a point value and notify subscribers (simulates an
    /// unavailable/non-numeric sensor state)
    pub fn clear_value(&self, point: &PointId) {
        if let Ok(mut values) = self.values.write() {
            values.remove(point);
        }
        let _ = self.tx.send(PointChange {
            point: point.clone(),
            value: None,
        });
    }

    /// Read a switch point back as a boolean
    pub fn switch_is_on(&self, point: &PointId) -> Option<bool> {
        self.values
            .read()
            .ok()
            .and_then(|values| values.get(point).copied())
            .map(|v| v != 0.0)
    }
}

impl Default for MemoryPointBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PointBus for MemoryPointBus {
    async fn get_value(&self, point: &PointId) -> Option<f64> {
        self.values
            .read()
            .ok()
            .and_then(|values| values.get(point).copied())
    }

    async fn set_switch(&self, point: &PointId, on: bool) -> Result<()> {
        self.set_value(point, if on { 1.0 } else { 0.0 });
        Ok(())
    }

    async fn set_requested_amps(&self, point: &PointId, amps: i32) -> Result<()> {
        self.set_value(point, f64::from(amps));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<PointChange> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_bus_read_write() {
        let bus = MemoryPointBus::new();
        let power = PointId::from("sensor.pv_production");
        let switch = PointId::from("switch.charger");

        assert_eq!(bus.get_value(&power).await, None);

        bus.set_value(&power, 4000.0);
        assert_eq!(bus.get_value(&power).await, Some(4000.0));

        bus.set_switch(&switch, true).await.unwrap();
        assert_eq!(bus.switch_is_on(&switch), Some(true));
        bus.set_switch(&switch, false).await.unwrap();
        assert_eq!(bus.switch_is_on(&switch), Some(false));
    }

    #[tokio::test]
    async fn test_memory_bus_change_notifications() {
        let bus = MemoryPointBus::new();
        let point = PointId::from("sensor.home_consumption");
        let mut rx = bus.subscribe();

        bus.set_value(&point, 1200.0);
        let change = rx.recv().await.unwrap();
        assert_eq!(change.point, point);
        assert_eq!(change.value, Some(1200.0));

        bus.clear_value(&point);
        let change = rx.recv().await.unwrap();
        assert_eq!(change.value, None);
    }
}
