//! Brewery collaborators consumed by steps
//!
//! Steps never reach for a global handle. Everything they touch (sensors,
//! actors, kettles, the notification sink, observers and host config) is
//! handed to them through a [`BrewContext`] at construction time.

pub mod memory;

use crate::core::notification::Notification;
use crate::core::state::StepSnapshot;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub use memory::{SimulatedBrewery, ThermalBinding};

/// Error types for collaborator calls
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HardwareError {
    #[error("Unknown actor: {0}")]
    UnknownActor(String),

    #[error("Unknown kettle: {0}")]
    UnknownKettle(String),

    #[error("Communication error: {0}")]
    Communication(String),
}

/// Read access to temperature sensors
#[async_trait]
pub trait SensorReader: Send + Sync {
    /// Current value of a sensor, `None` when it has no reading yet
    async fn sensor_value(&self, sensor_id: &str) -> Option<f64>;
}

/// Switchable actors (pumps, valves, heating elements)
#[async_trait]
pub trait ActorControl: Send + Sync {
    async fn actor_on(&self, actor_id: &str) -> Result<(), HardwareError>;

    async fn actor_off(&self, actor_id: &str) -> Result<(), HardwareError>;
}

/// Snapshot of a kettle as seen by a step
#[derive(Debug, Clone, PartialEq)]
pub struct KettleInfo {
    pub id: String,
    pub name: String,

    /// Target temperature the kettle logic regulates to
    pub target_temp: f64,

    /// State of the kettle logic, `None` when no logic instance is attached
    pub heater_on: Option<bool>,
}

/// Kettle lookup and heating-logic control
#[async_trait]
pub trait KettleControl: Send + Sync {
    async fn kettle(&self, kettle_id: &str) -> Option<KettleInfo>;

    async fn set_target_temp(&self, kettle_id: &str, temp: f64) -> Result<(), HardwareError>;

    /// Flip the kettle logic on/off
    async fn toggle(&self, kettle_id: &str) -> Result<(), HardwareError>;

    /// Switch the kettle logic off
    async fn stop(&self, kettle_id: &str) -> Result<(), HardwareError>;
}

/// Fire-and-forget sink for user-facing notifications
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Receives step state snapshots whenever something operator-relevant changes
#[async_trait]
pub trait StepObserver: Send + Sync {
    async fn push_update(&self, snapshot: StepSnapshot);
}

/// Host configuration lookup
pub trait ConfigLookup: Send + Sync {
    fn config_value(&self, key: &str, default: &str) -> String;
}

/// Collaborators injected into every step
#[derive(Clone)]
pub struct BrewContext {
    pub sensors: Arc<dyn SensorReader>,
    pub actors: Arc<dyn ActorControl>,
    pub kettles: Arc<dyn KettleControl>,
    pub notifier: Arc<dyn Notifier>,
    pub observer: Arc<dyn StepObserver>,
    pub config: Arc<dyn ConfigLookup>,
}

impl BrewContext {
    /// Build a context where one object plays every collaborator role
    pub fn from_brewery<B>(brewery: Arc<B>) -> Self
    where
        B: SensorReader
            + ActorControl
            + KettleControl
            + Notifier
            + StepObserver
            + ConfigLookup
            + 'static,
    {
        Self {
            sensors: brewery.clone(),
            actors: brewery.clone(),
            kettles: brewery.clone(),
            notifier: brewery.clone(),
            observer: brewery.clone(),
            config: brewery,
        }
    }

    /// Replace the config lookup (e.g. with recipe settings)
    pub fn with_config(mut self, config: Arc<dyn ConfigLookup>) -> Self {
        self.config = config;
        self
    }

    /// Read a sensor, tolerating an unconfigured sensor reference
    pub async fn read_sensor(&self, sensor_id: Option<&str>) -> Option<f64> {
        match sensor_id {
            Some(id) => self.sensors.sensor_value(id).await,
            None => None,
        }
    }
}

impl std::fmt::Debug for BrewContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrewContext").finish_non_exhaustive()
    }
}
