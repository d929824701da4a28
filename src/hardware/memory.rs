//! In-memory brewery (for testing or dry runs)
//!
//! Plays every collaborator role at once and keeps a journal of everything
//! the steps asked it to do, so callers can assert on both outcomes and
//! ordering.

use super::{
    ActorControl, ConfigLookup, HardwareError, KettleControl, KettleInfo, Notifier, SensorReader,
    StepObserver,
};
use crate::core::notification::Notification;
use crate::core::state::StepSnapshot;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Something a step did to the brewery
#[derive(Debug, Clone, PartialEq)]
pub enum BrewEvent {
    ActorOn(String),
    ActorOff(String),
    KettleToggle(String),
    KettleStop(String),
    TargetTemp(String, f64),
    Notified(String),
    Update(StepSnapshot),
}

#[derive(Debug, Clone)]
struct SimKettle {
    name: String,
    target_temp: f64,
    heater_on: Option<bool>,
    toggles: usize,
    stops: usize,
}

/// Ties a sensor to a kettle (and optionally a cooling actor) for simulation
#[derive(Debug, Clone)]
pub struct ThermalBinding {
    pub sensor: String,
    pub kettle: Option<String>,
    pub cooler: Option<String>,
}

#[derive(Default)]
struct BreweryState {
    sensors: HashMap<String, Option<f64>>,
    actors: HashMap<String, bool>,
    kettles: HashMap<String, SimKettle>,
    config: HashMap<String, String>,
    journal: Vec<BrewEvent>,
    notifications: Vec<Notification>,
    actor_failure: Option<HardwareError>,
    kettle_failure: Option<HardwareError>,
}

/// Simulated sensors, actors and kettles with a recording notifier
#[derive(Default)]
pub struct SimulatedBrewery {
    state: Mutex<BreweryState>,
}

impl SimulatedBrewery {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BreweryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_sensor(&self, sensor_id: &str, value: Option<f64>) {
        self.lock().sensors.insert(sensor_id.to_string(), value);
    }

    pub fn add_actor(&self, actor_id: &str) {
        self.lock().actors.entry(actor_id.to_string()).or_insert(false);
    }

    pub fn add_kettle(&self, kettle_id: &str, name: &str, heater_on: Option<bool>) {
        self.lock().kettles.insert(
            kettle_id.to_string(),
            SimKettle {
                name: name.to_string(),
                target_temp: 0.0,
                heater_on,
                toggles: 0,
                stops: 0,
            },
        );
    }

    pub fn set_config(&self, key: &str, value: &str) {
        self.lock().config.insert(key.to_string(), value.to_string());
    }

    /// Make every actor command fail with `error` (or succeed again with `None`)
    pub fn fail_actor_commands(&self, error: Option<HardwareError>) {
        self.lock().actor_failure = error;
    }

    /// Make every kettle command fail with `error` (or succeed again with `None`)
    pub fn fail_kettle_commands(&self, error: Option<HardwareError>) {
        self.lock().kettle_failure = error;
    }

    pub fn sensor(&self, sensor_id: &str) -> Option<f64> {
        self.lock().sensors.get(sensor_id).copied().flatten()
    }

    pub fn actor_state(&self, actor_id: &str) -> Option<bool> {
        self.lock().actors.get(actor_id).copied()
    }

    pub fn heater_on(&self, kettle_id: &str) -> Option<bool> {
        self.lock().kettles.get(kettle_id).and_then(|k| k.heater_on)
    }

    pub fn target_temp(&self, kettle_id: &str) -> Option<f64> {
        self.lock().kettles.get(kettle_id).map(|k| k.target_temp)
    }

    pub fn kettle_toggles(&self, kettle_id: &str) -> usize {
        self.lock().kettles.get(kettle_id).map_or(0, |k| k.toggles)
    }

    pub fn kettle_stops(&self, kettle_id: &str) -> usize {
        self.lock().kettles.get(kettle_id).map_or(0, |k| k.stops)
    }

    /// Everything recorded so far, in order
    pub fn journal(&self) -> Vec<BrewEvent> {
        self.lock().journal.clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().notifications.clone()
    }

    /// Notifications with the given title
    pub fn notifications_titled(&self, title: &str) -> Vec<Notification> {
        self.lock()
            .notifications
            .iter()
            .filter(|n| n.title == title)
            .cloned()
            .collect()
    }

    pub fn updates(&self) -> Vec<StepSnapshot> {
        self.lock()
            .journal
            .iter()
            .filter_map(|e| match e {
                BrewEvent::Update(snapshot) => Some(snapshot.clone()),
                _ => None,
            })
            .collect()
    }

    /// Count journal entries matching `predicate`
    pub fn count(&self, predicate: impl Fn(&BrewEvent) -> bool) -> usize {
        self.lock().journal.iter().filter(|e| predicate(e)).count()
    }

    /// Advance the thermal model by one second
    pub fn simulate_tick(&self, bindings: &[ThermalBinding], ambient: f64) {
        let mut state = self.lock();
        for binding in bindings {
            let current = state
                .sensors
                .get(&binding.sensor)
                .copied()
                .flatten()
                .unwrap_or(ambient);

            let heating = binding
                .kettle
                .as_ref()
                .and_then(|id| state.kettles.get(id))
                .filter(|k| k.heater_on == Some(true))
                .map(|k| k.target_temp);
            let cooling = binding
                .cooler
                .as_ref()
                .is_some_and(|id| state.actors.get(id).copied().unwrap_or(false));

            let next = match heating {
                Some(target) if target > current => (current + 0.5).min(target),
                _ if cooling => current - (current - ambient) * 0.01,
                _ => current - (current - ambient) * 0.0005,
            };
            state.sensors.insert(binding.sensor.clone(), Some(next));
        }
    }

    /// Run the thermal model in the background once per second
    pub fn spawn_physics(self: &Arc<Self>, bindings: Vec<ThermalBinding>, ambient: f64) -> JoinHandle<()> {
        let brewery = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            loop {
                ticker.tick().await;
                brewery.simulate_tick(&bindings, ambient);
            }
        })
    }

    fn switch_actor(&self, actor_id: &str, on: bool) -> Result<(), HardwareError> {
        let mut state = self.lock();
        if let Some(error) = state.actor_failure.clone() {
            return Err(error);
        }
        match state.actors.get_mut(actor_id) {
            Some(actor) => *actor = on,
            None => return Err(HardwareError::UnknownActor(actor_id.to_string())),
        }
        let event = if on {
            BrewEvent::ActorOn(actor_id.to_string())
        } else {
            BrewEvent::ActorOff(actor_id.to_string())
        };
        state.journal.push(event);
        Ok(())
    }

    fn kettle_command(
        &self,
        kettle_id: &str,
        apply: impl FnOnce(&mut SimKettle) -> BrewEvent,
    ) -> Result<(), HardwareError> {
        let mut state = self.lock();
        if let Some(error) = state.kettle_failure.clone() {
            return Err(error);
        }
        let kettle = state
            .kettles
            .get_mut(kettle_id)
            .ok_or_else(|| HardwareError::UnknownKettle(kettle_id.to_string()))?;
        let event = apply(kettle);
        state.journal.push(event);
        Ok(())
    }
}

#[async_trait]
impl SensorReader for SimulatedBrewery {
    async fn sensor_value(&self, sensor_id: &str) -> Option<f64> {
        self.sensor(sensor_id)
    }
}

#[async_trait]
impl ActorControl for SimulatedBrewery {
    async fn actor_on(&self, actor_id: &str) -> Result<(), HardwareError> {
        self.switch_actor(actor_id, true)
    }

    async fn actor_off(&self, actor_id: &str) -> Result<(), HardwareError> {
        self.switch_actor(actor_id, false)
    }
}

#[async_trait]
impl KettleControl for SimulatedBrewery {
    async fn kettle(&self, kettle_id: &str) -> Option<KettleInfo> {
        self.lock().kettles.get(kettle_id).map(|k| KettleInfo {
            id: kettle_id.to_string(),
            name: k.name.clone(),
            target_temp: k.target_temp,
            heater_on: k.heater_on,
        })
    }

    async fn set_target_temp(&self, kettle_id: &str, temp: f64) -> Result<(), HardwareError> {
        self.kettle_command(kettle_id, |kettle| {
            kettle.target_temp = temp;
            BrewEvent::TargetTemp(kettle_id.to_string(), temp)
        })
    }

    async fn toggle(&self, kettle_id: &str) -> Result<(), HardwareError> {
        self.kettle_command(kettle_id, |kettle| {
            kettle.heater_on = Some(!kettle.heater_on.unwrap_or(false));
            kettle.toggles += 1;
            BrewEvent::KettleToggle(kettle_id.to_string())
        })
    }

    async fn stop(&self, kettle_id: &str) -> Result<(), HardwareError> {
        self.kettle_command(kettle_id, |kettle| {
            if kettle.heater_on.is_some() {
                kettle.heater_on = Some(false);
            }
            kettle.stops += 1;
            BrewEvent::KettleStop(kettle_id.to_string())
        })
    }
}

impl Notifier for SimulatedBrewery {
    fn notify(&self, notification: Notification) {
        debug!("Notification: {} - {}", notification.title, notification.message);
        let mut state = self.lock();
        state.journal.push(BrewEvent::Notified(notification.title.clone()));
        state.notifications.push(notification);
    }
}

#[async_trait]
impl StepObserver for SimulatedBrewery {
    async fn push_update(&self, snapshot: StepSnapshot) {
        self.lock().journal.push(BrewEvent::Update(snapshot));
    }
}

impl ConfigLookup for SimulatedBrewery {
    fn config_value(&self, key: &str, default: &str) -> String {
        self.lock()
            .config
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }
}
