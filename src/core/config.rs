//! Recipe configuration from YAML

use crate::core::Recipe;
use crate::hardware::{BrewContext, ConfigLookup, ThermalBinding};
use crate::steps::StepKind;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::sync::Arc;

/// Maximum number of hop alerts a boil step supports
pub const MAX_HOP_ALERTS: usize = 6;

/// Config key for the temperature unit
pub const TEMP_UNIT_KEY: &str = "TEMP_UNIT";

/// Top-level recipe configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeConfig {
    /// Recipe name
    pub name: String,

    /// Recipe version (optional)
    #[serde(default)]
    pub version: Option<String>,

    /// Host settings the steps look up
    #[serde(default)]
    pub settings: RecipeSettings,

    /// Brewing steps, in execution order
    pub steps: Vec<StepConfig>,
}

/// Temperature unit used by sensors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TempUnit {
    #[default]
    C,
    F,
}

/// Settings exposed to steps through [`ConfigLookup`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeSettings {
    #[serde(default)]
    pub temp_unit: TempUnit,
}

impl ConfigLookup for RecipeSettings {
    fn config_value(&self, key: &str, default: &str) -> String {
        match key {
            TEMP_UNIT_KEY => match self.temp_unit {
                TempUnit::C => "C".to_string(),
                TempUnit::F => "F".to_string(),
            },
            _ => default.to_string(),
        }
    }
}

/// Step configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    /// Display name, unique within a recipe
    pub name: String,

    /// Optional step description
    #[serde(default)]
    pub description: Option<String>,

    /// Variant and its properties
    #[serde(flatten)]
    pub props: StepProps,
}

/// Typed properties per step variant
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepProps {
    Notification(NotificationConfig),
    MashIn(MashInConfig),
    Mash(MashConfig),
    Wait(WaitConfig),
    Toggle(ToggleConfig),
    Actor(ActorConfig),
    Boil(BoilConfig),
    Cooldown(CooldownConfig),
}

impl StepProps {
    pub fn kind(&self) -> StepKind {
        match self {
            StepProps::Notification(_) => StepKind::Notification,
            StepProps::MashIn(_) => StepKind::MashIn,
            StepProps::Mash(_) => StepKind::Mash,
            StepProps::Wait(_) => StepKind::Wait,
            StepProps::Toggle(_) => StepKind::Toggle,
            StepProps::Actor(_) => StepKind::Actor,
            StepProps::Boil(_) => StepKind::Boil,
            StepProps::Cooldown(_) => StepKind::Cooldown,
        }
    }

    /// Sensor the step's trigger reads, if any
    pub fn sensor(&self) -> Option<&str> {
        match self {
            StepProps::MashIn(c) => c.sensor.as_deref(),
            StepProps::Mash(c) => c.sensor.as_deref(),
            StepProps::Boil(c) => c.sensor.as_deref(),
            StepProps::Cooldown(c) => c.sensor.as_deref(),
            _ => None,
        }
    }

    pub fn kettle(&self) -> Option<&str> {
        match self {
            StepProps::MashIn(c) => c.kettle.as_deref(),
            StepProps::Mash(c) => c.kettle.as_deref(),
            StepProps::Boil(c) => c.kettle.as_deref(),
            StepProps::Cooldown(c) => c.kettle.as_deref(),
            _ => None,
        }
    }

    pub fn actor(&self) -> Option<&str> {
        match self {
            StepProps::Toggle(c) => c.actor.as_deref(),
            StepProps::Actor(c) => c.actor.as_deref(),
            StepProps::Cooldown(c) => c.actor.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Text shown to the brewer
    #[serde(default)]
    pub notification: String,

    /// Advance automatically instead of waiting for "Next Step"
    #[serde(default)]
    pub auto_next: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MashInConfig {
    /// Strike temperature
    #[serde(default)]
    pub temp: f64,

    #[serde(default)]
    pub sensor: Option<String>,

    #[serde(default)]
    pub kettle: Option<String>,

    /// Text shown once the temperature is reached
    #[serde(default)]
    pub notification: Option<String>,

    /// Switch the kettle logic on and off with the step
    #[serde(default)]
    pub auto_mode: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MashConfig {
    /// Rest length in minutes
    #[serde(default)]
    pub timer: u64,

    #[serde(default)]
    pub temp: f64,

    #[serde(default)]
    pub sensor: Option<String>,

    #[serde(default)]
    pub kettle: Option<String>,

    #[serde(default)]
    pub auto_mode: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaitConfig {
    /// Minutes to wait
    #[serde(default)]
    pub timer: u64,
}

/// Whether a toggle step switches its actor on or off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ToggleType {
    On,
    #[default]
    Off,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToggleConfig {
    #[serde(default)]
    pub toggle_type: ToggleType,

    #[serde(default)]
    pub actor: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActorConfig {
    /// Minutes to keep the actor on
    #[serde(default)]
    pub timer: u64,

    #[serde(default)]
    pub actor: Option<String>,
}

/// Hop alert, `minutes` before the end of the boil
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HopAddition {
    pub minutes: u64,

    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoilConfig {
    /// Boil length in minutes
    #[serde(default)]
    pub timer: u64,

    /// Temperature at which the countdown starts
    #[serde(default)]
    pub temp: f64,

    #[serde(default)]
    pub sensor: Option<String>,

    #[serde(default)]
    pub kettle: Option<String>,

    /// Alert to remove the lid when close to boiling
    #[serde(default)]
    pub lid_alert: bool,

    #[serde(default)]
    pub auto_mode: bool,

    /// First wort hop alert at run start
    #[serde(default)]
    pub first_wort: bool,

    #[serde(default)]
    pub first_wort_text: Option<String>,

    /// Up to six hop additions
    #[serde(default)]
    pub hops: Vec<HopAddition>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CooldownConfig {
    /// Temperature to cool down to
    #[serde(default)]
    pub temp: f64,

    #[serde(default)]
    pub sensor: Option<String>,

    /// Actor (e.g. chiller valve) held open during the cooldown
    #[serde(default)]
    pub actor: Option<String>,

    #[serde(default)]
    pub kettle: Option<String>,
}

/// Hardware ids a recipe refers to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HardwareRefs {
    pub sensors: BTreeSet<String>,
    pub actors: BTreeSet<String>,
    pub kettles: BTreeSet<String>,
}

impl RecipeConfig {
    /// Load recipe configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse recipe configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: RecipeConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the recipe configuration
    pub fn validate(&self) -> Result<()> {
        let mut seen_names = HashSet::new();
        for step in &self.steps {
            if step.name.trim().is_empty() {
                anyhow::bail!("Step names must not be empty");
            }
            if !seen_names.insert(&step.name) {
                anyhow::bail!("Duplicate step name: {}", step.name);
            }

            let needs_sensor = matches!(
                step.props.kind(),
                StepKind::MashIn | StepKind::Mash | StepKind::Boil | StepKind::Cooldown
            );
            if needs_sensor && step.props.sensor().is_none() {
                anyhow::bail!("Step '{}' ({}) requires a sensor", step.name, step.props.kind());
            }

            match &step.props {
                StepProps::MashIn(c) => check_temp(&step.name, c.temp)?,
                StepProps::Mash(c) => check_temp(&step.name, c.temp)?,
                StepProps::Cooldown(c) => check_temp(&step.name, c.temp)?,
                StepProps::Actor(c) => {
                    if c.actor.is_none() {
                        anyhow::bail!("Step '{}' (ActorStep) requires an actor", step.name);
                    }
                }
                StepProps::Boil(c) => {
                    check_temp(&step.name, c.temp)?;
                    if c.hops.len() > MAX_HOP_ALERTS {
                        anyhow::bail!(
                            "Step '{}' has {} hop additions, at most {} are supported",
                            step.name,
                            c.hops.len(),
                            MAX_HOP_ALERTS
                        );
                    }
                }
                StepProps::Notification(_) | StepProps::Wait(_) | StepProps::Toggle(_) => {}
            }
        }

        Ok(())
    }

    /// Every sensor, actor and kettle the recipe mentions
    pub fn hardware(&self) -> HardwareRefs {
        let mut refs = HardwareRefs::default();
        for step in &self.steps {
            if let Some(sensor) = step.props.sensor() {
                refs.sensors.insert(sensor.to_string());
            }
            if let Some(actor) = step.props.actor() {
                refs.actors.insert(actor.to_string());
            }
            if let Some(kettle) = step.props.kettle() {
                refs.kettles.insert(kettle.to_string());
            }
        }
        refs
    }

    /// Sensor/kettle/actor pairings for the simulated brewery
    pub fn thermal_bindings(&self) -> Vec<ThermalBinding> {
        let mut bindings: Vec<ThermalBinding> = Vec::new();
        for step in &self.steps {
            let Some(sensor) = step.props.sensor() else {
                continue;
            };
            let cooler = match &step.props {
                StepProps::Cooldown(c) => c.actor.clone(),
                _ => None,
            };
            match bindings.iter_mut().find(|b| b.sensor == sensor) {
                Some(binding) => {
                    if binding.kettle.is_none() {
                        binding.kettle = step.props.kettle().map(str::to_string);
                    }
                    if binding.cooler.is_none() {
                        binding.cooler = cooler;
                    }
                }
                None => bindings.push(ThermalBinding {
                    sensor: sensor.to_string(),
                    kettle: step.props.kettle().map(str::to_string),
                    cooler,
                }),
            }
        }
        bindings
    }

    /// Build a runnable recipe; steps look up host config through the recipe settings
    pub fn to_recipe(&self, ctx: BrewContext) -> Recipe {
        let ctx = ctx.with_config(Arc::new(self.settings.clone()));
        Recipe::from_config(self, ctx)
    }
}

fn check_temp(step: &str, temp: f64) -> Result<()> {
    if !temp.is_finite() {
        anyhow::bail!("Step '{}' has an invalid temperature", step);
    }
    Ok(())
}
