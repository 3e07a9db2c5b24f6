//! TOML-based scenario configuration and the built-in baseline preset.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::control::balancer::BalancerConfig;

/// Errors raised while loading or validating a scenario file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read scenario file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse scenario file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid scenario: {0}")]
    Invalid(String),
}

/// Top-level scenario configuration parsed from TOML.
///
/// All sections have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Control-loop timing and balancing parameters.
    pub control: ControlConfig,
    /// Simulated meter profile.
    pub meter: MeterConfig,
    /// Backup generator parameters.
    pub generator: GeneratorConfig,
    /// Appliances registered at start-up.
    #[serde(rename = "appliance")]
    pub appliances: Vec<ApplianceConfig>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            control: ControlConfig::default(),
            meter: MeterConfig::default(),
            generator: GeneratorConfig::default(),
            appliances: Vec::new(),
        }
    }
}

/// Control-loop timing and balancing parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControlConfig {
    /// Control period in milliseconds (must be > 0).
    pub period_ms: u64,
    /// Simulated-time acceleration factor; the effective period is
    /// `period_ms / acceleration`.
    pub acceleration: f32,
    /// Hysteresis margin in watts.
    pub hysteresis_w: f32,
    /// Resume-threshold floor (0.0-1.0).
    pub min_emergency_threshold: f32,
    /// Resume-threshold ceiling (0.0-1.0).
    pub max_emergency_threshold: f32,
    /// Ticks a freshly transitioned device is protected from preemption.
    pub min_resume_cycles: u32,
    /// Ticks after which a suspended device forces its resumption. Note
    /// the asymmetry with `min_resume_cycles`: a household where every
    /// active device is still protected can delay a forced resume.
    pub max_resume_cycles: u32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            period_ms: 1000,
            acceleration: 1.0,
            hysteresis_w: 2.0,
            min_emergency_threshold: 0.2,
            max_emergency_threshold: 0.9,
            min_resume_cycles: 3,
            max_resume_cycles: 20,
        }
    }
}

impl ControlConfig {
    /// Balancer tuning derived from this section.
    pub fn balancer(&self) -> BalancerConfig {
        BalancerConfig {
            hysteresis_w: self.hysteresis_w,
            min_emergency_threshold: self.min_emergency_threshold,
            max_emergency_threshold: self.max_emergency_threshold,
            min_resume_cycles: self.min_resume_cycles,
            max_resume_cycles: self.max_resume_cycles,
        }
    }

    /// Control period scaled by the acceleration factor.
    pub fn effective_period(&self) -> Duration {
        Duration::from_secs_f64(self.period_ms as f64 / 1000.0 / self.acceleration as f64)
    }
}

/// Simulated meter profile parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MeterConfig {
    /// Random seed for the noise generator.
    pub seed: u64,
    /// Profile resolution: ticks per simulated day (must be > 0).
    pub steps_per_day: usize,
    /// Line tension in volts (must be > 0).
    pub tension_v: f32,
    /// Baseline production in watts.
    pub base_production_w: f32,
    /// Sinusoidal production amplitude in watts.
    pub production_amp_w: f32,
    /// Baseline consumption in watts.
    pub base_consumption_w: f32,
    /// Sinusoidal consumption amplitude in watts.
    pub consumption_amp_w: f32,
    /// Gaussian noise standard deviation in watts.
    pub noise_std_w: f32,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            steps_per_day: 24,
            tension_v: 230.0,
            base_production_w: 1500.0,
            production_amp_w: 800.0,
            base_consumption_w: 1200.0,
            consumption_amp_w: 400.0,
            noise_std_w: 50.0,
        }
    }
}

/// Backup generator parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Nominal output in watts when running (must be > 0).
    pub output_w: f32,
    /// Nominal output tension in volts (must be > 0).
    pub tension_v: f32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output_w: 2300.0,
            tension_v: 230.0,
        }
    }
}

/// One appliance registered at start-up.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplianceConfig {
    /// Registry id; must be unique across the scenario.
    pub id: String,
    /// Adapter descriptor resolved by the appliance catalog
    /// (`"heater"`, `"oven"`, `"dimmer_lamp"`).
    pub adapter: String,
    /// Per-mode consumption in watts, mode 1 first.
    pub mode_w: Vec<f32>,
    /// Initial mode index (1-based).
    #[serde(default = "default_initial_mode")]
    pub initial_mode: u32,
    /// Seconds of suspension after which the appliance reports full
    /// emergency.
    #[serde(default = "default_full_urgency_secs")]
    pub full_urgency_secs: f32,
}

fn default_initial_mode() -> u32 {
    1
}

fn default_full_urgency_secs() -> f32 {
    60.0
}

impl ScenarioConfig {
    /// Loads and validates a scenario from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// The built-in baseline household: two heaters, an oven, and a lamp.
    pub fn baseline() -> Self {
        Self {
            appliances: vec![
                ApplianceConfig {
                    id: "heater-living".to_string(),
                    adapter: "heater".to_string(),
                    mode_w: vec![500.0, 1000.0, 2000.0],
                    initial_mode: 1,
                    full_urgency_secs: 120.0,
                },
                ApplianceConfig {
                    id: "heater-bedroom".to_string(),
                    adapter: "heater".to_string(),
                    mode_w: vec![400.0, 800.0],
                    initial_mode: 1,
                    full_urgency_secs: 180.0,
                },
                ApplianceConfig {
                    id: "oven-kitchen".to_string(),
                    adapter: "oven".to_string(),
                    mode_w: vec![100.0, 1800.0, 2500.0],
                    initial_mode: 1,
                    full_urgency_secs: 30.0,
                },
                ApplianceConfig {
                    id: "lamp-hall".to_string(),
                    adapter: "dimmer_lamp".to_string(),
                    mode_w: vec![5.0, 20.0, 60.0],
                    initial_mode: 2,
                    full_urgency_secs: 60.0,
                },
            ],
            ..Self::default()
        }
    }

    /// Checks cross-field invariants the type system cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.control.period_ms == 0 {
            return Err(ConfigError::Invalid("control.period_ms must be > 0".into()));
        }
        if !(self.control.acceleration.is_finite() && self.control.acceleration > 0.0) {
            return Err(ConfigError::Invalid(
                "control.acceleration must be positive".into(),
            ));
        }
        if self.control.hysteresis_w < 0.0 {
            return Err(ConfigError::Invalid(
                "control.hysteresis_w must be non-negative".into(),
            ));
        }
        let (min_t, max_t) = (
            self.control.min_emergency_threshold,
            self.control.max_emergency_threshold,
        );
        if !(0.0..=1.0).contains(&min_t) || !(0.0..=1.0).contains(&max_t) || min_t > max_t {
            return Err(ConfigError::Invalid(
                "emergency thresholds must satisfy 0 <= min <= max <= 1".into(),
            ));
        }
        if self.meter.steps_per_day == 0 {
            return Err(ConfigError::Invalid("meter.steps_per_day must be > 0".into()));
        }
        if self.meter.tension_v <= 0.0 {
            return Err(ConfigError::Invalid("meter.tension_v must be > 0".into()));
        }
        if self.generator.output_w <= 0.0 || self.generator.tension_v <= 0.0 {
            return Err(ConfigError::Invalid(
                "generator output and tension must be > 0".into(),
            ));
        }
        let mut seen = std::collections::BTreeSet::new();
        for appliance in &self.appliances {
            if appliance.id.is_empty() {
                return Err(ConfigError::Invalid("appliance id must not be empty".into()));
            }
            if !seen.insert(appliance.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate appliance id \"{}\"",
                    appliance.id
                )));
            }
            if appliance.mode_w.is_empty()
                || appliance.mode_w.iter().any(|w| !w.is_finite() || *w < 0.0)
            {
                return Err(ConfigError::Invalid(format!(
                    "appliance \"{}\" has an invalid mode table",
                    appliance.id
                )));
            }
            let max_mode = appliance.mode_w.len() as u32;
            if appliance.initial_mode == 0 || appliance.initial_mode > max_mode {
                return Err(ConfigError::Invalid(format!(
                    "appliance \"{}\" initial mode {} out of range 1..={}",
                    appliance.id, appliance.initial_mode, max_mode
                )));
            }
        }
        Ok(())
    }
}
