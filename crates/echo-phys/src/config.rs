// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Simulation configuration, plus the config service and storage port used to
//! persist it.

use echo_phys_geom::Vec3;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

/// Key under which [`PhysicsConfig`] is stored.
pub const PHYSICS_CONFIG_KEY: &str = "physics";

/// Storage port for raw config blobs (keyed by logical name).
pub trait ConfigStore {
    /// Load a raw config blob. Returns `NotFound` when missing.
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Persist a raw config blob.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Error type for config operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Key not present in store.
    #[error("not found")]
    NotFound,
    /// I/O error while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization/deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// A loaded value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
    /// Catch-all error variant.
    #[error("other: {0}")]
    Other(String),
}

/// Thin service that serializes config values and delegates storage to a `ConfigStore`.
pub struct ConfigService<S> {
    store: S,
}

impl<S> ConfigService<S> {
    /// Create a new service using the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Consume the service and return the inner store.
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S> ConfigService<S>
where
    S: ConfigStore,
{
    /// Load and deserialize a config value for `key`. Returns `Ok(None)` if missing.
    pub fn load<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: DeserializeOwned,
    {
        match self.store.load_raw(key) {
            Ok(bytes) => {
                if bytes.is_empty() {
                    return Ok(None);
                }
                let value = serde_json::from_slice(&bytes)?;
                Ok(Some(value))
            }
            Err(ConfigError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Serialize and persist a config value for `key`.
    pub fn save<T>(&self, key: &str, value: &T) -> Result<(), ConfigError>
    where
        T: Serialize,
    {
        let data = serde_json::to_vec_pretty(value)?;
        self.store.save_raw(key, &data)
    }

    /// Loads the physics config, falling back to defaults when absent.
    ///
    /// # Errors
    /// Propagates store/serde failures and [`ConfigError::Invalid`] from
    /// [`PhysicsConfig::validate`].
    pub fn load_physics(&self) -> Result<PhysicsConfig, ConfigError> {
        let config = self
            .load::<PhysicsConfig>(PHYSICS_CONFIG_KEY)?
            .unwrap_or_default();
        config.validate()?;
        Ok(config)
    }
}

/// Gravity vector as stored on disk (`{ "x": .., "y": .., "z": .. }`).
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gravity {
    /// X component (m/s²).
    pub x: f32,
    /// Y component (m/s²).
    pub y: f32,
    /// Z component (m/s²).
    pub z: f32,
}

impl Default for Gravity {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: -9.81,
            z: 0.0,
        }
    }
}

impl From<Gravity> for Vec3 {
    fn from(g: Gravity) -> Self {
        Vec3::new(g.x, g.y, g.z)
    }
}

/// Recognized simulation options. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PhysicsConfig {
    /// World gravity.
    pub gravity: Gravity,
    /// Maximum engine sub-steps per `step`.
    pub max_sub_steps: u32,
    /// Engine fixed time step in seconds.
    pub fixed_time_step: f32,
    /// Impulse a contact must exceed to fracture a breakable body.
    pub fracture_impulse_threshold: f32,
    /// Fracture generations allowed below an original object.
    pub max_fragment_depth: u32,
    /// Delay before fresh debris becomes breakable again.
    pub fragment_cooldown_ms: u64,
    /// Piece count requested from the subdivision service.
    pub fragment_count_hint: u32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Gravity::default(),
            max_sub_steps: 1,
            fixed_time_step: 1.0 / 60.0,
            fracture_impulse_threshold: 5.0,
            max_fragment_depth: 2,
            fragment_cooldown_ms: 2500,
            fragment_count_hint: 4,
        }
    }
}

impl PhysicsConfig {
    /// Checks ranges the engine cannot work with.
    ///
    /// # Errors
    /// [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_sub_steps == 0 {
            return Err(ConfigError::Invalid("maxSubSteps must be at least 1".into()));
        }
        if !(self.fixed_time_step.is_finite() && self.fixed_time_step > 0.0) {
            return Err(ConfigError::Invalid(
                "fixedTimeStep must be a positive number of seconds".into(),
            ));
        }
        if !Vec3::from(self.gravity).is_finite() {
            return Err(ConfigError::Invalid("gravity must be finite".into()));
        }
        if !self.fracture_impulse_threshold.is_finite() {
            return Err(ConfigError::Invalid(
                "fractureImpulseThreshold must be finite".into(),
            ));
        }
        Ok(())
    }

    /// Largest frame delta (seconds) the engine can integrate without
    /// dropping time.
    #[allow(clippy::cast_precision_loss)]
    pub fn max_frame_seconds(&self) -> f32 {
        self.fixed_time_step * self.max_sub_steps as f32
    }
}
