// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory config store for tests that should not touch the filesystem.

use std::collections::BTreeMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use echo_phys::config::{ConfigError, ConfigService, ConfigStore};
use echo_phys::{PhysicsConfig, PHYSICS_CONFIG_KEY};

/// Store operation that can be made to fail.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Fault {
    /// `load_raw` returns an I/O error.
    Load,
    /// `save_raw` returns an I/O error and stores nothing.
    Save,
}

/// [`ConfigStore`] over a shared map of JSON blobs.
///
/// Clones share state, so a test can hand one clone to a `ConfigService`
/// (or a simulation setup) and inspect it through another.
///
/// # Example
///
/// ```
/// use echo_phys::{ConfigService, PhysicsConfig};
/// use echo_phys_dry_tests::InMemoryConfigStore;
///
/// let tuned = PhysicsConfig { max_fragment_depth: 4, ..PhysicsConfig::default() };
/// let store = InMemoryConfigStore::with_physics(&tuned).unwrap();
/// assert_eq!(ConfigService::new(store.clone()).load_physics().unwrap(), tuned);
/// assert_eq!(store.loads(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryConfigStore {
    shelf: Arc<Mutex<Shelf>>,
}

#[derive(Debug, Default)]
struct Shelf {
    blobs: BTreeMap<String, Vec<u8>>,
    loads: usize,
    saves: usize,
    fault: Option<Fault>,
}

impl InMemoryConfigStore {
    /// Empty store: every key is missing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding raw `json` under `key`, valid or not.
    pub fn with_json(key: &str, json: &str) -> Self {
        let store = Self::new();
        store
            .shelf()
            .blobs
            .insert(key.to_owned(), json.as_bytes().to_vec());
        store
    }

    /// Store holding `config` under [`PHYSICS_CONFIG_KEY`], written through
    /// [`ConfigService::save`]. The save is not counted.
    pub fn with_physics(config: &PhysicsConfig) -> Result<Self, ConfigError> {
        let store = Self::new();
        ConfigService::new(store.clone()).save(PHYSICS_CONFIG_KEY, config)?;
        store.shelf().saves = 0;
        Ok(store)
    }

    fn shelf(&self) -> MutexGuard<'_, Shelf> {
        self.shelf.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Makes `fault` fail from now on; `None` heals the store.
    pub fn inject(&self, fault: Option<Fault>) {
        self.shelf().fault = fault;
    }

    /// `load_raw` calls so far, failed ones included.
    pub fn loads(&self) -> usize {
        self.shelf().loads
    }

    /// `save_raw` calls so far, failed ones included.
    pub fn saves(&self) -> usize {
        self.shelf().saves
    }

    /// Stored blob for `key` as text.
    pub fn text(&self, key: &str) -> Option<String> {
        self.shelf()
            .blobs
            .get(key)
            .map(|raw| String::from_utf8_lossy(raw).into_owned())
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        let mut shelf = self.shelf();
        shelf.loads += 1;
        if shelf.fault == Some(Fault::Load) {
            return Err(io::Error::other(format!("injected load fault for {key}")).into());
        }
        shelf.blobs.get(key).cloned().ok_or(ConfigError::NotFound)
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let mut shelf = self.shelf();
        shelf.saves += 1;
        if shelf.fault == Some(Fault::Save) {
            return Err(io::Error::other(format!("injected save fault for {key}")).into());
        }
        shelf.blobs.insert(key.to_owned(), data.to_vec());
        Ok(())
    }
}
