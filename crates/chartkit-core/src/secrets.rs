//! Generated secrets and their persisted state
//!
//! Component credentials are generated once per identity and then read back
//! from state on every later build, so re-rendering a component never changes
//! a password that a running release already uses.
//!
//! # How it works
//!
//! 1. First build: `SecretGenerator` draws a value from its `SecretSource`
//!    and records it in `SecretState` under the identity key
//! 2. The CLI saves the state file when it is dirty
//! 3. Later builds load the state and get the recorded value back
//! 4. `rotate` is the only way to replace a recorded value

use chrono::{DateTime, Utc};
use rand::distr::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::Result;

// =============================================================================
// SOURCES
// =============================================================================

/// Source of random secret material
///
/// Values are drawn from `[a-zA-Z0-9]`.
pub trait SecretSource: Send {
    fn alphanumeric(&mut self, length: usize) -> String;
}

fn sample_alphanumeric(rng: &mut StdRng, length: usize) -> String {
    rng.sample_iter(Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Source seeded from the operating system RNG
#[derive(Debug)]
pub struct OsRandom {
    rng: StdRng,
}

impl OsRandom {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_rng(&mut rand::rng()),
        }
    }
}

impl Default for OsRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretSource for OsRandom {
    fn alphanumeric(&mut self, length: usize) -> String {
        sample_alphanumeric(&mut self.rng, length)
    }
}

/// Deterministic source for tests and reproducible renders
#[derive(Debug)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl SecretSource for SeededRandom {
    fn alphanumeric(&mut self, length: usize) -> String {
        sample_alphanumeric(&mut self.rng, length)
    }
}

// =============================================================================
// SECRET ENTRY
// =============================================================================

/// A generated secret with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretEntry {
    value: String,

    /// When this secret was first generated
    pub created_at: DateTime<Utc>,

    /// When this secret was last rotated (if ever)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotated_at: Option<DateTime<Utc>>,

    /// The length of the secret
    pub length: usize,
}

impl SecretEntry {
    pub fn new(value: String) -> Self {
        Self {
            length: value.len(),
            value,
            created_at: Utc::now(),
            rotated_at: None,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn rotate(&mut self, new_value: String) {
        self.length = new_value.len();
        self.value = new_value;
        self.rotated_at = Some(Utc::now());
    }
}

// Timestamps are bookkeeping, not identity
impl PartialEq for SecretEntry {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.length == other.length
    }
}

// =============================================================================
// SECRET STATE
// =============================================================================

/// All generated secrets, keyed by identity (`<namespace>/<instance>/<purpose>`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecretState {
    /// Schema version for future migrations
    #[serde(default)]
    pub version: u32,

    #[serde(default)]
    secrets: BTreeMap<String, SecretEntry>,

    /// Whether anything changed since load (not persisted)
    #[serde(skip)]
    dirty: bool,
}

impl SecretState {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            secrets: BTreeMap::new(),
            dirty: false,
        }
    }

    /// Load state from a JSON file, or start empty if it does not exist yet
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write state as JSON, creating parent directories, and mark it clean
    pub fn save(&mut self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        self.dirty = false;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&SecretEntry> {
        self.secrets.get(key)
    }

    pub fn get_value(&self, key: &str) -> Option<&str> {
        self.secrets.get(key).map(|e| e.value())
    }

    pub fn insert(&mut self, key: String, entry: SecretEntry) {
        self.secrets.insert(key, entry);
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    /// Replace the value of an existing secret, returns false if unknown
    pub fn rotate(&mut self, key: &str, new_value: String) -> bool {
        match self.secrets.get_mut(key) {
            Some(entry) => {
                entry.rotate(new_value);
                self.dirty = true;
                true
            }
            None => false,
        }
    }
}

impl PartialEq for SecretState {
    fn eq(&self, other: &SecretState) -> bool {
        self.version == other.version && self.secrets == other.secrets
    }
}

// =============================================================================
// SECRET GENERATOR
// =============================================================================

/// Idempotent secret generation over a `SecretState`
pub struct SecretGenerator {
    state: SecretState,
    source: Box<dyn SecretSource>,
}

impl SecretGenerator {
    /// Empty state, OS-seeded source
    pub fn new() -> Self {
        Self::with_state(SecretState::new())
    }

    /// Existing state, OS-seeded source
    pub fn with_state(state: SecretState) -> Self {
        Self::with_source(state, OsRandom::new())
    }

    /// Existing state, caller-provided source
    pub fn with_source(state: SecretState, source: impl SecretSource + 'static) -> Self {
        Self {
            state,
            source: Box::new(source),
        }
    }

    /// Return the recorded secret for `key`, generating it on first use
    pub fn get_or_generate(&mut self, key: &str, length: usize) -> String {
        if let Some(entry) = self.state.get(key) {
            return entry.value().to_string();
        }

        let value = self.source.alphanumeric(length);
        self.state.insert(key.to_string(), SecretEntry::new(value.clone()));
        value
    }

    /// Replace a recorded secret with a fresh value of the same length
    pub fn rotate(&mut self, key: &str) -> Option<String> {
        let length = self.state.get(key)?.length;
        let new_value = self.source.alphanumeric(length);
        self.state.rotate(key, new_value.clone());
        Some(new_value)
    }

    pub fn state(&self) -> &SecretState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SecretState {
        &mut self.state
    }

    pub fn into_state(self) -> SecretState {
        self.state
    }

    pub fn is_dirty(&self) -> bool {
        self.state.is_dirty()
    }
}

impl Default for SecretGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SecretGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretGenerator")
            .field("secrets", &self.state.len())
            .field("dirty", &self.state.is_dirty())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
