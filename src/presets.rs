//! Named height presets.
//!
//! [`PresetStore`] keeps a name → [`Preset`] map, validates every height
//! against the configured bounds and, when given a path, rewrites a JSON
//! file after each successful mutation.  The controller only sees it through
//! the [`PresetLookup`] port.
//!
//! Reads take the critical-section lock just long enough to clone.  Mutations
//! are serialized by a separate writer lock that is held across the file
//! write, so concurrent writers never overwrite each other's changes.

use core::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::{info, warn};
use parking_lot::Mutex as WriterLock;
use serde::{Deserialize, Serialize};

use crate::app::ports::{PresetError, PresetLookup};
use crate::config::HeightBounds;

const MAX_NAME_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    #[serde(alias = "height")]
    pub height_mm: i32,
}

impl Preset {
    pub fn new(name: impl Into<String>, height_mm: i32) -> Self {
        Self {
            name: name.into(),
            height_mm,
        }
    }
}

/// Presets every fresh store starts with.
pub fn default_presets() -> Vec<Preset> {
    vec![Preset::new("Standing", 1050), Preset::new("Sitting", 680)]
}

type PresetMap = BTreeMap<String, Preset>;

pub struct PresetStore {
    presets: Mutex<CriticalSectionRawMutex, RefCell<PresetMap>>,
    writer: WriterLock<()>,
    bounds: HeightBounds,
    path: Option<PathBuf>,
}

impl PresetStore {
    /// In-memory store holding the default presets.
    pub fn with_defaults(bounds: HeightBounds) -> Self {
        let map = default_presets()
            .into_iter()
            .filter(|p| bounds.contains(p.height_mm))
            .map(|p| (p.name.clone(), p))
            .collect();
        Self::from_map(map, bounds, None)
    }

    /// Load presets from `path`, falling back to the defaults when the file
    /// does not exist yet.  Entries with unusable heights are skipped.
    pub fn load(path: impl AsRef<Path>, bounds: HeightBounds) -> Result<Self, PresetError> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("presets: {} not found, using defaults", path.display());
                let mut store = Self::with_defaults(bounds);
                store.path = Some(path.to_path_buf());
                return Ok(store);
            }
            Err(e) => {
                warn!("presets: reading {} failed: {}", path.display(), e);
                return Err(PresetError::IoError);
            }
        };

        let list: Vec<Preset> = serde_json::from_str(&text).map_err(|e| {
            warn!("presets: {} is not valid: {}", path.display(), e);
            PresetError::Corrupted
        })?;

        let mut map = PresetMap::new();
        for p in list {
            if let Err(e) = bounds.check(p.height_mm) {
                warn!("presets: skipping '{}': {}", p.name, e);
                continue;
            }
            if map.contains_key(&p.name) {
                warn!("presets: skipping duplicate '{}'", p.name);
                continue;
            }
            map.insert(p.name.clone(), p);
        }
        info!("presets: loaded {} from {}", map.len(), path.display());
        Ok(Self::from_map(map, bounds, Some(path.to_path_buf())))
    }

    fn from_map(map: PresetMap, bounds: HeightBounds, path: Option<PathBuf>) -> Self {
        Self {
            presets: Mutex::new(RefCell::new(map)),
            writer: WriterLock::new(()),
            bounds,
            path,
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// All presets, sorted by name.
    pub fn list(&self) -> Vec<Preset> {
        self.presets.lock(|m| m.borrow().values().cloned().collect())
    }

    pub fn get(&self, name: &str) -> Result<Preset, PresetError> {
        self.presets
            .lock(|m| m.borrow().get(name).cloned())
            .ok_or_else(|| PresetError::NotFound(name.to_owned()))
    }

    // ── Mutations ─────────────────────────────────────────────

    pub fn add(&self, name: &str, height_mm: i32) -> Result<Preset, PresetError> {
        check_name(name)?;
        self.bounds.check(height_mm)?;
        let preset = Preset::new(name, height_mm);
        self.mutate(|map| {
            if map.contains_key(name) {
                return Err(PresetError::Duplicate(name.to_owned()));
            }
            map.insert(name.to_owned(), preset.clone());
            Ok(preset.clone())
        })
    }

    pub fn remove(&self, name: &str) -> Result<Preset, PresetError> {
        self.mutate(|map| {
            map.remove(name)
                .ok_or_else(|| PresetError::NotFound(name.to_owned()))
        })
    }

    pub fn update_height(&self, name: &str, height_mm: i32) -> Result<Preset, PresetError> {
        self.bounds.check(height_mm)?;
        self.mutate(|map| {
            let entry = map
                .get_mut(name)
                .ok_or_else(|| PresetError::NotFound(name.to_owned()))?;
            entry.height_mm = height_mm;
            Ok(entry.clone())
        })
    }

    /// Apply `f` to a copy of the map, persist it, then commit, all under the
    /// writer lock.  A failed write leaves the in-memory presets untouched.
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut PresetMap) -> Result<T, PresetError>,
    ) -> Result<T, PresetError> {
        let _writer = self.writer.lock();
        let mut next = self.presets.lock(|m| m.borrow().clone());
        let out = f(&mut next)?;
        self.persist(&next)?;
        self.presets.lock(|m| *m.borrow_mut() = next);
        Ok(out)
    }

    fn persist(&self, map: &PresetMap) -> Result<(), PresetError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let list: Vec<&Preset> = map.values().collect();
        let json = serde_json::to_string_pretty(&list).map_err(|_| PresetError::IoError)?;
        std::fs::write(path, json).map_err(|e| {
            warn!("presets: writing {} failed: {}", path.display(), e);
            PresetError::IoError
        })
    }
}

impl PresetLookup for PresetStore {
    fn lookup(&self, name: &str) -> Option<Preset> {
        self.get(name).ok()
    }
}

fn check_name(name: &str) -> Result<(), PresetError> {
    let ok = !name.trim().is_empty()
        && name.len() <= MAX_NAME_LEN
        && !name.chars().any(char::is_control);
    if ok { Ok(()) } else { Err(PresetError::InvalidName) }
}
