use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Storage key of the visitor's selected audience segment.
pub const AUDIENCE_KEY: &str = "audienceType";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudienceSegment {
    Homeowner,
    Business,
    Contractor,
}

impl AudienceSegment {
    pub const ALL: [AudienceSegment; 3] = [
        AudienceSegment::Homeowner,
        AudienceSegment::Business,
        AudienceSegment::Contractor,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AudienceSegment::Homeowner => "homeowner",
            AudienceSegment::Business => "business",
            AudienceSegment::Contractor => "contractor",
        }
    }
}

impl fmt::Display for AudienceSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudienceSegment {
    type Err = PreferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AudienceSegment::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| PreferenceError::UnknownAudience(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreferenceError {
    StorageUnavailable,
    UnknownAudience(String),
    Io(String),
}

impl fmt::Display for PreferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreferenceError::StorageUnavailable => write!(f, "browser storage unavailable"),
            PreferenceError::UnknownAudience(v) => write!(f, "unknown audience segment {v:?}"),
            PreferenceError::Io(msg) => write!(f, "preference storage error: {msg}"),
        }
    }
}

impl std::error::Error for PreferenceError {}

pub trait PreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError>;
    fn remove(&mut self, key: &str) -> Result<(), PreferenceError>;
}

#[derive(Debug, Default)]
pub struct InMemoryPreferenceStore {
    values: BTreeMap<String, String>,
}

impl InMemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for InMemoryPreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PreferenceError> {
        self.values.remove(key);
        Ok(())
    }
}

/// The stored segment. Values that are not a known segment read as none.
pub fn stored_audience(
    store: &impl PreferenceStore,
) -> Result<Option<AudienceSegment>, PreferenceError> {
    let Some(raw) = store.get(AUDIENCE_KEY)? else {
        return Ok(None);
    };
    match raw.parse() {
        Ok(segment) => Ok(Some(segment)),
        Err(err) => {
            warn!(%err, "ignoring stored audience");
            Ok(None)
        }
    }
}

pub fn store_audience(
    store: &mut impl PreferenceStore,
    segment: AudienceSegment,
) -> Result<(), PreferenceError> {
    store.set(AUDIENCE_KEY, segment.as_str())
}

pub fn clear_audience(store: &mut impl PreferenceStore) -> Result<(), PreferenceError> {
    store.remove(AUDIENCE_KEY)
}

/// The segmentation screen is shown until a valid segment is stored; storage
/// errors count as "nothing stored".
pub fn should_show_audience_selection(store: &impl PreferenceStore) -> bool {
    match stored_audience(store) {
        Ok(segment) => segment.is_none(),
        Err(err) => {
            warn!(%err, "audience preference unreadable");
            true
        }
    }
}

#[cfg(target_arch = "wasm32")]
mod wasm_storage {
    use super::{PreferenceError, PreferenceStore};

    #[derive(Debug)]
    pub struct LocalStoragePreferenceStore {
        storage: web_sys::Storage,
    }

    impl LocalStoragePreferenceStore {
        pub fn new() -> Result<Self, PreferenceError> {
            Ok(Self {
                storage: window_local_storage()?,
            })
        }
    }

    impl PreferenceStore for LocalStoragePreferenceStore {
        fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
            self.storage
                .get_item(key)
                .map_err(|e| PreferenceError::Io(format!("get_item({key}) failed: {:?}", e)))
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError> {
            self.storage
                .set_item(key, value)
                .map_err(|e| PreferenceError::Io(format!("set_item({key}) failed: {:?}", e)))
        }

        fn remove(&mut self, key: &str) -> Result<(), PreferenceError> {
            self.storage
                .remove_item(key)
                .map_err(|e| PreferenceError::Io(format!("remove_item({key}) failed: {:?}", e)))
        }
    }

    fn window_local_storage() -> Result<web_sys::Storage, PreferenceError> {
        let win = web_sys::window().ok_or(PreferenceError::StorageUnavailable)?;
        win.local_storage()
            .map_err(|e| PreferenceError::Io(format!("localStorage error: {:?}", e)))?
            .ok_or(PreferenceError::StorageUnavailable)
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm_storage::LocalStoragePreferenceStore;

#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug)]
pub struct LocalStoragePreferenceStore;

#[cfg(not(target_arch = "wasm32"))]
impl LocalStoragePreferenceStore {
    pub fn new() -> Result<Self, PreferenceError> {
        Err(PreferenceError::StorageUnavailable)
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl PreferenceStore for LocalStoragePreferenceStore {
    fn get(&self, _key: &str) -> Result<Option<String>, PreferenceError> {
        Err(PreferenceError::StorageUnavailable)
    }

    fn set(&mut self, _key: &str, _value: &str) -> Result<(), PreferenceError> {
        Err(PreferenceError::StorageUnavailable)
    }

    fn remove(&mut self, _key: &str) -> Result<(), PreferenceError> {
        Err(PreferenceError::StorageUnavailable)
    }
}
