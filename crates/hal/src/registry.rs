//! Process-wide driver registry.
//!
//! Maps a driver identifier string to a factory capable of producing a
//! [`Driver`] instance. Registration is expected to happen once at startup,
//! so a single mutex around the map is enough; factories themselves run
//! outside the lock because they may block on native library loading.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::driver::{Driver, DriverOptions};
use crate::error::HalError;

/// Factory invoked by [`DriverRegistry::create`]. Receives the identifier it
/// was registered under and the caller's options.
pub type DriverFactory =
    Arc<dyn Fn(&str, &DriverOptions) -> Result<Arc<dyn Driver>, HalError> + Send + Sync>;

/// Named-factory map with process lifetime.
pub struct DriverRegistry {
    factories: Mutex<HashMap<String, DriverFactory>>,
}

impl DriverRegistry {
    /// Creates an empty registry. Most callers want [`registry`] instead;
    /// this constructor exists so tests can work against isolated state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: Mutex::new(HashMap::new()),
        }
    }

    /// Registers `factory` under `id`. Fails if `id` is already taken.
    pub fn register(&self, id: &str, factory: DriverFactory) -> Result<(), HalError> {
        if id.is_empty() {
            return Err(HalError::InvalidArgument(
                "driver identifier must not be empty",
            ));
        }
        let mut factories = self.factories.lock();
        if factories.contains_key(id) {
            return Err(HalError::AlreadyRegistered(id.to_owned()));
        }
        factories.insert(id.to_owned(), factory);
        Ok(())
    }

    /// Removes the factory registered under `id`.
    pub fn unregister(&self, id: &str) -> Result<(), HalError> {
        match self.factories.lock().remove(id) {
            Some(_) => Ok(()),
            None => Err(HalError::NotFound(format!("driver '{id}' is not registered"))),
        }
    }

    /// Instantiates the driver registered under `id`, propagating the
    /// factory's result verbatim.
    pub fn create(&self, id: &str, options: &DriverOptions) -> Result<Arc<dyn Driver>, HalError> {
        // Clone the factory out so the map is unlocked while it runs; a
        // factory may block inside native driver initialization.
        let factory = {
            let factories = self.factories.lock();
            factories
                .get(id)
                .cloned()
                .ok_or_else(|| HalError::NotFound(format!("driver '{id}' is not registered")))?
        };
        factory(id, options)
    }

    /// Sorted snapshot of the registered driver identifiers.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.lock().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-global registry. Populated by backend registration calls at
/// startup and torn down with the process.
pub fn registry() -> &'static DriverRegistry {
    static REGISTRY: OnceLock<DriverRegistry> = OnceLock::new();
    REGISTRY.get_or_init(DriverRegistry::new)
}
