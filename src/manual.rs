//! Push-driven monitor.
//!
//! [`ManualMonitor`] does no measuring of its own: host glue (a platform
//! visibility callback, a test) pushes records through a [`ManualHandle`] and
//! the registry picks them up on the next `flush`. The handle also exposes
//! what the monitor was told, which makes lifecycle behaviour observable.
//!
//! ```rust
//! use visibility_registry::{ManualHandle, ObserverOptions, VisibilityEntry, VisibilityRegistry};
//!
//! let handle = ManualHandle::<u64>::new();
//! let registry = VisibilityRegistry::new(ObserverOptions::default(), handle.factory()).unwrap();
//!
//! registry.observe(1, |entry| println!("{:?} is visible", entry.target)).unwrap();
//! assert!(handle.is_watching(&1));
//!
//! handle.push(VisibilityEntry::entering(1, 1.0));
//! assert_eq!(registry.flush(), 1);
//! assert!(!handle.is_watching(&1)); // one-shot by default
//! ```

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{Monitor, MonitorConfig, Target, VisibilityEntry};

struct Shared<K> {
    watched: HashSet<K>,
    queued: Vec<VisibilityEntry<K>>,
    config: Option<MonitorConfig>,
    connections: usize,
    stopped: bool,
}

/// Cloneable control handle shared by every monitor built from [`ManualHandle::factory`].
pub struct ManualHandle<K> {
    shared: Arc<Mutex<Shared<K>>>,
}

impl<K> Clone for ManualHandle<K> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<K: Target> Default for ManualHandle<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Target> ManualHandle<K> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                watched: HashSet::new(),
                queued: Vec::new(),
                config: None,
                connections: 0,
                stopped: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared<K>> {
        self.shared.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Monitor factory to hand to `VisibilityRegistry::new`.
    pub fn factory(&self) -> impl Fn(&MonitorConfig) -> ManualMonitor<K> + Send + Sync + 'static {
        let handle = self.clone();
        move |config| {
            let mut shared = handle.lock();
            shared.connections += 1;
            shared.config = Some(*config);
            shared.stopped = false;
            shared.watched.clear();
            drop(shared);

            ManualMonitor {
                handle: handle.clone(),
            }
        }
    }

    /// Queues a record for the next `take_records`.
    ///
    /// Records are reported as pushed, even for targets that are not watched.
    pub fn push(&self, entry: VisibilityEntry<K>) {
        self.lock().queued.push(entry);
    }

    pub fn push_all(&self, entries: impl IntoIterator<Item = VisibilityEntry<K>>) {
        self.lock().queued.extend(entries);
    }

    pub fn watched(&self) -> Vec<K> {
        self.lock().watched.iter().cloned().collect()
    }

    pub fn is_watching(&self, target: &K) -> bool {
        self.lock().watched.contains(target)
    }

    /// How many monitors the factory has built.
    pub fn connections(&self) -> usize {
        self.lock().connections
    }

    /// Configuration of the most recently connected monitor.
    pub fn config(&self) -> Option<MonitorConfig> {
        self.lock().config
    }

    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }
}

/// Monitor whose records come from a [`ManualHandle`].
pub struct ManualMonitor<K> {
    handle: ManualHandle<K>,
}

impl<K: Target> Monitor for ManualMonitor<K> {
    type Target = K;

    fn watch(&mut self, target: &K) {
        self.handle.lock().watched.insert(target.clone());
    }

    fn unwatch(&mut self, target: &K) {
        self.handle.lock().watched.remove(target);
    }

    fn stop(&mut self) {
        let mut shared = self.handle.lock();
        shared.watched.clear();
        shared.queued.clear();
        shared.stopped = true;
    }

    fn take_records(&mut self) -> Vec<VisibilityEntry<K>> {
        std::mem::take(&mut self.handle.lock().queued)
    }
}
