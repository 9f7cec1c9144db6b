//! The visibility-monitoring primitive the registry multiplexes onto.
//!
//! A monitor is connected once with a [`MonitorConfig`] and then told which
//! targets to watch. Visibility changes are handed back to the registry as
//! batches of [`VisibilityEntry`] records, either pulled with
//! [`Monitor::take_records`] (see `VisibilityRegistry::flush`) or pushed by
//! host glue through `VisibilityRegistry::deliver`.
//!
//! Monitor methods run while the registry holds its internal lock and must
//! not call back into the registry.

use crate::{MonitorConfig, Target, VisibilityEntry};

pub trait Monitor {
    type Target: Target;

    /// Starts watching `target`. Called at most once per registration.
    fn watch(&mut self, target: &Self::Target);

    /// Stops watching `target`. Unknown targets are ignored.
    fn unwatch(&mut self, target: &Self::Target);

    /// Stops watching everything. The monitor is dropped right after.
    fn stop(&mut self);

    /// Drains the records that accumulated since the last call.
    fn take_records(&mut self) -> Vec<VisibilityEntry<Self::Target>> {
        Vec::new()
    }
}

/// Builds a fresh monitor each time the registry (re)connects.
pub type MonitorFactory<M> = dyn Fn(&MonitorConfig) -> M + Send + Sync + 'static;
