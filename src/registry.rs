//! Shared visibility registry.
//!
//! Many independent "call me when this becomes visible" requests are
//! multiplexed onto a single [`Monitor`]. Each target is registered at most
//! once; one-shot registrations are dropped (and unwatched) right after their
//! first delivery.
//!
//! # Examples
//!
//! ```
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use visibility_registry::{ManualHandle, ObserverOptions, VisibilityEntry, VisibilityRegistry};
//!
//! let handle = ManualHandle::<&'static str>::new();
//! let registry = VisibilityRegistry::new(ObserverOptions::default(), handle.factory()).unwrap();
//!
//! let seen = Arc::new(AtomicUsize::new(0));
//! let counter = seen.clone();
//! registry
//!     .observe("gallery", move |_| {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!     })
//!     .unwrap();
//!
//! registry.deliver(&[VisibilityEntry::entering("gallery", 0.4)]);
//! registry.deliver(&[VisibilityEntry::entering("gallery", 0.9)]);
//!
//! assert_eq!(seen.load(Ordering::SeqCst), 1);
//! assert!(!registry.is_observed(&"gallery"));
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{
    Monitor, MonitorConfig, MonitorFactory, ObserveOptions, ObserverError, ObserverEvent,
    ObserverOptions, Target, VisibilityEntry,
};

/// Callback invoked with the record that made its target visible.
pub type VisibilityCallback<K> = dyn Fn(&VisibilityEntry<K>) + Send + Sync + 'static;

/// Type alias for the user-supplied tracing callback.
///
/// The callback receives every [`ObserverEvent`] the registry emits. It runs
/// without any registry lock held.
pub type TraceCallback = dyn Fn(&ObserverEvent) + Send + Sync + 'static;

struct Registration<K> {
    once: bool,
    callback: Arc<VisibilityCallback<K>>,
}

struct State<M: Monitor> {
    registrations: HashMap<M::Target, Registration<M::Target>>,
    monitor: Option<M>,
}

/// What `deliver` decided for one record while holding the lock.
enum Claim<K> {
    Unregistered,
    NotIntersecting,
    Invoke {
        callback: Arc<VisibilityCallback<K>>,
        expired: bool,
    },
}

/// Registry of (target → callback) sharing one lazily connected monitor.
///
/// The monitor is created on the first successful `observe` and dropped by
/// `disconnect`; the next `observe` after a disconnect connects a fresh one.
pub struct VisibilityRegistry<M: Monitor> {
    options: ObserverOptions,
    factory: Box<MonitorFactory<M>>,
    state: Mutex<State<M>>,
    trace: Mutex<Option<Arc<TraceCallback>>>,
}

impl<M: Monitor> VisibilityRegistry<M> {
    /// Creates a registry; no monitor is connected until the first `observe`.
    ///
    /// # Errors
    ///
    /// - `InvalidThreshold` when `options.threshold` is outside `0.0..=1.0`
    pub fn new(
        options: ObserverOptions,
        factory: impl Fn(&MonitorConfig) -> M + Send + Sync + 'static,
    ) -> Result<Self, ObserverError> {
        options.validate()?;
        Ok(Self::new_unchecked(options, factory))
    }

    /// Registry with the default options (threshold 0.1, margin 50px, one-shot).
    pub fn with_defaults(factory: impl Fn(&MonitorConfig) -> M + Send + Sync + 'static) -> Self {
        Self::new_unchecked(ObserverOptions::default(), factory)
    }

    /// Used by `define_observer!` after validating `options` itself.
    #[doc(hidden)]
    pub fn new_unchecked(
        options: ObserverOptions,
        factory: impl Fn(&MonitorConfig) -> M + Send + Sync + 'static,
    ) -> Self {
        Self {
            options,
            factory: Box::new(factory),
            state: Mutex::new(State {
                registrations: HashMap::new(),
                monitor: None,
            }),
            trace: Mutex::new(None),
        }
    }

    /// The options this registry was created with.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use visibility_registry::{ManualHandle, ObserverOptions, VisibilityRegistry};
    ///
    /// let handle = ManualHandle::<u32>::new();
    /// let registry = VisibilityRegistry::with_defaults(handle.factory());
    /// assert_eq!(registry.options(), &ObserverOptions::default());
    /// ```
    pub fn options(&self) -> &ObserverOptions {
        &self.options
    }

    // The lock is never held across user code, so poisoning can only come from
    // a panicking monitor; the map itself stays consistent either way.
    fn lock(&self) -> MutexGuard<'_, State<M>> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    // -------------------------------------------------------------------------------------------------
    // Tracing
    // -------------------------------------------------------------------------------------------------

    /// Sets a tracing callback invoked for every registry operation.
    pub fn set_trace_callback(&self, callback: impl Fn(&ObserverEvent) + Send + Sync + 'static) {
        let mut guard = self.trace.lock().unwrap_or_else(|p| p.into_inner());
        *guard = Some(Arc::new(callback));
    }

    /// Clears the tracing callback.
    pub fn clear_trace_callback(&self) {
        let mut guard = self.trace.lock().unwrap_or_else(|p| p.into_inner());
        *guard = None;
    }

    /// Builds and emits an event only when a callback is installed.
    fn emit_event(&self, event: impl FnOnce() -> ObserverEvent) {
        let callback = self
            .trace
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone();
        if let Some(callback) = callback {
            callback(&event());
        }
    }

    // -------------------------------------------------------------------------------------------------
    // Registrations
    // -------------------------------------------------------------------------------------------------

    /// Registers `callback` for `target` with the registry's default policy.
    ///
    /// Returns `Ok(false)` when `target` is already registered; the existing
    /// callback is kept.
    ///
    /// # Errors
    ///
    /// - `InvalidTarget` when the target is detached
    pub fn observe(
        &self,
        target: M::Target,
        callback: impl Fn(&VisibilityEntry<M::Target>) + Send + Sync + 'static,
    ) -> Result<bool, ObserverError> {
        self.observe_with(target, callback, ObserveOptions::default())
    }

    /// Like [`observe`](Self::observe) with per-call options.
    ///
    /// `options.once` overrides the default policy for this registration.
    /// `threshold` and `margin` must match the shared monitor's configuration.
    ///
    /// # Errors
    ///
    /// - `InvalidTarget` when the target is detached
    /// - `InvalidThreshold` / `ConflictingOptions` for unusable overrides
    pub fn observe_with(
        &self,
        target: M::Target,
        callback: impl Fn(&VisibilityEntry<M::Target>) + Send + Sync + 'static,
        options: ObserveOptions,
    ) -> Result<bool, ObserverError> {
        if !target.is_attached() {
            return Err(ObserverError::InvalidTarget {
                target: format!("{target:?}"),
            });
        }

        let config = self.options.monitor_config();
        options.check_against(&config)?;
        let once = options.once.unwrap_or(self.options.once);

        let (added, connected) = {
            let mut guard = self.lock();
            let state = &mut *guard;

            if state.registrations.contains_key(&target) {
                (false, false)
            } else {
                let connected = state.monitor.is_none();
                state
                    .monitor
                    .get_or_insert_with(|| (self.factory)(&config))
                    .watch(&target);

                state.registrations.insert(
                    target.clone(),
                    Registration {
                        once,
                        callback: Arc::new(callback),
                    },
                );
                (true, connected)
            }
        };

        if connected {
            tracing::debug!(threshold = config.threshold, margin = %config.margin, "monitor connected");
            self.emit_event(|| ObserverEvent::Connect);
        }
        tracing::debug!(element = ?target, added, once, "observe");
        self.emit_event(|| ObserverEvent::Observe {
            target: format!("{target:?}"),
            added,
        });

        Ok(added)
    }

    /// Drops `target`'s registration and stops watching it.
    ///
    /// Unknown targets are a no-op. Returns whether a registration existed.
    pub fn unobserve(&self, target: &M::Target) -> bool {
        let found = {
            let mut guard = self.lock();
            let state = &mut *guard;
            let found = state.registrations.remove(target).is_some();
            if let Some(monitor) = state.monitor.as_mut() {
                monitor.unwatch(target);
            }
            found
        };

        tracing::debug!(element = ?target, found, "unobserve");
        self.emit_event(|| ObserverEvent::Unobserve {
            target: format!("{target:?}"),
            found,
        });
        found
    }

    /// Clears every registration and stops the monitor.
    ///
    /// The registry stays usable: the next `observe` connects a new monitor.
    /// Returns the number of registrations released.
    pub fn disconnect(&self) -> usize {
        let released = {
            let mut guard = self.lock();
            let state = &mut *guard;
            let released = state.registrations.len();
            state.registrations.clear();
            if let Some(mut monitor) = state.monitor.take() {
                monitor.stop();
            }
            released
        };

        tracing::debug!(released, "monitor disconnected");
        self.emit_event(|| ObserverEvent::Disconnect { released });
        released
    }

    /// Whether `target` currently has a registration.
    ///
    /// One-shot registrations stop being observed as soon as their record is
    /// claimed for delivery, before the callback runs.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use visibility_registry::{ManualHandle, VisibilityRegistry};
    ///
    /// let handle = ManualHandle::<u32>::new();
    /// let registry = VisibilityRegistry::with_defaults(handle.factory());
    /// registry.observe(1, |_| {}).unwrap();
    /// assert!(registry.is_observed(&1));
    /// assert!(!registry.is_observed(&2));
    /// ```
    pub fn is_observed(&self, target: &M::Target) -> bool {
        self.lock().registrations.contains_key(target)
    }

    /// Number of registered targets.
    pub fn len(&self) -> usize {
        self.lock().registrations.len()
    }

    /// Whether no target is registered. A connected monitor may still exist.
    pub fn is_empty(&self) -> bool {
        self.lock().registrations.is_empty()
    }

    /// Whether a monitor is currently connected.
    pub fn is_connected(&self) -> bool {
        self.lock().monitor.is_some()
    }

    // -------------------------------------------------------------------------------------------------
    // Dispatch
    // -------------------------------------------------------------------------------------------------

    /// Pulls pending records from the monitor and delivers them.
    ///
    /// Targets that are no longer attached (dropped elements) are released
    /// and unwatched first, so their records are never delivered.
    ///
    /// Returns the number of callbacks invoked.
    pub fn flush(&self) -> usize {
        let (detached, records) = {
            let mut guard = self.lock();
            let state = &mut *guard;
            let Some(monitor) = state.monitor.as_mut() else {
                return 0;
            };

            let mut detached = Vec::new();
            state.registrations.retain(|target, _| {
                if target.is_attached() {
                    true
                } else {
                    detached.push(target.clone());
                    false
                }
            });
            for target in &detached {
                monitor.unwatch(target);
            }
            (detached, monitor.take_records())
        };

        for target in &detached {
            tracing::debug!(element = ?target, "detached target released");
            self.emit_event(|| ObserverEvent::Detached {
                target: format!("{target:?}"),
            });
        }

        self.deliver(&records)
    }

    /// Dispatches one batch of records.
    ///
    /// Records are handled in order. A record reaches its callback only when
    /// its target is registered at that moment and the record reports the
    /// target as intersecting. A one-shot registration is removed (and
    /// unwatched) in the same step that claims it, before its callback runs,
    /// so concurrent `deliver` calls invoke it at most once and a panicking
    /// callback still leaves it removed. Callbacks may call back into the
    /// registry.
    ///
    /// Returns the number of callbacks invoked.
    pub fn deliver(&self, entries: &[VisibilityEntry<M::Target>]) -> usize {
        let mut invoked = 0;

        for entry in entries {
            let (callback, expired) = match self.claim(entry) {
                Claim::Unregistered => {
                    tracing::trace!(element = ?entry.target, "record for unregistered target skipped");
                    continue;
                }
                Claim::NotIntersecting => {
                    self.emit_event(|| ObserverEvent::Deliver {
                        target: format!("{:?}", entry.target),
                        invoked: false,
                    });
                    continue;
                }
                Claim::Invoke { callback, expired } => (callback, expired),
            };

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback(entry)));
            invoked += 1;

            if let Err(payload) = outcome {
                let message = panic_message(&*payload);
                tracing::error!(element = ?entry.target, %message, "visibility callback panicked");
                self.emit_event(|| ObserverEvent::CallbackPanicked {
                    target: format!("{:?}", entry.target),
                    message,
                });
            }

            self.emit_event(|| ObserverEvent::Deliver {
                target: format!("{:?}", entry.target),
                invoked: true,
            });

            if expired {
                tracing::debug!(element = ?entry.target, "one-shot registration expired");
                self.emit_event(|| ObserverEvent::Expire {
                    target: format!("{:?}", entry.target),
                });
            }
        }

        invoked
    }

    /// Looks up the registration for `entry` and, for a one-shot delivery,
    /// removes it under the same lock.
    fn claim(&self, entry: &VisibilityEntry<M::Target>) -> Claim<M::Target> {
        let mut guard = self.lock();
        let state = &mut *guard;

        let Some(registration) = state.registrations.get(&entry.target) else {
            return Claim::Unregistered;
        };
        if !entry.is_intersecting {
            return Claim::NotIntersecting;
        }

        let callback = Arc::clone(&registration.callback);
        let expired = registration.once;
        if expired {
            state.registrations.remove(&entry.target);
            if let Some(monitor) = state.monitor.as_mut() {
                monitor.unwatch(&entry.target);
            }
        }
        Claim::Invoke { callback, expired }
    }
}

impl<M: Monitor> fmt::Debug for VisibilityRegistry<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("VisibilityRegistry")
            .field("options", &self.options)
            .field("registrations", &state.registrations.len())
            .field("connected", &state.monitor.is_some())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// -------------------------------------------------------------------------------------------------
// Tests
// -------------------------------------------------------------------------------------------------
