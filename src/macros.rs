//! Macro for declaring a process-wide shared observer.

/// Declares a module holding one lazily created, process-wide
/// [`VisibilityRegistry`](crate::VisibilityRegistry).
///
/// The macro generates a module containing:
/// - The registry static (hidden), created on first access
/// - `instance()` / `instance_with(options)` accessors
/// - Free functions delegating to the instance
///
/// The factory expression is evaluated each time the registry (re)connects
/// its monitor. Paths inside it resolve from the invoking module.
///
/// # Examples
///
/// ```rust
/// use visibility_registry::{define_observer, ManualHandle, ManualMonitor, VisibilityEntry};
/// use std::sync::LazyLock;
///
/// static HOST: LazyLock<ManualHandle<u64>> = LazyLock::new(ManualHandle::new);
///
/// define_observer!(reveal, ManualMonitor<u64>, HOST.factory());
///
/// fn main() {
///     reveal::observe(1, |entry| println!("{:?} revealed", entry.target)).unwrap();
///     assert!(std::ptr::eq(reveal::instance(), reveal::instance()));
///
///     HOST.push(VisibilityEntry::entering(1, 1.0));
///     assert_eq!(reveal::flush(), 1);
///     assert!(!reveal::is_observed(&1));
/// }
/// ```
#[macro_export]
macro_rules! define_observer {
    ($name:ident, $monitor:ty, $factory:expr) => {
        pub mod $name {
            #[allow(unused_imports)]
            use super::*;

            use std::sync::OnceLock;

            use $crate::{
                ObserveOptions, ObserverError, ObserverEvent, ObserverOptions, VisibilityEntry,
                VisibilityRegistry,
            };

            type Target = <$monitor as $crate::Monitor>::Target;

            static INSTANCE: OnceLock<VisibilityRegistry<$monitor>> = OnceLock::new();

            /// The shared registry, created with default options on first use.
            pub fn instance() -> &'static VisibilityRegistry<$monitor> {
                INSTANCE.get_or_init(|| {
                    VisibilityRegistry::new_unchecked(ObserverOptions::default(), $factory)
                })
            }

            /// The shared registry, created with `options` if this is the first access.
            ///
            /// Options passed after the registry exists are validated but ignored.
            pub fn instance_with(
                options: ObserverOptions,
            ) -> Result<&'static VisibilityRegistry<$monitor>, ObserverError> {
                options.validate()?;
                Ok(INSTANCE.get_or_init(|| VisibilityRegistry::new_unchecked(options, $factory)))
            }

            /// Register a callback for a target.
            pub fn observe(
                target: Target,
                callback: impl Fn(&VisibilityEntry<Target>) + Send + Sync + 'static,
            ) -> Result<bool, ObserverError> {
                instance().observe(target, callback)
            }

            /// Register a callback with per-call options.
            pub fn observe_with(
                target: Target,
                callback: impl Fn(&VisibilityEntry<Target>) + Send + Sync + 'static,
                options: ObserveOptions,
            ) -> Result<bool, ObserverError> {
                instance().observe_with(target, callback, options)
            }

            /// Drop a target's registration.
            pub fn unobserve(target: &Target) -> bool {
                instance().unobserve(target)
            }

            /// Drop every registration and stop the monitor.
            pub fn disconnect() -> usize {
                instance().disconnect()
            }

            /// Dispatch a batch of records.
            pub fn deliver(entries: &[VisibilityEntry<Target>]) -> usize {
                instance().deliver(entries)
            }

            /// Pull pending records from the monitor and dispatch them.
            pub fn flush() -> usize {
                instance().flush()
            }

            pub fn is_observed(target: &Target) -> bool {
                instance().is_observed(target)
            }

            pub fn len() -> usize {
                instance().len()
            }

            /// Set a tracing callback for registry operations.
            pub fn set_trace_callback(callback: impl Fn(&ObserverEvent) + Send + Sync + 'static) {
                instance().set_trace_callback(callback)
            }

            /// Clear the tracing callback.
            pub fn clear_trace_callback() {
                instance().clear_trace_callback()
            }
        }
    };
}
