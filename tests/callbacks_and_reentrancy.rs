//! Callback isolation and callbacks that call back into the registry.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use visibility_registry::{
    ManualHandle, ManualMonitor, ObserveOptions, ObserverEvent, ObserverOptions, VisibilityEntry,
    VisibilityRegistry,
};

type Registry = VisibilityRegistry<ManualMonitor<&'static str>>;

fn setup() -> (Arc<Registry>, ManualHandle<&'static str>) {
    let handle = ManualHandle::new();
    let registry = VisibilityRegistry::new(ObserverOptions::default(), handle.factory()).unwrap();
    (Arc::new(registry), handle)
}

#[test]
fn test_panicking_callback_does_not_block_batch() {
    let (registry, handle) = setup();
    let b_hits = Arc::new(AtomicUsize::new(0));
    let b_hits_clone = b_hits.clone();

    registry.observe("a", |_| panic!("broken widget")).unwrap();
    registry
        .observe("b", move |_| {
            b_hits_clone.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    handle.push_all([
        VisibilityEntry::entering("a", 1.0),
        VisibilityEntry::entering("b", 1.0),
    ]);
    assert_eq!(registry.flush(), 2);

    assert_eq!(b_hits.load(Ordering::SeqCst), 1);
    // One-shot bookkeeping ran for both, including the one that panicked.
    assert!(registry.is_empty());
    assert!(handle.watched().is_empty());
}

#[test]
fn test_panicking_callback_is_reported() {
    let (registry, _handle) = setup();
    let events = Arc::new(Mutex::new(Vec::new()));
    let events_clone = events.clone();
    registry.set_trace_callback(move |event| {
        if let ObserverEvent::CallbackPanicked { .. } = event {
            events_clone.lock().unwrap().push(event.to_string());
        }
    });

    registry
        .observe_with("a", |_| panic!("boom"), ObserveOptions::once(false))
        .unwrap();
    registry.deliver(&[VisibilityEntry::entering("a", 1.0)]);

    let captured = events.lock().unwrap();
    assert_eq!(
        *captured,
        ["callback panicked { target: \"a\", message: boom }"]
    );
    // Persistent registrations survive a panic.
    assert!(registry.is_observed(&"a"));
}

#[test]
fn test_callback_unobserving_later_target_in_same_batch() {
    let (registry, _handle) = setup();
    let b_hits = Arc::new(AtomicUsize::new(0));
    let b_hits_clone = b_hits.clone();

    let inner = Arc::clone(&registry);
    registry
        .observe("a", move |_| {
            inner.unobserve(&"b");
        })
        .unwrap();
    registry
        .observe("b", move |_| {
            b_hits_clone.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    let invoked = registry.deliver(&[
        VisibilityEntry::entering("a", 1.0),
        VisibilityEntry::entering("b", 1.0),
    ]);

    assert_eq!(invoked, 1);
    assert_eq!(b_hits.load(Ordering::SeqCst), 0);
    assert!(registry.is_empty());
}

#[test]
fn test_callback_observing_new_target() {
    let (registry, handle) = setup();
    let late_hits = Arc::new(AtomicUsize::new(0));

    let inner = Arc::clone(&registry);
    let late_hits_clone = late_hits.clone();
    registry
        .observe("header", move |_| {
            let hits = late_hits_clone.clone();
            inner
                .observe("footer", move |_| {
                    hits.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        })
        .unwrap();

    // The footer record arrives in the same batch, after header registered it.
    let invoked = registry.deliver(&[
        VisibilityEntry::entering("header", 1.0),
        VisibilityEntry::entering("footer", 1.0),
    ]);

    assert_eq!(invoked, 2);
    assert_eq!(late_hits.load(Ordering::SeqCst), 1);
    assert!(registry.is_empty());
    assert!(handle.watched().is_empty());
}

#[test]
fn test_callback_disconnecting_registry() {
    let (registry, handle) = setup();
    let inner = Arc::clone(&registry);
    registry
        .observe("a", move |_| {
            inner.disconnect();
        })
        .unwrap();
    registry.observe("b", |_| panic!("never delivered")).unwrap();

    let invoked = registry.deliver(&[
        VisibilityEntry::entering("a", 1.0),
        VisibilityEntry::entering("b", 1.0),
    ]);

    assert_eq!(invoked, 1);
    assert!(registry.is_empty());
    assert!(!registry.is_connected());
    assert!(handle.is_stopped());
}

#[test]
fn test_unregistered_records_are_skipped() {
    let (registry, handle) = setup();
    handle.push(VisibilityEntry::entering("ghost", 1.0));
    // No monitor yet: nothing to flush.
    assert_eq!(registry.flush(), 0);

    assert_eq!(
        registry.deliver(&[VisibilityEntry::entering("ghost", 1.0)]),
        0
    );
}

#[test]
fn test_concurrent_deliver_invokes_one_shot_once() {
    let (registry, handle) = setup();
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_clone = hits.clone();
    registry
        .observe("hero", move |_| {
            // Keep the first delivery in flight while the other thread runs.
            thread::sleep(Duration::from_millis(50));
            hits_clone.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let workers: Vec<_> = (0..2)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.deliver(&[VisibilityEntry::entering("hero", 1.0)])
            })
        })
        .collect();
    let invoked: usize = workers.into_iter().map(|w| w.join().unwrap()).sum();

    assert_eq!(invoked, 1);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(registry.is_empty());
    assert!(handle.watched().is_empty());
}

#[test]
fn test_one_shot_is_released_before_its_callback_runs() {
    let (registry, _handle) = setup();
    let seen_registered = Arc::new(Mutex::new(None));

    let inner = Arc::clone(&registry);
    let seen = seen_registered.clone();
    registry
        .observe("a", move |_| {
            *seen.lock().unwrap() = Some(inner.is_observed(&"a"));
        })
        .unwrap();
    registry.deliver(&[VisibilityEntry::entering("a", 1.0)]);

    assert_eq!(*seen_registered.lock().unwrap(), Some(false));
}
