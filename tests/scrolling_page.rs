//! End-to-end: element handles over a scrolling page measured by `GeometryMonitor`.

use std::sync::{Arc, Mutex};

use visibility_registry::{
    ElementRef, GeometryMonitor, ObserveOptions, ObserverError, ObserverEvent, ObserverOptions,
    Rect, Scene, VisibilityRegistry,
};

#[derive(Debug)]
struct Section {
    name: &'static str,
}

struct Page {
    sections: Vec<Arc<Section>>,
    scene: Arc<Scene<ElementRef<Section>>>,
}

/// Four 500px sections stacked under an 800x600 viewport.
fn page() -> Page {
    let scene = Arc::new(Scene::new(Rect::new(0.0, 0.0, 800.0, 600.0)));
    let sections: Vec<_> = ["hero", "about", "projects", "contact"]
        .into_iter()
        .map(|name| Arc::new(Section { name }))
        .collect();

    for (i, section) in sections.iter().enumerate() {
        scene.place(
            ElementRef::new(section),
            Rect::from_origin_size((0.0, i as f64 * 500.0), (800.0, 500.0)),
        );
    }

    Page { sections, scene }
}

type Revealed = Arc<Mutex<Vec<&'static str>>>;

fn observe_all(
    registry: &VisibilityRegistry<GeometryMonitor<ElementRef<Section>>>,
    page: &Page,
    options: ObserveOptions,
) -> Revealed {
    let revealed: Revealed = Arc::new(Mutex::new(Vec::new()));
    for section in &page.sections {
        let revealed = revealed.clone();
        let element = Arc::downgrade(section);
        registry
            .observe_with(
                ElementRef::new(section),
                move |_| {
                    if let Some(section) = element.upgrade() {
                        revealed.lock().unwrap().push(section.name);
                    }
                },
                options,
            )
            .unwrap();
    }
    revealed
}

#[test]
fn test_sections_reveal_once_while_scrolling() {
    let page = page();
    let registry =
        VisibilityRegistry::new(ObserverOptions::default(), GeometryMonitor::factory(page.scene.clone()))
            .unwrap();
    let revealed = observe_all(&registry, &page, ObserveOptions::default());

    // 600px viewport + 50px margin reaches into "about" (0..650 vs 500..1000).
    registry.flush();
    assert_eq!(*revealed.lock().unwrap(), ["hero", "about"]);
    assert_eq!(registry.len(), 2);

    page.scene.scroll_to(1000.0);
    registry.flush();
    assert_eq!(
        *revealed.lock().unwrap(),
        ["hero", "about", "projects", "contact"]
    );

    page.scene.scroll_to(0.0);
    registry.flush();
    assert_eq!(revealed.lock().unwrap().len(), 4);
    assert!(registry.is_empty());
}

#[test]
fn test_persistent_sections_fire_on_each_entry() {
    let page = page();
    let options = ObserverOptions {
        threshold: 0.5,
        margin: "0px".parse().unwrap(),
        once: false,
    };
    let registry =
        VisibilityRegistry::new(options, GeometryMonitor::factory(page.scene.clone())).unwrap();
    let revealed = observe_all(&registry, &page, ObserveOptions::default());

    registry.flush();
    assert_eq!(*revealed.lock().unwrap(), ["hero"]);

    page.scene.scroll_to(1200.0);
    registry.flush();
    page.scene.scroll_to(0.0);
    registry.flush();

    assert_eq!(
        *revealed.lock().unwrap(),
        ["hero", "projects", "contact", "hero"]
    );
    assert_eq!(registry.len(), 4);
}

#[test]
fn test_dropped_element_is_invalid_target() {
    let page = page();
    let registry = VisibilityRegistry::with_defaults(GeometryMonitor::factory(page.scene.clone()));

    let orphan = Arc::new(Section { name: "orphan" });
    let target = ElementRef::new(&orphan);
    drop(orphan);

    let err = registry.observe(target, |_| {}).unwrap_err();
    assert!(matches!(err, ObserverError::InvalidTarget { .. }));
    assert!(registry.is_empty());
    assert!(!registry.is_connected());

    assert!(matches!(
        registry.observe(ElementRef::detached(), |_| {}),
        Err(ObserverError::InvalidTarget { .. })
    ));
}

#[test]
fn test_equal_sections_are_distinct_targets() {
    let page = page();
    let registry = VisibilityRegistry::with_defaults(GeometryMonitor::factory(page.scene.clone()));

    let twin_a = Arc::new(Section { name: "twin" });
    let twin_b = Arc::new(Section { name: "twin" });
    assert_eq!(registry.observe(ElementRef::new(&twin_a), |_| {}), Ok(true));
    assert_eq!(registry.observe(ElementRef::new(&twin_b), |_| {}), Ok(true));
    assert_eq!(registry.observe(ElementRef::new(&twin_a), |_| {}), Ok(false));
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_flush_releases_dropped_sections() {
    let mut page = page();
    let registry =
        VisibilityRegistry::new(ObserverOptions::default(), GeometryMonitor::factory(page.scene.clone()))
            .unwrap();
    let revealed = observe_all(&registry, &page, ObserveOptions::default());

    let detached = Arc::new(Mutex::new(Vec::new()));
    let detached_clone = detached.clone();
    registry.set_trace_callback(move |event| {
        if let ObserverEvent::Detached { .. } = event {
            detached_clone.lock().unwrap().push(event.to_string());
        }
    });

    // "contact" is removed from the page before it was ever visible.
    let contact = page.sections.pop().unwrap();
    let contact_ref = ElementRef::new(&contact);
    drop(contact);
    assert!(registry.is_observed(&contact_ref));

    registry.flush();
    assert_eq!(*revealed.lock().unwrap(), ["hero", "about"]);
    assert!(!registry.is_observed(&contact_ref));
    assert_eq!(registry.len(), 1);
    assert_eq!(detached.lock().unwrap().len(), 1);

    // Scrolling to where "contact" was laid out delivers nothing for it.
    page.scene.scroll_to(1400.0);
    registry.flush();
    assert_eq!(
        *revealed.lock().unwrap(),
        ["hero", "about", "projects"]
    );
    assert!(registry.is_empty());
}
