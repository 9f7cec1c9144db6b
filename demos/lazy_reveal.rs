//! Lazy reveal demo for visibility-registry.
//!
//! Demonstrates:
//! - A process-wide observer declared with `define_observer!`
//! - Element handles (`ElementRef`) measured by a `GeometryMonitor`
//! - One-shot reveals while a page scrolls, plus one persistent counter
//!
//! Run with: `RUST_LOG=debug cargo run --example lazy_reveal`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};

use tracing_subscriber::EnvFilter;
use visibility_registry::{
    define_observer, ElementRef, GeometryMonitor, ObserveOptions, Rect, Scene,
};

#[derive(Debug)]
pub struct Card {
    title: &'static str,
}

static PAGE: LazyLock<Arc<Scene<ElementRef<Card>>>> =
    LazyLock::new(|| Arc::new(Scene::new(Rect::new(0.0, 0.0, 1280.0, 720.0))));

define_observer!(
    reveal,
    GeometryMonitor<ElementRef<Card>>,
    GeometryMonitor::factory(PAGE.clone())
);

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}

fn main() {
    init_tracing();
    println!("=== visibility-registry: Lazy Reveal ===\n");

    // -------------------------------------------------------------------------
    // 1. Lay out a column of project cards
    // -------------------------------------------------------------------------
    let cards: Vec<Arc<Card>> = ["Compiler", "Portfolio", "Ray tracer", "Chess engine", "Blog"]
        .into_iter()
        .map(|title| Arc::new(Card { title }))
        .collect();

    for (i, card) in cards.iter().enumerate() {
        PAGE.place(
            ElementRef::new(card),
            Rect::from_origin_size((0.0, 200.0 + i as f64 * 400.0), (1280.0, 320.0)),
        );
    }
    println!("1. Placed {} cards", cards.len());

    // -------------------------------------------------------------------------
    // 2. Register one-shot reveals, and one persistent view counter
    // -------------------------------------------------------------------------
    for card in &cards {
        let weak = Arc::downgrade(card);
        let result = reveal::observe(ElementRef::new(card), move |entry| {
            if let Some(card) = weak.upgrade() {
                println!(
                    "   revealed {:<12} ({:.0}% visible)",
                    card.title,
                    entry.intersection_ratio * 100.0
                );
            }
        });
        if let Err(e) = result {
            eprintln!("   cannot observe card: {e}");
        }
    }

    let views = Arc::new(AtomicUsize::new(0));
    let footer = Arc::new(Card { title: "Footer" });
    PAGE.place(ElementRef::new(&footer), Rect::new(0.0, 2200.0, 1280.0, 2300.0));
    let views_clone = views.clone();
    let result = reveal::observe_with(
        ElementRef::new(&footer),
        move |_| {
            views_clone.fetch_add(1, Ordering::SeqCst);
        },
        ObserveOptions::once(false),
    );
    if let Err(e) = result {
        eprintln!("   cannot observe footer: {e}");
    }

    println!("2. Observing {} targets", reveal::len());

    // -------------------------------------------------------------------------
    // 3. Scroll down, back up, and down again
    // -------------------------------------------------------------------------
    println!("\n3. Scrolling...");
    for y in [0.0, 600.0, 1200.0, 1800.0, 0.0, 1800.0] {
        PAGE.scroll_to(y);
        println!("   scroll_to({y})");
        reveal::flush();
    }

    println!("\n   footer entered view {} times", views.load(Ordering::SeqCst));
    println!("   still observing {} target(s)", reveal::len());

    // -------------------------------------------------------------------------
    // 4. Teardown
    // -------------------------------------------------------------------------
    let released = reveal::disconnect();
    println!("\n4. Disconnected, released {released} registration(s)");
}
