//! # Visibility Registry
//!
//! A shared viewport-visibility observation registry: many independent
//! "notify me when this element becomes visible" requests multiplexed onto
//! one visibility monitor, with at-most-once delivery for one-shot
//! registrations.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use visibility_registry::{
//!     ElementRef, GeometryMonitor, ObserverOptions, Rect, Scene, VisibilityRegistry,
//! };
//!
//! struct Card;
//!
//! let card = Arc::new(Card);
//! let target = ElementRef::new(&card);
//!
//! let scene = Arc::new(Scene::new(Rect::new(0.0, 0.0, 800.0, 600.0)));
//! scene.place(target.clone(), Rect::new(0.0, 900.0, 800.0, 1200.0));
//!
//! let registry = VisibilityRegistry::new(
//!     ObserverOptions::default(),
//!     GeometryMonitor::factory(scene.clone()),
//! )
//! .unwrap();
//! registry.observe(target.clone(), |entry| println!("revealed at {:.2}", entry.intersection_ratio)).unwrap();
//!
//! assert_eq!(registry.flush(), 0); // below the fold
//! scene.scroll_to(500.0);
//! assert_eq!(registry.flush(), 1);
//! assert!(!registry.is_observed(&target)); // one-shot by default
//! ```
//!
//! ## Pieces
//!
//! - [`VisibilityRegistry`] - target → callback map, dispatch, one-shot bookkeeping
//! - [`Monitor`] - the visibility primitive the registry wraps
//! - [`GeometryMonitor`] - monitor computing visibility from a [`Layout`]
//! - [`ManualMonitor`] - monitor fed by host glue through a [`ManualHandle`]
//! - [`define_observer!`] - process-wide shared instance with free functions
//! - [`ObserverOptions`] - threshold, margin and default one-shot policy
//!
//! Geometry uses [`kurbo`]'s `Rect` (`x0, y0, x1, y1`), re-exported here.

mod entry;
mod error;
mod event;
mod geometry;
mod macros;
mod manual;
mod monitor;
mod options;
mod registry;
mod target;
mod viewport;

pub use entry::VisibilityEntry;
pub use error::ObserverError;
pub use event::ObserverEvent;
pub use geometry::{Length, Margin};
pub use kurbo::{Insets, Rect};
pub use manual::{ManualHandle, ManualMonitor};
pub use monitor::{Monitor, MonitorFactory};
pub use options::{
    MonitorConfig, ObserveOptions, ObserverOptions, DEFAULT_MARGIN, DEFAULT_ONCE,
    DEFAULT_THRESHOLD,
};
pub use registry::{TraceCallback, VisibilityCallback, VisibilityRegistry};
pub use target::{ElementRef, Target};
pub use viewport::{GeometryMonitor, Layout, Scene};
