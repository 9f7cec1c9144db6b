//! Monitor that measures visibility from rectangles.
//!
//! A [`Layout`] supplies the viewport and the bounds of each target. On every
//! `take_records` the [`GeometryMonitor`] applies the configured margin to the
//! viewport, computes each watched target's visible fraction and reports the
//! targets whose threshold state changed. A newly watched target is always
//! reported on its first measurement.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use kurbo::Rect;

use crate::geometry::touches;
use crate::{Monitor, MonitorConfig, Target, VisibilityEntry};

/// Source of geometry for a [`GeometryMonitor`].
pub trait Layout<K>: Send + Sync {
    fn viewport(&self) -> Rect;

    /// Current bounds of `target`, or `None` if it is not laid out.
    fn bounds(&self, target: &K) -> Option<Rect>;
}

struct Watched<K> {
    target: K,
    last: Option<bool>,
}

pub struct GeometryMonitor<K> {
    config: MonitorConfig,
    layout: Arc<dyn Layout<K>>,
    // watch order, so batches are reported deterministically
    watched: Vec<Watched<K>>,
}

impl<K: Target> GeometryMonitor<K> {
    pub fn new<L: Layout<K> + 'static>(config: &MonitorConfig, layout: Arc<L>) -> Self {
        Self {
            config: *config,
            layout,
            watched: Vec::new(),
        }
    }

    /// Factory closure for `VisibilityRegistry::new`.
    pub fn factory<L: Layout<K> + 'static>(
        layout: Arc<L>,
    ) -> impl Fn(&MonitorConfig) -> GeometryMonitor<K> + Send + Sync + 'static {
        move |config| GeometryMonitor::new(config, Arc::clone(&layout))
    }
}

impl<K: Target> Monitor for GeometryMonitor<K> {
    type Target = K;

    fn watch(&mut self, target: &K) {
        if !self.watched.iter().any(|w| &w.target == target) {
            self.watched.push(Watched {
                target: target.clone(),
                last: None,
            });
        }
    }

    fn unwatch(&mut self, target: &K) {
        self.watched.retain(|w| &w.target != target);
    }

    fn stop(&mut self) {
        self.watched.clear();
    }

    fn take_records(&mut self) -> Vec<VisibilityEntry<K>> {
        let root = self.config.margin.apply(self.layout.viewport());
        let mut records = Vec::new();

        for watched in &mut self.watched {
            let Some(bounds) = self.layout.bounds(&watched.target) else {
                continue;
            };

            let entry = measure(watched.target.clone(), bounds, root, self.config.threshold);
            if watched.last != Some(entry.is_intersecting) {
                watched.last = Some(entry.is_intersecting);
                records.push(entry);
            }
        }

        records
    }
}

fn measure<K>(target: K, bounds: Rect, root: Rect, threshold: f64) -> VisibilityEntry<K> {
    if !touches(bounds, root) {
        return VisibilityEntry {
            target,
            is_intersecting: false,
            intersection_ratio: 0.0,
            bounds,
            intersection: Rect::ZERO,
            root_bounds: root,
        };
    }

    let visible = bounds.intersect(root);
    let ratio = if bounds.area() == 0.0 {
        1.0
    } else {
        (visible.area() / bounds.area()).min(1.0)
    };
    VisibilityEntry {
        target,
        is_intersecting: threshold == 0.0 || ratio >= threshold,
        intersection_ratio: ratio,
        bounds,
        intersection: visible,
        root_bounds: root,
    }
}

/// In-memory [`Layout`]: a scrollable viewport over placed targets.
pub struct Scene<K> {
    inner: Mutex<SceneInner<K>>,
}

struct SceneInner<K> {
    viewport: Rect,
    bounds: HashMap<K, Rect>,
}

impl<K: Target> Scene<K> {
    pub fn new(viewport: Rect) -> Self {
        Self {
            inner: Mutex::new(SceneInner {
                viewport,
                bounds: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SceneInner<K>> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn place(&self, target: K, bounds: Rect) {
        self.lock().bounds.insert(target, bounds);
    }

    pub fn remove(&self, target: &K) {
        self.lock().bounds.remove(target);
    }

    /// Moves the viewport's top edge to `y`.
    pub fn scroll_to(&self, y: f64) {
        let mut inner = self.lock();
        inner.viewport = inner.viewport.with_origin((inner.viewport.x0, y));
    }

    pub fn set_viewport(&self, viewport: Rect) {
        self.lock().viewport = viewport;
    }
}

impl<K: Target> Layout<K> for Scene<K> {
    fn viewport(&self) -> Rect {
        self.lock().viewport
    }

    fn bounds(&self, target: &K) -> Option<Rect> {
        self.lock().bounds.get(target).copied()
    }
}
