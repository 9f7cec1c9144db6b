use kurbo::Rect;

/// One visibility-change record reported by a monitor.
///
/// Only records with `is_intersecting == true` reach callbacks; leaving
/// records are used by monitors and by the registry's trace output only.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityEntry<K> {
    pub target: K,
    /// Whether the target currently satisfies the monitor's threshold.
    pub is_intersecting: bool,
    /// Visible fraction of the target's area, `0.0..=1.0`.
    pub intersection_ratio: f64,
    pub bounds: Rect,
    pub intersection: Rect,
    /// The viewport after the margin was applied.
    pub root_bounds: Rect,
}

impl<K> VisibilityEntry<K> {
    /// A record reporting `target` as visible with the given ratio.
    pub fn entering(target: K, intersection_ratio: f64) -> Self {
        Self {
            target,
            is_intersecting: true,
            intersection_ratio,
            bounds: Rect::ZERO,
            intersection: Rect::ZERO,
            root_bounds: Rect::ZERO,
        }
    }

    /// A record reporting `target` as no longer visible.
    pub fn leaving(target: K) -> Self {
        Self {
            target,
            is_intersecting: false,
            intersection_ratio: 0.0,
            bounds: Rect::ZERO,
            intersection: Rect::ZERO,
            root_bounds: Rect::ZERO,
        }
    }
}
