//! Viewport margins.
//!
//! Rectangles are [`kurbo::Rect`]s (`x0, y0, x1, y1`). A [`Margin`] grows (positive lengths) or shrinks (negative lengths) the
//! viewport before intersection is computed, so targets can be reported a
//! little before or after they actually scroll into view. Margins are written
//! the same way as CSS box shorthands:
//!
//! ```rust
//! use visibility_registry::{Length, Margin};
//!
//! let margin: Margin = "10px 5%".parse().unwrap();
//! assert_eq!(margin.top, Length::Px(10.0));
//! assert_eq!(margin.left, Length::Percent(5.0));
//! assert_eq!(margin.to_string(), "10px 5% 10px 5%");
//! ```

use std::fmt;
use std::str::FromStr;

use kurbo::{Insets, Rect};
use serde::{Deserialize, Serialize};

use crate::ObserverError;

/// Whether `a` and `b` overlap or share an edge.
///
/// Unlike `a.intersect(b).area() > 0.0`, edge contact counts.
pub(crate) fn touches(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

/// One side of a [`Margin`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
    Px(f64),
    /// Percentage of the viewport's width (left/right) or height (top/bottom).
    Percent(f64),
}

impl Length {
    /// Resolves to pixels against the viewport dimension this side applies to.
    pub fn resolve(&self, reference: f64) -> f64 {
        match self {
            Length::Px(px) => *px,
            Length::Percent(pct) => reference * pct / 100.0,
        }
    }
}

impl Default for Length {
    fn default() -> Self {
        Length::Px(0.0)
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Length::Px(px) => write!(f, "{px}px"),
            Length::Percent(pct) => write!(f, "{pct}%"),
        }
    }
}

impl FromStr for Length {
    type Err = ObserverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ObserverError::InvalidMargin(s.to_string());

        let (number, ctor): (&str, fn(f64) -> Length) = if let Some(n) = s.strip_suffix("px") {
            (n, Length::Px)
        } else if let Some(n) = s.strip_suffix('%') {
            (n, Length::Percent)
        } else if s.parse::<f64>().ok() == Some(0.0) {
            // unitless zero only
            (s, Length::Px)
        } else {
            return Err(invalid());
        };

        let value: f64 = number.parse().map_err(|_| invalid())?;
        if !value.is_finite() {
            return Err(invalid());
        }
        Ok(ctor(value))
    }
}

/// Viewport margin in CSS shorthand order: top, right, bottom, left.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Margin {
    pub top: Length,
    pub right: Length,
    pub bottom: Length,
    pub left: Length,
}

impl Margin {
    /// Same length on all four sides.
    pub const fn uniform(length: Length) -> Self {
        Self {
            top: length,
            right: length,
            bottom: length,
            left: length,
        }
    }

    pub const fn px(px: f64) -> Self {
        Self::uniform(Length::Px(px))
    }

    /// Resolves the four sides against `viewport`'s size.
    ///
    /// Percentages on top/bottom refer to the height, on left/right to the width.
    pub fn insets(&self, viewport: Rect) -> Insets {
        Insets::new(
            self.left.resolve(viewport.width()),
            self.top.resolve(viewport.height()),
            self.right.resolve(viewport.width()),
            self.bottom.resolve(viewport.height()),
        )
    }

    /// Grows `viewport` by this margin; negative lengths shrink it, down to
    /// zero size.
    ///
    /// ```rust
    /// use visibility_registry::{Margin, Rect};
    ///
    /// let root = Margin::px(50.0).apply(Rect::new(0.0, 0.0, 200.0, 100.0));
    /// assert_eq!(root, Rect::new(-50.0, -50.0, 250.0, 150.0));
    /// ```
    pub fn apply(&self, viewport: Rect) -> Rect {
        let root = viewport + self.insets(viewport);
        Rect::new(root.x0, root.y0, root.x1.max(root.x0), root.y1.max(root.y0))
    }
}

impl fmt::Display for Margin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.top == self.right && self.top == self.bottom && self.top == self.left {
            write!(f, "{}", self.top)
        } else {
            write!(
                f,
                "{} {} {} {}",
                self.top, self.right, self.bottom, self.left
            )
        }
    }
}

impl FromStr for Margin {
    type Err = ObserverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split_whitespace()
            .map(str::parse::<Length>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ObserverError::InvalidMargin(s.to_string()))?;

        let (top, right, bottom, left) = match parts.as_slice() {
            [all] => (*all, *all, *all, *all),
            [vertical, horizontal] => (*vertical, *horizontal, *vertical, *horizontal),
            [top, horizontal, bottom] => (*top, *horizontal, *bottom, *horizontal),
            [top, right, bottom, left] => (*top, *right, *bottom, *left),
            _ => return Err(ObserverError::InvalidMargin(s.to_string())),
        };

        Ok(Margin {
            top,
            right,
            bottom,
            left,
        })
    }
}

impl TryFrom<String> for Margin {
    type Error = ObserverError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Margin> for String {
    fn from(margin: Margin) -> Self {
        margin.to_string()
    }
}
