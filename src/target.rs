//! Target identity.
//!
//! Registrations are keyed by *identity*, not by value: two distinct elements
//! with equal contents are two targets. [`ElementRef`] provides that for
//! shared elements by comparing allocation addresses; plain identifiers such
//! as `u64` or `String` can be used when the host already has stable ids.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

/// Something a monitor can watch.
pub trait Target: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Whether the target still refers to a live element.
    ///
    /// Detached targets are rejected by `observe`.
    fn is_attached(&self) -> bool {
        true
    }
}

macro_rules! impl_target_for_ids {
    ($($ty:ty),* $(,)?) => {
        $(impl Target for $ty {})*
    };
}

impl_target_for_ids!(u32, u64, usize, String, &'static str);

/// Weak, identity-compared handle to a shared element.
///
/// The handle does not keep the element alive. Once every `Arc` to the
/// element is dropped the handle reports itself as detached.
pub struct ElementRef<E> {
    element: Weak<E>,
}

impl<E> ElementRef<E> {
    pub fn new(element: &Arc<E>) -> Self {
        Self {
            element: Arc::downgrade(element),
        }
    }

    /// A handle that never pointed at a live element.
    pub fn detached() -> Self {
        Self {
            element: Weak::new(),
        }
    }

    pub fn upgrade(&self) -> Option<Arc<E>> {
        self.element.upgrade()
    }

    fn addr(&self) -> usize {
        self.element.as_ptr() as usize
    }
}

impl<E> Clone for ElementRef<E> {
    fn clone(&self) -> Self {
        Self {
            element: self.element.clone(),
        }
    }
}

impl<E> PartialEq for ElementRef<E> {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.element, &other.element)
    }
}

impl<E> Eq for ElementRef<E> {}

impl<E> Hash for ElementRef<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl<E> fmt::Debug for ElementRef<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementRef({:#x})", self.addr())
    }
}

impl<E: Send + Sync + 'static> Target for ElementRef<E> {
    fn is_attached(&self) -> bool {
        self.element.strong_count() > 0
    }
}

impl<E> From<&Arc<E>> for ElementRef<E> {
    fn from(element: &Arc<E>) -> Self {
        Self::new(element)
    }
}
