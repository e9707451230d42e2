use std::rc::Rc;
use std::sync::Arc;

/// Decides whether a freshly computed state is interchangeable with the last
/// rendered one, which lets a setter skip requesting a new pass.
pub trait EquivalencePolicy<S> {
    fn equivalent(&self, a: &S, b: &S) -> bool;
}

/// Value equality through `PartialEq`. Default for `use_state`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralEquality;

impl<S: PartialEq> EquivalencePolicy<S> for StructuralEquality {
    fn equivalent(&self, a: &S, b: &S) -> bool {
        a == b
    }
}

/// Pointer identity for shared handles.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferentialEquality;

impl<T: ?Sized> EquivalencePolicy<Rc<T>> for ReferentialEquality {
    fn equivalent(&self, a: &Rc<T>, b: &Rc<T>) -> bool {
        Rc::ptr_eq(a, b)
    }
}

impl<T: ?Sized> EquivalencePolicy<Arc<T>> for ReferentialEquality {
    fn equivalent(&self, a: &Arc<T>, b: &Arc<T>) -> bool {
        Arc::ptr_eq(a, b)
    }
}

/// Every write counts as a change.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverEqual;

impl<S> EquivalencePolicy<S> for NeverEqual {
    fn equivalent(&self, _a: &S, _b: &S) -> bool {
        false
    }
}
