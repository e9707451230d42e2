use std::cell::RefCell;
use std::rc::Rc;

use crate::instance::{ComponentInstance, InstanceInner};

// Thread-local stack of instances whose body is currently running.
thread_local! {
    static INSTANCE_STACK: RefCell<Vec<Rc<InstanceInner>>> = const { RefCell::new(Vec::new()) };
}

/// Guard that pops the instance stack on drop.
#[must_use = "InstanceScopeGuard pops the instance stack on drop"]
pub struct InstanceScopeGuard;

impl Drop for InstanceScopeGuard {
    fn drop(&mut self) {
        INSTANCE_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Makes `instance` the current instance until the returned guard drops.
pub fn enter(instance: &ComponentInstance) -> InstanceScopeGuard {
    INSTANCE_STACK.with(|stack| {
        stack.borrow_mut().push(instance.clone_inner());
    });
    InstanceScopeGuard
}

/// Runs `f` with the innermost rendering instance, or returns `None` when no
/// body is running on this thread.
pub fn try_with_instance<R>(f: impl FnOnce(&ComponentInstance) -> R) -> Option<R> {
    let inner = INSTANCE_STACK.with(|stack| stack.borrow().last().cloned())?;
    let instance = ComponentInstance::from_inner(inner);
    Some(f(&instance))
}

/// Depth of nested invocations on this thread.
pub fn depth() -> usize {
    INSTANCE_STACK.with(|stack| stack.borrow().len())
}
