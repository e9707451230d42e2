#![doc = r"Core runtime for call-order state hooks: per-instance hook storage, per-hook update queues and deterministic state resolution."]

pub mod action;
pub mod collections;
pub mod config;
mod dispatcher;
mod error;
mod hook_store;
mod instance;
pub mod instance_context;
pub mod platform;
pub mod policy;
pub mod runtime;
pub mod update_queue;

pub use action::{basic_reducer, Action, Reducer};
pub use config::{RuntimeConfig, DEFAULT_PROCESS_ROUND_LIMIT, DEFAULT_REENTRANT_PASS_LIMIT};
pub use dispatcher::{mount_state, update_state, Dispatcher, Initial, Setter};
pub use error::{HookError, OrderViolation};
pub use hook_store::{HookDebugEntry, HookId};
pub use instance::{ComponentInstance, InstanceId};
pub use platform::Renderer;
pub use policy::{EquivalencePolicy, NeverEqual, ReferentialEquality, StructuralEquality};
pub use runtime::{DefaultRenderer, Runtime, RuntimeHandle};

#[cfg(test)]
pub use runtime::TestRenderer;

pub use instance_context::try_with_instance as try_with_current_instance;

/// Runs `f` with the instance whose body is executing on this thread.
pub fn with_current_instance<R>(
    f: impl FnOnce(&ComponentInstance) -> Result<R, HookError>,
) -> Result<R, HookError> {
    instance_context::try_with_instance(f).unwrap_or(Err(HookError::NoActiveInstance))
}

/// State hook of the current instance, initialised with `value` on mount.
///
/// Returns the state as of this pass and the hook's setter. Must be called
/// unconditionally and in the same order on every pass.
pub fn use_state<S: Clone + PartialEq + 'static>(value: S) -> Result<(S, Setter<S>), HookError> {
    with_current_instance(|instance| instance.use_state(Initial::Value(value)))
}

/// Like [`use_state`], with the initial value computed once on mount.
pub fn use_state_with<S: Clone + PartialEq + 'static>(
    init: impl FnOnce() -> S + 'static,
) -> Result<(S, Setter<S>), HookError> {
    with_current_instance(|instance| instance.use_state(Initial::lazy(init)))
}

/// Like [`use_state`], with a custom notion of "unchanged" for the eager
/// bail-out.
pub fn use_state_with_policy<S, P>(
    initial: impl Into<Initial<S>>,
    policy: P,
) -> Result<(S, Setter<S>), HookError>
where
    S: Clone + 'static,
    P: EquivalencePolicy<S> + 'static,
{
    with_current_instance(|instance| instance.use_state_with_policy(initial, policy))
}

#[cfg(test)]
#[path = "tests/hook_store_tests.rs"]
mod hook_store_tests;

#[cfg(test)]
#[path = "tests/update_queue_tests.rs"]
mod update_queue_tests;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod runtime_tests;
