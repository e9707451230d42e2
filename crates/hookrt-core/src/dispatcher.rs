//! State hook entry points: mount, update and the setter.

use std::any::{type_name, Any};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::action::{Action, Reducer};
use crate::error::{HookError, OrderViolation};
use crate::hook_store::HookSlot;
use crate::instance::{ComponentInstance, InstanceInner};
use crate::policy::{EquivalencePolicy, StructuralEquality};
use crate::update_queue::{EagerState, SharedQueue, UpdateId, UpdateQueue};

/// Which half of the state hook contract a pass runs. Chosen once per pass:
/// `Mount` until the instance completes its first pass, `Update` afterwards.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Dispatcher {
    Mount,
    Update,
}

impl Dispatcher {
    pub fn use_state<S, P>(
        self,
        instance: &ComponentInstance,
        initial: impl Into<Initial<S>>,
        policy: P,
    ) -> Result<(S, Setter<S>), HookError>
    where
        S: Clone + 'static,
        P: EquivalencePolicy<S> + 'static,
    {
        match self {
            Dispatcher::Mount => mount_state(instance, initial.into(), policy),
            Dispatcher::Update => update_state(instance),
        }
    }
}

/// Initial value of a state hook: given directly, or produced lazily by a
/// function that runs once, on mount.
pub enum Initial<S> {
    Value(S),
    Lazy(Box<dyn FnOnce() -> S>),
}

impl<S> Initial<S> {
    pub fn lazy(init: impl FnOnce() -> S + 'static) -> Self {
        Initial::Lazy(Box::new(init))
    }

    fn resolve(self) -> S {
        match self {
            Initial::Value(value) => value,
            Initial::Lazy(init) => init(),
        }
    }
}

impl<S> From<S> for Initial<S> {
    fn from(value: S) -> Self {
        Initial::Value(value)
    }
}

struct Staged<S> {
    state: S,
    through: Option<UpdateId>,
}

pub(crate) struct StateHook<S> {
    memoized_state: S,
    base_state: S,
    queue: SharedQueue<S>,
    setter: Setter<S>,
    staged: Option<Staged<S>>,
}

impl<S: Clone + 'static> StateHook<S> {
    fn new(initial: S, queue: SharedQueue<S>, setter: Setter<S>) -> Self {
        Self {
            memoized_state: initial.clone(),
            base_state: initial,
            queue,
            setter,
            staged: None,
        }
    }

    pub(crate) fn memoized_state(&self) -> &S {
        &self.memoized_state
    }
}

impl<S: Clone + 'static> HookSlot for StateHook<S> {
    fn pending_updates(&self) -> usize {
        self.queue.borrow().len()
    }

    fn commit(&mut self) -> usize {
        let Some(staged) = self.staged.take() else {
            return 0;
        };
        self.memoized_state = staged.state.clone();
        self.base_state = staged.state.clone();
        let mut queue = self.queue.borrow_mut();
        queue.set_last_rendered_state(staged.state);
        staged
            .through
            .map(|through| queue.consume_through(through))
            .unwrap_or(0)
    }

    fn discard_staged(&mut self) {
        self.staged = None;
    }

    fn release(&mut self) {
        self.staged = None;
        self.queue.borrow_mut().detach();
    }

    fn state_type_name(&self) -> &'static str {
        type_name::<S>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn rendering_instance(instance: &ComponentInstance) -> Result<&Rc<InstanceInner>, HookError> {
    let inner = instance.inner();
    if inner.is_unmounted() {
        return Err(HookError::InstanceUnmounted {
            instance: inner.id(),
        });
    }
    if !inner.is_rendering() {
        return Err(HookError::NoActiveInstance);
    }
    Ok(inner)
}

/// Creates the hook for the next call site of a mounting pass.
pub fn mount_state<S, P>(
    instance: &ComponentInstance,
    initial: Initial<S>,
    policy: P,
) -> Result<(S, Setter<S>), HookError>
where
    S: Clone + 'static,
    P: EquivalencePolicy<S> + 'static,
{
    let inner = rendering_instance(instance)?;
    if inner.hooks.borrow().is_sealed() {
        let position = inner.hooks.borrow().position();
        return Err(inner.record_violation(OrderViolation::MountAfterFirstPass { position }));
    }
    let initial = initial.resolve();
    let queue: SharedQueue<S> = Rc::new(RefCell::new(UpdateQueue::new(
        initial.clone(),
        Rc::new(policy),
    )));
    let setter = Setter::new(instance.downgrade(), Rc::clone(&queue));
    let hook = StateHook::new(initial.clone(), queue, setter.clone());
    let mounted = inner.hooks.borrow_mut().mount_hook(Box::new(hook));
    match mounted {
        Ok(_) => Ok((initial, setter)),
        Err(violation) => Err(inner.record_violation(violation)),
    }
}

/// Resolves the pending updates of the next recorded hook.
///
/// The result is staged on the hook and becomes its memoized and base state
/// when the pass commits.
pub fn update_state<S>(instance: &ComponentInstance) -> Result<(S, Setter<S>), HookError>
where
    S: Clone + 'static,
{
    let inner = rendering_instance(instance)?;
    let (id, base, queue, setter) = {
        let mut hooks = inner.hooks.borrow_mut();
        let id = match hooks.next_hook() {
            Ok(id) => id,
            Err(violation) => {
                drop(hooks);
                return Err(inner.record_violation(violation));
            }
        };
        let position = hooks.position() - 1;
        let Some(hook) = hooks.hook::<StateHook<S>>(id) else {
            drop(hooks);
            return Err(inner.record_violation(OrderViolation::StateTypeMismatch {
                position,
                expected: type_name::<S>(),
            }));
        };
        (
            id,
            hook.base_state.clone(),
            Rc::clone(&hook.queue),
            hook.setter.clone(),
        )
    };

    let reducer = Reducer::Basic;
    let pending = {
        let mut queue = queue.borrow_mut();
        queue.set_last_rendered_reducer(reducer);
        queue.snapshot()
    };
    // Actions run without any borrow held so they may call setters.
    let state = pending.resolve(&base, reducer);

    if let Some(hook) = inner.hooks.borrow_mut().hook_mut::<StateHook<S>>(id) {
        hook.staged = Some(Staged {
            state: state.clone(),
            through: pending.through(),
        });
    }
    Ok((state, setter))
}

struct SetterInner<S> {
    instance: Weak<InstanceInner>,
    queue: SharedQueue<S>,
}

/// Schedules updates on one state hook.
///
/// The same setter is returned on every pass of the instance's lifetime;
/// clones compare equal.
pub struct Setter<S> {
    inner: Rc<SetterInner<S>>,
}

impl<S> Clone for Setter<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S> PartialEq for Setter<S> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<S> Eq for Setter<S> {}

impl<S> fmt::Debug for Setter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setter")
            .field("pending", &self.inner.queue.borrow().len())
            .finish()
    }
}

impl<S: Clone + 'static> Setter<S> {
    fn new(instance: Weak<InstanceInner>, queue: SharedQueue<S>) -> Self {
        Self {
            inner: Rc::new(SetterInner { instance, queue }),
        }
    }

    /// Replaces the state with `value`.
    pub fn set(&self, value: S) {
        self.dispatch(Action::Replace(value));
    }

    /// Derives the next state from the previous one.
    pub fn update(&self, f: impl Fn(&S) -> S + 'static) {
        self.dispatch(Action::apply(f));
    }

    /// Enqueues `action` on the hook's queue and asks the renderer for
    /// another pass, unless the eager check shows the state would not change.
    pub fn dispatch(&self, action: Action<S>) {
        let Some(instance) = self.inner.instance.upgrade() else {
            log::debug!("dropping update for a dropped instance");
            return;
        };
        let queue = &self.inner.queue;
        if instance.is_unmounted() || queue.borrow().is_detached() {
            log::debug!("dropping update for released hook of instance {}", instance.id());
            return;
        }

        if instance.is_rendering() {
            queue.borrow_mut().enqueue(action);
            instance.note_render_phase_update();
            return;
        }

        if !instance.config().eager_bailout || instance.has_pending_updates() {
            queue.borrow_mut().enqueue(action);
            instance.request_reinvocation();
            return;
        }

        let (reducer, last_rendered, policy) = {
            let queue = queue.borrow();
            (
                queue.last_rendered_reducer(),
                queue.last_rendered_state().clone(),
                queue.policy(),
            )
        };
        let candidate = reducer.reduce(&last_rendered, &action);
        let unchanged = policy.equivalent(&candidate, &last_rendered);
        queue.borrow_mut().enqueue_with_eager(
            action,
            Some(EagerState {
                state: candidate,
                reducer,
            }),
        );
        if unchanged {
            log::trace!(
                "instance {}: update leaves state unchanged, no pass requested",
                instance.id()
            );
            return;
        }
        instance.request_reinvocation();
    }

    /// Whether the hook still belongs to a live, mounted instance.
    pub fn is_attached(&self) -> bool {
        self.inner
            .instance
            .upgrade()
            .map(|instance| !instance.is_unmounted())
            .unwrap_or(false)
            && !self.inner.queue.borrow().is_detached()
    }

    /// Number of updates waiting on this hook.
    pub fn pending_updates(&self) -> usize {
        self.inner.queue.borrow().len()
    }
}

impl ComponentInstance {
    /// Mount half of the state hook. Only valid during this instance's first
    /// pass.
    pub fn mount_state<S>(&self, initial: impl Into<Initial<S>>) -> Result<(S, Setter<S>), HookError>
    where
        S: Clone + PartialEq + 'static,
    {
        mount_state(self, initial.into(), StructuralEquality)
    }

    /// Update half of the state hook. Only valid after the first pass.
    pub fn update_state<S>(&self) -> Result<(S, Setter<S>), HookError>
    where
        S: Clone + 'static,
    {
        update_state(self)
    }

    /// State hook routed through the pass's dispatcher.
    pub fn use_state<S>(&self, initial: impl Into<Initial<S>>) -> Result<(S, Setter<S>), HookError>
    where
        S: Clone + PartialEq + 'static,
    {
        self.use_state_with_policy(initial, StructuralEquality)
    }

    pub fn use_state_with_policy<S, P>(
        &self,
        initial: impl Into<Initial<S>>,
        policy: P,
    ) -> Result<(S, Setter<S>), HookError>
    where
        S: Clone + 'static,
        P: EquivalencePolicy<S> + 'static,
    {
        self.dispatcher().use_state(self, initial, policy)
    }

    /// Committed state of the hook at `position`, if it holds an `S`.
    pub fn peek_state<S: Clone + 'static>(&self, position: usize) -> Option<S> {
        let hooks = self.inner().hooks.borrow();
        hooks
            .hook_at::<StateHook<S>>(position)
            .map(|hook| hook.memoized_state().clone())
    }
}
