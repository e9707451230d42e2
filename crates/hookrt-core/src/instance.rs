use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::RuntimeConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{HookError, OrderViolation};
use crate::hook_store::{HookDebugEntry, HookStore};
use crate::instance_context;
use crate::runtime::RuntimeHandle;

/// Process-unique identity of a component instance.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct InstanceId(u64);

impl InstanceId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

fn next_instance_id() -> InstanceId {
    InstanceId(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed))
}

type ContentCallback = Box<dyn FnMut() -> Result<(), HookError> + 'static>;

pub(crate) struct InstanceInner {
    id: InstanceId,
    runtime: RuntimeHandle,
    config: RuntimeConfig,
    pub(crate) hooks: RefCell<HookStore>,
    dispatcher: Cell<Dispatcher>,
    rendering: Cell<bool>,
    render_phase_update: Cell<bool>,
    violation: RefCell<Option<HookError>>,
    unmounted: Cell<bool>,
    passes: Cell<u64>,
    content: RefCell<Option<ContentCallback>>,
}

impl InstanceInner {
    fn new(runtime: RuntimeHandle) -> Self {
        let config = runtime.config();
        Self {
            id: next_instance_id(),
            runtime,
            config,
            hooks: RefCell::new(HookStore::new()),
            dispatcher: Cell::new(Dispatcher::Mount),
            rendering: Cell::new(false),
            render_phase_update: Cell::new(false),
            violation: RefCell::new(None),
            unmounted: Cell::new(false),
            passes: Cell::new(0),
            content: RefCell::new(None),
        }
    }

    pub(crate) fn id(&self) -> InstanceId {
        self.id
    }

    pub(crate) fn config(&self) -> RuntimeConfig {
        self.config
    }

    pub(crate) fn is_rendering(&self) -> bool {
        self.rendering.get()
    }

    pub(crate) fn is_unmounted(&self) -> bool {
        self.unmounted.get()
    }

    pub(crate) fn has_pending_updates(&self) -> bool {
        self.hooks
            .try_borrow()
            .map(|hooks| hooks.pending_updates() > 0)
            .unwrap_or(true)
    }

    /// A setter of this instance ran while its own pass was in progress.
    pub(crate) fn note_render_phase_update(&self) {
        self.render_phase_update.set(true);
    }

    pub(crate) fn request_reinvocation(self: &Rc<Self>) {
        self.runtime
            .register_invalid_instance(self.id, Rc::downgrade(self));
    }

    /// Fails the running pass even if the body swallows the returned error.
    pub(crate) fn record_violation(&self, violation: OrderViolation) -> HookError {
        let error = HookError::order(self.id, violation);
        self.violation.borrow_mut().get_or_insert_with(|| error.clone());
        error
    }

    fn begin_pass(&self) {
        let mut hooks = self.hooks.borrow_mut();
        hooks.begin_pass();
        self.dispatcher.set(if hooks.is_sealed() {
            Dispatcher::Update
        } else {
            Dispatcher::Mount
        });
        self.render_phase_update.set(false);
        log::trace!("instance {} begins pass ({:?})", self.id, self.dispatcher.get());
    }

    fn finish_pass(&self) -> Result<(), HookError> {
        if let Some(error) = self.violation.borrow_mut().take() {
            return Err(error);
        }
        self.hooks
            .borrow_mut()
            .finish_pass()
            .map_err(|violation| HookError::order(self.id, violation))
    }
}

/// Marks the instance as rendering for the duration of one invocation and
/// aborts the pass on early exit, including unwinding out of the body.
///
/// An aborted pass that leaves updates queued keeps the instance registered
/// with the runtime so the updates are retried.
struct PassGuard<'a> {
    inner: &'a Rc<InstanceInner>,
    mounting: bool,
    committed: bool,
}

impl<'a> PassGuard<'a> {
    fn new(inner: &'a Rc<InstanceInner>) -> Self {
        inner.rendering.set(true);
        let mounting = !inner.hooks.borrow().is_sealed();
        Self {
            inner,
            mounting,
            committed: false,
        }
    }

    fn commit(mut self) {
        let consumed = self.inner.hooks.borrow_mut().commit();
        self.inner.passes.set(self.inner.passes.get() + 1);
        self.committed = true;
        log::trace!(
            "instance {} committed pass, {consumed} updates consumed",
            self.inner.id
        );
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        let inner = self.inner;
        inner.rendering.set(false);
        inner.render_phase_update.set(false);
        if self.committed {
            inner.runtime.mark_instance_recomposed(inner.id);
            return;
        }
        inner.violation.borrow_mut().take();
        if let Ok(mut hooks) = inner.hooks.try_borrow_mut() {
            if self.mounting {
                hooks.clear();
            } else {
                hooks.discard_staged();
            }
        }
        if !inner.is_unmounted() && inner.has_pending_updates() {
            inner.request_reinvocation();
            log::debug!(
                "instance {} aborted its pass, updates stay queued",
                inner.id
            );
        } else {
            inner.runtime.mark_instance_recomposed(inner.id);
            log::debug!("instance {} aborted its pass", inner.id);
        }
    }
}

/// One persistent, stateful occurrence of a rendering function.
///
/// Cloning yields another handle to the same instance.
#[derive(Clone)]
pub struct ComponentInstance {
    inner: Rc<InstanceInner>,
}

impl PartialEq for ComponentInstance {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for ComponentInstance {}

impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("id", &self.inner.id)
            .field("passes", &self.inner.passes.get())
            .field("unmounted", &self.inner.unmounted.get())
            .finish()
    }
}

impl ComponentInstance {
    pub fn new(runtime: &RuntimeHandle) -> Self {
        Self {
            inner: Rc::new(InstanceInner::new(runtime.clone())),
        }
    }

    pub(crate) fn from_inner(inner: Rc<InstanceInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn clone_inner(&self) -> Rc<InstanceInner> {
        Rc::clone(&self.inner)
    }

    pub(crate) fn inner(&self) -> &Rc<InstanceInner> {
        &self.inner
    }

    pub(crate) fn downgrade(&self) -> Weak<InstanceInner> {
        Rc::downgrade(&self.inner)
    }

    pub fn id(&self) -> InstanceId {
        self.inner.id
    }

    /// Whether the first pass completed and the instance was not unmounted.
    pub fn is_mounted(&self) -> bool {
        !self.inner.unmounted.get() && self.inner.hooks.borrow().is_sealed()
    }

    pub fn is_rendering(&self) -> bool {
        self.inner.rendering.get()
    }

    /// Number of committed passes.
    pub fn pass_count(&self) -> u64 {
        self.inner.passes.get()
    }

    pub fn hook_count(&self) -> usize {
        self.inner.hooks.borrow().len()
    }

    /// Dispatcher used by the pass in progress, or by the next pass.
    pub fn dispatcher(&self) -> Dispatcher {
        if self.inner.rendering.get() {
            self.inner.dispatcher.get()
        } else if self.inner.hooks.borrow().is_sealed() {
            Dispatcher::Update
        } else {
            Dispatcher::Mount
        }
    }

    pub fn has_pending_updates(&self) -> bool {
        self.inner.has_pending_updates()
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.inner.runtime.clone()
    }

    /// Runs one pass of `body`.
    ///
    /// The cursor is rewound, the body runs with this instance as the current
    /// instance, the hook count is checked, and the body re-runs while it
    /// scheduled updates on its own hooks. Results are committed only when the
    /// whole invocation succeeds; otherwise every hook keeps its previous
    /// state and pending updates.
    pub fn invoke<R>(
        &self,
        mut body: impl FnMut() -> Result<R, HookError>,
    ) -> Result<R, HookError> {
        let inner = &self.inner;
        if inner.unmounted.get() {
            return Err(HookError::InstanceUnmounted { instance: inner.id });
        }
        if inner.rendering.get() {
            return Err(HookError::PassInProgress { instance: inner.id });
        }
        let _context = instance_context::enter(self);
        let pass = PassGuard::new(inner);
        let limit = inner.config.reentrant_pass_limit;
        let mut reruns = 0usize;
        loop {
            inner.begin_pass();
            let value = body()?;
            if inner.unmounted.get() {
                return Err(HookError::InstanceUnmounted { instance: inner.id });
            }
            inner.finish_pass()?;
            if !inner.render_phase_update.replace(false) {
                pass.commit();
                return Ok(value);
            }
            reruns += 1;
            if reruns > limit {
                return Err(HookError::TooManyReEntrantUpdates {
                    instance: inner.id,
                    limit,
                });
            }
            log::debug!(
                "instance {} scheduled updates during its own pass, re-running ({reruns}/{limit})",
                inner.id
            );
        }
    }

    /// Stores `content` as this instance's body and runs its first pass.
    /// The runtime re-invokes the stored body when setters request it.
    pub fn set_content(
        &self,
        content: impl FnMut() -> Result<(), HookError> + 'static,
    ) -> Result<(), HookError> {
        *self.inner.content.borrow_mut() = Some(Box::new(content));
        self.recompose()
    }

    /// Re-invokes the stored body.
    pub fn recompose(&self) -> Result<(), HookError> {
        let taken = self.inner.content.borrow_mut().take();
        let Some(mut content) = taken else {
            log::warn!("instance {} has no content to recompose", self.inner.id);
            self.inner.runtime.mark_instance_recomposed(self.inner.id);
            return Ok(());
        };
        let result = self.invoke(&mut content);
        let mut slot = self.inner.content.borrow_mut();
        if slot.is_none() && !self.inner.unmounted.get() {
            *slot = Some(content);
        }
        result
    }

    /// Releases every hook and queue at once. Later setter calls are dropped
    /// and later invocations fail.
    pub fn unmount(&self) {
        if self.inner.unmounted.replace(true) {
            return;
        }
        self.inner.hooks.borrow_mut().clear();
        self.inner.content.borrow_mut().take();
        self.inner.runtime.mark_instance_recomposed(self.inner.id);
        log::debug!("instance {} unmounted", self.inner.id);
    }

    /// `(position, state type, pending updates)` for every hook in call order.
    pub fn debug_dump_hooks(&self) -> Vec<HookDebugEntry> {
        self.inner.hooks.borrow().debug_dump()
    }
}
