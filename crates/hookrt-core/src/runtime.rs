use crate::collections::map::HashSet;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::config::RuntimeConfig;
use crate::instance::{ComponentInstance, InstanceInner};
use crate::platform::Renderer;
use crate::{HookError, InstanceId};

struct RuntimeInner {
    renderer: Arc<dyn Renderer>,
    config: RuntimeConfig,
    needs_pass: Cell<bool>,
    invalid_instances: RefCell<HashSet<InstanceId>>, // FUTURE: sparse bitset keyed by instance slot.
    instance_queue: RefCell<Vec<(InstanceId, Weak<InstanceInner>)>>,
    requests: Cell<u64>,
}

impl RuntimeInner {
    fn new(renderer: Arc<dyn Renderer>, config: RuntimeConfig) -> Self {
        Self {
            renderer,
            config,
            needs_pass: Cell::new(false),
            invalid_instances: RefCell::new(HashSet::default()),
            instance_queue: RefCell::new(Vec::new()),
            requests: Cell::new(0),
        }
    }

    fn register_invalid_instance(&self, id: InstanceId, instance: Weak<InstanceInner>) {
        let newly_invalid = self.invalid_instances.borrow_mut().insert(id);
        if !newly_invalid {
            log::trace!("instance {id} already awaiting a pass");
            return;
        }
        self.instance_queue.borrow_mut().push((id, instance));
        self.needs_pass.set(true);
        self.requests.set(self.requests.get() + 1);
        self.renderer.request_reinvocation(id);
    }

    fn mark_instance_recomposed(&self, id: InstanceId) {
        let mut invalid = self.invalid_instances.borrow_mut();
        invalid.remove(&id);
        if invalid.is_empty() {
            self.needs_pass.set(false);
        }
    }

    fn take_invalidated_instances(&self) -> Vec<(InstanceId, Weak<InstanceInner>)> {
        let mut queue = self.instance_queue.borrow_mut();
        if queue.is_empty() {
            return Vec::new();
        }
        let pending: Vec<_> = queue.drain(..).collect();
        drop(queue);
        let invalid = self.invalid_instances.borrow();
        pending
            .into_iter()
            .filter(|(id, _)| invalid.contains(id))
            .collect()
    }

    /// Queues entries again for the next drain, keeping only instances that
    /// still await a pass and are not queued already.
    fn requeue(&self, entries: Vec<(InstanceId, Weak<InstanceInner>)>) {
        let invalid = self.invalid_instances.borrow();
        let mut queue = self.instance_queue.borrow_mut();
        for (id, instance) in entries {
            if invalid.contains(&id) && !queue.iter().any(|(queued, _)| *queued == id) {
                queue.push((id, instance));
            }
        }
    }

    fn has_invalid_instances(&self) -> bool {
        !self.invalid_instances.borrow().is_empty()
    }
}

/// Owner of the renderer, the configuration and the set of instances that
/// asked for another pass.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self::with_config(renderer, RuntimeConfig::default())
    }

    pub fn with_config(renderer: Arc<dyn Renderer>, config: RuntimeConfig) -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(renderer, config)),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn config(&self) -> RuntimeConfig {
        self.inner.config
    }

    pub fn needs_pass(&self) -> bool {
        self.inner.needs_pass.get()
    }

    pub fn has_invalid_instances(&self) -> bool {
        self.inner.has_invalid_instances()
    }

    /// Requests forwarded to the renderer since the runtime was created.
    pub fn reinvocation_requests(&self) -> u64 {
        self.inner.requests.get()
    }

    pub fn process_invalid_instances(&self) -> Result<usize, HookError> {
        self.handle().process_invalid_instances()
    }
}

#[derive(Default)]
pub struct DefaultRenderer;

impl Renderer for DefaultRenderer {
    fn request_reinvocation(&self, _instance: InstanceId) {}
}

#[cfg(test)]
#[derive(Default)]
pub struct TestRenderer {
    requests: std::sync::Mutex<Vec<InstanceId>>,
}

#[cfg(test)]
impl TestRenderer {
    pub fn requests(&self) -> Vec<InstanceId> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
impl Renderer for TestRenderer {
    fn request_reinvocation(&self, instance: InstanceId) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(instance);
        }
    }
}

/// Weak handle to a [`Runtime`]. Every operation is a no-op once the runtime
/// has been dropped.
#[derive(Clone)]
pub struct RuntimeHandle {
    inner: Weak<RuntimeInner>,
}

impl RuntimeHandle {
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    /// Configuration of the runtime, or the defaults once it is gone.
    pub fn config(&self) -> RuntimeConfig {
        self.inner
            .upgrade()
            .map(|inner| inner.config)
            .unwrap_or_default()
    }

    pub(crate) fn register_invalid_instance(&self, id: InstanceId, instance: Weak<InstanceInner>) {
        if let Some(inner) = self.inner.upgrade() {
            inner.register_invalid_instance(id, instance);
        }
    }

    pub(crate) fn mark_instance_recomposed(&self, id: InstanceId) {
        if let Some(inner) = self.inner.upgrade() {
            inner.mark_instance_recomposed(id);
        }
    }

    pub fn has_invalid_instances(&self) -> bool {
        self.inner
            .upgrade()
            .map(|inner| inner.has_invalid_instances())
            .unwrap_or(false)
    }

    pub fn needs_pass(&self) -> bool {
        self.inner
            .upgrade()
            .map(|inner| inner.needs_pass.get())
            .unwrap_or(false)
    }

    pub fn reinvocation_requests(&self) -> u64 {
        self.inner
            .upgrade()
            .map(|inner| inner.requests.get())
            .unwrap_or(0)
    }

    /// Re-invokes every live instance that requested a pass, repeating until
    /// no requests remain. Returns the number of passes run.
    ///
    /// A failing pass does not stop the batch: the remaining instances still
    /// run, the failed instance keeps its pending updates and stays
    /// registered for the next call, and the first error is returned. Passes
    /// that keep requesting each other fail with
    /// [`HookError::ProcessRoundLimit`] once `process_round_limit` drains are
    /// exceeded; the outstanding requests stay registered.
    pub fn process_invalid_instances(&self) -> Result<usize, HookError> {
        let Some(inner) = self.inner.upgrade() else {
            return Ok(0);
        };
        let limit = inner.config.process_round_limit;
        let mut passes = 0;
        let mut rounds = 0;
        let mut failed = Vec::new();
        let mut first_error = None;
        loop {
            let pending = inner.take_invalidated_instances();
            if pending.is_empty() {
                break;
            }
            rounds += 1;
            if rounds > limit {
                inner.requeue(pending);
                inner.requeue(failed);
                log::warn!("re-invocation did not settle within {limit} rounds");
                return Err(HookError::ProcessRoundLimit { limit });
            }
            for (id, weak) in pending {
                // Already re-run earlier in this batch.
                if !inner.invalid_instances.borrow().contains(&id) {
                    continue;
                }
                let Some(instance) = weak.upgrade() else {
                    inner.mark_instance_recomposed(id);
                    continue;
                };
                let instance = ComponentInstance::from_inner(instance);
                if !instance.is_mounted() {
                    inner.mark_instance_recomposed(id);
                    continue;
                }
                match instance.recompose() {
                    Ok(()) => passes += 1,
                    Err(error) => {
                        log::debug!("instance {id} failed its pass: {error}");
                        failed.push((id, weak));
                        first_error.get_or_insert(error);
                    }
                }
            }
        }
        inner.requeue(failed);
        match first_error {
            Some(error) => Err(error),
            None => Ok(passes),
        }
    }
}
