//! Standard renderer services backed by Rust's `std` library.
//!
//! This crate provides a concrete [`Renderer`] for `hookrt-core`.
//! Applications construct a [`StdRuntime`], create their component
//! instances on its runtime handle and drain re-invocation requests from
//! their event loop.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use hookrt_core::{HookError, InstanceId, Renderer, Runtime, RuntimeConfig, RuntimeHandle};

type FrameWaker = Arc<dyn Fn() + Send + Sync + 'static>;

/// Renderer that records requests with Rust's threading primitives.
pub struct StdRenderer {
    frame_requested: AtomicBool,
    requested: Mutex<Vec<InstanceId>>,
    frame_waker: RwLock<Option<FrameWaker>>,
}

impl StdRenderer {
    pub fn new() -> Self {
        Self {
            frame_requested: AtomicBool::new(false),
            requested: Mutex::new(Vec::new()),
            frame_waker: RwLock::new(None),
        }
    }

    /// Returns whether a pass has been requested since the last call.
    pub fn take_frame_request(&self) -> bool {
        self.frame_requested.swap(false, Ordering::SeqCst)
    }

    /// Instances that requested a pass since the last call, in request order.
    pub fn take_requested_instances(&self) -> Vec<InstanceId> {
        std::mem::take(&mut *self.requested.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Registers a waker that will be invoked whenever a pass is requested.
    pub fn set_frame_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        *self
            .frame_waker
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(waker));
    }

    /// Clears any registered frame waker.
    pub fn clear_frame_waker(&self) {
        *self
            .frame_waker
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn wake(&self) {
        let waker = self
            .frame_waker
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(waker) = waker {
            waker();
        }
    }
}

impl Default for StdRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StdRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdRenderer")
            .field(
                "frame_requested",
                &self.frame_requested.load(Ordering::SeqCst),
            )
            .finish()
    }
}

impl Renderer for StdRenderer {
    fn request_reinvocation(&self, instance: InstanceId) {
        log::trace!("instance {instance} requested a pass");
        self.requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(instance);
        self.frame_requested.store(true, Ordering::SeqCst);
        self.wake();
    }
}

/// Convenience container bundling the standard renderer and the runtime it
/// serves.
#[derive(Clone)]
pub struct StdRuntime {
    renderer: Arc<StdRenderer>,
    runtime: Runtime,
}

impl StdRuntime {
    /// Creates a new standard runtime with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let renderer = Arc::new(StdRenderer::default());
        let runtime = Runtime::with_config(renderer.clone(), config);
        Self { renderer, runtime }
    }

    /// Returns a [`hookrt_core::Runtime`] wired to the standard renderer.
    pub fn runtime(&self) -> Runtime {
        self.runtime.clone()
    }

    /// Returns a handle to the runtime.
    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    /// Returns the renderer implementation.
    pub fn renderer(&self) -> Arc<StdRenderer> {
        Arc::clone(&self.renderer)
    }

    /// Returns whether a pass was requested since the last poll.
    pub fn take_frame_request(&self) -> bool {
        self.renderer.take_frame_request()
    }

    /// Registers a waker to be called when a setter requests a pass.
    pub fn set_frame_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        self.renderer.set_frame_waker(waker);
    }

    /// Clears any previously registered frame waker.
    pub fn clear_frame_waker(&self) {
        self.renderer.clear_frame_waker();
    }

    /// Runs every requested pass. Returns how many passes ran.
    pub fn run_pending_passes(&self) -> Result<usize, HookError> {
        self.take_frame_request();
        let passes = self.runtime.process_invalid_instances()?;
        if passes > 0 {
            log::debug!("ran {passes} requested passes");
        }
        Ok(passes)
    }
}

impl fmt::Debug for StdRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdRuntime")
            .field("renderer", &self.renderer)
            .field("config", &self.runtime.config())
            .finish()
    }
}

impl Default for StdRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/std_runtime_tests.rs"]
mod tests;
