use std::sync::Arc;

use hookrt_core::{
    ComponentInstance, HookDebugEntry, HookError, InstanceId, Runtime, RuntimeConfig,
    RuntimeHandle,
};

use crate::RecordingRenderer;

/// Headless harness for exercising a single component instance in tests.
///
/// `HookTestRule` owns a runtime wired to a [`RecordingRenderer`] and one
/// instance created on it. Content installed with
/// [`set_content`](Self::set_content) is stored on the instance so that
/// setter-driven passes can be replayed with
/// [`pump_until_idle`](Self::pump_until_idle).
pub struct HookTestRule {
    runtime: Runtime,
    renderer: Arc<RecordingRenderer>,
    instance: ComponentInstance,
    has_content: bool,
}

impl HookTestRule {
    /// Create a new test rule with the default runtime configuration.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let renderer = Arc::new(RecordingRenderer::new());
        let runtime = Runtime::with_config(renderer.clone(), config);
        let instance = ComponentInstance::new(&runtime.handle());
        Self {
            runtime,
            renderer,
            instance,
            has_content: false,
        }
    }

    /// Install the provided content on the instance and run its first pass.
    pub fn set_content(
        &mut self,
        content: impl FnMut() -> Result<(), HookError> + 'static,
    ) -> Result<(), HookError> {
        self.has_content = true;
        self.instance.set_content(content)
    }

    /// Force a pass using the currently installed content.
    pub fn recomposition(&mut self) -> Result<(), HookError> {
        self.instance.recompose()
    }

    /// Run requested passes until no instance of the runtime asks for
    /// another one. Returns the number of passes run.
    ///
    /// Passes that keep requesting each other fail with
    /// [`HookError::ProcessRoundLimit`] once the runtime's
    /// `process_round_limit` is exceeded.
    pub fn pump_until_idle(&mut self) -> Result<usize, HookError> {
        if !self.runtime.has_invalid_instances() {
            return Ok(0);
        }
        let passes = self.runtime.process_invalid_instances()?;
        log::debug!("pump_until_idle ran {passes} passes");
        Ok(passes)
    }

    /// Access the runtime driving this rule, e.g. to create sibling
    /// instances that share its renderer.
    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// The instance the installed content runs in.
    pub fn instance(&self) -> &ComponentInstance {
        &self.instance
    }

    /// Requests the renderer received so far.
    pub fn reinvocation_requests(&self) -> Vec<InstanceId> {
        self.renderer.requests()
    }

    pub fn renderer(&self) -> Arc<RecordingRenderer> {
        Arc::clone(&self.renderer)
    }

    /// Returns whether user content has been installed in this rule.
    pub fn has_content(&self) -> bool {
        self.has_content
    }

    pub fn pass_count(&self) -> u64 {
        self.instance.pass_count()
    }

    /// Dump the hooks of the instance as text for debugging.
    pub fn dump_hooks(&self) -> String {
        self.instance
            .debug_dump_hooks()
            .into_iter()
            .map(|(position, type_name, pending): HookDebugEntry| {
                format!("{position}: {type_name} ({pending} pending)")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for HookTestRule {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for tests that only need temporary access to a
/// `HookTestRule`.
pub fn run_test_instance<R>(f: impl FnOnce(&mut HookTestRule) -> R) -> R {
    let mut rule = HookTestRule::new();
    f(&mut rule)
}

#[cfg(test)]
#[path = "tests/testing_tests.rs"]
mod tests;
