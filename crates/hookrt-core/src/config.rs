/// Number of same-pass re-runs an invocation may perform before it fails
/// with [`HookError::TooManyReEntrantUpdates`](crate::HookError).
pub const DEFAULT_REENTRANT_PASS_LIMIT: usize = 25;

/// Number of drain rounds one `process_invalid_instances` call may run
/// before it fails with [`HookError::ProcessRoundLimit`](crate::HookError).
pub const DEFAULT_PROCESS_ROUND_LIMIT: usize = 100;

/// Tunables shared by every instance created on a [`Runtime`](crate::Runtime).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Compute the next state inside the setter when the instance is idle and
    /// skip the reinvocation request if it is equivalent to the last render.
    pub eager_bailout: bool,
    pub reentrant_pass_limit: usize,
    /// Instances whose passes keep invalidating each other are cut off after
    /// this many rounds.
    pub process_round_limit: usize,
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self {
            eager_bailout: true,
            reentrant_pass_limit: DEFAULT_REENTRANT_PASS_LIMIT,
            process_round_limit: DEFAULT_PROCESS_ROUND_LIMIT,
        }
    }

    pub fn with_eager_bailout(mut self, enabled: bool) -> Self {
        self.eager_bailout = enabled;
        self
    }

    pub fn with_reentrant_pass_limit(mut self, limit: usize) -> Self {
        self.reentrant_pass_limit = limit;
        self
    }

    pub fn with_process_round_limit(mut self, limit: usize) -> Self {
        self.process_round_limit = limit;
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}
