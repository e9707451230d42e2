use std::sync::{Mutex, PoisonError};

use hookrt_core::{InstanceId, Renderer};

/// Renderer that only remembers which instances asked for a pass.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    requests: Mutex<Vec<InstanceId>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<InstanceId> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns the recorded requests and forgets them.
    pub fn take_requests(&self) -> Vec<InstanceId> {
        std::mem::take(&mut *self.requests.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Renderer for RecordingRenderer {
    fn request_reinvocation(&self, instance: InstanceId) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(instance);
    }
}
