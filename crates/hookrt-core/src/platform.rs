//! Boundary between the hook runtime and the host that renders components.
//!
//! The runtime never re-invokes a body on its own initiative. It tells the
//! host which instance needs another pass and the host decides when to run
//! it, typically batching several requests into one frame.

use crate::InstanceId;

/// Receives re-invocation requests raised by setters.
///
/// Implementations must be safe to share across threads so they can wake a
/// host event loop; the requests themselves are always raised on the thread
/// that owns the runtime.
pub trait Renderer: Send + Sync {
    /// `instance` has pending updates and needs another pass.
    fn request_reinvocation(&self, instance: InstanceId);
}
