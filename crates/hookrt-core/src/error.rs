use std::fmt;

use crate::InstanceId;

/// How the call pattern of a rendering function diverged from the hook
/// chain recorded at mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderViolation {
    /// A hook was mounted after the instance completed its first pass.
    MountAfterFirstPass { position: usize },
    /// A hook was looked up before the instance finished mounting.
    UpdateBeforeMount { position: usize },
    /// The body called more state hooks than were registered at mount.
    MoreHooksThanMounted { mounted: usize },
    /// The body returned after calling fewer state hooks than were mounted.
    FewerHooksThanMounted { mounted: usize, called: usize },
    /// The hook at this position holds a different state type.
    StateTypeMismatch {
        position: usize,
        expected: &'static str,
    },
}

impl fmt::Display for OrderViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderViolation::MountAfterFirstPass { position } => {
                write!(f, "hook {position} mounted after the first pass completed")
            }
            OrderViolation::UpdateBeforeMount { position } => {
                write!(f, "hook {position} requested before the instance mounted")
            }
            OrderViolation::MoreHooksThanMounted { mounted } => {
                write!(f, "more state hooks called than the {mounted} mounted")
            }
            OrderViolation::FewerHooksThanMounted { mounted, called } => {
                write!(f, "{called} state hooks called but {mounted} were mounted")
            }
            OrderViolation::StateTypeMismatch { position, expected } => {
                write!(f, "hook {position} does not hold state of type {expected}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookError {
    /// The call-order mapping between hooks and call sites broke; the pass
    /// was aborted without committing any state.
    HookOrderViolation {
        instance: InstanceId,
        violation: OrderViolation,
    },
    /// Same-pass updates kept re-triggering the body past the configured limit.
    TooManyReEntrantUpdates { instance: InstanceId, limit: usize },
    /// Instances kept requesting passes from each other past the configured
    /// number of drain rounds.
    ProcessRoundLimit { limit: usize },
    /// A free hook function was called outside of any invocation.
    NoActiveInstance,
    InstanceUnmounted { instance: InstanceId },
    /// The instance is already inside a pass.
    PassInProgress { instance: InstanceId },
}

impl HookError {
    pub(crate) fn order(instance: InstanceId, violation: OrderViolation) -> Self {
        HookError::HookOrderViolation {
            instance,
            violation,
        }
    }

    pub fn is_order_violation(&self) -> bool {
        matches!(self, HookError::HookOrderViolation { .. })
    }
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookError::HookOrderViolation {
                instance,
                violation,
            } => write!(f, "hook order violation in instance {instance}: {violation}"),
            HookError::TooManyReEntrantUpdates { instance, limit } => write!(
                f,
                "instance {instance} re-ran more than {limit} times for updates scheduled during its own pass"
            ),
            HookError::ProcessRoundLimit { limit } => {
                write!(f, "re-invocation requests did not settle within {limit} rounds")
            }
            HookError::NoActiveInstance => write!(f, "no component instance is rendering"),
            HookError::InstanceUnmounted { instance } => {
                write!(f, "instance {instance} is unmounted")
            }
            HookError::PassInProgress { instance } => {
                write!(f, "instance {instance} is already rendering")
            }
        }
    }
}

impl std::error::Error for HookError {}
