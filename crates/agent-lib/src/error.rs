//! Error taxonomy for container runtime interactions

use crate::models::ContainerId;
use thiserror::Error;

/// Errors surfaced by a [`ContainerRuntime`](crate::collector::ContainerRuntime)
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The container engine could not be reached or refused the listing
    #[error("container runtime unavailable: {reason}")]
    RuntimeUnavailable { reason: String },

    /// The container disappeared between listing and sampling
    #[error("container {id} vanished before it could be sampled")]
    ContainerVanished { id: ContainerId },

    /// The stats payload could not be decoded
    #[error("malformed stats snapshot for container {id}: {reason}")]
    MalformedSnapshot { id: ContainerId, reason: String },

    /// Any other per-container failure
    #[error("failed to fetch stats for container {id}: {reason}")]
    Other { id: ContainerId, reason: String },
}

impl RuntimeError {
    /// Expected races and bad payloads that only cost one sample
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            RuntimeError::ContainerVanished { .. } | RuntimeError::MalformedSnapshot { .. }
        )
    }

    pub fn container_id(&self) -> Option<&ContainerId> {
        match self {
            RuntimeError::RuntimeUnavailable { .. } => None,
            RuntimeError::ContainerVanished { id }
            | RuntimeError::MalformedSnapshot { id, .. }
            | RuntimeError::Other { id, .. } => Some(id),
        }
    }
}

pub type RuntimeResult<T> = std::result::Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_benign_classification() {
        let id = ContainerId::new("c1");
        assert!(RuntimeError::ContainerVanished { id: id.clone() }.is_benign());
        assert!(RuntimeError::MalformedSnapshot {
            id: id.clone(),
            reason: "bad json".into()
        }
        .is_benign());
        assert!(!RuntimeError::Other {
            id,
            reason: "timeout".into()
        }
        .is_benign());
        assert!(!RuntimeError::RuntimeUnavailable {
            reason: "socket closed".into()
        }
        .is_benign());
    }

    #[test]
    fn test_error_display() {
        let err = RuntimeError::ContainerVanished {
            id: ContainerId::new("c1"),
        };
        assert_eq!(err.to_string(), "container c1 vanished before it could be sampled");
    }
}
