//! Module status derived from live replica counts

use serde::{Deserialize, Serialize};
use std::fmt;

/// Health of a module in one namespace
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ModuleStatus {
    /// No workload matched any of the module's selectors
    NotDeployed,
    /// Workloads exist but none requests replicas yet
    Pending,
    /// Some, but not all, desired replicas are ready
    Degraded,
    /// Every desired replica is ready
    Running,
    /// Replicas are desired but none is ready
    Failed,
    /// The cluster could not be queried
    #[default]
    Unknown,
}

impl ModuleStatus {
    /// Whether any workload for the module exists (or might exist)
    pub fn is_deployed(&self) -> bool {
        !matches!(self, Self::NotDeployed)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotDeployed => "not-deployed",
            Self::Pending => "pending",
            Self::Degraded => "degraded",
            Self::Running => "running",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Desired and ready replicas summed over every workload of a module
///
/// `ready <= desired` is expected but not enforced: a read may race with a
/// scale-down and report stale counts.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplicaState {
    pub desired: i32,
    pub ready: i32,
}

impl ReplicaState {
    pub fn new(desired: i32, ready: i32) -> Self {
        Self { desired, ready }
    }

    /// Add another workload's counts, saturating at `i32::MAX`
    pub fn add(&mut self, desired: i32, ready: i32) {
        self.desired = self.desired.saturating_add(desired);
        self.ready = self.ready.saturating_add(ready);
    }

    /// Display as `ready/desired`
    pub fn display(&self) -> String {
        format!("{}/{}", self.ready, self.desired)
    }
}

/// Derive a status from the number of matched workloads and their summed replicas
///
/// `NotDeployed` is only produced when nothing matched; `(0, 0)` with
/// workloads present is `Pending`. A stale `ready > desired` counts as running.
pub fn derive_status(matched_workloads: usize, replicas: ReplicaState) -> ModuleStatus {
    if matched_workloads == 0 {
        return ModuleStatus::NotDeployed;
    }

    let ReplicaState { desired, ready } = replicas;
    if desired <= 0 {
        ModuleStatus::Pending
    } else if ready <= 0 {
        ModuleStatus::Failed
    } else if ready >= desired {
        ModuleStatus::Running
    } else {
        ModuleStatus::Degraded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_status_table() {
        let cases = [
            ((3, 0), ModuleStatus::Failed),
            ((3, 2), ModuleStatus::Degraded),
            ((3, 3), ModuleStatus::Running),
            ((1, 1), ModuleStatus::Running),
            ((0, 0), ModuleStatus::Pending),
        ];

        for ((desired, ready), expected) in cases {
            assert_eq!(
                derive_status(1, ReplicaState::new(desired, ready)),
                expected,
                "desired={} ready={}",
                desired,
                ready
            );
        }
    }

    #[test]
    fn test_not_deployed_only_without_workloads() {
        assert_eq!(
            derive_status(0, ReplicaState::default()),
            ModuleStatus::NotDeployed
        );
        assert_ne!(
            derive_status(2, ReplicaState::default()),
            ModuleStatus::NotDeployed
        );
    }

    #[test]
    fn test_stale_ready_above_desired_is_running() {
        assert_eq!(
            derive_status(1, ReplicaState::new(2, 3)),
            ModuleStatus::Running
        );
    }

    #[test]
    fn test_status_display_matches_serde() {
        for status in [
            ModuleStatus::NotDeployed,
            ModuleStatus::Pending,
            ModuleStatus::Degraded,
            ModuleStatus::Running,
            ModuleStatus::Failed,
            ModuleStatus::Unknown,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status));
        }
    }

    #[test]
    fn test_replica_state_add() {
        let mut state = ReplicaState::default();
        state.add(3, 1);
        state.add(1, 1);
        assert_eq!(state, ReplicaState::new(4, 2));
        assert_eq!(state.display(), "2/4");
    }

    #[test]
    fn test_replica_state_add_saturates() {
        let mut state = ReplicaState::new(i32::MAX - 1, i32::MAX - 1);
        state.add(5, 5);
        assert_eq!(state, ReplicaState::new(i32::MAX, i32::MAX));
        assert_eq!(derive_status(2, state), ModuleStatus::Running);
    }
}
