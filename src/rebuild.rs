//! Coalescing of overlapping run requests.
//!
//! At most one run is in flight. A request that arrives while a run is
//! going is remembered once; any further requests before completion fold
//! into that same follow-up.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildState {
    #[default]
    Idle,
    Building,
    BuildingWithPending,
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildState::Idle => write!(f, "idle"),
            BuildState::Building => write!(f, "building"),
            BuildState::BuildingWithPending => write!(f, "building (pending)"),
        }
    }
}

/// What the caller should do after a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestAction {
    /// Nothing was running: start a run now.
    Start,
    /// A run is going; one follow-up is now queued.
    Queued,
    /// A follow-up was already queued; this request folds into it.
    Coalesced,
}

/// What the caller should do after a run completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompleteAction {
    /// Nothing pending.
    Done,
    /// Start the queued follow-up run now.
    Restart,
}

/// The coalescing state machine.
#[derive(Debug, Clone, Default)]
pub struct BuildCoordinator {
    state: BuildState,
}

impl BuildCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    pub fn is_building(&self) -> bool {
        self.state != BuildState::Idle
    }

    pub fn request(&mut self) -> RequestAction {
        let (next, action) = match self.state {
            BuildState::Idle => (BuildState::Building, RequestAction::Start),
            BuildState::Building => (BuildState::BuildingWithPending, RequestAction::Queued),
            BuildState::BuildingWithPending => {
                (BuildState::BuildingWithPending, RequestAction::Coalesced)
            }
        };
        self.state = next;
        action
    }

    /// Report that the running build finished. Completing while idle is a
    /// no-op.
    pub fn complete(&mut self) -> CompleteAction {
        let (next, action) = match self.state {
            BuildState::Idle | BuildState::Building => (BuildState::Idle, CompleteAction::Done),
            BuildState::BuildingWithPending => (BuildState::Building, CompleteAction::Restart),
        };
        self.state = next;
        action
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_request() {
        let mut c = BuildCoordinator::new();
        assert_eq!(c.request(), RequestAction::Start);
        assert_eq!(c.state(), BuildState::Building);
        assert_eq!(c.complete(), CompleteAction::Done);
        assert_eq!(c.state(), BuildState::Idle);
    }

    #[test]
    fn test_requests_during_build_coalesce_into_one_restart() {
        let mut c = BuildCoordinator::new();
        c.request();
        assert_eq!(c.request(), RequestAction::Queued);
        assert_eq!(c.request(), RequestAction::Coalesced);
        assert_eq!(c.request(), RequestAction::Coalesced);
        assert_eq!(c.state(), BuildState::BuildingWithPending);

        assert_eq!(c.complete(), CompleteAction::Restart);
        assert_eq!(c.state(), BuildState::Building);
        assert_eq!(c.complete(), CompleteAction::Done);
        assert!(!c.is_building());
    }

    #[test]
    fn test_complete_while_idle_is_noop() {
        let mut c = BuildCoordinator::new();
        assert_eq!(c.complete(), CompleteAction::Done);
        assert_eq!(c.state(), BuildState::Idle);
    }

    #[test]
    fn test_runs_never_exceed_requests() {
        let mut c = BuildCoordinator::new();
        let mut started = 0;
        for _ in 0..5 {
            if c.request() == RequestAction::Start {
                started += 1;
            }
        }
        while c.complete() == CompleteAction::Restart {
            started += 1;
        }
        assert_eq!(started, 2);
    }
}
