//! Time and memory budgets.
//!
//! The budgets are soft: the driver polls them at coarse loop boundaries and the search winds
//! down with a `TimeFail`/`MemFail` result. Nothing here interrupts the solver mid-operation.
use std::time::Instant;

use crate::config::SolverConfig;
use crate::state::SolveResult;

/// How many polls to skip between actual clock reads.
const POLL_INTERVAL: u32 = 256;

/// Resource budgets for one search.
#[derive(Default)]
pub struct SearchLimits {
    deadline: Option<Instant>,
    mem_limit_bytes: Option<usize>,
    countdown: u32,
}

impl SearchLimits {
    pub fn from_config(config: &SolverConfig) -> SearchLimits {
        SearchLimits {
            deadline: config.timeout.map(|budget| Instant::now() + budget),
            mem_limit_bytes: config.memout_mb.map(|mb| mb * 1024 * 1024),
            countdown: 0,
        }
    }

    /// Poll the budgets. `mem_in_use` is the engine's own allocation estimate.
    ///
    /// Returns the failure result when a budget has expired. The clock is only read every
    /// [`POLL_INTERVAL`] calls to keep this off the hot path.
    pub fn check(&mut self, mem_in_use: usize) -> Option<SolveResult> {
        if let Some(limit) = self.mem_limit_bytes {
            if mem_in_use > limit {
                return Some(SolveResult::MemFail);
            }
        }

        let deadline = self.deadline?;
        if self.countdown > 0 {
            self.countdown -= 1;
            return None;
        }
        self.countdown = POLL_INTERVAL;

        if Instant::now() >= deadline {
            Some(SolveResult::TimeFail)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn no_limits_never_fire() {
        let mut limits = SearchLimits::default();
        for _ in 0..10_000 {
            assert_eq!(limits.check(usize::max_value()), None);
        }
    }

    #[test]
    fn memory_limit_fires() {
        let config = SolverConfig {
            memout_mb: Some(1),
            ..SolverConfig::default()
        };
        let mut limits = SearchLimits::from_config(&config);
        assert_eq!(limits.check(10), None);
        assert_eq!(limits.check(2 * 1024 * 1024), Some(SolveResult::MemFail));
    }

    #[test]
    fn expired_deadline_fires() {
        let config = SolverConfig {
            timeout: Some(Duration::from_secs(0)),
            ..SolverConfig::default()
        };
        let mut limits = SearchLimits::from_config(&config);
        assert_eq!(limits.check(0), Some(SolveResult::TimeFail));
    }
}
