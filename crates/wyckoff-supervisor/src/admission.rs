//! Admission control per run kind (spec.md §4.F). PREVIEW is disabled by
//! policy regardless of its nominal cap; FULL has no built-in cap and is
//! bounded only by registry capacity.

use wyckoff_config::SupervisorConfig;
use wyckoff_core::run::RunKind;

#[derive(Debug, Clone, Copy)]
pub struct AdmissionLimits {
    pub preview_cap: usize,
    pub preview_enabled: bool,
    pub walk_forward_cap: usize,
    pub regression_cap: usize,
}

impl AdmissionLimits {
    pub fn from_config(config: &SupervisorConfig) -> Self {
        Self {
            preview_cap: config.max_concurrent_preview,
            preview_enabled: config.preview_enabled,
            walk_forward_cap: config.max_concurrent_walk_forward,
            regression_cap: config.max_concurrent_regression,
        }
    }

    fn cap_for(&self, kind: RunKind) -> Option<usize> {
        match kind {
            RunKind::Preview => Some(self.preview_cap),
            RunKind::Full => None,
            RunKind::WalkForward => Some(self.walk_forward_cap),
            RunKind::Regression => Some(self.regression_cap),
        }
    }
}

/// True if one more run of `kind`, given `running` already in flight,
/// stays within the configured admission policy.
pub fn admit(kind: RunKind, running: usize, limits: &AdmissionLimits) -> bool {
    if kind == RunKind::Preview && !limits.preview_enabled {
        return false;
    }
    match limits.cap_for(kind) {
        Some(cap) => running < cap,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> AdmissionLimits {
        AdmissionLimits { preview_cap: 5, preview_enabled: false, walk_forward_cap: 3, regression_cap: 3 }
    }

    #[test]
    fn preview_is_denied_regardless_of_cap() {
        assert!(!admit(RunKind::Preview, 0, &limits()));
    }

    #[test]
    fn full_is_never_capped() {
        assert!(admit(RunKind::Full, 10_000, &limits()));
    }

    #[test]
    fn walk_forward_denied_at_cap() {
        assert!(admit(RunKind::WalkForward, 2, &limits()));
        assert!(!admit(RunKind::WalkForward, 3, &limits()));
    }
}
