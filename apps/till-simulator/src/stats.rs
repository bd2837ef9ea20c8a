//! Run counters for the till simulator.

use std::collections::BTreeMap;

use tracing::info;

/// Success/error tallies for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub success: u64,
    pub errors: u64,
    /// Accepted ids already seen in the recency window.
    pub duplicates: u64,
    /// Periodic stats probes attempted during the run.
    pub stats_probes: u64,
    /// Failures by reason code.
    pub failures_by_code: BTreeMap<&'static str, u64>,
}

impl RunStats {
    pub fn total(&self) -> u64 {
        self.success + self.errors
    }

    /// Percentage of attempts accepted, 0 when nothing was attempted.
    pub fn success_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.success as f64 / total as f64 * 100.0,
        }
    }

    pub fn record_success(&mut self) {
        self.success += 1;
    }

    pub fn record_failure(&mut self, code: &'static str) {
        self.errors += 1;
        *self.failures_by_code.entry(code).or_default() += 1;
    }

    pub fn log(&self, label: &str) {
        info!(
            total = self.total(),
            success = self.success,
            errors = self.errors,
            duplicates = self.duplicates,
            stats_probes = self.stats_probes,
            success_rate = %format_args!("{:.1}%", self.success_rate()),
            "{label} statistics"
        );
        for (code, count) in &self.failures_by_code {
            info!(code, count, "  failures");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_rate_is_zero() {
        assert_eq!(RunStats::default().success_rate(), 0.0);
    }

    #[test]
    fn test_tallies() {
        let mut stats = RunStats::default();
        stats.record_success();
        stats.record_success();
        stats.record_success();
        stats.record_failure("transport");
        stats.record_failure("missing-fields");
        stats.record_failure("transport");

        assert_eq!(stats.total(), 6);
        assert_eq!(stats.success_rate(), 50.0);
        assert_eq!(stats.failures_by_code["transport"], 2);
        assert_eq!(stats.failures_by_code["missing-fields"], 1);
    }
}
