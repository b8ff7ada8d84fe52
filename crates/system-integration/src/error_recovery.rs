//! Failure budget and retry policy for chart initialization

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;

const MAX_HISTORY: usize = 50;

/// What went wrong in an initialization cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FailureKind {
    /// No bundle cached when the cycle started
    MissingData,
    /// The remote call failed or returned an error envelope
    DataLoad,
    /// The cached bundle was rejected by the validator
    Validation,
    /// The mount point could neither be found nor created
    Container,
    /// The charting library is not loaded
    Library,
    /// Both the primary and the fallback render failed
    Render,
}

impl FailureKind {
    /// Failures caused by the data itself; only these re-fetch.
    pub fn is_data_related(&self) -> bool {
        matches!(
            self,
            FailureKind::MissingData | FailureKind::DataLoad | FailureKind::Validation
        )
    }
}

/// Next step after a recorded failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecoveryAction {
    /// Re-fetch the bundle after the retry delay, then re-run the cycle
    RetryWithReload,
    /// Re-run the cycle with the cached bundle after the retry delay
    RetryWithCachedData,
    /// Budget exhausted; no automatic retry
    GiveUp,
}

#[derive(Debug, Clone)]
struct FailureRecord {
    kind: FailureKind,
    message: String,
}

/// Bounded counter of consecutive initialization failures.
///
/// Data and DOM/render failures share the budget; the kind only decides
/// whether the retry re-fetches.
#[derive(Clone)]
pub struct FailureBudget {
    max_failed_attempts: u32,
    failed_attempts: Arc<RwLock<u32>>,
    history: Arc<RwLock<VecDeque<FailureRecord>>>,
    stats: Arc<RwLock<RecoveryStats>>,
}

impl FailureBudget {
    pub fn new(max_failed_attempts: u32) -> Self {
        Self {
            max_failed_attempts,
            failed_attempts: Arc::new(RwLock::new(0)),
            history: Arc::new(RwLock::new(VecDeque::new())),
            stats: Arc::new(RwLock::new(RecoveryStats::default())),
        }
    }

    /// Count a failure and decide the recovery.
    pub fn record_failure(&self, kind: FailureKind, message: impl Into<String>) -> RecoveryAction {
        let message = message.into();
        let failed = {
            let mut failed = self.failed_attempts.write();
            *failed += 1;
            *failed
        };

        {
            let mut history = self.history.write();
            if history.len() == MAX_HISTORY {
                history.pop_front();
            }
            history.push_back(FailureRecord {
                kind,
                message: message.clone(),
            });
        }

        let mut stats = self.stats.write();
        stats.failures += 1;

        if failed >= self.max_failed_attempts {
            stats.exhaustions += 1;
            log::error!(
                "FailureBudget - {kind:?} failure {failed}/{}: {message}; giving up",
                self.max_failed_attempts
            );
            RecoveryAction::GiveUp
        } else {
            stats.retries_scheduled += 1;
            log::warn!(
                "FailureBudget - {kind:?} failure {failed}/{}: {message}",
                self.max_failed_attempts
            );
            if kind.is_data_related() {
                RecoveryAction::RetryWithReload
            } else {
                RecoveryAction::RetryWithCachedData
            }
        }
    }

    /// A cycle reached `Rendering` successfully; the counter starts over.
    pub fn record_success(&self) {
        let previous = std::mem::replace(&mut *self.failed_attempts.write(), 0);
        if previous > 0 {
            self.stats.write().successful_recoveries += 1;
            log::info!("FailureBudget - recovered after {previous} failed attempts");
        }
    }

    pub fn failed_attempts(&self) -> u32 {
        *self.failed_attempts.read()
    }

    pub fn max_failed_attempts(&self) -> u32 {
        self.max_failed_attempts
    }

    pub fn can_retry(&self) -> bool {
        self.failed_attempts() < self.max_failed_attempts
    }

    pub fn is_exhausted(&self) -> bool {
        !self.can_retry()
    }

    /// Kind and message of the most recent failure.
    pub fn last_failure(&self) -> Option<(FailureKind, String)> {
        self.history
            .read()
            .back()
            .map(|record| (record.kind, record.message.clone()))
    }

    /// Failures of `kind` within the retained history.
    pub fn count_kind(&self, kind: FailureKind) -> usize {
        self.history
            .read()
            .iter()
            .filter(|record| record.kind == kind)
            .count()
    }

    pub fn stats(&self) -> RecoveryStats {
        self.stats.read().clone()
    }
}

/// Recovery statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecoveryStats {
    pub failures: u64,
    pub retries_scheduled: u64,
    pub exhaustions: u64,
    pub successful_recoveries: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_of_five() {
        let budget = FailureBudget::new(5);
        for attempt in 1..5 {
            assert_eq!(
                budget.record_failure(FailureKind::DataLoad, "HTTP 502"),
                RecoveryAction::RetryWithReload
            );
            assert_eq!(budget.failed_attempts(), attempt);
        }
        assert_eq!(
            budget.record_failure(FailureKind::DataLoad, "HTTP 502"),
            RecoveryAction::GiveUp
        );
        assert!(budget.is_exhausted());
        assert_eq!(budget.stats().retries_scheduled, 4);
        assert_eq!(budget.stats().exhaustions, 1);
    }

    #[test]
    fn test_dom_failures_keep_cached_data() {
        let budget = FailureBudget::new(5);
        assert_eq!(
            budget.record_failure(FailureKind::Container, "no parent"),
            RecoveryAction::RetryWithCachedData
        );
        assert_eq!(
            budget.record_failure(FailureKind::Validation, "rawdata is empty"),
            RecoveryAction::RetryWithReload
        );
        assert_eq!(budget.failed_attempts(), 2);
        assert_eq!(budget.count_kind(FailureKind::Container), 1);
        assert_eq!(
            budget.last_failure(),
            Some((FailureKind::Validation, "rawdata is empty".to_string()))
        );
    }

    #[test]
    fn test_success_resets() {
        let budget = FailureBudget::new(2);
        budget.record_failure(FailureKind::Render, "boom");
        budget.record_failure(FailureKind::Render, "boom");
        assert!(budget.is_exhausted());

        budget.record_success();
        assert_eq!(budget.failed_attempts(), 0);
        assert!(budget.can_retry());
        assert_eq!(budget.stats().successful_recoveries, 1);
    }
}
