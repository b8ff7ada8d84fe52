//! Phase tracking for the chart initialization cycle

use crate::{IntegrationError, Result};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::time::Instant;

const MAX_HISTORY: usize = 64;

/// Phases of one initialization cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChartPhase {
    Idle,
    AwaitingData,
    AwaitingContainer,
    Validating,
    Rendering,
    Ready,
    ErrorBackoff,
    Exhausted,
}

impl ChartPhase {
    /// Phases in which a cycle is running.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ChartPhase::AwaitingData
                | ChartPhase::AwaitingContainer
                | ChartPhase::Validating
                | ChartPhase::Rendering
        )
    }
}

/// Phase tracker shared between the controller and its background tasks
#[derive(Clone)]
pub struct PhaseTracker {
    phase: Arc<RwLock<ChartPhase>>,
    history: Arc<RwLock<VecDeque<(Instant, ChartPhase)>>>,
    stats: Arc<RwLock<PhaseStats>>,
}

impl PhaseTracker {
    pub fn new() -> Self {
        let mut history = VecDeque::with_capacity(MAX_HISTORY);
        history.push_back((Instant::now(), ChartPhase::Idle));
        Self {
            phase: Arc::new(RwLock::new(ChartPhase::Idle)),
            history: Arc::new(RwLock::new(history)),
            stats: Arc::new(RwLock::new(PhaseStats::default())),
        }
    }

    pub fn current(&self) -> ChartPhase {
        *self.phase.read()
    }

    /// Move to `next`, rejecting transitions the cycle does not allow.
    pub fn transition_to(&self, next: ChartPhase) -> Result<()> {
        let previous = {
            let mut phase = self.phase.write();
            let previous = *phase;
            if !Self::is_valid_transition(previous, next) {
                self.stats.write().rejected_transitions += 1;
                return Err(IntegrationError::Lifecycle(format!(
                    "Invalid transition from {previous:?} to {next:?}"
                )));
            }
            *phase = next;
            previous
        };

        {
            let mut history = self.history.write();
            if history.len() == MAX_HISTORY {
                history.pop_front();
            }
            history.push_back((Instant::now(), next));
        }

        let mut stats = self.stats.write();
        stats.transitions += 1;
        match next {
            ChartPhase::AwaitingData => stats.cycles_started += 1,
            ChartPhase::Ready => stats.cycles_completed += 1,
            ChartPhase::Exhausted => stats.exhaustions += 1,
            _ => {}
        }
        log::debug!("PhaseTracker - {previous:?} -> {next:?}");
        Ok(())
    }

    /// Most recent phases, oldest first.
    pub fn history(&self) -> Vec<ChartPhase> {
        self.history.read().iter().map(|(_, phase)| *phase).collect()
    }

    pub fn stats(&self) -> PhaseStats {
        self.stats.read().clone()
    }

    fn is_valid_transition(from: ChartPhase, to: ChartPhase) -> bool {
        use ChartPhase::*;

        match (from, to) {
            // A cycle starts from rest, from a finished render, after a
            // backoff, or when new data arrives after exhaustion.
            (Idle | Ready | ErrorBackoff | Exhausted, AwaitingData) => true,

            // Forward flow
            (AwaitingData, AwaitingContainer) => true,
            (AwaitingContainer, Validating) => true,
            (Validating, Rendering) => true,
            (Rendering, Ready) => true,

            // Failures from any step, including a reload started while idle
            // or backing off. Exhausted stays put until new data arrives.
            (Exhausted, ErrorBackoff | Exhausted) => false,
            (from, ErrorBackoff | Exhausted) => from != to,

            // Teardown
            (_, Idle) => true,

            _ => false,
        }
    }
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Phase statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct PhaseStats {
    pub transitions: u64,
    pub rejected_transitions: u64,
    pub cycles_started: u64,
    pub cycles_completed: u64,
    pub exhaustions: u64,
}
