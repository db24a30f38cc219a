//! Counter self-heal path.
//!
//! Database triggers keep `task_count` / `completed_task_count` consistent
//! on every committed write; this projector verifies them on demand and
//! repairs drift (e.g. after a restore or manual surgery).

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainResult;
use crate::domain::ports::{BranchRepository, CounterDrift};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecomputeReport {
    pub corrected_branches: usize,
    pub discrepancies: Vec<Discrepancy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discrepancy {
    pub branch_id: uuid::Uuid,
    pub stored_task_count: i64,
    pub actual_task_count: i64,
    pub stored_completed_count: i64,
    pub actual_completed_count: i64,
}

impl From<CounterDrift> for Discrepancy {
    fn from(d: CounterDrift) -> Self {
        Self {
            branch_id: d.branch_id,
            stored_task_count: d.stored_task_count,
            actual_task_count: d.actual_task_count,
            stored_completed_count: d.stored_completed_count,
            actual_completed_count: d.actual_completed_count,
        }
    }
}

#[derive(Clone)]
pub struct CounterProjector {
    branches: Arc<dyn BranchRepository>,
}

impl CounterProjector {
    pub fn new(branches: Arc<dyn BranchRepository>) -> Self {
        Self { branches }
    }

    /// Report drift without mutating anything.
    pub async fn verify(&self) -> DomainResult<Vec<Discrepancy>> {
        Ok(self
            .branches
            .counter_drift()
            .await?
            .into_iter()
            .map(Discrepancy::from)
            .collect())
    }

    /// Recompute counters for every branch in scope and report what was
    /// wrong beforehand.
    pub async fn recompute(&self) -> DomainResult<RecomputeReport> {
        let discrepancies = self.verify().await?;
        let corrected_branches = self.branches.recompute_counters().await?;
        Ok(RecomputeReport { corrected_branches, discrepancies })
    }
}
