use serde::{Deserialize, Serialize};

use crate::distributor::{DistributeOptions, FairDistributor};
use crate::error::DistributionError;
use crate::extract::Assignment;
use crate::solver::{SolverBackend, default_backend};
use crate::timing::PhaseTimings;

/// A distribution problem as read from a YAML document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub targets: Vec<String>,
    pub objects: Vec<String>,
    /// One row per target, one column per object.
    pub weights: Vec<Vec<f64>>,
    #[serde(default = "default_fairness")]
    pub fairness: bool,
}

fn default_fairness() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub solution: Assignment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timings: Option<PhaseTimings>,
}

impl Problem {
    pub fn distributor(&self) -> FairDistributor {
        FairDistributor::new(
            self.targets.iter().cloned(),
            self.objects.iter().cloned(),
            self.weights.clone(),
        )
    }

    pub fn solve(&self) -> Result<Solution, DistributionError> {
        self.solve_with(&DistributeOptions::new(), &mut default_backend())
    }

    /// Solve with explicit options; `options.fairness` is overridden by the
    /// document's own `fairness` field.
    pub fn solve_with<B>(
        &self,
        options: &DistributeOptions,
        backend: &mut B,
    ) -> Result<Solution, DistributionError>
    where
        B: SolverBackend + ?Sized,
    {
        let options = options.clone().fairness(self.fairness);
        let distribution = self.distributor().distribute_with(&options, backend)?;
        let timings = distribution.timings.clone();

        Ok(Solution {
            solution: distribution.into_assignment()?,
            timings: Some(timings),
        })
    }
}
