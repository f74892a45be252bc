//! Toy plug-ins used across the unit and integration test suites: a couple of minimal
//! `Problem`s and a couple of minimal `Algorithm`s, providing fixed, deterministic fixtures for
//! the rest of the crate's test suite.

use std::error::Error as StdError;

use serde::{Deserialize, Serialize};

use crate::algorithm::Algorithm;
use crate::individual::Population;
use crate::problem::{Bounds, FitnessVector, Problem};

/// `f(x) = sum(x_i^2)`, bounds `[-5, 5]` on every dimension. Single objective, no constraints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SphereProblem {
    nx: usize,
}

impl SphereProblem {
    pub(crate) fn new(nx: usize) -> Self {
        Self { nx }
    }
}

#[typetag::serde]
impl Problem for SphereProblem {
    fn fitness(&self, x: &[f64]) -> Result<FitnessVector, Box<dyn StdError + Send + Sync>> {
        Ok(vec![x.iter().map(|v| v * v).sum()])
    }

    fn get_bounds(&self) -> Bounds {
        Bounds {
            lower: vec![-5.0; self.nx],
            upper: vec![5.0; self.nx],
        }
    }

    fn get_nx(&self) -> usize {
        self.nx
    }

    fn get_nobj(&self) -> usize {
        1
    }

    fn name(&self) -> String {
        "Sphere".to_string()
    }
}

/// A two-objective problem on a single variable: `f1(x) = x^2`, `f2(x) = (x - 2)^2`. The Pareto
/// front is `x in [0, 2]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct TwoObjectiveProblem;

#[typetag::serde]
impl Problem for TwoObjectiveProblem {
    fn fitness(&self, x: &[f64]) -> Result<FitnessVector, Box<dyn StdError + Send + Sync>> {
        Ok(vec![x[0] * x[0], (x[0] - 2.0) * (x[0] - 2.0)])
    }

    fn get_bounds(&self) -> Bounds {
        Bounds {
            lower: vec![-5.0],
            upper: vec![5.0],
        }
    }

    fn get_nx(&self) -> usize {
        1
    }

    fn get_nobj(&self) -> usize {
        2
    }

    fn name(&self) -> String {
        "Two-objective toy".to_string()
    }
}

/// Returns the population unchanged. Useful as a neutral baseline in tests that only care about
/// the island/archipelago plumbing, not actual optimisation progress.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct IdentityAlgorithm;

#[typetag::serde]
impl Algorithm for IdentityAlgorithm {
    fn evolve(&self, population: Population) -> Result<Population, Box<dyn StdError + Send + Sync>> {
        Ok(population)
    }

    fn name(&self) -> String {
        "Identity".to_string()
    }
}

/// Scales every decision vector towards the origin by `factor` and re-evaluates. On
/// [`SphereProblem`] this strictly decreases the objective every call, which is useful for
/// scenarios that need to observe genuine, deterministic improvement.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ShrinkAlgorithm {
    pub factor: f64,
}

#[typetag::serde]
impl Algorithm for ShrinkAlgorithm {
    fn evolve(&self, mut population: Population) -> Result<Population, Box<dyn StdError + Send + Sync>> {
        for i in 0..population.len() {
            let x: Vec<f64> = population.individual(i)?.x.iter().map(|v| v * self.factor).collect();
            population.set_x(i, x)?;
        }
        Ok(population)
    }

    fn name(&self) -> String {
        "Shrink".to_string()
    }
}

/// Like [`SphereProblem`] but overrides [`Problem::batch_fitness`], evaluating the whole batch
/// in one call instead of falling back to per-individual evaluation.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct CountingBatchProblem {
    nx: usize,
}

impl CountingBatchProblem {
    pub(crate) fn new(nx: usize) -> Self {
        Self { nx }
    }
}

#[typetag::serde]
impl Problem for CountingBatchProblem {
    fn fitness(&self, x: &[f64]) -> Result<FitnessVector, Box<dyn StdError + Send + Sync>> {
        Ok(vec![x.iter().map(|v| v * v).sum()])
    }

    fn get_bounds(&self) -> Bounds {
        Bounds {
            lower: vec![-5.0; self.nx],
            upper: vec![5.0; self.nx],
        }
    }

    fn get_nx(&self) -> usize {
        self.nx
    }

    fn get_nobj(&self) -> usize {
        1
    }

    fn batch_fitness(
        &self,
        xs: &[crate::problem::DecisionVector],
    ) -> Option<Result<Vec<FitnessVector>, Box<dyn StdError + Send + Sync>>> {
        Some(Ok(xs
            .iter()
            .map(|x| vec![x.iter().map(|v| v * v).sum()])
            .collect()))
    }
}

/// Always fails. Used to test that one island's failure is isolated from the rest of the
/// archipelago (does not poison other islands, is reported by `wait_check`).
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct FailingAlgorithm;

#[typetag::serde]
impl Algorithm for FailingAlgorithm {
    fn evolve(&self, _population: Population) -> Result<Population, Box<dyn StdError + Send + Sync>> {
        Err("FailingAlgorithm always fails".into())
    }

    fn name(&self) -> String {
        "Failing".to_string()
    }
}
