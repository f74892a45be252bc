use std::error::Error as StdError;
use std::fmt::Debug;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// An ordered sequence of real numbers of length `problem.nx`.
pub type DecisionVector = Vec<f64>;

/// An ordered sequence of real numbers of length `problem.nf`.
pub type FitnessVector = Vec<f64>;

/// The lower and upper bounds of a problem's decision vector.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Bounds {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

/// The opaque evaluator a user plugs into an [`crate::island::Island`]. A `Problem` is a
/// value-like handle: cloning it (via [`ProblemHandle`]) must be cheap, and nothing about its
/// internal state changes as a result of calling `fitness`.
///
/// Implementations are registered as type-erased, serializable plug-ins with
/// `#[typetag::serde]`, the same pattern used elsewhere in this codebase family for
/// serializable trait-object plug-ins.
#[typetag::serde(tag = "problem")]
pub trait Problem: Send + Sync + Debug {
    /// Evaluate the fitness vector for a decision vector. `x.len()` is guaranteed by the caller
    /// to equal [`Problem::get_nx`].
    fn fitness(&self, x: &[f64]) -> Result<FitnessVector, Box<dyn StdError + Send + Sync>>;

    /// The lower and upper bound for each decision variable.
    fn get_bounds(&self) -> Bounds;

    /// The number of decision variables.
    fn get_nx(&self) -> usize;

    /// The number of objectives. `1` for single-objective problems.
    fn get_nobj(&self) -> usize;

    /// The number of equality constraints. Defaults to `0`.
    fn get_nec(&self) -> usize {
        0
    }

    /// The number of inequality constraints. Defaults to `0`.
    fn get_nic(&self) -> usize {
        0
    }

    /// The number of decision variables constrained to integer values, counted from the end of
    /// the decision vector (pagmo convention). Defaults to `0`.
    fn get_nix(&self) -> usize {
        0
    }

    /// The length of the fitness vector: `1 + nec + nic + (nobj - 1)`, i.e. `nobj + nec + nic`.
    fn get_nf(&self) -> usize {
        self.get_nobj() + self.get_nec() + self.get_nic()
    }

    /// A human-readable problem name, used in [`crate::island::Island::get_name`] composition.
    fn name(&self) -> String {
        "Unnamed problem".to_string()
    }

    /// Evaluate a batch of decision vectors at once. Problems that can amortise evaluation cost
    /// (vectorised objective functions, shared simulation state) override this; the default
    /// falls back to repeated [`Problem::fitness`] calls and signals that no specialised batch
    /// path is available by returning `None`.
    fn batch_fitness(
        &self,
        _xs: &[DecisionVector],
    ) -> Option<Result<Vec<FitnessVector>, Box<dyn StdError + Send + Sync>>> {
        None
    }

    /// The gradient of the fitness vector at `x`, sparse or dense depending on the
    /// implementation. `None` when the problem does not support differentiation.
    fn gradient(
        &self,
        _x: &[f64],
    ) -> Option<Result<Vec<f64>, Box<dyn StdError + Send + Sync>>> {
        None
    }

    /// The Hessians of each fitness component at `x`. `None` when unsupported.
    fn hessians(
        &self,
        _x: &[f64],
    ) -> Option<Result<Vec<Vec<f64>>, Box<dyn StdError + Send + Sync>>> {
        None
    }
}

/// A cheap-to-clone handle to a type-erased [`Problem`].
pub type ProblemHandle = Arc<dyn Problem>;

/// Validate that `x` has the length the problem expects.
pub(crate) fn check_decision_vector(problem: &dyn Problem, x: &[f64]) -> Result<(), Error> {
    let expected = problem.get_nx();
    if x.len() != expected {
        return Err(Error::DimensionMismatch {
            expected,
            actual: x.len(),
        });
    }
    Ok(())
}

/// Validate that `f` has the length the problem expects.
pub(crate) fn check_fitness_vector(problem: &dyn Problem, f: &[f64]) -> Result<(), Error> {
    let expected = problem.get_nf();
    if f.len() != expected {
        return Err(Error::DimensionMismatch {
            expected,
            actual: f.len(),
        });
    }
    Ok(())
}
