use std::error::Error as StdError;
use std::fmt::Debug;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::algorithm::AlgorithmHandle;
use crate::individual::Population;

/// The user-defined island execution strategy: given an algorithm and a population, run exactly
/// one evolve step and return the resulting (algorithm, population) pair. Most UDIs simply call
/// `algorithm.evolve(population)` on a dedicated thread; the indirection exists so that a UDI can
/// instead dispatch to a process pool, a remote worker, or any other execution strategy without
/// [`crate::island::Island`] needing to know about it.
///
/// Implementations register as type-erased, serializable plug-ins with `#[typetag::serde]`.
#[typetag::serde(tag = "udi")]
pub trait Udi: Send + Sync + Debug {
    /// Run one evolve step. `algorithm` is handed back unchanged unless the UDI's execution
    /// strategy itself mutates algorithm state (most do not).
    fn run_evolve(
        &self,
        algorithm: AlgorithmHandle,
        population: Population,
    ) -> Result<(AlgorithmHandle, Population), Box<dyn StdError + Send + Sync>>;

    /// A human-readable UDI name, used in [`crate::island::Island::get_name`] composition.
    fn name(&self) -> String {
        "Unnamed UDI".to_string()
    }
}

/// A cheap-to-clone handle to a type-erased [`Udi`].
pub type UdiHandle = Arc<dyn Udi>;

/// The default UDI: runs the algorithm synchronously, on whatever thread calls `run_evolve`
/// (which, for [`crate::island::Island`], is the island's own dedicated worker thread).
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ThreadIsland;

#[typetag::serde]
impl Udi for ThreadIsland {
    fn run_evolve(
        &self,
        algorithm: AlgorithmHandle,
        population: Population,
    ) -> Result<(AlgorithmHandle, Population), Box<dyn StdError + Send + Sync>> {
        let evolved = algorithm.evolve(population)?;
        Ok((algorithm, evolved))
    }

    fn name(&self) -> String {
        "Thread island".to_string()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::problem::ProblemHandle;
    use crate::test_utils::{IdentityAlgorithm, SphereProblem};
    use std::sync::Arc;

    #[test]
    fn test_thread_island_runs_algorithm_synchronously() {
        let problem: ProblemHandle = Arc::new(SphereProblem::new(2));
        let population = Population::init(problem, 3, Some(1)).unwrap();
        let algorithm: AlgorithmHandle = Arc::new(IdentityAlgorithm);
        let udi = ThreadIsland;

        let (_alg, out) = udi.run_evolve(algorithm, population).unwrap();
        assert_eq!(out.len(), 3);
    }
}
