use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::problem::{check_decision_vector, check_fitness_vector, DecisionVector, FitnessVector, ProblemHandle};
use crate::rng::get_rng;

/// A single candidate solution: a unique ID, its decision vector and the fitness vector obtained
/// by evaluating it against a [`crate::problem::Problem`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Individual {
    pub id: u64,
    pub x: DecisionVector,
    pub f: FitnessVector,
}

/// Three parallel sequences (IDs, decision vectors, fitness vectors) of equal length. Used to
/// move individuals in and out of the migrant database without requiring a bound [`Problem`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IndividualsGroup {
    pub ids: Vec<u64>,
    pub xs: Vec<DecisionVector>,
    pub fs: Vec<FitnessVector>,
}

impl IndividualsGroup {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn from_individuals(individuals: &[Individual]) -> Self {
        let mut group = Self::empty();
        for i in individuals {
            group.ids.push(i.id);
            group.xs.push(i.x.clone());
            group.fs.push(i.f.clone());
        }
        group
    }

    pub fn to_individuals(&self) -> Vec<Individual> {
        self.ids
            .iter()
            .zip(self.xs.iter())
            .zip(self.fs.iter())
            .map(|((id, x), f)| Individual {
                id: *id,
                x: x.clone(),
                f: f.clone(),
            })
            .collect()
    }
}

/// A snapshot of a [`crate::individual::Population`] suitable for export: the live `Problem`
/// handle and RNG are dropped, only the plain data survives.
#[derive(Debug, Serialize, Deserialize)]
pub struct PopulationExport {
    pub individuals: Vec<Individual>,
    pub seed: u64,
}

/// The individuals of one island, bound to a [`Problem`]. Owns its own RNG so that, given a
/// fixed seed and a fixed problem, the sequence of generated IDs and random decision vectors is
/// reproducible.
pub struct Population {
    problem: ProblemHandle,
    individuals: Vec<Individual>,
    rng: Box<dyn rand::RngCore + Send>,
    seed: u64,
}

impl std::fmt::Debug for Population {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Population")
            .field("problem", &self.problem)
            .field("individuals", &self.individuals)
            .field("rng", &"<dyn RngCore>")
            .field("seed", &self.seed)
            .finish()
    }
}

impl Clone for Population {
    /// Deep-copy the population. The clone gets a *fresh* RNG reseeded from the same seed: this
    /// is safe because clones are only ever used for read-only snapshots (e.g.
    /// [`crate::island::Island::get_population`]) or migrant payloads, never re-installed as the
    /// live population an algorithm continues to evolve.
    fn clone(&self) -> Self {
        Self {
            problem: self.problem.clone(),
            individuals: self.individuals.clone(),
            rng: get_rng(Some(self.seed)),
            seed: self.seed,
        }
    }
}

impl Population {
    /// Create an empty population bound to `problem`.
    pub fn new(problem: ProblemHandle, seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or(0);
        Self {
            problem,
            individuals: Vec::new(),
            rng: get_rng(Some(seed)),
            seed,
        }
    }

    /// Create a population of `size` individuals, each initialised with a random decision
    /// vector drawn within the problem's bounds. Decision vectors are drawn sequentially off the
    /// population's own RNG (preserving the reproducible id/x sequence for a fixed seed), but
    /// fitness evaluation -- normally the expensive part -- is batched: a problem that overrides
    /// [`Problem::batch_fitness`] evaluates the whole initial population in one call, otherwise
    /// the individuals are evaluated concurrently across a rayon thread pool.
    pub fn init(problem: ProblemHandle, size: usize, seed: Option<u64>) -> Result<Self, Error> {
        let mut population = Self::new(problem.clone(), seed);
        let mut ids = Vec::with_capacity(size);
        let mut xs = Vec::with_capacity(size);
        for _ in 0..size {
            let x = population.random_decision_vector();
            check_decision_vector(problem.as_ref(), &x)?;
            ids.push(population.fresh_id());
            xs.push(x);
        }

        let fs = evaluate_batch(problem.as_ref(), &xs)?;
        for f in &fs {
            check_fitness_vector(problem.as_ref(), f)?;
        }

        population.individuals = ids
            .into_iter()
            .zip(xs)
            .zip(fs)
            .map(|((id, x), f)| Individual { id, x, f })
            .collect();
        Ok(population)
    }

    pub fn problem(&self) -> ProblemHandle {
        self.problem.clone()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    pub fn individual(&self, i: usize) -> Result<&Individual, Error> {
        self.individuals.get(i).ok_or(Error::OutOfRange {
            index: i,
            size: self.individuals.len(),
        })
    }

    pub fn ids(&self) -> Vec<u64> {
        self.individuals.iter().map(|i| i.id).collect()
    }

    pub fn xs(&self) -> Vec<DecisionVector> {
        self.individuals.iter().map(|i| i.x.clone()).collect()
    }

    pub fn fs(&self) -> Vec<FitnessVector> {
        self.individuals.iter().map(|i| i.f.clone()).collect()
    }

    fn fresh_id(&mut self) -> u64 {
        self.rng.next_u64()
    }

    /// Draw a decision vector uniformly within the problem's bounds. Components beyond
    /// `nx - nix` are left continuous; the trailing `nix` components (pagmo convention: integer
    /// dimensions are counted from the end of the decision vector) are rounded to the nearest
    /// integer on the bound grid.
    pub fn random_decision_vector(&mut self) -> DecisionVector {
        let bounds = self.problem.get_bounds();
        let nx = self.problem.get_nx();
        let nix = self.problem.get_nix().min(nx);
        let n_continuous = nx - nix;
        (0..nx)
            .map(|i| {
                let lb = bounds.lower[i];
                let ub = bounds.upper[i];
                let v = self.rng.gen_range(lb..=ub);
                if i >= n_continuous {
                    v.round()
                } else {
                    v
                }
            })
            .collect()
    }

    /// Append a new individual evaluated from `x`. Fails with [`Error::DimensionMismatch`] if
    /// `x` or the resulting fitness vector has the wrong length; the population is left
    /// unchanged on failure (strong exception safety).
    pub fn push_back(&mut self, x: DecisionVector) -> Result<u64, Error> {
        check_decision_vector(self.problem.as_ref(), &x)?;
        let f = self
            .problem
            .fitness(&x)
            .map_err(|e| Error::from_user_error(None, e))?;
        check_fitness_vector(self.problem.as_ref(), &f)?;

        let id = self.fresh_id();
        self.individuals.push(Individual { id, x, f });
        Ok(id)
    }

    /// Append an already-evaluated individual without calling the problem's evaluator. Used to
    /// inject migrants, whose fitness was computed on their originating island.
    pub(crate) fn inject(&mut self, id: u64, x: DecisionVector, f: FitnessVector) -> Result<(), Error> {
        check_decision_vector(self.problem.as_ref(), &x)?;
        check_fitness_vector(self.problem.as_ref(), &f)?;
        self.individuals.push(Individual { id, x, f });
        Ok(())
    }

    /// Overwrite the decision and fitness vectors of individual `i` in place, without
    /// re-evaluating. The individual's ID is preserved.
    pub fn set_both(&mut self, i: usize, x: DecisionVector, f: FitnessVector) -> Result<(), Error> {
        if i >= self.individuals.len() {
            return Err(Error::OutOfRange {
                index: i,
                size: self.individuals.len(),
            });
        }
        check_decision_vector(self.problem.as_ref(), &x)?;
        check_fitness_vector(self.problem.as_ref(), &f)?;
        self.individuals[i].x = x;
        self.individuals[i].f = f;
        Ok(())
    }

    /// Overwrite the decision vector of individual `i` and re-evaluate its fitness.
    pub fn set_x(&mut self, i: usize, x: DecisionVector) -> Result<(), Error> {
        if i >= self.individuals.len() {
            return Err(Error::OutOfRange {
                index: i,
                size: self.individuals.len(),
            });
        }
        check_decision_vector(self.problem.as_ref(), &x)?;
        let f = self
            .problem
            .fitness(&x)
            .map_err(|e| Error::from_user_error(None, e))?;
        check_fitness_vector(self.problem.as_ref(), &f)?;
        self.individuals[i].x = x;
        self.individuals[i].f = f;
        Ok(())
    }

    /// The index of the best individual under the standard constrained ordering: feasible
    /// individuals beat infeasible ones; among feasible individuals the lowest objective wins;
    /// among infeasible individuals the lowest aggregated constraint violation wins.
    /// `tol` is the per-constraint tolerance (broadcast from a scalar to `nec + nic` if it has
    /// length 1).
    ///
    /// Fails with [`Error::InvalidOperation`] if the problem has more than one objective or the
    /// population is empty.
    pub fn champion(&self, tol: &[f64]) -> Result<usize, Error> {
        if self.problem.get_nobj() > 1 {
            return Err(Error::InvalidOperation(
                "champion is only defined for single-objective problems".to_string(),
            ));
        }
        if self.individuals.is_empty() {
            return Err(Error::InvalidOperation(
                "cannot compute the champion of an empty population".to_string(),
            ));
        }

        let tol = broadcast_tolerance(tol, self.problem.get_nec() + self.problem.get_nic());
        let mut best = 0usize;
        for i in 1..self.individuals.len() {
            if crate::dominance::better_single_objective(
                &self.individuals[i],
                &self.individuals[best],
                self.problem.get_nec(),
                self.problem.get_nic(),
                &tol,
            ) {
                best = i;
            }
        }
        Ok(best)
    }

    pub fn serialise(&self) -> PopulationExport {
        PopulationExport {
            individuals: self.individuals.clone(),
            seed: self.seed,
        }
    }

    pub fn deserialise(problem: ProblemHandle, export: PopulationExport) -> Result<Self, Error> {
        for i in &export.individuals {
            check_decision_vector(problem.as_ref(), &i.x)?;
            check_fitness_vector(problem.as_ref(), &i.f)?;
        }
        Ok(Self {
            problem,
            individuals: export.individuals,
            rng: get_rng(Some(export.seed)),
            seed: export.seed,
        })
    }
}

/// Evaluate `xs` against `problem`, preferring the problem's own batch path when it provides
/// one and falling back to evaluating each decision vector concurrently across a rayon thread
/// pool otherwise.
fn evaluate_batch(problem: &dyn crate::problem::Problem, xs: &[DecisionVector]) -> Result<Vec<FitnessVector>, Error> {
    if let Some(result) = problem.batch_fitness(xs) {
        return result.map_err(|e| Error::from_user_error(None, e));
    }

    use rayon::prelude::*;
    xs.par_iter()
        .map(|x| problem.fitness(x).map_err(|e| Error::from_user_error(None, e)))
        .collect()
}

/// Broadcast a scalar tolerance to `n` components, or pass through a vector already of length
/// `n`.
pub(crate) fn broadcast_tolerance(tol: &[f64], n: usize) -> Vec<f64> {
    if tol.len() == 1 {
        vec![tol[0]; n]
    } else {
        tol.to_vec()
    }
}
