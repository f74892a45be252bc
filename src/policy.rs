use std::fmt::Debug;

use crate::dominance::fast_non_dominated_sort_broadcast;
use crate::error::Error;
use crate::individual::{Individual, IndividualsGroup, Population};

/// The policy deciding which individuals an island offers up for migration after a successful
/// evolve step. Left as an explicit configuration surface rather than hard-coded, so callers can
/// swap in their own emigrant selection and replacement rules.
pub trait MigrationPolicy: Send + Sync + Debug {
    /// Select the individuals of `population` to publish as this island's current emigrants.
    fn select_emigrants(&self, population: &Population) -> Result<IndividualsGroup, Error>;

    fn name(&self) -> String {
        "Unnamed migration policy".to_string()
    }
}

/// Champion-only selection for single-objective problems; the first non-dominated front,
/// capped at `max_emigrants`, for multi-objective ones. Replacement at the receiving island is
/// always append-only (new individuals are added to the population, nothing is evicted), keeping
/// population size non-decreasing across a migration pull.
#[derive(Debug, Clone)]
pub struct DefaultMigrationPolicy {
    pub max_emigrants: usize,
    pub tolerance: Vec<f64>,
}

impl Default for DefaultMigrationPolicy {
    fn default() -> Self {
        Self {
            max_emigrants: 1,
            tolerance: vec![1e-9],
        }
    }
}

impl MigrationPolicy for DefaultMigrationPolicy {
    fn select_emigrants(&self, population: &Population) -> Result<IndividualsGroup, Error> {
        if population.is_empty() {
            return Ok(IndividualsGroup::empty());
        }
        let problem = population.problem();
        if problem.get_nobj() <= 1 {
            let champion = population.champion(&self.tolerance)?;
            return Ok(IndividualsGroup::from_individuals(&[population
                .individual(champion)?
                .clone()]));
        }

        let fronts = fast_non_dominated_sort_broadcast(
            population.individuals(),
            problem.get_nobj(),
            problem.get_nec(),
            problem.get_nic(),
            &self.tolerance,
        );
        let selected: Vec<Individual> = fronts
            .into_iter()
            .next()
            .unwrap_or_default()
            .into_iter()
            .take(self.max_emigrants)
            .map(|i| population.individuals()[i].clone())
            .collect();
        Ok(IndividualsGroup::from_individuals(&selected))
    }

    fn name(&self) -> String {
        "Default migration policy".to_string()
    }
}
