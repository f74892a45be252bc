//! Concurrency and migration core for a parallel metaheuristic optimisation framework.
//!
//! An [`archipelago::Archipelago`] holds a collection of [`island::Island`]s, each evolving its
//! own [`individual::Population`] against a user-supplied [`problem::Problem`] using a
//! user-supplied [`algorithm::Algorithm`], dispatched through a user-supplied
//! [`udi::Udi`] execution strategy. Islands exchange individuals along a
//! [`topology::Topology`] using a [`policy::MigrationPolicy`].
//!
//! Evolution is asynchronous: [`island::Island::evolve`] and [`archipelago::Archipelago::evolve`]
//! queue work on a dedicated worker thread per island and return immediately; `wait` /
//! `wait_check` block until the queue has drained and surface any error raised by a user
//! plug-in.

mod algorithm;
mod archipelago;
mod dominance;
mod error;
mod individual;
mod island;
mod migrants;
mod policy;
mod problem;
mod rng;
mod serde_arc;
mod topology;
mod udi;

#[cfg(test)]
mod test_utils;

pub use algorithm::{Algorithm, AlgorithmHandle};
pub use archipelago::{Archipelago, ArchipelagoArgs};
pub use error::{Error, OResult};
pub use individual::{Individual, IndividualsGroup, Population, PopulationExport};
pub use island::{Island, IslandArgs, IslandExport, IslandStatus};
pub use migrants::MigrantDb;
pub use policy::{DefaultMigrationPolicy, MigrationPolicy};
pub use problem::{Bounds, DecisionVector, FitnessVector, Problem, ProblemHandle};
pub use topology::{FullyConnected, Ring, Topology, TopologyHandle, Unconnected};
pub use udi::{ThreadIsland, Udi, UdiHandle};
