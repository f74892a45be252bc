use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use log::info;
use serde::{Deserialize, Serialize};

use crate::algorithm::AlgorithmHandle;
use crate::error::Error;
use crate::individual::IndividualsGroup;
use crate::island::{Island, IslandArgs, IslandExport};
use crate::migrants::MigrantDb;
use crate::policy::{DefaultMigrationPolicy, MigrationPolicy};
use crate::problem::{DecisionVector, FitnessVector, ProblemHandle};
use crate::rng::MetaRng;
use crate::topology::{Topology, Unconnected};
use crate::udi::UdiHandle;

/// The shared state backing an [`Archipelago`] handle. Islands hold a non-owning [`Weak`]
/// reference to this struct so that dropping the last `Archipelago` handle does not keep
/// islands (and their worker threads) alive forever.
pub(crate) struct ArchipelagoInner {
    islands: Mutex<Vec<Island>>,
    idx_map: Mutex<HashMap<usize, usize>>,
    topology: RwLock<Box<dyn Topology>>,
    migrants: Mutex<MigrantDb>,
    policy: Arc<dyn MigrationPolicy>,
    migration_probability: f64,
    max_migrants: usize,
    meta_rng: Mutex<MetaRng>,
}

impl ArchipelagoInner {
    pub(crate) fn migrants(&self) -> &Mutex<MigrantDb> {
        &self.migrants
    }

    pub(crate) fn policy(&self) -> Arc<dyn MigrationPolicy> {
        self.policy.clone()
    }

    pub(crate) fn migration_probability(&self) -> f64 {
        self.migration_probability
    }

    pub(crate) fn max_migrants(&self) -> usize {
        self.max_migrants
    }

    pub(crate) fn get_connections(&self, i: usize) -> Result<(Vec<usize>, Vec<f64>), Error> {
        let topology = self.topology.read().unwrap();
        if i >= topology.num_vertices() {
            return Err(Error::OutOfRange {
                index: i,
                size: topology.num_vertices(),
            });
        }
        Ok(topology.get_connections(i))
    }
}

/// The implementation-defined maximum number of islands an archipelago can hold. Chosen high
/// enough that no realistic caller hits it, while still giving [`Error::Overflow`] somewhere to
/// trigger rather than leaving `push_back` unbounded.
const MAX_ISLANDS: usize = u32::MAX as usize;

/// `true` if `current` islands already fills (or exceeds) `max`. Split out from [`Archipelago::attach`]
/// so the boundary condition can be exercised directly without constructing `max` real islands.
fn capacity_exceeded(current: usize, max: usize) -> bool {
    current >= max
}

/// Construction arguments for an [`Archipelago`].
pub struct ArchipelagoArgs {
    /// Seeds the meta-RNG used to derive a distinct, reproducible population seed for each
    /// island pushed onto this archipelago: the seed is never handed to islands verbatim, so
    /// islands never draw identical decision vectors.
    pub seed: Option<u64>,
    pub topology: Option<Box<dyn Topology>>,
    pub policy: Option<Arc<dyn MigrationPolicy>>,
    /// Probability, per evolve step, that an island attempts a migration pull.
    pub migration_probability: f64,
    /// Maximum number of individuals pulled per migration attempt.
    pub max_migrants: usize,
}

impl Default for ArchipelagoArgs {
    fn default() -> Self {
        Self {
            seed: None,
            topology: None,
            policy: None,
            migration_probability: 1.0,
            max_migrants: 1,
        }
    }
}

/// An asynchronously-evolving collection of [`Island`]s connected by a migration
/// [`crate::topology::Topology`].
///
/// `Archipelago` is a value-like handle: cloning it shares the same underlying islands and
/// migration state.
#[derive(Clone)]
pub struct Archipelago {
    inner: Arc<ArchipelagoInner>,
}

impl Archipelago {
    pub fn new(args: ArchipelagoArgs) -> Self {
        let inner = Arc::new(ArchipelagoInner {
            islands: Mutex::new(Vec::new()),
            idx_map: Mutex::new(HashMap::new()),
            topology: RwLock::new(args.topology.unwrap_or_else(|| Box::new(Unconnected::default()))),
            migrants: Mutex::new(MigrantDb::new(0)),
            policy: args
                .policy
                .unwrap_or_else(|| Arc::new(DefaultMigrationPolicy::default())),
            migration_probability: args.migration_probability,
            max_migrants: args.max_migrants,
            meta_rng: Mutex::new(MetaRng::new(args.seed)),
        });
        info!("archipelago constructed");
        Self { inner }
    }

    /// Build and attach a new island, returning its index. The island's population seed is
    /// derived from this archipelago's meta-RNG, not supplied directly, so that islands pushed
    /// onto the same archipelago never draw identical decision vectors even when the
    /// archipelago itself was constructed with a fixed seed.
    pub fn push_back(
        &self,
        problem: ProblemHandle,
        algorithm: AlgorithmHandle,
        udi: Option<UdiHandle>,
        population_size: usize,
    ) -> Result<usize, Error> {
        let seed = self.inner.meta_rng.lock().unwrap().next_seed();
        let island = Island::new(IslandArgs {
            problem,
            algorithm,
            udi,
            population_size,
            seed: Some(seed),
        })?;
        self.attach(island)
    }

    /// Attach an already-constructed, standalone island. Used by [`Archipelago::from_json`] to
    /// reinstall islands that already carry a loaded population.
    fn attach(&self, island: Island) -> Result<usize, Error> {
        let mut islands = self.inner.islands.lock().unwrap();
        if capacity_exceeded(islands.len(), MAX_ISLANDS) {
            return Err(Error::Overflow(MAX_ISLANDS));
        }
        let index = islands.len();

        self.inner.topology.write().unwrap().push_back(index);
        self.inner.migrants.lock().unwrap().push_back();
        self.inner
            .idx_map
            .lock()
            .unwrap()
            .insert(island.ptr_id(), index);

        island.bind(Arc::downgrade(&self.inner), index);
        islands.push(island);
        info!("archipelago: island {index} attached");
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.inner.islands.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A cloned handle to island `i`.
    pub fn island(&self, i: usize) -> Result<Island, Error> {
        let islands = self.inner.islands.lock().unwrap();
        islands.get(i).cloned().ok_or(Error::OutOfRange {
            index: i,
            size: islands.len(),
        })
    }

    /// The index of `island` within this archipelago, found by pointer identity.
    pub fn get_island_idx(&self, island: &Island) -> Result<usize, Error> {
        self.inner
            .idx_map
            .lock()
            .unwrap()
            .get(&island.ptr_id())
            .copied()
            .ok_or(Error::NotFound)
    }

    /// Queue one evolve step on every island.
    pub fn evolve(&self) -> Result<(), Error> {
        let islands = self.inner.islands.lock().unwrap().clone();
        for island in &islands {
            island.evolve()?;
        }
        Ok(())
    }

    /// Block until every island has drained its evolve queue.
    pub fn wait(&self) {
        let islands = self.inner.islands.lock().unwrap().clone();
        for island in &islands {
            island.wait();
        }
    }

    /// Block until every island has drained its evolve queue, then return the (island index,
    /// error) pairs for every island whose last evolve step failed. Empty if none did.
    pub fn wait_check(&self) -> Vec<(usize, Error)> {
        let islands = self.inner.islands.lock().unwrap().clone();
        let mut failures = Vec::new();
        for (i, island) in islands.iter().enumerate() {
            if let Err(e) = island.wait_check() {
                failures.push((i, e));
            }
        }
        failures
    }

    /// A single status folded over every island: `Error` if any island has a latched error,
    /// else `Busy` if any island is still evolving, else `Idle`.
    pub fn status(&self) -> crate::island::IslandStatus {
        use crate::island::IslandStatus;
        let islands = self.inner.islands.lock().unwrap().clone();
        let mut busy = false;
        for island in &islands {
            match island.status() {
                IslandStatus::Error => return IslandStatus::Error,
                IslandStatus::Busy => busy = true,
                IslandStatus::Idle => {}
            }
        }
        if busy {
            IslandStatus::Busy
        } else {
            IslandStatus::Idle
        }
    }

    /// Build a deep, independent copy of this archipelago. Waits for every island to reach idle,
    /// then constructs a new archipelago whose islands, migrant database and topology are
    /// separate copies of this one's, with no evolve tasks pending. `self` is left running
    /// untouched; this is not the same thing as `Clone`, which hands back a second handle to the
    /// *same* underlying state.
    pub fn duplicate(&self) -> Result<Self, Error> {
        self.wait();

        let islands_snapshot = self.inner.islands.lock().unwrap().clone();
        let migrants = self.inner.migrants.lock().unwrap().clone();
        let topology = {
            let guard = self.inner.topology.read().unwrap();
            let current: &dyn Topology = guard.as_ref();
            duplicate_topology(current)?
        };

        let copy = Self::new(ArchipelagoArgs {
            topology: Some(topology),
            policy: Some(self.inner.policy.clone()),
            migration_probability: self.inner.migration_probability,
            max_migrants: self.inner.max_migrants,
            ..Default::default()
        });

        for island in &islands_snapshot {
            let independent = Island::deserialise(island.serialise())?;
            copy.attach(independent)?;
        }
        copy.set_migrants_db(migrants)?;

        info!("archipelago duplicated: {} island(s)", copy.len());
        Ok(copy)
    }

    pub fn get_topology(&self) -> Vec<Vec<usize>> {
        let topology = self.inner.topology.read().unwrap();
        (0..topology.num_vertices())
            .map(|i| topology.get_connections(i).0)
            .collect()
    }

    /// Replace the migration topology. Waits for every island to reach idle first, so no
    /// in-flight migration pull can read a mix of the old and new topology; the new topology is
    /// then grown to match the current island count before being installed.
    pub fn set_topology(&self, mut topology: Box<dyn Topology>) {
        self.wait();
        let n = self.len();
        for i in 0..n {
            topology.push_back(i);
        }
        *self.inner.topology.write().unwrap() = topology;
    }

    pub fn get_island_connections(&self, i: usize) -> Result<Vec<usize>, Error> {
        Ok(self.inner.get_connections(i)?.0)
    }

    pub fn get_migrants_db(&self) -> MigrantDb {
        self.inner.migrants.lock().unwrap().clone()
    }

    pub fn set_migrants_db(&self, db: MigrantDb) -> Result<(), Error> {
        if db.len() != self.len() {
            return Err(Error::ContractViolation(format!(
                "migrant database has {} slots but archipelago has {} islands",
                db.len(),
                self.len()
            )));
        }
        *self.inner.migrants.lock().unwrap() = db;
        Ok(())
    }

    /// Pull the individuals currently available for island `i` to migrate in, without injecting
    /// them into any population. Exposed for inspection/testing of the migration protocol in
    /// isolation from an island's worker thread.
    pub fn extract_migrants(&self, i: usize) -> Result<IndividualsGroup, Error> {
        let (sources, _weights) = self.inner.get_connections(i)?;
        self.inner
            .migrants
            .lock()
            .unwrap()
            .pull(&sources, self.inner.max_migrants)
    }

    /// The decision vector of the champion of each island, in island order. Fails with
    /// [`Error::InvalidOperation`] (via [`crate::individual::Population::champion`]) if any
    /// island is multi-objective or has an empty population -- the call either returns a
    /// champion for every island or none at all, it never substitutes a placeholder for the
    /// islands that don't have one.
    pub fn get_champions_x(&self) -> Result<Vec<DecisionVector>, Error> {
        Ok(self.champions()?.into_iter().map(|(x, _)| x).collect())
    }

    /// The fitness vector of the champion of each island, in island order. See
    /// [`Archipelago::get_champions_x`] for failure conditions.
    pub fn get_champions_f(&self) -> Result<Vec<FitnessVector>, Error> {
        Ok(self.champions()?.into_iter().map(|(_, f)| f).collect())
    }

    fn champions(&self) -> Result<Vec<(DecisionVector, FitnessVector)>, Error> {
        let islands = self.inner.islands.lock().unwrap().clone();
        let mut out = Vec::with_capacity(islands.len());
        for island in &islands {
            let population = island.get_population();
            let champion = population.champion(&[1e-9])?;
            let individual = population.individual(champion)?;
            out.push((individual.x.clone(), individual.f.clone()));
        }
        Ok(out)
    }

    pub fn to_json(&self) -> Result<String, Error> {
        let export = ArchipelagoExport {
            islands: {
                let islands = self.inner.islands.lock().unwrap().clone();
                islands.iter().map(|i| i.serialise()).collect()
            },
            migrants: self.get_migrants_db(),
            migration_probability: self.inner.migration_probability,
            max_migrants: self.inner.max_migrants,
        };
        serde_json::to_string(&export).map_err(|e| Error::Generic(e.to_string()))
    }

    /// Load an archipelago from JSON. A temporary archipelago is built off to the side and only
    /// returned once every island has been successfully reconstructed, so a malformed payload
    /// never mutates an existing archipelago. The migration policy and topology are not part of
    /// the export (see DESIGN.md); the reloaded archipelago gets a fresh `Unconnected` topology
    /// and `DefaultMigrationPolicy`, both of which the caller is expected to reinstall if needed.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let export: ArchipelagoExport =
            serde_json::from_str(json).map_err(|e| Error::Generic(e.to_string()))?;

        let archipelago = Self::new(ArchipelagoArgs {
            migration_probability: export.migration_probability,
            max_migrants: export.max_migrants,
            ..Default::default()
        });

        for island_export in export.islands {
            let island = Island::deserialise(island_export)?;
            archipelago.attach(island)?;
        }
        archipelago.set_migrants_db(export.migrants)?;

        Ok(archipelago)
    }
}

/// Round-trips a topology through its typetag-erased JSON form to obtain an independent copy.
/// `Topology` implementations are not required to be `Clone` (they're stored as `Box<dyn
/// Topology>`), but `typetag::serde` already gives every implementation `Serialize` /
/// `Deserialize`, so a serialize-then-deserialize pass is a cheap way to duplicate one without
/// adding a second trait bound just for this.
fn duplicate_topology(topology: &dyn Topology) -> Result<Box<dyn Topology>, Error> {
    let json = serde_json::to_string(topology).map_err(|e| Error::Generic(e.to_string()))?;
    serde_json::from_str(&json).map_err(|e| Error::Generic(e.to_string()))
}

#[derive(Serialize, Deserialize)]
struct ArchipelagoExport {
    islands: Vec<IslandExport>,
    migrants: MigrantDb,
    migration_probability: f64,
    max_migrants: usize,
}
