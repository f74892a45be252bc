use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex, Weak};
use std::thread;
use std::thread::JoinHandle;

use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::algorithm::AlgorithmHandle;
use crate::archipelago::ArchipelagoInner;
use crate::error::Error;
use crate::individual::{Population, PopulationExport};
use crate::problem::ProblemHandle;
use crate::serde_arc::{arc_algorithm, arc_problem, arc_udi};
use crate::udi::UdiHandle;

/// An island's persisted state: the problem/algorithm/UDI plug-ins it was built from, and its
/// current population. Used by [`crate::archipelago::Archipelago::to_json`] /
/// [`crate::archipelago::Archipelago::from_json`]; the island's runtime-only state (worker
/// thread, archipelago back-reference, status) is not part of the export.
#[derive(Serialize, Deserialize)]
pub struct IslandExport {
    #[serde(with = "arc_problem")]
    problem: ProblemHandle,
    #[serde(with = "arc_algorithm")]
    algorithm: AlgorithmHandle,
    #[serde(with = "arc_udi")]
    udi: UdiHandle,
    population: PopulationExport,
}

/// The sentinel used for an island with no index yet (not attached to an archipelago).
const NO_INDEX: usize = usize::MAX;

/// The observable state of an island.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IslandStatus {
    Idle,
    Busy,
    /// The last evolve step failed. The error is retrieved (and the island returned to `Idle`)
    /// by calling [`Island::wait_check`].
    Error,
}

/// Plain data describing the problem/algorithm/UDI an island was built from, used to assemble
/// [`Island::get_name`] and [`Island::get_extra_info`].
#[derive(Debug, Clone)]
struct IslandInfo {
    problem_name: String,
    algorithm_name: String,
    udi_name: String,
}

/// Everything the worker thread mutates, held behind one mutex.
struct IslandState {
    algorithm: AlgorithmHandle,
    /// The worker thread only ever reads a clone of this to evolve and writes back on full
    /// success, so this always reflects the population as of the last *committed* evolve step.
    population: Population,
    status: IslandStatus,
    last_error: Option<Error>,
    /// Number of evolve tasks queued or currently executing.
    pending: usize,
}

struct IslandCore {
    problem: ProblemHandle,
    udi: UdiHandle,
    info: IslandInfo,
    state: Mutex<IslandState>,
    cond: Condvar,
    sender: mpsc::Sender<()>,
    join_handle: Mutex<Option<JoinHandle<()>>>,
    archipelago: Mutex<Weak<ArchipelagoInner>>,
    index: AtomicUsize,
}

impl std::fmt::Debug for IslandCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IslandCore")
            .field("name", &self.info.problem_name)
            .finish()
    }
}

/// One independently-evolving population, wrapped around a user-supplied [`crate::problem::Problem`],
/// [`crate::algorithm::Algorithm`] and execution strategy ([`crate::udi::Udi`]).
///
/// `Island` is a value-like handle: cloning it shares the same underlying worker thread and
/// state. Evolution happens on a dedicated background thread; [`Island::evolve`] returns
/// immediately after queueing one evolve step, and [`Island::wait`] / [`Island::wait_check`]
/// block until the queue has drained.
#[derive(Clone)]
pub struct Island {
    core: Arc<IslandCore>,
}

/// Construction arguments for a standalone or archipelago-bound island.
pub struct IslandArgs {
    pub problem: ProblemHandle,
    pub algorithm: AlgorithmHandle,
    pub udi: Option<UdiHandle>,
    pub population_size: usize,
    pub seed: Option<u64>,
}

impl Island {
    pub fn new(args: IslandArgs) -> Result<Self, Error> {
        let population = Population::init(args.problem.clone(), args.population_size, args.seed)?;
        let udi = args.udi.unwrap_or_else(|| Arc::new(crate::udi::ThreadIsland));
        Self::from_parts(args.problem, args.algorithm, udi, population)
    }

    fn from_parts(
        problem: ProblemHandle,
        algorithm: AlgorithmHandle,
        udi: UdiHandle,
        population: Population,
    ) -> Result<Self, Error> {
        let info = IslandInfo {
            problem_name: problem.name(),
            algorithm_name: algorithm.name(),
            udi_name: udi.name(),
        };

        let (sender, receiver) = mpsc::channel::<()>();
        let core = Arc::new(IslandCore {
            problem,
            udi,
            info,
            state: Mutex::new(IslandState {
                algorithm,
                population,
                status: IslandStatus::Idle,
                last_error: None,
                pending: 0,
            }),
            cond: Condvar::new(),
            sender,
            join_handle: Mutex::new(None),
            archipelago: Mutex::new(Weak::new()),
            index: AtomicUsize::new(NO_INDEX),
        });

        let worker_core = Arc::downgrade(&core);
        let handle = thread::spawn(move || worker_loop(worker_core, receiver));
        *core.join_handle.lock().unwrap() = Some(handle);

        info!("island constructed: {}", core.info.problem_name);
        Ok(Self { core })
    }

    /// A unique, stable identifier for this island's underlying state, used as the key in the
    /// archipelago's pointer-identity index map.
    pub(crate) fn ptr_id(&self) -> usize {
        Arc::as_ptr(&self.core) as *const () as usize
    }

    pub fn serialise(&self) -> IslandExport {
        IslandExport {
            problem: self.core.problem.clone(),
            algorithm: self.get_algorithm(),
            udi: self.core.udi.clone(),
            population: self.get_population().serialise(),
        }
    }

    pub fn deserialise(export: IslandExport) -> Result<Self, Error> {
        let population = Population::deserialise(export.problem.clone(), export.population)?;
        Self::from_parts(export.problem, export.algorithm, export.udi, population)
    }

    /// Attach this island to an archipelago, recording its index and a non-owning back-reference
    /// used to reach the shared topology and migrant database during evolution. Called by
    /// [`crate::archipelago::Archipelago::push_back`] only.
    pub(crate) fn bind(&self, archipelago: Weak<ArchipelagoInner>, index: usize) {
        *self.core.archipelago.lock().unwrap() = archipelago;
        self.core.index.store(index, Ordering::SeqCst);
    }

    pub(crate) fn index(&self) -> Option<usize> {
        let i = self.core.index.load(Ordering::SeqCst);
        if i == NO_INDEX {
            None
        } else {
            Some(i)
        }
    }

    /// Queue one evolve step. Returns immediately; the step runs on the island's dedicated
    /// worker thread.
    pub fn evolve(&self) -> Result<(), Error> {
        {
            let mut state = self.core.state.lock().unwrap();
            state.pending += 1;
            if state.status != IslandStatus::Error {
                state.status = IslandStatus::Busy;
            }
        }
        self.core
            .sender
            .send(())
            .map_err(|_| Error::Generic("island worker thread is no longer running".to_string()))
    }

    /// Block until every queued evolve step has completed.
    pub fn wait(&self) {
        let mut state = self.core.state.lock().unwrap();
        while state.pending > 0 {
            state = self.core.cond.wait(state).unwrap();
        }
    }

    /// Block until every queued evolve step has completed, then return (and clear) the last
    /// error, if any.
    pub fn wait_check(&self) -> Result<(), Error> {
        self.wait();
        let mut state = self.core.state.lock().unwrap();
        match state.last_error.take() {
            Some(e) => {
                state.status = IslandStatus::Idle;
                Err(e)
            }
            None => Ok(()),
        }
    }

    pub fn status(&self) -> IslandStatus {
        self.core.state.lock().unwrap().status
    }

    /// A deep-copy snapshot of the current population, safe to read while the island continues
    /// to evolve concurrently.
    pub fn get_population(&self) -> Population {
        self.core.state.lock().unwrap().population.clone()
    }

    pub fn get_algorithm(&self) -> AlgorithmHandle {
        self.core.state.lock().unwrap().algorithm.clone()
    }

    pub fn get_problem(&self) -> ProblemHandle {
        self.core.problem.clone()
    }

    pub fn get_name(&self) -> String {
        format!(
            "{} / {} / {}",
            self.core.info.problem_name, self.core.info.algorithm_name, self.core.info.udi_name
        )
    }

    pub fn get_extra_info(&self) -> String {
        format!(
            "problem: {}\nalgorithm: {}\nudi: {}",
            self.core.info.problem_name, self.core.info.algorithm_name, self.core.info.udi_name
        )
    }
}

/// Runs on a dedicated thread for the life of the island. Holds only a [`Weak`] reference to
/// [`IslandCore`] so that the worker itself is never what keeps an island alive: once every
/// external [`Island`] handle is dropped, the strong count reaches zero, `IslandCore::drop` wakes
/// this loop with one last signal, the upgrade below fails, and the thread exits.
fn worker_loop(core: Weak<IslandCore>, receiver: mpsc::Receiver<()>) {
    while receiver.recv().is_ok() {
        let Some(core) = core.upgrade() else {
            break;
        };
        run_one_evolve(&core);
        let mut state = core.state.lock().unwrap();
        state.pending -= 1;
        if state.pending == 0 && state.status != IslandStatus::Error {
            state.status = IslandStatus::Idle;
        }
        core.cond.notify_all();
    }
}

fn run_one_evolve(core: &Arc<IslandCore>) {
    // The worker always operates on a *clone* of the shared population and only writes back on
    // full success. `state.population` is therefore left untouched by construction for the
    // entire duration of a failed step -- restoring it explicitly on error is unnecessary, it
    // was never modified.
    let (algorithm, population) = {
        let state = core.state.lock().unwrap();
        (state.algorithm.clone(), state.population.clone())
    };

    let population = match pull_migrants(core, population) {
        Ok(p) => p,
        Err(e) => {
            record_error(core, e);
            return;
        }
    };

    debug!("island {:?}: evolve step starting", core.index.load(Ordering::SeqCst));
    match core.udi.run_evolve(algorithm, population) {
        Ok((new_algorithm, new_population)) => match publish_emigrants(core, &new_population) {
            Ok(()) => {
                let mut state = core.state.lock().unwrap();
                state.algorithm = new_algorithm;
                state.population = new_population;
                state.last_error = None;
                debug!("island {:?}: evolve step ok", core.index.load(Ordering::SeqCst));
            }
            Err(e) => record_error(core, e),
        },
        Err(e) => record_error(core, Error::from_user_error(core.index(), e)),
    }
}

fn record_error(core: &Arc<IslandCore>, err: Error) {
    warn!("island {:?}: evolve step failed: {}", core.index(), err);
    let mut state = core.state.lock().unwrap();
    state.status = IslandStatus::Error;
    // The earliest unconsumed failure wins; later ones are dropped until `wait_check` takes it.
    state.last_error.get_or_insert(err);
}

impl IslandCore {
    fn index(&self) -> Option<usize> {
        let i = self.index.load(Ordering::SeqCst);
        if i == NO_INDEX {
            None
        } else {
            Some(i)
        }
    }
}

/// Pull migrants from the islands this one is connected to and inject them into `population`.
/// No-op for a standalone island (no archipelago back-reference) or before the island has been
/// assigned an index.
///
/// Two probabilities gate a migration: first, the archipelago-wide `migration_probability`
/// decides whether this island attempts a pull at all on this evolve step; then, for each
/// connected source, that source's topology weight (clipped to `[0, 1]`) is the independent
/// per-individual probability that any given published emigrant of that source is actually drawn
/// in. A source with weight `0.0` never contributes; one with weight `>= 1.0` always does, up to
/// the `max_migrants` cap.
fn pull_migrants(core: &Arc<IslandCore>, mut population: Population) -> Result<Population, Error> {
    let archipelago = core.archipelago.lock().unwrap().upgrade();
    let Some(archipelago) = archipelago else {
        return Ok(population);
    };
    let Some(idx) = core.index() else {
        return Ok(population);
    };

    if !rand::thread_rng().gen_bool(archipelago.migration_probability()) {
        return Ok(population);
    }

    let (sources, weights) = archipelago.get_connections(idx)?;
    if sources.is_empty() {
        return Ok(population);
    }

    let max_migrants = archipelago.max_migrants();
    let mut rng = rand::thread_rng();
    let mut pulled = 0usize;
    {
        let db = archipelago.migrants().lock().unwrap();
        'sources: for (&src, &weight) in sources.iter().zip(weights.iter()) {
            let weight = weight.clamp(0.0, 1.0);
            let group = db.get(src)?;
            for k in 0..group.len() {
                if pulled >= max_migrants {
                    break 'sources;
                }
                if rng.gen_bool(weight) {
                    population.inject(group.ids[k], group.xs[k].clone(), group.fs[k].clone())?;
                    pulled += 1;
                }
            }
        }
    }
    if pulled > 0 {
        debug!("island {idx}: pulled {pulled} migrant(s)");
    }
    Ok(population)
}

/// Select this island's emigrants from `population` and publish them to the shared migrant
/// database. No-op for a standalone island or before it has been assigned an index.
fn publish_emigrants(core: &Arc<IslandCore>, population: &Population) -> Result<(), Error> {
    let archipelago = core.archipelago.lock().unwrap().upgrade();
    let Some(archipelago) = archipelago else {
        return Ok(());
    };
    let Some(idx) = core.index() else {
        return Ok(());
    };

    let emigrants = archipelago.policy().select_emigrants(population)?;
    let n = emigrants.len();
    let mut db = archipelago.migrants().lock().unwrap();
    db.publish(idx, emigrants)?;
    if n > 0 {
        debug!("island {idx}: published {n} emigrant(s)");
    }
    Ok(())
}

impl Drop for IslandCore {
    fn drop(&mut self) {
        // A struct's own fields are not dropped until this method returns, so `sender` is still
        // live here; send the worker one last wake-up explicitly rather than relying on it.
        // `worker_loop` holds only a `Weak`, so its upgrade fails on this wake-up and it exits.
        let _ = self.sender.send(());
        if let Some(handle) = self.join_handle.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}
