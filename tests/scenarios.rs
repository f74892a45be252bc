//! End-to-end scenarios exercising the full archipelago/island/migration stack through the
//! public API only.

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use float_cmp::assert_approx_eq;
use serde::{Deserialize, Serialize};

use archipelago::{
    Algorithm, Archipelago, ArchipelagoArgs, Bounds, FullyConnected, Problem, Unconnected,
};

/// `f(x) = sum(x_i^2)`, single objective, no constraints.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Sphere {
    nx: usize,
}

#[typetag::serde]
impl Problem for Sphere {
    fn fitness(&self, x: &[f64]) -> Result<Vec<f64>, Box<dyn StdError + Send + Sync>> {
        Ok(vec![x.iter().map(|v| v * v).sum()])
    }

    fn get_bounds(&self) -> Bounds {
        Bounds {
            lower: vec![-10.0; self.nx],
            upper: vec![10.0; self.nx],
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

/// Two objectives on one variable: `f1 = x^2`, `f2 = (x - 2)^2`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TwoObjective;

#[typetag::serde]
impl Problem for TwoObjective {
    fn fitness(&self, x: &[f64]) -> Result<Vec<f64>, Box<dyn StdError + Send + Sync>> {
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
}

/// Scales every decision vector towards the origin, strictly decreasing a `Sphere` objective.
#[derive(Debug, Serialize, Deserialize)]
struct Shrink {
    factor: f64,
}

#[typetag::serde]
impl Algorithm for Shrink {
    fn evolve(&self, mut population: archipelago::Population) -> Result<archipelago::Population, Box<dyn StdError + Send + Sync>> {
        for i in 0..population.len() {
            let x: Vec<f64> = population
                .individual(i)
                .map_err(|e| Box::new(e) as Box<dyn StdError + Send + Sync>)?
                .x
                .iter()
                .map(|v| v * self.factor)
                .collect();
            population
                .set_x(i, x)
                .map_err(|e| Box::new(e) as Box<dyn StdError + Send + Sync>)?;
        }
        Ok(population)
    }

    fn name(&self) -> String {
        "Shrink".to_string()
    }
}

/// Always fails, deterministically.
#[derive(Debug, Default, Serialize, Deserialize)]
struct AlwaysFails;

#[typetag::serde]
impl Algorithm for AlwaysFails {
    fn evolve(&self, _population: archipelago::Population) -> Result<archipelago::Population, Box<dyn StdError + Send + Sync>> {
        Err("AlwaysFails always fails".into())
    }
}

fn wait_a_moment() {
    std::thread::sleep(Duration::from_millis(10));
}

/// Scenario A: single-objective sanity. A two-island archipelago with no migration still
/// converges each island's champion towards the optimum after a handful of evolve steps.
#[test]
fn scenario_a_single_objective_sanity() {
    env_logger::init();

    let archipelago = Archipelago::new(ArchipelagoArgs {
        topology: Some(Box::new(Unconnected::default())),
        ..Default::default()
    });
    archipelago
        .push_back(Arc::new(Sphere { nx: 3 }), Arc::new(Shrink { factor: 0.5 }), None, 10)
        .unwrap();

    let before: f64 = archipelago
        .island(0)
        .unwrap()
        .get_population()
        .fs()
        .iter()
        .map(|f| f[0])
        .sum();

    for _ in 0..5 {
        archipelago.evolve().unwrap();
        archipelago.wait();
    }

    let after: f64 = archipelago
        .island(0)
        .unwrap()
        .get_population()
        .fs()
        .iter()
        .map(|f| f[0])
        .sum();
    assert!(after < before);

    // the fitness cached on each individual must still match the problem re-evaluated on its
    // decision vector, to floating-point tolerance.
    let population = archipelago.island(0).unwrap().get_population();
    let recomputed: f64 = population
        .xs()
        .iter()
        .map(|x| x.iter().map(|v| v * v).sum::<f64>())
        .sum();
    assert_approx_eq!(f64, after, recomputed, epsilon = 1e-9);
}

/// Scenario B: migration moves individuals. On a fully-connected two-island archipelago, after
/// one evolve step each island has published a non-empty emigrant group that its neighbour can
/// pull from.
#[test]
fn scenario_b_migration_moves_individuals() {
    let archipelago = Archipelago::new(ArchipelagoArgs {
        topology: Some(Box::new(FullyConnected::default())),
        migration_probability: 1.0,
        max_migrants: 1,
        ..Default::default()
    });
    for _ in 0..2 {
        archipelago
            .push_back(Arc::new(Sphere { nx: 2 }), Arc::new(Shrink { factor: 0.5 }), None, 6)
            .unwrap();
    }

    archipelago.evolve().unwrap();
    archipelago.wait();

    let pulled_by_1 = archipelago.extract_migrants(1).unwrap();
    assert!(!pulled_by_1.is_empty());

    let published_by_0 = archipelago.get_migrants_db().get(0).unwrap().clone();
    assert_eq!(pulled_by_1.ids, published_by_0.ids);
}

/// Scenario C: error isolation. One island's algorithm always fails; the archipelago reports the
/// failure for that island only, and the other island keeps evolving normally.
#[test]
fn scenario_c_error_isolation() {
    let archipelago = Archipelago::new(ArchipelagoArgs::default());
    archipelago
        .push_back(Arc::new(Sphere { nx: 2 }), Arc::new(Shrink { factor: 0.5 }), None, 4)
        .unwrap();
    archipelago
        .push_back(Arc::new(Sphere { nx: 2 }), Arc::new(AlwaysFails), None, 4)
        .unwrap();

    archipelago.evolve().unwrap();
    let failures = archipelago.wait_check();

    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, 1);
    assert_eq!(archipelago.island(0).unwrap().status(), archipelago::IslandStatus::Idle);

    // the failing island is still usable: population preserved, and a future evolve can be
    // queued (it will simply fail again, deterministically).
    archipelago.island(1).unwrap().evolve().unwrap();
    assert!(archipelago.island(1).unwrap().wait_check().is_err());
}

/// Scenario D: topology growth. Each `push_back` widens every existing island's connection set
/// on a fully-connected topology, and the new island is wired in symmetrically.
#[test]
fn scenario_d_topology_growth() {
    let archipelago = Archipelago::new(ArchipelagoArgs {
        topology: Some(Box::new(FullyConnected::default())),
        ..Default::default()
    });
    for n in 1..=4 {
        archipelago
            .push_back(Arc::new(Sphere { nx: 1 }), Arc::new(Shrink { factor: 0.9 }), None, 2)
            .unwrap();
        for i in 0..n {
            assert_eq!(archipelago.get_island_connections(i).unwrap().len(), n - 1);
        }
    }
}

/// Scenario E: multiobjective champion rejection. A population bound to a two-objective problem
/// refuses to compute a single champion.
#[test]
fn scenario_e_multiobjective_champion_rejection() {
    let archipelago = Archipelago::new(ArchipelagoArgs::default());
    archipelago
        .push_back(Arc::new(TwoObjective), Arc::new(Shrink { factor: 0.9 }), None, 6)
        .unwrap();

    let population = archipelago.island(0).unwrap().get_population();
    assert!(population.champion(&[1e-9]).is_err());

    // the archipelago-level champion query fails outright rather than silently skipping the
    // multi-objective island.
    assert!(archipelago.get_champions_x().is_err());
    assert!(archipelago.get_champions_f().is_err());
}

/// Scenario F: move/clone safety. A population snapshot taken mid-evolution is unaffected by
/// subsequent evolve steps on the live island.
#[test]
fn scenario_f_snapshot_is_independent_of_live_evolution() {
    let archipelago = Archipelago::new(ArchipelagoArgs::default());
    archipelago
        .push_back(Arc::new(Sphere { nx: 2 }), Arc::new(Shrink { factor: 0.5 }), None, 5)
        .unwrap();

    let island = archipelago.island(0).unwrap();
    let snapshot = island.get_population();
    let snapshot_xs_before = snapshot.xs();

    island.evolve().unwrap();
    island.wait_check().unwrap();
    wait_a_moment();

    assert_eq!(snapshot.xs(), snapshot_xs_before);
    assert_ne!(snapshot.xs(), island.get_population().xs());
}

/// Scenario G: archipelago duplication. `Archipelago::duplicate` produces a second archipelago
/// with its own islands, starting out identical to the source but evolving independently of it
/// from that point on -- unlike `Clone`, which would just hand back another handle to the same
/// islands.
#[test]
fn scenario_g_duplicate_is_independent() {
    let archipelago = Archipelago::new(ArchipelagoArgs {
        topology: Some(Box::new(FullyConnected::default())),
        ..Default::default()
    });
    for _ in 0..2 {
        archipelago
            .push_back(Arc::new(Sphere { nx: 2 }), Arc::new(Shrink { factor: 0.5 }), None, 5)
            .unwrap();
    }
    archipelago.evolve().unwrap();
    archipelago.wait();

    let duplicate = archipelago.duplicate().unwrap();
    assert_eq!(duplicate.len(), archipelago.len());
    for i in 0..duplicate.len() {
        assert_eq!(
            duplicate.island(i).unwrap().get_population().xs(),
            archipelago.island(i).unwrap().get_population().xs()
        );
    }

    // evolving the duplicate must not perturb the source archipelago's islands.
    let source_xs_before = archipelago.island(0).unwrap().get_population().xs();
    duplicate.evolve().unwrap();
    duplicate.wait();
    assert_ne!(
        duplicate.island(0).unwrap().get_population().xs(),
        source_xs_before
    );
    assert_eq!(archipelago.island(0).unwrap().get_population().xs(), source_xs_before);
}
