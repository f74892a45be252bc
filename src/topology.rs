use std::fmt::Debug;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// The migration graph connecting islands in an [`crate::archipelago::Archipelago`]. A
/// `Topology` is consulted every time the archipelago grows (to decide how the new vertex is
/// wired in) and every time an island performs a migration pull (to decide which islands to draw
/// from).
///
/// Implementations register as type-erased, serializable plug-ins with `#[typetag::serde]`.
#[typetag::serde(tag = "topology")]
pub trait Topology: Send + Sync + Debug {
    /// Grow the topology by one vertex, wiring it in however this topology's policy dictates.
    /// `n` is the number of vertices *before* the new one is added, so the new vertex's index is
    /// `n`.
    fn push_back(&mut self, n: usize);

    /// The islands migrants may be pulled from for island `i`, paired with a per-source weight.
    /// A weight is the probability (before clipping to `[0, 1]`) that any given individual is
    /// drawn from that source on a given migration attempt; weights outside `[0, 1]` are clipped
    /// by the caller rather than rejected here, so a topology is free to express "strength of
    /// connection" on an unbounded scale.
    fn get_connections(&self, i: usize) -> (Vec<usize>, Vec<f64>);

    /// The number of vertices currently in the topology.
    fn num_vertices(&self) -> usize;
}

/// A cheap-to-clone handle to a type-erased [`Topology`]. Mutation (`push_back`) always goes
/// through the owning [`crate::archipelago::Archipelago`]'s `RwLock`, never through a cloned
/// handle, so the `Arc` here is purely for read-side sharing with callers of
/// `get_island_connections`.
pub type TopologyHandle = Arc<dyn Topology>;

/// No migration: every island is isolated. The default topology for a freshly-built archipelago.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Unconnected {
    n: usize,
}

#[typetag::serde]
impl Topology for Unconnected {
    fn push_back(&mut self, _n: usize) {
        self.n += 1;
    }

    fn get_connections(&self, _i: usize) -> (Vec<usize>, Vec<f64>) {
        (Vec::new(), Vec::new())
    }

    fn num_vertices(&self) -> usize {
        self.n
    }
}

/// Every island can pull migrants from every other island.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FullyConnected {
    n: usize,
}

#[typetag::serde]
impl Topology for FullyConnected {
    fn push_back(&mut self, _n: usize) {
        self.n += 1;
    }

    fn get_connections(&self, i: usize) -> (Vec<usize>, Vec<f64>) {
        let sources: Vec<usize> = (0..self.n).filter(|&j| j != i).collect();
        let weights = vec![1.0; sources.len()];
        (sources, weights)
    }

    fn num_vertices(&self) -> usize {
        self.n
    }
}

/// Islands are arranged on a directed cycle; island `i` pulls migrants from island `i - 1`
/// (wrapping around at `0`).
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Ring {
    n: usize,
}

#[typetag::serde]
impl Topology for Ring {
    fn push_back(&mut self, _n: usize) {
        self.n += 1;
    }

    fn get_connections(&self, i: usize) -> (Vec<usize>, Vec<f64>) {
        if self.n < 2 {
            return (Vec::new(), Vec::new());
        }
        let prev = if i == 0 { self.n - 1 } else { i - 1 };
        (vec![prev], vec![1.0])
    }

    fn num_vertices(&self) -> usize {
        self.n
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_unconnected_has_no_edges() {
        let mut t = Unconnected::default();
        for i in 0..4 {
            t.push_back(i);
        }
        assert_eq!(t.num_vertices(), 4);
        for i in 0..4 {
            let (sources, weights) = t.get_connections(i);
            assert!(sources.is_empty());
            assert!(weights.is_empty());
        }
    }

    #[test]
    fn test_fully_connected_wires_everyone() {
        let mut t = FullyConnected::default();
        for i in 0..4 {
            t.push_back(i);
        }
        for i in 0..4 {
            let (sources, weights) = t.get_connections(i);
            assert_eq!(sources.len(), 3);
            assert!(!sources.contains(&i));
            assert!(weights.iter().all(|&w| w == 1.0));
        }
    }

    #[test]
    fn test_ring_wraps_around() {
        let mut t = Ring::default();
        for i in 0..3 {
            t.push_back(i);
        }
        assert_eq!(t.get_connections(0), (vec![2], vec![1.0]));
        assert_eq!(t.get_connections(1), (vec![0], vec![1.0]));
        assert_eq!(t.get_connections(2), (vec![1], vec![1.0]));
    }

    #[test]
    fn test_ring_single_vertex_has_no_edges() {
        let mut t = Ring::default();
        t.push_back(0);
        let (sources, weights) = t.get_connections(0);
        assert!(sources.is_empty());
        assert!(weights.is_empty());
    }
}
