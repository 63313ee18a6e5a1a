// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! End-to-end checks of the superstep protocol: schedule independence,
//! barrier safety, termination, and the hazard variants, exercised on
//! randomized graphs against reference algorithms.

use engine::{
    adjacency_from_edges, Adjacency, Bfs, Components, Engine, EngineConfig, HazardMode, NodeId,
    SchedulingPolicy, Sssp, SuperstepStats, Update,
};
#[cfg(test)]
use engine::Kernel;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

const NUM_PE: usize = 4;
const NODES_PER_PE: usize = 8;
const MAX_EDGES_PER_PE: usize = 128;

/// A random undirected graph over ids 1..num_nodes (id 0 stays
/// reserved), with the given edge probability in percent.
fn random_graph(seed: u64, edge_pct: u32) -> Adjacency {
    let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
    let num_nodes = (NUM_PE * NODES_PER_PE) as NodeId;
    let mut edges = vec![];
    for a in 1..num_nodes {
        for b in (a + 1)..num_nodes {
            if rng.gen_range(0..100) < edge_pct {
                edges.push((a, b));
            }
        }
    }
    adjacency_from_edges(&edges, false)
}

fn config(scheduling: SchedulingPolicy, hazard_mode: HazardMode) -> EngineConfig {
    let mut config = EngineConfig::sized(NUM_PE, NODES_PER_PE, MAX_EDGES_PER_PE);
    config.scheduling = scheduling;
    config.hazard_mode = hazard_mode;
    config.max_supersteps = Some(1000);
    config
}

/// Engine SSSP distances from `source`, as (node, dist) pairs.
fn sssp_distances(
    adjacency: &Adjacency,
    source: NodeId,
    scheduling: SchedulingPolicy,
    hazard_mode: HazardMode,
) -> Vec<(NodeId, u32)> {
    let mut engine = Engine::new(config(scheduling, hazard_mode), Sssp, adjacency)
        .expect("engine construction failed");
    engine.seed(Update::new(source, source, 0)).unwrap();
    engine.run().expect("run failed");
    engine
        .states()
        .iter()
        .filter(|(_, state)| state.dist != u32::MAX)
        .map(|(node, state)| (*node, state.dist))
        .collect()
}

/// Reference distances via petgraph's dijkstra over unit weights.
fn reference_distances(adjacency: &Adjacency, source: NodeId) -> Vec<(NodeId, u32)> {
    use petgraph::algo::dijkstra;
    use petgraph::graph::{NodeIndex, UnGraph};

    let num_nodes = (NUM_PE * NODES_PER_PE) as NodeId;
    let mut graph = UnGraph::<(), u32>::new_undirected();
    for _ in 0..num_nodes {
        graph.add_node(());
    }
    for (&node, neighbors) in adjacency.iter() {
        for &neighbor in neighbors.iter() {
            if node < neighbor {
                graph.add_edge(
                    NodeIndex::new(node as usize),
                    NodeIndex::new(neighbor as usize),
                    1,
                );
            }
        }
    }
    let mut dists = dijkstra(&graph, NodeIndex::new(source as usize), None, |e| {
        *e.weight()
    })
    .into_iter()
    .map(|(idx, dist)| (idx.index() as NodeId, dist))
    .collect::<Vec<_>>();
    dists.sort_unstable();
    dists
}

fn check_sssp_against_reference(seed: u64) {
    let adjacency = random_graph(seed, 10);
    if !adjacency.contains_key(&1) {
        return;
    }
    let expected = reference_distances(&adjacency, 1);
    log::debug!(
        "graph seed {}: {} nodes reachable from 1",
        seed,
        expected.len()
    );
    for sched_seed in 0..3 {
        let mut got = sssp_distances(
            &adjacency,
            1,
            SchedulingPolicy::Shuffled { seed: sched_seed },
            HazardMode::Exact,
        );
        got.sort_unstable();
        assert_eq!(got, expected, "graph seed {} sched {}", seed, sched_seed);
    }
}

fn main() {
    env_logger::init();
    for seed in 0..10 {
        check_sssp_against_reference(seed);
    }
    println!("protocol checks passed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::BTreeSet;

    /// Min-combine kernel that records every update's gather-to-apply
    /// window and fails if two windows for the same node ever overlap.
    /// Converges like label propagation, so it can ride a full run.
    struct TracedMin {
        open: RefCell<BTreeSet<NodeId>>,
    }

    #[derive(Clone, Debug)]
    struct TracedState {
        node: NodeId,
        value: NodeId,
    }

    impl Default for TracedState {
        fn default() -> Self {
            Self {
                node: 0,
                value: NodeId::MAX,
            }
        }
    }

    impl Kernel for TracedMin {
        type State = TracedState;
        type Payload = NodeId;

        fn gather(&self, state: &TracedState, update: &Update<NodeId>) -> TracedState {
            assert!(
                self.open.borrow_mut().insert(update.dest),
                "node {} gathered while another of its updates is in flight",
                update.dest
            );
            TracedState {
                node: update.dest,
                value: state.value.min(update.payload),
            }
        }

        fn apply(&self, prev: &TracedState, gathered: TracedState) -> (TracedState, Option<NodeId>) {
            assert!(self.open.borrow_mut().remove(&gathered.node));
            let improved = gathered.value < prev.value;
            let value = gathered.value;
            (gathered, if improved { Some(value) } else { None })
        }

        fn scatter(&self, payload: &NodeId, _neighbor: NodeId, _degree: u32) -> NodeId {
            *payload
        }
    }

    #[test]
    fn test_no_overlapping_updates_under_randomized_scheduling() {
        // dense graphs push many same-destination updates through each
        // superstep; the instrumented kernel rejects any interleaving
        // that admits a second update before the first writes back
        let modes = [HazardMode::Exact, HazardMode::Bounded];
        for graph_seed in 0..6 {
            let adjacency = random_graph(graph_seed, 30);
            for sched_seed in 0..4 {
                for &hazard_mode in modes.iter() {
                    let kernel = TracedMin {
                        open: RefCell::new(BTreeSet::new()),
                    };
                    let mut engine = Engine::new(
                        config(SchedulingPolicy::Shuffled { seed: sched_seed }, hazard_mode),
                        kernel,
                        &adjacency,
                    )
                    .unwrap();
                    for &node in adjacency.keys() {
                        engine.seed(Update::new(node, node, node)).unwrap();
                    }
                    engine.run().unwrap();
                    // every admitted update was written back
                    assert!(engine.kernel().open.borrow().is_empty());
                }
            }
        }
    }

    #[test]
    fn test_sssp_matches_dijkstra_on_random_graphs() {
        for seed in 0..10 {
            check_sssp_against_reference(seed);
        }
    }

    #[test]
    fn test_components_schedule_independent() {
        // the converged labeling must not depend on the PE interleaving
        let adjacency = random_graph(7, 8);
        let colors = |scheduling| {
            let mut engine = Engine::new(
                config(scheduling, HazardMode::Exact),
                Components,
                &adjacency,
            )
            .unwrap();
            for &node in adjacency.keys() {
                engine.seed(Update::new(node, node, node)).unwrap();
            }
            engine.run().unwrap();
            engine
                .states()
                .iter()
                .map(|(node, state)| (*node, state.color))
                .collect::<Vec<_>>()
        };
        let baseline = colors(SchedulingPolicy::RoundRobin);
        for seed in 0..5 {
            assert_eq!(colors(SchedulingPolicy::Shuffled { seed }), baseline);
        }
    }

    #[test]
    fn test_hazard_variants_agree() {
        // the bounded table only adds stalls, never changes results
        let adjacency = random_graph(11, 12);
        let run = |hazard_mode| {
            let mut engine =
                Engine::new(config(SchedulingPolicy::RoundRobin, hazard_mode), Bfs, &adjacency)
                    .unwrap();
            engine.seed(Update::new(1, 1, ())).unwrap();
            let report = engine.run().unwrap();
            let parents = engine
                .states()
                .iter()
                .map(|(node, state)| (*node, state.parent))
                .collect::<Vec<_>>();
            (report, parents)
        };
        let (exact_report, exact_parents) = run(HazardMode::Exact);
        let (bounded_report, bounded_parents) = run(HazardMode::Bounded);
        assert_eq!(exact_parents, bounded_parents);
        assert_eq!(exact_report.supersteps, bounded_report.supersteps);
        assert_eq!(exact_report.messages, bounded_report.messages);
        assert!(bounded_report.stalls >= exact_report.stalls);
    }

    #[test]
    fn test_barrier_safety_accounting() {
        // messages scattered in superstep n are delivered in n+1,
        // exactly and in full; superstep 0 additionally delivers seeds
        let adjacency = random_graph(3, 10);
        let mut engine =
            Engine::new(config(SchedulingPolicy::RoundRobin, HazardMode::Exact), Bfs, &adjacency)
                .unwrap();
        engine.seed(Update::new(1, 1, ())).unwrap();
        let mut trace: Vec<SuperstepStats> = vec![];
        engine.run_inspect(|stats| trace.push(stats.clone())).unwrap();
        assert_eq!(trace[0].delivered, 1);
        for pair in trace.windows(2) {
            assert_eq!(pair[1].delivered, pair[0].staged);
        }
        assert_eq!(trace.last().unwrap().staged, 0);
    }

    #[test]
    fn test_termination_at_eccentricity_plus_two() {
        // a path graph has a known eccentricity from its endpoint
        let edges = (1..8).map(|n| (n, n + 1)).collect::<Vec<_>>();
        let adjacency = adjacency_from_edges(&edges, false);
        let mut engine =
            Engine::new(config(SchedulingPolicy::RoundRobin, HazardMode::Exact), Bfs, &adjacency)
                .unwrap();
        engine.seed(Update::new(1, 1, ())).unwrap();
        let report = engine.run().unwrap();
        // eccentricity of node 1 is 7: seed superstep + 7 waves, the
        // last of which reactivates nobody, then the empty superstep
        assert_eq!(report.supersteps, 9);
    }

    #[test]
    fn test_bfs_parent_tree_with_ties() {
        let adjacency = adjacency_from_edges(
            &[(1, 2), (1, 3), (2, 4), (3, 4), (4, 5), (5, 6), (5, 7), (6, 7)],
            false,
        );
        let schedules = [
            SchedulingPolicy::RoundRobin,
            SchedulingPolicy::Shuffled { seed: 1 },
            SchedulingPolicy::Shuffled { seed: 2 },
        ];
        for &scheduling in schedules.iter() {
            let mut engine =
                Engine::new(config(scheduling, HazardMode::Exact), Bfs, &adjacency).unwrap();
            engine.seed(Update::new(1, 1, ())).unwrap();
            engine.run().unwrap();
            let parent = |node: NodeId| engine.state_of(node).parent;
            assert_eq!(parent(1), 1);
            assert_eq!(parent(2), 1);
            assert_eq!(parent(3), 1);
            // node 4 is reached through 2 and 3 in the same superstep;
            // the winner depends on arbitration order
            assert!(parent(4) == 2 || parent(4) == 3);
            assert_eq!(parent(5), 4);
            assert_eq!(parent(6), 5);
            assert_eq!(parent(7), 5);
        }
    }

    #[test]
    fn test_no_starvation_on_all_to_one_traffic() {
        // a star pushes every superstep's traffic through one arbiter
        let hub = 1 as NodeId;
        let edges = (2..(NUM_PE * NODES_PER_PE) as NodeId)
            .map(|n| (hub, n))
            .collect::<Vec<_>>();
        let adjacency = adjacency_from_edges(&edges, false);
        let mut engine =
            Engine::new(config(SchedulingPolicy::RoundRobin, HazardMode::Exact), Bfs, &adjacency)
                .unwrap();
        engine.seed(Update::new(hub, hub, ())).unwrap();
        let report = engine.run().unwrap();
        assert_eq!(report.starvation_warnings, 0);
        // seed superstep, one wave out, one echo back into the hub
        assert_eq!(report.supersteps, 3);
    }
}
