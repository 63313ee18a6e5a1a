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

//! Connected components by min-label propagation.
//!
//! Every node is seeded with its own id as initial color; at
//! convergence each component carries the minimum id of its members.

use anyhow::Result;
use engine::{
    adjacency_from_graph, Adjacency, Components, Engine, EngineConfig, NodeId, Update, UnGraph,
};
use std::collections::BTreeMap;

/// Two disjoint triangles, built through petgraph. Indices are offset
/// by 1 so node id 0 stays reserved.
fn graph() -> Adjacency {
    let mut graph = UnGraph::<(), ()>::new_undirected();
    let nodes = (0..6).map(|_| graph.add_node(())).collect::<Vec<_>>();
    for &(a, b) in [(0, 1), (1, 2), (0, 2), (3, 4), (4, 5), (3, 5)].iter() {
        graph.add_edge(nodes[a], nodes[b], ());
    }
    adjacency_from_graph(&graph, 1)
}

fn run_components(adjacency: &Adjacency) -> Result<BTreeMap<NodeId, NodeId>> {
    let config = EngineConfig::sized(4, 2, 16);
    let mut engine = Engine::new(config, Components, adjacency)?;
    for &node in adjacency.keys() {
        engine.seed(Update::new(node, node, node))?;
    }
    let report = engine.run()?;
    log::info!(
        "components: {} supersteps, {} messages",
        report.supersteps,
        report.messages
    );
    Ok(engine
        .states()
        .iter()
        .filter(|(_, state)| state.color != NodeId::MAX)
        .map(|(node, state)| (*node, state.color))
        .collect())
}

fn main() -> Result<()> {
    env_logger::init();
    let colors = run_components(&graph())?;
    let mut by_color: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
    for (&node, &color) in colors.iter() {
        by_color.entry(color).or_insert_with(Vec::new).push(node);
    }
    for (color, members) in by_color.iter() {
        println!("component {}: {:?}", color, members);
    }
    Ok(())
}
