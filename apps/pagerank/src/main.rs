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

//! PageRank over an undirected graph with a fixed iteration budget.
//!
//! Every node is seeded with a self-update that triggers the broadcast
//! of its uniform initial rank; a node folds its inbox once it has
//! heard from all neighbors, so the run proceeds in implicit rounds
//! without any global coordination beyond the superstep barrier.

use anyhow::Result;
use engine::{adjacency_from_edges, Adjacency, Engine, EngineConfig, NodeId, PageRank, Update};
use std::collections::BTreeMap;

const DAMPING: f64 = 0.85;
const ROUNDS: u32 = 20;

fn graph() -> Adjacency {
    // a star 1-{2,3,4} with a tail 4-5
    adjacency_from_edges(&[(1, 2), (1, 3), (1, 4), (4, 5)], false)
}

fn run_pagerank(adjacency: &Adjacency, rounds: u32) -> Result<BTreeMap<NodeId, f64>> {
    let num_nodes = adjacency.len();
    let config = EngineConfig::sized(4, 2, 16);
    let kernel = PageRank::new(DAMPING, num_nodes, rounds);
    let mut engine = Engine::new(config, kernel, adjacency)?;
    for &node in adjacency.keys() {
        engine.seed(Update::new(node, node, 0.0))?;
    }
    let report = engine.run()?;
    log::info!(
        "pagerank: {} rounds in {} supersteps, {} messages",
        rounds,
        report.supersteps,
        report.messages
    );
    Ok(engine
        .states()
        .iter()
        .filter(|(node, _)| adjacency.contains_key(node))
        .map(|(node, state)| (*node, state.rank))
        .collect())
}

fn main() -> Result<()> {
    env_logger::init();
    let mut ranks = run_pagerank(&graph(), ROUNDS)?
        .into_iter()
        .collect::<Vec<_>>();
    ranks.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    for (node, rank) in ranks.iter() {
        println!("{}: {:.6}", node, rank);
    }
    Ok(())
}
