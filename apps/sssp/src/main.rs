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

//! Single-source shortest paths over unit-weight edges.
//!
//! The source is seeded with distance 0; each scatter adds one hop.
//! Relaxations triggered by late-arriving shorter paths re-scatter, so
//! the run settles on true shortest distances regardless of the order
//! updates are applied in.

use anyhow::Result;
use engine::{adjacency_from_edges, Adjacency, Engine, EngineConfig, NodeId, Sssp, Update};
use std::collections::BTreeMap;

fn graph() -> Adjacency {
    // a grid-ish mesh with a long detour from 1 to 8
    adjacency_from_edges(
        &[
            (1, 2),
            (1, 3),
            (2, 4),
            (3, 4),
            (4, 5),
            (5, 8),
            (1, 6),
            (6, 7),
            (7, 8),
        ],
        false,
    )
}

fn run_sssp(source: NodeId, adjacency: &Adjacency) -> Result<BTreeMap<NodeId, (u32, NodeId)>> {
    let config = EngineConfig::sized(4, 4, 32);
    let mut engine = Engine::new(config, Sssp, adjacency)?;
    engine.seed(Update::new(source, source, 0))?;
    let report = engine.run()?;
    log::info!(
        "sssp from {}: {} supersteps, {} messages",
        source,
        report.supersteps,
        report.messages
    );
    Ok(engine
        .states()
        .iter()
        .filter(|(_, state)| state.dist != u32::MAX)
        .map(|(node, state)| (*node, (state.dist, state.parent)))
        .collect())
}

fn main() -> Result<()> {
    env_logger::init();
    let source = 1;
    for (node, (dist, parent)) in run_sssp(source, &graph())?.iter() {
        println!("{}: dist {} via {}", node, dist, parent);
    }
    Ok(())
}
