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

//! Breadth-first search from a single root.
//!
//! Seeds the root with a self-update and runs to global inactivity; the
//! result is a parent tree (parent 0 marks unreachable nodes, so id 0
//! is never used for a graph node).

use anyhow::Result;
use engine::{adjacency_from_edges, Adjacency, Bfs, Engine, EngineConfig, NodeId, Update};

fn graph() -> Adjacency {
    // two hexagons sharing the chord 2-7
    adjacency_from_edges(
        &[
            (1, 2),
            (2, 3),
            (3, 4),
            (4, 5),
            (5, 6),
            (6, 1),
            (2, 7),
            (7, 8),
        ],
        false,
    )
}

fn run_bfs(root: NodeId, adjacency: &Adjacency) -> Result<Vec<(NodeId, NodeId)>> {
    let config = EngineConfig::sized(4, 4, 32);
    let mut engine = Engine::new(config, Bfs, adjacency)?;
    engine.seed(Update::new(root, root, ()))?;
    let report = engine.run()?;
    log::info!(
        "bfs from {}: {} supersteps, {} messages, {} stalls",
        root,
        report.supersteps,
        report.messages,
        report.stalls
    );
    Ok(engine
        .states()
        .iter()
        .filter(|(_, state)| state.parent != 0)
        .map(|(node, state)| (*node, state.parent))
        .collect())
}

fn main() -> Result<()> {
    env_logger::init();
    let root = 1;
    let tree = run_bfs(root, &graph())?;
    for (node, parent) in tree.iter() {
        if node == parent {
            println!("{} <- root", node);
        } else {
            println!("{} <- {}", node, parent);
        }
    }
    Ok(())
}
