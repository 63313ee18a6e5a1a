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

use std::collections::BTreeMap;

use super::{Kernel, Update};
use crate::layout::Adjacency;
use crate::NodeId;

/// Triangle counting by neighbor-list exchange.
///
/// Seed one update per directed edge carrying the sender's sorted
/// neighbor list; each receiver intersects it with its own list. Every
/// triangle is counted once per ordered adjacent pair, i.e. six times,
/// so the global count is `sum(state.count) / 6`.
#[derive(Clone, Debug)]
pub struct Triangles {
    neighbor_lists: BTreeMap<NodeId, Vec<NodeId>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TriangleState {
    pub count: u64,
}

impl Triangles {
    pub fn new(adjacency: &Adjacency) -> Self {
        let neighbor_lists = adjacency
            .iter()
            .map(|(&node, neighbors)| (node, neighbors.iter().cloned().collect::<Vec<_>>()))
            .collect();
        Self { neighbor_lists }
    }

    pub fn neighbor_list(&self, node: NodeId) -> &[NodeId] {
        self.neighbor_lists
            .get(&node)
            .map(|list| list.as_slice())
            .unwrap_or(&[])
    }

    /// Two-pointer intersection count of sorted lists.
    fn common(a: &[NodeId], b: &[NodeId]) -> u64 {
        let (mut i, mut j, mut count) = (0, 0, 0);
        while i < a.len() && j < b.len() {
            if a[i] == b[j] {
                count += 1;
                i += 1;
                j += 1;
            } else if a[i] < b[j] {
                i += 1;
            } else {
                j += 1;
            }
        }
        count
    }
}

impl Kernel for Triangles {
    type State = TriangleState;
    type Payload = Vec<NodeId>;

    fn gather(&self, state: &TriangleState, update: &Update<Vec<NodeId>>) -> TriangleState {
        TriangleState {
            count: state.count + Self::common(&update.payload, self.neighbor_list(update.dest)),
        }
    }

    fn apply(&self, _prev: &TriangleState, gathered: TriangleState) -> (TriangleState, Option<Vec<NodeId>>) {
        (gathered, None)
    }

    fn scatter(&self, payload: &Vec<NodeId>, _neighbor: NodeId, _degree: u32) -> Vec<NodeId> {
        payload.clone()
    }
}
