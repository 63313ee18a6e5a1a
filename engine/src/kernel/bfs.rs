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

use super::{Kernel, Update};
use crate::NodeId;

/// Breadth-first search: first update to reach a node claims it.
///
/// `parent == 0` means unvisited, so node id 0 must stay unused; seed
/// the root with itself as sender and it reads back as its own parent.
#[derive(Clone, Debug)]
pub struct Bfs;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BfsState {
    pub parent: NodeId,
}

impl BfsState {
    pub fn visited(&self) -> bool {
        self.parent != 0
    }
}

impl Kernel for Bfs {
    type State = BfsState;
    type Payload = ();

    fn gather(&self, state: &BfsState, update: &Update<()>) -> BfsState {
        if state.visited() {
            state.clone()
        } else {
            BfsState {
                parent: update.sender,
            }
        }
    }

    fn apply(&self, prev: &BfsState, gathered: BfsState) -> (BfsState, Option<()>) {
        // only a newly visited node re-scatters; this is what keeps the
        // frontier from re-broadcasting every superstep
        let newly_visited = !prev.visited() && gathered.visited();
        (gathered, if newly_visited { Some(()) } else { None })
    }

    fn scatter(&self, _payload: &(), _neighbor: NodeId, _degree: u32) {}
}
