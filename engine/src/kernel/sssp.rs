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

/// Single-source shortest paths over unit-weight edges. The payload is
/// the path length at arrival; scatter adds the hop cost.
#[derive(Clone, Debug)]
pub struct Sssp;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SsspState {
    pub dist: u32,
    pub parent: NodeId,
    pub active: bool,
}

impl Default for SsspState {
    fn default() -> Self {
        Self {
            dist: u32::MAX,
            parent: 0,
            active: false,
        }
    }
}

impl Kernel for Sssp {
    type State = SsspState;
    type Payload = u32;

    fn gather(&self, state: &SsspState, update: &Update<u32>) -> SsspState {
        // min combine, with the parent following the winning distance
        if update.payload < state.dist {
            SsspState {
                dist: update.payload,
                parent: update.sender,
                active: true,
            }
        } else {
            SsspState {
                active: false,
                ..state.clone()
            }
        }
    }

    fn apply(&self, prev: &SsspState, gathered: SsspState) -> (SsspState, Option<u32>) {
        let improved = gathered.dist < prev.dist;
        let dist = gathered.dist;
        (gathered, if improved { Some(dist) } else { None })
    }

    fn scatter(&self, payload: &u32, _neighbor: NodeId, _degree: u32) -> u32 {
        payload.saturating_add(1)
    }
}
