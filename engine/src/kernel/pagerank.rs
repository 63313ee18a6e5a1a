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

/// PageRank with a fixed iteration budget.
///
/// A node accumulates weighted contributions until it has heard from
/// all `nneighbors` in-neighbors, then folds them into a new rank and
/// re-scatters `rank / degree` to each neighbor. Seed every node with
/// a self-update (sender == dest) to trigger the first broadcast; once
/// `rounds_left` hits zero nothing is emitted and the run drains to
/// global inactivity.
#[derive(Clone, Debug)]
pub struct PageRank {
    pub damping: f64,
    pub num_nodes: usize,
    pub rounds: u32,
}

impl PageRank {
    pub fn new(damping: f64, num_nodes: usize, rounds: u32) -> Self {
        Self {
            damping,
            num_nodes,
            rounds,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PageRankState {
    pub nneighbors: u32,
    pub nrecvd: u32,
    pub sum: f64,
    pub rank: f64,
    pub rounds_left: u32,
    pub seeded: bool,
}

impl Kernel for PageRank {
    type State = PageRankState;
    type Payload = f64;

    fn init(&self, _node: NodeId, degree: u32) -> PageRankState {
        PageRankState {
            nneighbors: degree,
            rank: 1.0 / self.num_nodes as f64,
            rounds_left: self.rounds,
            ..Default::default()
        }
    }

    fn gather(&self, state: &PageRankState, update: &Update<f64>) -> PageRankState {
        let mut gathered = state.clone();
        if update.sender == update.dest {
            gathered.seeded = true;
        } else {
            gathered.sum += update.payload;
            gathered.nrecvd += 1;
        }
        gathered
    }

    fn apply(&self, prev: &PageRankState, gathered: PageRankState) -> (PageRankState, Option<f64>) {
        if gathered.seeded && !prev.seeded {
            // initial broadcast of the uniform rank
            let rank = gathered.rank;
            return (gathered, Some(rank));
        }
        if gathered.nneighbors > 0 && gathered.nrecvd == gathered.nneighbors {
            let mut next = gathered;
            next.rank = (1.0 - self.damping) / self.num_nodes as f64 + self.damping * next.sum;
            next.nrecvd = 0;
            next.sum = 0.0;
            if next.rounds_left > 0 {
                next.rounds_left -= 1;
                let rank = next.rank;
                return (next, Some(rank));
            }
            return (next, None);
        }
        (gathered, None)
    }

    fn scatter(&self, payload: &f64, _neighbor: NodeId, degree: u32) -> f64 {
        // the rank mass is split evenly across the out edges
        payload / degree as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_triggers_initial_broadcast() {
        let kernel = PageRank::new(0.85, 4, 10);
        let init = kernel.init(1, 2);
        assert_eq!(init.nneighbors, 2);
        assert!((init.rank - 0.25).abs() < 1e-12);
        let gathered = kernel.gather(&init, &Update::new(1, 1, 0.0));
        assert!(gathered.seeded);
        assert_eq!(gathered.nrecvd, 0);
        let (_, emit) = kernel.apply(&init, gathered);
        assert_eq!(emit, Some(0.25));
    }

    #[test]
    fn test_fold_after_all_neighbors_heard() {
        let kernel = PageRank::new(0.85, 4, 1);
        let mut state = kernel.init(1, 2);
        state.seeded = true;
        let partial = kernel.gather(&state, &Update::new(1, 2, 0.1));
        assert_eq!(kernel.apply(&state, partial.clone()).1, None);
        let complete = kernel.gather(&partial, &Update::new(1, 3, 0.2));
        let (next, emit) = kernel.apply(&partial, complete);
        let expected = 0.15 / 4.0 + 0.85 * 0.3;
        assert!((next.rank - expected).abs() < 1e-12);
        assert_eq!(next.nrecvd, 0);
        assert_eq!(next.rounds_left, 0);
        assert_eq!(emit, Some(next.rank));
    }

    #[test]
    fn test_exhausted_budget_stops_emitting() {
        let kernel = PageRank::new(0.85, 4, 0);
        let mut state = kernel.init(1, 1);
        state.seeded = true;
        let complete = kernel.gather(&state, &Update::new(1, 2, 0.5));
        let (_, emit) = kernel.apply(&state, complete);
        assert_eq!(emit, None);
    }

    #[test]
    fn test_scatter_divides_by_degree() {
        let kernel = PageRank::new(0.85, 4, 1);
        assert!((kernel.scatter(&0.5, 2, 4) - 0.125).abs() < 1e-12);
    }
}
