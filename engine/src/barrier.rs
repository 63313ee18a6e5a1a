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

use crate::PeId;

/// Result of a completed barrier round: one aggregated barrier per PE,
/// carrying the number of messages bound for that PE in the next
/// superstep, and the halt flag raised on a zero-traffic round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BarrierRelease {
    /// Messages forwarded to each destination PE since the previous
    /// barrier.
    pub counts: Vec<u64>,
    /// Index of the completed round.
    pub round: usize,
    /// Global inactivity: the round completed without any traffic.
    pub halt: bool,
}

/// Turns per-PE local quiescence into a synchronized superstep boundary.
///
/// Counts non-barrier messages per destination PE, and holds each PE's
/// barrier marker until all `num_pe` markers of the round have arrived;
/// only then is the aggregated barrier released, so no PE can observe
/// superstep `n+1` traffic while a peer is still in superstep `n`.
#[derive(Clone, Debug)]
pub struct BarrierDistributor {
    num_pe: usize,
    counts: Vec<u64>,
    arrived: Vec<bool>,
    /// Next marker slot the release scan waits on; cycles 0..num_pe.
    curr_barrier: usize,
    round: usize,
}

impl BarrierDistributor {
    pub fn new(num_pe: usize) -> Self {
        assert!(num_pe > 0);
        Self {
            num_pe,
            counts: vec![0; num_pe],
            arrived: vec![false; num_pe],
            curr_barrier: 0,
            round: 0,
        }
    }

    /// Account one non-barrier message forwarded towards `dest_pe`.
    pub fn record_message(&mut self, dest_pe: PeId) {
        self.counts[dest_pe] += 1;
    }

    /// A PE forwards its barrier marker for the current round. The
    /// marker is withheld until the round is complete; the final
    /// marker returns the aggregated release and resets the counters.
    pub fn marker(&mut self, pe: PeId) -> Option<BarrierRelease> {
        assert!(
            !self.arrived[pe],
            "PE {} forwarded a second barrier marker in round {}",
            pe,
            self.round
        );
        self.arrived[pe] = true;
        while self.curr_barrier < self.num_pe && self.arrived[self.curr_barrier] {
            self.curr_barrier += 1;
        }
        if self.curr_barrier < self.num_pe {
            return None;
        }
        let counts = std::mem::replace(&mut self.counts, vec![0; self.num_pe]);
        let halt = counts.iter().all(|&c| c == 0);
        let release = BarrierRelease {
            counts,
            round: self.round,
            halt,
        };
        log::debug!(
            "barrier round {} released: counts {:?} halt {}",
            release.round,
            release.counts,
            release.halt
        );
        self.arrived = vec![false; self.num_pe];
        self.curr_barrier = 0;
        self.round += 1;
        Some(release)
    }

    /// Completed barrier rounds.
    pub fn round(&self) -> usize {
        self.round
    }

    /// Markers still outstanding in the current round.
    pub fn pending_markers(&self) -> usize {
        self.arrived.iter().filter(|&&a| !a).count()
    }
}
