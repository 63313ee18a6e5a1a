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

use std::collections::VecDeque;

use crate::kernel::Update;
use crate::PeId;

/// Round-robin arbiter in front of one PE's apply stage.
///
/// One inbound queue per source PE, plus a seed queue that bypasses
/// arbitration with highest priority (used to inject the algorithm's
/// initial active set). The grant pointer rotates only on a successful
/// acknowledgement: while the consumer is backpressured the same queue
/// keeps the grant, so a stalled consumer cannot amplify starvation.
#[derive(Clone, Debug)]
pub struct Arbiter<P> {
    queues: Vec<VecDeque<Update<P>>>,
    seed_queue: VecDeque<Update<P>>,
    grant_ptr: usize,
    /// Successful grants since each queue was last granted, counted only
    /// while the queue is non-empty. Exceeding the `num_pe` fairness
    /// bound is an observability signal, not a failure.
    waits: Vec<usize>,
    starvation_warnings: u64,
}

impl<P> Arbiter<P> {
    pub fn new(num_pe: usize) -> Self {
        assert!(num_pe > 0);
        Self {
            queues: (0..num_pe).map(|_| VecDeque::new()).collect(),
            seed_queue: VecDeque::new(),
            grant_ptr: 0,
            waits: vec![0; num_pe],
            starvation_warnings: 0,
        }
    }

    pub fn push(&mut self, src: PeId, update: Update<P>) {
        self.queues[src].push_back(update);
    }

    pub fn push_seed(&mut self, update: Update<P>) {
        self.seed_queue.push_back(update);
    }

    pub fn len(&self) -> usize {
        self.seed_queue.len() + self.queues.iter().map(|q| q.len()).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn starvation_warnings(&self) -> u64 {
        self.starvation_warnings
    }

    /// The queue the round-robin scan would grant next, if any.
    fn granted_queue(&self) -> Option<usize> {
        let n = self.queues.len();
        (0..n)
            .map(|i| (self.grant_ptr + i) % n)
            .find(|&q| !self.queues[q].is_empty())
    }

    /// Peek the update that would be granted next: the seed path first,
    /// then the round-robin pick. Does not consume anything; the
    /// consumer acknowledges separately (change-on-acknowledge).
    pub fn select(&self) -> Option<&Update<P>> {
        if let Some(update) = self.seed_queue.front() {
            return Some(update);
        }
        self.granted_queue().map(|q| &self.queues[q][0])
    }

    /// Consume the update previously returned by `select` and rotate
    /// the grant pointer past the granted queue. Seed messages do not
    /// rotate the pointer (they never went through arbitration).
    pub fn acknowledge(&mut self) -> Option<Update<P>> {
        if let Some(update) = self.seed_queue.pop_front() {
            return Some(update);
        }
        let granted = self.granted_queue()?;
        let update = self.queues[granted].pop_front();
        self.grant_ptr = (granted + 1) % self.queues.len();
        self.waits[granted] = 0;
        for q in 0..self.queues.len() {
            if q != granted && !self.queues[q].is_empty() {
                self.waits[q] += 1;
                if self.waits[q] == self.queues.len() + 1 {
                    log::warn!(
                        "queue {} not granted within {} grants (round-robin bound exceeded)",
                        q,
                        self.queues.len()
                    );
                    self.starvation_warnings += 1;
                }
            }
        }
        update
    }
}

/// The on-chip network: one arbiter per destination PE, plus the
/// staging area that withholds scattered updates until the next
/// barrier release (scatter output of superstep `n` is apply input of
/// superstep `n+1`).
#[derive(Clone, Debug)]
pub struct Router<P> {
    arbiters: Vec<Arbiter<P>>,
    staged: Vec<VecDeque<(PeId, Update<P>)>>,
}

impl<P> Router<P> {
    pub fn new(num_pe: usize) -> Self {
        Self {
            arbiters: (0..num_pe).map(|_| Arbiter::new(num_pe)).collect(),
            staged: (0..num_pe).map(|_| VecDeque::new()).collect(),
        }
    }

    pub fn arbiter(&mut self, pe: PeId) -> &mut Arbiter<P> {
        &mut self.arbiters[pe]
    }

    /// Inject a seed message, deliverable in the current superstep.
    pub fn inject_seed(&mut self, dest_pe: PeId, update: Update<P>) {
        self.arbiters[dest_pe].push_seed(update);
    }

    /// Queue a scattered update for delivery after the next barrier.
    pub fn stage(&mut self, src_pe: PeId, dest_pe: PeId, update: Update<P>) {
        self.staged[dest_pe].push_back((src_pe, update));
    }

    /// Promote staged traffic into the inbound queues; called exactly
    /// once per barrier release.
    pub fn open_superstep(&mut self) {
        for (dest_pe, staged) in self.staged.iter_mut().enumerate() {
            while let Some((src_pe, update)) = staged.pop_front() {
                self.arbiters[dest_pe].queues[src_pe].push_back(update);
            }
        }
    }

    /// True when every inbound queue of the current superstep is empty.
    /// Staged (next-superstep) traffic does not count.
    pub fn is_drained(&self) -> bool {
        self.arbiters.iter().all(|a| a.is_empty())
    }

    pub fn staged_len(&self) -> usize {
        self.staged.iter().map(|s| s.len()).sum()
    }

    pub fn starvation_warnings(&self) -> u64 {
        self.arbiters.iter().map(|a| a.starvation_warnings()).sum()
    }
}
