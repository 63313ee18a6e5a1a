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

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;

use crate::barrier::BarrierDistributor;
use crate::config::{EngineConfig, SchedulingPolicy};
use crate::error::Error;
use crate::kernel::{Kernel, Update};
use crate::layout::{AddressLayout, Adjacency};
use crate::pe::ProcessingElement;
use crate::router::Router;
use crate::{NodeId, PeId, Superstep};

/// Per-superstep observability snapshot, handed to `run_inspect`
/// callbacks right after each barrier release.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuperstepStats {
    pub superstep: Superstep,
    /// Messages applied by all PEs during this superstep.
    pub delivered: u64,
    /// Messages scattered during this superstep, i.e. the next
    /// superstep's inbound traffic.
    pub staged: u64,
}

/// Summary of a completed run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunReport {
    /// Supersteps executed, including the final zero-traffic one.
    pub supersteps: Superstep,
    /// Total messages applied across the run.
    pub messages: u64,
    /// Backpressure events: hazard refusals, full outboxes, held
    /// pipeline registers.
    pub stalls: u64,
    /// Times a queue exceeded the round-robin fairness bound.
    pub starvation_warnings: u64,
}

/// The whole machine: PEs, router, and barrier distributor, advanced
/// superstep by superstep until global inactivity.
pub struct Engine<K: Kernel> {
    config: EngineConfig,
    layout: AddressLayout,
    kernel: K,
    pes: Vec<ProcessingElement<K>>,
    router: Router<K::Payload>,
    barrier: BarrierDistributor,
    superstep: Superstep,
    rng: Option<Xoshiro256StarStar>,
}

impl<K: Kernel> Engine<K> {
    pub fn new(config: EngineConfig, kernel: K, adjacency: &Adjacency) -> Result<Self, Error> {
        let layout = AddressLayout::new(&config)?;
        let mut partitions = layout.partition(adjacency)?;
        let pes = (0..config.num_pe)
            .map(|pe| {
                ProcessingElement::new(
                    pe,
                    &kernel,
                    &layout,
                    std::mem::take(&mut partitions[pe]),
                    config.hazard_mode,
                    config.outbox_capacity,
                )
            })
            .collect::<Vec<_>>();
        let rng = match config.scheduling {
            SchedulingPolicy::RoundRobin => None,
            SchedulingPolicy::Shuffled { seed } => {
                Some(Xoshiro256StarStar::seed_from_u64(seed))
            }
        };
        log::info!(
            "engine: {} PEs x {} nodes, {} edge slots per PE",
            config.num_pe,
            config.nodes_per_pe,
            config.max_edges_per_pe
        );
        Ok(Self {
            router: Router::new(config.num_pe),
            barrier: BarrierDistributor::new(config.num_pe),
            config,
            layout,
            kernel,
            pes,
            superstep: 0,
            rng,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn layout(&self) -> &AddressLayout {
        &self.layout
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Inject an initial update, delivered in superstep 0 through the
    /// arbiter's priority path. Seeds are not counted by the barrier
    /// distributor, so a run with no reactivation drains in one extra
    /// superstep.
    pub fn seed(&mut self, update: Update<K::Payload>) -> Result<(), Error> {
        self.layout.check(update.dest)?;
        let dest_pe = self.layout.pe_of(update.dest);
        self.router.inject_seed(dest_pe, update);
        Ok(())
    }

    pub fn state_of(&self, node: NodeId) -> &K::State {
        self.pes[self.layout.pe_of(node)].state(self.layout.local_of(node))
    }

    /// All node states in global id order.
    pub fn states(&self) -> Vec<(NodeId, &K::State)> {
        let mut all = Vec::with_capacity(self.layout.num_nodes());
        for pe in self.pes.iter() {
            for (local, state) in pe.states().iter().enumerate() {
                all.push((self.layout.global_of(pe.pe(), local), state));
            }
        }
        all
    }

    pub fn superstep(&self) -> Superstep {
        self.superstep
    }

    /// Run until the barrier distributor observes a zero-traffic round.
    pub fn run(&mut self) -> Result<RunReport, Error> {
        self.run_inspect(|_| {})
    }

    /// Like `run`, with a callback invoked after every barrier release.
    pub fn run_inspect<F>(&mut self, mut inspect: F) -> Result<RunReport, Error>
    where
        F: FnMut(&SuperstepStats),
    {
        let mut messages = 0u64;
        loop {
            self.run_superstep();
            let delivered = self
                .pes
                .iter()
                .map(|pe| pe.applied_since_barrier())
                .sum::<u64>();
            messages += delivered;
            // every PE is quiescent: forward all markers; the last one
            // releases the aggregated barrier
            let mut release = None;
            for pe in 0..self.config.num_pe {
                release = self.barrier.marker(pe);
            }
            let release = match release {
                Some(release) => release,
                None => unreachable!("all barrier markers forwarded but the barrier is still held"),
            };
            let stats = SuperstepStats {
                superstep: self.superstep,
                delivered,
                staged: release.counts.iter().sum(),
            };
            log::debug!(
                "superstep {}: delivered {} staged {}",
                stats.superstep,
                stats.delivered,
                stats.staged
            );
            inspect(&stats);
            self.superstep += 1;
            if release.halt {
                break;
            }
            if let Some(limit) = self.config.max_supersteps {
                if self.superstep >= limit {
                    return Err(Error::SuperstepLimit(limit));
                }
            }
            self.router.open_superstep();
            for pe in self.pes.iter_mut() {
                pe.reset_superstep_counter();
            }
        }
        Ok(RunReport {
            supersteps: self.superstep,
            messages,
            stalls: self.pes.iter().map(|pe| pe.stalls()).sum(),
            starvation_warnings: self.router.starvation_warnings(),
        })
    }

    /// Step every PE until the current superstep's traffic is fully
    /// consumed and all pipelines have drained.
    fn run_superstep(&mut self) {
        let mut order = (0..self.config.num_pe).collect::<Vec<PeId>>();
        loop {
            if let Some(rng) = self.rng.as_mut() {
                order.shuffle(rng);
            }
            for &pe in order.iter() {
                let arbiter = self.router.arbiter(pe);
                self.pes[pe].step(&self.kernel, arbiter);
                while let Some(update) = self.pes[pe].pop_outbox() {
                    let dest_pe = self.layout.pe_of(update.dest);
                    self.barrier.record_message(dest_pe);
                    self.router.stage(pe, dest_pe, update);
                }
            }
            if self.is_quiescent() {
                break;
            }
        }
    }

    /// Local quiescence of every PE plus a drained network. Staged
    /// next-superstep traffic does not block quiescence.
    fn is_quiescent(&self) -> bool {
        self.router.is_drained() && self.pes.iter().all(|pe| pe.is_quiescent())
    }
}
