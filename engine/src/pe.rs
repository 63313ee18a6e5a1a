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

use crate::config::HazardMode;
use crate::hazard::CollisionDetector;
use crate::kernel::{Kernel, Update};
use crate::layout::{AddressLayout, Partition};
use crate::router::Arbiter;
use crate::{NodeId, PeId};

// Pipeline stage registers. A `Some` register is a stage asserting
// `valid`; a stage advances only when the downstream register is empty
// (the ack side of the handshake). Nothing is ever dropped: a stage
// that cannot advance holds its value and retries next turn.

struct GatherReg<P> {
    local: usize,
    update: Update<P>,
}

struct ApplyReg<S> {
    local: usize,
    node: NodeId,
    gathered: S,
}

struct ScatterReg<P> {
    local: usize,
    node: NodeId,
    payload: P,
    /// Next neighbor to stamp; the fan-out resumes here after an
    /// outbox-full stall.
    cursor: usize,
}

/// One processing element: owns a partition of nodes and edges and
/// runs the three-stage gather/apply/scatter pipeline over its local
/// state.
///
/// Node state is mutated exclusively by this PE's apply stage; the
/// collision detector guarantees at most one in-flight update per
/// node between gather admission and apply writeback.
pub struct ProcessingElement<K: Kernel> {
    pe: PeId,
    layout: AddressLayout,
    partition: Partition,
    states: Vec<K::State>,
    hazards: CollisionDetector,
    gather_reg: Option<GatherReg<K::Payload>>,
    apply_reg: Option<ApplyReg<K::State>>,
    scatter_reg: Option<ScatterReg<K::Payload>>,
    outbox: VecDeque<Update<K::Payload>>,
    outbox_capacity: usize,
    /// Non-barrier messages applied since the last barrier.
    applied_since_barrier: u64,
    stalls: u64,
}

impl<K: Kernel> ProcessingElement<K> {
    pub fn new(
        pe: PeId,
        kernel: &K,
        layout: &AddressLayout,
        partition: Partition,
        hazard_mode: HazardMode,
        outbox_capacity: usize,
    ) -> Self {
        assert!(outbox_capacity > 0);
        let states = (0..layout.nodes_per_pe())
            .map(|local| kernel.init(layout.global_of(pe, local), partition.degree(local)))
            .collect::<Vec<_>>();
        Self {
            pe,
            layout: layout.clone(),
            partition,
            states,
            hazards: CollisionDetector::new(hazard_mode, layout.nodes_per_pe()),
            gather_reg: None,
            apply_reg: None,
            scatter_reg: None,
            outbox: VecDeque::with_capacity(outbox_capacity),
            outbox_capacity,
            applied_since_barrier: 0,
            stalls: 0,
        }
    }

    pub fn pe(&self) -> PeId {
        self.pe
    }

    pub fn state(&self, local: usize) -> &K::State {
        &self.states[local]
    }

    pub fn states(&self) -> &[K::State] {
        &self.states
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    pub fn stalls(&self) -> u64 {
        self.stalls
    }

    pub fn applied_since_barrier(&self) -> u64 {
        self.applied_since_barrier
    }

    pub fn reset_superstep_counter(&mut self) {
        self.applied_since_barrier = 0;
    }

    pub fn hazard_outstanding(&self) -> usize {
        self.hazards.outstanding()
    }

    /// True when the pipeline holds no work: safe to forward this PE's
    /// barrier marker.
    pub fn is_quiescent(&self) -> bool {
        let quiescent = self.gather_reg.is_none()
            && self.apply_reg.is_none()
            && self.scatter_reg.is_none()
            && self.outbox.is_empty();
        debug_assert!(!quiescent || self.hazards.is_idle());
        quiescent
    }

    pub fn pop_outbox(&mut self) -> Option<Update<K::Payload>> {
        self.outbox.pop_front()
    }

    /// Advance the pipeline by one scheduling turn. Stages run in
    /// reverse order so a value can move at most one stage per turn,
    /// like the hardware registers the model is derived from.
    pub fn step(&mut self, kernel: &K, arbiter: &mut Arbiter<K::Payload>) {
        self.step_scatter(kernel);
        self.step_apply(kernel);
        self.step_gather(kernel);
        self.admit(arbiter);
    }

    /// Expand the pending update into one message per neighbor. Holds
    /// the register (and backpressures apply) while the outbox is full.
    fn step_scatter(&mut self, kernel: &K) {
        let mut done = false;
        if let Some(reg) = self.scatter_reg.as_mut() {
            let degree = self.partition.degree(reg.local);
            let neighbors = self.partition.neighbors(reg.local);
            while reg.cursor < neighbors.len() {
                if self.outbox.len() >= self.outbox_capacity {
                    self.stalls += 1;
                    break;
                }
                let neighbor = neighbors[reg.cursor];
                let payload = kernel.scatter(&reg.payload, neighbor, degree);
                self.outbox.push_back(Update::new(neighbor, reg.node, payload));
                reg.cursor += 1;
            }
            done = reg.cursor == neighbors.len();
        }
        if done {
            self.scatter_reg = None;
        }
    }

    /// Write back the gathered state, release the hazard, and hand a
    /// re-scatter payload (if any) to the scatter stage.
    fn step_apply(&mut self, kernel: &K) {
        if self.apply_reg.is_none() {
            return;
        }
        if self.scatter_reg.is_some() {
            // downstream withholds the ack; hold the register
            self.stalls += 1;
            return;
        }
        if let Some(reg) = self.apply_reg.take() {
            let (state, emit) = kernel.apply(&self.states[reg.local], reg.gathered);
            log::trace!(
                "pe {}: apply node {} -> {:?} emit {}",
                self.pe,
                reg.node,
                state,
                emit.is_some()
            );
            self.states[reg.local] = state;
            self.hazards.release(reg.local);
            self.applied_since_barrier += 1;
            if let Some(payload) = emit {
                if self.partition.degree(reg.local) > 0 {
                    self.scatter_reg = Some(ScatterReg {
                        local: reg.local,
                        node: reg.node,
                        payload,
                        cursor: 0,
                    });
                }
            }
        }
    }

    /// Run the kernel combine over the admitted update.
    fn step_gather(&mut self, kernel: &K) {
        if self.gather_reg.is_none() {
            return;
        }
        if self.apply_reg.is_some() {
            self.stalls += 1;
            return;
        }
        if let Some(reg) = self.gather_reg.take() {
            let gathered = kernel.gather(&self.states[reg.local], &reg.update);
            self.apply_reg = Some(ApplyReg {
                local: reg.local,
                node: reg.update.dest,
                gathered,
            });
        }
    }

    /// Pull the next granted message from the arbiter, subject to
    /// hazard admission. A refused acquire leaves the grant in place
    /// (no ack), so the round-robin pointer does not rotate.
    fn admit(&mut self, arbiter: &mut Arbiter<K::Payload>) {
        if self.gather_reg.is_some() {
            return;
        }
        let (dest, local) = match arbiter.select() {
            Some(update) => (update.dest, self.layout.local_of(update.dest)),
            None => return,
        };
        debug_assert_eq!(self.layout.pe_of(dest), self.pe);
        if !self.hazards.try_acquire(local) {
            self.stalls += 1;
            return;
        }
        let update = arbiter
            .acknowledge()
            .expect("arbiter select returned a grant but acknowledge did not");
        log::trace!("pe {}: admit {:?}", self.pe, update);
        self.gather_reg = Some(GatherReg { local, update });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::kernel::bfs::Bfs;

    fn single_pe(outbox_capacity: usize) -> (ProcessingElement<Bfs>, Arbiter<()>) {
        let config = EngineConfig::sized(1, 8, 64);
        let layout = AddressLayout::new(&config).unwrap();
        let adjacency =
            crate::layout::adjacency_from_edges(&[(1, 2), (1, 3), (2, 3)], false);
        let partition = layout.partition(&adjacency).unwrap().remove(0);
        let pe = ProcessingElement::new(
            0,
            &Bfs,
            &layout,
            partition,
            HazardMode::Exact,
            outbox_capacity,
        );
        (pe, Arbiter::new(1))
    }

    #[test]
    fn test_pipeline_visits_and_scatters() {
        let (mut pe, mut arbiter) = single_pe(16);
        arbiter.push_seed(Update::new(1, 1, ()));
        // admit, gather, apply: one stage per turn
        pe.step(&Bfs, &mut arbiter);
        assert!(!pe.is_quiescent());
        pe.step(&Bfs, &mut arbiter);
        pe.step(&Bfs, &mut arbiter);
        assert_eq!(pe.state(1).parent, 1);
        // fourth turn expands the fan-out to neighbors 2 and 3
        pe.step(&Bfs, &mut arbiter);
        let out = std::iter::from_fn(|| pe.pop_outbox()).collect::<Vec<_>>();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|u| u.sender == 1));
        assert_eq!(
            out.iter().map(|u| u.dest).collect::<Vec<_>>(),
            vec![2, 3]
        );
        assert!(pe.is_quiescent());
    }

    #[test]
    fn test_hazard_blocks_second_update_to_same_node() {
        let (mut pe, mut arbiter) = single_pe(16);
        arbiter.push(0, Update::new(2, 1, ()));
        arbiter.push(0, Update::new(2, 3, ()));
        // turn 1: first update admitted
        pe.step(&Bfs, &mut arbiter);
        assert_eq!(pe.hazard_outstanding(), 1);
        assert_eq!(arbiter.len(), 1);
        // turn 2: first moves to apply; the second stalls at admission
        // because node 2's update is still in flight
        let stalls_before = pe.stalls();
        pe.step(&Bfs, &mut arbiter);
        assert_eq!(arbiter.len(), 1);
        assert!(pe.stalls() > stalls_before);
        assert_eq!(pe.hazard_outstanding(), 1);
        // turn 3: first writes back and releases; the second is admitted
        pe.step(&Bfs, &mut arbiter);
        assert_eq!(arbiter.len(), 0);
        assert_eq!(pe.state(2).parent, 1);
        // drain: the losing update applies without re-scattering
        while !pe.is_quiescent() {
            pe.step(&Bfs, &mut arbiter);
            while pe.pop_outbox().is_some() {}
        }
        assert_eq!(pe.state(2).parent, 1);
    }

    #[test]
    fn test_scatter_backpressure_holds_fanout() {
        let (mut pe, mut arbiter) = single_pe(1);
        arbiter.push_seed(Update::new(1, 1, ()));
        pe.step(&Bfs, &mut arbiter);
        pe.step(&Bfs, &mut arbiter);
        pe.step(&Bfs, &mut arbiter);
        // node 1 has two neighbors but the outbox holds one message
        pe.step(&Bfs, &mut arbiter);
        assert_eq!(pe.pop_outbox().unwrap().dest, 2);
        assert!(pe.pop_outbox().is_none());
        assert!(!pe.is_quiescent());
        // the fan-out resumes where it stalled; nothing was dropped
        pe.step(&Bfs, &mut arbiter);
        assert_eq!(pe.pop_outbox().unwrap().dest, 3);
        assert!(pe.is_quiescent());
    }
}
