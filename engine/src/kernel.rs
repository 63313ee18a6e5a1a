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

//! The gather/apply/scatter capability set.
//!
//! The engine, PEs, router and barrier distributor are algorithm
//! agnostic; everything vertex-specific is dispatched through the
//! `Kernel` trait. Combine rules must be commutative/idempotent-safe:
//! the network gives no FIFO guarantee across senders, only per-node
//! mutual exclusion (see the collision detector).

use std::fmt::Debug;

use crate::NodeId;

pub mod bfs;
pub mod components;
pub mod pagerank;
pub mod sssp;
pub mod triangles;

/// A non-barrier message routed between PEs. Created by a scatter
/// stage (or the initial seed) and consumed exactly once by the
/// destination PE's apply pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct Update<P> {
    pub dest: NodeId,
    pub sender: NodeId,
    pub payload: P,
}

impl<P> Update<P> {
    pub fn new(dest: NodeId, sender: NodeId, payload: P) -> Self {
        Self {
            dest,
            sender,
            payload,
        }
    }
}

pub trait Kernel {
    /// Per-node record, owned by the node's PE, written only by apply.
    type State: Clone + Debug + Default;
    /// Algorithm payload carried by update messages.
    type Payload: Clone + Debug;

    /// Initial state for `node`, given its out-degree in the partition.
    fn init(&self, node: NodeId, degree: u32) -> Self::State {
        let _ = (node, degree);
        Default::default()
    }

    /// Merge an inbound update into the node's current state. Runs
    /// under hazard admission: no concurrent update to the same node
    /// is in flight.
    fn gather(&self, state: &Self::State, update: &Update<Self::Payload>) -> Self::State;

    /// Decide whether the gathered state changed enough to re-scatter.
    /// Returns the state to write back, and the payload to fan out to
    /// the node's neighbors (None suppresses re-broadcast).
    fn apply(&self, prev: &Self::State, gathered: Self::State)
        -> (Self::State, Option<Self::Payload>);

    /// Per-neighbor transform of an outbound payload. `degree` is the
    /// scattering node's neighbor count.
    fn scatter(&self, payload: &Self::Payload, neighbor: NodeId, degree: u32) -> Self::Payload;
}
