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

use std::fmt;

use crate::{NodeId, PeId};

#[derive(Debug, Eq, PartialEq)]
pub enum Error {
    /// `nodeid_bits` cannot address `num_pe * nodes_per_pe` nodes.
    InvalidNodeBits(usize, usize),
    /// `pe_id_bits` cannot address `num_pe` processing elements.
    InvalidPeBits(usize, usize),
    /// `edge_id_bits` cannot address `max_edges_per_pe` edges.
    InvalidEdgeBits(usize, usize),
    /// The per-PE node count must be a power of two for bit-sliced addressing.
    NodesPerPeNotPow2(usize),
    NodeOutOfRange(NodeId),
    /// A PE's neighbor lists exceed its edge memory: (pe, required, capacity).
    PartitionOverflow(PeId, usize, usize),
    /// The run exceeded the configured superstep safety bound.
    SuperstepLimit(usize),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidNodeBits(bits, required) => {
                write!(
                    f,
                    "ERROR: nodeid_bits {} cannot address the node space (need {})",
                    bits, required
                )
            }
            Self::InvalidPeBits(bits, required) => {
                write!(
                    f,
                    "ERROR: pe_id_bits {} cannot address all PEs (need {})",
                    bits, required
                )
            }
            Self::InvalidEdgeBits(bits, required) => {
                write!(
                    f,
                    "ERROR: edge_id_bits {} cannot address the edge memory (need {})",
                    bits, required
                )
            }
            Self::NodesPerPeNotPow2(n) => {
                write!(f, "ERROR: nodes_per_pe {} is not a power of two", n)
            }
            Self::NodeOutOfRange(id) => {
                write!(f, "ERROR: node {} is outside the partitioned id range", id)
            }
            Self::PartitionOverflow(pe, required, capacity) => {
                write!(
                    f,
                    "ERROR: PE {} requires {} edge slots but has {}",
                    pe, required, capacity
                )
            }
            Self::SuperstepLimit(limit) => {
                write!(f, "ERROR: no global inactivity after {} supersteps", limit)
            }
        }
    }
}

// this is needed to allow `anyhow::Result` to accept our definition of
// errors. The apps use `anyhow` for their top-level results.
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}
