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

use itertools::Itertools;
use petgraph::graph::UnGraph;
use std::collections::{BTreeMap, BTreeSet};

use crate::config::{ceil_log2, EngineConfig, OverflowPolicy};
use crate::{Error, NodeId, PeId};

/// The host-side adjacency handed over by the graph loader.
pub type Adjacency = BTreeMap<NodeId, BTreeSet<NodeId>>;

/// CSR-style adjacency slice owned by one PE.
///
/// `index[local] = (start, degree)` points into the flat `values`
/// array; a PE never follows edges outside its own slice.
#[derive(Clone, Debug, Default)]
pub struct Partition {
    pub index: Vec<(u32, u32)>,
    pub values: Vec<NodeId>,
    /// Edges dropped by `OverflowPolicy::Truncate`; zero otherwise.
    pub dropped_edges: usize,
}

impl Partition {
    pub fn neighbors(&self, local: usize) -> &[NodeId] {
        let (start, degree) = self.index[local];
        &self.values[start as usize..(start + degree) as usize]
    }

    pub fn degree(&self, local: usize) -> u32 {
        self.index[local].1
    }

    pub fn edge_count(&self) -> usize {
        self.values.len()
    }
}

/// Bit-sliced mapping between global node ids and (pe, local offset)
/// pairs, plus the partitioner that builds each PE's CSR slice.
#[derive(Clone, Debug)]
pub struct AddressLayout {
    num_pe: usize,
    nodes_per_pe: usize,
    max_edges_per_pe: usize,
    local_bits: usize,
    overflow_policy: OverflowPolicy,
}

impl AddressLayout {
    /// Validate the configured bit widths against the value ranges they
    /// must address. Fatal at startup: an engine is never built on top
    /// of an invalid layout.
    pub fn new(config: &EngineConfig) -> Result<Self, Error> {
        if !config.nodes_per_pe.is_power_of_two() {
            return Err(Error::NodesPerPeNotPow2(config.nodes_per_pe));
        }
        let local_bits = ceil_log2(config.nodes_per_pe);
        let required_pe_bits = ceil_log2(config.num_pe).max(1);
        if config.pe_id_bits < required_pe_bits {
            return Err(Error::InvalidPeBits(config.pe_id_bits, required_pe_bits));
        }
        let required_node_bits = config.pe_id_bits + local_bits;
        if config.nodeid_bits < required_node_bits {
            return Err(Error::InvalidNodeBits(
                config.nodeid_bits,
                required_node_bits,
            ));
        }
        let required_edge_bits = ceil_log2(config.max_edges_per_pe).max(1);
        if config.edge_id_bits < required_edge_bits {
            return Err(Error::InvalidEdgeBits(
                config.edge_id_bits,
                required_edge_bits,
            ));
        }
        Ok(Self {
            num_pe: config.num_pe,
            nodes_per_pe: config.nodes_per_pe,
            max_edges_per_pe: config.max_edges_per_pe,
            local_bits,
            overflow_policy: config.overflow_policy,
        })
    }

    pub fn num_pe(&self) -> usize {
        self.num_pe
    }

    pub fn nodes_per_pe(&self) -> usize {
        self.nodes_per_pe
    }

    pub fn num_nodes(&self) -> usize {
        self.num_pe * self.nodes_per_pe
    }

    pub fn max_edges_per_pe(&self) -> usize {
        self.max_edges_per_pe
    }

    pub fn pe_of(&self, id: NodeId) -> PeId {
        (id >> self.local_bits) as PeId
    }

    pub fn local_of(&self, id: NodeId) -> usize {
        (id as usize) & (self.nodes_per_pe - 1)
    }

    pub fn global_of(&self, pe: PeId, local: usize) -> NodeId {
        debug_assert!(pe < self.num_pe && local < self.nodes_per_pe);
        ((pe << self.local_bits) | local) as NodeId
    }

    pub fn check(&self, id: NodeId) -> Result<(), Error> {
        if (id as usize) < self.num_nodes() {
            Ok(())
        } else {
            Err(Error::NodeOutOfRange(id))
        }
    }

    /// Bucket the host adjacency into per-PE CSR slices.
    ///
    /// Deterministic: nodes are visited in (pe, local) order and each
    /// neighbor list is appended in ascending neighbor order. A PE
    /// whose lists exceed `max_edges_per_pe` either fails the whole
    /// partitioning or gets its tail truncated, per the configured
    /// `OverflowPolicy`.
    pub fn partition(&self, adjacency: &Adjacency) -> Result<Vec<Partition>, Error> {
        for (&node, neighbors) in adjacency.iter() {
            self.check(node)?;
            for &neighbor in neighbors.iter() {
                self.check(neighbor)?;
            }
        }
        let mut partitions = Vec::with_capacity(self.num_pe);
        for pe in 0..self.num_pe {
            let required: usize = (0..self.nodes_per_pe)
                .filter_map(|local| adjacency.get(&self.global_of(pe, local)))
                .map(|neighbors| neighbors.len())
                .sum();
            if required > self.max_edges_per_pe {
                match self.overflow_policy {
                    OverflowPolicy::Fail => {
                        return Err(Error::PartitionOverflow(
                            pe,
                            required,
                            self.max_edges_per_pe,
                        ));
                    }
                    OverflowPolicy::Truncate => {
                        log::warn!(
                            "PE {}: neighbor lists need {} slots, truncating to {} ({} edges dropped)",
                            pe,
                            required,
                            self.max_edges_per_pe,
                            required - self.max_edges_per_pe
                        );
                    }
                }
            }
            let mut partition = Partition {
                index: Vec::with_capacity(self.nodes_per_pe),
                values: Vec::with_capacity(required.min(self.max_edges_per_pe)),
                dropped_edges: required.saturating_sub(self.max_edges_per_pe),
            };
            for local in 0..self.nodes_per_pe {
                let start = partition.values.len();
                let room = self.max_edges_per_pe - start;
                let mut degree = 0;
                if let Some(neighbors) = adjacency.get(&self.global_of(pe, local)) {
                    for &neighbor in neighbors.iter().take(room) {
                        partition.values.push(neighbor);
                        degree += 1;
                    }
                }
                partition.index.push((start as u32, degree as u32));
            }
            partitions.push(partition);
        }
        Ok(partitions)
    }
}

/// Build the loader-facing adjacency from an undirected petgraph graph.
///
/// Node indices are offset by `base` so callers can reserve id 0 (the
/// BFS kernel uses parent 0 as the "unvisited" sentinel).
pub fn adjacency_from_graph<N, E>(graph: &UnGraph<N, E>, base: NodeId) -> Adjacency {
    adjacency_from_edges(
        &graph
            .edge_indices()
            .filter_map(|e| graph.edge_endpoints(e))
            .map(|(a, b)| {
                (
                    a.index() as NodeId + base,
                    b.index() as NodeId + base,
                )
            })
            .collect::<Vec<_>>(),
        false,
    )
}

/// Build the loader-facing adjacency from an edge list.
///
/// With `directed == false` each edge contributes both directions.
/// Self loops are kept once.
pub fn adjacency_from_edges(edges: &[(NodeId, NodeId)], directed: bool) -> Adjacency {
    let mut adjacency = Adjacency::new();
    for &(src, dst) in edges.iter().sorted() {
        adjacency.entry(src).or_insert_with(BTreeSet::new).insert(dst);
        if !directed {
            adjacency.entry(dst).or_insert_with(BTreeSet::new).insert(src);
        }
    }
    adjacency
}
