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

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Default capacity of a PE's scatter outbox, in messages.
pub const OUTBOX_CAPACITY: usize = 16;

/// What to do when a PE's neighbor lists exceed its edge memory.
///
/// The hardware printed a warning and silently dropped edges; here the
/// caller opts into the loss explicitly.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum OverflowPolicy {
    /// Refuse the partitioning with `Error::PartitionOverflow`.
    Fail,
    /// Truncate neighbor lists to capacity; dropped edges are logged.
    Truncate,
}

/// How a PE tracks in-flight node updates.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum HazardMode {
    /// One flag per local node offset. Never stalls spuriously.
    Exact,
    /// A table of `min(32, nodes_per_pe)` in-flight offsets, as built in
    /// hardware. A full table stalls admission: false-positive stalls,
    /// never false negatives.
    Bounded,
}

/// Order in which the engine schedules PE pipeline turns.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum SchedulingPolicy {
    /// Fixed 0..num_pe order each turn; fully deterministic.
    RoundRobin,
    /// Per-turn shuffle from a seeded generator. Deterministic for a
    /// given seed; used to exercise interleavings in tests.
    Shuffled { seed: u64 },
}

/// provides the set of parameters that shape an engine instance
///
/// constructed programmatically or read from a config file.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EngineConfig {
    pub num_pe: usize,
    /// Nodes owned by each PE; must be a power of two.
    pub nodes_per_pe: usize,
    /// Capacity of each PE's flattened neighbor array.
    pub max_edges_per_pe: usize,
    pub nodeid_bits: usize,
    pub edge_id_bits: usize,
    pub pe_id_bits: usize,
    pub outbox_capacity: usize,
    pub overflow_policy: OverflowPolicy,
    pub hazard_mode: HazardMode,
    pub scheduling: SchedulingPolicy,
    /// Safety bound for the surrounding harness; the protocol itself
    /// terminates only on global inactivity.
    pub max_supersteps: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            num_pe: 4,
            nodes_per_pe: 16,
            max_edges_per_pe: 256,
            nodeid_bits: 32,
            edge_id_bits: 16,
            pe_id_bits: 8,
            outbox_capacity: OUTBOX_CAPACITY,
            overflow_policy: OverflowPolicy::Fail,
            hazard_mode: HazardMode::Exact,
            scheduling: SchedulingPolicy::RoundRobin,
            max_supersteps: None,
        }
    }
}

impl EngineConfig {
    /// A configuration sized for `num_pe` PEs of `nodes_per_pe` nodes,
    /// with the minimal bit widths that pass layout validation.
    pub fn sized(num_pe: usize, nodes_per_pe: usize, max_edges_per_pe: usize) -> Self {
        let pe_id_bits = ceil_log2(num_pe).max(1);
        let nodeid_bits = pe_id_bits + ceil_log2(nodes_per_pe);
        let edge_id_bits = ceil_log2(max_edges_per_pe).max(1);
        Self {
            num_pe,
            nodes_per_pe,
            max_edges_per_pe,
            nodeid_bits,
            edge_id_bits,
            pe_id_bits,
            ..Default::default()
        }
    }

    #[allow(dead_code)]
    pub fn from_file(file_name: &str) -> Self {
        let file = File::open(Path::new(file_name))
            .unwrap_or_else(|e| panic!("File {} not found. {:?}", file_name, e));
        let reader = BufReader::new(file);
        serde_yaml::from_reader(reader).unwrap()
    }
    #[allow(dead_code)]
    pub fn from_str(config: &str) -> Self {
        serde_yaml::from_str(config).unwrap()
    }
}

/// Smallest `b` with `2^b >= n` (0 for n <= 1).
pub(crate) fn ceil_log2(n: usize) -> usize {
    let mut bits = 0;
    while (1usize << bits) < n {
        bits += 1;
    }
    bits
}
