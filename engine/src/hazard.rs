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

use crate::config::HazardMode;

/// Size bound of the hardware's in-flight tracking table.
pub const BOUNDED_TABLE_LIMIT: usize = 32;

/// Per-PE admission control for node-state updates.
///
/// A gather may only read a node's state after `try_acquire` succeeds
/// for its local offset; the corresponding `release` happens when the
/// apply stage writes the state back. In between, any other message to
/// the same offset stalls at admission. This is what makes the kernel
/// combine rules safe under pipelined message arrival: at most one
/// update per node is ever in flight.
#[derive(Clone, Debug)]
pub enum CollisionDetector {
    /// One flag per local offset.
    Exact { flags: Vec<bool>, outstanding: usize },
    /// CAM-style table of in-flight offsets, bounded to
    /// `min(32, nodes_per_pe)` entries like the hardware variant. A
    /// full table refuses admission: the approximation trades
    /// false-positive stalls for storage, and is never unsafe.
    Bounded { table: Vec<u32>, capacity: usize },
}

impl CollisionDetector {
    pub fn new(mode: HazardMode, nodes_per_pe: usize) -> Self {
        match mode {
            HazardMode::Exact => Self::Exact {
                flags: vec![false; nodes_per_pe],
                outstanding: 0,
            },
            HazardMode::Bounded => {
                let capacity = BOUNDED_TABLE_LIMIT.min(nodes_per_pe);
                Self::Bounded {
                    table: Vec::with_capacity(capacity),
                    capacity,
                }
            }
        }
    }

    /// Admit a read of `local`'s state. Returns false if the offset is
    /// already in flight (or, in bounded mode, if the table is full);
    /// the caller must retry on a later scheduling turn.
    pub fn try_acquire(&mut self, local: usize) -> bool {
        match self {
            Self::Exact { flags, outstanding } => {
                if flags[local] {
                    false
                } else {
                    flags[local] = true;
                    *outstanding += 1;
                    true
                }
            }
            Self::Bounded { table, capacity } => {
                if table.len() == *capacity || table.contains(&(local as u32)) {
                    false
                } else {
                    table.push(local as u32);
                    true
                }
            }
        }
    }

    /// Mark the in-flight update of `local` complete.
    pub fn release(&mut self, local: usize) {
        match self {
            Self::Exact { flags, outstanding } => {
                assert!(flags[local], "release without acquire for offset {}", local);
                flags[local] = false;
                *outstanding -= 1;
            }
            Self::Bounded { table, .. } => {
                let position = table
                    .iter()
                    .position(|&entry| entry == local as u32)
                    .unwrap_or_else(|| panic!("release without acquire for offset {}", local));
                table.swap_remove(position);
            }
        }
    }

    pub fn outstanding(&self) -> usize {
        match self {
            Self::Exact { outstanding, .. } => *outstanding,
            Self::Bounded { table, .. } => table.len(),
        }
    }

    pub fn is_idle(&self) -> bool {
        self.outstanding() == 0
    }
}
