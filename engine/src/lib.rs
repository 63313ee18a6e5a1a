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

mod barrier;
mod config;
mod error;
mod hazard;
mod layout;
mod pe;
mod router;
mod sim;

// algorithm kernels (the gather/apply/scatter capability set)
pub mod kernel;

// Public types
// type to use for node identifiers; the value range is partitioned into
// (pe, local offset) pairs by the AddressLayout.
pub type NodeId = u32;
// type to use for processing-element indices
pub type PeId = usize;
// type to use for superstep (BSP round) counters
pub type Superstep = usize;

pub use crate::barrier::{BarrierDistributor, BarrierRelease};
pub use crate::config::{EngineConfig, HazardMode, OverflowPolicy, SchedulingPolicy};
pub use crate::error::Error;
pub use crate::hazard::CollisionDetector;
pub use crate::kernel::bfs::{Bfs, BfsState};
pub use crate::kernel::components::{Components, ComponentState};
pub use crate::kernel::pagerank::{PageRank, PageRankState};
pub use crate::kernel::sssp::{Sssp, SsspState};
pub use crate::kernel::triangles::{TriangleState, Triangles};
pub use crate::kernel::{Kernel, Update};
pub use crate::layout::{adjacency_from_edges, adjacency_from_graph};
pub use crate::layout::{AddressLayout, Adjacency, Partition};
pub use crate::pe::ProcessingElement;
pub use crate::router::{Arbiter, Router};
pub use crate::sim::{Engine, RunReport, SuperstepStats};
pub use petgraph::graph::UnGraph;
