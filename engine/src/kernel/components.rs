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

use super::{Kernel, Update};
use crate::NodeId;

/// Connected components by min-label propagation. Every node is seeded
/// with its own id as color; a component converges on the minimum id
/// of its members.
#[derive(Clone, Debug)]
pub struct Components;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentState {
    pub color: NodeId,
    pub active: bool,
}

impl Default for ComponentState {
    fn default() -> Self {
        Self {
            color: NodeId::MAX,
            active: false,
        }
    }
}

impl Kernel for Components {
    type State = ComponentState;
    type Payload = NodeId;

    fn gather(&self, state: &ComponentState, update: &Update<NodeId>) -> ComponentState {
        // min combine: safe under arbitrary reordering
        if update.payload < state.color {
            ComponentState {
                color: update.payload,
                active: true,
            }
        } else {
            ComponentState {
                active: false,
                ..state.clone()
            }
        }
    }

    fn apply(&self, prev: &ComponentState, gathered: ComponentState) -> (ComponentState, Option<NodeId>) {
        let improved = gathered.color < prev.color;
        let color = gathered.color;
        (gathered, if improved { Some(color) } else { None })
    }

    fn scatter(&self, payload: &NodeId, _neighbor: NodeId, _degree: u32) -> NodeId {
        *payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_combine() {
        let kernel = Components;
        let state = ComponentState {
            color: 5,
            active: false,
        };
        let gathered = kernel.gather(&state, &Update::new(7, 3, 3));
        assert_eq!(gathered.color, 3);
        assert!(gathered.active);
        let unchanged = kernel.gather(&gathered, &Update::new(7, 9, 9));
        assert_eq!(unchanged.color, 3);
        assert!(!unchanged.active);
    }

    #[test]
    fn test_emit_on_improvement_only() {
        let kernel = Components;
        let prev = ComponentState {
            color: 5,
            active: false,
        };
        let better = ComponentState {
            color: 2,
            active: true,
        };
        assert_eq!(kernel.apply(&prev, better.clone()).1, Some(2));
        assert_eq!(kernel.apply(&better, better.clone()).1, None);
        // the seed improves on the MAX sentinel and must propagate
        let seeded = kernel.gather(&ComponentState::default(), &Update::new(4, 4, 4));
        assert_eq!(kernel.apply(&ComponentState::default(), seeded).1, Some(4));
    }
}
