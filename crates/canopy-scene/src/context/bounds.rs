// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Bounding box accumulation.

use crate::context::PhaseContext;
use crate::state::BoundsState;
use canopy_core::math::Aabb;

/// Read-only traversal accumulating the world-space bounds of a scene.
#[derive(Debug, Default)]
pub struct BoundingBoxQuery {
    bounds: Aabb,
    /// The current state of the traversal.
    pub state: BoundsState,
}

impl PhaseContext for BoundingBoxQuery {
    type State = BoundsState;

    fn state_mut(&mut self) -> &mut Self::State {
        &mut self.state
    }
}

impl BoundingBoxQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extends the result by a box given in the current model space.
    pub fn extend_by(&mut self, local: &Aabb) {
        if local.is_valid() {
            self.bounds
                .extend_by(&local.transformed(&self.state.model_matrix));
        }
    }

    /// The accumulated bounds; [`Aabb::INVALID`] if nothing contributed.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }
}
