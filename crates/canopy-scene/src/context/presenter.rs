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

//! The Present phase context.

use crate::context::PhaseContext;
use crate::resources::ResourceTable;
use canopy_core::math::Extent2D;
use canopy_core::renderer::api::SemaphoreId;

/// Per-frame context run after submission and before the image is presented.
///
/// Starts with the render-finished semaphore in its wait list; nodes may add
/// semaphores of work they submitted themselves.
#[derive(Debug)]
pub struct Presenter<'a> {
    table: &'a ResourceTable,
    image_index: u32,
    extent: Extent2D,
    wait_semaphores: Vec<SemaphoreId>,
    state: (),
}

impl PhaseContext for Presenter<'_> {
    type State = ();

    fn state_mut(&mut self) -> &mut Self::State {
        &mut self.state
    }
}

impl<'a> Presenter<'a> {
    pub fn new(
        table: &'a ResourceTable,
        image_index: u32,
        extent: Extent2D,
        wait_semaphores: Vec<SemaphoreId>,
    ) -> Self {
        Self {
            table,
            image_index,
            extent,
            wait_semaphores,
            state: (),
        }
    }

    pub fn resources(&self) -> &ResourceTable {
        self.table
    }

    /// Index of the swapchain image being presented.
    pub fn image_index(&self) -> u32 {
        self.image_index
    }

    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    pub fn wait_on(&mut self, semaphore: SemaphoreId) {
        self.wait_semaphores.push(semaphore);
    }

    pub fn into_wait_semaphores(self) -> Vec<SemaphoreId> {
        self.wait_semaphores
    }
}
