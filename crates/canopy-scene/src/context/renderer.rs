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

//! The Render phase context.

use crate::context::phase_context;
use crate::error::SceneError;
use crate::resources::ResourceTable;
use crate::state::RenderState;
use canopy_core::math::Extent2D;
use canopy_core::renderer::api::{BufferId, CommandBufferId};

/// The secondary command buffers a frame executes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderBatches {
    /// Compute work, executed before the render pass.
    pub dispatches: Vec<CommandBufferId>,
    /// Draws, executed inside the render pass.
    pub draws: Vec<CommandBufferId>,
}

/// Per-frame context: uniform updates and the list of commands to execute.
#[derive(Debug)]
pub struct SceneRenderer<'a> {
    table: &'a ResourceTable,
    extent: Extent2D,
    batches: RenderBatches,
    /// The current state of the traversal.
    pub state: RenderState,
}

phase_context!(SceneRenderer, RenderState);

impl<'a> SceneRenderer<'a> {
    pub fn new(table: &'a ResourceTable, extent: Extent2D) -> Self {
        Self {
            table,
            extent,
            batches: RenderBatches::default(),
            state: RenderState::default(),
        }
    }

    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    /// Writes host data into a host-visible buffer.
    pub fn write_buffer(&self, buffer: BufferId, offset: u64, data: &[u8]) -> Result<(), SceneError> {
        self.table.write_buffer(buffer, offset, data)
    }

    /// Queues a recorded draw for execution inside the render pass.
    pub fn execute_draw(&mut self, commands: CommandBufferId) {
        self.batches.draws.push(commands);
    }

    /// Queues a recorded dispatch for execution before the render pass.
    pub fn execute_dispatch(&mut self, commands: CommandBufferId) {
        self.batches.dispatches.push(commands);
    }

    pub fn into_batches(self) -> RenderBatches {
        self.batches
    }
}
