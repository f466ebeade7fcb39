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

//! The Record phase context.

use crate::context::phase_context;
use crate::resources::ResourceTable;
use crate::state::RecordState;
use canopy_core::math::Extent2D;
use canopy_core::renderer::api::RenderPassId;

/// Gives command nodes what they need to record their secondary command buffers.
#[derive(Debug)]
pub struct CommandRecorder<'a> {
    table: &'a mut ResourceTable,
    render_pass: RenderPassId,
    extent: Extent2D,
    /// The current state of the traversal.
    pub state: RecordState,
}

phase_context!(CommandRecorder, RecordState);

impl<'a> CommandRecorder<'a> {
    pub fn new(table: &'a mut ResourceTable, render_pass: RenderPassId, extent: Extent2D) -> Self {
        Self {
            table,
            render_pass,
            extent,
            state: RecordState::default(),
        }
    }

    pub fn resources(&mut self) -> &mut ResourceTable {
        &mut *self.table
    }

    /// Render pass that draw commands continue.
    pub fn render_pass(&self) -> RenderPassId {
        self.render_pass
    }

    /// Size of the viewport and scissor.
    pub fn extent(&self) -> Extent2D {
        self.extent
    }
}
