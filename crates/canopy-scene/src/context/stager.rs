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

//! The Stage phase context.

use crate::context::phase_context;
use crate::error::SceneError;
use crate::resources::ResourceTable;
use crate::state::StageState;
use canopy_core::renderer::api::*;
use canopy_core::math::Extent3D;
use canopy_core::renderer::CommandEncoder;

/// Uploads host data and records transfer commands.
///
/// Transfers are recorded into one command buffer, which the orchestrator
/// submits and waits on once the traversal is over. Every resource a transfer
/// touches must already be bound.
#[derive(Debug)]
pub struct Stager<'a> {
    table: &'a mut ResourceTable,
    encoder: Box<dyn CommandEncoder>,
    /// The current state of the traversal.
    pub state: StageState,
}

phase_context!(Stager, StageState);

impl<'a> Stager<'a> {
    pub fn new(table: &'a mut ResourceTable, encoder: Box<dyn CommandEncoder>) -> Self {
        Self {
            table,
            encoder,
            state: StageState::default(),
        }
    }

    pub fn resources(&mut self) -> &mut ResourceTable {
        &mut *self.table
    }

    /// Writes host data into a host-visible buffer.
    pub fn write_buffer(&self, buffer: BufferId, offset: u64, data: &[u8]) -> Result<(), SceneError> {
        self.table.write_buffer(buffer, offset, data)
    }

    /// Records a whole-range copy between two buffers.
    pub fn copy_buffer(&mut self, src: BufferId, dst: BufferId, size: u64) -> Result<(), SceneError> {
        self.table.require_bound_buffer(src)?;
        self.table.require_bound_buffer(dst)?;
        self.encoder.copy_buffer(
            src,
            dst,
            &[BufferCopy {
                src_offset: 0,
                dst_offset: 0,
                size,
            }],
        );
        Ok(())
    }

    /// Records a layout transition of a bound image.
    pub fn transition_image(
        &mut self,
        image: ImageId,
        old: ImageLayout,
        new: ImageLayout,
    ) -> Result<(), SceneError> {
        self.table.require_bound_image(image)?;
        self.encoder.transition_image_layout(image, old, new);
        Ok(())
    }

    /// Records a copy of a staging buffer into mip level 0 of an image in
    /// `TransferDst` layout.
    pub fn copy_buffer_to_image(
        &mut self,
        src: BufferId,
        dst: ImageId,
        extent: Extent3D,
    ) -> Result<(), SceneError> {
        self.table.require_bound_buffer(src)?;
        self.table.require_bound_image(dst)?;
        self.encoder.copy_buffer_to_image(
            src,
            dst,
            ImageLayout::TransferDst,
            &[BufferImageCopy {
                buffer_offset: 0,
                mip_level: 0,
                array_layer: 0,
                image_extent: extent,
            }],
        );
        Ok(())
    }

    /// Ends recording and hands the command stream back to the caller.
    pub fn finish(self) -> Result<(), SceneError> {
        self.encoder.finish()?;
        Ok(())
    }
}
