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

//! The BuildPipeline phase context.

use crate::context::phase_context;
use crate::resources::ResourceTable;
use crate::state::PipelineState;
use canopy_core::renderer::api::{PipelineCacheId, RenderPassId};

/// Gives nodes what they need to build descriptor sets and pipelines.
#[derive(Debug)]
pub struct PipelineCreator<'a> {
    table: &'a mut ResourceTable,
    render_pass: RenderPassId,
    cache: Option<PipelineCacheId>,
    /// The current state of the traversal.
    pub state: PipelineState,
}

phase_context!(PipelineCreator, PipelineState);

impl<'a> PipelineCreator<'a> {
    pub fn new(
        table: &'a mut ResourceTable,
        render_pass: RenderPassId,
        cache: Option<PipelineCacheId>,
    ) -> Self {
        Self {
            table,
            render_pass,
            cache,
            state: PipelineState::default(),
        }
    }

    pub fn resources(&mut self) -> &mut ResourceTable {
        &mut *self.table
    }

    /// The render pass graphics pipelines are built against.
    pub fn render_pass(&self) -> RenderPassId {
        self.render_pass
    }

    pub fn pipeline_cache(&self) -> Option<PipelineCacheId> {
        self.cache
    }
}
