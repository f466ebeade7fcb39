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

use crate::context::PipelineCreator;
use crate::error::SceneError;
use crate::node::{typed_node, Node, NodeKind};
use canopy_core::renderer::api::{CullMode, FrontFace, PolygonMode};

/// Overrides parts of the rasterization state of the following pipelines.
///
/// Unset fields leave the current state alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rasterization {
    pub cull_mode: Option<CullMode>,
    pub front_face: Option<FrontFace>,
    pub polygon_mode: Option<PolygonMode>,
    pub depth_test: Option<bool>,
    pub depth_write: Option<bool>,
}

impl Rasterization {
    pub fn cull_mode(mode: CullMode) -> Self {
        Self {
            cull_mode: Some(mode),
            ..Default::default()
        }
    }

    pub fn polygon_mode(mode: PolygonMode) -> Self {
        Self {
            polygon_mode: Some(mode),
            ..Default::default()
        }
    }
}

impl Node for Rasterization {
    fn kind(&self) -> NodeKind {
        NodeKind::Rasterization
    }

    fn pipeline(&mut self, creator: &mut PipelineCreator<'_>) -> Result<(), SceneError> {
        let state = &mut creator.state.rasterization;
        if let Some(cull_mode) = self.cull_mode {
            state.cull_mode = cull_mode;
        }
        if let Some(front_face) = self.front_face {
            state.front_face = front_face;
        }
        if let Some(polygon_mode) = self.polygon_mode {
            state.polygon_mode = polygon_mode;
        }
        if let Some(depth_test) = self.depth_test {
            state.depth_test = depth_test;
        }
        if let Some(depth_write) = self.depth_write {
            state.depth_write = depth_write;
        }
        Ok(())
    }
}

typed_node!(Rasterization, Rasterization);
