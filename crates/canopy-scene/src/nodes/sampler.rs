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

use crate::context::{Allocator, PipelineCreator};
use crate::error::SceneError;
use crate::node::{typed_node, Node, NodeKind};
use canopy_core::renderer::api::*;
use std::borrow::Cow;

/// A texture sampler, published as the current sampler during BuildPipeline.
#[derive(Debug)]
pub struct Sampler {
    filter: FilterMode,
    address_mode: AddressMode,
    sampler: Option<SamplerId>,
}

impl Sampler {
    pub fn new(filter: FilterMode, address_mode: AddressMode) -> Self {
        Self {
            filter,
            address_mode,
            sampler: None,
        }
    }

    pub fn sampler(&self) -> Option<SamplerId> {
        self.sampler
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new(FilterMode::Linear, AddressMode::Repeat)
    }
}

impl Node for Sampler {
    fn kind(&self) -> NodeKind {
        NodeKind::Sampler
    }

    fn alloc(&mut self, allocator: &mut Allocator<'_>) -> Result<(), SceneError> {
        if self.sampler.is_none() {
            let sampler = allocator.resources().create_sampler(&SamplerDescriptor {
                label: Some(Cow::Borrowed("scene sampler")),
                mag_filter: self.filter,
                min_filter: self.filter,
                mipmap_filter: self.filter,
                address_mode_u: self.address_mode,
                address_mode_v: self.address_mode,
                address_mode_w: self.address_mode,
            })?;
            self.sampler = Some(sampler);
        }
        Ok(())
    }

    fn pipeline(&mut self, creator: &mut PipelineCreator<'_>) -> Result<(), SceneError> {
        let sampler = self
            .sampler
            .ok_or_else(|| SceneError::protocol("Sampler", "used before it was allocated"))?;
        creator.state.sampler = Some(sampler);
        Ok(())
    }
}

typed_node!(Sampler, Sampler);
