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
use std::path::Path;

/// A shader module and the stage it runs in.
///
/// The module is created on the first Allocate and kept for the lifetime of
/// the scene; BuildPipeline appends the stage to the pipeline state.
#[derive(Debug)]
pub struct Shader {
    source: ShaderSource<'static>,
    stage: ShaderStage,
    entry_point: Cow<'static, str>,
    module: Option<ShaderModuleId>,
}

impl Shader {
    pub fn new(source: ShaderSource<'static>, stage: ShaderStage) -> Self {
        Self {
            source,
            stage,
            entry_point: Cow::Borrowed("main"),
            module: None,
        }
    }

    pub fn spirv(words: Vec<u32>, stage: ShaderStage) -> Self {
        Self::new(ShaderSource::SpirV(Cow::Owned(words)), stage)
    }

    pub fn wgsl(source: impl Into<String>, stage: ShaderStage) -> Self {
        Self::new(ShaderSource::Wgsl(Cow::Owned(source.into())), stage)
    }

    /// Reads a shader from disk: `.wgsl` files as text, anything else as SPIR-V.
    pub fn load(path: impl AsRef<Path>, stage: ShaderStage) -> Result<Self, SceneError> {
        let path = path.as_ref();
        let read_error = |source| SceneError::ShaderIo {
            path: path.to_path_buf(),
            source,
        };
        let is_wgsl = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("wgsl"));
        if is_wgsl {
            let text = std::fs::read_to_string(path).map_err(read_error)?;
            Ok(Self::wgsl(text, stage))
        } else {
            let bytes = std::fs::read(path).map_err(read_error)?;
            if bytes.len() % 4 != 0 {
                return Err(read_error(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "SPIR-V length is not a multiple of 4",
                )));
            }
            let words = bytes
                .chunks_exact(4)
                .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                .collect();
            Ok(Self::spirv(words, stage))
        }
    }

    pub fn with_entry_point(mut self, entry_point: impl Into<Cow<'static, str>>) -> Self {
        self.entry_point = entry_point.into();
        self
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn module(&self) -> Option<ShaderModuleId> {
        self.module
    }
}

impl Node for Shader {
    fn kind(&self) -> NodeKind {
        NodeKind::Shader
    }

    fn alloc(&mut self, allocator: &mut Allocator<'_>) -> Result<(), SceneError> {
        if self.module.is_none() {
            let module = allocator
                .resources()
                .create_shader_module(&ShaderModuleDescriptor {
                    label: Some(Cow::Owned(format!("{:?} shader", self.stage))),
                    source: self.source.clone(),
                })?;
            self.module = Some(module);
        }
        Ok(())
    }

    fn pipeline(&mut self, creator: &mut PipelineCreator<'_>) -> Result<(), SceneError> {
        let module = self
            .module
            .ok_or_else(|| SceneError::protocol("Shader", "used before it was allocated"))?;
        creator.state.shader_stages.push(ShaderStageInfo {
            stage: self.stage,
            module,
            entry_point: self.entry_point.clone(),
        });
        Ok(())
    }
}

typed_node!(Shader, Shader);
