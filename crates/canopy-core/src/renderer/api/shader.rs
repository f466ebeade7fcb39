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

//! Shader modules and the stages they run in.

use bitflags::bitflags;
use std::borrow::Cow;

bitflags! {
    /// Pipeline stages a shader or a descriptor binding is visible to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShaderStage: u32 {
        /// The vertex stage.
        const VERTEX = 1 << 0;
        /// The fragment stage.
        const FRAGMENT = 1 << 1;
        /// The compute stage.
        const COMPUTE = 1 << 2;
        /// Every graphics stage.
        const ALL_GRAPHICS = Self::VERTEX.bits() | Self::FRAGMENT.bits();
    }
}

/// Shader code handed to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShaderSource<'a> {
    /// SPIR-V words.
    SpirV(Cow<'a, [u32]>),
    /// WGSL text.
    Wgsl(Cow<'a, str>),
}

/// A descriptor used to create a [`ShaderModuleId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderModuleDescriptor<'a> {
    /// An optional debug label for the module.
    pub label: Option<Cow<'a, str>>,
    /// The shader code.
    pub source: ShaderSource<'a>,
}

define_handle!(
    /// An opaque handle to a compiled shader module.
    ShaderModuleId
);
