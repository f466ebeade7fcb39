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

//! Leaf nodes of the scene graph.
//!
//! - **Data and buffers**: [`BufferData`], [`HostBuffer`], [`DeviceBuffer`], [`TransformBuffer`].
//! - **Pipeline inputs**: [`Shader`], [`DescriptorBinding`], [`VertexBinding`],
//!   [`VertexAttribute`], [`IndexBufferDescription`], [`Rasterization`].
//! - **Images**: [`Image`], [`Sampler`].
//! - **Commands**: [`DrawCommand`], [`DispatchCommand`].
//! - **Placement**: [`Transform`], [`Camera`].

mod buffer;
mod camera;
mod command;
mod descriptor;
mod image;
mod raster;
mod sampler;
mod shader;
mod transform;
mod uniform;
mod vertex;

pub use buffer::{BufferData, DeviceBuffer, HostBuffer};
pub use camera::Camera;
pub use command::{DispatchCommand, DrawCommand};
pub use descriptor::DescriptorBinding;
pub use image::{Image, ImageSource};
pub use raster::Rasterization;
pub use sampler::Sampler;
pub use shader::Shader;
pub use transform::Transform;
pub use uniform::{TransformBuffer, TransformUniforms};
pub use vertex::{IndexBufferDescription, VertexAttribute, VertexBinding};
