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

use canopy_core::math::Extent3D;
use canopy_core::renderer::api::*;

/// A local extension trait to convert Canopy's API types into `wgpu` types.
/// This avoids Rust's orphan rules while keeping an idiomatic `.into_wgpu()` syntax.
pub trait IntoWgpu<T> {
    /// Consumes self and converts it into a `wgpu`-compatible type.
    fn into_wgpu(self) -> T;
}

// --- Dimensions ---

impl IntoWgpu<wgpu::Extent3d> for Extent3D {
    fn into_wgpu(self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: self.depth,
        }
    }
}

// --- Images ---

impl IntoWgpu<wgpu::TextureFormat> for ImageFormat {
    fn into_wgpu(self) -> wgpu::TextureFormat {
        match self {
            ImageFormat::R8Unorm => wgpu::TextureFormat::R8Unorm,
            ImageFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
            ImageFormat::Rgba8Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            ImageFormat::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
            ImageFormat::Bgra8Srgb => wgpu::TextureFormat::Bgra8UnormSrgb,
            ImageFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
            ImageFormat::Rgba32Float => wgpu::TextureFormat::Rgba32Float,
            ImageFormat::Depth32Float => wgpu::TextureFormat::Depth32Float,
        }
    }
}

impl IntoWgpu<wgpu::TextureDimension> for ImageDimension {
    fn into_wgpu(self) -> wgpu::TextureDimension {
        match self {
            ImageDimension::D1 => wgpu::TextureDimension::D1,
            ImageDimension::D2 => wgpu::TextureDimension::D2,
            ImageDimension::D3 => wgpu::TextureDimension::D3,
        }
    }
}

impl IntoWgpu<wgpu::TextureViewDimension> for ImageDimension {
    fn into_wgpu(self) -> wgpu::TextureViewDimension {
        match self {
            ImageDimension::D1 => wgpu::TextureViewDimension::D1,
            ImageDimension::D2 => wgpu::TextureViewDimension::D2,
            ImageDimension::D3 => wgpu::TextureViewDimension::D3,
        }
    }
}

impl IntoWgpu<wgpu::TextureUsages> for ImageUsage {
    fn into_wgpu(self) -> wgpu::TextureUsages {
        let mut usages = wgpu::TextureUsages::empty();
        if self.contains(ImageUsage::TRANSFER_SRC) {
            usages |= wgpu::TextureUsages::COPY_SRC;
        }
        if self.contains(ImageUsage::TRANSFER_DST) {
            usages |= wgpu::TextureUsages::COPY_DST;
        }
        if self.contains(ImageUsage::SAMPLED) {
            usages |= wgpu::TextureUsages::TEXTURE_BINDING;
        }
        if self.contains(ImageUsage::STORAGE) {
            usages |= wgpu::TextureUsages::STORAGE_BINDING;
        }
        if self.intersects(ImageUsage::COLOR_ATTACHMENT | ImageUsage::DEPTH_STENCIL_ATTACHMENT) {
            usages |= wgpu::TextureUsages::RENDER_ATTACHMENT;
        }
        usages
    }
}

impl IntoWgpu<wgpu::FilterMode> for FilterMode {
    fn into_wgpu(self) -> wgpu::FilterMode {
        match self {
            FilterMode::Nearest => wgpu::FilterMode::Nearest,
            FilterMode::Linear => wgpu::FilterMode::Linear,
        }
    }
}

impl IntoWgpu<wgpu::MipmapFilterMode> for FilterMode {
    fn into_wgpu(self) -> wgpu::MipmapFilterMode {
        match self {
            FilterMode::Nearest => wgpu::MipmapFilterMode::Nearest,
            FilterMode::Linear => wgpu::MipmapFilterMode::Linear,
        }
    }
}

impl IntoWgpu<wgpu::AddressMode> for AddressMode {
    fn into_wgpu(self) -> wgpu::AddressMode {
        match self {
            AddressMode::Repeat => wgpu::AddressMode::Repeat,
            AddressMode::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
            AddressMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        }
    }
}

// --- Buffers ---

impl IntoWgpu<wgpu::BufferUsages> for BufferUsage {
    fn into_wgpu(self) -> wgpu::BufferUsages {
        // Every buffer can be written from the host shadow and read back by copies.
        let mut usages = wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC;
        if self.contains(BufferUsage::UNIFORM) {
            usages |= wgpu::BufferUsages::UNIFORM;
        }
        if self.contains(BufferUsage::STORAGE) {
            usages |= wgpu::BufferUsages::STORAGE;
        }
        if self.contains(BufferUsage::INDEX) {
            usages |= wgpu::BufferUsages::INDEX;
        }
        if self.contains(BufferUsage::VERTEX) {
            usages |= wgpu::BufferUsages::VERTEX;
        }
        if self.contains(BufferUsage::INDIRECT) {
            usages |= wgpu::BufferUsages::INDIRECT;
        }
        usages
    }
}

// --- Shaders and pipelines ---

impl IntoWgpu<wgpu::ShaderStages> for ShaderStage {
    fn into_wgpu(self) -> wgpu::ShaderStages {
        let mut stages = wgpu::ShaderStages::NONE;
        if self.contains(ShaderStage::VERTEX) {
            stages |= wgpu::ShaderStages::VERTEX;
        }
        if self.contains(ShaderStage::FRAGMENT) {
            stages |= wgpu::ShaderStages::FRAGMENT;
        }
        if self.contains(ShaderStage::COMPUTE) {
            stages |= wgpu::ShaderStages::COMPUTE;
        }
        stages
    }
}

impl IntoWgpu<wgpu::PrimitiveTopology> for PrimitiveTopology {
    fn into_wgpu(self) -> wgpu::PrimitiveTopology {
        match self {
            PrimitiveTopology::PointList => wgpu::PrimitiveTopology::PointList,
            PrimitiveTopology::LineList => wgpu::PrimitiveTopology::LineList,
            PrimitiveTopology::LineStrip => wgpu::PrimitiveTopology::LineStrip,
            PrimitiveTopology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
            PrimitiveTopology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        }
    }
}

impl IntoWgpu<Option<wgpu::Face>> for CullMode {
    fn into_wgpu(self) -> Option<wgpu::Face> {
        match self {
            CullMode::None => None,
            CullMode::Front => Some(wgpu::Face::Front),
            CullMode::Back => Some(wgpu::Face::Back),
            // wgpu has no "cull everything"; such draws are skipped at replay.
            CullMode::FrontAndBack => None,
        }
    }
}

impl IntoWgpu<wgpu::FrontFace> for FrontFace {
    fn into_wgpu(self) -> wgpu::FrontFace {
        match self {
            FrontFace::CounterClockwise => wgpu::FrontFace::Ccw,
            FrontFace::Clockwise => wgpu::FrontFace::Cw,
        }
    }
}

impl IntoWgpu<wgpu::PolygonMode> for PolygonMode {
    fn into_wgpu(self) -> wgpu::PolygonMode {
        match self {
            PolygonMode::Fill => wgpu::PolygonMode::Fill,
            PolygonMode::Line => wgpu::PolygonMode::Line,
            PolygonMode::Point => wgpu::PolygonMode::Point,
        }
    }
}

impl IntoWgpu<wgpu::VertexFormat> for VertexFormat {
    fn into_wgpu(self) -> wgpu::VertexFormat {
        match self {
            VertexFormat::Float32 => wgpu::VertexFormat::Float32,
            VertexFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
            VertexFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
            VertexFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
            VertexFormat::Uint32 => wgpu::VertexFormat::Uint32,
            VertexFormat::Unorm8x4 => wgpu::VertexFormat::Unorm8x4,
        }
    }
}

impl IntoWgpu<wgpu::VertexStepMode> for VertexInputRate {
    fn into_wgpu(self) -> wgpu::VertexStepMode {
        match self {
            VertexInputRate::Vertex => wgpu::VertexStepMode::Vertex,
            VertexInputRate::Instance => wgpu::VertexStepMode::Instance,
        }
    }
}

impl IntoWgpu<wgpu::IndexFormat> for IndexFormat {
    fn into_wgpu(self) -> wgpu::IndexFormat {
        match self {
            IndexFormat::Uint16 => wgpu::IndexFormat::Uint16,
            IndexFormat::Uint32 => wgpu::IndexFormat::Uint32,
        }
    }
}

/// Maps a Canopy format back from the surface's preferred format.
pub fn from_wgpu_texture_format(format: wgpu::TextureFormat) -> Option<ImageFormat> {
    Some(match format {
        wgpu::TextureFormat::R8Unorm => ImageFormat::R8Unorm,
        wgpu::TextureFormat::Rgba8Unorm => ImageFormat::Rgba8Unorm,
        wgpu::TextureFormat::Rgba8UnormSrgb => ImageFormat::Rgba8Srgb,
        wgpu::TextureFormat::Bgra8Unorm => ImageFormat::Bgra8Unorm,
        wgpu::TextureFormat::Bgra8UnormSrgb => ImageFormat::Bgra8Srgb,
        wgpu::TextureFormat::Rgba16Float => ImageFormat::Rgba16Float,
        wgpu::TextureFormat::Rgba32Float => ImageFormat::Rgba32Float,
        wgpu::TextureFormat::Depth32Float => ImageFormat::Depth32Float,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srgb_formats_round_trip_through_surface_lookup() {
        for format in [ImageFormat::Rgba8Srgb, ImageFormat::Bgra8Srgb] {
            assert_eq!(from_wgpu_texture_format(format.into_wgpu()), Some(format));
        }
    }

    #[test]
    fn test_attachment_usages_collapse() {
        let usages: wgpu::TextureUsages = ImageUsage::DEPTH_STENCIL_ATTACHMENT.into_wgpu();
        assert_eq!(usages, wgpu::TextureUsages::RENDER_ATTACHMENT);
    }

    #[test]
    fn test_buffers_always_accept_copies() {
        let usages: wgpu::BufferUsages = BufferUsage::VERTEX.into_wgpu();
        assert!(usages.contains(wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::VERTEX));
    }
}
