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

//! Defines data structures for images, image views, and samplers.

use crate::math::Extent3D;
use bitflags::bitflags;
use std::borrow::Cow;

/// Pixel formats understood by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// One 8-bit normalized channel.
    R8Unorm,
    /// Four 8-bit normalized channels.
    Rgba8Unorm,
    /// Four 8-bit normalized channels, sRGB encoded.
    Rgba8Srgb,
    /// Four 8-bit normalized channels in BGRA order.
    Bgra8Unorm,
    /// Four 8-bit normalized channels in BGRA order, sRGB encoded.
    Bgra8Srgb,
    /// Four 16-bit float channels.
    Rgba16Float,
    /// Four 32-bit float channels.
    Rgba32Float,
    /// 32-bit float depth.
    Depth32Float,
}

impl ImageFormat {
    /// Size of one texel in bytes.
    pub fn texel_size(&self) -> u32 {
        match self {
            ImageFormat::R8Unorm => 1,
            ImageFormat::Rgba8Unorm
            | ImageFormat::Rgba8Srgb
            | ImageFormat::Bgra8Unorm
            | ImageFormat::Bgra8Srgb
            | ImageFormat::Depth32Float => 4,
            ImageFormat::Rgba16Float => 8,
            ImageFormat::Rgba32Float => 16,
        }
    }

    /// Returns `true` for depth formats.
    pub fn is_depth(&self) -> bool {
        matches!(self, ImageFormat::Depth32Float)
    }
}

bitflags! {
    /// A set of flags describing the allowed usages of an [`ImageId`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ImageUsage: u32 {
        /// The image can be the source of a copy.
        const TRANSFER_SRC = 1 << 0;
        /// The image can be the destination of a copy.
        const TRANSFER_DST = 1 << 1;
        /// The image can be sampled from a shader.
        const SAMPLED = 1 << 2;
        /// The image can be read and written as a storage image.
        const STORAGE = 1 << 3;
        /// The image can be a color attachment.
        const COLOR_ATTACHMENT = 1 << 4;
        /// The image can be a depth/stencil attachment.
        const DEPTH_STENCIL_ATTACHMENT = 1 << 5;
    }
}

/// Dimensionality of an image or image view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageDimension {
    /// One-dimensional.
    D1,
    /// Two-dimensional.
    #[default]
    D2,
    /// Three-dimensional.
    D3,
}

/// Memory layout of an image, as tracked for layout transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageLayout {
    /// Contents are undefined; valid only as a transition source.
    #[default]
    Undefined,
    /// Usable for any access, typically storage images.
    General,
    /// Destination of transfer operations.
    TransferDst,
    /// Read-only access from shaders.
    ShaderReadOnly,
    /// Color attachment of a render pass.
    ColorAttachment,
    /// Depth/stencil attachment of a render pass.
    DepthStencilAttachment,
    /// Ready to be presented.
    PresentSrc,
}

/// A descriptor used to create an [`ImageId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDescriptor<'a> {
    /// An optional debug label for the image.
    pub label: Option<Cow<'a, str>>,
    /// Dimensionality of the image.
    pub dimension: ImageDimension,
    /// Texel format.
    pub format: ImageFormat,
    /// Size of the base mip level.
    pub extent: Extent3D,
    /// Number of mip levels.
    pub mip_levels: u32,
    /// Number of array layers.
    pub array_layers: u32,
    /// Allowed usages.
    pub usage: ImageUsage,
}

/// A descriptor used to create an [`ImageViewId`] covering a range of an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageViewDescriptor<'a> {
    /// An optional debug label for the view.
    pub label: Option<Cow<'a, str>>,
    /// The viewed image.
    pub image: ImageId,
    /// Dimensionality of the view.
    pub dimension: ImageDimension,
    /// Format the view reinterprets the image as.
    pub format: ImageFormat,
    /// First mip level visible through the view.
    pub base_mip_level: u32,
    /// Number of mip levels visible through the view.
    pub mip_level_count: u32,
    /// First array layer visible through the view.
    pub base_array_layer: u32,
    /// Number of array layers visible through the view.
    pub array_layer_count: u32,
}

/// Texel filtering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    /// Nearest texel.
    Nearest,
    /// Linear interpolation between texels.
    #[default]
    Linear,
}

/// How coordinates outside `[0, 1]` are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    /// Tile the image.
    #[default]
    Repeat,
    /// Tile the image, mirroring every other tile.
    MirroredRepeat,
    /// Clamp to the edge texel.
    ClampToEdge,
}

/// A descriptor used to create a [`SamplerId`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SamplerDescriptor<'a> {
    /// An optional debug label for the sampler.
    pub label: Option<Cow<'a, str>>,
    /// Filter used when magnifying.
    pub mag_filter: FilterMode,
    /// Filter used when minifying.
    pub min_filter: FilterMode,
    /// Filter used between mip levels.
    pub mipmap_filter: FilterMode,
    /// Addressing along `u`.
    pub address_mode_u: AddressMode,
    /// Addressing along `v`.
    pub address_mode_v: AddressMode,
    /// Addressing along `w`.
    pub address_mode_w: AddressMode,
}

define_handle!(
    /// An opaque handle to an image resource.
    ImageId
);
define_handle!(
    /// An opaque handle to a view of an image.
    ImageViewId
);
define_handle!(
    /// An opaque handle to a sampler.
    SamplerId
);
