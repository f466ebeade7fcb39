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

//! Descriptor sets: the resources a draw or dispatch binds for its shaders.
//!
//! A descriptor set layout lists the bindings, a descriptor pool provides
//! storage for sets, and write entries point the bindings of one set at
//! concrete buffers, images and samplers.

use crate::renderer::api::{BufferId, ImageLayout, ImageViewId, SamplerId, ShaderStage};
use std::borrow::Cow;

/// The kind of resource a descriptor binding refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    /// A uniform buffer.
    UniformBuffer,
    /// A storage buffer.
    StorageBuffer,
    /// An image view and a sampler bound together.
    CombinedImageSampler,
    /// An image view sampled with a separate sampler.
    SampledImage,
    /// A read/write storage image.
    StorageImage,
    /// A standalone sampler.
    Sampler,
}

/// One binding of a descriptor set layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorSetLayoutBinding {
    /// Binding number in the shader.
    pub binding: u32,
    /// Resource kind.
    pub ty: DescriptorType,
    /// Number of array elements.
    pub count: u32,
    /// Stages that can access the binding.
    pub stages: ShaderStage,
}

/// Number of descriptors of one type a pool must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorPoolSize {
    /// Resource kind.
    pub ty: DescriptorType,
    /// Number of descriptors.
    pub count: u32,
}

/// The resource a write entry points a binding at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorResource {
    /// A range of a buffer.
    Buffer {
        /// The buffer.
        buffer: BufferId,
        /// Start of the range.
        offset: u64,
        /// Length of the range.
        range: u64,
    },
    /// An image view in the given layout.
    Image {
        /// The view.
        view: ImageViewId,
        /// Layout the image is in when the descriptor is used.
        layout: ImageLayout,
    },
    /// An image view and a sampler.
    CombinedImageSampler {
        /// The view.
        view: ImageViewId,
        /// The sampler.
        sampler: SamplerId,
        /// Layout the image is in when the descriptor is used.
        layout: ImageLayout,
    },
    /// A sampler.
    Sampler(SamplerId),
}

/// Points one binding of a descriptor set at a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WriteDescriptor {
    /// Binding number being written.
    pub binding: u32,
    /// Array element being written.
    pub array_element: u32,
    /// Resource kind; must match the layout binding.
    pub ty: DescriptorType,
    /// The resource.
    pub resource: DescriptorResource,
}

/// A descriptor used to create a [`DescriptorSetLayoutId`].
#[derive(Debug, Clone)]
pub struct DescriptorSetLayoutDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The bindings.
    pub bindings: &'a [DescriptorSetLayoutBinding],
}

/// A descriptor used to create a [`DescriptorPoolId`].
#[derive(Debug, Clone)]
pub struct DescriptorPoolDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// Maximum number of sets allocated from the pool.
    pub max_sets: u32,
    /// Descriptor counts per type.
    pub pool_sizes: &'a [DescriptorPoolSize],
}

define_handle!(
    /// An opaque handle to a descriptor set layout.
    DescriptorSetLayoutId
);
define_handle!(
    /// An opaque handle to a descriptor pool. Destroying it frees its sets.
    DescriptorPoolId
);
define_handle!(
    /// An opaque handle to a descriptor set.
    DescriptorSetId
);
