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

//! Sampled and storage images.

use crate::context::{Allocator, PipelineCreator, Stager};
use crate::error::SceneError;
use crate::node::{typed_node, Node, NodeKind};
use crate::resources::DeviceObject;
use crate::state::ImageRef;
use canopy_core::image::ImageData;
use canopy_core::math::Extent3D;
use canopy_core::renderer::api::*;
use std::borrow::Cow;
use std::path::PathBuf;

/// Where the contents of an [`Image`] come from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// A file decoded by the image loader registered for its extension.
    File(PathBuf),
    /// Pixels already in memory.
    Data(ImageData),
    /// An uninitialized image matching the surface size, recreated on resize.
    /// Typically the target of a compute shader.
    SurfaceSized { format: ImageFormat, usage: ImageUsage },
}

/// A device-local image and its view.
///
/// File and data images are uploaded through a staging buffer during Stage
/// and end up in `ShaderReadOnly` layout. Surface-sized images are moved to
/// `General` layout. BuildPipeline publishes the view as the current image.
#[derive(Debug)]
pub struct Image {
    source: ImageSource,
    // Decoded contents of a file source.
    loaded: Option<ImageData>,
    image: Option<ImageId>,
    view: Option<ImageViewId>,
    staging: Option<BufferId>,
    format: ImageFormat,
    extent: Extent3D,
    layout: ImageLayout,
}

impl Image {
    pub fn new(source: ImageSource) -> Self {
        let (format, extent) = match &source {
            ImageSource::Data(data) => (data.format, data.extent),
            ImageSource::File(_) => (ImageFormat::Rgba8Unorm, Extent3D::default()),
            ImageSource::SurfaceSized { format, .. } => (*format, Extent3D::default()),
        };
        Self {
            source,
            loaded: None,
            image: None,
            view: None,
            staging: None,
            format,
            extent,
            layout: ImageLayout::Undefined,
        }
    }

    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self::new(ImageSource::File(path.into()))
    }

    pub fn from_data(data: ImageData) -> Self {
        Self::new(ImageSource::Data(data))
    }

    pub fn surface_sized(format: ImageFormat, usage: ImageUsage) -> Self {
        Self::new(ImageSource::SurfaceSized { format, usage })
    }

    pub fn image(&self) -> Option<ImageId> {
        self.image
    }

    pub fn extent(&self) -> Extent3D {
        self.extent
    }

    pub fn layout(&self) -> ImageLayout {
        self.layout
    }

    fn contents(&self) -> Option<&ImageData> {
        match &self.source {
            ImageSource::Data(data) => Some(data),
            ImageSource::File(_) => self.loaded.as_ref(),
            ImageSource::SurfaceSized { .. } => None,
        }
    }

    fn release(&mut self, allocator: &mut Allocator<'_>) -> Result<(), SceneError> {
        let resources = allocator.resources();
        if let Some(view) = self.view.take() {
            resources.destroy(DeviceObject::ImageView(view))?;
        }
        if let Some(image) = self.image.take() {
            resources.destroy_image(image)?;
        }
        if let Some(staging) = self.staging.take() {
            resources.destroy_buffer(staging)?;
        }
        self.layout = ImageLayout::Undefined;
        Ok(())
    }

    fn create(&mut self, allocator: &mut Allocator<'_>) -> Result<(), SceneError> {
        let usage = match &self.source {
            ImageSource::SurfaceSized { usage, .. } => *usage,
            _ => ImageUsage::TRANSFER_DST | ImageUsage::SAMPLED,
        };
        let image = allocator.create_image(
            &ImageDescriptor {
                label: Some(Cow::Borrowed("scene image")),
                dimension: ImageDimension::D2,
                format: self.format,
                extent: self.extent,
                mip_levels: 1,
                array_layers: 1,
                usage,
            },
            MemoryProperty::DEVICE_LOCAL,
        )?;
        self.image = Some(image);

        if let Some(size) = self.contents().map(ImageData::size) {
            let staging = allocator.create_buffer(
                &BufferDescriptor {
                    label: Some(Cow::Borrowed("image staging")),
                    size,
                    usage: BufferUsage::COPY_SRC,
                },
                MemoryProperty::HOST_VISIBLE | MemoryProperty::HOST_COHERENT,
            )?;
            self.staging = Some(staging);
        }
        Ok(())
    }
}

impl Node for Image {
    fn kind(&self) -> NodeKind {
        NodeKind::Image
    }

    fn alloc(&mut self, allocator: &mut Allocator<'_>) -> Result<(), SceneError> {
        match &self.source {
            ImageSource::File(path) if self.loaded.is_none() => {
                let data = allocator.image_loaders().load(path)?;
                log::debug!(
                    "Loaded {} ({}x{})",
                    path.display(),
                    data.extent.width,
                    data.extent.height
                );
                self.format = data.format;
                self.extent = data.extent;
                self.loaded = Some(data);
            }
            _ => {}
        }

        let extent = match self.source {
            ImageSource::SurfaceSized { .. } => allocator.extent().to_3d(),
            _ => self.extent,
        };
        let bound = self
            .image
            .is_some_and(|image| allocator.resources().is_image_bound(image));
        if !bound || extent != self.extent {
            self.release(allocator)?;
            self.extent = extent;
            self.create(allocator)?;
        }
        Ok(())
    }

    fn resize(&mut self, allocator: &mut Allocator<'_>) -> Result<(), SceneError> {
        if !matches!(self.source, ImageSource::SurfaceSized { .. }) {
            return Ok(());
        }
        let extent = allocator.extent().to_3d();
        if extent == self.extent && self.image.is_some() {
            return Ok(());
        }
        self.release(allocator)?;
        self.extent = extent;
        self.create(allocator)
    }

    fn stage(&mut self, stager: &mut Stager<'_>) -> Result<(), SceneError> {
        let image = self
            .image
            .ok_or_else(|| SceneError::protocol("Image", "staged before it was allocated"))?;

        if self.view.is_none() {
            let view = stager.resources().create_image_view(&ImageViewDescriptor {
                label: Some(Cow::Borrowed("scene image view")),
                image,
                dimension: ImageDimension::D2,
                format: self.format,
                base_mip_level: 0,
                mip_level_count: 1,
                base_array_layer: 0,
                array_layer_count: 1,
            })?;
            self.view = Some(view);
        }

        match (self.staging, self.contents().map(|data| data.pixels.clone())) {
            (Some(staging), Some(pixels)) => {
                stager.write_buffer(staging, 0, &pixels)?;
                stager.transition_image(image, self.layout, ImageLayout::TransferDst)?;
                stager.copy_buffer_to_image(staging, image, self.extent)?;
                stager.transition_image(image, ImageLayout::TransferDst, ImageLayout::ShaderReadOnly)?;
                self.layout = ImageLayout::ShaderReadOnly;
            }
            _ => {
                if self.layout != ImageLayout::General {
                    stager.transition_image(image, self.layout, ImageLayout::General)?;
                    self.layout = ImageLayout::General;
                }
            }
        }
        Ok(())
    }

    fn pipeline(&mut self, creator: &mut PipelineCreator<'_>) -> Result<(), SceneError> {
        let view = self
            .view
            .ok_or_else(|| SceneError::protocol("Image", "used before it was staged"))?;
        creator.state.image = Some(ImageRef {
            view,
            layout: self.layout,
        });
        Ok(())
    }
}

typed_node!(Image, Image);

