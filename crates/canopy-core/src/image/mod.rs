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

//! Decoded image data and the factory that picks a decoder for a file.
//!
//! Decoding itself is an external concern: backends register [`ImageLoader`]
//! implementations with an [`ImageLoaderFactory`], and the factory object is
//! handed to the orchestrator at construction. There is no global registry.

use crate::math::Extent3D;
use crate::renderer::api::ImageFormat;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Pixels and format metadata for one image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    /// Size of the base level.
    pub extent: Extent3D,
    /// Texel format of `pixels`.
    pub format: ImageFormat,
    /// Tightly packed texels of the base level.
    pub pixels: Arc<[u8]>,
}

impl ImageData {
    /// Wraps tightly packed 2D pixels.
    ///
    /// ## Errors
    /// * `ImageLoadError::SizeMismatch` - If `pixels` does not hold exactly `width * height` texels.
    pub fn new_2d(
        width: u32,
        height: u32,
        format: ImageFormat,
        pixels: Vec<u8>,
    ) -> Result<Self, ImageLoadError> {
        let extent = Extent3D::new(width, height, 1);
        let expected = extent.texel_count() * format.texel_size() as u64;
        if pixels.len() as u64 != expected {
            return Err(ImageLoadError::SizeMismatch {
                expected,
                actual: pixels.len() as u64,
            });
        }
        Ok(Self {
            extent,
            format,
            pixels: pixels.into(),
        })
    }

    /// Number of bytes of pixel data.
    pub fn size(&self) -> u64 {
        self.pixels.len() as u64
    }
}

/// Errors raised while turning a file into [`ImageData`].
#[derive(Debug, Error)]
pub enum ImageLoadError {
    /// No registered loader accepts the file extension.
    #[error("no image loader registered for '{0}'")]
    Unsupported(PathBuf),
    /// The file could not be read.
    #[error("failed to read '{path}': {source}")]
    Io {
        /// The file.
        path: PathBuf,
        /// The I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The file could not be decoded.
    #[error("failed to decode '{path}': {message}")]
    Decode {
        /// The file.
        path: PathBuf,
        /// Decoder message.
        message: String,
    },
    /// Pixel data does not match the declared size.
    #[error("expected {expected} bytes of pixel data, got {actual}")]
    SizeMismatch {
        /// Bytes implied by extent and format.
        expected: u64,
        /// Bytes supplied.
        actual: u64,
    },
}

/// Decodes image files of some formats.
pub trait ImageLoader: Send + Sync + Debug {
    /// Lower-case file extensions this loader accepts, without the dot.
    fn extensions(&self) -> &[&str];

    /// Decodes the file at `path`.
    fn load(&self, path: &Path) -> Result<ImageData, ImageLoadError>;
}

/// Chooses an [`ImageLoader`] by file extension.
///
/// Loaders registered later take precedence over earlier ones for the same
/// extension.
#[derive(Debug, Clone, Default)]
pub struct ImageLoaderFactory {
    loaders: Vec<Arc<dyn ImageLoader>>,
}

impl ImageLoaderFactory {
    /// Creates a factory with no loaders.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a loader.
    pub fn register(&mut self, loader: Arc<dyn ImageLoader>) -> &mut Self {
        log::debug!(
            "ImageLoaderFactory: registered loader for {:?}",
            loader.extensions()
        );
        self.loaders.push(loader);
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, loader: Arc<dyn ImageLoader>) -> Self {
        self.register(loader);
        self
    }

    /// Returns the loader responsible for `path`, if any.
    pub fn loader_for(&self, path: &Path) -> Option<&dyn ImageLoader> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        self.loaders
            .iter()
            .rev()
            .find(|loader| loader.extensions().iter().any(|ext| *ext == extension))
            .map(|loader| loader.as_ref())
    }

    /// Decodes `path` with the matching loader.
    pub fn load(&self, path: &Path) -> Result<ImageData, ImageLoadError> {
        let loader = self
            .loader_for(path)
            .ok_or_else(|| ImageLoadError::Unsupported(path.to_path_buf()))?;
        loader.load(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FixedLoader {
        extensions: Vec<&'static str>,
        value: u8,
    }

    impl ImageLoader for FixedLoader {
        fn extensions(&self) -> &[&str] {
            &self.extensions
        }

        fn load(&self, _path: &Path) -> Result<ImageData, ImageLoadError> {
            ImageData::new_2d(1, 1, ImageFormat::Rgba8Unorm, vec![self.value; 4])
        }
    }

    #[test]
    fn test_unsupported_extension() {
        let factory = ImageLoaderFactory::new();
        let err = factory.load(Path::new("texture.png")).unwrap_err();
        assert!(matches!(err, ImageLoadError::Unsupported(_)));
    }

    #[test]
    fn test_later_registration_wins_and_extension_is_case_insensitive() {
        let factory = ImageLoaderFactory::new()
            .with(Arc::new(FixedLoader {
                extensions: vec!["png"],
                value: 1,
            }))
            .with(Arc::new(FixedLoader {
                extensions: vec!["png", "jpg"],
                value: 2,
            }));
        let image = factory.load(Path::new("a/b/TEXTURE.PNG")).unwrap();
        assert_eq!(image.pixels[0], 2);
    }

    #[test]
    fn test_size_mismatch() {
        let err = ImageData::new_2d(2, 2, ImageFormat::Rgba8Unorm, vec![0; 4]).unwrap_err();
        assert!(matches!(
            err,
            ImageLoadError::SizeMismatch {
                expected: 16,
                actual: 4
            }
        ));
    }
}
