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

//! Image decoding through the `image` crate.

use canopy_core::image::{ImageData, ImageLoadError, ImageLoader};
use canopy_core::renderer::api::ImageFormat;
use std::path::Path;

/// Decodes PNG and JPEG files into sRGB RGBA8 pixels.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterImageLoader;

impl RasterImageLoader {
    /// Decodes an in-memory encoded image.
    pub fn decode(bytes: &[u8], path: &Path) -> Result<ImageData, ImageLoadError> {
        let decoded = ::image::load_from_memory(bytes).map_err(|e| ImageLoadError::Decode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        ImageData::new_2d(width, height, ImageFormat::Rgba8Srgb, rgba.into_raw())
    }
}

impl ImageLoader for RasterImageLoader {
    fn extensions(&self) -> &[&str] {
        &["png", "jpg", "jpeg"]
    }

    fn load(&self, path: &Path) -> Result<ImageData, ImageLoadError> {
        let bytes = std::fs::read(path).map_err(|source| ImageLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let data = Self::decode(&bytes, path)?;
        log::debug!(
            "Decoded '{}' ({}x{})",
            path.display(),
            data.extent.width,
            data.extent.height
        );
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::image::{ImageFormat as FileFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    #[test]
    fn test_decodes_png_to_rgba8() {
        let mut source = RgbaImage::new(2, 1);
        source.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        source.put_pixel(1, 0, Rgba([0, 0, 255, 128]));
        let mut encoded = Cursor::new(Vec::new());
        source.write_to(&mut encoded, FileFormat::Png).unwrap();

        let data = RasterImageLoader::decode(encoded.get_ref(), Path::new("pixel.png")).unwrap();

        assert_eq!(data.extent.width, 2);
        assert_eq!(data.extent.height, 1);
        assert_eq!(data.format, ImageFormat::Rgba8Srgb);
        assert_eq!(&*data.pixels, &[255, 0, 0, 255, 0, 0, 255, 128]);
    }

    #[test]
    fn test_garbage_is_a_decode_error() {
        let err = RasterImageLoader::decode(b"not an image", Path::new("bad.png")).unwrap_err();
        assert!(matches!(err, ImageLoadError::Decode { .. }));
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let err = RasterImageLoader
            .load(Path::new("/nonexistent/canopy/texture.png"))
            .unwrap_err();
        assert!(matches!(err, ImageLoadError::Io { .. }));
    }
}
