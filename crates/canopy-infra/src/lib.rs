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

//! # Canopy Infra
//!
//! Concrete implementations of the contracts in `canopy-core`.
//!
//! - [`graphics::headless`]: a host-memory [`GraphicsDevice`] and
//!   [`Surface`] that record what they are asked to do. Always available; the
//!   test suites of the other crates run against it.
//! - `graphics::wgpu` (feature `wgpu`): a device and a window surface built on
//!   `wgpu`.
//! - [`image`]: an [`ImageLoader`] decoding common file formats with the
//!   `image` crate.
//! - `platform` (feature `platform`): translation of `winit` window events into
//!   scene input events.
//!
//! [`GraphicsDevice`]: canopy_core::GraphicsDevice
//! [`Surface`]: canopy_core::renderer::Surface
//! [`ImageLoader`]: canopy_core::image::ImageLoader

pub mod graphics;
pub mod image;
#[cfg(feature = "platform")]
pub mod platform;

pub use self::image::RasterImageLoader;
