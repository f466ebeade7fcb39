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

//! # Canopy Core
//!
//! Foundational crate containing the API-neutral contracts the scene engine is
//! written against: handle types, resource descriptors, the [`GraphicsDevice`],
//! [`CommandEncoder`] and [`Surface`] traits, the device error taxonomy, and the
//! render settings.
//!
//! Concrete backends live in `canopy-infra`; the traversal engine in
//! `canopy-scene` only ever talks to the traits defined here.
//!
//! [`GraphicsDevice`]: renderer::GraphicsDevice
//! [`CommandEncoder`]: renderer::CommandEncoder
//! [`Surface`]: renderer::Surface

#![warn(missing_docs)]

pub mod image;
pub mod math;
pub mod renderer;

pub use renderer::{DeviceError, ErrorCategory, GraphicsDevice, RenderSettings};
