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

//! Provides the public, backend-agnostic rendering contracts for Canopy.
//!
//! This module defines the "common language" between the scene engine and a
//! graphics backend. It contains the abstract `traits` (like [`GraphicsDevice`]),
//! data structures (like [`BufferDescriptor`]), and the device error type.
//!
//! The model is explicit: resources are created without memory and bound later,
//! command buffers are recorded ahead of time and replayed, and the host
//! synchronizes with fences. The 'how' is supplied by a backend in
//! `canopy-infra` implementing these traits.

pub mod api;
pub mod error;
pub mod settings;
pub mod traits;

// Re-export the most important traits and types for easier use.
pub use self::api::*;
pub use self::error::{DeviceError, ErrorCategory, ResultCode};
pub use self::settings::{AllocationStrategy, RenderSettings};
pub use self::traits::{CommandEncoder, GraphicsDevice, Surface, SwapchainImage};
