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

//! A device that executes nothing on a GPU.
//!
//! The headless backend keeps every object in host memory, records commands
//! as data and "executes" submissions synchronously: buffer copies move bytes,
//! fences signal immediately. It validates handles the way a validation layer
//! would, and exposes probes and failure injection so that tests can observe
//! exactly what the scene engine asked of the device.

mod device;
mod surface;

pub use device::{HeadlessCounts, HeadlessDevice};
pub use crate::graphics::recording::RecordedCommand;
pub use surface::{HeadlessSurface, SurfaceProbe};
