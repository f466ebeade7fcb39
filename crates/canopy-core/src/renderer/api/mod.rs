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

//! Backend-agnostic rendering API: handles and the descriptors used to create them.
//!
//! - **[`buffer`]** / **[`image`]** / **[`memory`]**: resources created unbound, their
//!   memory requirements, and the memory they are later bound to.
//! - **[`shader`]** / **[`descriptor`]** / **[`pipeline`]**: what a draw or dispatch binds.
//! - **[`command`]** / **[`sync`]**: recorded work and the primitives that order it.

/// Declares an opaque, copyable handle returned by a [`GraphicsDevice`](crate::renderer::GraphicsDevice).
macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);
    };
}

pub mod buffer;
pub mod command;
pub mod descriptor;
pub mod image;
pub mod memory;
pub mod pipeline;
pub mod shader;
pub mod sync;

pub use self::buffer::*;
pub use self::command::*;
pub use self::descriptor::*;
pub use self::image::*;
pub use self::memory::*;
pub use self::pipeline::*;
pub use self::shader::*;
pub use self::sync::*;
