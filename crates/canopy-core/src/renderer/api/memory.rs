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

//! Device memory: properties, requirements, and bindings.

use bitflags::bitflags;

bitflags! {
    /// Properties of a memory type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MemoryProperty: u32 {
        /// Most efficient for device access.
        const DEVICE_LOCAL = 1 << 0;
        /// Can be mapped for host access.
        const HOST_VISIBLE = 1 << 1;
        /// Host writes are visible to the device without explicit flushes.
        const HOST_COHERENT = 1 << 2;
        /// Host reads are cached.
        const HOST_CACHED = 1 << 3;
        /// Backing is only committed on demand.
        const LAZILY_ALLOCATED = 1 << 4;
    }
}

define_handle!(
    /// An opaque handle to a block of device memory.
    MemoryId
);

/// Memory requirements of an unbound buffer or image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryRequirements {
    /// Number of bytes the resource needs.
    pub size: u64,
    /// Required alignment of the binding offset, a power of two.
    pub alignment: u64,
    /// Bit `i` is set if memory type `i` can back the resource.
    pub type_bits: u32,
}

/// One memory type exposed by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryType {
    /// Properties of memory allocated from this type.
    pub properties: MemoryProperty,
    /// Index of the heap this type allocates from.
    pub heap_index: u32,
}

/// The memory types a device exposes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryProperties {
    /// Memory types, indexed by memory type index.
    pub types: Vec<MemoryType>,
}

impl MemoryProperties {
    /// Returns the first memory type allowed by `type_bits` that has every `required` property.
    pub fn find_type(&self, type_bits: u32, required: MemoryProperty) -> Option<u32> {
        self.types
            .iter()
            .enumerate()
            .take(32)
            .find(|(index, ty)| type_bits & (1 << index) != 0 && ty.properties.contains(required))
            .map(|(index, _)| index as u32)
    }
}

/// Where a resource's backing store lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryBinding {
    /// The memory block.
    pub memory: MemoryId,
    /// Byte offset of the resource inside the block.
    pub offset: u64,
    /// Number of bytes bound.
    pub size: u64,
}

/// Rounds `value` up to the next multiple of `alignment` (a power of two, or zero).
#[inline]
pub fn align_up(value: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        value
    } else {
        (value + alignment - 1) & !(alignment - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn properties() -> MemoryProperties {
        MemoryProperties {
            types: vec![
                MemoryType {
                    properties: MemoryProperty::DEVICE_LOCAL,
                    heap_index: 0,
                },
                MemoryType {
                    properties: MemoryProperty::HOST_VISIBLE | MemoryProperty::HOST_COHERENT,
                    heap_index: 1,
                },
            ],
        }
    }

    #[test]
    fn test_find_type_respects_type_bits() {
        let props = properties();
        assert_eq!(props.find_type(0b11, MemoryProperty::HOST_VISIBLE), Some(1));
        assert_eq!(props.find_type(0b01, MemoryProperty::HOST_VISIBLE), None);
        assert_eq!(props.find_type(0b11, MemoryProperty::DEVICE_LOCAL), Some(0));
    }

    #[test]
    fn test_find_type_empty_requirement_matches_first_allowed() {
        assert_eq!(properties().find_type(0b10, MemoryProperty::empty()), Some(1));
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 256), 0);
        assert_eq!(align_up(1, 256), 256);
        assert_eq!(align_up(256, 256), 256);
        assert_eq!(align_up(13, 0), 13);
    }
}
