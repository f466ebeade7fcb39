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

//! Integration tests for two-phase allocation and the resource table.

use canopy_core::image::ImageLoaderFactory;
use canopy_core::math::Extent2D;
use canopy_core::renderer::api::*;
use canopy_core::renderer::AllocationStrategy;
use canopy_core::DeviceError;
use canopy_infra::graphics::headless::HeadlessDevice;
use canopy_scene::{Allocator, ResourceTable, SceneError};
use std::borrow::Cow;
use std::sync::Arc;

fn descriptor(size: u64, usage: BufferUsage) -> BufferDescriptor<'static> {
    BufferDescriptor {
        label: Some(Cow::Borrowed("test buffer")),
        size,
        usage,
    }
}

fn host_visible() -> MemoryProperty {
    MemoryProperty::HOST_VISIBLE | MemoryProperty::HOST_COHERENT
}

/// Creates three buffers over two memory types and binds them.
fn allocate_three(
    table: &mut ResourceTable,
    strategy: AllocationStrategy,
) -> (Vec<BufferId>, Result<canopy_scene::AllocationReport, SceneError>) {
    let loaders = ImageLoaderFactory::new();
    let mut allocator = Allocator::begin(table, &loaders, strategy, Extent2D::new(8, 8));
    let ids = vec![
        allocator
            .create_buffer(&descriptor(100, BufferUsage::VERTEX), MemoryProperty::DEVICE_LOCAL)
            .unwrap(),
        allocator
            .create_buffer(&descriptor(64, BufferUsage::UNIFORM), host_visible())
            .unwrap(),
        allocator
            .create_buffer(&descriptor(36, BufferUsage::INDEX), MemoryProperty::DEVICE_LOCAL)
            .unwrap(),
    ];
    assert_eq!(allocator.pending(), 3);
    // Nothing is bound before end().
    assert!(ids.iter().all(|&id| !allocator.resources().is_buffer_bound(id)));
    (ids, allocator.end())
}

#[test]
fn test_pooled_allocation_binds_everything_once() {
    let device = HeadlessDevice::new();
    let mut table = ResourceTable::new(Arc::new(device.clone()));

    let (ids, report) = allocate_three(&mut table, AllocationStrategy::Pooled);
    let report = report.unwrap();

    assert_eq!(report.resources, 3);
    assert_eq!(report.blocks, 2);
    assert_eq!(report.requested_bytes, 200);
    assert_eq!(report.bound_bytes, report.requested_bytes);
    assert!(ids.iter().all(|&id| table.is_buffer_bound(id)));
    assert_eq!(table.bound_bytes(), table.requested_bytes());
    assert_eq!(device.counts().memory_blocks, 2);
}

#[test]
fn test_dedicated_allocation_uses_one_block_per_resource() {
    let device = HeadlessDevice::new();
    let mut table = ResourceTable::new(Arc::new(device.clone()));

    let (_, report) = allocate_three(&mut table, AllocationStrategy::Dedicated);
    let report = report.unwrap();

    assert_eq!(report.blocks, 3);
    assert_eq!(report.block_bytes, 200);
    assert_eq!(report.bound_bytes, 200);
    assert_eq!(table.live_handles().memory_blocks, 3);
}

#[test]
fn test_failed_allocation_publishes_nothing() {
    let device = HeadlessDevice::new();
    let mut table = ResourceTable::new(Arc::new(device.clone()));
    device.fail_next_allocations(1);

    let (ids, report) = allocate_three(&mut table, AllocationStrategy::Pooled);

    assert!(matches!(
        report,
        Err(SceneError::Device(DeviceError::Api { .. }))
    ));
    assert!(ids.iter().all(|&id| !table.is_buffer_bound(id)));
    assert_eq!(table.bound_bytes(), 0);
    assert_eq!(device.counts().memory_blocks, 0);
    // The buffers themselves stay registered until someone destroys them.
    assert_eq!(table.live_handles().buffers, 3);
}

#[test]
fn test_unsatisfiable_memory_properties() {
    let device = HeadlessDevice::new();
    let mut table = ResourceTable::new(Arc::new(device.clone()));
    let loaders = ImageLoaderFactory::new();

    let mut allocator =
        Allocator::begin(&mut table, &loaders, AllocationStrategy::Pooled, Extent2D::new(8, 8));
    allocator
        .create_buffer(
            &descriptor(16, BufferUsage::STORAGE),
            MemoryProperty::HOST_VISIBLE | MemoryProperty::HOST_CACHED,
        )
        .unwrap();
    let err = allocator.end().unwrap_err();

    assert!(matches!(
        err,
        SceneError::Device(DeviceError::NoMemoryType { .. })
    ));
    assert_eq!(err.category(), canopy_core::ErrorCategory::ResourcePolicy);
    assert_eq!(device.counts().memory_blocks, 0);
}

#[test]
fn test_host_writes_need_a_bound_host_visible_buffer() {
    let device = HeadlessDevice::new();
    let mut table = ResourceTable::new(Arc::new(device.clone()));
    let (ids, report) = allocate_three(&mut table, AllocationStrategy::Pooled);
    report.unwrap();

    table.write_buffer(ids[1], 0, &[7; 64]).unwrap();
    assert_eq!(device.read_buffer(ids[1]).unwrap(), vec![7; 64]);

    assert!(table.write_buffer(ids[0], 0, &[0; 4]).is_err());
    assert!(table.write_buffer(ids[1], 60, &[0; 8]).is_err());
}

#[test]
fn test_shared_block_is_freed_with_its_last_resource() {
    let device = HeadlessDevice::new();
    let mut table = ResourceTable::new(Arc::new(device.clone()));
    let (ids, report) = allocate_three(&mut table, AllocationStrategy::Pooled);
    report.unwrap();

    // Buffers 0 and 2 share the device-local block.
    table.destroy_buffer(ids[0]).unwrap();
    assert_eq!(device.counts().memory_blocks, 2);
    table.destroy_buffer(ids[2]).unwrap();
    assert_eq!(device.counts().memory_blocks, 1);
}

#[test]
fn test_release_all_empties_the_device() {
    let device = HeadlessDevice::new();
    let mut table = ResourceTable::new(Arc::new(device.clone()));
    let (_, report) = allocate_three(&mut table, AllocationStrategy::Pooled);
    report.unwrap();
    table
        .allocate_command_buffer(CommandBufferLevel::Secondary)
        .unwrap();

    table.release_all();

    assert_eq!(table.live_handles().total(), 0);
    assert_eq!(device.counts().total(), 0);
}
