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

//! Turns recorded command lists into `wgpu` command buffers.

use crate::graphics::recording::RecordedCommand;
use canopy_core::renderer::api::*;
use canopy_core::renderer::DeviceError;

use super::conversions::IntoWgpu;
use super::device::{invalid, PipelineEntry, WgpuState};

fn raw_buffer(state: &WgpuState, id: BufferId) -> Result<&wgpu::Buffer, DeviceError> {
    state
        .buffers
        .get(&id)
        .and_then(|entry| entry.raw.as_ref())
        .ok_or_else(|| invalid(id))
}

fn bind_group(state: &WgpuState, id: DescriptorSetId) -> Result<&wgpu::BindGroup, DeviceError> {
    state
        .sets
        .get(&id)
        .and_then(|entry| entry.bind_group.as_ref())
        .ok_or_else(|| invalid(id))
}

fn secondary_commands(
    state: &WgpuState,
    id: CommandBufferId,
) -> Result<&[RecordedCommand], DeviceError> {
    state
        .command_buffers
        .get(&id)
        .map(|entry| entry.commands.as_slice())
        .ok_or_else(|| invalid(id))
}

/// Encodes every primary command buffer of one submission into a single `wgpu` buffer.
///
/// Buffer-to-image copies read the staging buffer's host copy and go through
/// `Queue::write_texture`, which runs before the returned buffer executes.
pub(super) fn encode_submission(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    state: &WgpuState,
    primaries: &[CommandBufferId],
) -> Result<wgpu::CommandBuffer, DeviceError> {
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Canopy Submission"),
    });
    for &primary in primaries {
        let commands = secondary_commands(state, primary)?;
        let mut iter = commands.iter();
        let mut compute = Vec::new();
        while let Some(command) = iter.next() {
            match command {
                RecordedCommand::BindPipeline {
                    bind_point: PipelineBindPoint::Compute,
                    ..
                }
                | RecordedCommand::BindDescriptorSets {
                    bind_point: PipelineBindPoint::Compute,
                    ..
                }
                | RecordedCommand::Dispatch { .. } => {
                    compute.push(command);
                    continue;
                }
                _ => {}
            }
            if !compute.is_empty() {
                encode_compute_pass(&mut encoder, state, compute.drain(..))?;
            }
            match command {
                RecordedCommand::CopyBuffer {
                    source,
                    destination,
                    regions,
                } => {
                    let source = raw_buffer(state, *source)?;
                    let destination = raw_buffer(state, *destination)?;
                    for region in regions {
                        encoder.copy_buffer_to_buffer(
                            source,
                            region.src_offset,
                            destination,
                            region.dst_offset,
                            region.size,
                        );
                    }
                }
                RecordedCommand::CopyBufferToImage {
                    source,
                    destination,
                    regions,
                    ..
                } => write_image(queue, state, *source, *destination, regions)?,
                RecordedCommand::BeginRenderPass { info, .. } => {
                    let inner: Vec<&RecordedCommand> = iter
                        .by_ref()
                        .take_while(|c| !matches!(c, RecordedCommand::EndRenderPass))
                        .collect();
                    encode_render_pass(&mut encoder, state, info, &inner)?;
                }
                RecordedCommand::ExecuteCommands(secondaries) => {
                    for &secondary in secondaries {
                        let commands = secondary_commands(state, secondary)?;
                        encode_compute_pass(&mut encoder, state, commands.iter())?;
                    }
                }
                // Layouts are tracked by wgpu itself.
                RecordedCommand::TransitionImageLayout { .. } => {}
                other => log::warn!("Ignoring {other:?} outside of a render pass"),
            }
        }
        if !compute.is_empty() {
            encode_compute_pass(&mut encoder, state, compute.drain(..))?;
        }
    }
    Ok(encoder.finish())
}

fn write_image(
    queue: &wgpu::Queue,
    state: &WgpuState,
    source: BufferId,
    destination: ImageId,
    regions: &[BufferImageCopy],
) -> Result<(), DeviceError> {
    let bytes = state.buffer_contents(source)?;
    let image = state.images.get(&destination).ok_or_else(|| invalid(destination))?;
    let texture = image.raw.as_ref().ok_or_else(|| invalid(destination))?;
    let texel_size = texture.format().block_copy_size(None).unwrap_or(4);
    for region in regions {
        let extent = region.image_extent;
        let start = region.buffer_offset as usize;
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: region.mip_level,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: region.array_layer,
                },
                aspect: wgpu::TextureAspect::All,
            },
            bytes.get(start..).ok_or(DeviceError::OutOfBounds {
                offset: region.buffer_offset,
                len: 0,
                size: bytes.len() as u64,
            })?,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(extent.width * texel_size),
                rows_per_image: Some(extent.height),
            },
            extent.into_wgpu(),
        );
    }
    Ok(())
}

fn encode_render_pass(
    encoder: &mut wgpu::CommandEncoder,
    state: &WgpuState,
    info: &RenderPassBeginInfo,
    commands: &[&RecordedCommand],
) -> Result<(), DeviceError> {
    let view = state
        .framebuffers
        .get(&info.framebuffer)
        .and_then(Option::as_ref)
        .ok_or_else(|| invalid(info.framebuffer))?;
    let [r, g, b, a] = info.clear_color.map(f64::from);
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("Canopy Render Pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            depth_slice: None,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    });
    for command in commands {
        match command {
            RecordedCommand::ExecuteCommands(secondaries) => {
                for &secondary in secondaries {
                    for command in secondary_commands(state, secondary)? {
                        encode_draw_command(&mut pass, state, command)?;
                    }
                }
            }
            command => encode_draw_command(&mut pass, state, command)?,
        }
    }
    Ok(())
}

fn encode_draw_command(
    pass: &mut wgpu::RenderPass<'_>,
    state: &WgpuState,
    command: &RecordedCommand,
) -> Result<(), DeviceError> {
    match command {
        RecordedCommand::BindPipeline { pipeline, .. } => match state.pipelines.get(pipeline) {
            Some(PipelineEntry::Render(raw)) => pass.set_pipeline(raw),
            _ => return Err(invalid(*pipeline)),
        },
        RecordedCommand::BindDescriptorSets {
            first_set, sets, ..
        } => {
            for (index, &set) in (*first_set..).zip(sets) {
                pass.set_bind_group(index, bind_group(state, set)?, &[]);
            }
        }
        RecordedCommand::SetViewport(viewport) => pass.set_viewport(
            viewport.x,
            viewport.y,
            viewport.width,
            viewport.height,
            viewport.min_depth,
            viewport.max_depth,
        ),
        RecordedCommand::SetScissor(scissor) => pass.set_scissor_rect(
            scissor.x.max(0) as u32,
            scissor.y.max(0) as u32,
            scissor.extent.width,
            scissor.extent.height,
        ),
        RecordedCommand::BindVertexBuffers {
            first_binding,
            buffers,
            offsets,
        } => {
            for ((slot, &buffer), &offset) in (*first_binding..).zip(buffers).zip(offsets) {
                pass.set_vertex_buffer(slot, raw_buffer(state, buffer)?.slice(offset..));
            }
        }
        RecordedCommand::BindIndexBuffer {
            buffer,
            offset,
            format,
        } => pass.set_index_buffer(
            raw_buffer(state, *buffer)?.slice(*offset..),
            format.into_wgpu(),
        ),
        RecordedCommand::Draw {
            vertex_count,
            instance_count,
            first_vertex,
            first_instance,
        } => pass.draw(
            *first_vertex..first_vertex + vertex_count,
            *first_instance..first_instance + instance_count,
        ),
        RecordedCommand::DrawIndexed {
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        } => pass.draw_indexed(
            *first_index..first_index + index_count,
            *vertex_offset,
            *first_instance..first_instance + instance_count,
        ),
        other => log::warn!("Ignoring {other:?} inside a render pass"),
    }
    Ok(())
}

fn encode_compute_pass<'a>(
    encoder: &mut wgpu::CommandEncoder,
    state: &WgpuState,
    commands: impl Iterator<Item = &'a RecordedCommand>,
) -> Result<(), DeviceError> {
    let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
        label: Some("Canopy Compute Pass"),
        timestamp_writes: None,
    });
    for command in commands {
        match command {
            RecordedCommand::BindPipeline { pipeline, .. } => match state.pipelines.get(pipeline) {
                Some(PipelineEntry::Compute(raw)) => pass.set_pipeline(raw),
                _ => return Err(invalid(*pipeline)),
            },
            RecordedCommand::BindDescriptorSets {
                first_set, sets, ..
            } => {
                for (index, &set) in (*first_set..).zip(sets) {
                    pass.set_bind_group(index, bind_group(state, set)?, &[]);
                }
            }
            RecordedCommand::Dispatch { x, y, z } => pass.dispatch_workgroups(*x, *y, *z),
            other => log::warn!("Ignoring {other:?} inside a compute pass"),
        }
    }
    Ok(())
}
