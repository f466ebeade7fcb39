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

//! Opens a window and renders a cube through the wgpu backend.
//!
//! Drag with the left mouse button to orbit, the middle button to pan and
//! the right button to zoom.
//!
//! ```sh
//! cargo run -p canopy-infra --features wgpu --example viewer
//! ```

use anyhow::Context;
use canopy_agents::RenderManager;
use canopy_core::image::ImageLoaderFactory;
use canopy_core::math::Extent2D;
use canopy_core::renderer::api::{PrimitiveTopology, ShaderStage};
use canopy_core::RenderSettings;
use canopy_infra::graphics::wgpu::WgpuContext;
use canopy_infra::platform::WinitInputTranslator;
use canopy_infra::RasterImageLoader;
use canopy_scene::nodes::{DescriptorBinding, DrawCommand, Shader, TransformBuffer};
use canopy_scene::{shapes, Separator};
use std::sync::Arc;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{Window, WindowId};

const CUBE_SHADER: &str = r#"
struct Transforms {
    model_view: mat4x4<f32>,
    projection: mat4x4<f32>,
};

@group(0) @binding(0) var<uniform> transforms: Transforms;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
};

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = transforms.projection * transforms.model_view * vec4<f32>(position, 1.0);
    out.color = position + vec3<f32>(0.5);
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(in.color, 1.0);
}
"#;

fn cube_scene() -> Separator {
    Separator::new()
        .with(shapes::cube(0, 0))
        .with(Shader::wgsl(CUBE_SHADER, ShaderStage::VERTEX).with_entry_point("vs_main"))
        .with(Shader::wgsl(CUBE_SHADER, ShaderStage::FRAGMENT).with_entry_point("fs_main"))
        .with(TransformBuffer::new())
        .with(DescriptorBinding::uniform_buffer(0, ShaderStage::VERTEX))
        .with(DrawCommand::new(PrimitiveTopology::TriangleList))
}

#[derive(Default)]
struct Viewer {
    settings: RenderSettings,
    // Dropped before the window it renders into.
    manager: Option<RenderManager>,
    window: Option<Arc<Window>>,
    input: WinitInputTranslator,
}

impl Viewer {
    fn start(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let initial = self.settings.initial_extent;
        let attributes = Window::default_attributes()
            .with_title("Canopy viewer")
            .with_inner_size(PhysicalSize::new(initial.width, initial.height));
        let window = Arc::new(event_loop.create_window(attributes)?);
        let size = window.inner_size();
        let extent = Extent2D::new(size.width.max(1), size.height.max(1));

        let context = WgpuContext::new(Arc::clone(&window), extent)?;
        log::info!(
            "Using {} ({:?})",
            context.adapter_name,
            context.adapter_backend
        );

        let loaders = ImageLoaderFactory::new().with(Arc::new(RasterImageLoader));
        let mut manager = RenderManager::new(
            Arc::new(context.device),
            Box::new(context.surface),
            Box::new(cube_scene()),
            self.settings.clone(),
            loaders,
        )?;
        manager.view_all();
        manager.init().context("building the scene")?;

        window.request_redraw();
        self.manager = Some(manager);
        self.window = Some(window);
        Ok(())
    }
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.start(event_loop) {
            log::error!("Failed to start the viewer: {e:#}");
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let (Some(manager), Some(window)) = (self.manager.as_mut(), self.window.as_ref()) else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Frames: {:?}", manager.stats());
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                manager.redraw();
            }
            other => {
                if let Some(input) = self.input.translate(&other) {
                    if manager.handle_event(&input) {
                        window.request_redraw();
                    }
                }
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let event_loop = EventLoop::new()?;
    let mut viewer = Viewer::default();
    event_loop.run_app(&mut viewer)?;
    Ok(())
}
