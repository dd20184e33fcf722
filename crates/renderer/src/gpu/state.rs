use std::collections::HashSet;
use std::time::{Duration, Instant};

use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, warn};
use winit::dpi::PhysicalSize;

use crate::camera::Camera;
use crate::plan::{TextureKind, CLEAR_COLOR, FRAME_PLAN, STENCIL_REFERENCE};
use crate::runtime::{FrameState, TimeSample};
use crate::shaders::{ProgramKind, UniformName};
use crate::types::{Antialiasing, ColorSpaceMode, SceneImages};

use super::context::{GpuContext, SurfaceColorSpace, DEPTH_STENCIL_FORMAT};
use super::pipeline::{PipelineLayouts, StepPipelines};
use super::resources::GpuResources;
use super::uniforms::{SceneUniforms, UniformScope};

struct AttachmentTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl AttachmentTarget {
    fn new(
        device: &wgpu::Device,
        label: &'static str,
        format: wgpu::TextureFormat,
        size: PhysicalSize<u32>,
        sample_count: u32,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size.width.max(1),
                height: size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

/// Per-step uniform storage; each draw reads its own buffer so values set
/// for one step never leak into another within a frame.
struct DrawSlot {
    uniforms: SceneUniforms,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    texture: Option<TextureKind>,
}

pub(crate) struct GpuState {
    context: GpuContext,
    _layouts: PipelineLayouts,
    resources: GpuResources,
    pipelines: StepPipelines,
    slots: Vec<DrawSlot>,
    camera: Camera,
    depth_stencil: AttachmentTarget,
    multisample_target: Option<AttachmentTarget>,
    warned_uniforms: HashSet<(ProgramKind, UniformName)>,
    warned_slots: HashSet<usize>,
    last_fps_update: Instant,
    frames_since_last_update: u32,
    frames_per_second: f32,
}

impl GpuState {
    pub(crate) fn new<T>(
        target: &T,
        initial_size: PhysicalSize<u32>,
        images: &SceneImages,
        antialiasing: Antialiasing,
        color_space: ColorSpaceMode,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, initial_size, antialiasing, color_space)?;
        let layouts = PipelineLayouts::new(&context.device);
        let resources = GpuResources::new(&context, &layouts, images)?;
        let pipelines = StepPipelines::build(
            &context.device,
            &layouts,
            context.surface_format,
            context.sample_count,
        )?;

        let slots = FRAME_PLAN
            .iter()
            .map(|step| {
                let buffer = context.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(step.label),
                    size: std::mem::size_of::<SceneUniforms>() as u64,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                let bind_group = context
                    .device
                    .create_bind_group(&wgpu::BindGroupDescriptor {
                        label: Some(step.label),
                        layout: &layouts.uniform_layout,
                        entries: &[wgpu::BindGroupEntry {
                            binding: 0,
                            resource: buffer.as_entire_binding(),
                        }],
                    });
                DrawSlot {
                    uniforms: SceneUniforms::new(),
                    buffer,
                    bind_group,
                    texture: None,
                }
            })
            .collect();

        let camera = Camera::new(context.size.width, context.size.height);
        let depth_stencil = AttachmentTarget::new(
            &context.device,
            "depth stencil target",
            DEPTH_STENCIL_FORMAT,
            context.size,
            context.sample_count,
        );
        let multisample_target = (context.sample_count > 1).then(|| {
            AttachmentTarget::new(
                &context.device,
                "msaa color target",
                context.surface_format,
                context.size,
                context.sample_count,
            )
        });

        Ok(Self {
            context,
            _layouts: layouts,
            resources,
            pipelines,
            slots,
            camera,
            depth_stencil,
            multisample_target,
            warned_uniforms: HashSet::new(),
            warned_slots: HashSet::new(),
            last_fps_update: Instant::now(),
            frames_since_last_update: 0,
            frames_per_second: 60.0,
        })
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    /// Reconfigures the surface at its existing size after it was lost or outdated.
    pub(crate) fn recover_surface(&mut self) {
        self.context.reconfigure();
    }

    /// Draws one frame for `sample` and presents it.
    pub(crate) fn render(&mut self, sample: TimeSample) -> Result<FrameState, wgpu::SurfaceError> {
        let frame_acquisition_start = Instant::now();
        let frame = self.context.surface.get_current_texture()?;
        let frame_acquisition_duration = frame_acquisition_start.elapsed();
        let frame_time_budget = Duration::from_secs_f32(1.0 / self.frames_per_second.max(1.0));
        // FIFO presentation blocks for up to one interval while pacing to vsync.
        if acquisition_over_budget(frame_acquisition_duration, frame_time_budget) {
            warn!(
                "acquiring frame took {}ms, which is over the frame budget of {}ms (at {} FPS)",
                frame_acquisition_duration.as_millis(),
                frame_time_budget.as_millis(),
                self.frames_per_second.round(),
            );
        }

        let state = FrameState::from_sample(sample);
        self.update_stats(&state, sample.frame_index);
        self.apply_bindings(&state);

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("scene encoder"),
                });
        self.encode_plan(&mut encoder, &view);
        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(state)
    }

    fn update_stats(&mut self, state: &FrameState, frame_index: u64) {
        let now = Instant::now();
        self.frames_since_last_update += 1;
        let elapsed_since_fps_update = now.saturating_duration_since(self.last_fps_update);
        if elapsed_since_fps_update >= Duration::from_secs(1) {
            self.frames_per_second =
                self.frames_since_last_update as f32 / elapsed_since_fps_update.as_secs_f32();
            self.frames_since_last_update = 0;
            self.last_fps_update = now;
            debug!(
                fps = self.frames_per_second.round(),
                frame_index,
                elapsed_ms = state.elapsed_ms,
                progress = state.progress,
                "render stats"
            );
        }
    }

    fn apply_bindings(&mut self, state: &FrameState) {
        for (step, slot) in FRAME_PLAN.iter().zip(self.slots.iter_mut()) {
            let mut scope = UniformScope::new(
                step.program,
                &mut slot.uniforms,
                &mut slot.texture,
                &mut self.warned_uniforms,
            );
            scope.bind_all(step.bindings(state, &self.camera));
            self.context
                .queue
                .write_buffer(&slot.buffer, 0, bytemuck::bytes_of(&slot.uniforms));
        }
    }

    fn encode_plan(&mut self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        let (attachment_view, resolve_target) = match self.multisample_target.as_ref() {
            Some(msaa) => (&msaa.view, Some(view)),
            None => (view, None),
        };
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scene pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: attachment_view,
                depth_slice: None,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear_color(self.context.color_space)),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_stencil.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(0),
                    store: wgpu::StoreOp::Discard,
                }),
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_stencil_reference(STENCIL_REFERENCE);

        for (index, (step, slot)) in FRAME_PLAN.iter().zip(&self.slots).enumerate() {
            let Some(texture) = slot.texture else {
                if self.warned_slots.insert(index) {
                    warn!(step = step.label, "no image bound; skipping draw");
                }
                continue;
            };
            let Some(pipeline) = self.pipelines.get(index) else {
                continue;
            };
            let mesh = self.resources.mesh(step.mesh);
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &slot.bind_group, &[]);
            pass.set_bind_group(1, &self.resources.texture(texture).bind_group, &[]);
            pass.set_vertex_buffer(0, mesh.buffer.slice(..));
            pass.draw(0..mesh.vertex_count, 0..1);
        }
    }
}

/// Slack allowed on top of the frame budget before acquisition is reported.
const ACQUISITION_SLACK: u32 = 2;

fn acquisition_over_budget(acquisition: Duration, budget: Duration) -> bool {
    acquisition > budget * ACQUISITION_SLACK
}

fn clear_color(color_space: SurfaceColorSpace) -> wgpu::Color {
    let [r, g, b, a] = CLEAR_COLOR;
    let channel = |value: f64| match color_space {
        SurfaceColorSpace::Gamma => value,
        SurfaceColorSpace::Linear => srgb_to_linear(value),
    };
    wgpu::Color {
        r: channel(r),
        g: channel(g),
        b: channel(b),
        a,
    }
}

fn srgb_to_linear(value: f64) -> f64 {
    if value <= 0.04045 {
        value / 12.92
    } else {
        ((value + 0.055) / 1.055).powf(2.4)
    }
}
