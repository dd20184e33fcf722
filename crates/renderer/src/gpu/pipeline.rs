use std::collections::HashMap;

use crate::error::{scoped, RenderError, StageKind};
use crate::geometry::Vertex;
use crate::plan::{DrawStep, FRAME_PLAN};
use crate::shaders::{compile_stage, ProgramKind};

use super::context::DEPTH_STENCIL_FORMAT;

pub(crate) struct PipelineLayouts {
    pub uniform_layout: wgpu::BindGroupLayout,
    pub texture_layout: wgpu::BindGroupLayout,
    pub pipeline_layout: wgpu::PipelineLayout,
}

impl PipelineLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scene uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("image layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene pipeline layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        Self {
            uniform_layout,
            texture_layout,
            pipeline_layout,
        }
    }
}

struct ProgramModules {
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
}

/// One linked render pipeline per entry of [`FRAME_PLAN`], in plan order.
pub(crate) struct StepPipelines {
    pipelines: Vec<wgpu::RenderPipeline>,
}

impl StepPipelines {
    /// Compiles every program and links the per-step pipelines.
    ///
    /// Either every pipeline is returned or nothing is: the stage modules are
    /// local to this call and dropped on every exit path.
    pub fn build(
        device: &wgpu::Device,
        layouts: &PipelineLayouts,
        surface_format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> Result<Self, RenderError> {
        let mut programs = HashMap::new();
        for program in ProgramKind::ALL {
            let modules = ProgramModules {
                vertex: compile_stage(device, program, StageKind::Vertex)?,
                fragment: compile_stage(device, program, StageKind::Fragment)?,
            };
            programs.insert(program, modules);
        }

        let mut pipelines = Vec::with_capacity(FRAME_PLAN.len());
        for step in &FRAME_PLAN {
            let modules = programs.get(&step.program).ok_or_else(|| {
                RenderError::ShaderLink {
                    program: step.program,
                    log: "program was not compiled".into(),
                }
            })?;
            pipelines.push(link_step(
                device,
                layouts,
                modules,
                step,
                surface_format,
                sample_count,
            )?);
        }
        tracing::debug!(pipelines = pipelines.len(), "linked scene pipelines");

        Ok(Self { pipelines })
    }

    pub fn get(&self, index: usize) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(index)
    }
}

fn link_step(
    device: &wgpu::Device,
    layouts: &PipelineLayouts,
    modules: &ProgramModules,
    step: &DrawStep,
    surface_format: wgpu::TextureFormat,
    sample_count: u32,
) -> Result<wgpu::RenderPipeline, RenderError> {
    let write_mask = if step.color_writes {
        wgpu::ColorWrites::ALL
    } else {
        wgpu::ColorWrites::empty()
    };
    let label = format!("{} pipeline", step.label);

    let (pipeline, captured) = scoped(device, wgpu::ErrorFilter::Validation, || {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&label),
            layout: Some(&layouts.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &modules.vertex,
                entry_point: Some("main"),
                buffers: &[Vertex::buffer_layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_STENCIL_FORMAT,
                depth_write_enabled: step.depth_writes,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: step.stencil.stencil_state(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            fragment: Some(wgpu::FragmentState {
                module: &modules.fragment,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        })
    });

    match captured {
        Some(err) => Err(RenderError::ShaderLink {
            program: step.program,
            log: err.to_string(),
        }),
        None => Ok(pipeline),
    }
}
