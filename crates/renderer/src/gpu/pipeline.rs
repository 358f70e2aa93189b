use anyhow::{Context, Result};

use crate::compile::{compile_fragment_shader, compile_vertex_shader, MESH_GROUP, PARAMS_GROUP, TEXTURE_GROUP};
use crate::scene::FragmentVariant;
use crate::uniforms::UniformSet;

use super::textures::TextureResource;

/// Bind group layouts shared by every variant pipeline, plus the common
/// vertex stage.
pub(crate) struct PipelineLayouts {
    pub params_layout: wgpu::BindGroupLayout,
    pub mesh_layout: wgpu::BindGroupLayout,
    pub texture_layout: wgpu::BindGroupLayout,
    pub pipeline_layout: wgpu::PipelineLayout,
    pub vertex_module: wgpu::ShaderModule,
}

impl PipelineLayouts {
    pub fn new(device: &wgpu::Device, texture_count: usize) -> Result<Self> {
        let params_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("params layout"),
            entries: &[uniform_buffer_entry(wgpu::ShaderStages::FRAGMENT)],
        });
        let mesh_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("mesh layout"),
            entries: &[uniform_buffer_entry(wgpu::ShaderStages::VERTEX)],
        });
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("texture layout"),
            entries: &build_texture_layout_entries(texture_count),
        });

        let mut group_layouts = [&params_layout; 3];
        group_layouts[PARAMS_GROUP as usize] = &params_layout;
        group_layouts[MESH_GROUP as usize] = &mesh_layout;
        group_layouts[TEXTURE_GROUP as usize] = &texture_layout;
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("plane pipeline layout"),
            bind_group_layouts: &group_layouts,
            push_constant_ranges: &[],
        });

        let vertex_module = compile_vertex_shader(device)?;

        Ok(Self {
            params_layout,
            mesh_layout,
            texture_layout,
            pipeline_layout,
            vertex_module,
        })
    }
}

/// Compiled render pipeline for one fragment variant.
pub(crate) struct VariantPipeline {
    pub variant: FragmentVariant,
    pub pipeline: wgpu::RenderPipeline,
}

impl VariantPipeline {
    pub fn new(
        device: &wgpu::Device,
        layouts: &PipelineLayouts,
        variant: FragmentVariant,
        uniforms: &UniformSet,
        surface_format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> Result<Self> {
        let fragment_module = compile_fragment_shader(device, variant, uniforms)
            .with_context(|| format!("failed to compile {variant} shader"))?;

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("{variant} pipeline")),
            layout: Some(&layouts.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &layouts.vertex_module,
                entry_point: Some("main"),
                buffers: &[],
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
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });
        tracing::debug!(%variant, sample_count, "built variant pipeline");

        Ok(Self { variant, pipeline })
    }
}

fn uniform_buffer_entry(visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

pub(crate) fn build_texture_entries(resources: &[TextureResource]) -> Vec<wgpu::BindGroupEntry<'_>> {
    let mut entries = Vec::with_capacity(resources.len() * 2);
    for (index, resource) in resources.iter().enumerate() {
        entries.push(wgpu::BindGroupEntry {
            binding: (index as u32) * 2,
            resource: wgpu::BindingResource::TextureView(&resource.view),
        });
        entries.push(wgpu::BindGroupEntry {
            binding: (index as u32) * 2 + 1,
            resource: wgpu::BindingResource::Sampler(&resource.sampler),
        });
    }
    entries
}

/// Texture at `2 * slot`, its sampler at `2 * slot + 1`, matching the
/// declarations emitted into the fragment header.
pub(crate) fn build_texture_layout_entries(count: usize) -> Vec<wgpu::BindGroupLayoutEntry> {
    let mut entries = Vec::with_capacity(count * 2);
    for index in 0..count as u32 {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: index * 2,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: index * 2 + 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
    }
    entries
}
