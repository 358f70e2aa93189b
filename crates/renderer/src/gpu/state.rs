use std::sync::Arc;

use anyhow::Result;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::compile::{MESH_GROUP, PARAMS_GROUP, TEXTURE_GROUP};
use crate::driver::RenderBackend;
use crate::scene::{FragmentVariant, PerspectiveCamera, ResizeTarget, Scene};
use crate::types::RendererConfig;
use crate::uniforms::UniformSet;

use super::context::GpuContext;
use super::pipeline::{build_texture_entries, PipelineLayouts, VariantPipeline};
use super::textures::{create_texture, TextureResource};
use super::uniforms::{MeshUniforms, ScalarBlock};

/// Failure while drawing one frame.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("no pipeline was built for the {0} variant")]
    MissingPipeline(FragmentVariant),
}

impl RenderError {
    pub fn as_surface_error(&self) -> Option<&wgpu::SurfaceError> {
        match self {
            RenderError::Surface(err) => Some(err),
            RenderError::MissingPipeline(_) => None,
        }
    }
}

struct MultisampleTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl MultisampleTarget {
    fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        size: PhysicalSize<u32>,
        sample_count: u32,
    ) -> Self {
        let extent = wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("msaa color target"),
            size: extent,
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

struct MeshBinding {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

pub(crate) struct GpuState {
    context: GpuContext,
    layouts: PipelineLayouts,
    params_buffer: wgpu::Buffer,
    params_bind_group: wgpu::BindGroup,
    uploaded_revision: Option<u64>,
    _textures: Vec<TextureResource>,
    texture_bind_group: wgpu::BindGroup,
    pipelines: Vec<VariantPipeline>,
    meshes: Vec<MeshBinding>,
    multisample_target: Option<MultisampleTarget>,
}

impl GpuState {
    /// Creates the surface, uploads every configured texture, and compiles one
    /// pipeline per variant the scene uses.
    ///
    /// `uniforms` must already hold every scalar and texture uniform; the
    /// fragment headers are generated from it and never regenerated.
    pub(crate) fn new(
        window: Arc<Window>,
        config: &RendererConfig,
        scene: &Scene,
        uniforms: &UniformSet,
    ) -> Result<Self> {
        let context = GpuContext::new(window, config.antialiasing, config.color_space)?;
        let layouts = PipelineLayouts::new(&context.device, config.textures.len())?;

        let params_buffer = context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("params buffer"),
            size: std::mem::size_of::<ScalarBlock>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let params_bind_group = context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("params bind group"),
                layout: &layouts.params_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params_buffer.as_entire_binding(),
                }],
            });

        let textures: Vec<TextureResource> = config
            .textures
            .iter()
            .map(|binding| {
                create_texture(
                    &context.device,
                    &context.queue,
                    &binding.uniform,
                    &binding.source,
                    context.color_space,
                )
            })
            .collect();
        let texture_bind_group = context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("texture bind group"),
                layout: &layouts.texture_layout,
                entries: &build_texture_entries(&textures),
            });

        let pipelines = scene
            .variants()
            .into_iter()
            .map(|variant| {
                VariantPipeline::new(
                    &context.device,
                    &layouts,
                    variant,
                    uniforms,
                    context.surface_format,
                    context.sample_count,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        let multisample_target = (context.sample_count > 1).then(|| {
            MultisampleTarget::new(
                &context.device,
                context.surface_format,
                context.size,
                context.sample_count,
            )
        });

        let mut state = Self {
            context,
            layouts,
            params_buffer,
            params_bind_group,
            uploaded_revision: None,
            _textures: textures,
            texture_bind_group,
            pipelines,
            meshes: Vec::new(),
            multisample_target,
        };
        state.ensure_mesh_bindings(scene.meshes().len());
        Ok(state)
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    /// Reconfigures the swapchain after `SurfaceError::Lost` or `Outdated`.
    pub(crate) fn recover_surface(&mut self) {
        self.context.reconfigure();
    }

    fn ensure_mesh_bindings(&mut self, count: usize) {
        while self.meshes.len() < count {
            let index = self.meshes.len();
            let buffer = self.context.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&format!("mesh {index} buffer")),
                size: std::mem::size_of::<MeshUniforms>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let bind_group = self
                .context
                .device
                .create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("mesh {index} bind group")),
                    layout: &self.layouts.mesh_layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    }],
                });
            self.meshes.push(MeshBinding { buffer, bind_group });
        }
    }

    fn pipeline_for(&self, variant: FragmentVariant) -> Result<&VariantPipeline, RenderError> {
        self.pipelines
            .iter()
            .find(|pipeline| pipeline.variant == variant)
            .ok_or(RenderError::MissingPipeline(variant))
    }

    fn upload_uniforms(&mut self, scene: &Scene, camera: &PerspectiveCamera, uniforms: &UniformSet) {
        if self.uploaded_revision != Some(uniforms.revision()) {
            let block = ScalarBlock::pack(uniforms);
            self.context
                .queue
                .write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&block));
            self.uploaded_revision = Some(uniforms.revision());
        }

        self.ensure_mesh_bindings(scene.meshes().len());
        let view_projection = camera.view_projection();
        for (mesh, binding) in scene.meshes().iter().zip(&self.meshes) {
            let mesh_uniforms = MeshUniforms::new(view_projection, mesh);
            self.context
                .queue
                .write_buffer(&binding.buffer, 0, bytemuck::bytes_of(&mesh_uniforms));
        }
    }
}

impl RenderBackend for GpuState {
    type Error = RenderError;

    fn render(
        &mut self,
        scene: &Scene,
        camera: &PerspectiveCamera,
        uniforms: &UniformSet,
    ) -> Result<(), RenderError> {
        let frame = self.context.surface.get_current_texture()?;
        self.upload_uniforms(scene, camera, uniforms);

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("render encoder"),
                });

        {
            let (attachment_view, resolve_target) =
                match self.multisample_target.as_ref() {
                    Some(msaa) => (&msaa.view, Some(&view)),
                    None => (&view, None),
                };
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("render pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: attachment_view,
                    depth_slice: None,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_bind_group(PARAMS_GROUP, &self.params_bind_group, &[]);
            render_pass.set_bind_group(TEXTURE_GROUP, &self.texture_bind_group, &[]);

            for (mesh, binding) in scene.meshes().iter().zip(&self.meshes) {
                let pipeline = self.pipeline_for(mesh.variant)?;
                render_pass.set_pipeline(&pipeline.pipeline);
                render_pass.set_bind_group(MESH_GROUP, &binding.bind_group, &[]);
                render_pass.draw(0..6, 0..1);
            }
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}

impl ResizeTarget for GpuState {
    fn set_output_size(&mut self, width: u32, height: u32) {
        let new_size = PhysicalSize::new(width, height);
        self.context.resize(new_size);
        self.multisample_target = (self.context.sample_count > 1).then(|| {
            MultisampleTarget::new(
                &self.context.device,
                self.context.surface_format,
                self.context.size,
                self.context.sample_count,
            )
        });
        tracing::debug!(width, height, "resized render targets");
    }
}
