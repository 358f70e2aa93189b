use std::sync::Arc;

use anyhow::{Context as AnyhowContext, Result};
use wgpu::TextureFormatFeatureFlags;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::types::{Antialiasing, ColorSpaceMode};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SurfaceColorSpace {
    Gamma,
    Linear,
}

impl From<ColorSpaceMode> for SurfaceColorSpace {
    fn from(mode: ColorSpaceMode) -> Self {
        match mode {
            ColorSpaceMode::Auto | ColorSpaceMode::Gamma => SurfaceColorSpace::Gamma,
            ColorSpaceMode::Linear => SurfaceColorSpace::Linear,
        }
    }
}

pub(crate) struct GpuContext {
    pub _instance: wgpu::Instance,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub size: PhysicalSize<u32>,
    pub sample_count: u32,
    pub surface_format: wgpu::TextureFormat,
    pub color_space: SurfaceColorSpace,
}

impl GpuContext {
    pub(crate) fn new(
        window: Arc<Window>,
        antialiasing: Antialiasing,
        color_space: ColorSpaceMode,
    ) -> Result<Self> {
        let initial_size = window.inner_size();
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let surface = instance
            .create_surface(window)
            .context("failed to create rendering surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("failed to find a suitable GPU adapter")?;

        let adapter_info = adapter.get_info();
        let limits = adapter.limits();
        let is_software = adapter_info.device_type == wgpu::DeviceType::Cpu;
        tracing::debug!(
            name = %adapter_info.name,
            backend = ?adapter_info.backend,
            device_type = ?adapter_info.device_type,
            is_software,
            "selected GPU adapter"
        );

        let max_dimension = limits.max_texture_dimension_2d;
        let requested_width = initial_size.width.max(1);
        let requested_height = initial_size.height.max(1);
        if requested_width > max_dimension || requested_height > max_dimension {
            anyhow::bail!(
                "GPU max texture dimension is {max_dimension}, requested surface is {requested_width}x{requested_height}"
            );
        }

        let surface_caps = surface.get_capabilities(&adapter);
        let Some(&first_format) = surface_caps.formats.first() else {
            anyhow::bail!("surface reports no supported formats for this adapter");
        };
        let color_space = SurfaceColorSpace::from(color_space);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| format.is_srgb() == (color_space == SurfaceColorSpace::Linear))
            .unwrap_or_else(|| {
                tracing::warn!(
                    ?color_space,
                    fallback = ?first_format,
                    "no surface format matches the requested color space; falling back"
                );
                first_format
            });

        let format_features = adapter.get_texture_format_features(surface_format);
        let sample_count = select_sample_count(
            antialiasing,
            format_features.flags.supported_sample_counts(),
            format_features
                .flags
                .contains(TextureFormatFeatureFlags::MULTISAMPLE_RESOLVE),
            is_software,
        );

        let mut required_features = wgpu::Features::empty();
        if sample_count > 4 {
            required_features |= wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES;
        }

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("noisewarp device"),
            required_features,
            required_limits: limits.clone(),
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
        }))
        .context("failed to create GPU device")?;

        let present_mode = surface_caps
            .present_modes
            .iter()
            .copied()
            .find(|mode| *mode == wgpu::PresentMode::Fifo)
            .unwrap_or(wgpu::PresentMode::AutoVsync);
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        tracing::debug!(?present_mode, ?surface_format, sample_count, "configuring surface");

        let size = PhysicalSize::new(requested_width, requested_height);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self {
            _instance: instance,
            surface,
            device,
            queue,
            config,
            size,
            sample_count,
            surface_format,
            color_space,
        })
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
    }

    /// Reconfigures the surface at its current size after it was lost or outdated.
    pub(crate) fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }
}

/// Resolves the MSAA sample count from the caller's request and what the
/// surface format supports.
pub(crate) fn select_sample_count(
    antialiasing: Antialiasing,
    mut supported: Vec<u32>,
    supports_resolve: bool,
    is_software: bool,
) -> u32 {
    if !supported.contains(&1) {
        supported.push(1);
    }
    supported.sort_unstable();
    supported.dedup();

    let sample_count = match antialiasing {
        Antialiasing::Auto => supported.last().copied().unwrap_or(1),
        Antialiasing::Off => 1,
        Antialiasing::Samples(requested) if supported.contains(&requested) => requested,
        Antialiasing::Samples(requested) => {
            let fallback = supported
                .iter()
                .copied()
                .filter(|&count| count <= requested)
                .max()
                .unwrap_or(1);
            tracing::warn!(
                requested,
                fallback,
                ?supported,
                "requested MSAA sample count not supported; falling back"
            );
            fallback
        }
    };

    if sample_count > 1 && !supports_resolve {
        tracing::warn!("surface format does not support MSAA resolve; disabling MSAA");
        return 1;
    }
    if sample_count > 1 && is_software {
        tracing::warn!(
            sample_count,
            "software rasterizer detected; disabling MSAA for performance"
        );
        return 1;
    }
    sample_count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_picks_highest_supported_count() {
        assert_eq!(
            select_sample_count(Antialiasing::Auto, vec![1, 2, 4], true, false),
            4
        );
    }

    #[test]
    fn unsupported_request_falls_back_to_lower_count() {
        assert_eq!(
            select_sample_count(Antialiasing::Samples(8), vec![1, 4], true, false),
            4
        );
        assert_eq!(
            select_sample_count(Antialiasing::Samples(2), vec![4], true, false),
            1
        );
    }

    #[test]
    fn msaa_disabled_without_resolve_or_on_software() {
        assert_eq!(
            select_sample_count(Antialiasing::Samples(4), vec![1, 4], false, false),
            1
        );
        assert_eq!(
            select_sample_count(Antialiasing::Auto, vec![1, 4], true, true),
            1
        );
        assert_eq!(select_sample_count(Antialiasing::Off, vec![1, 4], true, false), 1);
    }

    #[test]
    fn auto_color_space_is_gamma() {
        assert_eq!(SurfaceColorSpace::from(ColorSpaceMode::Auto), SurfaceColorSpace::Gamma);
        assert_eq!(
            SurfaceColorSpace::from(ColorSpaceMode::Linear),
            SurfaceColorSpace::Linear
        );
    }
}
