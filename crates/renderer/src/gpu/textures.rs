use std::path::Path;

use anyhow::{Context, Result};
use image::imageops::flip_vertical_in_place;
use image::RgbaImage;
use wgpu::util::{DeviceExt, TextureDataOrder};

use crate::types::{TextureSource, TextureWrap};

use super::context::SurfaceColorSpace;

const PLACEHOLDER_SIZE: u32 = 8;

pub(crate) struct TextureResource {
    pub _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

/// Uploads the image behind `source`, falling back to a checkerboard when the
/// path is unset or the file cannot be decoded.
pub(crate) fn create_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    source: &TextureSource,
    color_space: SurfaceColorSpace,
) -> TextureResource {
    let image = match source.path.as_deref() {
        Some(path) => match load_image(path) {
            Ok(image) => image,
            Err(error) => {
                tracing::warn!(
                    texture = label,
                    path = %path.display(),
                    error = %error,
                    "failed to load texture; using placeholder"
                );
                placeholder_image()
            }
        },
        None => {
            tracing::warn!(texture = label, "no image configured; using placeholder");
            placeholder_image()
        }
    };
    upload(device, queue, label, &image, source.wrap, color_space)
}

fn load_image(path: &Path) -> Result<RgbaImage> {
    let image = image::open(path)
        .with_context(|| format!("failed to open image at {}", path.display()))?;
    let mut rgba = image.to_rgba8();
    // uv (0, 0) is the bottom-left corner of the plane
    flip_vertical_in_place(&mut rgba);
    tracing::debug!(
        path = %path.display(),
        width = rgba.width(),
        height = rgba.height(),
        "decoded texture"
    );
    Ok(rgba)
}

fn placeholder_image() -> RgbaImage {
    RgbaImage::from_fn(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, |x, y| {
        if (x + y) % 2 == 0 {
            image::Rgba([255, 0, 255, 255])
        } else {
            image::Rgba([24, 24, 24, 255])
        }
    })
}

fn upload(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    image: &RgbaImage,
    wrap: TextureWrap,
    color_space: SurfaceColorSpace,
) -> TextureResource {
    let (width, height) = image.dimensions();
    let texture_format = match color_space {
        SurfaceColorSpace::Gamma => wgpu::TextureFormat::Rgba8Unorm,
        SurfaceColorSpace::Linear => wgpu::TextureFormat::Rgba8UnormSrgb,
    };
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some(&format!("{label} texture")),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        TextureDataOrder::LayerMajor,
        image.as_raw(),
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let address_mode = address_mode(wrap);
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(&format!("{label} sampler")),
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    });

    TextureResource {
        _texture: texture,
        view,
        sampler,
    }
}

pub(crate) fn address_mode(wrap: TextureWrap) -> wgpu::AddressMode {
    match wrap {
        TextureWrap::Clamp => wgpu::AddressMode::ClampToEdge,
        TextureWrap::Repeat => wgpu::AddressMode::Repeat,
        TextureWrap::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_modes_map_to_sampler_address_modes() {
        assert_eq!(address_mode(TextureWrap::Clamp), wgpu::AddressMode::ClampToEdge);
        assert_eq!(address_mode(TextureWrap::Repeat), wgpu::AddressMode::Repeat);
        assert_eq!(
            address_mode(TextureWrap::MirroredRepeat),
            wgpu::AddressMode::MirrorRepeat
        );
    }

    #[test]
    fn placeholder_is_a_checkerboard() {
        let image = placeholder_image();
        assert_eq!(image.dimensions(), (PLACEHOLDER_SIZE, PLACEHOLDER_SIZE));
        assert_ne!(image.get_pixel(0, 0), image.get_pixel(1, 0));
        assert_eq!(image.get_pixel(0, 0), image.get_pixel(1, 1));
    }

    #[test]
    fn unreadable_image_reports_path() {
        let err = load_image(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.png"));
    }

    #[test]
    fn decoded_images_are_flipped_vertically() {
        let mut source = RgbaImage::new(1, 2);
        source.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        source.put_pixel(0, 1, image::Rgba([0, 0, 255, 255]));
        let path = std::env::temp_dir().join(format!("noisewarp-flip-{}.png", std::process::id()));
        source.save(&path).unwrap();

        let loaded = load_image(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded.get_pixel(0, 0), &image::Rgba([0, 0, 255, 255]));
    }
}
