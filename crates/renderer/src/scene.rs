use std::fmt;
use std::str::FromStr;

use glam::{Mat4, Vec3};

/// Fragment shader applied to a mesh. Every variant distorts the image UVs
/// with simplex noise; they differ only in how the offset is shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FragmentVariant {
    /// Noise-displaced UVs sampling the photo directly.
    #[default]
    Warp,
    /// Warp offset further by the scrolling noise texture.
    Drift,
    /// Radial ripple whose phase is perturbed by simplex noise.
    Ripple,
}

impl FragmentVariant {
    pub const ALL: [FragmentVariant; 3] = [
        FragmentVariant::Warp,
        FragmentVariant::Drift,
        FragmentVariant::Ripple,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FragmentVariant::Warp => "warp",
            FragmentVariant::Drift => "drift",
            FragmentVariant::Ripple => "ripple",
        }
    }
}

impl fmt::Display for FragmentVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FragmentVariant {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "warp" => Ok(FragmentVariant::Warp),
            "drift" => Ok(FragmentVariant::Drift),
            "ripple" => Ok(FragmentVariant::Ripple),
            other => Err(format!(
                "unknown variant '{other}'; expected warp, drift, or ripple"
            )),
        }
    }
}

/// Unit plane placed in the scene and shaded by one fragment variant.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub label: String,
    pub variant: FragmentVariant,
    pub offset: [f32; 3],
    pub size: [f32; 2],
}

impl Mesh {
    pub fn plane(label: impl Into<String>, variant: FragmentVariant) -> Self {
        Self {
            label: label.into(),
            variant,
            offset: [0.0; 3],
            size: [1.0, 1.0],
        }
    }

    pub fn model(&self) -> Mat4 {
        Mat4::from_translation(Vec3::from(self.offset))
            * Mat4::from_scale(Vec3::new(self.size[0], self.size[1], 1.0))
    }
}

/// Meshes rendered together. All of them read the same uniform set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scene {
    meshes: Vec<Mesh>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// One 1x1 plane in front of the camera.
    pub fn single(variant: FragmentVariant) -> Self {
        let mut scene = Self::new();
        scene.add(Mesh::plane(variant.label(), variant));
        scene
    }

    /// Three planes side by side, one per fragment variant.
    pub fn triple() -> Self {
        let mut scene = Self::new();
        for (index, variant) in FragmentVariant::ALL.into_iter().enumerate() {
            let mut mesh = Mesh::plane(variant.label(), variant);
            mesh.offset = [index as f32 - 1.0, 0.0, 0.0];
            mesh.size = [0.9, 0.9];
            scene.add(mesh);
        }
        scene
    }

    pub fn add(&mut self, mesh: Mesh) {
        self.meshes.push(mesh);
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Distinct variants in first-use order; one pipeline is built per entry.
    pub fn variants(&self) -> Vec<FragmentVariant> {
        let mut variants = Vec::new();
        for mesh in &self.meshes {
            if !variants.contains(&mesh.variant) {
                variants.push(mesh.variant);
            }
        }
        variants
    }
}

/// Right-handed perspective camera looking down -Z.
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    pub fov_y_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
}

impl PerspectiveCamera {
    pub fn new(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            fov_y_degrees,
            aspect,
            near,
            far,
            position: [0.0, 0.0, 2.0],
        }
    }

    /// 45 degree camera two units back from the origin.
    pub fn for_viewport(width: u32, height: u32) -> Self {
        Self::new(45.0, aspect_ratio(width, height), 0.1, 100.0)
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_degrees.to_radians(),
            self.aspect,
            self.near,
            self.far,
        )
    }

    pub fn view(&self) -> Mat4 {
        let eye = Vec3::from(self.position);
        Mat4::look_at_rh(eye, eye - Vec3::Z, Vec3::Y)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self::for_viewport(1, 1)
    }
}

fn aspect_ratio(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}

/// Anything whose output size follows the window.
pub trait ResizeTarget {
    fn set_output_size(&mut self, width: u32, height: u32);
}

/// Applies a window-size notification: the camera aspect becomes `width /
/// height` and the target output becomes `width x height`.
///
/// Zero-sized notifications (minimised windows) are ignored and return false.
pub fn apply_resize<T: ResizeTarget + ?Sized>(
    camera: &mut PerspectiveCamera,
    target: &mut T,
    width: u32,
    height: u32,
) -> bool {
    if width == 0 || height == 0 {
        tracing::debug!(width, height, "ignoring zero-sized resize");
        return false;
    }
    camera.set_aspect(aspect_ratio(width, height));
    target.set_output_size(width, height);
    true
}
