use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::scene::Mesh;
use crate::uniforms::{scalar_slot, UniformSet, MAX_SCALAR_UNIFORMS};

pub(crate) const SCALAR_SLOTS: usize = MAX_SCALAR_UNIFORMS / 4;

/// std140 image of the `WarpParams` block declared by the fragment header.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct ScalarBlock {
    pub slots: [[f32; 4]; SCALAR_SLOTS],
}

impl ScalarBlock {
    /// Packs scalars in registration order, matching the `#define`s emitted by
    /// `compile::wrap_fragment`.
    pub fn pack(uniforms: &UniformSet) -> Self {
        let mut block = Self::zeroed();
        for (index, (_, value)) in uniforms.scalars().enumerate() {
            let (slot, component) = scalar_slot(index);
            if let Some(lane) = block.slots.get_mut(slot) {
                lane[component] = value;
            }
        }
        block
    }
}

/// Per-mesh vertex stage input.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct MeshUniforms {
    pub mvp: [[f32; 4]; 4],
}

impl MeshUniforms {
    pub fn new(view_projection: Mat4, mesh: &Mesh) -> Self {
        Self {
            mvp: (view_projection * mesh.model()).to_cols_array_2d(),
        }
    }
}
