use glam::{Vec2, Vec3};

use super::{LightMaterialColors, LoopTriangle, Lighting, Material, MaterialId, Mesh, Transparency};

/// Read access to evaluated mesh data.
///
/// The geometry assembler only talks to meshes through this trait so hosts can
/// feed their own mesh representations without copying into [`Mesh`].
pub trait MeshSource {
    fn positions(&self) -> &[Vec3];

    fn triangles(&self) -> &[LoopTriangle];

    /// Normal of the given corner of `tri`.
    fn loop_normal(&self, tri: &LoopTriangle, corner: usize) -> Vec3;

    /// Per-loop coordinates of the named UV layer.
    fn uv_layer(&self, name: &str) -> Option<&[Vec2]>;

    fn material_slots(&self) -> &[Option<MaterialId>];

    /// Raw value of the custom normals property, if any.
    fn normals_hint(&self) -> Option<&str>;

    /// Geometric normal from counter-clockwise winding.
    fn face_normal(&self, tri: &LoopTriangle) -> Vec3 {
        let positions = self.positions();
        let [a, b, c] = tri.vertices.map(|v| positions[v as usize]);
        (b - a).cross(c - a).normalize_or_zero()
    }
}

pub trait MaterialSource {
    fn name(&self) -> &str;

    fn transparency(&self) -> Transparency;

    fn lighting(&self) -> Lighting;

    fn texture_path(&self) -> Option<&str>;

    fn mip_bias(&self) -> f32;

    fn light_material(&self) -> Option<&LightMaterialColors> {
        None
    }
}

impl MeshSource for Mesh {
    fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    fn triangles(&self) -> &[LoopTriangle] {
        &self.triangles
    }

    fn loop_normal(&self, tri: &LoopTriangle, corner: usize) -> Vec3 {
        self.loop_normals
            .get(tri.loops[corner] as usize)
            .copied()
            .unwrap_or_else(|| self.face_normal(tri))
    }

    fn uv_layer(&self, name: &str) -> Option<&[Vec2]> {
        self.uv_layers
            .iter()
            .find(|layer| layer.name == name)
            .map(|layer| layer.uvs.as_slice())
    }

    fn material_slots(&self) -> &[Option<MaterialId>] {
        &self.material_slots
    }

    fn normals_hint(&self) -> Option<&str> {
        self.normals.as_deref()
    }
}

impl MaterialSource for Material {
    fn name(&self) -> &str {
        &self.name
    }

    fn transparency(&self) -> Transparency {
        self.transparency
    }

    fn lighting(&self) -> Lighting {
        self.lighting
    }

    fn texture_path(&self) -> Option<&str> {
        self.texture.as_deref()
    }

    fn mip_bias(&self) -> f32 {
        self.mip_bias
    }

    fn light_material(&self) -> Option<&LightMaterialColors> {
        self.light_material.as_ref()
    }
}
