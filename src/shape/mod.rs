//! In-memory form of an MSTS `.s` shape.
//!
//! Every table is a flat, append-only `Vec` owned by [`Shape`]. Entries refer to
//! each other by index only, which keeps the structure free of shared
//! ownership and maps one-to-one onto the blocks of the text format.

use std::collections::HashMap;

use glam::{Mat4, Vec3};

pub mod animation;
pub mod serialize;
pub mod unique;
pub mod writer;

pub use animation::{AnimNode, Animation, Controller, LinearKey, SlerpRot};
pub use unique::UniqueTable;

/// Vertex colours written for every vertex.
pub const VERTEX_COLOUR_1: u32 = 0xFFFF_FFFF;
pub const VERTEX_COLOUR_2: u32 = 0xFF00_0000;

/// Convert a scene (Z-up) vector into shape (Y-up) component order.
pub fn to_shape_coords(v: Vec3) -> [f32; 3] {
    [v.x, v.z, v.y]
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeSphere {
    pub center: [f32; 3],
    pub radius: f32,
}

/// A 4x3 transform as stored in the `matrices` block.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    pub label: String,
    /// Rows 1 to 3 are the basis, row 4 the translation.
    pub rows: [[f32; 3]; 4],
}

impl Matrix {
    /// Convert a scene transform, swapping the Y and Z axes on both sides.
    pub fn from_scene(label: impl Into<String>, m: &Mat4) -> Self {
        let (x, y, z, w) = (m.x_axis, m.y_axis, m.z_axis, m.w_axis);
        Self {
            label: label.into(),
            rows: [
                [x.x, x.z, x.y],
                [z.x, z.z, z.y],
                [y.x, y.z, y.y],
                [w.x, w.z, w.y],
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub image: usize,
    pub filter: usize,
    pub mip_bias: f32,
}

/// A UV transform applied by a light config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UvOp {
    Copy {
        texture_address_mode: u32,
        source_uv_index: u32,
    },
    ReflectMapFull {
        texture_address_mode: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightConfig {
    pub uv_ops: Vec<UvOp>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexState {
    pub flags: u32,
    pub matrix: usize,
    /// Negative values select one of the renderer's predefined light materials.
    pub light_material: i32,
    pub light_config: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimState {
    pub label: String,
    pub shader: usize,
    pub textures: Vec<usize>,
    pub z_bias: f32,
    pub vertex_state: usize,
    pub alpha_test_mode: u32,
    pub light_config: usize,
    pub z_buffer_mode: u32,
}

impl PrimState {
    /// Whether two states would render identically, ignoring the label.
    pub fn same_state(&self, other: &PrimState) -> bool {
        self.shader == other.shader
            && self.textures == other.textures
            && self.z_bias == other.z_bias
            && self.vertex_state == other.vertex_state
            && self.alpha_test_mode == other.alpha_test_mode
            && self.light_config == other.light_config
            && self.z_buffer_mode == other.z_buffer_mode
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vertex {
    pub point: usize,
    pub normal: usize,
    pub uv: usize,
    pub colour1: u32,
    pub colour2: u32,
}

/// Vertices of one sub-object that share a vertex state.
#[derive(Debug, Clone, Default)]
pub struct VertexSet {
    vertices: Vec<Vertex>,
    by_point: HashMap<usize, Vec<usize>>,
}

impl VertexSet {
    /// Index of an identical vertex in this set, appending `vertex` if there is none.
    pub fn insert(&mut self, vertex: Vertex) -> usize {
        let candidates = self.by_point.entry(vertex.point).or_default();
        if let Some(&existing) = candidates
            .iter()
            .find(|&&i| self.vertices[i] == vertex)
        {
            return existing;
        }

        let idx = self.vertices.len();
        candidates.push(idx);
        self.vertices.push(vertex);
        idx
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Rewrite every vertex's point index through `remap`, merging vertices
    /// that become identical. Returns the new index of every old vertex.
    pub fn remap_points(&mut self, remap: &[usize]) -> Vec<usize> {
        let old = std::mem::take(&mut self.vertices);
        self.by_point.clear();
        old.into_iter()
            .map(|vertex| {
                self.insert(Vertex {
                    point: remap[vertex.point],
                    ..vertex
                })
            })
            .collect()
    }
}

/// One draw call.
#[derive(Debug, Clone, Default)]
pub struct Primitive {
    pub prim_state: usize,
    /// Vertex indices into the vertex set of the prim state's vertex state.
    pub triangles: Vec<[usize; 3]>,
    /// One face normal per triangle.
    pub normal_indices: Vec<usize>,
}

impl Primitive {
    pub fn new(prim_state: usize) -> Self {
        Self {
            prim_state,
            ..Default::default()
        }
    }
}

/// The leading fields of `sub_object_header`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubObjectFlags {
    pub flags: u32,
    pub sort_vector: i32,
    pub volume: i32,
    pub source_vertex_format: u32,
    pub destination_vertex_format: u32,
}

#[derive(Debug, Clone)]
pub struct SubObject {
    pub flags: SubObjectFlags,
    /// Draw order within a distance level; blended geometry sorts last.
    pub priority: i32,
    pub hierarchy_index: usize,
    /// One slot per entry of [`Shape::vertex_states`].
    pub vertex_sets: Vec<VertexSet>,
    pub primitives: Vec<Primitive>,
}

impl SubObject {
    pub fn new(
        flags: SubObjectFlags,
        priority: i32,
        hierarchy_index: usize,
        vertex_state_count: usize,
    ) -> Self {
        Self {
            flags,
            priority,
            hierarchy_index,
            vertex_sets: vec![VertexSet::default(); vertex_state_count],
            primitives: Vec::new(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_sets.iter().map(VertexSet::len).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.primitives.iter().map(|p| p.triangles.len()).sum()
    }
}

#[derive(Debug, Clone)]
pub struct DistanceLevel {
    /// Distance in metres up to which this level is drawn.
    pub selection: u32,
    pub hierarchy: Vec<i32>,
    pub sub_objects: Vec<SubObject>,
}

impl DistanceLevel {
    pub fn triangle_count(&self) -> usize {
        self.sub_objects.iter().map(SubObject::triangle_count).sum()
    }

    pub fn primitive_count(&self) -> usize {
        self.sub_objects.iter().map(|s| s.primitives.len()).sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct LodControl {
    pub levels: Vec<DistanceLevel>,
}

/// The complete shape, built fresh for every export.
#[derive(Debug, Clone)]
pub struct Shape {
    pub volumes: Vec<VolumeSphere>,
    pub shader_names: Vec<String>,
    pub filter_names: Vec<String>,
    pub points: Vec<[f32; 3]>,
    pub uv_points: UniqueTable<2>,
    pub normals: UniqueTable<3>,
    /// ARGB in `0.0..=1.0`.
    pub colours: UniqueTable<4>,
    pub matrices: Vec<Matrix>,
    pub images: Vec<String>,
    pub textures: Vec<Texture>,
    pub light_materials: UniqueTable<5>,
    pub light_configs: Vec<LightConfig>,
    pub vertex_states: Vec<VertexState>,
    pub prim_states: Vec<PrimState>,
    pub lod_controls: Vec<LodControl>,
    pub animations: Vec<Animation>,
}

impl Shape {
    /// `resetting` enables the uniquing tables' index reset (see [`UniqueTable::resetting`]).
    pub fn new(resetting: bool) -> Self {
        Self {
            volumes: Vec::new(),
            shader_names: Vec::new(),
            filter_names: Vec::new(),
            points: Vec::new(),
            uv_points: UniqueTable::uv_points().resetting(resetting),
            normals: UniqueTable::normals().resetting(resetting),
            colours: UniqueTable::colours().resetting(resetting),
            matrices: Vec::new(),
            images: Vec::new(),
            textures: Vec::new(),
            light_materials: UniqueTable::light_materials().resetting(resetting),
            light_configs: Vec::new(),
            vertex_states: Vec::new(),
            prim_states: Vec::new(),
            lod_controls: Vec::new(),
            animations: Vec::new(),
        }
    }

    pub fn shader_index(&mut self, name: &str) -> usize {
        intern(&mut self.shader_names, name)
    }

    pub fn filter_index(&mut self, name: &str) -> usize {
        intern(&mut self.filter_names, name)
    }

    pub fn image_index(&mut self, name: &str) -> usize {
        intern(&mut self.images, name)
    }

    pub fn texture_index(&mut self, image: usize, filter: usize, mip_bias: f32) -> usize {
        let texture = Texture {
            image,
            filter,
            mip_bias,
        };
        match self.textures.iter().position(|t| *t == texture) {
            Some(idx) => idx,
            None => {
                self.textures.push(texture);
                self.textures.len() - 1
            }
        }
    }

    pub fn light_config_index(&mut self, config: LightConfig) -> usize {
        match self.light_configs.iter().position(|c| *c == config) {
            Some(idx) => idx,
            None => {
                self.light_configs.push(config);
                self.light_configs.len() - 1
            }
        }
    }

    /// Distance levels of the (single) LOD control.
    pub fn levels(&self) -> &[DistanceLevel] {
        self.lod_controls
            .first()
            .map(|control| control.levels.as_slice())
            .unwrap_or_default()
    }
}

fn intern(names: &mut Vec<String>, name: &str) -> usize {
    match names.iter().position(|n| n == name) {
        Some(idx) => idx,
        None => {
            names.push(name.to_string());
            names.len() - 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_swaps_y_and_z() {
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let matrix = Matrix::from_scene("MAIN", &m);
        assert_eq!(matrix.rows[3], [1.0, 3.0, 2.0]);
        assert_eq!(matrix.rows[0], [1.0, 0.0, 0.0]);
        assert_eq!(matrix.rows[1], [0.0, 1.0, 0.0]);
        assert_eq!(matrix.rows[2], [0.0, 0.0, 1.0]);

        // A 90 degree turn about scene Z becomes a turn about shape Y.
        let turn = Mat4::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let rows = Matrix::from_scene("r", &turn).rows;
        assert!((rows[0][2] - 1.0).abs() < 1e-6);
        assert!((rows[1][1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn vertex_set_dedups_exact_matches() {
        let mut set = VertexSet::default();
        let v = Vertex {
            point: 3,
            normal: 0,
            uv: 1,
            colour1: VERTEX_COLOUR_1,
            colour2: VERTEX_COLOUR_2,
        };
        assert_eq!(set.insert(v), 0);
        assert_eq!(set.insert(Vertex { uv: 2, ..v }), 1);
        assert_eq!(set.insert(v), 0);

        assert_eq!(set.remap_points(&[0, 0, 0, 7]), vec![0, 1]);
        assert_eq!(set.vertices()[1].point, 7);
        assert_eq!(set.insert(Vertex { point: 7, ..v }), 0);

        set.insert(Vertex { point: 5, ..v });
        assert_eq!(set.remap_points(&[0, 0, 0, 0, 0, 7, 0, 7]), vec![0, 1, 0]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn interned_names_are_shared() {
        let mut shape = Shape::new(false);
        let a = shape.shader_index("TexDiff");
        let b = shape.shader_index("BlendATexDiff");
        assert_eq!(shape.shader_index("TexDiff"), a);
        assert_ne!(a, b);
        assert!(shape.levels().is_empty());
    }
}
