//! Conversion of mesh triangles into vertex sets and primitives.

use std::str::FromStr;

use glam::{Mat4, Vec3};
use tracing::{debug, warn};

use crate::error::{ExportError, ExportResult};
use crate::recognized::Recognized;
use crate::scene::{LoopTriangle, MaterialSource, MeshSource};
use crate::shape::{VERTEX_COLOUR_1, VERTEX_COLOUR_2, Vertex, to_shape_coords};

use super::ExportContext;

/// Name of the UV layer every textured mesh must carry.
pub const UV_LAYER: &str = "UVMap";

/// Progress is reported once per this many triangles.
pub const PROGRESS_INTERVAL: usize = 10;

/// How vertex normals are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalMode {
    /// Flat shading with the face normal.
    Face,
    /// The mesh's own split normals.
    Smooth,
    /// Radiating out from the object origin, for trees.
    Out,
    /// Straight up.
    Up,
    /// Smooth faces borrow the normals of adjacent flat faces so bevels
    /// look rounded.
    Fillet,
    /// Radiating out from a line below the object, for trackside vegetation.
    OutX,
}

impl FromStr for NormalMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UP" => Ok(NormalMode::Up),
            "OUT" => Ok(NormalMode::Out),
            "FILLET" => Ok(NormalMode::Fillet),
            "OUTX" => Ok(NormalMode::OutX),
            _ => Err(()),
        }
    }
}

fn normals_hint(mesh: &impl MeshSource, object: &str) -> Option<NormalMode> {
    let raw = mesh.normals_hint().filter(|hint| !hint.is_empty())?;
    match Recognized::<NormalMode>::parse(raw) {
        Recognized::Known(mode) => Some(mode),
        Recognized::Unknown(raw) => {
            warn!("Unknown NORMALS value {raw:?} on {object}, using face normals");
            None
        }
    }
}

/// Normal mode for one triangle once per-face smoothing is taken into account.
fn triangle_mode(hint: Option<NormalMode>, tri: &LoopTriangle) -> NormalMode {
    match hint {
        Some(NormalMode::Fillet) if tri.smooth => NormalMode::Fillet,
        Some(NormalMode::Fillet) => NormalMode::Face,
        Some(mode) => mode,
        None if tri.smooth => NormalMode::Smooth,
        None => NormalMode::Face,
    }
}

/// Per-vertex face normal of the last flat triangle touching each vertex.
fn fillet_normals(mesh: &impl MeshSource) -> Vec<Option<Vec3>> {
    let mut normals = vec![None; mesh.positions().len()];
    for tri in mesh.triangles().iter().filter(|tri| !tri.smooth) {
        let face = mesh.face_normal(tri);
        for v in tri.vertices {
            normals[v as usize] = Some(face);
        }
    }
    normals
}

impl ExportContext<'_> {
    /// Add a mesh to a distance level under the given hierarchy entry.
    ///
    /// `offset` places the mesh relative to the hierarchy entry; `world` places
    /// the entry itself in the scene and is only used for bounds.
    pub fn add_mesh(
        &mut self,
        level: usize,
        hierarchy_index: usize,
        object: &str,
        mesh: &impl MeshSource,
        offset: Mat4,
        world: Mat4,
    ) -> ExportResult<()> {
        let scene = self.scene;
        let triangles = mesh.triangles();
        debug!("{object}: {} triangles", triangles.len());

        let hint = normals_hint(mesh, object);
        let fillet = if hint == Some(NormalMode::Fillet) {
            fillet_normals(mesh)
        } else {
            Vec::new()
        };

        let point_offset = self.shape.points.len();
        let to_world = world * offset;
        for &position in mesh.positions() {
            self.shape
                .points
                .push(to_shape_coords(offset.transform_point3(position)));
            self.bounds.include(to_world.transform_point3(position));
        }

        let mut slots = Vec::with_capacity(mesh.material_slots().len());
        for (slot, material) in mesh.material_slots().iter().enumerate() {
            let material = material
                .map(|id| &scene.materials[id])
                .ok_or_else(|| ExportError::EmptyMaterialSlot {
                    object: object.to_string(),
                    slot,
                })?;
            slots.push((self.resolve_material(level, hierarchy_index, material), material));
        }

        let uvs = if slots.is_empty() {
            &[][..]
        } else {
            mesh.uv_layer(UV_LAYER)
                .ok_or_else(|| ExportError::MissingUvLayer {
                    object: object.to_string(),
                    layer: UV_LAYER.to_string(),
                })?
        };

        // Mirrored transforms turn the faces inside out; undo that.
        let winding = if offset.determinant() < 0.0 {
            [0, 1, 2]
        } else {
            [0, 2, 1]
        };

        if self.options.fast_export {
            self.shape.uv_points.reset();
            self.shape.normals.reset();
        }

        let max_sub_object = self.options.max_vertices_per_sub_object;
        let max_primitive = self.options.max_vertices_per_primitive;

        for (i, tri) in triangles.iter().enumerate() {
            if i % PROGRESS_INTERVAL == 0 {
                self.tick();
            }

            let slot_count = slots.len();
            let Some((state, material)) = slots.get_mut(tri.material_index) else {
                return Err(ExportError::MissingMaterial {
                    object: object.to_string(),
                    index: tri.material_index,
                    slots: slot_count,
                });
            };

            if self.level(level).sub_objects[state.sub_object].vertex_count() + 3 > max_sub_object {
                state.sub_object = self.split_sub_object(level, state.sub_object);
                state.primitive = self.append_primitive(level, state.sub_object, state.prim_state);
            }

            let primitive_triangles = self.level(level).sub_objects[state.sub_object].primitives
                [state.primitive]
                .triangles
                .len();
            if primitive_triangles * 3 + 3 > max_primitive {
                state.primitive = self.append_primitive(level, state.sub_object, state.prim_state);
            }

            let face = mesh.face_normal(tri);
            let mode = triangle_mode(hint, tri);
            let mut corners = [0usize; 3];
            for (corner, c) in corners.iter_mut().zip(winding) {
                let v = tri.vertices[c] as usize;
                let normal = match mode {
                    NormalMode::Out => offset.transform_vector3(mesh.positions()[v]),
                    NormalMode::Up => Vec3::Z,
                    NormalMode::OutX => {
                        let t = offset.w_axis;
                        Vec3::new(t.x - 4.0, 0.0, t.z + 12.0)
                    }
                    NormalMode::Smooth => offset.transform_vector3(mesh.loop_normal(tri, c)),
                    NormalMode::Fillet => offset.transform_vector3(
                        fillet[v].unwrap_or_else(|| mesh.loop_normal(tri, c)),
                    ),
                    NormalMode::Face => offset.transform_vector3(face),
                };
                let normal = self
                    .shape
                    .normals
                    .insert(to_shape_coords(normal.normalize_or_zero()));

                let uv = uvs[tri.loops[c] as usize];
                let uv = self.shape.uv_points.insert([uv.x, 1.0 - uv.y]);

                let point = point_offset + v;
                assert!(
                    point < self.shape.points.len(),
                    "point {point} out of range on {object}"
                );

                *corner = self.level_mut(level).sub_objects[state.sub_object].vertex_sets
                    [state.vertex_state]
                    .insert(Vertex {
                        point,
                        normal,
                        uv,
                        colour1: VERTEX_COLOUR_1,
                        colour2: VERTEX_COLOUR_2,
                    });
            }

            let face_normal = self
                .shape
                .normals
                .insert(to_shape_coords(offset.transform_vector3(face).normalize_or_zero()));

            let image = &self.shape.images[state.image];
            let primitive = &self.level(level).sub_objects[state.sub_object].primitives[state.primitive];
            if primitive.triangles.is_empty() {
                debug!(
                    "Draw {image} {} {} MipBias={}",
                    material.transparency(),
                    material.lighting(),
                    material.mip_bias()
                );
            }

            let primitive =
                &mut self.level_mut(level).sub_objects[state.sub_object].primitives[state.primitive];
            primitive.triangles.push(corners);
            primitive.normal_indices.push(face_normal);
        }

        Ok(())
    }
}
