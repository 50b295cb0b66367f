//! Final cleanup of an assembled shape.

use tracing::debug;

use crate::shape::{Shape, UniqueTable};

/// Point counts before and after [`compact`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compaction {
    pub points_before: usize,
    pub points_after: usize,
}

/// Merge coincident points and drop empty primitives and sub-objects.
///
/// Points are appended raw per mesh while assembling, so shared positions
/// between meshes (and between LOD levels) are only merged here. Vertices
/// that end up identical are merged too and triangles are rewritten to match.
pub fn compact(shape: &mut Shape) -> Compaction {
    let points_before = shape.points.len();

    let mut merged = UniqueTable::<3>::points();
    let remap = shape
        .points
        .iter()
        .map(|&point| merged.insert(point))
        .collect::<Vec<_>>();
    shape.points = merged.values().to_vec();

    let vertex_states = shape
        .prim_states
        .iter()
        .map(|state| state.vertex_state)
        .collect::<Vec<_>>();

    for control in &mut shape.lod_controls {
        for level in &mut control.levels {
            for sub_object in &mut level.sub_objects {
                sub_object.primitives.retain(|p| !p.triangles.is_empty());
                let moved = sub_object
                    .vertex_sets
                    .iter_mut()
                    .map(|set| set.remap_points(&remap))
                    .collect::<Vec<_>>();
                for primitive in &mut sub_object.primitives {
                    let moved = &moved[vertex_states[primitive.prim_state]];
                    for triangle in &mut primitive.triangles {
                        *triangle = triangle.map(|v| moved[v]);
                    }
                }
            }
            level.sub_objects.retain(|s| !s.primitives.is_empty());
        }
    }

    debug!("Points {points_before} -> {}", shape.points.len());
    Compaction {
        points_before,
        points_after: shape.points.len(),
    }
}
