//! Serialization of a [`Shape`] into `.s` text.
//!
//! Block order, nesting and indentation follow what the MSTS tools and
//! OpenRails expect. Counts are always derived from the emitted items.

use std::collections::BTreeSet;
use std::io;

use itertools::Itertools;

use super::writer::{Num, Rounded, StfWriter, stf, stfln};
use super::{
    Animation, Controller, DistanceLevel, LightConfig, LodControl, Matrix, PrimState, Primitive,
    Shape, SubObject, UvOp,
};

pub const HEADER: &str = "SIMISA@@@@@@@@@@JINX0s1t______";

/// Index lists break onto a new line after this many entries.
const ITEMS_PER_LINE: usize = 101;

/// Encode `shape` as a complete `.s` file.
pub fn to_bytes(shape: &Shape) -> io::Result<Vec<u8>> {
    let mut w = StfWriter::new(Vec::new())?;
    write_shape(shape, &mut w)?;
    Ok(w.into_inner())
}

pub fn write_shape<W: io::Write>(shape: &Shape, w: &mut StfWriter<W>) -> io::Result<()> {
    stfln!(w, "{HEADER}")?;
    stfln!(w)?;
    stfln!(w, "shape (")?;
    stfln!(w, "    shape_header ( 00000000 00000000 )")?;

    stfln!(w, "    volumes ( {}", shape.volumes.len())?;
    for volume in &shape.volumes {
        let [x, y, z] = volume.center;
        stfln!(w, "        vol_sphere (")?;
        stfln!(
            w,
            "            vector ( {} {} {} ) {}",
            Num(x),
            Num(y),
            Num(z),
            Num(volume.radius)
        )?;
        stfln!(w, "        )")?;
    }
    stfln!(w, "    )")?;

    stfln!(w, "    shader_names ( {}", shape.shader_names.len())?;
    for name in &shape.shader_names {
        stfln!(w, "        named_shader ( {name} )")?;
    }
    stfln!(w, "    )")?;

    stfln!(w, "    texture_filter_names ( {}", shape.filter_names.len())?;
    for name in &shape.filter_names {
        stfln!(w, "        named_filter_mode ( {name} )")?;
    }
    stfln!(w, "    )")?;

    stfln!(w, "    points ( {}", shape.points.len())?;
    for &[x, y, z] in &shape.points {
        stfln!(w, "        point ( {} {} {} )", r6(x), r6(y), r6(z))?;
    }
    stfln!(w, "    )")?;

    stfln!(w, "    uv_points ( {}", shape.uv_points.len())?;
    for &[u, v] in shape.uv_points.values() {
        stfln!(w, "        uv_point ( {} {} )", r6(u), r6(v))?;
    }
    stfln!(w, "    )")?;

    stfln!(w, "    normals ( {}", shape.normals.len())?;
    for &[x, y, z] in shape.normals.values() {
        stfln!(w, "        vector ( {} {} {} )", r6(x), r6(y), r6(z))?;
    }
    stfln!(w, "    )")?;

    stfln!(w, "    sort_vectors ( 1")?;
    stfln!(w, "    \tvector ( 0 0 0 )")?;
    stfln!(w, "    )")?;

    stfln!(w, "    colours ( {}", shape.colours.len())?;
    for &[a, r, g, b] in shape.colours.values() {
        stfln!(w, "        colour ( {} {} {} {} )", Num(a), Num(r), Num(g), Num(b))?;
    }
    stfln!(w, "    )")?;

    stfln!(w, "    matrices ( {}", shape.matrices.len())?;
    for matrix in &shape.matrices {
        write_matrix(matrix, w)?;
    }
    stfln!(w, "    )")?;

    stfln!(w, "    images ( {}", shape.images.len())?;
    for image in &shape.images {
        if image.contains(' ') {
            stfln!(w, "        image ( \"{image}\" )")?;
        } else {
            stfln!(w, "        image ( {image} )")?;
        }
    }
    stfln!(w, "    )")?;

    stfln!(w, "    textures ( {}", shape.textures.len())?;
    for texture in &shape.textures {
        stfln!(
            w,
            "        texture ( {} {} {} ff000000 )",
            texture.image,
            texture.filter,
            Num(texture.mip_bias)
        )?;
    }
    stfln!(w, "    )")?;

    stfln!(w, "    light_materials ( {}", shape.light_materials.len())?;
    for &[diffuse, ambient, specular, emissive, power] in shape.light_materials.values() {
        stfln!(
            w,
            "        light_material ( 00000000 {} {} {} {} {} )",
            diffuse as i64,
            ambient as i64,
            specular as i64,
            emissive as i64,
            Num(power)
        )?;
    }
    stfln!(w, "    )")?;

    stfln!(w, "    light_model_cfgs ( {}", shape.light_configs.len())?;
    for config in &shape.light_configs {
        write_light_config(config, w)?;
    }
    stfln!(w, "    )")?;

    stfln!(w, "    vtx_states ( {}", shape.vertex_states.len())?;
    for state in &shape.vertex_states {
        stfln!(
            w,
            "        vtx_state ( {:08X} {} {} {} 00000002 )",
            state.flags,
            state.matrix,
            state.light_material,
            state.light_config
        )?;
    }
    stfln!(w, "    )")?;

    stfln!(w, "    prim_states ( {}", shape.prim_states.len())?;
    for state in &shape.prim_states {
        write_prim_state(state, w)?;
    }
    stfln!(w, "    )")?;

    stfln!(w, "    lod_controls ( {}", shape.lod_controls.len())?;
    for control in &shape.lod_controls {
        write_lod_control(shape, control, w)?;
    }
    stfln!(w, "    )")?;

    // Readers choke on an empty animations block, so it is left out entirely.
    if !shape.animations.is_empty() {
        stfln!(w, "    animations ( {}", shape.animations.len())?;
        for animation in &shape.animations {
            write_animation(animation, w)?;
        }
        stfln!(w, "    )")?;
    }

    stfln!(w, ")")
}

fn r6(value: f32) -> Rounded {
    Rounded::new(value, 6)
}

fn r8(value: f32) -> Rounded {
    Rounded::new(value, 8)
}

fn write_matrix<W: io::Write>(matrix: &Matrix, w: &mut StfWriter<W>) -> io::Result<()> {
    let values = matrix.rows.iter().flatten().map(|&v| Num(v)).join(" ");
    stfln!(w, "        matrix {} ( {values} )", matrix.label)
}

fn write_light_config<W: io::Write>(config: &LightConfig, w: &mut StfWriter<W>) -> io::Result<()> {
    stfln!(w, "\t\tlight_model_cfg ( 00000000")?;
    stfln!(w, "\t\t\tuv_ops ( {}", config.uv_ops.len())?;
    for op in &config.uv_ops {
        match *op {
            UvOp::Copy {
                texture_address_mode,
                source_uv_index,
            } => stfln!(
                w,
                "                uv_op_copy ( {texture_address_mode} {source_uv_index} )"
            )?,
            UvOp::ReflectMapFull {
                texture_address_mode,
            } => stfln!(w, "                uv_op_reflectmapfull ( {texture_address_mode} )")?,
        }
    }
    stfln!(w, "\t\t\t)")?;
    stfln!(w, "\t\t)")
}

fn write_prim_state<W: io::Write>(state: &PrimState, w: &mut StfWriter<W>) -> io::Result<()> {
    stfln!(w, "        prim_state {} ( 00000000 {}", state.label, state.shader)?;
    stf!(w, "            tex_idxs ( {}", state.textures.len())?;
    for texture in &state.textures {
        stf!(w, " {texture}")?;
    }
    stfln!(
        w,
        " ) {} {} {} {} {}",
        Num(state.z_bias),
        state.vertex_state,
        state.alpha_test_mode,
        state.light_config,
        state.z_buffer_mode
    )?;
    stfln!(w, "        )")
}

fn write_lod_control<W: io::Write>(
    shape: &Shape,
    control: &LodControl,
    w: &mut StfWriter<W>,
) -> io::Result<()> {
    stfln!(w, "        lod_control (")?;
    stfln!(w, "            distance_levels_header ( 0 )")?;
    stfln!(w, "            distance_levels ( {}", control.levels.len())?;
    for level in &control.levels {
        write_distance_level(shape, level, w)?;
    }
    stfln!(w, "            )")?;
    stfln!(w, "        )")
}

fn write_distance_level<W: io::Write>(
    shape: &Shape,
    level: &DistanceLevel,
    w: &mut StfWriter<W>,
) -> io::Result<()> {
    stfln!(w, "                distance_level (")?;
    stfln!(w, "                    distance_level_header (")?;
    stfln!(w, "                        dlevel_selection ( {} )", level.selection)?;
    stf!(w, "                        hierarchy ( {} ", level.hierarchy.len())?;
    for parent in &level.hierarchy {
        stf!(w, "{parent} ")?;
    }
    stfln!(w, ")")?;
    stfln!(w, "                    )")?;

    stfln!(w, "                    sub_objects ( {}", level.sub_objects.len())?;
    for sub_object in &level.sub_objects {
        write_sub_object(shape, sub_object, w)?;
    }
    stfln!(w, "                    )")?;
    stfln!(w, "                )")
}

/// Per-matrix statistics gathered for `geometry_info`.
#[derive(Default, Clone)]
struct MatrixGeometry {
    primitives: usize,
    triangles: usize,
    vertex_states: BTreeSet<usize>,
}

fn write_sub_object<W: io::Write>(
    shape: &Shape,
    sub_object: &SubObject,
    w: &mut StfWriter<W>,
) -> io::Result<()> {
    stfln!(w, "                        sub_object (")?;
    write_sub_object_header(shape, sub_object, w)?;

    // Vertex sets are written back to back; remember where each one starts.
    let starts = sub_object
        .vertex_sets
        .iter()
        .scan(0, |next, set| {
            let start = *next;
            *next += set.len();
            Some(start)
        })
        .collect::<Vec<_>>();

    stfln!(w, "                            vertices ( {}", sub_object.vertex_count())?;
    for vertex in sub_object.vertex_sets.iter().flat_map(|set| set.vertices()) {
        stfln!(
            w,
            "                                vertex ( 00000000 {} {} {:08X} {:08X}",
            vertex.point,
            vertex.normal,
            vertex.colour1,
            vertex.colour2
        )?;
        stfln!(w, "                                    vertex_uvs ( 1 {} )", vertex.uv)?;
        stfln!(w, "                                )")?;
    }
    stfln!(w, "                            )")?;

    let used_sets = sub_object
        .vertex_sets
        .iter()
        .enumerate()
        .filter(|(_, set)| !set.is_empty())
        .collect::<Vec<_>>();
    stfln!(w, "                            vertex_sets ( {}", used_sets.len())?;
    for (idx, set) in used_sets {
        stfln!(
            w,
            "                                vertex_set ( {idx} {} {} )",
            starts[idx],
            set.len()
        )?;
    }
    stfln!(w, "                            )")?;

    let state_changes = sub_object
        .primitives
        .iter()
        .map(|p| p.prim_state)
        .dedup()
        .count();
    stfln!(
        w,
        "                            primitives ( {}",
        sub_object.primitives.len() + state_changes
    )?;
    let mut current_state = None;
    for primitive in &sub_object.primitives {
        if current_state != Some(primitive.prim_state) {
            current_state = Some(primitive.prim_state);
            stfln!(w, "                                prim_state_idx ( {} )", primitive.prim_state)?;
        }
        let vertex_state = shape.prim_states[primitive.prim_state].vertex_state;
        write_primitive(primitive, starts[vertex_state], w)?;
    }
    stfln!(w, "                            )")?;

    stfln!(w, "                        )")
}

fn write_sub_object_header<W: io::Write>(
    shape: &Shape,
    sub_object: &SubObject,
    w: &mut StfWriter<W>,
) -> io::Result<()> {
    let flags = &sub_object.flags;
    stfln!(
        w,
        "                            sub_object_header ( {:08x} {} {} {:08x} {:08x}",
        flags.flags,
        flags.sort_vector,
        flags.volume,
        flags.source_vertex_format,
        flags.destination_vertex_format
    )?;

    let mut per_matrix = vec![MatrixGeometry::default(); shape.matrices.len()];
    for primitive in &sub_object.primitives {
        let prim_state = &shape.prim_states[primitive.prim_state];
        let matrix = shape.vertex_states[prim_state.vertex_state].matrix;
        let info = &mut per_matrix[matrix];
        info.primitives += 1;
        info.triangles += primitive.triangles.len();
        info.vertex_states.insert(prim_state.vertex_state);
    }

    let triangles = sub_object.triangle_count();
    let used_sets = sub_object.vertex_sets.iter().filter(|s| !s.is_empty()).count();
    stfln!(
        w,
        "                                geometry_info ( {triangles} {used_sets} 0 {} 0 0 {} 0 0 0",
        triangles * 3,
        sub_object.primitives.len()
    )?;

    let node_count = per_matrix.iter().filter(|info| info.primitives > 0).count();
    stfln!(w, "                                    geometry_nodes ( {node_count}")?;
    let mut node_map = Vec::with_capacity(per_matrix.len());
    let mut next_node = 0i64;
    for info in &per_matrix {
        if info.primitives == 0 {
            node_map.push(-1);
            continue;
        }
        stfln!(
            w,
            "                                        geometry_node ( {} 0 0 0 0",
            info.vertex_states.len()
        )?;
        stfln!(
            w,
            "                                            cullable_prims ( {} {} {} )",
            info.primitives,
            info.triangles,
            info.triangles * 3
        )?;
        stfln!(w, "                                        )")?;
        node_map.push(next_node);
        next_node += 1;
    }
    stfln!(w, "                                    )")?;

    stf!(w, "                                    geometry_node_map ( {} ", node_map.len())?;
    for node in node_map {
        stf!(w, "{node} ")?;
    }
    stfln!(w, ")")?;
    stfln!(w, "                                )")?;

    let shaders = sub_object
        .primitives
        .iter()
        .map(|p| shape.prim_states[p.prim_state].shader)
        .collect::<BTreeSet<_>>();
    stf!(w, "                                subobject_shaders ( {} ", shaders.len())?;
    for shader in shaders {
        stf!(w, "{shader} ")?;
    }
    stfln!(w, ")")?;

    let light_configs = sub_object
        .primitives
        .iter()
        .map(|p| shape.prim_states[p.prim_state].light_config)
        .collect::<BTreeSet<_>>();
    stf!(w, "                                subobject_light_cfgs ( {} ", light_configs.len())?;
    for config in light_configs {
        stf!(w, "{config} ")?;
    }
    // Trailing sub-object id.
    stfln!(w, ") 0")?;
    stfln!(w, "                            )")
}

/// Writes `items` space-separated, wrapping long lists.
fn write_wrapped<W: io::Write, I: std::fmt::Display>(
    items: impl IntoIterator<Item = I>,
    w: &mut StfWriter<W>,
) -> io::Result<()> {
    for (i, item) in items.into_iter().enumerate() {
        stf!(w, "{item} ")?;
        if (i + 1) % ITEMS_PER_LINE == 0 {
            stfln!(w)?;
            stf!(w, "                                    ")?;
        }
    }
    stfln!(w, ")")
}

fn write_primitive<W: io::Write>(
    primitive: &Primitive,
    vertex_offset: usize,
    w: &mut StfWriter<W>,
) -> io::Result<()> {
    let triangles = primitive.triangles.len();
    stfln!(w, "                                indexed_trilist (")?;

    stf!(w, "                                    vertex_idxs ( {} ", triangles * 3)?;
    write_wrapped(
        primitive.triangles.iter().flatten().map(|&v| v + vertex_offset),
        w,
    )?;

    stf!(w, "                                    normal_idxs ( {triangles} ")?;
    write_wrapped(
        primitive.normal_indices.iter().map(|n| format!("{n} 3")),
        w,
    )?;

    stf!(w, "                                    flags ( {triangles} ")?;
    write_wrapped(primitive.normal_indices.iter().map(|_| "00000000"), w)?;

    stfln!(w, "                                )")
}

fn write_animation<W: io::Write>(animation: &Animation, w: &mut StfWriter<W>) -> io::Result<()> {
    stfln!(
        w,
        "        animation ( {} {}",
        animation.frame_count,
        animation.frame_rate
    )?;
    stfln!(w, "            anim_nodes ( {}", animation.nodes.len())?;
    for node in &animation.nodes {
        stfln!(w, "                anim_node {} (", node.label)?;
        stfln!(w, "                    controllers ( {}", node.controllers.len())?;
        for controller in &node.controllers {
            match controller {
                Controller::Rotation(keys) => {
                    stfln!(w, "                     tcb_rot ( {}", keys.len())?;
                    for key in keys {
                        stfln!(
                            w,
                            "                            slerp_rot ( {} {} {} {} {} )",
                            key.frame as i64,
                            r8(key.x),
                            r8(key.y),
                            r8(key.z),
                            r8(key.w)
                        )?;
                    }
                }
                Controller::Position(keys) => {
                    stfln!(w, "                     linear_pos ( {}", keys.len())?;
                    for key in keys {
                        stfln!(
                            w,
                            "                            linear_key ( {} {} {} {} )",
                            key.frame as i64,
                            r8(key.x),
                            r8(key.y),
                            r8(key.z)
                        )?;
                    }
                }
            }
            stfln!(w, "                     )")?;
        }
        stfln!(w, "                    )")?;
        stfln!(w, "                )")?;
    }
    stfln!(w, "            )")?;
    stfln!(w, "        )")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{
        AnimNode, LinearKey, Primitive, SlerpRot, SubObjectFlags, Vertex, VertexState,
        VolumeSphere, VERTEX_COLOUR_1, VERTEX_COLOUR_2,
    };
    use glam::Mat4;

    fn decode(bytes: &[u8]) -> String {
        let units = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect::<Vec<_>>();
        String::from_utf16(&units).unwrap()
    }

    /// A single-triangle shape with one hierarchy node.
    fn triangle_shape() -> Shape {
        let mut shape = Shape::new(false);
        shape.volumes.push(VolumeSphere {
            center: [0.0; 3],
            radius: 1.5,
        });
        let shader = shape.shader_index("TexDiff");
        let filter = shape.filter_index("MipLinear");
        shape.points.extend([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]);
        let uvs = [[0.0, 1.0], [1.0, 1.0], [0.0, 0.0]].map(|uv| shape.uv_points.insert(uv));
        let normal = shape.normals.insert([0.0, 1.0, 0.0]);
        shape.matrices.push(Matrix::from_scene("MAIN", &Mat4::IDENTITY));
        let image = shape.image_index("blank texture.ace");
        let texture = shape.texture_index(image, filter, 0.0);
        let light_config = shape.light_config_index(LightConfig {
            uv_ops: vec![UvOp::Copy {
                texture_address_mode: 1,
                source_uv_index: 0,
            }],
        });
        shape.vertex_states.push(VertexState {
            flags: 0,
            matrix: 0,
            light_material: -5,
            light_config,
        });
        shape.prim_states.push(PrimState {
            label: "MAIN_blank".to_string(),
            shader,
            textures: vec![texture],
            z_bias: 0.0,
            vertex_state: 0,
            alpha_test_mode: 0,
            light_config,
            z_buffer_mode: 1,
        });

        let mut sub_object = SubObject::new(
            SubObjectFlags {
                flags: 0x400,
                sort_vector: -1,
                volume: -1,
                source_vertex_format: 0x1d2,
                destination_vertex_format: 0x1c4,
            },
            0,
            0,
            1,
        );
        let corners = [0, 1, 2].map(|i| {
            sub_object.vertex_sets[0].insert(Vertex {
                point: i,
                normal,
                uv: uvs[i],
                colour1: VERTEX_COLOUR_1,
                colour2: VERTEX_COLOUR_2,
            })
        });
        let mut primitive = Primitive::new(0);
        primitive.triangles.push(corners);
        primitive.normal_indices.push(normal);
        sub_object.primitives.push(primitive);

        shape.lod_controls.push(LodControl {
            levels: vec![DistanceLevel {
                selection: 2000,
                hierarchy: vec![-1],
                sub_objects: vec![sub_object],
            }],
        });
        shape
    }

    #[test]
    fn writes_header_and_block_counts() {
        let text = decode(&to_bytes(&triangle_shape()).unwrap());
        let lines = text.split("\r\n").collect::<Vec<_>>();

        assert_eq!(lines[0], HEADER);
        assert_eq!(lines[1], "");
        assert_eq!(lines[2], "shape (");
        assert_eq!(lines[3], "    shape_header ( 00000000 00000000 )");
        assert!(text.contains("            vector ( 0 0 0 ) 1.5\r\n"));
        assert!(text.contains("    points ( 3\r\n        point ( 0 0 0 )\r\n"));
        assert!(text.contains("    uv_points ( 3\r\n"));
        assert!(text.contains("        matrix MAIN ( 1 0 0 0 1 0 0 0 1 0 0 0 )\r\n"));
        assert!(text.contains("        image ( \"blank texture.ace\" )\r\n"));
        assert!(text.contains("        texture ( 0 0 0 ff000000 )\r\n"));
        assert!(text.contains("                uv_op_copy ( 1 0 )\r\n"));
        assert!(text.contains("        vtx_state ( 00000000 0 -5 0 00000002 )\r\n"));
        assert!(text.contains("            tex_idxs ( 1 0 ) 0 0 0 0 1\r\n"));
        assert!(text.contains("                        hierarchy ( 1 -1 )\r\n"));
        assert!(text.ends_with(")\r\n"));
        assert!(!text.contains("animations"));
        // Every line ends with CRLF; no bare LF sneaks in.
        assert_eq!(text.matches('\n').count(), text.matches("\r\n").count());
    }

    #[test]
    fn writes_sub_object_geometry_info() {
        let text = decode(&to_bytes(&triangle_shape()).unwrap());

        assert!(text.contains(
            "                            sub_object_header ( 00000400 -1 -1 000001d2 000001c4\r\n"
        ));
        assert!(text.contains("geometry_info ( 1 1 0 3 0 0 1 0 0 0\r\n"));
        assert!(text.contains("geometry_nodes ( 1\r\n"));
        assert!(text.contains("cullable_prims ( 1 1 3 )\r\n"));
        assert!(text.contains("geometry_node_map ( 1 0 )\r\n"));
        assert!(text.contains("subobject_shaders ( 1 0 )\r\n"));
        assert!(text.contains("subobject_light_cfgs ( 1 0 ) 0\r\n"));
        assert!(text.contains("vertex ( 00000000 2 0 FFFFFFFF FF000000\r\n"));
        assert!(text.contains("vertex_set ( 0 0 3 )\r\n"));
        assert!(text.contains("primitives ( 2\r\n"));
        assert!(text.contains("prim_state_idx ( 0 )\r\n"));
        assert!(text.contains("vertex_idxs ( 3 0 1 2 )\r\n"));
        assert!(text.contains("normal_idxs ( 1 0 3 )\r\n"));
        assert!(text.contains("flags ( 1 00000000 )\r\n"));
    }

    #[test]
    fn vertex_indices_offset_by_set_start() {
        let mut shape = triangle_shape();
        shape.vertex_states.push(VertexState {
            flags: 0,
            matrix: 0,
            light_material: -8,
            light_config: 0,
        });
        let mut second = shape.prim_states[0].clone();
        second.vertex_state = 1;
        shape.prim_states.push(second);

        let sub_object = &mut shape.lod_controls[0].levels[0].sub_objects[0];
        sub_object.vertex_sets.push(Default::default());
        let corners = [0, 1, 2].map(|i| {
            sub_object.vertex_sets[1].insert(Vertex {
                point: i,
                normal: 0,
                uv: 0,
                colour1: VERTEX_COLOUR_1,
                colour2: VERTEX_COLOUR_2,
            })
        });
        let mut primitive = Primitive::new(1);
        primitive.triangles.push(corners);
        primitive.normal_indices.push(0);
        sub_object.primitives.push(primitive);

        let text = decode(&to_bytes(&shape).unwrap());
        assert!(text.contains("vertex_set ( 1 3 3 )\r\n"));
        assert!(text.contains("vertex_idxs ( 3 3 4 5 )\r\n"));
        assert!(text.contains("primitives ( 4\r\n"));
        assert!(text.contains("geometry_node ( 2 0 0 0 0\r\n"));
    }

    #[test]
    fn long_index_lists_wrap() {
        let mut w = StfWriter::new(Vec::new()).unwrap();
        write_wrapped(0..102, &mut w).unwrap();
        let text = decode(&w.into_inner());
        let (first, rest) = text.split_once("\r\n").unwrap();

        assert_eq!(first.split_whitespace().count(), 101);
        assert_eq!(rest, format!("{}101 )\r\n", " ".repeat(36)));
    }

    #[test]
    fn writes_reflection_uv_op() {
        let mut shape = triangle_shape();
        shape.light_configs[0].uv_ops.push(UvOp::ReflectMapFull {
            texture_address_mode: 1,
        });

        let text = decode(&to_bytes(&shape).unwrap());
        assert!(text.contains(
            "\t\t\tuv_ops ( 2\r\n                uv_op_copy ( 1 0 )\r\n                uv_op_reflectmapfull ( 1 )\r\n\t\t\t)\r\n"
        ));
    }

    #[test]
    fn writes_animation_keys() {
        let mut shape = triangle_shape();
        shape.animations.push(Animation {
            frame_count: 10,
            frame_rate: 30,
            nodes: vec![AnimNode {
                label: "MAIN".to_string(),
                controllers: vec![
                    Controller::Rotation(vec![SlerpRot {
                        frame: 2.0,
                        x: 0.0,
                        y: 0.707_106_77,
                        z: 0.0,
                        w: 0.707_106_77,
                    }]),
                    Controller::Position(vec![LinearKey {
                        frame: 4.0,
                        x: 1.0,
                        y: 0.5,
                        z: -2.0,
                    }]),
                ],
            }],
        });

        let text = decode(&to_bytes(&shape).unwrap());
        assert!(text.contains("    animations ( 1\r\n        animation ( 10 30\r\n"));
        assert!(text.contains("                anim_node MAIN (\r\n"));
        assert!(text.contains("                    controllers ( 2\r\n"));
        assert!(text.contains("                     tcb_rot ( 1\r\n"));
        assert!(text.contains("slerp_rot ( 2 0 0.70710677 0 0.70710677 )\r\n"));
        assert!(text.contains("                     linear_pos ( 1\r\n"));
        assert!(text.contains("linear_key ( 4 1 0.5 -2 )\r\n"));
    }
}
