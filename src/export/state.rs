//! Mapping of materials onto shared render state.
//!
//! Each lookup reuses an existing table entry when an identical one exists and
//! appends a new one otherwise. Sub-objects, vertex states and primitives are
//! searched from the end since earlier entries are more likely to be full.

use std::path::Path;

use tracing::debug;

use crate::scene::{Lighting, MaterialSource, Transparency};
use crate::shape::{LightConfig, PrimState, Primitive, SubObject, SubObjectFlags, UvOp, VertexSet, VertexState};

use super::ExportContext;

pub const TEXTURE_FILTER: &str = "MipLinear";
/// Wrap texture coordinates.
pub const ADDRESS_MODE_REPEAT: u32 = 1;

const Z_BUFFER_MODE: u32 = 1;
/// Bit set for geometry the renderer may cull by sort order.
const FLAG_SORTABLE: u32 = 0x400;

/// Where a material's triangles currently go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialState {
    /// Sub-object index within the distance level.
    pub sub_object: usize,
    pub vertex_state: usize,
    pub prim_state: usize,
    /// Primitive index within the sub-object.
    pub primitive: usize,
    pub image: usize,
}

/// Sub-object header flags and draw priority for a material.
pub fn sub_object_flags(transparency: Transparency, lighting: Lighting) -> (SubObjectFlags, i32) {
    let (mut flags, sort_vector, volume, priority) = match transparency {
        Transparency::Opaque | Transparency::Clip => (FLAG_SORTABLE, -1, -1, 0),
        Transparency::Alpha => (FLAG_SORTABLE, -1, -1, 1),
        Transparency::AlphaSort => (0x500, 0, 0, 2),
    };
    if lighting.is_specular() {
        flags &= !FLAG_SORTABLE;
    }
    let flags = SubObjectFlags {
        flags,
        sort_vector,
        volume,
        source_vertex_format: 0x1d2,
        destination_vertex_format: 0x1c4,
    };
    (flags, priority)
}

pub fn shader_name(transparency: Transparency, lighting: Lighting) -> &'static str {
    match (lighting, transparency) {
        (Lighting::Emissive, Transparency::Opaque) => "Tex",
        (Lighting::Emissive, _) => "BlendATex",
        (_, Transparency::Opaque) => "TexDiff",
        (_, _) => "BlendATexDiff",
    }
}

/// Image file name for a texture path: the file stem plus the target extension.
pub fn image_name(texture_path: Option<&str>, use_dds: bool) -> String {
    let stem = texture_path
        .map(|path| path.replace('\\', "/"))
        .and_then(|path| {
            Path::new(&path)
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "blank".to_string());
    let extension = if use_dds { "dds" } else { "ace" };
    format!("{stem}.{extension}")
}

impl ExportContext<'_> {
    /// Resolve every table entry needed to draw `material` under the given
    /// hierarchy entry of a distance level.
    pub fn resolve_material(
        &mut self,
        level: usize,
        hierarchy_index: usize,
        material: &impl MaterialSource,
    ) -> MaterialState {
        let transparency = material.transparency();
        let lighting = material.lighting();

        let (flags, priority) = sub_object_flags(transparency, lighting);
        let sub_object = self.find_or_add_sub_object(level, flags, priority, hierarchy_index);

        let image = self
            .shape
            .image_index(&image_name(material.texture_path(), self.options.use_dds));
        let filter = self.shape.filter_index(TEXTURE_FILTER);
        let texture = self.shape.texture_index(image, filter, material.mip_bias());

        let light_config = self.shape.light_config_index(LightConfig {
            uv_ops: vec![UvOp::Copy {
                texture_address_mode: ADDRESS_MODE_REPEAT,
                source_uv_index: 0,
            }],
        });

        let light_material = match material.light_material() {
            Some(colors) => {
                let diffuse = self.shape.colours.insert(colors.diffuse);
                let ambient = self.shape.colours.insert(colors.ambient);
                let specular = self.shape.colours.insert(colors.specular);
                let emissive = self.shape.colours.insert(colors.emissive);
                self.shape.light_materials.insert([
                    diffuse as f32,
                    ambient as f32,
                    specular as f32,
                    emissive as f32,
                    colors.specular_power,
                ]) as i32
            }
            None => lighting.preset_light_material(),
        };

        let vertex_state = self.find_or_add_vertex_state(VertexState {
            flags: 0,
            matrix: hierarchy_index,
            light_material,
            light_config,
        });

        let shader = self.shape.shader_index(shader_name(transparency, lighting));
        let alpha_test_mode = u32::from(transparency == Transparency::Clip);
        let prim_state = self.find_or_add_prim_state(PrimState {
            label: String::new(),
            shader,
            textures: vec![texture],
            z_bias: 0.0,
            vertex_state,
            alpha_test_mode,
            light_config,
            z_buffer_mode: Z_BUFFER_MODE,
        });

        let primitive = self.find_or_add_primitive(level, sub_object, prim_state);

        debug!(
            "Material {} -> sub_object {sub_object} prim_state {prim_state}",
            material.name()
        );

        MaterialState {
            sub_object,
            vertex_state,
            prim_state,
            primitive,
            image,
        }
    }

    fn find_or_add_sub_object(
        &mut self,
        level: usize,
        flags: SubObjectFlags,
        priority: i32,
        hierarchy_index: usize,
    ) -> usize {
        let by_hierarchy = self.options.hierarchy_optimization;
        let vertex_states = self.shape.vertex_states.len();
        let sub_objects = &mut self.level_mut(level).sub_objects;

        let existing = sub_objects.iter().rposition(|s| {
            s.flags == flags
                && s.priority == priority
                && (!by_hierarchy || s.hierarchy_index == hierarchy_index)
        });
        existing.unwrap_or_else(|| {
            sub_objects.push(SubObject::new(flags, priority, hierarchy_index, vertex_states));
            sub_objects.len() - 1
        })
    }

    /// Start an empty sub-object with the same state as a full one.
    pub fn split_sub_object(&mut self, level: usize, full: usize) -> usize {
        let vertex_states = self.shape.vertex_states.len();
        let sub_objects = &mut self.level_mut(level).sub_objects;
        let template = &sub_objects[full];
        let split = SubObject::new(
            template.flags,
            template.priority,
            template.hierarchy_index,
            vertex_states,
        );
        sub_objects.push(split);
        debug!("Split sub_object {full} into {}", sub_objects.len() - 1);
        sub_objects.len() - 1
    }

    fn find_or_add_vertex_state(&mut self, state: VertexState) -> usize {
        if let Some(idx) = self.shape.vertex_states.iter().rposition(|s| *s == state) {
            return idx;
        }

        self.shape.vertex_states.push(state);
        // Every sub-object keeps one vertex set per vertex state.
        for control in &mut self.shape.lod_controls {
            for level in &mut control.levels {
                for sub_object in &mut level.sub_objects {
                    sub_object.vertex_sets.push(VertexSet::default());
                }
            }
        }
        self.shape.vertex_states.len() - 1
    }

    fn find_or_add_prim_state(&mut self, mut state: PrimState) -> usize {
        if let Some(idx) = self.shape.prim_states.iter().position(|s| s.same_state(&state)) {
            return idx;
        }

        let matrix = self.shape.vertex_states[state.vertex_state].matrix;
        state.label = self.shape.matrices[matrix].label.clone();
        if let Some(&texture) = state.textures.first() {
            let image = &self.shape.images[self.shape.textures[texture].image];
            let stem = image.rsplit_once('.').map_or(image.as_str(), |(stem, _)| stem);
            state.label = format!("{}_{stem}", state.label);
        }
        self.shape.prim_states.push(state);
        self.shape.prim_states.len() - 1
    }

    fn find_or_add_primitive(&mut self, level: usize, sub_object: usize, prim_state: usize) -> usize {
        let primitives = &mut self.level_mut(level).sub_objects[sub_object].primitives;
        primitives
            .iter()
            .rposition(|p| p.prim_state == prim_state)
            .unwrap_or_else(|| append_primitive(primitives, prim_state))
    }

    /// Start a new primitive under `prim_state` in the given sub-object.
    pub fn append_primitive(&mut self, level: usize, sub_object: usize, prim_state: usize) -> usize {
        let primitives = &mut self.level_mut(level).sub_objects[sub_object].primitives;
        append_primitive(primitives, prim_state)
    }
}

fn append_primitive(primitives: &mut Vec<Primitive>, prim_state: usize) -> usize {
    primitives.push(Primitive::new(prim_state));
    primitives.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{ExportOptions, test_context};
    use crate::scene::{LightMaterialColors, Material, Scene};

    fn context_with_level<'a>(scene: &'a Scene, options: &'a ExportOptions) -> ExportContext<'a> {
        test_context(scene, options, &["MAIN", "BOGIE1"])
    }

    #[test]
    fn flags_follow_transparency_and_lighting() {
        let (opaque, priority) = sub_object_flags(Transparency::Opaque, Lighting::Normal);
        assert_eq!((opaque.flags, opaque.sort_vector, priority), (0x400, -1, 0));

        let (_, priority) = sub_object_flags(Transparency::Alpha, Lighting::Normal);
        assert_eq!(priority, 1);

        let (sorted, priority) = sub_object_flags(Transparency::AlphaSort, Lighting::Specular25);
        assert_eq!((sorted.flags, sorted.volume, priority), (0x100, 0, 2));

        let (shiny, _) = sub_object_flags(Transparency::Clip, Lighting::Specular750);
        assert_eq!(shiny.flags, 0);
    }

    #[test]
    fn shader_selection() {
        assert_eq!(shader_name(Transparency::Opaque, Lighting::Emissive), "Tex");
        assert_eq!(shader_name(Transparency::Alpha, Lighting::Emissive), "BlendATex");
        assert_eq!(shader_name(Transparency::Opaque, Lighting::Dark), "TexDiff");
        assert_eq!(shader_name(Transparency::Clip, Lighting::Normal), "BlendATexDiff");
    }

    #[test]
    fn image_names() {
        assert_eq!(image_name(Some("//textures/Union Stop.png"), false), "Union Stop.ace");
        assert_eq!(image_name(Some("C:\\msts\\wagon.tga"), true), "wagon.dds");
        assert_eq!(image_name(None, false), "blank.ace");
        assert_eq!(image_name(Some(""), false), "blank.ace");
    }

    #[test]
    fn identical_materials_share_state() {
        let scene = Scene::default();
        let options = ExportOptions::default();
        let mut ctx = context_with_level(&scene, &options);
        let brick = Material::builder().name("brick").texture("brick.png").build();
        let copy = Material::builder().name("brick.001").texture("brick.png").build();

        let a = ctx.resolve_material(0, 0, &brick);
        let b = ctx.resolve_material(0, 0, &copy);

        assert_eq!(a, b);
        assert_eq!(ctx.shape.prim_states.len(), 1);
        assert_eq!(ctx.shape.prim_states[0].label, "MAIN_brick");
        assert_eq!(ctx.shape.vertex_states[0].light_material, -5);
        assert_eq!(ctx.shape.filter_names, vec![TEXTURE_FILTER]);
        assert_eq!(ctx.shape.light_configs.len(), 1);
    }

    #[test]
    fn new_vertex_state_grows_every_sub_object() {
        let scene = Scene::default();
        let options = ExportOptions::default();
        let mut ctx = context_with_level(&scene, &options);
        let plain = Material::builder().name("plain").build();
        let glass = Material::builder()
            .name("glass")
            .transparency(Transparency::Alpha)
            .build();
        let lamp = Material::builder()
            .name("lamp")
            .lighting(Lighting::FullBright)
            .build();

        let a = ctx.resolve_material(0, 0, &plain);
        let b = ctx.resolve_material(0, 1, &glass);
        let c = ctx.resolve_material(0, 0, &lamp);

        assert_ne!(a.sub_object, b.sub_object);
        assert_eq!(a.sub_object, c.sub_object);
        assert_eq!(ctx.shape.vertex_states.len(), 3);
        for sub_object in &ctx.shape.levels()[0].sub_objects {
            assert_eq!(sub_object.vertex_sets.len(), 3);
        }
        assert_eq!(ctx.shape.prim_states[b.prim_state].label, "BOGIE1_blank");
        assert_eq!(ctx.shape.vertex_states[c.vertex_state].light_material, -8);
    }

    #[test]
    fn hierarchy_optimization_keys_sub_objects() {
        let scene = Scene::default();
        let plain = Material::builder().name("plain").build();

        let options = ExportOptions::default();
        let mut ctx = context_with_level(&scene, &options);
        let a = ctx.resolve_material(0, 0, &plain);
        let b = ctx.resolve_material(0, 1, &plain);
        assert_ne!(a.sub_object, b.sub_object);

        let options = ExportOptions::builder().hierarchy_optimization(false).build();
        let mut ctx = context_with_level(&scene, &options);
        let a = ctx.resolve_material(0, 0, &plain);
        let b = ctx.resolve_material(0, 1, &plain);
        assert_eq!(a.sub_object, b.sub_object);
        assert_ne!(a.prim_state, b.prim_state);
        assert_ne!(a.primitive, b.primitive);
    }

    #[test]
    fn custom_light_material_replaces_preset() {
        let scene = Scene::default();
        let options = ExportOptions::default();
        let mut ctx = context_with_level(&scene, &options);
        let painted = Material::builder()
            .name("painted")
            .light_material(LightMaterialColors {
                diffuse: [1.0, 0.8, 0.1, 0.1],
                ambient: [1.0, 0.2, 0.2, 0.2],
                specular: [1.0, 0.2, 0.2, 0.2],
                emissive: [1.0, 0.0, 0.0, 0.0],
                specular_power: 20.0,
            })
            .build();

        let state = ctx.resolve_material(0, 0, &painted);

        assert_eq!(ctx.shape.colours.len(), 3);
        assert_eq!(ctx.shape.light_materials.len(), 1);
        assert_eq!(ctx.shape.light_materials.values()[0], [0.0, 1.0, 1.0, 2.0, 20.0]);
        assert_eq!(ctx.shape.vertex_states[state.vertex_state].light_material, 0);
    }
}
