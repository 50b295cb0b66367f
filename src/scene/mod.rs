//! Input scene graph consumed by the exporter.
//!
//! This is the host-neutral form of a 3D authoring scene: a forest of nodes with
//! local transforms, optional meshes and keyframe curves, grouped into named
//! collections. Coordinates are right-handed and Z-up; the exporter converts to
//! the Y-up convention of the shape format.
//!
//! Hosts can either fill these structs directly or implement [`MeshSource`] /
//! [`MaterialSource`] for their own types and drive the geometry assembler with
//! them.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use bon::Builder;
use glam::{Mat4, Vec2, Vec3};

use crate::recognized::Recognized;

mod source;

pub use source::{MaterialSource, MeshSource};

pub type NodeId = usize;
pub type CollectionId = usize;
pub type MaterialId = usize;

/// A complete scene: nodes, the collections that group them, and materials.
#[derive(Debug, Clone, Default, Builder)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Scene {
    #[builder(default)]
    pub nodes: Vec<SceneNode>,
    #[builder(default)]
    pub collections: Vec<Collection>,
    /// Collections linked directly under the scene's master collection.
    #[builder(default)]
    pub top_collections: Vec<CollectionId>,
    #[builder(default)]
    pub materials: Vec<Material>,
    /// Last frame of the scene's playback range.
    #[builder(default)]
    pub frame_end: f32,
}

/// One object in the scene tree.
#[derive(Debug, Clone, Builder)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SceneNode {
    #[builder(into)]
    pub name: String,
    pub parent: Option<NodeId>,
    /// Transform relative to `parent`, or to the world for root objects.
    #[builder(default = Mat4::IDENTITY)]
    #[cfg_attr(feature = "serde", serde(default = "identity"))]
    pub local: Mat4,
    pub mesh: Option<Mesh>,
    /// When set, this node instances every object of the given collection.
    pub instance_collection: Option<CollectionId>,
    #[builder(default)]
    #[cfg_attr(feature = "serde", serde(default))]
    pub curves: Vec<AnimationCurve>,
}

#[cfg(feature = "serde")]
fn identity() -> Mat4 {
    Mat4::IDENTITY
}

/// A named group of objects, possibly nesting further collections.
#[derive(Debug, Clone, Default, Builder)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Collection {
    #[builder(into)]
    pub name: String,
    #[builder(default)]
    #[cfg_attr(feature = "serde", serde(default))]
    pub objects: Vec<NodeId>,
    #[builder(default)]
    #[cfg_attr(feature = "serde", serde(default))]
    pub children: Vec<CollectionId>,
}

/// Evaluated (modifiers applied, triangulated) mesh data.
#[derive(Debug, Clone, Default, Builder)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Mesh {
    #[builder(default)]
    pub positions: Vec<Vec3>,
    #[builder(default)]
    pub triangles: Vec<LoopTriangle>,
    /// Split (per-loop) normals. Missing entries fall back to the face normal.
    #[builder(default)]
    pub loop_normals: Vec<Vec3>,
    #[builder(default)]
    pub uv_layers: Vec<UvLayer>,
    #[builder(default)]
    pub material_slots: Vec<Option<MaterialId>>,
    /// Custom `NORMALS` property: `UP`, `OUT`, `FILLET` or `OUTX`.
    pub normals: Option<String>,
}

/// A triangle referencing mesh vertices and face-corner loops.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LoopTriangle {
    pub vertices: [u32; 3],
    pub loops: [u32; 3],
    pub material_index: usize,
    pub smooth: bool,
}

/// Per-loop texture coordinates.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UvLayer {
    pub name: String,
    pub uvs: Vec<Vec2>,
}

/// How the renderer treats the texture's alpha channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum Transparency {
    /// Alpha channel is ignored.
    #[default]
    Opaque,
    /// Transparent where alpha falls below a threshold.
    Clip,
    /// Alpha blends from transparent to opaque.
    Alpha,
    /// Alpha blending with depth sort.
    AlphaSort,
}

/// Lighting preset applied to the vertices of a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum Lighting {
    #[default]
    Normal,
    /// Strong specular highlight.
    Specular25,
    /// Small specular highlight.
    Specular750,
    FullBright,
    HalfBright,
    Dark,
    /// Indirect ambient lighting only.
    Cruciform,
    Emissive,
}

impl Lighting {
    pub fn is_specular(self) -> bool {
        matches!(self, Lighting::Specular25 | Lighting::Specular750)
    }

    /// Index of the renderer's predefined light material for this preset.
    pub fn preset_light_material(self) -> i32 {
        match self {
            Lighting::Normal => -5,
            Lighting::Specular25 => -6,
            Lighting::Specular750 => -7,
            Lighting::FullBright => -8,
            Lighting::HalfBright => -11,
            Lighting::Dark => -12,
            Lighting::Cruciform => -9,
            Lighting::Emissive => -5,
        }
    }
}

impl fmt::Display for Transparency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Transparency::Opaque => "OPAQUE",
            Transparency::Clip => "CLIP",
            Transparency::Alpha => "ALPHA",
            Transparency::AlphaSort => "ALPHA_SORT",
        })
    }
}

impl fmt::Display for Lighting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Lighting::Normal => "NORMAL",
            Lighting::Specular25 => "SPECULAR25",
            Lighting::Specular750 => "SPECULAR750",
            Lighting::FullBright => "FULLBRIGHT",
            Lighting::HalfBright => "HALFBRIGHT",
            Lighting::Dark => "DARK",
            Lighting::Cruciform => "CRUCIFORM",
            Lighting::Emissive => "EMISSIVE",
        })
    }
}

/// Explicit light material colours, each ARGB in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LightMaterialColors {
    pub diffuse: [f32; 4],
    pub ambient: [f32; 4],
    pub specular: [f32; 4],
    pub emissive: [f32; 4],
    pub specular_power: f32,
}

/// Surface settings the exporter understands.
#[derive(Debug, Clone, Builder)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Material {
    #[builder(into)]
    pub name: String,
    #[builder(default)]
    #[cfg_attr(feature = "serde", serde(default))]
    pub transparency: Transparency,
    #[builder(default)]
    #[cfg_attr(feature = "serde", serde(default))]
    pub lighting: Lighting,
    /// Path of the base colour image; only the file stem is exported.
    #[builder(into)]
    pub texture: Option<String>,
    #[builder(default)]
    #[cfg_attr(feature = "serde", serde(default))]
    pub mip_bias: f32,
    pub light_material: Option<LightMaterialColors>,
}

/// Semantic channel animated by a keyframe curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Location,
    RotationEuler,
    RotationQuaternion,
}

impl Channel {
    /// Number of curves that make up one value of this channel.
    pub fn width(self) -> usize {
        match self {
            Channel::Location | Channel::RotationEuler => 3,
            Channel::RotationQuaternion => 4,
        }
    }
}

impl FromStr for Channel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "location" => Ok(Channel::Location),
            "rotation_euler" => Ok(Channel::RotationEuler),
            "rotation_quaternion" => Ok(Channel::RotationQuaternion),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Channel::Location => "location",
            Channel::RotationEuler => "rotation_euler",
            Channel::RotationQuaternion => "rotation_quaternion",
        })
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Channel {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Channel {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse()
            .map_err(|_| serde::de::Error::custom(format!("unknown channel {raw}")))
    }
}

/// A single animated scalar: one component of a channel.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnimationCurve {
    pub channel: Recognized<Channel>,
    /// Component of the channel this curve drives (x=0, y=1, ...; w=0 for quaternions).
    pub index: usize,
    pub keyframes: Vec<Keyframe>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Keyframe {
    pub frame: f32,
    pub value: f32,
}

impl Scene {
    /// Children of every node, in node order.
    pub fn children(&self) -> Vec<Vec<NodeId>> {
        let mut children = vec![Vec::new(); self.nodes.len()];
        for (id, node) in self.nodes.iter().enumerate() {
            if let Some(parent) = node.parent {
                children[parent].push(id);
            }
        }
        children
    }

    /// Nodes without a parent, in node order.
    pub fn roots(&self) -> Vec<NodeId> {
        (0..self.nodes.len())
            .filter(|&id| self.nodes[id].parent.is_none())
            .collect()
    }

    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let mut matrix = self.nodes[id].local;
        let mut current = self.nodes[id].parent;
        while let Some(parent) = current {
            matrix = self.nodes[parent].local * matrix;
            current = self.nodes[parent].parent;
        }
        matrix
    }

    /// Find a collection linked directly under the scene.
    pub fn top_collection(&self, name: &str) -> Option<CollectionId> {
        self.top_collections
            .iter()
            .copied()
            .find(|&id| self.collections[id].name == name)
    }

    /// Every object in `collection` or any collection nested below it.
    pub fn all_objects(&self, collection: CollectionId) -> HashSet<NodeId> {
        let mut objects = HashSet::new();
        let mut pending = vec![collection];
        let mut visited = HashSet::new();
        while let Some(id) = pending.pop() {
            if !visited.insert(id) {
                continue;
            }
            let collection = &self.collections[id];
            objects.extend(collection.objects.iter().copied());
            pending.extend(collection.children.iter().copied());
        }
        objects
    }
}
