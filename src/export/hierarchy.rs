//! Flattening of the scene tree into the shape's matrix hierarchy.
//!
//! Only nodes that need their own transform at runtime (animated parts, the
//! reserved bogie/wheel names, or everything when names are retained) become
//! hierarchy entries. Every other node is collapsed into its nearest retained
//! ancestor and its geometry is emitted relative to that ancestor.

use std::collections::HashSet;

use glam::Mat4;
use tracing::debug;

use crate::scene::{NodeId, Scene};

/// Node names the simulator animates on its own.
const RESERVED_NAMES: [&str; 8] = [
    "BOGIE1", "BOGIE2", "WHEELS11", "WHEELS12", "WHEELS13", "WHEELS21", "WHEELS22", "WHEELS23",
];

/// Turn a scene name into a legal shape label.
pub fn shape_label(name: &str) -> String {
    name.replace('.', "_")
}

pub fn is_reserved_name(name: &str) -> bool {
    let label = shape_label(name).to_uppercase();
    RESERVED_NAMES.contains(&label.as_str())
}

#[derive(Debug, Clone)]
pub struct Hierarchy {
    /// Parent entry of each entry; `-1` for the root.
    pub parents: Vec<i32>,
    /// Scene node of each entry. The root entry is synthetic and has none.
    pub nodes: Vec<Option<NodeId>>,
    pub labels: Vec<String>,
    /// Objects whose geometry is emitted under each entry, including the
    /// entry's own node.
    pub objects: Vec<Vec<NodeId>>,
}

impl Hierarchy {
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}

enum Step {
    /// Start a new entry for the node under the given parent entry.
    Build(NodeId, usize),
    /// Walk the node's children on behalf of the given entry.
    Merge(NodeId, usize),
    /// Record a collapsed node's geometry under the given entry.
    Attach(NodeId, usize),
}

/// Build the hierarchy below a synthetic root labelled `root_label`.
///
/// `lod_members` holds every object of every LOD collection; nodes outside it
/// are always collapsed.
pub fn build_hierarchy(
    scene: &Scene,
    lod_members: &HashSet<NodeId>,
    root_label: &str,
    retain_names: bool,
) -> Hierarchy {
    let children = scene.children();
    let is_retained = |id: NodeId| {
        let node = &scene.nodes[id];
        lod_members.contains(&id)
            && (retain_names || !node.curves.is_empty() || is_reserved_name(&node.name))
    };

    let mut hierarchy = Hierarchy {
        parents: vec![-1],
        nodes: vec![None],
        labels: vec![root_label.to_string()],
        objects: vec![Vec::new()],
    };

    // Merging a child pulls its subtree in before the child itself, so steps
    // are pushed in reverse to pop in scene order.
    let push_children = |stack: &mut Vec<Step>, kids: &[NodeId], entry: usize| {
        for &child in kids.iter().rev() {
            if is_retained(child) {
                stack.push(Step::Build(child, entry));
            } else {
                stack.push(Step::Attach(child, entry));
                stack.push(Step::Merge(child, entry));
            }
        }
    };

    let mut stack = Vec::new();
    push_children(&mut stack, &scene.roots(), 0);

    while let Some(step) = stack.pop() {
        match step {
            Step::Build(node, parent) => {
                let entry = hierarchy.parents.len();
                hierarchy.parents.push(parent as i32);
                hierarchy.nodes.push(Some(node));
                hierarchy.labels.push(shape_label(&scene.nodes[node].name));
                hierarchy.objects.push(vec![node]);
                debug!("Hierarchy {entry}: {} under {parent}", scene.nodes[node].name);
                push_children(&mut stack, &children[node], entry);
            }
            Step::Merge(node, entry) => push_children(&mut stack, &children[node], entry),
            Step::Attach(node, entry) => hierarchy.objects[entry].push(node),
        }
    }

    hierarchy
}

/// Transform of `object` relative to `ancestor`, or to the world when the
/// ancestor is the synthetic root or not actually above `object`.
pub fn relative_matrix(scene: &Scene, ancestor: Option<NodeId>, object: NodeId) -> Mat4 {
    if ancestor == Some(object) {
        return Mat4::IDENTITY;
    }

    let mut matrix = scene.nodes[object].local;
    let mut current = scene.nodes[object].parent;
    while let Some(parent) = current {
        if Some(parent) == ancestor {
            break;
        }
        matrix = scene.nodes[parent].local * matrix;
        current = scene.nodes[parent].parent;
    }
    matrix
}
