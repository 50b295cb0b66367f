//! Distance levels built from the `<root>_<distance>` collections.

use glam::Mat4;
use tracing::{debug, info, warn};

use crate::error::ExportResult;
use crate::scene::{CollectionId, NodeId};

use super::ExportContext;
use super::hierarchy::{Hierarchy, relative_matrix};

/// Visibility distance encoded in a LOD collection name, e.g. `MAIN_2000`.
pub fn lod_distance(name: &str, root: &str) -> Option<u32> {
    let (prefix, suffix) = name.rsplit_once('_')?;
    if prefix.is_empty() || !name.starts_with(root) || !name[root.len()..].starts_with('_') {
        return None;
    }
    if suffix.is_empty() || !suffix.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

impl ExportContext<'_> {
    /// LOD collections directly below `root`, nearest first.
    pub fn lod_collections(&self, root: CollectionId) -> Vec<(u32, CollectionId)> {
        let root_name = &self.options.root_name;
        let mut lods = self.scene.collections[root]
            .children
            .iter()
            .filter_map(|&id| {
                lod_distance(&self.scene.collections[id].name, root_name).map(|d| (d, id))
            })
            .collect::<Vec<_>>();
        lods.sort_by_key(|&(distance, _)| distance);
        lods
    }

    /// Build one distance level from a LOD collection.
    ///
    /// Returns `false` when the collection produced no triangles, in which
    /// case the level is discarded again.
    pub fn add_distance_level(
        &mut self,
        hierarchy: &Hierarchy,
        distance: u32,
        collection: CollectionId,
    ) -> ExportResult<bool> {
        let scene = self.scene;
        info!("Distance level {distance}");
        let level = self.push_level(distance, hierarchy.parents.clone());
        let members = scene.all_objects(collection);

        for (hierarchy_index, objects) in hierarchy.objects.iter().enumerate() {
            let anchor = hierarchy.nodes[hierarchy_index];
            let anchor_world = anchor.map_or(Mat4::IDENTITY, |node| scene.world_matrix(node));
            for &object in objects.iter().filter(|&object| members.contains(object)) {
                let relative = relative_matrix(scene, anchor, object);
                self.add_object(level, hierarchy_index, object, relative, anchor_world)?;
            }
        }

        let sub_objects = &mut self.level_mut(level).sub_objects;
        sub_objects.sort_by_key(|sub_object| sub_object.priority);

        if self.level(level).triangle_count() == 0 {
            warn!("Empty distance level {distance}, skipping it");
            self.pop_level();
            return Ok(false);
        }
        Ok(true)
    }

    /// Add an object's geometry, expanding collection instances.
    fn add_object(
        &mut self,
        level: usize,
        hierarchy_index: usize,
        object: NodeId,
        relative: Mat4,
        anchor_world: Mat4,
    ) -> ExportResult<()> {
        let scene = self.scene;
        let mut pending = vec![(object, relative)];

        while let Some((id, relative)) = pending.pop() {
            let node = &scene.nodes[id];
            debug!("Object {}", node.name);

            if let Some(instanced) = node.instance_collection {
                let mut found = Vec::new();
                let mut collections = vec![instanced];
                while let Some(collection) = collections.pop() {
                    let collection = &scene.collections[collection];
                    found.extend(
                        collection
                            .objects
                            .iter()
                            .map(|&member| (member, relative * scene.world_matrix(member))),
                    );
                    collections.extend(collection.children.iter().rev());
                }
                pending.extend(found.into_iter().rev());
            } else if let Some(mesh) = &node.mesh {
                self.add_mesh(level, hierarchy_index, &node.name, mesh, relative, anchor_world)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::hierarchy::build_hierarchy;
    use crate::export::{ExportOptions, ExportContext};
    use crate::scene::{Collection, SceneNode, fixtures};
    use glam::Vec3;
    use std::collections::HashSet;

    #[test]
    fn parses_lod_names() {
        assert_eq!(lod_distance("MAIN_2000", "MAIN"), Some(2000));
        assert_eq!(lod_distance("MAIN_DETAIL_500", "MAIN"), Some(500));
        assert_eq!(lod_distance("MAIN_far", "MAIN"), None);
        assert_eq!(lod_distance("MAIN_", "MAIN"), None);
        assert_eq!(lod_distance("MAINLINE_300", "MAIN"), None);
        assert_eq!(lod_distance("_300", ""), None);
        assert_eq!(lod_distance("OTHER_300", "MAIN"), None);
    }

    #[test]
    fn levels_sort_by_distance() {
        let nodes = vec![SceneNode::builder()
            .name("cube")
            .mesh(fixtures::cube(1.0, 0))
            .build()];
        let mut scene = fixtures::scene_with_lods(
            nodes,
            &[0],
            &[500, 2000, 1000],
            vec![fixtures::opaque_material()],
        );
        let extra = scene.collections.len();
        scene
            .collections
            .push(Collection::builder().name("MAIN_notes").build());
        scene.collections[0].children.push(extra);

        let options = ExportOptions::default();
        let ctx = ExportContext::new(&scene, &options);
        let distances = ctx
            .lod_collections(0)
            .into_iter()
            .map(|(d, _)| d)
            .collect::<Vec<_>>();
        assert_eq!(distances, vec![500, 1000, 2000]);
    }

    #[test]
    fn empty_level_is_dropped() {
        let nodes = vec![
            SceneNode::builder()
                .name("cube")
                .mesh(fixtures::cube(1.0, 0))
                .build(),
            SceneNode::builder().name("empty").build(),
        ];
        let mut scene = fixtures::scene_with_lods(
            nodes,
            &[0],
            &[1000],
            vec![fixtures::opaque_material()],
        );
        scene
            .collections
            .push(Collection::builder().name("MAIN_3000").objects(vec![1]).build());
        scene.collections[0].children.push(2);

        let options = ExportOptions::default();
        let mut ctx = ExportContext::new(&scene, &options);
        let members = HashSet::from([0, 1]);
        let hierarchy = build_hierarchy(&scene, &members, "MAIN", false);

        assert!(ctx.add_distance_level(&hierarchy, 1000, 1).unwrap());
        assert!(!ctx.add_distance_level(&hierarchy, 3000, 2).unwrap());
        assert_eq!(ctx.shape.levels().len(), 1);
        assert_eq!(ctx.shape.levels()[0].selection, 1000);
    }

    #[test]
    fn collection_instances_expand_in_place() {
        // Node 0 instances collection "parts" holding node 1 (offset along X).
        let nodes = vec![
            SceneNode::builder()
                .name("instance")
                .local(Mat4::from_translation(Vec3::new(0.0, 10.0, 0.0)))
                .instance_collection(2)
                .build(),
            SceneNode::builder()
                .name("part")
                .local(Mat4::from_translation(Vec3::X))
                .mesh(fixtures::triangle_strip(1, 0))
                .build(),
        ];
        let mut scene = fixtures::scene_with_lods(
            nodes,
            &[0],
            &[1000],
            vec![fixtures::opaque_material()],
        );
        scene
            .collections
            .push(Collection::builder().name("parts").objects(vec![1]).build());

        let options = ExportOptions::default();
        let mut ctx = ExportContext::new(&scene, &options);
        let hierarchy = build_hierarchy(&scene, &HashSet::from([0]), "MAIN", false);
        ctx.add_distance_level(&hierarchy, 1000, 1).unwrap();

        // Scene (1, 10, 0) becomes shape (1, 0, 10).
        assert_eq!(ctx.shape.points[0], [1.0, 0.0, 10.0]);
        assert_eq!(ctx.shape.levels()[0].triangle_count(), 1);
    }
}
