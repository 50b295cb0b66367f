//! Assembly of a [`Shape`] from a [`Scene`].
//!
//! The exporter looks up the root collection (`MAIN` by default) and treats
//! each child collection named `<root>_<distance>` as one level of detail.
//! All levels share a single matrix hierarchy built from the objects of every
//! LOD collection.
//!
//! ```no_run
//! use msts_shape::export::{ExportOptions, export_shape_file};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let scene: msts_shape::scene::Scene = todo!();
//! let options = ExportOptions::builder().use_dds(true).build();
//! let summary = export_shape_file(&scene, &options, "loco.s", |_| {})?;
//! println!("{} levels", summary.levels.len());
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use bon::Builder;
use glam::{Mat4, Vec3};
use rootcause::prelude::*;
use tracing::info;

use crate::scene::Scene;
use crate::shape::serialize;
use crate::shape::{DistanceLevel, LodControl, Matrix, Shape};

mod animation;
pub mod bounds;
mod compact;
pub mod geometry;
pub mod hierarchy;
pub mod lod;
pub mod state;

pub use crate::error::{ExportError, ExportResult};
pub use bounds::Bounds;
pub use compact::{Compaction, compact};
pub use hierarchy::{Hierarchy, build_hierarchy};

/// Knobs for a single export.
#[derive(Debug, Clone, Builder)]
pub struct ExportOptions {
    /// Name of the collection holding the LOD collections. Default: `MAIN`.
    #[builder(into, default = "MAIN".to_owned())]
    pub root_name: String,
    /// Give every LOD object its own hierarchy entry instead of collapsing
    /// plain objects into their animated or reserved ancestors.
    #[builder(default)]
    pub retain_names: bool,
    /// Reference `.dds` images instead of `.ace`.
    #[builder(default)]
    pub use_dds: bool,
    /// Group sub-objects by hierarchy entry as well as by render flags.
    #[builder(default = true)]
    pub hierarchy_optimization: bool,
    /// Periodically forget the UV and normal lookup indices. Faster on large
    /// meshes at the cost of some duplicate entries.
    #[builder(default = true)]
    pub fast_export: bool,
    #[builder(default = 8000)]
    pub max_vertices_per_primitive: usize,
    #[builder(default = 15000)]
    pub max_vertices_per_sub_object: usize,
    #[builder(default = 30)]
    pub frame_rate: u32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Per-level statistics of a finished export.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LevelSummary {
    pub selection: u32,
    pub sub_objects: usize,
    pub primitives: usize,
    pub triangles: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ExportSummary {
    pub levels: Vec<LevelSummary>,
    pub hierarchy: usize,
    pub images: Vec<String>,
    pub points_before_compaction: usize,
    pub points: usize,
}

impl ExportSummary {
    fn new(shape: &Shape, compaction: Compaction) -> Self {
        let levels = shape
            .levels()
            .iter()
            .map(|level| LevelSummary {
                selection: level.selection,
                sub_objects: level.sub_objects.len(),
                primitives: level.primitive_count(),
                triangles: level.triangle_count(),
            })
            .collect();
        Self {
            levels,
            hierarchy: shape.matrices.len(),
            images: shape.images.clone(),
            points_before_compaction: compaction.points_before,
            points: compaction.points_after,
        }
    }
}

/// Mutable state of one export run.
pub struct ExportContext<'a> {
    pub scene: &'a Scene,
    pub options: &'a ExportOptions,
    pub shape: Shape,
    pub bounds: Bounds,
    progress: u64,
    on_progress: Option<Box<dyn FnMut(u64) + 'a>>,
}

impl<'a> ExportContext<'a> {
    pub fn new(scene: &'a Scene, options: &'a ExportOptions) -> Self {
        let mut shape = Shape::new(options.fast_export);
        shape.lod_controls.push(LodControl::default());
        Self {
            scene,
            options,
            shape,
            bounds: Bounds::default(),
            progress: 0,
            on_progress: None,
        }
    }

    /// Register a callback receiving a monotonically increasing work counter.
    ///
    /// The counter advances once per [`geometry::PROGRESS_INTERVAL`] triangles,
    /// so multiplying by it gives an approximate triangle count.
    pub fn on_progress(&mut self, callback: impl FnMut(u64) + 'a) {
        self.on_progress = Some(Box::new(callback));
    }

    pub(crate) fn tick(&mut self) {
        self.progress += 1;
        if let Some(callback) = self.on_progress.as_mut() {
            callback(self.progress);
        }
    }

    pub fn level(&self, level: usize) -> &DistanceLevel {
        &self.shape.lod_controls[0].levels[level]
    }

    pub fn level_mut(&mut self, level: usize) -> &mut DistanceLevel {
        &mut self.shape.lod_controls[0].levels[level]
    }

    /// Start a new distance level and return its index.
    pub fn push_level(&mut self, selection: u32, hierarchy: Vec<i32>) -> usize {
        let levels = &mut self.shape.lod_controls[0].levels;
        levels.push(DistanceLevel {
            selection,
            hierarchy,
            sub_objects: Vec::new(),
        });
        levels.len() - 1
    }

    pub(crate) fn pop_level(&mut self) {
        self.shape.lod_controls[0].levels.pop();
    }

    /// Run every assembly stage and return the finished shape.
    pub fn build(mut self) -> ExportResult<(Shape, ExportSummary)> {
        let (scene, options) = (self.scene, self.options);
        let root_name = options.root_name.as_str();
        let root = scene
            .top_collection(root_name)
            .ok_or_else(|| ExportError::MissingRootCollection(root_name.to_string()))?;

        let lods = self.lod_collections(root);
        if lods.is_empty() {
            return Err(ExportError::NoLodCollections {
                root: root_name.to_string(),
            });
        }

        let members = lods
            .iter()
            .flat_map(|&(_, collection)| scene.all_objects(collection))
            .collect::<HashSet<_>>();
        let hierarchy = build_hierarchy(scene, &members, root_name, options.retain_names);
        self.add_matrices(&hierarchy);
        info!("{} hierarchy entries", hierarchy.len());

        for &(distance, collection) in &lods {
            self.add_distance_level(&hierarchy, distance, collection)?;
        }
        if self.shape.levels().is_empty() {
            return Err(ExportError::NoGeometry {
                root: root_name.to_string(),
            });
        }

        self.shape.volumes.push(self.bounds.bounding_sphere(Vec3::ZERO));
        self.add_animation(&hierarchy)?;

        let compaction = compact(&mut self.shape);
        let summary = ExportSummary::new(&self.shape, compaction);
        for level in &summary.levels {
            info!(
                "LOD {}: {} sub-objects, {} draw calls, {} triangles",
                level.selection, level.sub_objects, level.primitives, level.triangles
            );
        }
        Ok((self.shape, summary))
    }

    /// One matrix per hierarchy entry, relative to the entry's parent.
    fn add_matrices(&mut self, hierarchy: &Hierarchy) {
        for (entry, label) in hierarchy.labels.iter().enumerate() {
            let matrix = match hierarchy.nodes[entry] {
                Some(node) => {
                    let parent = hierarchy.nodes[hierarchy.parents[entry] as usize];
                    hierarchy::relative_matrix(self.scene, parent, node)
                }
                None => Mat4::IDENTITY,
            };
            self.shape.matrices.push(Matrix::from_scene(label.as_str(), &matrix));
        }
    }
}

/// Build a shape from `scene` without writing it anywhere.
pub fn export_shape(
    scene: &Scene,
    options: &ExportOptions,
) -> Result<(Shape, ExportSummary), Report<ExportError>> {
    ExportContext::new(scene, options).build().map_err(Report::new)
}

/// Build a shape and write it to `path`.
///
/// `on_progress` receives a counter that grows while geometry is assembled,
/// once per [`geometry::PROGRESS_INTERVAL`] triangles.
/// A partially written file is removed on failure.
pub fn export_shape_file<'a>(
    scene: &'a Scene,
    options: &'a ExportOptions,
    path: impl AsRef<Path>,
    on_progress: impl FnMut(u64) + 'a,
) -> Result<ExportSummary, Report<ExportError>> {
    let path = path.as_ref();
    let mut ctx = ExportContext::new(scene, options);
    ctx.on_progress(on_progress);
    let (shape, summary) = ctx.build().map_err(Report::new)?;

    let io_error = |err| {
        Report::new(ExportError::Io {
            path: path.display().to_string(),
            err,
        })
    };
    let bytes = serialize::to_bytes(&shape).map_err(io_error)?;
    if let Err(err) = fs::write(path, bytes) {
        let _ = fs::remove_file(path);
        return Err(io_error(err));
    }

    info!("Wrote {}", path.display());
    Ok(summary)
}

/// Context with identity matrices for `labels` and one level whose
/// hierarchy hangs every entry off the first.
#[cfg(test)]
pub(crate) fn test_context<'a>(
    scene: &'a Scene,
    options: &'a ExportOptions,
    labels: &[&str],
) -> ExportContext<'a> {
    let mut ctx = ExportContext::new(scene, options);
    for label in labels {
        ctx.shape
            .matrices
            .push(Matrix::from_scene(*label, &Mat4::IDENTITY));
    }
    let hierarchy = (0..labels.len())
        .map(|i| if i == 0 { -1 } else { 0 })
        .collect();
    ctx.push_level(1000, hierarchy);
    ctx
}
