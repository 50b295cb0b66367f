use thiserror::Error;

/// Problems with the input scene that abort an export cleanly.
///
/// Broken internal invariants (bad point indices and the like) are not
/// represented here; they panic.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("{0} not found in scene collections")]
    MissingRootCollection(String),
    #[error("no LOD collections in {root}, eg {root}_2000")]
    NoLodCollections { root: String },
    #[error("empty material slot {slot} on object: {object}")]
    EmptyMaterialSlot { object: String, slot: usize },
    #[error("missing material {index} on object: {object} ({slots} slots)")]
    MissingMaterial {
        object: String,
        index: usize,
        slots: usize,
    },
    #[error("missing {layer} in: {object}")]
    MissingUvLayer { object: String, layer: String },
    #[error("every LOD collection in {root} is empty")]
    NoGeometry { root: String },
    #[error("{channel} curves on {node} do not share keyframe times")]
    MisalignedKeyframes { node: String, channel: String },
    #[error("{channel} on {node} needs {expected} curves, found {found}")]
    IncompleteChannelGroup {
        node: String,
        channel: String,
        expected: usize,
        found: usize,
    },
    #[error("failed to write {path}: {err}")]
    Io {
        path: String,
        #[source]
        err: std::io::Error,
    },
}

pub type ExportResult<T> = Result<T, ExportError>;
