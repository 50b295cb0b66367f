//! Export 3D scenes to the `.s` shape format read by Microsoft Train Simulator
//! and OpenRails.
//!
//! A [`scene::Scene`] is turned into a [`shape::Shape`] by
//! [`export::export_shape`], which can then be written with
//! [`shape::serialize::write_shape`]. [`export::export_shape_file`] does both.

/// Errors raised by the exporter
pub mod error;
/// Scene to shape conversion: hierarchy, materials, geometry and levels of detail
pub mod export;
/// Generic wrapper for values that may or may not match a known variant.
pub mod recognized;
/// Host-neutral input scene graph
pub mod scene;
/// Shape tables and the text serializer
pub mod shape;
