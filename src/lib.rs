//! Particle point location and trajectory/boundary intersection on unstructured,
//! possibly curved, meshes.
//!
//! The crate is organised bottom-up:
//!
//! - [`element`]: reference elements, their forward maps and collapsed coordinates.
//! - [`mapping`]: Newton inversion of element maps.
//! - [`hierarchy`]: the uniform two-level spatial index over the mesh bounding box.
//! - [`packed`] and [`collection`]: packed geometry descriptors cached per index cell.
//! - [`locate`]: the point-location dispatcher.
//! - [`composite`]: trajectory–composite intersection.
//!
//! [`mesh`] and [`particles`] model the mesh and particle collaborators the algorithms operate on.
use nalgebra::{DimMin, DimName};

pub mod allocators;
pub mod collection;
pub mod composite;
pub mod config;
pub mod element;
pub mod hierarchy;
pub mod locate;
pub mod mapping;
pub mod mesh;
pub mod packed;
pub mod particles;

pub mod geometry {
    pub use particle_mesh_geometry::*;
}

pub mod optimize {
    pub use particle_mesh_optimize::*;
}

#[cfg(feature = "proptest-support")]
pub mod proptest;

pub use mapping::MeshDim;

pub extern crate nalgebra;

/// A small, fixed-size dimension.
///
/// Used as a trait alias for various traits frequently needed by generic routines.
pub trait SmallDim: DimName + DimMin<Self, Output = Self> {}

impl<D> SmallDim for D where D: DimName + DimMin<Self, Output = Self> {}

pub use particle_mesh_traits::Real;
