//! Proptest strategies for elements, reference coordinates and hierarchies.
use ::proptest::prelude::*;
use nalgebra::{Matrix2, Matrix3, Point2, Point3, Vector2, Vector3, U2, U3};

use crate::element::{Quad4d2Element, ShapeType, Tet4Element, Tri3d2Element};
use crate::hierarchy::MeshHierarchy;

pub use particle_mesh_geometry::proptest::{point2, point3};

/// Reference coordinates strictly inside the reference domain of `shape`, padded to three
/// entries.
///
/// Collapsed coordinates are drawn from `[-0.95, 0.95]`.
pub fn reference_coords(shape: ShapeType) -> impl Strategy<Value = [f64; 3]> {
    let range = -0.95..=0.95;
    [range.clone(), range.clone(), range].prop_map(move |eta| {
        let mut xi = [0.0; 3];
        shape.uncollapse_coordinates(&eta, &mut xi);
        xi
    })
}

/// Triangles with counter-clockwise orientation and an area bounded away from zero.
pub fn nondegenerate_triangle() -> impl Strategy<Value = Tri3d2Element<f64>> {
    [point2(), point2(), point2()]
        .prop_filter("Triangle must not be degenerate", |[a, b, c]| {
            Matrix2::from_columns(&[b - a, c - a]).determinant().abs() > 1e-1
        })
        .prop_map(|[a, b, c]| {
            if Matrix2::from_columns(&[b - a, c - a]).determinant() > 0.0 {
                Tri3d2Element::from_vertices([a, b, c])
            } else {
                Tri3d2Element::from_vertices([a, c, b])
            }
        })
}

/// Parallelograms spanned by two sufficiently independent edge vectors.
pub fn parallelogram() -> impl Strategy<Value = Quad4d2Element<f64>> {
    let edge = [-5.0..5.0, -5.0..5.0].prop_map(|[x, y]| Vector2::new(x, y));
    (point2(), edge.clone(), edge)
        .prop_filter("Edges must span the plane", |(_, u, v)| {
            Matrix2::from_columns(&[*u, *v]).determinant() > 1e-1
        })
        .prop_map(|(origin, u, v)| {
            Quad4d2Element::from_vertices([origin, origin + u, origin + u + v, origin + v])
        })
}

/// Tetrahedra with positive orientation and a volume bounded away from zero.
pub fn nondegenerate_tetrahedron() -> impl Strategy<Value = Tet4Element<f64>> {
    [point3(), point3(), point3(), point3()]
        .prop_filter("Tetrahedron must not be degenerate", |[a, b, c, d]| {
            Matrix3::from_columns(&[b - a, c - a, d - a]).determinant().abs() > 1e-1
        })
        .prop_map(|[a, b, c, d]| {
            if Matrix3::from_columns(&[b - a, c - a, d - a]).determinant() > 0.0 {
                Tet4Element::from_vertices([a, b, c, d])
            } else {
                Tet4Element::from_vertices([a, c, b, d])
            }
        })
}

pub fn hierarchy2() -> impl Strategy<Value = MeshHierarchy<U2>> {
    (point2(), [1usize..6, 1usize..6], 0.1..2.0, 0u32..4).prop_map(|(origin, [nx, ny], width, order)| {
        MeshHierarchy::new(origin.coords, Vector2::new(nx, ny), width, order)
    })
}

pub fn hierarchy3() -> impl Strategy<Value = MeshHierarchy<U3>> {
    (point3(), [1usize..5, 1usize..5, 1usize..5], 0.1..2.0, 0u32..3).prop_map(|(origin, [nx, ny, nz], width, order)| {
        MeshHierarchy::new(origin.coords, Vector3::new(nx, ny, nz), width, order)
    })
}

/// A 2D hierarchy together with a valid linear index.
pub fn hierarchy2_and_linear_index() -> impl Strategy<Value = (MeshHierarchy<U2>, usize)> {
    hierarchy2().prop_flat_map(|hierarchy| {
        let n = hierarchy.num_cells();
        (Just(hierarchy), 0..n)
    })
}

/// A 3D hierarchy together with a valid linear index.
pub fn hierarchy3_and_linear_index() -> impl Strategy<Value = (MeshHierarchy<U3>, usize)> {
    hierarchy3().prop_flat_map(|hierarchy| {
        let n = hierarchy.num_cells();
        (Just(hierarchy), 0..n)
    })
}

/// Points with coordinates in `[lower, upper]` per dimension.
pub fn point2_in(lower: f64, upper: f64) -> impl Strategy<Value = Point2<f64>> {
    [lower..=upper, lower..=upper].prop_map(|[x, y]| Point2::new(x, y))
}

pub fn point3_in(lower: f64, upper: f64) -> impl Strategy<Value = Point3<f64>> {
    [lower..=upper, lower..=upper, lower..=upper].prop_map(|[x, y, z]| Point3::new(x, y, z))
}
