use numeric_literals::replace_float_literals;

use crate::element::{
    impl_isoparametric_finite_element, impl_reference_mapping_for_volumetric, FixedNodesReferenceFiniteElement,
    ShapeType,
};
use crate::nalgebra::{Matrix1x4, Matrix3x4, OMatrix, Point3, Scalar, Vector3, U1, U10, U3, U4};
use crate::Real;

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
fn tet_barycentric<T: Real>(xi: &Point3<T>) -> [T; 4] {
    [
        -(1.0 + xi[0] + xi[1] + xi[2]) / 2.0,
        (1.0 + xi[0]) / 2.0,
        (1.0 + xi[1]) / 2.0,
        (1.0 + xi[2]) / 2.0,
    ]
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
fn tet_barycentric_gradients<T: Real>() -> [Vector3<T>; 4] {
    [
        Vector3::new(-0.5, -0.5, -0.5),
        Vector3::new(0.5, 0.0, 0.0),
        Vector3::new(0.0, 0.5, 0.0),
        Vector3::new(0.0, 0.0, 0.5),
    ]
}

/// Vertex pairs of the mid-edge nodes of `Tet10Element`, in node order.
const TET10_EDGES: [(usize, usize); 6] = [(0, 1), (1, 2), (0, 2), (0, 3), (2, 3), (1, 3)];

/// A linear tetrahedron with reference corners `(-1, -1, -1)`, `(1, -1, -1)`, `(-1, 1, -1)`
/// and `(-1, -1, 1)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Tet4Element<T>
where
    T: Scalar,
{
    vertices: [Point3<T>; 4],
}

impl<T> Tet4Element<T>
where
    T: Scalar,
{
    pub fn from_vertices(vertices: [Point3<T>; 4]) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point3<T>; 4] {
        &self.vertices
    }
}

impl<T> Tet4Element<T>
where
    T: Real,
{
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn reference() -> Self {
        Self::from_vertices([
            Point3::new(-1.0, -1.0, -1.0),
            Point3::new(1.0, -1.0, -1.0),
            Point3::new(-1.0, 1.0, -1.0),
            Point3::new(-1.0, -1.0, 1.0),
        ])
    }
}

impl<T> FixedNodesReferenceFiniteElement<T> for Tet4Element<T>
where
    T: Real,
{
    type ReferenceDim = U3;
    type NodalDim = U4;

    fn evaluate_basis(&self, xi: &Point3<T>) -> Matrix1x4<T> {
        Matrix1x4::from_row_slice(&tet_barycentric(xi))
    }

    fn gradients(&self, _xi: &Point3<T>) -> Matrix3x4<T> {
        Matrix3x4::from_columns(&tet_barycentric_gradients())
    }
}

impl_isoparametric_finite_element!(
    Tet4Element,
    geometry = U3,
    reference = U3,
    nodes = U4,
    shape = ShapeType::Tetrahedron
);
impl_reference_mapping_for_volumetric!(Tet4Element, U3);

/// A quadratic tetrahedron.
///
/// Nodes are the vertices of `Tet4Element` followed by the midpoints of the edges
/// `(0, 1)`, `(1, 2)`, `(0, 2)`, `(0, 3)`, `(2, 3)` and `(1, 3)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Tet10Element<T>
where
    T: Scalar,
{
    vertices: [Point3<T>; 10],
}

impl<T> Tet10Element<T>
where
    T: Scalar,
{
    pub fn from_vertices(vertices: [Point3<T>; 10]) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point3<T>; 10] {
        &self.vertices
    }
}

impl<T> Tet10Element<T>
where
    T: Real,
{
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn reference() -> Self {
        Self::from_vertices([
            Point3::new(-1.0, -1.0, -1.0),
            Point3::new(1.0, -1.0, -1.0),
            Point3::new(-1.0, 1.0, -1.0),
            Point3::new(-1.0, -1.0, 1.0),
            Point3::new(0.0, -1.0, -1.0),
            Point3::new(0.0, 0.0, -1.0),
            Point3::new(-1.0, 0.0, -1.0),
            Point3::new(-1.0, -1.0, 0.0),
            Point3::new(-1.0, 0.0, 0.0),
            Point3::new(0.0, -1.0, 0.0),
        ])
    }
}

impl<T> FixedNodesReferenceFiniteElement<T> for Tet10Element<T>
where
    T: Real,
{
    type ReferenceDim = U3;
    type NodalDim = U10;

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn evaluate_basis(&self, xi: &Point3<T>) -> OMatrix<T, U1, U10> {
        let l = tet_barycentric(xi);
        let mut phi = OMatrix::<T, U1, U10>::zeros();
        for i in 0..4 {
            phi[i] = l[i] * (2.0 * l[i] - 1.0);
        }
        for (k, &(a, b)) in TET10_EDGES.iter().enumerate() {
            phi[4 + k] = 4.0 * l[a] * l[b];
        }
        phi
    }

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn gradients(&self, xi: &Point3<T>) -> OMatrix<T, U3, U10> {
        let l = tet_barycentric(xi);
        let g = tet_barycentric_gradients::<T>();
        let mut grad = OMatrix::<T, U3, U10>::zeros();
        for i in 0..4 {
            grad.set_column(i, &(g[i] * (4.0 * l[i] - 1.0)));
        }
        for (k, &(a, b)) in TET10_EDGES.iter().enumerate() {
            grad.set_column(4 + k, &((g[a] * l[b] + g[b] * l[a]) * 4.0));
        }
        grad
    }
}

impl_isoparametric_finite_element!(
    Tet10Element,
    geometry = U3,
    reference = U3,
    nodes = U10,
    shape = ShapeType::Tetrahedron
);
impl_reference_mapping_for_volumetric!(Tet10Element, U3);
