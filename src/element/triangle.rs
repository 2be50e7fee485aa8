use numeric_literals::replace_float_literals;

use crate::element::{
    impl_isoparametric_finite_element, impl_reference_mapping_for_volumetric, FiniteElement,
    FixedNodesReferenceFiniteElement, ShapeType, SurfaceFiniteElement,
};
use crate::nalgebra::{Matrix1x3, Matrix1x6, Matrix2x3, Matrix2x6, Point2, Point3, Scalar, Vector2, Vector3, U2, U3, U6};
use crate::Real;

/// Barycentric coordinates of the reference triangle with corners `(-1, -1)`, `(1, -1)`,
/// `(-1, 1)`.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn triangle_barycentric<T: Real>(x: T, y: T) -> [T; 3] {
    [-(x + y) / 2.0, (1.0 + x) / 2.0, (1.0 + y) / 2.0]
}

/// Gradients of the barycentric coordinates. They are constant.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn triangle_barycentric_gradients<T: Real>() -> [Vector2<T>; 3] {
    [Vector2::new(-0.5, -0.5), Vector2::new(0.5, 0.0), Vector2::new(0.0, 0.5)]
}

/// Values of the six quadratic Lagrange basis functions on the reference triangle.
///
/// Nodes are the three vertices followed by the midpoints of the edges `(0, 1)`, `(1, 2)`
/// and `(2, 0)`.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn tri6_basis<T: Real>(x: T, y: T) -> [T; 6] {
    let [l0, l1, l2] = triangle_barycentric(x, y);
    [
        l0 * (2.0 * l0 - 1.0),
        l1 * (2.0 * l1 - 1.0),
        l2 * (2.0 * l2 - 1.0),
        4.0 * l0 * l1,
        4.0 * l1 * l2,
        4.0 * l2 * l0,
    ]
}

#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub(crate) fn tri6_gradients<T: Real>(x: T, y: T) -> [Vector2<T>; 6] {
    let [l0, l1, l2] = triangle_barycentric(x, y);
    let [g0, g1, g2] = triangle_barycentric_gradients::<T>();
    [
        g0 * (4.0 * l0 - 1.0),
        g1 * (4.0 * l1 - 1.0),
        g2 * (4.0 * l2 - 1.0),
        (g0 * l1 + g1 * l0) * 4.0,
        (g1 * l2 + g2 * l1) * 4.0,
        (g2 * l0 + g0 * l2) * 4.0,
    ]
}

/// A finite element representing linear basis functions on a triangle, in two dimensions.
///
/// The reference element is chosen to be the triangle defined by the corners
/// (-1, -1), (1, -1), (-1, 1).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Tri3d2Element<T>
where
    T: Scalar,
{
    vertices: [Point2<T>; 3],
}

impl<T> Tri3d2Element<T>
where
    T: Scalar,
{
    pub fn from_vertices(vertices: [Point2<T>; 3]) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point2<T>; 3] {
        &self.vertices
    }
}

impl<T> Tri3d2Element<T>
where
    T: Real,
{
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn reference() -> Self {
        Self::from_vertices([Point2::new(-1.0, -1.0), Point2::new(1.0, -1.0), Point2::new(-1.0, 1.0)])
    }
}

impl<T> FixedNodesReferenceFiniteElement<T> for Tri3d2Element<T>
where
    T: Real,
{
    type ReferenceDim = U2;
    type NodalDim = U3;

    fn evaluate_basis(&self, xi: &Point2<T>) -> Matrix1x3<T> {
        Matrix1x3::from_row_slice(&triangle_barycentric(xi.x, xi.y))
    }

    fn gradients(&self, _xi: &Point2<T>) -> Matrix2x3<T> {
        Matrix2x3::from_columns(&triangle_barycentric_gradients())
    }
}

impl_isoparametric_finite_element!(
    Tri3d2Element,
    geometry = U2,
    reference = U2,
    nodes = U3,
    shape = ShapeType::Triangle
);
impl_reference_mapping_for_volumetric!(Tri3d2Element, U2);

/// A quadratic triangle in two dimensions.
///
/// The geometry is interpolated through all six nodes, so edges may be curved.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Tri6d2Element<T>
where
    T: Scalar,
{
    vertices: [Point2<T>; 6],
}

impl<T> Tri6d2Element<T>
where
    T: Scalar,
{
    pub fn from_vertices(vertices: [Point2<T>; 6]) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point2<T>; 6] {
        &self.vertices
    }
}

impl<T> Tri6d2Element<T>
where
    T: Real,
{
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn reference() -> Self {
        Self::from_vertices([
            Point2::new(-1.0, -1.0),
            Point2::new(1.0, -1.0),
            Point2::new(-1.0, 1.0),
            Point2::new(0.0, -1.0),
            Point2::new(0.0, 0.0),
            Point2::new(-1.0, 0.0),
        ])
    }
}

impl<T> FixedNodesReferenceFiniteElement<T> for Tri6d2Element<T>
where
    T: Real,
{
    type ReferenceDim = U2;
    type NodalDim = U6;

    fn evaluate_basis(&self, xi: &Point2<T>) -> Matrix1x6<T> {
        Matrix1x6::from_row_slice(&tri6_basis(xi.x, xi.y))
    }

    fn gradients(&self, xi: &Point2<T>) -> Matrix2x6<T> {
        Matrix2x6::from_columns(&tri6_gradients(xi.x, xi.y))
    }
}

impl_isoparametric_finite_element!(
    Tri6d2Element,
    geometry = U2,
    reference = U2,
    nodes = U6,
    shape = ShapeType::Triangle
);
impl_reference_mapping_for_volumetric!(Tri6d2Element, U2);

/// A linear triangle embedded in three dimensions, used for facets of volumetric meshes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Tri3d3Element<T>
where
    T: Scalar,
{
    vertices: [Point3<T>; 3],
}

impl<T> Tri3d3Element<T>
where
    T: Scalar,
{
    pub fn from_vertices(vertices: [Point3<T>; 3]) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point3<T>; 3] {
        &self.vertices
    }
}

impl<T> FixedNodesReferenceFiniteElement<T> for Tri3d3Element<T>
where
    T: Real,
{
    type ReferenceDim = U2;
    type NodalDim = U3;

    fn evaluate_basis(&self, xi: &Point2<T>) -> Matrix1x3<T> {
        Matrix1x3::from_row_slice(&triangle_barycentric(xi.x, xi.y))
    }

    fn gradients(&self, _xi: &Point2<T>) -> Matrix2x3<T> {
        Matrix2x3::from_columns(&triangle_barycentric_gradients())
    }
}

impl_isoparametric_finite_element!(
    Tri3d3Element,
    geometry = U3,
    reference = U2,
    nodes = U3,
    shape = ShapeType::Triangle
);

impl<T> SurfaceFiniteElement<T> for Tri3d3Element<T>
where
    T: Real,
{
    fn normal(&self, _xi: &Point2<T>) -> Vector3<T> {
        let [a, b, c] = &self.vertices;
        (b - a).cross(&(c - a)).normalize()
    }
}

impl<T> Tri3d3Element<T>
where
    T: Real,
{
    /// Area of the triangle.
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn area(&self) -> T {
        let [a, b, c] = &self.vertices;
        0.5 * (b - a).cross(&(c - a)).norm()
    }

    pub fn centroid(&self) -> Point3<T> {
        let xi = Point2::from(Vector2::repeat(T::from_f64(-1.0 / 3.0).expect("Literal must fit in T")));
        self.map_reference_coords(&xi)
    }
}
