use numeric_literals::replace_float_literals;

use crate::element::{
    impl_isoparametric_finite_element, FixedNodesReferenceFiniteElement, ShapeType, SurfaceFiniteElement,
};
use crate::nalgebra::{Matrix1x2, Point1, Point2, Scalar, Vector2, U1, U2};
use crate::Real;

/// A linear segment embedded in two dimensions, parametrized over `[-1, 1]`.
///
/// Segments are the facets of two-dimensional meshes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Segment2d2Element<T>
where
    T: Scalar,
{
    vertices: [Point2<T>; 2],
}

impl<T> Segment2d2Element<T>
where
    T: Scalar,
{
    pub fn from_vertices(vertices: [Point2<T>; 2]) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point2<T>; 2] {
        &self.vertices
    }
}

impl<T> FixedNodesReferenceFiniteElement<T> for Segment2d2Element<T>
where
    T: Real,
{
    type ReferenceDim = U1;
    type NodalDim = U2;

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn evaluate_basis(&self, xi: &Point1<T>) -> Matrix1x2<T> {
        let phi_1d = crate::element::phi_linear_1d;
        Matrix1x2::new(phi_1d(-1.0, xi[0]), phi_1d(1.0, xi[0]))
    }

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn gradients(&self, _xi: &Point1<T>) -> Matrix1x2<T> {
        Matrix1x2::new(-0.5, 0.5)
    }
}

impl_isoparametric_finite_element!(
    Segment2d2Element,
    geometry = U2,
    reference = U1,
    nodes = U2,
    shape = ShapeType::Segment
);

impl<T> SurfaceFiniteElement<T> for Segment2d2Element<T>
where
    T: Real,
{
    /// The normal is obtained by rotating the tangent `b - a` clockwise.
    fn normal(&self, _xi: &Point1<T>) -> Vector2<T> {
        let [a, b] = &self.vertices;
        let t = b - a;
        Vector2::new(t.y, -t.x).normalize()
    }
}
