use numeric_literals::replace_float_literals;

use crate::element::{
    impl_isoparametric_finite_element, impl_reference_mapping_for_volumetric, FixedNodesReferenceFiniteElement,
    ShapeType,
};
use crate::nalgebra::{OMatrix, Point3, Scalar, Vector3, U1, U3, U5};
use crate::Real;

/// A linear pyramid with a rational basis.
///
/// The base nodes 0 to 3 are the corners of the face `xi_2 = -1` in counter-clockwise order
/// starting at `(-1, -1, -1)`, and the apex is node 4 at `(-1, -1, 1)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Pyramid5Element<T>
where
    T: Scalar,
{
    vertices: [Point3<T>; 5],
}

impl<T> Pyramid5Element<T>
where
    T: Scalar,
{
    pub fn from_vertices(vertices: [Point3<T>; 5]) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point3<T>; 5] {
        &self.vertices
    }
}

impl<T> Pyramid5Element<T>
where
    T: Real,
{
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn reference() -> Self {
        Self::from_vertices([
            Point3::new(-1.0, -1.0, -1.0),
            Point3::new(1.0, -1.0, -1.0),
            Point3::new(1.0, 1.0, -1.0),
            Point3::new(-1.0, 1.0, -1.0),
            Point3::new(-1.0, -1.0, 1.0),
        ])
    }
}

/// Below this value of `s = (1 - xi_2) / 2` a point is treated as the apex.
const APEX_EPS: f64 = 1e-12;

/// Returns `(s, a, b)` with `s = (1 - xi_2) / 2`, `a = (1 + xi_0) / 2` and `b = (1 + xi_1) / 2`.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
fn pyramid_factors<T: Real>(xi: &Point3<T>) -> (T, T, T) {
    ((1.0 - xi[2]) / 2.0, (1.0 + xi[0]) / 2.0, (1.0 + xi[1]) / 2.0)
}

fn is_apex<T: Real>(s: T) -> bool {
    s.abs() < T::from_f64(APEX_EPS).expect("Literal must fit in T")
}

impl<T> FixedNodesReferenceFiniteElement<T> for Pyramid5Element<T>
where
    T: Real,
{
    type ReferenceDim = U3;
    type NodalDim = U5;

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn evaluate_basis(&self, xi: &Point3<T>) -> OMatrix<T, U1, U5> {
        let (s, a, b) = pyramid_factors(xi);
        if is_apex(s) {
            // The rational terms vanish at the apex
            return OMatrix::<T, U1, U5>::from_row_slice(&[0.0, 0.0, 0.0, 0.0, 1.0]);
        }
        OMatrix::<T, U1, U5>::from_row_slice(&[
            (s - a) * (s - b) / s,
            a * (s - b) / s,
            a * b / s,
            (s - a) * b / s,
            1.0 - s,
        ])
    }

    #[rustfmt::skip]
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn gradients(&self, xi: &Point3<T>) -> OMatrix<T, U3, U5> {
        let (s, a, b) = pyramid_factors(xi);
        // The gradient is singular at the apex, use its value just below it
        let s = if is_apex(s) { T::from_f64(APEX_EPS).expect("Literal must fit in T") } else { s };
        let s2 = s * s;
        OMatrix::from_columns(&[
            Vector3::new(-(s - b) / (2.0 * s), -(s - a) / (2.0 * s), -(1.0 - a * b / s2) / 2.0),
            Vector3::new( (s - b) / (2.0 * s),         -a / (2.0 * s),       -a * b / (2.0 * s2)),
            Vector3::new(          b / (2.0 * s),           a / (2.0 * s),        a * b / (2.0 * s2)),
            Vector3::new(         -b / (2.0 * s),  (s - a) / (2.0 * s),       -a * b / (2.0 * s2)),
            Vector3::new(0.0, 0.0, 0.5),
        ])
    }
}

impl_isoparametric_finite_element!(
    Pyramid5Element,
    geometry = U3,
    reference = U3,
    nodes = U5,
    shape = ShapeType::Pyramid
);
impl_reference_mapping_for_volumetric!(Pyramid5Element, U3);
