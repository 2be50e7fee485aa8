use numeric_literals::replace_float_literals;

use crate::element::{
    impl_isoparametric_finite_element, impl_reference_mapping_for_volumetric, phi_linear_1d, phi_linear_1d_grad,
    phi_quadratic_1d, phi_quadratic_1d_grad, FiniteElement, FixedNodesReferenceFiniteElement, ShapeType,
    SurfaceFiniteElement,
};
use crate::nalgebra::{Matrix1x4, Matrix2x4, OMatrix, Point2, Point3, Scalar, Vector2, Vector3, U1, U2, U3, U4, U9};
use crate::Real;

#[rustfmt::skip]
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
fn bilinear_basis<T: Real>(xi: &Point2<T>) -> Matrix1x4<T> {
    // We define the shape functions as N_{alpha, beta} evaluated at xi such that
    //  N_{alpha, beta}([alpha, beta]) = 1
    let phi = |alpha, beta, xi: &Point2<T>| phi_linear_1d(alpha, xi[0]) * phi_linear_1d(beta, xi[1]);
    Matrix1x4::from_row_slice(&[
        phi(-1.0, -1.0, xi),
        phi( 1.0, -1.0, xi),
        phi( 1.0,  1.0, xi),
        phi(-1.0,  1.0, xi),
    ])
}

#[rustfmt::skip]
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
fn bilinear_gradients<T: Real>(xi: &Point2<T>) -> Matrix2x4<T> {
    let phi_grad = |alpha, beta, xi: &Point2<T>|
        Vector2::new(
            phi_linear_1d_grad(alpha) * phi_linear_1d(beta, xi[1]),
            phi_linear_1d(alpha, xi[0]) * phi_linear_1d_grad(beta),
        );

    Matrix2x4::from_columns(&[
        phi_grad(-1.0, -1.0, xi),
        phi_grad( 1.0, -1.0, xi),
        phi_grad( 1.0,  1.0, xi),
        phi_grad(-1.0,  1.0, xi),
    ])
}

/// A bilinear quadrilateral in two dimensions with reference domain `[-1, 1]^2`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Quad4d2Element<T>
where
    T: Scalar,
{
    vertices: [Point2<T>; 4],
}

impl<T> Quad4d2Element<T>
where
    T: Scalar,
{
    pub fn from_vertices(vertices: [Point2<T>; 4]) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point2<T>; 4] {
        &self.vertices
    }
}

impl<T> Quad4d2Element<T>
where
    T: Real,
{
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn reference() -> Self {
        Self::from_vertices([
            Point2::new(-1.0, -1.0),
            Point2::new(1.0, -1.0),
            Point2::new(1.0, 1.0),
            Point2::new(-1.0, 1.0),
        ])
    }

    /// Whether the bilinear map is affine, i.e. the quadrilateral is a parallelogram.
    pub fn is_parallelogram(&self, tol: T) -> bool {
        let [a, b, c, d] = &self.vertices;
        // a - b + c - d vanishes exactly for parallelograms
        let defect = (a - b) + (c - d);
        defect.norm() <= tol * self.diameter()
    }
}

impl<T> FixedNodesReferenceFiniteElement<T> for Quad4d2Element<T>
where
    T: Real,
{
    type ReferenceDim = U2;
    type NodalDim = U4;

    fn evaluate_basis(&self, xi: &Point2<T>) -> Matrix1x4<T> {
        bilinear_basis(xi)
    }

    fn gradients(&self, xi: &Point2<T>) -> Matrix2x4<T> {
        bilinear_gradients(xi)
    }
}

impl_isoparametric_finite_element!(
    Quad4d2Element,
    geometry = U2,
    reference = U2,
    nodes = U4,
    shape = ShapeType::Quadrilateral
);
impl_reference_mapping_for_volumetric!(Quad4d2Element, U2);

/// A biquadratic quadrilateral in two dimensions.
///
/// Nodes are the four vertices, the midpoints of the edges `(0, 1)`, `(1, 2)`, `(2, 3)`,
/// `(3, 0)` and finally the center.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Quad9d2Element<T>
where
    T: Scalar,
{
    vertices: [Point2<T>; 9],
}

impl<T> Quad9d2Element<T>
where
    T: Scalar,
{
    pub fn from_vertices(vertices: [Point2<T>; 9]) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point2<T>; 9] {
        &self.vertices
    }
}

impl<T> Quad9d2Element<T>
where
    T: Real,
{
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn reference() -> Self {
        let p = |x, y| Point2::new(x, y);
        Self::from_vertices([
            p(-1.0, -1.0),
            p(1.0, -1.0),
            p(1.0, 1.0),
            p(-1.0, 1.0),
            p(0.0, -1.0),
            p(1.0, 0.0),
            p(0.0, 1.0),
            p(-1.0, 0.0),
            p(0.0, 0.0),
        ])
    }
}

impl<T> FixedNodesReferenceFiniteElement<T> for Quad9d2Element<T>
where
    T: Real,
{
    type ReferenceDim = U2;
    type NodalDim = U9;

    #[rustfmt::skip]
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn evaluate_basis(&self, xi: &Point2<T>) -> OMatrix<T, U1, U9> {
        let phi = |alpha, beta, xi: &Point2<T>| phi_quadratic_1d(alpha, xi[0]) * phi_quadratic_1d(beta, xi[1]);
        OMatrix::<_, U1, U9>::from_row_slice(&[
            phi(-1.0, -1.0, xi),
            phi( 1.0, -1.0, xi),
            phi( 1.0,  1.0, xi),
            phi(-1.0,  1.0, xi),
            phi( 0.0, -1.0, xi),
            phi( 1.0,  0.0, xi),
            phi( 0.0,  1.0, xi),
            phi(-1.0,  0.0, xi),
            phi( 0.0,  0.0, xi)
        ])
    }

    #[rustfmt::skip]
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn gradients(&self, xi: &Point2<T>) -> OMatrix<T, U2, U9> {
        let phi_grad = |alpha, beta, xi: &Point2<T>|
            Vector2::new(
                phi_quadratic_1d_grad(alpha, xi[0]) * phi_quadratic_1d(beta, xi[1]),
                phi_quadratic_1d(alpha, xi[0]) * phi_quadratic_1d_grad(beta, xi[1]),
            );

        OMatrix::from_columns(&[
            phi_grad(-1.0, -1.0, xi),
            phi_grad( 1.0, -1.0, xi),
            phi_grad( 1.0,  1.0, xi),
            phi_grad(-1.0,  1.0, xi),
            phi_grad( 0.0, -1.0, xi),
            phi_grad( 1.0,  0.0, xi),
            phi_grad( 0.0,  1.0, xi),
            phi_grad(-1.0,  0.0, xi),
            phi_grad( 0.0,  0.0, xi)
        ])
    }
}

impl_isoparametric_finite_element!(
    Quad9d2Element,
    geometry = U2,
    reference = U2,
    nodes = U9,
    shape = ShapeType::Quadrilateral
);
impl_reference_mapping_for_volumetric!(Quad9d2Element, U2);

/// A bilinear quadrilateral embedded in three dimensions, used for facets of volumetric meshes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Quad4d3Element<T>
where
    T: Scalar,
{
    vertices: [Point3<T>; 4],
}

impl<T> Quad4d3Element<T>
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

impl<T> FixedNodesReferenceFiniteElement<T> for Quad4d3Element<T>
where
    T: Real,
{
    type ReferenceDim = U2;
    type NodalDim = U4;

    fn evaluate_basis(&self, xi: &Point2<T>) -> Matrix1x4<T> {
        bilinear_basis(xi)
    }

    fn gradients(&self, xi: &Point2<T>) -> Matrix2x4<T> {
        bilinear_gradients(xi)
    }
}

impl_isoparametric_finite_element!(
    Quad4d3Element,
    geometry = U3,
    reference = U2,
    nodes = U4,
    shape = ShapeType::Quadrilateral
);

impl<T> SurfaceFiniteElement<T> for Quad4d3Element<T>
where
    T: Real,
{
    fn normal(&self, xi: &Point2<T>) -> Vector3<T> {
        let j = self.reference_jacobian(xi);
        j.column(0).cross(&j.column(1)).normalize()
    }
}
