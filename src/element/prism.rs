use numeric_literals::replace_float_literals;

use crate::element::triangle::{triangle_barycentric, triangle_barycentric_gradients, tri6_basis, tri6_gradients};
use crate::element::{
    impl_isoparametric_finite_element, impl_reference_mapping_for_volumetric, phi_linear_1d, phi_linear_1d_grad,
    phi_quadratic_1d, phi_quadratic_1d_grad, FixedNodesReferenceFiniteElement, ShapeType,
};
use crate::nalgebra::{OMatrix, Point3, Scalar, Vector3, U1, U18, U3, U6};
use crate::Real;

/// A linear prism: the reference triangle in the `(xi_0, xi_2)` plane extruded along `xi_1`.
///
/// Nodes 0, 1, 2 are the triangle corners `(-1, -1)`, `(1, -1)`, `(-1, 1)` on the face
/// `xi_1 = -1`, and nodes 3, 4, 5 are the same corners on the face `xi_1 = 1`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Prism6Element<T>
where
    T: Scalar,
{
    vertices: [Point3<T>; 6],
}

impl<T> Prism6Element<T>
where
    T: Scalar,
{
    pub fn from_vertices(vertices: [Point3<T>; 6]) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point3<T>; 6] {
        &self.vertices
    }
}

impl<T> Prism6Element<T>
where
    T: Real,
{
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn reference() -> Self {
        Self::from_vertices([
            Point3::new(-1.0, -1.0, -1.0),
            Point3::new(1.0, -1.0, -1.0),
            Point3::new(-1.0, -1.0, 1.0),
            Point3::new(-1.0, 1.0, -1.0),
            Point3::new(1.0, 1.0, -1.0),
            Point3::new(-1.0, 1.0, 1.0),
        ])
    }
}

impl<T> FixedNodesReferenceFiniteElement<T> for Prism6Element<T>
where
    T: Real,
{
    type ReferenceDim = U3;
    type NodalDim = U6;

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn evaluate_basis(&self, xi: &Point3<T>) -> OMatrix<T, U1, U6> {
        let lambda = triangle_barycentric(xi[0], xi[2]);
        let layers = [phi_linear_1d(-1.0, xi[1]), phi_linear_1d(1.0, xi[1])];
        OMatrix::<T, U1, U6>::from_fn(|_, i| lambda[i % 3] * layers[i / 3])
    }

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn gradients(&self, xi: &Point3<T>) -> OMatrix<T, U3, U6> {
        let lambda = triangle_barycentric(xi[0], xi[2]);
        let dlambda = triangle_barycentric_gradients::<T>();
        let layers = [phi_linear_1d(-1.0, xi[1]), phi_linear_1d(1.0, xi[1])];
        let dlayers = [phi_linear_1d_grad(-1.0), phi_linear_1d_grad(1.0)];
        let mut grad = OMatrix::<T, U3, U6>::zeros();
        for i in 0..6 {
            let (t, l) = (i % 3, i / 3);
            grad.set_column(
                i,
                &Vector3::new(
                    dlambda[t].x * layers[l],
                    lambda[t] * dlayers[l],
                    dlambda[t].y * layers[l],
                ),
            );
        }
        grad
    }
}

impl_isoparametric_finite_element!(
    Prism6Element,
    geometry = U3,
    reference = U3,
    nodes = U6,
    shape = ShapeType::Prism
);
impl_reference_mapping_for_volumetric!(Prism6Element, U3);

/// A quadratic prism: the six-node triangle in `(xi_0, xi_2)` times a quadratic in `xi_1`.
///
/// Nodes come in three layers of six, at `xi_1 = -1`, `xi_1 = 1` and `xi_1 = 0`. Within each
/// layer the nodes are ordered like `Tri6d2Element`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Prism18Element<T>
where
    T: Scalar,
{
    vertices: [Point3<T>; 18],
}

/// Position of each node layer along `xi_1`.
const PRISM18_LAYERS: [f64; 3] = [-1.0, 1.0, 0.0];

impl<T> Prism18Element<T>
where
    T: Scalar,
{
    pub fn from_vertices(vertices: [Point3<T>; 18]) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point3<T>; 18] {
        &self.vertices
    }
}

impl<T> Prism18Element<T>
where
    T: Real,
{
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn reference() -> Self {
        let tri6 = [(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (0.0, -1.0), (0.0, 0.0), (-1.0, 0.0)];
        let mut vertices = [Point3::origin(); 18];
        for (layer, &y) in PRISM18_LAYERS.iter().enumerate() {
            let y = T::from_f64(y).expect("Literal must fit in T");
            for (k, &(x, z)) in tri6.iter().enumerate() {
                vertices[6 * layer + k] = Point3::new(x, y, z);
            }
        }
        Self::from_vertices(vertices)
    }
}

impl<T> FixedNodesReferenceFiniteElement<T> for Prism18Element<T>
where
    T: Real,
{
    type ReferenceDim = U3;
    type NodalDim = U18;

    fn evaluate_basis(&self, xi: &Point3<T>) -> OMatrix<T, U1, U18> {
        let tri = tri6_basis(xi[0], xi[2]);
        let layers =
            PRISM18_LAYERS.map(|alpha| phi_quadratic_1d(T::from_f64(alpha).expect("Literal must fit in T"), xi[1]));
        OMatrix::<T, U1, U18>::from_fn(|_, i| tri[i % 6] * layers[i / 6])
    }

    fn gradients(&self, xi: &Point3<T>) -> OMatrix<T, U3, U18> {
        let tri = tri6_basis(xi[0], xi[2]);
        let dtri = tri6_gradients(xi[0], xi[2]);
        let alphas = PRISM18_LAYERS.map(|alpha| T::from_f64(alpha).expect("Literal must fit in T"));
        let layers = alphas.map(|alpha| phi_quadratic_1d(alpha, xi[1]));
        let dlayers = alphas.map(|alpha| phi_quadratic_1d_grad(alpha, xi[1]));
        let mut grad = OMatrix::<T, U3, U18>::zeros();
        for i in 0..18 {
            let (t, l) = (i % 6, i / 6);
            grad.set_column(
                i,
                &Vector3::new(dtri[t].x * layers[l], tri[t] * dlayers[l], dtri[t].y * layers[l]),
            );
        }
        grad
    }
}

impl_isoparametric_finite_element!(
    Prism18Element,
    geometry = U3,
    reference = U3,
    nodes = U18,
    shape = ShapeType::Prism
);
impl_reference_mapping_for_volumetric!(Prism18Element, U3);
