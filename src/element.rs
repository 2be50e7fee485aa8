//! Reference elements and their maps onto physical space.
//!
//! Reference domains follow the collapsed-coordinate conventions used throughout the crate:
//!
//! - segment, quadrilateral and hexahedron: `[-1, 1]^d`
//! - triangle: corners `(-1, -1)`, `(1, -1)`, `(-1, 1)`
//! - tetrahedron: `xi_i >= -1`, `xi_0 + xi_1 + xi_2 <= -1`
//! - prism: `xi_i in [-1, 1]`, `xi_0 + xi_2 <= 0` (a triangle in `(xi_0, xi_2)` extruded along `xi_1`)
//! - pyramid: `xi_i in [-1, 1]`, `xi_0 + xi_2 <= 0`, `xi_1 + xi_2 <= 0` (apex at `(-1, -1, 1)`)
use nalgebra::allocator::Allocator;
use nalgebra::{DefaultAllocator, OMatrix, OPoint, OVector, Scalar, U1};
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};

use crate::allocators::{BiDimAllocator, DimAllocator};
use crate::{Real, SmallDim};

mod embedded;
mod hexahedron;
mod prism;
mod pyramid;
mod quadrilateral;
mod segment;
mod tetrahedron;
mod triangle;

pub use embedded::*;
pub use hexahedron::*;
pub use prism::*;
pub use pyramid::*;
pub use quadrilateral::*;
pub use segment::*;
pub use tetrahedron::*;
pub use triangle::*;

/// Shape of a mesh cell or facet.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u32)]
pub enum ShapeType {
    Segment = 0,
    Triangle = 1,
    Quadrilateral = 2,
    Tetrahedron = 3,
    Prism = 4,
    Pyramid = 5,
    Hexahedron = 6,
}

/// Polynomial order of the geometric map of an element.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u32)]
pub enum GeometryOrder {
    Linear = 1,
    /// Curved elements described by Lagrange control points.
    Quadratic = 2,
}

/// Denominators in the collapsed-coordinate maps are kept at least this far from zero.
const COLLAPSE_EPS: f64 = 1e-12;

impl ShapeType {
    pub const ALL: [ShapeType; 7] = [
        ShapeType::Segment,
        ShapeType::Triangle,
        ShapeType::Quadrilateral,
        ShapeType::Tetrahedron,
        ShapeType::Prism,
        ShapeType::Pyramid,
        ShapeType::Hexahedron,
    ];

    pub fn from_u32(value: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|shape| *shape as u32 == value)
    }

    pub fn reference_dim(&self) -> usize {
        match self {
            ShapeType::Segment => 1,
            ShapeType::Triangle | ShapeType::Quadrilateral => 2,
            _ => 3,
        }
    }

    pub fn num_vertices(&self) -> usize {
        match self {
            ShapeType::Segment => 2,
            ShapeType::Triangle => 3,
            ShapeType::Quadrilateral => 4,
            ShapeType::Tetrahedron => 4,
            ShapeType::Prism => 6,
            ShapeType::Pyramid => 5,
            ShapeType::Hexahedron => 8,
        }
    }

    /// Number of geometry nodes for an element of the given order.
    ///
    /// Returns `None` for combinations without a curved representation.
    pub fn num_nodes(&self, order: GeometryOrder) -> Option<usize> {
        match order {
            GeometryOrder::Linear => Some(self.num_vertices()),
            GeometryOrder::Quadratic => match self {
                ShapeType::Segment => None,
                ShapeType::Triangle => Some(6),
                ShapeType::Quadrilateral => Some(9),
                ShapeType::Tetrahedron => Some(10),
                ShapeType::Prism => Some(18),
                ShapeType::Pyramid => None,
                ShapeType::Hexahedron => Some(27),
            },
        }
    }

    /// Reference coordinates of the vertices, in the vertex order of the linear element.
    ///
    /// Entries beyond the reference dimension are zero.
    #[rustfmt::skip]
    pub fn reference_vertices(&self) -> &'static [[f64; 3]] {
        match self {
            ShapeType::Segment => &[[-1.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
            ShapeType::Triangle => &[[-1.0, -1.0, 0.0], [1.0, -1.0, 0.0], [-1.0, 1.0, 0.0]],
            ShapeType::Quadrilateral => &[[-1.0, -1.0, 0.0], [1.0, -1.0, 0.0], [1.0, 1.0, 0.0], [-1.0, 1.0, 0.0]],
            ShapeType::Tetrahedron => &[
                [-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [-1.0, 1.0, -1.0], [-1.0, -1.0, 1.0],
            ],
            ShapeType::Prism => &[
                [-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [-1.0, -1.0, 1.0],
                [-1.0,  1.0, -1.0], [1.0,  1.0, -1.0], [-1.0,  1.0, 1.0],
            ],
            ShapeType::Pyramid => &[
                [-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [1.0, 1.0, -1.0], [-1.0, 1.0, -1.0],
                [-1.0, -1.0, 1.0],
            ],
            ShapeType::Hexahedron => &[
                [-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [1.0, 1.0, -1.0], [-1.0, 1.0, -1.0],
                [-1.0, -1.0,  1.0], [1.0, -1.0,  1.0], [1.0, 1.0,  1.0], [-1.0, 1.0,  1.0],
            ],
        }
    }

    /// Reference coordinates of all geometry nodes of the element with the given order,
    /// in node order.
    pub fn reference_nodes(&self, order: GeometryOrder) -> Option<Vec<[f64; 3]>> {
        let pad2 = |p: &nalgebra::Point2<f64>| [p.x, p.y, 0.0];
        let pad3 = |p: &nalgebra::Point3<f64>| [p.x, p.y, p.z];
        match (self, order) {
            (_, GeometryOrder::Linear) => Some(self.reference_vertices().to_vec()),
            (ShapeType::Triangle, GeometryOrder::Quadratic) => {
                Some(Tri6d2Element::<f64>::reference().vertices().iter().map(pad2).collect())
            }
            (ShapeType::Quadrilateral, GeometryOrder::Quadratic) => {
                Some(Quad9d2Element::<f64>::reference().vertices().iter().map(pad2).collect())
            }
            (ShapeType::Tetrahedron, GeometryOrder::Quadratic) => {
                Some(Tet10Element::<f64>::reference().vertices().iter().map(pad3).collect())
            }
            (ShapeType::Prism, GeometryOrder::Quadratic) => {
                Some(Prism18Element::<f64>::reference().vertices().iter().map(pad3).collect())
            }
            (ShapeType::Hexahedron, GeometryOrder::Quadratic) => {
                Some(Hex27Element::<f64>::reference().vertices().iter().map(pad3).collect())
            }
            _ => None,
        }
    }

    /// Positions of the vertices among the geometry nodes of an element of the given order.
    pub fn vertex_nodes(&self, order: GeometryOrder) -> &'static [usize] {
        const LEADING: [usize; 8] = [0, 1, 2, 3, 4, 5, 6, 7];
        match (self, order) {
            // Vertices of the upper triangle start the second node layer.
            (ShapeType::Prism, GeometryOrder::Quadratic) => &[0, 1, 2, 6, 7, 8],
            _ => &LEADING[..self.num_vertices()],
        }
    }

    /// Whether the linear map of the shape is always affine.
    pub fn is_simplex(&self) -> bool {
        matches!(self, ShapeType::Segment | ShapeType::Triangle | ShapeType::Tetrahedron)
    }

    /// Local vertex indices of the facets of the shape, ordered consistently with the
    /// vertex orderings of the linear elements.
    pub fn facets(&self) -> &'static [&'static [usize]] {
        match self {
            ShapeType::Segment => &[&[0], &[1]],
            ShapeType::Triangle => &[&[0, 1], &[1, 2], &[2, 0]],
            ShapeType::Quadrilateral => &[&[0, 1], &[1, 2], &[2, 3], &[3, 0]],
            ShapeType::Tetrahedron => &[&[0, 2, 1], &[0, 1, 3], &[1, 2, 3], &[0, 3, 2]],
            ShapeType::Prism => &[&[0, 2, 5, 3], &[0, 1, 2], &[3, 5, 4], &[0, 3, 4, 1], &[1, 4, 5, 2]],
            ShapeType::Pyramid => &[&[0, 3, 2, 1], &[0, 1, 4], &[1, 2, 4], &[2, 3, 4], &[3, 0, 4]],
            ShapeType::Hexahedron => &[
                &[0, 3, 2, 1],
                &[4, 5, 6, 7],
                &[0, 1, 5, 4],
                &[1, 2, 6, 5],
                &[2, 3, 7, 6],
                &[3, 0, 4, 7],
            ],
        }
    }

    /// Shape of a facet with the given number of vertices.
    pub fn facet_shape(num_vertices: usize) -> Option<ShapeType> {
        match num_vertices {
            2 => Some(ShapeType::Segment),
            3 => Some(ShapeType::Triangle),
            4 => Some(ShapeType::Quadrilateral),
            _ => None,
        }
    }

    /// A point inside the reference domain used as the initial Newton iterate.
    ///
    /// Entries beyond the reference dimension are zero.
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn reference_centroid<T: Real>(&self) -> [T; 3] {
        match self {
            ShapeType::Segment | ShapeType::Quadrilateral | ShapeType::Hexahedron => [0.0, 0.0, 0.0],
            ShapeType::Triangle => [-1.0 / 3.0, -1.0 / 3.0, 0.0],
            ShapeType::Tetrahedron => [-0.5, -0.5, -0.5],
            ShapeType::Prism => [-1.0 / 3.0, 0.0, -1.0 / 3.0],
            ShapeType::Pyramid => [-0.5, -0.5, -0.5],
        }
    }

    /// Maps reference coordinates to collapsed coordinates.
    ///
    /// Only the first `reference_dim()` entries of `xi` are read and written to `eta`.
    /// A point lies in the reference domain exactly when all collapsed coordinates lie in
    /// `[-1, 1]`.
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn collapse_coordinates<T: Real>(&self, xi: &[T], eta: &mut [T]) {
        let guard = |d: T| {
            let eps = T::from_f64(COLLAPSE_EPS).expect("Literal must fit in T");
            if d.abs() < eps {
                if d < 0.0 {
                    -eps
                } else {
                    eps
                }
            } else {
                d
            }
        };

        match self {
            ShapeType::Segment => {
                eta[0] = xi[0];
            }
            ShapeType::Quadrilateral => {
                eta[0] = xi[0];
                eta[1] = xi[1];
            }
            ShapeType::Hexahedron => {
                eta[0] = xi[0];
                eta[1] = xi[1];
                eta[2] = xi[2];
            }
            ShapeType::Triangle => {
                let d1 = guard(1.0 - xi[1]);
                eta[0] = 2.0 * (1.0 + xi[0]) / d1 - 1.0;
                eta[1] = xi[1];
            }
            ShapeType::Tetrahedron => {
                let d12 = guard(-xi[1] - xi[2]);
                let d2 = guard(1.0 - xi[2]);
                eta[0] = 2.0 * (1.0 + xi[0]) / d12 - 1.0;
                eta[1] = 2.0 * (1.0 + xi[1]) / d2 - 1.0;
                eta[2] = xi[2];
            }
            ShapeType::Prism => {
                let d2 = guard(1.0 - xi[2]);
                eta[0] = 2.0 * (1.0 + xi[0]) / d2 - 1.0;
                eta[1] = xi[1];
                eta[2] = xi[2];
            }
            ShapeType::Pyramid => {
                let d2 = guard(1.0 - xi[2]);
                eta[0] = 2.0 * (1.0 + xi[0]) / d2 - 1.0;
                eta[1] = 2.0 * (1.0 + xi[1]) / d2 - 1.0;
                eta[2] = xi[2];
            }
        }
    }
}

impl ShapeType {
    /// Inverse of [`collapse_coordinates`](Self::collapse_coordinates) for collapsed coordinates
    /// in `[-1, 1]`.
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    pub fn uncollapse_coordinates<T: Real>(&self, eta: &[T], xi: &mut [T]) {
        let stretch = |e: T, length: T| (1.0 + e) * length / 2.0 - 1.0;
        match self {
            ShapeType::Segment | ShapeType::Quadrilateral | ShapeType::Hexahedron => {
                xi[..self.reference_dim()].copy_from_slice(&eta[..self.reference_dim()]);
            }
            ShapeType::Triangle => {
                xi[1] = eta[1];
                xi[0] = stretch(eta[0], 1.0 - xi[1]);
            }
            ShapeType::Tetrahedron => {
                xi[2] = eta[2];
                xi[1] = stretch(eta[1], 1.0 - xi[2]);
                xi[0] = stretch(eta[0], -xi[1] - xi[2]);
            }
            ShapeType::Prism => {
                xi[2] = eta[2];
                xi[1] = eta[1];
                xi[0] = stretch(eta[0], 1.0 - xi[2]);
            }
            ShapeType::Pyramid => {
                xi[2] = eta[2];
                xi[1] = stretch(eta[1], 1.0 - xi[2]);
                xi[0] = stretch(eta[0], 1.0 - xi[2]);
            }
        }
    }
}

/// Tests whether collapsed coordinates lie in `[-1 - tol, 1 + tol]`.
pub fn is_contained<T: Real>(eta: &[T], tol: T) -> bool {
    let upper = T::one() + tol;
    let lower = -upper;
    eta.iter().all(|&e| e >= lower && e <= upper)
}

/// Reference finite elements with a number of nodes fixed at compile-time.
pub trait FixedNodesReferenceFiniteElement<T>
where
    T: Scalar,
    DefaultAllocator: DimAllocator<T, Self::ReferenceDim>
        + Allocator<T, U1, Self::NodalDim>
        + Allocator<T, Self::ReferenceDim, Self::NodalDim>,
{
    type ReferenceDim: SmallDim;
    type NodalDim: SmallDim;

    /// Evaluates each basis function at the given reference coordinates. The result is given
    /// in a row vector where each entry is the value of the corresponding basis function.
    fn evaluate_basis(&self, reference_coords: &OPoint<T, Self::ReferenceDim>) -> OMatrix<T, U1, Self::NodalDim>;

    /// Given nodal weights, construct a matrix whose columns are the
    /// gradients of each shape function in the element.
    fn gradients(
        &self,
        reference_coords: &OPoint<T, Self::ReferenceDim>,
    ) -> OMatrix<T, Self::ReferenceDim, Self::NodalDim>;
}

pub trait FiniteElement<T>
where
    T: Scalar,
    DefaultAllocator: BiDimAllocator<T, Self::GeometryDim, Self::ReferenceDim>,
{
    type GeometryDim: SmallDim;
    type ReferenceDim: SmallDim;

    fn shape(&self) -> ShapeType;

    /// Compute the Jacobian of the transformation from the reference element to the given
    /// element at the given reference coordinates.
    fn reference_jacobian(
        &self,
        reference_coords: &OPoint<T, Self::ReferenceDim>,
    ) -> OMatrix<T, Self::GeometryDim, Self::ReferenceDim>;

    /// Maps reference coordinates to physical coordinates in the element.
    fn map_reference_coords(&self, reference_coords: &OPoint<T, Self::ReferenceDim>) -> OPoint<T, Self::GeometryDim>;

    /// The diameter of the finite element.
    ///
    /// The diameter of a finite element is defined as the largest distance between any two
    /// points in the element.
    fn diameter(&self) -> T;
}

pub trait SurfaceFiniteElement<T>: FiniteElement<T>
where
    T: Scalar,
    DefaultAllocator: BiDimAllocator<T, Self::GeometryDim, Self::ReferenceDim>,
{
    /// Compute the unit normal at the point associated with the provided reference coordinate.
    fn normal(&self, xi: &OPoint<T, Self::ReferenceDim>) -> OVector<T, Self::GeometryDim>;
}

/// A square map from a reference domain onto physical space.
///
/// This is the capability the Newton inverse-mapping kernel is generic over.
pub trait ReferenceMapping<T>
where
    T: Real,
    DefaultAllocator: DimAllocator<T, Self::Dim>,
{
    type Dim: SmallDim;

    fn shape(&self) -> ShapeType;

    fn map_reference_coords(&self, xi: &OPoint<T, Self::Dim>) -> OPoint<T, Self::Dim>;

    fn reference_jacobian(&self, xi: &OPoint<T, Self::Dim>) -> OMatrix<T, Self::Dim, Self::Dim>;

    /// Collapsed coordinates of `xi`.
    ///
    /// Coordinates beyond the reference dimension of the shape are passed through unchanged.
    fn collapse_coordinates(&self, xi: &OPoint<T, Self::Dim>) -> OPoint<T, Self::Dim> {
        let mut eta = xi.clone();
        self.shape()
            .collapse_coordinates(xi.coords.as_slice(), eta.coords.as_mut_slice());
        eta
    }

    fn initial_iterate(&self) -> OPoint<T, Self::Dim> {
        let centroid = self.shape().reference_centroid::<T>();
        OPoint::from(OVector::<T, Self::Dim>::from_fn(|i, _| centroid[i]))
    }
}

/// Implements `FiniteElement` for an element whose geometry is interpolated by its own basis
/// functions from the nodes stored in `self.vertices`.
macro_rules! impl_isoparametric_finite_element {
    ($element:ident, geometry = $geometry_dim:ty, reference = $reference_dim:ty, nodes = $nodal_dim:ty, shape = $shape:expr) => {
        impl<T> $crate::element::FiniteElement<T> for $element<T>
        where
            T: $crate::Real,
        {
            type GeometryDim = $geometry_dim;
            type ReferenceDim = $reference_dim;

            fn shape(&self) -> $crate::element::ShapeType {
                $shape
            }

            #[allow(non_snake_case)]
            fn reference_jacobian(
                &self,
                xi: &nalgebra::OPoint<T, $reference_dim>,
            ) -> nalgebra::OMatrix<T, $geometry_dim, $reference_dim> {
                use $crate::element::FixedNodesReferenceFiniteElement;
                let X = nalgebra::OMatrix::<T, $geometry_dim, $nodal_dim>::from_fn(|i, j| self.vertices[j][i]);
                let G = self.gradients(xi);
                X * G.transpose()
            }

            #[allow(non_snake_case)]
            fn map_reference_coords(&self, xi: &nalgebra::OPoint<T, $reference_dim>) -> nalgebra::OPoint<T, $geometry_dim> {
                use $crate::element::FixedNodesReferenceFiniteElement;
                let X = nalgebra::OMatrix::<T, $geometry_dim, $nodal_dim>::from_fn(|i, j| self.vertices[j][i]);
                let N = self.evaluate_basis(xi);
                nalgebra::OPoint::from(&X * &N.transpose())
            }

            fn diameter(&self) -> T {
                use itertools::Itertools;
                self.vertices
                    .iter()
                    .tuple_combinations()
                    .map(|(x, y)| (x - y).norm())
                    .fold(T::zero(), |a, b| a.max(b))
            }
        }
    };
}

/// Implements `ReferenceMapping` for an element whose reference and geometry dimensions agree.
macro_rules! impl_reference_mapping_for_volumetric {
    ($element:ident, $dim:ty) => {
        impl<T> $crate::element::ReferenceMapping<T> for $element<T>
        where
            T: $crate::Real,
        {
            type Dim = $dim;

            fn shape(&self) -> $crate::element::ShapeType {
                $crate::element::FiniteElement::shape(self)
            }

            fn map_reference_coords(&self, xi: &nalgebra::OPoint<T, $dim>) -> nalgebra::OPoint<T, $dim> {
                $crate::element::FiniteElement::map_reference_coords(self, xi)
            }

            fn reference_jacobian(&self, xi: &nalgebra::OPoint<T, $dim>) -> nalgebra::OMatrix<T, $dim, $dim> {
                $crate::element::FiniteElement::reference_jacobian(self, xi)
            }
        }
    };
}

pub(crate) use impl_isoparametric_finite_element;
pub(crate) use impl_reference_mapping_for_volumetric;

/// Linear basis function on the interval [-1, 1].
///
///`alpha == -1` denotes the basis function associated with the node at `x == -1`,
/// and `alpha == 1` for `x == 1`.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
#[inline(always)]
pub(crate) fn phi_linear_1d<T>(alpha: T, xi: T) -> T
where
    T: Real,
{
    (1.0 + alpha * xi) / 2.0
}

/// Gradient for the linear basis function on the interval [-1, 1].
///
/// See `phi_linear_1d` for the meaning of `alpha`.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
#[inline(always)]
pub(crate) fn phi_linear_1d_grad<T>(alpha: T) -> T
where
    T: Real,
{
    alpha / 2.0
}

/// Quadratic basis function on the interval [-1, 1].
///
/// `alpha == -1` denotes the basis function associated with the node at `x == -1`,
/// `alpha == 0` denotes the basis function associated with the node at `x == 0`,
/// and `alpha == 1` for `x == 1`.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
#[inline(always)]
pub(crate) fn phi_quadratic_1d<T>(alpha: T, xi: T) -> T
where
    T: Real,
{
    let alpha2 = alpha * alpha;
    let xi2 = xi * xi;
    (3.0 / 2.0 * alpha2 - 1.0) * xi2 + 0.5 * alpha * xi + 1.0 - alpha2
}

/// Derivative of quadratic basis function on the interval [-1, 1].
///
/// See `phi_quadratic_1d` for the meaning of `alpha`.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
#[inline(always)]
pub(crate) fn phi_quadratic_1d_grad<T>(alpha: T, xi: T) -> T
where
    T: Real,
{
    let alpha2 = alpha * alpha;
    2.0 * (3.0 / 2.0 * alpha2 - 1.0) * xi + 0.5 * alpha
}
