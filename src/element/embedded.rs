use crate::element::{
    FiniteElement, Quad4d3Element, ReferenceMapping, Segment2d2Element, ShapeType, SurfaceFiniteElement,
    Tri3d3Element,
};
use crate::nalgebra::{Matrix2, Matrix3, OPoint, OVector, Point1, Point2, Scalar, Vector2, Vector3, U2, U3};
use crate::Real;

/// A surface element made square by adding the offset along its normal as a last coordinate.
///
/// For reference coordinates `(xi_r, s)` the map is `x = X(xi_r) + s * n`, where `X` is the map
/// of the surface element and `n` its unit normal at the reference centroid. Solving this map
/// for a point on the surface yields `s = 0` and the surface coordinates `xi_r`.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedFacet<E, N> {
    element: E,
    normal: N,
}

impl<E, N> EmbeddedFacet<E, N>
where
    N: Clone,
{
    pub fn element(&self) -> &E {
        &self.element
    }

    pub fn normal(&self) -> N {
        self.normal.clone()
    }
}

pub type EmbeddedSegment2d<T> = EmbeddedFacet<Segment2d2Element<T>, Vector2<T>>;
pub type EmbeddedTriangle3d<T> = EmbeddedFacet<Tri3d3Element<T>, Vector3<T>>;
pub type EmbeddedQuadrilateral3d<T> = EmbeddedFacet<Quad4d3Element<T>, Vector3<T>>;

impl<T: Scalar> EmbeddedSegment2d<T> {
    /// Embeds a segment with a precomputed unit normal.
    pub fn from_element_and_normal(element: Segment2d2Element<T>, normal: Vector2<T>) -> Self {
        Self { element, normal }
    }
}

impl<T: Real> EmbeddedSegment2d<T> {
    pub fn new(element: Segment2d2Element<T>) -> Self {
        let normal = element.normal(&Point1::origin());
        Self { element, normal }
    }
}

impl<T: Scalar> EmbeddedTriangle3d<T> {
    pub fn from_element_and_normal(element: Tri3d3Element<T>, normal: Vector3<T>) -> Self {
        Self { element, normal }
    }
}

impl<T: Real> EmbeddedTriangle3d<T> {
    pub fn new(element: Tri3d3Element<T>) -> Self {
        let centroid = ShapeType::Triangle.reference_centroid::<T>();
        let normal = element.normal(&Point2::new(centroid[0], centroid[1]));
        Self { element, normal }
    }
}

impl<T: Scalar> EmbeddedQuadrilateral3d<T> {
    pub fn from_element_and_normal(element: Quad4d3Element<T>, normal: Vector3<T>) -> Self {
        Self { element, normal }
    }
}

impl<T: Real> EmbeddedQuadrilateral3d<T> {
    pub fn new(element: Quad4d3Element<T>) -> Self {
        let normal = element.normal(&Point2::origin());
        Self { element, normal }
    }
}

macro_rules! impl_reference_mapping_for_embedded {
    ($element:ident, dim = $dim:ty, surface_dim = $rdim:literal, $surface_point:ident, $jacobian:ident) => {
        impl<T: Real> ReferenceMapping<T> for EmbeddedFacet<$element<T>, OVector<T, $dim>> {
            type Dim = $dim;

            fn shape(&self) -> ShapeType {
                self.element.shape()
            }

            fn map_reference_coords(&self, xi: &OPoint<T, $dim>) -> OPoint<T, $dim> {
                let xi_r = $surface_point::from(xi.coords.fixed_rows::<$rdim>(0).into_owned());
                self.element.map_reference_coords(&xi_r) + self.normal * xi[$rdim]
            }

            fn reference_jacobian(&self, xi: &OPoint<T, $dim>) -> $jacobian<T> {
                let xi_r = $surface_point::from(xi.coords.fixed_rows::<$rdim>(0).into_owned());
                let mut j = $jacobian::zeros();
                j.fixed_columns_mut::<$rdim>(0)
                    .copy_from(&self.element.reference_jacobian(&xi_r));
                j.set_column($rdim, &self.normal);
                j
            }
        }
    };
}

impl_reference_mapping_for_embedded!(Segment2d2Element, dim = U2, surface_dim = 1, Point1, Matrix2);
impl_reference_mapping_for_embedded!(Tri3d3Element, dim = U3, surface_dim = 2, Point2, Matrix3);
impl_reference_mapping_for_embedded!(Quad4d3Element, dim = U3, surface_dim = 2, Point2, Matrix3);
