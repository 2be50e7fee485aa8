//! Dispatch from runtime shape tags to the statically typed elements of each dimension.
use nalgebra::{DefaultAllocator, OMatrix, OPoint, OVector, Point1, Point2, Point3, Unit, U2, U3};

use crate::allocators::DimAllocator;
use crate::element::{
    EmbeddedQuadrilateral3d, EmbeddedSegment2d, EmbeddedTriangle3d, FiniteElement, GeometryOrder, Hex27Element,
    Hex8Element, Prism18Element, Prism6Element, Pyramid5Element, Quad4d2Element, Quad4d3Element, Quad9d2Element,
    ReferenceMapping, Segment2d2Element, ShapeType, SurfaceFiniteElement, Tet10Element, Tet4Element, Tri3d2Element,
    Tri3d3Element, Tri6d2Element,
};
use crate::mapping::{x_inverse_with_strategy, MappingResult, MappingSettings, NewtonStrategy};
use crate::SmallDim;

/// An operation applied to a statically typed element map.
///
/// Shapes are only known at runtime, so callers package the work to be done on the concrete
/// element into a visitor and hand it to [`MeshDim::visit_cell`] or [`MeshDim::visit_facet`].
pub trait MappingVisitor<D>
where
    D: SmallDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    type Output;

    fn visit<M>(self, mapping: &M) -> Self::Output
    where
        M: ReferenceMapping<f64, Dim = D>;
}

/// Spatial dimension of a mesh.
///
/// Implemented for `U2` (triangle and quadrilateral cells with segment facets) and `U3`
/// (tetrahedron, prism, pyramid and hexahedron cells with triangle and quadrilateral facets).
pub trait MeshDim: SmallDim + Send + Sync
where
    DefaultAllocator: DimAllocator<f64, Self>,
{
    fn cell_shapes() -> &'static [ShapeType];

    fn facet_shapes() -> &'static [ShapeType];

    /// Builds the element of the given shape and order from its nodes and applies the visitor.
    ///
    /// Returns `None` if the shape is not a cell shape of this dimension, or if the number of
    /// nodes does not match the shape and order.
    fn visit_cell<V>(
        shape: ShapeType,
        order: GeometryOrder,
        nodes: &[OPoint<f64, Self>],
        visitor: V,
    ) -> Option<V::Output>
    where
        V: MappingVisitor<Self>;

    /// Builds the embedded facet with the given vertices and unit normal and applies the visitor.
    fn visit_facet<V>(
        shape: ShapeType,
        nodes: &[OPoint<f64, Self>],
        normal: &OVector<f64, Self>,
        visitor: V,
    ) -> Option<V::Output>
    where
        V: MappingVisitor<Self>;

    /// Unit normal of a planar facet. The orientation follows the vertex order.
    fn facet_normal(shape: ShapeType, nodes: &[OPoint<f64, Self>]) -> Option<Unit<OVector<f64, Self>>>;

    fn cell_mapping_inverse(
        shape: ShapeType,
        order: GeometryOrder,
        nodes: &[OPoint<f64, Self>],
        x: &OPoint<f64, Self>,
        settings: &MappingSettings,
        strategy: NewtonStrategy,
    ) -> Option<MappingResult<Self>> {
        Self::visit_cell(shape, order, nodes, InverseVisitor { x, settings, strategy })
    }

    fn facet_mapping_inverse(
        shape: ShapeType,
        nodes: &[OPoint<f64, Self>],
        normal: &OVector<f64, Self>,
        x: &OPoint<f64, Self>,
        settings: &MappingSettings,
    ) -> Option<MappingResult<Self>> {
        let visitor = InverseVisitor {
            x,
            settings,
            strategy: NewtonStrategy::Plain,
        };
        Self::visit_facet(shape, nodes, normal, visitor)
    }

    fn map_cell(
        shape: ShapeType,
        order: GeometryOrder,
        nodes: &[OPoint<f64, Self>],
        xi: &OPoint<f64, Self>,
    ) -> Option<OPoint<f64, Self>> {
        Self::visit_cell(shape, order, nodes, ForwardVisitor { xi })
    }

    fn cell_jacobian(
        shape: ShapeType,
        order: GeometryOrder,
        nodes: &[OPoint<f64, Self>],
        xi: &OPoint<f64, Self>,
    ) -> Option<OMatrix<f64, Self, Self>> {
        Self::visit_cell(shape, order, nodes, JacobianVisitor { xi })
    }

    /// Whether the map of a linear cell is affine up to a relative tolerance.
    ///
    /// Simplices are always affine. For other shapes the Jacobian is sampled at the reference
    /// centroid and halfway towards each reference vertex, and must agree everywhere.
    fn is_affine(shape: ShapeType, order: GeometryOrder, nodes: &[OPoint<f64, Self>], tol: f64) -> bool {
        if order != GeometryOrder::Linear {
            return false;
        }
        if shape.is_simplex() {
            return true;
        }
        let centroid = reference_point::<Self>(&shape.reference_centroid::<f64>());
        let Some(j0) = Self::cell_jacobian(shape, order, nodes, &centroid) else {
            return false;
        };
        let scale = j0.norm();
        shape.reference_vertices().iter().all(|vertex| {
            let xi = OPoint::from((centroid.coords.clone() + reference_point::<Self>(vertex).coords) * 0.5);
            Self::cell_jacobian(shape, order, nodes, &xi)
                .map(|j| (j - &j0).norm() <= tol * scale)
                .unwrap_or(false)
        })
    }
}

/// Converts a padded reference coordinate triple to a point of dimension `D`.
pub fn reference_point<D>(coords: &[f64; 3]) -> OPoint<f64, D>
where
    D: SmallDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    OPoint::from(OVector::<f64, D>::from_fn(|i, _| coords[i]))
}

struct InverseVisitor<'a, D>
where
    D: SmallDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    x: &'a OPoint<f64, D>,
    settings: &'a MappingSettings,
    strategy: NewtonStrategy,
}

impl<'a, D> MappingVisitor<D> for InverseVisitor<'a, D>
where
    D: SmallDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    type Output = MappingResult<D>;

    fn visit<M>(self, mapping: &M) -> MappingResult<D>
    where
        M: ReferenceMapping<f64, Dim = D>,
    {
        x_inverse_with_strategy(mapping, self.x, self.settings, self.strategy)
    }
}

struct ForwardVisitor<'a, D>
where
    D: SmallDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    xi: &'a OPoint<f64, D>,
}

impl<'a, D> MappingVisitor<D> for ForwardVisitor<'a, D>
where
    D: SmallDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    type Output = OPoint<f64, D>;

    fn visit<M>(self, mapping: &M) -> OPoint<f64, D>
    where
        M: ReferenceMapping<f64, Dim = D>,
    {
        mapping.map_reference_coords(self.xi)
    }
}

struct JacobianVisitor<'a, D>
where
    D: SmallDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    xi: &'a OPoint<f64, D>,
}

impl<'a, D> MappingVisitor<D> for JacobianVisitor<'a, D>
where
    D: SmallDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    type Output = OMatrix<f64, D, D>;

    fn visit<M>(self, mapping: &M) -> OMatrix<f64, D, D>
    where
        M: ReferenceMapping<f64, Dim = D>,
    {
        mapping.reference_jacobian(self.xi)
    }
}

/// Copies exactly `N` nodes into an array.
fn node_array<P: Copy, const N: usize>(nodes: &[P]) -> Option<[P; N]> {
    <[P; N]>::try_from(nodes).ok()
}

impl MeshDim for U2 {
    fn cell_shapes() -> &'static [ShapeType] {
        &[ShapeType::Triangle, ShapeType::Quadrilateral]
    }

    fn facet_shapes() -> &'static [ShapeType] {
        &[ShapeType::Segment]
    }

    fn visit_cell<V>(shape: ShapeType, order: GeometryOrder, nodes: &[Point2<f64>], visitor: V) -> Option<V::Output>
    where
        V: MappingVisitor<U2>,
    {
        use GeometryOrder::{Linear, Quadratic};
        use ShapeType::{Quadrilateral, Triangle};
        match (shape, order) {
            (Triangle, Linear) => Some(visitor.visit(&Tri3d2Element::from_vertices(node_array(nodes)?))),
            (Triangle, Quadratic) => Some(visitor.visit(&Tri6d2Element::from_vertices(node_array(nodes)?))),
            (Quadrilateral, Linear) => Some(visitor.visit(&Quad4d2Element::from_vertices(node_array(nodes)?))),
            (Quadrilateral, Quadratic) => Some(visitor.visit(&Quad9d2Element::from_vertices(node_array(nodes)?))),
            _ => None,
        }
    }

    fn visit_facet<V>(
        shape: ShapeType,
        nodes: &[Point2<f64>],
        normal: &OVector<f64, U2>,
        visitor: V,
    ) -> Option<V::Output>
    where
        V: MappingVisitor<U2>,
    {
        match shape {
            ShapeType::Segment => {
                let segment = Segment2d2Element::from_vertices(node_array(nodes)?);
                Some(visitor.visit(&EmbeddedSegment2d::from_element_and_normal(segment, *normal)))
            }
            _ => None,
        }
    }

    fn facet_normal(shape: ShapeType, nodes: &[Point2<f64>]) -> Option<Unit<OVector<f64, U2>>> {
        match shape {
            ShapeType::Segment => {
                let segment = Segment2d2Element::from_vertices(node_array(nodes)?);
                let t = segment.vertices()[1] - segment.vertices()[0];
                if t.norm() == 0.0 {
                    return None;
                }
                Some(Unit::new_unchecked(segment.normal(&Point1::origin())))
            }
            _ => None,
        }
    }
}

impl MeshDim for U3 {
    fn cell_shapes() -> &'static [ShapeType] {
        &[
            ShapeType::Tetrahedron,
            ShapeType::Prism,
            ShapeType::Pyramid,
            ShapeType::Hexahedron,
        ]
    }

    fn facet_shapes() -> &'static [ShapeType] {
        &[ShapeType::Triangle, ShapeType::Quadrilateral]
    }

    fn visit_cell<V>(shape: ShapeType, order: GeometryOrder, nodes: &[Point3<f64>], visitor: V) -> Option<V::Output>
    where
        V: MappingVisitor<U3>,
    {
        use GeometryOrder::{Linear, Quadratic};
        use ShapeType::{Hexahedron, Prism, Pyramid, Tetrahedron};
        match (shape, order) {
            (Tetrahedron, Linear) => Some(visitor.visit(&Tet4Element::from_vertices(node_array(nodes)?))),
            (Tetrahedron, Quadratic) => Some(visitor.visit(&Tet10Element::from_vertices(node_array(nodes)?))),
            (Prism, Linear) => Some(visitor.visit(&Prism6Element::from_vertices(node_array(nodes)?))),
            (Prism, Quadratic) => Some(visitor.visit(&Prism18Element::from_vertices(node_array(nodes)?))),
            (Pyramid, Linear) => Some(visitor.visit(&Pyramid5Element::from_vertices(node_array(nodes)?))),
            (Hexahedron, Linear) => Some(visitor.visit(&Hex8Element::from_vertices(node_array(nodes)?))),
            (Hexahedron, Quadratic) => Some(visitor.visit(&Hex27Element::from_vertices(node_array(nodes)?))),
            _ => None,
        }
    }

    fn visit_facet<V>(
        shape: ShapeType,
        nodes: &[Point3<f64>],
        normal: &OVector<f64, U3>,
        visitor: V,
    ) -> Option<V::Output>
    where
        V: MappingVisitor<U3>,
    {
        match shape {
            ShapeType::Triangle => {
                let triangle = Tri3d3Element::from_vertices(node_array(nodes)?);
                Some(visitor.visit(&EmbeddedTriangle3d::from_element_and_normal(triangle, *normal)))
            }
            ShapeType::Quadrilateral => {
                let quad = Quad4d3Element::from_vertices(node_array(nodes)?);
                Some(visitor.visit(&EmbeddedQuadrilateral3d::from_element_and_normal(quad, *normal)))
            }
            _ => None,
        }
    }

    fn facet_normal(shape: ShapeType, nodes: &[Point3<f64>]) -> Option<Unit<OVector<f64, U3>>> {
        let normal = match shape {
            ShapeType::Triangle => {
                let triangle = Tri3d3Element::from_vertices(node_array(nodes)?);
                if triangle.area() == 0.0 {
                    return None;
                }
                triangle.normal(&Point2::new(-1.0 / 3.0, -1.0 / 3.0))
            }
            ShapeType::Quadrilateral => {
                let quad = Quad4d3Element::from_vertices(node_array(nodes)?);
                let j = quad.reference_jacobian(&Point2::origin());
                if j.column(0).cross(&j.column(1)).norm() == 0.0 {
                    return None;
                }
                quad.normal(&Point2::origin())
            }
            _ => return None,
        };
        Some(Unit::new_unchecked(normal))
    }
}
