use crate::{Hyperball, LineSegment};
use nalgebra::allocator::Allocator;
use nalgebra::{DefaultAllocator, DimName, OPoint, OVector, Scalar, Unit, U3};
use numeric_literals::replace_float_literals;
use particle_mesh_traits::Real;

/// A hyperplane given by a point on the plane and a unit normal.
///
/// In two dimensions this is a line, in three dimensions a plane.
#[derive(Debug, Clone, PartialEq)]
pub struct Hyperplane<T, D>
where
    T: Scalar,
    D: DimName,
    DefaultAllocator: Allocator<T, D>,
{
    point: OPoint<T, D>,
    normal: Unit<OVector<T, D>>,
}

pub type Plane<T> = Hyperplane<T, U3>;

impl<T, D> Hyperplane<T, D>
where
    T: Real,
    D: DimName,
    DefaultAllocator: Allocator<T, D>,
{
    pub fn from_point_and_normal(point: OPoint<T, D>, normal: Unit<OVector<T, D>>) -> Self {
        Self { point, normal }
    }

    pub fn normal(&self) -> &Unit<OVector<T, D>> {
        &self.normal
    }

    pub fn point(&self) -> &OPoint<T, D> {
        &self.point
    }

    pub fn signed_distance(&self, x: &OPoint<T, D>) -> T {
        self.normal.dot(&(x - &self.point))
    }
}

/// Cheap trajectory pre-filter for a planar facet.
///
/// Combines the facet's supporting hyperplane with a bounding ball around the facet
/// vertices. A segment that crosses the plane at a point outside the ball can not hit the
/// facet. The converse does not hold, so candidates that pass must still be confirmed
/// with an exact containment test.
#[derive(Debug, Clone, PartialEq)]
pub struct LinePlaneIntersection<T, D>
where
    T: Scalar,
    D: DimName,
    DefaultAllocator: Allocator<T, D>,
{
    plane: Hyperplane<T, D>,
    proxy: Hyperball<T, D>,
}

impl<T, D> LinePlaneIntersection<T, D>
where
    T: Real,
    D: DimName,
    DefaultAllocator: Allocator<T, D>,
{
    /// Builds the pre-filter for a facet with the given vertices and unit normal.
    ///
    /// The bounding ball is inflated by 5% so that points on the facet boundary survive
    /// the filter under roundoff. Returns `None` if `vertices` is empty.
    #[replace_float_literals(T::from_f64(literal).unwrap())]
    pub fn from_vertices_and_normal(vertices: &[OPoint<T, D>], normal: Unit<OVector<T, D>>) -> Option<Self> {
        let ball = Hyperball::enclosing_points(vertices)?;
        let proxy = Hyperball::from_center_and_radius(ball.center().clone(), ball.radius() * 1.05);
        let plane = Hyperplane::from_point_and_normal(vertices[0].clone(), normal);
        Some(Self { plane, proxy })
    }

    pub fn plane(&self) -> &Hyperplane<T, D> {
        &self.plane
    }

    pub fn proxy(&self) -> &Hyperball<T, D> {
        &self.proxy
    }

    /// Intersection of the segment from `p0` to `p1` with the facet plane, if any.
    pub fn line_intersection(&self, p0: &OPoint<T, D>, p1: &OPoint<T, D>) -> Option<OPoint<T, D>> {
        LineSegment::from_end_points([p0.clone(), p1.clone()]).intersect_hyperplane(&self.plane)
    }

    pub fn point_near_to_geom(&self, point: &OPoint<T, D>) -> bool {
        self.proxy.contains_point(point)
    }
}
