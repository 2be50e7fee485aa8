use crate::{AxisAlignedBoundingBox, BoundedGeometry, Hyperplane};
use nalgebra::allocator::Allocator;
use nalgebra::{DefaultAllocator, DimName, OPoint, OVector, Scalar, U2, U3};
use particle_mesh_traits::Real;

/// A line segment between two points in `D` dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSegment<T, D>
where
    T: Scalar,
    D: DimName,
    DefaultAllocator: Allocator<T, D>,
{
    start: OPoint<T, D>,
    end: OPoint<T, D>,
}

pub type LineSegment2d<T> = LineSegment<T, U2>;
pub type LineSegment3d<T> = LineSegment<T, U3>;

impl<T, D> LineSegment<T, D>
where
    T: Scalar,
    D: DimName,
    DefaultAllocator: Allocator<T, D>,
{
    pub fn from_end_points([start, end]: [OPoint<T, D>; 2]) -> Self {
        Self { start, end }
    }

    pub fn start(&self) -> &OPoint<T, D> {
        &self.start
    }

    pub fn end(&self) -> &OPoint<T, D> {
        &self.end
    }
}

impl<T, D> LineSegment<T, D>
where
    T: Real,
    D: DimName,
    DefaultAllocator: Allocator<T, D>,
{
    pub fn direction(&self) -> OVector<T, D> {
        &self.end - &self.start
    }

    pub fn length(&self) -> T {
        self.direction().norm()
    }

    pub fn length_squared(&self) -> T {
        self.direction().norm_squared()
    }

    pub fn point_from_parameter(&self, t: T) -> OPoint<T, D> {
        &self.start + self.direction() * t
    }

    pub fn midpoint(&self) -> OPoint<T, D> {
        self.point_from_parameter(T::from_f64(0.5).unwrap())
    }

    /// Returns the parameter `t` in `[0, 1]` at which the segment crosses the hyperplane.
    ///
    /// Segments parallel to the hyperplane (including segments lying inside it) and
    /// segments of zero length never intersect.
    pub fn intersect_hyperplane_parametric(&self, plane: &Hyperplane<T, D>) -> Option<T> {
        let d = self.direction();
        let denom = plane.normal().dot(&d);
        if denom.abs() <= T::default_epsilon() * d.norm() || d.norm_squared() == T::zero() {
            return None;
        }
        let t = plane.normal().dot(&(plane.point() - &self.start)) / denom;
        (t >= T::zero() && t <= T::one()).then_some(t)
    }

    pub fn intersect_hyperplane(&self, plane: &Hyperplane<T, D>) -> Option<OPoint<T, D>> {
        self.intersect_hyperplane_parametric(plane)
            .map(|t| self.point_from_parameter(t))
    }
}

impl<T, D> BoundedGeometry<T> for LineSegment<T, D>
where
    T: Real,
    D: DimName,
    DefaultAllocator: Allocator<T, D>,
{
    type Dimension = D;

    fn bounding_box(&self) -> AxisAlignedBoundingBox<T, D> {
        AxisAlignedBoundingBox::from(self.start.clone())
            .enclose(&AxisAlignedBoundingBox::from(self.end.clone()))
    }
}
