use crate::{AxisAlignedBoundingBox, BoundedGeometry};
use nalgebra::allocator::Allocator;
use nalgebra::{DefaultAllocator, DimName, OPoint, OVector, Scalar, U2};
use particle_mesh_traits::Real;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "T: Serialize, OPoint<T, D>: Serialize",
    deserialize = "T: Deserialize<'de>, OPoint<T, D>: Deserialize<'de>"
))]
pub struct Hyperball<T, D>
where
    T: Scalar,
    D: DimName,
    DefaultAllocator: Allocator<T, D>,
{
    center: OPoint<T, D>,
    radius: T,
}

impl<T, D> Hyperball<T, D>
where
    T: Scalar,
    D: DimName,
    DefaultAllocator: Allocator<T, D>,
{
    pub fn from_center_and_radius(center: OPoint<T, D>, radius: T) -> Self {
        Self { center, radius }
    }

    pub fn center(&self) -> &OPoint<T, D> {
        &self.center
    }

    pub fn radius(&self) -> T {
        self.radius.clone()
    }
}

impl<T, D> Hyperball<T, D>
where
    T: Real,
    D: DimName,
    DefaultAllocator: Allocator<T, D>,
{
    /// A ball centered at the centroid of the points that contains every point.
    ///
    /// Returns `None` if there are no points.
    pub fn enclosing_points<'a>(points: impl IntoIterator<Item = &'a OPoint<T, D>>) -> Option<Self> {
        let points: Vec<_> = points.into_iter().collect();
        if points.is_empty() {
            return None;
        }
        let n = T::from_usize(points.len()).unwrap();
        let sum = points
            .iter()
            .fold(OVector::<T, D>::zeros(), |acc, p| acc + &p.coords);
        let center = OPoint::from(sum / n);
        let radius2 = points
            .iter()
            .map(|p| (&p.coords - &center.coords).norm_squared())
            .fold(T::zero(), |a, b| a.max(b));
        Some(Self::from_center_and_radius(center, radius2.sqrt()))
    }

    /// Inclusive containment test.
    pub fn contains_point(&self, point: &OPoint<T, D>) -> bool {
        (point - &self.center).norm_squared() <= self.radius * self.radius
    }
}

impl<T, D> BoundedGeometry<T> for Hyperball<T, D>
where
    T: Real,
    D: DimName,
    DefaultAllocator: Allocator<T, D>,
{
    type Dimension = D;

    fn bounding_box(&self) -> AxisAlignedBoundingBox<T, D> {
        let r = OVector::<T, D>::repeat(self.radius);
        AxisAlignedBoundingBox::new(&self.center.coords - &r, &self.center.coords + &r)
    }
}

pub type Disk<T> = Hyperball<T, U2>;
