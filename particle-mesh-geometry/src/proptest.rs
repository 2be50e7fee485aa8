use crate::{AxisAlignedBoundingBox, LineSegment};
use nalgebra::allocator::Allocator;
use nalgebra::{DefaultAllocator, DimName, OPoint, Point2, Point3};
use proptest::prelude::*;

pub fn point2() -> impl Strategy<Value = Point2<f64>> {
    // Pick a reasonably small range to pick coordinates from,
    // otherwise we can easily get floating point numbers that are
    // so ridiculously large as to break anything we might want to do with them
    let range = -10.0..10.0;
    [range.clone(), range.clone()].prop_map(|[x, y]| Point2::new(x, y))
}

pub fn point3() -> impl Strategy<Value = Point3<f64>> {
    let range = -10.0..10.0;
    [range.clone(), range.clone(), range.clone()].prop_map(|[x, y, z]| Point3::new(x, y, z))
}

/// Points drawn uniformly from the closed bounding box.
pub fn point_in_aabb<D>(aabb: AxisAlignedBoundingBox<f64, D>) -> impl Strategy<Value = OPoint<f64, D>>
where
    D: DimName,
    DefaultAllocator: Allocator<f64, D>,
{
    proptest::collection::vec(0.0..=1.0, D::dim()).prop_map(move |weights| {
        let extents = aabb.extents();
        OPoint::from_slice(
            &weights
                .iter()
                .enumerate()
                .map(|(i, w)| aabb.min()[i] + w * extents[i])
                .collect::<Vec<_>>(),
        )
    })
}

pub fn line_segment3() -> impl Strategy<Value = LineSegment<f64, nalgebra::U3>> {
    [point3(), point3()].prop_map(LineSegment::from_end_points)
}
