use nalgebra::{point, vector, U2, U3};
use particle_mesh_geometry::proptest::point_in_aabb;
use particle_mesh_geometry::AxisAlignedBoundingBox;
use proptest::prelude::*;
use util::assert_panics;

#[test]
fn aabb_intersects_2d() {
    type Aabb = AxisAlignedBoundingBox<f64, U2>;

    let aabb1 = Aabb::new(vector![1.0, 1.0], vector![4.0, 3.0]);

    macro_rules! assert_no_intersection {
        ($aabb2:expr) => {
            assert!(!aabb1.intersects(&$aabb2));
            // Check that we get the same result when reversing the order
            assert!(!$aabb2.intersects(&aabb1));
        };
    }

    macro_rules! assert_intersection {
        ($aabb2:expr) => {
            assert!(aabb1.intersects(&$aabb2));
            assert!($aabb2.intersects(&aabb1));
        };
    }

    assert_no_intersection!(Aabb::new(vector![6.0, 4.0], vector![9.0, 6.0]));
    assert_no_intersection!(Aabb::new(vector![5.0, 1.5], vector![8.0, 2.5]));
    assert_no_intersection!(Aabb::new(vector![1.5, -1.0], vector![3.5, 0.5]));
    assert_no_intersection!(Aabb::new(vector![-3.0, 2.5], vector![0.0, 3.5]));

    assert_intersection!(Aabb::new(vector![1.5, 1.5], vector![3.5, 2.5]));
    assert_intersection!(Aabb::new(vector![0.0, 0.0], vector![2.0, 2.0]));
    assert_intersection!(Aabb::new(vector![0.0, 0.0], vector![5.0, 4.0]));
    // Touching boxes intersect
    assert_intersection!(Aabb::new(vector![4.0, 3.0], vector![5.0, 4.0]));
}

#[test]
fn aabb_new_rejects_inverted_bounds() {
    assert_panics!(AxisAlignedBoundingBox::new(vector![1.0, 0.0], vector![0.0, 1.0]));
}

#[test]
fn aabb_from_points_encloses_all() {
    let points = [point![0.5, -1.0, 2.0], point![-0.5, 3.0, 1.0], point![0.0, 0.0, 4.0]];
    let aabb = AxisAlignedBoundingBox::from_points(&points).unwrap();
    assert_eq!(aabb.min(), &vector![-0.5, -1.0, 1.0]);
    assert_eq!(aabb.max(), &vector![0.5, 3.0, 4.0]);
    assert_eq!(aabb.max_extent(), 4.0);
    assert_eq!(aabb.center(), point![0.0, 1.0, 2.5]);

    let empty: [nalgebra::Point3<f64>; 0] = [];
    assert!(AxisAlignedBoundingBox::<f64, U3>::from_points(&empty).is_none());
}

proptest! {
    #[test]
    fn grown_aabb_contains_points_of_original(
        p in point_in_aabb(AxisAlignedBoundingBox::new(vector![-1.0, 0.0, 2.0], vector![1.0, 0.5, 3.0]))
    ) {
        let aabb = AxisAlignedBoundingBox::new(vector![-1.0, 0.0, 2.0], vector![1.0, 0.5, 3.0]);
        prop_assert!(aabb.grow_uniformly(1e-9).contains_point(&p));
    }
}
