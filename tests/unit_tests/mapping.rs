use matrixcompare::assert_scalar_eq;
use nalgebra::{Matrix2, Point2, Point3, U2, U3};
use particle_mesh::config::ParameterStore;
use particle_mesh::element::{GeometryOrder, Quad4d2Element, ReferenceMapping, ShapeType};
use particle_mesh::mapping::{
    affine_mapping_result, reference_point, x_inverse, x_inverse_with_strategy, MappingSettings, NewtonStrategy,
};
use particle_mesh::proptest::{nondegenerate_tetrahedron, nondegenerate_triangle, parallelogram, reference_coords};
use particle_mesh::MeshDim;
use proptest::prelude::*;
use util::{assert_approx_matrix_eq, assert_points_close};

use super::element::{cell_types, distorted_nodes};

#[test]
fn settings_are_read_from_parameter_section() {
    let parameters = ParameterStore::new()
        .with("MapParticlesNewton/newton_tol", 1e-12)
        .with("MapParticlesNewton/newton_max_iteration", 7usize);
    let settings = MappingSettings::from_parameters(&parameters, "MapParticlesNewton");
    assert_eq!(settings.tolerance, 1e-12);
    assert_eq!(settings.max_iterations, 7);

    let defaults = MappingSettings::from_parameters(&parameters, "CompositeIntersection");
    assert_eq!(defaults, MappingSettings::default());
    assert_eq!(defaults.tolerance, 1e-8);
    assert_eq!(defaults.max_iterations, 51);
}

#[test]
fn non_convergence_is_reported_not_found() {
    let quad = Quad4d2Element::from_vertices([
        Point2::new(0.0, 0.0),
        Point2::new(2.0, 0.0),
        Point2::new(2.5, 1.5),
        Point2::new(0.0, 1.0),
    ]);
    let settings = MappingSettings {
        tolerance: 1e-12,
        max_iterations: 0,
    };
    let result = x_inverse(&quad, &Point2::new(1.9, 0.2), &settings);
    assert!(!result.converged);
    assert!(!result.found);
    assert!(!result.is_contained(1.0));
    assert_eq!(result.iterations, 0);
}

#[test]
fn converged_point_outside_element_is_not_found() {
    let quad = Quad4d2Element::<f64>::reference();
    let result = x_inverse(&quad, &Point2::new(1.5, 0.0), &MappingSettings::default());
    assert!(result.converged);
    assert!(!result.found);
    assert_scalar_eq!(result.xi[0], 1.5, comp = abs, tol = 1e-8);
    assert!(result.is_contained(0.6));
    assert!(!result.is_contained(0.4));
}

#[test]
fn affine_mapping_result_rejects_outside_points() {
    let origin = Point2::new(1.0, 1.0);
    // x = origin + J xi with J = diag(2, 4), i.e. the square [-1, 3] x [-3, 5]
    let inverse_jacobian = Matrix2::new(0.5, 0.0, 0.0, 0.25);
    let inside = affine_mapping_result(ShapeType::Quadrilateral, &origin, &inverse_jacobian, &Point2::new(2.0, 4.0));
    assert!(inside.found);
    assert_approx_matrix_eq!(inside.xi.coords, Point2::new(0.5, 0.75).coords, abstol = 1e-14);

    let outside = affine_mapping_result(ShapeType::Quadrilateral, &origin, &inverse_jacobian, &Point2::new(3.5, 0.0));
    assert!(!outside.found);
}

#[test]
fn segment_facet_inverse_finds_point_on_segment() {
    let nodes = [Point2::new(0.0, 0.0), Point2::new(2.0, 1.0)];
    let normal = U2::facet_normal(ShapeType::Segment, &nodes).unwrap();
    let x = Point2::new(1.5, 0.75);
    let result = U2::facet_mapping_inverse(ShapeType::Segment, &nodes, &normal, &x, &MappingSettings::default())
        .unwrap();
    assert!(result.found);
    assert_scalar_eq!(result.xi[0], 0.5, comp = abs, tol = 1e-10);
    assert_scalar_eq!(result.xi[1], 0.0, comp = abs, tol = 1e-10);

    // Beyond the end of the segment
    let beyond = U2::facet_mapping_inverse(
        ShapeType::Segment,
        &nodes,
        &normal,
        &Point2::new(3.0, 1.5),
        &MappingSettings::default(),
    )
    .unwrap();
    assert!(!beyond.found);
}

#[test]
fn facet_normals_follow_vertex_order() {
    let nodes = [Point3::new(0.0, 0.0, 1.0), Point3::new(1.0, 0.0, 1.0), Point3::new(0.0, 1.0, 1.0)];
    let normal = U3::facet_normal(ShapeType::Triangle, &nodes).unwrap();
    assert_approx_matrix_eq!(normal.into_inner(), Point3::new(0.0, 0.0, 1.0).coords, abstol = 1e-14);

    let degenerate = [Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0)];
    assert!(U3::facet_normal(ShapeType::Triangle, &degenerate).is_none());
}

#[test]
fn quadrilateral_facet_inverse_reports_offset_from_plane() {
    let nodes = [
        Point3::new(0.0, 0.0, 0.5),
        Point3::new(1.0, 0.0, 0.5),
        Point3::new(1.0, 1.0, 0.5),
        Point3::new(0.0, 1.0, 0.5),
    ];
    let normal = U3::facet_normal(ShapeType::Quadrilateral, &nodes).unwrap();
    let settings = MappingSettings::default();

    let on_plane = Point3::new(0.25, 0.75, 0.5);
    let result = U3::facet_mapping_inverse(ShapeType::Quadrilateral, &nodes, &normal, &on_plane, &settings).unwrap();
    assert!(result.found);
    assert_approx_matrix_eq!(result.xi.coords, Point3::new(-0.5, 0.5, 0.0).coords, abstol = 1e-10);

    let above = Point3::new(0.25, 0.75, 0.7);
    let result = U3::facet_mapping_inverse(ShapeType::Quadrilateral, &nodes, &normal, &above, &settings).unwrap();
    assert_scalar_eq!(result.xi[2], 0.2, comp = abs, tol = 1e-10);
}

#[test]
fn affine_classification() {
    let tri = distorted_nodes::<U2>(ShapeType::Triangle, GeometryOrder::Linear);
    assert!(U2::is_affine(ShapeType::Triangle, GeometryOrder::Linear, &tri, 1e-10));

    let parallelogram = [
        Point2::new(0.0, 0.0),
        Point2::new(2.0, 0.5),
        Point2::new(3.0, 2.5),
        Point2::new(1.0, 2.0),
    ];
    assert!(U2::is_affine(ShapeType::Quadrilateral, GeometryOrder::Linear, &parallelogram, 1e-10));

    let trapezoid = [
        Point2::new(0.0, 0.0),
        Point2::new(2.0, 0.0),
        Point2::new(1.5, 1.0),
        Point2::new(0.5, 1.0),
    ];
    assert!(!U2::is_affine(ShapeType::Quadrilateral, GeometryOrder::Linear, &trapezoid, 1e-10));

    let quadratic = distorted_nodes::<U2>(ShapeType::Triangle, GeometryOrder::Quadratic);
    assert!(!U2::is_affine(ShapeType::Triangle, GeometryOrder::Quadratic, &quadratic, 1e-10));
}

fn assert_cell_inverse_recovers_reference_coords<D>(shape: ShapeType, order: GeometryOrder, xi: &[f64; 3])
where
    D: MeshDim,
    nalgebra::DefaultAllocator: particle_mesh::allocators::DimAllocator<f64, D>,
{
    let nodes = distorted_nodes::<D>(shape, order);
    let xi = reference_point::<D>(xi);
    let x = D::map_cell(shape, order, &nodes, &xi).unwrap();
    let settings = MappingSettings {
        tolerance: 1e-12,
        max_iterations: 51,
    };
    for strategy in [NewtonStrategy::Plain, NewtonStrategy::LineSearch] {
        let result = D::cell_mapping_inverse(shape, order, &nodes, &x, &settings, strategy).unwrap();
        assert!(result.converged, "{:?} {:?} {:?} did not converge", shape, order, strategy);
        assert!(result.found);
        assert!(result.is_contained(1e-10));
        assert_points_close!(result.xi, xi, tol = 1e-8);
    }
}

proptest! {
    #[test]
    fn triangle_inverse_is_exact(tri in nondegenerate_triangle(), xi in reference_coords(ShapeType::Triangle)) {
        let xi = Point2::new(xi[0], xi[1]);
        let x = tri.map_reference_coords(&xi);
        let result = x_inverse(&tri, &x, &MappingSettings { tolerance: 1e-12, max_iterations: 51 });
        prop_assert!(result.found);
        prop_assert!(result.iterations <= 2);
        prop_assert!((result.xi - xi).norm() < 1e-8);
    }

    #[test]
    fn parallelogram_closed_form_inverse_matches_map(quad in parallelogram(), xi in reference_coords(ShapeType::Quadrilateral)) {
        let xi = Point2::new(xi[0], xi[1]);
        let x = quad.map_reference_coords(&xi);
        let origin = quad.map_reference_coords(&Point2::origin());
        let inverse_jacobian = quad.reference_jacobian(&Point2::origin()).try_inverse().unwrap();
        let result = affine_mapping_result(ShapeType::Quadrilateral, &origin, &inverse_jacobian, &x);
        prop_assert!(result.found);
        prop_assert!((result.xi - xi).norm() < 1e-8);
    }

    #[test]
    fn tetrahedron_inverse_with_line_search(tet in nondegenerate_tetrahedron(), xi in reference_coords(ShapeType::Tetrahedron)) {
        let xi = Point3::new(xi[0], xi[1], xi[2]);
        let x = tet.map_reference_coords(&xi);
        let settings = MappingSettings { tolerance: 1e-12, max_iterations: 51 };
        let result = x_inverse_with_strategy(&tet, &x, &settings, NewtonStrategy::LineSearch);
        prop_assert!(result.found);
        prop_assert!((result.xi - xi).norm() < 1e-8);
    }

    #[test]
    fn curved_cell_inverse_2d(
        (shape, order) in prop::sample::select(cell_types::<U2>()),
        eta in [-0.95..=0.95, -0.95..=0.95, -0.95..=0.95f64]
    ) {
        let mut xi = [0.0; 3];
        shape.uncollapse_coordinates(&eta, &mut xi);
        assert_cell_inverse_recovers_reference_coords::<U2>(shape, order, &xi);
    }

    #[test]
    fn curved_cell_inverse_3d(
        (shape, order) in prop::sample::select(cell_types::<U3>()),
        eta in [-0.95..=0.95, -0.95..=0.95, -0.95..=0.95f64]
    ) {
        let mut xi = [0.0; 3];
        shape.uncollapse_coordinates(&eta, &mut xi);
        assert_cell_inverse_recovers_reference_coords::<U3>(shape, order, &xi);
    }
}
