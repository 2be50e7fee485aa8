use itertools::Itertools;
use nalgebra::{point, vector, Point2, Point3, U2, U3};
use particle_mesh::element::{GeometryOrder, ShapeType};
use particle_mesh::mapping::reference_point;
use particle_mesh::mesh::procedural::{
    create_rectangular_uniform_mesh_3d, create_two_cell_interface_mesh_2d, create_unit_box_uniform_mesh_3d,
    create_unit_square_uniform_quad_mesh_2d, create_unit_square_uniform_tri_mesh_2d, side_composite_id,
};
use particle_mesh::mesh::{Cell, Mesh};
use particle_mesh::MeshDim;
use util::{assert_panics, assert_points_close};

/// Sum of the signs of the cell Jacobian determinants at the reference centroids.
fn orientation_sum<D>(mesh: &Mesh<D>) -> f64
where
    D: MeshDim,
    nalgebra::DefaultAllocator: particle_mesh::allocators::DimAllocator<f64, D>,
{
    mesh.cells()
        .iter()
        .enumerate()
        .map(|(index, cell)| {
            let nodes = mesh.cell_nodes(index);
            let centroid = reference_point::<D>(&cell.shape.reference_centroid());
            D::cell_jacobian(cell.shape, cell.order, &nodes, &centroid)
                .unwrap()
                .determinant()
                .signum()
        })
        .sum()
}

#[test]
fn quad_mesh_has_expected_topology() {
    let mesh = create_unit_square_uniform_quad_mesh_2d(3);
    assert_eq!(mesh.vertices().len(), 16);
    assert_eq!(mesh.num_cells(), 9);
    assert_eq!(mesh.boundary_facets().len(), 12);
    assert_eq!(mesh.facets().len(), 12);
    assert_eq!(mesh.composite_ids().collect_vec(), vec![1, 2, 3, 4]);
    for id in 1..=4 {
        assert_eq!(mesh.composite(id).unwrap().len(), 3);
    }

    let bounds = mesh.bounding_box().unwrap();
    assert_eq!(bounds.min(), &vector![0.0, 0.0]);
    assert_eq!(bounds.max(), &vector![1.0, 1.0]);
}

#[test]
fn side_composites_contain_facets_on_their_side() {
    let mesh = create_unit_square_uniform_tri_mesh_2d(4);
    assert_eq!(mesh.num_cells(), 32);
    for axis in 0..2 {
        for upper in [false, true] {
            let id = side_composite_id(axis, upper);
            let plane = if upper { 1.0 } else { 0.0 };
            let facets = mesh.composite(id).unwrap();
            assert_eq!(facets.len(), 4);
            for &facet in facets {
                for x in mesh.facet_vertices(facet) {
                    assert_eq!(x[axis], plane);
                }
            }
        }
    }
    assert_eq!(side_composite_id(0, false), 1);
    assert_eq!(side_composite_id(2, true), 6);
}

#[test]
fn cells_have_positive_orientation() {
    let mesh = create_unit_square_uniform_tri_mesh_2d(2);
    assert_eq!(orientation_sum(&mesh), mesh.num_cells() as f64);
    for shape in U3::cell_shapes() {
        let mesh = create_unit_box_uniform_mesh_3d(2, *shape);
        assert_eq!(orientation_sum(&mesh), mesh.num_cells() as f64, "{:?}", shape);
    }
}

#[test]
fn box_meshes_have_conforming_boundaries() {
    let expected = [
        // shape, cells, boundary facets, facets on the -y side
        (ShapeType::Hexahedron, 8, 24, 4),
        (ShapeType::Tetrahedron, 48, 48, 8),
        (ShapeType::Prism, 16, 32, 8),
        (ShapeType::Pyramid, 48, 24, 4),
    ];
    for (shape, num_cells, num_boundary, num_side) in expected {
        let mesh = create_unit_box_uniform_mesh_3d(2, shape);
        assert_eq!(mesh.num_cells(), num_cells, "{:?}", shape);
        assert_eq!(mesh.boundary_facets().len(), num_boundary, "{:?}", shape);
        assert_eq!(mesh.composite(side_composite_id(1, false)).unwrap().len(), num_side, "{:?}", shape);
        assert_eq!(mesh.composite_ids().count(), 6);
    }
}

#[test]
fn rectangular_mesh_respects_origin_and_extents() {
    let mesh = create_rectangular_uniform_mesh_3d(
        &point![1.0, -1.0, 0.0],
        &vector![2.0, 1.0, 0.5],
        [2, 1, 1],
        ShapeType::Hexahedron,
    );
    let bounds = mesh.bounding_box().unwrap();
    assert_eq!(bounds.min(), &vector![1.0, -1.0, 0.0]);
    assert_eq!(bounds.max(), &vector![3.0, 0.0, 0.5]);
    assert_eq!(mesh.num_cells(), 2);
}

#[test]
fn native_and_local_cell_ids_are_inverse() {
    let vertices = vec![point![0.0, 0.0], point![1.0, 0.0], point![0.0, 1.0], point![1.0, 1.0]];
    let cells = vec![
        Cell {
            shape: ShapeType::Triangle,
            order: GeometryOrder::Linear,
            nodes: vec![0, 1, 2],
            native_id: 40,
            rank: 0,
        },
        Cell {
            shape: ShapeType::Triangle,
            order: GeometryOrder::Linear,
            nodes: vec![1, 3, 2],
            native_id: 7,
            rank: 1,
        },
    ];
    let mesh = Mesh::from_vertices_and_cells(vertices, cells);
    assert_eq!(mesh.native_cell_id(1), Some(7));
    assert_eq!(mesh.local_cell_id(40), Some(0));
    assert_eq!(mesh.local_cell_id(3), None);
    assert_eq!(mesh.native_cell_id(2), None);
    for local in 0..mesh.num_cells() {
        assert_eq!(mesh.local_cell_id(mesh.native_cell_id(local).unwrap()), Some(local));
    }
}

#[test]
fn invalid_cells_are_rejected() {
    let vertices: Vec<Point2<f64>> = vec![point![0.0, 0.0], point![1.0, 0.0], point![0.0, 1.0]];
    let cell = |shape, nodes| Cell {
        shape,
        order: GeometryOrder::Linear,
        nodes,
        native_id: 0,
        rank: 0,
    };
    assert_panics!(Mesh::<U2>::from_vertices_and_cells(
        vertices.clone(),
        vec![cell(ShapeType::Quadrilateral, vec![0, 1, 2])]
    ));
    assert_panics!(Mesh::<U2>::from_vertices_and_cells(
        vertices.clone(),
        vec![cell(ShapeType::Triangle, vec![0, 1, 3])]
    ));
    assert_panics!(Mesh::<U2>::from_vertices_and_cells(
        vertices.clone(),
        vec![cell(ShapeType::Tetrahedron, vec![0, 1, 2, 0])]
    ));
}

#[test]
fn facet_composites_attribute_shared_facets_to_smallest_id() {
    let mut mesh = create_two_cell_interface_mesh_2d(5);
    let interface = mesh.composite(5).unwrap()[0];
    assert_eq!(mesh.facets()[interface].shape, ShapeType::Segment);
    for x in mesh.facet_vertices(interface) {
        assert_eq!(x.x, 0.5);
    }

    mesh.add_to_composite(2, [interface]);
    let membership = mesh.facet_composites(&[5, 2]);
    assert_eq!(membership.get(&interface), Some(&2));
    let membership = mesh.facet_composites(&[5]);
    assert_eq!(membership.len(), 1);
    assert_eq!(membership.get(&interface), Some(&5));
    assert!(mesh.facet_composites(&[99]).is_empty());
}

#[test]
fn elevation_shares_new_nodes_between_cells() {
    let cases = [
        (ShapeType::Hexahedron, 27),
        // 12 edges, 6 face diagonals and the main diagonal
        (ShapeType::Tetrahedron, 27),
        // Three layers of the nine nodes of two quadratic triangles
        (ShapeType::Prism, 27),
    ];
    for (shape, num_nodes) in cases {
        let mut mesh = create_unit_box_uniform_mesh_3d(1, shape);
        mesh.elevate_to_quadratic(|x| *x);
        assert_eq!(mesh.vertices().len(), num_nodes, "{:?}", shape);
        assert!(mesh.cells().iter().all(|cell| cell.order == GeometryOrder::Quadratic));
        assert_eq!(orientation_sum(&mesh), mesh.num_cells() as f64);
    }

    let mut mesh = create_unit_square_uniform_quad_mesh_2d(2);
    mesh.elevate_to_quadratic(|x| *x);
    assert_eq!(mesh.vertices().len(), 25);
}

#[test]
fn elevation_keeps_pyramids_linear() {
    let mut mesh = create_unit_box_uniform_mesh_3d(1, ShapeType::Pyramid);
    let num_vertices = mesh.vertices().len();
    mesh.elevate_to_quadratic(|x| *x);
    assert_eq!(mesh.vertices().len(), num_vertices);
    assert!(mesh.cells().iter().all(|cell| cell.order == GeometryOrder::Linear));
}

#[test]
fn elevation_applies_deformation_to_all_nodes() {
    let mut mesh = create_unit_square_uniform_quad_mesh_2d(2);
    let deformation = |x: &Point2<f64>| point![x.x + 0.1 * x.y * x.y, x.y * (1.0 + 0.05 * x.x)];
    mesh.elevate_to_quadratic(deformation);

    // The center node of the first cell is the image of (0.25, 0.25)
    let cell = &mesh.cells()[0];
    assert_eq!(cell.nodes.len(), 9);
    let center = mesh.cell_nodes(0)[8];
    assert_points_close!(center, deformation(&point![0.25, 0.25]), tol = 1e-12);

    // Facets still refer to the (deformed) vertices on the boundary
    let facet = mesh.composite(side_composite_id(1, false)).unwrap()[0];
    for x in mesh.facet_vertices(facet) {
        assert!(x.y.abs() < 1e-12);
    }
    let vertices = cell.vertex_indices();
    assert_eq!(vertices, cell.nodes[..4].to_vec());
}

#[test]
fn quadratic_prism_vertices_skip_mid_layer() {
    let mut mesh = create_unit_box_uniform_mesh_3d(1, ShapeType::Prism);
    mesh.elevate_to_quadratic(|x| *x);
    let cell = &mesh.cells()[0];
    let vertices: Vec<Point3<f64>> = cell.vertex_indices().iter().map(|&v| mesh.vertices()[v]).collect();
    // Both triangles of the prism lie in y = 0 and y = 1
    assert!(vertices[..3].iter().all(|x| x.y == 0.0));
    assert!(vertices[3..].iter().all(|x| x.y == 1.0));
    assert_eq!(mesh.boundary_facets().len(), 4 + 4);
}

#[test]
fn translate_moves_bounding_box() {
    let mut mesh = create_unit_square_uniform_quad_mesh_2d(1);
    mesh.translate(&vector![2.0, -1.0]);
    let bounds = mesh.bounding_box().unwrap();
    assert_eq!(bounds.min(), &vector![2.0, -1.0]);
    assert_eq!(bounds.max(), &vector![3.0, 0.0]);
}
