//! Basic procedural mesh generation routines.
//!
//! Box meshes carry one composite per side of their bounding box, with ids `1..=2 * dim` in the
//! order `-x, +x, -y, +y, -z, +z`.
use itertools::iproduct;
use nalgebra::{DefaultAllocator, Matrix3, Point2, Point3, Vector2, Vector3, U2, U3};

use crate::allocators::DimAllocator;
use crate::element::{GeometryOrder, ShapeType};
use crate::mesh::{Cell, Mesh};
use crate::MeshDim;

/// Composite id of the side of the bounding box normal to `axis`, on the high side if `upper`.
pub fn side_composite_id(axis: usize, upper: bool) -> i64 {
    (2 * axis + 1 + upper as usize) as i64
}

fn linear_cell(shape: ShapeType, nodes: Vec<usize>, index: usize) -> Cell {
    Cell {
        shape,
        order: GeometryOrder::Linear,
        nodes,
        native_id: index as i64,
        rank: 0,
    }
}

pub fn create_unit_square_uniform_quad_mesh_2d(cells_per_dim: usize) -> Mesh<U2> {
    create_rectangular_uniform_mesh_2d(
        &Point2::origin(),
        &Vector2::new(1.0, 1.0),
        [cells_per_dim, cells_per_dim],
        ShapeType::Quadrilateral,
    )
}

pub fn create_unit_square_uniform_tri_mesh_2d(cells_per_dim: usize) -> Mesh<U2> {
    create_rectangular_uniform_mesh_2d(
        &Point2::origin(),
        &Vector2::new(1.0, 1.0),
        [cells_per_dim, cells_per_dim],
        ShapeType::Triangle,
    )
}

/// Generates an axis-aligned rectangular uniform mesh of quadrilaterals, or of triangles obtained
/// by splitting each quadrilateral along its diagonal.
///
/// # Panics
///
/// Panics if `shape` is not a 2D cell shape.
pub fn create_rectangular_uniform_mesh_2d(
    origin: &Point2<f64>,
    extents: &Vector2<f64>,
    num_cells: [usize; 2],
    shape: ShapeType,
) -> Mesh<U2> {
    assert!(U2::cell_shapes().contains(&shape), "Unsupported 2D cell shape {:?}", shape);
    let [nx, ny] = num_cells;
    let h = Vector2::new(extents.x / nx.max(1) as f64, extents.y / ny.max(1) as f64);
    let vertex_index = |i: usize, j: usize| (nx + 1) * j + i;

    let vertices = iproduct!(0..=ny, 0..=nx)
        .map(|(j, i)| origin + Vector2::new(i as f64 * h.x, j as f64 * h.y))
        .collect();

    let mut cells = Vec::new();
    for (j, i) in iproduct!(0..ny, 0..nx) {
        let quad = [
            vertex_index(i, j),
            vertex_index(i + 1, j),
            vertex_index(i + 1, j + 1),
            vertex_index(i, j + 1),
        ];
        match shape {
            ShapeType::Quadrilateral => cells.push(linear_cell(shape, quad.to_vec(), cells.len())),
            _ => {
                cells.push(linear_cell(shape, vec![quad[0], quad[1], quad[2]], cells.len()));
                cells.push(linear_cell(shape, vec![quad[0], quad[2], quad[3]], cells.len()));
            }
        }
    }

    let mut mesh = Mesh::from_vertices_and_cells(vertices, cells);
    assign_side_composites(&mut mesh);
    mesh
}

pub fn create_unit_box_uniform_mesh_3d(cells_per_dim: usize, shape: ShapeType) -> Mesh<U3> {
    create_rectangular_uniform_mesh_3d(
        &Point3::origin(),
        &Vector3::new(1.0, 1.0, 1.0),
        [cells_per_dim; 3],
        shape,
    )
}

/// Generates an axis-aligned box mesh from a uniform grid of hexahedra.
///
/// Other shapes are obtained by splitting each grid hexahedron: into six tetrahedra along its
/// main diagonal, into two prisms by halving its x-z faces, or into six pyramids sharing an
/// additional vertex at the center of the hexahedron.
///
/// # Panics
///
/// Panics if `shape` is not a 3D cell shape.
pub fn create_rectangular_uniform_mesh_3d(
    origin: &Point3<f64>,
    extents: &Vector3<f64>,
    num_cells: [usize; 3],
    shape: ShapeType,
) -> Mesh<U3> {
    assert!(U3::cell_shapes().contains(&shape), "Unsupported 3D cell shape {:?}", shape);
    let [nx, ny, nz] = num_cells;
    let h = Vector3::new(
        extents.x / nx.max(1) as f64,
        extents.y / ny.max(1) as f64,
        extents.z / nz.max(1) as f64,
    );
    let vertex_index = |i: usize, j: usize, k: usize| i + (nx + 1) * (j + (ny + 1) * k);

    let mut vertices: Vec<Point3<f64>> = iproduct!(0..=nz, 0..=ny, 0..=nx)
        .map(|(k, j, i)| origin + Vector3::new(i as f64 * h.x, j as f64 * h.y, k as f64 * h.z))
        .collect();

    let mut cells = Vec::new();
    for (k, j, i) in iproduct!(0..nz, 0..ny, 0..nx) {
        // Vertices of the grid hexahedron indexed by their local offset (x, y, z) in {0, 1}^3.
        let corner = |x: usize, y: usize, z: usize| vertex_index(i + x, j + y, k + z);
        let hex: Vec<usize> = ShapeType::Hexahedron
            .reference_vertices()
            .iter()
            .map(|r| corner((r[0] > 0.0) as usize, (r[1] > 0.0) as usize, (r[2] > 0.0) as usize))
            .collect();

        match shape {
            ShapeType::Hexahedron => cells.push(linear_cell(shape, hex, cells.len())),
            ShapeType::Tetrahedron => {
                for tet in kuhn_tetrahedra(&vertices, &corner) {
                    cells.push(linear_cell(shape, tet.to_vec(), cells.len()));
                }
            }
            ShapeType::Prism => {
                let lower = vec![
                    corner(0, 0, 0),
                    corner(1, 0, 0),
                    corner(0, 0, 1),
                    corner(0, 1, 0),
                    corner(1, 1, 0),
                    corner(0, 1, 1),
                ];
                let upper = vec![
                    corner(1, 0, 1),
                    corner(0, 0, 1),
                    corner(1, 0, 0),
                    corner(1, 1, 1),
                    corner(0, 1, 1),
                    corner(1, 1, 0),
                ];
                cells.push(linear_cell(shape, lower, cells.len()));
                cells.push(linear_cell(shape, upper, cells.len()));
            }
            _ => {
                let center = vertices[corner(0, 0, 0)] + h * 0.5;
                vertices.push(center);
                let apex = vertices.len() - 1;
                for face in ShapeType::Hexahedron.facets() {
                    // Hexahedron faces are ordered outwards, pyramid bases towards the apex.
                    let mut nodes: Vec<usize> = face.iter().rev().map(|&v| hex[v]).collect();
                    nodes.push(apex);
                    cells.push(linear_cell(shape, nodes, cells.len()));
                }
            }
        }
    }

    let mut mesh = Mesh::from_vertices_and_cells(vertices, cells);
    assign_side_composites(&mut mesh);
    mesh
}

/// Splits a grid hexahedron into the six tetrahedra that share its main diagonal, each with
/// positive orientation.
fn kuhn_tetrahedra(vertices: &[Point3<f64>], corner: &impl Fn(usize, usize, usize) -> usize) -> Vec<[usize; 4]> {
    const PERMUTATIONS: [[usize; 3]; 6] = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
    PERMUTATIONS
        .iter()
        .map(|axes| {
            let mut offset = [0, 0, 0];
            let mut path = [corner(0, 0, 0); 4];
            for (n, &axis) in axes.iter().enumerate() {
                offset[axis] = 1;
                path[n + 1] = corner(offset[0], offset[1], offset[2]);
            }
            let [a, b, c, d] = path.map(|v| vertices[v]);
            let orientation = Matrix3::from_columns(&[b - a, c - a, d - a]).determinant();
            if orientation < 0.0 {
                path.swap(1, 2);
            }
            path
        })
        .collect()
}

/// Adds every boundary facet of the mesh and assigns it to the composite of the bounding box side
/// it lies on.
///
/// Boundary facets that do not lie on a side are added without a composite.
pub fn assign_side_composites<D>(mesh: &mut Mesh<D>)
where
    D: MeshDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    let Some(bounds) = mesh.bounding_box() else {
        return;
    };
    let tol = 1e-10 * bounds.max_extent().max(1.0);
    for (shape, facet_vertices) in mesh.boundary_facets() {
        let side = (0..D::dim())
            .flat_map(|axis| [(axis, false), (axis, true)])
            .find(|&(axis, upper)| {
                let plane = if upper { bounds.max()[axis] } else { bounds.min()[axis] };
                facet_vertices
                    .iter()
                    .all(|&v| (mesh.vertices()[v][axis] - plane).abs() <= tol)
            });
        let facet = mesh.add_facet(shape, facet_vertices);
        if let Some((axis, upper)) = side {
            mesh.add_to_composite(side_composite_id(axis, upper), [facet]);
        }
    }
}

/// Two unit-height quadrilaterals side by side on `[0, 1] x [0, 1]`, sharing the facet at
/// `x = 0.5`, which forms the composite `interface_composite`.
///
/// The sides of the square form the usual side composites.
pub fn create_two_cell_interface_mesh_2d(interface_composite: i64) -> Mesh<U2> {
    let mut mesh = create_rectangular_uniform_mesh_2d(
        &Point2::origin(),
        &Vector2::new(1.0, 1.0),
        [2, 1],
        ShapeType::Quadrilateral,
    );
    // The vertices at x = 0.5 are the middle column of the 3 x 2 vertex grid.
    let interface = mesh.add_facet(ShapeType::Segment, vec![1, 4]);
    mesh.add_to_composite(interface_composite, [interface]);
    mesh
}
