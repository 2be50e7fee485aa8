use std::sync::Arc;

use nalgebra::{point, DefaultAllocator, OPoint, Point2, U2, U3};
use particle_mesh::allocators::DimAllocator;
use particle_mesh::config::ParameterStore;
use particle_mesh::element::{GeometryOrder, ShapeType};
use particle_mesh::hierarchy::MeshHierarchy;
use particle_mesh::collection::ElementCollection;
use particle_mesh::composite::CompositeIntersection;
use particle_mesh::locate::{HostSearch, LocateError, LocatePass, LocateReport, LocateSettings, MapParticles};
use particle_mesh::mapping::reference_point;
use particle_mesh::mesh::procedural::{
    create_rectangular_uniform_mesh_2d, create_unit_box_uniform_mesh_3d, create_unit_square_uniform_quad_mesh_2d,
    create_unit_square_uniform_tri_mesh_2d,
};
use particle_mesh::mesh::{Cell, Mesh};
use particle_mesh::particles::{ParticleGroup, Sym, REFERENCE_POSITIONS};
use particle_mesh::proptest::point2_in;
use particle_mesh::MeshDim;
use proptest::collection::vec;
use proptest::prelude::*;
use util::assert_points_close;

fn map_particles<D>(mesh: Mesh<D>, settings: LocateSettings) -> (Arc<Mesh<D>>, MapParticles<D>)
where
    D: MeshDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    let hierarchy = MeshHierarchy::for_mesh(&mesh).unwrap();
    let mesh = Arc::new(mesh);
    let mapper = MapParticles::with_settings(Arc::clone(&mesh), hierarchy, settings);
    (mesh, mapper)
}

fn locate<D>(
    mesh: Mesh<D>,
    settings: LocateSettings,
    points: Vec<OPoint<f64, D>>,
) -> (Arc<Mesh<D>>, ParticleGroup<D>, LocateReport)
where
    D: MeshDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    let (mesh, mut mapper) = map_particles(mesh, settings);
    let mut group = ParticleGroup::from_positions(points);
    let report = mapper.map(&mut group, LocatePass::Final).unwrap();
    (mesh, group, report)
}

/// The reference position written for the particle.
fn reference_position<D>(group: &ParticleGroup<D>, particle: usize) -> OPoint<f64, D>
where
    D: MeshDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    let dat = group.dat(&Sym::<f64>::new(REFERENCE_POSITIONS)).unwrap();
    OPoint::from_slice(&dat.get(particle)[..D::dim()])
}

/// Maps the reference position of a particle back through its cell.
fn mapped_position<D>(mesh: &Mesh<D>, group: &ParticleGroup<D>, particle: usize) -> OPoint<f64, D>
where
    D: MeshDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    let cell_index = group.cell(particle).unwrap();
    let cell = &mesh.cells()[cell_index];
    let xi = reference_position(group, particle);
    D::map_cell(cell.shape, cell.order, &mesh.cell_nodes(cell_index), &xi).unwrap()
}

fn assert_all_located<D>(mesh: &Mesh<D>, group: &ParticleGroup<D>, tol: f64)
where
    D: MeshDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    for i in 0..group.len() {
        assert!(group.is_mapped(i), "particle {} is not mapped", i);
        let x = mapped_position(mesh, group, i);
        assert_points_close!(x, group.position(i).clone(), tol = tol);
    }
}

fn lattice_2d(n: usize, offset: f64) -> Vec<Point2<f64>> {
    let h = 1.0 / n as f64;
    let mut points = Vec::new();
    for j in 0..n {
        for i in 0..n {
            points.push(point![(i as f64 + offset) * h, (j as f64 + 0.5) * h]);
        }
    }
    points
}

#[test]
fn affine_cells_are_located_in_closed_form() {
    let points = lattice_2d(4, 0.3);
    let (mesh, group, report) = locate(
        create_unit_square_uniform_quad_mesh_2d(4),
        LocateSettings::default(),
        points.clone(),
    );
    assert_eq!(report.regular, 16);
    assert_eq!(report.num_mapped(), 16);
    assert!(report.unmapped.is_empty());

    for (i, x) in points.iter().enumerate() {
        // Lattice points are generated in the same order as the cells
        assert_eq!(group.cell(i), Some(i));
        assert_eq!(group.rank(i), 0);
        assert!(mesh.cell_bounding_box(i).contains_point(x));
    }
    assert_all_located(&mesh, &group, 1e-12);

    let xi = reference_position(&group, 5);
    assert_points_close!(xi, point![-0.4, 0.0], tol = 1e-12);
}

#[test]
fn distorted_linear_cells_are_located_with_newton() {
    let mut mesh = create_rectangular_uniform_mesh_2d(
        &point![0.0, 0.0],
        &nalgebra::vector![1.0, 1.0],
        [2, 2],
        ShapeType::Quadrilateral,
    );
    mesh.transform_vertices(|p| {
        if (p.x - 0.5).abs() < 1e-12 && (p.y - 0.5).abs() < 1e-12 {
            p.x += 0.1;
        }
    });
    let points = vec![point![0.2, 0.2], point![0.8, 0.8], point![0.55, 0.3]];
    let (mesh, group, report) = locate(mesh, LocateSettings::default(), points);
    assert_eq!(report.regular, 0);
    assert_eq!(report.deformed, 3);
    assert_eq!(group.cell(0), Some(0));
    assert_eq!(group.cell(1), Some(3));
    // Left of the moved center vertex, but inside the lower left cell
    assert_eq!(group.cell(2), Some(0));
    assert_all_located(&mesh, &group, 1e-8);
}

#[test]
fn curved_cells_are_located_by_the_generic_stage() {
    let mut mesh = create_unit_square_uniform_quad_mesh_2d(2);
    mesh.elevate_to_quadratic(|x| {
        let bump = 0.05 * (std::f64::consts::PI * x.x).sin() * (std::f64::consts::PI * x.y).sin();
        point![x.x + bump, x.y - bump]
    });

    let xi = reference_point::<U2>(&[0.3, -0.2, 0.0]);
    let points: Vec<Point2<f64>> = mesh
        .cells()
        .iter()
        .enumerate()
        .map(|(index, cell)| U2::map_cell(cell.shape, cell.order, &mesh.cell_nodes(index), &xi).unwrap())
        .collect();

    let (mesh, group, report) = locate(mesh, LocateSettings::default(), points);
    assert_eq!(report.generic, mesh.num_cells());
    assert_eq!(report.regular + report.deformed + report.host, 0);
    for i in 0..group.len() {
        assert_eq!(group.cell(i), Some(i));
        assert_points_close!(reference_position(&group, i), xi, tol = 1e-8);
    }
    assert_all_located(&mesh, &group, 1e-8);
}

#[test]
fn all_generic_newton_bypasses_specialised_stages() {
    let parameters = ParameterStore::new().with("MapParticles/all_generic_newton", 1i64);
    let settings = LocateSettings::from_parameters(&parameters);
    assert!(settings.all_generic_newton);

    let (mesh, group, report) = locate(create_unit_square_uniform_tri_mesh_2d(3), settings, lattice_2d(3, 0.2));
    assert_eq!(report.generic, 9);
    assert_eq!(report.regular + report.deformed, 0);
    assert_all_located(&mesh, &group, 1e-10);
}

#[test]
fn settings_are_read_from_parameters() {
    let parameters = ParameterStore::new()
        .with("MapParticlesNewton/newton_tol", 1e-12)
        .with("MapParticlesNewton/newton_max_iteration", 20i64)
        .with("MapParticlesHost/contained_tol", 1e-6)
        .with("MapParticles/max_cached_cells", 64i64);
    let settings = LocateSettings::from_parameters(&parameters);
    assert_eq!(settings.newton.tolerance, 1e-12);
    assert_eq!(settings.newton.max_iterations, 20);
    assert_eq!(settings.host_contained_tol, 1e-6);
    assert_eq!(settings.max_cached_cells, 64);
    assert!(!settings.all_generic_newton);

    let defaults = LocateSettings::from_parameters(&ParameterStore::new());
    assert_eq!(defaults, LocateSettings::default());
    assert_eq!(defaults.host_contained_tol, 1e-10);
    assert_eq!(defaults.max_cached_cells, 16384);
}

#[test]
fn boundary_points_fall_back_to_host_search() {
    // Just outside the right boundary, within the host containment slack.
    let x = point![1.0 + 1e-13, 0.3];

    let (mesh, mut mapper) = map_particles(create_unit_square_uniform_quad_mesh_2d(2), LocateSettings::default());
    let mut group = ParticleGroup::from_positions([x]);
    let report = mapper.map(&mut group, LocatePass::Initial).unwrap();
    assert_eq!(report.unmapped, vec![0]);
    assert_eq!(group.cell(0), None);
    assert!(!group.is_mapped(0));

    let report = mapper.map(&mut group, LocatePass::Final).unwrap();
    assert_eq!(report.host, 1);
    assert_eq!(report.num_mapped(), 1);
    assert_eq!(group.cell(0), Some(1));
    assert_all_located(&mesh, &group, 1e-10);
}

#[test]
fn outside_points_are_reported() {
    let (_, mut mapper) = map_particles(create_unit_square_uniform_quad_mesh_2d(2), LocateSettings::default());
    let mut group = ParticleGroup::from_positions([point![0.3, 0.3], point![2.0, 0.5]]);

    let report = mapper.map(&mut group, LocatePass::Initial).unwrap();
    assert_eq!(report.regular, 1);
    assert_eq!(report.unmapped, vec![1]);
    assert!(group.is_mapped(0));
    assert!(!group.is_mapped(1));
    assert_eq!(group.cell(1), None);

    group.set_cell(1, Some(3));
    let Err(LocateError::Unmapped(particles)) = mapper.map(&mut group, LocatePass::Final) else {
        panic!("Expected the final pass to fail");
    };
    assert_eq!(particles.len(), 1);
    assert_eq!(particles[0].index, 1);
    assert_eq!(particles[0].position, vec![2.0, 0.5]);
    assert_eq!(particles[0].cell, Some(3));
    assert_eq!(particles[0].rank, -1);
    // Mapped particles are still written
    assert_eq!(group.cell(0), Some(0));
    assert_eq!(group.cell(1), None);
}

#[test]
fn points_in_holes_of_the_mesh_fail_the_final_pass() {
    // Only the lower-left triangle of the unit square is meshed, so the upper-right half lies
    // inside the index but outside every cell.
    let vertices = vec![point![0.0, 0.0], point![1.0, 0.0], point![0.0, 1.0]];
    let cell = Cell {
        shape: ShapeType::Triangle,
        order: GeometryOrder::Linear,
        nodes: vec![0, 1, 2],
        native_id: 0,
        rank: 0,
    };
    let mesh = Mesh::from_vertices_and_cells(vertices, vec![cell]);
    let (_, mut mapper) = map_particles(mesh, LocateSettings::default());
    let hole = point![0.8, 0.8];
    assert!(mapper.hierarchy().try_cell_for_point(&hole).is_some());

    let mut group = ParticleGroup::from_positions([point![0.2, 0.2], hole]);
    let report = mapper.map(&mut group, LocatePass::Initial).unwrap();
    assert_eq!(report.unmapped, vec![1]);

    let Err(LocateError::Unmapped(particles)) = mapper.map(&mut group, LocatePass::Final) else {
        panic!("Expected the final pass to fail");
    };
    assert_eq!(particles.len(), 1);
    assert_eq!(particles[0].index, 1);
    assert_eq!(particles[0].position, vec![0.8, 0.8]);
    assert_eq!(group.cell(0), Some(0));
    assert!(group.is_mapped(0));
    assert_eq!(group.cell(1), None);
    assert!(!group.is_mapped(1));
}

#[test]
fn points_outside_a_tetrahedron_fail_the_final_pass() {
    let vertices = vec![
        point![0.0, 0.0, 0.0],
        point![1.0, 0.0, 0.0],
        point![0.0, 1.0, 0.0],
        point![0.0, 0.0, 1.0],
    ];
    let cell = Cell {
        shape: ShapeType::Tetrahedron,
        order: GeometryOrder::Linear,
        nodes: vec![0, 1, 2, 3],
        native_id: 0,
        rank: 0,
    };
    let mesh = Mesh::from_vertices_and_cells(vertices, vec![cell]);
    let (_, mut mapper) = map_particles(mesh, LocateSettings::default());
    let mut group = ParticleGroup::from_positions([point![0.1, 0.2, 0.3], point![0.6, 0.6, 0.6]]);
    let Err(LocateError::Unmapped(particles)) = mapper.map(&mut group, LocatePass::Final) else {
        panic!("Expected the final pass to fail");
    };
    assert_eq!(particles.iter().map(|p| p.index).collect::<Vec<_>>(), vec![1]);
    assert_eq!(group.cell(0), Some(0));
}

fn assert_send_sync<T: Send + Sync>() {}

fn assert_engines_are_thread_safe<D>()
where
    D: MeshDim,
    DefaultAllocator: DimAllocator<f64, D>,
{
    assert_send_sync::<Mesh<D>>();
    assert_send_sync::<MeshHierarchy<D>>();
    assert_send_sync::<ParticleGroup<D>>();
    assert_send_sync::<ElementCollection<D>>();
    assert_send_sync::<MapParticles<D>>();
    assert_send_sync::<HostSearch<'static, D>>();
    assert_send_sync::<CompositeIntersection<D>>();
}

#[test]
fn engines_are_thread_safe_for_every_dimension() {
    assert_engines_are_thread_safe::<U2>();
    assert_engines_are_thread_safe::<U3>();
}

#[test]
fn relocation_is_idempotent() {
    let (_, mut mapper) = map_particles(create_unit_square_uniform_tri_mesh_2d(4), LocateSettings::default());
    let mut group = ParticleGroup::from_positions(lattice_2d(5, 0.4));
    mapper.map(&mut group, LocatePass::Final).unwrap();
    let first = group.clone();
    let report = mapper.map(&mut group, LocatePass::Final).unwrap();
    assert_eq!(report.num_mapped(), group.len());
    assert_eq!(group, first);
}

#[test]
fn rank_record_follows_owning_cell() {
    let vertices = vec![point![0.0, 0.0], point![1.0, 0.0], point![0.0, 1.0], point![1.0, 1.0]];
    let cell = |nodes: Vec<usize>, native_id, rank| Cell {
        shape: ShapeType::Triangle,
        order: GeometryOrder::Linear,
        nodes,
        native_id,
        rank,
    };
    let mesh = Mesh::from_vertices_and_cells(vertices, vec![cell(vec![0, 1, 2], 10, 2), cell(vec![1, 3, 2], 11, 5)]);
    let (_, group, report) = locate(
        mesh,
        LocateSettings::default(),
        vec![point![0.2, 0.2], point![0.8, 0.8]],
    );
    assert_eq!(report.regular, 2);
    assert_eq!((group.rank(0), group.is_mapped(0)), (2, true));
    assert_eq!((group.rank(1), group.is_mapped(1)), (5, true));
}

#[test]
fn all_3d_shapes_are_located() {
    for shape in [
        ShapeType::Tetrahedron,
        ShapeType::Prism,
        ShapeType::Pyramid,
        ShapeType::Hexahedron,
    ] {
        let mut points = Vec::new();
        for k in 0..3 {
            for j in 0..3 {
                for i in 0..3 {
                    points.push(point![0.15 + 0.31 * i as f64, 0.12 + 0.33 * j as f64, 0.18 + 0.3 * k as f64]);
                }
            }
        }
        let mesh = create_unit_box_uniform_mesh_3d(2, shape);
        let (mesh, group, report) = locate(mesh, LocateSettings::default(), points);
        assert_eq!(report.num_mapped(), 27, "{:?}", shape);
        assert_all_located(&mesh, &group, 1e-8);
    }
}

proptest! {
    #[test]
    fn random_points_in_triangle_mesh_are_located(points in vec(point2_in(0.0, 1.0), 1..16)) {
        let (mesh, group, report) = locate(create_unit_square_uniform_tri_mesh_2d(3), LocateSettings::default(), points);
        prop_assert_eq!(report.num_mapped(), group.len());
        assert_all_located(&mesh, &group, 1e-10);
    }
}
