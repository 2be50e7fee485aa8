use nalgebra::{point, U2};
use particle_mesh::particles::{ParticleGroup, Sym};
use util::assert_panics;

#[test]
fn new_particles_are_unmapped() {
    let mut group = ParticleGroup::<U2>::from_positions([point![0.1, 0.2], point![0.3, 0.4]]);
    assert_eq!(group.len(), 2);
    assert_eq!(group.cell(0), None);
    assert_eq!(group.rank(1), -1);
    assert!(!group.is_mapped(1));

    group.set_rank(1, 3, true);
    group.set_cell(1, Some(7));
    assert_eq!(group.rank(1), 3);
    assert!(group.is_mapped(1));
    assert_eq!(group.cell(1), Some(7));

    let index = group.add_particle(point![1.0, 1.0]);
    assert_eq!(index, 2);
    assert_eq!(group.position(2), &point![1.0, 1.0]);
    assert_eq!(group.rank(2), -1);
}

#[test]
fn dats_are_zero_initialized_and_grow_with_group() {
    let charge = Sym::<f64>::new("Q");
    let ids = Sym::<i64>::new("ID");
    let mut group = ParticleGroup::<U2>::from_positions([point![0.0, 0.0]]);
    group.add_dat(&charge, 2);
    group.add_dat(&ids, 1);
    assert!(group.contains_dat(&charge));
    assert!(group.contains_dat(&ids));
    assert_eq!(group.dat(&charge).unwrap().get(0), &[0.0, 0.0]);

    group.require_dat_mut(&ids, 1).get_mut(0)[0] = 17;
    group.add_particle(point![1.0, 0.0]);
    let dat = group.require_dat(&ids, 1);
    assert_eq!(dat.len(), 2);
    assert_eq!(dat.get(0), &[17]);
    assert_eq!(dat.get(1), &[0]);
}

#[test]
fn dats_of_different_types_have_separate_namespaces() {
    let real = Sym::<f64>::new("X");
    let int = Sym::<i64>::new("X");
    let mut group = ParticleGroup::<U2>::from_positions([point![0.0, 0.0]]);
    group.add_dat(&real, 1);
    assert!(group.contains_dat(&real));
    assert!(!group.contains_dat(&int));
}

#[test]
fn add_dat_keeps_existing_data() {
    let sym = Sym::<f64>::new("V");
    let mut group = ParticleGroup::<U2>::from_positions([point![0.0, 0.0]]);
    group.add_dat(&sym, 3);
    group.dat_mut(&sym).unwrap().get_mut(0)[2] = 5.0;
    group.add_dat(&sym, 2);
    assert_eq!(group.dat(&sym).unwrap().ncomp(), 3);
    assert_eq!(group.dat(&sym).unwrap().get(0)[2], 5.0);
}

#[test]
fn missing_or_narrow_dats_panic() {
    let sym = Sym::<f64>::new("V");
    let group = ParticleGroup::<U2>::from_positions([point![0.0, 0.0]]);
    assert_panics!(group.require_dat(&sym, 1));

    let mut group = ParticleGroup::<U2>::from_positions([point![0.0, 0.0]]);
    group.add_dat(&sym, 1);
    assert_panics!(group.require_dat(&sym, 2));
    assert_panics!({
        let mut group = group.clone();
        group.add_dat(&sym, 2);
    });
}

#[test]
fn syms_compare_by_name() {
    assert_eq!(Sym::<f64>::new("A"), Sym::<f64>::new("A"));
    assert_ne!(Sym::<f64>::new("A"), Sym::<f64>::new("B"));
    assert_eq!(Sym::<i64>::new("A").name(), "A");
}
