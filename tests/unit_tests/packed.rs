use nalgebra::{Matrix2, Point2, Vector2, U2};
use particle_mesh::element::{GeometryOrder, ShapeType};
use particle_mesh::packed::{
    affine_payload, element_payload, facet_payload, ArenaKey, DescriptorHeader, DescriptorKind, PackedArena,
    PackedStore, HEADER_LEN,
};
use util::assert_panics;

fn triangle_nodes(offset: f64) -> Vec<Point2<f64>> {
    vec![
        Point2::new(offset, 0.0),
        Point2::new(offset + 1.0, 0.0),
        Point2::new(offset, 1.0),
    ]
}

fn element_header(id: usize) -> DescriptorHeader {
    DescriptorHeader::new(DescriptorKind::Element, ShapeType::Triangle, GeometryOrder::Linear, 3, id)
}

#[test]
fn header_occupies_four_words() {
    assert_eq!(HEADER_LEN, 4);
    let header = element_header(12).with_composite(5);
    assert_eq!(header.composite_id, 5);
    assert_eq!(
        header.key(),
        Some(ArenaKey {
            kind: DescriptorKind::Element,
            shape: ShapeType::Triangle,
            order: GeometryOrder::Linear
        })
    );
    assert_eq!(element_header(0).composite_id, -1);

    let mut invalid = element_header(0);
    invalid.kind = 9;
    assert_eq!(invalid.key(), None);
}

#[test]
fn strides_follow_payload_layout() {
    let affine = ArenaKey {
        kind: DescriptorKind::Affine,
        shape: ShapeType::Quadrilateral,
        order: GeometryOrder::Linear,
    };
    assert_eq!(affine.payload_len(2), 2 + 4);
    assert_eq!(affine.payload_len(3), 3 + 9);

    let curved = ArenaKey {
        kind: DescriptorKind::Element,
        shape: ShapeType::Hexahedron,
        order: GeometryOrder::Quadratic,
    };
    assert_eq!(curved.num_nodes(), 27);
    assert_eq!(curved.stride(3), HEADER_LEN + 81);

    let facet = ArenaKey {
        kind: DescriptorKind::Facet,
        shape: ShapeType::Quadrilateral,
        order: GeometryOrder::Linear,
    };
    assert_eq!(facet.payload_len(3), 4 * 3 + 3);
}

#[test]
fn arena_push_and_get() {
    let key = element_header(0).key().unwrap();
    let mut arena = PackedArena::<U2>::new(key);
    assert!(arena.is_empty());
    assert_eq!(arena.stride(), HEADER_LEN + 6);

    for id in 0..5 {
        let offset = arena.push(element_header(10 + id), &element_payload(&triangle_nodes(id as f64)));
        assert_eq!(offset, id);
    }
    assert_eq!(arena.len(), 5);
    assert!(arena.capacity() >= 5);

    let geometry = arena.get(3).unwrap();
    assert_eq!(geometry.id(), 13);
    assert_eq!(geometry.shape(), ShapeType::Triangle);
    assert_eq!(geometry.header(), element_header(13));
    assert_eq!(geometry.nodes(), triangle_nodes(3.0));
    assert!(geometry.origin().is_none());
    assert!(geometry.normal().is_none());
    assert!(arena.get(5).is_none());

    let ids: Vec<usize> = arena.iter().map(|g| g.id()).collect();
    assert_eq!(ids, vec![10, 11, 12, 13, 14]);
}

#[test]
fn realloc_no_copy_discards_contents() {
    let key = element_header(0).key().unwrap();
    let mut arena = PackedArena::<U2>::new(key);
    arena.push(element_header(0), &element_payload(&triangle_nodes(0.0)));
    arena.realloc_no_copy(8);
    assert!(arena.is_empty());
    assert_eq!(arena.capacity(), 8);

    // Storage never shrinks
    arena.realloc_no_copy(2);
    assert_eq!(arena.capacity(), 8);
    for id in 0..8 {
        arena.push(element_header(id), &element_payload(&triangle_nodes(0.0)));
    }
    assert_eq!(arena.capacity(), 8);
    assert_eq!(arena.len(), 8);
}

#[test]
fn arena_rejects_foreign_descriptors() {
    let key = element_header(0).key().unwrap();
    let header = DescriptorHeader::new(DescriptorKind::Element, ShapeType::Quadrilateral, GeometryOrder::Linear, 4, 0);
    assert_panics!({
        let mut arena = PackedArena::<U2>::new(key);
        arena.push(header, &[0.0; 8]);
    });
    assert_panics!({
        let mut arena = PackedArena::<U2>::new(key);
        arena.push(element_header(0), &[0.0; 5]);
    });
}

#[test]
fn affine_and_facet_descriptors_unpack() {
    let origin = Point2::new(1.0, -2.0);
    #[rustfmt::skip]
    let inverse_jacobian = Matrix2::new(1.0, 2.0,
                                        3.0, 4.0);
    let affine = DescriptorHeader::new(DescriptorKind::Affine, ShapeType::Quadrilateral, GeometryOrder::Linear, 0, 7);
    let vertices = [Point2::new(0.0, 0.0), Point2::new(0.0, 1.0)];
    let normal = Vector2::new(1.0, 0.0);
    let facet = DescriptorHeader::new(DescriptorKind::Facet, ShapeType::Segment, GeometryOrder::Linear, 2, 3)
        .with_composite(42);

    let store = PackedStore::<U2>::from_descriptors(vec![
        (affine, affine_payload(&origin, &inverse_jacobian)),
        (facet, facet_payload(&vertices, &normal)),
        (element_header(1), element_payload(&triangle_nodes(0.0))),
    ]);
    assert_eq!(store.len(), 3);
    assert_eq!(store.arenas().count(), 3);

    let affine = store.iter_kind(DescriptorKind::Affine).next().unwrap();
    assert_eq!(affine.id(), 7);
    assert_eq!(affine.origin(), Some(origin));
    assert_eq!(affine.inverse_jacobian(), Some(inverse_jacobian));
    assert!(affine.nodes().is_empty());

    let facet = store.iter_kind(DescriptorKind::Facet).next().unwrap();
    assert_eq!(facet.composite_id(), 42);
    assert_eq!(facet.nodes(), vertices.to_vec());
    assert_eq!(facet.normal(), Some(normal));
    assert!(facet.inverse_jacobian().is_none());
}

#[test]
fn store_groups_descriptors_by_key() {
    let quad = DescriptorHeader::new(DescriptorKind::Element, ShapeType::Quadrilateral, GeometryOrder::Linear, 4, 2);
    let quad_nodes = vec![
        Point2::new(0.0, 0.0),
        Point2::new(1.0, 0.0),
        Point2::new(1.0, 1.0),
        Point2::new(0.0, 1.0),
    ];
    let store = PackedStore::<U2>::from_descriptors(vec![
        (element_header(0), element_payload(&triangle_nodes(0.0))),
        (quad, element_payload(&quad_nodes)),
        (element_header(1), element_payload(&triangle_nodes(1.0))),
    ]);
    let triangles = store.arena(&element_header(0).key().unwrap()).unwrap();
    assert_eq!(triangles.len(), 2);
    assert_eq!(triangles.capacity(), 2);
    let mut ids: Vec<usize> = store.iter_kind(DescriptorKind::Element).map(|g| g.id()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![0, 1, 2]);
    assert!(store.iter_kind(DescriptorKind::Facet).next().is_none());
    assert!(PackedStore::<U2>::default().is_empty());
}

#[test]
fn stores_with_element_headers_compare_equal() {
    // Elements carry the composite id -1, whose bits must not be read as a payload value
    let descriptors = vec![
        (element_header(0), element_payload(&triangle_nodes(0.0))),
        (element_header(1), element_payload(&triangle_nodes(1.0))),
    ];
    let store = PackedStore::<U2>::from_descriptors(descriptors.clone());
    assert_eq!(store, store.clone());
    assert_eq!(store, PackedStore::<U2>::from_descriptors(descriptors));
    assert!(store
        .iter_kind(DescriptorKind::Element)
        .all(|geometry| geometry.composite_id() == -1));

    let mut other = PackedArena::<U2>::new(element_header(0).key().unwrap());
    other.push(element_header(0).with_composite(3), &element_payload(&triangle_nodes(0.0)));
    let mut arena = PackedArena::<U2>::new(element_header(0).key().unwrap());
    arena.push(element_header(0), &element_payload(&triangle_nodes(0.0)));
    assert_ne!(arena, other);
}
